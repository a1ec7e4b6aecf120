//! Process-wide span carrying the running command and build identifier.

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "hadocs",
            command = %command,
            build_sha = %build_sha()
        )));
        Self {
            _guard: span.enter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_enters_application_span() {
        let guard = GlobalContextGuard::new("docs upload");
        tracing::info!("inside application span");
        drop(guard);
    }
}
