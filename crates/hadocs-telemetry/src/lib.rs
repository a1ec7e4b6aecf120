#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Logging setup shared by the health-exam document tools.
//!
//! Layout: `init.rs` (subscriber installation and formats), `context.rs`
//! (process-wide span carrying the command and build identifier).

pub mod context;
pub mod init;

pub use context::GlobalContextGuard;
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging, log_format_from_env,
};
