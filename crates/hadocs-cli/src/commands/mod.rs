//! Command handlers grouped by concern.

pub(crate) mod companies;
pub(crate) mod docs;
pub(crate) mod patients;
pub(crate) mod results;

#[cfg(test)]
pub(crate) mod test_support {
    use hadocs_upload::UploadConfig;
    use httpmock::MockServer;
    use reqwest::Client;

    use crate::client::AppContext;

    pub(crate) fn context_with(server: &MockServer) -> AppContext {
        AppContext {
            client: Client::new(),
            base_url: server.base_url().parse().expect("valid URL"),
            upload: UploadConfig::default(),
        }
    }
}
