//! HTTP client for the Employer Directory

use async_trait::async_trait;
use enroll_common::Result;
use reqwest::Client;
use std::time::Duration;

use super::{endpoints, transport_error, Employer, EmployerDirectory};

pub struct HttpEmployerDirectory {
    client: Client,
    base_url: String,
}

impl HttpEmployerDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl EmployerDirectory for HttpEmployerDirectory {
    #[tracing::instrument(skip(self))]
    async fn find_employers(&self, name: &str) -> Result<Vec<Employer>> {
        let url = endpoints::employers_url(&self.base_url);

        let employers = self
            .client
            .get(&url)
            .query(&[("name", name)])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(transport_error)?
            .json::<Vec<Employer>>()
            .await
            .map_err(transport_error)?;

        tracing::debug!(count = employers.len(), "Employers retrieved");

        Ok(employers)
    }
}
