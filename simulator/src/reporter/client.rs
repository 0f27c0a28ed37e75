use anyhow::Context;
use reqwest::blocking::{multipart, Client};
use std::time::Duration;

/// Multipart uploads to the mission dashboard.
pub struct DashboardClient {
    base_url: String,
    http: Client,
}

impl DashboardClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("building dashboard HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn document_url(&self) -> String {
        format!("{}/dashboard_json", self.base_url)
    }

    pub fn image_url(&self) -> String {
        format!("{}/img/dashboard/fire_building", self.base_url)
    }

    /// Uploads the mission document as `{file_name}`; returns the response body.
    pub fn post_document(&self, file_name: &str, json: String) -> anyhow::Result<String> {
        let part = multipart::Part::text(json)
            .file_name(file_name.to_string())
            .mime_str("application/json")
            .context("building document part")?;
        self.post_file(self.document_url(), part)
    }

    pub fn send_image(&self, file_name: &str, jpeg: Vec<u8>) -> anyhow::Result<String> {
        let part = multipart::Part::bytes(jpeg)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")
            .context("building image part")?;
        self.post_file(self.image_url(), part)
    }

    fn post_file(&self, url: String, part: multipart::Part) -> anyhow::Result<String> {
        let form = multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .with_context(|| format!("posting to {}", url))?
            .error_for_status()
            .with_context(|| format!("dashboard rejected {}", url))?;
        response
            .text()
            .with_context(|| format!("reading response from {}", url))
    }
}
