//! Smart HTTP transport.
//!
//! Two operations: GET refs (discover what the server has) and POST
//! upload-pack (request a packfile of objects). Redirects are followed;
//! any status other than 200 is fatal.

use crate::{ProtocolError, Result};
use reqwest::blocking::{Client, Response};
use std::time::Duration;

/// Content type git requires on upload-pack requests.
const UPLOAD_PACK_CONTENT_TYPE: &str = "application/x-git-upload-pack-request";

/// Blocking HTTP client for the smart protocol endpoints.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the gitlet user agent.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gitlet/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    /// Fetches the refs advertisement for a repository URL.
    pub fn get_refs(&self, url: &str) -> Result<Vec<u8>> {
        let full_url = refs_url(url);
        tracing::debug!(url = %full_url, "discovering refs");

        let response = self.client.get(&full_url).send()?;
        Self::read_body(response)
    }

    /// Posts a want request and returns the upload-pack response body.
    pub fn post_upload_pack(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let full_url = upload_pack_url(url);
        tracing::debug!(url = %full_url, request_bytes = body.len(), "requesting pack");

        let response = self
            .client
            .post(&full_url)
            .header("Content-Type", UPLOAD_PACK_CONTENT_TYPE)
            .body(body)
            .send()?;
        Self::read_body(response)
    }

    fn read_body(response: Response) -> Result<Vec<u8>> {
        let status = response.status();
        if status.as_u16() != 200 {
            return Err(ProtocolError::HttpStatus(status.as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

fn refs_url(url: &str) -> String {
    format!("{}.git/info/refs?service=git-upload-pack", url)
}

fn upload_pack_url(url: &str) -> String {
    format!("{}.git/git-upload-pack", url)
}
