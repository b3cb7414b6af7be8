use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::config::Settings;
use crate::error::GenomicOpsError;

/// Artifact downloads (liftOver binary, chain files) outlive the API timeout.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Read access to the UCSC Genome Browser REST API.
pub trait UcscApi: Send + Sync {
    /// Raw body of `GET <api root><path>?<query>`.
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, GenomicOpsError>;
}

/// Fetches a remote file into `destination`, which must already be writable.
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, destination: &Path) -> Result<(), GenomicOpsError>;
}

#[derive(Clone)]
pub struct UcscHttpClient {
    client: Client,
    api_base: String,
}

impl UcscHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, GenomicOpsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("genomicops/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GenomicOpsError::UcscHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| GenomicOpsError::UcscHttp(err.to_string()))?;
        Ok(Self {
            client,
            api_base: settings.api_base.clone(),
        })
    }

    fn handle_status(response: Response) -> Result<Response, GenomicOpsError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "UCSC request failed".to_string());
        Err(GenomicOpsError::UcscStatus { status, message })
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, GenomicOpsError>
    where
        F: FnMut() -> RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        debug!(status, attempt, "retrying UCSC request");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        debug!(%err, attempt, "retrying UCSC request");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(GenomicOpsError::UcscHttp(err.to_string()));
                }
            }
        }
    }
}

impl UcscApi for UcscHttpClient {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, GenomicOpsError> {
        let url = format!("{}{}", self.api_base, path);
        let response = self.send_with_retries(|| self.client.get(&url).query(query))?;
        let response = Self::handle_status(response)?;
        response
            .text()
            .map_err(|err| GenomicOpsError::UcscHttp(err.to_string()))
    }
}

impl Downloader for UcscHttpClient {
    fn download(&self, url: &str, destination: &Path) -> Result<(), GenomicOpsError> {
        let response = self.send_with_retries(|| self.client.get(url).timeout(DOWNLOAD_TIMEOUT))?;
        let mut response = Self::handle_status(response)?;
        let mut file = File::create(destination)
            .map_err(|err| GenomicOpsError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| GenomicOpsError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
