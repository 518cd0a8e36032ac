//! Upstream repository access
//!
//! All network traffic goes through the [`Repository`] trait so the pipeline
//! can be driven against an in-memory implementation in tests. The HTTP
//! implementation talks to the legacy server's simple GET endpoints, one XML
//! document per call.

use std::time::Duration;

use url::Url;

use crate::error::ExportError;

/// Default endpoint prefix of the legacy repository server.
pub const DEFAULT_BASE_URL: &str = "http://fedora.lib.umd.edu/fedora";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read access to the upstream object repository.
pub trait Repository {
    /// Raw object-type document (`doInfo`).
    fn object_type_doc(&self, pid: &str) -> Result<String, ExportError>;

    /// Raw descriptive-metadata document (`umdm`).
    fn metadata_doc(&self, pid: &str) -> Result<String, ExportError>;

    /// Raw structural-relationships document (`rels-mets`).
    fn relations_doc(&self, pid: &str) -> Result<String, ExportError>;

    /// Raw handle document.
    fn handle_doc(&self, pid: &str) -> Result<String, ExportError>;

    /// Derivative image bytes.
    fn image_bytes(&self, pid: &str) -> Result<Vec<u8>, ExportError>;

    /// URL of the derivative image for an object, as published in the output
    /// records.
    fn image_url(&self, pid: &str) -> String;
}

/// [`Repository`] backed by the legacy server's HTTP GET endpoints.
pub struct HttpRepository {
    base: String,
    client: reqwest::blocking::Client,
}

impl HttpRepository {
    /// Create a client for the given base URL with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ExportError> {
        let base = base_url.trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|_| ExportError::InvalidBaseUrl(base_url.to_string()))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExportError::ClientInit(e.to_string()))?;

        Ok(Self { base, client })
    }

    fn object_url(&self, pid: &str, suffix: &str) -> String {
        format!("{}/get/{}/{}", self.base, pid, suffix)
    }

    fn get_text(&self, pid: &str, suffix: &str) -> Result<String, ExportError> {
        let url = self.object_url(pid, suffix);
        self.client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| ExportError::UpstreamUnavailable {
                pid: pid.to_string(),
                reason: format!("GET {}: {}", url, e),
            })
    }
}

impl Repository for HttpRepository {
    fn object_type_doc(&self, pid: &str) -> Result<String, ExportError> {
        self.get_text(pid, "doInfo")
    }

    fn metadata_doc(&self, pid: &str) -> Result<String, ExportError> {
        self.get_text(pid, "umdm")
    }

    fn relations_doc(&self, pid: &str) -> Result<String, ExportError> {
        self.get_text(pid, "rels-mets")
    }

    fn handle_doc(&self, pid: &str) -> Result<String, ExportError> {
        self.get_text(pid, "umd-bdef:handle/getHandle/")
    }

    fn image_bytes(&self, pid: &str) -> Result<Vec<u8>, ExportError> {
        let url = self.object_url(pid, "image");
        self.client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map(|b| b.to_vec())
            .map_err(|e| ExportError::UpstreamUnavailable {
                pid: pid.to_string(),
                reason: format!("GET {}: {}", url, e),
            })
    }

    fn image_url(&self, pid: &str) -> String {
        self.object_url(pid, "image")
    }
}
