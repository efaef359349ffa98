//! Fetching ABI documents from the chain REST API.

use crate::document::AbiDocument;
use nucleus_core::{Error, NucleusId, Result};
use serde_json::Value;

/// HTTP client for `GET {base}/api/nucleus/{id}/abi`.
///
/// # Examples
///
/// ```
/// use nucleus_abi::AbiClient;
/// use nucleus_core::NucleusId;
///
/// let client = AbiClient::new("https://api.example.org/");
/// assert_eq!(
///     client.abi_url(&NucleusId::new("n1")),
///     "https://api.example.org/api/nucleus/n1/abi"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct AbiClient {
    http: reqwest::Client,
    base_url: String,
}

impl AbiClient {
    /// Creates a client for the given API base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a client reusing an existing `reqwest` client.
    #[must_use]
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// URL of the ABI document of `nucleus`.
    #[must_use]
    pub fn abi_url(&self, nucleus: &NucleusId) -> String {
        format!("{}/api/nucleus/{}/abi", self.base_url, nucleus)
    }

    /// Fetches and decodes the ABI document of `nucleus`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the request fails or the server answers
    /// with a non-success status, and [`Error::SerializationError`] if the
    /// body is not an ABI document.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nucleus_abi::AbiClient;
    /// use nucleus_core::NucleusId;
    ///
    /// # async fn example() -> nucleus_core::Result<()> {
    /// let client = AbiClient::new("https://api.example.org");
    /// let doc = client.fetch(&NucleusId::new("n1")).await?;
    /// println!("{} entries", doc.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch(&self, nucleus: &NucleusId) -> Result<AbiDocument> {
        let url = self.abi_url(nucleus);
        tracing::info!(%url, "fetching ABI document");

        let response = self.http.get(&url).send().await.map_err(|e| Error::Http {
            url: url.clone(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                url,
                message: format!("unexpected status {status}"),
                source: None,
            });
        }

        let body: Value = response.json().await.map_err(|e| Error::Http {
            url: url.clone(),
            message: format!("invalid response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        let document = AbiDocument::from_value(body)?;
        tracing::info!(
            entries = document.len(),
            skipped = document.issues.len(),
            "ABI document loaded"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slashes_trimmed() {
        let client = AbiClient::new("http://localhost:8080//");
        assert_eq!(
            client.abi_url(&NucleusId::new("abc")),
            "http://localhost:8080/api/nucleus/abc/abi"
        );
    }
}
