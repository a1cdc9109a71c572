//! Upstream product catalog boundary.

use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use capsync_schemas::Offering;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The catalog answered with a status other than 200 or 404.
    Status { sku: String, status: u16, body: String },
    /// The catalog answered 200 with a body that is not an offering.
    Decode { sku: String, message: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Status { sku, status, body } => {
                write!(f, "upstream catalog returned status={status} for sku={sku}: {body}")
            }
            ProviderError::Decode { sku, message } => {
                write!(f, "upstream offering for sku={sku} could not be decoded: {message}")
            }
        }
    }
}

impl std::error::Error for ProviderError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait UpstreamOfferingProvider: Send + Sync {
    /// `Ok(None)` when the catalog does not know `sku`.
    async fn fetch_offering(&self, sku: &str) -> Result<Option<Offering>>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// `GET {base_url}/offerings/{sku}` against the product catalog.
///
/// The bearer token is passed in by the caller; it is never logged. The SKU
/// is one percent-encoded path segment.
#[derive(Debug, Clone)]
pub struct HttpOfferingProvider {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpOfferingProvider {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration, token: Option<String>) -> Result<Self> {
        let raw = base_url.as_ref();
        let base_url =
            Url::parse(raw).with_context(|| format!("upstream base url '{raw}' is invalid"))?;
        if base_url.cannot_be_a_base() {
            bail!("upstream base url '{raw}' cannot carry a path");
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build upstream http client failed")?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn offering_url(&self, sku: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("upstream base url {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(["offerings", sku]);
        Ok(url)
    }
}

#[async_trait]
impl UpstreamOfferingProvider for HttpOfferingProvider {
    async fn fetch_offering(&self, sku: &str) -> Result<Option<Offering>> {
        let mut req = self.http.get(self.offering_url(sku)?);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("upstream offering request failed for sku={sku}"))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::OK => {
                let bytes = resp
                    .bytes()
                    .await
                    .with_context(|| format!("read upstream offering body failed for sku={sku}"))?;
                let offering: Offering =
                    serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode {
                        sku: sku.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(Some(offering))
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(ProviderError::Status {
                    sku: sku.to_string(),
                    status: status.as_u16(),
                    body,
                }
                .into())
            }
        }
    }
}
