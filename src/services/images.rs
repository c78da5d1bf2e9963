//! Article images from an HTTP image service

use super::{ImageProvider, ImageRequest};
use crate::types::ImageSource;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "images";

#[derive(Serialize)]
struct ImageServiceRequest<'a> {
    source: &'static str,
    title: String,
    excerpt: &'a str,
    category: &'a str,
}

#[derive(Deserialize)]
struct ImageServiceResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Image provider that POSTs to an image service
///
/// The service replies with `{"success": true, "url": "..."}`. Stock photos are
/// requested as `unsplash`, generated images as `dalle`.
pub struct HttpImageProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpImageProvider {
    /// Build a provider for `endpoint`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

/// Prompt for the n-th image: the headline first, then category variations
fn prompt(request: &ImageRequest) -> String {
    if request.index == 0 {
        request.title.clone()
    } else {
        format!(
            "{} technology concept {}",
            request.category,
            request.index + 1
        )
    }
}

#[async_trait]
impl ImageProvider for HttpImageProvider {
    async fn fetch_image(&self, request: ImageRequest) -> Result<String> {
        let source = match request.source {
            ImageSource::Ai => "dalle",
            ImageSource::Unsplash => "unsplash",
            ImageSource::None => {
                return Err(Error::Validation("image source is disabled".to_string()));
            }
        };

        let excerpt = if request.excerpt.is_empty() {
            request.title.as_str()
        } else {
            request.excerpt.as_str()
        };

        let body = ImageServiceRequest {
            source,
            title: prompt(&request),
            excerpt,
            category: &request.category,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::external(SERVICE, format!("HTTP {}", status)));
        }

        let reply: ImageServiceResponse = response
            .json()
            .await
            .map_err(|e| Error::external(SERVICE, format!("malformed response: {}", e)))?;

        match reply.url.filter(|u| !u.is_empty()) {
            Some(url) if reply.success => Ok(url),
            _ => Err(Error::external(
                SERVICE,
                reply.error.unwrap_or_else(|| "no image returned".to_string()),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Image provider used when no image service is configured
pub struct NoOpImageProvider;

#[async_trait]
impl ImageProvider for NoOpImageProvider {
    async fn fetch_image(&self, _request: ImageRequest) -> Result<String> {
        Err(Error::config(
            "services.image_endpoint",
            "no image service configured",
        ))
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
