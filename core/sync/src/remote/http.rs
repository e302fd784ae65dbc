//! HTTP remote feed.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use quotesync_common::{Error, Quote, Result};

use super::RemoteFeed;
use crate::config::FieldMapping;

/// Remote feed backed by a JSON HTTP endpoint.
///
/// `GET <endpoint>` must return a JSON array of objects; `POST <endpoint>`
/// receives one quote as a JSON object. Field names follow the configured
/// [`FieldMapping`].
pub struct HttpFeed {
    http: Client,
    endpoint: Url,
    mapping: FieldMapping,
}

impl HttpFeed {
    /// Create a new HTTP feed.
    ///
    /// # Errors
    /// - HTTP client could not be built
    pub fn new(endpoint: Url, mapping: FieldMapping) -> Result<Self> {
        let http = Client::builder()
            .user_agent("QuoteSync/0.1")
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            mapping,
        })
    }

    /// Encode a quote for publishing.
    fn encode(&self, quote: &Quote) -> Value {
        let mut body = Map::new();
        body.insert(
            self.mapping.text_field.clone(),
            Value::String(quote.text().to_string()),
        );
        body.insert(
            self.mapping.category_field.clone(),
            Value::String(quote.category().to_string()),
        );
        Value::Object(body)
    }
}

/// Convert a remote document into quotes.
///
/// Elements that do not map onto a valid quote are skipped with a warning.
///
/// # Errors
/// - `Error::Network` if the document is not an array
pub fn map_quotes(document: Value, mapping: &FieldMapping) -> Result<Vec<Quote>> {
    let Value::Array(elements) = document else {
        return Err(Error::Network(
            "Remote response is not a JSON array".to_string(),
        ));
    };

    let total = elements.len();
    let quotes: Vec<Quote> = elements
        .iter()
        .enumerate()
        .filter_map(|(index, element)| match map_quote(element, mapping) {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!("Skipping remote element {}: {}", index, e);
                None
            }
        })
        .collect();

    debug!("Mapped {} of {} remote elements", quotes.len(), total);
    Ok(quotes)
}

fn map_quote(element: &Value, mapping: &FieldMapping) -> Result<Quote> {
    let text = element
        .get(&mapping.text_field)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::Validation(format!("missing string field '{}'", mapping.text_field))
        })?;

    let category = match element.get(&mapping.category_field) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => mapping.default_category.clone(),
    };

    Quote::new(text, category)
}

#[async_trait]
impl RemoteFeed for HttpFeed {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_batch(&self) -> Result<Vec<Quote>> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to fetch quotes: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "Remote feed returned {}",
                status
            )));
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("Failed to read remote response: {}", e)))?;

        map_quotes(document, &self.mapping)
    }

    async fn publish(&self, quote: &Quote) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&self.encode(quote))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to publish quote: {}", e)))?;

        match response.status() {
            status if status.is_success() => {
                info!("Published quote, remote responded {}", status);
                Ok(())
            }
            StatusCode::PAYLOAD_TOO_LARGE => Err(Error::Network(
                "Remote rejected quote as too large".to_string(),
            )),
            status => Err(Error::Network(format!(
                "Remote rejected publish with {}",
                status
            ))),
        }
    }
}
