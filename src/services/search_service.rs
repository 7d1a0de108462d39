use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::RadarConfig;
use crate::error::{RadarError, RadarResult};
use crate::models::{Developer, SessionParams};

/// One-shot discovery query returning the full matching set.
#[async_trait]
pub trait DiscoveryApi: Send + Sync {
    async fn search(&self, params: &SessionParams) -> RadarResult<Vec<Developer>>;
}

#[async_trait]
impl<T: DiscoveryApi + ?Sized> DiscoveryApi for Box<T> {
    async fn search(&self, params: &SessionParams) -> RadarResult<Vec<Developer>> {
        (**self).search(params).await
    }
}

#[derive(Debug, Clone)]
pub struct HttpSearchClient {
    client: reqwest::Client,
    search_url: Url,
}

impl HttpSearchClient {
    pub fn new(config: &RadarConfig) -> RadarResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let mut search_url = config.api_url.clone();
        search_url
            .path_segments_mut()
            .map_err(|_| RadarError::Config(format!("{} cannot be a base url", config.api_url)))?
            .pop_if_empty()
            .push("search");
        Ok(Self { client, search_url })
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }
}

#[async_trait]
impl DiscoveryApi for HttpSearchClient {
    async fn search(&self, params: &SessionParams) -> RadarResult<Vec<Developer>> {
        let resp = match self
            .client
            .get(self.search_url.clone())
            .query(&params.query_pairs())
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("🔎 Discovery upstream unreachable: {}", e);
                return Err(e.into());
            }
        };

        if !resp.status().is_success() {
            warn!("🔎 Discovery upstream non-OK: {}", resp.status());
            return Err(RadarError::SearchStatus {
                status: resp.status().as_u16(),
            });
        }

        let body: Value = match resp.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("🔎 Discovery upstream JSON parse failed: {}", e);
                return Err(RadarError::MalformedPayload(e.to_string()));
            }
        };

        let records = match body {
            Value::Array(records) => records,
            other => {
                warn!("🔎 Discovery upstream returned non-array body");
                return Err(RadarError::MalformedPayload(format!(
                    "expected array, got {}",
                    json_kind(&other)
                )));
            }
        };

        let total = records.len();
        let developers = parse_snapshot(records);
        debug!(
            total,
            kept = developers.len(),
            techs = %params.techs,
            "🔎 Discovery snapshot received"
        );
        Ok(developers)
    }
}

/// Converts snapshot records, dropping the malformed ones.
pub fn parse_snapshot(records: Vec<Value>) -> Vec<Developer> {
    records
        .into_iter()
        .filter_map(|record| match Developer::from_json(record) {
            Ok(dev) => Some(dev),
            Err(e) => {
                warn!("🔎 Dropping snapshot record: {}", e);
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_url_is_joined_to_base() {
        let mut config = RadarConfig::default();
        config.api_url = Url::parse("http://radar.local:3333").unwrap();
        let client = HttpSearchClient::new(&config).unwrap();
        assert_eq!(client.search_url().as_str(), "http://radar.local:3333/search");
    }

    #[test]
    fn search_url_keeps_base_path() {
        let mut config = RadarConfig::default();
        for base in ["http://radar.local:3333/api", "http://radar.local:3333/api/"] {
            config.api_url = Url::parse(base).unwrap();
            let client = HttpSearchClient::new(&config).unwrap();
            assert_eq!(
                client.search_url().as_str(),
                "http://radar.local:3333/api/search"
            );
        }
    }

    #[test]
    fn malformed_records_are_dropped_from_snapshot() {
        let records = vec![
            json!({
                "_id": "a1",
                "name": "Ana",
                "techs": ["go"],
                "location": { "coordinates": [20.0, 10.0] },
                "github_username": "ana"
            }),
            json!({ "name": "no id" }),
            json!("not an object"),
        ];
        let snapshot = parse_snapshot(records);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "a1");
    }
}
