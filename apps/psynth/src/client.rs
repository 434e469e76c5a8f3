//! # Psynth HTTP Client
//!
//! `RemoteGraphService` over the Psynth web API.
//!
//! Every operation is a GET of `{url}api/{json}`, where `{json}` is the
//! parameter map plus `"query": <operation>`, sent as one percent-encoded
//! path segment.
//!
//! Calls block the calling thread. A call that is waiting on the server
//! stalls the session's request queue until it returns or the configured
//! timeout fires, so never drop the timeout to zero.

use crate::config::ClientConfig;
use psynth_core::{Operation, Params, PsynthError, RemoteGraphService, Response, TransportError};
use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::{Map, Value};
use tracing::debug;

/// Blocking HTTP transport for one service endpoint.
#[derive(Debug, Clone)]
pub struct HttpGraphService {
    http: Client,
    base_url: Url,
}

impl HttpGraphService {
    /// Build a client for `config.url` with `config.timeout_secs` per call.
    ///
    /// Must not be called from an async task; the blocking client owns its
    /// own runtime.
    pub fn new(config: &ClientConfig) -> Result<Self, PsynthError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| PsynthError::ConfigError(format!("invalid url '{}': {e}", config.url)))?;
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| PsynthError::ConfigError(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { http, base_url })
    }

    /// The full URL for one call.
    pub fn endpoint(&self, operation: Operation, params: &Params) -> Result<Url, TransportError> {
        let query = encode_query(operation, params)?;
        let mut url = self
            .base_url
            .join("api/")
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| {
                TransportError::InvalidRequest(format!("{} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .push(&query);
        Ok(url)
    }
}

/// The JSON document naming the operation and carrying its parameters.
pub fn encode_query(operation: Operation, params: &Params) -> Result<String, TransportError> {
    let mut document: Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    document.insert("query".to_string(), Value::String(operation.to_string()));
    serde_json::to_string(&document).map_err(|e| TransportError::InvalidRequest(e.to_string()))
}

/// Parse a response body, keeping non-JSON text as a JSON string.
pub fn decode_body(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

impl RemoteGraphService for HttpGraphService {
    fn execute(
        &mut self,
        operation: Operation,
        params: &Params,
    ) -> Result<Response, TransportError> {
        let url = self.endpoint(operation, params)?;
        debug!(%operation, base = %self.base_url, "sending request");

        let resp = self.http.get(url).send().map_err(|e| {
            TransportError::Connection(format!("{}: {e}", self.base_url))
        })?;
        let status = resp.status().as_u16();
        let text = resp.text().map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(Response {
            status,
            body: decode_body(text),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> ClientConfig {
        ClientConfig {
            url: url.to_string(),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn query_document_names_the_operation() {
        let mut params = Params::new();
        params.insert("uid".into(), "a".into());
        let query = encode_query(Operation::DelNode, &params).expect("encode");
        let parsed: Value = serde_json::from_str(&query).expect("json");
        assert_eq!(parsed["query"], "delnode");
        assert_eq!(parsed["uid"], "a");
    }

    #[test]
    fn endpoint_is_one_encoded_segment_under_api() {
        let service = HttpGraphService::new(&config("https://example.org/psynth/")).expect("client");
        let mut params = Params::new();
        params.insert("name".into(), "my graph/1".into());
        let url = service.endpoint(Operation::CreateMap, &params).expect("url");

        let segments: Vec<_> = url.path_segments().expect("segments").collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(&segments[..2], ["psynth", "api"]);
        assert!(!segments[2].contains('/'));
        assert!(segments[2].contains("createmap"));
        assert_eq!(url.host_str(), Some("example.org"));
    }

    #[test]
    fn non_json_body_is_kept_as_text() {
        assert_eq!(decode_body("{\"a\":1}".into())["a"], 1);
        assert_eq!(decode_body("Bad key".into()), Value::String("Bad key".into()));
    }

    #[test]
    fn invalid_url_is_a_config_error() {
        assert!(matches!(
            HttpGraphService::new(&config("not a url")),
            Err(PsynthError::ConfigError(_))
        ));
    }
}
