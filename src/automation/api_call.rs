use crate::error::{CommandResult, FlowCanvasError};
use crate::history::ExecutionOutcome;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const TRACING_TARGET: &str = "flowcanvas::automation::api_call";

/// Form values of the API-call configuration dialog. `headers` and `body`
/// hold raw JSON text exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiCallConfig {
    pub method: String,
    pub url: String,
    pub headers: String,
    pub body: String,
}

impl Default for ApiCallConfig {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            url: String::new(),
            headers: String::new(),
            body: String::new(),
        }
    }
}

/// A validated request, ready to send.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ApiCallConfig {
    pub fn new(method: &str, url: &str, headers: &str, body: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.to_string(),
            body: body.to_string(),
        }
    }

    /// Checks the form and parses headers/body. Nothing is sent on failure.
    pub fn prepare(&self) -> CommandResult<PreparedRequest> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(FlowCanvasError::Validation("Please enter a URL".to_string()));
        }

        let headers = if self.headers.trim().is_empty() {
            HeaderMap::new()
        } else {
            let parsed = serde_json::from_str::<Value>(&self.headers)
                .map_err(|_| invalid_headers())?;
            header_map(&parsed)?
        };

        let body = if self.body.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(&self.body).map_err(|_| {
                FlowCanvasError::Validation("Invalid body format. Please use valid JSON.".to_string())
            })?)
        };

        let method = match self.method.trim().to_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "PATCH" => Method::PATCH,
            "DELETE" => Method::DELETE,
            other => {
                return Err(FlowCanvasError::Validation(format!(
                    "Unsupported method: {}",
                    other
                )))
            }
        };

        Ok(PreparedRequest {
            method,
            url: url.to_string(),
            headers,
            body,
        })
    }
}

fn invalid_headers() -> FlowCanvasError {
    FlowCanvasError::Validation("Invalid headers format. Please use valid JSON.".to_string())
}

fn header_map(parsed: &Value) -> CommandResult<HeaderMap> {
    let object = parsed.as_object().ok_or_else(invalid_headers)?;
    let mut headers = HeaderMap::new();

    for (name, value) in object {
        let text = match value {
            Value::String(text) => text.clone(),
            Value::Number(_) | Value::Bool(_) => value.to_string(),
            _ => return Err(invalid_headers()),
        };
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid_headers())?;
        let value = HeaderValue::from_str(&text).map_err(|_| invalid_headers())?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Sends ad-hoc API-call steps from the configuration dialog.
#[derive(Debug, Clone)]
pub struct ApiCallExecutor {
    client: reqwest::Client,
}

impl ApiCallExecutor {
    pub fn new(timeout: Duration) -> CommandResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| FlowCanvasError::Http(error.to_string()))?;
        Ok(Self { client })
    }

    /// Validates `config`, sends it and reports the outcome.
    ///
    /// Validation failures are returned as errors; transport failures and
    /// non-success statuses come back as a failed outcome.
    pub async fn execute(&self, config: &ApiCallConfig) -> CommandResult<ExecutionOutcome> {
        let prepared = config.prepare()?;

        tracing::debug!(
            target: TRACING_TARGET,
            method = %prepared.method,
            url = %prepared.url,
            "sending api call"
        );

        match self.send(prepared).await {
            Ok(response) => {
                tracing::info!(target: TRACING_TARGET, url = %config.url, "api call passed");
                Ok(ExecutionOutcome::passed(config, response))
            }
            Err(error) => {
                tracing::warn!(target: TRACING_TARGET, url = %config.url, error = %error, "api call failed");
                Ok(ExecutionOutcome::failed(config, error.user_message()))
            }
        }
    }

    async fn send(&self, prepared: PreparedRequest) -> CommandResult<Value> {
        let mut request = self
            .client
            .request(prepared.method, &prepared.url)
            .headers(prepared.headers);
        if let Some(body) = &prepared.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|error| FlowCanvasError::Http(error.to_string()))?
            .error_for_status()
            .map_err(|error| FlowCanvasError::Http(error.to_string()))?;

        let text = response
            .text()
            .await
            .map_err(|error| FlowCanvasError::Http(error.to_string()))?;

        Ok(serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::node::ExecutionStatus;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn executor() -> ApiCallExecutor {
        ApiCallExecutor::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_prepare_requires_url() {
        let error = ApiCallConfig::default().prepare().unwrap_err();
        assert_eq!(error.user_message(), "Please enter a URL");
    }

    #[test]
    fn test_prepare_rejects_malformed_headers() {
        let config = ApiCallConfig::new("GET", "http://localhost", "{not json", "");
        let error = config.prepare().unwrap_err();
        assert_eq!(error.user_message(), "Invalid headers format. Please use valid JSON.");

        let config = ApiCallConfig::new("GET", "http://localhost", "[1, 2]", "");
        assert!(config.prepare().is_err());
    }

    #[test]
    fn test_prepare_rejects_malformed_body() {
        let config = ApiCallConfig::new("POST", "http://localhost", "", "{\"a\":");
        let error = config.prepare().unwrap_err();
        assert_eq!(error.user_message(), "Invalid body format. Please use valid JSON.");
    }

    #[test]
    fn test_prepare_parses_headers_and_body() {
        let config = ApiCallConfig::new(
            "post",
            " http://localhost/items ",
            r#"{"X-Token": "abc", "X-Retry": 2}"#,
            r#"{"name": "demo"}"#,
        );
        let prepared = config.prepare().unwrap();
        assert_eq!(prepared.method, Method::POST);
        assert_eq!(prepared.url, "http://localhost/items");
        assert_eq!(prepared.headers.get("x-token").unwrap(), "abc");
        assert_eq!(prepared.headers.get("x-retry").unwrap(), "2");
        assert_eq!(prepared.body, Some(serde_json::json!({ "name": "demo" })));
    }

    #[tokio::test]
    async fn test_execute_passes_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/items"))
            .and(header("x-token", "abc"))
            .and(body_json(serde_json::json!({ "name": "demo" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": 7 })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ApiCallConfig::new(
            "POST",
            &format!("{}/items", server.uri()),
            r#"{"x-token": "abc"}"#,
            r#"{"name": "demo"}"#,
        );
        let outcome = executor().execute(&config).await.unwrap();

        assert_eq!(outcome.status, ExecutionStatus::Passed);
        assert_eq!(outcome.response, Some(serde_json::json!({ "id": 7 })));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_execute_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = ApiCallConfig::new("GET", &server.uri(), "", "");
        let outcome = executor().execute(&config).await.unwrap();

        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert!(outcome.error.is_some());
        assert!(outcome.response.is_none());
    }

    #[tokio::test]
    async fn test_invalid_headers_never_reach_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = ApiCallConfig::new("GET", &server.uri(), "{oops", "");
        let error = executor().execute(&config).await.unwrap_err();
        assert!(matches!(error, FlowCanvasError::Validation(_)));
    }
}
