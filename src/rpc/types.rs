//! JSON-RPC wire types and transport errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a serde_json::Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// Why a single endpoint call failed. The text feeds error classification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Connection, TLS or protocol failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The HTTP client gave up waiting.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Non-success HTTP status.
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The node answered with a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The body was not a JSON-RPC response.
    #[error("invalid JSON-RPC response: {0}")]
    Decode(String),

    /// The HTTP client could not be built.
    #[error("transport setup failed: {0}")]
    Setup(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let (timeout, decode) = (e.is_timeout(), e.is_decode());
        let message = describe(e);
        if timeout {
            TransportError::Timeout(message)
        } else if decode {
            TransportError::Decode(message)
        } else {
            TransportError::Http(message)
        }
    }
}

/// Error text with its cause chain and without the request URL, which would
/// otherwise leak host and port digits into classification.
fn describe(e: reqwest::Error) -> String {
    let e = e.without_url();
    let mut message = e.to_string();
    let mut source = std::error::Error::source(&e);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl RpcResponse {
    /// The `result` member, or the `error` member as a [`TransportError`].
    pub fn into_result(self) -> Result<serde_json::Value, TransportError> {
        if let Some(error) = self.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(self.result.unwrap_or(serde_json::Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{Classifier, ErrorKind};
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let params = json!(["addr", {"commitment": "confirmed"}]);
        let request = RpcRequest::new(7, "getBalance", &params);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "id": 7, "method": "getBalance", "params": ["addr", {"commitment": "confirmed"}]})
        );
    }

    #[test]
    fn test_error_response() {
        let response: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "Invalid param: could not find account"}
        }))
        .unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(
            Classifier::default().classify(&err.to_string()),
            Some(ErrorKind::AccountNotFound)
        );
    }

    #[test]
    fn test_null_result() {
        let response: RpcResponse = serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": null})).unwrap();
        assert_eq!(response.into_result().unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_status_error_classifies_as_rate_limit() {
        let err = TransportError::Status {
            status: 429,
            body: "slow down".into(),
        };
        assert_eq!(
            Classifier::default().classify(&err.to_string()),
            Some(ErrorKind::RpcRateLimit)
        );
    }
}
