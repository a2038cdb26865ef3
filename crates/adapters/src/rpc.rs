//! Inventory system RPC envelope.
//!
//! The inventory backend wraps every server-side function call in a
//! two-layer response: a top-level transport error, and a nested data
//! object carrying the function-level error and result. The two error
//! channels are independent; the absence of a transport error says
//! nothing about business success, so decoding checks both.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AdapterError;

/// Top-level transport error reported by the RPC layer.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportError {
    #[serde(rename = "errorCode")]
    pub error_code: Option<i64>,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

/// A log line emitted by the remote function, forwarded for debugging.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcLog {
    #[serde(rename = "Level")]
    pub level: String,
    #[serde(rename = "Message")]
    pub message: String,
}

/// The nested result object of a server-side function call.
#[derive(Debug, Deserialize)]
pub struct RpcData<T> {
    /// Function-level business error, independent of the transport error.
    #[serde(rename = "Error")]
    pub function_error: Option<Value>,
    /// The function's return value; absent when the call never ran.
    #[serde(rename = "FunctionResult")]
    pub function_result: Option<T>,
    #[serde(rename = "Logs", default)]
    pub logs: Vec<RpcLog>,
}

/// Full RPC response envelope.
#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    #[serde(rename = "error")]
    pub transport_error: Option<TransportError>,
    pub data: Option<RpcData<T>>,
}

impl<T: DeserializeOwned> RpcResponse<T> {
    /// Decodes an envelope from raw JSON.
    pub fn from_json(raw: &str) -> Result<Self, AdapterError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Unwraps the envelope into the function result.
    ///
    /// Checks, in order: the transport error, the function-level
    /// error, and the presence of a result. A missing result on an
    /// otherwise clean response means the function never completed and
    /// is treated as a transport failure.
    pub fn into_result(self) -> Result<T, AdapterError> {
        if let Some(err) = self.transport_error {
            let message = err
                .error_message
                .unwrap_or_else(|| format!("rpc error code {:?}", err.error_code));
            return Err(AdapterError::RemoteUnavailable(message));
        }

        let data = self
            .data
            .ok_or_else(|| AdapterError::RemoteUnavailable("empty rpc response".to_string()))?;

        for log in &data.logs {
            tracing::debug!(level = %log.level, message = %log.message, "remote function log");
        }

        if let Some(err) = data.function_error {
            return Err(AdapterError::RemoteRejected(err.to_string()));
        }

        data.function_result.ok_or_else(|| {
            AdapterError::RemoteUnavailable(
                "no response from the inventory backend; the call may not have completed"
                    .to_string(),
            )
        })
    }
}
