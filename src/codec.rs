// src/codec.rs

//! Flat serialized form of model and traffic parameters.
//!
//! Model parameters are stored as one JSON object whose `model_type` field
//! selects the variant, for example:
//!
//! ```text
//! {"model_type":"simple","maxrate_rph":5000.0,"per_vm_hourcost":0.8,
//!  "avg_latency_s":12.0,"policy":"fifo"}
//! ```

use std::str::FromStr;

use serde_json::Value;

use crate::error::{TwinError, TwinResult};
use crate::forecast::ForecastParams;
use crate::models::ModelParams;
use crate::types::Policy;

/// Converts parameters to and from the text form handed to a store
pub trait ModelCodec: Send + Sync {
    fn encode(&self, params: &ModelParams) -> TwinResult<String>;

    /// Parse and validate; the result is ready for `PipelineModel::from_params`
    fn decode(&self, data: &str) -> TwinResult<ModelParams>;

    fn encode_forecast_params(&self, params: &ForecastParams) -> TwinResult<String>;

    fn decode_forecast_params(&self, data: &str) -> TwinResult<ForecastParams>;
}

/// JSON implementation of [`ModelCodec`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented output, for files meant to be read by people
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    fn to_string<T: serde::Serialize>(&self, value: &T) -> TwinResult<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        text.map_err(|e| TwinError::codec(e.to_string()))
    }
}

impl ModelCodec for JsonCodec {
    fn encode(&self, params: &ModelParams) -> TwinResult<String> {
        self.to_string(params)
    }

    fn decode(&self, data: &str) -> TwinResult<ModelParams> {
        let value: Value =
            serde_json::from_str(data).map_err(|e| TwinError::codec(format!("Malformed model JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| TwinError::codec("Model must be a JSON object"))?;

        match object.get("model_type").and_then(Value::as_str) {
            Some(tag) if ModelParams::MODEL_TYPES.contains(&tag) => {}
            Some(tag) => return Err(TwinError::codec(format!("Unknown model_type '{}'", tag))),
            None => return Err(TwinError::codec("Missing model_type")),
        }

        // Report bad policy tokens as such rather than as a generic parse error
        if let Some(token) = object.get("policy").and_then(Value::as_str) {
            Policy::from_str(token)?;
        }

        let params: ModelParams =
            serde_json::from_value(value).map_err(|e| TwinError::codec(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    fn encode_forecast_params(&self, params: &ForecastParams) -> TwinResult<String> {
        self.to_string(params)
    }

    fn decode_forecast_params(&self, data: &str) -> TwinResult<ForecastParams> {
        let params: ForecastParams =
            serde_json::from_str(data).map_err(|e| TwinError::codec(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}
