//! # Twin Persistence Layer
//!
//! Simulation inputs and outputs are handed to an external key/value store as
//! text. This module defines the store seam and a repository that knows which
//! entry kinds exist and how each is encoded:
//!
//! - **Models**: capacity model parameters through a [`ModelCodec`]
//! - **Traffic models**: forecast parameters and generated predictions
//! - **Simulations**: the full result series and its summary
//!
//! Keys have the form `"{namespace}:{kind}:{name}"`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pipetwin::persistence::{MemoryStore, TwinRepository};
//!
//! let repo = TwinRepository::new(Arc::new(MemoryStore::new()));
//! repo.save_model("checkout", &params).await?;
//! let params = repo.load_model("checkout").await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::codec::{JsonCodec, ModelCodec};
use crate::error::{TwinError, TwinResult};
use crate::forecast::{ForecastParams, ForecastSeries};
use crate::models::ModelParams;
use crate::runner::SimulationOutcome;
use crate::summary::SimulationSummary;
use crate::types::ResultSeries;

/// Default key namespace
pub const DEFAULT_NAMESPACE: &str = "plantd";

/// Capacity model parameters
pub const KIND_TWIN_MODEL: &str = "twinmodel";
/// Traffic model parameters
pub const KIND_TRAFFIC_PARAMS: &str = "trafficmodel_params";
/// Generated hourly forecast
pub const KIND_TRAFFIC_PREDICTIONS: &str = "trafficmodel_predictions";
/// Hour-by-hour simulation output
pub const KIND_SIMULATION_TRAFFIC: &str = "simulation_traffic";
/// Simulation summary record
pub const KIND_SIMULATION_SUMMARY: &str = "simulation_summary";

/// External key/value store holding serialized twin data
#[async_trait]
pub trait TwinStore: Send + Sync {
    /// Store `data` under `(kind, name)`, replacing any previous entry
    async fn save_str(&self, kind: &str, name: &str, data: &str) -> TwinResult<()>;

    /// Fetch the entry under `(kind, name)`
    ///
    /// # Returns
    /// * `Ok(Some(data))` - Entry exists
    /// * `Ok(None)` - Nothing stored under this key
    /// * `Err(error)` - The store itself failed
    async fn load_str(&self, kind: &str, name: &str) -> TwinResult<Option<String>>;
}

/// In-process [`TwinStore`], mostly for tests and single-run tools
#[derive(Debug)]
pub struct MemoryStore {
    namespace: String,
    entries: RwLock<HashMap<String, String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace<S: Into<String>>(namespace: S) -> Self {
        Self {
            namespace: namespace.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn key(&self, kind: &str, name: &str) -> String {
        format!("{}:{}:{}", self.namespace, kind, name)
    }

    /// All stored keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl TwinStore for MemoryStore {
    async fn save_str(&self, kind: &str, name: &str, data: &str) -> TwinResult<()> {
        let key = self.key(kind, name);
        debug!("Storing {} bytes under {}", data.len(), key);
        self.entries.write().await.insert(key, data.to_string());
        Ok(())
    }

    async fn load_str(&self, kind: &str, name: &str) -> TwinResult<Option<String>> {
        Ok(self.entries.read().await.get(&self.key(kind, name)).cloned())
    }
}

/// Typed access to a [`TwinStore`]
#[derive(Clone)]
pub struct TwinRepository {
    store: Arc<dyn TwinStore>,
    codec: Arc<dyn ModelCodec>,
}

impl TwinRepository {
    /// Repository using the JSON codec
    pub fn new(store: Arc<dyn TwinStore>) -> Self {
        Self::with_codec(store, Arc::new(JsonCodec::new()))
    }

    pub fn with_codec(store: Arc<dyn TwinStore>, codec: Arc<dyn ModelCodec>) -> Self {
        Self { store, codec }
    }

    async fn load_required(&self, kind: &str, name: &str) -> TwinResult<String> {
        self.store
            .load_str(kind, name)
            .await?
            .ok_or_else(|| TwinError::store(format!("{}:{}", kind, name), "no such entry"))
    }

    pub async fn save_model(&self, name: &str, params: &ModelParams) -> TwinResult<()> {
        let data = self.codec.encode(params)?;
        self.store.save_str(KIND_TWIN_MODEL, name, &data).await?;
        info!("Saved {} model '{}'", params.model_type(), name);
        Ok(())
    }

    pub async fn load_model(&self, name: &str) -> TwinResult<ModelParams> {
        let data = self.load_required(KIND_TWIN_MODEL, name).await?;
        self.codec.decode(&data)
    }

    /// Stored under the traffic model's own name
    pub async fn save_forecast_params(&self, params: &ForecastParams) -> TwinResult<()> {
        let data = self.codec.encode_forecast_params(params)?;
        self.store
            .save_str(KIND_TRAFFIC_PARAMS, &params.model_name, &data)
            .await?;
        info!("Saved traffic model '{}'", params.model_name);
        Ok(())
    }

    pub async fn load_forecast_params(&self, name: &str) -> TwinResult<ForecastParams> {
        let data = self.load_required(KIND_TRAFFIC_PARAMS, name).await?;
        self.codec.decode_forecast_params(&data)
    }

    pub async fn save_forecast(&self, name: &str, forecast: &ForecastSeries) -> TwinResult<()> {
        let data = serde_json::to_string(forecast)?;
        self.store.save_str(KIND_TRAFFIC_PREDICTIONS, name, &data).await
    }

    pub async fn load_forecast(&self, name: &str) -> TwinResult<ForecastSeries> {
        let data = self.load_required(KIND_TRAFFIC_PREDICTIONS, name).await?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Store the result series and summary of a finished run under its name
    pub async fn save_simulation(&self, outcome: &SimulationOutcome) -> TwinResult<()> {
        let traffic = serde_json::to_string(&outcome.results)?;
        let summary = serde_json::to_string(&outcome.summary)?;
        self.store
            .save_str(KIND_SIMULATION_TRAFFIC, &outcome.name, &traffic)
            .await?;
        self.store
            .save_str(KIND_SIMULATION_SUMMARY, &outcome.name, &summary)
            .await?;
        info!(
            "Saved simulation '{}' ({} hours, total cost {:.2})",
            outcome.name, outcome.summary.hours, outcome.summary.total_cost
        );
        Ok(())
    }

    pub async fn load_simulation_results(&self, name: &str) -> TwinResult<ResultSeries> {
        let data = self.load_required(KIND_SIMULATION_TRAFFIC, name).await?;
        Ok(serde_json::from_str(&data)?)
    }

    pub async fn load_simulation_summary(&self, name: &str) -> TwinResult<SimulationSummary> {
        let data = self.load_required(KIND_SIMULATION_SUMMARY, name).await?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl std::fmt::Debug for TwinRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwinRepository").finish_non_exhaustive()
    }
}
