// src/config.rs

//! What-if run configuration.
//!
//! A [`SimulationConfig`] names a forecast horizon, the traffic model that fills
//! it, the capacity model under test and the latency SLA. It can be built in
//! code or loaded from JSON or (with the `config-toml` feature) TOML:
//!
//! ```toml
//! name = "checkout-autoscaling"
//! from = "2025-01-01"
//! to = "2025-12-31"
//!
//! [forecast]
//! model_name = "checkout"
//! base_volume = 1200.0
//! yearly_growth_rate = 1.15
//!
//! [[forecast.monthly_corrections]]
//! month = 12
//! factor = 1.6
//!
//! [model]
//! model_type = "autoscaling"
//! maxrate_rph = 5000.0
//! per_vm_hourcost = 0.9
//! avg_latency_s = 12.0
//! policy = "fifo"
//! fixed_hourcost = 0.0
//! up_pct_trigger = 80.0
//! up_delay = 2
//! down_pct_trigger = 20.0
//! down_delay = 2
//!
//! [sla]
//! latency_sla_limit = 70.0
//! latency_sla_percent = 99.0
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TwinError, TwinResult};
use crate::forecast::ForecastParams;
use crate::models::ModelParams;
use crate::types::SlaSpec;

/// One complete what-if run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Name the simulation outputs are stored under
    pub name: String,
    /// First day of the horizon
    pub from: NaiveDate,
    /// Last day of the horizon (inclusive)
    pub to: NaiveDate,
    pub forecast: ForecastParams,
    pub model: ModelParams,
    #[serde(default)]
    pub sla: SlaSpec,
}

impl SimulationConfig {
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
    }

    pub fn validate(&self) -> TwinResult<()> {
        if self.to < self.from {
            return Err(TwinError::invalid_range(self.from, self.to));
        }
        self.forecast.validate()?;
        self.model.validate()?;
        if !self.sla.latency_sla_limit.is_finite() || !self.sla.latency_sla_percent.is_finite() {
            return Err(TwinError::config("SLA limit and percent must be finite"));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(text: &str) -> TwinResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| TwinError::config(format!("Invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML configuration
    #[cfg(feature = "config-toml")]
    pub fn from_toml_str(text: &str) -> TwinResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, choosing the format from its extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> TwinResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        debug!("Loaded configuration from {}", path.display());

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            #[cfg(feature = "config-toml")]
            Some("toml") => Self::from_toml_str(&text),
            _ => Err(TwinError::config(format!(
                "Unsupported configuration format: {}",
                path.display()
            ))),
        }
    }

    /// Pretty JSON form of this configuration
    pub fn to_json_string(&self) -> TwinResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating simulation configurations easily
#[derive(Debug, Default)]
pub struct SimulationConfigBuilder {
    name: Option<String>,
    range: Option<(NaiveDate, NaiveDate)>,
    forecast: Option<ForecastParams>,
    model: Option<ModelParams>,
    sla: SlaSpec,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Both days inclusive
    pub fn range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.range = Some((from, to));
        self
    }

    pub fn forecast(mut self, forecast: ForecastParams) -> Self {
        self.forecast = Some(forecast);
        self
    }

    pub fn model(mut self, model: ModelParams) -> Self {
        self.model = Some(model);
        self
    }

    pub fn sla(mut self, sla: SlaSpec) -> Self {
        self.sla = sla;
        self
    }

    /// Fails with a configuration error when a required part is missing
    pub fn build(self) -> TwinResult<SimulationConfig> {
        let (from, to) = self.range.ok_or_else(|| TwinError::config("Missing forecast date range"))?;
        let forecast = self.forecast.ok_or_else(|| TwinError::config("Missing traffic model"))?;
        let model = self.model.ok_or_else(|| TwinError::config("Missing capacity model"))?;

        let config = SimulationConfig {
            name: self.name.unwrap_or_else(|| format!("{}-{}", forecast.model_name, model.model_type())),
            from,
            to,
            forecast,
            model,
            sla: self.sla,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SimpleParams;
    use crate::types::Policy;
    #[cfg(feature = "config-toml")]
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn model() -> ModelParams {
        ModelParams::Simple(SimpleParams {
            maxrate_rph: 800.0,
            per_vm_hourcost: 0.5,
            avg_latency_s: 3.0,
            policy: Policy::Fifo,
        })
    }

    #[cfg(feature = "config-toml")]
    const TOML_CONFIG: &str = r#"
name = "toml-run"
from = "2025-03-01"
to = "2025-03-07"

[forecast]
model_name = "orders"
base_volume = 400.0
yearly_growth_rate = 1.1

[[forecast.hourly_corrections]]
day_of_week = "SUN"
hour = 3
factor = 0.2

[model]
model_type = "autoscaling_fine"
maxrate_rph = 3600.0
per_vm_hourcost = 1.0
avg_latency_s = 2.0
policy = "lifo"
fixed_hourcost = 0.25
up_pct_trigger = 80.0
up_delay = 300
down_pct_trigger = 20.0
down_delay = 600
"#;

    #[test]
    fn test_builder_defaults() {
        let config = SimulationConfig::builder()
            .range(date(2025, 1, 1), date(2025, 1, 31))
            .forecast(ForecastParams::new("orders", 100.0, 1.0))
            .model(model())
            .build()
            .unwrap();

        assert_eq!(config.name, "orders-simple");
        assert_eq!(config.sla, SlaSpec::default());
    }

    #[test]
    fn test_builder_missing_parts() {
        let err = SimulationConfig::builder().model(model()).build().unwrap_err();
        assert!(matches!(err, TwinError::Config { .. }));
    }

    #[test]
    fn test_inverted_range() {
        let err = SimulationConfig::builder()
            .range(date(2025, 2, 1), date(2025, 1, 1))
            .forecast(ForecastParams::new("orders", 100.0, 1.0))
            .model(model())
            .build()
            .unwrap_err();
        assert!(matches!(err, TwinError::InvalidRange { .. }));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimulationConfig::builder()
            .name("json-run")
            .range(date(2025, 1, 1), date(2025, 1, 2))
            .forecast(ForecastParams::new("orders", 100.0, 1.0))
            .model(model())
            .build()
            .unwrap();

        let text = config.to_json_string().unwrap();
        assert!(text.contains("\"from\": \"2025-01-01\""));
        assert_eq!(SimulationConfig::from_json_str(&text).unwrap(), config);
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn test_toml_config() {
        let config = SimulationConfig::from_toml_str(TOML_CONFIG).unwrap();
        assert_eq!(config.name, "toml-run");
        assert_eq!(config.model.model_type(), "autoscaling_fine");
        assert_eq!(config.model.policy(), Policy::Lifo);
        assert_eq!(config.forecast.hourly_corrections.len(), 1);
        assert_eq!(config.sla.latency_sla_limit, 70.0);
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("run.toml");
        std::fs::File::create(&toml_path)
            .unwrap()
            .write_all(TOML_CONFIG.as_bytes())
            .unwrap();
        assert_eq!(SimulationConfig::from_file(&toml_path).unwrap().name, "toml-run");

        let yaml_path = dir.path().join("run.yaml");
        std::fs::write(&yaml_path, "name: nope").unwrap();
        assert!(matches!(
            SimulationConfig::from_file(&yaml_path),
            Err(TwinError::Config { .. })
        ));

        assert!(matches!(
            SimulationConfig::from_file(dir.path().join("missing.json")),
            Err(TwinError::Io { .. })
        ));
    }
}
