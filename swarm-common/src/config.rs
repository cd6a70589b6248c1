use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use crate::calibration::DisplayCalibration;
use crate::sim_params::{FastReject, SimParams, UpdateOrder};
use std::path::Path;

// Turning rule and motion, loaded from [model]
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub alpha_deg: f64,
    pub beta_deg: f64,
    pub speed: f64,
    pub neighbor_radius: f64,
    pub density: f64, // particles per square simulation unit
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            alpha_deg: 180.0,
            beta_deg: 17.0,
            speed: 0.67,
            neighbor_radius: 10.0,
            density: 0.028,
        }
    }
}

// Simulation domain. Explicit dimensions take precedence over display calibration.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DomainConfig {
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub display: Option<DisplayCalibration>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        DomainConfig {
            width: None,
            height: None,
            display: Some(DisplayCalibration::default()),
        }
    }
}

impl DomainConfig {
    /// Resolves the `(width, height)` of the simulation domain.
    pub fn resolve(&self) -> Result<(f64, f64)> {
        match (self.width, self.height, &self.display) {
            (Some(w), Some(h), _) => Ok((w, h)),
            (None, None, Some(display)) => display.domain_size(),
            (Some(_), None, _) | (None, Some(_), _) => {
                anyhow::bail!("domain.width and domain.height must be given together.")
            }
            (None, None, None) => {
                anyhow::bail!("domain needs either width/height or a [domain.display] table.")
            }
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DynamicsConfig {
    pub update_order: UpdateOrder,
    pub fast_reject: FastReject,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct InitialConditions {
    /// Seed for placement; entropy-seeded when absent.
    pub seed: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub total_steps: u32,
    #[serde(default = "default_record_interval")]
    pub record_interval_steps: u32,
}

fn default_record_interval() -> u32 {
    1
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig { total_steps: 1000, record_interval_steps: default_record_interval() }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Bincode,
    Messagepack,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::Messagepack => "msgpack",
        }
    }
}

// Configuration for output settings, loaded from [output]
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_frames: bool,
    #[serde(default)]
    pub save_final_positions: bool,
    #[serde(default)]
    pub include_ghosts: bool, // ghost copies in recorded frames, for edge rendering
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "swarm".to_string(),
            save_frames: true,
            save_final_positions: false,
            include_ghosts: false,
            format: OutputFormat::default(),
        }
    }
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub domain: DomainConfig,
    #[serde(default)]
    pub dynamics: DynamicsConfig,
    #[serde(default)]
    pub initial_conditions: InitialConditions,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file '{}'", path_ref.display()))?;
        let config = Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config in '{}'", path_ref.display()))?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every model value is usable before a simulation is built.
    pub fn validate(&self) -> Result<()> {
        let m = &self.model;
        for (name, value) in [("model.alpha_deg", m.alpha_deg), ("model.beta_deg", m.beta_deg)] {
            if !value.is_finite() {
                anyhow::bail!("{} must be finite (got {}).", name, value);
            }
        }
        for (name, value) in [
            ("model.speed", m.speed),
            ("model.neighbor_radius", m.neighbor_radius),
            ("model.density", m.density),
        ] {
            if !(value.is_finite() && value > 0.0) {
                anyhow::bail!("{} must be positive and finite (got {}).", name, value);
            }
        }

        let (width, height) = self.domain.resolve()?;
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            anyhow::bail!("Domain dimensions must be positive (got {}x{}).", width, height);
        }

        let n = self.get_sim_params()?.particle_count();
        if n < 2 {
            anyhow::bail!(
                "Domain {:.2}x{:.2} at density {} yields {} particle(s); at least 2 are required.",
                width,
                height,
                m.density,
                n
            );
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> Result<SimParams> {
        let (width, height) = self.domain.resolve()?;
        let m = &self.model;
        Ok(SimParams::new(
            width,
            height,
            m.density,
            m.neighbor_radius,
            m.alpha_deg.to_radians(),
            m.beta_deg.to_radians(),
            m.speed,
        )
        .with_update_order(self.dynamics.update_order)
        .with_fast_reject(self.dynamics.fast_reject))
    }
}
