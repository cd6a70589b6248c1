pub mod calibration;
pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use calibration::DisplayCalibration;
pub use config::{SimulationConfig, ModelConfig, DomainConfig, DynamicsConfig, InitialConditions, TimingConfig, OutputConfig, OutputFormat};
pub use sim_params::{SimParams, UpdateOrder, FastReject};
pub use snapshot::{Snapshot, ParticleView, GhostView, RenderTag};
pub use vecmath::{Vec2, normalize_angle, angle_to, angle_to_vec};
