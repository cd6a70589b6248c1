//! Left/right turning swarm on a toroidal plane.
//!
//! Each particle counts neighbors within a radius on either side of its
//! heading and turns by `alpha + beta * N * sign(R - L)` every tick.
//! Edges wrap; particles near an edge are mirrored as ghosts so neighbor
//! searches see periodic distances.

pub mod engine;
pub mod error;
pub mod mirror;
pub mod neighbors;
pub mod particle_store;
pub mod simulation;

pub use error::{Result, SimError};
pub use mirror::{Ghost, GhostSet, MirrorSlot, ToroidalMirror};
pub use neighbors::{count_neighbors, for_each_neighbor, NeighborCount, NeighborHit, Side};
pub use particle_store::{Particle, ParticleStore};
pub use simulation::{validate_params, NeighborStats, Simulation, SwarmView};
