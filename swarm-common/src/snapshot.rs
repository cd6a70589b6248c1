use serde::{Serialize, Deserialize};

/// Marks the two particles that renderers single out. No effect on the dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderTag {
    #[default]
    None,
    Primary,
    Secondary,
}

/// A ghost copy of a particle, placed across a wrapped edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GhostView {
    pub x: f64,
    pub y: f64,
    pub neighbor_count: u32,
    pub render_tag: RenderTag,
}

/// Render-facing state of one particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleView {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub neighbor_count: u32,
    pub render_tag: RenderTag,
    /// Active ghosts only. Empty when the recording omits ghosts.
    /// Always serialized: bincode cannot skip fields.
    #[serde(default)]
    pub ghosts: Vec<GhostView>,
}

/// State of the whole swarm after a given tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of completed ticks when the snapshot was taken.
    pub step: u64,
    /// Domain dimensions, so renderers need no config.
    pub width: f64,
    pub height: f64,
    pub particles: Vec<ParticleView>,
}

impl Snapshot {
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Total active ghosts carried by this snapshot.
    pub fn ghost_count(&self) -> usize {
        self.particles.iter().map(|p| p.ghosts.len()).sum()
    }
}
