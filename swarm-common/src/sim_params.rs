use serde::{Deserialize, Serialize};

/// How a tick applies the per-particle updates.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOrder {
    /// Every count reads the pre-tick state; moves land in a second buffer.
    #[default]
    Synchronous,
    /// Particles update in place in index order, so later particles see
    /// earlier particles' new positions within the same tick.
    Sequential,
}

/// Cheap pre-test applied before the exact distance check.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FastReject {
    /// Skip only when `dx >= r || dy >= r`. Far candidates in the negative
    /// direction fall through to the distance test.
    #[default]
    PositiveOnly,
    /// Skip when `|dx| >= r || |dy| >= r`.
    BoundingBox,
}

/// Simulation parameters derived from the configuration, used frequently during simulation steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    // Domain
    pub width: f64,
    pub height: f64,

    // Turning rule (radians)
    pub alpha: f64, // intrinsic turn per step
    pub beta: f64,  // turn per neighbor, signed by right/left asymmetry

    // Motion & sensing
    pub speed: f64,
    pub neighbor_radius: f64,
    pub frame: f64, // width of the toroidal mirror band, equal to the radius
    pub density: f64, // particles per square unit

    pub update_order: UpdateOrder,
    pub fast_reject: FastReject,
}

impl SimParams {
    /// Builds parameters with the default update order and fast-reject rule.
    pub fn new(
        width: f64,
        height: f64,
        density: f64,
        neighbor_radius: f64,
        alpha: f64,
        beta: f64,
        speed: f64,
    ) -> Self {
        SimParams {
            width,
            height,
            alpha,
            beta,
            speed,
            neighbor_radius,
            frame: neighbor_radius,
            density,
            update_order: UpdateOrder::default(),
            fast_reject: FastReject::default(),
        }
    }

    pub fn with_update_order(mut self, update_order: UpdateOrder) -> Self {
        self.update_order = update_order;
        self
    }

    pub fn with_fast_reject(mut self, fast_reject: FastReject) -> Self {
        self.fast_reject = fast_reject;
        self
    }

    pub fn model_area(&self) -> f64 {
        self.width * self.height
    }

    /// `ceil(width * height * density)`; zero for non-finite or negative products.
    pub fn particle_count(&self) -> usize {
        let n = (self.model_area() * self.density).ceil();
        if n.is_finite() && n > 0.0 {
            n as usize
        } else {
            0
        }
    }

    /// Distance a particle covers in one tick.
    pub fn step_length(&self) -> f64 {
        self.speed * 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_count_rounds_up() {
        let params = SimParams::new(100.0, 100.0, 0.028, 10.0, 0.0, 0.0, 1.0);
        assert_eq!(params.particle_count(), 280);
        let params = SimParams::new(10.0, 10.0, 0.015, 10.0, 0.0, 0.0, 1.0);
        assert_eq!(params.particle_count(), 2);
    }

    #[test]
    fn frame_tracks_radius() {
        let params = SimParams::new(50.0, 50.0, 0.1, 7.5, 0.0, 0.0, 1.0);
        assert_eq!(params.frame, 7.5);
    }

    #[test]
    fn builders_override_modes() {
        let params = SimParams::new(50.0, 50.0, 0.1, 5.0, 0.0, 0.0, 1.0)
            .with_update_order(UpdateOrder::Sequential)
            .with_fast_reject(FastReject::BoundingBox);
        assert_eq!(params.update_order, UpdateOrder::Sequential);
        assert_eq!(params.fast_reject, FastReject::BoundingBox);
    }
}
