use crate::error::{Result, SimError};
use rand::distr::{Distribution, Uniform};
use rand::Rng;
use std::f64::consts::TAU;
use swarm_common::{RenderTag, Vec2};

/// One self-propelled particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    /// Always in `[0, 2π)`.
    pub heading: f64,
    /// Total neighbors found on the last tick. Display only.
    pub neighbor_count: u32,
    pub render_tag: RenderTag,
}

impl Particle {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Particle { x, y, heading, neighbor_count: 0, render_tag: RenderTag::None }
    }

    #[inline(always)]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Holds the particle population.
///
/// The population is fixed at construction. Two buffers are kept so a tick
/// can read the pre-tick state while writing the post-tick state.
#[derive(Debug)]
pub struct ParticleStore {
    // --- Ping-Pong Buffers ---
    // Current state (this tick's input)
    current: Vec<Particle>,
    // Next state (this tick's output, next tick's input)
    next: Vec<Particle>,
}

impl ParticleStore {
    /// Places `n` particles uniformly at random in `[0, width) x [0, height)`
    /// with uniformly random headings. Particle 0 is tagged `Primary`,
    /// particle 1 `Secondary`.
    pub fn initialize<R: Rng + ?Sized>(
        n: usize,
        width: f64,
        height: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if n < 2 {
            return Err(SimError::invalid(format!(
                "at least 2 particles are required, got {n}"
            )));
        }
        let x_dist = Uniform::new(0.0, width)
            .map_err(|e| SimError::invalid(format!("width {width}: {e}")))?;
        let y_dist = Uniform::new(0.0, height)
            .map_err(|e| SimError::invalid(format!("height {height}: {e}")))?;
        let angle_dist = Uniform::new(0.0, TAU)
            .map_err(|e| SimError::invalid(format!("heading range: {e}")))?;

        let particles = (0..n)
            .map(|_| {
                let x = x_dist.sample(rng);
                let y = y_dist.sample(rng);
                let heading = angle_dist.sample(rng);
                Particle::new(x, y, heading)
            })
            .collect();
        Self::from_particles(particles)
    }

    /// Wraps an existing population. Render tags are reassigned so that exactly
    /// index 0 is `Primary` and index 1 is `Secondary`.
    pub fn from_particles(mut particles: Vec<Particle>) -> Result<Self> {
        if particles.len() < 2 {
            return Err(SimError::invalid(format!(
                "at least 2 particles are required, got {}",
                particles.len()
            )));
        }
        for (idx, p) in particles.iter_mut().enumerate() {
            p.render_tag = match idx {
                0 => RenderTag::Primary,
                1 => RenderTag::Secondary,
                _ => RenderTag::None,
            };
        }
        let next = particles.clone();
        Ok(Self { current: particles, next })
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Current state of every particle.
    pub fn particles(&self) -> &[Particle] {
        &self.current
    }

    pub fn get(&self, index: usize) -> Result<&Particle> {
        let len = self.len();
        self.current.get(index).ok_or(SimError::IndexOutOfRange { index, len })
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Particle> {
        let len = self.len();
        self.current.get_mut(index).ok_or(SimError::IndexOutOfRange { index, len })
    }

    pub fn set_position(&mut self, index: usize, x: f64, y: f64) -> Result<()> {
        let p = self.get_mut(index)?;
        p.x = x;
        p.y = y;
        Ok(())
    }

    pub fn set_heading(&mut self, index: usize, heading: f64) -> Result<()> {
        self.get_mut(index)?.heading = heading;
        Ok(())
    }

    pub fn set_neighbor_count(&mut self, index: usize, count: u32) -> Result<()> {
        self.get_mut(index)?.neighbor_count = count;
        Ok(())
    }

    /// In-place access for sequential updates. Tags are not to be touched.
    pub(crate) fn current_mut(&mut self) -> &mut [Particle] {
        &mut self.current
    }

    /// Borrows the current buffer for reading and the next buffer for writing.
    pub(crate) fn split_for_update(&mut self) -> (&[Particle], &mut [Particle]) {
        (&self.current, &mut self.next)
    }

    /// Swaps the input and output buffers.
    pub(crate) fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn initialize_places_inside_domain() {
        let mut rng = StdRng::seed_from_u64(11);
        let store = ParticleStore::initialize(500, 40.0, 25.0, &mut rng).unwrap();
        assert_eq!(store.len(), 500);
        for p in store.particles() {
            assert!((0.0..40.0).contains(&p.x));
            assert!((0.0..25.0).contains(&p.y));
            assert!((0.0..TAU).contains(&p.heading));
            assert_eq!(p.neighbor_count, 0);
        }
    }

    #[test]
    fn initialize_tags_first_two() {
        let mut rng = StdRng::seed_from_u64(3);
        let store = ParticleStore::initialize(5, 10.0, 10.0, &mut rng).unwrap();
        let tags: Vec<RenderTag> = store.particles().iter().map(|p| p.render_tag).collect();
        assert_eq!(
            tags,
            vec![
                RenderTag::Primary,
                RenderTag::Secondary,
                RenderTag::None,
                RenderTag::None,
                RenderTag::None
            ]
        );
    }

    #[test]
    fn fewer_than_two_is_invalid() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = ParticleStore::initialize(1, 10.0, 10.0, &mut rng).unwrap_err();
        assert!(err.is_configuration());
        assert!(ParticleStore::from_particles(vec![Particle::new(1.0, 1.0, 0.0)]).is_err());
    }

    #[test]
    fn zero_width_is_invalid() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(ParticleStore::initialize(4, 0.0, 10.0, &mut rng).is_err());
    }

    #[test]
    fn accessors_are_bounds_checked() {
        let mut store = ParticleStore::from_particles(vec![
            Particle::new(1.0, 2.0, 0.5),
            Particle::new(3.0, 4.0, 1.5),
        ])
        .unwrap();
        assert_eq!(store.get(1).unwrap().x, 3.0);
        assert_eq!(
            store.get(2).unwrap_err(),
            SimError::IndexOutOfRange { index: 2, len: 2 }
        );
        store.set_position(0, 7.0, 8.0).unwrap();
        store.set_heading(0, 2.0).unwrap();
        store.set_neighbor_count(0, 4).unwrap();
        let p = store.get(0).unwrap();
        assert_eq!((p.x, p.y, p.heading, p.neighbor_count), (7.0, 8.0, 2.0, 4));
        assert!(store.set_heading(5, 0.0).is_err());
    }

    #[test]
    fn swap_exchanges_buffers() {
        let mut store = ParticleStore::from_particles(vec![
            Particle::new(1.0, 1.0, 0.0),
            Particle::new(2.0, 2.0, 0.0),
        ])
        .unwrap();
        {
            let (_, next) = store.split_for_update();
            next[0].x = 9.0;
        }
        assert_eq!(store.get(0).unwrap().x, 1.0);
        store.swap_buffers();
        assert_eq!(store.get(0).unwrap().x, 9.0);
    }
}
