use crate::engine::run_tick;
use crate::error::{Result, SimError};
use crate::mirror::{GhostSet, ToroidalMirror};
use crate::particle_store::{Particle, ParticleStore};
use log::{debug, info, trace};
use serde::Serialize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use swarm_common::{normalize_angle, ParticleView, SimParams, SimulationConfig, Snapshot};

const MAX_EXPECTED_NEIGHBORS: usize = 64; // histogram size; larger counts land in the last bin

/// Summary of the last computed neighbor counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborStats {
    pub mean: f64,
    pub max: u32,
    /// `histogram[k]` is the number of particles with `k` neighbors; the last bin also holds larger counts.
    pub histogram: Vec<u32>,
}

/// Read-only view of the swarm for renderers.
#[derive(Debug, Clone, Copy)]
pub struct SwarmView<'a> {
    particles: &'a [Particle],
    ghosts: &'a [GhostSet],
    step: u64,
    width: f64,
    height: f64,
}

impl<'a> SwarmView<'a> {
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn dimensions(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn particles(&self) -> &'a [Particle] {
        self.particles
    }

    /// Particles in index order, each with its ghost set.
    pub fn iter(&self) -> impl Iterator<Item = (&'a Particle, &'a GhostSet)> + 'a {
        self.particles.iter().zip(self.ghosts.iter())
    }

    /// Owned, serializable copy of this view.
    pub fn to_snapshot(&self, include_ghosts: bool) -> Snapshot {
        let particles = self
            .iter()
            .map(|(p, set)| ParticleView {
                x: p.x,
                y: p.y,
                heading: p.heading,
                neighbor_count: p.neighbor_count,
                render_tag: p.render_tag,
                ghosts: if include_ghosts {
                    set.active().map(|g| g.to_view()).collect()
                } else {
                    Vec::new()
                },
            })
            .collect();
        Snapshot { step: self.step, width: self.width, height: self.height, particles }
    }
}

/// Checks parameters and returns the derived population size.
pub fn validate_params(params: &SimParams) -> Result<usize> {
    for (name, value) in [
        ("width", params.width),
        ("height", params.height),
        ("density", params.density),
        ("neighbor_radius", params.neighbor_radius),
        ("speed", params.speed),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(SimError::invalid(format!("{name} must be positive and finite, got {value}")));
        }
    }
    for (name, value) in [("alpha", params.alpha), ("beta", params.beta), ("frame", params.frame)] {
        if !value.is_finite() {
            return Err(SimError::invalid(format!("{name} must be finite, got {value}")));
        }
    }
    // A tick must never carry a particle more than one domain width past an edge.
    let shortest_side = params.width.min(params.height);
    if params.step_length() >= shortest_side {
        return Err(SimError::invalid(format!(
            "per-tick displacement {} must be smaller than the shortest domain side {}",
            params.step_length(),
            shortest_side
        )));
    }
    let n = params.particle_count();
    if n < 2 {
        return Err(SimError::invalid(format!(
            "{}x{} at density {} yields {} particle(s); at least 2 are required",
            params.width, params.height, params.density, n
        )));
    }
    Ok(n)
}

/// Owns the swarm and the parameters it runs under.
#[derive(Debug)]
pub struct Simulation {
    params: SimParams,
    store: ParticleStore,
    mirror: ToroidalMirror,
    /// Placement RNG, reused by `reinitialize`.
    rng: StdRng,
    current_step: u64,
    recorded_snapshots: Vec<Snapshot>,
    record_ghosts: bool,
}

impl Simulation {
    /// Creates a simulation with `ceil(width * height * density)` randomly placed particles.
    pub fn new(params: SimParams, mut rng: StdRng) -> Result<Self> {
        let n = validate_params(&params)?;
        let store = ParticleStore::initialize(n, params.width, params.height, &mut rng)?;
        let mirror = ToroidalMirror::build(store.particles(), &params);
        info!(
            "Swarm initialized: {} particles on {:.2}x{:.2}, {} ghosts active.",
            n,
            params.width,
            params.height,
            mirror.total_active()
        );
        debug!("Simulation Parameters: {:#?}", params);
        Ok(Self {
            params,
            store,
            mirror,
            rng,
            current_step: 0,
            recorded_snapshots: Vec::new(),
            record_ghosts: false,
        })
    }

    pub fn from_seed(params: SimParams, seed: u64) -> Result<Self> {
        Self::new(params, StdRng::seed_from_u64(seed))
    }

    /// Builds a simulation from a loaded configuration.
    pub fn from_config(config: &SimulationConfig) -> anyhow::Result<Self> {
        let params = config.get_sim_params()?;
        let rng = match config.initial_conditions.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut sim = Self::new(params, rng)?;
        sim.record_ghosts = config.output.include_ghosts;
        Ok(sim)
    }

    /// Starts from a known population instead of random placement.
    ///
    /// Positions must lie inside the domain; headings are normalized. The
    /// population size is taken from `particles`, not from the density.
    pub fn with_particles(params: SimParams, mut particles: Vec<Particle>) -> Result<Self> {
        if particles.len() < 2 {
            return Err(SimError::invalid(format!(
                "at least 2 particles are required, got {}",
                particles.len()
            )));
        }
        let mut probe = params.clone();
        probe.density = probe.density.max(2.0 / (params.width * params.height));
        validate_params(&probe)?;

        for (idx, p) in particles.iter_mut().enumerate() {
            if !(p.x >= 0.0 && p.x < params.width && p.y >= 0.0 && p.y < params.height) {
                return Err(SimError::invalid(format!(
                    "particle {idx} at ({}, {}) lies outside {}x{}",
                    p.x, p.y, params.width, params.height
                )));
            }
            p.heading = normalize_angle(p.heading);
        }
        let store = ParticleStore::from_particles(particles)?;
        let mirror = ToroidalMirror::build(store.particles(), &params);
        Ok(Self {
            params,
            store,
            mirror,
            rng: StdRng::seed_from_u64(0),
            current_step: 0,
            recorded_snapshots: Vec::new(),
            record_ghosts: false,
        })
    }

    /// Advances the simulation by one tick.
    pub fn step(&mut self) {
        run_tick(&mut self.store, &mut self.mirror, &self.params);
        self.current_step += 1;
        trace!("Tick {} complete.", self.current_step);
    }

    /// Read-only view for renderers.
    pub fn snapshot(&self) -> SwarmView<'_> {
        SwarmView {
            particles: self.store.particles(),
            ghosts: self.mirror.sets(),
            step: self.current_step,
            width: self.params.width,
            height: self.params.height,
        }
    }

    /// Discards the population and places a fresh one under new parameters.
    /// On error the current state is left untouched. Recorded snapshots are kept.
    pub fn reinitialize(&mut self, params: SimParams) -> Result<()> {
        let n = validate_params(&params)?;
        let store = ParticleStore::initialize(n, params.width, params.height, &mut self.rng)?;
        let mirror = ToroidalMirror::build(store.particles(), &params);
        info!(
            "Swarm reinitialized: {} particles on {:.2}x{:.2} (was {} on {:.2}x{:.2}).",
            n,
            params.width,
            params.height,
            self.store.len(),
            self.params.width,
            self.params.height
        );
        self.params = params;
        self.store = store;
        self.mirror = mirror;
        self.current_step = 0;
        Ok(())
    }

    /// Whether recorded snapshots carry ghost copies.
    pub fn set_record_ghosts(&mut self, record_ghosts: bool) {
        self.record_ghosts = record_ghosts;
    }

    /// Stores a snapshot of the current state.
    pub fn record_snapshot(&mut self) {
        let stats = self.neighbor_stats();
        debug!(
            "Recording snapshot at tick {}: avg_neighbors={:.2}, max_neighbors={}",
            self.current_step, stats.mean, stats.max
        );
        let snapshot = self.snapshot().to_snapshot(self.record_ghosts);
        self.recorded_snapshots.push(snapshot);
    }

    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }

    /// Summarizes the neighbor counts from the last tick.
    pub fn neighbor_stats(&self) -> NeighborStats {
        let mut histogram = vec![0u32; MAX_EXPECTED_NEIGHBORS];
        let mut total: u64 = 0;
        let mut max = 0;
        for p in self.store.particles() {
            total += p.neighbor_count as u64;
            max = max.max(p.neighbor_count);
            let bin = (p.neighbor_count as usize).min(MAX_EXPECTED_NEIGHBORS - 1);
            histogram[bin] += 1;
        }
        let n = self.store.len();
        let mean = if n > 0 { total as f64 / n as f64 } else { 0.0 };
        NeighborStats { mean, max, histogram }
    }

    pub fn particle(&self, index: usize) -> Result<&Particle> {
        self.store.get(index)
    }

    /// Current `(x, y)` of every particle.
    pub fn positions(&self) -> Vec<(f64, f64)> {
        self.store.particles().iter().map(|p| (p.x, p.y)).collect()
    }

    pub fn particle_count(&self) -> usize {
        self.store.len()
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_common::RenderTag;

    fn params() -> SimParams {
        SimParams::new(60.0, 40.0, 0.0625, 6.0, 0.3, 0.2, 0.67)
    }

    #[test]
    fn new_derives_population() {
        let sim = Simulation::from_seed(params(), 1).unwrap();
        assert_eq!(sim.particle_count(), 150);
        assert_eq!(sim.current_step(), 0);
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut p = params();
        p.neighbor_radius = 0.0;
        assert!(Simulation::from_seed(p, 1).unwrap_err().is_configuration());

        let mut p = params();
        p.width = f64::NAN;
        assert!(Simulation::from_seed(p, 1).is_err());

        let mut p = params();
        p.speed = 25.0; // 50 units per tick on a 40-unit side
        assert!(Simulation::from_seed(p, 1).is_err());

        let p = SimParams::new(10.0, 10.0, 0.005, 2.0, 0.0, 0.0, 1.0);
        assert!(Simulation::from_seed(p, 1).is_err());
    }

    #[test]
    fn step_counts_ticks() {
        let mut sim = Simulation::from_seed(params(), 2).unwrap();
        for _ in 0..5 {
            sim.step();
        }
        assert_eq!(sim.current_step(), 5);
        assert_eq!(sim.snapshot().step(), 5);
    }

    #[test]
    fn view_exposes_ghosts_in_snapshot() {
        let particles = vec![
            Particle::new(1.0, 20.0, 0.0),
            Particle::new(30.0, 20.0, 0.0),
        ];
        let sim = Simulation::with_particles(params(), particles).unwrap();
        let with = sim.snapshot().to_snapshot(true);
        assert_eq!(with.ghost_count(), 1);
        assert_eq!(with.particles[0].ghosts[0].x, 61.0);
        assert_eq!(with.particles[0].render_tag, RenderTag::Primary);
        let without = sim.snapshot().to_snapshot(false);
        assert_eq!(without.ghost_count(), 0);
    }

    #[test]
    fn with_particles_checks_domain() {
        let particles = vec![Particle::new(1.0, 1.0, 0.0), Particle::new(60.0, 1.0, 0.0)];
        assert!(Simulation::with_particles(params(), particles).is_err());
    }

    #[test]
    fn with_particles_normalizes_headings() {
        let particles = vec![Particle::new(1.0, 1.0, -0.5), Particle::new(5.0, 1.0, 7.0)];
        let sim = Simulation::with_particles(params(), particles).unwrap();
        for p in sim.snapshot().particles() {
            assert!((0.0..std::f64::consts::TAU).contains(&p.heading));
        }
    }

    #[test]
    fn reinitialize_replaces_population() {
        let mut sim = Simulation::from_seed(params(), 3).unwrap();
        sim.step();
        let bigger = SimParams::new(80.0, 50.0, 0.0625, 6.0, 0.3, 0.2, 0.67);
        sim.reinitialize(bigger.clone()).unwrap();
        assert_eq!(sim.particle_count(), 250);
        assert_eq!(sim.current_step(), 0);
        assert_eq!(sim.params(), &bigger);
    }

    #[test]
    fn failed_reinitialize_keeps_state() {
        let mut sim = Simulation::from_seed(params(), 4).unwrap();
        let before = sim.positions();
        let mut bad = params();
        bad.density = -1.0;
        assert!(sim.reinitialize(bad).is_err());
        assert_eq!(sim.positions(), before);
        assert_eq!(sim.params(), &params());
    }

    #[test]
    fn recording_and_stats() {
        let mut sim = Simulation::from_seed(params(), 5).unwrap();
        sim.record_snapshot();
        sim.step();
        sim.record_snapshot();
        let recorded = sim.recorded_snapshots();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].step, 0);
        assert_eq!(recorded[1].step, 1);
        let stats = sim.neighbor_stats();
        let binned: u32 = stats.histogram.iter().sum();
        assert_eq!(binned as usize, sim.particle_count());
    }
}
