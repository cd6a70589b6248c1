use crate::mirror::{GhostSet, MirrorSlot};
use crate::particle_store::Particle;
use rayon::prelude::*;
use std::f64::consts::PI;
use swarm_common::{angle_to, normalize_angle, FastReject, SimParams};

/// Side of the subject's heading a neighbor lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Left/right neighbor tally for one particle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborCount {
    pub left: u32,
    pub right: u32,
}

impl NeighborCount {
    #[inline(always)]
    pub fn total(&self) -> u32 {
        self.left + self.right
    }

    /// `sign(right - left)`: -1, 0 or +1.
    #[inline(always)]
    pub fn asymmetry(&self) -> f64 {
        match self.right.cmp(&self.left) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Less => -1.0,
            std::cmp::Ordering::Equal => 0.0,
        }
    }

    #[inline(always)]
    fn add(&mut self, side: Side) {
        match side {
            Side::Left => self.left += 1,
            Side::Right => self.right += 1,
        }
    }
}

/// A neighbor found within the radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborHit {
    /// Index of the real particle.
    pub index: usize,
    /// Ghost slot the hit came through, `None` for the real position.
    pub via: Option<MirrorSlot>,
    pub distance: f64,
    pub side: Side,
}

/// Classifies one candidate position against the subject.
///
/// Returns `None` if the candidate is rejected or out of range. A separation
/// angle less than `π` past the heading counts as right.
#[inline(always)]
fn classify(
    subject: &Particle,
    nx: f64,
    ny: f64,
    radius: f64,
    fast_reject: FastReject,
) -> Option<(f64, Side)> {
    let dx = nx - subject.x;
    let dy = ny - subject.y;

    let rejected = match fast_reject {
        FastReject::PositiveOnly => dx >= radius || dy >= radius,
        FastReject::BoundingBox => dx.abs() >= radius || dy.abs() >= radius,
    };
    if rejected {
        return None;
    }

    let distance = (dx * dx + dy * dy).sqrt();
    if distance >= radius {
        return None;
    }
    let separation = angle_to(dx, dy);
    let side = if normalize_angle(separation - subject.heading) < PI {
        Side::Right
    } else {
        Side::Left
    };
    Some((distance, side))
}

/// Calls `f` for every neighbor of particle `subject_idx` among the other real
/// particles and their active ghosts. The subject's own ghosts are skipped.
pub fn for_each_neighbor<F>(
    subject_idx: usize,
    particles: &[Particle],
    ghosts: &[GhostSet],
    radius: f64,
    fast_reject: FastReject,
    mut f: F,
) where
    F: FnMut(NeighborHit),
{
    let Some(subject) = particles.get(subject_idx) else {
        log::error!("Neighbor search for particle {} past population {}.", subject_idx, particles.len());
        return;
    };

    for (j, other) in particles.iter().enumerate() {
        if j == subject_idx {
            continue;
        }
        if let Some((distance, side)) = classify(subject, other.x, other.y, radius, fast_reject) {
            f(NeighborHit { index: j, via: None, distance, side });
        }

        let Some(set) = ghosts.get(j) else { continue };
        if !set.any_active() {
            continue;
        }
        for (slot, ghost) in set.active_slots() {
            if let Some((distance, side)) = classify(subject, ghost.x, ghost.y, radius, fast_reject) {
                f(NeighborHit { index: j, via: Some(slot), distance, side });
            }
        }
    }
}

/// Counts left/right neighbors of one particle.
pub fn count_neighbors(
    subject_idx: usize,
    particles: &[Particle],
    ghosts: &[GhostSet],
    radius: f64,
    fast_reject: FastReject,
) -> NeighborCount {
    let mut count = NeighborCount::default();
    for_each_neighbor(subject_idx, particles, ghosts, radius, fast_reject, |hit| {
        count.add(hit.side)
    });
    count
}

/// Counts neighbors for every particle against the same state (Parallel).
pub fn count_all_parallel(
    particles: &[Particle],
    ghosts: &[GhostSet],
    params: &SimParams,
) -> Vec<NeighborCount> {
    let radius = params.neighbor_radius;
    let fast_reject = params.fast_reject;
    (0..particles.len())
        .into_par_iter()
        .map(|idx| count_neighbors(idx, particles, ghosts, radius, fast_reject))
        .collect()
}
