//! One simulation tick: count, turn, move, wrap, refresh ghosts.

use crate::mirror::{GhostSet, ToroidalMirror};
use crate::neighbors::{count_all_parallel, count_neighbors, NeighborCount};
use crate::particle_store::{Particle, ParticleStore};
use rayon::prelude::*;
use swarm_common::{angle_to_vec, normalize_angle, SimParams, UpdateOrder};

/// New heading from the turning rule:
/// `heading + alpha + beta * total * sign(right - left)`, normalized.
#[inline(always)]
pub fn turn(heading: f64, count: NeighborCount, alpha: f64, beta: f64) -> f64 {
    let delta = alpha + beta * count.total() as f64 * count.asymmetry();
    normalize_angle(heading + delta)
}

/// Brings a coordinate that left `[0, extent)` by less than one extent back
/// into range with a single shift. Larger overshoots are prevented by
/// requiring `2 * speed < min(width, height)` at initialization.
#[inline(always)]
pub fn wrap_coordinate(value: f64, extent: f64) -> f64 {
    if value < 0.0 {
        let wrapped = extent + value;
        // `extent + (-ε)` can round to `extent` itself.
        if wrapped >= extent { 0.0 } else { wrapped }
    } else if value >= extent {
        value - extent
    } else {
        value
    }
}

/// Applies turn, move and wrap to one particle given its neighbor count.
#[inline(always)]
pub fn advance(particle: &Particle, count: NeighborCount, params: &SimParams) -> Particle {
    let heading = turn(particle.heading, count, params.alpha, params.beta);
    let step = angle_to_vec(heading).scale(params.step_length());
    Particle {
        x: wrap_coordinate(particle.x + step.x, params.width),
        y: wrap_coordinate(particle.y + step.y, params.height),
        heading,
        neighbor_count: count.total(),
        render_tag: particle.render_tag,
    }
}

/// Runs one tick over the whole population in the configured order.
pub fn run_tick(store: &mut ParticleStore, mirror: &mut ToroidalMirror, params: &SimParams) {
    match params.update_order {
        UpdateOrder::Synchronous => tick_synchronous(store, mirror, params),
        UpdateOrder::Sequential => tick_sequential(store, mirror, params),
    }
}

/// All counts come from the pre-tick state and ghosts. Updates are written to
/// the second buffer, buffers are swapped, then every ghost set is rebuilt.
fn tick_synchronous(store: &mut ParticleStore, mirror: &mut ToroidalMirror, params: &SimParams) {
    {
        let (current, next) = store.split_for_update();

        // --- 1. Count (Parallel, read-only) ---
        let counts = count_all_parallel(current, mirror.sets(), params);

        // --- 2-4. Turn, Move, Wrap (Parallel, into the output buffer) ---
        next.par_iter_mut()
            .zip(current.par_iter())
            .zip(counts.par_iter())
            .for_each(|((out, particle), count)| {
                *out = advance(particle, *count, params);
            });
    }

    // --- Swap Buffers: Output becomes Input for next tick ---
    store.swap_buffers();

    // --- 5. Mirror refresh ---
    mirror.refresh_all(store.particles(), params);
}

/// In-place, index order. Particle `i` sees particles `j < i` at their
/// already-moved positions with refreshed ghosts.
fn tick_sequential(store: &mut ParticleStore, mirror: &mut ToroidalMirror, params: &SimParams) {
    let particles = store.current_mut();
    let ghosts = mirror.sets_mut();
    for i in 0..particles.len() {
        let count = count_neighbors(i, particles, ghosts, params.neighbor_radius, params.fast_reject);
        let updated = advance(&particles[i], count, params);
        particles[i] = updated;
        ghosts[i] = GhostSet::refresh(&updated, params.frame, params.width, params.height);
    }
}
