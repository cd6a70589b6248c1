//! Toroidal mirroring.
//!
//! A particle within `frame` of an edge gets ghost copies placed just
//! outside the opposite edge(s), so a plain Euclidean distance test sees the
//! wrapped distance to particles near that opposite edge.
//!
//! ```text
//!   TL |      Top      | TR
//!   ---+---+-------+---+---
//!      |   |  top  |   |
//!      +---+-------+---+
//!   L  | l |       | r |  R
//!      +---+-------+---+
//!      |   | bottom|   |
//!   ---+---+-------+---+---
//!   BL |    Bottom     | BR
//! ```

use crate::error::{Result, SimError};
use crate::particle_store::Particle;
use rayon::prelude::*;
use swarm_common::{GhostView, RenderTag, SimParams};

pub const GHOST_SLOTS: usize = 8;

/// Ghost slot, named after the edge region the source particle is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorSlot {
    /// Near the left edge, copied to `x + width`.
    Left,
    /// Near the right edge, copied to `x - width`.
    Right,
    /// Near the top edge (`y < frame`), copied to `y + height`.
    Top,
    /// Near the bottom edge, copied to `y - height`.
    Bottom,
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl MirrorSlot {
    pub const ALL: [MirrorSlot; GHOST_SLOTS] = [
        MirrorSlot::Left,
        MirrorSlot::Right,
        MirrorSlot::Top,
        MirrorSlot::Bottom,
        MirrorSlot::TopLeft,
        MirrorSlot::TopRight,
        MirrorSlot::BottomRight,
        MirrorSlot::BottomLeft,
    ];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether this slot is active for the given edge-region flags.
    /// Corner slots need both of their edges.
    #[inline(always)]
    fn is_active(self, regions: EdgeRegions) -> bool {
        match self {
            MirrorSlot::Left => regions.left,
            MirrorSlot::Right => regions.right,
            MirrorSlot::Top => regions.top,
            MirrorSlot::Bottom => regions.bottom,
            MirrorSlot::TopLeft => regions.left && regions.top,
            MirrorSlot::TopRight => regions.top && regions.right,
            MirrorSlot::BottomRight => regions.right && regions.bottom,
            MirrorSlot::BottomLeft => regions.bottom && regions.left,
        }
    }

    /// Translation applied to the source position.
    #[inline(always)]
    fn offset(self, width: f64, height: f64) -> (f64, f64) {
        match self {
            MirrorSlot::Left => (width, 0.0),
            MirrorSlot::Right => (-width, 0.0),
            MirrorSlot::Top => (0.0, height),
            MirrorSlot::Bottom => (0.0, -height),
            MirrorSlot::TopLeft => (width, height),
            MirrorSlot::TopRight => (-width, height),
            MirrorSlot::BottomRight => (-width, -height),
            MirrorSlot::BottomLeft => (width, -height),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct EdgeRegions {
    left: bool,
    right: bool,
    top: bool,
    bottom: bool,
}

impl EdgeRegions {
    #[inline(always)]
    fn of(x: f64, y: f64, frame: f64, width: f64, height: f64) -> Self {
        EdgeRegions {
            left: x < frame,
            right: x > width - frame,
            top: y < frame,
            bottom: y > height - frame,
        }
    }

    #[inline(always)]
    fn any(self) -> bool {
        self.left || self.right || self.top || self.bottom
    }
}

/// A positional copy of a particle across a wrapped edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ghost {
    pub x: f64,
    pub y: f64,
    /// Source particle's count at refresh time.
    pub neighbor_count: u32,
    pub render_tag: RenderTag,
}

impl Ghost {
    pub fn to_view(&self) -> GhostView {
        GhostView {
            x: self.x,
            y: self.y,
            neighbor_count: self.neighbor_count,
            render_tag: self.render_tag,
        }
    }
}

/// The eight ghost slots of one particle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GhostSet {
    slots: [Option<Ghost>; GHOST_SLOTS],
    any_active: bool,
}

impl GhostSet {
    /// Recomputes every slot from the particle's current position.
    pub fn refresh(particle: &Particle, frame: f64, width: f64, height: f64) -> Self {
        let regions = EdgeRegions::of(particle.x, particle.y, frame, width, height);
        if !regions.any() {
            return GhostSet::default();
        }

        let mut slots = [None; GHOST_SLOTS];
        for slot in MirrorSlot::ALL {
            if slot.is_active(regions) {
                let (dx, dy) = slot.offset(width, height);
                slots[slot.index()] = Some(Ghost {
                    x: particle.x + dx,
                    y: particle.y + dy,
                    neighbor_count: particle.neighbor_count,
                    render_tag: particle.render_tag,
                });
            }
        }
        GhostSet { slots, any_active: true }
    }

    /// Fast check used to skip particles away from every edge.
    #[inline(always)]
    pub fn any_active(&self) -> bool {
        self.any_active
    }

    pub fn get(&self, slot: MirrorSlot) -> Option<&Ghost> {
        self.slots[slot.index()].as_ref()
    }

    pub fn is_active(&self, slot: MirrorSlot) -> bool {
        self.slots[slot.index()].is_some()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Active ghosts in slot order.
    pub fn active(&self) -> impl Iterator<Item = &Ghost> + '_ {
        self.slots.iter().flatten()
    }

    /// Active ghosts with their slot.
    pub fn active_slots(&self) -> impl Iterator<Item = (MirrorSlot, &Ghost)> + '_ {
        MirrorSlot::ALL
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(&slot, ghost)| ghost.as_ref().map(|g| (slot, g)))
    }
}

/// Ghost sets for every particle, indexed like the particle store.
#[derive(Debug, Clone)]
pub struct ToroidalMirror {
    sets: Vec<GhostSet>,
}

impl ToroidalMirror {
    /// Builds ghost sets for the whole population.
    pub fn build(particles: &[Particle], params: &SimParams) -> Self {
        let mut mirror = ToroidalMirror { sets: vec![GhostSet::default(); particles.len()] };
        mirror.refresh_all(particles, params);
        mirror
    }

    /// Recomputes every ghost set (Parallel).
    pub fn refresh_all(&mut self, particles: &[Particle], params: &SimParams) {
        let (frame, width, height) = (params.frame, params.width, params.height);
        self.sets
            .par_iter_mut()
            .zip(particles.par_iter())
            .for_each(|(set, particle)| {
                *set = GhostSet::refresh(particle, frame, width, height);
            });
    }

    /// Recomputes the ghost set of one particle after it moved.
    pub fn refresh_one(&mut self, index: usize, particle: &Particle, params: &SimParams) -> Result<()> {
        let len = self.sets.len();
        let set = self.sets.get_mut(index).ok_or(SimError::IndexOutOfRange { index, len })?;
        *set = GhostSet::refresh(particle, params.frame, params.width, params.height);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&GhostSet> {
        let len = self.sets.len();
        self.sets.get(index).ok_or(SimError::IndexOutOfRange { index, len })
    }

    pub fn sets(&self) -> &[GhostSet] {
        &self.sets
    }

    pub(crate) fn sets_mut(&mut self) -> &mut [GhostSet] {
        &mut self.sets
    }

    pub fn total_active(&self) -> usize {
        self.sets.iter().map(GhostSet::active_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f64 = 100.0;
    const H: f64 = 80.0;
    const FRAME: f64 = 10.0;

    fn at(x: f64, y: f64) -> Particle {
        Particle::new(x, y, 0.0)
    }

    #[test]
    fn interior_particle_has_no_ghosts() {
        let set = GhostSet::refresh(&at(50.0, 40.0), FRAME, W, H);
        assert!(!set.any_active());
        assert_eq!(set.active_count(), 0);
    }

    #[test]
    fn top_left_corner_gets_three_ghosts() {
        let set = GhostSet::refresh(&at(FRAME / 2.0, FRAME / 2.0), FRAME, W, H);
        assert_eq!(set.active_count(), 3);
        assert!(set.is_active(MirrorSlot::Left));
        assert!(set.is_active(MirrorSlot::Top));
        assert!(set.is_active(MirrorSlot::TopLeft));
        for slot in [
            MirrorSlot::Right,
            MirrorSlot::Bottom,
            MirrorSlot::TopRight,
            MirrorSlot::BottomRight,
            MirrorSlot::BottomLeft,
        ] {
            assert!(!set.is_active(slot), "{slot:?} should be inactive");
        }
        let corner = set.get(MirrorSlot::TopLeft).unwrap();
        assert_eq!((corner.x, corner.y), (W + 5.0, H + 5.0));
    }

    #[test]
    fn edge_particle_gets_one_ghost() {
        let set = GhostSet::refresh(&at(95.0, 40.0), FRAME, W, H);
        let active: Vec<_> = set.active_slots().map(|(s, g)| (s, g.x, g.y)).collect();
        assert_eq!(active, vec![(MirrorSlot::Right, -5.0, 40.0)]);
    }

    #[test]
    fn bottom_right_corner_offsets() {
        let set = GhostSet::refresh(&at(99.0, 79.0), FRAME, W, H);
        assert_eq!(set.active_count(), 3);
        let g = set.get(MirrorSlot::BottomRight).unwrap();
        assert_eq!((g.x, g.y), (-1.0, -1.0));
        assert_eq!(set.get(MirrorSlot::Bottom).unwrap().y, -1.0);
    }

    #[test]
    fn region_bounds_are_strict() {
        // Exactly on the frame line is not inside the region.
        let set = GhostSet::refresh(&at(FRAME, W - FRAME - 20.0), FRAME, W, H);
        assert!(!set.is_active(MirrorSlot::Left));
        let set = GhostSet::refresh(&at(W - FRAME, 40.0), FRAME, W, H);
        assert!(!set.is_active(MirrorSlot::Right));
    }

    #[test]
    fn ghosts_copy_count_and_tag() {
        let mut p = at(2.0, 40.0);
        p.neighbor_count = 6;
        p.render_tag = RenderTag::Secondary;
        let set = GhostSet::refresh(&p, FRAME, W, H);
        let g = set.get(MirrorSlot::Left).unwrap();
        assert_eq!(g.neighbor_count, 6);
        assert_eq!(g.render_tag, RenderTag::Secondary);
    }

    #[test]
    fn mirror_refresh_one_checks_index() {
        let params = SimParams::new(W, H, 0.01, FRAME, 0.0, 0.0, 1.0);
        let particles = vec![at(50.0, 40.0), at(1.0, 40.0)];
        let mut mirror = ToroidalMirror::build(&particles, &params);
        assert_eq!(mirror.total_active(), 1);
        mirror.refresh_one(1, &at(50.0, 40.0), &params).unwrap();
        assert_eq!(mirror.total_active(), 0);
        assert!(mirror.refresh_one(2, &at(1.0, 1.0), &params).is_err());
    }
}
