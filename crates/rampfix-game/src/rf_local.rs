// rf_local.rs - per-player correction state and fixed solver constants

use rampfix_common::q_shared::{vector_compare, vector_normalized, vector_length, Vec3, FLT_EPSILON, MAX_PLAYERS, VEC3_ORIGIN};

use crate::error::RampFixError;

// ============================================================
// Constants
// ============================================================

/// Minimum progress (fraction, or fraction * speed) for an iteration to count
/// as movement. Guards zero-length loops.
pub const MIN_MOVE_FRACTION: f32 = 0.03125;

/// Plane normal z at or above which a surface is walkable floor.
pub const MIN_FLOOR_NORMAL: f32 = 0.7;

/// Horizontal speed below which a floor contact ends the solve.
pub const MIN_FLOOR_SPEED: f32 = 1.0;

/// Engine speed above which the host/engine speed ratio is checked.
pub const RECONCILE_MIN_SPEED: f32 = 50.0;

pub const GROUND_PROBE_DEPTH: f32 = 2.0;
pub const GROUND_PROBE_MAX_FRACTION: f32 = 0.95;
pub const GROUND_SNAP_MIN_FALL_SPEED: f32 = 64.0;

/// Lengths below this count as "no remembered plane" for ground snapping.
pub const GROUND_SNAP_MIN_NORMAL: f32 = 0.000001;

/// Pierce grid per axis; index 0 is the zero offset.
pub const PIERCE_OFFSETS: [f32; 3] = [0.0, -1.0, 1.0];
pub const PIERCE_STEPS: usize = 10;
pub const PIERCE_MIN_FRACTION: f32 = 0.1;
pub const PIERCE_FULL_FRACTION_EPSILON: f32 = FLT_EPSILON * 4.0;

/// Segments shorter than this give pierce traces a zero fraction.
pub const MIN_SEGMENT_LENGTH: f32 = 1e-6;

// ============================================================
// Per-player state
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerPlayerState {
    /// Surface we believe the player is sliding against; zero or unit length.
    pub last_valid_plane_normal: Vec3,
    pub corrected_origin: Vec3,
    pub corrected_velocity: Vec3,
    pub overrode_this_tick: bool,
    pub ran_this_tick: bool,
}

impl Default for PerPlayerState {
    fn default() -> Self {
        Self {
            last_valid_plane_normal: VEC3_ORIGIN,
            corrected_origin: VEC3_ORIGIN,
            corrected_velocity: VEC3_ORIGIN,
            overrode_this_tick: false,
            ran_this_tick: false,
        }
    }
}

impl PerPlayerState {
    /// Adopt `normal` as the last valid plane if it has a direction.
    pub fn remember_plane(&mut self, normal: &Vec3) {
        let n = vector_normalized(normal);
        if vector_length(&n) > FLT_EPSILON {
            self.last_valid_plane_normal = n;
        }
    }

    pub fn forget_plane(&mut self) {
        self.last_valid_plane_normal = VEC3_ORIGIN;
    }

    pub fn has_plane(&self) -> bool {
        !vector_compare(&self.last_valid_plane_normal, &VEC3_ORIGIN)
    }

    /// Start of a movement pre-pass.
    pub fn begin_move(&mut self) {
        self.ran_this_tick = true;
        self.overrode_this_tick = false;
    }
}

/// One record per player slot, owned by the engine instance.
#[derive(Debug, Clone)]
pub struct PlayerTable {
    slots: Vec<PerPlayerState>,
}

impl Default for PlayerTable {
    fn default() -> Self {
        Self::new(MAX_PLAYERS)
    }
}

impl PlayerTable {
    pub fn new(max_players: usize) -> Self {
        Self {
            slots: vec![PerPlayerState::default(); max_players],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn check(&self, slot: usize) -> Result<usize, RampFixError> {
        if slot < self.slots.len() {
            Ok(slot)
        } else {
            Err(RampFixError::SlotOutOfRange {
                slot,
                max: self.slots.len(),
            })
        }
    }

    pub fn get(&self, slot: usize) -> Result<&PerPlayerState, RampFixError> {
        self.check(slot).map(|s| &self.slots[s])
    }

    pub fn get_mut(&mut self, slot: usize) -> Result<&mut PerPlayerState, RampFixError> {
        let s = self.check(slot)?;
        Ok(&mut self.slots[s])
    }

    /// Zero the record, e.g. when the slot's client disconnects.
    pub fn clear(&mut self, slot: usize) {
        if let Ok(state) = self.get_mut(slot) {
            *state = PerPlayerState::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_starts_zeroed() {
        let table = PlayerTable::default();
        assert_eq!(table.len(), MAX_PLAYERS);
        assert_eq!(*table.get(0).unwrap(), PerPlayerState::default());
        assert!(!table.get(MAX_PLAYERS - 1).unwrap().has_plane());
    }

    #[test]
    fn test_out_of_range_slot() {
        let mut table = PlayerTable::new(4);
        assert_eq!(
            table.get(4).unwrap_err(),
            RampFixError::SlotOutOfRange { slot: 4, max: 4 }
        );
        assert!(table.get_mut(9).is_err());
        table.clear(9);
    }

    #[test]
    fn test_remember_plane_normalizes_and_ignores_zero() {
        let mut st = PerPlayerState::default();
        st.remember_plane(&[0.0, 0.0, 2.0]);
        assert_eq!(st.last_valid_plane_normal, [0.0, 0.0, 1.0]);
        st.remember_plane(&VEC3_ORIGIN);
        assert_eq!(st.last_valid_plane_normal, [0.0, 0.0, 1.0]);
        st.forget_plane();
        assert!(!st.has_plane());
    }

    #[test]
    fn test_clear_isolated_per_slot() {
        let mut table = PlayerTable::new(2);
        table.get_mut(0).unwrap().remember_plane(&[1.0, 0.0, 0.0]);
        table.get_mut(1).unwrap().remember_plane(&[0.0, 1.0, 0.0]);
        table.clear(0);
        assert!(!table.get(0).unwrap().has_plane());
        assert!(table.get(1).unwrap().has_plane());
    }

    #[test]
    fn test_begin_move_resets_override() {
        let mut st = PerPlayerState {
            overrode_this_tick: true,
            ..PerPlayerState::default()
        };
        st.begin_move();
        assert!(st.ran_this_tick);
        assert!(!st.overrode_this_tick);
    }
}
