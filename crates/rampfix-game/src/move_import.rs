//! Host interfaces the correction engine consumes.
//!
//! `TraceWorld` is the host's hull sweep and `MovementEntity` the per-pawn
//! accessors. Both are queried fresh every tick.

use rampfix_common::q_shared::{InteractionLayers, MoveType, PlayerBBox, Trace, TraceFilter, Vec3};

/// Sweeps a player hull through the world, with the same filter and hull
/// semantics as the host's own movement traces.
pub trait TraceWorld {
    fn trace_player_bbox(&self, start: &Vec3, end: &Vec3, bbox: &PlayerBBox, filter: &TraceFilter) -> Trace;
}

impl<T: TraceWorld + ?Sized> TraceWorld for &T {
    fn trace_player_bbox(&self, start: &Vec3, end: &Vec3, bbox: &PlayerBBox, filter: &TraceFilter) -> Trace {
        (**self).trace_player_bbox(start, end, bbox, filter)
    }
}

/// Read-only view of the moving pawn.
pub trait MovementEntity {
    /// Controller slot, or `None` when the pawn has no controller.
    fn player_slot(&self) -> Option<usize>;
    fn is_alive(&self) -> bool;
    fn is_ducked(&self) -> bool;
    fn has_ground_entity(&self) -> bool;
    fn move_type(&self) -> MoveType;
    fn interacts_with(&self) -> InteractionLayers;
    fn entity_index(&self) -> i32;
}

pub fn player_bbox<E: MovementEntity + ?Sized>(ent: &E) -> PlayerBBox {
    PlayerBBox::for_ducked(ent.is_ducked())
}

/// Filter for the movement step: the pawn's own interaction mask, itself
/// ignored.
pub fn movement_filter<E: MovementEntity + ?Sized>(ent: &E) -> TraceFilter {
    TraceFilter::player_movement(ent.interacts_with(), ent.entity_index())
}

/// Filter for ground classification, which also walks entities.
pub fn ground_filter<E: MovementEntity + ?Sized>(ent: &E) -> TraceFilter {
    movement_filter(ent).with_entities()
}

/// Walking without ground contact: the only case where a lone clip plane
/// is applied without the full plane-set pass.
pub fn is_airborne_walk<E: MovementEntity + ?Sized>(ent: &E) -> bool {
    ent.move_type() == MoveType::Walk && !ent.has_ground_entity()
}
