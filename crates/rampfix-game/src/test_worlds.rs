//! Stub worlds and pawns shared by the unit tests.

use std::cell::Cell;

use rampfix_common::q_shared::{
    dot_product, vector_compare, InteractionLayers, MoveType, PlayerBBox, Trace, TraceFilter, Vec3,
    MASK_PLAYERSOLID,
};

use crate::move_import::{MovementEntity, TraceWorld};

/// Traces stop this far (along the plane normal) short of a surface.
pub const DIST_EPSILON: f32 = 0.03125;

/// No collisions anywhere.
pub struct OpenAir;

impl TraceWorld for OpenAir {
    fn trace_player_bbox(&self, start: &Vec3, end: &Vec3, _bbox: &PlayerBBox, _filter: &TraceFilter) -> Trace {
        Trace::clear(start, end)
    }
}

/// Every trace starts in solid.
pub struct SolidEverywhere;

impl TraceWorld for SolidEverywhere {
    fn trace_player_bbox(&self, start: &Vec3, _end: &Vec3, _bbox: &PlayerBBox, _filter: &TraceFilter) -> Trace {
        Trace {
            start_pos: *start,
            end_pos: *start,
            fraction: 0.0,
            start_solid: true,
            ..Trace::default()
        }
    }
}

/// Infinite half-space: everything with `dot(normal, p) < dist` is solid.
#[derive(Clone, Copy)]
pub struct Brush {
    pub normal: Vec3,
    pub dist: f32,
}

pub struct BrushWorld {
    pub brushes: Vec<Brush>,
}

impl BrushWorld {
    /// Solid below z = 0.
    pub fn floor() -> Self {
        Self {
            brushes: vec![Brush {
                normal: [0.0, 0.0, 1.0],
                dist: 0.0,
            }],
        }
    }
}

impl TraceWorld for BrushWorld {
    fn trace_player_bbox(&self, start: &Vec3, end: &Vec3, bbox: &PlayerBBox, _filter: &TraceFilter) -> Trace {
        let mut best = Trace::clear(start, end);

        for b in &self.brushes {
            // nearest hull corner along the plane normal
            let offset: f32 = (0..3)
                .map(|i| (b.normal[i] * bbox.mins[i]).min(b.normal[i] * bbox.maxs[i]))
                .sum();
            let d0 = dot_product(&b.normal, start) + offset - b.dist;
            let d1 = dot_product(&b.normal, end) + offset - b.dist;

            if d0 < 0.0 {
                return Trace {
                    start_pos: *start,
                    end_pos: *start,
                    plane_normal: b.normal,
                    fraction: 0.0,
                    start_solid: true,
                    exact_hit_point: false,
                };
            }
            if d1 >= 0.0 {
                continue;
            }

            let t = ((d0 - DIST_EPSILON) / (d0 - d1)).clamp(0.0, 1.0);
            if t < best.fraction {
                best = Trace {
                    start_pos: *start,
                    end_pos: [
                        start[0] + t * (end[0] - start[0]),
                        start[1] + t * (end[1] - start[1]),
                        start[2] + t * (end[2] - start[2]),
                    ],
                    plane_normal: b.normal,
                    fraction: t,
                    start_solid: false,
                    exact_hit_point: false,
                };
            }
        }

        best
    }
}

/// Wraps a world so that hits from exactly `bug_start` report a bogus
/// wedge normal, the way a ramp bug presents to the movement code.
pub struct RampBugWorld {
    pub inner: BrushWorld,
    pub bug_start: Vec3,
    pub bugged_normal: Vec3,
}

impl TraceWorld for RampBugWorld {
    fn trace_player_bbox(&self, start: &Vec3, end: &Vec3, bbox: &PlayerBBox, filter: &TraceFilter) -> Trace {
        let mut tr = self.inner.trace_player_bbox(start, end, bbox, filter);
        if vector_compare(start, &self.bug_start) && tr.did_hit() && !tr.start_solid {
            tr.plane_normal = self.bugged_normal;
        }
        tr
    }
}

/// Counts calls into an inner world.
pub struct CountingWorld<W> {
    pub inner: W,
    pub calls: Cell<usize>,
}

impl<W> CountingWorld<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }
}

impl<W: TraceWorld> TraceWorld for CountingWorld<W> {
    fn trace_player_bbox(&self, start: &Vec3, end: &Vec3, bbox: &PlayerBBox, filter: &TraceFilter) -> Trace {
        self.calls.set(self.calls.get() + 1);
        self.inner.trace_player_bbox(start, end, bbox, filter)
    }
}

pub struct TestPawn {
    pub slot: Option<usize>,
    pub alive: bool,
    pub ducked: bool,
    pub on_ground: bool,
    pub move_type: MoveType,
}

impl TestPawn {
    /// Live, standing, airborne walker in `slot`.
    pub fn airborne(slot: usize) -> Self {
        Self {
            slot: Some(slot),
            alive: true,
            ducked: false,
            on_ground: false,
            move_type: MoveType::Walk,
        }
    }
}

impl MovementEntity for TestPawn {
    fn player_slot(&self) -> Option<usize> {
        self.slot
    }
    fn is_alive(&self) -> bool {
        self.alive
    }
    fn is_ducked(&self) -> bool {
        self.ducked
    }
    fn has_ground_entity(&self) -> bool {
        self.on_ground
    }
    fn move_type(&self) -> MoveType {
        self.move_type
    }
    fn interacts_with(&self) -> InteractionLayers {
        MASK_PLAYERSOLID
    }
    fn entity_index(&self) -> i32 {
        self.slot.map_or(-1, |s| s as i32 + 1)
    }
}

pub fn approx(a: &Vec3, b: &Vec3, eps: f32) -> bool {
    (0..3).all(|i| (a[i] - b[i]).abs() <= eps)
}
