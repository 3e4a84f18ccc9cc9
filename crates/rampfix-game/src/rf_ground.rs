// rf_ground.rs - keep fast-falling players on a ramp from being classified
// onto a floor they only touch through the bug

use log::debug;

use rampfix_common::q_shared::{
    dot_product, vector_length, vector_ma, vector_normalized, PlayerBBox, Trace, TraceFilter, Vec3, FLT_EPSILON,
};

use crate::move_import::TraceWorld;
use crate::rf_config::RampFixConfig;
use crate::rf_local::{
    GROUND_PROBE_DEPTH, GROUND_PROBE_MAX_FRACTION, GROUND_SNAP_MIN_FALL_SPEED, GROUND_SNAP_MIN_NORMAL,
    MIN_FLOOR_NORMAL,
};

fn probe<W: TraceWorld + ?Sized>(world: &W, origin: &Vec3, bbox: &PlayerBBox, filter: &TraceFilter) -> Trace {
    let mut below = *origin;
    below[2] -= GROUND_PROBE_DEPTH;
    world.trace_player_bbox(origin, &below, bbox, filter)
}

/// Decide whether the origin should be nudged off the floor before the
/// host classifies ground contact. Returns the nudged origin, or `None`
/// to leave the host's classification alone.
#[allow(clippy::too_many_arguments)]
pub fn ground_snap<W: TraceWorld + ?Sized>(
    world: &W,
    last_plane: &Vec3,
    origin: &Vec3,
    velocity: &Vec3,
    stay_on_ground: bool,
    bbox: &PlayerBBox,
    filter: &TraceFilter,
    cfg: &RampFixConfig,
) -> Option<Vec3> {
    let last_n = vector_normalized(last_plane);
    if stay_on_ground || vector_length(&last_n) < GROUND_SNAP_MIN_NORMAL || last_n[2] > MIN_FLOOR_NORMAL {
        return None;
    }
    if velocity[2] > -GROUND_SNAP_MIN_FALL_SPEED {
        return None;
    }

    let trace = probe(world, origin, bbox, filter);
    if (trace.fraction - 1.0).abs() < FLT_EPSILON || trace.start_solid {
        return None;
    }

    let floor_n = vector_normalized(&trace.plane_normal);
    if trace.fraction >= GROUND_PROBE_MAX_FRACTION
        || trace.plane_normal[2] <= MIN_FLOOR_NORMAL
        || dot_product(&last_n, &floor_n) >= cfg.bug_threshold
    {
        return None;
    }

    let nudged = vector_ma(origin, cfg.pierce_distance, last_plane);
    let trace = probe(world, &nudged, bbox, filter);
    if trace.start_solid {
        return None;
    }

    let accept = (trace.fraction - 1.0).abs() < FLT_EPSILON
        || dot_product(&last_n, &vector_normalized(&trace.plane_normal)) >= cfg.bug_threshold;
    if !accept {
        return None;
    }

    if cfg.debug {
        debug!("ground snap: {:?} -> {:?}", origin, nudged);
    }
    Some(nudged)
}
