// rf_move.rs - independent bump-and-slide solve with ramp-bug detection
//
// Mirrors the host's movement step iteration for iteration so the result
// only diverges where a bugged contact plane was replaced.

use log::debug;

use rampfix_common::q_shared::{
    cross_product, dot_product, vector_compare, vector_length, vector_length_2d, vector_ma,
    vector_normalize, vector_normalized, vector_scale, PlayerBBox, Trace, TraceFilter, Vec3,
    FLT_EPSILON, MAX_BUMPS, MAX_CLIP_PLANES, NORMALIZE_EPSILON, VEC3_ORIGIN,
};

use crate::move_import::TraceWorld;
use crate::rf_config::RampFixConfig;
use crate::rf_local::{PerPlayerState, MIN_FLOOR_NORMAL, MIN_FLOOR_SPEED, MIN_MOVE_FRACTION};

/// Components smaller than this are snapped to zero after a clip.
const CLIP_SNAP_EPSILON: f32 = 1e-6;

// ============================================================
// Velocity clipping
// ============================================================

/// Slide off of the impacting surface. A normal with no direction leaves
/// the velocity untouched.
pub fn clip_velocity(inv: &Vec3, normal: &Vec3, overbounce: f32) -> Vec3 {
    let n = vector_normalized(normal);
    if dot_product(&n, &n) < NORMALIZE_EPSILON {
        return *inv;
    }

    let backoff = dot_product(inv, &n) * overbounce;
    let mut out = [0.0f32; 3];
    for i in 0..3 {
        out[i] = inv[i] - n[i] * backoff;
        if out[i].abs() < CLIP_SNAP_EPSILON {
            out[i] = 0.0;
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipResult {
    Slide(Vec3),
    /// Wedged: no velocity satisfies the plane set.
    Stop,
}

/// Modify `velocity` so it parallels all of the clip planes.
///
/// `single_plane` takes the lone-plane shortcut used for airborne walkers.
pub fn clip_to_planes(velocity: &Vec3, primal_velocity: &Vec3, planes: &[Vec3], single_plane: bool) -> ClipResult {
    if planes.is_empty() {
        return ClipResult::Slide(*velocity);
    }
    if single_plane {
        return ClipResult::Slide(clip_velocity(velocity, &planes[0], 1.0));
    }

    let mut v = *velocity;
    for i in 0..planes.len() {
        v = clip_velocity(&v, &planes[i], 1.0);

        // are we now moving against any other plane?
        let ok = (0..planes.len())
            .filter(|&j| j != i)
            .all(|j| dot_product(&v, &planes[j]) >= 0.0);
        if ok {
            return ClipResult::Slide(v);
        }
    }

    // go along the crease
    if planes.len() != 2 {
        return ClipResult::Stop;
    }

    let mut dir = cross_product(&planes[0], &planes[1]);
    if vector_normalize(&mut dir) <= NORMALIZE_EPSILON {
        return ClipResult::Stop;
    }
    let d = dot_product(&dir, &v);
    let v = vector_scale(&dir, d);

    // if velocity is against the original velocity, stop dead
    if dot_product(&v, primal_velocity) <= 0.0 {
        return ClipResult::Stop;
    }
    ClipResult::Slide(v)
}

// ============================================================
// Trace validity
// ============================================================

/// Rejects traces that start solid, report a contact without a usable
/// plane, carry corrupt normals, or end somewhere the hull cannot occupy.
pub fn is_valid_movement_trace<W: TraceWorld + ?Sized>(
    world: &W,
    trace: &Trace,
    bbox: &PlayerBBox,
    filter: &TraceFilter,
) -> bool {
    if trace.start_solid {
        return false;
    }

    let n = &trace.plane_normal;
    if trace.fraction < 1.0 && n.iter().all(|c| c.abs() < FLT_EPSILON) {
        return false;
    }

    if n.iter().any(|c| c.abs() > 1.0 || !c.is_finite()) {
        return false;
    }

    let stuck = world.trace_player_bbox(&trace.end_pos, &trace.end_pos, bbox, filter);
    if stuck.start_solid || stuck.fraction < 1.0 - FLT_EPSILON {
        return false;
    }

    let back = world.trace_player_bbox(&trace.end_pos, &trace.start_pos, bbox, filter);
    !back.start_solid
}

// ============================================================
// Solver
// ============================================================

/// Pre-move state for one movement step.
#[derive(Debug, Clone)]
pub struct MoveInput<'a> {
    pub origin: Vec3,
    pub velocity: Vec3,
    pub frame_time: f32,
    /// Walking with no ground entity.
    pub airborne_walk: bool,
    /// Destination and trace the host already computed for its first bump.
    pub first: Option<(Vec3, &'a Trace)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    pub origin: Vec3,
    pub velocity: Vec3,
}

pub struct MoveSolver<'a, W: TraceWorld + ?Sized> {
    pub(crate) world: &'a W,
    pub(crate) config: &'a RampFixConfig,
    pub(crate) bbox: PlayerBBox,
    pub(crate) filter: TraceFilter,
}

impl<'a, W: TraceWorld + ?Sized> MoveSolver<'a, W> {
    pub fn new(world: &'a W, config: &'a RampFixConfig, bbox: PlayerBBox, filter: TraceFilter) -> Self {
        Self {
            world,
            config,
            bbox,
            filter,
        }
    }

    pub(crate) fn trace(&self, start: &Vec3, end: &Vec3) -> Trace {
        self.world.trace_player_bbox(start, end, &self.bbox, &self.filter)
    }

    pub(crate) fn is_valid(&self, trace: &Trace) -> bool {
        is_valid_movement_trace(self.world, trace, &self.bbox, &self.filter)
    }

    /// The direct trace disagrees with the surface we were sliding on, is
    /// unusable, or left us wedged twice in a row.
    fn looks_bugged(&self, state: &PerPlayerState, pm: &Trace, valid: bool, potentially_stuck: bool) -> bool {
        let last_n = vector_normalized(&state.last_valid_plane_normal);
        if vector_length(&last_n) <= FLT_EPSILON {
            return false;
        }
        let pm_n = vector_normalized(&pm.plane_normal);

        !valid
            || dot_product(&pm_n, &last_n) < self.config.bug_threshold
            || (potentially_stuck && pm.fraction == 0.0)
    }

    /// Run the corrected slide move. The result is written to `state` as
    /// this tick's candidate and returned.
    pub fn solve(&self, state: &mut PerPlayerState, input: &MoveInput<'_>) -> MoveResult {
        let primal_velocity = input.velocity;
        let mut velocity = input.velocity;
        let mut start = input.origin;
        let mut time_left = input.frame_time;
        let mut all_fraction = 0.0f32;
        let mut potentially_stuck = false;

        let mut planes = [VEC3_ORIGIN; MAX_CLIP_PLANES];
        let mut numplanes = 0usize;
        let mut pm = Trace::clear(&start, &start);

        for _bumpcount in 0..MAX_BUMPS {
            let end = vector_ma(&start, time_left, &velocity);

            match input.first {
                Some((dest, first)) if vector_compare(&dest, &end) => {
                    pm = first.clone();
                }
                _ => {
                    pm = self.trace(&start, &end);

                    if vector_compare(&start, &end) {
                        continue;
                    }

                    let valid = self.is_valid(&pm);
                    if valid && (pm.fraction - 1.0).abs() < FLT_EPSILON {
                        break; // moved the entire distance
                    }

                    let pierced = if self.looks_bugged(state, &pm, valid, potentially_stuck) {
                        self.pierce_search(&start, &end, &pm, &state.last_valid_plane_normal)
                    } else {
                        None
                    };

                    match pierced {
                        Some(pierced) => {
                            if self.config.debug {
                                debug!(
                                    "ramp pierce: plane {:?} -> {:?}, fraction {} -> {}",
                                    pm.plane_normal, pierced.plane_normal, pm.fraction, pierced.fraction
                                );
                            }
                            state.overrode_this_tick = true;
                            // a pierce that cleared everything leaves no plane behind
                            state.last_valid_plane_normal = vector_normalized(&pierced.plane_normal);
                            pm = pierced;
                        }
                        None => state.remember_plane(&pm.plane_normal),
                    }
                    potentially_stuck = pm.fraction == 0.0;
                }
            }

            if pm.fraction * vector_length(&velocity) > MIN_MOVE_FRACTION || pm.fraction > MIN_MOVE_FRACTION {
                // actually covered some distance
                all_fraction += pm.fraction;
                start = pm.end_pos;
                numplanes = 0;
            }

            if (all_fraction - 1.0).abs() < FLT_EPSILON {
                break;
            }

            time_left -= input.frame_time * pm.fraction;

            if numplanes >= MAX_CLIP_PLANES
                || (pm.plane_normal[2] >= MIN_FLOOR_NORMAL && vector_length_2d(&velocity) < MIN_FLOOR_SPEED)
            {
                velocity = VEC3_ORIGIN;
                break;
            }

            planes[numplanes] = vector_normalized(&pm.plane_normal);
            numplanes += 1;

            match clip_to_planes(&velocity, &primal_velocity, &planes[..numplanes], numplanes == 1 && input.airborne_walk) {
                ClipResult::Slide(v) => velocity = v,
                ClipResult::Stop => {
                    velocity = VEC3_ORIGIN;
                    break;
                }
            }
        }

        state.corrected_origin = pm.end_pos;
        state.corrected_velocity = velocity;

        MoveResult {
            origin: pm.end_pos,
            velocity,
        }
    }
}
