// rf_pierce.rs - pierce search for a replacement contact plane
//
// When the direct trace reports a plane that disagrees with the surface the
// player was sliding on, the same sweep is retried from slightly offset
// start/end points. The first offset that reaches a consistent plane (or
// clears the obstacle) replaces the bugged result.

use rampfix_common::q_shared::{
    dot_product, vector_compare, vector_length, vector_ma, vector_normalized, vector_subtract, Trace, Vec3,
    VEC3_ORIGIN,
};

use crate::move_import::TraceWorld;
use crate::rf_local::{
    MIN_SEGMENT_LENGTH, PIERCE_FULL_FRACTION_EPSILON, PIERCE_MIN_FRACTION, PIERCE_OFFSETS, PIERCE_STEPS,
};
use crate::rf_move::MoveSolver;

impl<'a, W: TraceWorld + ?Sized> MoveSolver<'a, W> {
    /// Search the 3x3x3 offset grid for a trace that replaces `pm`.
    ///
    /// The zero offset probes along `last_plane` itself. Other offsets must
    /// point out of the remembered plane and be reachable from `start`.
    /// Returns the spliced trace on success.
    pub fn pierce_search(&self, start: &Vec3, end: &Vec3, pm: &Trace, last_plane: &Vec3) -> Option<Trace> {
        let last_n = vector_normalized(last_plane);
        let pd = self.config.pierce_distance;

        for &x in &PIERCE_OFFSETS {
            for &y in &PIERCE_OFFSETS {
                for &z in &PIERCE_OFFSETS {
                    let dir = if x == 0.0 && y == 0.0 && z == 0.0 {
                        last_n
                    } else {
                        let dir = [x, y, z];
                        if dot_product(last_plane, &dir) <= 0.0 {
                            continue;
                        }
                        let test_start = vector_ma(start, pd, &dir);
                        let test = self.trace(&test_start, start);
                        if !self.is_valid(&test) {
                            continue;
                        }
                        dir
                    };

                    if let Some(pierce) = self.pierce_direction(start, end, pm, &last_n, &dir) {
                        return Some(self.splice(start, end, &pierce));
                    }
                }
            }
        }

        None
    }

    /// Walk `dir` out to the pierce distance in even steps.
    fn pierce_direction(&self, start: &Vec3, end: &Vec3, pm: &Trace, last_n: &Vec3, dir: &Vec3) -> Option<Trace> {
        let pd = self.config.pierce_distance;
        let mut new_plane = None;

        for step in 1..=PIERCE_STEPS {
            let ratio = step as f32 / PIERCE_STEPS as f32;
            let ratio_start = vector_ma(start, ratio * pd, dir);
            let ratio_end = vector_ma(end, ratio * pd, dir);

            let pierce = self.trace(&ratio_start, &ratio_end);
            if !self.is_valid(&pierce) {
                continue;
            }

            let pierce_n = vector_normalized(&pierce.plane_normal);
            let pm_n = vector_normalized(&pm.plane_normal);

            let valid_plane = pierce.fraction < 1.0
                && pierce.fraction > PIERCE_MIN_FRACTION
                && dot_product(&pierce_n, last_n) >= self.config.bug_threshold;

            let hit_new_plane = dot_product(&pm_n, &pierce_n) < self.config.new_ramp_threshold
                && dot_product(last_n, &pierce_n) > self.config.new_ramp_threshold;

            if (pierce.fraction - 1.0).abs() < PIERCE_FULL_FRACTION_EPSILON || valid_plane {
                return Some(pierce);
            }

            new_plane = hit_new_plane.then_some(pierce);
        }

        new_plane
    }

    /// Rebuild the step result from a successful pierce: progress measured
    /// along the original segment, end point from a follow-up trace.
    fn splice(&self, start: &Vec3, end: &Vec3, pierce: &Trace) -> Trace {
        let test = self.trace(&pierce.end_pos, end);

        let denom = vector_length(&vector_subtract(end, start));
        let fraction = if denom > MIN_SEGMENT_LENGTH {
            let covered = vector_length(&vector_subtract(&pierce.end_pos, &pierce.start_pos));
            (covered / denom).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let plane_normal = if vector_compare(&pierce.plane_normal, &VEC3_ORIGIN) {
            test.plane_normal
        } else {
            pierce.plane_normal
        };

        Trace {
            start_pos: pierce.start_pos,
            end_pos: test.end_pos,
            plane_normal,
            fraction,
            start_solid: pierce.start_solid,
            exact_hit_point: pierce.exact_hit_point,
        }
    }
}
