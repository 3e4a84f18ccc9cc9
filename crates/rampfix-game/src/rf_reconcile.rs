// rf_reconcile.rs - choose between the host's movement result and ours

use rampfix_common::q_shared::{
    dot_product, vector_compare, vector_length, vector_normalized, Vec3, FLT_EPSILON, VEC3_ORIGIN,
};

use crate::rampfix::MoveData;
use crate::rf_config::RampFixConfig;
use crate::rf_local::{PerPlayerState, RECONCILE_MIN_SPEED};

/// The host turned the velocity away from ours, or bled off too much of it.
///
/// A velocity with no direction has no turn to measure, so only the speed
/// ratio decides.
pub fn velocity_heavily_modified(host: &Vec3, corrected: &Vec3, cfg: &RampFixConfig) -> bool {
    let host_n = vector_normalized(host);
    let corrected_n = vector_normalized(corrected);
    if vector_length(&host_n) > FLT_EPSILON
        && vector_length(&corrected_n) > FLT_EPSILON
        && dot_product(&corrected_n, &host_n) < cfg.bug_threshold
    {
        return true;
    }

    let corrected_speed = vector_length(corrected);
    corrected_speed > RECONCILE_MIN_SPEED && vector_length(host) / corrected_speed < cfg.velocity_threshold
}

/// Overwrite the host's result with the corrected one when a pierce fired
/// this tick and the host's velocity diverged. Returns whether it did.
pub fn reconcile(state: &PerPlayerState, mv: &mut MoveData, cfg: &RampFixConfig) -> bool {
    if !state.overrode_this_tick
        || vector_compare(&state.corrected_origin, &VEC3_ORIGIN)
        || vector_compare(&state.corrected_velocity, &VEC3_ORIGIN)
    {
        return false;
    }
    if !velocity_heavily_modified(&mv.velocity, &state.corrected_velocity, cfg) {
        return false;
    }

    mv.origin = state.corrected_origin;
    mv.velocity = state.corrected_velocity;
    true
}
