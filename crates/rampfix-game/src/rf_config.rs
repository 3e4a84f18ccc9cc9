// rf_config.rs - tunables backed by cvars
//
// The thresholds were tuned against one movement simulation's unit scale and
// must be re-tuned when the module is pointed at a different one.

use rampfix_common::cvar::{CvarContext, CVAR_ARCHIVE};

pub const CVAR_ENABLE: &str = "rampfix_enable";
pub const CVAR_GROUNDFIX: &str = "rampfix_groundfix";
pub const CVAR_BUG_THRESHOLD: &str = "rampfix_bug_threshold";
pub const CVAR_VELOCITY_THRESHOLD: &str = "rampfix_velocity_threshold";
pub const CVAR_NEWRAMP_THRESHOLD: &str = "rampfix_newramp_threshold";
pub const CVAR_PIERCE_DISTANCE: &str = "rampfix_pierce_distance";
pub const CVAR_DEBUG: &str = "rampfix_debug";

/// Default cvar table: (name, default, flags).
pub const RAMPFIX_CVARS: [(&str, &str, i32); 7] = [
    (CVAR_ENABLE, "1", CVAR_ARCHIVE),
    (CVAR_GROUNDFIX, "1", CVAR_ARCHIVE),
    (CVAR_BUG_THRESHOLD, "0.98", 0),
    (CVAR_VELOCITY_THRESHOLD, "0.95", 0),
    (CVAR_NEWRAMP_THRESHOLD, "0.95", 0),
    (CVAR_PIERCE_DISTANCE, "0.0625", 0),
    (CVAR_DEBUG, "0", 0),
];

/// Snapshot of the tunables, read from the cvars once at init.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampFixConfig {
    pub enabled: bool,
    pub ground_fix: bool,
    /// Minimum dot between two normals for them to count as the same plane.
    pub bug_threshold: f32,
    /// Host/engine speed ratio below which the host lost too much speed.
    pub velocity_threshold: f32,
    /// Divergence that marks a pierce plane as a genuinely new ramp.
    pub new_ramp_threshold: f32,
    /// Pierce offset and ground nudge distance, in world units.
    pub pierce_distance: f32,
    pub debug: bool,
}

impl Default for RampFixConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ground_fix: true,
            bug_threshold: 0.98,
            velocity_threshold: 0.95,
            new_ramp_threshold: 0.95,
            pierce_distance: 0.0625,
            debug: false,
        }
    }
}

impl RampFixConfig {
    /// Register every rampfix cvar with its default.
    pub fn register_cvars(cv: &mut CvarContext) {
        for (name, value, flags) in RAMPFIX_CVARS {
            cv.get(name, value, flags);
        }
    }

    /// Read the current values. Non-positive distances and thresholds fall
    /// back to their defaults.
    pub fn from_cvars(cv: &CvarContext) -> Self {
        let def = Self::default();
        let positive = |name: &str, fallback: f32| {
            let v = cv.variable_value(name);
            if v > 0.0 && v.is_finite() {
                v
            } else {
                fallback
            }
        };

        Self {
            enabled: cv.variable_value(CVAR_ENABLE) != 0.0,
            ground_fix: cv.variable_value(CVAR_GROUNDFIX) != 0.0,
            bug_threshold: positive(CVAR_BUG_THRESHOLD, def.bug_threshold),
            velocity_threshold: positive(CVAR_VELOCITY_THRESHOLD, def.velocity_threshold),
            new_ramp_threshold: positive(CVAR_NEWRAMP_THRESHOLD, def.new_ramp_threshold),
            pierce_distance: positive(CVAR_PIERCE_DISTANCE, def.pierce_distance),
            debug: cv.variable_value(CVAR_DEBUG) != 0.0,
        }
    }
}
