// game_api.rs - C-compatible FFI types for the host movement interface
//
// These records cross the boundary between the host's movement services and
// the correction module. Field offsets are fixed by the host binary; nothing
// outside this file and the DLL glue may depend on them.

#![allow(non_camel_case_types, non_snake_case)]

use std::os::raw::{c_char, c_float, c_int, c_void};

use crate::q_shared::{PlayerBBox, Trace, TraceFilter, Vec3};

/// Module API version - must match between host shim and module
pub const RAMPFIX_API_VERSION: c_int = 1;

/// C-style boolean (int)
pub type qboolean = c_int;

// ============================================================
// Trace - C-compatible version
// ============================================================

/// Host trace result. Binary layout matches the host's game trace exactly:
///
/// | offset | field |
/// |---|---|
/// | 0..40 | surface/entity/hitbox/body/shape pointers |
/// | 40 | contents |
/// | 80 | shape attributes |
/// | 120 | start position |
/// | 132 | end position |
/// | 144 | plane normal |
/// | 156 | hit point |
/// | 168 | hit offset |
/// | 172 | fraction |
/// | 176 | triangle |
/// | 180 | hitbox bone index |
/// | 182 | ray type |
/// | 183 | start in solid |
/// | 184 | exact hit point |
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct game_trace_t {
    pub surface_prop: *const c_void,
    pub entity: *mut c_void,
    pub hitbox_data: *const c_void,
    pub physics_body: *mut c_void,
    pub physics_shape: *mut c_void,
    pub contents: u32,
    pub _reserved0: [u8; 36],
    pub shape_attributes: [u8; 40],
    pub start_position: Vec3,
    pub end_position: Vec3,
    pub plane_normal: Vec3,
    pub hit_point: Vec3,
    pub hit_offset: c_float,
    pub fraction: c_float,
    pub triangle: c_int,
    pub hitbox_bone_index: i16,
    pub ray_type: u8,
    pub start_in_solid: bool,
    pub exact_hit_point: bool,
    pub _reserved1: [u8; 7],
}

impl Default for game_trace_t {
    fn default() -> Self {
        Self {
            surface_prop: std::ptr::null(),
            entity: std::ptr::null_mut(),
            hitbox_data: std::ptr::null(),
            physics_body: std::ptr::null_mut(),
            physics_shape: std::ptr::null_mut(),
            contents: 0,
            _reserved0: [0; 36],
            shape_attributes: [0; 40],
            start_position: [0.0; 3],
            end_position: [0.0; 3],
            plane_normal: [0.0; 3],
            hit_point: [0.0; 3],
            hit_offset: 0.0,
            fraction: 1.0,
            triangle: 0,
            hitbox_bone_index: -1,
            ray_type: 0,
            start_in_solid: false,
            exact_hit_point: false,
            _reserved1: [0; 7],
        }
    }
}

impl From<&game_trace_t> for Trace {
    fn from(tr: &game_trace_t) -> Self {
        Trace {
            start_pos: tr.start_position,
            end_pos: tr.end_position,
            plane_normal: tr.plane_normal,
            fraction: tr.fraction,
            start_solid: tr.start_in_solid,
            exact_hit_point: tr.exact_hit_point,
        }
    }
}

impl game_trace_t {
    /// Overwrite the movement fields with `tr`; host-owned pointers and
    /// attributes are left untouched.
    pub fn store(&mut self, tr: &Trace) {
        self.start_position = tr.start_pos;
        self.end_position = tr.end_pos;
        self.plane_normal = tr.plane_normal;
        self.fraction = tr.fraction;
        self.start_in_solid = tr.start_solid;
        self.exact_hit_point = tr.exact_hit_point;
    }
}

// ============================================================
// Hull and filter
// ============================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct bbox_t {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl From<&PlayerBBox> for bbox_t {
    fn from(b: &PlayerBBox) -> Self {
        Self {
            mins: b.mins,
            maxs: b.maxs,
        }
    }
}

/// Player-movement trace filter as the host shim expects it. The host fills
/// `vtable` itself; the module only supplies the query attributes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct trace_filter_t {
    pub vtable: *const c_void,
    pub interacts_with: u64,
    pub entity_to_ignore: c_int,
    pub iterate_entities: bool,
}

impl From<&TraceFilter> for trace_filter_t {
    fn from(f: &TraceFilter) -> Self {
        Self {
            vtable: std::ptr::null(),
            interacts_with: f.interacts_with.bits(),
            entity_to_ignore: f.ignore_entity,
            iterate_entities: f.iterate_entities,
        }
    }
}

// ============================================================
// Move data
// ============================================================

/// Opaque host move data. Origin and velocity live at offsets supplied by the
/// import table.
#[repr(C)]
pub struct move_data_t {
    _opaque: [u8; 0],
}

/// Opaque host movement service.
#[repr(C)]
pub struct movement_service_t {
    _opaque: [u8; 0],
}

/// Read the Vec3 at `offset` bytes into `mv`.
///
/// # Safety
/// `mv` must point to live host move data with a Vec3 at `offset`.
pub unsafe fn mv_read_vec3(mv: *const move_data_t, offset: c_int) -> Vec3 {
    let p = (mv as *const u8).add(offset as usize) as *const Vec3;
    p.read_unaligned()
}

/// Write `v` to the Vec3 at `offset` bytes into `mv`.
///
/// # Safety
/// `mv` must point to live host move data with a Vec3 at `offset`.
pub unsafe fn mv_write_vec3(mv: *mut move_data_t, offset: c_int, v: &Vec3) {
    let p = (mv as *mut u8).add(offset as usize) as *mut Vec3;
    p.write_unaligned(*v);
}

// ============================================================
// Function tables
// ============================================================

pub type TryPlayerMoveFn = unsafe extern "C" fn(
    service: *mut movement_service_t,
    mv: *mut move_data_t,
    first_dest: *mut Vec3,
    first_trace: *mut game_trace_t,
    is_surfing: *mut bool,
);

pub type CategorizePositionFn =
    unsafe extern "C" fn(service: *mut movement_service_t, mv: *mut move_data_t, stay_on_ground: bool);

/// Functions and layout data provided by the host to the module.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct rampfix_import_t {
    pub dprintf: Option<unsafe extern "C" fn(msg: *const c_char)>,
    /// Register or fetch a host console variable; returns its current value
    /// as a string owned by the host.
    pub cvar: Option<
        unsafe extern "C" fn(name: *const c_char, default: *const c_char, flags: c_int) -> *const c_char,
    >,
    pub frame_time: Option<unsafe extern "C" fn() -> c_float>,

    pub trace_player_bbox: Option<
        unsafe extern "C" fn(
            start: *const Vec3,
            end: *const Vec3,
            bbox: *const bbox_t,
            filter: *const trace_filter_t,
            out: *mut game_trace_t,
        ),
    >,

    // entity accessors, all keyed by the movement service
    pub player_slot: Option<unsafe extern "C" fn(service: *mut movement_service_t) -> c_int>,
    pub is_alive: Option<unsafe extern "C" fn(service: *mut movement_service_t) -> qboolean>,
    pub is_ducked: Option<unsafe extern "C" fn(service: *mut movement_service_t) -> qboolean>,
    pub has_ground_entity: Option<unsafe extern "C" fn(service: *mut movement_service_t) -> qboolean>,
    pub move_type: Option<unsafe extern "C" fn(service: *mut movement_service_t) -> u8>,
    pub interacts_with: Option<unsafe extern "C" fn(service: *mut movement_service_t) -> u64>,
    pub entity_index: Option<unsafe extern "C" fn(service: *mut movement_service_t) -> c_int>,

    // originals behind the installed detours
    pub try_player_move: Option<TryPlayerMoveFn>,
    pub categorize_position: Option<CategorizePositionFn>,

    pub mv_abs_origin_offset: c_int,
    pub mv_velocity_offset: c_int,
}

/// Callbacks the module hands back to the host's hook facility.
#[repr(C)]
pub struct rampfix_export_t {
    pub apiversion: c_int,
    pub Init: Option<unsafe extern "C" fn() -> qboolean>,
    pub Shutdown: Option<unsafe extern "C" fn()>,
    pub TryPlayerMove: Option<TryPlayerMoveFn>,
    pub CategorizePosition: Option<CategorizePositionFn>,
    pub ProcessMovePre: Option<unsafe extern "C" fn(slot: c_int)>,
    pub ProcessMovePost: Option<unsafe extern "C" fn(slot: c_int)>,
    pub ClientDisconnect: Option<unsafe extern "C" fn(slot: c_int)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_game_trace_t_layout() {
        assert_eq!(offset_of!(game_trace_t, contents), 40);
        assert_eq!(offset_of!(game_trace_t, shape_attributes), 80);
        assert_eq!(offset_of!(game_trace_t, start_position), 120);
        assert_eq!(offset_of!(game_trace_t, end_position), 132);
        assert_eq!(offset_of!(game_trace_t, plane_normal), 144);
        assert_eq!(offset_of!(game_trace_t, hit_point), 156);
        assert_eq!(offset_of!(game_trace_t, hit_offset), 168);
        assert_eq!(offset_of!(game_trace_t, fraction), 172);
        assert_eq!(offset_of!(game_trace_t, triangle), 176);
        assert_eq!(offset_of!(game_trace_t, hitbox_bone_index), 180);
        assert_eq!(offset_of!(game_trace_t, ray_type), 182);
        assert_eq!(offset_of!(game_trace_t, start_in_solid), 183);
        assert_eq!(offset_of!(game_trace_t, exact_hit_point), 184);
        assert_eq!(size_of::<game_trace_t>(), 192);
    }

    #[test]
    fn test_bbox_t_size() {
        assert_eq!(size_of::<bbox_t>(), 24);
    }

    #[test]
    fn test_trace_round_trip_keeps_host_fields() {
        let mut raw = game_trace_t {
            contents: 7,
            ..game_trace_t::default()
        };
        let tr = Trace {
            start_pos: [1.0, 2.0, 3.0],
            end_pos: [4.0, 5.0, 6.0],
            plane_normal: [0.0, 0.0, 1.0],
            fraction: 0.25,
            start_solid: false,
            exact_hit_point: true,
        };
        raw.store(&tr);
        assert_eq!(raw.contents, 7);
        assert_eq!(Trace::from(&raw), tr);
    }

    #[test]
    fn test_filter_conversion() {
        let f = TraceFilter::player_movement(crate::q_shared::InteractionLayers::SOLID, 12).with_entities();
        let raw = trace_filter_t::from(&f);
        assert_eq!(raw.interacts_with, 1);
        assert_eq!(raw.entity_to_ignore, 12);
        assert!(raw.iterate_entities);
        assert!(raw.vtable.is_null());
    }

    #[test]
    fn test_move_data_offsets() {
        let mut buf = [0u8; 64];
        let mv = buf.as_mut_ptr() as *mut move_data_t;
        unsafe {
            mv_write_vec3(mv, 20, &[1.0, -2.0, 3.5]);
            assert_eq!(mv_read_vec3(mv, 20), [1.0, -2.0, 3.5]);
            assert_eq!(mv_read_vec3(mv, 0), [0.0; 3]);
        }
    }
}
