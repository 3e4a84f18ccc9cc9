// rampfix-dll - ramp collision fix module built from Rust
//
// The host loads this library, installs detours on its movement step and
// ground classification, and routes them through the export table returned
// by `GetRampFixApi`. The originals behind the detours come back to us in
// the import table.

#![allow(non_snake_case, non_camel_case_types)]

use std::ffi::{CStr, CString};
use std::os::raw::c_int;

use log::{info, trace, warn, LevelFilter, Log, Metadata, Record};
use parking_lot::{const_mutex, Mutex};

use rampfix_common::cvar::CvarContext;
use rampfix_common::game_api::{
    bbox_t, game_trace_t, move_data_t, movement_service_t, mv_read_vec3, mv_write_vec3, qboolean,
    rampfix_export_t, rampfix_import_t, trace_filter_t, RAMPFIX_API_VERSION,
};
use rampfix_common::q_shared::{InteractionLayers, MoveType, PlayerBBox, Trace, TraceFilter, Vec3};
use rampfix_game::move_import::{MovementEntity, TraceWorld};
use rampfix_game::rf_config::{RampFixConfig, RAMPFIX_CVARS};
use rampfix_game::{MoveData, RampFix};

// ============================================================
// Global state
// ============================================================

/// Import table received from the host
static IMPORT: Mutex<Option<rampfix_import_t>> = const_mutex(None);

/// Correction engine; `None` until Init succeeds
static RAMPFIX: Mutex<Option<RampFix>> = const_mutex(None);

/// The export table we hand back to the host
static mut EXPORT: rampfix_export_t = rampfix_export_t {
    apiversion: RAMPFIX_API_VERSION,
    Init: Some(rf_init),
    Shutdown: Some(rf_shutdown),
    TryPlayerMove: Some(rf_try_player_move),
    CategorizePosition: Some(rf_categorize_position),
    ProcessMovePre: Some(rf_process_move_pre),
    ProcessMovePost: Some(rf_process_move_post),
    ClientDisconnect: Some(rf_client_disconnect),
};

static HOST_LOGGER: HostLogger = HostLogger;

fn import() -> Option<rampfix_import_t> {
    *IMPORT.lock()
}

// ============================================================
// GetRampFixApi - the library entry point
// ============================================================

/// Receives the host's import table and returns our export table.
///
/// # Safety
/// `import` must point to a valid `rampfix_import_t`. It is copied, so it
/// only has to live for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn GetRampFixApi(import: *mut rampfix_import_t) -> *mut rampfix_export_t {
    if import.is_null() {
        return std::ptr::null_mut();
    }

    *IMPORT.lock() = Some(*import);

    // a second load keeps the first logger
    if log::set_logger(&HOST_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }

    &raw mut EXPORT
}

// ============================================================
// Host bridges
// ============================================================

/// Forwards log records to the host console.
struct HostLogger;

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(dprintf) = import().and_then(|gi| gi.dprintf) else {
            return;
        };
        let msg = format!("[rampfix] {}: {}\n", record.level(), record.args());
        let c_msg = CString::new(msg).unwrap_or_default();
        unsafe { dprintf(c_msg.as_ptr()) };
    }

    fn flush(&self) {}
}

struct HostWorld {
    gi: rampfix_import_t,
}

impl TraceWorld for HostWorld {
    fn trace_player_bbox(&self, start: &Vec3, end: &Vec3, bbox: &PlayerBBox, filter: &TraceFilter) -> Trace {
        let Some(func) = self.gi.trace_player_bbox else {
            return Trace::clear(start, end);
        };
        let raw_bbox = bbox_t::from(bbox);
        // the host fills in its own filter vtable
        let raw_filter = trace_filter_t::from(filter);
        let mut out = game_trace_t::default();
        unsafe { func(start, end, &raw_bbox, &raw_filter, &mut out) };
        Trace::from(&out)
    }
}

/// The pawn behind one movement service, read through the host accessors.
struct HostEntity {
    gi: rampfix_import_t,
    service: *mut movement_service_t,
}

impl HostEntity {
    fn flag(&self, func: Option<unsafe extern "C" fn(*mut movement_service_t) -> qboolean>) -> bool {
        func.is_some_and(|f| unsafe { f(self.service) } != 0)
    }
}

impl MovementEntity for HostEntity {
    fn player_slot(&self) -> Option<usize> {
        let func = self.gi.player_slot?;
        let slot = unsafe { func(self.service) };
        usize::try_from(slot).ok()
    }

    fn is_alive(&self) -> bool {
        self.flag(self.gi.is_alive)
    }

    fn is_ducked(&self) -> bool {
        self.flag(self.gi.is_ducked)
    }

    fn has_ground_entity(&self) -> bool {
        self.flag(self.gi.has_ground_entity)
    }

    fn move_type(&self) -> MoveType {
        self.gi
            .move_type
            .map_or(MoveType::None, |f| MoveType::from_raw(unsafe { f(self.service) }))
    }

    fn interacts_with(&self) -> InteractionLayers {
        self.gi
            .interacts_with
            .map_or(InteractionLayers::empty(), |f| InteractionLayers::from_bits_truncate(unsafe { f(self.service) }))
    }

    fn entity_index(&self) -> i32 {
        self.gi.entity_index.map_or(-1, |f| unsafe { f(self.service) })
    }
}

unsafe fn read_move_data(gi: &rampfix_import_t, mv: *const move_data_t) -> MoveData {
    MoveData {
        origin: mv_read_vec3(mv, gi.mv_abs_origin_offset),
        velocity: mv_read_vec3(mv, gi.mv_velocity_offset),
    }
}

unsafe fn write_move_data(gi: &rampfix_import_t, mv: *mut move_data_t, data: &MoveData) {
    mv_write_vec3(mv, gi.mv_abs_origin_offset, &data.origin);
    mv_write_vec3(mv, gi.mv_velocity_offset, &data.velocity);
}

/// Seed our cvars from the host's values for the same names.
unsafe fn seed_cvars(gi: &rampfix_import_t, cv: &mut CvarContext) {
    let Some(func) = gi.cvar else {
        return;
    };
    for (name, default, flags) in RAMPFIX_CVARS {
        let (Ok(c_name), Ok(c_default)) = (CString::new(name), CString::new(default)) else {
            continue;
        };
        let value = func(c_name.as_ptr(), c_default.as_ptr(), flags);
        if value.is_null() {
            continue;
        }
        if let Ok(s) = CStr::from_ptr(value).to_str() {
            cv.set(name, s);
        }
    }
}

// ============================================================
// Export implementations
// ============================================================

unsafe extern "C" fn rf_init() -> qboolean {
    let Some(gi) = import() else {
        return 0;
    };
    if gi.trace_player_bbox.is_none() || gi.try_player_move.is_none() || gi.categorize_position.is_none() {
        warn!("host import table is missing trace or movement originals");
        return 0;
    }

    let mut cv = CvarContext::new();
    RampFixConfig::register_cvars(&mut cv);
    seed_cvars(&gi, &mut cv);

    let rf = RampFix::from_cvars(&cv);
    info!("initialized: {:?}", rf.config());
    *RAMPFIX.lock() = Some(rf);
    1
}

unsafe extern "C" fn rf_shutdown() {
    *RAMPFIX.lock() = None;
    info!("shut down");
}

unsafe extern "C" fn rf_try_player_move(
    service: *mut movement_service_t,
    mv: *mut move_data_t,
    first_dest: *mut Vec3,
    first_trace: *mut game_trace_t,
    is_surfing: *mut bool,
) {
    let Some(gi) = import() else {
        return;
    };
    let Some(original) = gi.try_player_move else {
        return;
    };
    if mv.is_null() || service.is_null() {
        original(service, mv, first_dest, first_trace, is_surfing);
        return;
    }

    // re-entry from inside the host step goes straight to the host
    let Some(mut guard) = RAMPFIX.try_lock() else {
        trace!("try_player_move: state busy, host step only");
        original(service, mv, first_dest, first_trace, is_surfing);
        return;
    };
    let Some(rf) = guard.as_mut() else {
        original(service, mv, first_dest, first_trace, is_surfing);
        return;
    };

    let world = HostWorld { gi };
    let ent = HostEntity { gi, service };
    let mut data = read_move_data(&gi, mv);

    let first_tr = if first_dest.is_null() || first_trace.is_null() {
        None
    } else {
        Some(Trace::from(&*first_trace))
    };
    let first = first_tr.as_ref().map(|tr| (&*first_dest, tr));
    let frame_time = gi.frame_time.map_or(0.0, |f| f());

    rf.try_player_move(&world, &ent, &mut data, first, frame_time, |d| {
        write_move_data(&gi, mv, d);
        original(service, mv, first_dest, first_trace, is_surfing);
        *d = read_move_data(&gi, mv);
    });

    write_move_data(&gi, mv, &data);
}

unsafe extern "C" fn rf_categorize_position(
    service: *mut movement_service_t,
    mv: *mut move_data_t,
    stay_on_ground: bool,
) {
    let Some(gi) = import() else {
        return;
    };
    let Some(original) = gi.categorize_position else {
        return;
    };
    if mv.is_null() || service.is_null() {
        original(service, mv, stay_on_ground);
        return;
    }

    let Some(mut guard) = RAMPFIX.try_lock() else {
        trace!("categorize_position: state busy, host classification only");
        original(service, mv, stay_on_ground);
        return;
    };
    let Some(rf) = guard.as_mut() else {
        original(service, mv, stay_on_ground);
        return;
    };

    let world = HostWorld { gi };
    let ent = HostEntity { gi, service };
    let mut data = read_move_data(&gi, mv);

    rf.categorize_position(&world, &ent, &mut data, stay_on_ground, |d, stay| {
        write_move_data(&gi, mv, d);
        original(service, mv, stay);
        *d = read_move_data(&gi, mv);
    });
}

fn with_slot(slot: c_int, f: impl FnOnce(&mut RampFix, usize)) {
    let Ok(slot) = usize::try_from(slot) else {
        return;
    };
    if let Some(rf) = RAMPFIX.lock().as_mut() {
        f(rf, slot);
    }
}

unsafe extern "C" fn rf_process_move_pre(slot: c_int) {
    with_slot(slot, |rf, slot| rf.process_move_pre(slot));
}

unsafe extern "C" fn rf_process_move_post(slot: c_int) {
    with_slot(slot, |rf, slot| rf.process_move_post(slot));
}

unsafe extern "C" fn rf_client_disconnect(slot: c_int) {
    with_slot(slot, |rf, slot| rf.client_disconnect(slot));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ---- stub host ----

    static TRACES: AtomicUsize = AtomicUsize::new(0);
    static ORIGINAL_CALLS: AtomicUsize = AtomicUsize::new(0);

    const ORIGIN_OFFSET: c_int = 16;
    const VELOCITY_OFFSET: c_int = 40;

    unsafe extern "C" fn host_trace(
        start: *const Vec3,
        end: *const Vec3,
        _bbox: *const bbox_t,
        _filter: *const trace_filter_t,
        out: *mut game_trace_t,
    ) {
        TRACES.fetch_add(1, Ordering::SeqCst);
        (*out).store(&Trace::clear(&*start, &*end));
    }

    unsafe extern "C" fn host_slot(_service: *mut movement_service_t) -> c_int {
        7
    }

    unsafe extern "C" fn host_true(_service: *mut movement_service_t) -> qboolean {
        1
    }

    unsafe extern "C" fn host_frame_time() -> f32 {
        0.1
    }

    unsafe extern "C" fn host_try_player_move(
        _service: *mut movement_service_t,
        mv: *mut move_data_t,
        _first_dest: *mut Vec3,
        _first_trace: *mut game_trace_t,
        _is_surfing: *mut bool,
    ) {
        ORIGINAL_CALLS.fetch_add(1, Ordering::SeqCst);
        // host moves the player up by one unit
        let mut origin = mv_read_vec3(mv, ORIGIN_OFFSET);
        origin[2] += 1.0;
        mv_write_vec3(mv, ORIGIN_OFFSET, &origin);
    }

    unsafe extern "C" fn host_categorize(_service: *mut movement_service_t, _mv: *mut move_data_t, _stay: bool) {
        ORIGINAL_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn stub_import() -> rampfix_import_t {
        rampfix_import_t {
            dprintf: None,
            cvar: None,
            frame_time: Some(host_frame_time),
            trace_player_bbox: Some(host_trace),
            player_slot: Some(host_slot),
            is_alive: Some(host_true),
            is_ducked: None,
            has_ground_entity: None,
            move_type: None,
            interacts_with: None,
            entity_index: None,
            try_player_move: Some(host_try_player_move),
            categorize_position: Some(host_categorize),
            mv_abs_origin_offset: ORIGIN_OFFSET,
            mv_velocity_offset: VELOCITY_OFFSET,
        }
    }

    // ---- export table ----

    #[test]
    fn test_api_version() {
        assert_eq!(RAMPFIX_API_VERSION, 1);
        let version = unsafe { (&raw const EXPORT).as_ref().unwrap().apiversion };
        assert_eq!(version, RAMPFIX_API_VERSION);
    }

    #[test]
    fn test_export_function_pointers_set() {
        unsafe {
            let ex = (&raw const EXPORT).as_ref().unwrap();
            assert!(ex.Init.is_some(), "Init should be set");
            assert!(ex.Shutdown.is_some(), "Shutdown should be set");
            assert!(ex.TryPlayerMove.is_some(), "TryPlayerMove should be set");
            assert!(ex.CategorizePosition.is_some(), "CategorizePosition should be set");
            assert!(ex.ProcessMovePre.is_some(), "ProcessMovePre should be set");
            assert!(ex.ProcessMovePost.is_some(), "ProcessMovePost should be set");
            assert!(ex.ClientDisconnect.is_some(), "ClientDisconnect should be set");
        }
    }

    #[test]
    fn test_get_api_null_import_returns_null() {
        let ptr = unsafe { GetRampFixApi(std::ptr::null_mut()) };
        assert!(ptr.is_null());
    }

    // ---- round trip through the stub host ----

    #[test]
    fn test_hooks_route_through_host() {
        let mut gi = stub_import();
        unsafe {
            let ex = &*GetRampFixApi(&mut gi);
            assert_eq!(ex.Init.unwrap()(), 1);

            let mut buf = [0u8; 64];
            let mv = buf.as_mut_ptr() as *mut move_data_t;
            mv_write_vec3(mv, ORIGIN_OFFSET, &[0.0, 0.0, 100.0]);
            mv_write_vec3(mv, VELOCITY_OFFSET, &[100.0, 0.0, 0.0]);
            let mut service = 0u8;
            let service = &mut service as *mut u8 as *mut movement_service_t;

            let calls = ORIGINAL_CALLS.load(Ordering::SeqCst);
            ex.ProcessMovePre.unwrap()(7);
            ex.TryPlayerMove.unwrap()(
                service,
                mv,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            );
            ex.ProcessMovePost.unwrap()(7);
            ex.CategorizePosition.unwrap()(service, mv, false);

            assert_eq!(ORIGINAL_CALLS.load(Ordering::SeqCst), calls + 2);
            assert!(TRACES.load(Ordering::SeqCst) > 0);
            // open air: nothing to correct, host result stands
            assert_eq!(mv_read_vec3(mv, ORIGIN_OFFSET), [0.0, 0.0, 101.0]);
            assert_eq!(mv_read_vec3(mv, VELOCITY_OFFSET), [100.0, 0.0, 0.0]);

            let rf = RAMPFIX.lock();
            assert!(rf.as_ref().unwrap().player(7).unwrap().ran_this_tick);
            drop(rf);

            ex.ClientDisconnect.unwrap()(7);
            ex.ClientDisconnect.unwrap()(-1);

            // a busy state falls through to the host instead of blocking
            let held = RAMPFIX.lock();
            let calls = ORIGINAL_CALLS.load(Ordering::SeqCst);
            ex.TryPlayerMove.unwrap()(
                service,
                mv,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            );
            ex.CategorizePosition.unwrap()(service, mv, false);
            assert_eq!(ORIGINAL_CALLS.load(Ordering::SeqCst), calls + 2);
            assert_eq!(mv_read_vec3(mv, ORIGIN_OFFSET), [0.0, 0.0, 102.0]);
            assert!(!held.as_ref().unwrap().player(7).unwrap().ran_this_tick);
            drop(held);

            ex.Shutdown.unwrap()();
            assert!(RAMPFIX.lock().is_none());
        }
    }
}
