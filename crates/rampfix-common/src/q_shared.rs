// q_shared.rs - foundational types and functions shared by all modules

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];

pub const VEC3_ORIGIN: Vec3 = [0.0, 0.0, 0.0];

/// Single-precision machine epsilon as the host's movement code spells it.
pub const FLT_EPSILON: f32 = 1.19209e-07;

/// Lengths at or below this carry no usable direction.
pub const NORMALIZE_EPSILON: f32 = 1e-12;

pub const MAX_PLAYERS: usize = 64;

/// Bump iterations per movement step, same cap as the host.
pub const MAX_BUMPS: usize = 4;
pub const MAX_CLIP_PLANES: usize = 5;

// ============================================================
// Player bounding box
// ============================================================

pub const PLAYER_MINS: Vec3 = [-16.0, -16.0, 0.0];
pub const PLAYER_MAXS_STANDING: Vec3 = [16.0, 16.0, 72.0];
pub const PLAYER_MAXS_DUCKED: Vec3 = [16.0, 16.0, 54.0];

/// Axis-aligned hull relative to the entity origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerBBox {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl PlayerBBox {
    /// One of the two fixed hull presets.
    pub fn for_ducked(ducked: bool) -> Self {
        Self {
            mins: PLAYER_MINS,
            maxs: if ducked {
                PLAYER_MAXS_DUCKED
            } else {
                PLAYER_MAXS_STANDING
            },
        }
    }
}

impl Default for PlayerBBox {
    fn default() -> Self {
        Self::for_ducked(false)
    }
}

// ============================================================
// Collision filter
// ============================================================

bitflags::bitflags! {
    /// Collision layers a mover interacts with.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct InteractionLayers: u64 {
        const SOLID          = 0x0000_0001;
        const HITBOXES       = 0x0000_0002;
        const TRIGGER        = 0x0000_0004;
        const SKY            = 0x0000_0008;
        const PLAYER_CLIP    = 0x0000_0010;
        const NPC_CLIP       = 0x0000_0020;
        const BLOCK_LOS      = 0x0000_0040;
        const BLOCK_LIGHT    = 0x0000_0080;
        const LADDER         = 0x0000_0100;
        const PICKUP         = 0x0000_0200;
        const BLOCK_SOUND    = 0x0000_0400;
        const NODRAW         = 0x0000_0800;
        const WINDOW         = 0x0000_1000;
        const PASS_BULLETS   = 0x0000_2000;
        const WORLD_GEOMETRY = 0x0000_4000;
        const WATER          = 0x0000_8000;
        const SLIME          = 0x0001_0000;
        const TOUCH_ALL      = 0x0002_0000;
        const PLAYER         = 0x0004_0000;
        const NPC            = 0x0008_0000;
        const DEBRIS         = 0x0010_0000;
        const PHYSICS_PROP   = 0x0020_0000;
    }
}

/// Flags chosen when the host does not report an interaction mask.
pub const MASK_PLAYERSOLID: InteractionLayers = InteractionLayers::SOLID
    .union(InteractionLayers::PLAYER_CLIP)
    .union(InteractionLayers::WINDOW)
    .union(InteractionLayers::PASS_BULLETS)
    .union(InteractionLayers::PLAYER)
    .union(InteractionLayers::NPC)
    .union(InteractionLayers::PHYSICS_PROP);

/// Query parameters for one player-movement trace. Built fresh per call,
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceFilter {
    pub interacts_with: InteractionLayers,
    /// Entity index of the mover, skipped by the query.
    pub ignore_entity: i32,
    /// Also test against non-world entities (set for ground classification).
    pub iterate_entities: bool,
}

impl TraceFilter {
    pub fn player_movement(interacts_with: InteractionLayers, ignore_entity: i32) -> Self {
        Self {
            interacts_with,
            ignore_entity,
            iterate_entities: false,
        }
    }

    pub fn with_entities(mut self) -> Self {
        self.iterate_entities = true;
        self
    }
}

impl Default for TraceFilter {
    fn default() -> Self {
        Self::player_movement(MASK_PLAYERSOLID, -1)
    }
}

// ============================================================
// Trace
// ============================================================

/// Result of sweeping a hull from `start_pos` toward an end point.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub start_pos: Vec3,
    pub end_pos: Vec3,
    /// Unit contact normal, or the zero vector when nothing was hit.
    pub plane_normal: Vec3,
    /// 0 = immediate contact, 1 = moved the entire distance.
    pub fraction: f32,
    pub start_solid: bool,
    pub exact_hit_point: bool,
}

impl Trace {
    /// An un-hit trace that covered `start -> end` completely.
    pub fn clear(start: &Vec3, end: &Vec3) -> Self {
        Self {
            start_pos: *start,
            end_pos: *end,
            ..Self::default()
        }
    }

    pub fn did_hit(&self) -> bool {
        self.fraction < 1.0 || self.start_solid
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            start_pos: [0.0; 3],
            end_pos: [0.0; 3],
            plane_normal: [0.0; 3],
            fraction: 1.0,
            start_solid: false,
            exact_hit_point: false,
        }
    }
}

// ============================================================
// Movement types
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MoveType {
    #[default]
    None = 0,
    Isometric = 1,
    Walk = 2,
    Fly = 3,
    FlyGravity = 4,
    VPhysics = 5,
    Push = 6,
    Noclip = 7,
    Observer = 8,
    Ladder = 9,
    Custom = 10,
}

impl MoveType {
    pub fn from_raw(v: u8) -> Self {
        match v {
            1 => Self::Isometric,
            2 => Self::Walk,
            3 => Self::Fly,
            4 => Self::FlyGravity,
            5 => Self::VPhysics,
            6 => Self::Push,
            7 => Self::Noclip,
            8 => Self::Observer,
            9 => Self::Ladder,
            10 => Self::Custom,
            _ => Self::None,
        }
    }
}

// ============================================================
// MATHLIB - Vector operations
// ============================================================

#[inline]
pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// veca + scale * vecb
#[inline]
pub fn vector_ma(veca: &Vec3, scale: f32, vecb: &Vec3) -> Vec3 {
    [
        veca[0] + scale * vecb[0],
        veca[1] + scale * vecb[1],
        veca[2] + scale * vecb[2],
    ]
}

#[inline]
pub fn vector_scale(v: &Vec3, scale: f32) -> Vec3 {
    [v[0] * scale, v[1] * scale, v[2] * scale]
}

pub fn vector_compare(v1: &Vec3, v2: &Vec3) -> bool {
    v1[0] == v2[0] && v1[1] == v2[1] && v1[2] == v2[2]
}

pub fn vector_length(v: &Vec3) -> f32 {
    dot_product(v, v).sqrt()
}

/// Length of the horizontal (x, y) part.
pub fn vector_length_2d(v: &Vec3) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

/// Normalize in place, returns original length. Degenerate input is
/// zeroed instead of divided.
pub fn vector_normalize(v: &mut Vec3) -> f32 {
    let length = vector_length(v);
    if length > NORMALIZE_EPSILON {
        let ilength = 1.0 / length;
        v[0] *= ilength;
        v[1] *= ilength;
        v[2] *= ilength;
    } else {
        *v = VEC3_ORIGIN;
    }
    length
}

/// Unit copy of `v`; the zero vector when `v` has no meaningful direction.
pub fn vector_normalized(v: &Vec3) -> Vec3 {
    let mut out = *v;
    vector_normalize(&mut out);
    out
}

pub fn cross_product(v1: &Vec3, v2: &Vec3) -> Vec3 {
    [
        v1[1] * v2[2] - v1[2] * v2[1],
        v1[2] * v2[0] - v1[0] * v2[2],
        v1[0] * v2[1] - v1[1] * v2[0],
    ]
}
