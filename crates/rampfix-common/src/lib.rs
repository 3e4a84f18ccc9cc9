#![allow(clippy::needless_range_loop, clippy::float_cmp, clippy::missing_safety_doc)]

pub mod q_shared;
pub mod cvar;
pub mod game_api;
