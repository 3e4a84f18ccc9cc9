#![allow(clippy::needless_range_loop, clippy::float_cmp, clippy::too_many_arguments)]

pub mod error;
pub mod move_import;
pub mod rf_config;
pub mod rf_local;
pub mod rf_move;
pub mod rf_pierce;
pub mod rf_reconcile;
pub mod rf_ground;
pub mod rampfix;

#[cfg(test)]
mod test_worlds;

pub use error::RampFixError;
pub use rampfix::{MoveData, RampFix};
