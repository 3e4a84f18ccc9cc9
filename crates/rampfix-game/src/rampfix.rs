//! Interception entry points.
//!
//! `RampFix` owns the per-player table and the tunables. The host calls
//! [`RampFix::process_move_pre`] and [`RampFix::process_move_post`] around
//! each player's movement processing, and routes its movement step and
//! ground classification through [`RampFix::try_player_move`] and
//! [`RampFix::categorize_position`], passing its own implementation as the
//! `original` continuation.

use log::{debug, trace};

use rampfix_common::cvar::CvarContext;
use rampfix_common::q_shared::{dot_product, Trace, Vec3};

use crate::error::RampFixError;
use crate::move_import::{ground_filter, is_airborne_walk, movement_filter, player_bbox, MovementEntity, TraceWorld};
use crate::rf_config::RampFixConfig;
use crate::rf_ground::ground_snap;
use crate::rf_local::{PerPlayerState, PlayerTable};
use crate::rf_move::{MoveInput, MoveSolver};
use crate::rf_reconcile::reconcile;

/// The host's mutable movement record for one step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveData {
    pub origin: Vec3,
    pub velocity: Vec3,
}

pub struct RampFix {
    config: RampFixConfig,
    players: PlayerTable,
}

impl Default for RampFix {
    fn default() -> Self {
        Self::new(RampFixConfig::default())
    }
}

impl RampFix {
    pub fn new(config: RampFixConfig) -> Self {
        Self {
            config,
            players: PlayerTable::default(),
        }
    }

    pub fn from_cvars(cv: &CvarContext) -> Self {
        Self::new(RampFixConfig::from_cvars(cv))
    }

    pub fn config(&self) -> &RampFixConfig {
        &self.config
    }

    pub fn player(&self, slot: usize) -> Result<&PerPlayerState, RampFixError> {
        self.players.get(slot)
    }

    pub fn process_move_pre(&mut self, slot: usize) {
        if let Ok(state) = self.players.get_mut(slot) {
            state.ran_this_tick = false;
        }
    }

    /// A tick without a movement step invalidates the remembered plane.
    pub fn process_move_post(&mut self, slot: usize) {
        if let Ok(state) = self.players.get_mut(slot) {
            if !state.ran_this_tick {
                state.forget_plane();
            }
        }
    }

    pub fn client_disconnect(&mut self, slot: usize) {
        self.players.clear(slot);
    }

    fn resolve_slot<E: MovementEntity + ?Sized>(&self, ent: &E) -> Result<usize, RampFixError> {
        if !self.config.enabled {
            return Err(RampFixError::Disabled);
        }
        let slot = ent.player_slot().ok_or(RampFixError::NoController)?;
        self.players.get(slot)?;
        Ok(slot)
    }

    /// Movement step interception: pre-pass solve, host step, reconcile.
    ///
    /// `first` is the destination and trace the host precomputed for its
    /// first bump, when it has them.
    pub fn try_player_move<W, E, F>(
        &mut self,
        world: &W,
        ent: &E,
        mv: &mut MoveData,
        first: Option<(&Vec3, &Trace)>,
        frame_time: f32,
        original: F,
    ) where
        W: TraceWorld + ?Sized,
        E: MovementEntity + ?Sized,
        F: FnOnce(&mut MoveData),
    {
        let slot = match self.resolve_slot(ent) {
            Ok(slot) => slot,
            Err(e) => {
                trace!("try_player_move: {}", e);
                original(mv);
                return;
            }
        };

        let config = self.config;
        let Ok(state) = self.players.get_mut(slot) else {
            original(mv);
            return;
        };
        state.begin_move();

        if dot_product(&mv.velocity, &mv.velocity) == 0.0 {
            original(mv);
            return;
        }

        let solver = MoveSolver::new(world, &config, player_bbox(ent), movement_filter(ent));
        let input = MoveInput {
            origin: mv.origin,
            velocity: mv.velocity,
            frame_time,
            airborne_walk: is_airborne_walk(ent),
            first: first.map(|(dest, tr)| (*dest, tr)),
        };
        solver.solve(state, &input);

        original(mv);

        let host_velocity = mv.velocity;
        if reconcile(state, mv, &config) && config.debug {
            debug!(
                "slot {}: host velocity {:?} replaced by {:?}",
                slot, host_velocity, state.corrected_velocity
            );
        }
    }

    /// Ground classification interception. `original` receives the
    /// (possibly nudged) move data and `stay_on_ground` unchanged.
    pub fn categorize_position<W, E, F>(&mut self, world: &W, ent: &E, mv: &mut MoveData, stay_on_ground: bool, original: F)
    where
        W: TraceWorld + ?Sized,
        E: MovementEntity + ?Sized,
        F: FnOnce(&mut MoveData, bool),
    {
        if let Err(e) = self.try_ground_snap(world, ent, mv, stay_on_ground) {
            trace!("categorize_position: {}", e);
        }
        original(mv, stay_on_ground);
    }

    fn try_ground_snap<W, E>(&self, world: &W, ent: &E, mv: &mut MoveData, stay_on_ground: bool) -> Result<(), RampFixError>
    where
        W: TraceWorld + ?Sized,
        E: MovementEntity + ?Sized,
    {
        if !ent.is_alive() {
            return Err(RampFixError::NotAlive);
        }
        let slot = self.resolve_slot(ent)?;
        if !self.config.ground_fix {
            return Ok(());
        }

        let state = self.players.get(slot)?;
        if let Some(origin) = ground_snap(
            world,
            &state.last_valid_plane_normal,
            &mv.origin,
            &mv.velocity,
            stay_on_ground,
            &player_bbox(ent),
            &ground_filter(ent),
            &self.config,
        ) {
            mv.origin = origin;
        }
        Ok(())
    }
}
