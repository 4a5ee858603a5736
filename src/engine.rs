// Move decision engine
//
// Reconciles the policy's preference with the safety filter and the
// starvation rule:
// 1. Score the state pair once per probe action (0..4) and sum the vectors.
//    The argmax of the sum, ties to the lowest index, is the preferred move.
// 2. A safe preference is kept unless we are starving and it does not eat.
// 3. An unsafe preference is replaced by a food move when starving,
//    otherwise by a random safe move.
// 4. With no safe move at all the preference stands.

use log::info;
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::DecisionConfig;
use crate::error::DecisionError;
use crate::grid::StatePair;
use crate::oracle::{OracleSet, PolicyOracle, ScoreVector, ACTIONS};
use crate::safety::{safe_moves, MoveSet};
use crate::types::Direction;

/// Per-request facts the engine needs beyond the grids
#[derive(Debug, Clone, PartialEq)]
pub struct TurnContext {
    pub turn: i32,
    pub health: i32,
    pub board_size: u32,
    /// Directions whose destination holds food
    pub food: MoveSet,
}

/// Which branch produced the final move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Preferred move was safe and kept
    FollowedOracle,
    /// Preferred move was safe but we were starving
    FoodOverride,
    /// Preferred move was unsafe and we were starving
    FoodOverUnsafePreference,
    /// Preferred move was unsafe, a random safe move replaced it
    SafeFallback,
    /// Nothing was safe, the preferred move stands
    NoSafeMove,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DecisionReason::FollowedOracle => "followed policy",
            DecisionReason::FoodOverride => "eating food instead of move",
            DecisionReason::FoodOverUnsafePreference => "eating food instead of dying",
            DecisionReason::SafeFallback => "preferred move unsafe, random safe move",
            DecisionReason::NoSafeMove => "no safe move, following policy",
        };
        f.write_str(text)
    }
}

/// Full outcome of one decision, for logging and tests
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub choice: Direction,
    pub preferred: Direction,
    pub safe: MoveSet,
    pub aggregate: ScoreVector,
    pub reason: DecisionReason,
}

/// Turns a state pair into a move using a shared, read-only oracle set
#[derive(Clone)]
pub struct DecisionEngine {
    oracles: Arc<OracleSet>,
    starvation_health_threshold: i32,
    parallel_probes: bool,
}

impl DecisionEngine {
    pub fn new(oracles: Arc<OracleSet>, config: &DecisionConfig) -> Self {
        DecisionEngine {
            oracles,
            starvation_health_threshold: config.starvation_health_threshold,
            parallel_probes: config.parallel_probes,
        }
    }

    /// Chooses the move for this turn
    pub fn decide<R: Rng>(
        &self,
        states: &StatePair,
        ctx: &TurnContext,
        rng: &mut R,
    ) -> Result<Direction, DecisionError> {
        self.decide_detailed(states, ctx, rng).map(|d| d.choice)
    }

    /// Chooses the move and reports how it was reached
    pub fn decide_detailed<R: Rng>(
        &self,
        states: &StatePair,
        ctx: &TurnContext,
        rng: &mut R,
    ) -> Result<Decision, DecisionError> {
        let oracle = self.oracles.get(ctx.board_size)?;
        let aggregate = self.aggregate_scores(oracle, states, ctx)?;
        let preferred = aggregate.argmax();
        let safe = safe_moves(states.current())?;

        let starving = ctx.health < self.starvation_health_threshold
            && !ctx.food.is_empty()
            && !ctx.food.contains(preferred);
        let food_pick = if starving { ctx.food.choose(rng) } else { None };

        let (choice, reason) = match (safe.contains(preferred), food_pick) {
            (true, Some(food)) => (food, DecisionReason::FoodOverride),
            (true, None) => (preferred, DecisionReason::FollowedOracle),
            (false, Some(food)) if !safe.is_empty() => {
                (food, DecisionReason::FoodOverUnsafePreference)
            }
            // An empty safe set yields None here and the preference stands
            (false, _) => match safe.choose(rng) {
                Some(fallback) => (fallback, DecisionReason::SafeFallback),
                None => (preferred, DecisionReason::NoSafeMove),
            },
        };

        if choice != preferred {
            info!(
                "Turn {}: {} ({} -> {}, safe {}, health {})",
                ctx.turn,
                reason,
                preferred.as_str(),
                choice.as_str(),
                safe,
                ctx.health
            );
        }

        Ok(Decision {
            choice,
            preferred,
            safe,
            aggregate,
            reason,
        })
    }

    /// Sum of the oracle's scores over every probe action.
    /// Parallel evaluation still sums in probe order.
    pub fn aggregate_scores(
        &self,
        oracle: &dyn PolicyOracle,
        states: &StatePair,
        ctx: &TurnContext,
    ) -> Result<ScoreVector, DecisionError> {
        let turn = [ctx.turn as f32; 2];
        let health = [ctx.health as f32; 2];

        let scores: Vec<ScoreVector> = if self.parallel_probes {
            (0..ACTIONS)
                .into_par_iter()
                .map(|probe| oracle.score(states, probe, turn, health))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            (0..ACTIONS)
                .map(|probe| oracle.score(states, probe, turn, health))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(scores
            .into_iter()
            .fold(ScoreVector::zeros(), |acc, s| acc + s))
    }
}
