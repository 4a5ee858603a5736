// Welcome to
// __________         __    __  .__                               __
// \______   \_____ _/  |__/  |_|  |   ____   ______ ____ _____  |  | __ ____
//  |    |  _/\__  \\   __\   __\  | _/ __ \ /  ___//    \\__  \ |  |/ // __ \
//  |    |   \ / __ \|  |  |  | |  |_\  ___/ \___ \|   |  \/ __ \|    <\  ___/
//  |________/(______/__|  |__| |____/\_____>______>___|__(______/__|__\\_____>
//
// This snake asks a pretrained policy network for its move every turn and
// overrides it only to avoid dying or starving.

use log::info;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::engine::DecisionEngine;
use crate::error::DecisionError;
use crate::grid::GridExtractor;
use crate::oracle::OracleSet;
use crate::types::{Battlesnake, Board, Game, GameState};

/// Battlesnake Bot with OOP-style API
/// Takes static configuration dependencies and exposes methods corresponding to API endpoints
pub struct Bot {
    config: Config,
    extractor: Arc<GridExtractor>,
    engine: DecisionEngine,
    debug_logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    /// * `oracles` - Policy models loaded once at startup, one per board size
    pub fn new(config: Config, oracles: OracleSet) -> Self {
        let extractor = Arc::new(GridExtractor::new(
            config.grid.border,
            Duration::from_secs(config.grid.history_ttl_secs),
        ));
        let engine = DecisionEngine::new(Arc::new(oracles), &config.decision);
        Bot {
            config,
            extractor,
            engine,
            debug_logger: DebugLogger::disabled(),
        }
    }

    /// Attaches a decision log
    pub fn with_debug_logger(mut self, debug_logger: DebugLogger) -> Self {
        self.debug_logger = debug_logger;
        self
    }

    /// Returns bot metadata and appearance
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        let appearance = &self.config.appearance;
        json!({
            "apiversion": "1",
            "author": appearance.author,
            "color": appearance.color,
            "head": appearance.head,
            "tail": appearance.tail,
        })
    }

    /// Called when a game starts
    /// Corresponds to POST /start endpoint
    pub fn start(&self, game: &Game, _turn: &i32, board: &Board, _you: &Battlesnake) {
        info!("GAME START {} ({}x{})", game.id, board.width, board.height);
    }

    /// Called when a game ends, drops the remembered grid of the game
    /// Corresponds to POST /end endpoint
    pub fn end(&self, game: &Game, turn: &i32, _board: &Board, _you: &Battlesnake) {
        self.extractor.forget(&game.id);
        info!("GAME OVER {} after {} turns", game.id, turn);
    }

    /// Computes and returns the next move
    /// Corresponds to POST /move endpoint
    ///
    /// Grid extraction and policy inference are CPU-bound, so they run on the
    /// blocking pool. Any failure is returned to the caller unchanged.
    ///
    /// # Returns
    /// * `Value` - JSON response containing the chosen move direction
    pub async fn get_move(&self, state: GameState) -> Result<Value, DecisionError> {
        let start_time = Instant::now();
        let game_id = state.game.id.clone();
        let turn = state.turn;
        let health = state.you.health;

        let extractor = self.extractor.clone();
        let engine = self.engine.clone();

        let decision = tokio::task::spawn_blocking(move || {
            let (states, ctx) = extractor.extract(&state)?;
            engine.decide_detailed(&states, &ctx, &mut rand::rng())
        })
        .await
        .map_err(|e| DecisionError::TaskAborted(e.to_string()))??;

        info!(
            "Turn {}: Chose {} (preferred: {}, safe: {}, {}, time: {}ms)",
            turn,
            decision.choice.as_str(),
            decision.preferred.as_str(),
            decision.safe,
            decision.reason,
            start_time.elapsed().as_millis()
        );

        self.debug_logger.log_decision(&game_id, turn, health, &decision);

        Ok(json!({ "move": decision.choice.as_str() }))
    }

    pub fn extractor(&self) -> &GridExtractor {
        &self.extractor
    }
}
