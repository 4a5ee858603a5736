// Occupancy grids and the board state extractor
//
// A GridSnapshot is an (H, W, C) array stored row-major with the channel as
// the fastest axis. Channel 0 marks our head; every other channel marks
// cells a move must not enter. The extractor pads the board with a border so
// head-adjacent lookups never leave the array.

use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::engine::TurnContext;
use crate::error::GridError;
use crate::safety::MoveSet;
use crate::types::{Board, Coord, Direction, GameState};

/// Channel holding the head marker
pub const HEAD_CHANNEL: usize = 0;
/// Channel holding our own body, head excluded
pub const OWN_BODY_CHANNEL: usize = 1;
/// Channel holding every other snake, heads included
pub const OTHER_SNAKES_CHANNEL: usize = 2;
/// Channel marking padding cells around the board
pub const BORDER_CHANNEL: usize = 3;
/// Channels produced by [`GridExtractor`]
pub const EXTRACTED_CHANNELS: usize = 4;

/// Immutable spatial occupancy representation of one turn
#[derive(Debug, Clone, PartialEq)]
pub struct GridSnapshot {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<f32>,
}

impl GridSnapshot {
    /// Wraps raw row-major (H, W, C) data, validating its length
    pub fn new(
        height: usize,
        width: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Result<Self, GridError> {
        if channels < 2 {
            return Err(GridError::TooFewChannels(channels));
        }
        let expected = height * width * channels;
        if data.len() != expected {
            return Err(GridError::ShapeMismatch {
                height,
                width,
                channels,
                expected,
                actual: data.len(),
            });
        }
        Ok(GridSnapshot {
            height,
            width,
            channels,
            data,
        })
    }

    /// Returns (height, width, channels)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }

    /// Flat row-major view, channel fastest
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Sum of every non-head channel at (row, col)
    pub fn occupancy(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let base = self.offset(row, col, 0);
        Some(self.data[base + 1..base + self.channels].iter().sum())
    }

    /// First cell in row-major order where the head channel peaks.
    /// A head channel with no positive cell is treated as absent.
    pub fn head_position(&self) -> Result<(usize, usize), GridError> {
        let mut best: Option<(usize, usize, f32)> = None;
        for row in 0..self.height {
            for col in 0..self.width {
                let value = self.data[self.offset(row, col, HEAD_CHANNEL)];
                match best {
                    Some((_, _, top)) if value <= top => {}
                    _ => best = Some((row, col, value)),
                }
            }
        }
        match best {
            Some((row, col, value)) if value > 0.0 => Ok((row, col)),
            _ => Err(GridError::HeadNotFound),
        }
    }

    fn offset(&self, row: usize, col: usize, channel: usize) -> usize {
        (row * self.width + col) * self.channels + channel
    }
}

/// Mutable builder used while rasterising a board
struct GridBuilder {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl GridBuilder {
    fn new(height: usize, width: usize) -> Self {
        GridBuilder {
            height,
            width,
            data: vec![0.0; height * width * EXTRACTED_CHANNELS],
        }
    }

    fn mark(&mut self, row: usize, col: usize, channel: usize) {
        let idx = (row * self.width + col) * EXTRACTED_CHANNELS + channel;
        self.data[idx] = 1.0;
    }

    fn build(self) -> Result<GridSnapshot, GridError> {
        GridSnapshot::new(self.height, self.width, EXTRACTED_CHANNELS, self.data)
    }
}

/// Previous and current grid, giving the policy temporal context
#[derive(Debug, Clone)]
pub struct StatePair {
    previous: GridSnapshot,
    current: GridSnapshot,
}

impl StatePair {
    pub fn new(previous: GridSnapshot, current: GridSnapshot) -> Result<Self, GridError> {
        if previous.shape() != current.shape() {
            return Err(GridError::LayerMismatch {
                previous: previous.shape(),
                current: current.shape(),
            });
        }
        Ok(StatePair { previous, current })
    }

    /// Pairs a grid with itself, as on the first turn of a game
    pub fn first_turn(current: GridSnapshot) -> Self {
        StatePair {
            previous: current.clone(),
            current,
        }
    }

    pub fn previous(&self) -> &GridSnapshot {
        &self.previous
    }

    pub fn current(&self) -> &GridSnapshot {
        &self.current
    }

    /// Number of values in both layers together
    pub fn value_count(&self) -> usize {
        self.previous.as_slice().len() + self.current.as_slice().len()
    }
}

/// Last grid seen for one of our snakes in one game
struct HistoryEntry {
    turn: i32,
    grid: GridSnapshot,
    seen: Instant,
}

/// Converts raw snapshots into bordered one-versus-all grids and remembers
/// the last grid of each of our snakes, keyed by (game id, snake id)
pub struct GridExtractor {
    border: usize,
    history_ttl: Duration,
    history: Mutex<HashMap<(String, String), HistoryEntry>>,
}

impl GridExtractor {
    /// Creates an extractor; a border below 1 is raised to 1.
    /// Remembered grids not refreshed within `history_ttl` are evicted.
    pub fn new(border: usize, history_ttl: Duration) -> Self {
        GridExtractor {
            border: border.max(1),
            history_ttl,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Builds the (previous, current) pair and the turn context for a request
    pub fn extract(&self, state: &GameState) -> Result<(StatePair, TurnContext), GridError> {
        let current = self.rasterize(&state.board, &state.you.id)?;
        let food = self.food_directions(&state.board, &state.you.body)?;
        let key = (state.game.id.clone(), state.you.id.clone());

        let pair = {
            let mut history = self.history.lock();
            let ttl = self.history_ttl;
            let before = history.len();
            // Games that never sent /end age out here
            history.retain(|_, entry| entry.seen.elapsed() < ttl);
            if history.len() < before {
                debug!("Evicted {} stale grids", before - history.len());
            }

            let previous = match history.get(&key) {
                Some(entry) if entry.turn < state.turn && entry.grid.shape() == current.shape() => {
                    Some(entry.grid.clone())
                }
                _ => None,
            };
            history.insert(
                key,
                HistoryEntry {
                    turn: state.turn,
                    grid: current.clone(),
                    seen: Instant::now(),
                },
            );
            match previous {
                Some(prev) => StatePair::new(prev, current)?,
                None => {
                    debug!(
                        "Game {} snake {}: no earlier grid, pairing turn {} with itself",
                        state.game.id, state.you.id, state.turn
                    );
                    StatePair::first_turn(current)
                }
            }
        };

        let ctx = TurnContext {
            turn: state.turn,
            health: state.you.health,
            board_size: state.board.width,
            food,
        };
        Ok((pair, ctx))
    }

    /// Drops the remembered grids of every snake in a finished game
    pub fn forget(&self, game_id: &str) {
        self.history.lock().retain(|(game, _), _| game.as_str() != game_id);
    }

    /// Number of (game, snake) pairs with a remembered grid
    pub fn tracked_snakes(&self) -> usize {
        self.history.lock().len()
    }

    /// Rasterises a board from the point of view of `you_id`
    pub fn rasterize(&self, board: &Board, you_id: &str) -> Result<GridSnapshot, GridError> {
        let height = board.height as usize + 2 * self.border;
        let width = board.width as usize + 2 * self.border;
        let mut grid = GridBuilder::new(height, width);

        for row in 0..height {
            for col in 0..width {
                let inside = row >= self.border
                    && row < height - self.border
                    && col >= self.border
                    && col < width - self.border;
                if !inside {
                    grid.mark(row, col, BORDER_CHANNEL);
                }
            }
        }

        for snake in board.snakes.iter().filter(|s| s.health > 0) {
            if snake.body.is_empty() {
                return Err(GridError::EmptyBody(snake.id.clone()));
            }
            let ours = snake.id == you_id;
            for (i, coord) in snake.body.iter().enumerate() {
                let (row, col) = self.cell(board, coord)?;
                let channel = match (ours, i) {
                    (true, 0) => HEAD_CHANNEL,
                    (true, _) => OWN_BODY_CHANNEL,
                    (false, _) => OTHER_SNAKES_CHANNEL,
                };
                grid.mark(row, col, channel);
            }
        }

        grid.build()
    }

    /// Directions whose destination from our head holds food
    pub fn food_directions(&self, board: &Board, body: &[Coord]) -> Result<MoveSet, GridError> {
        let head = body
            .first()
            .ok_or_else(|| GridError::EmptyBody("you".to_string()))?;
        Ok(Direction::all()
            .into_iter()
            .filter(|dir| board.food.contains(&dir.apply(head)))
            .collect())
    }

    /// Grid (row, col) of a board coordinate, including the border offset
    fn cell(&self, board: &Board, coord: &Coord) -> Result<(usize, usize), GridError> {
        if coord.x < 0
            || coord.y < 0
            || coord.x >= board.width as i32
            || coord.y >= board.height as i32
        {
            return Err(GridError::CoordOffBoard {
                x: coord.x,
                y: coord.y,
                width: board.width,
                height: board.height,
            });
        }
        let row = self.border + (board.height as usize - 1 - coord.y as usize);
        let col = self.border + coord.x as usize;
        Ok((row, col))
    }
}
