// Policy oracle: the learned scorer behind every move
//
// The engine treats an oracle as an opaque function of
// (state pair, probe action, turn x2, health x2) -> four scores. One oracle
// is loaded per supported board size when the process starts and is only
// read afterwards.

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::ops::{Add, AddAssign};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::OracleConfig;
use crate::error::{DecisionError, OracleError};
use crate::grid::StatePair;
use crate::types::Direction;

/// Number of actions the policy scores
pub const ACTIONS: usize = 4;
/// Trailing scalar inputs: probe x2, turn x2, health x2
pub const SCALAR_INPUTS: usize = 6;

/// Per-direction preference scores in [up, down, left, right] order
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreVector(pub [f32; ACTIONS]);

impl ScoreVector {
    pub fn zeros() -> Self {
        ScoreVector([0.0; ACTIONS])
    }

    /// Highest-scoring direction; ties go to the earliest in the fixed order
    pub fn argmax(&self) -> Direction {
        let mut best = 0;
        for i in 1..ACTIONS {
            if self.0[i] > self.0[best] {
                best = i;
            }
        }
        Direction::all()[best]
    }

    /// Numerically stable softmax over raw logits
    pub fn softmax(logits: [f32; ACTIONS]) -> Self {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut out = [0.0; ACTIONS];
        let mut total = 0.0;
        for (o, l) in out.iter_mut().zip(logits.iter()) {
            *o = (l - max).exp();
            total += *o;
        }
        for o in out.iter_mut() {
            *o /= total;
        }
        ScoreVector(out)
    }
}

impl Add for ScoreVector {
    type Output = ScoreVector;

    fn add(mut self, rhs: ScoreVector) -> ScoreVector {
        self += rhs;
        self
    }
}

impl AddAssign for ScoreVector {
    fn add_assign(&mut self, rhs: ScoreVector) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a += b;
        }
    }
}

/// A stateless scorer that is safe to call from many requests at once
pub trait PolicyOracle: Send + Sync {
    fn score(
        &self,
        states: &StatePair,
        probe: usize,
        turn: [f32; 2],
        health: [f32; 2],
    ) -> Result<ScoreVector, OracleError>;
}

/// Equal preference for every direction
pub struct UniformPolicy;

impl PolicyOracle for UniformPolicy {
    fn score(
        &self,
        _states: &StatePair,
        probe: usize,
        _turn: [f32; 2],
        _health: [f32; 2],
    ) -> Result<ScoreVector, OracleError> {
        if probe >= ACTIONS {
            return Err(OracleError::ProbeOutOfRange(probe));
        }
        Ok(ScoreVector([1.0 / ACTIONS as f32; ACTIONS]))
    }
}

/// On-disk form of a [`LinearPolicy`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModelFile {
    pub board_size: u32,
    pub weights: Vec<Vec<f32>>, // [ACTIONS][input_len]
    pub bias: Vec<f32>,
}

/// Single softmax-linear layer over the flattened state pair and scalars
#[derive(Debug, Clone)]
pub struct LinearPolicy {
    board_size: u32,
    weights: Vec<Vec<f32>>,
    bias: [f32; ACTIONS],
}

impl LinearPolicy {
    pub fn from_model(model: LinearModelFile) -> Result<Self, OracleError> {
        if model.weights.len() != ACTIONS {
            return Err(OracleError::MalformedModel(format!(
                "expected {} weight rows, found {}",
                ACTIONS,
                model.weights.len()
            )));
        }
        let width = model.weights[0].len();
        if width < SCALAR_INPUTS || model.weights.iter().any(|row| row.len() != width) {
            return Err(OracleError::MalformedModel(
                "weight rows must share one length covering the scalar inputs".to_string(),
            ));
        }
        let bias: [f32; ACTIONS] = model.bias.as_slice().try_into().map_err(|_| {
            OracleError::MalformedModel(format!(
                "expected {} bias values, found {}",
                ACTIONS,
                model.bias.len()
            ))
        })?;
        Ok(LinearPolicy {
            board_size: model.board_size,
            weights: model.weights,
            bias,
        })
    }

    /// Loads a JSON model file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OracleError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| OracleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: LinearModelFile =
            serde_json::from_str(&contents).map_err(|source| OracleError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_model(model)
    }

    pub fn board_size(&self) -> u32 {
        self.board_size
    }

    /// Inputs the model consumes per call
    pub fn input_len(&self) -> usize {
        self.weights[0].len()
    }
}

impl PolicyOracle for LinearPolicy {
    fn score(
        &self,
        states: &StatePair,
        probe: usize,
        turn: [f32; 2],
        health: [f32; 2],
    ) -> Result<ScoreVector, OracleError> {
        if probe >= ACTIONS {
            return Err(OracleError::ProbeOutOfRange(probe));
        }
        let actual = states.value_count() + SCALAR_INPUTS;
        if actual != self.input_len() {
            return Err(OracleError::InputShape {
                expected: self.input_len(),
                actual,
            });
        }

        let p = probe as f32;
        let scalars = [p, p, turn[0], turn[1], health[0], health[1]];
        let mut logits = self.bias;
        for (logit, row) in logits.iter_mut().zip(self.weights.iter()) {
            let inputs = states
                .previous()
                .as_slice()
                .iter()
                .chain(states.current().as_slice())
                .chain(scalars.iter());
            *logit += row.iter().zip(inputs).map(|(w, x)| w * x).sum::<f32>();
        }
        Ok(ScoreVector::softmax(logits))
    }
}

/// Read-only registry of oracles keyed by board size
#[derive(Clone, Default)]
pub struct OracleSet {
    oracles: HashMap<u32, Arc<dyn PolicyOracle>>,
}

impl OracleSet {
    pub fn new() -> Self {
        OracleSet::default()
    }

    /// Adds an oracle for a board size, replacing any earlier one
    pub fn with_oracle(mut self, board_size: u32, oracle: Arc<dyn PolicyOracle>) -> Self {
        self.oracles.insert(board_size, oracle);
        self
    }

    /// Loads `policy-<k>x<k>.json` from the model directory for every configured size
    pub fn load(config: &OracleConfig) -> Result<Self, OracleError> {
        let mut set = OracleSet::new();
        for &size in &config.supported_board_sizes {
            let path = Self::model_path(&config.model_dir, size);
            let policy = LinearPolicy::load(&path)?;
            if policy.board_size() != size {
                return Err(OracleError::MalformedModel(format!(
                    "{} declares board size {}, expected {}",
                    path.display(),
                    policy.board_size(),
                    size
                )));
            }
            info!(
                "Loaded policy for {}x{} boards ({} inputs) from {}",
                size,
                size,
                policy.input_len(),
                path.display()
            );
            set.oracles.insert(size, Arc::new(policy));
        }
        Ok(set)
    }

    pub fn model_path<P: AsRef<Path>>(model_dir: P, board_size: u32) -> PathBuf {
        model_dir
            .as_ref()
            .join(format!("policy-{}x{}.json", board_size, board_size))
    }

    /// Oracle for an exact board size
    pub fn get(&self, board_size: u32) -> Result<&dyn PolicyOracle, DecisionError> {
        self.oracles
            .get(&board_size)
            .map(|o| &**o)
            .ok_or(DecisionError::UnsupportedBoardSize(board_size))
    }

    /// Supported sizes in ascending order
    pub fn board_sizes(&self) -> Vec<u32> {
        let mut sizes: Vec<u32> = self.oracles.keys().copied().collect();
        sizes.sort_unstable();
        sizes
    }
}
