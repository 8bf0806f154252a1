use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum GateOptionsError {
    #[error("scenario unlock threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("unknown lesson completion mode: {0}")]
    UnknownCompletionMode(String),
}

//
// ─── COMPLETION MODE ───────────────────────────────────────────────────────────
//

/// The bar every quick-check of a lesson must clear before the lesson can be
/// marked complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMode {
    /// An option has been picked.
    Answered,
    /// An option has been picked and the answer has been revealed.
    Revealed,
    /// The answer has been revealed and the picked option is the correct one.
    Correct,
}

impl CompletionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionMode::Answered => "answered",
            CompletionMode::Revealed => "revealed",
            CompletionMode::Correct => "correct",
        }
    }
}

impl fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionMode {
    type Err = GateOptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "answered" => Ok(Self::Answered),
            "revealed" => Ok(Self::Revealed),
            "correct" => Ok(Self::Correct),
            other => Err(GateOptionsError::UnknownCompletionMode(other.to_owned())),
        }
    }
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

pub const DEFAULT_SCENARIO_UNLOCK_THRESHOLD: f64 = 0.7;

/// Gating options as supplied by a caller or a config file.
///
/// Accepts both camelCase (content-service payloads) and snake_case (TOML)
/// keys. Call [`GateOptions::resolve`] to obtain the canonical [`GatePolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateOptions {
    #[serde(default, alias = "lesson_completion_mode")]
    pub lesson_completion_mode: Option<CompletionMode>,

    /// Legacy switch; ignored whenever `lesson_completion_mode` is set.
    #[serde(default, alias = "require_correct_to_complete")]
    pub require_correct_to_complete: Option<bool>,

    #[serde(
        default = "default_lock_scenarios",
        alias = "lock_scenarios_until_lessons_done"
    )]
    pub lock_scenarios_until_lessons_done: bool,

    #[serde(
        default = "default_unlock_threshold",
        alias = "scenario_unlock_threshold"
    )]
    pub scenario_unlock_threshold: f64,
}

fn default_lock_scenarios() -> bool {
    true
}

fn default_unlock_threshold() -> f64 {
    DEFAULT_SCENARIO_UNLOCK_THRESHOLD
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            lesson_completion_mode: None,
            require_correct_to_complete: None,
            lock_scenarios_until_lessons_done: default_lock_scenarios(),
            scenario_unlock_threshold: default_unlock_threshold(),
        }
    }
}

impl GateOptions {
    #[must_use]
    pub fn with_mode(mut self, mode: CompletionMode) -> Self {
        self.lesson_completion_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.scenario_unlock_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lock(mut self, lock: bool) -> Self {
        self.lock_scenarios_until_lessons_done = lock;
        self
    }

    /// Completion mode after applying the legacy fallback.
    #[must_use]
    pub fn completion_mode(&self) -> CompletionMode {
        match (self.lesson_completion_mode, self.require_correct_to_complete) {
            (Some(mode), _) => mode,
            (None, Some(true)) => CompletionMode::Correct,
            (None, _) => CompletionMode::Revealed,
        }
    }

    /// Normalize into a [`GatePolicy`].
    ///
    /// # Errors
    ///
    /// Returns `GateOptionsError::InvalidThreshold` if the threshold is not a
    /// finite number within `[0, 1]`.
    pub fn resolve(&self) -> Result<GatePolicy, GateOptionsError> {
        let threshold = self.scenario_unlock_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(GateOptionsError::InvalidThreshold(threshold));
        }

        Ok(GatePolicy {
            completion_mode: self.completion_mode(),
            lock_scenarios_until_lessons_done: self.lock_scenarios_until_lessons_done,
            scenario_unlock_threshold: threshold,
        })
    }
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Validated gating configuration held by a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GatePolicy {
    completion_mode: CompletionMode,
    lock_scenarios_until_lessons_done: bool,
    scenario_unlock_threshold: f64,
}

impl GatePolicy {
    #[must_use]
    pub fn completion_mode(&self) -> CompletionMode {
        self.completion_mode
    }

    #[must_use]
    pub fn lock_scenarios_until_lessons_done(&self) -> bool {
        self.lock_scenarios_until_lessons_done
    }

    #[must_use]
    pub fn scenario_unlock_threshold(&self) -> f64 {
        self.scenario_unlock_threshold
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            completion_mode: CompletionMode::Revealed,
            lock_scenarios_until_lessons_done: true,
            scenario_unlock_threshold: DEFAULT_SCENARIO_UNLOCK_THRESHOLD,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
