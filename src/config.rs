//! Engine configuration.
//!
//! Every section has sensible defaults. A configuration can be read from
//! YAML and then overridden from `OLAP_DIALOGUE_*` environment variables
//! (a `.env` file is honoured).

use crate::error::{DialogueError, Result};
use olap_dialogue_types::{QueryShape, SlotType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    pub solver: SolverSettings,
    pub intent: IntentSettings,
    pub registry: RegistryConfig,

    /// Upper bound on internal events raised while handling one external
    /// event. Exceeding it is an execution error.
    pub max_internal_steps: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            solver: SolverSettings::default(),
            intent: IntentSettings::default(),
            registry: RegistryConfig::default(),
            max_internal_steps: 16,
        }
    }
}

impl DialogueConfig {
    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| DialogueError::Config(e.to_string()))?;
        config.validate()
    }

    /// Defaults overridden from the environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::default().with_env_overrides()
    }

    /// Apply `OLAP_DIALOGUE_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_parse::<usize>("OLAP_DIALOGUE_QUEUE_CAPACITY")? {
            self.registry.queue_capacity = v;
        }
        if let Some(v) = env_parse::<u64>("OLAP_DIALOGUE_IDLE_TIMEOUT_SECS")? {
            self.registry.idle_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("OLAP_DIALOGUE_SOLVER_MAX_STEPS")? {
            self.solver.max_steps = v;
        }
        if let Some(v) = env_parse::<u64>("OLAP_DIALOGUE_SOLVER_TIME_LIMIT_MS")? {
            self.solver.time_limit_ms = Some(v);
        }
        if let Some(v) = env_parse::<f64>("OLAP_DIALOGUE_MIN_CONFIDENCE")? {
            self.intent.min_confidence = v;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.registry.queue_capacity == 0 {
            return Err(DialogueError::Config(
                "registry.queue_capacity must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.intent.min_confidence) {
            return Err(DialogueError::Config(format!(
                "intent.min_confidence must be within [0, 1], got {}",
                self.intent.min_confidence
            )));
        }
        if self.max_internal_steps == 0 {
            return Err(DialogueError::Config(
                "max_internal_steps must be at least 1".into(),
            ));
        }
        Ok(self)
    }

    pub fn solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    pub fn intent(mut self, intent: IntentSettings) -> Self {
        self.intent = intent;
        self
    }

    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| DialogueError::Config(format!("{key}: {e}"))),
        Err(_) => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Which slot types the solver fills, and how long it may search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub use_levels: bool,
    pub use_level_predicates: bool,
    pub use_base_measure_predicates: bool,
    pub use_aggregate_measure_predicates: bool,

    /// Search nodes visited per solve before returning the best so far.
    pub max_steps: u64,

    /// Optional wall-clock bound per solve, in milliseconds. Unset by
    /// default so that a solve depends on `max_steps` alone and gives the
    /// same answer on a loaded machine.
    pub time_limit_ms: Option<u64>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            use_levels: true,
            use_level_predicates: true,
            use_base_measure_predicates: false,
            use_aggregate_measure_predicates: false,
            max_steps: 50_000,
            time_limit_ms: None,
        }
    }
}

impl SolverSettings {
    /// Every slot type enabled (comparative types still depend on the shape).
    pub fn all_enabled() -> Self {
        Self {
            use_levels: true,
            use_level_predicates: true,
            use_base_measure_predicates: true,
            use_aggregate_measure_predicates: true,
            ..Default::default()
        }
    }

    pub fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit_ms = limit.map(|d| d.as_millis() as u64);
        self
    }

    /// Slot types the solver may fill for a query of `shape`.
    pub fn enabled_slot_types(&self, shape: QueryShape) -> BTreeSet<SlotType> {
        let mut enabled = BTreeSet::from([SlotType::Measure]);
        if self.use_levels {
            enabled.insert(SlotType::Level);
        }
        if self.use_level_predicates {
            enabled.insert(SlotType::LevelPredicate);
        }
        if self.use_base_measure_predicates {
            enabled.insert(SlotType::BaseMeasurePredicate);
        }
        if self.use_aggregate_measure_predicates {
            enabled.insert(SlotType::MeasurePredicate);
        }
        if shape == QueryShape::Comparative {
            enabled.extend([
                SlotType::ComparativeMeasure,
                SlotType::ComparativeMeasurePredicate,
                SlotType::JoinConditionPredicate,
            ]);
        }
        enabled
    }
}

// ---------------------------------------------------------------------------
// Intent resolution
// ---------------------------------------------------------------------------

/// Thresholds for resolving free text against offered options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentSettings {
    /// Option matches below this confidence are ignored.
    pub min_confidence: f64,
}

impl Default for IntentSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Session registry sizing and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Bounded event queue per session.
    pub queue_capacity: usize,

    /// Sessions idle longer than this are removed by the reaper.
    pub idle_timeout_secs: u64,

    /// How often the reaper looks for idle sessions.
    pub reaper_interval_secs: u64,

    /// Buffer of the situation change broadcast channel.
    pub notification_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            idle_timeout_secs: 30 * 60,
            reaper_interval_secs: 60,
            notification_capacity: 256,
        }
    }
}

impl RegistryConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs.max(1))
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn idle_timeout_secs(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }
}
