use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use floor_flow_shared::{fold_rules::FoldRuleSet, EngineConfig};

const DEFAULT_DB_PATH: &str = "data/floorflow.db";
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 300;
const MIN_SWEEP_INTERVAL_SECONDS: u64 = 10;
const DEFAULT_NOTIFY_QUEUE: usize = 256;

#[derive(Clone, Debug)]
pub struct FloorFlowConfig {
    pub db_path: PathBuf,
    pub sweep_interval: Duration,
    pub sweep_on_start: bool,
    pub hot_top_k: Option<usize>,
    pub fold_threshold: Option<usize>,
    /// `None` disables periodic word-list reloads.
    pub words_reload_interval: Option<Duration>,
    pub words_file: Option<PathBuf>,
    pub fold_rules_file: Option<PathBuf>,
    pub notify_queue: usize,
}

impl FloorFlowConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let number = |key: &str| text(key).and_then(|value| value.parse::<u64>().ok());

        let db_path = text("FLOORFLOW_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let sweep_interval_seconds = number("FLOORFLOW_SWEEP_INTERVAL_SECONDS")
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECONDS)
            .max(MIN_SWEEP_INTERVAL_SECONDS);
        let sweep_on_start = text("FLOORFLOW_SWEEP_ON_START")
            .map(|value| parse_bool_env(&value))
            .unwrap_or(true);
        let words_reload_interval = number("FLOORFLOW_WORDS_RELOAD_SECONDS")
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs);
        let notify_queue = number("FLOORFLOW_NOTIFY_QUEUE")
            .map(|value| value as usize)
            .unwrap_or(DEFAULT_NOTIFY_QUEUE)
            .max(1);

        Self {
            db_path,
            sweep_interval: Duration::from_secs(sweep_interval_seconds),
            sweep_on_start,
            hot_top_k: number("FLOORFLOW_HOT_TOP_K").map(|value| value as usize),
            fold_threshold: number("FLOORFLOW_FOLD_THRESHOLD").map(|value| value as usize),
            words_reload_interval,
            words_file: text("FLOORFLOW_WORDS_FILE").map(PathBuf::from),
            fold_rules_file: text("FLOORFLOW_FOLD_RULES_FILE").map(PathBuf::from),
            notify_queue,
        }
    }

    /// Engine tunables with env overrides and the optional rule table applied.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::default();
        if let Some(top_k) = self.hot_top_k.filter(|value| *value > 0) {
            config.hot_top_k = top_k;
        }
        if let Some(threshold) = self.fold_threshold.filter(|value| *value > 0) {
            config.fold_report_threshold = threshold;
        }
        if let Some(path) = &self.fold_rules_file {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read fold rules {}", path.display()))?;
            let rules = FoldRuleSet::from_json(&raw)
                .with_context(|| format!("invalid fold rules in {}", path.display()))?;
            config.fold_rules = rules.rules().to_vec();
        }
        Ok(config)
    }
}

fn parse_bool_env(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on")
}
