//! JSON scenarios: a self-contained description of one recommendation run.
//!
//! A scenario lists the input, the request configuration, the sub-engines
//! with the scores they produce, and the post-processors with their
//! declared bounds and the adjustments they make. It is how the `reco`
//! binary exercises the delegating engine without a real data source.
//!
//! ```json
//! {
//!   "input": "Michal",
//!   "config": { "limit": 4, "max_time_ms": 500 },
//!   "engines": [
//!     { "name": "friends", "scores": [{ "item": "Daniela", "score": 80 }] },
//!     { "name": "offline", "fail": "index unavailable" }
//!   ],
//!   "post_processors": [
//!     { "name": "colleagues", "max_positive": 0, "max_negative": -50,
//!       "adjustments": [{ "item": "Daniela", "score": -50 }], "exclude": ["Jim"] }
//!   ]
//! }
//! ```
//!
//! A post-processor without `max_positive`/`max_negative` is unbounded on
//! that side.

use anyhow::{bail, Context as _, Result};
use engine::{DelegatingEngine, FailurePolicy, FanOut, SingleScore, SingleScoreEngine};
use parking_lot::Mutex;
use pipeline::PostProcessor;
use reco_core::{Config, Context, ItemFilter, RecoError, Recommendations};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub type Item = String;
pub type Input = String;
pub type ScenarioContext = Context<Item, Input>;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub input: Input,
    pub config: Config,
    pub engines: Vec<EngineDef>,
    #[serde(default)]
    pub post_processors: Vec<PostProcessorDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoredItem {
    pub item: Item,
    pub score: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineDef {
    pub name: String,
    #[serde(default)]
    pub scores: Vec<ScoredItem>,
    /// When set, the engine fails with this message instead of scoring
    #[serde(default)]
    pub fail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostProcessorDef {
    pub name: String,
    #[serde(default)]
    pub max_positive: Option<f32>,
    #[serde(default)]
    pub max_negative: Option<f32>,
    #[serde(default)]
    pub adjustments: Vec<ScoredItem>,
    #[serde(default)]
    pub exclude: Vec<Item>,
}

impl Scenario {
    /// Load and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse scenario {}", path.display()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse and validate a scenario held in memory.
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(json).context("Failed to parse scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.engines.is_empty() {
            bail!(RecoError::InvalidArgument(
                "scenario must declare at least one engine".to_string()
            ));
        }
        let names = self
            .engines
            .iter()
            .map(|e| e.name.as_str())
            .chain(self.post_processors.iter().map(|p| p.name.as_str()));
        for name in names {
            if name.is_empty() {
                bail!(RecoError::InvalidArgument(
                    "engine and post-processor names must not be empty".to_string()
                ));
            }
        }
        let items = self
            .engines
            .iter()
            .flat_map(|e| e.scores.iter().map(|s| &s.item))
            .chain(
                self.post_processors
                    .iter()
                    .flat_map(|p| p.adjustments.iter().map(|a| &a.item).chain(&p.exclude)),
            );
        for item in items {
            if item.is_empty() {
                bail!(RecoError::InvalidArgument(
                    "item keys must not be empty".to_string()
                ));
            }
        }
        Ok(())
    }

    /// Request configuration, with optional command-line overrides.
    pub fn config(&self, limit: Option<usize>, max_time_ms: Option<u64>) -> Config {
        let mut config = Config::new(limit.unwrap_or(self.config.limit()))
            .with_max_time(self.config.max_time());
        if let Some(ms) = max_time_ms {
            config = config.with_max_time(Duration::from_millis(ms));
        }
        config
    }

    /// A fresh context for one request, able to blacklist items.
    pub fn context(&self, config: Config) -> ScenarioContext {
        Context::with_filter(self.input.clone(), config, Blacklist::default())
    }

    /// Build the delegating engine described by the scenario.
    pub fn build_engine(
        &self,
        failure_policy: FailurePolicy,
        fan_out: FanOut,
    ) -> DelegatingEngine<Item, Input> {
        let mut engine = DelegatingEngine::new()
            .with_failure_policy(failure_policy)
            .with_fan_out(fan_out);
        for def in &self.engines {
            engine = engine.add_engine(SingleScore::new(ScenarioEngine(def.clone())));
        }
        let post_processors = self
            .post_processors
            .iter()
            .map(|def| Box::new(ScenarioPostProcessor(def.clone())) as Box<dyn PostProcessor<Item, Input>>);
        engine.add_post_processors(post_processors)
    }
}

/// Sub-engine replaying the scores listed in the scenario.
struct ScenarioEngine(EngineDef);

impl SingleScoreEngine<Item, Input> for ScenarioEngine {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn score_single(&self, _input: &Input, _context: &ScenarioContext) -> Result<Vec<(Item, f32)>> {
        if let Some(reason) = &self.0.fail {
            bail!("{}", reason);
        }
        Ok(self
            .0
            .scores
            .iter()
            .map(|scored| (scored.item.clone(), scored.score))
            .collect())
    }
}

/// Post-processor applying the scenario's adjustments and exclusions.
///
/// Adjustments are clamped to the declared bounds.
struct ScenarioPostProcessor(PostProcessorDef);

impl PostProcessor<Item, Input> for ScenarioPostProcessor {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn max_positive_score(&self, _input: &Input, _context: &ScenarioContext) -> f32 {
        self.0.max_positive.unwrap_or(f32::INFINITY)
    }

    fn max_negative_score(&self, _input: &Input, _context: &ScenarioContext) -> f32 {
        self.0.max_negative.unwrap_or(f32::NEG_INFINITY)
    }

    fn post_process(
        &self,
        recommendations: &mut Recommendations<Item>,
        input: &Input,
        context: &ScenarioContext,
    ) -> Result<()> {
        let upper = self.max_positive_score(input, context);
        let lower = self.max_negative_score(input, context);

        for adjustment in &self.0.adjustments {
            if recommendations.contains(&adjustment.item) {
                let delta = adjustment.score.clamp(lower, upper);
                recommendations.add_score(adjustment.item.clone(), self.0.name.as_str(), delta);
            }
        }
        for item in &self.0.exclude {
            context.disallow(item)?;
            if recommendations.remove(item).is_some() {
                debug!("{} excluded {}", self.0.name, item);
            }
        }
        Ok(())
    }
}

/// Filtering policy remembering items excluded during the request.
#[derive(Debug, Default)]
pub struct Blacklist {
    excluded: Mutex<HashSet<Item>>,
}

impl ItemFilter<Item> for Blacklist {
    fn allow(&self, item: &Item, _task: &str) -> bool {
        !self.excluded.lock().contains(item)
    }

    fn disallow(&self, item: &Item) -> reco_core::Result<()> {
        if item.is_empty() {
            return Err(RecoError::InvalidArgument(
                "cannot blacklist an empty item".to_string(),
            ));
        }
        self.excluded.lock().insert(item.clone());
        Ok(())
    }
}
