// In crates/strategies/src/registry.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use chrono::DateTime;
use core_types::{BarSeries, Signal, SignalResult};
use indicators::{IndicatorSet, IndicatorSpec};
use serde::Serialize;

use crate::context::EvalContext;
use crate::error::{EvalError, RegistryError};
use crate::rules;

/// Display grouping only; it has no effect on evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Momentum,
    TrendFollowing,
    MeanReversion,
    BreakoutAndPatterns,
    VolumeAndVolatility,
    AdvancedOscillators,
    PatternRecognition,
    Hybrid,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Momentum => "Momentum",
            Category::TrendFollowing => "Trend Following",
            Category::MeanReversion => "Mean Reversion",
            Category::BreakoutAndPatterns => "Breakout & Patterns",
            Category::VolumeAndVolatility => "Volume & Volatility",
            Category::AdvancedOscillators => "Advanced Oscillators",
            Category::PatternRecognition => "Pattern Recognition",
            Category::Hybrid => "Hybrid Strategies",
        };
        f.write_str(label)
    }
}

/// What a rule saw on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verdict {
    pub buy: bool,
    pub sell: bool,
}

impl Verdict {
    pub fn new(buy: bool, sell: bool) -> Self {
        Self { buy, sell }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn buy_only(buy: bool) -> Self {
        Self { buy, sell: false }
    }

    pub fn sell_only(sell: bool) -> Self {
        Self { buy: false, sell }
    }
}

/// How a strategy settles a bar on which both its buy and sell conditions hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precedence {
    PreferBuy,
    PreferSell,
    /// Report NONE with a `conflicting-signals` diagnostic.
    #[default]
    StandAside,
}

impl Precedence {
    /// `Err(())` means the conflict is unresolved.
    fn resolve(self, verdict: Verdict) -> Result<Signal, ()> {
        match (verdict.buy, verdict.sell, self) {
            (false, false, _) => Ok(Signal::None),
            (true, false, _) => Ok(Signal::Buy),
            (false, true, _) => Ok(Signal::Sell),
            (true, true, Precedence::PreferBuy) => Ok(Signal::Buy),
            (true, true, Precedence::PreferSell) => Ok(Signal::Sell),
            (true, true, Precedence::StandAside) => Err(()),
        }
    }
}

pub type Rule = fn(&EvalContext<'_>) -> Result<Verdict, EvalError>;

/// One entry of the built-in strategy table.
pub struct StrategyDefinition {
    pub id: &'static str,
    pub category: Category,
    pub requires: &'static [IndicatorSpec],
    pub precedence: Precedence,
    pub assess: Rule,
}

impl StrategyDefinition {
    /// Bars needed before every required indicator has a value on the
    /// previous bar as well as the latest one.
    pub fn min_history(&self) -> usize {
        self.requires
            .iter()
            .map(IndicatorSpec::min_history)
            .max()
            .unwrap_or(1)
            + 1
    }
}

impl fmt::Debug for StrategyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyDefinition")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("requires", &self.requires.len())
            .field("precedence", &self.precedence)
            .finish()
    }
}

/// Immutable lookup from strategy id to definition, built once at startup.
#[derive(Debug)]
pub struct StrategyRegistry {
    definitions: Vec<&'static StrategyDefinition>,
    by_id: HashMap<&'static str, usize>,
}

impl StrategyRegistry {
    /// The full built-in catalog.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_definitions(rules::CATALOG.iter().flat_map(|group| group.iter()))
    }

    pub fn from_definitions<I>(definitions: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = &'static StrategyDefinition>,
    {
        let mut registry = Self {
            definitions: Vec::new(),
            by_id: HashMap::new(),
        };
        for def in definitions {
            if registry.by_id.contains_key(def.id) {
                return Err(RegistryError::DuplicateStrategy(def.id.to_string()));
            }
            registry.by_id.insert(def.id, registry.definitions.len());
            registry.definitions.push(def);
        }
        tracing::debug!(strategies = registry.definitions.len(), "Strategy registry built");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&'static StrategyDefinition> {
        self.by_id.get(id).map(|&i| self.definitions[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Definitions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &'static StrategyDefinition> + '_ {
        self.definitions.iter().copied()
    }

    /// Fails on the first id the registry does not know.
    pub fn check_ids<S: AsRef<str>>(&self, ids: &[S]) -> Result<(), RegistryError> {
        match ids.iter().find(|id| !self.contains(id.as_ref())) {
            Some(unknown) => Err(RegistryError::UnknownStrategy(unknown.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Union of the indicators the given strategies need, each listed once.
    pub fn requirements<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<IndicatorSpec>, RegistryError> {
        self.check_ids(ids)?;
        let mut seen = HashSet::new();
        let mut specs = Vec::new();
        for id in ids {
            let def = self.by_id[id.as_ref()];
            for spec in self.definitions[def].requires {
                if seen.insert(spec.key()) {
                    specs.push(*spec);
                }
            }
        }
        Ok(specs)
    }

    /// Classifies the latest bar of `series` with one strategy.
    ///
    /// Total: unknown ids, missing data, rule errors and rule panics all come
    /// back as a NONE result with a diagnostic.
    pub fn evaluate(
        &self,
        strategy_id: &str,
        series: &BarSeries,
        indicators: &IndicatorSet,
    ) -> SignalResult {
        let as_of = series
            .last()
            .map(|b| b.timestamp)
            .unwrap_or(DateTime::UNIX_EPOCH);
        let result = SignalResult::new(series.symbol(), strategy_id, Signal::None, as_of);

        let Some(def) = self.get(strategy_id) else {
            return result.with_diagnostics(format!("evaluation-error:unknown strategy {strategy_id}"));
        };
        if series.len() < def.min_history() {
            return result.with_diagnostics(EvalError::Insufficient.diagnostic());
        }

        let ctx = EvalContext::new(series, indicators);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (def.assess)(&ctx)));
        match outcome {
            Ok(Ok(verdict)) => match def.precedence.resolve(verdict) {
                Ok(signal) => SignalResult { signal, ..result },
                Err(()) => result.with_diagnostics("conflicting-signals"),
            },
            Ok(Err(err)) => {
                tracing::trace!(strategy = strategy_id, symbol = series.symbol(), error = %err, "Rule produced no verdict");
                result.with_diagnostics(err.diagnostic())
            }
            Err(payload) => {
                let cause = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panic".to_string());
                tracing::warn!(strategy = strategy_id, symbol = series.symbol(), %cause, "Rule panicked");
                result.with_diagnostics(EvalError::Failed(cause).diagnostic())
            }
        }
    }
}
