//! Engine configuration.
//!
//! Values only. Where they come from is the embedder's business; `from_env`
//! covers the common case of `ENCHANTRY_*` environment variables.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Passive effect loop configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveConfig {
    /// Period of the repeating tick
    pub tick_interval: Duration,
    /// Whether non-player targets are enumerated at all
    pub include_non_player_targets: bool,
    /// Minimum time between two successful triggers on one item
    pub min_dwell: Duration,
}

impl Default for PassiveConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000),
            include_non_player_targets: false,
            min_dwell: Duration::from_millis(50),
        }
    }
}

/// Global switches over where custom capabilities may show up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionSettings {
    pub enchanting: bool,
    pub trading: bool,
    pub mob_equipment: bool,
    pub traded_equipment: bool,
    pub random_loot: bool,
    /// Use per-biome trade pools instead of the single `tradeable` tag
    pub trade_rebalance: bool,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            enchanting: true,
            trading: true,
            mob_equipment: true,
            traded_equipment: true,
            random_loot: true,
            trade_rebalance: false,
        }
    }
}

/// Tokio dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Route affinity jobs to per-region workers
    pub region_sharded: bool,
    /// Number of region workers when sharded
    pub workers: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            region_sharded: false,
            workers: 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub passive: PassiveConfig,
    pub distribution: DistributionSettings,
    pub dispatcher: DispatcherConfig,
}

impl EngineConfig {
    /// Load `.env.local` / `.env` from the working directory, then read
    /// `ENCHANTRY_*` variables. Missing or unparsable values keep defaults.
    pub fn from_env() -> Self {
        for filename in [".env.local", ".env"] {
            let path = Path::new(filename);
            if path.exists() {
                let _ = dotenvy::from_path(path);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let env = Lookup(lookup);

        Self {
            passive: PassiveConfig {
                tick_interval: Duration::from_millis(env.or(
                    "ENCHANTRY_TICK_INTERVAL_MS",
                    millis(defaults.passive.tick_interval),
                )),
                include_non_player_targets: env.or(
                    "ENCHANTRY_INCLUDE_NON_PLAYER_TARGETS",
                    defaults.passive.include_non_player_targets,
                ),
                min_dwell: Duration::from_millis(env.or(
                    "ENCHANTRY_MIN_DWELL_MS",
                    millis(defaults.passive.min_dwell),
                )),
            },
            distribution: DistributionSettings {
                enchanting: env.or(
                    "ENCHANTRY_DISTRIBUTION_ENCHANTING",
                    defaults.distribution.enchanting,
                ),
                trading: env.or("ENCHANTRY_DISTRIBUTION_TRADING", defaults.distribution.trading),
                mob_equipment: env.or(
                    "ENCHANTRY_DISTRIBUTION_MOB_EQUIPMENT",
                    defaults.distribution.mob_equipment,
                ),
                traded_equipment: env.or(
                    "ENCHANTRY_DISTRIBUTION_TRADED_EQUIPMENT",
                    defaults.distribution.traded_equipment,
                ),
                random_loot: env.or(
                    "ENCHANTRY_DISTRIBUTION_RANDOM_LOOT",
                    defaults.distribution.random_loot,
                ),
                trade_rebalance: env.or(
                    "ENCHANTRY_TRADE_REBALANCE",
                    defaults.distribution.trade_rebalance,
                ),
            },
            dispatcher: DispatcherConfig {
                region_sharded: env.or(
                    "ENCHANTRY_REGION_SHARDED",
                    defaults.dispatcher.region_sharded,
                ),
                workers: env
                    .or("ENCHANTRY_DISPATCHER_WORKERS", defaults.dispatcher.workers)
                    .max(1),
            },
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn or<T: FromStr>(&self, key: &str, default: T) -> T {
        let Some(raw) = (self.0)(key) else {
            return default;
        };
        match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
                default
            }
        }
    }
}
