// Copyright 2026 PoapScore Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Static configuration for a wallet check run.
//!
//! Everything is an immutable value passed into the checker at construction
//! time; nothing is read from hidden global state. The built-in defaults
//! mirror the reference deployment (POAP on Gnosis Chain and Base).

use std::{collections::BTreeSet, path::Path, time::Duration};

use alloy::primitives::{address, Address};
use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::scoring::Points;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// POAP token contract, deployed at the same address on every supported
    /// chain.
    #[serde(default = "defaults::contract_address")]
    pub contract_address: Address,
    /// Chains to check, in result order.
    #[serde(default = "defaults::chains")]
    pub chains: Vec<ChainConfig>,
    /// Allow-list of events that earn points.
    #[serde(default = "defaults::events")]
    pub events: Vec<TargetEvent>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub names: NameServiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Chain name used in notifications and logs ("gnosis", "base").
    pub name: String,
    /// Redundant public RPC endpoints, tried in list order.
    pub endpoints: Vec<Url>,
}

/// One entry of the configured event allow-list.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetEvent {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Points granted per matching token.
    #[serde(default = "defaults::points_per_match")]
    pub points_per_match: Points,
    /// Match count that triggers the override. Exact match only.
    #[serde(default = "defaults::special_count")]
    pub special_count: u64,
    /// Score awarded at exactly `special_count` matches.
    #[serde(default = "defaults::special_points")]
    pub special_points: Points,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            points_per_match: defaults::points_per_match(),
            special_count: defaults::special_count(),
            special_points: defaults::special_points(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Per-endpoint attempt timeout in seconds. Covers the liveness probe
    /// and the whole resolution for that endpoint.
    #[serde(default = "defaults::attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
    /// Full passes over a chain's endpoint pool before giving up on it.
    #[serde(default = "defaults::retry_rounds")]
    pub retry_rounds: u32,
    /// Pause between retry rounds, in milliseconds.
    #[serde(default = "defaults::retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Upper bound on tokens fetched through the enumeration path. Wallets
    /// holding more have the excess omitted.
    #[serde(default = "defaults::enumeration_cap")]
    pub enumeration_cap: u64,
    /// Concurrent in-flight contract reads per endpoint attempt.
    #[serde(default = "defaults::lookup_concurrency")]
    pub lookup_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: defaults::attempt_timeout_secs(),
            retry_rounds: defaults::retry_rounds(),
            retry_backoff_ms: defaults::retry_backoff_ms(),
            enumeration_cap: defaults::enumeration_cap(),
            lookup_concurrency: defaults::lookup_concurrency(),
        }
    }
}

impl PipelineConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameServiceConfig {
    /// Base URL of the event metadata API, queried only for matched event
    /// ids missing from the configured table. `None` disables remote
    /// lookups entirely.
    #[serde(default = "defaults::name_api_url")]
    pub api_url: Option<Url>,
}

impl Default for NameServiceConfig {
    fn default() -> Self {
        Self { api_url: defaults::name_api_url() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contract_address: defaults::contract_address(),
            chains: defaults::chains(),
            events: defaults::events(),
            scoring: ScoringConfig::default(),
            pipeline: PipelineConfig::default(),
            names: NameServiceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. Missing sections fall back to
    /// the built-in defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config =
            toml::from_str(&data).context("failed to parse toml config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.chains.is_empty(), "no chains configured");
        for chain in &self.chains {
            ensure!(!chain.endpoints.is_empty(), "chain {:?} has no endpoints", chain.name);
        }
        ensure!(!self.events.is_empty(), "no target events configured");
        Ok(())
    }

    /// Target event ids as a lookup set.
    pub fn target_event_ids(&self) -> BTreeSet<u64> {
        self.events.iter().map(|event| event.id).collect()
    }
}

mod defaults {
    use super::*;

    pub(super) fn contract_address() -> Address {
        address!("0x22C1f6050E56d2876009903609a2cC3fEf83B415")
    }

    fn endpoints(urls: &[&str]) -> Vec<Url> {
        urls.iter().map(|url| Url::parse(url).expect("static endpoint url")).collect()
    }

    pub(super) fn chains() -> Vec<ChainConfig> {
        vec![
            ChainConfig {
                name: "gnosis".into(),
                endpoints: endpoints(&[
                    "https://rpc.gnosischain.com",
                    "https://gnosis.publicnode.com",
                    "https://rpc.ankr.com/gnosis",
                ]),
            },
            ChainConfig {
                name: "base".into(),
                endpoints: endpoints(&[
                    "https://mainnet.base.org",
                    "https://base.publicnode.com",
                    "https://base.meowrpc.com",
                ]),
            },
        ]
    }

    pub(super) fn events() -> Vec<TargetEvent> {
        vec![
            TargetEvent { id: 210723, name: "Intervention @ UNamur".into() },
            TargetEvent { id: 214291, name: "Stablecoins et Monnaie Programmable".into() },
        ]
    }

    pub(super) fn points_per_match() -> Points {
        Points::from_hundredths(33)
    }

    pub(super) fn special_count() -> u64 {
        3
    }

    pub(super) fn special_points() -> Points {
        Points::from_hundredths(100)
    }

    pub(super) fn attempt_timeout_secs() -> u64 {
        20
    }

    pub(super) fn retry_rounds() -> u32 {
        2
    }

    pub(super) fn retry_backoff_ms() -> u64 {
        1000
    }

    pub(super) fn enumeration_cap() -> u64 {
        50
    }

    pub(super) fn lookup_concurrency() -> usize {
        8
    }

    pub(super) fn name_api_url() -> Option<Url> {
        Url::parse("https://api.poap.tech/").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG_TEMPL: &str = r#"
contract_address = "0x22C1f6050E56d2876009903609a2cC3fEf83B415"

[[chains]]
name = "gnosis"
endpoints = ["https://rpc.gnosischain.com", "https://gnosis.publicnode.com"]

[[chains]]
name = "base"
endpoints = ["https://mainnet.base.org"]

[[events]]
id = 210723
name = "Intervention @ UNamur"

[[events]]
id = 214291
name = "Stablecoins et Monnaie Programmable"

[scoring]
points_per_match = "0.33"
special_count = 3
special_points = "1"

[pipeline]
attempt_timeout_secs = 5
retry_rounds = 3
retry_backoff_ms = 250
enumeration_cap = 25
lookup_concurrency = 4

[names]
api_url = "https://api.poap.tech/"
"#;

    const BAD_CONFIG: &str = r#"
[pipeline]
error = ?"#;

    #[tokio::test]
    async fn config_parser() {
        let mut config_temp = tempfile::NamedTempFile::new().unwrap();
        config_temp.write_all(CONFIG_TEMPL.as_bytes()).unwrap();
        let config = Config::load(config_temp.path()).await.unwrap();

        assert_eq!(config.contract_address, defaults::contract_address());
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.chains[0].name, "gnosis");
        assert_eq!(config.chains[0].endpoints.len(), 2);
        assert_eq!(config.chains[1].endpoints.len(), 1);
        assert_eq!(config.target_event_ids(), BTreeSet::from([210723, 214291]));
        assert_eq!(config.scoring.points_per_match, Points::from_hundredths(33));
        assert_eq!(config.scoring.special_count, 3);
        assert_eq!(config.scoring.special_points, Points::from_hundredths(100));
        assert_eq!(config.pipeline.attempt_timeout(), Duration::from_secs(5));
        assert_eq!(config.pipeline.retry_rounds, 3);
        assert_eq!(config.pipeline.retry_backoff(), Duration::from_millis(250));
        assert_eq!(config.pipeline.enumeration_cap, 25);
        assert_eq!(config.pipeline.lookup_concurrency, 4);
        assert_eq!(config.names.api_url.unwrap().as_str(), "https://api.poap.tech/");
    }

    #[tokio::test]
    async fn partial_config_falls_back_to_defaults() {
        let mut config_temp = tempfile::NamedTempFile::new().unwrap();
        config_temp.write_all(b"[scoring]\npoints_per_match = \"0.5\"\n").unwrap();
        let config = Config::load(config_temp.path()).await.unwrap();

        assert_eq!(config.scoring.points_per_match, Points::from_hundredths(50));
        assert_eq!(config.scoring.special_count, 3);
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.pipeline.attempt_timeout(), Duration::from_secs(20));
    }

    #[tokio::test]
    #[should_panic(expected = "failed to parse toml config file")]
    async fn bad_config() {
        let mut config_temp = tempfile::NamedTempFile::new().unwrap();
        config_temp.write_all(BAD_CONFIG.as_bytes()).unwrap();
        Config::load(config_temp.path()).await.unwrap();
    }

    #[tokio::test]
    async fn chain_without_endpoints_is_rejected() {
        let mut config_temp = tempfile::NamedTempFile::new().unwrap();
        config_temp.write_all(b"[[chains]]\nname = \"gnosis\"\nendpoints = []\n").unwrap();
        let err = Config::load(config_temp.path()).await.unwrap_err();
        assert!(err.to_string().contains("has no endpoints"));
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let config = Config::default();
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.chains[0].name, "gnosis");
        assert_eq!(config.chains[1].name, "base");
        assert!(config.chains.iter().all(|chain| chain.endpoints.len() == 3));
        assert_eq!(config.target_event_ids(), BTreeSet::from([210723, 214291]));
        assert_eq!(config.pipeline.attempt_timeout(), Duration::from_secs(20));
        assert_eq!(config.pipeline.enumeration_cap, 50);
        config.validate().unwrap();
    }
}
