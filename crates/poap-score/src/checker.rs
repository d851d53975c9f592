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

//! Wallet check orchestration across chains.

use std::str::FromStr;

use alloy::primitives::{Address, U256};
use futures::future::join_all;
use thiserror::Error;

use crate::{
    config::Config,
    events::EventNames,
    failover,
    notify::{Notifier, Stage, Subscription},
    resolver::{OwnedToken, RpcTokenResolver, TokenResolver},
    scoring::{self, Points},
};

/// One matched attendance token, ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundPoap {
    pub token_id: U256,
    pub event_id: u64,
    pub display_name: String,
}

/// Final result of a wallet check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub poaps: Vec<FoundPoap>,
    pub score: Points,
}

/// User-facing failure of a whole check. Per-endpoint and per-chain failures
/// never reach this level; they are recovered below and reported through the
/// warning stream instead.
#[derive(Error, Debug)]
pub enum CheckError {
    /// Rejected before any network activity.
    #[error("please enter a valid wallet address")]
    InvalidAddress(String),

    /// Catch-all for defects; the display text is safe to show users.
    #[error("an error occurred while fetching data, please try again")]
    Unexpected(#[from] anyhow::Error),
}

/// Multi-chain POAP checker.
///
/// Generic over the endpoint resolver seam; production use goes through
/// [`PoapChecker::new`], tests inject scripted resolvers.
pub struct PoapChecker<R> {
    config: Config,
    resolver: R,
    names: EventNames,
    notifier: Notifier,
}

impl PoapChecker<RpcTokenResolver> {
    pub fn new(config: Config) -> (Self, Subscription) {
        let resolver = RpcTokenResolver::new(&config);
        Self::with_resolver(config, resolver)
    }
}

impl<R: TokenResolver> PoapChecker<R> {
    pub fn with_resolver(config: Config, resolver: R) -> (Self, Subscription) {
        let (notifier, subscription) = Notifier::new();
        let names = EventNames::new(&config);
        (Self { config, resolver, names, notifier }, subscription)
    }

    /// Check one wallet across every configured chain and score the result.
    ///
    /// Chains run concurrently and fail independently: an exhausted chain
    /// contributes nothing to the result plus one warning, and total
    /// wall-clock time tracks the slowest chain rather than the sum. Results
    /// are concatenated in chain-declaration order, then per-chain discovery
    /// order.
    pub async fn check_wallet(&self, address: &str) -> Result<CheckOutcome, CheckError> {
        let wallet = Address::from_str(address.trim())
            .map_err(|_| CheckError::InvalidAddress(address.to_string()))?;

        self.notifier.stage(Stage::Connecting);
        tracing::info!(%wallet, chains = self.config.chains.len(), "starting wallet check");

        self.notifier.stage(Stage::Fetching);
        let drivers = self.config.chains.iter().map(|chain| {
            failover::run_chain(chain, wallet, &self.resolver, &self.config.pipeline, &self.notifier)
        });
        let per_chain = join_all(drivers).await;

        self.notifier.stage(Stage::Calculating);
        let owned: Vec<OwnedToken> = per_chain.into_iter().flatten().collect();
        let score = scoring::score(owned.len(), &self.config.scoring);

        let mut poaps = Vec::with_capacity(owned.len());
        for token in owned {
            let display_name = self.names.display_name(token.event_id).await;
            poaps.push(FoundPoap {
                token_id: token.token_id,
                event_id: token.event_id,
                display_name,
            });
        }

        tracing::info!(matches = poaps.len(), %score, "wallet check complete");
        Ok(CheckOutcome { poaps, score })
    }
}
