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

//! Per-endpoint token ownership resolution.
//!
//! Enumeration through `tokenOfOwnerByIndex` is the primary path; contracts
//! without the enumerable extension make any index read revert, which flips
//! the attempt over to scanning historical `Transfer` logs. Either way the
//! resulting token ids are mapped to event ids and filtered against the
//! configured allow-list.

use std::collections::{BTreeSet, HashSet};

use alloy::{
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::{BlockNumberOrTag, Filter},
    sol_types::SolEvent,
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use thiserror::Error;
use url::Url;

use crate::{config::Config, contracts::IPoapToken};

/// A token confirmed owned by the queried wallet whose event is in the
/// configured allow-list. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedToken {
    pub token_id: U256,
    pub event_id: u64,
}

/// Failure of a single endpoint attempt. Recovered by the failover driver;
/// never shown to the user directly.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("endpoint probe failed: {0}")]
    Probe(#[source] RpcError<TransportErrorKind>),

    #[error("contract read failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("transfer log scan failed: {0}")]
    LogScan(#[source] RpcError<TransportErrorKind>),
}

/// Raw reads against one endpoint's view of the POAP contract.
///
/// The resolution algorithm is written against this seam so it can be
/// exercised without a live endpoint.
#[async_trait]
pub trait PoapContract: Send + Sync {
    async fn balance_of(&self, owner: Address) -> Result<U256, ResolveError>;

    async fn token_of_owner_by_index(
        &self,
        owner: Address,
        index: u64,
    ) -> Result<U256, ResolveError>;

    async fn token_event(&self, token_id: U256) -> Result<U256, ResolveError>;

    /// Token ids of every `Transfer` into `owner` over the full historical
    /// block range, in log order, duplicates included.
    async fn transfers_to(&self, owner: Address) -> Result<Vec<U256>, ResolveError>;
}

/// [`PoapContract`] backed by contract calls through an alloy provider.
pub struct RpcPoapContract<P: Provider> {
    token: IPoapToken::IPoapTokenInstance<P>,
}

impl<P> RpcPoapContract<P>
where
    P: Provider + Clone + 'static,
{
    pub fn new(contract_address: Address, provider: P) -> Self {
        Self { token: IPoapToken::new(contract_address, provider) }
    }
}

#[async_trait]
impl<P> PoapContract for RpcPoapContract<P>
where
    P: Provider + Clone + 'static,
{
    async fn balance_of(&self, owner: Address) -> Result<U256, ResolveError> {
        Ok(self.token.balanceOf(owner).call().await?)
    }

    async fn token_of_owner_by_index(
        &self,
        owner: Address,
        index: u64,
    ) -> Result<U256, ResolveError> {
        Ok(self.token.tokenOfOwnerByIndex(owner, U256::from(index)).call().await?)
    }

    async fn token_event(&self, token_id: U256) -> Result<U256, ResolveError> {
        Ok(self.token.tokenEvent(token_id).call().await?)
    }

    async fn transfers_to(&self, owner: Address) -> Result<Vec<U256>, ResolveError> {
        let filter = Filter::new()
            .address(*self.token.address())
            .event_signature(IPoapToken::Transfer::SIGNATURE_HASH)
            .topic2(owner.into_word())
            .from_block(BlockNumberOrTag::Earliest)
            .to_block(BlockNumberOrTag::Latest);

        let logs =
            self.token.provider().get_logs(&filter).await.map_err(ResolveError::LogScan)?;

        // tokenId is the third indexed field.
        Ok(logs
            .iter()
            .filter_map(|log| log.topics().get(3))
            .map(|topic| U256::from_be_bytes(topic.0))
            .collect())
    }
}

/// Resolve the wallet's matching tokens through one endpoint view.
///
/// A zero balance succeeds immediately without touching either discovery
/// path. Per-token event lookup failures drop that token only; a failure of
/// the balance read, of the log scan, or of every enumeration read aborts
/// the attempt and is left for the failover driver to recover.
pub(crate) async fn resolve_owned_tokens<C>(
    contract: &C,
    wallet: Address,
    targets: &BTreeSet<u64>,
    enumeration_cap: u64,
    concurrency: usize,
) -> Result<Vec<OwnedToken>, ResolveError>
where
    C: PoapContract + ?Sized,
{
    let balance = contract.balance_of(wallet).await?;
    if balance.is_zero() {
        tracing::debug!(%wallet, "zero token balance");
        return Ok(Vec::new());
    }

    let count = balance.min(U256::from(enumeration_cap)).to::<u64>();
    let token_ids = match enumerate_tokens(contract, wallet, count, concurrency).await {
        Ok(ids) => ids,
        Err(err) => {
            tracing::warn!(%wallet, %err, "enumeration failed, falling back to transfer log scan");
            dedupe(contract.transfers_to(wallet).await?)
        }
    };
    tracing::debug!(%wallet, tokens = token_ids.len(), "token ids resolved");

    let lookups: Vec<Option<(U256, U256)>> = futures::stream::iter(token_ids)
        .map(|token_id| async move {
            match contract.token_event(token_id).await {
                Ok(event_id) => Some((token_id, event_id)),
                Err(err) => {
                    tracing::warn!(%token_id, %err, "event lookup failed, skipping token");
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    Ok(lookups
        .into_iter()
        .flatten()
        .filter_map(|(token_id, event_id)| {
            // An event id wider than u64 cannot be in the allow-list.
            let event_id = u64::try_from(event_id).ok()?;
            targets.contains(&event_id).then_some(OwnedToken { token_id, event_id })
        })
        .collect())
}

/// Fetch token ids by ownership index, bounded-concurrency, preserving
/// index order. Any single failed read fails the whole enumeration.
async fn enumerate_tokens<C>(
    contract: &C,
    wallet: Address,
    count: u64,
    concurrency: usize,
) -> Result<Vec<U256>, ResolveError>
where
    C: PoapContract + ?Sized,
{
    futures::stream::iter(0..count)
        .map(|index| contract.token_of_owner_by_index(wallet, index))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

fn dedupe(token_ids: Vec<U256>) -> Vec<U256> {
    let mut seen = HashSet::new();
    token_ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Resolves a wallet's matching tokens through a single endpoint. The
/// failover driver is generic over this seam so endpoint scheduling can be
/// tested without network access.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn resolve(
        &self,
        endpoint: &Url,
        wallet: Address,
    ) -> Result<Vec<OwnedToken>, ResolveError>;
}

/// Production resolver: a fresh HTTP provider per endpoint attempt, probed
/// for liveness before any contract read. Endpoints carry no state between
/// attempts.
pub struct RpcTokenResolver {
    contract_address: Address,
    targets: BTreeSet<u64>,
    enumeration_cap: u64,
    concurrency: usize,
}

impl RpcTokenResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            contract_address: config.contract_address,
            targets: config.target_event_ids(),
            enumeration_cap: config.pipeline.enumeration_cap,
            concurrency: config.pipeline.lookup_concurrency,
        }
    }
}

#[async_trait]
impl TokenResolver for RpcTokenResolver {
    async fn resolve(
        &self,
        endpoint: &Url,
        wallet: Address,
    ) -> Result<Vec<OwnedToken>, ResolveError> {
        let provider = ProviderBuilder::new().connect_http(endpoint.clone());
        let chain_id = provider.get_chain_id().await.map_err(ResolveError::Probe)?;
        tracing::debug!(%endpoint, chain_id, "endpoint probe ok");

        let contract = RpcPoapContract::new(self.contract_address, provider);
        resolve_owned_tokens(
            &contract,
            wallet,
            &self.targets,
            self.enumeration_cap,
            self.concurrency,
        )
        .await
    }
}
