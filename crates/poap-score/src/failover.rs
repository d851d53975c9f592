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

//! Endpoint failover scheduling for one chain.
//!
//! Public endpoints are independently and transiently unreliable, so a
//! failed round retries the whole pool rather than hammering one endpoint.

use alloy::primitives::Address;
use tokio::time::timeout;

use crate::{
    config::{ChainConfig, PipelineConfig},
    notify::{Notifier, Stage},
    resolver::{OwnedToken, TokenResolver},
};

/// Try every endpoint of `chain` in list order, over up to
/// `pipeline.retry_rounds` full passes, racing each attempt against the
/// per-attempt timeout. The first attempt to complete in time without error
/// short-circuits the remaining endpoints and rounds.
///
/// Never fails: exhaustion yields an empty result plus one user-visible
/// warning naming the chain.
pub async fn run_chain<R>(
    chain: &ChainConfig,
    wallet: Address,
    resolver: &R,
    pipeline: &PipelineConfig,
    notifier: &Notifier,
) -> Vec<OwnedToken>
where
    R: TokenResolver + ?Sized,
{
    let attempt_timeout = pipeline.attempt_timeout();

    for round in 0..pipeline.retry_rounds {
        for endpoint in &chain.endpoints {
            tracing::debug!(chain = %chain.name, %endpoint, round, "trying endpoint");
            match timeout(attempt_timeout, resolver.resolve(endpoint, wallet)).await {
                Ok(Ok(tokens)) => {
                    tracing::info!(
                        chain = %chain.name,
                        %endpoint,
                        tokens = tokens.len(),
                        "endpoint attempt succeeded"
                    );
                    return tokens;
                }
                Ok(Err(err)) => {
                    tracing::warn!(chain = %chain.name, %endpoint, %err, "endpoint attempt failed");
                }
                Err(_) => {
                    // Losing the race drops the attempt future, cancelling
                    // its in-flight requests; a late result cannot win.
                    tracing::warn!(
                        chain = %chain.name,
                        %endpoint,
                        timeout = ?attempt_timeout,
                        "endpoint attempt timed out"
                    );
                }
            }
        }

        if round + 1 < pipeline.retry_rounds {
            notifier.stage(Stage::Retrying { chain: chain.name.clone(), round: round + 1 });
            tokio::time::sleep(pipeline.retry_backoff()).await;
        }
    }

    notifier.warn(format!(
        "could not connect to the {} network after {} attempts; results from it may be missing",
        chain.name, pipeline.retry_rounds
    ));
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolveError;
    use alloy::{
        primitives::U256,
        transports::TransportErrorKind,
    };
    use async_trait::async_trait;
    use std::{
        sync::Mutex,
        time::Duration,
    };
    use url::Url;

    fn chain(name: &str, hosts: &[&str]) -> ChainConfig {
        ChainConfig {
            name: name.into(),
            endpoints: hosts
                .iter()
                .map(|host| Url::parse(&format!("http://{host}.invalid")).unwrap())
                .collect(),
        }
    }

    fn pipeline(rounds: u32) -> PipelineConfig {
        PipelineConfig {
            attempt_timeout_secs: 20,
            retry_rounds: rounds,
            retry_backoff_ms: 1000,
            ..Default::default()
        }
    }

    fn token(id: u64) -> OwnedToken {
        OwnedToken { token_id: U256::from(id), event_id: 210723 }
    }

    /// Resolver scripted per endpoint host: "ok-N" succeeds with token N,
    /// "slow-N" succeeds with token N after `delay`, anything else errors.
    struct ScriptedResolver {
        delay: Duration,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedResolver {
        fn new(delay: Duration) -> Self {
            Self { delay, calls: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenResolver for ScriptedResolver {
        async fn resolve(
            &self,
            endpoint: &Url,
            _wallet: Address,
        ) -> Result<Vec<OwnedToken>, ResolveError> {
            let host = endpoint.host_str().unwrap().trim_end_matches(".invalid").to_string();
            self.calls.lock().unwrap().push(host.clone());

            let (kind, id) = host.split_once('-').unwrap_or((host.as_str(), "0"));
            let id: u64 = id.parse().unwrap_or(0);
            match kind {
                "ok" => Ok(vec![token(id)]),
                "slow" => {
                    tokio::time::sleep(self.delay).await;
                    Ok(vec![token(id)])
                }
                _ => Err(ResolveError::Probe(TransportErrorKind::custom_str(
                    "connection refused",
                ))),
            }
        }
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let (notifier, mut subscription) = Notifier::new();
        let resolver = ScriptedResolver::new(Duration::ZERO);
        let chain = chain("gnosis", &["bad-0", "ok-1", "ok-2"]);

        let tokens = run_chain(&chain, Address::ZERO, &resolver, &pipeline(3), &notifier).await;

        assert_eq!(tokens, vec![token(1)]);
        // The third endpoint is never tried, and no further rounds run.
        assert_eq!(resolver.calls(), vec!["bad-0", "ok-1"]);
        assert!(subscription.warnings.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_advances_to_next_endpoint() {
        let (notifier, mut subscription) = Notifier::new();
        // Succeeds 10s after the 20s attempt timeout would have fired.
        let resolver = ScriptedResolver::new(Duration::from_secs(30));
        let chain = chain("gnosis", &["slow-1", "ok-2"]);

        let tokens = run_chain(&chain, Address::ZERO, &resolver, &pipeline(1), &notifier).await;

        // The slow endpoint's late result must not retroactively win.
        assert_eq!(tokens, vec![token(2)]);
        assert_eq!(resolver.calls(), vec!["slow-1", "ok-2"]);
        assert!(subscription.warnings.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_warns_once_and_returns_empty() {
        let (notifier, mut subscription) = Notifier::new();
        let resolver = ScriptedResolver::new(Duration::ZERO);
        let chain = chain("gnosis", &["bad-0", "bad-1"]);

        let tokens = run_chain(&chain, Address::ZERO, &resolver, &pipeline(2), &notifier).await;

        assert!(tokens.is_empty());
        // Every endpoint is retried in every round.
        assert_eq!(resolver.calls(), vec!["bad-0", "bad-1", "bad-0", "bad-1"]);

        let warning = subscription.warnings.try_recv().unwrap();
        assert!(warning.contains("gnosis"), "warning should name the chain: {warning}");
        assert!(warning.contains('2'), "warning should carry the retry count: {warning}");
        assert!(subscription.warnings.try_recv().is_err(), "exactly one warning expected");
    }

    #[tokio::test(start_paused = true)]
    async fn retrying_status_emitted_between_rounds() {
        let (notifier, subscription) = Notifier::new();
        let resolver = ScriptedResolver::new(Duration::ZERO);
        let chain = chain("base", &["bad-0"]);

        run_chain(&chain, Address::ZERO, &resolver, &pipeline(2), &notifier).await;

        assert_eq!(
            *subscription.status.borrow(),
            Stage::Retrying { chain: "base".into(), round: 1 }
        );
    }
}
