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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use poap_score::{Config, PoapChecker, Subscription};

/// Check a wallet for attendance tokens and print its bonus score.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct MainArgs {
    /// Wallet address to check.
    wallet: String,
    /// Path to a TOML configuration file. Built-in defaults are used when
    /// omitted.
    #[clap(short, long, env = "POAP_SCORE_CONFIG")]
    config: Option<PathBuf>,
    /// Whether to log in JSON format.
    #[clap(long, env, default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = MainArgs::parse();

    if args.log_json {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    let config = match &args.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };

    let (checker, subscription) = PoapChecker::new(config);
    let Subscription { mut status, mut warnings } = subscription;

    let status_task = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let stage = status.borrow_and_update().clone();
            tracing::info!("status: {stage}");
        }
    });

    let outcome = checker.check_wallet(&args.wallet).await?;

    // Closes the notification channels so the status task exits.
    drop(checker);
    status_task.await?;

    while let Ok(warning) = warnings.try_recv() {
        eprintln!("warning: {warning}");
    }

    if outcome.poaps.is_empty() {
        println!("No matching POAPs found for {}", args.wallet);
    } else {
        println!("Found {} matching POAP(s):", outcome.poaps.len());
        for poap in &outcome.poaps {
            println!(
                "  {} (event #{}, token #{})",
                poap.display_name, poap.event_id, poap.token_id
            );
        }
    }
    println!("Bonus points: {}", outcome.score);

    Ok(())
}
