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

//! Status and warning streams consumed by the presentation layer.

use std::{fmt, sync::Arc};

use tokio::sync::{mpsc, watch};

/// Pipeline stage reported to the presentation layer. Latest value wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Connecting,
    Fetching,
    Retrying { chain: String, round: u32 },
    Calculating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::Connecting => write!(f, "connecting"),
            Stage::Fetching => write!(f, "fetching"),
            Stage::Retrying { chain, round } => write!(f, "retrying {chain} (round {round})"),
            Stage::Calculating => write!(f, "calculating"),
        }
    }
}

struct Channels {
    status: watch::Sender<Stage>,
    warnings: mpsc::UnboundedSender<String>,
}

/// Write side of the notification streams. Cheap to clone and safe to share
/// between concurrently running chain tasks: status overwrites, warnings
/// append.
#[derive(Clone)]
pub struct Notifier {
    channels: Arc<Channels>,
}

/// Read side handed to the presentation adapter.
pub struct Subscription {
    pub status: watch::Receiver<Stage>,
    pub warnings: mpsc::UnboundedReceiver<String>,
}

impl Notifier {
    pub fn new() -> (Self, Subscription) {
        let (status_tx, status_rx) = watch::channel(Stage::Idle);
        let (warn_tx, warn_rx) = mpsc::unbounded_channel();
        let notifier = Self { channels: Arc::new(Channels { status: status_tx, warnings: warn_tx }) };
        (notifier, Subscription { status: status_rx, warnings: warn_rx })
    }

    /// Replace the current stage. Dropped subscribers are fine; a headless
    /// run simply has nobody watching.
    pub fn stage(&self, stage: Stage) {
        let _ = self.channels.status.send_replace(stage);
    }

    /// Append a user-visible warning. Warnings accumulate and never clear
    /// each other out.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        let _ = self.channels.warnings.send(message);
    }
}
