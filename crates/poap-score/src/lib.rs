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

//! Multi-chain POAP attendance checker.
//!
//! Given a wallet address, resolves which of a configured set of attendance
//! tokens the wallet holds across several EVM chains — enumerating holdings
//! where the contract supports it and replaying transfer logs where it does
//! not — with failover across redundant public RPC endpoints, and converts
//! the matches into a bonus-point score.
//!
//! The entry point is [`PoapChecker::check_wallet`]; progress and per-chain
//! warnings flow through the [`Subscription`] returned at construction.

pub mod checker;
pub mod config;
pub mod contracts;
pub mod events;
pub mod failover;
pub mod notify;
pub mod resolver;
pub mod scoring;

pub use checker::{CheckError, CheckOutcome, FoundPoap, PoapChecker};
pub use config::Config;
pub use notify::{Stage, Subscription};
pub use resolver::OwnedToken;
pub use scoring::Points;
