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

//! Display-name resolution for matched events.

use std::collections::HashMap;

use serde::Deserialize;
use url::Url;

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct EventMetadata {
    name: String,
}

/// Resolves event ids to display names: the configured table first, then the
/// optional metadata API, then a generic label. Purely cosmetic — lookup
/// failures never propagate.
pub struct EventNames {
    table: HashMap<u64, String>,
    api_url: Option<Url>,
    http: reqwest::Client,
}

impl EventNames {
    pub fn new(config: &Config) -> Self {
        Self {
            table: config.events.iter().map(|event| (event.id, event.name.clone())).collect(),
            api_url: config.names.api_url.clone(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn display_name(&self, event_id: u64) -> String {
        if let Some(name) = self.table.get(&event_id) {
            return name.clone();
        }
        match self.fetch_name(event_id).await {
            Some(name) => name,
            None => format!("Event #{event_id}"),
        }
    }

    async fn fetch_name(&self, event_id: u64) -> Option<String> {
        let base = self.api_url.as_ref()?;
        let url = base.join(&format!("events/id/{event_id}")).ok()?;

        let response = match self.http.get(url).send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(event_id, %err, "event name lookup failed");
                return None;
            }
        };
        match response.json::<EventMetadata>().await {
            Ok(metadata) => Some(metadata.name),
            Err(err) => {
                tracing::debug!(event_id, %err, "event metadata parse failed");
                None
            }
        }
    }
}
