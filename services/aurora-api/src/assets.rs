//! Conditional refresh of the static viewline forecast images.
//!
//! Independent of the grid pipeline: only fetch metadata is retained, the
//! image bytes themselves are never stored.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::fetch::ConditionalFetch;
use crate::store::{asset_key, etag_key, DurableStore};

/// Record of the last conditional fetch of one forecast image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetStatus {
    pub url: String,
    pub etag: Option<String>,
    pub status: u16,
    pub duration_ms: u64,
    pub fetched_at: String,
    pub cache_hit: bool,
}

/// Which forecast image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSlot {
    Tonight,
    Tomorrow,
}

impl AssetSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tonight => "tonight",
            Self::Tomorrow => "tomorrow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tonight" => Some(Self::Tonight),
            "tomorrow" => Some(Self::Tomorrow),
            _ => None,
        }
    }
}

/// Refreshes the forecast images on a slow cadence and records the outcome.
pub struct AssetRefresher {
    fetcher: Arc<dyn ConditionalFetch>,
    store: Arc<dyn DurableStore>,
    tonight_url: String,
    tomorrow_url: String,
}

impl AssetRefresher {
    pub fn new(
        fetcher: Arc<dyn ConditionalFetch>,
        store: Arc<dyn DurableStore>,
        tonight_url: String,
        tomorrow_url: String,
    ) -> Self {
        Self {
            fetcher,
            store,
            tonight_url,
            tomorrow_url,
        }
    }

    fn url_for(&self, slot: AssetSlot) -> &str {
        match slot {
            AssetSlot::Tonight => &self.tonight_url,
            AssetSlot::Tomorrow => &self.tomorrow_url,
        }
    }

    pub async fn refresh_all(&self) {
        for slot in [AssetSlot::Tonight, AssetSlot::Tomorrow] {
            self.refresh(slot).await;
        }
    }

    /// Conditionally fetch one image and record the outcome. Failures are
    /// logged; the previous status record stays in place.
    pub async fn refresh(&self, slot: AssetSlot) {
        let url = self.url_for(slot).to_string();
        let validator = self.store.get(&etag_key(&url)).await.ok().flatten();

        match self.fetcher.fetch(&url, validator.as_deref()).await {
            Ok(result) => {
                let status = AssetStatus {
                    url: url.clone(),
                    etag: result.etag.clone(),
                    status: result.status,
                    duration_ms: result.duration_ms,
                    fetched_at: result.fetched_at.to_rfc3339(),
                    cache_hit: result.not_modified,
                };

                if let Some(tag) = &result.etag {
                    if let Err(e) = self.store.set(&etag_key(&url), tag).await {
                        warn!(slot = slot.as_str(), error = %e, "Failed to persist asset validator");
                    }
                }
                match serde_json::to_string(&status) {
                    Ok(json) => {
                        if let Err(e) = self.store.set(&asset_key(slot.as_str()), &json).await {
                            warn!(slot = slot.as_str(), error = %e, "Failed to persist asset status");
                        }
                    }
                    Err(e) => warn!(slot = slot.as_str(), error = %e, "Failed to serialize asset status"),
                }

                info!(
                    slot = slot.as_str(),
                    status = status.status,
                    cache_hit = status.cache_hit,
                    duration_ms = status.duration_ms,
                    "Refreshed viewline asset"
                );
            }
            Err(e) => {
                warn!(slot = slot.as_str(), error = %e, "Viewline asset fetch failed");
            }
        }
    }

    /// The last recorded status for a slot, if any.
    pub async fn status(&self, slot: AssetSlot) -> Option<AssetStatus> {
        let json = self
            .store
            .get(&asset_key(slot.as_str()))
            .await
            .ok()
            .flatten()?;
        serde_json::from_str(&json).ok()
    }
}
