//! Cached spot analysis: likely fish species per place.
//!
//! The first successful analysis for a place identifier is stored and served
//! from the store afterwards. [`CachePolicy`] decides whether a stored row is
//! still usable; the default keeps it forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spotfinder_store::AnalysisStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::client::TextGenerator;
use crate::error::AnalysisError;
use crate::prompts;
use crate::structured::{parse_structured, request_structured};

/// Largest number of species an analysis may contain.
pub const MAX_SPECIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FishSpecies {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Ordered list of likely species for one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpotAnalysis(pub Vec<FishSpecies>);

impl SpotAnalysis {
    pub fn species(&self) -> &[FishSpecies] {
        &self.0
    }

    /// One to three entries, each with a name.
    pub fn validate(&self) -> Result<(), String> {
        if self.0.is_empty() {
            return Err("analysis lists no species".to_string());
        }
        if self.0.len() > MAX_SPECIES {
            return Err(format!(
                "analysis lists {} species, expected at most {}",
                self.0.len(),
                MAX_SPECIES
            ));
        }
        if self.0.iter().any(|s| s.name.trim().is_empty()) {
            return Err("species entry without a name".to_string());
        }
        Ok(())
    }

    /// Canonical stored form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

/// How long a stored analysis stays authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    Permanent,
    MaxAge(Duration),
}

impl CachePolicy {
    /// From `analysis.cache_max_age_hours`.
    pub fn from_max_age_hours(hours: Option<u64>) -> Self {
        match hours {
            Some(h) => Self::MaxAge(Duration::from_secs(h.saturating_mul(3600))),
            None => Self::Permanent,
        }
    }

    pub fn is_fresh(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::Permanent => true,
            // A timestamp in the future counts as fresh
            Self::MaxAge(max) => (now - stored_at).to_std().map_or(true, |age| age <= *max),
        }
    }
}

pub struct SpotAnalyzer {
    store: Arc<dyn AnalysisStore>,
    generator: Arc<dyn TextGenerator>,
    policy: CachePolicy,
    max_name_chars: usize,
}

impl SpotAnalyzer {
    pub fn new(store: Arc<dyn AnalysisStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            store,
            generator,
            policy: CachePolicy::Permanent,
            max_name_chars: 500,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_max_name_chars(mut self, max: usize) -> Self {
        self.max_name_chars = max;
        self
    }

    /// Stored analysis for `place_id`, or a freshly generated one.
    ///
    /// A usable stored row is returned without calling the generator. On a
    /// miss the generated analysis is written back; a failed write is logged
    /// and the analysis is still returned.
    ///
    /// # Errors
    /// - `InvalidInput` for an empty id or name, or a name over the limit
    /// - `Store` when the lookup fails
    /// - `Provider` / `Malformed` from generation (nothing is written)
    #[instrument(skip(self), level = "info")]
    pub async fn get_analysis(
        &self,
        place_id: &str,
        place_name: &str,
    ) -> Result<SpotAnalysis, AnalysisError> {
        if place_id.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("place id is required".into()));
        }
        if place_name.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("location is required".into()));
        }
        if place_name.chars().count() > self.max_name_chars {
            return Err(AnalysisError::InvalidInput(format!(
                "location exceeds {} characters",
                self.max_name_chars
            )));
        }

        if let Some(cached) = self.cached(place_id)? {
            tracing::debug!("Analysis cache hit for {}", place_id);
            return Ok(cached);
        }
        tracing::debug!("Analysis cache miss for {}", place_id);

        let analysis: SpotAnalysis = request_structured(
            self.generator.as_ref(),
            prompts::SPOT_SYSTEM,
            &prompts::spot_analysis(place_name),
            None,
            SpotAnalysis::validate,
        )
        .await?;

        match analysis.to_json() {
            Ok(json) => {
                if let Err(e) = self.store.upsert_analysis(place_id, &json) {
                    tracing::warn!("Failed to store analysis for {}: {}", place_id, e);
                }
            }
            Err(e) => tracing::warn!("Failed to encode analysis for {}: {}", place_id, e),
        }

        Ok(analysis)
    }

    /// A stored analysis the policy still accepts. Rows that are empty,
    /// expired or no longer parse count as a miss.
    fn cached(&self, place_id: &str) -> Result<Option<SpotAnalysis>, AnalysisError> {
        let Some(spot) = self.store.get_analysis(place_id)? else {
            return Ok(None);
        };
        if spot.fish_analysis.trim().is_empty() {
            return Ok(None);
        }
        if !self.policy.is_fresh(spot.analyzed_at, Utc::now()) {
            tracing::info!("Stored analysis for {} expired, regenerating", place_id);
            return Ok(None);
        }
        match parse_structured(&spot.fish_analysis, SpotAnalysis::validate) {
            Ok(analysis) => Ok(Some(analysis)),
            Err(e) => {
                tracing::warn!("Stored analysis for {} unreadable ({}), regenerating", place_id, e);
                Ok(None)
            }
        }
    }
}
