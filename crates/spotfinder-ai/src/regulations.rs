//! Regional fishing regulations.
//!
//! Unlike spot analysis, an unparseable reply degrades to a placeholder that
//! sends the user to local authorities.

use serde::{Deserialize, Serialize};
use spotfinder_geo::{Coordinate, RegionResolver};
use std::sync::Arc;
use tracing::instrument;

use crate::client::TextGenerator;
use crate::error::AnalysisError;
use crate::prompts;
use crate::structured::request_structured;

pub const PLACEHOLDER_CATCH_LIMIT: &str =
    "Please check with local authorities for specific daily limits";
pub const PLACEHOLDER_SEASON_DATES: &str =
    "Please verify season dates with local fishing authorities";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulationsInfo {
    pub catch_limits: Vec<String>,
    pub season_dates: Vec<String>,
    pub region: String,
}

impl RegulationsInfo {
    pub fn placeholder(region: impl Into<String>) -> Self {
        Self {
            catch_limits: vec![PLACEHOLDER_CATCH_LIMIT.to_string()],
            season_dates: vec![PLACEHOLDER_SEASON_DATES.to_string()],
            region: region.into(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.region.trim().is_empty() {
            return Err("regulations response has no region".to_string());
        }
        Ok(())
    }
}

pub struct RegulationsFetcher {
    regions: Arc<RegionResolver>,
    generator: Arc<dyn TextGenerator>,
}

impl RegulationsFetcher {
    pub fn new(regions: Arc<RegionResolver>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { regions, generator }
    }

    /// Regulations for the region containing `coord`.
    ///
    /// # Errors
    /// `Provider` when the generator can't be reached or has no credential.
    /// A malformed reply is not an error.
    #[instrument(skip(self), level = "info")]
    pub async fn get_regulations(&self, coord: Coordinate) -> Result<RegulationsInfo, AnalysisError> {
        let region = self.regions.resolve_region(coord).await;
        self.for_region(&region).await
    }

    /// Regulations for an already-resolved region label.
    ///
    /// # Errors
    /// See [`RegulationsFetcher::get_regulations`].
    pub async fn for_region(&self, region: &str) -> Result<RegulationsInfo, AnalysisError> {
        let result = request_structured(
            self.generator.as_ref(),
            prompts::REGULATIONS_SYSTEM,
            &prompts::regulations(region),
            Some(prompts::REGULATIONS_TEMPERATURE),
            RegulationsInfo::validate,
        )
        .await;

        match result {
            Ok(info) => Ok(info),
            Err(e) if e.is_malformed() => {
                tracing::warn!("Regulations for {} unreadable, using placeholder", region);
                Ok(RegulationsInfo::placeholder(region))
            }
            Err(e) => Err(e),
        }
    }
}
