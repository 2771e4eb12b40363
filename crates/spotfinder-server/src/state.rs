//! Shared services behind the relay handlers.

use spotfinder_ai::{
    CachePolicy, DescriptionBackfill, ExpertChat, FishIdentifier, OpenAiClient,
    RegulationsFetcher, SpotAnalyzer, TextGenerator, VisionClient, WeatherAnnotator,
};
use spotfinder_core::{AppError, AppResult, Config, CredentialProvider, PlacesConfig};
use spotfinder_geo::{MpaClient, PlacesClient, RegionResolver};
use spotfinder_store::{ProtectedAreaStore, SqliteStore};
use std::sync::Arc;
use std::time::Duration;

/// Everything a handler needs, cheap to clone into each request.
#[derive(Clone)]
pub struct AppState {
    pub spots: Arc<SpotAnalyzer>,
    pub weather: Arc<WeatherAnnotator>,
    pub regulations: Arc<RegulationsFetcher>,
    pub regions: Arc<RegionResolver>,
    pub chat: Arc<ExpertChat>,
    pub fish: Arc<FishIdentifier>,
    pub backfill: Arc<DescriptionBackfill>,
    pub places: Arc<PlacesClient>,
    pub places_defaults: PlacesConfig,
    pub mpa: Arc<MpaClient>,
    pub areas: Arc<dyn ProtectedAreaStore>,
    pub location_timeout: Duration,
}

impl AppState {
    /// Wire up real provider clients from config.
    ///
    /// # Errors
    /// Fails only when an HTTP client can't be constructed.
    pub fn from_config(
        config: &Config,
        credentials: Arc<dyn CredentialProvider>,
        store: Arc<SqliteStore>,
    ) -> AppResult<Self> {
        let generator: Arc<dyn TextGenerator> =
            Arc::new(OpenAiClient::from_config(credentials.clone(), &config.analysis)?);
        let weather_provider =
            spotfinder_weather::provider_for(config.weather.provider, credentials.clone())?;
        let regions = Arc::new(
            RegionResolver::from_config(&config.geocoding, credentials.clone())
                .map_err(|e| AppError::provider("geocoding", e.to_string()))?,
        );
        let vision = Arc::new(VisionClient::new(credentials.clone())?);

        Ok(Self {
            spots: Arc::new(
                SpotAnalyzer::new(store.clone(), generator.clone())
                    .with_policy(CachePolicy::from_max_age_hours(
                        config.analysis.cache_max_age_hours,
                    ))
                    .with_max_name_chars(config.analysis.max_prompt_chars),
            ),
            weather: Arc::new(WeatherAnnotator::new(weather_provider, generator.clone())),
            regulations: Arc::new(RegulationsFetcher::new(regions.clone(), generator.clone())),
            regions,
            chat: Arc::new(
                ExpertChat::new(generator.clone())
                    .with_max_message_chars(config.analysis.max_prompt_chars),
            ),
            fish: Arc::new(FishIdentifier::new(vision, generator.clone())),
            backfill: Arc::new(DescriptionBackfill::new(store.clone(), generator)),
            places: Arc::new(PlacesClient::new(credentials)?),
            places_defaults: config.places.clone(),
            mpa: Arc::new(MpaClient::new()?),
            areas: store,
            location_timeout: Duration::from_secs(config.location.timeout_secs),
        })
    }
}
