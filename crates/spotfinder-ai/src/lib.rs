//! Generative analyses for spotfinder.
//!
//! Every call to the text generator goes through [`TextGenerator`]; calls
//! that need structured data use [`structured::request_structured`].

pub mod backfill;
pub mod chat;
pub mod client;
pub mod error;
pub mod prompts;
pub mod regulations;
pub mod spot;
pub mod structured;
pub mod vision;
pub mod weather;

#[cfg(test)]
mod testing;

pub use backfill::{BackfillReport, DescriptionBackfill};
pub use chat::ExpertChat;
pub use client::{OpenAiClient, TextGenerator};
pub use error::{AnalysisError, ProviderError, VisionError};
pub use regulations::{RegulationsFetcher, RegulationsInfo};
pub use spot::{CachePolicy, FishSpecies, SpotAnalysis, SpotAnalyzer};
pub use structured::request_structured;
pub use vision::{
    decode_image, FishIdentification, FishIdentifier, ImageAnnotations, ImageAnnotator,
    VisionClient,
};
pub use weather::{WeatherAnalysis, WeatherAnnotator};
