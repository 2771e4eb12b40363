//! Backfill angler-facing descriptions for stored spots.

use serde::Serialize;
use spotfinder_store::AnalysisStore;
use std::sync::Arc;
use tracing::instrument;

use crate::client::TextGenerator;
use crate::error::AnalysisError;
use crate::prompts;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub updated: usize,
    pub failed: usize,
}

pub struct DescriptionBackfill {
    store: Arc<dyn AnalysisStore>,
    generator: Arc<dyn TextGenerator>,
}

impl DescriptionBackfill {
    pub fn new(store: Arc<dyn AnalysisStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    /// Describe every spot whose description is still empty.
    ///
    /// Spots are processed one after another. A spot whose generation or
    /// write fails is counted and skipped.
    ///
    /// # Errors
    /// `Store` only when the list of pending spots can't be read.
    #[instrument(skip(self), level = "info")]
    pub async fn run(&self) -> Result<BackfillReport, AnalysisError> {
        let pending = self.store.spots_missing_description()?;
        tracing::info!("Found {} spots without a description", pending.len());

        let mut report = BackfillReport::default();
        for spot in pending {
            let reply = self
                .generator
                .complete(
                    prompts::DESCRIPTION_SYSTEM,
                    &prompts::spot_description(&spot.fish_analysis),
                    None,
                )
                .await;

            let description = match reply {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                Ok(_) => {
                    tracing::warn!("Empty description generated for {}", spot.place_id);
                    report.failed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Description for {} failed: {}", spot.place_id, e);
                    report.failed += 1;
                    continue;
                }
            };

            match self.store.set_description(&spot.place_id, &description) {
                Ok(()) => report.updated += 1,
                Err(e) => {
                    tracing::warn!("Failed to save description for {}: {}", spot.place_id, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Description backfill done: {} updated, {} failed",
            report.updated,
            report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::testing::ScriptedGenerator;
    use spotfinder_store::SqliteStore;

    #[tokio::test]
    async fn test_backfill_fills_missing_descriptions() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.upsert_analysis("a", r#"[{"name":"Bass","description":""}]"#).unwrap();
        store.upsert_analysis("b", r#"[{"name":"Pike","description":""}]"#).unwrap();
        store.set_description("b", "Already described.").unwrap();

        let generator = Arc::new(ScriptedGenerator::replying("A calm pier known for bass."));
        let report = DescriptionBackfill::new(store.clone(), generator.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report, BackfillReport { updated: 1, failed: 0 });
        assert_eq!(generator.calls(), 1);
        let (_, user) = generator.last_prompt().unwrap();
        assert!(user.contains(r#""[{"name":"Bass","description":""}]""#));
        assert_eq!(
            store.get_analysis("a").unwrap().unwrap().description.as_deref(),
            Some("A calm pier known for bass.")
        );
    }

    #[tokio::test]
    async fn test_backfill_counts_failures_and_continues() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.upsert_analysis("a", "[]").unwrap();
        store.upsert_analysis("b", "[]").unwrap();
        store.upsert_analysis("c", "[]").unwrap();

        let generator = Arc::new(ScriptedGenerator::sequence(vec![
            Ok("First."),
            Err(500),
            Ok("   "),
        ]));
        let report = DescriptionBackfill::new(store.clone(), generator).run().await.unwrap();

        assert_eq!(report, BackfillReport { updated: 1, failed: 2 });
        assert_eq!(store.spots_missing_description().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_backfill_with_nothing_pending() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let generator = Arc::new(ScriptedGenerator::replying("unused"));
        let report = DescriptionBackfill::new(store, generator.clone()).run().await.unwrap();
        assert_eq!(report, BackfillReport::default());
        assert_eq!(generator.calls(), 0);
    }
}
