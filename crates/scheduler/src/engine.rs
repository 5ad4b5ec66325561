//! Execution engine: one bounded refresh pass for one scheduled update.
//!
//! Resolves the update's content bases, filters their member items, and
//! marks each eligible item for refresh. Item failures are non-fatal;
//! only errors that prevent the pass as a whole (a registry read failing
//! for an existing base) flip the result to failed. The engine never
//! returns `Err` — the poller must keep its tick loop alive regardless.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use refresh_core::content::{ContentItem, SourceType};
use refresh_core::model::{RefreshOptions, RunResult, ScheduledUpdate, STALENESS_DAYS};

use crate::store::ContentRegistry;

/// Stateless executor over a content registry.
pub struct ExecutionEngine {
    registry: Arc<dyn ContentRegistry>,
    item_timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<dyn ContentRegistry>, item_timeout: Duration) -> Self {
        Self {
            registry,
            item_timeout,
        }
    }

    /// Run one refresh pass. Infallible by contract: failures are folded
    /// into the returned [`RunResult`].
    pub async fn execute(&self, update: &ScheduledUpdate, triggered_manually: bool) -> RunResult {
        let now = Utc::now();
        info!(
            update_id = %update.id,
            name = %update.name,
            manual = triggered_manually,
            bases = update.target_base_ids.len(),
            "executing refresh pass"
        );

        let mut processed: u64 = 0;

        for &base_id in &update.target_base_ids {
            let base = match self.registry.get_base(base_id).await {
                Ok(Some(base)) => base,
                Ok(None) => {
                    warn!(update_id = %update.id, base_id, "content base no longer exists, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(update_id = %update.id, base_id, error = %e, "failed to load content base");
                    return failed(
                        format!("failed to load content base {}: {}", base_id, e),
                        processed,
                    );
                }
            };

            let items = match self.registry.list_items(base.id).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(update_id = %update.id, base_id, error = %e, "failed to list content items");
                    return failed(
                        format!("failed to list items of content base {}: {}", base_id, e),
                        processed,
                    );
                }
            };

            for item in items {
                if !passes_filters(&item, &update.options, now) {
                    continue;
                }
                if !type_eligible(item.source_type, &update.options) {
                    debug!(item_id = item.id, source_type = %item.source_type, "source type not selected");
                    continue;
                }

                match tokio::time::timeout(
                    self.item_timeout,
                    self.registry.mark_for_refresh(item.id),
                )
                .await
                {
                    Ok(Ok(())) => processed += 1,
                    Ok(Err(e)) => {
                        warn!(item_id = item.id, error = %e, "item refresh failed, continuing");
                    }
                    Err(_) => {
                        warn!(item_id = item.id, timeout_secs = self.item_timeout.as_secs(), "item refresh timed out, continuing");
                    }
                }
            }
        }

        info!(update_id = %update.id, items = processed, "refresh pass complete");
        RunResult {
            success: true,
            message: format!("Processed {} items", processed),
            items_processed: processed,
        }
    }
}

/// Failed result that still reports the items marked before the failure.
fn failed(message: String, items_processed: u64) -> RunResult {
    RunResult {
        success: false,
        message,
        items_processed,
    }
}

/// Staleness/tag/id filters, applied in that order.
fn passes_filters(item: &ContentItem, options: &RefreshOptions, now: DateTime<Utc>) -> bool {
    if options.only_outdated {
        let age = now.signed_duration_since(item.updated_at);
        if age < chrono::Duration::days(STALENESS_DAYS) {
            return false;
        }
    }

    if !options.specific_tags.is_empty()
        && !item
            .tags
            .iter()
            .any(|t| options.specific_tags.iter().any(|wanted| wanted == t))
    {
        return false;
    }

    if !options.specific_item_ids.is_empty() && !options.specific_item_ids.contains(&item.id) {
        return false;
    }

    true
}

/// Source-type eligibility. All three flags false means "no restriction":
/// observable behavior of the original system, kept on purpose.
fn type_eligible(source_type: SourceType, options: &RefreshOptions) -> bool {
    let no_restriction =
        !options.refresh_urls && !options.refresh_pdfs && !options.refresh_youtube_videos;
    if no_restriction {
        return true;
    }
    match source_type {
        SourceType::Url => options.refresh_urls,
        SourceType::Pdf => options.refresh_pdfs,
        SourceType::YoutubeVideo => options.refresh_youtube_videos,
    }
}
