//! Session orchestration: validation and image resolution in front of the
//! submission pipeline, one browser session per run.

use crate::browser::BrowserSession;
use crate::config::AgentConfig;
use crate::images;
use crate::models::{ListingRecord, RunReport};
use crate::navigator::{Navigator, OperatorGate};
use crate::pipeline::{PlannedItem, PreparedListing, SubmissionPipeline};
use crate::validate;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub start_index: usize,
    pub dry_run: bool,
}

/// Builds the ordered work plan. Records that fail strict validation or
/// image resolution are kept in the plan as rejects, so the final report
/// carries a reason for every item instead of silently dropping them.
pub fn plan_records(records: &[ListingRecord], strict_formats: bool) -> Vec<PlannedItem> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let result = validate::validate(record);
            for warning in &result.warnings {
                warn!(target: "lister.agent", index, "{warning}");
            }
            if !result.is_valid {
                return PlannedItem::Reject {
                    index,
                    reason: result.errors.join("; "),
                };
            }

            let (resolved, image_warnings) = images::resolve_paths(&result.normalized.image_paths);
            for warning in &image_warnings {
                warn!(target: "lister.agent", index, "{warning}");
            }
            if strict_formats && let Err(err) = images::enforce_formats(&resolved) {
                return PlannedItem::Reject {
                    index,
                    reason: err.to_string(),
                };
            }
            if resolved.is_empty() {
                return PlannedItem::Reject {
                    index,
                    reason: "no image file could be resolved".into(),
                };
            }

            PlannedItem::Submit(PreparedListing {
                index,
                record: result.normalized,
                images: resolved,
            })
        })
        .collect()
}

pub struct ListingAgent<B, G> {
    pipeline: SubmissionPipeline<B, G>,
    strict_formats: bool,
}

impl<B: BrowserSession, G: OperatorGate> ListingAgent<B, G> {
    pub fn new(browser: B, gate: G, config: &AgentConfig, cancel: Arc<AtomicBool>) -> Self {
        let nav = Navigator::new(
            browser,
            config.site_root.clone(),
            config.retry_policy(),
            cancel,
        );
        let mut pipeline = SubmissionPipeline::new(nav, gate, config.confirm_each);
        if let Some(path) = &config.report_path {
            pipeline = pipeline.with_checkpoint(path.clone());
        }
        Self {
            pipeline,
            strict_formats: config.strict_image_formats,
        }
    }

    pub async fn run(&mut self, records: &[ListingRecord], options: RunOptions) -> RunReport {
        let plan = plan_records(records, self.strict_formats);
        self.pipeline
            .submit(&plan, options.start_index, options.dry_run)
            .await
    }
}
