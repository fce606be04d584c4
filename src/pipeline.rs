//! Sequential listing submission.
//!
//! Items are processed strictly in ascending index order over one shared
//! navigation session. A failing item is recorded and the run moves on;
//! only a lost browser session aborts the remainder of the run.

use crate::browser::{BrowserCommand, BrowserError, BrowserSession};
use crate::classifier::sel;
use crate::models::{ItemOutcome, ListingRecord, RunReport};
use crate::navigator::{NavigationError, Navigator, OperatorGate};
use crate::storage;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

/// A record that has passed validation and image resolution.
#[derive(Debug, Clone)]
pub struct PreparedListing {
    pub index: usize,
    pub record: ListingRecord,
    pub images: Vec<PathBuf>,
}

/// Ordered work plan entry. Records rejected before any browser work stay
/// in the plan so the report never silently drops an item.
#[derive(Debug, Clone)]
pub enum PlannedItem {
    Submit(PreparedListing),
    Reject { index: usize, reason: String },
}

impl PlannedItem {
    pub fn index(&self) -> usize {
        match self {
            PlannedItem::Submit(prepared) => prepared.index,
            PlannedItem::Reject { index, .. } => *index,
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("navigation failed: {0}")]
    Navigation(NavigationError),
    #[error("could not fill {field}: {source}")]
    Fill {
        field: &'static str,
        source: BrowserError,
    },
    #[error("publish rejected: {0}")]
    Publish(BrowserError),
    #[error(transparent)]
    Session(BrowserError),
    #[error("run cancelled")]
    Cancelled,
}

impl SubmitError {
    fn from_navigation(err: NavigationError) -> Self {
        match err {
            NavigationError::Cancelled => SubmitError::Cancelled,
            NavigationError::Browser(inner) if inner.is_fatal() => SubmitError::Session(inner),
            other => SubmitError::Navigation(other),
        }
    }

    fn from_browser(field: &'static str, err: BrowserError) -> Self {
        if err.is_fatal() {
            SubmitError::Session(err)
        } else {
            SubmitError::Fill { field, source: err }
        }
    }

    fn is_fatal(&self) -> bool {
        matches!(self, SubmitError::Session(_))
    }
}

pub struct SubmissionPipeline<B, G> {
    nav: Navigator<B>,
    gate: G,
    confirm_each: bool,
    checkpoint: Option<PathBuf>,
}

impl<B: BrowserSession, G: OperatorGate> SubmissionPipeline<B, G> {
    pub fn new(nav: Navigator<B>, gate: G, confirm_each: bool) -> Self {
        Self {
            nav,
            gate,
            confirm_each,
            checkpoint: None,
        }
    }

    pub fn with_checkpoint(mut self, path: PathBuf) -> Self {
        self.checkpoint = Some(path);
        self
    }

    /// Runs the plan in order, starting at `start_index`. Always returns a
    /// report — cancellation and fatal errors yield the partial report
    /// accumulated so far.
    pub async fn submit(
        &mut self,
        plan: &[PlannedItem],
        start_index: usize,
        dry_run: bool,
    ) -> RunReport {
        let mut report = RunReport::new(dry_run);
        for item in plan {
            if item.index() < start_index {
                continue;
            }
            match item {
                PlannedItem::Reject { index, reason } => {
                    warn!(target: "lister.pipeline", index, %reason, "skipping item");
                    report.push(ItemOutcome::skipped(*index, reason.clone()));
                }
                PlannedItem::Submit(prepared) => {
                    let started = Instant::now();
                    match self.submit_one(prepared, dry_run).await {
                        Ok(true) => {
                            info!(
                                target: "lister.pipeline",
                                index = prepared.index,
                                label = prepared.record.label(),
                                "listing submitted"
                            );
                            report.push(ItemOutcome::succeeded(
                                prepared.index,
                                started.elapsed().as_millis(),
                            ));
                        }
                        Ok(false) => {
                            report.push(ItemOutcome::skipped(
                                prepared.index,
                                "publish declined by operator",
                            ));
                        }
                        Err(SubmitError::Cancelled) => {
                            info!(target: "lister.pipeline", "cancelled; stopping with partial report");
                            report.push(ItemOutcome::skipped(prepared.index, "run cancelled"));
                            break;
                        }
                        Err(err) if err.is_fatal() => {
                            error!(target: "lister.pipeline", index = prepared.index, error = %err, "aborting run");
                            report.push(ItemOutcome::failed(
                                prepared.index,
                                err.to_string(),
                                started.elapsed().as_millis(),
                            ));
                            report.fatal = Some(err.to_string());
                            break;
                        }
                        Err(err) => {
                            warn!(target: "lister.pipeline", index = prepared.index, error = %err, "item failed; continuing");
                            report.push(ItemOutcome::failed(
                                prepared.index,
                                err.to_string(),
                                started.elapsed().as_millis(),
                            ));
                        }
                    }
                }
            }
            self.write_checkpoint(&report);
        }
        report.finish();
        self.write_checkpoint(&report);
        report
    }

    async fn submit_one(
        &mut self,
        item: &PreparedListing,
        dry_run: bool,
    ) -> Result<bool, SubmitError> {
        // a prior item's publish, or any stray modal, may have moved the
        // session away from the form — always re-verify before filling
        self.nav
            .ensure_ready(&mut self.gate)
            .await
            .map_err(SubmitError::from_navigation)?;

        self.fill_form(item).await?;

        if dry_run {
            info!(target: "lister.pipeline", index = item.index, "dry run: skipping publish");
            return Ok(true);
        }

        if self.confirm_each
            && !self
                .gate
                .confirm_publish(item.index, item.record.label())
                .await
        {
            return Ok(false);
        }

        self.drive(
            "publish",
            BrowserCommand::Click {
                selector: sel::PUBLISH_BUTTON.to_string(),
            },
        )
        .await
        .map_err(|err| match err {
            SubmitError::Fill { source, .. } => SubmitError::Publish(source),
            other => other,
        })?;
        self.nav.invalidate();
        Ok(true)
    }

    async fn fill_form(&mut self, item: &PreparedListing) -> Result<(), SubmitError> {
        let record = &item.record;

        if let Some(designer) = &record.designer {
            let (primary, collaborators) = split_designer(designer);
            self.drive(
                "designer",
                BrowserCommand::Fill {
                    selector: sel::DESIGNER_INPUT.to_string(),
                    text: primary,
                },
            )
            .await?;
            // collaborators go through the same picker after the primary,
            // never as the primary designer themselves
            for collaborator in collaborators {
                self.drive(
                    "designer collaboration",
                    BrowserCommand::Fill {
                        selector: sel::DESIGNER_INPUT.to_string(),
                        text: collaborator,
                    },
                )
                .await?;
            }
        }

        if let Some(department) = &record.department {
            self.drive(
                "department",
                BrowserCommand::Click {
                    selector: sel::DEPARTMENT_PICKER.to_string(),
                },
            )
            .await?;
            self.drive(
                "department",
                BrowserCommand::Click {
                    selector: sel::menu_item(department),
                },
            )
            .await?;
        }
        if let Some(category) = &record.category {
            self.drive(
                "category",
                BrowserCommand::Click {
                    selector: sel::menu_item(category),
                },
            )
            .await?;
        }
        if let Some(sub_category) = &record.sub_category {
            self.drive(
                "sub_category",
                BrowserCommand::Click {
                    selector: sel::menu_item(sub_category),
                },
            )
            .await?;
        }
        if let Some(item_name) = &record.item_name {
            self.drive(
                "item_name",
                BrowserCommand::Fill {
                    selector: sel::ITEM_NAME_INPUT.to_string(),
                    text: item_name.clone(),
                },
            )
            .await?;
        }
        if let Some(size) = &record.size {
            self.drive(
                "size",
                BrowserCommand::Select {
                    selector: sel::SIZE_SELECT.to_string(),
                    value: size.clone(),
                },
            )
            .await?;
        }
        if let Some(color) = &record.color {
            self.drive(
                "color",
                BrowserCommand::Click {
                    selector: sel::COLOR_PICKER.to_string(),
                },
            )
            .await?;
            self.drive(
                "color",
                BrowserCommand::Click {
                    selector: sel::menu_item(color),
                },
            )
            .await?;
        }
        if let Some(condition) = &record.condition {
            self.drive(
                "condition",
                BrowserCommand::Select {
                    selector: sel::CONDITION_SELECT.to_string(),
                    value: condition.clone(),
                },
            )
            .await?;
        }
        if let Some(price) = record.price {
            self.drive(
                "price",
                BrowserCommand::Fill {
                    selector: sel::PRICE_INPUT.to_string(),
                    text: format_price(price),
                },
            )
            .await?;
        }
        if record.accept_offers == Some(true) {
            self.drive(
                "accept_offers",
                BrowserCommand::Click {
                    selector: sel::ACCEPT_OFFERS_TOGGLE.to_string(),
                },
            )
            .await?;
        }
        if record.smart_pricing == Some(true) {
            self.drive(
                "smart_pricing",
                BrowserCommand::Click {
                    selector: sel::SMART_PRICING_TOGGLE.to_string(),
                },
            )
            .await?;
            if let Some(floor) = record.floor_price {
                self.drive(
                    "floor_price",
                    BrowserCommand::Fill {
                        selector: sel::FLOOR_PRICE_INPUT.to_string(),
                        text: format_price(floor),
                    },
                )
                .await?;
            }
        }
        if let Some(description) = &record.description {
            self.drive(
                "description",
                BrowserCommand::Fill {
                    selector: sel::DESCRIPTION_INPUT.to_string(),
                    text: description.clone(),
                },
            )
            .await?;
        }
        if !item.images.is_empty() {
            self.drive(
                "images",
                BrowserCommand::Upload {
                    selector: sel::IMAGE_INPUT.to_string(),
                    paths: item
                        .images
                        .iter()
                        .map(|path| path.display().to_string())
                        .collect(),
                },
            )
            .await?;
        }
        Ok(())
    }

    async fn drive(
        &mut self,
        field: &'static str,
        command: BrowserCommand,
    ) -> Result<(), SubmitError> {
        self.nav
            .browser_mut()
            .act(command)
            .await
            .map_err(|err| SubmitError::from_browser(field, err))
    }

    fn write_checkpoint(&self, report: &RunReport) {
        if let Some(path) = &self.checkpoint
            && let Err(err) = storage::checkpoint_report(path, report)
        {
            warn!(target: "lister.pipeline", error = %err, "could not checkpoint run report");
        }
    }
}

/// Splits a collaboration designer string into the primary designer and
/// collaborator entries: `"Brain Dead x A.P.C"` → `("Brain Dead", ["A.P.C"])`.
pub(crate) fn split_designer(raw: &str) -> (String, Vec<String>) {
    let mut parts = raw
        .split(" x ")
        .flat_map(|part| part.split(" X "))
        .flat_map(|part| part.split('×'))
        .map(str::trim)
        .filter(|part| !part.is_empty());
    let primary = parts.next().unwrap_or("").to_string();
    let collaborators = parts.map(str::to_string).collect();
    (primary, collaborators)
}

fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        format!("{price}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{AutoGate, FakeSite, ROOT};
    use crate::models::ItemStatus;
    use crate::navigator::RetryPolicy;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn sample_record(name: &str) -> ListingRecord {
        serde_json::from_value(serde_json::json!({
            "image_paths": ["/tmp/front.jpg"],
            "price": 85.0,
            "department": "Menswear",
            "category": "Outerwear",
            "sub_category": "Denim Jackets",
            "designer": "A.P.C",
            "item_name": name,
            "size": "M",
            "color": "Indigo",
            "condition": "Gently Used",
            "description": "Well loved, no flaws"
        }))
        .expect("sample record")
    }

    fn submit_item(index: usize, record: ListingRecord) -> PlannedItem {
        PlannedItem::Submit(PreparedListing {
            index,
            record,
            images: vec![PathBuf::from("/tmp/front.jpg")],
        })
    }

    fn pipeline_for(site: &FakeSite) -> SubmissionPipeline<FakeSite, AutoGate> {
        let nav = Navigator::new(
            site.clone(),
            ROOT.to_string(),
            RetryPolicy::fixed(3, 0),
            Arc::new(AtomicBool::new(false)),
        );
        SubmissionPipeline::new(nav, AutoGate::new(site), false)
    }

    #[tokio::test]
    async fn processes_in_order_and_isolates_failures() {
        // item 1's publish arms three ignored sell clicks, so item 2 burns
        // its whole retry budget and item 3 recovers
        let site = FakeSite::new().with_sell_clicks_ignored_after_publish(3);
        let mut pipeline = pipeline_for(&site);
        let plan = vec![
            submit_item(0, sample_record("jacket")),
            submit_item(1, sample_record("jeans")),
            submit_item(2, sample_record("shirt")),
        ];

        let report = pipeline.submit(&plan, 0, false).await;

        let indices: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(report.outcomes[0].status, ItemStatus::Succeeded);
        assert_eq!(report.outcomes[1].status, ItemStatus::Failed);
        assert_eq!(report.outcomes[2].status, ItemStatus::Succeeded);
        let reason = report.outcomes[1].reason.as_deref().expect("reason");
        assert!(reason.contains("navigation failed"), "reason: {reason}");
        assert_eq!(site.publishes(), 2);
        assert!(report.fatal.is_none());
    }

    #[tokio::test]
    async fn dry_run_never_clicks_publish() {
        let site = FakeSite::new();
        let mut pipeline = pipeline_for(&site);
        let plan = vec![
            submit_item(0, sample_record("jacket")),
            submit_item(1, sample_record("jeans")),
        ];

        let report = pipeline.submit(&plan, 0, true).await;

        assert_eq!(report.count(ItemStatus::Succeeded), 2);
        assert_eq!(site.publishes(), 0);
        let publish_clicks = site
            .commands()
            .iter()
            .filter(|command| {
                matches!(command, BrowserCommand::Click { selector } if selector.as_str() == sel::PUBLISH_BUTTON)
            })
            .count();
        assert_eq!(publish_clicks, 0);
    }

    #[tokio::test]
    async fn live_run_publishes_exactly_once_per_item() {
        let site = FakeSite::new();
        let mut pipeline = pipeline_for(&site);
        let plan = vec![
            submit_item(0, sample_record("jacket")),
            submit_item(1, sample_record("jeans")),
        ];

        let report = pipeline.submit(&plan, 0, false).await;

        assert_eq!(report.count(ItemStatus::Succeeded), 2);
        assert_eq!(site.publishes(), 2);
        let publish_clicks = site
            .commands()
            .iter()
            .filter(|command| {
                matches!(command, BrowserCommand::Click { selector } if selector.as_str() == sel::PUBLISH_BUTTON)
            })
            .count();
        assert_eq!(publish_clicks, 2);
    }

    #[tokio::test]
    async fn start_index_skips_earlier_items() {
        let site = FakeSite::new();
        let mut pipeline = pipeline_for(&site);
        let plan = vec![
            submit_item(0, sample_record("jacket")),
            submit_item(1, sample_record("jeans")),
            submit_item(2, sample_record("shirt")),
        ];

        let report = pipeline.submit(&plan, 1, false).await;

        let indices: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(site.publishes(), 2);
    }

    #[tokio::test]
    async fn rejected_items_become_skips_without_browser_work() {
        let site = FakeSite::new();
        let mut pipeline = pipeline_for(&site);
        let plan = vec![
            PlannedItem::Reject {
                index: 0,
                reason: "Invalid department: menswear".into(),
            },
            submit_item(1, sample_record("jeans")),
        ];

        let report = pipeline.submit(&plan, 0, false).await;

        assert_eq!(report.outcomes[0].status, ItemStatus::Skipped);
        assert_eq!(
            report.outcomes[0].reason.as_deref(),
            Some("Invalid department: menswear")
        );
        assert_eq!(report.outcomes[1].status, ItemStatus::Succeeded);
        assert_eq!(site.publishes(), 1);
    }

    #[tokio::test]
    async fn collaboration_designers_fill_primary_first() {
        let site = FakeSite::new();
        let mut pipeline = pipeline_for(&site);
        let mut record = sample_record("collab tee");
        record.designer = Some("Brain Dead x A.P.C".into());

        pipeline.submit(&[submit_item(0, record)], 0, false).await;

        let designer_fills: Vec<String> = site
            .commands()
            .iter()
            .filter_map(|command| match command {
                BrowserCommand::Fill { selector, text }
                    if selector.as_str() == sel::DESIGNER_INPUT =>
                {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(designer_fills, vec!["Brain Dead".to_string(), "A.P.C".to_string()]);
    }

    #[tokio::test]
    async fn fill_failure_fails_the_item_but_not_the_run() {
        let site = FakeSite::new().with_failing_selector(sel::SIZE_SELECT);
        let mut pipeline = pipeline_for(&site);
        let plan = vec![
            submit_item(0, sample_record("jacket")),
            submit_item(1, sample_record("jeans")),
        ];

        let report = pipeline.submit(&plan, 0, false).await;

        assert_eq!(report.outcomes[0].status, ItemStatus::Failed);
        let reason = report.outcomes[0].reason.as_deref().expect("reason");
        assert!(reason.contains("size"), "reason: {reason}");
        // both items fail on the same selector, but both were attempted
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.fatal.is_none());
    }

    #[tokio::test]
    async fn lost_session_aborts_with_partial_report() {
        let site = FakeSite::new();
        let mut pipeline = pipeline_for(&site);
        site.drop_session();
        let plan = vec![
            submit_item(0, sample_record("jacket")),
            submit_item(1, sample_record("jeans")),
        ];

        let report = pipeline.submit(&plan, 0, false).await;

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].status, ItemStatus::Failed);
        assert!(report.fatal.as_deref().is_some_and(|f| f.contains("session lost")));
    }

    #[tokio::test]
    async fn declined_confirmation_skips_the_publish() {
        let site = FakeSite::new();
        let nav = Navigator::new(
            site.clone(),
            ROOT.to_string(),
            RetryPolicy::fixed(3, 0),
            Arc::new(AtomicBool::new(false)),
        );
        let mut pipeline = SubmissionPipeline::new(nav, AutoGate::declining(&site), true);

        let report = pipeline
            .submit(&[submit_item(0, sample_record("jacket"))], 0, false)
            .await;

        assert_eq!(report.outcomes[0].status, ItemStatus::Skipped);
        assert_eq!(
            report.outcomes[0].reason.as_deref(),
            Some("publish declined by operator")
        );
        assert_eq!(site.publishes(), 0);
    }

    #[test]
    fn designer_split_handles_collaborations() {
        assert_eq!(
            split_designer("Brain Dead x A.P.C"),
            ("Brain Dead".to_string(), vec!["A.P.C".to_string()])
        );
        assert_eq!(
            split_designer("Nike × Sacai × Undercover"),
            (
                "Nike".to_string(),
                vec!["Sacai".to_string(), "Undercover".to_string()]
            )
        );
        assert_eq!(split_designer("Margiela"), ("Margiela".to_string(), vec![]));
        // a lone designer with an x inside the name is not a collaboration
        assert_eq!(split_designer("Axel Arigato"), ("Axel Arigato".to_string(), vec![]));
    }

    #[test]
    fn prices_format_without_trailing_zeros() {
        assert_eq!(format_price(85.0), "85");
        assert_eq!(format_price(49.5), "49.5");
    }
}
