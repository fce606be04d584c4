use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

/// One candidate listing as stored in the listings JSON file.
///
/// Field names follow the on-disk contract (`image_paths`, `sub_category`,
/// ...). Records round-trip losslessly: validation never mutates a loaded
/// record, it produces a normalized copy.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ListingRecord {
    #[serde(default)]
    pub image_paths: Vec<String>,
    pub price: Option<f64>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub designer: Option<String>,
    pub item_name: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub description: Option<String>,
    pub accept_offers: Option<bool>,
    pub smart_pricing: Option<bool>,
    pub floor_price: Option<f64>,
    pub country_of_origin: Option<String>,
}

impl ListingRecord {
    /// Short human label for progress output: the item name when present,
    /// otherwise the designer, otherwise a placeholder.
    pub fn label(&self) -> &str {
        self.item_name
            .as_deref()
            .or(self.designer.as_deref())
            .unwrap_or("(unnamed item)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded,
    Skipped,
    Failed,
}

/// Per-item outcome inside a [`RunReport`]. Every item the run touched gets
/// exactly one entry; skipped and failed entries always carry a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub index: usize,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub elapsed_ms: u128,
}

impl ItemOutcome {
    pub fn succeeded(index: usize, elapsed_ms: u128) -> Self {
        Self {
            index,
            status: ItemStatus::Succeeded,
            reason: None,
            elapsed_ms,
        }
    }

    pub fn skipped(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            status: ItemStatus::Skipped,
            reason: Some(reason.into()),
            elapsed_ms: 0,
        }
    }

    pub fn failed(index: usize, reason: impl Into<String>, elapsed_ms: u128) -> Self {
        Self {
            index,
            status: ItemStatus::Failed,
            reason: Some(reason.into()),
            elapsed_ms,
        }
    }
}

/// Accumulated result of one submission run. Append-only while the run is
/// in flight; checkpointed after every outcome so a crash leaves an
/// accurate partial record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<ItemOutcome>,
    /// Set only when the whole run aborted (lost browser session).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
            fatal: None,
        }
    }

    pub fn push(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_record_round_trips() {
        let raw = serde_json::json!({
            "image_paths": ["~/photos/jacket_front.jpg"],
            "price": 120.0,
            "department": "Menswear",
            "designer": "Brain Dead x A.P.C",
            "condition": "like new",
            "accept_offers": true
        });
        let record: ListingRecord = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(record.price, Some(120.0));
        assert_eq!(record.accept_offers, Some(true));
        assert!(record.category.is_none());

        let back = serde_json::to_value(&record).expect("serialize");
        let again: ListingRecord = serde_json::from_value(back).expect("round trip");
        assert_eq!(again, record);
    }

    #[test]
    fn absent_optionals_are_not_serialized() {
        let record = ListingRecord {
            image_paths: vec!["a.jpg".into()],
            price: Some(10.0),
            department: None,
            category: None,
            sub_category: None,
            designer: None,
            item_name: None,
            size: None,
            color: None,
            condition: None,
            description: None,
            accept_offers: None,
            smart_pricing: None,
            floor_price: None,
            country_of_origin: None,
        };
        let value = serde_json::to_value(&record).expect("serialize");
        assert!(value.get("department").is_none());
        assert!(value.get("floor_price").is_none());
    }

    #[test]
    fn report_counts_by_status() {
        let mut report = RunReport::new(true);
        report.push(ItemOutcome::succeeded(0, 12));
        report.push(ItemOutcome::failed(1, "element not found", 40));
        report.push(ItemOutcome::skipped(2, "missing price"));
        report.finish();

        assert_eq!(report.count(ItemStatus::Succeeded), 1);
        assert_eq!(report.count(ItemStatus::Failed), 1);
        assert_eq!(report.count(ItemStatus::Skipped), 1);
        assert!(report.finished_at.is_some());
    }
}
