//! Listing metadata validation against the Grailed taxonomy.
//!
//! Two deliberately separate operations live here: [`validate`] is the
//! strict gate a record must pass before submission (bad taxonomy value or
//! missing required field ⇒ error), while [`missing_metadata`] is the
//! report-only preflight that tells the caller which optional metadata
//! fields are still absent. They have different failure semantics, so they
//! are different functions rather than one function with a mode flag.

use crate::images;
use crate::models::ListingRecord;
use crate::taxonomy::{COLORS, CONDITIONS, DEPARTMENTS, METADATA_FIELDS, REQUIRED_FIELDS};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one strict validation call. Owned by the caller; never
/// persisted on its own, only folded into run reports.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub normalized: ListingRecord,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub is_valid: bool,
}

/// Strict validation: checks taxonomy values and required fields, and
/// returns a normalized copy of the record. Pure — the input is untouched.
pub fn validate(record: &ListingRecord) -> ValidationResult {
    let mut normalized = record.clone();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Some(department) = &record.department
        && !DEPARTMENTS.contains(&department.as_str())
    {
        errors.push(format!("Invalid department: {department}"));
    }

    if let Some(condition) = &record.condition {
        let titled = title_case(condition);
        if CONDITIONS.contains(&titled.as_str()) {
            normalized.condition = Some(titled);
        } else {
            errors.push(format!("Invalid condition: {condition}"));
        }
    }

    if let Some(color) = &record.color
        && !COLORS.contains(&color.as_str())
    {
        match closest_color(color) {
            Some(palette) => {
                warnings.push(format!("Mapped color '{color}' to '{palette}'"));
                normalized.color = Some(palette.to_string());
            }
            None => warnings.push(format!("Unusual color: {color}")),
        }
    }

    for field in REQUIRED_FIELDS {
        let present = match field {
            "image_paths" => !record.image_paths.is_empty(),
            "price" => record.price.is_some(),
            _ => true,
        };
        if !present {
            errors.push(format!("Missing required field: {field}"));
        }
    }

    let is_valid = errors.is_empty();
    ValidationResult {
        normalized,
        errors,
        warnings,
        is_valid,
    }
}

/// Report-only preflight: which metadata fields are still missing. Absence
/// is information for the caller, never an error.
pub fn missing_metadata(record: &ListingRecord) -> Vec<&'static str> {
    METADATA_FIELDS
        .into_iter()
        .filter(|&field| !metadata_present(record, field))
        .collect()
}

fn metadata_present(record: &ListingRecord, field: &str) -> bool {
    match field {
        "department" => record.department.is_some(),
        "category" => record.category.is_some(),
        "sub_category" => record.sub_category.is_some(),
        "designer" => record.designer.is_some(),
        "item_name" => record.item_name.is_some(),
        "size" => record.size.is_some(),
        "color" => record.color.is_some(),
        "condition" => record.condition.is_some(),
        "description" => record.description.is_some(),
        _ => true,
    }
}

/// First palette entry related to `input` by case-insensitive substring
/// containment in either direction.
fn closest_color(input: &str) -> Option<&'static str> {
    let lowered = input.to_lowercase();
    COLORS.into_iter().find(|palette| {
        let palette_lowered = palette.to_lowercase();
        lowered.contains(&palette_lowered) || palette_lowered.contains(&lowered)
    })
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Serialize)]
pub struct ItemValidation {
    pub index: usize,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub missing_metadata: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct FileValidation {
    pub valid: bool,
    pub total_items: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub items: Vec<ItemValidation>,
}

/// Full-file validation behind the `validate` CLI command. Also probes the
/// image paths on disk so the report names files that will not upload.
pub fn file_report(records: &[ListingRecord]) -> FileValidation {
    let items: Vec<ItemValidation> = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let result = validate(record);
            let mut warnings = result.warnings;
            let (_, image_warnings) = images::resolve_paths(&record.image_paths);
            warnings.extend(image_warnings);
            ItemValidation {
                index,
                valid: result.is_valid,
                errors: result.errors,
                warnings,
                missing_metadata: missing_metadata(record),
            }
        })
        .collect();

    FileValidation {
        valid: items.iter().all(|item| item.valid),
        total_items: items.len(),
        total_errors: items.iter().map(|item| item.errors.len()).sum(),
        total_warnings: items.iter().map(|item| item.warnings.len()).sum(),
        items,
    }
}

#[derive(Debug, Serialize)]
pub struct RequirementsAnalysis {
    pub total_items: usize,
    pub items_needing_metadata: usize,
    pub items_ready: usize,
    pub common_missing_fields: BTreeMap<&'static str, usize>,
    pub recommendations: Vec<String>,
}

/// Preflight summary behind the `analyze` CLI command: how many items are
/// ready, and which metadata fields are most commonly missing.
pub fn requirements_analysis(records: &[ListingRecord]) -> RequirementsAnalysis {
    let mut common_missing_fields: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut items_needing_metadata = 0;

    for record in records {
        let missing = missing_metadata(record);
        if missing.is_empty() {
            continue;
        }
        items_needing_metadata += 1;
        for field in missing {
            *common_missing_fields.entry(field).or_insert(0) += 1;
        }
    }

    let items_ready = records.len() - items_needing_metadata;
    let mut recommendations = Vec::new();
    if items_needing_metadata > 0 {
        recommendations.push(format!(
            "{items_needing_metadata} item(s) still need metadata before they can be listed"
        ));
    }
    if items_ready > 0 {
        recommendations.push(format!("{items_ready} item(s) are ready for listing creation"));
    }
    if let Some((field, count)) = common_missing_fields
        .iter()
        .max_by_key(|(_, count)| **count)
    {
        recommendations.push(format!(
            "Most commonly missing field: {field} (missing in {count} item(s))"
        ));
    }

    RequirementsAnalysis {
        total_items: records.len(),
        items_needing_metadata,
        items_ready,
        common_missing_fields,
        recommendations,
    }
}
