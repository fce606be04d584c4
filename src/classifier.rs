//! Page-state classification and the site's DOM contract.
//!
//! The browser driver reports pages as landmark identifier sets plus the
//! current URL; everything the rest of the crate knows about Grailed's DOM
//! is collected here. Classification is a priority-ordered first-match rule
//! list over a single snapshot — a pure function, because the browser can
//! change state behind our back (operator-driven login, redirects) and any
//! cached answer would be a lie.

use crate::browser::PageSnapshot;
use serde::Serialize;
use std::fmt;

/// Observation-side landmark identifiers the driver reports when the
/// corresponding element is present.
pub mod landmarks {
    pub const LOGIN_MODAL: &str = "login-modal";
    pub const EMAIL_INPUT: &str = "login-email";
    pub const PASSWORD_INPUT: &str = "login-password";
    #[allow(dead_code)]
    pub const SELL_ENTRY: &str = "desktop-sell";
    pub const DEPARTMENT_FIELD: &str = "listing-department";
    pub const ITEM_NAME_FIELD: &str = "listing-item-name";
    pub const PUBLISH_BUTTON: &str = "publish-button";
    pub const BLOCKING_OVERLAY: &str = "blocking-overlay";
}

/// Action-side selectors for the sell flow, in the driver's selector syntax.
pub mod sel {
    pub const SELL_ENTRY: &str = r#"a[data-testid="desktop-sell"]"#;
    pub const DEPARTMENT_PICKER: &str = r#"role=textbox[name="Department / Category"]"#;
    pub const DESIGNER_INPUT: &str = r#"role=textbox[name="Search and add a Designer"]"#;
    pub const ITEM_NAME_INPUT: &str = r#"role=textbox[name="Item name"]"#;
    pub const SIZE_SELECT: &str = r#"select[name="size"]"#;
    pub const COLOR_PICKER: &str = r#"role=textbox[name="Select a Color"]"#;
    pub const CONDITION_SELECT: &str = r#"select[name="condition"]"#;
    pub const PRICE_INPUT: &str = r#"input[name="price"]"#;
    pub const FLOOR_PRICE_INPUT: &str = r#"input[name="floor_price"]"#;
    pub const ACCEPT_OFFERS_TOGGLE: &str = r#"input[name="accept_offers"]"#;
    pub const SMART_PRICING_TOGGLE: &str = r#"input[name="smart_pricing"]"#;
    pub const DESCRIPTION_INPUT: &str = r#"role=textbox[name="Add details about condition, fit, and shipping"]"#;
    pub const IMAGE_INPUT: &str = r#"input[type="file"]"#;
    pub const PUBLISH_BUTTON: &str = r#"button[data-testid="publish-button"]"#;

    pub fn menu_item(name: &str) -> String {
        format!(r#"role=menuitem[name="{name}"]"#)
    }
}

/// Where the session currently is, with the evidence that led to the call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageState {
    Homepage { url: String },
    LoginPopup { url: String, matched: Vec<String> },
    SellPage { url: String, matched: Vec<String> },
    ProfilePage { url: String },
    Unknown { url: String, text: String },
}

impl PageState {
    pub fn name(&self) -> &'static str {
        match self {
            PageState::Homepage { .. } => "homepage",
            PageState::LoginPopup { .. } => "login_popup",
            PageState::SellPage { .. } => "sell_page",
            PageState::ProfilePage { .. } => "profile_page",
            PageState::Unknown { .. } => "unknown",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps one snapshot to exactly one state. First matching rule wins:
/// login evidence, then the sell form, then profile, then the bare root.
pub fn classify(snapshot: &PageSnapshot) -> PageState {
    let url = snapshot.url.clone();

    let login_marks = matched_landmarks(
        snapshot,
        &[
            landmarks::LOGIN_MODAL,
            landmarks::EMAIL_INPUT,
            landmarks::PASSWORD_INPUT,
        ],
    );
    if !login_marks.is_empty() {
        return PageState::LoginPopup {
            url,
            matched: login_marks,
        };
    }

    if let Ok(parsed) = reqwest::Url::parse(&snapshot.url) {
        let segments: Vec<&str> = parsed
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        let form_marks = matched_landmarks(
            snapshot,
            &[landmarks::DEPARTMENT_FIELD, landmarks::ITEM_NAME_FIELD],
        );
        if segments
            .iter()
            .any(|segment| matches!(*segment, "sell" | "create"))
            && !form_marks.is_empty()
        {
            return PageState::SellPage {
                url,
                matched: form_marks,
            };
        }

        if segments
            .first()
            .is_some_and(|segment| matches!(*segment, "users" | "profile"))
        {
            return PageState::ProfilePage { url };
        }

        if segments.is_empty() {
            return PageState::Homepage { url };
        }
    }

    PageState::Unknown {
        url,
        text: excerpt(&snapshot.text),
    }
}

fn matched_landmarks(snapshot: &PageSnapshot, ids: &[&str]) -> Vec<String> {
    ids.iter()
        .copied()
        .filter(|&id| snapshot.has_landmark(id))
        .map(|id| id.to_string())
        .collect()
}

fn excerpt(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(url: &str, marks: &[&str]) -> PageSnapshot {
        PageSnapshot {
            url: url.to_string(),
            landmarks: marks.iter().map(|m| m.to_string()).collect(),
            text: "page text".into(),
        }
    }

    #[test]
    fn bare_root_is_homepage() {
        for url in ["https://www.grailed.com", "https://www.grailed.com/"] {
            let state = classify(&snapshot(url, &[landmarks::SELL_ENTRY]));
            assert!(matches!(state, PageState::Homepage { .. }), "{url}");
        }
    }

    #[test]
    fn sell_path_with_form_landmark_is_sell_page() {
        let state = classify(&snapshot(
            "https://www.grailed.com/sell/new",
            &[landmarks::DEPARTMENT_FIELD],
        ));
        match state {
            PageState::SellPage { matched, .. } => {
                assert_eq!(matched, vec![landmarks::DEPARTMENT_FIELD.to_string()]);
            }
            other => panic!("expected sell page, got {other}"),
        }
    }

    #[test]
    fn sell_path_without_form_landmark_is_unknown() {
        let state = classify(&snapshot("https://www.grailed.com/sell/new", &[]));
        assert!(matches!(state, PageState::Unknown { .. }));
    }

    #[test]
    fn login_evidence_wins_over_everything() {
        let state = classify(&snapshot(
            "https://www.grailed.com/sell/new",
            &[landmarks::DEPARTMENT_FIELD, landmarks::LOGIN_MODAL],
        ));
        assert!(matches!(state, PageState::LoginPopup { .. }));
    }

    #[test]
    fn profile_paths_classify_as_profile() {
        let state = classify(&snapshot("https://www.grailed.com/users/somebody", &[]));
        assert!(matches!(state, PageState::ProfilePage { .. }));
    }

    #[test]
    fn published_listing_page_is_unknown() {
        let state = classify(&snapshot("https://www.grailed.com/listings/1234-demo", &[]));
        assert!(matches!(state, PageState::Unknown { .. }));
    }

    #[test]
    fn garbage_input_is_total_and_deterministic() {
        let garbage = snapshot("not a url at all", &[]);
        let first = classify(&garbage);
        let second = classify(&garbage);
        assert!(matches!(first, PageState::Unknown { .. }));
        assert_eq!(first, second);
    }
}
