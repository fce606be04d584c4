//! Navigation state machine.
//!
//! Drives one browser session from wherever it is to a verified-ready sell
//! form. Every action follows the same discipline: act, settle, re-observe.
//! The browser is never trusted to have applied an action — the only source
//! of truth is a fresh classification of a fresh snapshot.

use crate::browser::{BrowserCommand, BrowserError, BrowserSession, PageSnapshot};
use crate::classifier::{self, PageState, classify, landmarks};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Start,
    Homepage,
    LoginPopup,
    SellPage,
    ProfilePage,
    Unknown,
    /// Sell form verified: required landmarks present, no blocking overlay.
    Ready,
    /// Retry budget exhausted for the current navigation attempt.
    Failed,
}

impl NavState {
    fn from_page(page: &PageState) -> Self {
        match page {
            PageState::Homepage { .. } => NavState::Homepage,
            PageState::LoginPopup { .. } => NavState::LoginPopup,
            PageState::SellPage { .. } => NavState::SellPage,
            PageState::ProfilePage { .. } => NavState::ProfilePage,
            PageState::Unknown { .. } => NavState::Unknown,
        }
    }
}

/// Bounded-attempt policy for flaky steps.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub settle_ms: u64,
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            settle_ms: 750,
            exponential: true,
        }
    }
}

impl RetryPolicy {
    #[allow(dead_code)]
    pub fn fixed(max_attempts: u32, settle_ms: u64) -> Self {
        Self {
            max_attempts,
            settle_ms,
            exponential: false,
        }
    }

    /// Settle delay before re-observing, after 1-based attempt `attempt`.
    /// Exponential doubling capped at 15s, ±25% jitter.
    fn settle_delay(&self, attempt: u32) -> Duration {
        const MAX_DELAY_MS: u64 = 15_000;
        let base = if self.exponential {
            self.settle_ms
                .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(6))
        } else {
            self.settle_ms
        };
        let capped = base.min(MAX_DELAY_MS);
        let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
        Duration::from_millis(jittered)
    }
}

/// Process-local session state, owned exclusively by the [`Navigator`] and
/// destroyed with it.
#[derive(Debug, Clone)]
pub struct NavigationSession {
    pub state: NavState,
    pub last_page: Option<PageState>,
    pub retry_count: u32,
    pub login_handled_at: Option<DateTime<Utc>>,
}

impl NavigationSession {
    fn new() -> Self {
        Self {
            state: NavState::Start,
            last_page: None,
            retry_count: 0,
            login_handled_at: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("retry budget exhausted while {action} (last observed page: {last})")]
    RetriesExhausted { action: &'static str, last: String },
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("run cancelled")]
    Cancelled,
}

impl NavigationError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, NavigationError::Browser(err) if err.is_fatal())
    }
}

/// Human-operator callbacks — the only suspension points that depend on a
/// person rather than a timeout.
pub trait OperatorGate {
    async fn wait_for_login(&mut self);
    async fn confirm_publish(&mut self, index: usize, label: &str) -> bool;
}

/// Console gate used by the CLI.
pub struct ConsoleGate;

impl OperatorGate for ConsoleGate {
    async fn wait_for_login(&mut self) {
        println!("A Grailed login prompt is blocking the session.");
        println!("Log in manually in the browser window, then press Enter here to continue.");
        read_console_line().await;
    }

    async fn confirm_publish(&mut self, index: usize, label: &str) -> bool {
        println!("Publish item #{index} ({label})? [Y/n]");
        let answer = read_console_line().await;
        !answer.trim().eq_ignore_ascii_case("n")
    }
}

async fn read_console_line() -> String {
    use tokio::io::{AsyncBufReadExt, BufReader};
    let mut line = String::new();
    let mut reader = BufReader::new(tokio::io::stdin());
    let _ = reader.read_line(&mut line).await;
    line
}

pub struct Navigator<B> {
    browser: B,
    root: String,
    policy: RetryPolicy,
    session: NavigationSession,
    cancel: Arc<AtomicBool>,
}

impl<B: BrowserSession> Navigator<B> {
    pub fn new(browser: B, root: String, policy: RetryPolicy, cancel: Arc<AtomicBool>) -> Self {
        Self {
            browser,
            root,
            policy,
            session: NavigationSession::new(),
            cancel,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> NavState {
        self.session.state
    }

    #[allow(dead_code)]
    pub fn session(&self) -> &NavigationSession {
        &self.session
    }

    /// The pipeline issues its form-fill commands through the same session
    /// the state machine observes.
    pub fn browser_mut(&mut self) -> &mut B {
        &mut self.browser
    }

    /// Called after an action known to leave the form (publish): the next
    /// item must re-verify readiness from scratch.
    pub fn invalidate(&mut self) {
        if self.session.state == NavState::Ready {
            self.session.state = NavState::Unknown;
        }
    }

    fn check_cancelled(&self) -> Result<(), NavigationError> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(NavigationError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn observe(&mut self) -> Result<(PageSnapshot, PageState), NavigationError> {
        let snapshot = self.browser.snapshot().await?;
        let page = classify(&snapshot);
        self.session.state = NavState::from_page(&page);
        self.session.last_page = Some(page.clone());
        Ok((snapshot, page))
    }

    /// Drives the session until the sell form is verified ready: required
    /// form landmarks present and no blocking overlay. Suspends on the
    /// operator gate when a login prompt appears.
    pub async fn ensure_ready(&mut self, gate: &mut impl OperatorGate) -> Result<(), NavigationError> {
        // Each round performs at most one action or one login hand-off, so
        // a site bouncing between states cannot trap us forever.
        let max_rounds = self.policy.max_attempts.saturating_mul(4).max(8);
        for _ in 0..max_rounds {
            self.check_cancelled()?;
            let (snapshot, page) = self.observe().await?;
            match page {
                PageState::SellPage { .. } => {
                    if form_actionable(&snapshot) {
                        self.session.state = NavState::Ready;
                        debug!(target: "lister.nav", "sell form verified ready");
                        return Ok(());
                    }
                    let settle = self.policy.settle_ms;
                    self.step(
                        "waiting for the sell form to become actionable",
                        BrowserCommand::Wait { ms: settle },
                        |snapshot, _| form_actionable(snapshot),
                    )
                    .await?;
                }
                PageState::LoginPopup { .. } => {
                    info!(target: "lister.nav", "login required; handing control to the operator");
                    gate.wait_for_login().await;
                    self.session.login_handled_at = Some(Utc::now());
                }
                PageState::Homepage { .. } => {
                    // both outcomes are legitimate: the site may demand
                    // authentication before showing the sell form
                    self.step(
                        "opening the sell page",
                        BrowserCommand::Click {
                            selector: classifier::sel::SELL_ENTRY.to_string(),
                        },
                        |_, page| {
                            matches!(
                                page,
                                PageState::SellPage { .. } | PageState::LoginPopup { .. }
                            )
                        },
                    )
                    .await?;
                }
                PageState::ProfilePage { .. } | PageState::Unknown { .. } => {
                    self.step(
                        "navigating to the site root",
                        BrowserCommand::Navigate {
                            url: self.root.clone(),
                        },
                        |_, page| matches!(page, PageState::Homepage { .. }),
                    )
                    .await?;
                }
            }
        }
        self.session.state = NavState::Failed;
        Err(NavigationError::RetriesExhausted {
            action: "reaching a ready sell form",
            last: self.last_page_name(),
        })
    }

    /// One state-machine action, attempted up to the retry budget.
    async fn step(
        &mut self,
        action: &'static str,
        command: BrowserCommand,
        expect: impl Fn(&PageSnapshot, &PageState) -> bool,
    ) -> Result<(), NavigationError> {
        for attempt in 1..=self.policy.max_attempts {
            self.check_cancelled()?;
            self.session.retry_count = attempt;
            match self.browser.act(command.clone()).await {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    warn!(target: "lister.nav", attempt, error = %err, "browser rejected action while {action}");
                    tokio::time::sleep(self.policy.settle_delay(attempt)).await;
                    continue;
                }
            }
            tokio::time::sleep(self.policy.settle_delay(attempt)).await;
            let (snapshot, page) = self.observe().await?;
            if expect(&snapshot, &page) {
                self.session.retry_count = 0;
                return Ok(());
            }
            debug!(target: "lister.nav", attempt, page = %page, "unexpected page while {action}");
        }
        self.session.state = NavState::Failed;
        Err(NavigationError::RetriesExhausted {
            action,
            last: self.last_page_name(),
        })
    }

    fn last_page_name(&self) -> String {
        self.session
            .last_page
            .as_ref()
            .map(|page| page.to_string())
            .unwrap_or_else(|| "never observed".into())
    }
}

/// Ready means the publish control is reachable and nothing modal sits on
/// top of the form.
fn form_actionable(snapshot: &PageSnapshot) -> bool {
    snapshot.has_landmark(landmarks::PUBLISH_BUTTON)
        && !snapshot.has_landmark(landmarks::BLOCKING_OVERLAY)
}
