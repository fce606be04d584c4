//! The browser session boundary.
//!
//! The core depends on a driven browser through exactly two operations:
//! observe the current page and perform one command. Implementations never
//! expose raw DOM; landmark identifiers are the whole abstraction.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One atomic instruction for the browser driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserCommand {
    Navigate { url: String },
    Click { selector: String },
    Fill { selector: String, text: String },
    Select { selector: String, value: String },
    Upload { selector: String, paths: Vec<String> },
    Wait { ms: u64 },
}

impl BrowserCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserCommand::Navigate { .. } => "navigate",
            BrowserCommand::Click { .. } => "click",
            BrowserCommand::Fill { .. } => "fill",
            BrowserCommand::Select { .. } => "select",
            BrowserCommand::Upload { .. } => "upload",
            BrowserCommand::Wait { .. } => "wait",
        }
    }
}

/// What the driver reports about the current page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub landmarks: Vec<String>,
    #[serde(default)]
    pub text: String,
}

impl PageSnapshot {
    pub fn has_landmark(&self, id: &str) -> bool {
        self.landmarks.iter().any(|landmark| landmark == id)
    }
}

#[derive(Debug, Error)]
pub enum BrowserError {
    /// The driver answered but refused or could not perform the command.
    #[error("{command} failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
    /// The driver connection itself is gone. Fatal for the rest of the run:
    /// no per-item recovery is meaningful without a session.
    #[error("browser session lost: {0}")]
    SessionLost(String),
}

impl BrowserError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, BrowserError::SessionLost(_))
    }
}

pub trait BrowserSession {
    async fn snapshot(&mut self) -> Result<PageSnapshot, BrowserError>;
    async fn act(&mut self, command: BrowserCommand) -> Result<(), BrowserError>;
}

/// Browser driver reached over a local Playwright bridge speaking JSON.
///
/// `GET {base}/snapshot` returns a [`PageSnapshot`]; `POST {base}/act`
/// takes a [`BrowserCommand`] and answers `{ok, error?}`.
pub struct PlaywrightRemote {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ActResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl PlaywrightRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: build_client(),
            base_url: base_url.into(),
        }
    }
}

impl BrowserSession for PlaywrightRemote {
    async fn snapshot(&mut self) -> Result<PageSnapshot, BrowserError> {
        let url = format!("{}/snapshot", self.base_url);
        let response = self.http.get(&url).send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(BrowserError::Command {
                command: "snapshot",
                message: format!("HTTP {}", response.status()),
            });
        }
        response
            .json::<PageSnapshot>()
            .await
            .map_err(|err| BrowserError::Command {
                command: "snapshot",
                message: err.to_string(),
            })
    }

    async fn act(&mut self, command: BrowserCommand) -> Result<(), BrowserError> {
        let name = command.name();
        let url = format!("{}/act", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&command)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(BrowserError::Command {
                command: name,
                message: format!("HTTP {}", response.status()),
            });
        }
        let ack: ActResponse = response.json().await.map_err(|err| BrowserError::Command {
            command: name,
            message: err.to_string(),
        })?;
        if ack.ok {
            Ok(())
        } else {
            Err(BrowserError::Command {
                command: name,
                message: ack.error.unwrap_or_else(|| "rejected".into()),
            })
        }
    }
}

/// A dead bridge connection means the session is gone; anything else is a
/// per-command problem.
fn transport_error(err: reqwest::Error) -> BrowserError {
    if err.is_connect() || err.is_timeout() {
        BrowserError::SessionLost(err.to_string())
    } else {
        BrowserError::Command {
            command: "transport",
            message: err.to_string(),
        }
    }
}

fn build_client() -> reqwest::Client {
    let timeout = std::env::var("LISTER_BRIDGE_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(30);
    let connect = std::env::var("LISTER_BRIDGE_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(5);
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .connect_timeout(Duration::from_secs(connect))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
