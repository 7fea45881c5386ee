//! Request/response channel between a controller and one loaded page.
//!
//! Requests are JSON objects tagged by `action`; every request gets exactly
//! one JSON response, including unknown or malformed ones.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::form::{detect, extract, fill, FormPage};
use crate::settings::Settings;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    DetectFields,
    FillForm {
        #[serde(default, rename = "profileData")]
        profile_data: Value,
    },
    ExtractFormData,
    UpdateSettings {
        #[serde(default)]
        settings: Value,
    },
    GetSettings,
}

/// Work done over a session, for the usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub fields_detected: u64,
    pub forms_filled: u64,
    pub fields_filled: u64,
}

pub struct Session<'a, P: FormPage + ?Sized> {
    page: &'a mut P,
    settings: Settings,
    tally: Tally,
}

impl<'a, P: FormPage + ?Sized> Session<'a, P> {
    pub fn new(page: &'a mut P, settings: Settings) -> Self {
        Self {
            page,
            settings,
            tally: Tally::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub async fn handle(&mut self, message: &Value) -> Value {
        let request = match Request::deserialize(message) {
            Ok(r) => r,
            Err(e) => {
                debug!("Rejected message {}: {}", message, e);
                return json!({"error": "Unknown action"});
            }
        };

        match request {
            Request::DetectFields => {
                let fields = detect(&*self.page);
                self.tally.fields_detected += fields.len() as u64;
                json!({"fields": fields})
            }
            Request::FillForm { profile_data } => {
                let options = self.settings.fill_options();
                match fill(&mut *self.page, &profile_data, &options).await {
                    Ok(report) => {
                        self.tally.forms_filled += 1;
                        self.tally.fields_filled += report.filled_count as u64;
                        serde_json::to_value(report)
                            .unwrap_or_else(|e| json!({"success": false, "error": e.to_string()}))
                    }
                    Err(e) => {
                        warn!("Fill failed: {:#}", e);
                        json!({"success": false, "error": format!("{:#}", e)})
                    }
                }
            }
            Request::ExtractFormData => json!({"formData": extract(&*self.page)}),
            Request::UpdateSettings { settings } => match self.settings.merge(&settings) {
                Ok(merged) => {
                    self.settings = merged;
                    json!({"success": true})
                }
                Err(e) => json!({"success": false, "error": format!("{:#}", e)}),
            },
            Request::GetSettings => json!({"success": true, "settings": self.settings}),
        }
    }
}

/// Answer one request per input line until the input closes. Returns the
/// number of requests handled.
pub async fn serve<P, R, W>(session: &mut Session<'_, P>, input: R, mut output: W) -> Result<usize>
where
    P: FormPage + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Value>(line) {
            Ok(message) => session.handle(&message).await,
            Err(e) => json!({"error": format!("Invalid JSON: {}", e)}),
        };
        output.write_all(serde_json::to_string(&response)?.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
        handled += 1;
    }
    Ok(handled)
}

// ── Tests ──
