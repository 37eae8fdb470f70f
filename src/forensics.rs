//! Forensic reporter - external generative-text analysis
//!
//! Builds a fixed-structure SOC-analyst prompt for a malicious record and
//! asks the Gemini API for a short structured brief. The call is strictly
//! best-effort: any failure degrades to the fallback text and never
//! suppresses or invalidates the verdict that triggered it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::TelemetryRecord;

/// Returned whenever the external analysis cannot be produced.
pub const FALLBACK_REPORT: &str = "analysis unavailable";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MODEL_ID: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Client for the external forensic generator. Missing credential means the
/// reporter runs permanently degraded; detection is unaffected.
pub struct ForensicReporter {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl ForensicReporter {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; forensic analysis disabled");
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Produce the forensic brief for a malicious record.
    ///
    /// Never fails and is attempted at most once per event; the fallback
    /// text marks a degraded analysis.
    pub async fn explain(&self, record: &TelemetryRecord) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return FALLBACK_REPORT.to_string();
        };

        tracing::info!("consulting external analyst");

        match self.generate(api_key, &build_prompt(record)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!("forensic generator returned an empty brief");
                FALLBACK_REPORT.to_string()
            }
            Err(e) => {
                tracing::warn!("forensic analysis failed: {e}");
                FALLBACK_REPORT.to_string()
            }
        }
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, reqwest::Error> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, MODEL_ID
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateResponse = response.json().await?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }
}

/// Fixed-structure prompt. The formatting constraints keep the output
/// renderable as dashboard sub-blocks without conversational filler.
fn build_prompt(record: &TelemetryRecord) -> String {
    let telemetry = serde_json::to_string(record).unwrap_or_default();

    format!(
        "[SYSTEM ROLE: ELITE SOC ANALYST]\n\
         Analyze telemetry: {telemetry}.\n\
         \n\
         OUTPUT REQUIREMENTS:\n\
         - Start immediately with 🔍 ANALYSIS SUMMARY.\n\
         - Do NOT say \"Okay\", \"I will\", or \"Here is\".\n\
         - Use technical, cold, forensic language.\n\
         - Keep bullet points clean.\n\
         \n\
         STRUCTURE:\n\
         1. 🔍 ANALYSIS SUMMARY\n\
         2. 🚨 RISK LEVEL (1-10)\n\
         3. 🛡️ TECHNICAL REMEDIATION"
    )
}
