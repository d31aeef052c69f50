//! Outreach message engine. Builds a personalised prompt from a profile,
//! asks the LLM for a message and falls back to a fixed template when the
//! LLM is unconfigured, failing or silent. Generation itself never fails.
//!
//! `AppState` holds an `Arc<dyn MessageGenerator>`.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::llm_client::LlmClient;
use crate::messages::prompts::{FALLBACK_TEMPLATES, MESSAGE_PROMPT_TEMPLATE, MESSAGE_SYSTEM};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_JOB_TITLE_LEN: usize = 200;
pub const MAX_COMPANY_LEN: usize = 200;
pub const MAX_LOCATION_LEN: usize = 100;
pub const MAX_SUMMARY_LEN: usize = 1000;

pub const DEFAULT_VARIATIONS: usize = 3;
pub const MAX_VARIATIONS: usize = 5;

/// Raw request body. Every field is optional here so that missing fields
/// produce our own validation message rather than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageRequest {
    pub name: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
}

/// A validated profile to write a message for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileInput {
    pub name: String,
    pub job_title: String,
    pub company: String,
    pub location: Option<String>,
    pub summary: Option<String>,
}

impl MessageRequest {
    pub fn validate(self) -> Result<ProfileInput, String> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let (Some(name), Some(job_title), Some(company)) = (
            present(self.name),
            present(self.job_title),
            present(self.company),
        ) else {
            return Err("Name, job title, and company are required".to_string());
        };

        if too_long(&name, MAX_NAME_LEN)
            || too_long(&job_title, MAX_JOB_TITLE_LEN)
            || too_long(&company, MAX_COMPANY_LEN)
        {
            return Err("Input fields exceed maximum length".to_string());
        }

        let location = present(self.location);
        if location.as_deref().is_some_and(|l| too_long(l, MAX_LOCATION_LEN)) {
            return Err("Location exceeds maximum length".to_string());
        }

        let summary = present(self.summary);
        if summary.as_deref().is_some_and(|s| too_long(s, MAX_SUMMARY_LEN)) {
            return Err("Summary exceeds maximum length".to_string());
        }

        Ok(ProfileInput {
            name,
            job_title,
            company,
            location,
            summary,
        })
    }
}

fn too_long(value: &str, max: usize) -> bool {
    value.chars().count() > max
}

/// The message generator trait. Implementations must always return a usable message.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn generate(&self, profile: &ProfileInput) -> String;
}

/// LLM-first generator with template fallback.
pub struct LlmMessageGenerator {
    llm: Option<LlmClient>,
}

impl LlmMessageGenerator {
    /// `None` means no credential is configured; every call uses a fallback template.
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl MessageGenerator for LlmMessageGenerator {
    async fn generate(&self, profile: &ProfileInput) -> String {
        let Some(llm) = &self.llm else {
            warn!("LLM API key not configured, using fallback message generation");
            return fallback_message(profile);
        };

        match llm.complete(MESSAGE_SYSTEM, &build_prompt(profile)).await {
            Ok(message) => message,
            Err(e) => {
                warn!("LLM message generation failed, using fallback: {e}");
                fallback_message(profile)
            }
        }
    }
}

/// Fills the message prompt template for `profile`.
pub fn build_prompt(profile: &ProfileInput) -> String {
    let location_line = profile
        .location
        .as_deref()
        .map(|l| format!("Location: {l}"))
        .unwrap_or_default();
    let summary_line = profile
        .summary
        .as_deref()
        .map(|s| format!("Professional Summary: {s}"))
        .unwrap_or_default();

    MESSAGE_PROMPT_TEMPLATE
        .replace("{name}", &profile.name)
        .replace("{job_title}", &profile.job_title)
        .replace("{company}", &profile.company)
        .replace("{location_line}", &location_line)
        .replace("{summary_line}", &summary_line)
}

/// Renders one of the fixed fallback templates, picked uniformly at random.
pub fn fallback_message(profile: &ProfileInput) -> String {
    let index = rand::rng().random_range(0..FALLBACK_TEMPLATES.len());
    render_template(FALLBACK_TEMPLATES[index], profile)
}

pub fn render_template(template: &str, profile: &ProfileInput) -> String {
    template
        .replace("{name}", &profile.name)
        .replace("{job_title}", &profile.job_title)
        .replace("{company}", &profile.company)
}

/// Interprets the `count` query parameter: missing, unparseable or zero → 3,
/// otherwise clamped to `1..=5`.
pub fn variation_count(raw: Option<&str>) -> usize {
    match raw.and_then(|r| r.trim().parse::<i64>().ok()) {
        None | Some(0) => DEFAULT_VARIATIONS,
        Some(n) => n.clamp(1, MAX_VARIATIONS as i64) as usize,
    }
}

/// Generates `count` messages sequentially. No deduplication.
pub async fn generate_variations(
    generator: &dyn MessageGenerator,
    profile: &ProfileInput,
    count: usize,
) -> Vec<String> {
    let mut messages = Vec::with_capacity(count);
    for _ in 0..count.min(MAX_VARIATIONS) {
        messages.push(generator.generate(profile).await);
    }
    messages
}
