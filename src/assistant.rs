//! Generative-model collaborators: turning free text into task drafts and
//! summarizing a day's tasks.
//!
//! The planner only depends on the [`TaskParser`] and
//! [`ProductivityAnalyzer`] traits. [`GeminiClient`] implements both against
//! the Gemini `generateContent` REST endpoint; [`OfflineAssistant`] always
//! fails, which makes the planner fall back to its local defaults.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::config::AssistantConfig;
use crate::models::{ChartDatum, DailyAnalysis, Priority, Task, TaskDraft, duration_from_value};

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("No API key configured (set {env_var})")]
    MissingApiKey { env_var: String },
    #[error("Assistant is offline")]
    Offline,
    #[error("Request failed: {message}")]
    RequestFailed { message: String },
    #[error("Failed to parse assistant response: {message}")]
    ParseError { message: String },
}

/// Converts free text into zero or more task drafts
pub trait TaskParser {
    fn parse(&self, text: &str, today: &str) -> Result<Vec<TaskDraft>, AssistantError>;
}

/// Summarizes one day's tasks
pub trait ProductivityAnalyzer {
    fn analyze(&self, day: &str, tasks: &[Task]) -> Result<DailyAnalysis, AssistantError>;
}

/// Collaborator used when no model is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineAssistant;

impl TaskParser for OfflineAssistant {
    fn parse(&self, _text: &str, _today: &str) -> Result<Vec<TaskDraft>, AssistantError> {
        Err(AssistantError::Offline)
    }
}

impl ProductivityAnalyzer for OfflineAssistant {
    fn analyze(&self, _day: &str, _tasks: &[Task]) -> Result<DailyAnalysis, AssistantError> {
        Err(AssistantError::Offline)
    }
}

/// Client for the Gemini REST API
pub struct GeminiClient {
    config: AssistantConfig,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: AssistantConfig, api_key: String) -> Self {
        Self { config, api_key }
    }

    /// Build a client with the key read from the configured environment variable
    pub fn from_env(config: AssistantConfig) -> Result<Self, AssistantError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AssistantError::MissingApiKey {
                env_var: config.api_key_env.clone(),
            })?;
        Ok(Self::new(config, api_key))
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one prompt and return the model's text, asking for JSON output
    pub fn generate_json(&self, prompt: &str) -> Result<String, AssistantError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });
        let body_str = serde_json::to_string(&body).map_err(|e| AssistantError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        tracing::debug!(model = %self.config.model, "sending generateContent request");
        let resp = agent
            .post(&url)
            .query("key", &self.api_key)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e: ureq::Error| AssistantError::RequestFailed {
                message: e.to_string(),
            })?;

        let resp_str = resp.into_string().map_err(|e| AssistantError::ParseError {
            message: e.to_string(),
        })?;
        let json: Value = serde_json::from_str(&resp_str).map_err(|e| AssistantError::ParseError {
            message: e.to_string(),
        })?;

        response_text(&json)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl TaskParser for GeminiClient {
    fn parse(&self, text: &str, today: &str) -> Result<Vec<TaskDraft>, AssistantError> {
        let weekday = crate::utils::parse_date(today)
            .map(|d| d.format("%A").to_string())
            .unwrap_or_default();
        let prompt = format!(
            "Today is {today} ({weekday}).\n\
             Turn the user's note into a JSON array of tasks.\n\
             Each task is an object with: title (short), description, \
             date (YYYY-MM-DD), startTime (HH:mm, 24h, omit if none), \
             durationMinutes (integer), priority (LOW, MEDIUM or HIGH), \
             category (one word such as Work, Health, Learning, Personal, Errand).\n\
             Resolve relative days like \"tomorrow\" against today. \
             When the note names a range of days, emit one task per day. \
             Without a date, use today.\n\
             Note: {text:?}"
        );
        let output = self.generate_json(&prompt)?;
        parse_drafts(&output)
    }
}

impl ProductivityAnalyzer for GeminiClient {
    fn analyze(&self, day: &str, tasks: &[Task]) -> Result<DailyAnalysis, AssistantError> {
        let summary: Vec<Value> = tasks
            .iter()
            .map(|t| {
                serde_json::json!({
                    "title": t.title,
                    "category": t.category,
                    "status": t.status,
                    "duration": t.duration_minutes,
                    "priority": t.priority,
                })
            })
            .collect();
        let prompt = format!(
            "Analyze this daily task log and answer in {language}.\n\
             Tasks: {tasks}\n\
             Return a JSON object with: productivityScore (integer 0-100), \
             insights (3 short observations about habits), \
             suggestions (2 actionable suggestions for tomorrow), \
             moodEmoji (one emoji for the day), \
             chartData (array of {{name, value}} giving the category distribution).",
            language = self.config.analysis_language,
            tasks = Value::Array(summary),
        );
        let output = self.generate_json(&prompt)?;
        parse_analysis(&output, day)
    }
}

/// Extract the generated text from a `generateContent` response
fn response_text(json: &Value) -> Result<String, AssistantError> {
    json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AssistantError::ParseError {
            message: "missing candidates[0].content.parts[0].text".into(),
        })
}

/// Strip code fences and surrounding prose, keeping the outermost JSON value
fn json_payload(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return trimmed;
    }
    let start = trimmed.find(['[', '{']);
    let end = trimmed.rfind([']', '}']);
    match (start, end) {
        (Some(s), Some(e)) if e > s => &trimmed[s..=e],
        _ => trimmed,
    }
}

/// Read task drafts from model output. Accepts an array or a single object;
/// fields are read leniently and left empty when missing.
pub fn parse_drafts(output: &str) -> Result<Vec<TaskDraft>, AssistantError> {
    let parsed: Value = serde_json::from_str(json_payload(output)).map_err(|e| AssistantError::ParseError {
        message: format!("JSON parse error: {e}"),
    })?;

    let items = match parsed {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        other => {
            return Err(AssistantError::ParseError {
                message: format!("expected an array of tasks, got {other}"),
            })
        }
    };

    Ok(items.iter().map(draft_from_value).collect())
}

fn non_empty_str(value: &Value) -> Option<String> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn draft_from_value(val: &Value) -> TaskDraft {
    let duration = &val["durationMinutes"];
    TaskDraft {
        title: val["title"].as_str().unwrap_or("").to_string(),
        description: non_empty_str(&val["description"]),
        date: non_empty_str(&val["date"]),
        start_time: non_empty_str(&val["startTime"]),
        duration_minutes: (!duration.is_null()).then(|| duration_from_value(Some(duration))),
        priority: val["priority"].as_str().and_then(Priority::parse),
        category: non_empty_str(&val["category"]),
    }
}

/// Read a daily analysis from model output, pinned to `day`
pub fn parse_analysis(output: &str, day: &str) -> Result<DailyAnalysis, AssistantError> {
    let val: Value = serde_json::from_str(json_payload(output)).map_err(|e| AssistantError::ParseError {
        message: format!("JSON parse error: {e}"),
    })?;
    if !val.is_object() {
        return Err(AssistantError::ParseError {
            message: "expected an analysis object".into(),
        });
    }

    let score = val["productivityScore"]
        .as_f64()
        .ok_or_else(|| AssistantError::ParseError {
            message: "missing productivityScore".into(),
        })?
        .clamp(0.0, 100.0)
        .round() as u8;

    let strings = |key: &str| -> Vec<String> {
        val[key]
            .as_array()
            .map(|arr| arr.iter().filter_map(non_empty_str).collect())
            .unwrap_or_default()
    };

    let chart_data = val["chartData"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|item| {
                    let name = non_empty_str(&item["name"])?;
                    let value = item["value"].as_f64()?.round() as i64;
                    Some(ChartDatum { name, value })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(DailyAnalysis {
        date: day.to_string(),
        productivity_score: score,
        insights: strings("insights"),
        suggestions: strings("suggestions"),
        mood_emoji: val["moodEmoji"].as_str().unwrap_or("").trim().to_string(),
        chart_data,
    })
}
