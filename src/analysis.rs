use std::fmt::Display;

use chrono::{DateTime, Local};

use crate::models::DailyAnalysis;
use crate::utils;

/// Longest list of insights or suggestions kept from the analyzer
pub const MAX_NOTES: usize = 5;

/// Holds at most one analysis, for the day it was computed for
#[derive(Debug, Clone, Default)]
pub struct AnalysisCache {
    current: Option<DailyAnalysis>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached analysis, whatever day it belongs to
    pub fn current(&self) -> Option<&DailyAnalysis> {
        self.current.as_ref()
    }

    /// The cached analysis if it was computed for `day`
    pub fn for_day(&self, day: &str) -> Option<&DailyAnalysis> {
        self.current.as_ref().filter(|a| a.date == day)
    }

    /// Drop the cached analysis. Called on every day change.
    pub fn discard(&mut self) {
        if let Some(old) = self.current.take() {
            tracing::debug!(date = %old.date, "discarding cached analysis");
        }
    }

    pub fn replace(&mut self, analysis: DailyAnalysis) -> &DailyAnalysis {
        self.current.insert(analysis)
    }

    /// Load a persisted analysis, keeping it only if it belongs to
    /// `selected_day`. Unreadable JSON counts as nothing stored.
    pub fn rehydrate(&mut self, stored: Option<&str>, selected_day: &str) -> bool {
        self.current = None;
        let Some(json) = stored else {
            return false;
        };
        let mut analysis: DailyAnalysis = match serde_json::from_str(json) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, "stored analysis is unreadable, ignoring it");
                return false;
            }
        };
        match analysis_day(&analysis.date) {
            Some(day) if day == selected_day => {
                analysis.date = day;
                self.current = Some(analysis);
                true
            }
            day => {
                tracing::debug!(stored_day = ?day, selected_day, "stored analysis is for another day");
                false
            }
        }
    }
}

/// Day key of an analysis `date` field. Older records hold a full timestamp,
/// which is reduced to its local calendar day.
pub fn analysis_day(date: &str) -> Option<String> {
    if utils::is_day_key(date) {
        return Some(date.to_string());
    }
    DateTime::parse_from_rfc3339(date)
        .ok()
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d").to_string())
}

/// Bring analyzer output into range and pin it to the day it was requested for
pub fn normalize(mut analysis: DailyAnalysis, day: &str) -> DailyAnalysis {
    analysis.date = day.to_string();
    analysis.productivity_score = analysis.productivity_score.min(100);
    analysis.insights.truncate(MAX_NOTES);
    analysis.suggestions.truncate(MAX_NOTES);
    if analysis.mood_emoji.trim().is_empty() {
        analysis.mood_emoji = NEUTRAL_MOOD.to_string();
    }
    analysis
}

pub const NEUTRAL_MOOD: &str = "😐";

/// The neutral analysis shown when the analyzer cannot be reached
pub fn fallback_analysis(day: &str) -> DailyAnalysis {
    DailyAnalysis {
        date: day.to_string(),
        productivity_score: 50,
        insights: vec!["Could not reach the assistant to analyze this day.".to_string()],
        suggestions: vec!["Check your network connection and API key, then try again.".to_string()],
        mood_emoji: NEUTRAL_MOOD.to_string(),
        chart_data: Vec::new(),
    }
}

/// Analyzer result or, on failure, the neutral fallback
pub fn resolve<E: Display>(result: Result<DailyAnalysis, E>, day: &str) -> (DailyAnalysis, bool) {
    match result {
        Ok(analysis) => (normalize(analysis, day), false),
        Err(e) => {
            tracing::warn!(error = %e, day, "productivity analysis failed, using neutral summary");
            (fallback_analysis(day), true)
        }
    }
}
