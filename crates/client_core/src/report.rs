//! Display values derived from a held [`AnalysisResult`]. Pure; recomputed on
//! every render.

use std::fmt;

use serde::Serialize;
use shared::domain::{AnalysisResult, Detection, Recommendation};

pub const HEALTHY_SCORE: u32 = 98;
pub const SCORE_CEILING: u32 = 100;
pub const SCORE_FLOOR: u32 = 10;
pub const PENALTY_PER_DETECTION: u32 = 20;

/// Coarse severity proxy, not a calibrated probability.
///
/// A result flagged as diseased but carrying no detections scores 100; see
/// [`has_inconsistent_disease_flag`].
pub fn health_score(result: &AnalysisResult) -> u32 {
    let Some(vision) = result.vision.as_ref().filter(|vision| vision.has_disease) else {
        return HEALTHY_SCORE;
    };
    let count = u32::try_from(vision.detections.len()).unwrap_or(u32::MAX);
    SCORE_CEILING
        .saturating_sub(count.saturating_mul(PENALTY_PER_DETECTION))
        .max(SCORE_FLOOR)
}

/// `has_disease` set with an empty detection list.
pub fn has_inconsistent_disease_flag(result: &AnalysisResult) -> bool {
    result
        .vision
        .as_ref()
        .is_some_and(|vision| vision.has_disease && vision.detections.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Excellent,
    Good,
    Risk,
    Critical,
}

impl ScoreTier {
    /// Each threshold is the inclusive floor of its tier.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            ScoreTier::Excellent
        } else if score >= 70.0 {
            ScoreTier::Good
        } else if score >= 30.0 {
            ScoreTier::Risk
        } else {
            ScoreTier::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreTier::Excellent => "excellent",
            ScoreTier::Good => "good",
            ScoreTier::Risk => "risk",
            ScoreTier::Critical => "critical",
        }
    }
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First recommendation as received. Priorities are not re-sorted.
pub fn top_recommendation(result: &AnalysisResult) -> Option<&Recommendation> {
    result.recommendations.first()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport<'a> {
    pub id: &'a str,
    pub score: u32,
    pub tier: ScoreTier,
    pub inconsistent_disease_flag: bool,
    pub detections: &'a [Detection],
    pub recommendations: &'a [Recommendation],
    pub top_recommendation: Option<&'a Recommendation>,
    pub narrative: Option<&'a str>,
    pub source_count: usize,
    pub summary: &'a str,
}

impl<'a> DiagnosticReport<'a> {
    pub fn derive(result: &'a AnalysisResult) -> Self {
        let score = health_score(result);
        Self {
            id: &result.id,
            score,
            tier: ScoreTier::from_score(f64::from(score)),
            inconsistent_disease_flag: has_inconsistent_disease_flag(result),
            detections: result.detections(),
            recommendations: &result.recommendations,
            top_recommendation: top_recommendation(result),
            narrative: result.narrative(),
            source_count: result.rag.as_ref().map_or(0, |rag| rag.sources.len()),
            summary: &result.summary,
        }
    }
}

#[cfg(test)]
#[path = "tests/report_tests.rs"]
mod tests;
