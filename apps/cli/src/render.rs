use std::fmt::Write;

use client_core::DiagnosticReport;
use shared::{
    domain::{HealthStatus, ModelState, ModelsStatus, Plant, Priority, Recommendation, DEFAULT_PRIORITY},
    protocol::ChatResponse,
};

fn priority_label(priority: &Priority) -> String {
    match priority.as_str().trim() {
        "" => DEFAULT_PRIORITY.to_ascii_uppercase(),
        label => label.to_ascii_uppercase(),
    }
}

fn write_recommendation(out: &mut String, rec: &Recommendation) {
    let _ = write!(out, "[{}] {}", priority_label(&rec.priority), rec.action);
    if let Some(timeframe) = rec.timeframe.as_deref().filter(|t| !t.is_empty()) {
        let _ = write!(out, " ({timeframe})");
    }
    out.push('\n');
    if !rec.details.is_empty() {
        let _ = writeln!(out, "      {}", rec.details);
    }
}

pub fn render_report(report: &DiagnosticReport<'_>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Health score: {}% ({})", report.score, report.tier);
    if report.inconsistent_disease_flag {
        out.push_str("Note: the service flagged disease but reported no detections.\n");
    }
    if !report.summary.is_empty() {
        let _ = writeln!(out, "Summary: {}", report.summary);
    }

    out.push_str("\nDetections:\n");
    if report.detections.is_empty() {
        out.push_str("  No disease symptoms detected.\n");
    }
    for detection in report.detections {
        let _ = writeln!(
            out,
            "  - {} ({}%)",
            detection.class_name,
            detection.confidence_percent()
        );
    }

    if let Some(top) = report.top_recommendation {
        out.push_str("\nTop action: ");
        write_recommendation(&mut out, top);
    }

    if !report.recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for (idx, rec) in report.recommendations.iter().enumerate() {
            let _ = write!(out, "  {}. ", idx + 1);
            write_recommendation(&mut out, rec);
        }
    }

    if let Some(narrative) = report.narrative {
        let _ = writeln!(out, "\nInsights:\n  {narrative}");
        if report.source_count > 0 {
            let _ = writeln!(out, "  ({} sources)", report.source_count);
        }
    }

    out
}

pub fn render_plants(plants: &[Plant]) -> String {
    if plants.is_empty() {
        return "No plants registered.\n".to_string();
    }
    let mut out = String::new();
    for plant in plants {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            plant.id,
            plant.name,
            plant.plant_type,
            plant.created_at.format("%Y-%m-%d")
        );
    }
    out
}

pub fn render_health(health: &HealthStatus) -> String {
    let mut out = String::new();
    let _ = write!(out, "status: {}", health.status);
    if !health.version.is_empty() {
        let _ = write!(out, " (version {})", health.version);
    }
    out.push('\n');
    for (name, state) in &health.services {
        let _ = writeln!(out, "  {name}: {state}");
    }
    out
}

pub fn render_chat_reply(reply: &ChatResponse) -> String {
    let mut out = format!("{}\n", reply.message.trim_end());
    if !reply.sources.is_empty() {
        let _ = writeln!(out, "  ({} sources)", reply.sources.len());
    }
    out
}

fn write_model_state(out: &mut String, name: &str, state: &ModelState) {
    let _ = write!(out, "{name}: {}", state.status);
    if let Some(err) = state.error() {
        let _ = write!(out, " ({err})");
    }
    out.push('\n');
}

pub fn render_models_status(status: &ModelsStatus) -> String {
    let mut out = String::new();
    write_model_state(&mut out, "vision", &status.yolo);
    write_model_state(&mut out, "language", &status.ollama);
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
