//! Terminal rendering of analysis reports.

use std::collections::BTreeMap;

use brainwave_core::{AnalysisReport, FeedbackItem, FeedbackKind, Severity};

/// Feedback items re-sorted for display: most urgent severity first,
/// pronunciation before grammar before general within a severity.
pub fn sorted_for_display(items: &[FeedbackItem]) -> Vec<&FeedbackItem> {
    let mut sorted: Vec<&FeedbackItem> = items.iter().collect();
    sorted.sort_by_key(|i| (i.severity.display_rank(), i.kind.display_rank()));
    sorted
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "ERROR",
        Severity::Warning => "WARN ",
        Severity::Info => "INFO ",
        Severity::Success => "OK   ",
    }
}

fn kind_label(kind: FeedbackKind) -> &'static str {
    match kind {
        FeedbackKind::Pronunciation => "pronunciation",
        FeedbackKind::Grammar => "grammar",
        FeedbackKind::General => "general",
    }
}

pub fn print_report(report: &AnalysisReport) {
    let d = &report.descriptors;
    println!("Clip: {:.1}s, {} pause(s)", d.duration, d.pauses);
    println!(
        "  volume {:.2}  clarity {:.2}  pace {:.2}  complexity {:.2}",
        d.volume, d.clarity, d.pace, d.complexity
    );
    println!();

    println!("Transcript:");
    println!("  {}", report.transcript);
    println!();

    println!("Feedback:");
    for item in sorted_for_display(&report.feedback) {
        let at = item
            .timestamp
            .map(|ms| format!(" (at {:.1}s)", ms as f32 / 1000.0))
            .unwrap_or_default();
        println!(
            "  [{}] {}: {}{at}",
            severity_tag(item.severity),
            kind_label(item.kind),
            item.message
        );
        println!("        {}", item.suggestion);
        if let Some(exercises) = &item.exercises {
            println!("        Try: {exercises}");
        }
    }
    println!();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in &report.feedback {
        *counts.entry(kind_label(item.kind)).or_default() += 1;
    }
    let summary: Vec<String> = counts.iter().map(|(k, n)| format!("{k}: {n}")).collect();
    println!("Summary — {}", summary.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: FeedbackKind, severity: Severity) -> FeedbackItem {
        FeedbackItem {
            id: "fb-x".into(),
            kind,
            severity,
            message: "m".into(),
            suggestion: "s".into(),
            exercises: None,
            timestamp: None,
        }
    }

    #[test]
    fn display_order_is_severity_then_kind() {
        let items = vec![
            item(FeedbackKind::General, Severity::Success),
            item(FeedbackKind::Grammar, Severity::Warning),
            item(FeedbackKind::Pronunciation, Severity::Warning),
            item(FeedbackKind::Pronunciation, Severity::Error),
        ];
        let sorted = sorted_for_display(&items);
        let order: Vec<(Severity, FeedbackKind)> =
            sorted.iter().map(|i| (i.severity, i.kind)).collect();
        assert_eq!(
            order,
            vec![
                (Severity::Error, FeedbackKind::Pronunciation),
                (Severity::Warning, FeedbackKind::Pronunciation),
                (Severity::Warning, FeedbackKind::Grammar),
                (Severity::Success, FeedbackKind::General),
            ]
        );
    }
}
