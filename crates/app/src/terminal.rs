//! Plain-text rendering of session state and parsing of typed intents.

use std::fmt::Write as _;

use quiz_core::time::format_clock;
use services::{EndReason, SessionReport, SessionSnapshot, SessionStats};

/// What the user asked for on one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Toggle an option, 0-based.
    Toggle(usize),
    Next,
    Pause,
    Stats,
    Finish,
    Restart,
    Quit,
}

/// Options are typed 1-based; anything unrecognised yields `None`.
#[must_use]
pub fn parse_intent(line: &str) -> Option<Intent> {
    let line = line.trim();
    if let Ok(n) = line.parse::<usize>() {
        return n.checked_sub(1).map(Intent::Toggle);
    }
    match line.to_ascii_lowercase().as_str() {
        "n" | "next" | "" => Some(Intent::Next),
        "p" | "pause" => Some(Intent::Pause),
        "s" | "stats" => Some(Intent::Stats),
        "f" | "finish" => Some(Intent::Finish),
        "r" | "restart" => Some(Intent::Restart),
        "q" | "quit" => Some(Intent::Quit),
        _ => None,
    }
}

#[must_use]
pub fn render_question(snapshot: &SessionSnapshot<'_>) -> String {
    let mut out = String::new();
    let Some(question) = snapshot.current_question else {
        return out;
    };

    let _ = write!(out, "\n[{}]", snapshot.position_label());
    if let Some(remaining) = snapshot.remaining_secs {
        let _ = write!(out, "  time left {}", format_clock(remaining));
    }
    if snapshot.paused {
        out.push_str("  (paused)");
    }
    let _ = writeln!(out, "\n{}", question.prompt());
    if question.is_multi_select() {
        let _ = writeln!(out, "(select {} options)", question.answer().len());
    }
    for (i, option) in question.options().iter().enumerate() {
        let mark = if snapshot.answers_for_current.contains(i) { "x" } else { " " };
        let _ = writeln!(out, "  [{mark}] {}. {option}", i + 1);
    }
    out
}

#[must_use]
pub fn render_stats(stats: &SessionStats) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "answered {}/{} ({:.1}%), accuracy {:.1}%",
        stats.answered,
        stats.total,
        stats.progress_percent(),
        stats.accuracy_percent()
    );
    let _ = writeln!(
        out,
        "projection {} / best case {} / needed to pass {} more (threshold {})",
        stats.linear_projection,
        stats.best_case_projection,
        stats.needed_to_pass,
        stats.pass_threshold
    );
    if !stats.can_still_pass() {
        out.push_str("passing is no longer possible\n");
    }
    out
}

#[must_use]
pub fn render_report(report: &SessionReport) -> String {
    let mut out = String::new();
    if report.end_reason == EndReason::TimeExpired {
        out.push_str("\nTime is up.\n");
    }
    let verdict = if report.passed { "PASSED" } else { "NOT PASSED" };
    let _ = writeln!(
        out,
        "\nScore {}/{}  {verdict}  (required {}/{} = {:.0}%)  time {}",
        report.final_score,
        report.total,
        report.pass_threshold,
        report.total,
        report.pass_fraction.percent(),
        report.elapsed_label()
    );
    if report.mistakes.is_empty() {
        return out;
    }
    let _ = writeln!(out, "\nMistakes ({}):", report.mistakes.len());
    for mistake in &report.mistakes {
        let selected = if mistake.selected.is_empty() {
            "(no answer)".to_owned()
        } else {
            mistake.selected.join(", ")
        };
        let _ = writeln!(out, "- ID {}: {}", mistake.question_id, mistake.prompt);
        let _ = writeln!(out, "    yours:   {selected}");
        let _ = writeln!(out, "    correct: {}", mistake.correct.join(", "));
    }
    out
}
