use crate::ledger::CallRecord;
use crate::scenario::{CellReport, ScenarioReport, ScenarioSummary, StepReport};
use crossterm::style::Stylize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Pretty printing utilities for scenario output
pub struct Formatter;

impl Formatter {
    /// Format one recorded call.
    pub fn format_call_record(record: &CallRecord) -> String {
        let served = match record.expectation {
            Some(handle) => format!("served by {}", handle),
            None => "unmatched".to_string(),
        };
        format!(
            "{}({} args) {}, {} effect(s){}",
            record.capability,
            record.arguments,
            served,
            record.effects,
            if record.returned { ", returned" } else { "" }
        )
    }

    pub fn format_step(step: &StepReport) -> String {
        let header = format!("[{:>3}] {}", step.step, step.capability);
        if step.passed {
            return Self::success(format!("{} ok", header));
        }
        let mut lines = vec![Self::error(format!("{} FAILED", header))];
        lines.extend(step.failures.iter().map(|f| format!("      {}", f)));
        lines.join("\n")
    }

    pub fn format_cell(cell: &CellReport) -> String {
        let line = format!("cell `{}`: expected {}, got {}", cell.cell, cell.expected, cell.actual);
        if cell.passed {
            Self::success(line)
        } else {
            Self::error(line)
        }
    }

    /// Format a full scenario report.
    pub fn format_report(report: &ScenarioReport) -> String {
        let mut lines = vec![Self::info(format!("Scenario: {}", report.name))];
        lines.extend(report.steps.iter().map(Self::format_step));
        lines.extend(report.cells.iter().map(Self::format_cell));
        lines.extend(report.unsatisfied.iter().map(|u| Self::warning(u)));

        if !report.calls.is_empty() {
            lines.push(String::new());
            lines.push("Call log".to_string());
            lines.extend(
                report
                    .calls
                    .iter()
                    .map(|c| format!("  {}", Self::format_call_record(c))),
            );
        }

        lines.push(String::new());
        if report.passed() {
            lines.push(Self::success(format!(
                "PASSED: {} call(s) checked",
                report.steps.len()
            )));
        } else {
            lines.push(Self::error(format!("FAILED: {} failure(s)", report.failures())));
        }
        lines.join("\n")
    }

    pub fn format_summary(name: &str, summary: &ScenarioSummary) -> String {
        format!(
            "{}: {} capabilities, {} expectations, {} calls",
            name, summary.capabilities, summary.expectations, summary.calls
        )
    }

    /// Format an informational message in blue.
    pub fn info(message: impl AsRef<str>) -> String {
        Self::apply_color(message.as_ref(), ColorKind::Info)
    }

    /// Format a success message in green.
    pub fn success(message: impl AsRef<str>) -> String {
        Self::apply_color(message.as_ref(), ColorKind::Success)
    }

    /// Format a warning message in yellow.
    pub fn warning(message: impl AsRef<str>) -> String {
        Self::apply_color(message.as_ref(), ColorKind::Warning)
    }

    /// Format an error message in red.
    pub fn error(message: impl AsRef<str>) -> String {
        Self::apply_color(message.as_ref(), ColorKind::Error)
    }

    /// Configure whether ANSI colors are enabled.
    pub fn configure_colors(enable: bool) {
        COLOR_ENABLED.store(enable, Ordering::Relaxed);
    }

    /// Auto-configure color output based on environment.
    pub fn configure_colors_from_env() {
        let no_color = std::env::var_os("NO_COLOR").is_some();
        Self::configure_colors(!no_color);
    }

    fn apply_color(message: &str, kind: ColorKind) -> String {
        if !COLOR_ENABLED.load(Ordering::Relaxed) {
            return message.to_string();
        }

        match kind {
            ColorKind::Info => format!("{}", message.blue()),
            ColorKind::Success => format!("{}", message.green()),
            ColorKind::Warning => format!("{}", message.yellow()),
            ColorKind::Error => format!("{}", message.red()),
        }
    }
}

#[derive(Copy, Clone)]
enum ColorKind {
    Info,
    Success,
    Warning,
    Error,
}

static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);
