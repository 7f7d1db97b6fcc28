//! Structured logging utilities for stubledger.
//!
//! This module provides helper functions for consistent, structured logging
//! across the ledger and the scenario runner using the `tracing` crate.

use crate::ledger::expectation::Times;
use crate::LedgerError;
use std::fmt;

/// Helper function to format and log multi-line output without structured fields.
/// Used for formatted displays like reports and summaries.
pub fn log_display<D: fmt::Display>(message: D, level: LogLevel) {
    let msg = message.to_string();
    match level {
        LogLevel::Info => tracing::info!("{}", msg),
        LogLevel::Warn => tracing::warn!("{}", msg),
        LogLevel::Error => tracing::error!("{}", msg),
        LogLevel::Debug => tracing::debug!("{}", msg),
    }
}

/// Log levels matching tracing crate levels.
#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

pub fn log_capability_declared(substitute: &str, capability: &str, arity: usize) {
    tracing::trace!(substitute, capability, arity, "Capability declared");
}

/// Log a new expectation.
pub fn log_expectation_registered(substitute: &str, capability: &str, expectation: usize, times: &Times) {
    tracing::debug!(
        substitute,
        capability,
        expectation,
        times = %times,
        "Expectation registered"
    );
}

pub fn log_actions_attached(substitute: &str, expectation: usize, actions: usize) {
    tracing::trace!(substitute, expectation, actions, "Actions attached");
}

/// Log a call served by an expectation.
pub fn log_dispatch(substitute: &str, capability: &str, expectation: usize, effects: usize) {
    tracing::debug!(substitute, capability, expectation, effects, "Call dispatched");
}

/// Log a call no expectation accepted.
pub fn log_unexpected_call(substitute: &str, capability: &str, arguments: usize) {
    tracing::warn!(substitute, capability, arguments, "Unexpected call");
}

pub fn log_call_count_exceeded(substitute: &str, capability: &str, expectation: usize) {
    tracing::warn!(substitute, capability, expectation, "Call budget exhausted");
}

/// Log an action that could not be applied.
pub fn log_action_failed(substitute: &str, capability: &str, error: &LedgerError) {
    tracing::warn!(substitute, capability, kind = error.kind(), "Action failed: {}", error);
}

/// Log verification of call counts.
pub fn log_verification(substitute: &str, expectations: usize, unsatisfied: usize) {
    if unsatisfied == 0 {
        tracing::debug!(substitute, expectations, "Expectations verified");
    } else {
        tracing::warn!(substitute, expectations, unsatisfied, "Unsatisfied expectations");
    }
}

/// Log scenario file loading.
pub fn log_loading_scenario(path: &str) {
    tracing::info!(scenario = path, "Loading scenario");
}

pub fn log_scenario_loaded(name: &str, expectations: usize, calls: usize) {
    tracing::info!(name, expectations, calls, "Scenario loaded");
}

/// Log one scripted call.
pub fn log_scenario_step(step: usize, capability: &str, passed: bool) {
    tracing::debug!(step, capability, passed, "Scenario step");
}

/// Log scenario completion.
pub fn log_scenario_complete(name: &str, passed: bool, failures: usize) {
    tracing::info!(name, passed, failures, "Scenario completed");
}
