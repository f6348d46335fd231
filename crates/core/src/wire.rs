// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! On-disk representation of a [`History`].
//!
//! Dashboards load the history either as plain JSON or as a script that
//! assigns it to a global:
//!
//! ```text
//! window.BENCHMARK_DATA = {
//!   "lastUpdate": 1700000000000,
//!   "repoUrl": "https://github.com/owner/repo",
//!   "entries": { "<tool>": [ { "commit": {..}, "date": .., "tool": .., "benches": [..] } ] }
//! }
//! ```
//!
//! Both forms use two-space indentation. Integral numbers are written
//! without a fractional part, matching what the dashboards emit.

use crate::history::History;
use serde::Serializer;

/// Prefix of the script form.
pub const SCRIPT_PREFIX: &str = "window.BENCHMARK_DATA = ";

/// Global assigned by the script form.
const SCRIPT_GLOBAL: &str = "window.BENCHMARK_DATA";

/// Textual form of a persisted history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireForm {
    /// Bare JSON document.
    #[default]
    Json,
    /// `window.BENCHMARK_DATA = {...}` script.
    Script,
}

impl WireForm {
    /// Form implied by a file name: `.js` files use the script form.
    pub fn for_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("js") => Self::Script,
            _ => Self::Json,
        }
    }
}

/// Parse a persisted history, detecting its form.
pub fn decode(text: &str) -> Result<(History, WireForm), serde_json::Error> {
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    match trimmed.strip_prefix(SCRIPT_GLOBAL) {
        Some(rest) => {
            let body = rest.trim_start();
            let body = body.strip_prefix('=').unwrap_or(body);
            let body = body.trim().trim_end_matches(';');
            Ok((serde_json::from_str(body)?, WireForm::Script))
        }
        None => Ok((serde_json::from_str(trimmed)?, WireForm::Json)),
    }
}

/// Render a history in the requested form.
pub fn encode(history: &History, form: WireForm) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string_pretty(history)?;
    Ok(match form {
        WireForm::Json => json,
        WireForm::Script => format!("{SCRIPT_PREFIX}{json}"),
    })
}

/// Largest integer an f64 represents exactly.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Serialise a float without a trailing `.0` when it is integral.
pub fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let negative_zero = *value == 0.0 && value.is_sign_negative();
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INT && !negative_zero {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// [`serialize_number`] for optional fields.
pub fn serialize_opt_number<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serialize_number(v, serializer),
        None => serializer.serialize_none(),
    }
}
