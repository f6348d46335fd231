// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Markdown rendering for alerts and verdict summaries.

use crate::alert::AlertPayload;
use crate::verdict::{Verdict, VerdictKind};
use std::fmt::{self, Write};

/// Render an alert as a pull request comment. Empty payloads render as an
/// empty string.
pub fn alert(payload: &AlertPayload) -> String {
    if payload.is_empty() {
        return String::new();
    }
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_alert(&mut output, payload);
    output
}

fn write_alert(output: &mut String, payload: &AlertPayload) -> fmt::Result {
    writeln!(output, "# :warning: **Performance Alert** :warning:")?;
    writeln!(output)?;
    writeln!(
        output,
        "Possible performance regression was detected for benchmark **'{}'**.",
        payload.tool
    )?;
    writeln!(
        output,
        "Results of commit {} are worse than the previous results by more than the threshold `{}`.",
        payload.commit.id, payload.threshold
    )?;
    writeln!(output)?;
    writeln!(output, "| Benchmark | Current | Previous | Ratio |")?;
    writeln!(output, "|-----------|---------|----------|-------|")?;

    for item in &payload.regressions {
        writeln!(
            output,
            "| `{}` | `{}` {} | `{}` {} | `{:.2}` |",
            item.name, item.current, item.unit, item.previous, item.unit, item.ratio
        )?;
    }

    writeln!(output)?;
    let commit = &payload.commit;
    match &commit.url {
        Some(url) => {
            writeln!(output, "Commit: [{}]({}) by {}", commit.message, url, commit.author)?
        }
        None => writeln!(output, "Commit: {} by {}", commit.message, commit.author)?,
    }
    Ok(())
}

/// Render every verdict of one ingestion as a summary table.
pub fn verdict_summary(tool: &str, verdicts: &[Verdict]) -> String {
    let mut output = String::new();
    let _ = write_verdict_summary(&mut output, tool, verdicts);
    output
}

fn write_verdict_summary(output: &mut String, tool: &str, verdicts: &[Verdict]) -> fmt::Result {
    writeln!(output, "# Benchmark Summary: {tool}")?;
    writeln!(output)?;
    writeln!(output, "| Benchmark | Current | Baseline | Ratio | Verdict |")?;
    writeln!(output, "|-----------|---------|----------|-------|---------|")?;

    for verdict in verdicts {
        let baseline = verdict
            .baseline
            .map(|b| format!("{} {}", b, verdict.unit))
            .unwrap_or_else(|| "-".to_string());
        let ratio = verdict
            .ratio
            .map(|r| format!("{r:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let marker = match verdict.kind {
            VerdictKind::Regression => " :warning:",
            VerdictKind::Improvement => " :rocket:",
            _ => "",
        };
        writeln!(
            output,
            "| `{}` | {} {} | {} | {} | {}{} |",
            verdict.name, verdict.observed, verdict.unit, baseline, ratio, verdict.kind, marker
        )?;
    }

    writeln!(output)?;
    writeln!(output, "---")?;
    writeln!(
        output,
        "Total benchmarks: {} ({} regressions, {} improvements)",
        verdicts.len(),
        verdicts.iter().filter(|v| v.kind == VerdictKind::Regression).count(),
        verdicts.iter().filter(|v| v.kind == VerdictKind::Improvement).count()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertCommit, AlertItem};
    use bench_history_core::Direction;

    fn payload(regressions: Vec<AlertItem>) -> AlertPayload {
        AlertPayload {
            tool: "pytest".to_string(),
            threshold: 0.1,
            commit: AlertCommit {
                id: "abc123".to_string(),
                message: "Rework merge".to_string(),
                author: "Dev".to_string(),
                url: Some("https://github.com/o/r/commit/abc123".to_string()),
            },
            regressions,
        }
    }

    #[test]
    fn test_empty_alert_renders_nothing() {
        assert_eq!(alert(&payload(vec![])), "");
    }

    #[test]
    fn test_alert_table_rows() {
        let text = alert(&payload(vec![AlertItem {
            name: "merge".to_string(),
            unit: "iter/sec".to_string(),
            previous: 10.0,
            current: 4.0,
            ratio: 0.4,
            previous_commit: None,
        }]));
        assert!(text.starts_with("# :warning: **Performance Alert** :warning:"));
        assert!(text.contains("| `merge` | `4` iter/sec | `10` iter/sec | `0.40` |"));
        assert!(text.contains("[Rework merge](https://github.com/o/r/commit/abc123)"));
    }

    #[test]
    fn test_verdict_summary_marks_regressions() {
        let verdicts = vec![
            Verdict {
                name: "merge".to_string(),
                unit: "iter/sec".to_string(),
                kind: VerdictKind::Regression,
                direction: Direction::HigherIsBetter,
                observed: 4.0,
                baseline: Some(10.0),
                ratio: Some(0.4),
                prior_samples: 1,
                baseline_commit: None,
            },
            Verdict {
                name: "parse".to_string(),
                unit: "ms".to_string(),
                kind: VerdictKind::InsufficientData,
                direction: Direction::LowerIsBetter,
                observed: 100.0,
                baseline: None,
                ratio: None,
                prior_samples: 0,
                baseline_commit: None,
            },
        ];
        let text = verdict_summary("pytest", &verdicts);
        assert!(
            text.contains("| `merge` | 4 iter/sec | 10 iter/sec | 0.40 | regression :warning: |")
        );
        assert!(text.contains("| `parse` | 100 ms | - | - | insufficient-data |"));
        assert!(text.contains("Total benchmarks: 2 (1 regressions, 0 improvements)"));
    }
}
