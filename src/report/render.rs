//! Report renderers

use super::{Report, ReportFormat, Summary};
use crate::infrastructure::output::{FAIL, PASS, WARN};
use crate::stack::{DeploymentStatus, DeploymentTestResult, ValidationResult};
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;

/// Renders the report in the given format
#[must_use]
pub fn render(report: &Report, format: ReportFormat) -> String {
    match format {
        ReportFormat::Console => console(report),
        ReportFormat::Markdown => markdown(report),
        ReportFormat::Json => json(report),
    }
}

fn validation_symbol(result: &ValidationResult) -> &'static str {
    match result.issue {
        None if result.passed => PASS,
        Some(issue) if issue.is_warning() => WARN,
        _ => FAIL,
    }
}

fn status_symbol(status: DeploymentStatus) -> &'static str {
    match status {
        DeploymentStatus::Success => PASS,
        DeploymentStatus::DeploymentFailed => FAIL,
        DeploymentStatus::PartialFailure | DeploymentStatus::CleanupFailed => WARN,
    }
}

fn validation_label(result: &ValidationResult) -> String {
    match result.issue {
        Some(issue) => format!("{issue} ({})", result.stage),
        None => format!("passed ({})", result.stage),
    }
}

fn seconds(result: &DeploymentTestResult) -> String {
    format!("{:.1}s", Duration::from_millis(result.duration_ms).as_secs_f64())
}

fn console(report: &Report) -> String {
    let mut out = String::new();

    if !report.validation_results.is_empty() {
        out.push_str("Validation\n");
        for result in &report.validation_results {
            let _ = writeln!(
                out,
                "{} {}: {}",
                validation_symbol(result),
                result.stack,
                validation_label(result)
            );
            for message in &result.messages {
                let _ = writeln!(out, "    {message}");
            }
        }
    }

    if !report.test_results.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Deployment\n");
        for result in &report.test_results {
            let _ = writeln!(
                out,
                "{} {}: {} ({}/{} services, {})",
                status_symbol(result.status),
                result.stack,
                result.status,
                result.services_up,
                result.services_expected,
                seconds(result)
            );
            for message in &result.messages {
                let _ = writeln!(out, "    {message}");
            }
        }
    }

    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "Summary: {}", report.summary());
    out
}

/// Escapes characters that would break a table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn markdown(report: &Report) -> String {
    let mut out = String::new();
    let summary = report.summary();

    out.push_str("# Stack Test Report\n\n");
    let _ = writeln!(
        out,
        "Generated: {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if let Some(versions) = &report.tool_versions {
        out.push_str("## System Information\n\n");
        let _ = writeln!(
            out,
            "- Container CLI: {}",
            versions.container_cli.as_deref().unwrap_or("Unknown")
        );
        let _ = writeln!(
            out,
            "- Compose: {}\n",
            versions.compose.as_deref().unwrap_or("Unknown")
        );
    }

    out.push_str("## Validation\n\n");
    if report.validation_results.is_empty() {
        out.push_str("No stacks validated.\n\n");
    } else {
        out.push_str("| Stack | Result | Stage | Messages |\n");
        out.push_str("|---|---|---|---|\n");
        for result in &report.validation_results {
            let outcome = result
                .issue
                .map_or_else(|| "passed".to_string(), |issue| issue.to_string());
            let _ = writeln!(
                out,
                "| {} | {} {} | {} | {} |",
                cell(&result.stack),
                validation_symbol(result),
                outcome,
                result.stage,
                cell(&result.messages.join("<br>"))
            );
        }
        out.push('\n');
    }

    out.push_str("## Deployment Testing\n\n");
    if report.test_results.is_empty() {
        out.push_str("No stacks deployed.\n\n");
    } else {
        out.push_str("| Stack | Status | Services | Duration | Teardown | Messages |\n");
        out.push_str("|---|---|---|---|---|---|\n");
        for result in &report.test_results {
            let _ = writeln!(
                out,
                "| {} | {} {} | {}/{} | {} | {} | {} |",
                cell(&result.stack),
                status_symbol(result.status),
                result.status,
                result.services_up,
                result.services_expected,
                seconds(result),
                if result.teardown_succeeded { "ok" } else { "failed" },
                cell(&result.messages.join("<br>"))
            );
        }
        out.push('\n');
    }

    out.push_str("## Summary\n\n");
    let _ = writeln!(out, "- Total: {}", summary.total);
    let _ = writeln!(out, "- Passed: {}", summary.passed);
    let _ = writeln!(out, "- Failed: {}", summary.failed);
    let _ = writeln!(
        out,
        "- Result: {}",
        if summary.failed == 0 { "PASSED" } else { "FAILED" }
    );
    out
}

#[derive(Serialize)]
struct JsonDocument<'r> {
    #[serde(flatten)]
    report: &'r Report,
    summary: Summary,
}

fn json(report: &Report) -> String {
    let document = JsonDocument {
        report,
        summary: report.summary(),
    };
    // Serializing plain data structs cannot fail
    serde_json::to_string_pretty(&document).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ToolVersions;
    use crate::report::aggregate_at;
    use crate::stack::{StackIssue, ValidationStage};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn sample() -> Report {
        let validations = vec![
            ValidationResult::pass("basic-stack", ValidationStage::ServiceConsistency, vec![]),
            ValidationResult::fail(
                "cluster-example",
                ValidationStage::SyntaxCheck,
                StackIssue::ComposeSyntaxInvalid,
                vec!["yaml: line 4: did not find expected key".to_string()],
            ),
            ValidationResult::fail(
                "mcp",
                ValidationStage::ServiceConsistency,
                StackIssue::ServiceConsistencyWarning,
                vec!["No services declared in config file".to_string()],
            ),
        ];
        let tests = vec![DeploymentTestResult {
            stack: "basic-stack".to_string(),
            services_expected: 3,
            services_up: 3,
            status: DeploymentStatus::Success,
            duration_ms: 15_340,
            teardown_succeeded: true,
            messages: vec![],
        }];
        aggregate_at(
            &validations,
            &tests,
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        )
    }

    #[test]
    fn test_console_symbols() {
        let text = render(&sample(), ReportFormat::Console);

        assert!(text.contains("✓ basic-stack: passed (service consistency)"));
        assert!(text.contains("✗ cluster-example: compose syntax invalid (syntax check)"));
        assert!(text.contains("⚠ mcp: service consistency warning (service consistency)"));
        assert!(text.contains("    yaml: line 4: did not find expected key"));
        assert!(text.contains("✓ basic-stack: SUCCESS (3/3 services, 15.3s)"));
        assert!(text.ends_with("Summary: 4 checks, 2 passed, 2 failed\n"));
    }

    #[test]
    fn test_markdown_sections() {
        let report = sample().with_tool_versions(ToolVersions {
            container_cli: Some("Docker version 27.3.1".to_string()),
            compose: None,
        });
        let text = render(&report, ReportFormat::Markdown);

        assert!(text.starts_with("# Stack Test Report\n\nGenerated: 2026-03-14 09:26:53 UTC\n"));
        assert!(text.contains("- Container CLI: Docker version 27.3.1"));
        assert!(text.contains("- Compose: Unknown"));
        assert!(text.contains("| basic-stack | ✓ SUCCESS | 3/3 | 15.3s | ok |  |"));
        assert!(text.contains("- Result: FAILED"));
    }

    #[test]
    fn test_duration_in_seconds() {
        let mut result = sample().test_results.remove(0);
        result.duration_ms = 0;
        assert_eq!(seconds(&result), "0.0s");
        result.duration_ms = 2_049;
        assert_eq!(seconds(&result), "2.0s");
        result.duration_ms = 90_000;
        assert_eq!(seconds(&result), "90.0s");
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        assert_eq!(cell("a|b\nc"), "a\\|b c");
    }

    #[test]
    fn test_json_includes_summary() {
        let text = render(&sample(), ReportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["summary"]["total"], 4);
        assert_eq!(value["summary"]["failed"], 2);
        assert_eq!(value["test_results"][0]["status"], "success");
        assert_eq!(value["validation_results"][1]["issue"], "compose_syntax_invalid");
        assert!(value.get("tool_versions").is_none());
    }
}
