use std::fmt::Write;

use comfy_table::Cell;

use crate::render::{format_duration, format_seconds, format_timestamp};
use crate::splice::SpliceAction;
use crate::sync::SyncReport;

use super::styling::{heading, paint, Tone};
use super::tables::{create_table, cyan_header, problem_count_cell, status_cell};

/// Prints a human-readable summary of a sync run to stdout.
///
/// Shows the published pipeline, its test results and what happened to the
/// Confluence page, followed by hints for the two fallback paths (missing
/// test report, appended section).
pub fn print_summary(report: &SyncReport) {
    println!("{}", render_summary(report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{}", heading(emoji, title));
}

#[allow(clippy::format_push_string)]
fn render_summary(report: &SyncReport) -> String {
    let mut output = String::new();

    // Pipeline section
    add_section_header(&mut output, "📦", "Pipeline");

    let application = report.application.as_ref().map_or_else(
        || paint(Tone::Label, "not grouped").to_string(),
        |app| {
            format!(
                "{} {}",
                paint(Tone::Value, &app.name),
                paint(Tone::Label, &app.version)
            )
        },
    );

    output.push_str(&format!(
        "  {} {}\n  {} {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        paint(Tone::Label, "Project:"),
        paint(Tone::Value, &report.project_id),
        paint(Tone::Label, "Pipeline:"),
        paint(Tone::Pending, format!("#{}", report.pipeline_id)),
        paint(Tone::Value, &report.pipeline_name),
        paint(Tone::Label, "Ref:"),
        report.ref_,
        paint(Tone::Label, "Application:"),
        application,
        paint(Tone::Label, "Started:"),
        format_timestamp(report.created_at.as_deref()),
        paint(Tone::Label, "Updated:"),
        format_timestamp(report.updated_at.as_deref()),
        paint(Tone::Label, "Duration:"),
        format_duration(report.duration.as_ref()),
        paint(Tone::Label, "History runs:"),
        paint(Tone::Pending, report.history_runs),
    ));

    let mut status_table = create_table();
    status_table.set_header(cyan_header(&["Status", "Link"]));
    status_table.add_row(vec![
        status_cell(report.status),
        Cell::new(if report.web_url.is_empty() {
            "N/A"
        } else {
            report.web_url.as_str()
        }),
    ]);
    output.push_str(&format!("{status_table}\n\n"));

    // Tests section
    add_section_header(&mut output, "🧪", "Test Results");

    let tests = &report.tests;
    #[allow(clippy::cast_possible_truncation)]
    let time = format_seconds(tests.total_time as i64);

    let mut tests_table = create_table();
    tests_table.set_header(cyan_header(&[
        "Total", "Passed", "Failed", "Skipped", "Errors", "Time",
    ]));
    tests_table.add_row(vec![
        Cell::new(tests.total),
        Cell::new(tests.success),
        problem_count_cell(tests.failed),
        Cell::new(tests.skipped),
        problem_count_cell(tests.error),
        Cell::new(time),
    ]);
    output.push_str(&format!("{tests_table}\n\n"));

    // Page section
    add_section_header(&mut output, "📄", "Confluence Page");

    let new_version = report
        .new_version
        .map_or_else(|| "-".to_string(), |version| version.to_string());

    let mut page_table = create_table();
    page_table.set_header(cyan_header(&[
        "Page",
        "Title",
        "Section",
        "Version Read",
        "New Version",
    ]));
    page_table.add_row(vec![
        Cell::new(&report.page_id),
        Cell::new(&report.page_title),
        Cell::new(match report.action {
            SpliceAction::Replaced => "replaced",
            SpliceAction::Appended => "appended",
        }),
        Cell::new(report.version_read),
        Cell::new(new_version),
    ]);
    output.push_str(&format!("{page_table}\n\n"));

    // Notes
    let mut notes = Vec::new();
    if !report.tests_available {
        notes.push("Test report unavailable, published zero counts".to_string());
    }
    if report.action == SpliceAction::Appended {
        notes.push(format!(
            "No section named '{}' was found, a new one was appended",
            report.pipeline_name
        ));
    }

    if report.written {
        output.push_str(&format!(
            "{}\n",
            paint(Tone::Done, format!("Page '{}' updated", report.page_title))
        ));
    } else {
        output.push_str(&format!(
            "{} Run without {} to publish\n",
            paint(Tone::Failure, "Dry run, page not written."),
            paint(Tone::Pending, "--dry-run")
        ));
    }

    for note in notes {
        output.push_str(&format!(
            "  {} {}\n",
            paint(Tone::Value, "•"),
            paint(Tone::Pending, note)
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Elapsed, PipelineStatus, TestSummary};
    use crate::sync::Application;
    use chrono::NaiveDate;

    fn report() -> SyncReport {
        SyncReport {
            project_id: "group/project".to_string(),
            pipeline_id: 287,
            pipeline_name: "Build pipeline".to_string(),
            status: PipelineStatus::Success,
            ref_: "my-app - v1.2.3".to_string(),
            web_url: "https://gitlab.example.com/group/project/-/pipelines/287".to_string(),
            created_at: Some("2024-01-15T10:00:00Z".to_string()),
            updated_at: None,
            duration: Some(Elapsed::from(300)),
            application: Some(Application {
                name: "my-app".to_string(),
                version: "v1.2.3".to_string(),
            }),
            tests: TestSummary {
                total: 150,
                success: 148,
                failed: 2,
                skipped: 0,
                error: 0,
                total_time: 95.4,
            },
            tests_available: true,
            history_runs: 10,
            page_id: "123456".to_string(),
            page_title: "Pipeline Results".to_string(),
            version_read: 5,
            action: SpliceAction::Replaced,
            written: true,
            new_version: Some(6),
            generated_at: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_render_summary() {
        let output = render_summary(&report());

        assert!(output.contains("group/project"));
        assert!(output.contains("#287"));
        assert!(output.contains("Build pipeline"));
        assert!(output.contains("my-app"));
        assert!(output.contains("5m 0s"));
        assert!(output.contains("2024-01-15 10:00"));
        assert!(output.contains("150"));
        assert!(output.contains("148"));
        assert!(output.contains("1m 35s"));
        assert!(output.contains("Pipeline Results"));
        assert!(output.contains("replaced"));
        assert!(output.contains("updated"));
        assert!(!output.contains("appended"));
        assert!(!output.contains("zero counts"));
    }

    #[test]
    fn test_render_summary_fallbacks() {
        let report = SyncReport {
            application: None,
            duration: None,
            tests: TestSummary::default(),
            tests_available: false,
            action: SpliceAction::Appended,
            written: false,
            new_version: None,
            ..report()
        };

        let output = render_summary(&report);

        assert!(output.contains("not grouped"));
        assert!(output.contains("N/A"));
        assert!(output.contains("zero counts"));
        assert!(output.contains("appended"));
        assert!(output.contains("No section named 'Build pipeline'"));
        assert!(output.contains("Dry run"));
        assert!(output.contains("--dry-run"));
    }
}
