use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{PipelineHistoryEntry, PipelineInfo, TestSummary};

use super::chart::render_history_chart;
use super::format::{escape_xml, format_duration, format_seconds, format_timestamp};

/// Everything needed to render the page section of one pipeline.
pub struct PipelineSection<'a> {
    /// Section key. Escaped into the `<h2>`; the splicer decodes it back when matching.
    pub name: &'a str,
    pub pipeline: &'a PipelineInfo,
    pub tests: &'a TestSummary,
    pub history: &'a [PipelineHistoryEntry],
    pub history_cap: usize,
    pub generated_at: NaiveDateTime,
}

impl PipelineSection<'_> {
    /// Renders the section in Confluence storage format.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "<h2>{}</h2>", escape_xml(self.name));
        out.push('\n');
        self.write_status(&mut out);
        out.push('\n');
        self.write_test_table(&mut out);
        out.push('\n');
        self.write_history(&mut out);
        out.push('\n');
        let _ = writeln!(
            out,
            "<p><em>Last updated: {}</em></p>",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        );

        out
    }

    fn write_status(&self, out: &mut String) {
        let pipeline = self.pipeline;
        let _ = writeln!(out, "<p>");
        let _ = writeln!(out, "    <strong>Latest Pipeline Run:</strong>");
        let _ = writeln!(
            out,
            "    <a href=\"{}\">{}</a> |",
            escape_xml(&pipeline.web_url),
            pipeline.id
        );
        let _ = writeln!(
            out,
            "    Status: {} {} |",
            status_badge(pipeline.status.as_str()),
            pipeline.status
        );
        let _ = writeln!(out, "    Duration: {}", format_duration(pipeline.duration()));
        let _ = writeln!(out, "</p>");
    }

    fn write_test_table(&self, out: &mut String) {
        let tests = self.tests;
        #[allow(clippy::cast_possible_truncation)]
        let time = format_seconds(tests.total_time as i64);

        let _ = writeln!(out, "<h3>Test Results</h3>");
        let _ = writeln!(out, "<table>");
        let _ = writeln!(out, "    <tbody>");
        let _ = writeln!(out, "        <tr>");
        for header in ["Total", "Passed", "Failed", "Skipped", "Errors", "Time"] {
            let _ = writeln!(out, "            <th>{header}</th>");
        }
        let _ = writeln!(out, "        </tr>");
        let _ = writeln!(out, "        <tr>");
        let _ = writeln!(out, "            <td>{}</td>", tests.total);
        let _ = writeln!(
            out,
            "            <td style=\"background-color: #e8f5e9;\">{}</td>",
            tests.success
        );
        let _ = writeln!(
            out,
            "            <td style=\"background-color: #ffebee;\">{}</td>",
            tests.failed
        );
        let _ = writeln!(
            out,
            "            <td style=\"background-color: #fff3e0;\">{}</td>",
            tests.skipped
        );
        let _ = writeln!(out, "            <td>{}</td>", tests.error);
        let _ = writeln!(out, "            <td>{time}</td>");
        let _ = writeln!(out, "        </tr>");
        let _ = writeln!(out, "    </tbody>");
        let _ = writeln!(out, "</table>");
    }

    fn write_history(&self, out: &mut String) {
        let chart = render_history_chart(self.history, self.history_cap);

        let _ = writeln!(
            out,
            "<h3>Pipeline History (Last {} Runs)</h3>",
            self.history_cap
        );
        let _ = writeln!(out, "<pre>{chart}</pre>");

        let runs = &self.history[..self.history.len().min(self.history_cap)];
        if runs.is_empty() {
            return;
        }

        out.push('\n');
        let _ = writeln!(out, "<h3>Recent Runs</h3>");
        let _ = writeln!(out, "<table>");
        let _ = writeln!(out, "    <tbody>");
        let _ = writeln!(
            out,
            "        <tr><th>Pipeline</th><th>Ref</th><th>Version</th><th>Status</th><th>Created</th><th>Duration</th></tr>"
        );
        for run in runs {
            let _ = writeln!(
                out,
                "        <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                run_link(run),
                escape_xml(&run.ref_),
                escape_xml(&run.version),
                run.status,
                escape_xml(&format_timestamp(run.created_at.as_deref())),
                escape_xml(&format_duration(run.duration.as_ref())),
            );
        }
        let _ = writeln!(out, "    </tbody>");
        let _ = writeln!(out, "</table>");
    }
}

/// Confluence status icon for a pipeline status.
pub fn status_badge(status: &str) -> String {
    format!(
        "<ac:rich-text-icon><ri:icon ri:filename=\"status-{}.svg\" /></ac:rich-text-icon>",
        status.to_lowercase()
    )
}

fn run_link(run: &PipelineHistoryEntry) -> String {
    let href = if run.url.is_empty() {
        run.web_url.as_deref().unwrap_or_default()
    } else {
        run.url.as_str()
    };

    if href.is_empty() {
        format!("#{}", run.id)
    } else {
        format!("<a href=\"{}\">#{}</a>", escape_xml(href), run.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PipelineStatus, PipelineTestCounts};
    use crate::splice::{splice_section, SpliceAction};
    use chrono::NaiveDate;
    use serde_json::json;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 5)
            .unwrap()
    }

    fn pipeline() -> PipelineInfo {
        PipelineInfo::from_record(&json!({
            "id": 287,
            "name": "Build pipeline",
            "status": "success",
            "ref": "my-app - v1.2.3",
            "web_url": "https://gitlab.example.com/g/p/-/pipelines/287",
            "duration": 150
        }))
    }

    fn history() -> Vec<PipelineHistoryEntry> {
        vec![
            PipelineHistoryEntry::from_record(&json!({
                "id": 287, "status": "success", "ref": "my-app - v1.2.3",
                "created_at": "2024-01-15T10:00:00Z", "duration": 300,
                "web_url": "https://gitlab.example.com/g/p/-/pipelines/287"
            }))
            .with_version_and_url("v1.2.3", "https://gitlab.example.com/g/p/-/pipelines/287"),
            PipelineHistoryEntry {
                test_counts: PipelineTestCounts {
                    total: 75,
                    ..PipelineTestCounts::default()
                },
                ..PipelineHistoryEntry::from_record(&json!({
                    "id": 286, "status": "failed", "ref": "feature/<x>"
                }))
            },
        ]
    }

    #[test]
    fn test_section_starts_with_escaped_header() {
        let pipeline = pipeline();
        let section = PipelineSection {
            name: "Build  Pipeline & Co",
            pipeline: &pipeline,
            tests: &TestSummary::default(),
            history: &[],
            history_cap: 10,
            generated_at: generated_at(),
        }
        .render();

        assert!(section.starts_with("<h2>Build  Pipeline &amp; Co</h2>\n"));
    }

    #[test]
    fn test_escaped_header_splices_back_in_place() {
        let pipeline = pipeline();
        let name = "R&D <nightly>";
        let section = PipelineSection {
            name,
            pipeline: &pipeline,
            tests: &TestSummary::default(),
            history: &[],
            history_cap: 10,
            generated_at: generated_at(),
        }
        .render();

        let once = splice_section("<p>Intro</p>", name, &section);
        let twice = splice_section(&once.content, name, &section);

        assert_eq!(once.action, SpliceAction::Appended);
        assert_eq!(twice.action, SpliceAction::Replaced);
        assert_eq!(twice.content, once.content);
        assert!(section.starts_with("<h2>R&amp;D &lt;nightly&gt;</h2>"));
    }

    #[test]
    fn test_section_contents() {
        let pipeline = pipeline();
        let tests = TestSummary {
            total: 150,
            success: 148,
            failed: 2,
            skipped: 0,
            error: 0,
            total_time: 320.7,
        };
        let history = history();

        let section = PipelineSection {
            name: "Build pipeline",
            pipeline: &pipeline,
            tests: &tests,
            history: &history,
            history_cap: 10,
            generated_at: generated_at(),
        }
        .render();

        assert!(section.contains(
            "<a href=\"https://gitlab.example.com/g/p/-/pipelines/287\">287</a> |"
        ));
        assert!(section.contains("status-success.svg"));
        assert!(section.contains("Duration: 2m 30s"));
        assert!(section.contains("<td>150</td>"));
        assert!(section.contains("#e8f5e9;\">148</td>"));
        assert!(section.contains("#ffebee;\">2</td>"));
        assert!(section.contains("<td>5m 20s</td>"));
        assert!(section.contains("<h3>Pipeline History (Last 10 Runs)</h3>"));
        assert!(section.contains("✗ failed     |████████████████████| 75"));
        assert!(section.contains("<td>v1.2.3</td>"));
        assert!(section.contains("<td>feature/&lt;x&gt;</td>"));
        assert!(section.contains("<td>2024-01-15 10:00</td><td>5m 0s</td>"));
        assert!(section.contains("<td>#286</td>"));
        assert!(section.contains("<p><em>Last updated: 2024-01-15 12:00:05</em></p>"));
        assert_eq!(section.matches("<h2>").count(), 1);
    }

    #[test]
    fn test_section_without_history() {
        let pipeline = PipelineInfo::from_record(&json!({ "name": "nightly" }));
        let section = PipelineSection {
            name: "nightly",
            pipeline: &pipeline,
            tests: &TestSummary::default(),
            history: &[],
            history_cap: 10,
            generated_at: generated_at(),
        }
        .render();

        assert!(section.contains("<pre>No data available</pre>"));
        assert!(section.contains("Duration: N/A"));
        assert!(section.contains("<td>0s</td>"));
        assert!(!section.contains("Recent Runs"));
    }

    #[test]
    fn test_section_respects_history_cap() {
        let pipeline = pipeline();
        let history: Vec<_> = (0..5)
            .map(|id| PipelineHistoryEntry::from_record(&json!({ "id": id, "status": "success" })))
            .collect();

        let section = PipelineSection {
            name: "Build pipeline",
            pipeline: &pipeline,
            tests: &TestSummary::default(),
            history: &history,
            history_cap: 2,
            generated_at: generated_at(),
        }
        .render();

        assert_eq!(section.matches("✓ success").count(), 2);
        assert_eq!(section.matches("<td>#").count(), 2);
    }

    #[test]
    fn test_status_badge() {
        assert_eq!(
            status_badge("FAILED"),
            "<ac:rich-text-icon><ri:icon ri:filename=\"status-failed.svg\" /></ac:rich-text-icon>"
        );
        assert_eq!(PipelineStatus::Failed.as_str(), "failed");
    }
}
