//! One synchronization run: GitLab pipeline in, updated Confluence page out.
//!
//! Steps run strictly in order:
//! fetch pipeline, fetch tests, fetch history, render, fetch page, splice, write page.
//! Only the test summary fetch may fail without aborting; the page is written
//! last, so a failed run never leaves a partial update behind.

use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use serde::Serialize;

use crate::error::Result;
use crate::models::{
    parse_history, Elapsed, PipelineHistoryEntry, PipelineInfo, PipelineStatus, TestSummary,
};
use crate::output::PhaseProgress;
use crate::providers::gitlab::MAX_PAGE_SIZE;
use crate::providers::{DocumentStore, PipelineSource};
use crate::refs::{select_application_runs, ParsedRef, RefPattern};
use crate::render::{PipelineSection, DEFAULT_HISTORY_CAP};
use crate::splice::{splice_section, SpliceAction};

/// How many runs are listed per kept run when history is grouped by application.
const GROUPING_OVERFETCH: usize = 5;

/// Which pipeline to publish and where.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub project_id: String,
    pub pipeline_id: u64,
    pub page_id: String,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Number of history runs shown on the page.
    pub history_count: usize,
    /// Groups history by the application name parsed from each ref.
    pub ref_pattern: Option<RefPattern>,
    /// Fetch the test summary of every history run for the chart.
    pub history_tests: bool,
    /// Do everything except writing the page.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            history_count: DEFAULT_HISTORY_CAP,
            ref_pattern: None,
            history_tests: true,
            dry_run: false,
        }
    }
}

/// Application name and version parsed from the pipeline ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub name: String,
    pub version: String,
}

/// What a run did.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub project_id: String,
    pub pipeline_id: u64,
    pub pipeline_name: String,
    pub status: PipelineStatus,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub web_url: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub duration: Option<Elapsed>,
    pub application: Option<Application>,
    pub tests: TestSummary,
    /// `false` when the test summary could not be fetched and zeros were used.
    pub tests_available: bool,
    pub history_runs: usize,
    pub page_id: String,
    pub page_title: String,
    pub version_read: u64,
    pub action: SpliceAction,
    pub written: bool,
    /// Page version reported by Confluence after the write.
    pub new_version: Option<u64>,
    pub generated_at: NaiveDateTime,
}

/// Runs synchronizations against a pipeline source and a document store.
pub struct Synchronizer<'a, S, D> {
    source: &'a S,
    store: &'a D,
    options: &'a SyncOptions,
}

impl<'a, S, D> Synchronizer<'a, S, D>
where
    S: PipelineSource,
    D: DocumentStore,
{
    pub fn new(source: &'a S, store: &'a D, options: &'a SyncOptions) -> Self {
        Self {
            source,
            store,
            options,
        }
    }

    /// Publishes pipeline `request.pipeline_id` to page `request.page_id`.
    ///
    /// # Errors
    ///
    /// Returns the upstream error of the first required step that fails. The
    /// page is not written in that case.
    pub async fn run(&self, request: &SyncRequest) -> Result<SyncReport> {
        info!(
            "Fetching pipeline {} from project {}",
            request.pipeline_id, request.project_id
        );

        // Phase 1: GitLab data
        let progress = PhaseProgress::start_fetch(request.pipeline_id);

        let record = self
            .source
            .get_pipeline(&request.project_id, request.pipeline_id)
            .await?;
        let pipeline = PipelineInfo::from_record(&record);
        info!("Pipeline name: {}, status: {}", pipeline.name, pipeline.status);

        let tests = self
            .fetch_tests(&request.project_id, request.pipeline_id)
            .await;
        let application = self.parse_application(&pipeline);
        let history = self
            .fetch_history(
                &request.project_id,
                request.pipeline_id,
                tests.as_ref(),
                application.as_ref(),
            )
            .await?;

        // Phase 2: render
        let progress = progress.finish_fetch_start_render(history.len());

        let generated_at = Local::now().naive_local();
        let tests_available = tests.is_some();
        let tests = tests.unwrap_or_default();
        let section = PipelineSection {
            name: &pipeline.name,
            pipeline: &pipeline,
            tests: &tests,
            history: &history,
            history_cap: self.options.history_count,
            generated_at,
        }
        .render();

        // Phase 3: Confluence page
        let progress = progress.finish_render_start_update(&request.page_id);

        info!("Fetching Confluence page {}", request.page_id);
        let document = self.store.get_document(&request.page_id).await?;

        let spliced = splice_section(&document.content, &pipeline.name, &section);
        if spliced.action == SpliceAction::Appended {
            warn!(
                "Section for '{}' not found in page '{}'. Appending...",
                pipeline.name, document.title
            );
        }

        let new_version = if self.options.dry_run {
            info!("Dry run: page {} left unchanged", request.page_id);
            None
        } else {
            info!("Updating Confluence page {}", request.page_id);
            let confirmation = self
                .store
                .update_document(
                    &request.page_id,
                    &document.title,
                    &spliced.content,
                    document.version,
                )
                .await?;
            Some(
                confirmation
                    .pointer("/version/number")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(document.version + 1),
            )
        };

        progress.finish_update(!self.options.dry_run);

        Ok(SyncReport {
            project_id: request.project_id.clone(),
            pipeline_id: request.pipeline_id,
            pipeline_name: pipeline.name.clone(),
            status: pipeline.status,
            ref_: pipeline.ref_.clone(),
            web_url: pipeline.web_url.clone(),
            created_at: pipeline.created_at().map(ToString::to_string),
            updated_at: pipeline.updated_at().map(ToString::to_string),
            duration: pipeline.duration().cloned(),
            application: application.map(|parsed| Application {
                name: parsed.name,
                version: parsed.version,
            }),
            tests,
            tests_available,
            history_runs: history.len(),
            page_id: request.page_id.clone(),
            page_title: document.title,
            version_read: document.version,
            action: spliced.action,
            written: !self.options.dry_run,
            new_version,
            generated_at,
        })
    }

    /// The test summary of `pipeline_id`, or `None` when it cannot be fetched.
    async fn fetch_tests(&self, project_id: &str, pipeline_id: u64) -> Option<TestSummary> {
        match self.source.get_test_summary(project_id, pipeline_id).await {
            Ok(record) => {
                let tests = TestSummary::from_record(&record);
                info!(
                    "Tests - Total: {}, Passed: {}, Failed: {}",
                    tests.total, tests.success, tests.failed
                );
                Some(tests)
            }
            Err(e) => {
                warn!("Could not fetch test summary for pipeline {pipeline_id}: {e}");
                None
            }
        }
    }

    fn parse_application(&self, pipeline: &PipelineInfo) -> Option<ParsedRef> {
        let pattern = self.options.ref_pattern.as_ref()?;
        let parsed = pattern.parse(&pipeline.ref_);

        if parsed.matched {
            info!("Application: {} ({})", parsed.name, parsed.version);
            Some(parsed)
        } else {
            info!(
                "Ref '{}' does not match '{}', history is not grouped",
                pipeline.ref_,
                pattern.as_str()
            );
            None
        }
    }

    async fn fetch_history(
        &self,
        project_id: &str,
        pipeline_id: u64,
        tests: Option<&TestSummary>,
        application: Option<&ParsedRef>,
    ) -> Result<Vec<PipelineHistoryEntry>> {
        let count = self.options.history_count;
        let limit = match application {
            Some(_) => count.saturating_mul(GROUPING_OVERFETCH).min(MAX_PAGE_SIZE),
            None => count,
        };

        info!("Fetching recent {limit} pipelines for history");
        let records = self.source.list_pipelines(project_id, limit, None).await?;
        let history = parse_history(&records);

        let mut history = match (application, &self.options.ref_pattern) {
            (Some(parsed), Some(pattern)) => {
                select_application_runs(&history, pattern, &parsed.name)
            }
            _ => history,
        };
        history.truncate(count);

        if !self.options.history_tests {
            return Ok(history);
        }

        let mut enriched = Vec::with_capacity(history.len());
        for entry in history {
            if entry.id == pipeline_id {
                match tests {
                    Some(tests) => enriched.push(entry.with_test_counts(tests)),
                    None => enriched.push(entry),
                }
                continue;
            }

            match self.source.get_test_summary(project_id, entry.id).await {
                Ok(record) => {
                    enriched.push(entry.with_test_counts(&TestSummary::from_record(&record)));
                }
                Err(e) => {
                    warn!("Could not fetch test summary for pipeline {}: {e}", entry.id);
                    enriched.push(entry);
                }
            }
        }

        Ok(enriched)
    }
}
