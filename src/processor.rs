use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::cancel::CancelToken;
use crate::config::{ProcessorConfig, WaitOptions};
use crate::errors::{Result, TextractError};
use crate::job_status::JobStatusMsg;
use crate::pagination::collect_pages;
use crate::provision::NotificationResources;
use crate::services::{AnalysisQuery, AnalysisRequest, AnalysisService, MessageQueue};
use crate::watch::{watch_queue, WatchEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessType {
    Analysis,
    /// Recognised, but no submission path exists for it.
    TextDetection,
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessType::Analysis => f.write_str("analysis"),
            ProcessType::TextDetection => f.write_str("detection"),
        }
    }
}

impl FromStr for ProcessType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "analysis" => Ok(ProcessType::Analysis),
            "detection" | "text-detection" => Ok(ProcessType::TextDetection),
            other => Err(format!("unknown processing type: {}", other)),
        }
    }
}

/// State of one submitted job. Lives only as long as the caller is
/// interested in that job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSession {
    pub job_id: String,
    pub process_type: ProcessType,
    pub resources: NotificationResources,
}

/// Submits a stored document for analysis, waits for its completion
/// notification and collects the result pages.
pub struct DocumentProcessor<A, Q> {
    config: ProcessorConfig,
    options: WaitOptions,
    analysis: A,
    queue: Q,
}

impl<A, Q> DocumentProcessor<A, Q>
where
    A: AnalysisService,
    Q: MessageQueue,
{
    pub fn new(config: ProcessorConfig, analysis: A, queue: Q) -> Result<DocumentProcessor<A, Q>> {
        config.validate()?;
        Ok(DocumentProcessor {
            config,
            options: WaitOptions::default(),
            analysis,
            queue,
        })
    }

    pub fn with_options(mut self, options: WaitOptions) -> DocumentProcessor<A, Q> {
        self.options = options;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn options(&self) -> &WaitOptions {
        &self.options
    }

    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Request for the configured document, publishing to `resources`.
    pub fn analysis_request(
        &self,
        queries: &[AnalysisQuery],
        resources: &NotificationResources,
    ) -> AnalysisRequest {
        AnalysisRequest {
            bucket: self.config.bucket.clone(),
            document: self.config.document.clone(),
            queries: queries.to_vec(),
            role_arn: self.config.role_arn.clone(),
            topic_arn: resources.topic_arn.clone(),
            job_tag: None,
            client_request_token: None,
        }
    }

    pub async fn start_job(
        &self,
        process_type: ProcessType,
        queries: &[AnalysisQuery],
        resources: &NotificationResources,
    ) -> Result<JobSession> {
        let request = self.analysis_request(queries, resources);
        self.submit(process_type, request, resources).await
    }

    /// Makes exactly one start call, or none if the request is rejected
    /// up front.
    pub async fn submit(
        &self,
        process_type: ProcessType,
        request: AnalysisRequest,
        resources: &NotificationResources,
    ) -> Result<JobSession> {
        if process_type != ProcessType::Analysis {
            return Err(TextractError::UnsupportedProcessType(process_type));
        }
        if request.queries.is_empty() {
            return Err(TextractError::Config(
                "analysis needs at least one query".to_string(),
            ));
        }

        let job_id = self
            .analysis
            .start_document_analysis(&request)
            .await
            .map_err(TextractError::Submission)?;
        if job_id.is_empty() {
            return Err(TextractError::MissingField {
                operation: "StartDocumentAnalysis",
                field: "JobId",
            });
        }

        info!(%job_id, document = %request.document, "started document analysis");
        Ok(JobSession {
            job_id,
            process_type,
            resources: resources.clone(),
        })
    }

    pub async fn watch_job<F>(
        &self,
        session: &JobSession,
        cancel: &CancelToken,
        on_event: F,
    ) -> Result<JobStatusMsg>
    where
        F: FnMut(&WatchEvent<'_>),
    {
        watch_queue(
            &self.queue,
            &session.resources.queue_url,
            &session.job_id,
            &self.options,
            cancel,
            on_event,
        )
        .await
    }

    pub async fn get_results(&self, job_id: &str, cancel: &CancelToken) -> Result<Vec<A::Page>> {
        collect_pages(&self.analysis, job_id, self.options.max_results, cancel).await
    }

    /// Waits for the job's notification, then fetches its results unless
    /// the job failed.
    pub async fn wait_for_job_result<F>(
        &self,
        session: &JobSession,
        cancel: &CancelToken,
        on_event: F,
    ) -> Result<Vec<A::Page>>
    where
        F: FnMut(&WatchEvent<'_>),
    {
        let notification = self.watch_job(session, cancel, on_event).await?;
        if notification.status.is_failure() {
            return Err(TextractError::JobFailed {
                job_id: session.job_id.clone(),
                message: format!("Textract reported status {}", notification.status),
                status: notification.status,
            });
        }

        let pages = self.get_results(&session.job_id, cancel).await?;
        info!(job_id = %session.job_id, pages = pages.len(), "collected analysis results");
        Ok(pages)
    }

    pub async fn process_document<F>(
        &self,
        process_type: ProcessType,
        queries: &[AnalysisQuery],
        resources: &NotificationResources,
        cancel: &CancelToken,
        on_event: F,
    ) -> Result<Vec<A::Page>>
    where
        F: FnMut(&WatchEvent<'_>),
    {
        let session = self.start_job(process_type, queries, resources).await?;
        self.wait_for_job_result(&session, cancel, on_event).await
    }
}
