use aws_sdk_textract::operation::get_document_analysis::GetDocumentAnalysisOutput;

pub mod aws;
pub mod cancel;
pub mod config;
pub mod errors;
pub mod job_status;
pub mod pagination;
pub mod processor;
pub mod provision;
pub mod services;
pub mod watch;

pub use cancel::CancelToken;
pub use config::{NonMatchingPolicy, ProcessorConfig, WaitOptions};
pub use errors::{Result, TextractError};
pub use job_status::{JobStatus, JobStatusMsg};
pub use processor::{DocumentProcessor, JobSession, ProcessType};
pub use provision::NotificationResources;
pub use services::{AnalysisQuery, ResultPage};
pub use watch::WatchEvent;

use aws::{SnsTopic, SqsQueue, TextractAnalysis};

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    Cancel,
    Exit,
}

fn interrupt_action(received: usize) -> Interrupt {
    if received <= 1 {
        Interrupt::Cancel
    } else {
        Interrupt::Exit
    }
}

/// Blocking client for one stored document, backed by Textract, SNS and SQS.
///
/// Every call blocks the calling thread until the underlying requests finish.
pub struct TextractJobClient {
    runtime: tokio::runtime::Runtime,
    processor: DocumentProcessor<TextractAnalysis, SqsQueue>,
    topic: SnsTopic,
}

impl TextractJobClient {
    pub fn new(config: ProcessorConfig) -> Result<TextractJobClient> {
        TextractJobClient::with_options(config, WaitOptions::default())
    }

    pub fn with_options(config: ProcessorConfig, options: WaitOptions) -> Result<TextractJobClient> {
        config.validate()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let sdk_config = runtime.block_on(aws::load_sdk_config(&config))?;

        let processor = DocumentProcessor::new(
            config,
            TextractAnalysis::new(&sdk_config),
            SqsQueue::new(&sdk_config),
        )?
        .with_options(options);

        Ok(TextractJobClient {
            runtime,
            processor,
            topic: SnsTopic::new(&sdk_config),
        })
    }

    pub fn config(&self) -> &ProcessorConfig {
        self.processor.config()
    }

    /// Cancels `token` on the first Ctrl-C received while this client is
    /// blocked in one of its calls; a second Ctrl-C exits the process.
    pub fn cancel_on_ctrl_c(&self, token: CancelToken) {
        self.runtime.spawn(async move {
            let mut received = 0;
            while tokio::signal::ctrl_c().await.is_ok() {
                received += 1;
                match interrupt_action(received) {
                    Interrupt::Cancel => {
                        tracing::warn!("interrupted, cancelling (press Ctrl-C again to exit)");
                        token.cancel();
                    }
                    Interrupt::Exit => {
                        tracing::warn!("interrupted again, exiting");
                        std::process::exit(130);
                    }
                }
            }
        });
    }

    pub fn create_topic_and_queue(&self) -> Result<NotificationResources> {
        self.runtime
            .block_on(provision::provision(&self.topic, self.processor.queue()))
    }

    pub fn delete_topic_and_queue(&self, topic_arn: &str, queue_url: &str) -> Result<()> {
        self.runtime.block_on(provision::teardown(
            &self.topic,
            self.processor.queue(),
            topic_arn,
            queue_url,
        ))
    }

    pub fn start_document_analysis(
        &self,
        process_type: ProcessType,
        queries: &[AnalysisQuery],
        resources: &NotificationResources,
    ) -> Result<JobSession> {
        self.runtime
            .block_on(self.processor.start_job(process_type, queries, resources))
    }

    pub fn watch_job<F>(
        &self,
        session: &JobSession,
        cancel: &CancelToken,
        on_event: F,
    ) -> Result<JobStatusMsg>
    where
        F: FnMut(&WatchEvent<'_>),
    {
        self.runtime
            .block_on(self.processor.watch_job(session, cancel, on_event))
    }

    pub fn wait_for_job_result<F>(
        &self,
        session: &JobSession,
        cancel: &CancelToken,
        on_event: F,
    ) -> Result<Vec<GetDocumentAnalysisOutput>>
    where
        F: FnMut(&WatchEvent<'_>),
    {
        self.runtime
            .block_on(self.processor.wait_for_job_result(session, cancel, on_event))
    }

    pub fn get_results(
        &self,
        job_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<GetDocumentAnalysisOutput>> {
        self.runtime
            .block_on(self.processor.get_results(job_id, cancel))
    }

    pub fn process_document<F>(
        &self,
        process_type: ProcessType,
        queries: &[AnalysisQuery],
        resources: &NotificationResources,
        cancel: &CancelToken,
        on_event: F,
    ) -> Result<Vec<GetDocumentAnalysisOutput>>
    where
        F: FnMut(&WatchEvent<'_>),
    {
        self.runtime.block_on(self.processor.process_document(
            process_type,
            queries,
            resources,
            cancel,
            on_event,
        ))
    }
}
