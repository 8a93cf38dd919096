//! Seams between the job pipeline and the three managed services.
//!
//! `aws` implements these on top of the SDK clients; tests implement them
//! in memory.

use async_trait::async_trait;

use crate::errors::ServiceError;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// A single query sent with the `QUERIES` feature type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisQuery {
    pub text: String,
    pub alias: Option<String>,
    pub pages: Vec<String>,
}

impl AnalysisQuery {
    pub fn new(text: impl Into<String>) -> AnalysisQuery {
        AnalysisQuery {
            text: text.into(),
            alias: None,
            pages: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> AnalysisQuery {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_pages<I, S>(mut self, pages: I) -> AnalysisQuery
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages = pages.into_iter().map(Into::into).collect();
        self
    }
}

/// Parses `TEXT` or `TEXT=ALIAS`.
impl std::str::FromStr for AnalysisQuery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (text, alias) = match s.rsplit_once('=') {
            Some((text, alias)) => (text.trim(), Some(alias.trim())),
            None => (s.trim(), None),
        };
        if text.is_empty() {
            return Err("query text must not be empty".to_string());
        }
        let query = AnalysisQuery::new(text);
        Ok(match alias {
            Some(alias) if !alias.is_empty() => query.with_alias(alias),
            _ => query,
        })
    }
}

/// Parameters of one start-analysis call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub bucket: String,
    pub document: String,
    pub queries: Vec<AnalysisQuery>,
    pub role_arn: String,
    pub topic_arn: String,
    pub job_tag: Option<String>,
    pub client_request_token: Option<String>,
}

impl AnalysisRequest {
    pub fn with_job_tag(mut self, tag: impl Into<String>) -> AnalysisRequest {
        self.job_tag = Some(tag.into());
        self
    }

    pub fn with_client_request_token(mut self, token: impl Into<String>) -> AnalysisRequest {
        self.client_request_token = Some(token.into());
        self
    }
}

/// One page of output from the analysis service.
pub trait ResultPage {
    fn next_token(&self) -> Option<&str>;
}

impl ResultPage for serde_json::Value {
    fn next_token(&self) -> Option<&str> {
        self.get("NextToken").and_then(|t| t.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: Option<String>,
    pub body: Option<String>,
    pub receipt_handle: Option<String>,
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    type Page: ResultPage + Send;

    /// Returns the job id.
    async fn start_document_analysis(&self, request: &AnalysisRequest) -> ServiceResult<String>;

    async fn get_document_analysis(
        &self,
        job_id: &str,
        max_results: i32,
        next_token: Option<&str>,
    ) -> ServiceResult<Self::Page>;
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_secs: Option<i32>,
    ) -> ServiceResult<Vec<QueueMessage>>;

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> ServiceResult<()>;

    /// Returns the queue URL.
    async fn create_queue(&self, name: &str) -> ServiceResult<String>;

    async fn get_queue_url(&self, name: &str) -> ServiceResult<String>;

    async fn get_queue_arn(&self, queue_url: &str) -> ServiceResult<String>;

    async fn set_queue_policy(&self, queue_url: &str, policy: &str) -> ServiceResult<()>;

    async fn delete_queue(&self, queue_url: &str) -> ServiceResult<()>;
}

#[async_trait]
pub trait NotificationTopic: Send + Sync {
    /// Returns the topic ARN.
    async fn create_topic(&self, name: &str) -> ServiceResult<String>;

    async fn subscribe_queue(&self, topic_arn: &str, queue_arn: &str) -> ServiceResult<()>;

    async fn delete_topic(&self, topic_arn: &str) -> ServiceResult<()>;
}
