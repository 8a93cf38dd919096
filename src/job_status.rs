use std::fmt;

use serde::Deserialize;

use crate::errors::EnvelopeError;

/// Completion status Textract publishes for an asynchronous job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Succeeded,
    PartialSuccess,
    Failed,
    Error,
    InProgress,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::PartialSuccess => "PARTIAL_SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::Error => "ERROR",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// SNS transport envelope, as found in the body of an SQS message.
#[derive(Debug, Deserialize)]
pub struct TopicEnvelope {
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "MessageId")]
    pub message_id: Option<String>,
    #[serde(rename = "TopicArn")]
    pub topic_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotifiedLocation {
    #[serde(rename = "S3ObjectName")]
    pub s3_object_name: Option<String>,
    #[serde(rename = "S3Bucket")]
    pub s3_bucket: Option<String>,
}

/// Job completion payload carried inside the envelope's `Message` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobStatusMsg {
    #[serde(rename = "JobId")]
    pub job_id: String,
    #[serde(rename = "Status")]
    pub status: JobStatus,
    #[serde(rename = "API")]
    pub api: Option<String>,
    #[serde(rename = "JobTag")]
    pub job_tag: Option<String>,
    #[serde(rename = "Timestamp")]
    pub timestamp: Option<i64>,
    #[serde(rename = "DocumentLocation")]
    pub document_location: Option<NotifiedLocation>,
}

impl JobStatusMsg {
    /// Unwraps both envelope layers of a queue message body.
    pub fn from_queue_body(body: &str) -> Result<JobStatusMsg, EnvelopeError> {
        let envelope: TopicEnvelope = serde_json::from_str(body)?;
        Ok(serde_json::from_str(&envelope.message)?)
    }
}
