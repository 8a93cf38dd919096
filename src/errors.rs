use std::time::Duration;

use thiserror::Error;

use crate::job_status::JobStatus;
use crate::processor::ProcessType;

pub type Result<T> = std::result::Result<T, TextractError>;

/// Failure reported by one of the managed services for a single call.
#[derive(Debug, Clone, Error)]
#[error("{operation} failed: {message}")]
pub struct ServiceError {
    pub operation: &'static str,
    pub message: String,
}

impl ServiceError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        ServiceError {
            operation,
            message: message.into(),
        }
    }
}

/// A queue message body that does not carry a job notification.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("message has no body")]
    MissingBody,
    #[error("notification body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TextractError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("processing type {0} is not supported, only analysis is")]
    UnsupportedProcessType(ProcessType),

    #[error("failed to start document analysis: {0}")]
    Submission(#[source] ServiceError),

    #[error("{operation} response lacks a '{field}' field")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("failed to receive notifications: {0}")]
    Receive(#[source] ServiceError),

    #[error("failed to delete notification: {0}")]
    Delete(#[source] ServiceError),

    #[error("Textract failed to execute job {job_id} (status {status}): {message}")]
    JobFailed {
        job_id: String,
        status: JobStatus,
        message: String,
    },

    #[error("fetching results of job {job_id} failed after {pages_fetched} pages: {source}")]
    Pagination {
        job_id: String,
        pages_fetched: usize,
        #[source]
        source: ServiceError,
    },

    #[error("provisioning step '{step}' failed: {source}")]
    Provisioning {
        step: &'static str,
        #[source]
        source: ServiceError,
    },

    #[error("no notification for job {job_id} after {waited:?}")]
    Timeout { job_id: String, waited: Duration },

    #[error("waiting for job {job_id} was cancelled")]
    Cancelled { job_id: String },

    #[error("could not start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
