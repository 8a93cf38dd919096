use std::env;
use std::time::Duration;

use crate::errors::{Result, TextractError};

pub const DEFAULT_MAX_MESSAGES: i32 = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RESULTS: i32 = 1000;

/// Everything needed to talk to the services about one stored document.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub role_arn: String,
    pub bucket: String,
    pub document: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl ProcessorConfig {
    pub fn new(
        role_arn: impl Into<String>,
        bucket: impl Into<String>,
        document: impl Into<String>,
        region: impl Into<String>,
    ) -> ProcessorConfig {
        ProcessorConfig {
            role_arn: role_arn.into(),
            bucket: bucket.into(),
            document: document.into(),
            region: region.into(),
            access_key_id: None,
            secret_access_key: None,
        }
    }

    pub fn with_static_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> ProcessorConfig {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Reads `TEXTRACT_ROLE_ARN`, `TEXTRACT_BUCKET`, `TEXTRACT_DOCUMENT`,
    /// `AWS_REGION` and optionally the static key pair.
    pub fn from_env() -> Result<ProcessorConfig> {
        fn required(name: &str) -> Result<String> {
            env::var(name).map_err(|_| TextractError::Config(format!("{} env var is required", name)))
        }

        let config = ProcessorConfig {
            role_arn: required("TEXTRACT_ROLE_ARN")?,
            bucket: required("TEXTRACT_BUCKET")?,
            document: required("TEXTRACT_DOCUMENT")?,
            region: required("AWS_REGION")?,
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("role ARN", &self.role_arn),
            ("bucket", &self.bucket),
            ("document", &self.document),
            ("region", &self.region),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(TextractError::Config(format!("{} must not be empty", name)));
            }
        }
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(_), None) | (None, Some(_)) => Err(TextractError::Config(
                "access key id and secret access key must be given together".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// What happens to received messages that belong to some other job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonMatchingPolicy {
    /// Leave them on the queue so they are redelivered after their
    /// visibility timeout.
    #[default]
    Leave,
    /// Delete every received message, matching or not. Drops notifications
    /// of other jobs sharing the queue.
    Delete,
}

#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub max_messages: i32,
    pub poll_interval: Duration,
    /// Long-poll wait passed to the receive call, in seconds.
    pub receive_wait_secs: Option<i32>,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub max_results: i32,
    pub non_matching: NonMatchingPolicy,
}

impl Default for WaitOptions {
    fn default() -> Self {
        WaitOptions {
            max_messages: DEFAULT_MAX_MESSAGES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            receive_wait_secs: None,
            timeout: None,
            max_results: DEFAULT_MAX_RESULTS,
            non_matching: NonMatchingPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_fail_fast() {
        let config = ProcessorConfig::new("arn:aws:iam::1:role/t", "", "doc.pdf", "us-east-1");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn half_a_key_pair_is_rejected() {
        let mut config = ProcessorConfig::new("arn:aws:iam::1:role/t", "b", "doc.pdf", "us-east-1");
        config.access_key_id = Some("AKIA".to_string());
        assert!(matches!(config.validate(), Err(TextractError::Config(_))));

        let config = config.with_static_credentials("AKIA", "secret");
        assert!(config.validate().is_ok());
    }

    // the only test touching these variables, so it cannot race another
    #[test]
    fn from_env_requires_every_location_variable() {
        let vars = [
            ("TEXTRACT_ROLE_ARN", "arn:aws:iam::1:role/t"),
            ("TEXTRACT_DOCUMENT", "doc.pdf"),
            ("AWS_REGION", "us-east-1"),
        ];
        for (name, value) in vars {
            env::set_var(name, value);
        }
        env::remove_var("TEXTRACT_BUCKET");

        match ProcessorConfig::from_env() {
            Err(TextractError::Config(msg)) => assert!(msg.contains("TEXTRACT_BUCKET")),
            other => panic!("expected config error, got {:?}", other),
        }

        env::set_var("TEXTRACT_BUCKET", "docs");
        let config = ProcessorConfig::from_env();

        for name in ["TEXTRACT_ROLE_ARN", "TEXTRACT_BUCKET", "TEXTRACT_DOCUMENT", "AWS_REGION"] {
            env::remove_var(name);
        }
        assert_eq!(config.unwrap().bucket, "docs");
    }

    #[test]
    fn defaults_follow_the_polling_contract() {
        let opts = WaitOptions::default();
        assert_eq!(opts.max_messages, 10);
        assert_eq!(opts.poll_interval, Duration::from_secs(5));
        assert_eq!(opts.max_results, 1000);
        assert!(opts.timeout.is_none());
        assert_eq!(opts.non_matching, NonMatchingPolicy::Leave);
    }
}
