//! AWS SDK implementations of the service traits.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_textract::error::DisplayErrorContext;
use aws_sdk_textract::operation::get_document_analysis::GetDocumentAnalysisOutput;
use aws_sdk_textract::types::{
    DocumentLocation, FeatureType, NotificationChannel, QueriesConfig, Query, S3Object,
};

use crate::config::ProcessorConfig;
use crate::errors::{Result, ServiceError, TextractError};
use crate::services::{
    AnalysisRequest, AnalysisService, MessageQueue, NotificationTopic, QueueMessage, ResultPage,
    ServiceResult,
};

const CREDENTIALS_PROVIDER_NAME: &str = "textract-async-client";

/// Loads the shared SDK configuration, using static keys when the config
/// carries them and the default provider chain otherwise.
pub async fn load_sdk_config(config: &ProcessorConfig) -> Result<SdkConfig> {
    config.validate()?;
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
    if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
        loader = loader.credentials_provider(Credentials::new(
            key,
            secret,
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        ));
    }
    let sdk_config = loader.load().await;
    verify_credentials(sdk_config.credentials_provider()).await?;
    Ok(sdk_config)
}

/// Resolves the provider once so missing credentials fail here instead of
/// at the first service call.
async fn verify_credentials(provider: Option<SharedCredentialsProvider>) -> Result<()> {
    let provider = provider.ok_or_else(|| {
        TextractError::Config("no AWS credentials provider configured".to_string())
    })?;
    provider.provide_credentials().await.map_err(|e| {
        TextractError::Config(format!(
            "no usable AWS credentials: {}",
            DisplayErrorContext(e)
        ))
    })?;
    Ok(())
}

fn sdk_error<E>(operation: &'static str, err: E) -> ServiceError
where
    E: std::error::Error,
{
    ServiceError::new(operation, DisplayErrorContext(err).to_string())
}

fn missing(operation: &'static str, field: &str) -> ServiceError {
    ServiceError::new(operation, format!("response lacks '{}'", field))
}

impl ResultPage for GetDocumentAnalysisOutput {
    fn next_token(&self) -> Option<&str> {
        GetDocumentAnalysisOutput::next_token(self)
    }
}

#[derive(Debug, Clone)]
pub struct TextractAnalysis {
    client: aws_sdk_textract::Client,
}

impl TextractAnalysis {
    pub fn new(sdk_config: &SdkConfig) -> TextractAnalysis {
        TextractAnalysis {
            client: aws_sdk_textract::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl AnalysisService for TextractAnalysis {
    type Page = GetDocumentAnalysisOutput;

    async fn start_document_analysis(&self, request: &AnalysisRequest) -> ServiceResult<String> {
        const OP: &str = "StartDocumentAnalysis";

        let location = DocumentLocation::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&request.bucket)
                    .name(&request.document)
                    .build(),
            )
            .build();

        let mut queries = QueriesConfig::builder();
        for q in &request.queries {
            let query = Query::builder()
                .text(&q.text)
                .set_alias(q.alias.clone())
                .set_pages(if q.pages.is_empty() {
                    None
                } else {
                    Some(q.pages.clone())
                })
                .build()
                .map_err(|e| sdk_error(OP, e))?;
            queries = queries.queries(query);
        }
        let queries = queries.build().map_err(|e| sdk_error(OP, e))?;

        let channel = NotificationChannel::builder()
            .role_arn(&request.role_arn)
            .sns_topic_arn(&request.topic_arn)
            .build()
            .map_err(|e| sdk_error(OP, e))?;

        let resp = self
            .client
            .start_document_analysis()
            .document_location(location)
            .feature_types(FeatureType::Queries)
            .queries_config(queries)
            .notification_channel(channel)
            .set_job_tag(request.job_tag.clone())
            .set_client_request_token(request.client_request_token.clone())
            .send()
            .await
            .map_err(|e| sdk_error(OP, e))?;

        resp.job_id()
            .map(str::to_owned)
            .ok_or_else(|| missing(OP, "JobId"))
    }

    async fn get_document_analysis(
        &self,
        job_id: &str,
        max_results: i32,
        next_token: Option<&str>,
    ) -> ServiceResult<GetDocumentAnalysisOutput> {
        self.client
            .get_document_analysis()
            .job_id(job_id)
            .max_results(max_results)
            .set_next_token(next_token.map(str::to_owned))
            .send()
            .await
            .map_err(|e| sdk_error("GetDocumentAnalysis", e))
    }
}

#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
}

impl SqsQueue {
    pub fn new(sdk_config: &SdkConfig) -> SqsQueue {
        SqsQueue {
            client: aws_sdk_sqs::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_secs: Option<i32>,
    ) -> ServiceResult<Vec<QueueMessage>> {
        let resp = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .message_attribute_names("All")
            .max_number_of_messages(max_messages)
            .set_wait_time_seconds(wait_secs)
            .send()
            .await
            .map_err(|e| sdk_error("ReceiveMessage", e))?;

        Ok(resp
            .messages()
            .iter()
            .map(|m| QueueMessage {
                message_id: m.message_id().map(str::to_owned),
                body: m.body().map(str::to_owned),
                receipt_handle: m.receipt_handle().map(str::to_owned),
            })
            .collect())
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> ServiceResult<()> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteMessage", e))?;
        Ok(())
    }

    async fn create_queue(&self, name: &str) -> ServiceResult<String> {
        let resp = self
            .client
            .create_queue()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| sdk_error("CreateQueue", e))?;
        resp.queue_url()
            .map(str::to_owned)
            .ok_or_else(|| missing("CreateQueue", "QueueUrl"))
    }

    async fn get_queue_url(&self, name: &str) -> ServiceResult<String> {
        let resp = self
            .client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| sdk_error("GetQueueUrl", e))?;
        resp.queue_url()
            .map(str::to_owned)
            .ok_or_else(|| missing("GetQueueUrl", "QueueUrl"))
    }

    async fn get_queue_arn(&self, queue_url: &str) -> ServiceResult<String> {
        let resp = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::QueueArn)
            .send()
            .await
            .map_err(|e| sdk_error("GetQueueAttributes", e))?;
        resp.attributes()
            .and_then(|attrs| attrs.get(&QueueAttributeName::QueueArn))
            .cloned()
            .ok_or_else(|| missing("GetQueueAttributes", "QueueArn"))
    }

    async fn set_queue_policy(&self, queue_url: &str, policy: &str) -> ServiceResult<()> {
        self.client
            .set_queue_attributes()
            .queue_url(queue_url)
            .attributes(QueueAttributeName::Policy, policy)
            .send()
            .await
            .map_err(|e| sdk_error("SetQueueAttributes", e))?;
        Ok(())
    }

    async fn delete_queue(&self, queue_url: &str) -> ServiceResult<()> {
        self.client
            .delete_queue()
            .queue_url(queue_url)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteQueue", e))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SnsTopic {
    client: aws_sdk_sns::Client,
}

impl SnsTopic {
    pub fn new(sdk_config: &SdkConfig) -> SnsTopic {
        SnsTopic {
            client: aws_sdk_sns::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl NotificationTopic for SnsTopic {
    async fn create_topic(&self, name: &str) -> ServiceResult<String> {
        let resp = self
            .client
            .create_topic()
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_error("CreateTopic", e))?;
        resp.topic_arn()
            .map(str::to_owned)
            .ok_or_else(|| missing("CreateTopic", "TopicArn"))
    }

    async fn subscribe_queue(&self, topic_arn: &str, queue_arn: &str) -> ServiceResult<()> {
        self.client
            .subscribe()
            .topic_arn(topic_arn)
            .protocol("sqs")
            .endpoint(queue_arn)
            .send()
            .await
            .map_err(|e| sdk_error("Subscribe", e))?;
        Ok(())
    }

    async fn delete_topic(&self, topic_arn: &str) -> ServiceResult<()> {
        self.client
            .delete_topic()
            .topic_arn(topic_arn)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteTopic", e))?;
        Ok(())
    }
}
