#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use textract_async_client::errors::ServiceError;
use textract_async_client::services::{
    AnalysisRequest, AnalysisService, MessageQueue, NotificationTopic, QueueMessage,
    ServiceResult,
};
use textract_async_client::{NotificationResources, ProcessorConfig};

pub const QUEUE_URL: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/AmazonTextractQueue1";
pub const QUEUE_ARN: &str = "arn:aws:sqs:us-east-1:123456789012:AmazonTextractQueue1";
pub const TOPIC_ARN: &str = "arn:aws:sns:us-east-1:123456789012:AmazonTextractTopic1";

pub fn config() -> ProcessorConfig {
    ProcessorConfig::new(
        "arn:aws:iam::123456789012:role/TextractRole",
        "docs",
        "paystub.pdf",
        "us-east-1",
    )
}

pub fn resources() -> NotificationResources {
    NotificationResources {
        topic_arn: TOPIC_ARN.to_string(),
        queue_url: QUEUE_URL.to_string(),
        queue_arn: QUEUE_ARN.to_string(),
    }
}

/// Queue message carrying a Textract notification inside an SNS envelope.
pub fn notification(job_id: &str, status: &str) -> QueueMessage {
    let inner = json!({
        "JobId": job_id,
        "Status": status,
        "API": "StartDocumentAnalysis",
        "Timestamp": 1697270400000_i64,
        "DocumentLocation": {"S3ObjectName": "paystub.pdf", "S3Bucket": "docs"},
    });
    let envelope = json!({
        "Type": "Notification",
        "MessageId": format!("msg-{}", job_id),
        "TopicArn": TOPIC_ARN,
        "Message": inner.to_string(),
    });
    QueueMessage {
        message_id: Some(format!("msg-{}", job_id)),
        body: Some(envelope.to_string()),
        receipt_handle: Some(format!("rh-{}", job_id)),
    }
}

/// `n` pages chained by `token-<i>` continuation tokens.
pub fn chained_pages(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            let mut page = json!({
                "JobStatus": "SUCCEEDED",
                "DocumentMetadata": {"Pages": n},
                "Blocks": [
                    {"BlockType": "PAGE", "Id": format!("page-{}", i), "Page": i + 1},
                    {"BlockType": "QUERY_RESULT", "Text": format!("answer {}", i), "Confidence": 98.5},
                ],
            });
            if i + 1 < n {
                page["NextToken"] = json!(format!("token-{}", i + 1));
            }
            page
        })
        .collect()
}

pub struct FakeAnalysis {
    pub job_id: String,
    pub pages: Vec<Value>,
    pub fail_start: bool,
    /// Fails the request for the page at this index.
    pub fail_page: Option<usize>,
    pub starts: Mutex<Vec<AnalysisRequest>>,
    pub page_requests: Mutex<Vec<Option<String>>>,
}

impl FakeAnalysis {
    pub fn new(job_id: &str, pages: Vec<Value>) -> FakeAnalysis {
        FakeAnalysis {
            job_id: job_id.to_string(),
            pages,
            fail_start: false,
            fail_page: None,
            starts: Mutex::new(Vec::new()),
            page_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    pub fn page_requests(&self) -> Vec<Option<String>> {
        self.page_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisService for FakeAnalysis {
    type Page = Value;

    async fn start_document_analysis(&self, request: &AnalysisRequest) -> ServiceResult<String> {
        self.starts.lock().unwrap().push(request.clone());
        if self.fail_start {
            return Err(ServiceError::new(
                "StartDocumentAnalysis",
                "AccessDeniedException: not authorized",
            ));
        }
        Ok(self.job_id.clone())
    }

    async fn get_document_analysis(
        &self,
        job_id: &str,
        max_results: i32,
        next_token: Option<&str>,
    ) -> ServiceResult<Value> {
        assert_eq!(job_id, self.job_id);
        assert_eq!(max_results, 1000);
        self.page_requests
            .lock()
            .unwrap()
            .push(next_token.map(str::to_owned));

        let index = match next_token {
            None => 0,
            Some(token) => token
                .strip_prefix("token-")
                .and_then(|i| i.parse().ok())
                .expect("token issued by this fake"),
        };
        if self.fail_page == Some(index) {
            return Err(ServiceError::new(
                "GetDocumentAnalysis",
                "ProvisionedThroughputExceededException",
            ));
        }
        Ok(self.pages[index].clone())
    }
}

/// Hands out one scripted batch per receive, then empty batches forever.
pub struct FakeQueue {
    pub batches: Mutex<VecDeque<Vec<QueueMessage>>>,
    pub fail_receive: bool,
    pub fail_delete: bool,
    pub receives: AtomicUsize,
    pub deleted: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_call: Option<&'static str>,
}

impl FakeQueue {
    pub fn new(batches: Vec<Vec<QueueMessage>>) -> FakeQueue {
        FakeQueue {
            batches: Mutex::new(batches.into()),
            fail_receive: false,
            fail_delete: false,
            receives: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fail_call: None,
        }
    }

    pub fn receive_count(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str, arg: &str) -> ServiceResult<()> {
        self.calls.lock().unwrap().push(format!("{} {}", call, arg));
        if self.fail_call == Some(call) {
            return Err(ServiceError::new(call, "QueueDoesNotExist"));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageQueue for FakeQueue {
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
        _wait_secs: Option<i32>,
    ) -> ServiceResult<Vec<QueueMessage>> {
        assert_eq!(queue_url, QUEUE_URL);
        assert_eq!(max_messages, 10);
        self.receives.fetch_add(1, Ordering::SeqCst);
        if self.fail_receive {
            return Err(ServiceError::new("ReceiveMessage", "dispatch failure"));
        }
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn delete_message(&self, _queue_url: &str, receipt_handle: &str) -> ServiceResult<()> {
        if self.fail_delete {
            return Err(ServiceError::new("DeleteMessage", "ReceiptHandleIsInvalid"));
        }
        self.deleted
            .lock()
            .unwrap()
            .push(receipt_handle.to_string());
        Ok(())
    }

    async fn create_queue(&self, name: &str) -> ServiceResult<String> {
        self.record("CreateQueue", name)?;
        Ok(format!("https://sqs.us-east-1.amazonaws.com/123456789012/{}", name))
    }

    async fn get_queue_url(&self, name: &str) -> ServiceResult<String> {
        self.record("GetQueueUrl", name)?;
        Ok(format!("https://sqs.us-east-1.amazonaws.com/123456789012/{}", name))
    }

    async fn get_queue_arn(&self, queue_url: &str) -> ServiceResult<String> {
        self.record("GetQueueAttributes", queue_url)?;
        let name = queue_url.rsplit('/').next().unwrap_or_default();
        Ok(format!("arn:aws:sqs:us-east-1:123456789012:{}", name))
    }

    async fn set_queue_policy(&self, queue_url: &str, policy: &str) -> ServiceResult<()> {
        self.record("SetQueueAttributes", queue_url)?;
        self.calls.lock().unwrap().push(policy.to_string());
        Ok(())
    }

    async fn delete_queue(&self, queue_url: &str) -> ServiceResult<()> {
        self.record("DeleteQueue", queue_url)
    }
}

pub struct FakeTopic {
    pub calls: Mutex<Vec<String>>,
    pub fail_call: Option<&'static str>,
}

impl FakeTopic {
    pub fn new() -> FakeTopic {
        FakeTopic {
            calls: Mutex::new(Vec::new()),
            fail_call: None,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str, arg: &str) -> ServiceResult<()> {
        self.calls.lock().unwrap().push(format!("{} {}", call, arg));
        if self.fail_call == Some(call) {
            return Err(ServiceError::new(call, "AuthorizationError"));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationTopic for FakeTopic {
    async fn create_topic(&self, name: &str) -> ServiceResult<String> {
        self.record("CreateTopic", name)?;
        Ok(format!("arn:aws:sns:us-east-1:123456789012:{}", name))
    }

    async fn subscribe_queue(&self, topic_arn: &str, queue_arn: &str) -> ServiceResult<()> {
        self.record("Subscribe", &format!("{} -> {}", topic_arn, queue_arn))
    }

    async fn delete_topic(&self, topic_arn: &str) -> ServiceResult<()> {
        self.record("DeleteTopic", topic_arn)
    }
}
