use std::future;

use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::{NonMatchingPolicy, WaitOptions};
use crate::errors::{EnvelopeError, Result, TextractError};
use crate::job_status::JobStatusMsg;
use crate::services::{MessageQueue, QueueMessage};

/// Progress reported to the caller while waiting for a notification.
#[derive(Debug)]
pub enum WatchEvent<'a> {
    /// The queue had nothing for us; about to sleep.
    Idle,
    Mismatch(&'a JobStatusMsg),
    Malformed(&'a QueueMessage),
    Matched(&'a JobStatusMsg),
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

async fn delete_message<Q>(queue: &Q, queue_url: &str, message: &QueueMessage) -> Result<()>
where
    Q: MessageQueue + ?Sized,
{
    match &message.receipt_handle {
        Some(handle) => queue
            .delete_message(queue_url, handle)
            .await
            .map_err(TextractError::Delete),
        None => {
            warn!(message_id = ?message.message_id, "message has no receipt handle, cannot delete");
            Ok(())
        }
    }
}

/// Polls `queue_url` until a notification for `job_id` arrives.
///
/// Empty receives sleep `opts.poll_interval` and retry, without backoff.
/// The matching message is deleted; other messages are deleted only under
/// [`NonMatchingPolicy::Delete`]. Without `opts.timeout` and without
/// cancellation this never returns if the job's notification never shows up.
pub async fn watch_queue<Q, F>(
    queue: &Q,
    queue_url: &str,
    job_id: &str,
    opts: &WaitOptions,
    cancel: &CancelToken,
    mut on_event: F,
) -> Result<JobStatusMsg>
where
    Q: MessageQueue + ?Sized,
    F: FnMut(&WatchEvent<'_>),
{
    let deadline = opts.timeout.map(|t| Instant::now() + t);
    let timed_out = || TextractError::Timeout {
        job_id: job_id.to_owned(),
        waited: opts.timeout.unwrap_or_default(),
    };
    let cancelled = || TextractError::Cancelled {
        job_id: job_id.to_owned(),
    };

    loop {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let messages = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = deadline_reached(deadline) => return Err(timed_out()),
            received = queue.receive_messages(queue_url, opts.max_messages, opts.receive_wait_secs) => {
                received.map_err(TextractError::Receive)?
            }
        };

        if messages.is_empty() {
            debug!(job_id, "no notifications yet");
            on_event(&WatchEvent::Idle);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = deadline_reached(deadline) => return Err(timed_out()),
                _ = sleep(opts.poll_interval) => {}
            }
            continue;
        }

        let mut found: Option<JobStatusMsg> = None;
        for message in &messages {
            let parsed = match message.body.as_deref() {
                Some(body) => JobStatusMsg::from_queue_body(body),
                None => Err(EnvelopeError::MissingBody),
            };

            match parsed {
                Ok(msg) if msg.job_id == job_id => {
                    info!(job_id, status = %msg.status, "matching job found");
                    on_event(&WatchEvent::Matched(&msg));
                    delete_message(queue, queue_url, message).await?;
                    if found.is_none() {
                        found = Some(msg);
                    }
                }
                Ok(msg) => {
                    info!(job_id, other = %msg.job_id, status = %msg.status, "job didn't match");
                    on_event(&WatchEvent::Mismatch(&msg));
                    if opts.non_matching == NonMatchingPolicy::Delete {
                        delete_message(queue, queue_url, message).await?;
                    }
                }
                Err(e) => {
                    warn!(message_id = ?message.message_id, "skipping malformed notification: {}", e);
                    on_event(&WatchEvent::Malformed(message));
                    if opts.non_matching == NonMatchingPolicy::Delete {
                        delete_message(queue, queue_url, message).await?;
                    }
                }
            }
        }

        if let Some(msg) = found {
            return Ok(msg);
        }
    }
}
