use tracing::debug;

use crate::cancel::CancelToken;
use crate::errors::{Result, TextractError};
use crate::services::{AnalysisService, ResultPage};

/// Fetches every result page of `job_id`, earliest first, following
/// continuation tokens until a page comes back without one.
pub async fn collect_pages<A>(
    service: &A,
    job_id: &str,
    max_results: i32,
    cancel: &CancelToken,
) -> Result<Vec<A::Page>>
where
    A: AnalysisService + ?Sized,
{
    let mut pages = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(TextractError::Cancelled {
                job_id: job_id.to_owned(),
            });
        }

        let page = service
            .get_document_analysis(job_id, max_results, next_token.as_deref())
            .await
            .map_err(|source| TextractError::Pagination {
                job_id: job_id.to_owned(),
                pages_fetched: pages.len(),
                source,
            })?;

        next_token = page.next_token().map(str::to_owned);
        pages.push(page);
        debug!(job_id, page = pages.len(), more = next_token.is_some(), "fetched result page");

        if next_token.is_none() {
            return Ok(pages);
        }
    }
}
