use std::time::Duration;

use crate::domain::{ports::FileSearchApi, DomainError, UploadOperation};

/// How long-running operations are waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// Polls `operation` at a fixed interval until the vendor reports it done.
///
/// Cancelled by dropping the returned future. An operation that completes with
/// an error status is returned as `ExternalService`.
pub async fn wait_for_operation(
    api: &dyn FileSearchApi,
    operation: UploadOperation,
    policy: PollPolicy,
) -> Result<UploadOperation, DomainError> {
    let name = operation.name.clone();

    let poll = async {
        let mut operation = operation;
        let mut polls = 0u32;
        while !operation.done {
            tokio::time::sleep(policy.interval).await;
            operation = api.get_operation(&operation.name).await?;
            polls += 1;
            tracing::debug!(operation = %operation.name, polls, done = operation.done, "polled operation");
        }
        Ok::<_, DomainError>(operation)
    };

    let operation = match policy.timeout {
        Some(limit) => tokio::time::timeout(limit, poll).await.map_err(|_| {
            DomainError::timeout(format!(
                "operation {name} did not finish within {}s",
                limit.as_secs()
            ))
        })??,
        None => poll.await?,
    };

    if let Some(error) = &operation.error {
        return Err(DomainError::external(format!(
            "operation {name} failed: {} (code {})",
            error.message, error.code
        )));
    }

    Ok(operation)
}
