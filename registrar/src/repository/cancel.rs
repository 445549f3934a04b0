//! Cooperative cancellation around store calls

use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::error::{RepositoryError, RepositoryOperation};
use super::traits::RepositoryResult;

/// Drive `call` unless `cancel` fires first.
///
/// An already-cancelled token fails without polling `call`, so no statement
/// reaches the store. When the token fires mid-flight the store future is
/// dropped, which aborts the round trip.
pub(crate) async fn cancellable<T, Fut>(
    cancel: &CancellationToken,
    operation: RepositoryOperation,
    call: Fut,
) -> RepositoryResult<T>
where
    Fut: Future<Output = RepositoryResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(RepositoryError::cancelled(operation));
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!(%operation, "store call cancelled");
            Err(RepositoryError::cancelled(operation))
        }
        result = call => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_precancelled_token_never_polls() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let polled = AtomicBool::new(false);

        let result: RepositoryResult<()> = cancellable(&cancel, RepositoryOperation::Add, async {
            polled.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(result.unwrap_err().is_cancelled());
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_while_pending() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result: RepositoryResult<u64> =
            cancellable(&cancel, RepositoryOperation::Query, async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(1)
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.operation, RepositoryOperation::Query);
    }

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let result = cancellable(&cancel, RepositoryOperation::Count, async { Ok(7_u64) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
