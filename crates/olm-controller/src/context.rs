use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{ControllerError, Result};

/// Race a collaborator call against cancellation of the pass
pub async fn cancellable<T, F>(ctx: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if ctx.is_cancelled() {
        return Err(ControllerError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(ControllerError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok, block_on};

    #[test]
    fn test_passes_through_result() {
        let ctx = CancellationToken::new();
        let value = assert_ok!(block_on(cancellable(&ctx, async { Ok(7) })));
        assert_eq!(value, 7);

        let err = assert_err!(block_on(cancellable(&ctx, async {
            Err::<(), _>(ControllerError::Unpack("pod failed".into()))
        })));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancelled_before_start() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = assert_err!(block_on(cancellable(&ctx, async { Ok(()) })));
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_while_waiting() {
        let ctx = CancellationToken::new();
        let child = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            child.cancel();
        });
        let err = assert_err!(
            cancellable(&ctx, async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await
        );
        assert!(err.is_cancelled());
    }
}
