//! 协作式取消
//!
//! 基于 `tokio::sync::watch`：发送端置 `true` 即请求取消

use tokio::sync::watch;

/// 取消请求端
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// 取消监听端
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    pub fn channel() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, Self { rx })
    }

    /// 永远不会被取消
    pub fn never() -> Self {
        Self::channel().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等到取消为止；发送端全部丢弃且未取消时永远挂起
    pub async fn cancelled(&mut self) {
        let cancelled = self.rx.wait_for(|c| *c).await.is_ok();
        if !cancelled {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (handle, mut cancellation) = Cancellation::channel();
        assert!(!cancellation.is_cancelled());

        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), cancellation.cancelled())
            .await
            .unwrap();
        assert!(cancellation.is_cancelled());
    }

    #[tokio::test]
    async fn test_never_stays_pending() {
        let mut cancellation = Cancellation::never();
        let waited = tokio::time::timeout(Duration::from_millis(50), cancellation.cancelled()).await;
        assert!(waited.is_err());
        assert!(!cancellation.is_cancelled());
    }
}
