//! 未完成工作的计数器。
//!
//! 工作池用它统计已提交未完成的计算任务，消息分发器用它统计尚未写出响应的请求；
//! 关闭流程据此等待这些工作全部结束。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// 计数归零时唤醒所有等待者的计数器。
#[derive(Debug, Default)]
pub struct ActivityCounter {
    count: AtomicUsize,
    idle: Notify,
}

/// 存活期间计数加一；丢弃时（包括所在任务 panic 展开时）计数减一。
#[derive(Debug)]
pub struct ActivityGuard {
    counter: Arc<ActivityCounter>,
}

impl ActivityCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 登记一项新工作。
    pub fn enter(self: &Arc<Self>) -> ActivityGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        ActivityGuard { counter: Arc::clone(self) }
    }

    pub fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// 等待计数归零。
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // 先登记再检查，避免错过检查与等待之间发生的唤醒
            notified.as_mut().enable();
            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        if self.counter.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.counter.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_idle_returns_immediately_when_empty() {
        let counter = ActivityCounter::new();
        tokio::time::timeout(Duration::from_secs(1), counter.wait_idle())
            .await
            .expect("空计数器应立即返回");
    }

    #[tokio::test]
    async fn test_wait_idle_waits_for_all_guards() {
        let counter = ActivityCounter::new();
        let first = counter.enter();
        let second = counter.enter();
        assert_eq!(counter.current(), 2);

        let waiter = {
            let counter = Arc::clone(&counter);
            tokio::spawn(async move { counter.wait_idle().await })
        };

        drop(first);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "仍有未完成工作时不应返回");

        drop(second);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("计数归零后应返回")
            .expect("等待任务 panic");
        assert_eq!(counter.current(), 0);
    }
}
