//! 有界工作池 (Worker Pool)。
//!
//! 统计计算是 CPU 密集型的同步代码，不能在处理连接 I/O 的异步任务上直接执行。
//! `WorkerPool` 把任务交给 Tokio 的阻塞线程池执行，并用一个容量为 N 的信号量限制
//! 同时运行的任务数：拿到许可的任务运行，其余任务排队等待。Tokio 的信号量是公平的，
//! 排队的任务按提交顺序获得许可。
//!
//! 关闭 (`shutdown`) 是排空而不是取消：先拒绝新的提交，再等待所有运行中和排队中的
//! 任务完成，最后关闭信号量。

use crate::activity::ActivityCounter;
use crate::error::AppError;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// 有界工作池句柄，可廉价克隆，所有克隆共享同一组许可。
#[derive(Clone, Debug)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    permits: Arc<Semaphore>,
    size: usize,
    /// 已提交但尚未完成的任务（运行中 + 排队中）。
    in_flight: Arc<ActivityCounter>,
    closing: AtomicBool,
}

impl WorkerPool {
    /// 创建一个最多同时运行 `size` 个任务的工作池。
    pub fn new(size: usize) -> Result<Self, AppError> {
        if size == 0 || size > Semaphore::MAX_PERMITS {
            return Err(AppError::ConfigError(format!("工作池大小 {} 无效", size)));
        }
        info!("[工作池] 已创建，最大并发任务数: {}", size);
        Ok(Self {
            inner: Arc::new(PoolInner {
                permits: Arc::new(Semaphore::new(size)),
                size,
                in_flight: ActivityCounter::new(),
                closing: AtomicBool::new(false),
            }),
        })
    }

    /// 最大并发任务数。
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// 已提交但尚未完成的任务数（运行中 + 排队中）。
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.current()
    }

    /// 当前正在运行的任务数。
    pub fn running(&self) -> usize {
        self.inner.size - self.inner.permits.available_permits().min(self.inner.size)
    }

    pub fn is_closing(&self) -> bool {
        self.inner.closing.load(Ordering::SeqCst)
    }

    /// 提交一个计算任务并异步等待其结果。
    ///
    /// 所有许可都被占用时任务排队等待，而不是被拒绝。任务 panic 时返回
    /// `AppError::WorkerFailure`，许可随之归还，工作池不受影响。
    /// 开始关闭之后的提交返回 `AppError::ShutdownInProgress`。
    pub async fn submit<F, T>(&self, task: F) -> Result<T, AppError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        // 先登记再检查关闭标志：shutdown 要么看到这次登记并等待它，要么这里看到关闭标志
        let _in_flight = self.inner.in_flight.enter();
        if self.is_closing() {
            return Err(AppError::ShutdownInProgress);
        }

        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| AppError::ShutdownInProgress)?;

        // 许可随闭包移入阻塞线程，任务结束（或 panic 展开）时释放
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        })
        .await
        .map_err(|e| AppError::WorkerFailure(e.to_string()))
    }

    /// 排空并关闭工作池。
    ///
    /// 返回时，关闭开始之前提交的任务都已执行完毕。重复调用是安全的。
    pub async fn shutdown(&self) {
        if self.inner.closing.swap(true, Ordering::SeqCst) {
            debug!("[工作池] 已在关闭中，忽略重复的 shutdown 调用。");
        }
        info!("[工作池] 开始排空，未完成任务数: {}", self.in_flight());
        self.inner.in_flight.wait_idle().await;
        self.inner.permits.close();
        info!("[工作池] 已排空并关闭。");
    }
}
