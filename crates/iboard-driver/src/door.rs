//! 舱门闸门：阻塞式舱门等待的同步原语
//!
//! 控制循环每个周期把观测到的舱门状态发布到闸门；`control_door` 的调用
//! 线程在闸门上等待状态收敛到目标。条件变量等待，**不是忙等**：等待期间
//! 不占用 CPU，也不阻塞控制循环或其他入口处理器。
//!
//! 等待是可取消的：协调器关闭时闸门被标记并唤醒全部等待者，等待返回
//! [`DriverError::ShuttingDown`] 而不是永远挂起。

use std::time::{Duration, Instant};

use iboard_device::DoorStatus;
use parking_lot::{Condvar, Mutex};

use crate::error::DriverError;

#[derive(Debug)]
struct GateState {
    status: DoorStatus,
    shutdown: bool,
}

pub(crate) struct DoorGate {
    inner: Mutex<GateState>,
    cond: Condvar,
}

impl DoorGate {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(GateState {
                status: DoorStatus::Unknown,
                shutdown: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// 当前舱门状态
    pub(crate) fn status(&self) -> DoorStatus {
        self.inner.lock().status
    }

    /// 发布一次周期观测；状态变化时唤醒全部等待者
    ///
    /// 调用方（控制循环）必须先完成意图对账再发布，这样等待者醒来返回时
    /// 对应的意图位已经被清除。
    pub(crate) fn publish(&self, status: DoorStatus) {
        let mut state = self.inner.lock();
        if state.status != status {
            state.status = status;
            self.cond.notify_all();
        }
    }

    /// 标记关闭并唤醒全部等待者
    pub(crate) fn shutdown(&self) {
        let mut state = self.inner.lock();
        state.shutdown = true;
        self.cond.notify_all();
    }

    /// 阻塞等待状态收敛到 `target`
    ///
    /// 只挂起调用线程。`timeout` 为 `None` 时无限等待；
    /// 为 `Some` 时超过期限返回 [`DriverError::DoorTimeout`]。
    /// 关闭中/关闭后的等待返回 [`DriverError::ShuttingDown`]。
    pub(crate) fn wait_for(
        &self,
        target: DoorStatus,
        timeout: Option<Duration>,
    ) -> Result<(), DriverError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.inner.lock();
        loop {
            if state.shutdown {
                return Err(DriverError::ShuttingDown);
            }
            if state.status == target {
                return Ok(());
            }
            match deadline {
                None => self.cond.wait(&mut state),
                Some(deadline) => {
                    if self.cond.wait_until(&mut state, deadline).timed_out() {
                        // 醒来后状态可能恰好已变化，最后看一眼再判超时
                        if state.shutdown {
                            return Err(DriverError::ShuttingDown);
                        }
                        if state.status == target {
                            return Ok(());
                        }
                        return Err(DriverError::DoorTimeout {
                            timeout_ms: timeout.unwrap_or_default().as_millis() as u64,
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_immediately_when_already_at_target() {
        let gate = DoorGate::new();
        gate.publish(DoorStatus::Open);
        gate.wait_for(DoorStatus::Open, None).unwrap();
    }

    #[test]
    fn test_wait_wakes_on_publish() {
        let gate = Arc::new(DoorGate::new());
        gate.publish(DoorStatus::Closed);

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_for(DoorStatus::Open, Some(Duration::from_secs(5))))
        };

        thread::sleep(Duration::from_millis(20));
        gate.publish(DoorStatus::Unknown);
        thread::sleep(Duration::from_millis(20));
        gate.publish(DoorStatus::Open);

        waiter.join().unwrap().unwrap();
        assert_eq!(gate.status(), DoorStatus::Open);
    }

    #[test]
    fn test_wait_times_out() {
        let gate = DoorGate::new();
        let started = Instant::now();
        let err = gate
            .wait_for(DoorStatus::Open, Some(Duration::from_millis(30)))
            .unwrap_err();
        assert!(matches!(err, DriverError::DoorTimeout { timeout_ms: 30 }));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_shutdown_interrupts_wait() {
        let gate = Arc::new(DoorGate::new());

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_for(DoorStatus::Open, None))
        };

        thread::sleep(Duration::from_millis(20));
        gate.shutdown();

        let err = waiter.join().unwrap().unwrap_err();
        assert!(matches!(err, DriverError::ShuttingDown));
    }

    #[test]
    fn test_wait_after_shutdown_fails_fast() {
        let gate = DoorGate::new();
        gate.shutdown();
        let err = gate.wait_for(DoorStatus::Closed, None).unwrap_err();
        assert!(matches!(err, DriverError::ShuttingDown));
    }
}
