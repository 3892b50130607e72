//! 共享状态结构定义
//!
//! [`BoardContext`] 聚合入口处理器和控制循环之间的全部共享可变状态：
//!
//! - 指令状态：短临界区 Mutex（入口写、周期读取/复位）
//! - 最新关节快照：ArcSwap，无锁读取，适合高频观察
//! - 舱门闸门：Mutex + Condvar，承载阻塞式舱门等待
//! - 快照订阅者：有界通道扇出，满即丢弃

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use crossbeam_channel::{Sender, TrySendError};
use iboard_device::{ACTUATOR_COUNT, Actuator};
use parking_lot::Mutex;

use crate::command::CommandState;
use crate::door::DoorGate;
use crate::metrics::BoardMetrics;

/// 关节快照：一次批量位置读取的结果
///
/// 每个成功的批量读取发布一次；读取失败的周期**不发布任何内容**
/// （绝不悄悄重发上一次的值），消费者可以通过 `seq` 的空洞观察到缺失。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointSnapshot {
    /// 产生本快照的周期序号（从 1 开始单调递增）
    pub seq: u64,
    /// 全部执行器位置（度），顺序与 [`Actuator::ALL`] 一致
    pub positions_deg: [i32; ACTUATOR_COUNT],
}

impl JointSnapshot {
    /// 单个执行器的位置（度）
    pub fn position(&self, actuator: Actuator) -> i32 {
        self.positions_deg[actuator.index()]
    }

    /// (执行器, 位置) 对，快照的对外发布形态
    pub fn joints(&self) -> [(Actuator, i32); ACTUATOR_COUNT] {
        let mut out = [(Actuator::Head, 0); ACTUATOR_COUNT];
        for (slot, actuator) in out.iter_mut().zip(Actuator::ALL) {
            *slot = (actuator, self.positions_deg[actuator.index()]);
        }
        out
    }
}

/// 协调器共享上下文
pub(crate) struct BoardContext {
    pub(crate) commands: Mutex<CommandState>,
    pub(crate) latest: ArcSwapOption<JointSnapshot>,
    pub(crate) door: DoorGate,
    pub(crate) subscribers: Mutex<Vec<Sender<JointSnapshot>>>,
}

impl BoardContext {
    pub(crate) fn new() -> Self {
        Self {
            commands: Mutex::new(CommandState::default()),
            latest: ArcSwapOption::const_empty(),
            door: DoorGate::new(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// 发布一个关节快照：更新最新值并扇出到所有订阅者
    ///
    /// 订阅通道满时丢弃本条并计数（最新值仍可通过 ArcSwap 读到）；
    /// 已断开的订阅者被移除。
    pub(crate) fn publish_snapshot(&self, snapshot: JointSnapshot, metrics: &BoardMetrics) {
        self.latest.store(Some(Arc::new(snapshot)));

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(snapshot) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                metrics
                    .snapshots_dropped
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}
