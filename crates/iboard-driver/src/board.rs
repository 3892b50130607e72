//! Board API 模块
//!
//! 提供对外的 [`Board`] 结构体，封装控制循环线程和共享状态细节。
//! 入口处理器（消息边界的话题/服务回调）通过它写入指令状态；
//! 观察者通过它读取关节快照、舱门状态和指标。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use iboard_device::{Actuator, BoardDevice, DoorStatus, LedColor, LedGroup};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::builder::BoardBuilder;
use crate::command::{Command, DoorCommand, MotorIntent};
use crate::cycle::{CycleConfig, cycle_loop};
use crate::error::DriverError;
use crate::metrics::{BoardMetrics, MetricsSnapshot};
use crate::state::{BoardContext, JointSnapshot};

/// 交互板协调器（对外 API）
///
/// 拥有控制循环线程；设备值在 [`connect`](Board::connect) 时被移动进
/// 循环线程，线程退出时释放。入口方法全部是常数时间的非阻塞状态更新
/// （[`control_door`](Board::control_door) 除外，它按契约阻塞调用线程
/// 直到舱门物理状态收敛）。
///
/// `Drop` 时自动 [`shutdown`](Board::shutdown)：清除运行标志、唤醒全部
/// 舱门等待者、join 循环线程。
pub struct Board {
    ctx: Arc<BoardContext>,
    metrics: Arc<BoardMetrics>,
    running: Arc<AtomicBool>,
    cycle_thread: Mutex<Option<JoinHandle<()>>>,
    door_timeout: Option<Duration>,
    snapshot_capacity: usize,
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("door_timeout", &self.door_timeout)
            .field("snapshot_capacity", &self.snapshot_capacity)
            .finish_non_exhaustive()
    }
}

impl Board {
    /// 用默认配置连接设备并启动控制循环
    ///
    /// 等价于 `BoardBuilder::new().connect(device)`。
    pub fn connect(device: impl BoardDevice + Send + 'static) -> Result<Self, DriverError> {
        BoardBuilder::new().connect(device)
    }

    pub(crate) fn spawn(
        device: impl BoardDevice + Send + 'static,
        config: CycleConfig,
        door_timeout: Option<Duration>,
        snapshot_capacity: usize,
    ) -> Result<Self, DriverError> {
        let ctx = Arc::new(BoardContext::new());
        let metrics = Arc::new(BoardMetrics::new());
        let running = Arc::new(AtomicBool::new(true));

        let thread_ctx = Arc::clone(&ctx);
        let thread_running = Arc::clone(&running);
        let thread_metrics = Arc::clone(&metrics);
        let cycle_thread = std::thread::Builder::new()
            .name("iboard-cycle".to_string())
            .spawn(move || {
                cycle_loop(device, thread_ctx, config, thread_running, thread_metrics);
            })
            .map_err(|e| DriverError::CycleThread(format!("failed to spawn: {e}")))?;

        info!("interaction board coordinator started");

        Ok(Self {
            ctx,
            metrics,
            running,
            cycle_thread: Mutex::new(Some(cycle_thread)),
            door_timeout,
            snapshot_capacity,
        })
    }

    // ==================== 入口：fire-and-forget ====================

    /// 类型化入口分发器：消费一条话题侧指令
    ///
    /// 常数时间、非阻塞；入口校验失败（未知执行器由类型系统排除，
    /// 非有限目标值）返回错误且不改动任何状态。
    pub fn dispatch(&self, command: Command) -> Result<(), DriverError> {
        match command {
            Command::SetTarget { actuator, radians } => self.set_target(actuator, radians),
            Command::SetLight { group, color } => {
                self.set_light(group, color);
                Ok(())
            }
        }
    }

    /// 覆盖执行器目标（弧度）
    ///
    /// 入口边界完成弧度→度换算：`radians.to_degrees().round()`
    /// （四舍五入，半数远离零）。设备接口始终使用整数度。
    /// 非有限值（NaN / ±inf）被拒绝，不改动存储的目标。
    pub fn set_target(&self, actuator: Actuator, radians: f64) -> Result<(), DriverError> {
        if !radians.is_finite() {
            return Err(DriverError::InvalidTarget {
                actuator,
                value: radians,
            });
        }
        let degrees = radians.to_degrees().round() as i32;
        self.ctx.commands.lock().set_target_degrees(actuator, degrees);
        Ok(())
    }

    /// 覆盖执行器目标（度）
    pub fn set_target_degrees(&self, actuator: Actuator, degrees: i32) {
        self.ctx.commands.lock().set_target_degrees(actuator, degrees);
    }

    /// 整组刷新灯组颜色
    pub fn set_light(&self, group: LedGroup, color: LedColor) {
        self.ctx.commands.lock().set_light(group, color);
    }

    // ==================== 入口：请求/应答 ====================

    /// 请求启动马达：设置一次性意图后立即返回
    ///
    /// 不等待设备确认马达实际运转；意图在下一个周期被消费。
    pub fn start_motor(&self, motor: Actuator) -> Result<(), DriverError> {
        self.ctx
            .commands
            .lock()
            .request_motor(motor, MotorIntent::Start);
        Ok(())
    }

    /// 请求停止马达：设置一次性意图后立即返回
    pub fn stop_motor(&self, motor: Actuator) -> Result<(), DriverError> {
        self.ctx
            .commands
            .lock()
            .request_motor(motor, MotorIntent::Stop);
        Ok(())
    }

    /// 按名称启动马达（消息边界入口；未知名称拒绝，不改动状态）
    pub fn start_motor_named(&self, name: &str) -> Result<(), DriverError> {
        let motor: Actuator = name.parse()?;
        self.start_motor(motor)
    }

    /// 按名称停止马达
    pub fn stop_motor_named(&self, name: &str) -> Result<(), DriverError> {
        let motor: Actuator = name.parse()?;
        self.stop_motor(motor)
    }

    /// 舱门控制（阻塞式请求/应答）
    ///
    /// 记录舱门意图（同时清除反方向意图），然后**只挂起调用线程**，
    /// 直到后续控制周期观测到舱门到达目标状态。等待经由条件变量，
    /// 不忙等，也不会阻塞控制循环或其他入口处理器。
    ///
    /// # 错误
    ///
    /// - [`DriverError::DoorTimeout`]：配置了
    ///   [`door_timeout`](BoardBuilder::door_timeout) 且等待超时
    /// - [`DriverError::ShuttingDown`]：等待期间协调器关闭
    pub fn control_door(&self, command: DoorCommand) -> Result<(), DriverError> {
        self.ctx.commands.lock().request_door(command);
        debug!("door request: {}", command.as_str());
        self.ctx
            .door
            .wait_for(command.target_status(), self.door_timeout)
    }

    /// 舱门控制，单次调用级超时（覆盖构建时配置）
    pub fn control_door_deadline(
        &self,
        command: DoorCommand,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        self.ctx.commands.lock().request_door(command);
        debug!("door request: {} (timeout {timeout:?})", command.as_str());
        self.ctx.door.wait_for(command.target_status(), Some(timeout))
    }

    /// 按字符串值的舱门控制（消息边界入口）
    ///
    /// 只接受 `"open"` / `"close"`；其余值立即返回错误，不改动状态、
    /// 不阻塞。
    pub fn control_door_named(&self, value: &str) -> Result<(), DriverError> {
        let command: DoorCommand = value.parse()?;
        self.control_door(command)
    }

    // ==================== 观察 ====================

    /// 最新成功发布的关节快照（还没有成功读取过时为 `None`）
    pub fn latest_joints(&self) -> Option<JointSnapshot> {
        self.ctx.latest.load_full().map(|snapshot| *snapshot)
    }

    /// 订阅逐周期的关节快照
    ///
    /// 有界通道；消费太慢时新快照被丢弃并计入
    /// `snapshots_dropped`（最新值总是可以通过
    /// [`latest_joints`](Board::latest_joints) 读到）。
    pub fn subscribe(&self) -> Receiver<JointSnapshot> {
        let (tx, rx) = crossbeam_channel::bounded(self.snapshot_capacity);
        self.ctx.subscribers.lock().push(tx);
        rx
    }

    /// 最近一次周期观测到的舱门状态
    pub fn door_status(&self) -> DoorStatus {
        self.ctx.door.status()
    }

    /// 指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // ==================== 生命周期 ====================

    /// 关闭协调器
    ///
    /// 清除运行标志、唤醒全部挂起的舱门等待者（它们返回
    /// [`DriverError::ShuttingDown`]）、join 循环线程。幂等，可在任意
    /// 线程调用；`Drop` 也会调用。
    pub fn shutdown(&self) {
        let handle = self.cycle_thread.lock().take();
        if let Some(handle) = handle {
            info!("shutting down interaction board coordinator");
            self.running.store(false, Ordering::Relaxed);
            self.ctx.door.shutdown();
            if handle.join().is_err() {
                tracing::error!("cycle thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Board {
    fn drop(&mut self) {
        self.shutdown();
    }
}
