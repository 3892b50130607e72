//! 控制循环模块
//!
//! 固定节拍（默认 50Hz / 20ms）的协调循环：每个周期把最新指令状态
//! 写到设备、读回执行器位置和舱门状态、发布关节快照、对账舱门意图。
//!
//! # 周期内顺序
//!
//! 1. 取出并复位马达意图，下发 start/stop（一次性，失败即丢弃不重试）
//! 2. 下发全部在册的执行器目标（不清除，逐周期幂等重申，容忍设备偶发丢包）
//! 3. 批量读回位置，成功则发布 [`JointSnapshot`]；失败则计数记录、本周期
//!    不发布
//! 4. 无条件整组推送两组 LED 颜色（重复发送相同颜色是安全的）
//! 5. 读取舱门状态，对账意图（观测到目标状态即清除对应意图），再发布到
//!    舱门闸门
//! 6. 若仍有在途舱门意图，向对应极限位置驱动舱门（开门优先）
//! 7. 休眠到下一个节拍；超限则立即开始下一周期，错过的节拍直接跳过
//!    （不做补偿性的连续追赶）
//!
//! # 故障隔离
//!
//! 每个设备调用的失败独立处理：记录日志、累加计数，同一周期的后续步骤
//! 照常执行（LED 写失败不影响紧随其后的舱门状态读取），下一个周期照常
//! 开始。周期内不做自动重试。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use iboard_device::{
    Actuator, BASE_LED_COUNT, BoardDevice, LedGroup, MOUTH_LED_COUNT,
};
use spin_sleep::SpinSleeper;
use tracing::{debug, error, warn};

use crate::command::MotorIntent;
use crate::error::DriverError;
use crate::metrics::BoardMetrics;
use crate::state::{BoardContext, JointSnapshot};

/// 控制循环配置
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use iboard_driver::CycleConfig;
///
/// // 默认 50Hz（20ms 周期）
/// let config = CycleConfig::default();
/// assert_eq!(config.period, Duration::from_millis(20));
///
/// // 自定义周期
/// let config = CycleConfig {
///     period: Duration::from_millis(10),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleConfig {
    /// 周期节拍
    pub period: Duration,
}

impl CycleConfig {
    /// 默认节拍：50Hz
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(20);

    pub(crate) fn validate(&self) -> Result<(), DriverError> {
        if self.period.is_zero() {
            return Err(DriverError::Config(
                "cycle period must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
        }
    }
}

/// 控制循环线程体
///
/// 独占设备（值被移动进来，线程退出时随所有权释放），顺序执行周期步骤，
/// 直到 `running` 被清除。
pub(crate) fn cycle_loop(
    mut device: impl BoardDevice,
    ctx: Arc<BoardContext>,
    config: CycleConfig,
    running: Arc<AtomicBool>,
    metrics: Arc<BoardMetrics>,
) {
    let sleeper = SpinSleeper::default();
    let mut seq: u64 = 0;
    let mut next_tick = Instant::now() + config.period;

    // 单次设备读不允许拖过一个节拍
    device.set_read_timeout(config.period);

    debug!("cycle loop started, period {:?}", config.period);

    while running.load(Ordering::Relaxed) {
        seq += 1;
        metrics.cycles.fetch_add(1, Ordering::Relaxed);

        // 1. 马达意图：单临界区取出并复位，再下发
        let intents = ctx.commands.lock().take_motor_intents();
        for (motor, intent) in Actuator::ALL.into_iter().zip(intents) {
            let result = match intent {
                MotorIntent::Neutral => continue,
                MotorIntent::Start => device.start_motor(motor),
                MotorIntent::Stop => device.stop_motor(motor),
            };
            if let Err(e) = result {
                // 一次性指令，失败即丢弃（不跨周期重试），由调用方决定是否重发
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);
                warn!("motor command for {motor} failed: {e}");
            }
        }

        // 2. 执行器目标：读取即下发，不清除
        let targets = ctx.commands.lock().targets();
        for (actuator, target) in Actuator::ALL.into_iter().zip(targets) {
            if let Some(degrees) = target
                && let Err(e) = device.move_to(actuator, degrees)
            {
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);
                warn!("move_to {actuator} failed: {e}");
            }
        }

        // 3. 批量读回位置并发布快照
        match device.get_positions() {
            Ok(positions) => {
                ctx.publish_snapshot(
                    JointSnapshot {
                        seq,
                        positions_deg: positions,
                    },
                    &metrics,
                );
            }
            Err(e) => {
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);
                metrics.position_read_failures.fetch_add(1, Ordering::Relaxed);
                error!("get_positions failed: {e}");
            }
        }

        // 4. LED：整组平铺同色，无条件每周期推送
        let (base, mouth) = ctx.commands.lock().light_colors();
        if let Err(e) = device.set_led_colors(LedGroup::Base, &[base; BASE_LED_COUNT]) {
            metrics.device_errors.fetch_add(1, Ordering::Relaxed);
            warn!("set_led_colors base failed: {e}");
        }
        if let Err(e) = device.set_led_colors(LedGroup::Mouth, &[mouth; MOUTH_LED_COUNT]) {
            metrics.device_errors.fetch_add(1, Ordering::Relaxed);
            warn!("set_led_colors mouth failed: {e}");
        }

        // 5 + 6. 舱门：读取 → 对账 → 发布 → 驱动
        match device.get_door_status() {
            Ok(status) => {
                // 对账在发布之前：等待者醒来时对应意图位已清除
                let pending = ctx.commands.lock().reconcile_door(status);
                ctx.door.publish(status);
                if let Some(command) = pending
                    && let Err(e) = device.move_door(command.door_position())
                {
                    metrics.device_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("move_door {} failed: {e}", command.as_str());
                }
            }
            Err(e) => {
                // 状态未知时本周期不对账也不驱动舱门
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);
                warn!("get_door_status failed: {e}");
            }
        }

        // 7. 等待下一个节拍
        let now = Instant::now();
        if now < next_tick {
            sleeper.sleep(next_tick - now);
            next_tick += config.period;
        } else {
            metrics.cycle_overruns.fetch_add(1, Ordering::Relaxed);
            next_tick = now + config.period;
        }
    }

    debug!("cycle loop exiting after {seq} cycles");
}
