//! Mock 交互板实现
//!
//! 无硬件依赖的 [`BoardDevice`] 实现，用于单元/集成测试和开发。
//!
//! # 能力
//!
//! - **调用记录**：记录所有运动、LED、马达、舱门指令，测试端通过
//!   [`MockHandle`] 读取。
//! - **舱门剧本**：`move_door` 之后，舱门状态经过可配置次数的状态读取
//!   （运动中报告 [`DoorStatus::Unknown`]）后到达目标状态；默认延迟为 0，
//!   即下一次读取即见到目标状态。
//! - **故障注入**：对每类操作注入"接下来 N 次调用失败"
//!   （返回 [`DeviceError::Timeout`]），用于验证控制循环的按调用隔离。
//!
//! [`MockBoard`] 持有状态的共享引用，因此可以先创建、再取 handle、
//! 然后把设备值移动进控制循环线程，测试端继续通过 handle 观察。

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    ACTUATOR_COUNT, Actuator, BoardDevice, DeviceError, DoorStatus, LedColor, LedGroup,
};

#[derive(Debug, Default)]
struct MockShared {
    positions: [i32; ACTUATOR_COUNT],
    door_status: DoorStatus,
    /// 舱门在途目标：(目标状态, 还需多少次状态读取才到达)
    door_transit: Option<(DoorStatus, u32)>,
    /// `move_door` 后额外的状态读取延迟（次数）
    door_move_latency: u32,

    moves: Vec<(Actuator, i32)>,
    led_writes: Vec<(LedGroup, Vec<LedColor>)>,
    motor_starts: Vec<Actuator>,
    motor_stops: Vec<Actuator>,
    door_moves: Vec<i32>,

    position_reads: u64,
    door_status_reads: u64,

    fail_moves: u32,
    fail_positions: u32,
    fail_leds: u32,
    fail_motors: u32,
    fail_door_status: u32,
    fail_door_moves: u32,
}

fn take_failure(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

/// Mock 交互板设备
///
/// 通过 [`MockBoard::handle`] 取得测试端句柄后，设备值可以被移动进
/// 控制循环线程。
pub struct MockBoard {
    shared: Arc<Mutex<MockShared>>,
}

impl MockBoard {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(MockShared::default())),
        }
    }

    /// 取得测试端句柄（可多次调用，可克隆）
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardDevice for MockBoard {
    fn move_to(&mut self, actuator: Actuator, target_degrees: i32) -> Result<(), DeviceError> {
        let mut s = self.shared.lock();
        if take_failure(&mut s.fail_moves) {
            return Err(DeviceError::Timeout);
        }
        trace!("mock move_to {actuator} -> {target_degrees}");
        s.moves.push((actuator, target_degrees));
        // 位置立即到位（本 mock 不模拟运动过程）
        s.positions[actuator.index()] = target_degrees;
        Ok(())
    }

    fn get_positions(&mut self) -> Result<[i32; ACTUATOR_COUNT], DeviceError> {
        let mut s = self.shared.lock();
        s.position_reads += 1;
        if take_failure(&mut s.fail_positions) {
            return Err(DeviceError::Timeout);
        }
        Ok(s.positions)
    }

    fn set_led_colors(&mut self, group: LedGroup, colors: &[LedColor]) -> Result<(), DeviceError> {
        let mut s = self.shared.lock();
        if take_failure(&mut s.fail_leds) {
            return Err(DeviceError::Timeout);
        }
        s.led_writes.push((group, colors.to_vec()));
        Ok(())
    }

    fn start_motor(&mut self, motor: Actuator) -> Result<(), DeviceError> {
        let mut s = self.shared.lock();
        if take_failure(&mut s.fail_motors) {
            return Err(DeviceError::Timeout);
        }
        s.motor_starts.push(motor);
        Ok(())
    }

    fn stop_motor(&mut self, motor: Actuator) -> Result<(), DeviceError> {
        let mut s = self.shared.lock();
        if take_failure(&mut s.fail_motors) {
            return Err(DeviceError::Timeout);
        }
        s.motor_stops.push(motor);
        Ok(())
    }

    fn get_door_status(&mut self) -> Result<DoorStatus, DeviceError> {
        let mut s = self.shared.lock();
        s.door_status_reads += 1;
        if take_failure(&mut s.fail_door_status) {
            return Err(DeviceError::Timeout);
        }
        let reported = s.door_status;
        // 在途舱门：本次仍报告旧状态/Unknown，倒计数归零后切换到目标
        if let Some((target, remaining)) = s.door_transit {
            if remaining <= 1 {
                s.door_status = target;
                s.door_transit = None;
            } else {
                s.door_transit = Some((target, remaining - 1));
            }
        }
        Ok(reported)
    }

    fn move_door(&mut self, position: i32) -> Result<(), DeviceError> {
        let mut s = self.shared.lock();
        if take_failure(&mut s.fail_door_moves) {
            return Err(DeviceError::Timeout);
        }
        trace!("mock move_door -> {position}");
        s.door_moves.push(position);
        let target = if position < 0 {
            DoorStatus::Open
        } else {
            DoorStatus::Closed
        };
        if s.door_move_latency == 0 {
            s.door_status = target;
            s.door_transit = None;
        } else if s.door_status != target {
            match s.door_transit {
                // 在途同向：重复指令不重置倒计数（控制循环逐周期重申）
                Some((current, _)) if current == target => {}
                _ => {
                    s.door_status = DoorStatus::Unknown;
                    s.door_transit = Some((target, s.door_move_latency));
                }
            }
        }
        Ok(())
    }
}

/// Mock 设备的测试端句柄
///
/// 克隆廉价；所有读取返回当前时刻的副本。
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<MockShared>>,
}

impl MockHandle {
    /// 设置批量读取返回的位置
    pub fn set_positions(&self, positions: [i32; ACTUATOR_COUNT]) {
        self.shared.lock().positions = positions;
    }

    /// 直接设置舱门状态（清除在途目标）
    pub fn set_door_status(&self, status: DoorStatus) {
        let mut s = self.shared.lock();
        s.door_status = status;
        s.door_transit = None;
    }

    /// 设置 `move_door` 之后的状态读取延迟次数
    ///
    /// 0（默认）表示下一次 `get_door_status` 即返回目标状态；
    /// N>0 表示接下来 N 次读取报告 `Unknown`（运动中），之后到达目标。
    pub fn set_door_move_latency(&self, reads: u32) {
        self.shared.lock().door_move_latency = reads;
    }

    pub fn fail_next_moves(&self, n: u32) {
        self.shared.lock().fail_moves = n;
    }

    pub fn fail_next_positions(&self, n: u32) {
        self.shared.lock().fail_positions = n;
    }

    pub fn fail_next_led_writes(&self, n: u32) {
        self.shared.lock().fail_leds = n;
    }

    pub fn fail_next_motor_commands(&self, n: u32) {
        self.shared.lock().fail_motors = n;
    }

    pub fn fail_next_door_status(&self, n: u32) {
        self.shared.lock().fail_door_status = n;
    }

    pub fn fail_next_door_moves(&self, n: u32) {
        self.shared.lock().fail_door_moves = n;
    }

    pub fn moves(&self) -> Vec<(Actuator, i32)> {
        self.shared.lock().moves.clone()
    }

    pub fn led_writes(&self) -> Vec<(LedGroup, Vec<LedColor>)> {
        self.shared.lock().led_writes.clone()
    }

    pub fn motor_starts(&self) -> Vec<Actuator> {
        self.shared.lock().motor_starts.clone()
    }

    pub fn motor_stops(&self) -> Vec<Actuator> {
        self.shared.lock().motor_stops.clone()
    }

    pub fn door_moves(&self) -> Vec<i32> {
        self.shared.lock().door_moves.clone()
    }

    pub fn door_status(&self) -> DoorStatus {
        self.shared.lock().door_status
    }

    pub fn position_reads(&self) -> u64 {
        self.shared.lock().position_reads
    }

    pub fn door_status_reads(&self) -> u64 {
        self.shared.lock().door_status_reads
    }

    /// 清空调用记录（不影响状态和故障计数）
    pub fn clear_log(&self) {
        let mut s = self.shared.lock();
        s.moves.clear();
        s.led_writes.clear();
        s.motor_starts.clear();
        s.motor_stops.clear();
        s.door_moves.clear();
    }
}
