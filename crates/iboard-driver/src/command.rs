//! 指令类型与指令状态模块
//!
//! 定义入口侧的类型化指令集合，以及被入口处理器和控制循环共享的
//! [`CommandState`]。
//!
//! # 并发契约
//!
//! `CommandState` 整体放在一把 `parking_lot::Mutex` 后面（见
//! `BoardContext`），只通过本模块的访问方法操作：
//!
//! - 入口写入（目标、颜色、意图）是常数时间的单临界区更新，周期侧
//!   永远看不到撕裂的角度或颜色三元组；
//! - 周期侧的"读取并复位"序列（马达意图、舱门意图对账）各自是单临界区
//!   操作，与并发的入口写入之间不会丢失多于一条在途指令，也不会破坏状态。
//!
//! 临界区都很短，锁从不跨设备调用持有。

use std::str::FromStr;

use iboard_device::{ACTUATOR_COUNT, Actuator, DoorStatus, LedColor, LedGroup};

use crate::error::DriverError;

/// 马达一次性意图
///
/// 边沿触发：控制循环在每个周期开始时取出并复位为 [`Neutral`]
/// （至多消费一次），不是持续目标。
///
/// [`Neutral`]: MotorIntent::Neutral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorIntent {
    #[default]
    Neutral,
    Start,
    Stop,
}

/// 舱门指令（请求/应答操作的入参）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorCommand {
    Open,
    Close,
}

impl DoorCommand {
    /// 等待收敛的目标物理状态
    pub const fn target_status(self) -> DoorStatus {
        match self {
            DoorCommand::Open => DoorStatus::Open,
            DoorCommand::Close => DoorStatus::Closed,
        }
    }

    /// 对应的舱门编码器目标位置
    pub const fn door_position(self) -> i32 {
        match self {
            DoorCommand::Open => iboard_device::DOOR_OPEN_POSITION,
            DoorCommand::Close => iboard_device::DOOR_CLOSED_POSITION,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DoorCommand::Open => "open",
            DoorCommand::Close => "close",
        }
    }
}

impl FromStr for DoorCommand {
    type Err = DriverError;

    /// 只接受 `"open"` / `"close"`，其余值立即拒绝，不改动任何状态。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(DoorCommand::Open),
            "close" => Ok(DoorCommand::Close),
            other => Err(DriverError::InvalidDoorCommand(other.to_string())),
        }
    }
}

/// 话题侧（fire-and-forget）指令的类型化变体
///
/// 外部消息边界把话题消息翻译成这些变体后交给 `Board::dispatch`，由这个
/// 单一的类型化入口分发器消费，替代按话题注册回调的动态分发。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// 覆盖某个执行器的存储目标（弧度，入口处换算为整数度）
    SetTarget { actuator: Actuator, radians: f64 },
    /// 把某个灯组整组刷成一个颜色
    SetLight { group: LedGroup, color: LedColor },
}

/// 入口与控制循环共享的指令状态
///
/// 字段语义见各访问方法；生命周期为整个进程，启动时全部为中性默认值。
#[derive(Debug, Default)]
pub(crate) struct CommandState {
    /// 每个执行器的最新目标（度）；`None` 表示本周期不下发运动指令。
    /// 周期侧只读不清，最新写入者获胜。
    targets: [Option<i32>; ACTUATOR_COUNT],
    base_color: LedColor,
    mouth_color: LedColor,
    motor_intents: [MotorIntent; ACTUATOR_COUNT],
    should_open: bool,
    should_close: bool,
}

impl CommandState {
    /// 覆盖执行器目标（度）
    pub(crate) fn set_target_degrees(&mut self, actuator: Actuator, degrees: i32) {
        self.targets[actuator.index()] = Some(degrees);
    }

    /// 当前全部目标的副本（周期侧单临界区读取）
    pub(crate) fn targets(&self) -> [Option<i32>; ACTUATOR_COUNT] {
        self.targets
    }

    /// 整组刷新灯组颜色
    pub(crate) fn set_light(&mut self, group: LedGroup, color: LedColor) {
        match group {
            LedGroup::Base => self.base_color = color,
            LedGroup::Mouth => self.mouth_color = color,
        }
    }

    /// 当前 (底座, 嘴部) 颜色
    pub(crate) fn light_colors(&self) -> (LedColor, LedColor) {
        (self.base_color, self.mouth_color)
    }

    /// 设置马达一次性意图
    pub(crate) fn request_motor(&mut self, motor: Actuator, intent: MotorIntent) {
        self.motor_intents[motor.index()] = intent;
    }

    /// 取出全部马达意图并复位为中性
    ///
    /// 单临界区的"读取并复位"：每条意图至多被消费一次。
    pub(crate) fn take_motor_intents(&mut self) -> [MotorIntent; ACTUATOR_COUNT] {
        std::mem::take(&mut self.motor_intents)
    }

    /// 记录舱门意图；设置一个方向即清除另一个方向
    pub(crate) fn request_door(&mut self, command: DoorCommand) {
        match command {
            DoorCommand::Open => {
                self.should_open = true;
                self.should_close = false;
            }
            DoorCommand::Close => {
                self.should_close = true;
                self.should_open = false;
            }
        }
    }

    /// 用观测到的物理状态对账舱门意图，返回本周期仍需驱动的方向
    ///
    /// 观测到 Open 即清除 `should_open`、观测到 Closed 即清除
    /// `should_close`（无论意图由谁设置），保证陈旧意图不会在目标状态
    /// 达成后再次触发运动。若两个意图同时为真，开门优先，关门意图保留到
    /// 之后的周期。
    pub(crate) fn reconcile_door(&mut self, observed: DoorStatus) -> Option<DoorCommand> {
        match observed {
            DoorStatus::Open => self.should_open = false,
            DoorStatus::Closed => self.should_close = false,
            DoorStatus::Unknown => {}
        }
        if self.should_open {
            Some(DoorCommand::Open)
        } else if self.should_close {
            Some(DoorCommand::Close)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn door_flags(&self) -> (bool, bool) {
        (self.should_open, self.should_close)
    }
}
