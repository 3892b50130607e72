//! # Interaction Board Device Layer
//!
//! 交互板硬件抽象层，提供统一的设备能力接口。
//!
//! 本 crate 只定义设备能力的**词汇表和契约**（执行器、LED 组、舱门、马达），
//! 不包含串口传输协议的实现。硬件后端（串口帧编码、校验和等）由外部 crate
//! 实现 [`BoardDevice`] trait 接入；`mock` feature 提供无硬件的
//! [`mock::MockBoard`]，用于测试和开发。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[cfg(feature = "mock")]
pub mod mock;

/// 旋转执行器数量（head / neck / camera）
pub const ACTUATOR_COUNT: usize = 3;

/// 底座 LED 灯珠数量
pub const BASE_LED_COUNT: usize = 42;

/// 嘴部 LED 灯珠数量
pub const MOUTH_LED_COUNT: usize = 4;

/// 舱门全开位置（编码器计数）
pub const DOOR_OPEN_POSITION: i32 = -30000;

/// 舱门全关位置（编码器计数）
pub const DOOR_CLOSED_POSITION: i32 = 30000;

/// 旋转执行器标识
///
/// 固定的三个旋转关节。[`Actuator::ALL`] 的顺序同时也是
/// `get_positions()` 批量读取和关节快照的顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    Head,
    Neck,
    Camera,
}

impl Actuator {
    /// 全部执行器（固定顺序）
    pub const ALL: [Actuator; ACTUATOR_COUNT] = [Actuator::Head, Actuator::Neck, Actuator::Camera];

    /// 在 [`Actuator::ALL`] 中的下标
    pub const fn index(self) -> usize {
        match self {
            Actuator::Head => 0,
            Actuator::Neck => 1,
            Actuator::Camera => 2,
        }
    }

    /// 名称（与上位指令中的执行器/马达 id 一致）
    pub const fn as_str(self) -> &'static str {
        match self {
            Actuator::Head => "head",
            Actuator::Neck => "neck",
            Actuator::Camera => "camera",
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 执行器名称解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown actuator: {0:?} (expected \"head\", \"neck\" or \"camera\")")]
pub struct UnknownActuator(pub String);

impl FromStr for Actuator {
    type Err = UnknownActuator;

    /// 只接受固定集合中的小写名称，其余一律拒绝。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(Actuator::Head),
            "neck" => Ok(Actuator::Neck),
            "camera" => Ok(Actuator::Camera),
            other => Err(UnknownActuator(other.to_string())),
        }
    }
}

/// LED 灯组标识
///
/// 每组的灯珠数量是编译期常量：底座 42 颗、嘴部 4 颗。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedGroup {
    Base,
    Mouth,
}

impl LedGroup {
    /// 灯组的灯珠数量
    pub const fn led_count(self) -> usize {
        match self {
            LedGroup::Base => BASE_LED_COUNT,
            LedGroup::Mouth => MOUTH_LED_COUNT,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LedGroup::Base => "base",
            LedGroup::Mouth => "mouth",
        }
    }
}

impl fmt::Display for LedGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RGB 颜色（每通道 8 位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl LedColor {
    /// 全灭
    pub const OFF: LedColor = LedColor::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// 舱门物理状态
///
/// 每个控制周期从设备读取一次；`Unknown` 覆盖运动中/不确定两种情况。
/// 指令永远不能直接设置舱门状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoorStatus {
    Open,
    Closed,
    #[default]
    Unknown,
}

/// 设备层统一错误类型
///
/// 所有 [`BoardDevice`] 操作都可能单独失败；上层（控制循环）按调用隔离
/// 处理这些错误，不在设备层做重试。
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Read timeout")]
    Timeout,
    #[error("Protocol error: {message}")]
    Protocol { message: String },
    #[error("Device disconnected")]
    Disconnected,
    #[error("no device backend for endpoint {endpoint:?} (use \"mock\" with the `mock` feature, or link a hardware backend)")]
    NoBackend { endpoint: String },
}

/// 交互板设备能力接口
///
/// 所有操作均为同步调用，且**各自独立可失败**。实现方负责传输层细节
/// （帧编码、校验和、重连），调用方只看到这些动作/状态原语。
///
/// # 契约
///
/// - [`move_to`](BoardDevice::move_to)：下发运动指令，不等待到位。
/// - [`get_positions`](BoardDevice::get_positions)：单次批量读取全部三个
///   执行器位置（度），顺序与 [`Actuator::ALL`] 一致。
/// - [`set_led_colors`](BoardDevice::set_led_colors)：整组替换灯组颜色。
/// - [`start_motor`](BoardDevice::start_motor) /
///   [`stop_motor`](BoardDevice::stop_motor)：边沿触发，不查询运行状态。
/// - [`get_door_status`](BoardDevice::get_door_status)：读取舱门状态。
/// - [`move_door`](BoardDevice::move_door)：向指定编码器位置驱动舱门
///   （[`DOOR_OPEN_POSITION`] / [`DOOR_CLOSED_POSITION`]）。
///
/// # 生命周期
///
/// 设备在进程启动时打开一次，整个进程生命周期内持有；值被移动进控制循环
/// 线程，线程退出（含启动失败的提前返回路径）时随所有权释放。
pub trait BoardDevice {
    /// 命令执行器运动到目标角度（度）
    fn move_to(&mut self, actuator: Actuator, target_degrees: i32) -> Result<(), DeviceError>;

    /// 批量读取全部执行器当前位置（度），顺序与 [`Actuator::ALL`] 一致
    fn get_positions(&mut self) -> Result<[i32; ACTUATOR_COUNT], DeviceError>;

    /// 整组写入灯组颜色
    ///
    /// `colors` 的长度应等于 [`LedGroup::led_count`]。
    fn set_led_colors(&mut self, group: LedGroup, colors: &[LedColor]) -> Result<(), DeviceError>;

    /// 启动马达（边沿触发）
    fn start_motor(&mut self, motor: Actuator) -> Result<(), DeviceError>;

    /// 停止马达（边沿触发）
    fn stop_motor(&mut self, motor: Actuator) -> Result<(), DeviceError>;

    /// 读取舱门状态
    fn get_door_status(&mut self) -> Result<DoorStatus, DeviceError>;

    /// 向目标编码器位置驱动舱门
    fn move_door(&mut self, position: i32) -> Result<(), DeviceError>;

    /// 设置读操作超时（后端可选实现）
    fn set_read_timeout(&mut self, _timeout: Duration) {}
}

impl std::fmt::Debug for dyn BoardDevice + Send {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn BoardDevice + Send")
    }
}

impl<T: BoardDevice + ?Sized> BoardDevice for Box<T> {
    fn move_to(&mut self, actuator: Actuator, target_degrees: i32) -> Result<(), DeviceError> {
        (**self).move_to(actuator, target_degrees)
    }

    fn get_positions(&mut self) -> Result<[i32; ACTUATOR_COUNT], DeviceError> {
        (**self).get_positions()
    }

    fn set_led_colors(&mut self, group: LedGroup, colors: &[LedColor]) -> Result<(), DeviceError> {
        (**self).set_led_colors(group, colors)
    }

    fn start_motor(&mut self, motor: Actuator) -> Result<(), DeviceError> {
        (**self).start_motor(motor)
    }

    fn stop_motor(&mut self, motor: Actuator) -> Result<(), DeviceError> {
        (**self).stop_motor(motor)
    }

    fn get_door_status(&mut self) -> Result<DoorStatus, DeviceError> {
        (**self).get_door_status()
    }

    fn move_door(&mut self, position: i32) -> Result<(), DeviceError> {
        (**self).move_door(position)
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        (**self).set_read_timeout(timeout)
    }
}

/// 按端点打开设备
///
/// `endpoint` 是标识设备传输端点的外部参数（如串口路径）。`"mock"` 前缀的
/// 端点在启用 `mock` feature 时返回 [`mock::MockBoard`]（开发用端点）；
/// 其余端点在没有链接硬件后端时返回 [`DeviceError::NoBackend`]。
pub fn open(endpoint: &str) -> Result<Box<dyn BoardDevice + Send>, DeviceError> {
    #[cfg(feature = "mock")]
    if endpoint == "mock" || endpoint.starts_with("mock:") {
        tracing::info!("opening mock interaction board for endpoint {endpoint:?}");
        return Ok(Box::new(mock::MockBoard::new()));
    }

    Err(DeviceError::NoBackend {
        endpoint: endpoint.to_string(),
    })
}
