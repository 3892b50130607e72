//! Driver 模块错误类型定义

use iboard_device::{Actuator, DeviceError, UnknownActuator};
use thiserror::Error;

/// Driver 模块错误类型
///
/// 启动期错误（配置、设备打开）是致命的。周期内的设备错误不会出现在
/// 这里：控制循环按调用隔离并记录它们（见 `cycle`），只有入口校验和
/// 阻塞等待的失败会返回给调用方。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 设备层错误
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// 马达/执行器名称不在固定集合内（入口边界拒绝，不改动任何状态）
    #[error(transparent)]
    UnknownActuator(#[from] UnknownActuator),

    /// 舱门指令不是 "open" / "close"
    #[error("invalid door command: {0:?} (expected \"open\" or \"close\")")]
    InvalidDoorCommand(String),

    /// 目标角度不是有限值（NaN / ±inf）
    #[error("non-finite target for {actuator}: {value}")]
    InvalidTarget { actuator: Actuator, value: f64 },

    /// 舱门等待超时
    #[error("door wait timed out after {timeout_ms} ms")]
    DoorTimeout { timeout_ms: u64 },

    /// 协调器正在关闭（挂起中的舱门等待被唤醒并返回此错误）
    #[error("coordinator is shutting down")]
    ShuttingDown,

    /// 周期线程错误
    #[error("cycle thread error: {0}")]
    CycleThread(String),

    /// 配置不合法
    #[error("invalid configuration: {0}")]
    Config(String),
}
