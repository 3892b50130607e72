//! # 交互板协调层
//!
//! 本模块在异步指令输入（执行器目标、LED 颜色、舱门开关请求、马达
//! 启停请求）和串口连接的交互板之间做固定节拍的协调，包括：
//!
//! - 指令状态管理（入口并发写、周期读取/复位，见 [`command`]）
//! - 控制循环（50Hz 默认节拍，逐周期写设备/读状态/发布快照）
//! - 舱门状态机（意图对账 + 条件变量阻塞等待，不忙等）
//! - 指标（原子计数器，见 [`metrics`]）
//!
//! # 使用场景
//!
//! 外部消息边界（话题订阅、服务处理器）持有 [`Board`]，把收到的消息
//! 翻译成类型化指令交给它；设备侧只需要一个 [`BoardDevice`]
//! 实现（硬件串口后端或 mock）。
//!
//! # Example
//!
//! ```no_run
//! use iboard_driver::{Board, DoorCommand};
//!
//! # fn example(device: impl iboard_device::BoardDevice + Send + 'static)
//! #     -> Result<(), iboard_driver::DriverError> {
//! let board = Board::connect(device)?;
//! board.set_target(iboard_driver::Actuator::Head, 0.5)?;
//! board.control_door(DoorCommand::Open)?; // 阻塞到舱门物理打开
//! # Ok(())
//! # }
//! ```

mod board;
mod builder;
pub mod command;
mod cycle;
mod door;
mod error;
pub mod metrics;
mod state;

pub use board::Board;
pub use builder::BoardBuilder;
pub use command::{Command, DoorCommand, MotorIntent};
pub use cycle::CycleConfig;
pub use error::DriverError;
pub use metrics::{BoardMetrics, MetricsSnapshot};
pub use state::JointSnapshot;

// 重新导出设备层词汇类型，方便上层只依赖本 crate
pub use iboard_device::{
    ACTUATOR_COUNT, Actuator, BoardDevice, DeviceError, DoorStatus, LedColor, LedGroup,
};
