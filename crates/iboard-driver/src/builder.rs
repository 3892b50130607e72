//! Builder 模式实现
//!
//! 提供链式构造 [`Board`] 实例的便捷方式。

use std::time::Duration;

use iboard_device::BoardDevice;

use crate::board::Board;
use crate::cycle::CycleConfig;
use crate::error::DriverError;

/// Board Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use iboard_driver::BoardBuilder;
///
/// # fn example(device: impl iboard_device::BoardDevice + Send + 'static)
/// #     -> Result<(), iboard_driver::DriverError> {
/// let board = BoardBuilder::new()
///     .rate_hz(50.0)
///     .door_timeout(Duration::from_secs(30))
///     .connect(device)?;
/// # Ok(())
/// # }
/// ```
pub struct BoardBuilder {
    period: Duration,
    rate_hz: Option<f64>,
    door_timeout: Option<Duration>,
    snapshot_capacity: usize,
}

impl BoardBuilder {
    /// 默认订阅通道容量
    pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 16;

    pub fn new() -> Self {
        Self {
            period: CycleConfig::DEFAULT_PERIOD,
            rate_hz: None,
            door_timeout: None,
            snapshot_capacity: Self::DEFAULT_SNAPSHOT_CAPACITY,
        }
    }

    /// 设置周期节拍（默认 20ms）
    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self.rate_hz = None;
        self
    }

    /// 以频率（Hz）设置节拍（与 [`period`](BoardBuilder::period) 二选一，
    /// 后设置者生效）
    pub fn rate_hz(mut self, rate_hz: f64) -> Self {
        self.rate_hz = Some(rate_hz);
        self
    }

    /// 设置舱门等待超时（默认无超时；生产部署建议配置一个上限）
    pub fn door_timeout(mut self, timeout: Duration) -> Self {
        self.door_timeout = Some(timeout);
        self
    }

    /// 设置快照订阅通道容量（默认 16）
    pub fn snapshot_capacity(mut self, capacity: usize) -> Self {
        self.snapshot_capacity = capacity;
        self
    }

    /// 连接设备并启动控制循环
    ///
    /// 校验配置后把设备移动进循环线程。配置不合法返回
    /// [`DriverError::Config`]，此时设备随作用域释放，没有发生任何
    /// 设备调用。
    pub fn connect(
        self,
        device: impl BoardDevice + Send + 'static,
    ) -> Result<Board, DriverError> {
        let period = match self.rate_hz {
            Some(rate_hz) => {
                if !rate_hz.is_finite() || rate_hz <= 0.0 {
                    return Err(DriverError::Config(format!(
                        "invalid rate_hz: {rate_hz} (must be > 0)"
                    )));
                }
                Duration::from_secs_f64(1.0 / rate_hz)
            }
            None => self.period,
        };
        let config = CycleConfig { period };
        config.validate()?;

        if self.snapshot_capacity == 0 {
            return Err(DriverError::Config(
                "snapshot_capacity must be at least 1".to_string(),
            ));
        }

        Board::spawn(device, config, self.door_timeout, self.snapshot_capacity)
    }
}

impl Default for BoardBuilder {
    fn default() -> Self {
        Self::new()
    }
}
