//! # iboard-cli
//!
//! 交互板协调守护进程：打开设备端点、以固定节拍运行控制循环、周期性
//! 打印关节状态和指标，直到收到 Ctrl-C。
//!
//! ```bash
//! # 硬件端点（由外部后端 crate 提供）
//! iboard-cli --port /dev/ttyUSB0
//!
//! # 开发环境：mock 设备
//! IBOARD_PORT=mock iboard-cli
//! ```
//!
//! 设备端点是唯一必需的外部参数；缺失时进程打印诊断并退出，
//! **不会发生任何设备调用**。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

/// 交互板协调守护进程
#[derive(Parser, Debug)]
#[command(name = "iboard-cli")]
#[command(about = "Coordinator daemon for the interaction board", long_about = None)]
#[command(version)]
struct Cli {
    /// 设备传输端点（如 /dev/ttyUSB0；开发环境可用 "mock"）
    #[arg(long, env = "IBOARD_PORT")]
    port: Option<String>,

    /// 控制循环频率（Hz）
    #[arg(long, default_value_t = 50.0)]
    rate: f64,

    /// 舱门等待超时（毫秒；0 表示不超时）
    #[arg(long, default_value_t = 0)]
    door_timeout_ms: u64,

    /// 运行时长（秒；不指定则运行到 Ctrl-C，用于冒烟/演示）
    #[arg(long)]
    duration: Option<u64>,
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("iboard_cli=info".parse().unwrap())
                .add_directive("iboard_driver=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    // 唯一必需的外部参数：设备端点。缺失即致命，此时还没有任何设备调用。
    let Some(port) = cli.port else {
        bail!("missing required configuration: device endpoint (set --port or IBOARD_PORT)");
    };

    info!("opening interaction board on {port:?}");
    let device = iboard_device::open(&port)
        .with_context(|| format!("failed to open interaction board on {port:?}"))?;

    let mut builder = iboard_driver::BoardBuilder::new().rate_hz(cli.rate);
    if cli.door_timeout_ms > 0 {
        builder = builder.door_timeout(Duration::from_millis(cli.door_timeout_ms));
    }
    let board = builder.connect(device).context("failed to start coordinator")?;

    // Ctrl-C → 优雅退出
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .context("failed to register signal handler")?;

    info!("coordinator running at {} Hz, press Ctrl-C to stop", cli.rate);

    let started = Instant::now();
    let duration = cli.duration.map(Duration::from_secs);
    let mut last_stats = Instant::now();

    while running.load(Ordering::Relaxed) {
        if let Some(limit) = duration
            && started.elapsed() >= limit
        {
            info!("configured duration elapsed");
            break;
        }
        std::thread::sleep(Duration::from_millis(100));

        if last_stats.elapsed() >= Duration::from_secs(5) {
            if let Some(snapshot) = board.latest_joints() {
                let [(_, head), (_, neck), (_, camera)] = snapshot.joints();
                info!(
                    "joints: head={head} neck={neck} camera={camera} deg (cycle {})",
                    snapshot.seq
                );
            }
            let metrics = board.metrics();
            info!(
                "cycles={} device_errors={} overruns={} snapshots_dropped={}",
                metrics.cycles,
                metrics.device_errors,
                metrics.cycle_overruns,
                metrics.snapshots_dropped
            );
            last_stats = Instant::now();
        }
    }

    info!("shutting down");
    board.shutdown();
    Ok(())
}
