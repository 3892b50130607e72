//! 控制循环行为集成测试
//!
//! 用 mock 设备驱动真实的循环线程，验证逐周期契约：最新目标获胜、
//! LED 整组平铺、马达意图至多消费一次、按调用的故障隔离。

use std::thread;
use std::time::{Duration, Instant};

use iboard_device::mock::{MockBoard, MockHandle};
use iboard_device::{Actuator, LedColor, LedGroup};
use iboard_driver::{Board, BoardBuilder, DriverError};

const PERIOD: Duration = Duration::from_millis(5);

fn connect_board() -> (Board, MockHandle) {
    let device = MockBoard::new();
    let handle = device.handle();
    let board = BoardBuilder::new()
        .period(PERIOD)
        .connect(device)
        .expect("connect mock board");
    (board, handle)
}

/// 等待 n 个周期的量级（留出调度余量）
fn settle(n: u32) {
    thread::sleep(PERIOD * n);
}

#[test]
fn test_latest_target_wins_and_is_reasserted() {
    let (board, handle) = connect_board();

    board.set_target_degrees(Actuator::Head, 10);
    board.set_target_degrees(Actuator::Head, 20);
    settle(4);

    // 两次写入落定之后的窗口里，head 的下发值只能是最新的 20
    handle.clear_log();
    settle(4);
    let moves = handle.moves();
    let head: Vec<i32> = moves
        .iter()
        .filter(|(a, _)| *a == Actuator::Head)
        .map(|&(_, d)| d)
        .collect();
    assert!(head.len() >= 2, "target must be re-issued every cycle");
    assert!(head.iter().all(|&d| d == 20), "stale target leaked: {head:?}");

    // 没有目标的执行器本周期不下发运动指令
    assert!(!moves.iter().any(|(a, _)| *a == Actuator::Neck));
}

#[test]
fn test_radian_target_rounded_to_degrees() {
    let (board, handle) = connect_board();

    board
        .set_target(Actuator::Camera, std::f64::consts::FRAC_PI_2)
        .unwrap();
    // 0.5 rad = 28.6479…° → 四舍五入为 29
    board.set_target(Actuator::Neck, 0.5).unwrap();
    settle(4);

    let moves = handle.moves();
    assert!(moves.iter().any(|&(a, d)| a == Actuator::Camera && d == 90));
    assert!(moves.iter().any(|&(a, d)| a == Actuator::Neck && d == 29));
}

#[test]
fn test_non_finite_target_rejected_without_mutation() {
    let (board, handle) = connect_board();

    let err = board.set_target(Actuator::Head, f64::NAN).unwrap_err();
    assert!(matches!(err, DriverError::InvalidTarget { .. }));
    let err = board.set_target(Actuator::Head, f64::INFINITY).unwrap_err();
    assert!(matches!(err, DriverError::InvalidTarget { .. }));

    settle(3);
    assert!(handle.moves().is_empty(), "rejected target must not move");
}

#[test]
fn test_led_groups_filled_with_flat_color() {
    let (board, handle) = connect_board();

    let teal = LedColor::new(0, 128, 128);
    board.set_light(LedGroup::Base, teal);
    settle(3);

    let writes = handle.led_writes();
    let (_, base) = writes
        .iter()
        .rev()
        .find(|(g, _)| *g == LedGroup::Base)
        .expect("base LED write");
    assert_eq!(base.len(), LedGroup::Base.led_count());
    assert!(base.iter().all(|c| *c == teal));

    // 未被指令触达的灯组仍然逐周期整组推送（默认全灭）
    let (_, mouth) = writes
        .iter()
        .rev()
        .find(|(g, _)| *g == LedGroup::Mouth)
        .expect("mouth LED write");
    assert_eq!(mouth.len(), LedGroup::Mouth.led_count());
    assert!(mouth.iter().all(|c| *c == LedColor::OFF));
}

#[test]
fn test_motor_intent_consumed_at_most_once() {
    let (board, handle) = connect_board();

    board.start_motor(Actuator::Neck).unwrap();
    settle(5);
    assert_eq!(handle.motor_starts(), vec![Actuator::Neck]);
    assert!(handle.motor_stops().is_empty());

    board.stop_motor(Actuator::Neck).unwrap();
    settle(5);
    assert_eq!(handle.motor_starts(), vec![Actuator::Neck]);
    assert_eq!(handle.motor_stops(), vec![Actuator::Neck]);
}

#[test]
fn test_unknown_motor_name_rejected_without_mutation() {
    let (board, handle) = connect_board();

    assert!(matches!(
        board.start_motor_named("door"),
        Err(DriverError::UnknownActuator(_))
    ));
    assert!(board.stop_motor_named("").is_err());

    settle(3);
    assert!(handle.motor_starts().is_empty());
    assert!(handle.motor_stops().is_empty());
}

#[test]
fn test_position_read_failure_does_not_stop_cycles() {
    let (board, handle) = connect_board();
    handle.set_positions([5, 6, 7]);

    let rx = board.subscribe();
    let first = rx.recv_timeout(Duration::from_secs(1)).expect("snapshot");
    assert_eq!(first.positions_deg, [5, 6, 7]);

    let led_writes_before = handle.led_writes().len();
    handle.fail_next_positions(1);
    settle(6);

    let metrics = board.metrics();
    assert_eq!(metrics.position_read_failures, 1);
    assert!(metrics.cycles > metrics.position_read_failures);

    // 失败之后的周期照常发布快照（序号继续前进）、照常推送 LED
    let mut last = first;
    while let Ok(snapshot) = rx.try_recv() {
        assert!(snapshot.seq > last.seq);
        last = snapshot;
    }
    assert!(last.seq > first.seq, "cycles stopped after a read failure");
    assert!(handle.led_writes().len() > led_writes_before);
}

#[test]
fn test_latest_joints_reflects_device_positions() {
    let (board, handle) = connect_board();
    handle.set_positions([1, -2, 3]);

    let deadline = Instant::now() + Duration::from_secs(1);
    loop {
        if let Some(snapshot) = board.latest_joints()
            && snapshot.positions_deg == [1, -2, 3]
        {
            assert_eq!(
                snapshot.joints(),
                [
                    (Actuator::Head, 1),
                    (Actuator::Neck, -2),
                    (Actuator::Camera, 3)
                ]
            );
            break;
        }
        assert!(Instant::now() < deadline, "no matching snapshot published");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_invalid_configuration_rejected() {
    let err = BoardBuilder::new()
        .period(Duration::ZERO)
        .connect(MockBoard::new())
        .unwrap_err();
    assert!(matches!(err, DriverError::Config(_)));

    let err = BoardBuilder::new()
        .rate_hz(0.0)
        .connect(MockBoard::new())
        .unwrap_err();
    assert!(matches!(err, DriverError::Config(_)));

    let err = BoardBuilder::new()
        .snapshot_capacity(0)
        .connect(MockBoard::new())
        .unwrap_err();
    assert!(matches!(err, DriverError::Config(_)));
}

#[test]
fn test_overrun_skips_missed_ticks() {
    // 节拍远小于单周期耗时：每个周期都超限，下一拍立即开始而不是连环追赶
    let device = MockBoard::new();
    let board = BoardBuilder::new()
        .period(Duration::from_micros(1))
        .connect(device)
        .expect("connect mock board");
    thread::sleep(Duration::from_millis(20));
    let metrics = board.metrics();
    assert!(metrics.cycle_overruns > 0);
    assert!(metrics.cycles >= metrics.cycle_overruns);
}

#[test]
fn test_metrics_cycles_advance() {
    let (board, _handle) = connect_board();
    settle(6);
    let metrics = board.metrics();
    assert!(metrics.cycles >= 2, "cycles = {}", metrics.cycles);
    assert_eq!(metrics.device_errors, 0);
}
