//! 舱门收敛集成测试
//!
//! 验证阻塞式舱门请求与控制循环之间的协定：请求只挂起调用线程、
//! 意图在观测到目标状态后被清除、等待可超时也可被关闭打断。

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use iboard_device::mock::{MockBoard, MockHandle};
use iboard_device::{DOOR_CLOSED_POSITION, DOOR_OPEN_POSITION, DoorStatus};
use iboard_driver::{Board, BoardBuilder, DoorCommand, DriverError};

const PERIOD: Duration = Duration::from_millis(5);

fn connect_board_with_door(status: DoorStatus) -> (Board, MockHandle) {
    let device = MockBoard::new();
    let handle = device.handle();
    handle.set_door_status(status);
    let board = BoardBuilder::new()
        .period(PERIOD)
        .connect(device)
        .expect("connect mock board");
    (board, handle)
}

#[test]
fn test_door_open_round_trip() {
    // mock 默认剧本：move_door(开门极限) 之后，下一次状态读取即返回 Open
    let (board, handle) = connect_board_with_door(DoorStatus::Closed);

    let started = Instant::now();
    board.control_door(DoorCommand::Open).expect("door open");
    let elapsed = started.elapsed();

    // 两个周期量级内返回（给线程调度留大余量）
    assert!(elapsed < Duration::from_millis(200), "took {elapsed:?}");
    assert_eq!(board.door_status(), DoorStatus::Open);

    // 意图已被清除：后续周期不再驱动舱门
    let moves = handle.door_moves();
    assert!(!moves.is_empty());
    assert!(moves.iter().all(|&p| p == DOOR_OPEN_POSITION));
    let count = moves.len();
    thread::sleep(PERIOD * 4);
    assert_eq!(handle.door_moves().len(), count, "stale intent re-triggered");
}

#[test]
fn test_door_close_while_already_closed_issues_no_move() {
    let (board, handle) = connect_board_with_door(DoorStatus::Closed);

    // 观测到 CLOSED 的周期清除 should_close，本周期不会下发 move_door
    board.control_door(DoorCommand::Close).expect("door close");
    thread::sleep(PERIOD * 4);
    assert!(handle.door_moves().is_empty());
    assert_eq!(board.door_status(), DoorStatus::Closed);
}

#[test]
fn test_door_reports_moving_then_converges() {
    let (board, handle) = connect_board_with_door(DoorStatus::Closed);
    handle.set_door_move_latency(2);

    board
        .control_door_deadline(DoorCommand::Open, Duration::from_secs(2))
        .expect("door open with transit");
    assert_eq!(board.door_status(), DoorStatus::Open);
}

#[test]
fn test_door_wait_times_out_when_door_never_arrives() {
    let (board, handle) = connect_board_with_door(DoorStatus::Closed);
    // 舱门永远到不了位：状态停留在 Unknown
    handle.set_door_move_latency(u32::MAX);

    let err = board
        .control_door_deadline(DoorCommand::Open, Duration::from_millis(50))
        .unwrap_err();
    assert!(matches!(err, DriverError::DoorTimeout { timeout_ms: 50 }));
}

#[test]
fn test_invalid_door_command_rejected_without_blocking() {
    let (board, handle) = connect_board_with_door(DoorStatus::Closed);

    let started = Instant::now();
    let err = board.control_door_named("ajar").unwrap_err();
    assert!(matches!(err, DriverError::InvalidDoorCommand(_)));
    assert!(started.elapsed() < Duration::from_millis(50));

    thread::sleep(PERIOD * 3);
    assert!(handle.door_moves().is_empty(), "rejected command moved door");
}

#[test]
fn test_later_door_request_supersedes_earlier_direction() {
    // 舱门卡住（状态不再收敛），先请求关门、再请求开门：
    // 反方向意图被清除，之后的周期只朝开门方向驱动
    let (board, handle) = connect_board_with_door(DoorStatus::Unknown);
    handle.set_door_move_latency(u32::MAX);
    let board = Arc::new(board);

    let closer = {
        let board = Arc::clone(&board);
        thread::spawn(move || {
            board.control_door_deadline(DoorCommand::Close, Duration::from_millis(150))
        })
    };
    thread::sleep(PERIOD * 5);
    assert!(handle.door_moves().contains(&DOOR_CLOSED_POSITION));

    let opener = {
        let board = Arc::clone(&board);
        thread::spawn(move || {
            board.control_door_deadline(DoorCommand::Open, Duration::from_millis(150))
        })
    };
    thread::sleep(PERIOD * 3);
    handle.clear_log();
    thread::sleep(PERIOD * 5);
    let moves = handle.door_moves();
    assert!(!moves.is_empty());
    assert!(
        moves.iter().all(|&p| p == DOOR_OPEN_POSITION),
        "superseded close intent still firing: {moves:?}"
    );

    // 两个等待都因舱门卡住而超时，属预期
    assert!(closer.join().unwrap().is_err());
    assert!(opener.join().unwrap().is_err());
}

#[test]
fn test_shutdown_interrupts_pending_door_wait() {
    let (board, handle) = connect_board_with_door(DoorStatus::Closed);
    handle.set_door_move_latency(u32::MAX);
    let board = Arc::new(board);

    let waiter = {
        let board = Arc::clone(&board);
        thread::spawn(move || board.control_door(DoorCommand::Open))
    };

    thread::sleep(PERIOD * 6);
    board.shutdown();

    let err = waiter.join().unwrap().unwrap_err();
    assert!(matches!(err, DriverError::ShuttingDown));
}
