mod support;

use std::fs;

use predicates::str::contains;
use serde_json::Value;

use support::TestBoard;

fn json_error(board: &TestBoard, args: &[&str], code: i32) -> Result<Value, Box<dyn std::error::Error>> {
    let output = board
        .cmd()
        .args(args)
        .arg("--json")
        .assert()
        .code(code)
        .get_output()
        .stdout
        .clone();
    Ok(serde_json::from_slice(&output)?)
}

#[test]
fn unknown_task_reports_envelope_with_hint() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;

    let value = json_error(&board, &["show", "tb-zzz"], 2)?;
    assert_eq!(value["schema_version"], "taskboard.v1");
    assert_eq!(value["command"], "show");
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"]["kind"], "user_error");
    assert_eq!(value["error"]["code"], 2);
    assert_eq!(value["error"]["details"]["id"], "tb-zzz");
    assert_eq!(value["next_steps"][0], "taskboard list");

    Ok(())
}

#[test]
fn command_name_survives_global_flags() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let root = board.path().display().to_string();

    let value = json_error(&board, &["--root", &root, "rm", "missing"], 2)?;
    assert_eq!(value["command"], "rm");

    Ok(())
}

#[test]
fn invalid_status_is_user_error() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let id = board.add(&["Task"])?;

    let value = json_error(&board, &["status", &id, "blocked"], 2)?;
    assert!(value["error"]["message"]
        .as_str()
        .is_some_and(|message| message.contains("unknown task status 'blocked'")));

    Ok(())
}

#[test]
fn malformed_log_is_operation_failure() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    board.add(&["Task"])?;
    let mut log = fs::read_to_string(board.log_path())?;
    log.push_str("{not json\n");
    fs::write(board.log_path(), log)?;
    fs::remove_file(board.snapshot_path())?;

    board
        .cmd()
        .arg("list")
        .assert()
        .code(4)
        .stderr(contains("malformed record"))
        .stderr(contains("hint: inspect .taskboard/tasks.jsonl"));

    Ok(())
}

#[test]
fn stale_snapshot_is_replayed_from_log() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let first = board.add(&["First"])?;
    let snapshot = fs::read_to_string(board.snapshot_path())?;
    let second = board.add(&["Second"])?;
    fs::write(board.snapshot_path(), snapshot)?;

    let list = board.json(&["list"])?;
    assert_eq!(support::ids(&list["tasks"]), vec![first, second]);

    Ok(())
}

#[test]
fn conflicting_edit_flags_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let id = board.add(&["Task"])?;

    board
        .cmd()
        .args(["edit", &id, "--due", "2024-01-01", "--clear-due"])
        .assert()
        .code(2)
        .stderr(contains("mutually exclusive"));

    Ok(())
}

#[test]
fn quiet_suppresses_human_output() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;

    board
        .cmd()
        .args(["add", "Silent", "-q"])
        .assert()
        .success()
        .stdout(predicates::str::is_empty());

    Ok(())
}
