mod support;

use predicates::str::contains;

use support::TestBoard;

#[test]
fn add_then_show_round_trips_fields() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;

    let id = board.add(&[
        "Design dashboard",
        "-d",
        "Proposal for the new layout",
        "-p",
        "high",
        "--due",
        "2024-06-10",
        "-t",
        "ui",
        "--tag",
        "ui",
        "--share",
        "john@example.com",
        "--user",
        "alice@example.com",
    ])?;
    assert!(id.starts_with("tb-"));

    let task = board.json(&["show", &id])?;
    assert_eq!(task["title"], "Design dashboard");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["status"], "todo");
    assert_eq!(task["dueDate"], "2024-06-10T00:00:00Z");
    assert_eq!(task["owner"], "alice@example.com");
    assert_eq!(task["tags"], serde_json::json!(["ui"]));
    assert_eq!(task["sharedWith"], serde_json::json!(["john@example.com"]));

    Ok(())
}

#[test]
fn show_accepts_unique_suffix_prefix() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let id = board.add(&["Only task"])?;
    let suffix = id.trim_start_matches("tb-");

    board
        .cmd()
        .args(["show", &suffix[..1]])
        .assert()
        .success()
        .stdout(contains("Only task"));

    Ok(())
}

#[test]
fn blank_title_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;

    board
        .cmd()
        .args(["add", "   "])
        .assert()
        .code(2)
        .stderr(contains("title cannot be empty"));
    assert!(board.read_events()?.is_empty());

    Ok(())
}

#[test]
fn edit_changes_fields_and_clears_due() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let id = board.add(&["Draft", "--due", "2024-06-12"])?;

    let task = board.json(&["edit", &id, "--title", "Final", "-p", "low"])?;
    assert_eq!(task["title"], "Final");
    assert_eq!(task["priority"], "low");
    assert_eq!(task["dueDate"], "2024-06-12T00:00:00Z");

    let task = board.json(&["edit", &id, "--clear-due"])?;
    assert!(task.get("dueDate").is_none());

    board
        .cmd()
        .args(["edit", &id])
        .assert()
        .code(2)
        .stderr(contains("nothing to edit"));

    Ok(())
}

#[test]
fn status_moves_freely_between_values() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let id = board.add(&["Cycle"])?;

    let task = board.json(&["status", &id, "completed"])?;
    assert_eq!(task["status"], "completed");
    let task = board.json(&["status", &id, "in_progress"])?;
    assert_eq!(task["status"], "in-progress");

    board
        .cmd()
        .args(["status", &id, "done"])
        .assert()
        .code(2)
        .stderr(contains("unknown task status"));

    Ok(())
}

#[test]
fn share_and_tag_dedupe_and_skip_noop_events() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let id = board.add(&["Shared"])?;

    let task = board.json(&["share", &id, "a@example.com", "b@example.com"])?;
    assert_eq!(
        task["sharedWith"],
        serde_json::json!(["a@example.com", "b@example.com"])
    );

    let events_before = board.read_events()?.len();
    board
        .cmd()
        .args(["share", &id, "a@example.com"])
        .assert()
        .success()
        .stdout(contains("nothing changed"));
    assert_eq!(board.read_events()?.len(), events_before);

    let task = board.json(&["unshare", &id, "a@example.com"])?;
    assert_eq!(task["sharedWith"], serde_json::json!(["b@example.com"]));

    board.json(&["tag", &id, "ops", "infra"])?;
    let task = board.json(&["untag", &id, "ops"])?;
    assert_eq!(task["tags"], serde_json::json!(["infra"]));

    board
        .cmd()
        .args(["share", &id, "not-an-email"])
        .assert()
        .code(2)
        .stderr(contains("invalid email address"));

    Ok(())
}

#[test]
fn rm_deletes_and_later_lookups_fail() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let keep = board.add(&["Keep"])?;
    let gone = board.add(&["Gone"])?;

    let data = board.json(&["rm", &gone])?;
    assert_eq!(data["id"], gone.as_str());

    let list = board.json(&["list"])?;
    assert_eq!(support::ids(&list["tasks"]), vec![keep]);

    board
        .cmd()
        .args(["show", &gone])
        .assert()
        .code(2)
        .stderr(contains("Task not found"))
        .stderr(contains("hint: taskboard list"));

    Ok(())
}

#[test]
fn events_record_actor_and_types() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;
    let id = board.add(&["Tracked", "--user", "alice@example.com"])?;
    board
        .cmd()
        .env("TASKBOARD_USER", "bob@example.com")
        .args(["status", &id, "completed"])
        .assert()
        .success();

    let events = board.read_events()?;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "task_created");
    assert_eq!(events[0]["actor"], "alice@example.com");
    assert_eq!(events[1]["type"], "task_status_changed");
    assert_eq!(events[1]["actor"], "bob@example.com");

    Ok(())
}

#[test]
fn whoami_persists_identity_for_new_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::init()?;

    board
        .cmd()
        .arg("whoami")
        .assert()
        .success()
        .stdout(contains("anonymous"));

    board
        .cmd()
        .args(["whoami", "--set", "carol@example.com"])
        .assert()
        .success();

    let who = board.json(&["whoami"])?;
    assert_eq!(who["email"], "carol@example.com");
    assert_eq!(who["source"], "board");

    let id = board.add(&["Mine"])?;
    let task = board.json(&["show", &id])?;
    assert_eq!(task["owner"], "carol@example.com");

    Ok(())
}
