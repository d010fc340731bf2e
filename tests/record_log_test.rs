use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Run auditrail with given args.
fn auditrail() -> assert_cmd::Command {
    cargo_bin_cmd!("auditrail")
}

fn init_store(dir: &assert_fs::TempDir) {
    auditrail()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();
}

// ─── init ────────────────────────────────────────────────────────

#[test]
fn init_creates_store_and_config() {
    let dir = assert_fs::TempDir::new().unwrap();

    auditrail()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Store ready"));

    dir.child(".auditrail/config.toml")
        .assert(predicate::path::exists());
    dir.child(".auditrail/audit.jsonl")
        .assert(predicate::path::exists());
    dir.child(".auditrail/records.json")
        .assert(predicate::path::exists());
}

#[test]
fn init_refuses_to_run_twice() {
    let dir = assert_fs::TempDir::new().unwrap();
    init_store(&dir);

    auditrail()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn commands_without_a_store_point_at_init() {
    let dir = assert_fs::TempDir::new().unwrap();

    auditrail()
        .current_dir(dir.path())
        .arg("log")
        .assert()
        .failure()
        .stderr(predicate::str::contains("auditrail init"));
}

// ─── record mutations ────────────────────────────────────────────

#[test]
fn set_creates_then_updates() {
    let dir = assert_fs::TempDir::new().unwrap();
    init_store(&dir);

    auditrail()
        .current_dir(dir.path())
        .args(["record", "set", "articles", "1", "title=First post"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(create)"));

    auditrail()
        .current_dir(dir.path())
        .args(["record", "set", "articles", "1", "title=Edited post"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(update)"));

    auditrail()
        .current_dir(dir.path())
        .args(["record", "show", "articles", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Edited post"));
}

#[test]
fn no_op_update_logs_nothing() {
    let dir = assert_fs::TempDir::new().unwrap();
    init_store(&dir);

    auditrail()
        .current_dir(dir.path())
        .args(["record", "set", "articles", "1", "title=Same"])
        .assert()
        .success();

    auditrail()
        .current_dir(dir.path())
        .args(["record", "set", "articles", "1", "title=Same"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing logged"));
}

#[test]
fn delete_keeps_final_state_in_the_trail() {
    let dir = assert_fs::TempDir::new().unwrap();
    init_store(&dir);

    auditrail()
        .current_dir(dir.path())
        .args(["record", "set", "articles", "1", "title=Doomed"])
        .assert()
        .success();

    auditrail()
        .current_dir(dir.path())
        .args(["record", "delete", "articles", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("final state kept"));

    auditrail()
        .current_dir(dir.path())
        .args(["record", "show", "articles", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record not found"));

    // The delete entry still shows the last known fields.
    auditrail()
        .current_dir(dir.path())
        .args(["show", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Doomed"));
}

#[test]
fn malformed_assignment_is_rejected() {
    let dir = assert_fs::TempDir::new().unwrap();
    init_store(&dir);

    auditrail()
        .current_dir(dir.path())
        .args(["record", "set", "articles", "1", "title"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("field=value"));
}

#[test]
fn schema_validation_blocks_bad_writes() {
    let dir = assert_fs::TempDir::new().unwrap();
    init_store(&dir);

    dir.child(".auditrail/config.toml")
        .write_str(
            "[auditrail]\nversion = \"0.3.0\"\n\
             [sources.articles]\nrequired = [\"title\"]\n",
        )
        .unwrap();

    auditrail()
        .current_dir(dir.path())
        .args(["record", "set", "articles", "1", "body=No title here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required field 'title'"));

    // The blocked write left no trace, record or entry.
    auditrail()
        .current_dir(dir.path())
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("No audit entries found"));
}

// ─── log browsing ────────────────────────────────────────────────

#[test]
fn log_lists_entries_with_filters() {
    let dir = assert_fs::TempDir::new().unwrap();
    init_store(&dir);

    auditrail()
        .current_dir(dir.path())
        .args(["record", "set", "articles", "1", "title=A", "--actor", "7:Grace"])
        .assert()
        .success();
    auditrail()
        .current_dir(dir.path())
        .args(["record", "set", "comments", "1", "body=hi", "--actor", "9:Alan"])
        .assert()
        .success();
    auditrail()
        .current_dir(dir.path())
        .args(["record", "delete", "comments", "1"])
        .assert()
        .success();

    auditrail()
        .current_dir(dir.path())
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 entries"));

    auditrail()
        .current_dir(dir.path())
        .args(["log", "--type", "delete"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entries"))
        .stdout(predicate::str::contains("comments/1"));

    auditrail()
        .current_dir(dir.path())
        .args(["log", "--user", "grace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entries"))
        .stdout(predicate::str::contains("Grace"));

    auditrail()
        .current_dir(dir.path())
        .args(["log", "--source", "articles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("articles/1"));

    auditrail()
        .current_dir(dir.path())
        .args(["log", "--last", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entries"));
}

#[test]
fn log_rejects_unknown_type_filter() {
    let dir = assert_fs::TempDir::new().unwrap();
    init_store(&dir);

    auditrail()
        .current_dir(dir.path())
        .args(["log", "--type", "explode"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown audit log type"));
}

#[test]
fn unknown_monitor_rule_is_a_config_error() {
    let dir = assert_fs::TempDir::new().unwrap();
    init_store(&dir);

    dir.child(".auditrail/config.toml")
        .write_str(
            "[auditrail]\nversion = \"0.3.0\"\n\
             [monitor]\nenabled = true\n\
             [[monitor.rules]]\ntype = \"teleport\"\n",
        )
        .unwrap();

    auditrail()
        .current_dir(dir.path())
        .args(["record", "set", "articles", "1", "title=A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown monitor rule 'teleport'"));
}
