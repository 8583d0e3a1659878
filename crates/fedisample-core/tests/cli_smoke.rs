//! CLI smoke tests against the built binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn raw_line(instance: &str, users: u64, posts: u64, weekly: u64) -> String {
    format!(
        concat!(
            r#"{{"instance":"{i}","nodeinfo":{{"usage":{{"users":"#,
            r#"{{"total":{u},"activeMonth":{m}}},"localPosts":{p}}}}},"#,
            r#""activity":[{{"statuses":0,"logins":0,"registrations":0}},"#,
            r#"{{"statuses":{w},"logins":{w},"registrations":1}},"#,
            r#"{{"statuses":{w},"logins":{w},"registrations":1}},"#,
            r#"{{"statuses":{w},"logins":{w},"registrations":1}},"#,
            r#"{{"statuses":{w},"logins":{w},"registrations":1}}]}}"#
        ),
        i = instance,
        u = users,
        m = users / 2,
        p = posts,
        w = weekly,
    )
}

fn write_data(path: &Path) {
    let lines: Vec<String> = (0..25u64)
        .map(|i| {
            raw_line(
                &format!("host{i:02}.example"),
                1 + (i * 97) % 800,
                (i * 311) % 9000,
                (i * 13) % 400,
            )
        })
        .collect();
    fs::write(path, lines.join("\n")).unwrap();
}

#[test]
fn help_lists_the_subcommands() {
    Command::cargo_bin("fedisample")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("correlate")
                .and(predicate::str::contains("choose"))
                .and(predicate::str::contains("stratify"))
                .and(predicate::str::contains("crawl")),
        );
}

#[test]
fn correlate_prints_a_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("instances.jsonl");
    write_data(&data);
    Command::cargo_bin("fedisample")
        .unwrap()
        .args(["correlate", "--data"])
        .arg(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"chosen\""));
}

#[test]
fn stratify_writes_sample_and_bucket_files() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("instances.jsonl");
    let sample = dir.path().join("sample.txt");
    let buckets = dir.path().join("buckets.json");
    write_data(&data);
    Command::cargo_bin("fedisample")
        .unwrap()
        .args(["stratify", "--sample-size", "6"])
        .args(["--stats", "total_users,total_statuses"])
        .arg("--data")
        .arg(&data)
        .arg("--sample-file")
        .arg(&sample)
        .arg("--buckets-file")
        .arg(&buckets)
        .assert()
        .success();

    let chosen = fs::read_to_string(&sample).unwrap();
    assert!(!chosen.trim().is_empty());
    for line in chosen.lines() {
        assert!(line.starts_with("host") && line.ends_with(".example"));
    }
    let audit: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&buckets).unwrap()).unwrap();
    assert!(audit.as_object().is_some_and(|cells| !cells.is_empty()));
}

#[test]
fn unknown_statistic_is_an_args_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("instances.jsonl");
    write_data(&data);
    Command::cargo_bin("fedisample")
        .unwrap()
        .args(["stratify", "--stats", "no_such_stat"])
        .arg("--data")
        .arg(&data)
        .assert()
        .code(10)
        .stderr(predicate::str::contains("unknown statistic"));
}

#[test]
fn malformed_data_file_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("instances.jsonl");
    fs::write(&data, "this is not json\n").unwrap();
    Command::cargo_bin("fedisample")
        .unwrap()
        .args(["correlate", "--data"])
        .arg(&data)
        .assert()
        .code(12)
        .stderr(predicate::str::contains("not valid JSON"));
}
