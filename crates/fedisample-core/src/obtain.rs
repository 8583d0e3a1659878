//! Instance-data obtainer: fetch nodeinfo and weekly activity for a list of
//! instances, producing the loader's JSONL input.
//!
//! Interrupted runs resume: instances lexicographically at or before the
//! last completed one are skipped, so the input list must be sorted.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use fedisample_common::{Error, ProbeConfig, Result};

/// Fetch `{instance, nodeinfo, activity}` records for every instance named
/// in the `nodes` JSON array file, appending JSONL to `output`.
///
/// An unparseable instance list is fatal; per-instance fetch failures
/// produce a null nodeinfo (counted as empty by the loader later).
pub fn obtain(nodes: &Path, output: &Path, config: &ProbeConfig) -> Result<()> {
    let instances: Vec<String> = serde_json::from_reader(File::open(nodes)?)?;
    let last = last_completed(output)?;
    if let Some(ref last) = last {
        info!(last = %last, "resuming after last completed instance");
    }
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| Error::Http {
            instance: String::new(),
            message: format!("building obtain client: {e}"),
        })?;
    let file = OpenOptions::new().create(true).append(true).open(output)?;
    let mut writer = BufWriter::new(file);

    for instance in &instances {
        if should_skip(instance, last.as_deref()) {
            continue;
        }
        let nodeinfo = fetch_nodeinfo(&client, instance);
        let activity = if nodeinfo.is_some() {
            fetch_activity(&client, instance)
        } else {
            Value::Array(Vec::new())
        };
        debug!(instance, nodeinfo = nodeinfo.is_some(), "fetched instance data");
        let record = serde_json::json!({
            "instance": instance,
            "nodeinfo": nodeinfo,
            "activity": activity,
        });
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
        // One line per instance so a crash loses at most the in-flight one.
        writer.flush()?;
    }
    Ok(())
}

/// Whether `instance` was already handled by a previous run.
fn should_skip(instance: &str, last: Option<&str>) -> bool {
    matches!(last, Some(done) if instance <= done)
}

/// Instance id on the last complete line of the output file, if any.
fn last_completed(output: &Path) -> Result<Option<String>> {
    let file = match File::open(output) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut last = None;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(&line) {
            if let Some(instance) = value.get("instance").and_then(Value::as_str) {
                last = Some(instance.to_string());
            }
        }
    }
    Ok(last)
}

/// Resolve `/.well-known/nodeinfo` and fetch the schema document it links.
fn fetch_nodeinfo(client: &reqwest::blocking::Client, instance: &str) -> Option<Value> {
    let well_known: Value = client
        .get(format!("https://{instance}/.well-known/nodeinfo"))
        .send()
        .ok()?
        .error_for_status()
        .ok()?
        .json()
        .ok()?;
    // The links array is ordered oldest schema first.
    let href = well_known
        .get("links")?
        .as_array()?
        .last()?
        .get("href")?
        .as_str()?
        .to_string();
    client
        .get(href)
        .send()
        .ok()?
        .error_for_status()
        .ok()?
        .json()
        .ok()
}

/// Weekly activity; failures degrade to an empty array.
fn fetch_activity(client: &reqwest::blocking::Client, instance: &str) -> Value {
    let fetched: Option<Value> = client
        .get(format!("https://{instance}/api/v1/instance/activity"))
        .send()
        .ok()
        .and_then(|r| r.error_for_status().ok())
        .and_then(|r| r.json().ok());
    match fetched {
        Some(value @ Value::Array(_)) => value,
        _ => Value::Array(Vec::new()),
    }
}
