//! Output artifact writers.
//!
//! A sampling run produces three artifacts: a CSV of the full sampled
//! records (audit), a plain one-id-per-line list (consumed directly by the
//! crawler), and a JSON array of rejected ids (so a later run can skip
//! known-dead instances without re-probing).

use std::io::Write;

use crate::error::Result;
use crate::types::InstanceRecord;

const CSV_HEADER: &str = "instance,total_users,monthly_active_users,total_statuses,\
mean_weekly_statuses,mean_weekly_logins,mean_weekly_registrations,\
weekly_statuses_per_user,weekly_logins_per_user,weekly_registrations_per_user,\
log_probability,weight";

/// Write the full sampled records as CSV.
///
/// Hostnames cannot contain commas, and all other fields are numeric, so no
/// quoting is needed.
pub fn write_sample_csv<W: Write>(mut out: W, records: &[InstanceRecord]) -> Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for r in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            r.instance,
            r.total_users,
            r.monthly_active_users,
            r.total_statuses,
            r.mean_weekly_statuses,
            r.mean_weekly_logins,
            r.mean_weekly_registrations,
            r.weekly_statuses_per_user,
            r.weekly_logins_per_user,
            r.weekly_registrations_per_user,
            r.log_probability.map(|v| v.to_string()).unwrap_or_default(),
            r.weight.map(|v| v.to_string()).unwrap_or_default(),
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Write one instance id per line.
pub fn write_instance_list<W: Write>(mut out: W, records: &[InstanceRecord]) -> Result<()> {
    for r in records {
        writeln!(out, "{}", r.instance)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the rejected ids as a JSON array.
pub fn write_rejected_json<W: Write>(mut out: W, rejected: &[String]) -> Result<()> {
    serde_json::to_writer(&mut out, rejected)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InstanceRecord;

    fn record(instance: &str) -> InstanceRecord {
        InstanceRecord {
            instance: instance.to_string(),
            total_users: 10,
            monthly_active_users: 5,
            total_statuses: 100,
            mean_weekly_statuses: 12.5,
            mean_weekly_logins: 4.0,
            mean_weekly_registrations: 0.25,
            weekly_statuses_per_user: 1.25,
            weekly_logins_per_user: 0.4,
            weekly_registrations_per_user: 0.025,
            log_probability: Some(-12.0),
            weight: Some(162754.79141900392),
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let mut buf = Vec::new();
        write_sample_csv(&mut buf, &[record("a.example"), record("b.example")]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("instance,total_users"));
        assert!(lines[1].starts_with("a.example,10,5,100,"));
        assert!(lines[1].contains("-12"));
    }

    #[test]
    fn csv_leaves_unfitted_columns_empty() {
        let mut r = record("a.example");
        r.log_probability = None;
        r.weight = None;
        let mut buf = Vec::new();
        write_sample_csv(&mut buf, &[r]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(",,"));
    }

    #[test]
    fn instance_list_is_one_id_per_line() {
        let mut buf = Vec::new();
        write_instance_list(&mut buf, &[record("a.example"), record("b.example")]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a.example\nb.example\n");
    }

    #[test]
    fn rejected_list_is_a_json_array() {
        let mut buf = Vec::new();
        write_rejected_json(&mut buf, &["x.example".to_string(), "y.example".to_string()])
            .unwrap();
        let parsed: Vec<String> = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, vec!["x.example", "y.example"]);
    }
}
