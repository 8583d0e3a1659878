//! Availability probe: is an instance's public timeline reachable without
//! authentication?

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use fedisample_common::{Error, ProbeConfig, Result};

/// Outcome of a single probe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The public timeline answered with a status list.
    Ok,
    /// The endpoint exists but refuses unauthenticated access (or is not a
    /// timeline at all). Never retried.
    HardReject,
    /// Timeout or connection failure; worth retrying.
    Transient,
}

/// Capability to test one instance's public timeline.
///
/// `Sync` because one batch of probes fans out across worker threads.
pub trait TimelineProbe: Sync {
    fn probe(&self, instance: &str) -> ProbeOutcome;
}

/// Production probe: one unauthenticated GET against
/// `/api/v1/timelines/public` with a bounded timeout.
pub struct HttpTimelineProbe {
    client: reqwest::blocking::Client,
}

impl HttpTimelineProbe {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Http {
                instance: String::new(),
                message: format!("building probe client: {e}"),
            })?;
        Ok(HttpTimelineProbe { client })
    }
}

impl TimelineProbe for HttpTimelineProbe {
    fn probe(&self, instance: &str) -> ProbeOutcome {
        let url = format!("https://{instance}/api/v1/timelines/public?limit=1");
        let outcome = match self.client.get(&url).send() {
            Ok(response) if response.status().is_success() => {
                // A public timeline answers with a JSON array of statuses;
                // anything else is some other endpoint squatting on the path.
                match response.json::<Value>() {
                    Ok(Value::Array(_)) => ProbeOutcome::Ok,
                    Ok(_) | Err(_) => ProbeOutcome::HardReject,
                }
            }
            Ok(_) => ProbeOutcome::HardReject,
            Err(e) if e.is_builder() => ProbeOutcome::HardReject,
            Err(_) => ProbeOutcome::Transient,
        };
        debug!(instance, ?outcome, "probed public timeline");
        outcome
    }
}

/// Probe with the configured retry budget: transient failures are retried,
/// a hard reject is final, and exhausting the budget counts as rejected.
pub fn probe_with_retries(probe: &dyn TimelineProbe, instance: &str, retries: u32) -> bool {
    let mut attempts = 0;
    loop {
        match probe.probe(instance) {
            ProbeOutcome::Ok => return true,
            ProbeOutcome::HardReject => return false,
            ProbeOutcome::Transient => {
                if attempts >= retries {
                    return false;
                }
                attempts += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Probe fake that replays a scripted outcome sequence and counts calls.
    struct ScriptedProbe {
        outcomes: Mutex<Vec<ProbeOutcome>>,
        pub calls: Mutex<usize>,
    }

    impl ScriptedProbe {
        fn new(outcomes: Vec<ProbeOutcome>) -> Self {
            ScriptedProbe {
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(0),
            }
        }
    }

    impl TimelineProbe for ScriptedProbe {
        fn probe(&self, _instance: &str) -> ProbeOutcome {
            *self.calls.lock().unwrap() += 1;
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.len() > 1 {
                outcomes.remove(0)
            } else {
                outcomes[0]
            }
        }
    }

    #[test]
    fn hard_reject_is_never_retried() {
        let probe = ScriptedProbe::new(vec![ProbeOutcome::HardReject]);
        assert!(!probe_with_retries(&probe, "a.example", 3));
        assert_eq!(*probe.calls.lock().unwrap(), 1);
    }

    #[test]
    fn transient_failures_use_the_retry_budget() {
        let probe = ScriptedProbe::new(vec![
            ProbeOutcome::Transient,
            ProbeOutcome::Transient,
            ProbeOutcome::Ok,
        ]);
        assert!(probe_with_retries(&probe, "a.example", 3));
        assert_eq!(*probe.calls.lock().unwrap(), 3);
    }

    #[test]
    fn exhausted_retries_count_as_rejected() {
        let probe = ScriptedProbe::new(vec![ProbeOutcome::Transient]);
        assert!(!probe_with_retries(&probe, "a.example", 3));
        // Initial attempt plus three retries.
        assert_eq!(*probe.calls.lock().unwrap(), 4);
    }
}
