//! Contact traces
//!
//! Traces use the connection lines of the ONE simulator's standard event
//! format, one event per line:
//!
//! ```text
//! # time CONN a b state
//! 120.0 CONN n3 n7 up
//! 480.5 CONN 3 7 down
//! ```
//!
//! Node names may carry a letter prefix. Blank lines and lines starting
//! with `#` are ignored. Synthetic traces come from a seeded generator
//! so runs are reproducible.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ferry_core::{ConfigError, ContactEvent, HostId, LinkState, SimTime};

use crate::config::SIM_NAMESPACE;
use crate::error::{SimError, SimResult};

/// Keyword of connection events
const CONN: &str = "CONN";

/// Random pairwise meetings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactGeneration {
    /// Number of meetings over the whole run
    pub meetings: u32,
    /// Shortest meeting in seconds
    pub min_duration: f64,
    /// Longest meeting in seconds
    pub max_duration: f64,
}

impl Default for ContactGeneration {
    fn default() -> Self {
        Self {
            meetings: 500,
            min_duration: 60.0,
            max_duration: 600.0,
        }
    }
}

impl ContactGeneration {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_duration > 0.0 && self.min_duration <= self.max_duration) {
            return Err(ConfigError::invalid(
                SIM_NAMESPACE,
                "contact_generation.min_duration",
                "must be positive and not above max_duration",
            ));
        }
        Ok(())
    }
}

fn trace_error(line: usize, reason: impl Into<String>) -> SimError {
    SimError::Trace {
        line,
        reason: reason.into(),
    }
}

/// Parse a trace, returning events sorted by time
///
/// Events at the same time keep their file order.
pub fn parse_contacts(text: &str) -> SimResult<Vec<ContactEvent<HostId>>> {
    let mut events = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.trim();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = content.split_whitespace().collect();
        let [time, keyword, a, b, state] = fields.as_slice() else {
            return Err(trace_error(line, format!("expected 5 fields, found {}", fields.len())));
        };

        if *keyword != CONN {
            return Err(trace_error(line, format!("unsupported event type {}", keyword)));
        }

        let time: f64 = time
            .parse()
            .map_err(|_| trace_error(line, format!("invalid time {}", time)))?;
        if !(time.is_finite() && time >= 0.0) {
            return Err(trace_error(line, format!("time {} out of range", time)));
        }

        let a: HostId = a.parse().map_err(|e| trace_error(line, format!("{}", e)))?;
        let b: HostId = b.parse().map_err(|e| trace_error(line, format!("{}", e)))?;
        if a == b {
            return Err(trace_error(line, format!("{} connects to itself", a)));
        }

        let state = match state.to_ascii_lowercase().as_str() {
            "up" => LinkState::Up,
            "down" => LinkState::Down,
            other => return Err(trace_error(line, format!("unknown link state {}", other))),
        };

        events.push(ContactEvent {
            time: SimTime::from_secs(time),
            a,
            b,
            state,
        });
    }

    sort_events(&mut events);
    debug!(events = events.len(), "Contact trace parsed");
    Ok(events)
}

/// Read and parse a trace file
pub fn load_contacts(path: &Path) -> SimResult<Vec<ContactEvent<HostId>>> {
    let text = fs::read_to_string(path)?;
    parse_contacts(&text)
}

/// Render events in trace format
pub fn format_contacts(events: &[ContactEvent<HostId>]) -> String {
    let mut out = String::from("# time CONN a b state\n");
    for event in events {
        let _ = writeln!(
            out,
            "{:.1} {} {} {} {}",
            event.time.as_secs(),
            CONN,
            event.a,
            event.b,
            event.state
        );
    }
    out
}

/// Generate random meetings between `nodes` nodes over `[0, end_time)`
///
/// Each meeting picks two distinct nodes, a start time, and a duration.
/// Meetings that would overlap an open link between the same pair are
/// skipped, so every `up` is matched by exactly one later `down`.
pub fn generate_contacts(
    nodes: u32,
    end_time: f64,
    generation: &ContactGeneration,
    seed: u64,
) -> Vec<ContactEvent<HostId>> {
    let mut rng = StdRng::seed_from_u64(seed);
    if nodes < 2 || end_time <= 0.0 {
        return Vec::new();
    }

    let mut starts: Vec<f64> = (0..generation.meetings)
        .map(|_| rng.random_range(0.0..end_time))
        .collect();
    starts.sort_by(|a, b| a.total_cmp(b));

    let mut open_until: HashMap<(HostId, HostId), f64> = HashMap::new();
    let mut events = Vec::with_capacity(starts.len() * 2);

    for start in starts {
        let a = rng.random_range(0..nodes);
        let mut b = rng.random_range(0..nodes - 1);
        if b >= a {
            b += 1;
        }
        let pair = (HostId(a.min(b)), HostId(a.max(b)));
        let duration = rng.random_range(generation.min_duration..=generation.max_duration);

        if open_until.get(&pair).is_some_and(|until| *until >= start) {
            continue;
        }
        let end = start + duration;
        open_until.insert(pair, end);

        events.push(ContactEvent::up(SimTime::from_secs(start), pair.0, pair.1));
        events.push(ContactEvent::down(SimTime::from_secs(end), pair.0, pair.1));
    }

    sort_events(&mut events);
    debug!(
        nodes,
        meetings = events.len() / 2,
        seed,
        "Synthetic contacts generated"
    );
    events
}

/// Stable sort by time
fn sort_events(events: &mut [ContactEvent<HostId>]) {
    events.sort_by(|x, y| x.time.as_secs().total_cmp(&y.time.as_secs()));
}
