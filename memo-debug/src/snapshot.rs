//! Snapshot and query shapes exchanged with the transport layer.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Full debug dump.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Process id
    pub pid: u32,
    /// Seconds since the process started
    pub uptime: f64,
    /// Host name
    pub host: String,
    /// One row per registered cache, ordered by name
    pub data: Vec<CacheReport>,
}

impl Snapshot {
    /// Looks up a row by cache name.
    pub fn cache(&self, name: &str) -> Option<&CacheReport> {
        self.data.iter().find(|r| r.name == name)
    }
}

/// One cache's row in a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheReport {
    /// Registered name
    pub name: String,
    /// Weighted store usage
    pub size: usize,
    /// Number of stored entries
    pub keycount: usize,
    /// Hit rate percentage
    pub hitrate: u64,
    /// Explicit flushes so far
    pub resets: u64,
    /// Misses waiting on their completion
    pub pending: u64,
    /// Stored values, only for the cache named by `detail`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

/// Request method as seen by `view`; only `Post` may flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
}

impl RequestMethod {
    /// Returns true for methods allowed to change cache state.
    pub fn is_mutating(self) -> bool {
        self == RequestMethod::Post
    }
}

/// Query accepted by `view`.
///
/// `detail` and `flush` come from the query string; `method` from the request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ViewQuery {
    /// Cache whose stored values should be included
    pub detail: Option<String>,
    /// Cache to flush (mutating requests only)
    pub flush: Option<String>,
    #[serde(skip)]
    pub method: RequestMethod,
}

impl ViewQuery {
    /// Query asking for one cache's values.
    pub fn detail(name: impl Into<String>) -> Self {
        Self {
            detail: Some(name.into()),
            ..Self::default()
        }
    }

    /// Mutating query flushing one cache.
    pub fn flush(name: impl Into<String>) -> Self {
        Self {
            flush: Some(name.into()),
            method: RequestMethod::Post,
            ..Self::default()
        }
    }

    /// Sets the request method.
    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }
}

/// Identity of the running process, captured once.
#[derive(Clone, Debug)]
pub struct ProcessInfo {
    /// Process id
    pub pid: u32,
    /// Host name, `unknown` when the OS does not report one
    pub host: String,
    started_at: SystemTime,
}

impl ProcessInfo {
    /// Captures the current process.
    ///
    /// The start time comes from the OS; if it cannot be read, the moment of
    /// capture is used instead.
    pub fn current() -> Self {
        let pid = std::process::id();
        Self {
            pid,
            host: System::host_name().unwrap_or_else(|| "unknown".into()),
            started_at: process_start_time(pid).unwrap_or_else(SystemTime::now),
        }
    }

    /// Seconds since the process started.
    pub fn uptime(&self) -> f64 {
        SystemTime::now()
            .duration_since(self.started_at)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

fn process_start_time(pid: u32) -> Option<SystemTime> {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
    let started = system.process(pid)?.start_time();
    if started == 0 {
        return None;
    }
    Some(UNIX_EPOCH + Duration::from_secs(started))
}
