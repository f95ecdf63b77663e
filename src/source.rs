//! Task enumeration
//!
//! A [`TaskSource`] produces one text dump describing every live task of a
//! process. The checker treats the dump as opaque input and hands it to the
//! classifier.
//!
//! [`ProcThreads`] is the default source. It walks `/proc/<pid>/task/` and
//! renders each OS thread as a record:
//!
//! ```text
//! thread 4243 [sleeping]:
//! name: worker-1
//! state: S (sleeping)
//! wchan: futex_wait_queue
//! ```
//!
//! The process leader gets [`MAIN_THREAD_MARKER`] as its first body line. The
//! kernel stack is appended when `/proc/<pid>/task/<tid>/stack` is readable
//! (usually root only).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::classify::{MAIN_THREAD_MARKER, RECORD_SEPARATOR};
use crate::error::Result;

/// "No such process", returned for files of a thread that just exited
const ESRCH: i32 = 3;

/// Something that can list the live tasks of a process
pub trait TaskSource: Send + Sync {
    /// Every live task's record, separated by blank lines
    fn dump(&self) -> Result<String>;
}

impl<F> TaskSource for F
where
    F: Fn() -> Result<String> + Send + Sync,
{
    fn dump(&self) -> Result<String> {
        self()
    }
}

/// A fixed dump, returned as-is on every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDump(pub String);

impl TaskSource for StaticDump {
    fn dump(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Thread dumps read from procfs
#[derive(Debug, Clone)]
pub struct ProcThreads {
    root: PathBuf,
    pid: Option<u32>,
}

impl ProcThreads {
    /// Threads of the calling process
    pub fn current() -> Self {
        Self {
            root: PathBuf::from("/proc"),
            pid: None,
        }
    }

    /// Threads of another process
    pub fn for_pid(pid: u32) -> Self {
        Self {
            root: PathBuf::from("/proc"),
            pid: Some(pid),
        }
    }

    /// Read from a different procfs mount (or a fake tree)
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn pid(&self) -> u32 {
        self.pid.unwrap_or_else(std::process::id)
    }

    fn task_dir(&self) -> PathBuf {
        self.root.join(self.pid().to_string()).join("task")
    }

    /// Thread ids currently listed under the task directory, ascending
    pub fn thread_ids(&self) -> Result<Vec<u64>> {
        let mut tids = Vec::new();
        for entry in fs::read_dir(self.task_dir())? {
            let entry = entry?;
            if let Some(tid) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
                tids.push(tid);
            }
        }
        tids.sort_unstable();
        Ok(tids)
    }

    /// Render one thread, or `None` if it exited while we were looking
    fn record(&self, tid: u64) -> io::Result<Option<String>> {
        let dir = self.task_dir().join(tid.to_string());
        let status = match fs::read_to_string(dir.join("status")) {
            Ok(status) => status,
            Err(e) if thread_gone(&e) => return Ok(None),
            Err(e) => return Err(e),
        };

        let name = status_field(&status, "Name").unwrap_or("?");
        let state = status_field(&status, "State").unwrap_or("?");

        let mut record = format!("thread {} [{}]:\n", tid, state_word(state));
        if tid == u64::from(self.pid()) {
            record.push_str(MAIN_THREAD_MARKER);
            record.push('\n');
        }
        record.push_str(&format!("name: {}\nstate: {}", name, state));

        if let Some(wchan) = read_optional(&dir.join("wchan")) {
            if wchan != "0" {
                record.push_str(&format!("\nwchan: {}", wchan));
            }
        }
        if let Some(stack) = read_optional(&dir.join("stack")) {
            record.push('\n');
            record.push_str(&stack);
        }
        Ok(Some(record))
    }
}

impl Default for ProcThreads {
    fn default() -> Self {
        Self::current()
    }
}

impl TaskSource for ProcThreads {
    fn dump(&self) -> Result<String> {
        let mut records = Vec::new();
        for tid in self.thread_ids()? {
            if let Some(record) = self.record(tid)? {
                records.push(record);
            }
        }
        tracing::trace!(pid = self.pid(), threads = records.len(), "enumerated threads");
        Ok(records.join(RECORD_SEPARATOR))
    }
}

fn thread_gone(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(ESRCH)
}

/// Value of a `Key:\tvalue` line in a status file
fn status_field<'a>(status: &'a str, key: &str) -> Option<&'a str> {
    status.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k == key).then(|| v.trim())
    })
}

/// `"S (sleeping)"` -> `"sleeping"`
fn state_word(state: &str) -> &str {
    match (state.find('('), state.rfind(')')) {
        (Some(open), Some(close)) if open < close => &state[open + 1..close],
        _ => state,
    }
}

/// Trimmed file contents, or `None` if unreadable or empty
fn read_optional(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
