//! Stack record classification
//!
//! A dump is a sequence of records separated by a blank line. Each record
//! has a header line and a body:
//!
//! ```text
//! thread 4242 [sleeping]:
//! name: worker-1
//! state: S (sleeping)
//! wchan: futex_wait_queue
//! ```
//!
//! The header is `<label> <numeric-id> <bracketed-state>:`. The body is
//! whatever the task source knows about the task; ignore rules only ever
//! look at the body.
//!
//! # Algorithm
//!
//! 1. Split header from body at the first line break (no body: parse error)
//! 2. Drop the record if the body starts with [`MAIN_THREAD_MARKER`]
//! 3. Drop the record if the body is empty or any ignore rule matches it
//! 4. Parse the id from the header (bad header or id: parse error)

use crate::error::ParseError;
use crate::ignore::IgnoreRules;
use crate::reporter::ErrorReporter;
use crate::task::TaskDescriptor;

/// First body line of the process leader thread, where the harness runs
pub const MAIN_THREAD_MARKER: &str = "main thread";

/// Separator between records in a dump
pub const RECORD_SEPARATOR: &str = "\n\n";

/// Classify one raw record
///
/// Returns `Ok(None)` for records that are not interesting: the main
/// thread, empty bodies and anything an ignore rule matches. A record that
/// cannot be decoded is an error, never a leak.
pub fn classify(record: &str, rules: &IgnoreRules) -> Result<Option<TaskDescriptor>, ParseError> {
    let Some((header, body)) = record.split_once('\n') else {
        return Err(ParseError::MissingBody(record.to_string()));
    };

    let body = body.trim();
    if body.starts_with(MAIN_THREAD_MARKER) {
        return Ok(None);
    }
    if body.is_empty() || rules.matches(body) {
        return Ok(None);
    }

    let id = parse_id(header)?;
    Ok(Some(TaskDescriptor::new(id, record.trim())))
}

/// Parse the numeric id out of `"<label> <id> <state>:"`
fn parse_id(header: &str) -> Result<u64, ParseError> {
    let tokens: Vec<&str> = header.splitn(3, ' ').collect();
    if tokens.len() < 3 {
        return Err(ParseError::MalformedHeader(header.to_string()));
    }
    tokens[1]
        .parse::<u64>()
        .map_err(|source| ParseError::InvalidId {
            token: tokens[1].to_string(),
            source,
        })
}

/// Split a dump into its records, skipping blank chunks
pub fn records(dump: &str) -> impl Iterator<Item = &str> {
    dump.split(RECORD_SEPARATOR)
        .filter(|chunk| !chunk.trim().is_empty())
}

/// Classify every record, returning both results and parse errors
///
/// Tasks come back sorted by id. Used by the CLI, which prints errors
/// itself instead of going through a reporter.
pub fn classify_dump(dump: &str, rules: &IgnoreRules) -> (Vec<TaskDescriptor>, Vec<ParseError>) {
    let mut tasks = Vec::new();
    let mut errors = Vec::new();
    for record in records(dump) {
        match classify(record, rules) {
            Ok(Some(task)) => tasks.push(task),
            Ok(None) => {}
            Err(err) => errors.push(err),
        }
    }
    tasks.sort_by_key(|task| task.id);
    (tasks, errors)
}

/// All tasks worth leak checking in `dump`, sorted by id
///
/// Parse errors are reported through `reporter` and the record skipped.
pub fn interesting_tasks<R>(dump: &str, rules: &IgnoreRules, reporter: &R) -> Vec<TaskDescriptor>
where
    R: ErrorReporter + ?Sized,
{
    let (tasks, errors) = classify_dump(dump, rules);
    for err in errors {
        tracing::debug!(error = %err, "skipping unparseable stack record");
        reporter.error(format_args!("leakcheck: {}", err));
    }
    tasks
}
