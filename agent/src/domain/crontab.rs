//! Crontab text model: classify lines, render replacement tables.
//!
//! A table is kept as an ordered list of lines, each either foreign text
//! (preserved byte-for-byte) or a slot holding a managed entry's id. Writing
//! fills slots in place, drops slots whose id is gone, and appends new
//! entries at the end.
//!
//! Pure functions only: no I/O, no async.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::domain::error::SchedulerError;
use crate::domain::job::{DiscoveredJob, JobEntry};
use crate::domain::marker::{self, MARKER_PREFIX};

/// Separator between a managed command and its marker.
pub const ANNOTATION_SEPARATOR: &str = " # ";

const SPECIAL_SCHEDULES: &[&str] = &[
    "@reboot",
    "@yearly",
    "@annually",
    "@monthly",
    "@weekly",
    "@daily",
    "@midnight",
    "@hourly",
];

/// One line of a crontab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrontabLine {
    /// Unowned text, without its line terminator.
    Foreign(String),
    /// Position of a managed entry.
    Managed(String),
}

/// Ordered layout of a crontab as last read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrontabTable {
    pub lines: Vec<CrontabLine>,
}

/// Result of classifying a crontab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCrontab {
    pub table: CrontabTable,
    pub managed: Vec<JobEntry>,
    /// Foreign lines that mention the marker keyword.
    pub ambiguous: Vec<String>,
}

/// Split `crontab -l` output into classified lines.
#[must_use]
pub fn parse(text: &str) -> ParsedCrontab {
    let mut parsed = ParsedCrontab::default();
    for line in split_lines(text) {
        if let Some(entry) = parse_managed_line(line) {
            parsed
                .table
                .lines
                .push(CrontabLine::Managed(entry.id.clone()));
            parsed.managed.push(entry);
        } else {
            if marker::resembles_marker(line) {
                parsed.ambiguous.push(line.to_string());
            }
            parsed.table.lines.push(CrontabLine::Foreign(line.to_string()));
        }
    }
    parsed
}

fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let empty = text.is_empty();
    body.split('\n').filter(move |_| !empty)
}

/// Parse a single line as a managed entry, or `None` if it is foreign.
#[must_use]
pub fn parse_managed_line(line: &str) -> Option<JobEntry> {
    if line.matches(MARKER_PREFIX).count() != 1 {
        return None;
    }
    let split = line.rfind(ANNOTATION_SEPARATOR)?;
    let body = &line[..split];
    let token = &line[split + ANNOTATION_SEPARATOR.len()..];
    let id = marker::decode(token)?;
    if body.trim_start().starts_with('#') || body.trim_start() != body {
        return None;
    }
    let (schedule, command) = split_schedule(body)?;
    let entry = JobEntry::new(id, schedule, command);
    (render_line(&entry).ok()?.as_str() == line).then_some(entry)
}

/// Split `<schedule> <command>` into its two parts, keeping both verbatim.
///
/// The schedule is five fields, or a single `@keyword`.
#[must_use]
pub fn split_schedule(body: &str) -> Option<(&str, &str)> {
    let text = body.trim_start();
    let fields = if text.starts_with('@') { 1 } else { 5 };
    let mut pos = 0;
    for n in 0..fields {
        if n > 0 {
            let rest = &text[pos..];
            let gap = rest.len() - rest.trim_start_matches([' ', '\t']).len();
            if gap == 0 {
                return None;
            }
            pos += gap;
        }
        let rest = &text[pos..];
        let len = rest.find([' ', '\t']).unwrap_or(rest.len());
        let field = &rest[..len];
        if !is_schedule_field(field, fields == 1) {
            return None;
        }
        pos += len;
    }
    let command = text[pos..].trim_start_matches([' ', '\t']);
    if command.is_empty() {
        return None;
    }
    Some((&text[..pos], command))
}

fn is_schedule_field(field: &str, special: bool) -> bool {
    if special {
        return SPECIAL_SCHEDULES.contains(&field);
    }
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | '/' | ',' | '-' | '?'))
}

/// Render a managed entry as a crontab line.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidEntry` if the id cannot be encoded.
pub fn render_line(entry: &JobEntry) -> Result<String, SchedulerError> {
    let token = marker::encode(&entry.id)?;
    Ok(format!(
        "{} {}{ANNOTATION_SEPARATOR}{token}",
        entry.schedule, entry.command
    ))
}

/// Check that `entry` survives a render/parse cycle unchanged.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidEntry` when the schedule does not have
/// exactly five fields (or one `@keyword`), so the command would be misread.
pub fn check_roundtrip(entry: &JobEntry) -> Result<(), SchedulerError> {
    let line = render_line(entry)?;
    match parse_managed_line(&line) {
        Some(parsed) if parsed.same_content(entry) => Ok(()),
        _ => Err(SchedulerError::invalid(
            &entry.id,
            format!(
                "schedule '{}' must be five cron fields or one of {}",
                entry.schedule,
                SPECIAL_SCHEDULES.join(", ")
            ),
        )),
    }
}

/// Render the full replacement table.
///
/// Foreign lines keep their original text and position. Managed slots are
/// filled in order with the entries for their id; slots left over are
/// dropped and entries without a slot are appended in order.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidEntry` if any entry cannot be rendered.
pub fn render(table: &CrontabTable, managed: &[JobEntry]) -> Result<String, SchedulerError> {
    let mut pending: HashMap<&str, VecDeque<&JobEntry>> = HashMap::new();
    for entry in managed {
        pending.entry(entry.id.as_str()).or_default().push_back(entry);
    }
    let mut placed: HashSet<*const JobEntry> = HashSet::new();
    let mut out = String::new();

    for line in &table.lines {
        match line {
            CrontabLine::Foreign(text) => {
                out.push_str(text);
                out.push('\n');
            }
            CrontabLine::Managed(id) => {
                if let Some(entry) = pending.get_mut(id.as_str()).and_then(VecDeque::pop_front) {
                    placed.insert(std::ptr::from_ref(entry));
                    out.push_str(&render_line(entry)?);
                    out.push('\n');
                }
            }
        }
    }
    for entry in managed {
        if !placed.contains(&std::ptr::from_ref(entry)) {
            out.push_str(&render_line(entry)?);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Foreign lines that look like jobs: not blank, not comments, not
/// `NAME=value` assignments, with a parseable schedule.
#[must_use]
pub fn discover(table: &CrontabTable) -> Vec<DiscoveredJob> {
    table
        .lines
        .iter()
        .enumerate()
        .filter_map(|(n, line)| match line {
            CrontabLine::Foreign(text) => discovered_job(n + 1, text),
            CrontabLine::Managed(_) => None,
        })
        .collect()
}

fn discovered_job(line_no: usize, text: &str) -> Option<DiscoveredJob> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || is_assignment(trimmed) {
        return None;
    }
    let (schedule, command) = split_schedule(trimmed)?;
    Some(DiscoveredJob {
        name: format!("line-{line_no}"),
        schedule: schedule.to_string(),
        command: command.to_string(),
    })
}

fn is_assignment(line: &str) -> bool {
    line.split_once('=').is_some_and(|(name, _)| {
        let name = name.trim();
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}
