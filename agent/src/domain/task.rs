//! Windows Task Scheduler definitions.
//!
//! Managed tasks are stored one per job. The ownership marker lives in
//! `RegistrationInfo/Source`, the job name in `Description`, and the
//! schedule text verbatim in `Documentation` so it reads back unchanged.
//!
//! Pure functions only: no I/O, no async.

use quick_xml::escape::escape;
use serde::Deserialize;

use crate::domain::error::SchedulerError;
use crate::domain::job::JobEntry;
use crate::domain::marker;

/// Fixed start boundary date used for generated triggers.
const START_DATE: &str = "2024-01-01";

const WEEKDAYS: &[&str] = &[
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTHS: &[&str] = &[
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// ── Parsed task document ──────────────────────────────────────────────────────

/// The fields of a task definition the agent reads back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDefinition {
    pub source: Option<String>,
    pub description: Option<String>,
    pub documentation: Option<String>,
    pub command: String,
}

#[derive(Deserialize, Default)]
struct TaskXml {
    #[serde(rename = "RegistrationInfo", default)]
    registration_info: RegistrationInfoXml,
    #[serde(rename = "Actions", default)]
    actions: ActionsXml,
}

#[derive(Deserialize, Default)]
struct RegistrationInfoXml {
    #[serde(rename = "Source", default)]
    source: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Documentation", default)]
    documentation: Option<String>,
}

#[derive(Deserialize, Default)]
struct ActionsXml {
    #[serde(rename = "Exec", default)]
    exec: Vec<ExecXml>,
}

#[derive(Deserialize)]
struct ExecXml {
    #[serde(rename = "Command", default)]
    command: String,
    #[serde(rename = "Arguments", default)]
    arguments: Option<String>,
}

/// Parse the XML printed by `schtasks /Query /XML`.
///
/// # Errors
///
/// Returns `SchedulerError::Malformed` if the document cannot be parsed.
pub fn parse_task_xml(xml: &str) -> Result<TaskDefinition, SchedulerError> {
    let body = strip_declaration(xml.trim_start_matches('\u{feff}'));
    if !body.starts_with('<') {
        return Err(SchedulerError::Malformed(format!(
            "expected task XML, got: {}",
            body.lines().next().unwrap_or_default()
        )));
    }
    let task: TaskXml = quick_xml::de::from_str(body)
        .map_err(|e| SchedulerError::Malformed(format!("task XML: {e}")))?;
    let command = task
        .actions
        .exec
        .first()
        .map(|exec| join_command(&exec.command, exec.arguments.as_deref().unwrap_or("")))
        .unwrap_or_default();
    let info = task.registration_info;
    Ok(TaskDefinition {
        source: info.source,
        description: info.description,
        documentation: info.documentation,
        command,
    })
}

fn strip_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml")
        && let Some(end) = trimmed.find("?>")
    {
        return trimmed[end + 2..].trim_start();
    }
    trimmed
}

impl TaskDefinition {
    /// Interpret the task as a managed entry named `leaf` in the managed folder.
    ///
    /// Returns `None` unless `Source` decodes to exactly `leaf`.
    #[must_use]
    pub fn to_managed_entry(&self, leaf: &str) -> Option<JobEntry> {
        let id = marker::decode(self.source.as_deref()?.trim())?;
        if id != leaf {
            return None;
        }
        Some(JobEntry {
            name: self.description.clone().unwrap_or_else(|| id.clone()),
            schedule: self.documentation.clone().unwrap_or_default(),
            command: self.command.clone(),
            id,
        })
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Render a complete task definition for `schtasks /Create /XML`.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidEntry` if the id cannot be encoded or the
/// schedule cannot be expressed as triggers.
pub fn render_task_xml(entry: &JobEntry) -> Result<String, SchedulerError> {
    let token = marker::encode(&entry.id)?;
    let triggers = triggers_for(&entry.schedule)
        .map_err(|reason| SchedulerError::invalid(&entry.id, reason))?;
    let (program, arguments) = split_command(&entry.command);
    let arguments = if arguments.is_empty() {
        String::new()
    } else {
        format!("\n      <Arguments>{}</Arguments>", escape(arguments))
    };

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-16"?>
<Task version="1.2" xmlns="http://schemas.microsoft.com/windows/2004/02/mit/task">
  <RegistrationInfo>
    <Description>{description}</Description>
    <Documentation>{schedule}</Documentation>
    <Source>{token}</Source>
  </RegistrationInfo>
  <Triggers>
    {triggers}
  </Triggers>
  <Principals>
    <Principal>
      <LogonType>InteractiveToken</LogonType>
      <RunLevel>LeastPrivilege</RunLevel>
    </Principal>
  </Principals>
  <Settings>
    <MultipleInstancesPolicy>IgnoreNew</MultipleInstancesPolicy>
    <DisallowStartIfOnBatteries>false</DisallowStartIfOnBatteries>
    <StopIfGoingOnBatteries>false</StopIfGoingOnBatteries>
    <AllowHardTerminate>true</AllowHardTerminate>
    <StartWhenAvailable>true</StartWhenAvailable>
    <RunOnlyIfNetworkAvailable>false</RunOnlyIfNetworkAvailable>
    <AllowStartOnDemand>true</AllowStartOnDemand>
    <Enabled>true</Enabled>
    <Hidden>false</Hidden>
  </Settings>
  <Actions Context="Author">
    <Exec>
      <Command>{program}</Command>{arguments}
    </Exec>
  </Actions>
</Task>
"#,
        description = escape(&entry.name),
        schedule = escape(&entry.schedule),
        program = escape(program),
    ))
}

/// Encode a task document the way `schtasks /XML` expects it on disk.
#[must_use]
pub fn to_utf16_file(xml: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in xml.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// Decode native tool output that may be UTF-16LE (with BOM) or UTF-8.
#[must_use]
pub fn decode_native_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    String::from_utf8_lossy(bytes).into_owned()
}

// ── Task listing ──────────────────────────────────────────────────────────────

/// Folder of built-in system tasks, never reported by discovery.
pub const SYSTEM_FOLDER: &str = "\\Microsoft\\";

/// Task paths from `schtasks /Query /FO CSV /NH`, first occurrence order.
///
/// Only the first (task name) column is read.
#[must_use]
pub fn parse_task_list(text: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for line in text.lines() {
        let Some(rest) = line.trim().strip_prefix('"') else {
            continue;
        };
        let Some(end) = rest.find('"') else {
            continue;
        };
        let path = &rest[..end];
        if path.starts_with('\\') && !paths.iter().any(|p| p == path) {
            paths.push(path.to_string());
        }
    }
    paths
}

/// The task name of `path` if it sits directly in `folder`.
///
/// Folder matching ignores ASCII case, as Task Scheduler does.
#[must_use]
pub fn leaf_in_folder<'a>(path: &'a str, folder: &str) -> Option<&'a str> {
    let prefix = path.get(..folder.len())?;
    if !prefix.eq_ignore_ascii_case(folder) {
        return None;
    }
    let leaf = &path[folder.len()..];
    (!leaf.is_empty() && !leaf.contains('\\')).then_some(leaf)
}

/// `folder` followed by the task name for `id`.
#[must_use]
pub fn task_path(folder: &str, id: &str) -> String {
    format!("{folder}{id}")
}

/// Task names are case-insensitive, so ids that differ only in case would
/// share one task. Returns the first id and the later one that clashes with it.
#[must_use]
pub fn case_collision(entries: &[JobEntry]) -> Option<(&str, &str)> {
    entries.iter().enumerate().find_map(|(i, later)| {
        entries[..i]
            .iter()
            .find(|earlier| earlier.id != later.id && earlier.id.eq_ignore_ascii_case(&later.id))
            .map(|earlier| (earlier.id.as_str(), later.id.as_str()))
    })
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Split a command line into program and arguments.
///
/// A leading double-quoted program keeps its quotes.
#[must_use]
pub fn split_command(command: &str) -> (&str, &str) {
    let command = command.trim();
    let end = if command.starts_with('"') {
        command[1..].find('"').map_or(command.len(), |i| i + 2)
    } else {
        command.find(char::is_whitespace).unwrap_or(command.len())
    };
    let (program, rest) = command.split_at(end);
    (program, rest.trim_start())
}

/// Inverse of [`split_command`].
#[must_use]
pub fn join_command(program: &str, arguments: &str) -> String {
    if arguments.is_empty() {
        program.to_string()
    } else {
        format!("{program} {arguments}")
    }
}

/// Check that `entry` reads back unchanged once installed as a task.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidEntry` if the schedule is not
/// translatable or the command would be rejoined differently.
pub fn check_roundtrip(entry: &JobEntry) -> Result<(), SchedulerError> {
    triggers_for(&entry.schedule).map_err(|reason| SchedulerError::invalid(&entry.id, reason))?;
    let (program, arguments) = split_command(&entry.command);
    if join_command(program, arguments) != entry.command {
        return Err(SchedulerError::invalid(
            &entry.id,
            "command must separate the program from its arguments with a single space",
        ));
    }
    Ok(())
}

// ── Schedules ─────────────────────────────────────────────────────────────────

/// Translate a schedule into Task Scheduler trigger XML.
///
/// Text starting with `<` is taken as native trigger XML and used verbatim.
/// Otherwise a subset of cron expressions is supported.
///
/// # Errors
///
/// Returns a human-readable reason when the schedule has no trigger form.
pub fn triggers_for(schedule: &str) -> Result<String, String> {
    let schedule = schedule.trim();
    if schedule.starts_with('<') {
        return Ok(schedule.to_string());
    }
    let unsupported = || {
        format!(
            "schedule '{schedule}' has no Task Scheduler equivalent \
             (supported: @hourly, @daily, @weekly, */N * * * *, M * * * *, \
             M H * * *, M H * * D[,D...], M H D * *, or raw trigger XML)"
        )
    };

    match schedule {
        "@hourly" => return Ok(repeating(0, 0, "PT1H")),
        "@daily" | "@midnight" => return Ok(daily(0, 0)),
        "@weekly" => return Ok(weekly(0, 0, &[0])),
        _ => {}
    }

    let fields: Vec<&str> = schedule.split_whitespace().collect();
    let [minute, hour, dom, month, dow] = fields.as_slice() else {
        return Err(unsupported());
    };
    if *month != "*" {
        return Err(unsupported());
    }

    match (*minute, *hour, *dom, *dow) {
        ("*", "*", "*", "*") => Ok(repeating(0, 0, "PT1M")),
        (m, "*", "*", "*") if m.starts_with("*/") => {
            let step = parse_number(&m[2..], 1, 59).ok_or_else(unsupported)?;
            Ok(repeating(0, 0, &format!("PT{step}M")))
        }
        (m, "*", "*", "*") => {
            let minute = parse_number(m, 0, 59).ok_or_else(unsupported)?;
            Ok(repeating(0, minute, "PT1H"))
        }
        (m, h, "*", "*") => {
            let (hour, minute) = time_of_day(h, m).ok_or_else(unsupported)?;
            Ok(daily(hour, minute))
        }
        (m, h, "*", days) => {
            let (hour, minute) = time_of_day(h, m).ok_or_else(unsupported)?;
            let days = parse_weekdays(days).ok_or_else(unsupported)?;
            Ok(weekly(hour, minute, &days))
        }
        (m, h, day, "*") => {
            let (hour, minute) = time_of_day(h, m).ok_or_else(unsupported)?;
            let day = parse_number(day, 1, 31).ok_or_else(unsupported)?;
            Ok(monthly(hour, minute, day))
        }
        _ => Err(unsupported()),
    }
}

fn parse_number(text: &str, min: u32, max: u32) -> Option<u32> {
    let value: u32 = text.parse().ok()?;
    (min..=max).contains(&value).then_some(value)
}

fn time_of_day(hour: &str, minute: &str) -> Option<(u32, u32)> {
    Some((parse_number(hour, 0, 23)?, parse_number(minute, 0, 59)?))
}

fn parse_weekdays(text: &str) -> Option<Vec<usize>> {
    let mut days = Vec::new();
    for part in text.split(',') {
        let day = match part.to_ascii_lowercase().as_str() {
            "0" | "7" | "sun" => 0,
            "1" | "mon" => 1,
            "2" | "tue" => 2,
            "3" | "wed" => 3,
            "4" | "thu" => 4,
            "5" | "fri" => 5,
            "6" | "sat" => 6,
            _ => return None,
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }
    days.sort_unstable();
    Some(days)
}

fn start_boundary(hour: u32, minute: u32) -> String {
    format!("<StartBoundary>{START_DATE}T{hour:02}:{minute:02}:00</StartBoundary>")
}

fn repeating(hour: u32, minute: u32, interval: &str) -> String {
    format!(
        "<TimeTrigger>{}<Repetition><Interval>{interval}</Interval></Repetition><Enabled>true</Enabled></TimeTrigger>",
        start_boundary(hour, minute)
    )
}

fn daily(hour: u32, minute: u32) -> String {
    format!(
        "<CalendarTrigger>{}<Enabled>true</Enabled><ScheduleByDay><DaysInterval>1</DaysInterval></ScheduleByDay></CalendarTrigger>",
        start_boundary(hour, minute)
    )
}

fn weekly(hour: u32, minute: u32, days: &[usize]) -> String {
    let days: String = days
        .iter()
        .map(|&d| format!("<{}/>", WEEKDAYS[d]))
        .collect();
    format!(
        "<CalendarTrigger>{}<Enabled>true</Enabled><ScheduleByWeek><WeeksInterval>1</WeeksInterval><DaysOfWeek>{days}</DaysOfWeek></ScheduleByWeek></CalendarTrigger>",
        start_boundary(hour, minute)
    )
}

fn monthly(hour: u32, minute: u32, day: u32) -> String {
    let months: String = MONTHS.iter().map(|m| format!("<{m}/>")).collect();
    format!(
        "<CalendarTrigger>{}<Enabled>true</Enabled><ScheduleByMonth><DaysOfMonth><Day>{day}</Day></DaysOfMonth><Months>{months}</Months></ScheduleByMonth></CalendarTrigger>",
        start_boundary(hour, minute)
    )
}
