//! Shared fakes for unit tests.
//!
//! [`FakeCrontab`] and [`FakeSchtasks`] emulate the native tools in memory;
//! [`ScriptedRunner`] maps canonical command strings to canned replies. All
//! of them record every invocation.

#![allow(dead_code, clippy::expect_used)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use crontopus_agent::application::ports::CommandRunner;
use crontopus_agent::domain::error::CommandError;
use crontopus_agent::domain::task::decode_native_text;

// ── Error helpers ─────────────────────────────────────────────────────────────

pub fn exit(program: &str, code: i32, output: &str) -> CommandError {
    CommandError::NonZeroExit {
        program: program.to_string(),
        code,
        output: output.to_string(),
    }
}

pub fn not_found(program: &str) -> CommandError {
    CommandError::Spawn {
        program: program.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
    }
}

fn canonical(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Fake crontab ──────────────────────────────────────────────────────────────

/// In-memory `crontab -l` / `crontab -`.
#[derive(Default)]
pub struct FakeCrontab {
    /// `None` means no crontab is installed for the user.
    table: RefCell<Option<String>>,
    calls: RefCell<Vec<String>>,
    installs: RefCell<Vec<String>>,
    reads: Cell<usize>,
    /// `(substring, diagnostic)`: reject installs containing the substring.
    reject: RefCell<Option<(String, String)>>,
    /// `(read number, table)`: replace the table right after that read.
    edit_after_read: RefCell<Option<(usize, String)>>,
    unavailable: Cell<bool>,
}

impl FakeCrontab {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_table(text: &str) -> Self {
        let fake = Self::default();
        *fake.table.borrow_mut() = Some(text.to_string());
        fake
    }

    pub fn table(&self) -> String {
        self.table.borrow().clone().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Every table installed, in order.
    pub fn installs(&self) -> Vec<String> {
        self.installs.borrow().clone()
    }

    pub fn reject_containing(&self, needle: &str, diagnostic: &str) {
        *self.reject.borrow_mut() = Some((needle.to_string(), diagnostic.to_string()));
    }

    pub fn edit_after_read(&self, read: usize, table: &str) {
        *self.edit_after_read.borrow_mut() = Some((read, table.to_string()));
    }

    pub fn set_unavailable(&self) {
        self.unavailable.set(true);
    }
}

impl CommandRunner for FakeCrontab {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        self.calls.borrow_mut().push(canonical(program, args));
        if self.unavailable.get() {
            return Err(not_found(program));
        }
        assert_eq!(args, ["-l"], "unexpected crontab invocation");
        let reads = self.reads.get() + 1;
        self.reads.set(reads);
        let current = self.table.borrow().clone();
        let pending = self.edit_after_read.borrow().clone();
        if let Some((at, edited)) = pending
            && at == reads
        {
            *self.table.borrow_mut() = Some(edited);
        }
        match current {
            Some(text) => Ok(text.into_bytes()),
            None => Err(exit(program, 1, "no crontab for tester\n")),
        }
    }

    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        stdin: &[u8],
    ) -> Result<Vec<u8>, CommandError> {
        self.calls.borrow_mut().push(canonical(program, args));
        if self.unavailable.get() {
            return Err(not_found(program));
        }
        assert_eq!(args, ["-"], "unexpected crontab invocation");
        let text = String::from_utf8(stdin.to_vec()).expect("utf-8 crontab");
        if let Some((needle, diagnostic)) = self.reject.borrow().as_ref()
            && text.contains(needle.as_str())
        {
            return Err(exit(program, 1, diagnostic));
        }
        self.installs.borrow_mut().push(text.clone());
        *self.table.borrow_mut() = Some(text);
        Ok(Vec::new())
    }
}

// ── Fake schtasks ─────────────────────────────────────────────────────────────

const NOT_FOUND: &str = "ERROR: The system cannot find the file specified.\r\n";

/// In-memory task store driven through `schtasks` arguments.
#[derive(Default)]
pub struct FakeSchtasks {
    /// `(path, xml)` in enumeration order.
    tasks: RefCell<Vec<(String, String)>>,
    calls: RefCell<Vec<String>>,
    reject: RefCell<Option<(String, String)>>,
    utf16: Cell<bool>,
    ignore_case: Cell<bool>,
}

impl FakeSchtasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries in UTF-16LE with a BOM, like a real console code page.
    pub fn answer_utf16(&self) {
        self.utf16.set(true);
    }

    /// Match task paths case-insensitively, like the real Task Scheduler.
    /// Overwriting keeps the existing spelling of the path.
    pub fn ignore_case(&self) {
        self.ignore_case.set(true);
    }

    fn same_path(&self, a: &str, b: &str) -> bool {
        if self.ignore_case.get() {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }

    pub fn insert(&self, path: &str, xml: &str) {
        let mut tasks = self.tasks.borrow_mut();
        if let Some(slot) = tasks.iter_mut().find(|(p, _)| self.same_path(p, path)) {
            slot.1 = xml.to_string();
        } else {
            tasks.push((path.to_string(), xml.to_string()));
        }
    }

    pub fn xml(&self, path: &str) -> Option<String> {
        self.tasks
            .borrow()
            .iter()
            .find(|(p, _)| self.same_path(p, path))
            .map(|(_, x)| x.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.tasks.borrow().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls that change the store.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains("/Create") || c.contains("/Delete"))
            .collect()
    }

    pub fn reject_containing(&self, needle: &str, diagnostic: &str) {
        *self.reject.borrow_mut() = Some((needle.to_string(), diagnostic.to_string()));
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        if self.utf16.get() {
            crontopus_agent::domain::task::to_utf16_file(text)
        } else {
            text.as_bytes().to_vec()
        }
    }
}

impl CommandRunner for FakeSchtasks {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        // The task file is a temp path; record it as a placeholder.
        let recorded: Vec<&str> = args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                if i > 0 && args[i - 1] == "/XML" && args[0] == "/Create" {
                    "<file>"
                } else {
                    *a
                }
            })
            .collect();
        self.calls.borrow_mut().push(canonical(program, &recorded));

        match args {
            ["/Query", "/FO", "CSV", "/NH"] => {
                let listing: String = self
                    .tasks
                    .borrow()
                    .iter()
                    .map(|(path, _)| format!("\"{path}\",\"N/A\",\"Ready\"\r\n"))
                    .collect();
                Ok(self.encode(&listing))
            }
            ["/Query", "/TN", path, "/XML"] => match self.xml(path) {
                Some(xml) => Ok(self.encode(&xml)),
                None => Err(exit(program, 1, NOT_FOUND)),
            },
            ["/Delete", "/TN", path, "/F"] => {
                let mut tasks = self.tasks.borrow_mut();
                let before = tasks.len();
                tasks.retain(|(p, _)| !self.same_path(p, path));
                if tasks.len() == before {
                    return Err(exit(program, 1, NOT_FOUND));
                }
                Ok(b"SUCCESS: The scheduled task was successfully deleted.\r\n".to_vec())
            }
            ["/Create", "/TN", path, "/XML", file, "/F"] => {
                let bytes = std::fs::read(file).expect("task file exists during /Create");
                let xml = decode_native_text(&bytes);
                if let Some((needle, diagnostic)) = self.reject.borrow().as_ref()
                    && xml.contains(needle.as_str())
                {
                    return Err(exit(program, 1, diagnostic));
                }
                self.insert(path, &xml);
                Ok(b"SUCCESS: The scheduled task has successfully been created.\r\n".to_vec())
            }
            other => panic!("unexpected schtasks invocation: {other:?}"),
        }
    }

    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        _stdin: &[u8],
    ) -> Result<Vec<u8>, CommandError> {
        panic!("schtasks never reads stdin: {}", canonical(program, args))
    }
}

// ── Scripted runner ───────────────────────────────────────────────────────────

/// A canned reply for one command.
#[derive(Clone)]
pub enum Reply {
    Ok(Vec<u8>),
    Exit(i32, String),
    Missing,
}

/// Maps `program arg...` to queued replies; the last reply repeats.
/// Unscripted commands fail as if the program did not exist.
#[derive(Default)]
pub struct ScriptedRunner {
    replies: RefCell<HashMap<String, VecDeque<Reply>>>,
    calls: RefCell<Vec<(String, Option<Vec<u8>>)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, command: &str, reply: Reply) -> Self {
        self.replies
            .borrow_mut()
            .entry(command.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(c, _)| c.clone()).collect()
    }

    /// Standard input passed to each call that had one.
    pub fn stdin_of(&self, command: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|(c, _)| c == command)
            .filter_map(|(_, input)| input.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    fn reply(&self, program: &str, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>, CommandError> {
        let key = canonical(program, args);
        self.calls
            .borrow_mut()
            .push((key.clone(), stdin.map(<[u8]>::to_vec)));
        let mut replies = self.replies.borrow_mut();
        let reply = match replies.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        match reply.unwrap_or(Reply::Missing) {
            Reply::Ok(bytes) => Ok(bytes),
            Reply::Exit(code, output) => Err(exit(program, code, &output)),
            Reply::Missing => Err(not_found(program)),
        }
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        self.reply(program, args, None)
    }

    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        stdin: &[u8],
    ) -> Result<Vec<u8>, CommandError> {
        self.reply(program, args, Some(stdin))
    }
}
