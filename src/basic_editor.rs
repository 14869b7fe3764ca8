use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::basic_dialect::IMMEDIATE_LINE;
use crate::basic_interpreter::Interpreter;
use crate::basic_parser::parse_source;
use crate::basic_runtime::LineSource;
use crate::basic_types::{BasicError, Program};

lazy_static! {
    static ref SINGLE_LINE: Regex = Regex::new(r"^(\d+)$").unwrap();
    static ref LINE_RANGE: Regex = Regex::new(r"^(\d*)\s*-\s*(\d*)$").unwrap();
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Basic(#[from] BasicError),

    #[error("line {line:?}: {message}")]
    Load { line: String, message: String },

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },
}

impl From<io::Error> for EditorError {
    fn from(source: io::Error) -> Self {
        EditorError::Io {
            action: "could not write to",
            path: "output".to_string(),
            source,
        }
    }
}

/// Inclusive range of line numbers; an open end runs to the last line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl LineRange {
    pub fn single(line: usize) -> Self {
        LineRange {
            start: line,
            end: Some(line),
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && self.end.map_or(true, |end| line <= end)
    }
}

fn parse_number(text: &str) -> Result<usize, EditorError> {
    text.parse::<usize>()
        .map_err(|_| EditorError::Usage(format!("invalid line number: {}", text)))
}

/// `LIST` argument: empty, `n`, `n-` or `n-m`.
pub fn parse_list_range(arg: &str) -> Result<Option<LineRange>, EditorError> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Ok(None);
    }
    if SINGLE_LINE.is_match(arg) {
        return Ok(Some(LineRange::single(parse_number(arg)?)));
    }
    let caps = LINE_RANGE
        .captures(arg)
        .ok_or_else(|| EditorError::Usage(format!("invalid line number: {}", arg)))?;
    let (start, end) = (&caps[1], &caps[2]);
    if start.is_empty() {
        return Err(EditorError::Usage(
            "LIST requires a starting line number".to_string(),
        ));
    }
    let start = parse_number(start)?;
    if end.is_empty() {
        return Ok(Some(LineRange { start, end: None }));
    }
    let end = parse_number(end)?;
    if end < start {
        return Err(EditorError::Usage(
            "end line must be >= start line".to_string(),
        ));
    }
    Ok(Some(LineRange {
        start,
        end: Some(end),
    }))
}

/// `DELETE` argument: `n` or `n-m`.
pub fn parse_delete_range(arg: &str) -> Result<LineRange, EditorError> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(EditorError::Usage("missing line number".to_string()));
    }
    if SINGLE_LINE.is_match(arg) {
        return Ok(LineRange::single(parse_number(arg)?));
    }
    let caps = LINE_RANGE
        .captures(arg)
        .ok_or_else(|| EditorError::Usage(format!("invalid line number: {}", arg)))?;
    let (start, end) = (&caps[1], &caps[2]);
    if start.is_empty() || end.is_empty() {
        return Err(EditorError::Usage(
            "DELETE range requires both start and end, e.g. DELETE 10-20".to_string(),
        ));
    }
    let start = parse_number(start)?;
    let end = parse_number(end)?;
    if end < start {
        return Err(EditorError::Usage(
            "end line must be >= start line".to_string(),
        ));
    }
    Ok(LineRange {
        start,
        end: Some(end),
    })
}

/// Raw source lines keyed by line number. The text is re-parsed as a
/// whole before every run.
#[derive(Debug, Clone, Default)]
pub struct ProgramBuffer {
    lines: BTreeMap<usize, String>,
}

impl ProgramBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn store(&mut self, line_number: usize, text: &str) {
        debug!(line = line_number, "stored line");
        self.lines.insert(line_number, text.to_string());
    }

    pub fn get(&self, line_number: usize) -> Option<&str> {
        self.lines.get(&line_number).map(String::as_str)
    }

    /// Removes every line in `range`, returning how many went.
    pub fn delete_range(&mut self, range: &LineRange) -> usize {
        let before = self.lines.len();
        self.lines.retain(|&n, _| !range.contains(n));
        let deleted = before - self.lines.len();
        debug!(deleted, "deleted lines");
        deleted
    }

    pub fn list(&self, range: Option<&LineRange>) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(&n, _)| range.map_or(true, |r| r.contains(n)))
            .map(|(_, text)| text.as_str())
            .collect()
    }

    /// Program text in ascending line order, one line per source line.
    pub fn source(&self) -> String {
        let mut text = String::new();
        for line in self.lines.values() {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Builds a buffer from program text. Every non-blank line must parse
    /// and carry a line number.
    pub fn from_text(text: &str) -> Result<Self, EditorError> {
        let mut buffer = ProgramBuffer::new();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let program = parse_source(line).map_err(|e| EditorError::Load {
                line: line.to_string(),
                message: e.to_string(),
            })?;
            for number in program.line_numbers() {
                if number == IMMEDIATE_LINE {
                    return Err(EditorError::Load {
                        line: line.to_string(),
                        message: "line must start with a line number".to_string(),
                    });
                }
                buffer.store(number, line);
            }
        }
        Ok(buffer)
    }

    /// Replaces the buffer with the program in `path`.
    pub fn load(&mut self, path: &str) -> Result<usize, EditorError> {
        let text = fs::read_to_string(path).map_err(|source| EditorError::Io {
            action: "could not read",
            path: path.to_string(),
            source,
        })?;
        *self = Self::from_text(&text)?;
        Ok(self.len())
    }

    pub fn save(&self, path: &str) -> Result<usize, EditorError> {
        fs::write(path, self.source()).map_err(|source| EditorError::Io {
            action: "could not write",
            path: path.to_string(),
            source,
        })?;
        Ok(self.len())
    }

    pub fn parse(&self) -> Result<Program, BasicError> {
        parse_source(&self.source())
    }

    /// Handles one typed line: numbered lines are stored, an unnumbered
    /// statement runs at once.
    pub fn handle_input(
        &mut self,
        line: &str,
        out: &mut dyn Write,
        input: &mut dyn LineSource,
    ) -> Result<(), EditorError> {
        let program = parse_source(line)?;
        if program.is_empty() {
            return Err(EditorError::Usage(
                "no statements parsed from input".to_string(),
            ));
        }

        for number in program.line_numbers() {
            if number == IMMEDIATE_LINE {
                let mut interpreter = Interpreter::new(program.clone());
                interpreter.run(out, input)?;
            } else {
                self.store(number, line);
                writeln!(out, "Line {} stored", number)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlow {
    Continue,
    Exit,
}

/// Interactive editor: shell commands plus BASIC lines over one buffer.
#[derive(Debug, Default)]
pub struct Shell {
    buffer: ProgramBuffer,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: ProgramBuffer) -> Self {
        Shell { buffer }
    }

    pub fn buffer(&self) -> &ProgramBuffer {
        &self.buffer
    }

    /// Reads commands from `input` until it runs dry or EXIT. Programs run
    /// by the shell read their INPUT lines from the same source.
    pub fn repl(
        &mut self,
        out: &mut dyn Write,
        err: &mut dyn Write,
        input: &mut dyn LineSource,
    ) -> io::Result<()> {
        loop {
            write!(out, "> ")?;
            out.flush()?;
            let line = match input.read_line()? {
                Some(line) => line,
                None => break,
            };
            match self.execute(&line, out, input) {
                Ok(ShellFlow::Exit) => break,
                Ok(ShellFlow::Continue) => {}
                Err(e) => {
                    warn!(error = %e, "command failed");
                    out.flush()?;
                    writeln!(err, "Error: {}", e)?;
                }
            }
        }
        out.flush()
    }

    pub fn execute(
        &mut self,
        line: &str,
        out: &mut dyn Write,
        input: &mut dyn LineSource,
    ) -> Result<ShellFlow, EditorError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ShellFlow::Continue);
        }

        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command.to_uppercase(), arg.trim()),
            None => (line.to_uppercase(), ""),
        };

        match (command.as_str(), arg.is_empty()) {
            ("EXIT", true) | ("QUIT", true) => return Ok(ShellFlow::Exit),
            ("RUN", true) => self.cmd_run(out, input)?,
            ("NEW", true) | ("CLEAR", true) => {
                self.buffer.clear();
                writeln!(out, "Program cleared")?;
            }
            ("LIST", _) => self.cmd_list(arg, out)?,
            ("DELETE", true) => writeln!(out, "Usage: DELETE <n> or DELETE <n-m>")?,
            ("DELETE", false) => {
                let deleted = self.buffer.delete_range(&parse_delete_range(arg)?);
                if deleted == 0 {
                    writeln!(out, "No matching lines to delete")?;
                } else {
                    writeln!(out, "Deleted {} line(s)", deleted)?;
                }
            }
            ("LOAD", true) => writeln!(out, "Usage: LOAD <file.bas>")?,
            ("LOAD", false) => {
                let count = self.buffer.load(arg)?;
                writeln!(out, "Loaded {} lines from {}", count, arg)?;
            }
            ("SAVE", true) => writeln!(out, "Usage: SAVE <file.bas>")?,
            ("SAVE", false) => {
                if self.buffer.is_empty() {
                    writeln!(out, "No program to save")?;
                } else {
                    let count = self.buffer.save(arg)?;
                    writeln!(out, "Saved {} lines to {}", count, arg)?;
                }
            }
            _ => self.buffer.handle_input(line, out, input)?,
        }
        Ok(ShellFlow::Continue)
    }

    fn cmd_run(&mut self, out: &mut dyn Write, input: &mut dyn LineSource) -> Result<(), EditorError> {
        if self.buffer.is_empty() {
            writeln!(out, "No program to run")?;
            return Ok(());
        }
        match self.buffer.parse() {
            Ok(program) => {
                Interpreter::new(program).run(out, input)?;
            }
            Err(BasicError::Syntax { messages }) => {
                writeln!(out, "Parser errors:")?;
                for message in messages {
                    writeln!(out, "\t{}", message)?;
                }
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn cmd_list(&self, arg: &str, out: &mut dyn Write) -> Result<(), EditorError> {
        if self.buffer.is_empty() {
            writeln!(out, "No program")?;
            return Ok(());
        }
        let range = parse_list_range(arg)?;
        let lines = self.buffer.list(range.as_ref());
        if range.is_some() && lines.is_empty() {
            writeln!(out, "No matching lines")?;
        }
        for line in lines {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}
