//! Output formatting for CLI commands.
//!
//! Human-readable output goes to stdout through [`OutputContext`]; with
//! `--json` every command instead prints one [`JsonOutput`] or
//! [`JsonError`] document.

use crate::errors::{ErrorKind, MuddleError};
use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Write};

/// Version of the `--json` document layout
const OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Write one line. A closed pipe (`muddle plan ... | head`) ends the process
/// quietly instead of surfacing as an error.
fn emit(stream: Stream, line: &str) -> io::Result<()> {
    let result = match stream {
        Stream::Stdout => writeln!(io::stdout().lock(), "{}", line),
        Stream::Stderr => writeln!(io::stderr().lock(), "{}", line),
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => std::process::exit(0),
        other => other,
    }
}

/// Where command results go, given the `--quiet` and `--json` switches.
///
/// | call          | default | `--quiet` | `--json` |
/// |---------------|---------|-----------|----------|
/// | `print_data`  | stdout  | stdout    | dropped  |
/// | `print_info`  | stdout  | dropped   | dropped  |
/// | `print_json`  | stdout  | stdout    | stdout   |
/// | `print_error` | stderr  | stderr    | stderr   |
pub struct OutputContext {
    quiet: bool,
    json: bool,
}

impl OutputContext {
    pub fn new(quiet: bool, json: bool) -> Self {
        Self { quiet, json }
    }

    /// Results proper: labels, rules, build reports.
    pub fn print_data(&self, msg: impl Display) -> io::Result<()> {
        if self.json {
            Ok(())
        } else {
            emit(Stream::Stdout, &msg.to_string())
        }
    }

    /// Summaries and hints.
    pub fn print_info(&self, msg: impl Display) -> io::Result<()> {
        if self.quiet || self.json {
            Ok(())
        } else {
            emit(Stream::Stdout, &msg.to_string())
        }
    }

    pub fn print_error(&self, msg: impl Display) -> io::Result<()> {
        emit(Stream::Stderr, &format!("Error: {}", msg))
    }

    pub fn print_json(&self, document: &str) -> io::Result<()> {
        emit(Stream::Stdout, document)
    }

    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// A document printed in `--json` mode.
pub trait JsonDocument: Serialize {
    fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Layout version and the subcommand that produced a document.
#[derive(Debug, Serialize)]
pub struct Metadata {
    pub version: &'static str,
    pub command: String,
}

impl Metadata {
    pub fn for_command(command: impl Into<String>) -> Self {
        Self {
            version: OUTPUT_VERSION,
            command: command.into(),
        }
    }
}

/// `{"success": true, "data": ..., "metadata": ...}`
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub metadata: Metadata,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(data: T, command: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            metadata: Metadata::for_command(command),
        }
    }
}

impl<T: Serialize> JsonDocument for JsonOutput<T> {}

/// `{"success": false, "error": {...}, "metadata": ...}`
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub success: bool,
    pub error: ErrorDetail,
    pub metadata: Metadata,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// One of the [`ErrorCode`] constants
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl JsonError {
    /// Describe an error returned by a command.
    ///
    /// A give-up error anywhere in the context chain contributes its
    /// headline and causes; anything else is reported by its full message.
    pub fn from_error(error: &anyhow::Error, command: impl Into<String>) -> Self {
        let code = ErrorCode::for_exit_code(ExitCode::for_error(error));
        let actionable = error.chain().find_map(|cause| match cause.downcast_ref::<MuddleError>() {
            Some(MuddleError::GiveUp(actionable)) => Some(actionable),
            _ => None,
        });
        let (message, causes) = match actionable {
            Some(actionable) => (actionable.message().to_string(), actionable.causes().to_vec()),
            None => (format!("{:#}", error), Vec::new()),
        };
        Self {
            success: false,
            error: ErrorDetail { code, message, causes },
            metadata: Metadata::for_command(command),
        }
    }
}

impl JsonDocument for JsonError {}

/// Exit codes for the muddle CLI
///
/// # Examples
///
/// ```rust
/// use muddle::ExitCode;
///
/// assert_eq!(ExitCode::Success.code(), 0);
/// assert_eq!(ExitCode::InternalError.code(), 70);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded (0)
    Success = 0,

    /// Generic error, including failed actions (1)
    GenericError = 1,

    /// Invalid label or argument (2)
    InvalidArgument = 2,

    /// No rule for a target, or missing description file (3)
    NotFound = 3,

    /// Dependency graph circular or incomplete (4)
    ValidationFailed = 4,

    /// Internal invariant violated (70, EX_SOFTWARE)
    InternalError = 70,
}

impl ExitCode {
    /// Convert exit code to i32 for `std::process::exit`
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Pick the exit code for an error returned by a command.
    ///
    /// Errors from the engine are classified by variant wherever they sit in
    /// the context chain; anything else falls back to the message text.
    pub fn for_error(error: &anyhow::Error) -> ExitCode {
        for cause in error.chain() {
            if let Some(err) = cause.downcast_ref::<MuddleError>() {
                return match (err.kind(), err) {
                    (_, MuddleError::LabelSyntax { .. }) => ExitCode::InvalidArgument,
                    (ErrorKind::Bug, _) => ExitCode::InternalError,
                    (ErrorKind::Failure, _) => ExitCode::GenericError,
                    (ErrorKind::GiveUp, _) => {
                        let message = err.to_string().to_lowercase();
                        if message.contains("circular or incomplete") {
                            ExitCode::ValidationFailed
                        } else if message.contains("no rule") {
                            ExitCode::NotFound
                        } else {
                            ExitCode::GenericError
                        }
                    }
                };
            }
            if let Some(io_error) = cause.downcast_ref::<std::io::Error>() {
                if io_error.kind() == std::io::ErrorKind::NotFound {
                    return ExitCode::NotFound;
                }
            }
        }

        let message = error.to_string().to_lowercase();
        if message.contains("not found") {
            ExitCode::NotFound
        } else if message.contains("invalid") || message.contains("failed to parse") {
            ExitCode::InvalidArgument
        } else {
            ExitCode::GenericError
        }
    }
}

/// Error codes used in JSON error documents
pub struct ErrorCode;

impl ErrorCode {
    pub const GENERIC: &'static str = "ERROR";
    pub const INVALID_ARGUMENT: &'static str = "INVALID_ARGUMENT";
    pub const NO_RULE: &'static str = "NO_RULE";
    pub const CIRCULAR_DEPENDENCY: &'static str = "CIRCULAR_DEPENDENCY";
    pub const INTERNAL: &'static str = "INTERNAL_ERROR";

    pub fn for_exit_code(code: ExitCode) -> &'static str {
        match code {
            ExitCode::Success | ExitCode::GenericError => Self::GENERIC,
            ExitCode::InvalidArgument => Self::INVALID_ARGUMENT,
            ExitCode::NotFound => Self::NO_RULE,
            ExitCode::ValidationFailed => Self::CIRCULAR_DEPENDENCY,
            ExitCode::InternalError => Self::INTERNAL,
        }
    }
}
