//! Centralized shell output for deploy commands.
//!
//! The Shell module provides a unified API for all CLI output, including:
//! - Status messages with consistent formatting and per-host prefixes
//! - Scoped timing spans for composite commands
//! - JSON output mode for machine-readable output
//!
//! # Design Principles
//!
//! 1. **Procedures never format their own lines** - they pick a semantic [`Status`]
//! 2. **Three severities** - green for progress/info, yellow for caution, red for refusal and errors
//! 3. **JSON mode is mutually exclusive** - every status becomes a JSON event on stdout

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable JSON output only.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors and refusals only
    Quiet,
    /// Default: status messages
    #[default]
    Normal,
    /// --verbose: also echo every remote command
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Progress and info (green)
    Selected,
    Cloning,
    Pulling,
    Pushing,
    Restarting,
    Running,
    Created,
    Finished,

    // Caution (yellow)
    Generating,
    Forcing,
    Correcting,
    Warning,

    // Refusal and fatal (red)
    Refused,
    Error,
}

impl Status {
    /// Get the display text for this status.
    fn as_str(&self) -> &'static str {
        match self {
            Status::Selected => "Selected",
            Status::Cloning => "Cloning",
            Status::Pulling => "Pulling",
            Status::Pushing => "Pushing",
            Status::Restarting => "Restarting",
            Status::Running => "Running",
            Status::Created => "Created",
            Status::Finished => "Finished",
            Status::Generating => "Generating",
            Status::Forcing => "Forcing",
            Status::Correcting => "Correcting",
            Status::Warning => "Warning",
            Status::Refused => "Refused",
            Status::Error => "error",
        }
    }

    /// Severity tier shown to the operator.
    pub fn severity(&self) -> &'static str {
        match self {
            Status::Generating | Status::Forcing | Status::Correcting | Status::Warning => {
                "warn"
            }
            Status::Refused | Status::Error => "fatal",
            _ => "info",
        }
    }

    /// Get the ANSI color code for this status.
    fn color_code(&self) -> &'static str {
        match self.severity() {
            // Caution: bold yellow
            "warn" => "\x1b[1;33m",
            // Refusal and errors: bold red
            "fatal" => "\x1b[1;31m",
            // Everything else: bold green
            _ => "\x1b[1;32m",
        }
    }

    /// Get the width for alignment (12 characters).
    fn width(&self) -> usize {
        12
    }

    /// Whether the line survives `--quiet`.
    fn is_loud(&self) -> bool {
        matches!(self, Status::Refused | Status::Error | Status::Warning)
    }
}

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
    /// JSON output buffer for machine-readable mode
    json_output: Mutex<Vec<String>>,
    /// Whether we've printed anything (for newline management)
    has_output: AtomicBool,
}

impl Shell {
    /// Create a new shell with the given mode.
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell {
            mode,
            use_color,
            json_output: Mutex::new(Vec::new()),
            has_output: AtomicBool::new(false),
        }
    }

    /// Create a shell from CLI flags with proper precedence.
    ///
    /// JSON mode takes precedence over quiet/verbose.
    pub fn from_flags(
        quiet: bool,
        verbose: bool,
        color: ColorChoice,
        message_format_json: bool,
    ) -> Self {
        let mode = if message_format_json {
            ShellMode::Json
        } else {
            let verbosity = if quiet {
                Verbosity::Quiet
            } else if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            ShellMode::Human { verbosity, color }
        };

        Shell::new(mode)
    }

    /// A shell that prints nothing but errors, without color.
    pub fn quiet() -> Self {
        Shell::new(ShellMode::Human {
            verbosity: Verbosity::Quiet,
            color: ColorChoice::Never,
        })
    }

    /// Check if shell is in quiet mode.
    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    /// Check if shell is in verbose mode.
    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    /// Check if shell is in JSON mode.
    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    /// Check if colors are enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`
    ///
    /// In quiet mode, only refusals, warnings and errors are printed.
    /// In JSON mode, the line becomes a `status` event.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() {
            let event = serde_json::json!({
                "reason": "status",
                "status": status.as_str(),
                "severity": status.severity(),
                "message": msg.to_string(),
            });
            self.json_event(&event);
            return;
        }

        if self.is_quiet() && !status.is_loud() {
            return;
        }

        let prefix = self.format_status(status);
        eprintln!("{} {}", prefix, msg);
        self.has_output.store(true, Ordering::SeqCst);
    }

    /// Print a status message scoped to a host, `[host] message`.
    pub fn host_status(&self, host: &str, status: Status, msg: impl Display) {
        self.status(status, format!("[{}] {}", host, msg));
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    /// Print a block of raw text framed by blank lines, without a status prefix.
    ///
    /// Used for material the operator has to copy, such as a public key.
    pub fn print_block(&self, text: impl Display) {
        if self.is_json() {
            let event = serde_json::json!({
                "reason": "block",
                "text": text.to_string(),
            });
            self.json_event(&event);
            return;
        }

        eprintln!();
        eprintln!("{}", text);
        eprintln!();
        self.has_output.store(true, Ordering::SeqCst);
    }

    /// Echo a command about to run on a host. Only shown in verbose mode.
    pub fn command(&self, host: &str, command: impl Display) {
        if self.is_verbose() {
            eprintln!("[{}] run: {}", host, command);
        }
    }

    /// Print a JSON event to stdout.
    ///
    /// Only works in JSON mode; silently ignored in human mode.
    pub fn json_event(&self, event: &serde_json::Value) {
        if !self.is_json() {
            return;
        }

        let json_str = serde_json::to_string(event).unwrap_or_default();
        println!("{}", json_str);
        let _ = io::stdout().flush();

        if let Ok(mut buffer) = self.json_output.lock() {
            buffer.push(json_str);
        }
    }

    /// JSON events emitted so far.
    pub fn json_events(&self) -> Vec<String> {
        self.json_output
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }

    /// Format a status prefix with optional color.
    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        let width = status.width();

        if self.use_color {
            let color = status.color_code();
            format!("{}{:>width$}\x1b[0m", color, text, width = width)
        } else {
            format!("{:>width$}", text, width = width)
        }
    }

    /// Create a scoped span for timing a composite command.
    ///
    /// The start line is printed immediately; the end line with timing is
    /// printed on drop or via [`Span::finish_with_message`].
    pub fn span(self: &Arc<Self>, status: Status, msg: impl Display) -> Span {
        Span::new(Arc::clone(self), status, msg.to_string())
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

/// A scoped timing span.
pub struct Span {
    shell: Arc<Shell>,
    start: Instant,
    message: String,
    finished: bool,
}

impl Span {
    fn new(shell: Arc<Shell>, status: Status, message: String) -> Self {
        shell.status(status, &message);

        Span {
            shell,
            start: Instant::now(),
            message,
            finished: false,
        }
    }

    /// Mark the span as finished with a custom message.
    pub fn finish_with_message(mut self, msg: impl Display) {
        self.finished = true;
        let duration_str = format_duration(self.start.elapsed());
        self.shell
            .status(Status::Finished, format!("{} in {}", msg, duration_str));
    }

    /// Get elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        // Dropped without finishing means the command bailed out.
        let duration_str = format_duration(self.start.elapsed());
        self.shell.status(
            Status::Error,
            format!("{} aborted after {}", self.message, duration_str),
        );
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}
