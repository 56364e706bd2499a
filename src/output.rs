// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes, plus stack event printing.

use serde::Serialize;
use std::io::Write;
use std::time::Instant;

use crate::provider::StackEvent;
use crate::stream::EventSink;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
///
/// Progress and events go to stderr; results go to stdout.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            eprintln!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    eprintln!("{message} ({:.1}s)", elapsed);
                } else {
                    eprintln!("{message}");
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print a command's result record to stdout as pretty JSON
    /// (a single line in JSON mode).
    pub fn result<T: Serialize>(&self, value: &T) -> serde_json::Result<()> {
        let rendered = match self.mode {
            OutputMode::Json => serde_json::to_string(value)?,
            OutputMode::Normal | OutputMode::Quiet => serde_json::to_string_pretty(value)?,
        };
        println!("{rendered}");
        Ok(())
    }

    /// Write raw bytes to stdout.
    pub fn raw(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.flush()
    }

    /// A sink that prints stack events in this output's mode.
    pub fn event_printer(&self) -> EventPrinter {
        EventPrinter::new(self.mode)
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

/// Prints stack events to stderr as they are discovered.
pub struct EventPrinter {
    mode: OutputMode,
}

impl EventPrinter {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }
}

/// One line per event: time, status, type, logical id and reason.
pub fn format_event(event: &StackEvent) -> String {
    let timestamp = event
        .timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{timestamp}  {:<28}  {:<32}  {}",
        event.resource_status.as_deref().unwrap_or("-"),
        event.resource_type.as_deref().unwrap_or("-"),
        event.logical_resource_id.as_deref().unwrap_or("-"),
    );
    if let Some(reason) = event.status_reason.as_deref().filter(|r| !r.is_empty()) {
        line.push_str("  ");
        line.push_str(reason);
    }
    line
}

impl EventSink for EventPrinter {
    fn write_event(&mut self, event: &StackEvent) {
        match self.mode {
            OutputMode::Normal => eprintln!("{}", format_event(event)),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}
