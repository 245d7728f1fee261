//! The control surface: configuration coming in, status and counts going out.

use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use log::{error, info};

use crate::detection::Summary;
use crate::source::CameraSelection;

/// Inbound change requested by the user
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    SetAiEnabled(bool),
    SetFrameRate(u32),
    SetCycleInterval(Duration),
    SetConfidencePercent(u32),
    CaptureFrame,
    SelectCamera(CameraSelection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Normal,
    Success,
    Error,
}

/// One line of user-visible status text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub kind: StatusKind,
}

impl Status {
    pub fn normal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StatusKind::Normal,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StatusKind::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: StatusKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

/// Outbound side of the control surface
pub trait ControlSurface: Send {
    fn update_status(&mut self, status: Status);

    /// Replace the object list and counter badge
    fn show_objects(&mut self, summary: &Summary);

    /// Empty the object list and hide the badge
    fn clear_objects(&mut self);
}

/// Control surface that reports through the log
#[derive(Debug, Default)]
pub struct LogSurface {
    last_summary: Option<Summary>,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ControlSurface for LogSurface {
    fn update_status(&mut self, status: Status) {
        match status.kind {
            StatusKind::Error => error!("{}", status.message),
            _ => info!("{}", status.message),
        }
    }

    fn show_objects(&mut self, summary: &Summary) {
        // Detections arrive many times a second; only log changes.
        if self.last_summary.as_ref() == Some(summary) {
            return;
        }
        if summary.badge_visible() {
            let list: Vec<String> = summary
                .entries
                .iter()
                .map(|entry| {
                    format!(
                        "{}: {} #{:02x}{:02x}{:02x}",
                        entry.label, entry.count, entry.color.r, entry.color.g, entry.color.b
                    )
                })
                .collect();
            info!("[{}] {}", summary.total, list.join(", "));
        } else {
            info!("No objects");
        }
        self.last_summary = Some(summary.clone());
    }

    fn clear_objects(&mut self) {
        if self.last_summary.take().is_some() {
            info!("Object list cleared");
        }
    }
}

/// What a line of text from the terminal asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Control(ControlEvent),
    Quit,
}

/// Parse one command line, e.g. `ai on`, `fps 10`, `confidence 60`, `camera user`.
///
/// `camera` takes the rest of the line, so device paths may contain spaces.
pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    if let Some((verb, rest)) = line.split_once(char::is_whitespace) {
        if verb.eq_ignore_ascii_case("camera") {
            let selection = rest.trim();
            return Ok(Command::Control(ControlEvent::SelectCamera(
                CameraSelection::from(selection),
            )));
        }
    }

    let mut parts = line.split_whitespace();
    let verb = parts.next().ok_or_else(|| anyhow!("empty command"))?;
    let arg = parts.next();

    let event = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("quit" | "exit", None) => return Ok(Command::Quit),
        ("ai", Some("on")) => ControlEvent::SetAiEnabled(true),
        ("ai", Some("off")) => ControlEvent::SetAiEnabled(false),
        ("fps", Some(n)) => ControlEvent::SetFrameRate(parse_number(verb, n)?),
        ("interval", Some(ms)) => {
            ControlEvent::SetCycleInterval(Duration::from_millis(parse_number(verb, ms)?.into()))
        }
        ("confidence", Some(pct)) => {
            ControlEvent::SetConfidencePercent(parse_number(verb, pct.trim_end_matches('%'))?)
        }
        ("capture", None) => ControlEvent::CaptureFrame,
        _ => bail!("unrecognised command '{}'", line),
    };

    if parts.next().is_some() {
        bail!("too many arguments in '{}'", line);
    }
    Ok(Command::Control(event))
}

fn parse_number(verb: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| anyhow!("{} expects a non-negative integer, got '{}'", verb, value))
}
