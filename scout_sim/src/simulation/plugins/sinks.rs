// scout_sim/src/simulation/plugins/sinks.rs

//! Report sinks: a console display, a JSON file per mission for the web
//! front end, and a spoken announcement.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

use scout_core::abstractions::ReportSink;
use scout_core::error::SinkError;
use scout_core::messages::UNKNOWN_PERSON;
use scout_core::mission::{MissionRecord, Outcome};

// --- Display ---

pub struct DisplaySink<W: Write + Send> {
    out: W,
}

impl DisplaySink<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> DisplaySink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn render(&mut self, record: &MissionRecord) -> io::Result<()> {
        let outcome = record
            .outcome()
            .map_or_else(|| "open".to_string(), |o| format!("{o:?}"));
        writeln!(self.out, "=== Mission {} ({outcome}) ===", record.id())?;
        writeln!(self.out, "target:   {}", record.target())?;
        if let Some(reason) = record.reason() {
            writeln!(self.out, "reason:   {reason}")?;
        }
        let visited: Vec<&str> = record.visited().iter().map(|w| w.as_str()).collect();
        writeln!(self.out, "visited:  {}", visited.join(" -> "))?;
        if let Some(detection) = record.detection() {
            writeln!(
                self.out,
                "detected: {} (confidence {:.2}) at t={:.1}s",
                detection.identity(),
                detection.confidence,
                detection.frame_timestamp
            )?;
        }
        if let Some(media) = record.media() {
            writeln!(self.out, "media:    {}", media.location)?;
        }
        if let Some(summary) = record.summary() {
            let tag = if record.summary_is_placeholder() { " (placeholder)" } else { "" };
            writeln!(self.out, "summary:  {summary}{tag}")?;
        }
        for t in record.transitions() {
            writeln!(self.out, "  {:>7.2}s  {} -> {}  [{}]", t.at, t.from, t.to, t.reason)?;
        }
        self.out.flush()
    }
}

impl<W: Write + Send> ReportSink for DisplaySink<W> {
    fn name(&self) -> &str {
        "display"
    }

    fn send(&mut self, record: &MissionRecord) -> Result<(), SinkError> {
        self.render(record)
            .map_err(|e| SinkError::new("display", e.to_string()))
    }
}

// --- Web ---

/// Writes `<dir>/<mission id>.json` for the web UI to pick up.
pub struct WebSink {
    dir: PathBuf,
}

impl WebSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ReportSink for WebSink {
    fn name(&self) -> &str {
        "web"
    }

    fn send(&mut self, record: &MissionRecord) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir).map_err(web_error)?;
        let path = self.dir.join(format!("{}.json", record.id()));
        let json = serde_json::to_string_pretty(record).map_err(web_error)?;
        fs::write(&path, json).map_err(web_error)?;
        debug!(path = %path.display(), "report written");
        Ok(())
    }
}

fn web_error(e: impl ToString) -> SinkError {
    SinkError::new("web", e.to_string())
}

// --- Audio ---

/// Text-to-speech stand-in: writes the line that would be spoken.
pub struct AudioSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> AudioSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

/// Names a recognized person; anyone else is just "Person".
pub fn announcement(record: &MissionRecord) -> String {
    let who = match record.identity() {
        Some(name) if name != UNKNOWN_PERSON => name,
        _ => "Person",
    };
    match (record.outcome(), record.summary()) {
        (Some(Outcome::Success), Some(summary)) => format!("{who} found. {summary}"),
        _ => format!(
            "Mission ended: {}",
            record.reason().unwrap_or("no reason given")
        ),
    }
}

impl<W: Write + Send> ReportSink for AudioSink<W> {
    fn name(&self) -> &str {
        "audio"
    }

    fn send(&mut self, record: &MissionRecord) -> Result<(), SinkError> {
        writeln!(self.out, "[speaker] {}", announcement(record))
            .and_then(|()| self.out.flush())
            .map_err(|e| SinkError::new("audio", e.to_string()))
    }
}
