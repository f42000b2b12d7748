//! Destinations for the rendered status block.

use pulse_core::AppResult;

use crate::render::StatusLine;

/// Draws a status block. Called once per presenter tick.
pub trait StatusSink: Send {
    /// Replace whatever was shown with `lines`.
    fn show(&mut self, lines: &[StatusLine]) -> AppResult<()>;

    /// Release the output device. Called once when the presenter stops.
    fn finish(&mut self) -> AppResult<()> {
        Ok(())
    }
}

/// Sink for runs without a terminal: every block becomes one debug log line.
#[derive(Debug, Default)]
pub struct HeadlessSink {
    shown: u64,
}

impl HeadlessSink {
    /// Creates a sink that has shown nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks shown so far.
    pub fn shown(&self) -> u64 {
        self.shown
    }
}

impl StatusSink for HeadlessSink {
    fn show(&mut self, lines: &[StatusLine]) -> AppResult<()> {
        self.shown += 1;
        let summary = lines
            .iter()
            .filter(|l| !l.text.is_empty())
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        tracing::debug!(tick = self.shown, "{summary}");
        Ok(())
    }
}
