//! Full-screen status panel on the operator's terminal.

use std::io::{self, Stdout};

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::Alignment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use pulse_core::error::{AppError, ErrorKind};
use pulse_core::AppResult;

use crate::render::{StatusLine, Tone};
use crate::sink::StatusSink;

/// Panel title.
pub const PANEL_TITLE: &str = "Pulse Node Monitor";

fn io_error(context: &str, err: io::Error) -> AppError {
    AppError::with_source(ErrorKind::Io, format!("{context}: {err}"), err)
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Heading => Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
        Tone::Good => Style::default().fg(Color::Green),
        Tone::Warn => Style::default().fg(Color::Yellow),
        Tone::Bad => Style::default().fg(Color::Red),
        Tone::Info => Style::default().fg(Color::Cyan),
        Tone::Accent => Style::default().fg(Color::Magenta),
        Tone::Plain => Style::default(),
    }
}

/// Draw `lines` inside a bordered block filling the frame.
pub fn draw_panel<B: Backend>(terminal: &mut Terminal<B>, lines: &[StatusLine]) -> io::Result<()> {
    let text: Vec<Line> = lines
        .iter()
        .map(|l| Line::from(Span::styled(l.text.clone(), tone_style(l.tone))))
        .collect();

    terminal.draw(|f| {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightBlue))
            .title(Span::styled(
                PANEL_TITLE,
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ))
            .title_alignment(Alignment::Left);
        f.render_widget(Paragraph::new(text).block(block), f.area());
    })?;
    Ok(())
}

/// Alternate-screen panel. Raw mode stays off so Ctrl+C still reaches the
/// signal handler.
pub struct TerminalPanel {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl TerminalPanel {
    /// Switch to the alternate screen and hide the cursor.
    pub fn enter() -> AppResult<Self> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)
            .map_err(|e| io_error("Failed to enter alternate screen", e))?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal =
            Terminal::new(backend).map_err(|e| io_error("Failed to open terminal", e))?;
        terminal
            .clear()
            .map_err(|e| io_error("Failed to clear terminal", e))?;
        terminal
            .hide_cursor()
            .map_err(|e| io_error("Failed to hide cursor", e))?;

        // Leave the alternate screen even if a task panics.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        Ok(Self {
            terminal,
            active: true,
        })
    }

    fn restore(&mut self) -> AppResult<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.terminal
            .clear()
            .map_err(|e| io_error("Failed to clear terminal", e))?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| io_error("Failed to leave alternate screen", e))?;
        self.terminal
            .show_cursor()
            .map_err(|e| io_error("Failed to show cursor", e))
    }
}

impl StatusSink for TerminalPanel {
    fn show(&mut self, lines: &[StatusLine]) -> AppResult<()> {
        draw_panel(&mut self.terminal, lines).map_err(|e| io_error("Failed to draw panel", e))
    }

    fn finish(&mut self) -> AppResult<()> {
        self.restore()
    }
}

impl Drop for TerminalPanel {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;

    use super::*;

    #[test]
    fn test_panel_draws_title_and_lines() {
        let mut terminal = Terminal::new(TestBackend::new(50, 6)).unwrap();
        let lines = vec![
            StatusLine {
                text: "STATUS: ● CONNECTED".to_string(),
                tone: Tone::Good,
            },
            StatusLine {
                text: "Ping Count: 7".to_string(),
                tone: Tone::Info,
            },
        ];

        draw_panel(&mut terminal, &lines).unwrap();

        let buffer = terminal.backend().buffer();
        let rows: Vec<String> = (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect();

        assert!(rows[0].contains(PANEL_TITLE));
        assert!(rows[1].contains("STATUS: ● CONNECTED"));
        assert!(rows[2].contains("Ping Count: 7"));
    }
}
