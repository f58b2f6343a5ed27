//! Watch command implementation - live TUI viewer.
//!
//! The simulation runs with per-round snapshots on a rendezvous
//! channel, so the viewer paces the workers: while the display is
//! paused the whole mesh idles at the snapshot barrier.

// CLI watch uses intentional casts for display and timing
#![allow(clippy::cast_possible_truncation)]

use super::CliError;
use super::output::{faction_letter_color, format_report_text};
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use skirmish::sim::unit::ALL_FACTIONS;
use skirmish::{RoundSnapshot, RunOptions, Scenario, run_scenario_with};
use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Execute the watch command.
///
/// # Errors
///
/// Returns an error if the scenario fails to load, the TUI fails, or
/// the simulation dies.
pub(crate) fn execute(scenario_path: PathBuf, workers: usize, speed: u64) -> Result<(), CliError> {
    let scenario = Scenario::load(&scenario_path)?;
    let waves = scenario.waves.len() as u32;
    let rounds = scenario.rounds;

    let (snapshot_tx, snapshot_rx) = bounded(0);
    let world_size = workers + 1;
    let runner = std::thread::spawn(move || {
        run_scenario_with(
            &scenario,
            world_size,
            RunOptions {
                snapshot_rounds: true,
                observer: Some(snapshot_tx),
            },
        )
    });

    let tui_result = run_tui(&snapshot_rx, speed, waves, rounds);

    // Unblock the coordinator so the simulation can finish even if the
    // viewer quit early.
    drop(snapshot_rx);
    let report = runner
        .join()
        .map_err(|_| CliError::new("simulation thread panicked"))??;

    tui_result?;
    println!("{}", format_report_text(&report));
    Ok(())
}

/// App state for the TUI.
struct App {
    latest: Option<RoundSnapshot>,
    paused: bool,
    speed_ms: u64,
    last_step: Instant,
    finished: bool,
    waves: u32,
    rounds: u32,
}

impl App {
    fn new(speed_ms: u64, waves: u32, rounds: u32) -> Self {
        Self {
            latest: None,
            paused: false,
            speed_ms,
            last_step: Instant::now(),
            finished: false,
            waves,
            rounds,
        }
    }

    /// Pull the next snapshot if one is ready.
    fn try_step(&mut self, rx: &Receiver<RoundSnapshot>) {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(snapshot) => {
                self.latest = Some(snapshot);
                self.last_step = Instant::now();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.finished = true,
        }
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    fn increase_speed(&mut self) {
        self.speed_ms = self.speed_ms.saturating_sub(100).max(50);
    }

    fn decrease_speed(&mut self) {
        self.speed_ms = (self.speed_ms + 100).min(2000);
    }

    fn should_auto_step(&self) -> bool {
        !self.paused
            && !self.finished
            && self.last_step.elapsed() >= Duration::from_millis(self.speed_ms)
    }
}

fn run_tui(
    rx: &Receiver<RoundSnapshot>,
    speed: u64,
    waves: u32,
    rounds: u32,
) -> Result<(), CliError> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(|e| CliError::new(e.to_string()))?;

    let mut app = App::new(speed, waves, rounds);
    app.try_step(rx);

    loop {
        terminal
            .draw(|f| ui(f, &app))
            .map_err(|e| CliError::new(e.to_string()))?;

        if app.should_auto_step() {
            app.try_step(rx);
        }

        if event::poll(Duration::from_millis(50)).map_err(|e| CliError::new(e.to_string()))?
            && let Event::Key(key) = event::read().map_err(|e| CliError::new(e.to_string()))?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Char(' ') => app.toggle_pause(),
                KeyCode::Right | KeyCode::Char('l') => {
                    app.paused = true;
                    app.try_step(rx);
                }
                KeyCode::Char('+' | '=') => app.increase_speed(),
                KeyCode::Char('-') => app.decrease_speed(),
                _ => {}
            }
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Main content
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    render_header(f, chunks[0], app);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[1]);

    render_grid(f, main_chunks[0], app);
    render_stats(f, main_chunks[1], app);

    render_footer(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let status = if app.finished {
        "FINISHED"
    } else if app.paused {
        "PAUSED"
    } else {
        "RUNNING"
    };

    let position = app.latest.as_ref().map_or_else(
        || "waiting for first round".to_string(),
        |s| {
            format!(
                "Wave {}/{} Round {}/{}",
                s.wave + 1,
                app.waves,
                s.round + 1,
                app.rounds
            )
        },
    );

    let title =
        format!(" Skirmish Viewer | {position} | {status} | Speed: {}ms ", app.speed_ms);
    let header = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_grid(f: &mut Frame, area: Rect, app: &App) {
    let mut lines: Vec<Line> = Vec::new();
    if let Some(snapshot) = &app.latest {
        let visible_height = (area.height as usize).saturating_sub(2);
        let visible_width = (area.width as usize).saturating_sub(4);
        for row in snapshot.rows.iter().take(visible_height) {
            let spans: Vec<Span> = row
                .chars()
                .take(visible_width)
                .map(|c| Span::styled(c.to_string(), Style::default().fg(faction_letter_color(c))))
                .collect();
            lines.push(Line::from(spans));
        }
    }
    let grid = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Grid "));
    f.render_widget(grid, area);
}

fn render_stats(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();
    lines.push(Line::from(""));
    if let Some(snapshot) = &app.latest {
        for (faction, count) in ALL_FACTIONS.iter().zip(snapshot.faction_counts) {
            let color = faction_letter_color(faction.letter());
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{faction:?} "),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("{count} alive")),
            ]));
        }
    }
    let stats = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Factions "),
    );
    f.render_widget(stats, area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let controls = if app.finished {
        " [q] Quit "
    } else {
        " [q] Quit  [Space] Pause  [->] Step  [+/-] Speed "
    };
    let footer = Paragraph::new(controls)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
