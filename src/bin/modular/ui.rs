//! Terminal view: allocator state next to what the render thread reports.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use saavy_modular::synth::allocator::{AllocationState, RuntimeSnapshot};

/// Width of the level bar in cells.
const BAR_WIDTH: usize = 24;

/// Everything one frame needs, gathered by the app before drawing.
pub struct View {
    pub snapshot: RuntimeSnapshot,
    pub levels: Vec<f32>,
    pub active: usize,
    pub sample_rate: f32,
    pub progress: f64,
    pub released: usize,
}

pub fn render(frame: &mut Frame, view: &View) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status
            Constraint::Min(4),    // Voices
            Constraint::Length(1), // Help
        ])
        .split(frame.area());

    render_status(frame, chunks[0], view);
    render_voices(frame, chunks[1], view);

    let help = Paragraph::new(" [+/-] Voices  [P] Panic  [Q] Quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[2]);
}

fn render_status(frame: &mut Frame, area: Rect, view: &View) {
    let (state, color) = match view.snapshot.allocation_state {
        AllocationState::Stable { voice_count } => (format!("stable {voice_count}"), Color::Green),
        AllocationState::Shrinking {
            current_count,
            target_count,
        } => (
            format!("shrinking {current_count} → {target_count}"),
            Color::Yellow,
        ),
    };

    let line = Line::from(vec![
        Span::styled(format!(" {state}  "), Style::default().fg(color)),
        Span::styled(
            format!("busy {}  ", view.snapshot.busy_count()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("sounding {}  ", view.active),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            format!("tails freed {}  ", view.released),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("{:.1}kHz  loop {:>3.0}%", view.sample_rate / 1000.0, view.progress * 100.0),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let block = Block::default().title(" saavy-modular ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_voices(frame: &mut Frame, area: Rect, view: &View) {
    let lines: Vec<Line> = view
        .snapshot
        .voices
        .iter()
        .map(|voice| {
            let level = view
                .levels
                .get(voice.index as usize)
                .copied()
                .unwrap_or(0.0);
            let (label, color) = match (voice.note_active, voice.consumer_count) {
                (true, _) => ("playing  ", Color::Green),
                (false, 0) => ("free     ", Color::DarkGray),
                (false, _) => ("releasing", Color::Yellow),
            };
            Line::from(vec![
                Span::raw(format!(" {:>2} ", voice.index)),
                Span::styled(label, Style::default().fg(color)),
                Span::raw(format!("  holds {}  ", voice.consumer_count)),
                Span::styled(level_bar(level), Style::default().fg(Color::Cyan)),
                Span::raw(format!(" {level:.2}")),
            ])
        })
        .collect();

    let block = Block::default().title(" Voices ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn level_bar(level: f32) -> String {
    let filled = ((level.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
    let mut bar = "█".repeat(filled);
    bar.push_str(&"·".repeat(BAR_WIDTH - filled));
    bar
}
