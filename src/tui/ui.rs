use crate::tui::app::{App, AppState, NoticeLevel};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // URL input
            Constraint::Min(5),    // Conversation or progress
            Constraint::Length(3), // Question input
            Constraint::Length(1), // Notice
            Constraint::Length(1), // Help
        ])
        .split(f.area());

    let title = Paragraph::new("YouTube Video Chat")
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    app.url_input.render(f, chunks[1]);

    let title = match app.video_id() {
        Some(id) => format!("Conversation: {id}"),
        None => "Conversation".to_string(),
    };

    match &app.state {
        AppState::Busy { subject, .. } if app.chat_view.is_empty() => {
            app.progress_bar.render(f, chunks[2], subject);
        }
        AppState::Busy { .. } => {
            // Follow-up questions keep the conversation visible.
            let [chat, progress] = split_progress(chunks[2]);
            app.chat_view.render(f, chat, &title);
            draw_status_line(f, app, progress);
        }
        AppState::Idle if app.chat_view.is_empty() => draw_welcome(f, chunks[2]),
        AppState::Idle => app.chat_view.render(f, chunks[2], &title),
    }

    app.question_input.render(f, chunks[3]);
    draw_notice(f, app, chunks[4]);
    draw_help(f, app, chunks[5]);
}

fn split_progress(area: Rect) -> [Rect; 2] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    [chunks[0], chunks[1]]
}

fn draw_status_line(f: &mut Frame, app: &App, area: Rect) {
    let status = Paragraph::new(format!(" ⏳ {}", app.progress_bar.message))
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(status, area);
}

fn draw_welcome(f: &mut Frame, area: Rect) {
    let text = "Paste a YouTube link above and press Enter.\n\n\
                The video's transcript is turned into a structured outline,\n\
                then you can ask follow-up questions about it.";
    let welcome = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Conversation"));
    f.render_widget(welcome, area);
}

fn draw_notice(f: &mut Frame, app: &App, area: Rect) {
    let Some(notice) = &app.notice else {
        return;
    };
    let (icon, color) = match notice.level {
        NoticeLevel::Info => ("ℹ", Color::Green),
        NoticeLevel::Warning => ("⚠", Color::Yellow),
        NoticeLevel::Error => ("✗", Color::Red),
    };
    let line = Paragraph::new(format!(" {icon} {}", notice.text)).style(Style::default().fg(color));
    f.render_widget(line, area);
}

fn draw_help(f: &mut Frame, app: &App, area: Rect) {
    let text = if app.is_busy() {
        "[↑↓/PgUp/PgDn] Scroll  [Ctrl-C] Quit"
    } else {
        "[Enter] Submit  [Tab] Switch field  [↑↓/PgUp/PgDn] Scroll  [Ctrl-R] Reset  [Esc] Quit"
    };
    let help = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, area);
}
