use crate::core::{ChatSession, Role};
use crate::tui::components::markdown::{MarkdownLine, render_markdown, wrap_spans};
use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

const USER_PREFIX: &str = "You ▸ ";

#[derive(Debug, Clone)]
enum Entry {
    User { text: String, unanswered: bool },
    Assistant(Vec<MarkdownLine>),
}

/// Scrollable transcript of the conversation.
pub struct ChatView {
    entries: Vec<Entry>,
    pending: Option<String>,
    scroll: usize,
    follow: bool,
    total_lines: usize,
    viewport: usize,
}

impl ChatView {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            pending: None,
            scroll: 0,
            follow: true,
            total_lines: 0,
            viewport: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.pending.is_none()
    }

    /// Rebuilds the view from the session's turn log.
    pub fn sync(&mut self, session: &ChatSession) {
        self.entries = session
            .turns()
            .iter()
            .enumerate()
            .map(|(i, turn)| match turn.role {
                Role::User => Entry::User {
                    text: turn.text.clone(),
                    unanswered: session.is_unanswered(i),
                },
                Role::Assistant => Entry::Assistant(render_markdown(&turn.text)),
            })
            .collect();
        self.pending = None;
        self.follow = true;
    }

    /// Shows a question that is still waiting for its answer.
    pub fn set_pending(&mut self, question: String) {
        self.pending = Some(question);
        self.follow = true;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending = None;
        self.scroll = 0;
        self.follow = true;
    }

    fn max_scroll(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport)
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = (self.scroll + lines).min(self.max_scroll());
        self.follow = self.scroll >= self.max_scroll();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let page = self.viewport.max(1);
        match key.code {
            KeyCode::Up => self.scroll_up(1),
            KeyCode::Down => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(page),
            KeyCode::PageDown => self.scroll_down(page),
            _ => return false,
        }
        true
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_up(3),
            MouseEventKind::ScrollDown => self.scroll_down(3),
            _ => return false,
        }
        true
    }

    fn user_lines(text: &str, width: usize, unanswered: bool) -> Vec<Line<'static>> {
        let style = Style::default().fg(Color::White).bg(Color::DarkGray);
        let indent = " ".repeat(USER_PREFIX.chars().count());
        let options = textwrap::Options::new(width.max(USER_PREFIX.len() + 1))
            .initial_indent(USER_PREFIX)
            .subsequent_indent(&indent);

        let mut lines: Vec<Line<'static>> = textwrap::wrap(text, options)
            .into_iter()
            .map(|l| Line::from(Span::styled(l.into_owned(), style)))
            .collect();

        if unanswered {
            lines.push(Line::from(Span::styled(
                "  (no answer received)",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
        lines.push(Line::default());
        lines
    }

    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for entry in &self.entries {
            match entry {
                Entry::User { text, unanswered } => {
                    lines.extend(Self::user_lines(text, width, *unanswered));
                }
                Entry::Assistant(rendered) => {
                    for md in rendered {
                        lines.extend(wrap_spans(&md.spans, width, md.hanging));
                    }
                    lines.push(Line::default());
                }
            }
        }

        if let Some(question) = &self.pending {
            lines.extend(Self::user_lines(question, width, false));
            lines.push(Line::from(Span::styled(
                "  Thinking...",
                Style::default().fg(Color::Gray),
            )));
        }
        lines
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, title: &str) {
        let inner_width = area.width.saturating_sub(2) as usize;
        self.viewport = area.height.saturating_sub(2).max(1) as usize;

        let lines = self.lines(inner_width);
        self.total_lines = lines.len();
        if self.follow || self.scroll > self.max_scroll() {
            self.scroll = self.max_scroll();
        }

        let scroll_info = if self.total_lines > self.viewport {
            format!(
                " (lines {}-{} of {})",
                self.scroll + 1,
                (self.scroll + self.viewport).min(self.total_lines),
                self.total_lines
            )
        } else {
            String::new()
        };

        let visible: Vec<Line> = lines
            .into_iter()
            .skip(self.scroll)
            .take(self.viewport)
            .collect();

        let paragraph = Paragraph::new(visible).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{title}{scroll_info}")),
        );
        f.render_widget(paragraph, area);
    }
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new()
    }
}
