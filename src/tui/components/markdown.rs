use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthStr;

/// One logical line of rendered markdown, before wrapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkdownLine {
    pub spans: Vec<Span<'static>>,
    /// Columns to indent continuation lines by when wrapped.
    pub hanging: usize,
}

pub fn render_markdown(text: &str) -> Vec<MarkdownLine> {
    let mut renderer = Renderer::default();
    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH) {
        renderer.handle(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Renderer {
    lines: Vec<MarkdownLine>,
    current: Vec<Span<'static>>,
    hanging: usize,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    in_code_block: bool,
}

impl Renderer {
    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let next = f(self.style());
        self.styles.push(next);
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(MarkdownLine {
                spans: std::mem::take(&mut self.current),
                hanging: self.hanging,
            });
        }
        self.hanging = 0;
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(MarkdownLine::default());
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush();
                self.blank();
                let color = match level {
                    HeadingLevel::H1 | HeadingLevel::H2 => Color::Yellow,
                    HeadingLevel::H3 => Color::Cyan,
                    _ => Color::White,
                };
                self.push_style(|s| s.fg(color).add_modifier(Modifier::BOLD));
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush();
                self.styles.pop();
            }
            Event::End(TagEnd::Paragraph) => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                let prefix = format!("{indent}{marker}");
                self.hanging = prefix.width();
                self.current
                    .push(Span::styled(prefix, Style::default().fg(Color::Green)));
            }
            Event::End(TagEnd::Item) => self.flush(),
            Event::Start(Tag::Strong) => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Event::Start(Tag::Emphasis) => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Event::Start(Tag::Strikethrough) => {
                self.push_style(|s| s.add_modifier(Modifier::CROSSED_OUT))
            }
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => {
                self.styles.pop();
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.in_code_block = true;
                self.push_style(|s| s.fg(Color::Gray));
            }
            Event::End(TagEnd::CodeBlock) => {
                self.flush();
                self.in_code_block = false;
                self.styles.pop();
                self.blank();
            }
            Event::Text(text) if self.in_code_block => {
                for line in text.lines() {
                    self.current
                        .push(Span::styled(format!("    {line}"), self.style()));
                    self.flush();
                }
            }
            Event::Text(text) => {
                let span = Span::styled(text.into_string(), self.style());
                self.current.push(span);
            }
            Event::Code(code) => {
                self.current.push(Span::styled(
                    code.into_string(),
                    self.style().fg(Color::Magenta),
                ));
            }
            Event::SoftBreak => self.current.push(Span::raw(" ")),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.current.push(Span::styled(
                    "─".repeat(24),
                    Style::default().fg(Color::DarkGray),
                ));
                self.flush();
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<MarkdownLine> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Word-wraps styled spans to `width` columns, indenting continuation lines
/// by `hanging` columns.
pub fn wrap_spans(spans: &[Span<'static>], width: usize, hanging: usize) -> Vec<Line<'static>> {
    let width = width.max(hanging + 1);
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;
    let mut line_start = 0;

    for span in spans {
        for word in span.content.split_inclusive(' ') {
            let word_width = word.trim_end().width();
            if current_width > line_start && current_width + word_width > width {
                lines.push(finish_line(&mut current));
                current.push(Span::raw(" ".repeat(hanging)));
                current_width = hanging;
                line_start = hanging;
            }
            let word = if !lines.is_empty() && current_width == line_start {
                word.trim_start()
            } else {
                word
            };
            if word.is_empty() {
                continue;
            }
            current_width += word.width();
            current.push(Span::styled(word.to_string(), span.style));
        }
    }

    lines.push(finish_line(&mut current));
    lines
}

fn finish_line(spans: &mut Vec<Span<'static>>) -> Line<'static> {
    if let Some(last) = spans.last_mut() {
        let trimmed = last.content.trim_end().to_string();
        last.content = trimmed.into();
    }
    Line::from(std::mem::take(spans))
}
