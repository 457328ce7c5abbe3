//! Markdown to terminal lines.
//!
//! Only the subset a wiki page needs is styled: headings, emphasis, inline
//! and fenced code, lists, quotes and links. Links are collected in document
//! order so the app can cycle through them and follow the selected one.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLink {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Default)]
pub struct Rendered {
    pub lines: Vec<Line<'static>>,
    pub links: Vec<RenderedLink>,
}

/// Render `markdown`, highlighting the link at `selected_link`.
pub fn render(markdown: &str, selected_link: Option<usize>) -> Rendered {
    let mut writer = Writer {
        selected_link,
        ..Writer::default()
    };
    for event in Parser::new(markdown) {
        writer.event(event);
    }
    writer.flush();
    while writer.out.lines.last().is_some_and(|line| line.spans.is_empty()) {
        writer.out.lines.pop();
    }
    writer.out
}

#[derive(Default)]
struct Writer {
    out: Rendered,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// One entry per open list: the next ordinal, `None` for bullets.
    lists: Vec<Option<u64>>,
    /// End tags of the open block quotes.
    quotes: Vec<TagEnd>,
    in_code_block: bool,
    open_link: Option<usize>,
    selected_link: Option<usize>,
}

impl Writer {
    fn style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::default(), |acc, style| acc.patch(*style))
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.in_code_block => {
                let style = Style::default().fg(Color::Yellow);
                for line in text.lines() {
                    self.spans.push(Span::styled(format!("  {}", line), style));
                    self.flush();
                }
            }
            Event::Text(text) => self.text(&text, self.style()),
            Event::Code(text) => {
                let style = self.style().fg(Color::Yellow);
                self.text(&text, style);
            }
            Event::SoftBreak => self.text(" ", self.style()),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.spans.push(Span::styled(
                    "────────────────────",
                    Style::default().fg(Color::DarkGray),
                ));
                self.flush();
                self.blank();
            }
            Event::TaskListMarker(done) => {
                let marker = if done { "[x] " } else { "[ ] " };
                self.text(marker, self.style());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { .. } => {
                self.flush();
                self.styles
                    .push(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
            }
            Tag::Emphasis => self.styles.push(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.styles.push(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self
                .styles
                .push(Style::default().add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } => {
                let index = self.out.links.len();
                self.out.links.push(RenderedLink {
                    label: String::new(),
                    href: dest_url.to_string(),
                });
                self.open_link = Some(index);
                let mut style = Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::UNDERLINED);
                if self.selected_link == Some(index) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                self.styles.push(style);
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.in_code_block = true;
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.quotes.push(tag.to_end());
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{}{}. ", indent, next);
                        *next += 1;
                        marker
                    }
                    _ => format!("{}• ", indent),
                };
                self.spans.push(Span::raw(marker));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        if self.quotes.last() == Some(&tag) {
            self.flush();
            self.quotes.pop();
            return;
        }
        match tag {
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.flush();
                self.blank();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                self.open_link = None;
            }
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.blank();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str, style: Style) {
        if let Some(link) = self.open_link.and_then(|i| self.out.links.get_mut(i)) {
            link.label.push_str(text);
        }
        self.spans.push(Span::styled(text.to_string(), style));
    }

    fn flush(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut spans = Vec::with_capacity(self.spans.len() + 1);
        if !self.quotes.is_empty() {
            spans.push(Span::styled(
                "│ ".repeat(self.quotes.len()),
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.append(&mut self.spans);
        self.out.lines.push(Line::from(spans));
    }

    fn blank(&mut self) {
        if self.out.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.out.lines.push(Line::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(rendered: &Rendered) -> Vec<String> {
        rendered
            .lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_links_in_document_order() {
        let rendered = render(
            "See [Notes](<Notes>) and [the site](https://example.com).\n\n\
             - [Two Words](<Two%20Words>)\n",
            None,
        );
        assert_eq!(
            rendered.links,
            vec![
                RenderedLink {
                    label: "Notes".to_string(),
                    href: "Notes".to_string()
                },
                RenderedLink {
                    label: "the site".to_string(),
                    href: "https://example.com".to_string()
                },
                RenderedLink {
                    label: "Two Words".to_string(),
                    href: "Two%20Words".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_selected_link_is_reversed() {
        let rendered = render("[a](<A>) [b](<B>)", Some(1));
        let styled: Vec<bool> = rendered.lines[0]
            .spans
            .iter()
            .filter(|s| s.content == "a" || s.content == "b")
            .map(|s| s.style.add_modifier.contains(Modifier::REVERSED))
            .collect();
        assert_eq!(styled, vec![false, true]);
    }

    #[test]
    fn test_block_layout() {
        let rendered = render("# Title\n\nText here\n\n1. one\n2. two\n\n> quoted\n", None);
        assert_eq!(
            plain(&rendered),
            vec!["Title", "", "Text here", "", "1. one", "2. two", "", "│ quoted"]
        );
    }

    #[test]
    fn test_code_block_lines() {
        let rendered = render("```\nlet a = 1;\nlet b = 2;\n```\n", None);
        assert_eq!(plain(&rendered), vec!["  let a = 1;", "  let b = 2;"]);
    }
}
