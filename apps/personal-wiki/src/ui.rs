//! UI rendering for personal wiki.

use crate::app::{App, InfoTab, InputMode, Pane, SideTab};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};
use regex::Regex;
use std::sync::LazyLock;
use wiki_engine::{BlobStore, Mode};

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[^\]]+\]\]").expect("valid regex"));

pub fn draw<S: BlobStore>(f: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_main(f, app, chunks[1]);
    draw_status_bar(f, app, chunks[2]);

    if app.input_mode != InputMode::None {
        draw_input_dialog(f, app);
    }

    if app.show_help {
        draw_help(f);
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn draw_header<S: BlobStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let pinned = app.engine.visible_pins().len();
    let titles = vec![
        "[1] All Pages".to_string(),
        format!("[2] Pinned ({})", pinned),
    ];
    let selected = match app.side_tab {
        SideTab::AllPages => 0,
        SideTab::Pinned => 1,
    };

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Wiki ({} pages, {} links) ",
            app.engine.documents().len(),
            app.engine.links().link_count(),
        )))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    f.render_widget(tabs, area);
}

fn draw_main<S: BlobStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let display = &app.config.display;
    let show_info = display.show_outline || display.show_backlinks;
    let constraints = if show_info {
        vec![
            Constraint::Percentage(25),
            Constraint::Percentage(50),
            Constraint::Percentage(25),
        ]
    } else {
        vec![Constraint::Percentage(25), Constraint::Percentage(75)]
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    draw_sidebar(f, app, chunks[0]);
    match app.engine.mode() {
        Mode::View | Mode::HistoryDetail => draw_page(f, app, chunks[1]),
        Mode::Edit => draw_editor(f, app, chunks[1]),
        Mode::List => draw_page_list(f, app, chunks[1]),
        Mode::HistoryList => draw_history(f, app, chunks[1]),
    }
    if show_info {
        draw_info(f, app, chunks[2]);
    }
}

fn draw_sidebar<S: BlobStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let current = app.engine.current_page();
    let items: Vec<ListItem> = app
        .sidebar_names()
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let mut style = Style::default();
            if name == current {
                style = style.fg(Color::Cyan);
            }
            if i == app.selected_index && app.pane == Pane::Sidebar {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            let marker = if app.engine.is_pinned(&name) { "* " } else { "  " };
            ListItem::new(format!("{}{}", marker, name)).style(style)
        })
        .collect();

    let title = match app.side_tab {
        SideTab::AllPages if app.filter.is_empty() => format!(" Pages [{}] ", app.sort.label()),
        SideTab::AllPages => format!(" Pages [{}] /{} ", app.sort.label(), app.filter),
        SideTab::Pinned => " Pinned ".to_string(),
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(focus_style(app.pane == Pane::Sidebar)),
    );
    f.render_widget(list, area);
}

fn draw_page<S: BlobStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let title = match app.engine.open_revision() {
        Some((index, revision)) => format!(
            " {} @ {} (revision {}) ",
            revision.page,
            revision.time.format("%Y-%m-%d %H:%M"),
            index
        ),
        None => format!(" {} ", app.engine.current_page()),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(focus_style(app.pane == Pane::Content));

    let rendered = app.rendered();
    let paragraph = Paragraph::new(rendered.lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_editor<S: BlobStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} [EDIT] ", app.engine.current_page()))
        .border_style(focus_style(true));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let text: Vec<Line> = app
        .editor_content
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == app.editor_cursor.0 {
                cursor_line(line, app.editor_cursor.1)
            } else {
                highlight_links(line)
            }
        })
        .collect();

    let scroll = app.editor_cursor.0.saturating_sub(inner.height.saturating_sub(1) as usize);
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0));
    f.render_widget(paragraph, inner);
}

fn highlight_links(line: &str) -> Line<'_> {
    let mut spans = Vec::new();
    let mut last_end = 0;
    for mat in WIKI_LINK.find_iter(line) {
        if mat.start() > last_end {
            spans.push(Span::raw(&line[last_end..mat.start()]));
        }
        spans.push(Span::styled(
            mat.as_str(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        ));
        last_end = mat.end();
    }
    if last_end < line.len() {
        spans.push(Span::raw(&line[last_end..]));
    }
    Line::from(spans)
}

fn cursor_line(line: &str, col: usize) -> Line<'_> {
    let cursor = Style::default().bg(Color::White).fg(Color::Black);
    let (before, after) = line.split_at(col.min(line.len()));
    let mut chars = after.chars();
    match chars.next() {
        Some(c) => Line::from(vec![
            Span::raw(before),
            Span::styled(c.to_string(), cursor),
            Span::raw(chars.as_str()),
        ]),
        None => Line::from(vec![Span::raw(before), Span::styled(" ", cursor)]),
    }
}

fn draw_page_list<S: BlobStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let names = app.engine.page_names(app.sort);
    let items: Vec<ListItem> = names
        .iter()
        .map(|name| {
            let visited = app
                .engine
                .recency()
                .last_visit(name)
                .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
                .map(|t| t.format("%m/%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());
            ListItem::new(Line::from(vec![
                Span::raw(name.as_str()),
                Span::styled(format!("  {}", visited), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" All Pages [{}] ", app.sort.label()))
                .border_style(focus_style(app.pane == Pane::Content)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    let mut state = ListState::default().with_selected(Some(app.list_index));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_history<S: BlobStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let versions = app.engine.history_versions();
    let items: Vec<ListItem> = versions
        .iter()
        .map(|version| {
            let preview: String = version
                .content
                .lines()
                .find(|line| !line.trim().is_empty())
                .unwrap_or_default()
                .chars()
                .take(40)
                .collect();
            ListItem::new(vec![
                Line::from(Span::styled(
                    version.time.format("%Y-%m-%d %H:%M:%S").to_string(),
                    Style::default().fg(Color::Yellow),
                )),
                Line::from(Span::styled(preview, Style::default().fg(Color::DarkGray))),
            ])
        })
        .collect();

    let title = if versions.is_empty() {
        format!(" History of {} (no revisions) ", app.engine.view().history_target())
    } else {
        format!(
            " History of {} ({}) ",
            app.engine.view().history_target(),
            versions.len()
        )
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(focus_style(app.pane == Pane::Content)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    let mut state = ListState::default().with_selected(Some(app.list_index));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_info<S: BlobStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let display = &app.config.display;
    let tab = match (display.show_outline, display.show_backlinks) {
        (true, false) => InfoTab::Outline,
        (false, true) => InfoTab::Backlinks,
        _ => app.info_tab,
    };

    let (title, items): (String, Vec<ListItem>) = match tab {
        InfoTab::Outline => {
            let entries = app.engine.outline();
            let items = entries
                .iter()
                .map(|entry| {
                    ListItem::new(format!(
                        "{}{} {}",
                        "  ".repeat(entry.depth),
                        entry.number,
                        entry.text
                    ))
                })
                .collect();
            (format!(" Outline ({}) ", entries.len()), items)
        }
        InfoTab::Backlinks => {
            let backlinks = app.engine.backlinks();
            let items = backlinks
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let mut style = Style::default().fg(Color::Green);
                    if i == app.backlink_index && app.pane == Pane::Backlinks {
                        style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
                    }
                    ListItem::new(Span::styled(name.clone(), style))
                })
                .collect();
            (format!(" Backlinks ({}) ", backlinks.len()), items)
        }
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(focus_style(app.pane == Pane::Backlinks)),
    );
    f.render_widget(list, area);
}

fn draw_status_bar<S: BlobStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let pin = if app.engine.is_pinned(app.engine.current_page()) {
        " | pinned"
    } else {
        ""
    };
    let info = format!(
        " {} | {}{} ",
        app.engine.mode().label(),
        app.engine.current_page(),
        pin
    );
    let info_widget = Paragraph::new(info).block(Block::default().borders(Borders::ALL));
    f.render_widget(info_widget, chunks[0]);

    let hint = match app.engine.mode() {
        Mode::View => "? help | : open | e edit | h history | a all | n link | p pin",
        Mode::Edit => "Ctrl+S save | Esc cancel | Ctrl+P command",
        Mode::List => "Enter open | s sort | Esc back",
        Mode::HistoryList => "Enter open | b back | Esc page",
        Mode::HistoryDetail => "r restore | b back | Esc page",
    };
    let msg = app.message.clone().unwrap_or_else(|| hint.to_string());
    let msg_widget = Paragraph::new(msg).block(Block::default().borders(Borders::ALL));
    f.render_widget(msg_widget, chunks[1]);
}

fn draw_input_dialog<S: BlobStore>(f: &mut Frame, app: &App<S>) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let title = match app.input_mode {
        InputMode::Command => " Page, `all` or `:history [page]` ",
        InputMode::Filter => " Filter Pages ",
        InputMode::Export => " Export To ",
        InputMode::Import => " Import From ",
        InputMode::None => " Input ",
    };

    let input = Paragraph::new(app.input_buffer.as_str())
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(Color::Yellow));
    f.render_widget(input, area);
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let heading = Style::default().add_modifier(Modifier::BOLD);
    let help_text = vec![
        Line::from(Span::styled("Reading", heading)),
        Line::from("  n/N          Next/previous link"),
        Line::from("  Enter        Follow selected link"),
        Line::from("  e            Edit page"),
        Line::from("  h            Page history"),
        Line::from("  p            Pin/unpin page"),
        Line::from("  o            Outline/backlinks"),
        Line::from("  Tab          Focus sidebar, backlinks"),
        Line::from(""),
        Line::from(Span::styled("Sidebar", heading)),
        Line::from("  1/2          All pages/pinned"),
        Line::from("  s            Toggle A-Z/recent"),
        Line::from("  /            Filter"),
        Line::from("  J/K          Move pin down/up"),
        Line::from(""),
        Line::from(Span::styled("Backlinks", heading)),
        Line::from("  j/k          Select linking page"),
        Line::from("  Enter        Open it"),
        Line::from(""),
        Line::from(Span::styled("Everywhere", heading)),
        Line::from("  :            Open page, `all`, `:history [page]`"),
        Line::from("  a            List all pages"),
        Line::from("  x/i          Export/import backup"),
        Line::from("  R            Rebuild link index"),
        Line::from("  Esc          Back to page"),
        Line::from("  q            Quit"),
        Line::from(""),
        Line::from(Span::styled("Wiki Links", heading)),
        Line::from("  [[Page]]           Link to page"),
        Line::from("  [[Page|Text]]      Link with display text"),
    ];

    let help =
        Paragraph::new(help_text).block(Block::default().borders(Borders::ALL).title(" Help "));
    f.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
