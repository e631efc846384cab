use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, FocusPane, InputMode, NoticeLevel, LOADING_TEXT};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut current_text = String::new();

    while let Some((_, c)) = chars.next() {
        if c == '*' {
            // Check for ** (bold)
            if chars.peek().map(|(_, c)| *c) == Some('*') {
                // Consume the second *
                chars.next();

                // Push any accumulated plain text
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }

                // Find closing **
                let mut bold_text = String::new();
                let mut found_close = false;

                while let Some((_, c)) = chars.next() {
                    if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
                        chars.next(); // consume second *
                        found_close = true;
                        break;
                    }
                    bold_text.push(c);
                }

                if found_close && !bold_text.is_empty() {
                    spans.push(Span::styled(
                        bold_text,
                        Style::default().add_modifier(Modifier::BOLD),
                    ));
                } else {
                    // No closing **, treat as literal
                    current_text.push_str("**");
                    current_text.push_str(&bold_text);
                }
            } else {
                current_text.push(c);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_body(app, frame, body_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let file_indicator = match &app.selected_file {
        Some(path) => format!(
            " [{}]",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" PDF AI Agent ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::DarkGray)),
        Span::styled(file_indicator, Style::default().fg(Color::Green)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_body(app: &mut App, frame: &mut Frame, area: Rect) {
    // PDF browser on the left, question/answer on the right
    let [files_area, qa_area] = Layout::horizontal([
        Constraint::Length(32),
        Constraint::Min(0),
    ])
    .areas(area);

    render_files(app, frame, files_area);

    let [answer_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(qa_area);

    render_answer(app, frame, answer_area);
    render_input(app, frame, input_area);
}

fn render_files(app: &mut App, frame: &mut Frame, area: Rect) {
    let files_focused = app.focus == FocusPane::Files;
    let border_color = if files_focused { Color::Cyan } else { Color::DarkGray };

    let dir_name = app
        .current_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| app.current_dir.display().to_string());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" PDFs: {} ", dir_name));

    let items: Vec<ListItem> = app
        .entries
        .iter()
        .map(|entry| {
            if entry.is_dir {
                ListItem::new(format!(" {}/ ", entry.name))
                    .style(Style::default().fg(Color::Blue))
            } else if Some(entry.path.as_path()) == app.selected_file.as_deref() {
                ListItem::new(format!(" {} * ", entry.name))
                    .style(Style::default().fg(Color::Green))
            } else {
                ListItem::new(format!(" {} ", entry.name))
            }
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.files_state);
}

fn render_answer(app: &mut App, frame: &mut Frame, area: Rect) {
    let answer_focused = app.focus == FocusPane::Answer;
    let border_color = if answer_focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Answer ");

    // Store area dimensions for scroll calculations (inner size minus borders)
    app.answer_height = area.height.saturating_sub(2);
    let wrap_width = area.width.saturating_sub(2).max(1) as usize;

    let answer_text = if app.is_loading() {
        // The busy indicator replaces the previous answer while any request
        // is outstanding.
        Text::from(Span::styled(
            LOADING_TEXT,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else if app.answer.is_empty() {
        Text::from(Span::styled(
            "Ask a question...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let lines: Vec<Line> = app.answer.lines().map(parse_markdown_line).collect();
        Text::from(lines)
    };

    // Track wrapped line count so scrolling stops at the bottom
    let mut total_lines: u16 = 0;
    for line in app.answer.lines() {
        let char_count = line.chars().count();
        if char_count == 0 {
            total_lines += 1;
        } else {
            total_lines += ((char_count / wrap_width) + 1) as u16;
        }
    }
    app.total_answer_lines = total_lines;

    let answer = Paragraph::new(answer_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.answer_scroll, 0));

    frame.render_widget(answer, area);
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let input_focused = app.focus == FocusPane::Input;
    let border_color = if input_focused || app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Question ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    // Get the visible slice of the input
    let visible_text: String = app
        .query_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = if visible_text.is_empty() && app.input_mode != InputMode::Editing {
        Paragraph::new("Ask a question...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block)
    } else {
        Paragraph::new(visible_text)
            .style(Style::default().fg(Color::Cyan))
            .block(block)
    };

    frame.render_widget(input, area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // A pending notice takes over the footer until dismissed or expired
    if let Some(notice) = &app.notice {
        let notice_style = match notice.level {
            NoticeLevel::Info => Style::default().bg(Color::Green).fg(Color::Black),
            NoticeLevel::Error => Style::default().bg(Color::Red).fg(Color::White),
        };
        let footer = Paragraph::new(Line::from(vec![
            Span::styled(format!(" {} ", notice.text), notice_style),
            Span::styled(" Esc ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::styled(" dismiss ", Style::default().bg(Color::Black).fg(Color::White)),
        ]))
        .style(Style::default().bg(Color::Black));
        frame.render_widget(footer, area);
        return;
    }

    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " ASK ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Normal => {
            let mut hints = match app.focus {
                FocusPane::Files => vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" nav ", label_style),
                    Span::styled(" Enter ", key_style),
                    Span::styled(" select ", label_style),
                    Span::styled(" h ", key_style),
                    Span::styled(" up dir ", label_style),
                ],
                FocusPane::Answer => vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" scroll ", label_style),
                    Span::styled(" g/G ", key_style),
                    Span::styled(" top/bottom ", label_style),
                ],
                FocusPane::Input => vec![
                    Span::styled(" i ", key_style),
                    Span::styled(" edit ", label_style),
                ],
            };
            hints.extend(vec![
                Span::styled(" u ", key_style),
                Span::styled(" upload ", label_style),
                Span::styled(" a ", key_style),
                Span::styled(" ask ", label_style),
                Span::styled(" Tab ", key_style),
                Span::styled(" focus ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{InFlightRequest, RequestKind};
    use crate::client::AgentClient;
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn loading_text_replaces_the_answer_while_any_request_is_pending() {
        let dir = tempfile::tempdir().unwrap();
        let client = AgentClient::new("http://localhost:8000", None).unwrap();
        let mut app = App::new(client, dir.path().to_path_buf()).unwrap();
        app.answer = "the previous answer".to_string();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(buffer_text(&terminal).contains("the previous answer"));

        app.in_flight.push(InFlightRequest {
            id: 0,
            kind: RequestKind::Upload,
            task: tokio::spawn(async { std::future::pending::<anyhow::Result<String>>().await }),
        });

        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains(LOADING_TEXT));
        assert!(!text.contains("the previous answer"));

        for request in app.in_flight.drain(..) {
            request.task.abort();
        }
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(buffer_text(&terminal).contains("the previous answer"));
    }

    #[test]
    fn bold_markdown_becomes_styled_spans() {
        let line = parse_markdown_line("a **bold** claim");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "bold");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unterminated_bold_is_kept_literal() {
        let line = parse_markdown_line("a **dangling claim");
        let flattened: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(flattened, "a **dangling claim");
    }
}
