use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, FocusPane};
use crate::dispatch::InputField;
use crate::log::{ConversationLog, LogEntry, LogId, RenderedBody, RenderedMessage};
use crate::message::ROLE_USER;
use crate::status::Subsystem;
use crate::toggle::Toggle;

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

    let [chat_side, robot_side] = Layout::horizontal([
        Constraint::Percentage(55),
        Constraint::Percentage(45),
    ])
    .areas(body_area);

    let [chat_area, chat_input_area, generate_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(3),
    ])
    .areas(chat_side);

    let [toggles_area, robot_area, vla_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(robot_side);

    render_log(app, frame, chat_area, LogId::Chat);
    render_input(
        frame,
        chat_input_area,
        " Message (Enter to send) ",
        &app.orchestrator.inputs().chat,
        app.focus == FocusPane::ChatInput,
    );
    render_input(
        frame,
        generate_area,
        " Generate prompt ",
        &app.orchestrator.inputs().generate,
        app.focus == FocusPane::GenerateInput,
    );
    render_toggles(app, frame, toggles_area);
    render_log(app, frame, robot_area, LogId::Robot);
    render_input(
        frame,
        vla_area,
        " VLA observe/act cycles ",
        &app.orchestrator.inputs().vla,
        app.focus == FocusPane::VlaInput,
    );

    render_footer(app, frame, footer_area);

    if app.show_config {
        render_config_form(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = app.orchestrator.status();
    let dots = ".".repeat((app.animation_frame as usize) + 1);

    let mut spans = vec![
        Span::styled(" Robot Console ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.backend_url.clone(), Style::default().fg(Color::Gray)),
    ];
    for subsystem in Subsystem::all() {
        let indicator = status.indicator(subsystem);
        let pending = status.state(subsystem) == crate::status::Lifecycle::Pending;
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{}: ", subsystem.name()),
            Style::default().fg(Color::White),
        ));
        spans.push(Span::styled(
            if pending {
                format!("{}{}", indicator.label, dots)
            } else {
                indicator.label.to_string()
            },
            Style::default().fg(indicator.color).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_toggles(app: &App, frame: &mut Frame, area: Rect) {
    let toggles = app.orchestrator.toggles();
    let mut spans = Vec::new();
    for toggle in Toggle::all() {
        let (color, state) = if toggles.is_on(toggle) {
            (Color::Green, "on")
        } else {
            (Color::DarkGray, "off")
        };
        spans.push(Span::styled(
            format!(" {} ", toggle.display_name()),
            Style::default().fg(Color::Black).bg(color),
        ));
        spans.push(Span::styled(format!(" {state}  "), Style::default().fg(color)));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Toggles ");
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn role_style(role: &str) -> Style {
    let color = if role == ROLE_USER {
        Color::Cyan
    } else {
        Color::Yellow
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn message_lines(message: &RenderedMessage, lines: &mut Vec<Line<'static>>) {
    lines.push(Line::from(Span::styled(message.label.clone(), role_style(&message.role))));
    match &message.body {
        RenderedBody::Text(text) => {
            for line in text.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        RenderedBody::Image(image) => {
            let size = match image.decoded_len {
                Some(len) => format!("{len} bytes"),
                None => "undecodable".to_string(),
            };
            lines.push(Line::from(Span::styled(
                format!("[{} image, {}]", image.mime, size),
                Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC),
            )));
        }
        RenderedBody::Code(block) => match &block.highlighted {
            Some(highlighted) => {
                for fragments in highlighted {
                    let spans: Vec<Span<'static>> = fragments
                        .iter()
                        .map(|f| {
                            let (r, g, b) = f.rgb;
                            Span::styled(f.text.clone(), Style::default().fg(Color::Rgb(r, g, b)))
                        })
                        .collect();
                    lines.push(Line::from(spans));
                }
            }
            None => {
                for line in block.source.lines() {
                    lines.push(Line::from(Span::styled(
                        line.to_string(),
                        Style::default().fg(Color::Gray),
                    )));
                }
            }
        },
    }
}

/// Project a log into display lines
pub fn log_lines(log: &ConversationLog) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for entry in log.entries() {
        match entry {
            LogEntry::Message(message) => message_lines(message, &mut lines),
            LogEntry::Separator => lines.push(Line::from(Span::styled(
                "─".repeat(24),
                Style::default().fg(Color::DarkGray),
            ))),
        }
    }
    lines
}

fn log_paragraph(lines: Vec<Line<'static>>) -> Paragraph<'static> {
    let text = if lines.is_empty() {
        Text::from(Span::styled("Nothing yet", Style::default().fg(Color::DarkGray)))
    } else {
        Text::from(lines)
    };
    Paragraph::new(text).wrap(Wrap { trim: false })
}

/// Rows `paragraph` occupies when wrapped to `width`, saturating at `u16::MAX`
fn wrapped_height(paragraph: &Paragraph<'_>, width: u16) -> u16 {
    let rows = paragraph.line_count(width.max(1));
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn render_log(app: &mut App, frame: &mut Frame, area: Rect, id: LogId) {
    let paragraph = log_paragraph(log_lines(app.orchestrator.logs().get(id)));
    let inner_height = area.height.saturating_sub(2);
    let total = wrapped_height(&paragraph, area.width.saturating_sub(2));
    let max_scroll = total.saturating_sub(inner_height);

    let view = app.view_mut(id);
    view.scroll = if view.follow {
        max_scroll
    } else {
        view.scroll.min(max_scroll)
    };
    let scroll = view.scroll;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", id.title()));
    frame.render_widget(paragraph.block(block).scroll((scroll, 0)), area);
}

/// Terminal column of the cursor inside an input box drawn at `area`
fn cursor_column(area: Rect, input: &InputField) -> u16 {
    let before: String = input.text().chars().take(input.cursor()).collect();
    let offset = u16::try_from(Line::from(before).width()).unwrap_or(u16::MAX);
    area.x
        .saturating_add(1)
        .saturating_add(offset)
        .min(area.right().saturating_sub(2))
}

fn render_input(frame: &mut Frame, area: Rect, title: &str, input: &InputField, focused: bool) {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title.to_string());
    frame.render_widget(Paragraph::new(input.text().to_string()).block(block), area);

    if focused {
        frame.set_cursor_position((cursor_column(area, input), area.y.saturating_add(1)));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = if app.show_config {
        &[("j/k", "move"), ("Space", "check"), ("Enter", "connect"), ("Esc", "close")]
    } else {
        match app.focus {
            FocusPane::Controls => &[
                ("c", "configure"),
                ("e", "execute"),
                ("h", "home"),
                ("m", "move"),
                ("g", "grasp"),
                ("r", "release"),
                ("s", "set home"),
                ("k/t/b/l", "toggles"),
                ("o/a/p", "vla"),
                ("n", "new"),
                ("x/X", "clear"),
                ("i", "type"),
                ("q", "quit"),
            ],
            _ => &[
                ("Enter", "send"),
                ("Tab", "next input"),
                ("↑/↓", "chat"),
                ("PgUp/PgDn", "robot"),
                ("Esc", "controls"),
            ],
        }
    };

    let hints: Vec<Span> = pairs
        .iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(format!(" {key} "), key_style),
                Span::styled(format!(" {label} "), label_style),
            ]
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_config_form(app: &App, frame: &mut Frame, area: Rect) {
    let form = &app.orchestrator.inputs().form;
    let cursor = form.cursor();

    let mut items = Vec::new();
    for (g, group) in form.groups().iter().enumerate() {
        items.push(ListItem::new(Line::from(Span::styled(
            group.field().title(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))));
        for (o, option) in group.options().iter().enumerate() {
            let mark = match (group.field().is_multi(), group.is_checked(o)) {
                (true, true) => "[x]",
                (true, false) => "[ ]",
                (false, true) => "(•)",
                (false, false) => "( )",
            };
            let style = if cursor == (g, o) {
                Style::default().bg(Color::Cyan).fg(Color::Black)
            } else {
                Style::default()
            };
            items.push(ListItem::new(Line::from(Span::styled(
                format!("  {mark} {option}"),
                style,
            ))));
        }
    }

    let height = (items.len() as u16).saturating_add(2);
    let popup = centered_rect(area, 48, height);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Configure & Connect ");
    frame.render_widget(List::new(items).block(block), popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendClient;
    use crate::config::OptionCatalog;
    use crate::dispatch::Endpoint;
    use crate::log::Logs;
    use crate::message::{Message, MessageKind};
    use crate::orchestrator::{Completion, Orchestrator};
    use crate::render::render_batch;
    use crate::selection::ConfigurationForm;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_log_lines_show_label_content_and_separator() {
        let mut logs = Logs::new();
        render_batch(
            &mut logs,
            LogId::Chat,
            &[
                Message::text("assistant", "hi\nthere"),
                Message::new("vlm", MessageKind::Image, "aGk="),
            ],
        );
        let lines: Vec<String> = log_lines(logs.get(LogId::Chat)).iter().map(plain).collect();
        assert_eq!(
            lines,
            vec![
                "ASSISTANT:".to_string(),
                "hi".to_string(),
                "there".to_string(),
                "VLM:".to_string(),
                "[image/jpeg image, 2 bytes]".to_string(),
                "─".repeat(24),
            ]
        );
    }

    #[test]
    fn test_code_lines_reproduce_source() {
        let source = "for i in range(3):\n    grasp(i)";
        let mut logs = Logs::new();
        render_batch(&mut logs, LogId::Robot, &[Message::code("llm", source)]);
        let lines: Vec<String> = log_lines(logs.get(LogId::Robot)).iter().map(plain).collect();
        assert_eq!(lines[1..3].join("\n"), source);
    }

    #[test]
    fn test_wrapped_height_saturates() {
        let paragraph = log_paragraph(vec![Line::from("x"); 70_000]);
        assert_eq!(wrapped_height(&paragraph, 10), u16::MAX);
    }

    #[test]
    fn test_wrapped_height_follows_word_wrap() {
        let paragraph = log_paragraph(vec![Line::from("abcdefghij"), Line::from("aaa bbb ccc")]);
        assert_eq!(wrapped_height(&paragraph, 20), 2);
        assert!(wrapped_height(&paragraph, 4) >= 6);
    }

    fn screen(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    #[test]
    fn test_follow_mode_shows_newest_entry_of_long_reply() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(
            BackendClient::new("http://127.0.0.1:9"),
            ConfigurationForm::new(&OptionCatalog::default()),
            tx,
        );
        let mut app = App::new(orchestrator, "http://127.0.0.1:9");

        let wordy = "aaaaaaaaaaaaaa bbbbbbbbbbbbbb cccccccccccccc ".repeat(4);
        let mut messages: Vec<_> = (0..8)
            .map(|_| json!({"role": "robot", "type": "text", "content": wordy}))
            .collect();
        messages.push(json!({"role": "robot", "type": "text", "content": "NEWEST"}));
        app.orchestrator.apply(Completion::Request {
            endpoint: Endpoint::Home,
            outcome: Ok(json!({ "messages": messages })),
        });

        let mut terminal = Terminal::new(TestBackend::new(60, 30)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(
            screen(&terminal).iter().any(|row| row.contains("NEWEST")),
            "newest robot entry is below the viewport"
        );
    }

    #[test]
    fn test_cursor_column_uses_display_width() {
        let area = Rect::new(2, 0, 40, 3);
        let mut input = InputField::new();
        input.set("日本");
        assert_eq!(cursor_column(area, &input), 2 + 1 + 4);

        input.home();
        assert_eq!(cursor_column(area, &input), 3);

        input.set(&"x".repeat(100_000));
        assert_eq!(cursor_column(area, &input), area.right() - 2);
    }
}
