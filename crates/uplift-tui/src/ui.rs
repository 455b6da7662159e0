use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use uplift_core::{InputSource, OutputFormat, SlotId};

use crate::app::{char_to_byte_index, App, Field, InputMode, StatusKind};

const CURSOR: char = '▏';

fn border_style(app: &App, field: Field) -> Style {
    if app.focus != field {
        Style::default().fg(Color::DarkGray)
    } else if app.input_mode == InputMode::Editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

fn field_block(app: &App, field: Field, title: impl Into<String>) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, field))
        .title(Span::styled(
            format!(" {} ", title.into()),
            Style::default().fg(Color::White).bold(),
        ))
}

/// Text of the field being edited with the cursor drawn in
fn with_cursor(text: &str, cursor: usize) -> String {
    let mut shown = text.to_string();
    shown.insert(char_to_byte_index(text, cursor), CURSOR);
    shown
}

fn dots(app: &App) -> &'static str {
    match app.animation_frame {
        0 => ".",
        1 => "..",
        _ => "...",
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

    let [form_area, result_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .areas(body_area);

    render_header(app, frame, header_area);
    render_form(app, frame, form_area);
    render_result(app, frame, result_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let policy = app.form.policy();
    let mut policy_text = if app.policy_task.is_some() {
        format!("remote fetch: loading{}", dots(app))
    } else if let Some(error) = &app.policy_error {
        format!("remote fetch: {error}")
    } else {
        policy.describe()
    };
    if let Some(context) = &policy.context {
        policy_text.push_str(&format!(" · context fetch: {}", context.describe()));
    }

    let policy_style = if app.policy_error.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Gray)
    };

    let title = Line::from(vec![
        Span::styled(" JSON Uplift Playground ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(format!("{} ", app.client.base_url()), Style::default().fg(Color::White)),
        Span::styled(policy_text, policy_style),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_form(app: &App, frame: &mut Frame, area: Rect) {
    let [context_source, context_value, json_source, json_value, base, options, submit] =
        Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .areas(area);

    render_source(app, frame, context_source, Field::ContextSource, SlotId::Context);
    render_value(app, frame, context_value, Field::ContextValue, SlotId::Context);
    render_source(app, frame, json_source, Field::JsonSource, SlotId::Json);
    render_value(app, frame, json_value, Field::JsonValue, SlotId::Json);
    render_base(app, frame, base);

    let [output_area, provenance_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(20)]).areas(options);
    render_output(app, frame, output_area);
    render_provenance(app, frame, provenance_area);
    render_submit(app, frame, submit);
}

fn choice_spans<T: Copy + PartialEq>(
    choices: &[T],
    current: T,
    label: fn(&T) -> &'static str,
) -> Line<'static> {
    let mut spans = Vec::new();
    for choice in choices {
        let style = if *choice == current {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", label(choice)), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn render_source(app: &App, frame: &mut Frame, area: Rect, field: Field, slot: SlotId) {
    let line = choice_spans(
        &app.form.available_sources(),
        app.form.slot(slot).source,
        InputSource::display_name,
    );
    let block = field_block(app, field, format!("{} source", slot.display_name()));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_value(app: &App, frame: &mut Frame, area: Rect, field: Field, slot: SlotId) {
    let input = app.form.slot(slot);
    let editing = app.focus == field && app.input_mode == InputMode::Editing;

    let (title, body): (&str, Text) = match input.source {
        InputSource::Content => {
            let text = if editing {
                with_cursor(&app.edit_buffer, app.edit_cursor)
            } else {
                input.text.clone()
            };
            let placeholder = match slot {
                SlotId::Context => "YAML context definition",
                SlotId::Json => "JSON document",
            };
            if text.is_empty() {
                ("Text", Text::styled(placeholder, Style::default().fg(Color::DarkGray)))
            } else {
                ("Text", Text::raw(text))
            }
        }
        InputSource::Url => {
            let url = if editing {
                with_cursor(&app.edit_buffer, app.edit_cursor)
            } else {
                input.url_str().to_string()
            };
            let allowed = match app.form.policy().allow_pattern() {
                Some(allow) if !input.url_str().is_empty() => allow.is_match(input.url_str()),
                _ => true,
            };
            let mut lines = vec![Line::raw(url)];
            if !allowed {
                lines.push(Line::styled(
                    "URL is not allowed by the backend",
                    Style::default().fg(Color::Red),
                ));
            }
            ("URL", Text::from(lines))
        }
        InputSource::File => {
            let path = if editing {
                with_cursor(&app.edit_buffer, app.edit_cursor)
            } else {
                app.path_for(slot).to_string()
            };
            let attached = match &input.file {
                Some(file) => Line::styled(
                    format!("{} ({} bytes)", file.name, file.bytes.len()),
                    Style::default().fg(Color::Green),
                ),
                None => Line::styled("No file attached", Style::default().fg(Color::DarkGray)),
            };
            ("File path", Text::from(vec![Line::raw(path), attached]))
        }
    };

    let block = field_block(app, field, title);
    frame.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_base(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.focus == Field::BaseUri && app.input_mode == InputMode::Editing;
    let text = if editing {
        with_cursor(&app.edit_buffer, app.edit_cursor)
    } else {
        app.form.base_uri().to_string()
    };
    let block = field_block(app, Field::BaseUri, "Base URI");
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_output(app: &App, frame: &mut Frame, area: Rect) {
    let line = choice_spans(&OutputFormat::all(), app.form.output(), OutputFormat::display_name);
    let block = field_block(app, Field::Output, "Output");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_provenance(app: &App, frame: &mut Frame, area: Rect) {
    let (mark, style) = if app.form.provenance() {
        ("[x] on", Style::default().fg(Color::Green))
    } else {
        ("[ ] off", Style::default().fg(Color::Gray))
    };
    let block = field_block(app, Field::Provenance, "Provenance");
    frame.render_widget(Paragraph::new(Span::styled(mark, style)).block(block), area);
}

fn render_submit(app: &App, frame: &mut Frame, area: Rect) {
    let (label, style) = if app.form.can_submit() {
        ("Uplift  (Ctrl+S)", Style::default().fg(Color::Black).bg(Color::Green).bold())
    } else {
        ("Uplift  (form incomplete)", Style::default().fg(Color::DarkGray))
    };
    let block = field_block(app, Field::Submit, "Submit");
    frame.render_widget(Paragraph::new(Span::styled(label, style)).block(block), area);
}

fn render_result(app: &App, frame: &mut Frame, area: Rect) {
    let result = app.form.result();

    let (title, body, style) = if app.form.is_submitting() {
        (
            "Result",
            format!("Uplifting{}", dots(app)),
            Style::default().fg(Color::Yellow),
        )
    } else if let Some(error) = &result.error {
        ("Error", error.clone(), Style::default().fg(Color::Red))
    } else if let Some(text) = &result.text {
        ("Result", text.clone(), Style::default())
    } else {
        (
            "Result",
            "Submit the form to see the uplifted document here.".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(format!(" {title} "), Style::default().fg(Color::White).bold()));

    frame.render_widget(
        Paragraph::new(Text::styled(body, style))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((app.result_scroll, 0)),
        area,
    );
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " FORM ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(Color::White);

    let hints: Vec<(&str, &str)> = match app.input_mode {
        InputMode::Editing if app.editing_multiline() => {
            vec![("Esc", "done"), ("Enter", "newline"), ("^S", "submit")]
        }
        InputMode::Editing => vec![("Enter", "done"), ("Esc", "done"), ("^S", "submit")],
        InputMode::Normal => vec![
            ("Tab", "next"),
            ("←→", "choose"),
            ("Enter", "edit"),
            ("^S", "submit"),
            ("x", "clear file"),
            ("w", "save zip"),
            ("PgUp/PgDn", "scroll"),
            ("q", "quit"),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];

    if let Some((kind, message)) = &app.status {
        let style = match kind {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        };
        spans.push(Span::styled(message.clone(), style));
    } else {
        for (key, label) in hints {
            spans.push(Span::styled(format!(" {key} "), key_style));
            spans.push(Span::styled(format!(" {label}  "), label_style));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
