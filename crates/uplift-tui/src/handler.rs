use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use uplift_core::{InputSource, SlotId};

use crate::app::{App, Field, InputMode};
use crate::tui::AppEvent;

const SCROLL_STEP: u16 = 10;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Paste(text) => {
            if app.input_mode == InputMode::Editing {
                let multiline = app.editing_multiline();
                let text = text.replace("\r\n", "\n").replace('\r', "\n");
                for c in text.chars().filter(|c| multiline || *c != '\n') {
                    app.insert_char(c);
                }
            }
        }
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('s') => {
                if app.input_mode == InputMode::Editing {
                    if let Some(slot) = file_slot(app) {
                        app.load_file(slot);
                    }
                    app.end_edit();
                }
                app.submit();
                return;
            }
            _ => {}
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

/// Focused slot when it takes a file path
fn file_slot(app: &App) -> Option<SlotId> {
    app.focus
        .slot()
        .filter(|slot| app.form.slot(*slot).source == InputSource::File)
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Field navigation
        KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => app.focus_next(),
        KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => app.focus_prev(),

        // Choices
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => app.cycle_choice(true),
        KeyCode::Left | KeyCode::Char('h') => app.cycle_choice(false),

        KeyCode::Enter | KeyCode::Char('i') => match app.focus {
            Field::Submit => app.submit(),
            field if field.is_text() => app.begin_edit(),
            _ => app.cycle_choice(true),
        },

        // Drop the attached file of a file-sourced slot
        KeyCode::Char('x') => {
            if let Some(slot) = app.focus.slot() {
                if app.form.slot(slot).source == InputSource::File {
                    app.clear_file(slot);
                }
            }
        }

        KeyCode::Char('w') => app.save_archive(),

        // Result pane scrolling
        KeyCode::PageDown | KeyCode::Char('J') => app.scroll_result_down(SCROLL_STEP),
        KeyCode::PageUp | KeyCode::Char('K') => app.scroll_result_up(SCROLL_STEP),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let multiline = app.editing_multiline();
    let file_slot = file_slot(app);

    match key.code {
        KeyCode::Esc => {
            if let Some(slot) = file_slot {
                app.load_file(slot);
            }
            app.end_edit();
        }
        KeyCode::Enter if multiline => app.insert_char('\n'),
        KeyCode::Enter => {
            if let Some(slot) = file_slot {
                app.load_file(slot);
            }
            app.end_edit();
        }
        KeyCode::Tab if multiline => {
            for _ in 0..2 {
                app.insert_char(' ');
            }
        }
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::StatusKind;
    use uplift_core::{FormState, MemoryStore, UpliftClient};

    fn test_app() -> App {
        App::new(
            FormState::new(),
            Box::new(MemoryStore::new()),
            UpliftClient::new("http://127.0.0.1:9"),
            std::env::temp_dir(),
        )
    }

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[tokio::test]
    async fn test_inline_content_is_multiline() {
        let mut app = test_app();
        app.focus = Field::ContextValue;

        for event in [
            press(KeyCode::Enter),
            press(KeyCode::Char('a')),
            press(KeyCode::Char(':')),
            press(KeyCode::Enter),
            press(KeyCode::Char('b')),
            press(KeyCode::Esc),
        ] {
            handle_event(&mut app, event).await.unwrap();
        }

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.form.slot(SlotId::Context).text, "a:\nb");
    }

    #[tokio::test]
    async fn test_url_edit_ends_on_enter() {
        let mut app = test_app();
        app.form.set_source(SlotId::Json, InputSource::Url);
        app.focus = Field::JsonValue;

        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        handle_event(&mut app, AppEvent::Paste("https://a.org/doc.json\n".into()))
            .await
            .unwrap();
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.form.slot(SlotId::Json).url_str(), "https://a.org/doc.json");
        assert!(app.form.can_submit());
    }

    #[tokio::test]
    async fn test_pasted_carriage_returns_stay_out_of_single_line_fields() {
        let mut app = test_app();
        app.form.set_source(SlotId::Json, InputSource::Url);
        app.focus = Field::JsonValue;

        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        handle_event(&mut app, AppEvent::Paste("https://a.org/doc.json\r\n".into()))
            .await
            .unwrap();
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.form.slot(SlotId::Json).url_str(), "https://a.org/doc.json");

        let mut app = test_app();
        app.focus = Field::ContextValue;
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        handle_event(&mut app, AppEvent::Paste("a: 1\r\nb: 2\r".into()))
            .await
            .unwrap();
        handle_event(&mut app, press(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.form.slot(SlotId::Context).text, "a: 1\nb: 2\n");
    }

    #[tokio::test]
    async fn test_submit_while_editing_a_path_loads_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "{\"id\": 1}").unwrap();

        let mut app = test_app();
        app.form.set_source(SlotId::Json, InputSource::File);
        app.focus = Field::JsonValue;

        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        handle_event(&mut app, AppEvent::Paste(path.display().to_string()))
            .await
            .unwrap();
        assert!(app.form.slot(SlotId::Json).file.is_none());

        let ctrl_s = AppEvent::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        handle_event(&mut app, ctrl_s).await.unwrap();

        assert_eq!(app.input_mode, InputMode::Normal);
        let file = app.form.slot(SlotId::Json).file.clone().unwrap();
        assert_eq!(file.name, "doc.json");
        assert_eq!(app.submit_tasks.len(), 1);
        assert!(!matches!(app.status, Some((StatusKind::Error, _))));
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let mut app = test_app();
        handle_event(&mut app, press(KeyCode::Char('q'))).await.unwrap();
        assert!(app.should_quit);

        let mut app = test_app();
        app.focus = Field::BaseUri;
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        handle_event(&mut app, press(KeyCode::Char('q'))).await.unwrap();
        assert!(!app.should_quit);
        assert_eq!(app.form.base_uri(), "q");

        let ctrl_c = AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        handle_event(&mut app, ctrl_c).await.unwrap();
        assert!(app.should_quit);
    }
}
