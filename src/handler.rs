use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Dismiss the notice line
        KeyCode::Esc => app.dismiss_notice(),

        // Tab cycles: Files -> Input -> Answer -> Files
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Files => FocusPane::Input,
                FocusPane::Input => FocusPane::Answer,
                FocusPane::Answer => FocusPane::Files,
            };

            // Auto-enter editing mode when focusing input
            if app.focus == FocusPane::Input {
                app.input_mode = InputMode::Editing;
                app.query_cursor = app.query_input.chars().count();
            }
        }

        // Navigation / scrolling
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Files => app.files_nav_down(),
            FocusPane::Answer => app.scroll_down(),
            FocusPane::Input => {}
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Files => app.files_nav_up(),
            FocusPane::Answer => app.scroll_up(),
            FocusPane::Input => {}
        },

        // Enter descends into a directory or selects a PDF
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
            if app.focus == FocusPane::Files {
                app.files_enter();
            }
        }

        // Back up to the parent directory
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => {
            if app.focus == FocusPane::Files {
                app.files_parent();
            }
        }

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if app.focus == FocusPane::Answer {
                app.scroll_half_page_down();
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if app.focus == FocusPane::Answer {
                app.scroll_half_page_up();
            }
        }

        KeyCode::Char('g') => {
            if app.focus == FocusPane::Answer {
                app.scroll_to_top();
            }
        }
        KeyCode::Char('G') => {
            if app.focus == FocusPane::Answer {
                app.scroll_to_bottom();
            }
        }

        // Upload the selected PDF
        KeyCode::Char('u') => app.submit_upload(),

        // Re-read the directory listing
        KeyCode::Char('r') => {
            if let Err(e) = app.refresh_entries() {
                app.show_notice(
                    crate::app::NoticeLevel::Error,
                    format!("Cannot read directory: {}", e),
                );
            }
        }

        // Jump into the question box
        KeyCode::Char('a') | KeyCode::Char('i') | KeyCode::Char('/') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
            app.query_cursor = app.query_input.chars().count();
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            // The query is sent exactly as typed and stays in the box.
            app.submit_ask();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            if app.query_cursor > 0 {
                app.query_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.query_input.chars().count();
            if app.query_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.query_cursor = app.query_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.query_input.chars().count();
            app.query_cursor = (app.query_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.query_cursor = 0;
        }
        KeyCode::End => {
            app.query_cursor = app.query_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
            app.query_input.insert(byte_pos, c);
            app.query_cursor += 1;
        }
        _ => {}
    }
}
