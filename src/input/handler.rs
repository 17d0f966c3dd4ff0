use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::editor::{Editor, Mode};

pub fn handle_event(editor: &mut Editor, event: Event) {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => {
            // Clear any message on keypress
            editor.clear_message();
            handle_key(editor, key);
        }
        Event::Resize(_, _) => {
            // Resize is handled by the renderer
        }
        _ => {}
    }
}

fn handle_key(editor: &mut Editor, key: KeyEvent) {
    // A waiting script owns the keyboard until it gets its answer
    if editor.mode == Mode::Prompt {
        handle_prompt_mode(editor, key);
        return;
    }

    // F5 runs the buffer from any mode
    if key.code == KeyCode::F(5) {
        editor.start_run();
        return;
    }

    match editor.mode {
        Mode::Normal => handle_normal_mode(editor, key),
        Mode::Insert => handle_insert_mode(editor, key),
        Mode::Command => handle_command_mode(editor, key),
        Mode::Prompt => {}
    }
}

fn handle_normal_mode(editor: &mut Editor, key: KeyEvent) {
    match key.code {
        // Basic movement
        KeyCode::Char('h') | KeyCode::Left => editor.move_left(),
        KeyCode::Char('j') | KeyCode::Down => editor.move_down(),
        KeyCode::Char('k') | KeyCode::Up => editor.move_up(),
        KeyCode::Char('l') | KeyCode::Right => editor.move_right(),

        // Line motions
        KeyCode::Char('0') | KeyCode::Home => editor.move_to_line_start(),
        KeyCode::Char('$') | KeyCode::End => editor.move_to_line_end(),
        KeyCode::Char('g') => editor.move_to_first_line(),
        KeyCode::Char('G') => editor.move_to_last_line(),

        // Insert mode entry
        KeyCode::Char('i') => editor.enter_insert_mode(),
        KeyCode::Char('a') => editor.append(),
        KeyCode::Char('A') => editor.append_end_of_line(),
        KeyCode::Char('o') => editor.open_line_below(),

        // Command mode
        KeyCode::Char(':') => editor.enter_command_mode(),

        // Quick quit with Ctrl-C
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            editor.quit();
        }

        _ => {}
    }
}

fn handle_insert_mode(editor: &mut Editor, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => editor.enter_normal_mode(),
        KeyCode::Char(c) => editor.insert_char(c),
        KeyCode::Tab => editor.insert_tab(),
        KeyCode::Backspace => editor.delete_char_backward(),
        KeyCode::Enter => editor.insert_newline(),

        KeyCode::Left => editor.move_left(),
        KeyCode::Right => editor.move_right(),
        KeyCode::Up => editor.move_up(),
        KeyCode::Down => editor.move_down(),

        _ => {}
    }
}

fn handle_command_mode(editor: &mut Editor, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => editor.enter_normal_mode(),
        KeyCode::Enter => editor.execute_command(),

        KeyCode::Backspace => {
            editor.command_buffer.pop();
            if editor.command_buffer.is_empty() {
                editor.enter_normal_mode();
            }
        }

        KeyCode::Char(c) => editor.command_buffer.push(c),

        _ => {}
    }
}

fn handle_prompt_mode(editor: &mut Editor, key: KeyEvent) {
    match key.code {
        // Esc answers with whatever has been typed so far
        KeyCode::Enter | KeyCode::Esc => editor.submit_prompt(),
        // Unblock the script before leaving
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            editor.submit_prompt();
            editor.quit();
        }
        KeyCode::Backspace => editor.prompt_pop(),
        KeyCode::Char(c) => editor.prompt_push(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capybara::config::Settings;
    use tokio::sync::oneshot;

    use crate::editor::RunEvent;

    fn press(editor: &mut Editor, code: KeyCode) {
        handle_event(editor, Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    #[test]
    fn insert_then_escape() {
        let mut editor = Editor::new(Settings::default());
        press(&mut editor, KeyCode::Char('i'));
        press(&mut editor, KeyCode::Char('x'));
        press(&mut editor, KeyCode::Esc);
        assert_eq!(editor.mode, Mode::Normal);
        assert_eq!(editor.buffer.text(), "x");
    }

    #[test]
    fn colon_command_runs_on_enter() {
        let mut editor = Editor::new(Settings::default());
        press(&mut editor, KeyCode::Char(':'));
        press(&mut editor, KeyCode::Char('q'));
        press(&mut editor, KeyCode::Enter);
        assert!(!editor.running);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut editor = Editor::new(Settings::default());
        handle_event(
            &mut editor,
            Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(!editor.running);
    }

    #[test]
    fn prompt_mode_captures_typing() {
        let mut editor = Editor::new(Settings::default());
        editor.mode = Mode::Prompt;
        // Without a pending request the keys are swallowed, not inserted
        press(&mut editor, KeyCode::Char('i'));
        assert_eq!(editor.buffer.text(), "");
        press(&mut editor, KeyCode::Enter);
        assert_eq!(editor.mode, Mode::Normal);
    }

    #[test]
    fn ctrl_c_at_prompt_answers_and_quits() {
        let mut editor = Editor::new(Settings::default());
        let (reply, mut answer) = oneshot::channel();
        editor.handle_run_event(RunEvent::Input {
            prompt: "n".to_string(),
            reply,
        });
        assert_eq!(editor.mode, Mode::Prompt);

        press(&mut editor, KeyCode::Char('4'));
        handle_event(
            &mut editor,
            Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );

        assert!(!editor.running);
        assert!(editor.pending_input.is_none());
        assert_eq!(answer.try_recv(), Ok("4".to_string()));
    }
}
