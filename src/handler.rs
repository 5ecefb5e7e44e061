use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, FocusPane};
use crate::dispatch::{is_send_key, Action, RobotCommand, VlaCommand};
use crate::log::LogId;
use crate::toggle::Toggle;
use crate::tui::AppEvent;

const SCROLL_STEP: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        // Layout is recomputed from the frame size on every draw
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::Completion(completion) => app.orchestrator.apply(completion),
    }
    Ok(())
}

/// Key → action bindings of the controls pane
pub fn control_action(code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Char('e') => Action::Robot(RobotCommand::Execute),
        KeyCode::Char('h') => Action::Robot(RobotCommand::Home),
        KeyCode::Char('m') => Action::Robot(RobotCommand::Move),
        KeyCode::Char('g') => Action::Robot(RobotCommand::Grasp),
        KeyCode::Char('r') => Action::Robot(RobotCommand::Release),
        KeyCode::Char('s') => Action::Robot(RobotCommand::SetHome),
        KeyCode::Char('k') => Action::Toggle(Toggle::KeepPolicy),
        KeyCode::Char('t') => Action::Toggle(Toggle::TeachMode),
        KeyCode::Char('b') => Action::Toggle(Toggle::VlaRobot),
        KeyCode::Char('l') => Action::Toggle(Toggle::RecordLoad),
        KeyCode::Char('o') => Action::Vla(VlaCommand::Observe),
        KeyCode::Char('a') => Action::Vla(VlaCommand::Act),
        KeyCode::Char('p') => Action::Vla(VlaCommand::ResetPolicy),
        KeyCode::Char('n') => Action::NewInteraction,
        KeyCode::Char('x') => Action::Clear(LogId::Chat),
        KeyCode::Char('X') => Action::Clear(LogId::Robot),
        _ => return None,
    };
    Some(action)
}

/// Action sent by Enter in the focused input
fn submit_action(focus: FocusPane) -> Option<Action> {
    match focus {
        FocusPane::ChatInput => Some(Action::SendChat),
        FocusPane::GenerateInput => Some(Action::Generate),
        FocusPane::VlaInput => Some(Action::ObserveAct),
        FocusPane::Controls => None,
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_config {
        handle_config_key(app, key);
        return;
    }

    match app.focus {
        FocusPane::Controls => handle_controls_key(app, key),
        FocusPane::ChatInput | FocusPane::GenerateInput | FocusPane::VlaInput => {
            handle_input_key(app, key)
        }
    }
}

fn handle_controls_key(app: &mut App, key: KeyEvent) {
    if let Some(action) = control_action(key.code) {
        app.orchestrator.dispatch(action);
        return;
    }
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') => app.show_config = true,
        KeyCode::Char('i') => app.focus = FocusPane::ChatInput,
        KeyCode::Tab => app.focus = app.focus.next(),

        // Chat pane scrolling
        KeyCode::Up => app.scroll_up(LogId::Chat, SCROLL_STEP),
        KeyCode::Down => app.scroll_down(LogId::Chat, SCROLL_STEP),
        // Robot pane scrolling
        KeyCode::PageUp => app.scroll_up(LogId::Robot, SCROLL_STEP),
        KeyCode::PageDown => app.scroll_down(LogId::Robot, SCROLL_STEP),
        KeyCode::End => {
            app.follow(LogId::Chat);
            app.follow(LogId::Robot);
        }
        _ => {}
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    if is_send_key(&key) {
        if let Some(action) = submit_action(app.focus) {
            app.orchestrator.dispatch(action);
            if action == Action::SendChat {
                app.follow(LogId::Chat);
            }
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.focus = FocusPane::Controls,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Up => app.scroll_up(LogId::Chat, SCROLL_STEP),
        KeyCode::Down => app.scroll_down(LogId::Chat, SCROLL_STEP),
        KeyCode::PageUp => app.scroll_up(LogId::Robot, SCROLL_STEP),
        KeyCode::PageDown => app.scroll_down(LogId::Robot, SCROLL_STEP),
        code => {
            let Some(input) = app.focused_input_mut() else {
                return;
            };
            match code {
                KeyCode::Backspace => input.backspace(),
                KeyCode::Delete => input.delete(),
                KeyCode::Left => input.left(),
                KeyCode::Right => input.right(),
                KeyCode::Home => input.home(),
                KeyCode::End => input.end(),
                KeyCode::Char(c) => input.insert(c),
                _ => {}
            }
        }
    }
}

fn handle_config_key(app: &mut App, key: KeyEvent) {
    let form = &mut app.orchestrator.inputs_mut().form;
    match key.code {
        KeyCode::Esc => app.show_config = false,
        KeyCode::Char('j') | KeyCode::Down => form.cursor_next(),
        KeyCode::Char('k') | KeyCode::Up => form.cursor_prev(),
        KeyCode::Char(' ') => form.activate_cursor(),
        KeyCode::Enter => {
            app.orchestrator.dispatch(Action::Configure);
            app.show_config = false;
        }
        _ => {}
    }
}
