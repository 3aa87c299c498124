use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, MouseEvent, MouseEventKind};

use backoffice_core::auth::ActivityKind;

use crate::app::{App, AppState, LoginFocus, PAGE_SCROLL_SIZE};

/// Map a terminal event to the interaction it represents for the
/// inactivity watchdog. Resize and focus events are not user activity.
pub fn activity_kind(event: &Event) -> Option<ActivityKind> {
    match event {
        Event::Key(_) | Event::Paste(_) => Some(ActivityKind::KeyPress),
        Event::Mouse(mouse) => Some(match mouse.kind {
            MouseEventKind::Down(_) | MouseEventKind::Up(_) => ActivityKind::Click,
            MouseEventKind::Moved | MouseEventKind::Drag(_) => ActivityKind::PointerMove,
            MouseEventKind::ScrollDown
            | MouseEventKind::ScrollUp
            | MouseEventKind::ScrollLeft
            | MouseEventKind::ScrollRight => ActivityKind::Scroll,
        }),
        Event::FocusGained | Event::FocusLost | Event::Resize(_, _) => None,
    }
}

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => handle_login_input(app, key).await,
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            Ok(false)
        }
        AppState::Quitting => Ok(true),
        AppState::Normal => handle_normal_input(app, key).await,
    }
}

async fn handle_normal_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    let last = app.nav_items.len().saturating_sub(1);

    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('o') => app.sign_out().await,
        KeyCode::Up | KeyCode::Char('k') => {
            app.nav_selection = app.nav_selection.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.nav_selection = (app.nav_selection + 1).min(last);
        }
        KeyCode::Home => app.nav_selection = 0,
        KeyCode::End => app.nav_selection = last,
        KeyCode::Enter | KeyCode::Char('r') => app.fetch_selected(),
        KeyCode::PageDown => app.scroll_content(i32::from(PAGE_SCROLL_SIZE)),
        KeyCode::PageUp => app.scroll_content(-i32::from(PAGE_SCROLL_SIZE)),
        _ => {}
    }
    Ok(false)
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Email,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Email,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.attempt_login().await,
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email if app.can_add_email_char(c) => app.login_email.push(c),
            LoginFocus::Password if app.can_add_password_char(c) => app.login_password.push(c),
            _ => {}
        },
        _ => {}
    }
    Ok(false)
}

/// Mouse wheel scrolls the content pane
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.state != AppState::Normal {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_content(3),
        MouseEventKind::ScrollUp => app.scroll_content(-3),
        _ => {}
    }
}
