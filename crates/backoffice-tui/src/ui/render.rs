use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState, LoginFocus};
use crate::utils::{format_idle, truncate_string};

use super::styles;

const SIDEBAR_WIDTH: u16 = 22;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Min(8),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    match app.state {
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  AS Denim Back Office";
    let who = match app.session.user() {
        Some(user) => format!("{} ", user.display_name()),
        None if app.session.is_authenticated() => "Signed in ".to_string(),
        None => "Signed out ".to_string(),
    };

    let padding = (area.width as usize).saturating_sub(title.len() + who.chars().count());
    let line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(who, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_main(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(area);

    render_sidebar(frame, app, columns[0]);
    render_content(frame, app, columns[1]);
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .nav_items
        .iter()
        .map(|item| ListItem::new(item.title()).style(styles::list_item_style()))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(styles::border_style(true))
                .title(" Menu "),
        )
        .highlight_style(styles::selected_style())
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.nav_selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_content(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.content_item {
        Some(item) => format!(" {} ", item.title()),
        None => " Response ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false))
        .title(title);

    let paragraph = if app.loading {
        Paragraph::new(Span::styled("Loading...", styles::muted_style()))
    } else if let Some(ref body) = app.content {
        Paragraph::new(body.as_str())
            .wrap(Wrap { trim: false })
            .scroll((app.content_scroll, 0))
    } else {
        Paragraph::new(Line::from(vec![
            Span::styled("Press ", styles::muted_style()),
            Span::styled("[Enter]", styles::help_key_style()),
            Span::styled(" to load the selected item", styles::muted_style()),
        ]))
    };

    frame.render_widget(paragraph.block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let idle = format_idle(app.session.last_activity(), Utc::now());
    let shortcuts = "[Enter] load | [o] sign out | [q]uit";
    let right_text = if idle.is_empty() {
        format!(" {} ", shortcuts)
    } else {
        format!(" {} | {} ", idle, shortcuts)
    };

    let width = area.width as usize;
    let left_max = width.saturating_sub(right_text.len() + 1);
    let (left_text, left_style) = match app.status_message {
        Some(ref status) => (
            format!(" {}", truncate_string(&status.text, left_max.saturating_sub(1))),
            styles::notice_style(status.level),
        ),
        None => (String::new(), styles::muted_style()),
    };

    let padding = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());
    let line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(line).style(styles::status_bar_style()), area);
}

fn input_line<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(label, styles::muted_style()),
        Span::styled(format!("{:<28}{}", value, cursor), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 11 } else { 9 };
    let area = centered_rect_fixed(50, height, frame.area());
    frame.render_widget(Clear, area);

    let email = truncate_string(&app.login_email, 28);
    let masked = "*".repeat(app.login_password.chars().count().min(28));

    let mut lines = vec![
        Line::from(Span::styled("  Sign in to the back office", styles::title_style())),
        Line::from(""),
        input_line("Email:    [", email, app.login_focus == LoginFocus::Email),
        input_line("Password: [", masked, app.login_focus == LoginFocus::Password),
        Line::from(""),
    ];

    let button = if app.login_focus == LoginFocus::Button {
        Span::styled(" > Sign in < ", styles::selected_style())
    } else {
        Span::styled("   Sign in   ", styles::list_item_style())
    };
    lines.push(Line::from(vec![Span::raw("                ["), button, Span::raw("]")]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {}", truncate_string(error, 44)),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .title(" Login ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 5, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled("  Quit the console?", styles::highlight_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
