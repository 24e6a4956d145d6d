//! Full-screen terminal front-end for [`Session`].

use std::io::{self, IsTerminal, Stdout};

use anyhow::{Result, bail};
use crossterm::ExecutableCommand;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use dv_core::{Browser, Selection};
use dv_term::{HALF_BLOCK, Rgb, rasterize};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::debug;

use crate::app::{Action, Focus, Mode, Notice, Session};

const KEY_HINTS: &str =
    " o Open  b Browser  +/- Zoom  c Center  ←↑↓→ Pan  r Reload  Tab Focus  PgUp/PgDn Scroll  q Quit";

/// Screen regions remembered between frames for mouse hit-testing.
#[derive(Debug, Default)]
struct UiState {
    canvas: Rect,
}

/// Raw mode, alternate screen and mouse capture, undone on drop.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout
            .execute(EnterAlternateScreen)?
            .execute(EnableMouseCapture)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = restore_terminal();
        let _ = self.terminal.show_cursor();
    }
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    io::stdout()
        .execute(DisableMouseCapture)?
        .execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Release builds abort on panic, so the guard's `Drop` never runs there.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        previous(info);
    }));
}

/// Run the viewer until the user quits.
pub fn run(mut session: Session) -> Result<()> {
    if !io::stdout().is_terminal() {
        bail!("the viewer needs an interactive terminal; try `dotview render` instead");
    }
    install_panic_hook();
    let mut guard = TerminalGuard::enter()?;
    let mut ui = UiState::default();

    while !session.should_quit() {
        guard.terminal.draw(|frame| draw(frame, &session, &mut ui))?;
        let action = match event::read()? {
            // Windows reports releases too.
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                key_action(session.mode(), session.focus(), key)
            }
            Event::Mouse(mouse) if session.mode() == Mode::Normal => {
                mouse_action(ui.canvas, mouse)
            }
            _ => None,
        };
        if let Some(action) = action {
            debug!("Action: {action:?}");
            session.apply(action);
        }
    }
    Ok(())
}

fn key_action(mode: Mode, focus: Focus, key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }
    match mode {
        Mode::Message => Some(Action::Dismiss),
        Mode::Prompt => match key.code {
            KeyCode::Enter => Some(Action::PromptSubmit),
            KeyCode::Esc => Some(Action::PromptCancel),
            KeyCode::Backspace => Some(Action::PromptBackspace),
            KeyCode::Char(ch) => Some(Action::PromptInput(ch)),
            _ => None,
        },
        Mode::Browser => match key.code {
            KeyCode::Esc => Some(Action::CloseBrowser),
            KeyCode::Enter => Some(Action::BrowserOpenLink),
            KeyCode::Up => Some(Action::BrowserPrev),
            KeyCode::Down => Some(Action::BrowserNext),
            KeyCode::Backspace => Some(Action::BrowserBackspace),
            KeyCode::Char(ch) => Some(Action::BrowserInput(ch)),
            _ => None,
        },
        Mode::Normal => normal_key(focus, key.code),
    }
}

fn normal_key(focus: Focus, code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('o') => Action::OpenPrompt,
        KeyCode::Char('b') => Action::OpenBrowser,
        KeyCode::Char('+' | '=') => Action::ZoomIn,
        KeyCode::Char('-') => Action::ZoomOut,
        KeyCode::Char('c') => Action::Center,
        KeyCode::Char('r') => Action::Reload,
        KeyCode::Tab => Action::ToggleFocus,
        KeyCode::PageUp => Action::ScrollPage(-1),
        KeyCode::PageDown => Action::ScrollPage(1),
        KeyCode::Up if focus == Focus::Source => Action::Scroll(-1),
        KeyCode::Down if focus == Focus::Source => Action::Scroll(1),
        KeyCode::Left => Action::Pan { dx: -1, dy: 0 },
        KeyCode::Right => Action::Pan { dx: 1, dy: 0 },
        KeyCode::Up => Action::Pan { dx: 0, dy: -1 },
        KeyCode::Down => Action::Pan { dx: 0, dy: 1 },
        _ => return None,
    };
    Some(action)
}

fn mouse_action(canvas: Rect, mouse: MouseEvent) -> Option<Action> {
    let inside = canvas.contains(Position::new(mouse.column, mouse.row));
    let (col, row) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if inside => Some(Action::DragStart { col, row }),
        MouseEventKind::Drag(MouseButton::Left) => Some(Action::DragTo { col, row }),
        MouseEventKind::Up(MouseButton::Left) => Some(Action::DragEnd),
        MouseEventKind::ScrollUp if inside => Some(Action::Wheel(1)),
        MouseEventKind::ScrollDown if inside => Some(Action::Wheel(-1)),
        _ => None,
    }
}

// =============================================================================
// Drawing
// =============================================================================

fn draw(frame: &mut Frame, session: &Session, ui: &mut UiState) {
    let screen = frame.area();
    let [toolbar, body, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(screen);
    let [source, canvas] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).areas(body);

    frame.render_widget(
        Paragraph::new(KEY_HINTS).style(Style::new().fg(Color::Black).bg(Color::Gray)),
        toolbar,
    );
    draw_source(frame, session, source);
    ui.canvas = draw_canvas(frame, session, canvas);
    draw_status(frame, session, status);

    if let Some(browser) = session.browser() {
        draw_browser(frame, browser, centered(screen, 80, 80));
    }
    if let Some(notice) = session.notice() {
        draw_notice(frame, notice, centered(screen, 60, 30));
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::new().fg(Color::Cyan)
    } else {
        Style::new().fg(Color::DarkGray)
    };
    Block::bordered().title(title).border_style(border)
}

fn draw_source(frame: &mut Frame, session: &Session, area: Rect) {
    let title = session
        .path()
        .and_then(|path| path.file_name())
        .map_or_else(|| " Source ".to_string(), |name| format!(" {} ", name.to_string_lossy()));
    let paragraph = Paragraph::new(session.text())
        .scroll((session.scroll(), 0))
        .block(pane_block(title, session.focus() == Focus::Source));
    frame.render_widget(paragraph, area);
}

/// Draw the bitmap and return the inner canvas rectangle.
fn draw_canvas(frame: &mut Frame, session: &Session, area: Rect) -> Rect {
    let block = pane_block(" Graph ".to_string(), session.focus() == Focus::Canvas);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(image) = session.image() else {
        let hint = if session.text().trim().is_empty() {
            "Press o to open a DOT file"
        } else {
            "Nothing rendered"
        };
        frame.render_widget(
            Paragraph::new(hint).style(Style::new().fg(Color::DarkGray)),
            inner,
        );
        return inner;
    };

    let view = session.view();
    let cells = rasterize(
        image,
        view.offset_x,
        view.offset_y,
        usize::from(inner.width),
        usize::from(inner.height),
        &session.config().canvas(),
    );
    let (_, rows) = cells.dimensions();
    let lines: Vec<Line> = (0..rows)
        .map(|row| {
            Line::from(
                cells
                    .row(row)
                    .iter()
                    .map(|cell| {
                        Span::styled(
                            HALF_BLOCK.to_string(),
                            Style::new().fg(rgb(cell.top)).bg(rgb(cell.bottom)),
                        )
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
    inner
}

fn rgb([r, g, b]: Rgb) -> Color {
    Color::Rgb(r, g, b)
}

fn draw_status(frame: &mut Frame, session: &Session, area: Rect) {
    let line = if let Some(input) = session.prompt() {
        Line::from(vec![
            Span::styled(" Open file: ", Style::new().add_modifier(Modifier::BOLD)),
            Span::raw(input.to_string()),
            Span::styled("█", Style::new().fg(Color::Gray)),
            Span::styled("  (Enter to open, Esc to cancel)", Style::new().fg(Color::DarkGray)),
        ])
    } else {
        Line::from(status_text(session))
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn status_text(session: &Session) -> String {
    let view = session.view();
    let mut parts = vec![
        session
            .path()
            .map_or_else(|| "no file".to_string(), |path| path.display().to_string()),
        format!("zoom {:.0}%", view.scale * 100.0),
        format!("offset {},{}", view.offset_x, view.offset_y),
    ];
    if let Some(parse) = session.parse() {
        parts.push(format!(
            "{} groups, {} nodes",
            parse.groups.len(),
            parse.groups.node_count()
        ));
        if !parse.warnings.is_empty() {
            parts.push(format!("{} warnings", parse.warnings.len()));
        }
    }
    format!(" {}", parts.join(" | "))
}

fn draw_browser(frame: &mut Frame, browser: &Browser, area: Rect) {
    frame.render_widget(Clear, area);
    let outer = Block::bordered()
        .title(" People and work ")
        .border_style(Style::new().fg(Color::Cyan));
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let [search, body, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(inner);
    let [tree, detail] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(body);

    frame.render_widget(
        Paragraph::new(format!("{}█", browser.filter()))
            .block(Block::bordered().title(" Search name or work ")),
        search,
    );

    let items: Vec<ListItem> = browser
        .rows()
        .into_iter()
        .map(|row| {
            let style = match row.selection {
                Selection::Group(_) => Style::new().add_modifier(Modifier::BOLD),
                Selection::Member { .. } => Style::new(),
            };
            ListItem::new(format!("{}{}", "  ".repeat(row.depth), row.text)).style(style)
        })
        .collect();
    let list = List::new(items)
        .block(Block::bordered())
        .highlight_style(Style::new().fg(Color::Black).bg(Color::Cyan))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(browser.selected_row());
    frame.render_stateful_widget(list, tree, &mut state);

    let detail_view = browser.detail();
    let lines: Vec<Line> = detail_view.lines().into_iter().map(Line::from).collect();
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(format!(" {} ", detail_view.title()))),
        detail,
    );

    let link_style = if browser.link_action().is_some() {
        Style::new().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::new().fg(Color::DarkGray)
    };
    let hints = Line::from(vec![
        Span::styled(" [Enter] Open link", link_style),
        Span::styled("  [↑/↓] Select  [Esc] Close", Style::new().fg(Color::Gray)),
    ]);
    frame.render_widget(Paragraph::new(hints), footer);
}

fn draw_notice(frame: &mut Frame, notice: &Notice, area: Rect) {
    frame.render_widget(Clear, area);
    let color = if notice.is_error {
        Color::Red
    } else {
        Color::Cyan
    };
    let text = format!("{}\n\nPress any key to continue.", notice.body);
    frame.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: false }).block(
            Block::bordered()
                .title(format!(" {} ", notice.title))
                .border_style(Style::new().fg(color)),
        ),
        area,
    );
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}

#[cfg(test)]
mod tests {
    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };
    use dv_render::GraphvizEngine;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::layout::Rect;

    use super::*;
    use crate::config::ViewerConfig;
    use crate::open::SystemOpener;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn screen_text(session: &Session) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("terminal");
        let mut ui = UiState::default();
        terminal
            .draw(|frame| draw(frame, session, &mut ui))
            .expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn idle_session() -> Session {
        Session::new(
            Box::new(GraphvizEngine::default()),
            Box::new(SystemOpener),
            ViewerConfig::default(),
        )
    }

    #[test]
    fn normal_keys_map_to_view_actions() {
        let normal = |code| key_action(Mode::Normal, Focus::Canvas, key(code));
        assert_eq!(normal(KeyCode::Char('=')), Some(Action::ZoomIn));
        assert_eq!(normal(KeyCode::Char('+')), Some(Action::ZoomIn));
        assert_eq!(normal(KeyCode::Char('-')), Some(Action::ZoomOut));
        assert_eq!(normal(KeyCode::Left), Some(Action::Pan { dx: -1, dy: 0 }));
        assert_eq!(normal(KeyCode::Up), Some(Action::Pan { dx: 0, dy: -1 }));
        assert_eq!(normal(KeyCode::Char('b')), Some(Action::OpenBrowser));
        assert_eq!(normal(KeyCode::F(5)), None);
    }

    #[test]
    fn arrows_scroll_the_text_pane_when_it_has_focus() {
        assert_eq!(
            key_action(Mode::Normal, Focus::Source, key(KeyCode::Down)),
            Some(Action::Scroll(1))
        );
        assert_eq!(
            key_action(Mode::Normal, Focus::Source, key(KeyCode::Left)),
            Some(Action::Pan { dx: -1, dy: 0 })
        );
    }

    #[test]
    fn modal_modes_capture_typing() {
        assert_eq!(
            key_action(Mode::Browser, Focus::Canvas, key(KeyCode::Char('q'))),
            Some(Action::BrowserInput('q'))
        );
        assert_eq!(
            key_action(Mode::Prompt, Focus::Canvas, key(KeyCode::Char('b'))),
            Some(Action::PromptInput('b'))
        );
        assert_eq!(
            key_action(Mode::Message, Focus::Canvas, key(KeyCode::Char('x'))),
            Some(Action::Dismiss)
        );
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_action(Mode::Browser, Focus::Canvas, ctrl_c), Some(Action::Quit));
    }

    #[test]
    fn mouse_drags_start_only_inside_the_canvas() {
        let canvas = Rect::new(10, 1, 20, 10);
        assert_eq!(
            mouse_action(canvas, mouse(MouseEventKind::Down(MouseButton::Left), 12, 3)),
            Some(Action::DragStart { col: 12, row: 3 })
        );
        assert_eq!(
            mouse_action(canvas, mouse(MouseEventKind::Down(MouseButton::Left), 2, 3)),
            None
        );
        assert_eq!(
            mouse_action(canvas, mouse(MouseEventKind::Drag(MouseButton::Left), 40, 3)),
            Some(Action::DragTo { col: 40, row: 3 })
        );
        assert_eq!(
            mouse_action(canvas, mouse(MouseEventKind::ScrollDown, 15, 5)),
            Some(Action::Wheel(-1))
        );
    }

    #[test]
    fn centered_popup_is_inside_the_screen() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered(area, 60, 30);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 12);
        assert!(popup.x >= 20 && popup.y >= 14);
    }

    #[test]
    fn empty_session_draws_the_open_hint() {
        let text = screen_text(&idle_session());
        assert!(text.contains("Press o to open a DOT file"));
        assert!(text.contains("no file"));
    }

    #[test]
    fn browser_without_document_shows_the_message() {
        let mut session = idle_session();
        session.apply(Action::OpenBrowser);
        let text = screen_text(&session);
        assert!(text.contains("Load a DOT file first."));
    }
}
