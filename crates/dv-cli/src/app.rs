//! Interactive session state.
//!
//! [`Session`] owns everything the viewer shows: the sanitized document, the
//! pan/zoom state, the last rendered bitmap, the group parse and, while it is
//! open, the people browser. Front-ends translate input into [`Action`]s and
//! draw from the accessors; nothing here touches the terminal.

use std::fs;
use std::path::{Path, PathBuf};

use dv_core::{Browser, ViewState};
use dv_parser::{GroupParse, parse_groups, sanitize};
use dv_render::{LayoutEngine, render_graph};
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::open::LinkOpener;

/// Text-pane lines moved per page key.
const PAGE_LINES: u16 = 10;

/// What the next key press is interpreted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Prompt,
    Browser,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Canvas,
    Source,
}

/// A dismissible message dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub is_error: bool,
}

impl Notice {
    fn info(title: &str, body: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            body: body.into(),
            is_error: false,
        }
    }

    fn error(title: &str, body: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            body: body.into(),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    OpenPrompt,
    PromptInput(char),
    PromptBackspace,
    PromptSubmit,
    PromptCancel,
    Reload,
    ZoomIn,
    ZoomOut,
    /// Mouse wheel notches, positive away from the user.
    Wheel(i32),
    Center,
    /// Arrow-key pan in units of `pan_step`.
    Pan { dx: i32, dy: i32 },
    DragStart { col: u16, row: u16 },
    DragTo { col: u16, row: u16 },
    DragEnd,
    ToggleFocus,
    /// Text-pane scroll in lines.
    Scroll(i32),
    /// Text-pane scroll in pages.
    ScrollPage(i32),
    OpenBrowser,
    CloseBrowser,
    BrowserInput(char),
    BrowserBackspace,
    BrowserNext,
    BrowserPrev,
    BrowserOpenLink,
    Dismiss,
}

pub struct Session {
    engine: Box<dyn LayoutEngine>,
    opener: Box<dyn LinkOpener>,
    config: ViewerConfig,
    path: Option<PathBuf>,
    text: String,
    view: ViewState,
    image: Option<RgbaImage>,
    rendered_scale: Option<f64>,
    /// Set when the text changed since `image` was rendered.
    image_stale: bool,
    parse: Option<GroupParse>,
    browser: Option<Browser>,
    prompt: Option<String>,
    notice: Option<Notice>,
    focus: Focus,
    scroll: u16,
    drag_anchor: Option<(u16, u16)>,
    quit: bool,
}

impl Session {
    #[must_use]
    pub fn new(
        engine: Box<dyn LayoutEngine>,
        opener: Box<dyn LinkOpener>,
        config: ViewerConfig,
    ) -> Self {
        Self {
            engine,
            opener,
            config,
            path: None,
            text: String::new(),
            view: ViewState::default(),
            image: None,
            rendered_scale: None,
            image_stale: false,
            parse: None,
            browser: None,
            prompt: None,
            notice: None,
            focus: Focus::default(),
            scroll: 0,
            drag_anchor: None,
            quit: false,
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.notice.is_some() {
            Mode::Message
        } else if self.prompt.is_some() {
            Mode::Prompt
        } else if self.browser.is_some() {
            Mode::Browser
        } else {
            Mode::Normal
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn view(&self) -> ViewState {
        self.view
    }

    #[must_use]
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn parse(&self) -> Option<&GroupParse> {
        self.parse.as_ref()
    }

    #[must_use]
    pub fn browser(&self) -> Option<&Browser> {
        self.browser.as_ref()
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    #[must_use]
    pub fn focus(&self) -> Focus {
        self.focus
    }

    #[must_use]
    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Read, sanitize and render a file. A read failure leaves the current
    /// document in place and raises a message.
    pub fn open_path(&mut self, path: &Path) {
        match fs::read_to_string(path) {
            Ok(raw) => {
                info!("Opened {}", path.display());
                self.path = Some(path.to_path_buf());
                self.load_text(&raw);
            }
            Err(err) => {
                warn!("Failed to read {}: {err}", path.display());
                self.notice = Some(Notice::error(
                    "Error",
                    format!("Could not open file:\n{err}"),
                ));
            }
        }
    }

    /// Replace the document with `raw`, reset the view and render it. If the
    /// render fails the previous bitmap and view stay on screen.
    pub fn load_text(&mut self, raw: &str) {
        self.text = sanitize(raw);
        let parse = parse_groups(&self.text);
        debug!(
            "Parsed {} groups, {} records",
            parse.groups.len(),
            parse.groups.node_count()
        );
        for warning in &parse.warnings {
            warn!("Parse warning: {warning}");
        }
        // An open browser follows the new document and keeps its search.
        if let Some(browser) = &mut self.browser {
            let filter = browser.filter().to_string();
            let mut rebuilt = Browser::new(parse.groups.clone());
            rebuilt.set_filter(filter);
            *browser = rebuilt;
        }
        self.parse = Some(parse);
        self.scroll = 0;
        self.image_stale = true;
        self.apply_view(ViewState::default());
    }

    pub fn reload(&mut self) {
        match self.path.clone() {
            Some(path) => self.open_path(&path),
            None => self.notice = Some(Notice::info("Info", "Load a DOT file first.")),
        }
    }

    pub fn open_browser(&mut self) {
        if self.browser.is_some() {
            return;
        }
        match &self.parse {
            Some(parse) if !self.text.trim().is_empty() => {
                self.browser = Some(Browser::new(parse.groups.clone()));
            }
            _ => self.notice = Some(Notice::info("Info", "Load a DOT file first.")),
        }
    }

    /// Open the selected member's link, if the action is enabled.
    pub fn open_selected_link(&mut self) {
        let Some(url) = self.browser.as_ref().and_then(Browser::link_action) else {
            return;
        };
        if let Err(err) = self.opener.open(url) {
            warn!("Failed to open {url}: {err}");
            self.notice = Some(Notice::error(
                "Error",
                format!("Could not open link:\n{err}"),
            ));
        }
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.quit = true,
            Action::OpenPrompt => self.prompt = Some(String::new()),
            Action::PromptInput(ch) => {
                if let Some(prompt) = &mut self.prompt {
                    prompt.push(ch);
                }
            }
            Action::PromptBackspace => {
                if let Some(prompt) = &mut self.prompt {
                    prompt.pop();
                }
            }
            Action::PromptSubmit => {
                if let Some(input) = self.prompt.take() {
                    let input = input.trim();
                    // An empty path is a cancelled dialog.
                    if !input.is_empty() {
                        self.open_path(Path::new(input));
                    }
                }
            }
            Action::PromptCancel => self.prompt = None,
            Action::Reload => self.reload(),
            Action::ZoomIn => self.update_view(ViewState::zoom_in),
            Action::ZoomOut => self.update_view(ViewState::zoom_out),
            Action::Wheel(delta) => self.update_view(|view| view.zoom_wheel(delta)),
            Action::Center => self.update_view(ViewState::center),
            Action::Pan { dx, dy } => {
                let step = self.config.pan_step;
                self.update_view(|view| {
                    view.pan(dx.saturating_mul(step), dy.saturating_mul(step));
                });
            }
            Action::DragStart { col, row } => self.drag_anchor = Some((col, row)),
            Action::DragTo { col, row } => {
                let Some((anchor_col, anchor_row)) = self.drag_anchor else {
                    return;
                };
                self.drag_anchor = Some((col, row));
                let (dx, dy) = self.config.canvas().cells_to_pixels(
                    i32::from(col) - i32::from(anchor_col),
                    i32::from(row) - i32::from(anchor_row),
                );
                if dx != 0 || dy != 0 {
                    self.update_view(|view| view.pan(dx, dy));
                }
            }
            Action::DragEnd => self.drag_anchor = None,
            Action::ToggleFocus => {
                self.focus = match self.focus {
                    Focus::Canvas => Focus::Source,
                    Focus::Source => Focus::Canvas,
                };
            }
            Action::Scroll(lines) => self.scroll_by(lines),
            Action::ScrollPage(pages) => {
                self.scroll_by(pages.saturating_mul(i32::from(PAGE_LINES)));
            }
            Action::OpenBrowser => self.open_browser(),
            Action::CloseBrowser => self.browser = None,
            Action::BrowserInput(ch) => {
                if let Some(browser) = &mut self.browser {
                    browser.push_filter_char(ch);
                }
            }
            Action::BrowserBackspace => {
                if let Some(browser) = &mut self.browser {
                    browser.pop_filter_char();
                }
            }
            Action::BrowserNext => {
                if let Some(browser) = &mut self.browser {
                    browser.select_next();
                }
            }
            Action::BrowserPrev => {
                if let Some(browser) = &mut self.browser {
                    browser.select_prev();
                }
            }
            Action::BrowserOpenLink => self.open_selected_link(),
            Action::Dismiss => self.notice = None,
        }
    }

    fn scroll_by(&mut self, lines: i32) {
        let max = u16::try_from(self.text.lines().count().saturating_sub(1)).unwrap_or(u16::MAX);
        let next = (i32::from(self.scroll) + lines).clamp(0, i32::from(max));
        self.scroll = u16::try_from(next).unwrap_or(max);
    }

    fn update_view(&mut self, change: impl FnOnce(&mut ViewState)) {
        let mut next = self.view;
        change(&mut next);
        if next != self.view {
            self.apply_view(next);
        }
    }

    /// Commit `next` if the bitmap for it can be produced. The bitmap only
    /// depends on the text and the scale, so offsets alone reuse it.
    fn apply_view(&mut self, next: ViewState) {
        if self.text.trim().is_empty() {
            self.image = None;
            self.rendered_scale = None;
            self.image_stale = false;
            self.view = next;
            return;
        }
        let current = self.image.is_some()
            && !self.image_stale
            && self.rendered_scale == Some(next.scale);
        if current {
            self.view = next;
            return;
        }
        match render_graph(self.engine.as_ref(), &self.text, next.scale) {
            Ok(image) => {
                debug!(
                    "Rendered {}x{} at scale {:.3}",
                    image.width(),
                    image.height(),
                    next.scale
                );
                self.image = Some(image);
                self.rendered_scale = Some(next.scale);
                self.image_stale = false;
                self.view = next;
            }
            Err(err) => {
                warn!("Render failed: {err}");
                self.notice = Some(Notice::error("Render error", err.to_string()));
            }
        }
    }
}
