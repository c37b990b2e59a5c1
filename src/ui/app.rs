use crate::controller::{ControllerHandle, ControllerState, UiCommand};
use anyhow::Result;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tui_input::{backend::crossterm::EventHandler, Input};

const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
const C_MUTED: Color = Color::Rgb(72, 72, 88);
const C_ACCENT: Color = Color::Rgb(255, 95, 95);
const C_PLAYING: Color = Color::Rgb(80, 200, 120);
const C_ERROR: Color = Color::Rgb(255, 80, 80);
const C_FILTER_FG: Color = Color::Rgb(255, 200, 80);
const C_SELECTION_BG: Color = Color::Rgb(28, 28, 40);

const HELP_LINE: &str = "↑/↓ select · ⏎ play · ←/→ country · ^S stop · ^R reload · Esc quit";

pub fn run(handle: ControllerHandle) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = App::new(handle).run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}

struct App {
    handle: ControllerHandle,
    state: ControllerState,
    input: Input,
    /// Index into `state.visible`.
    selected: usize,
    list_state: ListState,
    /// Country selector position: 0 = All, i+1 = `state.countries[i]`.
    country_idx: usize,
}

impl App {
    fn new(handle: ControllerHandle) -> Self {
        let state = handle.state_rx.borrow().clone();
        Self {
            handle,
            state,
            input: Input::default(),
            selected: 0,
            list_state: ListState::default(),
            country_idx: 0,
        }
    }

    fn run(mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(Duration::from_millis(100))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key) {
                            return Ok(());
                        }
                    }
                    _ => {}
                }
            }

            match self.handle.state_rx.has_changed() {
                Ok(true) => {
                    self.state = self.handle.state_rx.borrow_and_update().clone();
                    self.clamp();
                }
                Ok(false) => {}
                // Controller gone; nothing left to browse.
                Err(_) => return Ok(()),
            }
        }
    }

    fn clamp(&mut self) {
        self.selected = self
            .selected
            .min(self.state.visible.len().saturating_sub(1));
        if self.country_idx > self.state.countries.len() {
            self.country_idx = 0;
        }
    }

    fn send(&self, cmd: UiCommand) {
        let _ = self.handle.cmd_tx.send(cmd);
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.send(UiCommand::Reload);
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.send(UiCommand::Stop);
            }
            KeyCode::Esc => {
                // First Esc clears the search; a second one quits.
                if self.input.value().is_empty() {
                    return true;
                }
                self.input = Input::default();
                self.send(UiCommand::Search(String::new()));
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                self.selected = (self.selected + 1)
                    .min(self.state.visible.len().saturating_sub(1));
            }
            KeyCode::Left => self.cycle_country(-1),
            KeyCode::Right => self.cycle_country(1),
            KeyCode::Enter => {
                if let Some(station) = self.state.visible.get(self.selected) {
                    self.send(UiCommand::Play(station.clone()));
                }
            }
            _ => {
                // Everything else edits the search box; filtering is live.
                self.input
                    .handle_event(&ratatui::crossterm::event::Event::Key(key));
                self.send(UiCommand::Search(self.input.value().to_string()));
            }
        }
        false
    }

    fn cycle_country(&mut self, step: isize) {
        let n = self.state.countries.len() + 1;
        self.country_idx = (self.country_idx as isize + step).rem_euclid(n as isize) as usize;
        let value = match self.country_idx {
            0 => String::new(),
            i => self.state.countries[i - 1].clone(),
        };
        self.send(UiCommand::CountryFilter(value));
    }

    fn country_label(&self) -> &str {
        if self.state.selected_country.is_empty() {
            "All"
        } else {
            &self.state.selected_country
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let [header, search, country, list, status, playing] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_header(frame, header);
        self.draw_search(frame, search);
        self.draw_country(frame, country);
        self.draw_list(frame, list);
        self.draw_status(frame, status);
        self.draw_now_playing(frame, playing);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(" radiodial ", Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("{} stations", self.state.total_count),
                Style::default().fg(C_SECONDARY),
            ),
        ];
        if self.state.loading {
            spans.push(Span::styled("  loading…", Style::default().fg(C_MUTED)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_search(&self, frame: &mut Frame, area: Rect) {
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled("/ Search stations…", Style::default().fg(C_MUTED))
        } else {
            Span::styled(format!("/ {}", &value[scroll..]), Style::default().fg(C_FILTER_FG))
        };
        frame.render_widget(Paragraph::new(Line::from(vec![display])), area);

        let cursor_x = area.x + 2 + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
        frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(1)), area.y));
    }

    fn draw_country(&self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled(" Country ", Style::default().fg(C_SECONDARY)),
            Span::styled("◂ ", Style::default().fg(C_MUTED)),
            Span::styled(self.country_label(), Style::default().fg(C_PRIMARY)),
            Span::styled(" ▸", Style::default().fg(C_MUTED)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_list(&mut self, frame: &mut Frame, area: Rect) {
        let now_playing = self.state.now_playing.as_ref();

        let items: Vec<ListItem> = self
            .state
            .visible
            .iter()
            .map(|s| {
                // Active row is keyed by stream URL, never by name.
                let active = now_playing.is_some_and(|np| np.station.same_stream(s));
                let (marker, name_style) = if active {
                    ("▶ ", Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD))
                } else {
                    ("  ", Style::default().fg(C_PRIMARY))
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{marker}{} {}", s.icon(), s.name), name_style),
                    Span::raw("  "),
                    Span::styled(s.meta_line(), Style::default().fg(C_SECONDARY)),
                ]))
            })
            .collect();

        self.list_state.select(if self.state.visible.is_empty() {
            None
        } else {
            Some(self.selected)
        });

        let list = List::new(items).highlight_style(Style::default().bg(C_SELECTION_BG));
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let line = if let Some(err) = &self.state.error {
            Line::from(Span::styled(format!(" {err}"), Style::default().fg(C_ERROR)))
        } else if self.state.loading {
            Line::from(Span::styled(" Loading stations…", Style::default().fg(C_MUTED)))
        } else if self.state.visible.is_empty() {
            let filtered = !self.state.search_query.is_empty()
                || !self.state.selected_country.is_empty();
            let msg = if filtered {
                " No stations match the current filters."
            } else {
                " No stations found."
            };
            Line::from(Span::styled(msg, Style::default().fg(C_MUTED)))
        } else {
            Line::from(Span::styled(format!(" {HELP_LINE}"), Style::default().fg(C_MUTED)))
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_now_playing(&self, frame: &mut Frame, area: Rect) {
        let Some(np) = &self.state.now_playing else {
            return;
        };
        let mut spans = vec![
            Span::styled(" ▶ ", Style::default().fg(C_PLAYING)),
            Span::styled(np.station.name.as_str(), Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", np.station.meta_line()),
                Style::default().fg(C_SECONDARY),
            ),
        ];
        if let Some(title) = np.media_title.as_deref().filter(|t| !t.is_empty()) {
            spans.push(Span::styled(format!("  {title}"), Style::default().fg(C_PRIMARY)));
        }
        if let Some(home) = np.station.homepage.as_deref().filter(|h| !h.is_empty()) {
            spans.push(Span::styled(format!("  {home}"), Style::default().fg(C_MUTED)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
