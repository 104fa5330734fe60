use crate::app::AppState;
use crate::export::DirectorySaver;
use crate::lock::LockGuard;
use crate::model::{Field, Note, NoteColor, NoteError, NoteId};
use crate::storage::{FileStore, StoreLocation};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::env;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const PALETTE: &[(&str, Option<&str>)] = &[
    ("Default", None),
    ("Lemon", Some("#fff475")),
    ("Amber", Some("#fbbc04")),
    ("Rose", Some("#f28b82")),
    ("Mint", Some("#ccff90")),
    ("Sky", Some("#cbf0f8")),
    ("Lavender", Some("#d7aefb")),
    ("Sand", Some("#e6c9a8")),
];

pub fn run(state: AppState<FileStore>, location: StoreLocation) -> Result<()> {
    let downloads = DirectorySaver::new(env::current_dir()?);
    let mut terminal = setup_terminal()?;
    let mut app = App::new(state, location, downloads);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    state: AppState<FileStore>,
    location: StoreLocation,
    downloads: DirectorySaver,
    view: ViewMode,
    selected: usize,
    scroll_offset: usize,
    search: FieldValue,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Searching,
    Editing {
        note_id: NoteId,
        form: NoteForm,
    },
    PickingColor {
        note_id: NoteId,
        idx: usize,
    },
    Password {
        note_id: NoteId,
        purpose: PasswordPurpose,
        input: FieldValue,
    },
    ConfirmPurge {
        note_id: NoteId,
    },
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ViewMode {
    Notes,
    Trash,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum PasswordPurpose {
    Lock,
    Unlock,
}

struct NoteForm {
    title: FieldValue,
    body: FieldValue,
    field: Field,
    body_locked: bool,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl ViewMode {
    fn label(&self) -> &'static str {
        match self {
            ViewMode::Notes => "Notes",
            ViewMode::Trash => "Trash",
        }
    }
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char_boundary(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        let target_start = line_starts[line_idx - 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        let target_start = line_starts[line_idx + 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_char_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    fn masked(&self) -> String {
        "*".repeat(self.value.chars().count())
    }
}

impl NoteForm {
    fn from_note(note: &Note) -> Self {
        let body_locked = note.is_locked();
        NoteForm {
            title: FieldValue::new(&note.title),
            body: FieldValue::new(LockGuard::visible_body(note).unwrap_or_default()),
            field: Field::Title,
            body_locked,
        }
    }

    /// Title and body are the only fields; a locked body cannot take focus.
    fn toggle_field(&mut self) {
        self.field = match self.field {
            Field::Title if !self.body_locked => Field::Body,
            _ => Field::Title,
        };
    }

    fn active_field(&self) -> &FieldValue {
        match self.field {
            Field::Title => &self.title,
            Field::Body => &self.body,
        }
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            Field::Title => &mut self.title,
            Field::Body => &mut self.body,
        }
    }
}

impl App {
    fn new(state: AppState<FileStore>, location: StoreLocation, downloads: DirectorySaver) -> Self {
        let status = format!(
            "Loaded notes from {}; downloads go to {}",
            location.dir.display(),
            downloads.dir().display()
        );
        App {
            state,
            location,
            downloads,
            view: ViewMode::Notes,
            selected: 0,
            scroll_offset: 0,
            search: FieldValue::new(""),
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        self.mode = match mode {
            Mode::Normal => return self.handle_normal_key(key),
            Mode::Searching => self.handle_search_key(key),
            Mode::Editing { note_id, mut form } => {
                if self.process_form_key(&note_id, &mut form, key) {
                    Mode::Normal
                } else {
                    Mode::Editing { note_id, form }
                }
            }
            Mode::PickingColor { note_id, idx } => self.handle_color_key(note_id, idx, key),
            Mode::Password {
                note_id,
                purpose,
                mut input,
            } => {
                if self.process_password_key(&note_id, purpose, &mut input, key) {
                    Mode::Normal
                } else {
                    Mode::Password {
                        note_id,
                        purpose,
                        input,
                    }
                }
            }
            Mode::ConfirmPurge { note_id } => self.handle_confirm_key(note_id, key),
        };
        self.clamp_selection();
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('t') => self.toggle_view(),
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.selected += 1,
            _ => match self.view {
                ViewMode::Notes => self.handle_notes_key(key),
                ViewMode::Trash => self.handle_trash_key(key),
            },
        }
        self.clamp_selection();
        false
    }

    fn handle_notes_key(&mut self, key: KeyEvent) {
        if let KeyCode::Char('n') = key.code {
            self.create_note();
            return;
        }
        if key.code == KeyCode::Char('/') {
            self.mode = Mode::Searching;
            self.status = "Searching (Enter to keep, Esc to clear)".into();
            return;
        }
        if key.code == KeyCode::Esc && !self.search.value.is_empty() {
            self.search.clear();
            self.status = "Search cleared".into();
            return;
        }
        let Some(note_id) = self.current_id() else {
            if matches!(
                key.code,
                KeyCode::Char('e' | 'p' | 'c' | 'l' | 's' | 'w' | 'd')
            ) {
                self.status = "No note selected".into();
            }
            return;
        };
        match key.code {
            KeyCode::Char('e') | KeyCode::Enter => self.open_editor(&note_id),
            KeyCode::Char('p') => match self.state.toggle_pin(&note_id) {
                Ok(pinned) => {
                    self.select_note(&note_id);
                    self.saved(if pinned { "Note pinned" } else { "Note unpinned" });
                }
                Err(err) => self.fail("Pin failed", err),
            },
            KeyCode::Char('c') => {
                let idx = self
                    .state
                    .get(&note_id)
                    .and_then(|n| n.color)
                    .and_then(|c| {
                        PALETTE
                            .iter()
                            .position(|(_, hex)| hex.and_then(|h| h.parse().ok()) == Some(c))
                    })
                    .unwrap_or(0);
                self.mode = Mode::PickingColor { note_id, idx };
                self.status = "Pick a color (Enter to apply, Esc to close)".into();
            }
            KeyCode::Char('l') => {
                let locked = self.state.get(&note_id).map(Note::is_locked).unwrap_or(false);
                let purpose = if locked {
                    PasswordPurpose::Unlock
                } else {
                    PasswordPurpose::Lock
                };
                self.mode = Mode::Password {
                    note_id,
                    purpose,
                    input: FieldValue::new(""),
                };
                self.status = match purpose {
                    PasswordPurpose::Lock => "Set a password for this note".into(),
                    PasswordPurpose::Unlock => "Enter password to unlock".into(),
                };
            }
            KeyCode::Char('s') => match self.state.share(&note_id, None) {
                Ok(()) => self.status = "Shared".into(),
                Err(NoteError::UnsupportedCapability(_)) => {
                    self.status = "Sharing not supported in this terminal".into()
                }
                Err(err) => self.fail("Share failed", err),
            },
            KeyCode::Char('w') => match self.state.download(&note_id, &mut self.downloads) {
                Ok(path) => self.status = format!("Saved {}", path.display()),
                Err(err) => self.fail("Download failed", err),
            },
            KeyCode::Char('d') => match self.state.delete(&note_id) {
                Ok(()) => self.saved(format!("Moved {} to trash", note_id)),
                Err(err) => self.fail("Delete failed", err),
            },
            _ => {}
        }
    }

    fn handle_trash_key(&mut self, key: KeyEvent) {
        let Some(note_id) = self.current_id() else {
            if matches!(key.code, KeyCode::Char('r' | 'x')) {
                self.status = "Trash is empty".into();
            }
            return;
        };
        match key.code {
            KeyCode::Char('r') => match self.state.restore(&note_id) {
                Ok(()) => self.saved(format!("Restored {}", note_id)),
                Err(err) => self.fail("Restore failed", err),
            },
            KeyCode::Char('x') => {
                self.status = "Delete permanently? (y to confirm, n/Esc to cancel)".into();
                self.mode = Mode::ConfirmPurge { note_id };
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Mode {
        match key.code {
            KeyCode::Esc => {
                self.search.clear();
                self.status = "Search cleared".into();
                return Mode::Normal;
            }
            KeyCode::Enter => {
                self.status = format!("Filtering on \"{}\"", self.search.value);
                return Mode::Normal;
            }
            KeyCode::Backspace => {
                self.search.backspace();
            }
            KeyCode::Left => self.search.move_left(),
            KeyCode::Right => self.search.move_right(),
            KeyCode::Char(c) if !has_command_modifier(key) => self.search.insert_char(c),
            _ => {}
        }
        self.selected = 0;
        Mode::Searching
    }

    fn handle_color_key(&mut self, note_id: NoteId, idx: usize, key: KeyEvent) -> Mode {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Mode::PickingColor {
                note_id,
                idx: idx.saturating_sub(1),
            },
            KeyCode::Down | KeyCode::Char('j') => Mode::PickingColor {
                note_id,
                idx: (idx + 1).min(PALETTE.len() - 1),
            },
            KeyCode::Enter => {
                let (name, hex) = PALETTE[idx];
                let color = hex.and_then(|h| h.parse::<NoteColor>().ok());
                match self.state.set_color(&note_id, color) {
                    Ok(()) => self.saved(format!("Color set to {}", name)),
                    Err(err) => self.fail("Color failed", err),
                }
                Mode::Normal
            }
            KeyCode::Esc => {
                self.status = "Color picker closed".into();
                Mode::Normal
            }
            _ => Mode::PickingColor { note_id, idx },
        }
    }

    fn handle_confirm_key(&mut self, note_id: NoteId, key: KeyEvent) -> Mode {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match self.state.permanent_delete(&note_id) {
                    Ok(()) => self.saved(format!("Deleted {} permanently", note_id)),
                    Err(err) => self.fail("Delete failed", err),
                }
                Mode::Normal
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                Mode::Normal
            }
            _ => Mode::ConfirmPurge { note_id },
        }
    }

    /// Returns true when the editor should close. Every text change is
    /// written through immediately.
    fn process_form_key(&mut self, note_id: &str, form: &mut NoteForm, key: KeyEvent) -> bool {
        let mut changed = false;
        match key.code {
            KeyCode::Esc => {
                self.status = "Done editing".into();
                return true;
            }
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.status = "Done editing".into();
                return true;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Left => form.active_field_mut().move_left(),
            KeyCode::Right => form.active_field_mut().move_right(),
            KeyCode::Up => form.active_field_mut().move_up(),
            KeyCode::Down => form.active_field_mut().move_down(),
            KeyCode::Enter => {
                if form.field == Field::Body {
                    form.active_field_mut().insert_char('\n');
                    changed = true;
                } else {
                    form.toggle_field();
                }
            }
            KeyCode::Backspace => changed = form.active_field_mut().backspace(),
            KeyCode::Char(c) if !has_command_modifier(key) => {
                form.active_field_mut().insert_char(c);
                changed = true;
            }
            _ => {}
        }
        if changed {
            let value = form.active_field().value.clone();
            match self.state.edit(note_id, form.field, &value) {
                Ok(()) => self.saved("Saved"),
                Err(err) => {
                    self.fail("Edit failed", err);
                    return true;
                }
            }
        }
        false
    }

    fn process_password_key(
        &mut self,
        note_id: &str,
        purpose: PasswordPurpose,
        input: &mut FieldValue,
        key: KeyEvent,
    ) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                true
            }
            KeyCode::Enter => {
                match purpose {
                    PasswordPurpose::Lock => match self.state.lock(note_id, &input.value) {
                        Ok(true) => self.saved("Note locked"),
                        Ok(false) => self.status = "No password entered; note left unlocked".into(),
                        Err(err) => self.fail("Lock failed", err),
                    },
                    PasswordPurpose::Unlock => match self.state.unlock(note_id, &input.value) {
                        Ok(()) => self.saved("Note unlocked"),
                        Err(NoteError::AuthenticationFailure) => {
                            self.status = "Incorrect password!".into()
                        }
                        Err(err) => self.fail("Unlock failed", err),
                    },
                }
                true
            }
            KeyCode::Backspace => {
                input.backspace();
                false
            }
            KeyCode::Char(c) if !has_command_modifier(key) => {
                input.insert_char(c);
                false
            }
            _ => false,
        }
    }

    fn create_note(&mut self) {
        match self.state.create_note() {
            Ok(note_id) => {
                self.search.clear();
                self.select_note(&note_id);
                self.saved(format!("Created note {}", note_id));
                self.open_editor(&note_id);
            }
            Err(err) => self.fail("Could not create note", err),
        }
    }

    fn open_editor(&mut self, note_id: &str) {
        let Some(note) = self.state.get(note_id) else {
            return;
        };
        let form = NoteForm::from_note(note);
        self.status = if form.body_locked {
            format!("Editing {} (body locked; title only)", note_id)
        } else {
            format!("Editing {} (Tab switches field, Esc done)", note_id)
        };
        self.mode = Mode::Editing {
            note_id: note_id.to_string(),
            form,
        };
    }

    fn toggle_view(&mut self) {
        self.view = match self.view {
            ViewMode::Notes => ViewMode::Trash,
            ViewMode::Trash => ViewMode::Notes,
        };
        self.selected = 0;
        self.scroll_offset = 0;
        self.status = format!("Switched to {} view", self.view.label());
    }

    fn visible_notes(&self) -> Vec<&Note> {
        match self.view {
            ViewMode::Notes => self.state.search(&self.search.value),
            ViewMode::Trash => self.state.trashed().iter().collect(),
        }
    }

    fn current_note(&self) -> Option<&Note> {
        self.visible_notes().get(self.selected).copied()
    }

    fn current_id(&self) -> Option<NoteId> {
        self.current_note().map(|n| n.id.clone())
    }

    fn select_note(&mut self, note_id: &str) {
        if let Some(idx) = self.visible_notes().iter().position(|n| n.id == note_id) {
            self.selected = idx;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_notes().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn saved(&mut self, message: impl Into<String>) {
        self.last_save = Instant::now();
        self.status = message.into();
    }

    fn fail(&mut self, context: &str, err: NoteError) {
        log::warn!("{}: {}", context, err);
        self.status = format!("{}: {}", context, err);
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_search(f, layout[1]);
        self.draw_notes(f, layout[2]);
        self.draw_footer(f, layout[3]);

        match &self.mode {
            Mode::Editing { form, .. } => self.draw_form(f, form),
            Mode::PickingColor { idx, .. } => self.draw_color_picker(f, *idx),
            Mode::Password { purpose, input, .. } => self.draw_password(f, *purpose, input),
            Mode::ConfirmPurge { note_id } => self.draw_confirm(f, note_id),
            Mode::Normal | Mode::Searching => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "notepin ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(self.location.scope.label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.dir.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!(
                    "{} notes, {} in trash",
                    self.state.active().len(),
                    self.state.trashed().len()
                ),
                Style::default().fg(Color::Magenta),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_search(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let searching = matches!(self.mode, Mode::Searching);
        let line = match self.view {
            ViewMode::Notes => {
                let text = if searching {
                    self.search.with_caret()
                } else if self.search.value.is_empty() {
                    "press / to search".to_string()
                } else {
                    self.search.value.clone()
                };
                Line::from(vec![
                    Span::styled("Search: ", Style::default().fg(Color::Gray)),
                    Span::styled(
                        text,
                        Style::default().fg(if searching { Color::Cyan } else { Color::White }),
                    ),
                ])
            }
            ViewMode::Trash => Line::from(Span::styled(
                "Trashed notes can be restored or deleted permanently",
                Style::default().fg(Color::LightRed),
            )),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if searching {
                Color::Cyan
            } else {
                Color::DarkGray
            }));
        f.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_notes(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let card_width = area.width.saturating_sub(2);
        let selected = self.selected;
        let (items, count) = {
            let notes = self.visible_notes();
            let items = notes
                .iter()
                .enumerate()
                .map(|(idx, note)| note_item(note, card_width, idx == selected))
                .collect::<Vec<_>>();
            (items, notes.len())
        };
        let title = format!("{} ({})", self.view.label(), count);
        let accent = match self.view {
            ViewMode::Notes => Color::Yellow,
            ViewMode::Trash => Color::LightRed,
        };
        let block = Block::default()
            .title(Span::styled(
                title,
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(Color::Rgb(16, 18, 24)));

        if count == 0 {
            let empty = match self.view {
                ViewMode::Notes if !self.search.value.is_empty() => "No notes match the search",
                ViewMode::Notes => "No notes yet. Press n to create one",
                ViewMode::Trash => "Trash is empty",
            };
            let msg = Paragraph::new(empty)
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(msg, area);
            return;
        }

        let viewport = (area.height.saturating_sub(2) / CARD_HEIGHT) as usize;
        self.scroll_offset = adjust_offset(selected, self.scroll_offset, viewport, 0, count);
        let mut state = ListState::default();
        state.select(Some(selected));
        *state.offset_mut() = self.scroll_offset;
        f.render_stateful_widget(List::new(items).block(block), area, &mut state);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let detail_line = match self.current_note() {
            Some(note) => selected_note_detail(note),
            None => Line::from("No note selected"),
        };
        let detail = Paragraph::new(detail_line)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title("Selected"),
            );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let mut spans = vec![
            Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
            Span::raw(" move  "),
            Span::styled("t", Style::default().fg(Color::LightCyan)),
            Span::raw(" notes/trash  "),
        ];
        match self.view {
            ViewMode::Notes => spans.extend([
                Span::styled("n", Style::default().fg(Color::LightMagenta)),
                Span::raw(" new  "),
                Span::styled("e", Style::default().fg(Color::LightYellow)),
                Span::raw(" edit  "),
                Span::styled("p", Style::default().fg(Color::LightGreen)),
                Span::raw(" pin  "),
                Span::styled("c", Style::default().fg(Color::LightGreen)),
                Span::raw(" color  "),
                Span::styled("l", Style::default().fg(Color::LightYellow)),
                Span::raw(" lock  "),
                Span::styled("s/w", Style::default().fg(Color::LightCyan)),
                Span::raw(" share/save  "),
                Span::styled("/", Style::default().fg(Color::LightCyan)),
                Span::raw(" search  "),
                Span::styled("d", Style::default().fg(Color::LightRed)),
                Span::raw(" delete  "),
            ]),
            ViewMode::Trash => spans.extend([
                Span::styled("r", Style::default().fg(Color::LightGreen)),
                Span::raw(" restore  "),
                Span::styled("x", Style::default().fg(Color::LightRed)),
                Span::raw(" delete permanently  "),
            ]),
        }
        spans.extend([
            Span::styled("q", Style::default().fg(Color::LightRed)),
            Span::raw(" quit"),
        ]);
        Line::from(spans)
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, form: &NoteForm) {
        let area = centered_rect(70, 60, f.size());
        let mut fields = Vec::new();
        fields.extend(field_lines(
            "Title",
            &form.title,
            form.field == Field::Title,
        ));
        if form.body_locked {
            fields.push(Line::from(Span::styled(
                "Body: [locked]",
                Style::default().fg(Color::DarkGray),
            )));
        } else {
            fields.extend(field_lines("Body", &form.body, form.field == Field::Body));
        }
        fields.push(Line::from(""));
        fields.push(Line::from(Span::styled(
            "Changes save as you type • Tab switches field • Enter adds newline in Body • Esc when done",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(fields)
            .block(
                Block::default()
                    .title(Span::styled(
                        "Edit Note",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_color_picker(&self, f: &mut ratatui::Frame<'_>, idx: usize) {
        let area = centered_rect(30, 50, f.size());
        let items = PALETTE
            .iter()
            .map(|(name, hex)| {
                let swatch = hex
                    .and_then(|h| h.parse::<NoteColor>().ok())
                    .map(card_background)
                    .unwrap_or(Color::Rgb(22, 24, 30));
                ListItem::new(Line::from(vec![
                    Span::styled("    ", Style::default().bg(swatch)),
                    Span::raw(format!(" {}", name)),
                ]))
            })
            .collect::<Vec<_>>();
        let mut state = ListState::default();
        state.select(Some(idx));
        let list = List::new(items)
            .block(
                Block::default()
                    .title(Span::styled(
                        "Color",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
        f.render_widget(Clear, area);
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_password(&self, f: &mut ratatui::Frame<'_>, purpose: PasswordPurpose, input: &FieldValue) {
        let area = centered_rect(50, 25, f.size());
        let (title, prompt) = match purpose {
            PasswordPurpose::Lock => ("Lock Note", "Set a password for this note:"),
            PasswordPurpose::Unlock => ("Unlock Note", "Enter password to unlock:"),
        };
        let body = vec![
            Line::from(prompt),
            Line::from(Span::styled(
                format!("{}▌", input.masked()),
                Style::default().fg(Color::Cyan),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to confirm • Esc to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    title,
                    Style::default()
                        .fg(Color::LightYellow)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightYellow)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, note_id: &str) {
        let area = centered_rect(50, 30, f.size());
        let title = self
            .state
            .get(note_id)
            .map(|n| n.title.clone())
            .unwrap_or_else(|| note_id.to_string());
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\" permanently?", title),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("This cannot be undone. Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(Span::styled(
                        "Confirm Delete",
                        Style::default()
                            .fg(Color::LightRed)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightRed)),
            );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

const CARD_HEIGHT: u16 = 5;

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn has_command_modifier(key: KeyEvent) -> bool {
    key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn prev_char_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&"..."[..max.min(3)]);
    out
}

fn card_background(color: NoteColor) -> Color {
    let (r, g, b) = color.rgb();
    Color::Rgb(r, g, b)
}

fn note_item(note: &Note, width: u16, selected: bool) -> ListItem<'static> {
    let inner_width = width.saturating_sub(4).max(10) as usize;
    let border_char = if selected { "=" } else { "-" };
    let top = format!("+{}+", border_char.repeat(inner_width + 2));

    let mut heading = String::new();
    if note.is_pinned() {
        heading.push_str("[pin] ");
    }
    if note.is_locked() {
        heading.push_str("[lock] ");
    }
    heading.push_str(&note.title);
    let heading = truncate_text(&heading, inner_width);
    let body = match LockGuard::visible_body(note) {
        Some(body) => body.lines().next().unwrap_or_default().to_string(),
        None => "[locked]".to_string(),
    };
    let body = truncate_text(&body, inner_width);
    let edited = truncate_text(&note.last_edited_label(), inner_width);

    let lines = vec![
        Line::raw(top.clone()),
        Line::raw(format!("| {:width$} |", heading, width = inner_width)),
        Line::raw(format!("| {:width$} |", body, width = inner_width)),
        Line::raw(format!("| {:width$} |", edited, width = inner_width)),
        Line::raw(top),
    ];
    let mut style = match note.color {
        Some(color) => Style::default().bg(card_background(color)).fg(Color::Black),
        None => Style::default().bg(Color::Rgb(22, 24, 30)).fg(Color::Gray),
    };
    if selected {
        style = style.add_modifier(Modifier::BOLD);
        if note.color.is_none() {
            style = style.fg(Color::White);
        }
    }
    ListItem::new(lines).style(style)
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        prefix.clone()
                    } else {
                        spacer.clone()
                    },
                    label_style,
                ),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn selected_note_detail(note: &Note) -> Line<'static> {
    let mut spans = vec![Span::styled(
        note.title.clone(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        note.state.label(),
        Style::default().fg(Color::LightCyan),
    ));
    if let Some(color) = note.color {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            color.to_string(),
            Style::default().fg(card_background(color)),
        ));
    }
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        LockGuard::visible_body(note).unwrap_or("[locked]").to_string(),
        Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
    ));
    Line::from(spans)
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_handles_multibyte_text() {
        let mut field = FieldValue::new("héllo");
        field.move_left();
        field.move_left();
        field.move_left();
        field.move_left();
        assert_eq!(field.cursor, 1);
        assert!(field.backspace());
        assert_eq!(field.value, "éllo");
        field.move_right();
        field.insert_char('x');
        assert_eq!(field.value, "éxllo");
    }

    #[test]
    fn field_value_moves_between_lines() {
        let mut field = FieldValue::new("abc\nde");
        field.move_up();
        assert_eq!(field.cursor, 2);
        field.move_down();
        assert_eq!(field.cursor, 6);
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a long title here", 8), "a lon...");
        assert_eq!(truncate_text("abcdef", 2), "..");
    }

    #[test]
    fn adjust_offset_keeps_selection_visible() {
        assert_eq!(adjust_offset(0, 0, 3, 0, 10), 0);
        assert_eq!(adjust_offset(5, 0, 3, 0, 10), 3);
        assert_eq!(adjust_offset(1, 3, 3, 0, 10), 1);
    }

    #[test]
    fn palette_entries_parse() {
        for (_, hex) in PALETTE {
            if let Some(hex) = hex {
                assert!(hex.parse::<NoteColor>().is_ok());
            }
        }
    }

    #[test]
    fn locked_form_keeps_focus_on_title() {
        let mut note = Note::new("n1".into(), 0);
        note.lock = crate::lock::LockState::Locked {
            password: "pw".into(),
        };
        let mut form = NoteForm::from_note(&note);
        assert!(form.body.value.is_empty());
        form.toggle_field();
        assert!(form.field == Field::Title);
    }
}
