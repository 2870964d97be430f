use crate::controller::{preview, Command, Controller, InputKey, Prompt, TextInput, ToastKind};
use crate::entry_store::{EntryStore, Storage};
use crate::mood::Mood;
use crate::mood_entry::MoodEntry;
use chrono::Local;
use color_eyre::Result;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEventKind,
    },
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{stdout, Stdout};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Screen regions of the overlays drawn in the last frame, used to tell
/// background clicks apart from clicks inside.
#[derive(Debug, Default, Clone)]
pub struct Areas {
    pub panel: Option<Rect>,
    pub modal: Option<Rect>,
    /// History cards visible in the panel, top to bottom.
    pub cards: Vec<CardArea>,
}

/// Rows one history card occupies, excluding its blank separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardArea {
    pub index: usize,
    pub top: u16,
    pub height: u16,
    /// Row of the "Read more" / "Show less" line.
    pub toggle_row: Option<u16>,
}

impl Areas {
    fn card_at(&self, row: u16) -> Option<&CardArea> {
        self.cards
            .iter()
            .find(|card| row >= card.top && row < card.top + card.height)
    }
}

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    areas: Areas,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        stdout().execute(EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI {
            terminal,
            areas: Areas::default(),
        })
    }

    pub fn display<S: Storage>(
        &mut self,
        store: &EntryStore<S>,
        controller: &Controller,
    ) -> Result<()> {
        let mut areas = Areas::default();
        self.terminal.draw(|f| areas = draw(f, store, controller))?;
        self.areas = areas;
        Ok(())
    }

    pub fn command_for(&self, event: &Event, controller: &Controller) -> Option<Command> {
        command_for(event, controller, &self.areas)
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(DisableMouseCapture);
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

pub fn draw<S: Storage>(f: &mut Frame, store: &EntryStore<S>, controller: &Controller) -> Areas {
    let mut areas = Areas::default();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            "Mood Diary",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Local::now().format("%A, %B %-d, %Y").to_string()),
    ])
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    f.render_widget(mood_picker(controller.pending_mood), chunks[1]);

    let focused =
        !controller.history_open && controller.modal.is_none() && controller.prompt.is_none();
    draw_input(f, chunks[2], "How are you feeling?", &controller.draft, focused);

    let controls = Line::from(vec![
        key_hint("F1-F4"),
        Span::raw(" mood, "),
        key_hint("Ctrl+S"),
        Span::raw(" save, "),
        key_hint("Ctrl+O"),
        Span::raw(" history, "),
        key_hint("Ctrl+Q"),
        Span::raw(" quit"),
    ]);
    let controls_paragraph = Paragraph::new(controls)
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);
    f.render_widget(controls_paragraph, chunks[3]);

    if let Some(toast) = controller.toast() {
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
        };
        let toast_line = Paragraph::new(toast.text.as_str())
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);
        f.render_widget(toast_line, chunks[4]);
    }

    if controller.history_open {
        let (panel, cards) = draw_history(f, store, controller);
        areas.panel = Some(panel);
        areas.cards = cards;
    }

    if let Some(entry) = controller.modal.and_then(|id| store.find(id)) {
        areas.modal = Some(draw_modal(f, entry));
    }

    if let Some(prompt) = &controller.prompt {
        draw_prompt(f, prompt);
    }

    areas
}

fn key_hint(key: &str) -> Span<'_> {
    Span::styled(key, Style::default().add_modifier(Modifier::BOLD))
}

fn mood_badge(mood: Mood) -> Span<'static> {
    Span::styled(
        format!(" {} {} ", mood.glyph(), mood.label()),
        Style::default()
            .fg(Color::Black)
            .bg(mood.color())
            .add_modifier(Modifier::BOLD),
    )
}

fn mood_picker(pending: Option<Mood>) -> Paragraph<'static> {
    let mut spans = Vec::new();
    for (i, mood) in Mood::ALL.into_iter().enumerate() {
        let label = format!(" F{} {} {} ", i + 1, mood.glyph(), mood.label());
        let style = if pending == Some(mood) {
            Style::default()
                .fg(Color::Black)
                .bg(mood.color())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(mood.color())
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw("  "));
    }
    Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Mood"))
        .alignment(Alignment::Center)
}

fn draw_input(f: &mut Frame, area: Rect, title: &str, input: &TextInput, focused: bool) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let inner = block.inner(area);

    let width = inner.width as usize;
    let (row, column) = cursor_offset(input.before_cursor(), width);
    let scroll = row.saturating_sub(inner.height.saturating_sub(1));

    let lines: Vec<Line> = wrap(input.text(), width).into_iter().map(Line::from).collect();
    let paragraph = Paragraph::new(lines).block(block).scroll((scroll, 0));
    f.render_widget(paragraph, area);

    if focused && inner.width > 0 && inner.height > 0 {
        f.set_cursor_position(Position::new(inner.x + column, inner.y + row - scroll));
    }
}

/// Row and column of the cursor once the text before it is wrapped to `width`.
/// A line filled to the edge puts the cursor at the start of the next row.
fn cursor_offset(before: &str, width: usize) -> (u16, u16) {
    let width = width.max(1);
    let lines = wrap(before, width);
    let row = lines.len().saturating_sub(1);
    let column = lines.last().map(|line| line.width()).unwrap_or(0);
    if column >= width {
        (row as u16 + 1, 0)
    } else {
        (row as u16, column as u16)
    }
}

fn draw_history<S: Storage>(
    f: &mut Frame,
    store: &EntryStore<S>,
    controller: &Controller,
) -> (Rect, Vec<CardArea>) {
    let area = f.area();
    let width = (area.width / 2).max(40).min(area.width);
    let panel = Rect {
        x: area.x + area.width - width,
        y: area.y,
        width,
        height: area.height,
    };
    f.render_widget(Clear, panel);

    let entries = store.list();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("History ({})", entries.len()))
        .title_bottom(
            Line::from("Enter open, Space expand, e edit, d delete, Esc close").centered(),
        );

    if entries.is_empty() {
        let empty = Paragraph::new("No entries yet. Write one!")
            .block(block)
            .alignment(Alignment::Center);
        f.render_widget(empty, panel);
        return (panel, Vec::new());
    }

    let inner = block.inner(panel);
    // Two columns go to the highlight symbol.
    let text_width = inner.width.saturating_sub(2) as usize;
    let mut items = Vec::with_capacity(entries.len());
    let mut layout = Vec::with_capacity(entries.len());
    for entry in entries {
        let (item, has_toggle) =
            entry_card(entry, controller.is_expanded(entry.id), text_width);
        layout.push((item.height() as u16, has_toggle));
        items.push(item);
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(controller.selected));
    f.render_stateful_widget(list, panel, &mut state);

    let bottom = inner.y + inner.height;
    let mut top = inner.y;
    let mut cards = Vec::new();
    for (index, &(height, has_toggle)) in layout.iter().enumerate().skip(state.offset()) {
        let rows = height.saturating_sub(1);
        // Only the first visible card is drawn when it overflows the panel.
        if top >= bottom || (!cards.is_empty() && top + rows > bottom) {
            break;
        }
        let toggle_row = has_toggle
            .then(|| top + height.saturating_sub(2))
            .filter(|row| *row < bottom);
        cards.push(CardArea {
            index,
            top,
            height: rows.min(bottom - top),
            toggle_row,
        });
        top = top.saturating_add(height);
    }
    (panel, cards)
}

/// Builds a history card and reports whether it carries an expand/collapse line.
fn entry_card(entry: &MoodEntry, expanded: bool, width: usize) -> (ListItem<'static>, bool) {
    let preview = preview(&entry.text, expanded);

    let mut lines = vec![Line::from(vec![
        mood_badge(entry.mood),
        Span::raw("  "),
        Span::styled(entry.local_date(), Style::default().fg(Color::DarkGray)),
    ])];
    lines.extend(wrap(&preview.text, width).into_iter().map(Line::from));
    if let Some(affordance) = preview.affordance {
        lines.push(Line::from(Span::styled(
            affordance,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        )));
    }
    lines.push(Line::from(""));

    (ListItem::new(lines), preview.affordance.is_some())
}

fn draw_modal(f: &mut Frame, entry: &MoodEntry) -> Rect {
    let area = centered_rect(f.area(), 70, 60);
    f.render_widget(Clear, area);

    let title = Line::from(vec![
        mood_badge(entry.mood),
        Span::raw(" "),
        Span::raw(entry.local_date()),
        Span::raw(" "),
    ]);
    let body = Paragraph::new(entry.text.clone())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_bottom(Line::from("e edit, d delete, Esc close").centered()),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(body, area);
    area
}

fn draw_prompt(f: &mut Frame, prompt: &Prompt) {
    match prompt {
        Prompt::Edit { input, .. } => {
            let area = centered_rect(f.area(), 60, 40);
            f.render_widget(Clear, area);
            draw_input(f, area, "Edit entry (Enter save, Esc cancel)", input, true);
        }
        Prompt::ConfirmDelete { .. } => {
            let area = centered_rect(f.area(), 40, 20);
            f.render_widget(Clear, area);
            let confirm = Paragraph::new("Are you sure you want to delete this entry? (y/n)")
                .style(Style::default().fg(Color::Red))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Delete"));
            f.render_widget(confirm, area);
        }
    }
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// Hard-wraps `text` to `width` display columns, keeping explicit newlines.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        let mut line = String::new();
        let mut used = 0;
        for c in raw.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                used = 0;
            }
            line.push(c);
            used += w;
        }
        lines.push(line);
    }
    lines
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x && column < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

/// Maps a terminal event to a command for whatever currently has focus:
/// prompt, then modal, then history panel, then the compose screen.
pub fn command_for(event: &Event, controller: &Controller, areas: &Areas) -> Option<Command> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => key_command(*key, controller),
        Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
            if controller.prompt.is_some() {
                return None;
            }
            match (controller.modal, areas.modal, controller.history_open, areas.panel) {
                (Some(_), Some(modal), _, _) if !contains(modal, mouse.column, mouse.row) => {
                    Some(Command::CloseDetail)
                }
                (None, _, true, Some(panel)) if !contains(panel, mouse.column, mouse.row) => {
                    Some(Command::CloseHistory)
                }
                (None, _, true, Some(_)) => areas.card_at(mouse.row).map(|card| {
                    if card.toggle_row == Some(mouse.row) {
                        Command::ToggleExpandAt(card.index)
                    } else {
                        Command::OpenDetailAt(card.index)
                    }
                }),
                _ => None,
            }
        }
        _ => None,
    }
}

fn key_command(key: KeyEvent, controller: &Controller) -> Option<Command> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        return Some(Command::Quit);
    }

    match &controller.prompt {
        Some(Prompt::Edit { .. }) => {
            return match key.code {
                KeyCode::Enter => Some(Command::Confirm),
                KeyCode::Esc => Some(Command::Cancel),
                _ => input_key(key).map(Command::Input),
            }
        }
        Some(Prompt::ConfirmDelete { .. }) => {
            return match key.code {
                KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => Some(Command::Confirm),
                KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => Some(Command::Cancel),
                _ => None,
            }
        }
        None => {}
    }

    if controller.modal.is_some() {
        return match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Some(Command::CloseDetail),
            KeyCode::Char('e') => Some(Command::RequestEdit),
            KeyCode::Char('d') => Some(Command::RequestDelete),
            _ => None,
        };
    }

    if controller.history_open {
        return match key.code {
            KeyCode::Esc => Some(Command::CloseHistory),
            KeyCode::Up | KeyCode::Char('k') => Some(Command::SelectPrevious),
            KeyCode::Down | KeyCode::Char('j') => Some(Command::SelectNext),
            KeyCode::Enter => Some(Command::OpenDetail),
            KeyCode::Char(' ') => Some(Command::ToggleExpand),
            KeyCode::Char('e') => Some(Command::RequestEdit),
            KeyCode::Char('d') => Some(Command::RequestDelete),
            _ => None,
        };
    }

    match key.code {
        KeyCode::F(n @ 1..=4) => Some(Command::SelectMood(Mood::ALL[n as usize - 1])),
        KeyCode::Tab => Some(Command::CycleMood),
        KeyCode::Char('s') if ctrl => Some(Command::Save),
        KeyCode::Char('o') if ctrl => Some(Command::OpenHistory),
        KeyCode::Enter => Some(Command::Input(InputKey::Newline)),
        _ => input_key(key).map(Command::Input),
    }
}

fn input_key(key: KeyEvent) -> Option<InputKey> {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(InputKey::Char(c))
        }
        KeyCode::Backspace => Some(InputKey::Backspace),
        KeyCode::Delete => Some(InputKey::Delete),
        KeyCode::Left => Some(InputKey::Left),
        KeyCode::Right => Some(InputKey::Right),
        KeyCode::Home => Some(InputKey::Home),
        KeyCode::End => Some(InputKey::End),
        _ => None,
    }
}
