use std::borrow::Cow;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::entry_store::{EntryStore, Storage};
use crate::error::{StoreError, ValidationError};
use crate::mood::Mood;
use crate::mood_entry::{EntryId, MoodEntry};
use crate::notifier::{Notice, NotificationOutcome};

/// Characters of entry text shown on a collapsed card.
pub const TRUNCATE_AT: usize = 150;

const TOAST_LIFETIME: Duration = Duration::from_secs(3);

pub struct Preview<'a> {
    pub text: Cow<'a, str>,
    /// "Read more" / "Show less", present only for long entries.
    pub affordance: Option<&'static str>,
}

pub fn preview(text: &str, expanded: bool) -> Preview<'_> {
    match text.char_indices().nth(TRUNCATE_AT) {
        None => Preview {
            text: Cow::Borrowed(text),
            affordance: None,
        },
        Some(_) if expanded => Preview {
            text: Cow::Borrowed(text),
            affordance: Some("Show less"),
        },
        Some((cut, _)) => Preview {
            text: Cow::Owned(format!("{}...", &text[..cut])),
            affordance: Some("Read more"),
        },
    }
}

/// A single-buffer text field with a cursor counted in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    text: String,
    cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Char(char),
    Newline,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

impl TextInput {
    pub fn with_text(text: &str) -> Self {
        TextInput {
            text: text.to_string(),
            cursor: text.chars().count(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text before the cursor, used to place the terminal cursor.
    pub fn before_cursor(&self) -> &str {
        &self.text[..self.byte_index(self.cursor)]
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn apply(&mut self, key: InputKey) {
        let len = self.text.chars().count();
        match key {
            InputKey::Char(c) => {
                self.text.insert(self.byte_index(self.cursor), c);
                self.cursor += 1;
            }
            InputKey::Newline => self.apply(InputKey::Char('\n')),
            InputKey::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.text.remove(self.byte_index(self.cursor));
                }
            }
            InputKey::Delete => {
                if self.cursor < len {
                    self.text.remove(self.byte_index(self.cursor));
                }
            }
            InputKey::Left => self.cursor = self.cursor.saturating_sub(1),
            InputKey::Right => self.cursor = (self.cursor + 1).min(len),
            InputKey::Home => self.cursor = 0,
            InputKey::End => self.cursor = len,
        }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    shown_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Edit { id: EntryId, input: TextInput },
    ConfirmDelete { id: EntryId },
}

/// A discrete user gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SelectMood(Mood),
    CycleMood,
    Input(InputKey),
    Save,
    OpenHistory,
    CloseHistory,
    SelectPrevious,
    SelectNext,
    ToggleExpand,
    OpenDetail,
    /// Clicked a card's expand affordance in the history panel.
    ToggleExpandAt(usize),
    /// Clicked a card in the history panel.
    OpenDetailAt(usize),
    CloseDetail,
    RequestEdit,
    RequestDelete,
    Confirm,
    Cancel,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Effect {
    None,
    Notify(Notice),
    Quit,
}

/// Transient UI state. Entries themselves live only in the store; the
/// controller refers to them by id.
pub struct Controller {
    pub pending_mood: Option<Mood>,
    pub draft: TextInput,
    pub history_open: bool,
    pub selected: usize,
    pub modal: Option<EntryId>,
    pub prompt: Option<Prompt>,
    expanded: HashSet<EntryId>,
    /// Created entries whose write to disk failed, awaiting their sync outcome.
    unsaved: HashSet<EntryId>,
    toast: Option<Toast>,
    sync_enabled: bool,
}

impl Controller {
    pub fn new(sync_enabled: bool) -> Self {
        Controller {
            pending_mood: None,
            draft: TextInput::default(),
            history_open: false,
            selected: 0,
            modal: None,
            prompt: None,
            expanded: HashSet::new(),
            unsaved: HashSet::new(),
            toast: None,
            sync_enabled,
        }
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn is_expanded(&self, id: EntryId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn dispatch<S: Storage>(&mut self, store: &mut EntryStore<S>, command: Command) -> Effect {
        tracing::trace!(?command, "dispatch");
        match command {
            Command::SelectMood(mood) => self.select_mood(mood),
            Command::CycleMood => {
                let mood = self.pending_mood.map(Mood::next).unwrap_or(Mood::Happy);
                self.select_mood(mood);
            }
            Command::Input(key) => match &mut self.prompt {
                Some(Prompt::Edit { input, .. }) => input.apply(key),
                Some(Prompt::ConfirmDelete { .. }) => {}
                None => self.draft.apply(key),
            },
            Command::Save => return self.save(store),
            Command::OpenHistory => {
                self.history_open = true;
                self.clamp_selection(store.list().len());
            }
            Command::CloseHistory => self.history_open = false,
            Command::SelectPrevious => self.selected = self.selected.saturating_sub(1),
            Command::SelectNext => {
                if self.selected + 1 < store.list().len() {
                    self.selected += 1;
                }
            }
            Command::ToggleExpand => {
                if let Some(entry) = store.list().get(self.selected) {
                    let long = preview(&entry.text, false).affordance.is_some();
                    if long && !self.expanded.remove(&entry.id) {
                        self.expanded.insert(entry.id);
                    }
                }
            }
            Command::OpenDetail => {
                self.modal = store.list().get(self.selected).map(|e| e.id);
            }
            Command::ToggleExpandAt(index) => {
                if index < store.list().len() {
                    self.selected = index;
                    return self.dispatch(store, Command::ToggleExpand);
                }
            }
            Command::OpenDetailAt(index) => {
                if index < store.list().len() {
                    self.selected = index;
                    return self.dispatch(store, Command::OpenDetail);
                }
            }
            Command::CloseDetail => self.modal = None,
            Command::RequestEdit => {
                if let Some(entry) = self.target(store) {
                    let input = TextInput::with_text(&entry.text);
                    self.prompt = Some(Prompt::Edit { id: entry.id, input });
                }
            }
            Command::RequestDelete => {
                if let Some(entry) = self.target(store) {
                    self.prompt = Some(Prompt::ConfirmDelete { id: entry.id });
                }
            }
            Command::Confirm => self.confirm(store),
            Command::Cancel => self.prompt = None,
            Command::Quit => return Effect::Quit,
        }
        Effect::None
    }

    pub fn on_notification(&mut self, outcome: NotificationOutcome) {
        tracing::debug!(
            entry_id = outcome.entry_id,
            ok = outcome.result.is_ok(),
            "notification finished"
        );
        let unsaved = self.unsaved.remove(&outcome.entry_id);
        match (outcome.result, unsaved) {
            (Ok(()), false) => self.show(ToastKind::Success, "Entry saved and synced!"),
            (Ok(()), true) => {
                self.show(ToastKind::Error, "Entry synced, but writing it to disk failed")
            }
            (Err(_), false) => self.show(ToastKind::Error, "Saved locally but failed to sync"),
            (Err(_), true) => {
                self.show(ToastKind::Error, "Entry failed to sync and to save to disk")
            }
        }
    }

    pub fn expire_toast(&mut self, now: Instant) {
        if let Some(toast) = &self.toast {
            if now.duration_since(toast.shown_at) >= TOAST_LIFETIME {
                self.toast = None;
            }
        }
    }

    fn select_mood(&mut self, mood: Mood) {
        self.pending_mood = Some(mood);
        self.show(ToastKind::Success, format!("Mood selected: {mood}"));
    }

    fn save<S: Storage>(&mut self, store: &mut EntryStore<S>) -> Effect {
        match store.create(self.draft.text(), self.pending_mood) {
            Ok(saved) => {
                self.draft.clear();
                self.pending_mood = None;
                match saved.warning {
                    Some(_) => {
                        self.show(ToastKind::Error, "Entry saved, but writing it to disk failed");
                        if self.sync_enabled {
                            self.unsaved.insert(saved.value.id);
                        }
                    }
                    None => self.show(ToastKind::Success, "Entry saved successfully!"),
                }
                if self.sync_enabled {
                    Effect::Notify(Notice::for_entry(&saved.value))
                } else {
                    Effect::None
                }
            }
            Err(StoreError::Validation(ValidationError::EmptyText)) => {
                self.show(ToastKind::Error, "Please write something first!");
                Effect::None
            }
            Err(StoreError::Validation(ValidationError::MissingMood)) => {
                self.show(ToastKind::Error, "Please select your mood first!");
                Effect::None
            }
            Err(e) => {
                tracing::debug!(error = %e, "save ignored");
                Effect::None
            }
        }
    }

    fn confirm<S: Storage>(&mut self, store: &mut EntryStore<S>) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        match prompt {
            Prompt::Edit { id, input } => match store.update(id, input.text()) {
                Ok(saved) => {
                    self.modal = None;
                    self.report_write(saved.warning.is_some(), "Entry updated successfully!");
                }
                Err(StoreError::Validation(_)) => {
                    self.show(ToastKind::Error, "Entry text cannot be empty");
                }
                Err(e) => tracing::debug!(error = %e, "edit ignored"),
            },
            Prompt::ConfirmDelete { id } => match store.remove(id) {
                Ok(saved) => {
                    self.expanded.remove(&id);
                    self.modal = None;
                    self.clamp_selection(store.list().len());
                    self.report_write(saved.warning.is_some(), "Entry deleted successfully!");
                }
                Err(e) => tracing::debug!(error = %e, "delete ignored"),
            },
        }
    }

    /// The entry an edit or delete applies to: the open modal, else the
    /// selected card while the history panel is open.
    fn target<'s, S: Storage>(&self, store: &'s EntryStore<S>) -> Option<&'s MoodEntry> {
        match self.modal {
            Some(id) => store.find(id),
            None if self.history_open => store.list().get(self.selected),
            None => None,
        }
    }

    fn clamp_selection(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn report_write(&mut self, failed: bool, success: &str) {
        if failed {
            self.show(ToastKind::Error, "Change kept, but writing it to disk failed");
        } else {
            self.show(ToastKind::Success, success);
        }
    }

    fn show(&mut self, kind: ToastKind, text: impl Into<String>) {
        self.toast = Some(Toast {
            text: text.into(),
            kind,
            shown_at: Instant::now(),
        });
    }
}
