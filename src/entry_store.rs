use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::error::{PersistenceError, StoreError, ValidationError};
use crate::mood::Mood;
use crate::mood_entry::{EntryId, MoodEntry};

/// A single named slot holding the serialized entry collection.
pub trait Storage {
    /// Returns the raw slot bytes, or `None` when the slot has never been
    /// written.
    fn read(&self) -> io::Result<Option<Vec<u8>>>;

    fn write(&self, contents: &str) -> io::Result<()>;

    /// Keeps contents that could not be parsed somewhere the next `write`
    /// will not overwrite.
    fn preserve_unreadable(&self, _contents: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }
}

impl Storage for FileStorage {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        fs::write(&self.path, contents)
    }

    fn preserve_unreadable(&self, contents: &[u8]) -> io::Result<()> {
        fs::write(self.corrupt_path(), contents)
    }
}

/// Result of a mutation that has already been applied in memory.
///
/// `warning` is set when writing the slot failed afterwards.
#[derive(Debug)]
pub struct Persisted<T> {
    pub value: T,
    pub warning: Option<PersistenceError>,
}

/// Owns the entry collection, newest first, and mirrors it to storage after
/// every mutation.
pub struct EntryStore<S: Storage> {
    storage: S,
    entries: Vec<MoodEntry>,
}

impl<S: Storage> EntryStore<S> {
    /// Loads the collection. Missing or unparseable data yields an empty store.
    ///
    /// Records with blank text are dropped and duplicate ids are reassigned;
    /// in either case the original slot is preserved first.
    pub fn load(storage: S) -> Self {
        let entries = match storage.read() {
            // Invalid UTF-8 surfaces here as a parse error, so it is preserved too.
            Ok(Some(contents)) => match serde_json::from_slice::<Vec<MoodEntry>>(&contents) {
                Ok(entries) => {
                    let (entries, repaired) = repair(entries);
                    if repaired {
                        preserve(&storage, &contents);
                    }
                    entries
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stored entries are unreadable, starting empty");
                    preserve(&storage, &contents);
                    Vec::new()
                }
            },
            Ok(None) => {
                tracing::info!("no stored entries found, starting a new diary");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored entries, starting empty");
                Vec::new()
            }
        };
        tracing::debug!(count = entries.len(), "entries loaded");

        EntryStore { storage, entries }
    }

    pub fn create(
        &mut self,
        text: &str,
        mood: Option<Mood>,
    ) -> Result<Persisted<MoodEntry>, StoreError> {
        self.create_at(text, mood, Utc::now())
    }

    fn create_at(
        &mut self,
        text: &str,
        mood: Option<Mood>,
        now: DateTime<Utc>,
    ) -> Result<Persisted<MoodEntry>, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        let mood = mood.ok_or(ValidationError::MissingMood)?;

        let id = self.next_id(now.timestamp_millis());
        let entry = MoodEntry::new(id, text.to_string(), mood, now);
        self.entries.insert(0, entry.clone());
        tracing::info!(id, %mood, "entry created");

        Ok(self.persist(entry))
    }

    pub fn update(
        &mut self,
        id: EntryId,
        new_text: &str,
    ) -> Result<Persisted<MoodEntry>, StoreError> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        entry.text = new_text.to_string();
        let updated = entry.clone();
        tracing::info!(id, "entry updated");

        Ok(self.persist(updated))
    }

    pub fn remove(&mut self, id: EntryId) -> Result<Persisted<()>, StoreError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        self.entries.remove(index);
        tracing::info!(id, "entry removed");

        Ok(self.persist(()))
    }

    pub fn list(&self) -> &[MoodEntry] {
        &self.entries
    }

    pub fn find(&self, id: EntryId) -> Option<&MoodEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn next_id(&self, candidate: EntryId) -> EntryId {
        match self.entries.iter().map(|e| e.id).max() {
            Some(max) if candidate <= max => max + 1,
            _ => candidate,
        }
    }

    fn persist<T>(&self, value: T) -> Persisted<T> {
        let warning = self.save().err();
        if let Some(e) = &warning {
            tracing::error!(error = %e, "failed to persist entries");
        }
        Persisted { value, warning }
    }

    fn save(&self) -> Result<(), PersistenceError> {
        let serialized = serde_json::to_string(&self.entries)?;
        self.storage.write(&serialized)?;
        Ok(())
    }
}

fn preserve<S: Storage>(storage: &S, contents: &[u8]) {
    if let Err(e) = storage.preserve_unreadable(contents) {
        tracing::error!(error = %e, "failed to preserve unreadable entries");
    }
}

/// Restores the collection invariants on loaded data: non-blank text and
/// unique ids. Returns whether anything had to change.
fn repair(entries: Vec<MoodEntry>) -> (Vec<MoodEntry>, bool) {
    let mut repaired = false;
    let mut next_id = entries.iter().map(|e| e.id).max().unwrap_or(0);
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(entries.len());

    for mut entry in entries {
        if entry.text.trim().is_empty() {
            tracing::warn!(id = entry.id, "dropping stored entry with empty text");
            repaired = true;
            continue;
        }
        if !seen.insert(entry.id) {
            next_id += 1;
            tracing::warn!(id = entry.id, new_id = next_id, "reassigning duplicate entry id");
            entry.id = next_id;
            seen.insert(next_id);
            repaired = true;
        }
        kept.push(entry);
    }

    (kept, repaired)
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryStorage;
    use super::*;
    use chrono::TimeZone;

    fn empty_store() -> (EntryStore<MemoryStorage>, MemoryStorage) {
        let storage = MemoryStorage::default();
        (EntryStore::load(storage.clone()), storage)
    }

    #[test]
    fn create_trims_and_prepends() {
        let (mut store, _) = empty_store();
        store.create("first", Some(Mood::Sad)).unwrap();
        let created = store.create("  Had a great walk today \n", Some(Mood::Happy)).unwrap().value;

        assert_eq!(created.text, "Had a great walk today");
        assert_eq!(created.mood, Mood::Happy);
        assert_eq!(store.list()[0], created);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn create_rejects_empty_text_or_missing_mood() {
        let (mut store, storage) = empty_store();

        assert_eq!(
            store.create("   ", Some(Mood::Happy)).unwrap_err(),
            StoreError::Validation(ValidationError::EmptyText)
        );
        assert_eq!(
            store.create("hello", None).unwrap_err(),
            StoreError::Validation(ValidationError::MissingMood)
        );
        assert!(store.list().is_empty());
        assert_eq!(storage.contents(), None);
    }

    #[test]
    fn ids_stay_unique_when_the_clock_repeats() {
        let (mut store, _) = empty_store();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();

        let a = store.create_at("a", Some(Mood::Happy), now).unwrap().value;
        let b = store.create_at("b", Some(Mood::Happy), now).unwrap().value;
        let earlier = now - chrono::Duration::seconds(5);
        let c = store.create_at("c", Some(Mood::Happy), earlier).unwrap().value;

        assert_eq!(a.id, now.timestamp_millis());
        assert_eq!(b.id, a.id + 1);
        assert_eq!(c.id, b.id + 1);
    }

    #[test]
    fn update_changes_only_text() {
        let (mut store, _) = empty_store();
        let original = store.create("draft", Some(Mood::Neutral)).unwrap().value;

        let updated = store.update(original.id, " new text ").unwrap().value;

        assert_eq!(updated.text, "new text");
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.mood, original.mood);
        assert_eq!(updated.date, original.date);
        assert_eq!(store.find(original.id), Some(&updated));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let (mut store, storage) = empty_store();
        store.create("keep", Some(Mood::Sad)).unwrap();
        let before = storage.contents();

        assert_eq!(store.update(42, "x").unwrap_err(), StoreError::NotFound(42));
        assert_eq!(store.list()[0].text, "keep");
        assert_eq!(storage.contents(), before);
    }

    #[test]
    fn update_rejects_empty_text() {
        let (mut store, _) = empty_store();
        let entry = store.create("keep", Some(Mood::Sad)).unwrap().value;

        assert_eq!(
            store.update(entry.id, "  ").unwrap_err(),
            StoreError::Validation(ValidationError::EmptyText)
        );
        assert_eq!(store.list()[0].text, "keep");
    }

    #[test]
    fn remove_drops_exactly_one() {
        let (mut store, _) = empty_store();
        let a = store.create("a", Some(Mood::Happy)).unwrap().value;
        let b = store.create("b", Some(Mood::Sad)).unwrap().value;

        store.remove(a.id).unwrap();

        assert_eq!(store.list().len(), 1);
        assert!(store.find(a.id).is_none());
        assert_eq!(store.list()[0].id, b.id);
        assert_eq!(store.remove(a.id).unwrap_err(), StoreError::NotFound(a.id));
    }

    #[test]
    fn reload_yields_identical_sequence() {
        let (mut store, storage) = empty_store();
        store.create("one", Some(Mood::Happy)).unwrap();
        store.create("two", Some(Mood::Excited)).unwrap();
        let third = store.create("three", Some(Mood::Sad)).unwrap().value;
        store.update(third.id, "three, edited").unwrap();

        let reloaded = EntryStore::load(storage.clone());
        assert_eq!(reloaded.list(), store.list());
    }

    #[test]
    fn unreadable_slot_loads_empty_and_is_preserved() {
        let storage = MemoryStorage::with_contents("[{not json");
        let store = EntryStore::load(storage.clone());

        assert!(store.list().is_empty());
        assert_eq!(storage.preserved().as_deref(), Some(b"[{not json".as_slice()));
    }

    #[test]
    fn non_utf8_slot_is_preserved_before_the_next_write() {
        let storage = MemoryStorage::with_contents(b"caf\xe9");
        let mut store = EntryStore::load(storage.clone());
        assert!(store.list().is_empty());

        store.create("new", Some(Mood::Happy)).unwrap();

        assert_eq!(storage.preserved().as_deref(), Some(b"caf\xe9".as_slice()));
    }

    #[test]
    fn blank_records_are_dropped_on_load() {
        let storage = MemoryStorage::with_contents(
            r#"[{"id":2,"text":"  ","mood":"sad","date":"2024-01-02T00:00:00.000Z"},
                {"id":1,"text":"kept","mood":"happy","date":"2024-01-01T00:00:00.000Z"}]"#,
        );
        let store = EntryStore::load(storage.clone());

        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].text, "kept");
        assert!(storage.preserved().is_some());
    }

    #[test]
    fn duplicate_ids_are_reassigned_on_load() {
        let storage = MemoryStorage::with_contents(
            r#"[{"id":5,"text":"newer","mood":"sad","date":"2024-01-02T00:00:00.000Z"},
                {"id":5,"text":"older","mood":"happy","date":"2024-01-01T00:00:00.000Z"}]"#,
        );
        let mut store = EntryStore::load(storage.clone());

        let ids: Vec<EntryId> = store.list().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![5, 6]);
        assert_eq!(store.find(6).unwrap().text, "older");
        assert!(storage.preserved().is_some());

        store.remove(6).unwrap();
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].text, "newer");
    }

    #[test]
    fn valid_slot_is_not_preserved() {
        let (mut store, storage) = empty_store();
        store.create("fine", Some(Mood::Neutral)).unwrap();

        EntryStore::load(storage.clone());
        assert!(storage.preserved().is_none());
    }

    #[test]
    fn unknown_mood_in_slot_fails_soft() {
        let storage = MemoryStorage::with_contents(
            r#"[{"id":1,"text":"x","mood":"angry","date":"2024-01-01T00:00:00.000Z"}]"#,
        );
        assert!(EntryStore::load(storage).list().is_empty());
    }

    #[test]
    fn failed_write_keeps_in_memory_mutation() {
        let (mut store, storage) = empty_store();
        *storage.fail_writes.borrow_mut() = true;

        let saved = store.create("still here", Some(Mood::Happy)).unwrap();

        assert!(matches!(saved.warning, Some(PersistenceError::Io(_))));
        assert_eq!(store.list()[0].text, "still here");
        assert_eq!(storage.contents(), None);
    }

    #[test]
    fn file_storage_round_trips_and_preserves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mood_entries.json");

        let mut store = EntryStore::load(FileStorage::new(&path));
        assert!(store.list().is_empty());
        store.create("on disk", Some(Mood::Excited)).unwrap();

        let reloaded = EntryStore::load(FileStorage::new(&path));
        assert_eq!(reloaded.list(), store.list());

        fs::write(&path, "garbage").unwrap();
        let recovered = EntryStore::load(FileStorage::new(&path));
        assert!(recovered.list().is_empty());
        let corrupt = fs::read_to_string(dir.path().join("mood_entries.json.corrupt")).unwrap();
        assert_eq!(corrupt, "garbage");
    }

    #[test]
    fn file_storage_preserves_non_utf8_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mood_entries.json");
        fs::write(&path, b"caf\xe9").unwrap();

        let mut store = EntryStore::load(FileStorage::new(&path));
        assert!(store.list().is_empty());
        store.create("new", Some(Mood::Happy)).unwrap();

        let corrupt = fs::read(dir.path().join("mood_entries.json.corrupt")).unwrap();
        assert_eq!(corrupt, b"caf\xe9");
    }
}
