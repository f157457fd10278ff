use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Mood, MoodEntry};
use crate::store::{self, KeyValueStore};

const EMOTIONS_KEY: &str = "emotions";

/// Source of mood entries, always in ascending `recorded_at` order.
pub trait EntryStore {
    fn list_all_entries(&self) -> Result<Vec<MoodEntry>>;

    fn list_entries_for(&self, student_id: &str) -> Result<Vec<MoodEntry>> {
        Ok(self
            .list_all_entries()?
            .into_iter()
            .filter(|entry| entry.student_id == student_id)
            .collect())
    }
}

/// Read-only view of the mood journal kept in a key-value store.
pub struct MoodJournal<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> MoodJournal<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore + ?Sized> EntryStore for MoodJournal<'_, S> {
    fn list_all_entries(&self) -> Result<Vec<MoodEntry>> {
        let mut entries = load(self.store)?;
        // Stable sort keeps insertion order for identical timestamps.
        entries.sort_by_key(|entry| entry.recorded_at);
        Ok(entries)
    }
}

impl EntryStore for [MoodEntry] {
    fn list_all_entries(&self) -> Result<Vec<MoodEntry>> {
        let mut entries = self.to_vec();
        entries.sort_by_key(|entry| entry.recorded_at);
        Ok(entries)
    }
}

fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<MoodEntry>> {
    store::read_list(store, &store::namespaced(EMOTIONS_KEY))
}

fn save<S: KeyValueStore + ?Sized>(store: &mut S, entries: &[MoodEntry]) -> Result<()> {
    store::write_json(store, &store::namespaced(EMOTIONS_KEY), entries)
}

/// Builds an entry with a fresh id, deriving week and year from `at`. Blank notes are dropped.
pub fn new_entry(student_id: &str, mood: Mood, note: Option<&str>, at: DateTime<Utc>) -> MoodEntry {
    MoodEntry {
        id: Uuid::new_v4(),
        student_id: student_id.to_string(),
        recorded_at: at,
        mood,
        note: note
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        week: week_number(at),
        year: at.year(),
    }
}

const IMPORT_NAMESPACE: Uuid = Uuid::from_u128(0x9a4c_51e2_7d3b_4f0e_8c61_2b5d_03f7_e8a1);

/// Stable id for an entry that arrives without one, so re-importing the same row is a no-op.
pub fn derived_entry_id(student_id: &str, recorded_at: DateTime<Utc>, mood: Mood) -> Uuid {
    let name = format!("{student_id}|{}|{}", recorded_at.to_rfc3339(), mood.value());
    Uuid::new_v5(&IMPORT_NAMESPACE, name.as_bytes())
}

pub fn record<S: KeyValueStore + ?Sized>(
    store: &mut S,
    student_id: &str,
    mood: Mood,
    note: Option<&str>,
    at: DateTime<Utc>,
) -> Result<MoodEntry> {
    let entry = new_entry(student_id, mood, note, at);

    let mut entries = load(store)?;
    entries.push(entry.clone());
    save(store, &entries)?;

    info!(
        student = %student_id,
        mood = mood.value(),
        week = entry.week,
        "recorded mood entry"
    );
    Ok(entry)
}

/// Appends an entry built elsewhere. Returns `false` when the id is already present.
pub fn insert<S: KeyValueStore + ?Sized>(store: &mut S, entry: MoodEntry) -> Result<bool> {
    let mut entries = load(store)?;
    if entries.iter().any(|existing| existing.id == entry.id) {
        debug!(id = %entry.id, "skipping duplicate mood entry");
        return Ok(false);
    }
    entries.push(entry);
    save(store, &entries)?;
    Ok(true)
}

/// Sunday-based week of the year, counted from the fractional day offset since January 1.
pub fn week_number(at: DateTime<Utc>) -> u32 {
    let Some(start) = NaiveDate::from_ymd_opt(at.year(), 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return 1;
    };
    let start = start.and_utc();
    let past_days = (at - start).num_milliseconds() as f64 / 86_400_000.0;
    let offset = start.weekday().num_days_from_sunday() as f64;
    ((past_days + offset + 1.0) / 7.0).ceil() as u32
}

pub fn mood_average(entries: &[MoodEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let sum: u32 = entries.iter().map(|entry| u32::from(entry.mood.value())).sum();
    sum as f64 / entries.len() as f64
}

pub fn has_entry_this_week<E: EntryStore + ?Sized>(
    entries: &E,
    student_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let week = week_number(now);
    let year = now.year();
    Ok(entries
        .list_entries_for(student_id)?
        .iter()
        .any(|entry| entry.week == week && entry.year == year))
}
