use anyhow::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::journal;
use crate::models::{Mood, MoodEntry, NoteKind};
use crate::notes;
use crate::roster::Roster;
use crate::store::MemoryStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Reads the whole key-value table into an in-memory snapshot.
pub async fn load_store(pool: &PgPool) -> anyhow::Result<MemoryStore> {
    let rows = sqlx::query("SELECT key, value FROM wellbeing.kv_store")
        .fetch_all(pool)
        .await
        .context("failed to load the wellbeing store; run `init-db` first")?;

    let store: MemoryStore = rows
        .into_iter()
        .map(|row| (row.get::<String, _>("key"), row.get::<String, _>("value")))
        .collect();
    debug!(keys = store.len(), empty = store.is_empty(), "loaded store snapshot");
    Ok(store)
}

/// Writes the snapshot back, removing keys that no longer exist in it.
pub async fn save_store(pool: &PgPool, store: &MemoryStore) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    let mut keys = Vec::with_capacity(store.len());

    for (key, value) in store.iter() {
        sqlx::query(
            r#"
            INSERT INTO wellbeing.kv_store (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = now()
            WHERE wellbeing.kv_store.value <> EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
        keys.push(key.to_string());
    }

    let removed = sqlx::query("DELETE FROM wellbeing.kv_store WHERE NOT (key = ANY($1))")
        .bind(&keys)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    debug!(keys = keys.len(), removed, "saved store snapshot");
    Ok(())
}

const SEED_ID_BASE: u128 = 0x5eed_0000_0000_4000_8000_0000_0000_0000;

pub async fn seed<R: Roster + ?Sized>(pool: &PgPool, roster: &R) -> anyhow::Result<()> {
    let mut store = load_store(pool).await?;

    let history: [(&str, u8, Option<&str>); 12] = [
        ("1", 4, Some("Good week with friends")),
        ("2", 3, None),
        ("1", 4, None),
        ("2", 4, Some("Liked the science fair")),
        ("1", 5, Some("Won the volleyball match")),
        ("2", 4, None),
        ("1", 3, Some("A lot of homework")),
        ("2", 5, None),
        ("1", 2, Some("Tired, did not sleep well before the exam")),
        ("2", 4, None),
        ("1", 2, Some("Felt alone during break")),
        ("2", 5, Some("Great week")),
    ];

    let start = Utc
        .with_ymd_and_hms(2026, 1, 12, 9, 0, 0)
        .single()
        .context("invalid seed start date")?;

    let mut inserted = 0usize;
    for (index, (student_id, mood, note)) in history.into_iter().enumerate() {
        let at = start + Duration::weeks(index as i64 / 2);
        let entry = MoodEntry {
            id: Uuid::from_u128(SEED_ID_BASE + index as u128),
            ..journal::new_entry(student_id, Mood::new(mood)?, note, at)
        };
        if journal::insert(&mut store, entry)? {
            inserted += 1;
        }
    }

    if notes::support_notes(&store, "1")?.is_empty() {
        notes::add_support_note(
            &mut store,
            roster,
            "1",
            "4",
            "Mentioned pressure around exams; agreed to meet again next week",
            NoteKind::Observation,
            start + Duration::weeks(5),
        )?;
    }

    save_store(pool, &store).await?;
    info!(inserted, "seeded mood history");
    Ok(())
}

pub async fn import_csv<R: Roster + ?Sized>(
    pool: &PgPool,
    roster: &R,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        entry_id: Option<Uuid>,
        student_id: String,
        mood: u8,
        note: Option<String>,
        recorded_at: DateTime<Utc>,
    }

    let mut store = load_store(pool).await?;
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let mood = Mood::new(row.mood).with_context(|| format!("row {}", line + 1))?;
        if roster.find_student(&row.student_id).is_none() {
            warn!(student = %row.student_id, "importing entry for a student not on the roster");
        }

        let mut entry = journal::new_entry(&row.student_id, mood, row.note.as_deref(), row.recorded_at);
        entry.id = row
            .entry_id
            .unwrap_or_else(|| journal::derived_entry_id(&row.student_id, row.recorded_at, mood));
        if journal::insert(&mut store, entry)? {
            inserted += 1;
        }
    }

    save_store(pool, &store).await?;
    Ok(inserted)
}
