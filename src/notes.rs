//! Staff notes kept per student: psychologist support notes and shared staff comments.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, WellbeingError};
use crate::models::{Category, NoteKind, Priority, Role, RosterMember, SupportNote, TeacherComment};
use crate::roster::Roster;
use crate::store::{self, KeyValueStore};

const SUPPORT_NOTES: &str = "support_notes:";
const TEACHER_COMMENTS: &str = "teacher_comments:";

fn collection_key(collection: &str, student_id: &str) -> String {
    store::namespaced(&format!("{collection}{student_id}"))
}

fn append<T, S>(store: &mut S, collection: &str, student_id: &str, item: T) -> Result<()>
where
    T: Serialize + DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let key = collection_key(collection, student_id);
    let mut items: Vec<T> = store::read_list(store, &key)?;
    items.push(item);
    store::write_json(store, &key, &items)
}

fn collect_all<T, S>(store: &S, collection: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let mut all = Vec::new();
    for key in store.keys_with_prefix(&store::namespaced(collection)) {
        all.extend(store::read_list::<T, S>(store, &key)?);
    }
    Ok(all)
}

fn require_student<R: Roster + ?Sized>(roster: &R, student_id: &str) -> Result<RosterMember> {
    roster
        .find_student(student_id)
        .ok_or_else(|| WellbeingError::UnknownMember(student_id.to_string()))
}

fn require_author<R: Roster + ?Sized>(
    roster: &R,
    author_id: &str,
    allowed: &[Role],
    action: &'static str,
) -> Result<RosterMember> {
    let author = roster
        .find(author_id)
        .ok_or_else(|| WellbeingError::UnknownMember(author_id.to_string()))?;
    if !allowed.contains(&author.role) {
        return Err(WellbeingError::RoleNotAllowed {
            id: author.id,
            role: author.role,
            action,
        });
    }
    Ok(author)
}

pub fn add_support_note<S, R>(
    store: &mut S,
    roster: &R,
    student_id: &str,
    psychologist_id: &str,
    text: &str,
    kind: NoteKind,
    at: DateTime<Utc>,
) -> Result<SupportNote>
where
    S: KeyValueStore + ?Sized,
    R: Roster + ?Sized,
{
    require_student(roster, student_id)?;
    let author = require_author(
        roster,
        psychologist_id,
        &[Role::Psychologist],
        "write support notes",
    )?;

    let note = SupportNote {
        id: Uuid::new_v4(),
        student_id: student_id.to_string(),
        psychologist_id: author.id,
        psychologist_name: author.name,
        note: text.to_string(),
        recorded_at: at,
        kind,
    };
    append(store, SUPPORT_NOTES, student_id, note.clone())?;
    info!(student = %student_id, kind = %kind, "added support note");
    Ok(note)
}

pub fn support_notes<S: KeyValueStore + ?Sized>(store: &S, student_id: &str) -> Result<Vec<SupportNote>> {
    store::read_list(store, &collection_key(SUPPORT_NOTES, student_id))
}

/// Every support note across students, newest first.
pub fn all_support_notes<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<SupportNote>> {
    let mut notes: Vec<SupportNote> = collect_all(store, SUPPORT_NOTES)?;
    notes.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    Ok(notes)
}

pub struct NewComment<'a> {
    pub student_id: &'a str,
    pub author_id: &'a str,
    pub comment: &'a str,
    pub priority: Priority,
    pub category: Category,
    pub shared_with: Vec<String>,
}

pub fn add_teacher_comment<S, R>(
    store: &mut S,
    roster: &R,
    new: NewComment<'_>,
    at: DateTime<Utc>,
) -> Result<TeacherComment>
where
    S: KeyValueStore + ?Sized,
    R: Roster + ?Sized,
{
    require_student(roster, new.student_id)?;
    let author = require_author(
        roster,
        new.author_id,
        &[Role::Teacher, Role::Psychologist],
        "comment on students",
    )?;

    let comment = TeacherComment {
        id: Uuid::new_v4(),
        student_id: new.student_id.to_string(),
        author_id: author.id,
        author_name: author.name,
        author_role: author.role,
        comment: new.comment.to_string(),
        recorded_at: at,
        shared_with: new.shared_with,
        priority: new.priority,
        category: new.category,
    };
    append(store, TEACHER_COMMENTS, new.student_id, comment.clone())?;
    info!(student = %comment.student_id, author = %comment.author_id, "added staff comment");
    Ok(comment)
}

pub fn teacher_comments<S: KeyValueStore + ?Sized>(
    store: &S,
    student_id: &str,
) -> Result<Vec<TeacherComment>> {
    store::read_list(store, &collection_key(TEACHER_COMMENTS, student_id))
}

pub fn all_teacher_comments<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<TeacherComment>> {
    let mut comments: Vec<TeacherComment> = collect_all(store, TEACHER_COMMENTS)?;
    comments.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    Ok(comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::StaticRoster;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, d, 14, 0, 0).unwrap()
    }

    #[test]
    fn support_notes_are_scoped_per_student() {
        let mut store = MemoryStore::new();
        let roster = StaticRoster::default();

        add_support_note(&mut store, &roster, "1", "4", "first talk", NoteKind::Observation, day(1))
            .unwrap();
        add_support_note(&mut store, &roster, "2", "4", "check-in", NoteKind::FollowUp, day(3))
            .unwrap();
        add_support_note(&mut store, &roster, "1", "4", "plan", NoteKind::Intervention, day(5))
            .unwrap();

        let ana = support_notes(&store, "1").unwrap();
        assert_eq!(ana.len(), 2);
        assert_eq!(ana[0].note, "first talk");
        assert_eq!(ana[0].psychologist_name, "João Costa");
        assert!(store.get("wellbeing:support_notes:2").is_some());

        let all: Vec<String> = all_support_notes(&store)
            .unwrap()
            .into_iter()
            .map(|n| n.note)
            .collect();
        assert_eq!(all, vec!["plan", "check-in", "first talk"]);
    }

    #[test]
    fn only_psychologists_write_support_notes() {
        let mut store = MemoryStore::new();
        let roster = StaticRoster::default();

        let err = add_support_note(&mut store, &roster, "1", "3", "x", NoteKind::Observation, day(1))
            .unwrap_err();
        assert!(matches!(
            err,
            WellbeingError::RoleNotAllowed {
                role: Role::Teacher,
                ..
            }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn notes_require_a_known_student() {
        let mut store = MemoryStore::new();
        let roster = StaticRoster::default();

        let err = add_support_note(&mut store, &roster, "3", "4", "x", NoteKind::Observation, day(1))
            .unwrap_err();
        assert!(matches!(err, WellbeingError::UnknownMember(id) if id == "3"));
    }

    #[test]
    fn teacher_comments_keep_sharing_and_tags() {
        let mut store = MemoryStore::new();
        let roster = StaticRoster::default();

        let comment = add_teacher_comment(
            &mut store,
            &roster,
            NewComment {
                student_id: "2",
                author_id: "3",
                comment: "Struggling with group work",
                priority: Priority::High,
                category: Category::Social,
                shared_with: vec!["4".to_string()],
            },
            day(2),
        )
        .unwrap();
        assert_eq!(comment.author_role, Role::Teacher);

        let stored = teacher_comments(&store, "2").unwrap();
        assert_eq!(stored, vec![comment]);
        assert_eq!(all_teacher_comments(&store).unwrap().len(), 1);
        assert!(teacher_comments(&store, "1").unwrap().is_empty());
    }

    #[test]
    fn students_cannot_comment() {
        let mut store = MemoryStore::new();
        let roster = StaticRoster::default();

        let result = add_teacher_comment(
            &mut store,
            &roster,
            NewComment {
                student_id: "2",
                author_id: "1",
                comment: "hi",
                priority: Priority::Low,
                category: Category::Academic,
                shared_with: Vec::new(),
            },
            day(2),
        );
        assert!(result.is_err());
    }
}
