use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WellbeingError;

/// Self-reported mood on a 1 (very sad) to 5 (very happy) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Mood(u8);

impl Mood {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, WellbeingError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(WellbeingError::InvalidMood(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_low(self) -> bool {
        self.0 <= 2
    }

    pub fn is_positive(self) -> bool {
        self.0 >= 4
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "very sad",
            2 => "sad",
            3 => "neutral",
            4 => "happy",
            _ => "very happy",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self.0 {
            1 => "😢",
            2 => "😟",
            3 => "😐",
            4 => "😊",
            _ => "😄",
        }
    }
}

impl TryFrom<u8> for Mood {
    type Error = WellbeingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Mood::new(value)
    }
}

impl From<Mood> for u8 {
    fn from(mood: Mood) -> Self {
        mood.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: Uuid,
    pub student_id: String,
    pub recorded_at: DateTime<Utc>,
    pub mood: Mood,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub week: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Psychologist,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Psychologist => "psychologist",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterMember {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    None,
    Warning,
    Critical,
}

impl AlertLevel {
    /// Ranking used for the roster view: critical first, then warning, then none.
    pub fn priority(self) -> u8 {
        match self {
            AlertLevel::Critical => 0,
            AlertLevel::Warning => 1,
            AlertLevel::None => 2,
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertLevel::None => "none",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentReport {
    pub student_id: String,
    pub student_name: String,
    pub total_entries: usize,
    pub average_mood: f64,
    pub last_entry: Option<MoodEntry>,
    pub trend: Trend,
    pub alert_level: AlertLevel,
    pub recent_entries: Vec<MoodEntry>,
    pub problem_areas: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyReport {
    pub week_number: u32,
    pub year: i32,
    pub total_student_count: usize,
    pub active_student_count: usize,
    pub average_wellbeing: f64,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub critical_case_count: usize,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NoteKind {
    Observation,
    Intervention,
    FollowUp,
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NoteKind::Observation => "observation",
            NoteKind::Intervention => "intervention",
            NoteKind::FollowUp => "follow-up",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportNote {
    pub id: Uuid,
    pub student_id: String,
    pub psychologist_id: String,
    pub psychologist_name: String,
    pub note: String,
    pub recorded_at: DateTime<Utc>,
    pub kind: NoteKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Academic,
    Behavioral,
    Emotional,
    Social,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherComment {
    pub id: Uuid,
    pub student_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_role: Role,
    pub comment: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub shared_with: Vec<String>,
    pub priority: Priority,
    pub category: Category,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_rejects_out_of_range_values() {
        assert!(Mood::new(0).is_err());
        assert!(Mood::new(6).is_err());
        assert_eq!(Mood::new(3).map(Mood::value).ok(), Some(3));
    }

    #[test]
    fn mood_serializes_as_bare_integer() {
        let mood = Mood::new(4).expect("valid mood");
        assert_eq!(serde_json::to_string(&mood).expect("serialize"), "4");
        let parsed: Result<Mood, _> = serde_json::from_str("9");
        assert!(parsed.is_err());
    }

    #[test]
    fn alert_priority_puts_critical_first() {
        assert!(AlertLevel::Critical.priority() < AlertLevel::Warning.priority());
        assert!(AlertLevel::Warning.priority() < AlertLevel::None.priority());
    }

    #[test]
    fn note_kind_uses_kebab_case() {
        let json = serde_json::to_string(&NoteKind::FollowUp).expect("serialize");
        assert_eq!(json, "\"follow-up\"");
    }
}
