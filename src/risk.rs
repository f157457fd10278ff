use crate::error::Result;
use crate::journal::{self, EntryStore};
use crate::models::{AlertLevel, MoodEntry, RosterMember, StudentReport, Trend};
use crate::roster::Roster;

const RECENT_ENTRY_COUNT: usize = 5;
const TREND_WINDOW: usize = 3;
const TREND_MARGIN: f64 = 0.5;
const WARNING_AVERAGE: f64 = 2.5;
const THRIVING_AVERAGE: f64 = 4.0;
const MIN_ENGAGED_ENTRIES: usize = 3;
const MOOD_SWING: u8 = 3;
const NOTE_WINDOW: usize = 3;

const UNKNOWN_STUDENT: &str = "Unknown student";

/// Everything the heuristic rules look at for one student.
struct Signals<'a> {
    entries: &'a [MoodEntry],
    average: f64,
    trend: Trend,
    alert: AlertLevel,
    recent_notes: String,
}

impl Signals<'_> {
    fn notes_mention(&self, words: &[&str]) -> bool {
        words.iter().any(|word| self.recent_notes.contains(word))
    }
}

struct Rule {
    applies: fn(&Signals<'_>) -> bool,
    problem_area: Option<&'static str>,
    recommendations: &'static [&'static str],
}

/// Evaluated in order; every rule runs, so areas can co-occur.
const RULES: &[Rule] = &[
    Rule {
        applies: persistently_low,
        problem_area: Some("Persistently low wellbeing"),
        recommendations: &[
            "Schedule a one-on-one conversation to understand what is behind the low mood",
            "Consider a referral to the school psychologist",
        ],
    },
    Rule {
        applies: |s| s.trend == Trend::Declining,
        problem_area: Some("Worsening wellbeing trend"),
        recommendations: &[
            "Monitor closely over the coming weeks",
            "Look into recent changes in the student's life (family, friends, school)",
        ],
    },
    Rule {
        applies: |s| s.entries.len() < MIN_ENGAGED_ENTRIES,
        problem_area: Some("Low engagement with mood logging"),
        recommendations: &[
            "Encourage the student to log their mood regularly",
            "Explain the value of emotional self-awareness",
        ],
    },
    Rule {
        applies: has_mood_swings,
        problem_area: Some("Extreme mood swings"),
        recommendations: &[
            "Evaluate possible emotional triggers",
            "Teach emotional regulation techniques",
        ],
    },
    Rule {
        applies: |s| s.notes_mention(&["alone", "isolated"]),
        problem_area: Some("Possible social isolation"),
        recommendations: &["Promote group activities and social integration"],
    },
    Rule {
        applies: |s| s.notes_mention(&["tired", "sleep"]),
        problem_area: Some("Fatigue or sleep problems"),
        recommendations: &["Talk about sleep routine and healthy habits"],
    },
    Rule {
        applies: |s| s.notes_mention(&["exam", "grade", "difficulty"]),
        problem_area: Some("Academic stress"),
        recommendations: &[
            "Offer additional pedagogical support",
            "Teach stress management techniques",
        ],
    },
    Rule {
        applies: |s| s.alert == AlertLevel::None && s.average >= THRIVING_AVERAGE,
        problem_area: None,
        recommendations: &[
            "Student is doing well, keep up regular follow-up",
            "Consider the student as a positive example for peers",
        ],
    },
];

fn persistently_low(signals: &Signals<'_>) -> bool {
    let low = signals.entries.iter().filter(|e| e.mood.is_low()).count();
    low as f64 / signals.entries.len() as f64 > 0.5
}

fn has_mood_swings(signals: &Signals<'_>) -> bool {
    signals
        .entries
        .windows(2)
        .any(|pair| pair[0].mood.value().abs_diff(pair[1].mood.value()) >= MOOD_SWING)
}

pub fn generate_student_report<R, E>(
    student_id: &str,
    roster: &R,
    store: &E,
) -> Result<StudentReport>
where
    R: Roster + ?Sized,
    E: EntryStore + ?Sized,
{
    let student = roster.find_student(student_id);
    let entries = store.list_entries_for(student_id)?;
    Ok(build_student_report(student_id, student.as_ref(), &entries))
}

/// Builds a report from a student's entries in chronological order.
pub fn build_student_report(
    student_id: &str,
    student: Option<&RosterMember>,
    entries: &[MoodEntry],
) -> StudentReport {
    let student_name = student
        .map(|member| member.name.clone())
        .unwrap_or_else(|| UNKNOWN_STUDENT.to_string());

    if student.is_none() || entries.is_empty() {
        return StudentReport {
            student_id: student_id.to_string(),
            student_name,
            total_entries: 0,
            average_mood: 0.0,
            last_entry: None,
            trend: Trend::Stable,
            alert_level: AlertLevel::None,
            recent_entries: Vec::new(),
            problem_areas: Vec::new(),
            recommendations: Vec::new(),
        };
    }

    let average = journal::mood_average(entries);
    let trend = detect_trend(entries);
    let alert = classify_alert(entries, average);
    let signals = Signals {
        entries,
        average,
        trend,
        alert,
        recent_notes: recent_notes(entries),
    };

    let mut problem_areas = Vec::new();
    let mut recommendations = Vec::new();
    for rule in RULES.iter().filter(|rule| (rule.applies)(&signals)) {
        if let Some(area) = rule.problem_area {
            problem_areas.push(area.to_string());
        }
        recommendations.extend(rule.recommendations.iter().map(|r| r.to_string()));
    }

    StudentReport {
        student_id: student_id.to_string(),
        student_name,
        total_entries: entries.len(),
        average_mood: average,
        last_entry: entries.last().cloned(),
        trend,
        alert_level: alert,
        recent_entries: entries.iter().rev().take(RECENT_ENTRY_COUNT).cloned().collect(),
        problem_areas,
        recommendations,
    }
}

/// Compares the last three entries with the three before them.
pub fn detect_trend(entries: &[MoodEntry]) -> Trend {
    if entries.len() < TREND_WINDOW * 2 {
        return Trend::Stable;
    }
    let split = entries.len() - TREND_WINDOW;
    let recent = journal::mood_average(&entries[split..]);
    let older = journal::mood_average(&entries[split - TREND_WINDOW..split]);
    compare_windows(recent, older)
}

/// A shift must exceed the margin; landing exactly on it is still stable.
fn compare_windows(recent: f64, older: f64) -> Trend {
    if recent > older + TREND_MARGIN {
        Trend::Improving
    } else if recent < older - TREND_MARGIN {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

pub fn classify_alert(entries: &[MoodEntry], average: f64) -> AlertLevel {
    let last_two_low =
        entries.len() >= 2 && entries[entries.len() - 2..].iter().all(|e| e.mood.is_low());
    if last_two_low {
        AlertLevel::Critical
    } else if average < WARNING_AVERAGE {
        AlertLevel::Warning
    } else {
        AlertLevel::None
    }
}

fn recent_notes(entries: &[MoodEntry]) -> String {
    let start = entries.len().saturating_sub(NOTE_WINDOW);
    entries[start..]
        .iter()
        .filter_map(|entry| entry.note.as_deref())
        .filter(|note| !note.trim().is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
