use std::collections::HashSet;
use std::fmt::Write;

use chrono::{Datelike, NaiveDate};

use crate::error::Result;
use crate::journal::{self, EntryStore};
use crate::models::{AlertLevel, StudentReport, SupportNote, WeeklyReport};
use crate::risk;
use crate::roster::Roster;

const RECENT_NOTE_COUNT: usize = 5;

/// Week of the month used to label the weekly report.
pub fn report_week(as_of: NaiveDate) -> u32 {
    (as_of.day() + 6).div_ceil(7)
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        // Scale before dividing so whole-number shares come out exact.
        (count * 100) as f64 / total as f64
    }
}

/// Cohort statistics over every stored entry; averages are not limited to the labelled week.
pub fn generate_weekly_report<R, E>(roster: &R, store: &E, as_of: NaiveDate) -> Result<WeeklyReport>
where
    R: Roster + ?Sized,
    E: EntryStore + ?Sized,
{
    let students = roster.list_students();
    let all_entries = store.list_all_entries()?;

    let active_student_count = all_entries
        .iter()
        .map(|entry| entry.student_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let average_wellbeing = journal::mood_average(&all_entries);

    let positive = all_entries.iter().filter(|e| e.mood.is_positive()).count();
    let negative = all_entries.iter().filter(|e| e.mood.is_low()).count();
    let positive_percentage = percentage(positive, all_entries.len());
    let negative_percentage = percentage(negative, all_entries.len());

    let mut critical_case_count = 0;
    for student in &students {
        let report = risk::generate_student_report(&student.id, roster, store)?;
        if report.alert_level == AlertLevel::Critical {
            critical_case_count += 1;
        }
    }

    let mut insights = Vec::new();
    if average_wellbeing >= 4.0 {
        insights.push(
            "Overall student wellbeing is excellent. Keep up the current practices.".to_string(),
        );
    } else if average_wellbeing >= 3.0 {
        insights.push(
            "Student wellbeing is at a satisfactory level, but there is room for improvement."
                .to_string(),
        );
    } else {
        insights.push(
            "Attention: overall wellbeing is below expectations. Consider interventions."
                .to_string(),
        );
    }
    if critical_case_count > 0 {
        insights.push(format!(
            "{critical_case_count} student(s) need immediate attention. Individual follow-up is recommended."
        ));
    }
    if negative_percentage > 30.0 {
        insights.push(
            "High share of negative moods. Consider collective wellbeing activities.".to_string(),
        );
    }
    if positive_percentage > 70.0 {
        insights.push("Excellent! Most students are reporting positive moods.".to_string());
    }

    Ok(WeeklyReport {
        week_number: report_week(as_of),
        year: as_of.year(),
        total_student_count: students.len(),
        active_student_count,
        average_wellbeing,
        positive_percentage,
        negative_percentage,
        critical_case_count,
        insights,
    })
}

/// One report per roster student, most urgent first, then lowest average mood.
pub fn get_all_student_reports<R, E>(roster: &R, store: &E) -> Result<Vec<StudentReport>>
where
    R: Roster + ?Sized,
    E: EntryStore + ?Sized,
{
    let mut reports = roster
        .list_students()
        .iter()
        .map(|student| risk::generate_student_report(&student.id, roster, store))
        .collect::<Result<Vec<_>>>()?;

    reports.sort_by(|a, b| {
        a.alert_level
            .priority()
            .cmp(&b.alert_level.priority())
            .then_with(|| {
                a.average_mood
                    .partial_cmp(&b.average_mood)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    Ok(reports)
}

pub fn render_student(output: &mut String, report: &StudentReport) {
    let _ = writeln!(
        output,
        "- {} ({}) alert {}, trend {}, average {:.2} across {} entries",
        report.student_name,
        report.student_id,
        report.alert_level,
        report.trend,
        report.average_mood,
        report.total_entries
    );
    for area in &report.problem_areas {
        let _ = writeln!(output, "  - concern: {area}");
    }
    for recommendation in &report.recommendations {
        let _ = writeln!(output, "  - suggestion: {recommendation}");
    }
}

pub fn render_markdown(
    weekly: &WeeklyReport,
    reports: &[StudentReport],
    notes: &[SupportNote],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Weekly Wellbeing Report");
    let _ = writeln!(
        output,
        "Week {} of {} ({} of {} students active)",
        weekly.week_number, weekly.year, weekly.active_student_count, weekly.total_student_count
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohort Wellbeing");
    let _ = writeln!(output, "- average mood: {:.2}", weekly.average_wellbeing);
    let _ = writeln!(output, "- positive entries: {:.1}%", weekly.positive_percentage);
    let _ = writeln!(output, "- negative entries: {:.1}%", weekly.negative_percentage);
    let _ = writeln!(output, "- critical cases: {}", weekly.critical_case_count);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insights");
    for insight in &weekly.insights {
        let _ = writeln!(output, "- {insight}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students by Attention Needed");
    if reports.is_empty() {
        let _ = writeln!(output, "No students on the roster.");
    } else {
        for report in reports {
            render_student(&mut output, report);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Support Notes");
    if notes.is_empty() {
        let _ = writeln!(output, "No support notes recorded.");
    } else {
        for note in notes.iter().take(RECENT_NOTE_COUNT) {
            let _ = writeln!(
                output,
                "- {} ({}) on {} for student {}: {}",
                note.psychologist_name,
                note.kind,
                note.recorded_at.date_naive(),
                note.student_id,
                note.note
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MoodEntry, NoteKind, Role, RosterMember};
    use crate::risk::tests::history;
    use crate::roster::StaticRoster;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn member(id: &str, name: &str, role: Role) -> RosterMember {
        RosterMember {
            id: id.to_string(),
            name: name.to_string(),
            role,
            email: format!("{id}@escola.com"),
        }
    }

    fn cohort() -> (StaticRoster, Vec<MoodEntry>) {
        let roster = StaticRoster::new(vec![
            member("a", "Bia", Role::Student),
            member("b", "Caio", Role::Student),
            member("c", "Duda", Role::Student),
            member("t", "Teacher", Role::Teacher),
        ]);
        let mut entries = history("c", &[4, 4, 4]);
        entries.extend(history("a", &[5, 1, 1]));
        entries.extend(history("b", &[2, 2, 3]));
        (roster, entries)
    }

    fn may(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, day).unwrap()
    }

    #[test]
    fn report_week_counts_within_month() {
        assert_eq!(report_week(may(1)), 1);
        assert_eq!(report_week(may(2)), 2);
        assert_eq!(report_week(may(8)), 2);
        assert_eq!(report_week(may(9)), 3);
        assert_eq!(report_week(may(31)), 6);
    }

    #[test]
    fn roster_reports_put_critical_students_first() {
        let (roster, entries) = cohort();
        let reports = get_all_student_reports(&roster, entries.as_slice()).unwrap();

        let ids: Vec<&str> = reports.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(reports[0].alert_level, AlertLevel::Critical);
        assert_eq!(reports[1].alert_level, AlertLevel::Warning);
        assert_eq!(reports[2].alert_level, AlertLevel::None);
    }

    #[test]
    fn equal_alerts_sort_by_lower_average() {
        let roster = StaticRoster::new(vec![
            member("x", "X", Role::Student),
            member("y", "Y", Role::Student),
            member("z", "Z", Role::Student),
        ]);
        let mut entries = history("x", &[5, 5, 5]);
        entries.extend(history("y", &[3, 3, 3]));
        entries.extend(history("z", &[4, 4, 4]));

        let reports = get_all_student_reports(&roster, entries.as_slice()).unwrap();
        let averages: Vec<f64> = reports.iter().map(|r| r.average_mood).collect();
        assert!(averages.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(reports[0].student_id, "y");
    }

    #[test]
    fn weekly_report_counts_critical_cases() {
        let (roster, entries) = cohort();
        let weekly = generate_weekly_report(&roster, entries.as_slice(), may(20)).unwrap();

        assert_eq!(weekly.total_student_count, 3);
        assert_eq!(weekly.active_student_count, 3);
        assert_eq!(weekly.critical_case_count, 1);
        assert_eq!(weekly.week_number, 4);
        assert_eq!(weekly.year, 2026);

        // 9 entries: four at >= 4, four at <= 2, one neutral.
        assert!((weekly.average_wellbeing - 26.0 / 9.0).abs() < 1e-9);
        assert!((weekly.positive_percentage - 400.0 / 9.0).abs() < 1e-9);
        assert!((weekly.negative_percentage - 400.0 / 9.0).abs() < 1e-9);
        assert!(weekly.positive_percentage + weekly.negative_percentage <= 100.0);

        assert_eq!(weekly.insights.len(), 3);
        assert!(weekly.insights[0].starts_with("Attention"));
        assert!(weekly.insights[1].starts_with("1 student(s)"));
        assert!(weekly.insights[2].contains("collective wellbeing"));
    }

    #[test]
    fn active_students_include_entries_outside_the_roster() {
        let roster = StaticRoster::default();
        let mut entries = history("1", &[5, 5]);
        entries.extend(history("ghost", &[4]));

        let weekly = generate_weekly_report(&roster, entries.as_slice(), may(1)).unwrap();
        assert_eq!(weekly.total_student_count, 2);
        assert_eq!(weekly.active_student_count, 2);
        assert_eq!(weekly.positive_percentage, 100.0);
        assert_eq!(
            weekly.insights,
            vec![
                "Overall student wellbeing is excellent. Keep up the current practices."
                    .to_string(),
                "Excellent! Most students are reporting positive moods.".to_string(),
            ]
        );
    }

    fn insights_for(entries: &[MoodEntry]) -> Vec<String> {
        let roster = StaticRoster::default();
        generate_weekly_report(&roster, entries, may(1))
            .unwrap()
            .insights
    }

    const EXCELLENT: &str = "Overall student wellbeing is excellent. Keep up the current practices.";
    const SATISFACTORY: &str =
        "Student wellbeing is at a satisfactory level, but there is room for improvement.";

    #[test]
    fn middle_tier_insight_for_satisfactory_average() {
        let entries = history("1", &[3, 5, 1, 4, 3, 3]);
        assert_eq!(insights_for(&entries), vec![SATISFACTORY.to_string()]);
    }

    #[test]
    fn wellbeing_tiers_include_their_lower_bound() {
        assert_eq!(insights_for(&history("1", &[3, 3])), vec![SATISFACTORY.to_string()]);

        let excellent = insights_for(&history("1", &[4, 4]));
        assert_eq!(excellent[0], EXCELLENT);
    }

    #[test]
    fn share_insights_need_to_exceed_their_threshold() {
        // 10 entries: exactly 70% positive and 30% negative, nobody critical.
        let mut entries = history("1", &[1, 5, 5, 5]);
        entries.extend(history("2", &[1, 5, 1, 5]));
        entries.extend(history("ghost", &[5, 5]));

        let roster = StaticRoster::default();
        let weekly = generate_weekly_report(&roster, entries.as_slice(), may(1)).unwrap();
        assert_eq!(weekly.positive_percentage, 70.0);
        assert_eq!(weekly.negative_percentage, 30.0);
        assert_eq!(weekly.critical_case_count, 0);
        assert_eq!(weekly.insights, vec![SATISFACTORY.to_string()]);
    }

    #[test]
    fn empty_store_gives_zeroed_statistics() {
        let roster = StaticRoster::default();
        let entries: Vec<MoodEntry> = Vec::new();
        let weekly = generate_weekly_report(&roster, entries.as_slice(), may(1)).unwrap();

        assert_eq!(weekly.active_student_count, 0);
        assert_eq!(weekly.average_wellbeing, 0.0);
        assert_eq!(weekly.positive_percentage, 0.0);
        assert_eq!(weekly.negative_percentage, 0.0);
        assert_eq!(weekly.critical_case_count, 0);
        assert_eq!(weekly.insights.len(), 1);
    }

    #[test]
    fn markdown_lists_students_and_notes() {
        let (roster, entries) = cohort();
        let weekly = generate_weekly_report(&roster, entries.as_slice(), may(20)).unwrap();
        let reports = get_all_student_reports(&roster, entries.as_slice()).unwrap();
        let notes = vec![SupportNote {
            id: Uuid::new_v4(),
            student_id: "a".to_string(),
            psychologist_id: "p".to_string(),
            psychologist_name: "João Costa".to_string(),
            note: "Talked about the last two weeks".to_string(),
            recorded_at: Utc.with_ymd_and_hms(2026, 5, 18, 10, 0, 0).unwrap(),
            kind: NoteKind::FollowUp,
        }];

        let markdown = render_markdown(&weekly, &reports, &notes);
        assert!(markdown.starts_with("# Weekly Wellbeing Report"));
        assert!(markdown.contains("- critical cases: 1"));
        assert!(markdown.contains("- Bia (a) alert critical"));
        assert!(markdown.contains("João Costa (follow-up) on 2026-05-18"));

        let empty = render_markdown(&weekly, &[], &[]);
        assert!(empty.contains("No students on the roster."));
        assert!(empty.contains("No support notes recorded."));
    }
}
