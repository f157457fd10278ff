use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod db;
mod error;
mod journal;
mod models;
mod notes;
mod report;
mod risk;
mod roster;
mod store;

use journal::MoodJournal;
use models::{Category, Mood, NoteKind, Priority};
use roster::{Roster, StaticRoster};

#[derive(Parser)]
#[command(name = "wellbeing-early-warning")]
#[command(about = "Student wellbeing check-ins and early warning reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo mood history for the default roster
    Seed,
    /// Import mood entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record a student's mood for the week
    Log {
        #[arg(long)]
        student: String,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        mood: u8,
        #[arg(long)]
        note: Option<String>,
        /// Record even if the student already logged this week
        #[arg(long)]
        force: bool,
    },
    /// Show the wellbeing report for one student
    Student {
        #[arg(long)]
        student: String,
        #[arg(long)]
        json: bool,
    },
    /// List students ordered by how urgently they need attention
    Roster {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Generate the weekly cohort report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Report date (defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Add a psychologist support note
    Note {
        #[arg(long)]
        student: String,
        #[arg(long)]
        author: String,
        #[arg(long, value_enum, default_value_t = NoteKind::Observation)]
        kind: NoteKind,
        #[arg(long)]
        text: String,
    },
    /// Add a staff comment about a student
    Comment {
        #[arg(long)]
        student: String,
        #[arg(long)]
        author: String,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(long, value_enum)]
        category: Category,
        #[arg(long)]
        text: String,
        /// Staff member ids that may see the comment
        #[arg(long = "share")]
        shared_with: Vec<String>,
    },
    /// List support notes and staff comments
    Notes {
        #[arg(long)]
        student: Option<String>,
    },
}

fn init_tracing() {
    let filter = std::env::var("WELLBEING_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(format!("{filter},sqlx=warn"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let roster = StaticRoster::default();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool, &roster).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &roster, &csv).await?;
            println!("Inserted {inserted} mood entries from {}.", csv.display());
        }
        Commands::Log {
            student,
            mood,
            note,
            force,
        } => {
            let Some(member) = roster.find_student(&student) else {
                bail!("no student with id {student} on the roster");
            };
            let mood = Mood::new(mood)?;
            let now = Utc::now();
            let mut store = db::load_store(&pool).await?;

            if !force && journal::has_entry_this_week(&MoodJournal::new(&store), &student, now)? {
                bail!("{} already logged a mood this week (use --force to add another)", member.name);
            }
            let entry = journal::record(&mut store, &student, mood, note.as_deref(), now)?;
            db::save_store(&pool, &store).await?;
            println!(
                "Logged {} {} for {} (week {} of {}).",
                entry.mood.emoji(),
                entry.mood.label(),
                member.name,
                entry.week,
                entry.year
            );
        }
        Commands::Student { student, json } => {
            let store = db::load_store(&pool).await?;
            let report = risk::generate_student_report(&student, &roster, &MoodJournal::new(&store))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let mut output = String::new();
                report::render_student(&mut output, &report);
                print!("{output}");
                for entry in &report.recent_entries {
                    println!(
                        "  - {} {} {}",
                        entry.recorded_at.date_naive(),
                        entry.mood.emoji(),
                        entry.note.as_deref().unwrap_or("")
                    );
                }
            }
        }
        Commands::Roster { limit, json } => {
            let store = db::load_store(&pool).await?;
            let reports = report::get_all_student_reports(&roster, &MoodJournal::new(&store))?;
            if json {
                let top: Vec<_> = reports.iter().take(limit).collect();
                println!("{}", serde_json::to_string_pretty(&top)?);
                return Ok(());
            }
            if reports.is_empty() {
                println!("No students on the roster.");
                return Ok(());
            }

            println!("Students by attention needed:");
            for report in reports.iter().take(limit) {
                println!(
                    "- {} ({}) alert {}, trend {}, average {:.2} across {} entries",
                    report.student_name,
                    report.student_id,
                    report.alert_level,
                    report.trend,
                    report.average_mood,
                    report.total_entries
                );
            }
        }
        Commands::Report { out, as_of, json } => {
            let store = db::load_store(&pool).await?;
            let entries = MoodJournal::new(&store);
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let weekly = report::generate_weekly_report(&roster, &entries, as_of)?;
            let reports = report::get_all_student_reports(&roster, &entries)?;

            let contents = if json {
                serde_json::to_string_pretty(&serde_json::json!({
                    "weekly": weekly,
                    "students": reports,
                }))?
            } else {
                let notes = notes::all_support_notes(&store)?;
                report::render_markdown(&weekly, &reports, &notes)
            };
            std::fs::write(&out, contents)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Note {
            student,
            author,
            kind,
            text,
        } => {
            let mut store = db::load_store(&pool).await?;
            let note =
                notes::add_support_note(&mut store, &roster, &student, &author, &text, kind, Utc::now())?;
            db::save_store(&pool, &store).await?;
            println!("Added {} note for student {}.", note.kind, note.student_id);
        }
        Commands::Comment {
            student,
            author,
            priority,
            category,
            text,
            shared_with,
        } => {
            let mut store = db::load_store(&pool).await?;
            let comment = notes::add_teacher_comment(
                &mut store,
                &roster,
                notes::NewComment {
                    student_id: &student,
                    author_id: &author,
                    comment: &text,
                    priority,
                    category,
                    shared_with,
                },
                Utc::now(),
            )?;
            db::save_store(&pool, &store).await?;
            println!(
                "Added comment from {} for student {}.",
                comment.author_name, comment.student_id
            );
        }
        Commands::Notes { student } => {
            let store = db::load_store(&pool).await?;
            let (support, comments) = match student.as_deref() {
                Some(id) => (
                    notes::support_notes(&store, id)?,
                    notes::teacher_comments(&store, id)?,
                ),
                None => (
                    notes::all_support_notes(&store)?,
                    notes::all_teacher_comments(&store)?,
                ),
            };

            if support.is_empty() && comments.is_empty() {
                println!("No notes recorded.");
                return Ok(());
            }
            for note in &support {
                println!(
                    "- [{}] {} on {} for student {}: {}",
                    note.kind,
                    note.psychologist_name,
                    note.recorded_at.date_naive(),
                    note.student_id,
                    note.note
                );
            }
            for comment in &comments {
                println!(
                    "- [{:?}/{:?}] {} ({}) on {} for student {}: {}",
                    comment.category,
                    comment.priority,
                    comment.author_name,
                    comment.author_role,
                    comment.recorded_at.date_naive(),
                    comment.student_id,
                    comment.comment
                );
            }
        }
    }

    Ok(())
}
