//! End-to-end tests for the import flow against the sqlite backend.
//!
//! Tests the full pipeline: export workbook → name check (no key, so it is
//! skipped) → confirmation → attendee reconciliation → attendance log.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use rusqlite::Connection;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

fn attend_binary() -> String {
    env!("CARGO_BIN_EXE_attend").to_string()
}

/// Writes a quiz export with three players; the third has no usable email.
fn write_export(path: &Path) {
    let mut book = Workbook::new();

    let sheet = book.add_worksheet();
    sheet.set_name("Participant Data").unwrap();
    sheet.write_string(0, 0, "First Name").unwrap();
    sheet.write_string(0, 1, "Last Name").unwrap();
    for (row, (first, last)) in [("Ana", "Lee"), ("Bo", "Chen"), ("Cy", "Dunn"), ("Ana", "Lee")]
        .iter()
        .enumerate()
    {
        let row = u32::try_from(row + 1).unwrap();
        sheet.write_string(row, 0, *first).unwrap();
        sheet.write_string(row, 1, *last).unwrap();
    }

    let sheet = book.add_worksheet();
    sheet.set_name("Quiz Details").unwrap();
    sheet.write_string(0, 0, "Name").unwrap();
    sheet.write_string(0, 1, "Value").unwrap();
    sheet.write_string(1, 0, "Game Started On").unwrap();
    sheet.write_string(1, 1, "Mon 03 Mar 2025, 6:30 PM").unwrap();

    let sheet = book.add_worksheet();
    sheet.set_name("Overview").unwrap();
    sheet.write_string(0, 0, "Question").unwrap();
    sheet.write_string(0, 1, "Ana Lee (5)").unwrap();
    sheet.write_string(0, 2, "Bo Chen (3)").unwrap();
    sheet.write_string(0, 3, "Cy Dunn (1)").unwrap();
    sheet.write_string(1, 0, "What is your e-mail?").unwrap();
    sheet.write_string(1, 1, "Ana Lee <br>ana@x.com").unwrap();
    sheet.write_string(1, 2, "BO@X.COM").unwrap();
    sheet.write_string(1, 3, "no thanks").unwrap();

    book.save(path).unwrap();
}

struct Fixture {
    temp: TempDir,
    config: PathBuf,
    export: PathBuf,
    db: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("data/attend.db");
        let export = temp.path().join("quiz.xlsx");
        write_export(&export);

        let config = temp.path().join("config.toml");
        std::fs::write(
            &config,
            format!(
                r#"backend = "sqlite"
database_path = "{}"

[retry]
id_poll_attempts = 2
id_poll_interval_ms = 0
write_pause_ms = 0
"#,
                db.display()
            ),
        )
        .unwrap();

        Self {
            temp,
            config,
            export,
            db,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(attend_binary());
        command
            .env("HOME", self.temp.path())
            .env("XDG_CONFIG_HOME", self.temp.path().join(".config"))
            .env_remove("ATTEND_LLM__API_KEY")
            .env_remove("ATTEND_BACKEND")
            .arg("--config")
            .arg(&self.config);
        command
    }

    fn import(&self, stdin: &str, extra: &[&str]) -> Output {
        let mut child = self
            .command()
            .arg("import")
            .arg("--file")
            .arg(&self.export)
            .arg("--url")
            .arg("https://example.com/quiz/42")
            .arg("--title")
            .arg("Scaling Laws")
            .args(extra)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to run attend import");
        child
            .stdin
            .take()
            .unwrap()
            .write_all(stdin.as_bytes())
            .unwrap();
        child.wait_with_output().unwrap()
    }

    fn count(&self, table: &str) -> i64 {
        let conn = Connection::open(&self.db).unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_import_with_yes_flag_logs_every_participant() {
    let fixture = Fixture::new();

    let output = fixture.import("", &["--yes"]);

    assert!(
        output.status.success(),
        "attend import should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = stdout(&output);
    assert!(stdout.contains("Participants: 3"), "{stdout}");
    assert!(stdout.contains("  with email: 2"), "{stdout}");
    assert!(stdout.contains("Name check: unavailable"), "{stdout}");
    assert!(stdout.contains("  logged without email: 1"), "{stdout}");

    assert_eq!(fixture.count("attendees"), 3);
    assert_eq!(fixture.count("sessions"), 1);
    assert_eq!(fixture.count("attendance_log"), 3);

    let conn = Connection::open(&fixture.db).unwrap();
    let emails: Vec<(String, String)> = conn
        .prepare("SELECT name, email FROM attendees ORDER BY id")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        emails,
        vec![
            ("Ana Lee".to_string(), "ana@x.com".to_string()),
            ("Bo Chen".to_string(), "BO@X.COM".to_string()),
            ("Cy Dunn".to_string(), String::new()),
        ]
    );
    let date: String = conn
        .query_row("SELECT date FROM sessions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(date, "2025-03-03");
}

#[test]
fn test_second_import_reuses_attendees() {
    let fixture = Fixture::new();

    assert!(fixture.import("", &["--yes"]).status.success());
    assert!(fixture.import("yes\n", &[]).status.success());

    assert_eq!(fixture.count("attendees"), 3);
    assert_eq!(fixture.count("sessions"), 2);
    assert_eq!(fixture.count("attendance_log"), 6);
}

#[test]
fn test_declined_confirmation_writes_nothing() {
    let fixture = Fixture::new();

    let output = fixture.import("no\n", &[]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Import cancelled."));
    assert_eq!(fixture.count("attendees"), 0);
    assert_eq!(fixture.count("sessions"), 0);
    assert_eq!(fixture.count("attendance_log"), 0);
}

#[test]
fn test_preview_never_opens_store() {
    let fixture = Fixture::new();

    let output = fixture
        .command()
        .arg("preview")
        .arg("--file")
        .arg(&fixture.export)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(stdout(&output).contains("Preview only, nothing was written."));
    assert!(!fixture.db.exists());
}

#[test]
fn test_status_counts_rows_after_import() {
    let fixture = Fixture::new();
    assert!(fixture.import("", &["--yes"]).status.success());

    let output = fixture.command().arg("status").output().unwrap();

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("- attendees: 3"), "{stdout}");
    assert!(stdout.contains("- sessions: 1"), "{stdout}");
    assert!(stdout.contains("- attendance_log: 3"), "{stdout}");
}

#[test]
fn test_missing_export_fails_without_writing() {
    let fixture = Fixture::new();
    std::fs::remove_file(&fixture.export).unwrap();

    let output = fixture.import("", &["--yes"]);

    assert!(!output.status.success());
    assert!(!fixture.db.exists());
}

#[test]
fn test_sheets_backend_requires_credentials() {
    let fixture = Fixture::new();
    std::fs::write(&fixture.config, "backend = \"sheets\"\n").unwrap();

    let output = fixture
        .command()
        .env_remove("ATTEND_SHEETS__SPREADSHEET_ID")
        .env_remove("ATTEND_SHEETS__ACCESS_TOKEN")
        .arg("status")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("spreadsheet_id"));
}
