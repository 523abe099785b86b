use crate::session::{Simulado, SubmittedAnswer};
use crate::util::percentage;
use chrono::Local;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// JSON payload in the shape the grading backend expects. Building and
/// writing it is the host's job; the session controller never does I/O.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub taken_at: String,
    pub bank: String,
    pub score: usize,
    pub total_questions: usize,
    pub answers: Vec<SubmittedAnswer>,
}

impl Submission {
    pub fn from_session(session: &Simulado, bank: &str) -> Self {
        Self {
            taken_at: Local::now().to_rfc3339(),
            bank: bank.to_string(),
            score: session.score(),
            total_questions: session.questions().len(),
            answers: session.submitted_answers().collect(),
        }
    }
}

pub fn write_submission<P: AsRef<Path>>(path: P, submission: &Submission) -> io::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(submission)?;
    std::fs::write(path, data)
}

/// One line of the local results log, appended after every completed
/// simulado.
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
pub struct ResultLogRecord {
    pub date: String,
    pub bank: String,
    pub total_questions: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub duration_secs: u32,
}

impl ResultLogRecord {
    pub fn new(session: &Simulado, bank: &str) -> Self {
        Self {
            date: Local::now().format("%c").to_string(),
            bank: bank.to_string(),
            total_questions: session.questions().len(),
            correct: session.score(),
            accuracy: percentage(session.score(), session.questions().len()).round(),
            duration_secs: session.elapsed_secs(),
        }
    }
}

/// Append a record to the CSV log, emitting the header only when the file
/// is created.
pub fn append_result_log<P: AsRef<Path>>(path: P, record: &ResultLogRecord) -> csv::Result<()> {
    let needs_header = !path.as_ref().exists();
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;
    Ok(())
}
