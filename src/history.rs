use crate::app_dirs::AppDirs;
use crate::session::Simulado;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::path::{Path, PathBuf};

/// One completed simulado as stored in the history database.
#[derive(Debug, Clone)]
pub struct StoredResult {
    pub taken_at: DateTime<Local>,
    pub bank: String,
    pub area: Option<String>,
    pub total_questions: usize,
    pub correct: usize,
    pub duration_secs: u32,
}

/// Aggregate hit rate for one subject area across all stored attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaAccuracy {
    pub area: String,
    pub attempts: i64,
    pub correct: i64,
}

impl AreaAccuracy {
    pub fn accuracy_pct(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        (self.correct as f64 / self.attempts as f64) * 100.0
    }
}

/// Database of past simulado attempts
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open the history database at the default state path.
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("edulign_history.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS simulado_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                taken_at TEXT NOT NULL,
                bank TEXT NOT NULL,
                area TEXT,
                total_questions INTEGER NOT NULL,
                correct INTEGER NOT NULL,
                duration_secs INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS question_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                result_id INTEGER NOT NULL REFERENCES simulado_results(id),
                question_id INTEGER NOT NULL,
                area TEXT NOT NULL,
                selected_answer TEXT NOT NULL,
                correct_answer TEXT NOT NULL,
                was_correct BOOLEAN NOT NULL,
                time_spent_secs INTEGER NOT NULL,
                was_flagged BOOLEAN NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_question_results_area ON question_results(area)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_simulado_results_taken_at ON simulado_results(taken_at)",
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    /// Persist a completed session with its per-question breakdown.
    /// Returns the new result row id.
    pub fn record_session(
        &mut self,
        session: &Simulado,
        bank: &str,
        area: Option<&str>,
    ) -> Result<i64> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO simulado_results
            (taken_at, bank, area, total_questions, correct, duration_secs)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                Local::now().to_rfc3339(),
                bank,
                area,
                session.questions().len(),
                session.score(),
                session.elapsed_secs(),
            ],
        )?;
        let result_id = tx.last_insert_rowid();

        for question in session.questions() {
            // record set and question set share ids by construction
            if let Some(answer) = session.answer(question.id) {
                tx.execute(
                    r#"
                    INSERT INTO question_results
                    (result_id, question_id, area, selected_answer, correct_answer,
                     was_correct, time_spent_secs, was_flagged)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        result_id,
                        question.id,
                        question.area.to_string(),
                        answer.selected_answer,
                        question.correct_answer,
                        answer.selected_answer == question.correct_answer,
                        answer.time_spent,
                        answer.is_flagged,
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(result_id)
    }

    /// Most recent attempts, newest first.
    pub fn recent_results(&self, limit: usize) -> Result<Vec<StoredResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT taken_at, bank, area, total_questions, correct, duration_secs
            FROM simulado_results
            ORDER BY taken_at DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit], |row| {
            let taken_at_str: String = row.get(0)?;
            let taken_at = DateTime::parse_from_rfc3339(&taken_at_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "taken_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(StoredResult {
                taken_at,
                bank: row.get(1)?,
                area: row.get(2)?,
                total_questions: row.get::<_, i64>(3)? as usize,
                correct: row.get::<_, i64>(4)? as usize,
                duration_secs: row.get::<_, i64>(5)? as u32,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Answered-question hit rate per subject area, across all attempts.
    /// Unanswered questions are left out of the denominator.
    pub fn area_accuracy(&self) -> Result<Vec<AreaAccuracy>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                area,
                COUNT(*) as attempts,
                SUM(CASE WHEN was_correct THEN 1 ELSE 0 END) as correct
            FROM question_results
            WHERE selected_answer != ''
            GROUP BY area
            ORDER BY area
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(AreaAccuracy {
                area: row.get(0)?,
                attempts: row.get(1)?,
                correct: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{Area, ExamQuestion};

    fn sample_session() -> Simulado {
        let questions = vec![
            ExamQuestion {
                id: 1,
                prompt: "um".into(),
                options: vec!["A".into(), "B".into()],
                correct_answer: "A".into(),
                area: Area::Exatas,
                year: 2021,
            },
            ExamQuestion {
                id: 2,
                prompt: "dois".into(),
                options: vec!["A".into(), "B".into()],
                correct_answer: "B".into(),
                area: Area::Humanas,
                year: 2021,
            },
            ExamQuestion {
                id: 3,
                prompt: "tres".into(),
                options: vec!["A".into(), "B".into()],
                correct_answer: "B".into(),
                area: Area::Humanas,
                year: 2021,
            },
        ];
        let mut s = Simulado::new(questions, 5).unwrap();
        s.select_answer(1, "A"); // correct
        s.select_answer(2, "A"); // wrong
        s.toggle_flag(3); // never answered
        s
    }

    fn open_temp_db(dir: &tempfile::TempDir) -> HistoryDb {
        HistoryDb::open(dir.path().join("history.db")).unwrap()
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("nested").join("history.db");
        HistoryDb::open(&nested).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_record_and_recall_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open_temp_db(&dir);

        let session = sample_session();
        let id = db.record_session(&session, "geral", None).unwrap();
        assert!(id > 0);

        let recent = db.recent_results(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].bank, "geral");
        assert_eq!(recent[0].area, None);
        assert_eq!(recent[0].total_questions, 3);
        assert_eq!(recent[0].correct, 1);
    }

    #[test]
    fn test_recent_results_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open_temp_db(&dir);

        for _ in 0..5 {
            db.record_session(&sample_session(), "geral", Some("Exatas"))
                .unwrap();
        }
        assert_eq!(db.recent_results(3).unwrap().len(), 3);
        assert_eq!(db.recent_results(100).unwrap().len(), 5);
    }

    #[test]
    fn test_area_accuracy_skips_unanswered() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open_temp_db(&dir);
        db.record_session(&sample_session(), "geral", None).unwrap();

        let accuracy = db.area_accuracy().unwrap();
        // question 3 (Humanas) was never answered, so Humanas has one attempt
        assert_eq!(accuracy.len(), 2);
        let exatas = accuracy.iter().find(|a| a.area == "Exatas").unwrap();
        assert_eq!(exatas.attempts, 1);
        assert_eq!(exatas.correct, 1);
        assert_eq!(exatas.accuracy_pct(), 100.0);

        let humanas = accuracy.iter().find(|a| a.area == "Humanas").unwrap();
        assert_eq!(humanas.attempts, 1);
        assert_eq!(humanas.correct, 0);
        assert_eq!(humanas.accuracy_pct(), 0.0);
    }

    #[test]
    fn test_area_accuracy_empty_db() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_temp_db(&dir);
        assert!(db.area_accuracy().unwrap().is_empty());
        assert!(db.recent_results(10).unwrap().is_empty());
    }
}
