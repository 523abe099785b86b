use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

static BANK_DIR: Dir = include_dir!("src/banks");

/// Subject-matter category attached to every question (AreaAvaliacao)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
pub enum Area {
    Saude,
    Exatas,
    Humanas,
    Tecnologia,
}

/// A single multiple-choice question. Immutable once a session starts;
/// the correct answer is compared by plain string equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub id: u32,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub area: Area,
    pub year: u16,
}

#[derive(Debug, Error)]
pub enum BankError {
    #[error("unknown question bank '{0}'")]
    UnknownBank(String),
    #[error("bank '{0}' contains no questions")]
    EmptyBank(String),
    #[error("failed to read bank file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse bank: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A named collection of questions, either bundled into the binary or
/// loaded from a user-supplied JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionBank {
    pub name: String,
    pub questions: Vec<ExamQuestion>,
}

impl QuestionBank {
    /// Load one of the banks compiled into the binary.
    pub fn bundled(name: &str) -> Result<Self, BankError> {
        let file = BANK_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| BankError::UnknownBank(name.to_string()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| BankError::UnknownBank(name.to_string()))?;
        Self::parse(contents, name)
    }

    /// Load a bank from an external JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BankError> {
        let name = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "custom".to_string());
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents, &name)
    }

    fn parse(contents: &str, name: &str) -> Result<Self, BankError> {
        let bank: QuestionBank = serde_json::from_str(contents)?;
        if bank.questions.is_empty() {
            return Err(BankError::EmptyBank(name.to_string()));
        }
        Ok(bank)
    }

    /// Names of all banks compiled into the binary, sorted.
    pub fn bundled_names() -> Vec<String> {
        BANK_DIR
            .files()
            .filter_map(|f| f.path().file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .sorted()
            .collect()
    }

    /// Draw up to `count` questions, optionally restricted to one area.
    /// Order is randomized when `shuffle` is set, otherwise bank order.
    pub fn draw(&self, count: usize, area: Option<Area>, shuffle: bool) -> Vec<ExamQuestion> {
        let mut picked: Vec<ExamQuestion> = self
            .questions
            .iter()
            .filter(|q| area.map_or(true, |a| q.area == a))
            .cloned()
            .collect();

        if shuffle {
            picked.shuffle(&mut rand::thread_rng());
        }
        picked.truncate(count);
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_bundled_geral_loads() {
        let bank = QuestionBank::bundled("geral").unwrap();
        assert_eq!(bank.name, "geral");
        assert!(bank.questions.len() >= 10);
    }

    #[test]
    fn test_bundled_unknown_bank() {
        let err = QuestionBank::bundled("nope").unwrap_err();
        assert_matches!(err, BankError::UnknownBank(name) if name == "nope");
    }

    #[test]
    fn test_bundled_names_include_all_banks() {
        let names = QuestionBank::bundled_names();
        assert!(names.contains(&"geral".to_string()));
        assert!(names.contains(&"exatas".to_string()));
        assert!(names.contains(&"humanas".to_string()));
        // sorted
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_bundled_banks_are_consistent() {
        for name in QuestionBank::bundled_names() {
            let bank = QuestionBank::bundled(&name).unwrap();
            for q in &bank.questions {
                assert!(
                    q.options.contains(&q.correct_answer),
                    "bank {} question {} has a correct answer not among its options",
                    name,
                    q.id
                );
                assert!(q.options.len() >= 2);
            }
            // ids must be unique within a bank, answers are keyed by them
            let mut ids: Vec<u32> = bank.questions.iter().map(|q| q.id).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), bank.questions.len());
        }
    }

    #[test]
    fn test_draw_respects_count() {
        let bank = QuestionBank::bundled("geral").unwrap();
        let drawn = bank.draw(3, None, false);
        assert_eq!(drawn.len(), 3);
        // without shuffle, bank order is preserved
        assert_eq!(drawn[0], bank.questions[0]);
    }

    #[test]
    fn test_draw_more_than_available() {
        let bank = QuestionBank::bundled("geral").unwrap();
        let drawn = bank.draw(10_000, None, false);
        assert_eq!(drawn.len(), bank.questions.len());
    }

    #[test]
    fn test_draw_filters_by_area() {
        let bank = QuestionBank::bundled("geral").unwrap();
        let drawn = bank.draw(usize::MAX, Some(Area::Exatas), false);
        assert!(!drawn.is_empty());
        assert!(drawn.iter().all(|q| q.area == Area::Exatas));
    }

    #[test]
    fn test_draw_shuffle_keeps_question_set() {
        let bank = QuestionBank::bundled("geral").unwrap();
        let mut drawn = bank.draw(usize::MAX, None, true);
        assert_eq!(drawn.len(), bank.questions.len());
        drawn.sort_by_key(|q| q.id);
        let mut all = bank.questions.clone();
        all.sort_by_key(|q| q.id);
        assert_eq!(drawn, all);
    }

    #[test]
    fn test_from_path_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"name":"custom","questions":[{{"id":1,"prompt":"2+2?","options":["3","4"],"correct_answer":"4","area":"Exatas","year":2023}}]}}"#
        )
        .unwrap();

        let bank = QuestionBank::from_path(&path).unwrap();
        assert_eq!(bank.name, "custom");
        assert_eq!(bank.questions.len(), 1);
        assert_eq!(bank.questions[0].correct_answer, "4");
    }

    #[test]
    fn test_from_path_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_matches!(QuestionBank::from_path(&path), Err(BankError::Parse(_)));
    }

    #[test]
    fn test_from_path_missing_file() {
        assert_matches!(
            QuestionBank::from_path("/definitely/not/here.json"),
            Err(BankError::Io(_))
        );
    }

    #[test]
    fn test_empty_bank_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, r#"{"name":"empty","questions":[]}"#).unwrap();
        assert_matches!(QuestionBank::from_path(&path), Err(BankError::EmptyBank(_)));
    }

    #[test]
    fn test_area_display() {
        assert_eq!(Area::Saude.to_string(), "Saude");
        assert_eq!(Area::Tecnologia.to_string(), "Tecnologia");
    }
}
