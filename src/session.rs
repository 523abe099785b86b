use crate::bank::ExamQuestion;
use serde::Serialize;
use std::collections::HashMap;
use std::time::SystemTime;
use thiserror::Error;

pub const QUESTIONS_PER_PAGE: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a simulado needs at least one question")]
    NoQuestions,
    #[error("time limit must be at least one minute")]
    NoTimeLimit,
}

/// Lifecycle of one simulado attempt. Completed is terminal and sticky:
/// every mutating operation becomes a no-op once it is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    InProgress,
    Reviewing,
    Completed,
}

/// Per-question answer state, one record per question for the whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question_id: u32,
    pub selected_answer: String,
    pub time_spent: u64,
    pub is_flagged: bool,
}

impl AnswerRecord {
    pub fn is_answered(&self) -> bool {
        !self.selected_answer.is_empty()
    }
}

/// One row of the submission payload handed to the grading backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedAnswer {
    pub question_id: u32,
    pub selected_answer: String,
    pub time_spent: u64,
}

/// One in-progress simulado: the questions, the per-question answers and
/// flags, a page cursor over them, and the countdown clock.
///
/// Time spent on a question is measured from the moment its page first
/// becomes visible (or the previous answer to it) until an answer is
/// selected. Re-answering overwrites the previous measurement, it does not
/// accumulate.
#[derive(Debug)]
pub struct Simulado {
    questions: Vec<ExamQuestion>,
    answers: Vec<AnswerRecord>,
    start_times: HashMap<u32, SystemTime>,
    current_page: usize,
    total_pages: usize,
    phase: SessionPhase,
    seconds_remaining: u32,
    time_limit_secs: u32,
    timer_paused: bool,
}

impl Simulado {
    pub fn new(questions: Vec<ExamQuestion>, time_limit_mins: u32) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        if time_limit_mins == 0 {
            return Err(SessionError::NoTimeLimit);
        }

        let answers = questions
            .iter()
            .map(|q| AnswerRecord {
                question_id: q.id,
                selected_answer: String::new(),
                time_spent: 0,
                is_flagged: false,
            })
            .collect();

        let total_pages = questions.len().div_ceil(QUESTIONS_PER_PAGE);
        // absurd limits cap at u32::MAX seconds instead of overflowing
        let time_limit_secs = time_limit_mins.saturating_mul(60);

        let mut simulado = Self {
            questions,
            answers,
            start_times: HashMap::new(),
            current_page: 0,
            total_pages,
            phase: SessionPhase::InProgress,
            seconds_remaining: time_limit_secs,
            time_limit_secs,
            timer_paused: false,
        };
        simulado.mark_page_visible();
        Ok(simulado)
    }

    /// Record the first-visible timestamp for every question on the current
    /// page that doesn't have one yet. Timing starts when a question first
    /// appears on screen, not when the session starts.
    fn mark_page_visible(&mut self) {
        let now = SystemTime::now();
        let start = self.current_page * QUESTIONS_PER_PAGE;
        let end = (start + QUESTIONS_PER_PAGE).min(self.questions.len());
        for q in &self.questions[start..end] {
            self.start_times.entry(q.id).or_insert(now);
        }
    }

    /// Record `answer` for `question_id`. Overwrites any previous selection
    /// and re-measures time_spent from the last visit marker. Silent no-op
    /// for unknown ids and after completion.
    pub fn select_answer(&mut self, question_id: u32, answer: &str) {
        if self.phase == SessionPhase::Completed {
            return;
        }
        let Some(record) = self
            .answers
            .iter_mut()
            .find(|a| a.question_id == question_id)
        else {
            return;
        };

        let now = SystemTime::now();
        let started = self.start_times.get(&question_id).copied().unwrap_or(now);
        // duration_since fails when the marker is in the future; clamp to zero
        let elapsed = now.duration_since(started).map(|d| d.as_secs()).unwrap_or(0);

        record.selected_answer = answer.to_string();
        record.time_spent = elapsed;
        self.start_times.insert(question_id, now);
    }

    pub fn toggle_flag(&mut self, question_id: u32) {
        if self.phase == SessionPhase::Completed {
            return;
        }
        if let Some(record) = self
            .answers
            .iter_mut()
            .find(|a| a.question_id == question_id)
        {
            record.is_flagged = !record.is_flagged;
        }
    }

    /// Advance one page, starting the visibility clock for the questions
    /// that just appeared. On the last page this submits the session.
    pub fn next_page(&mut self) {
        if self.phase == SessionPhase::Completed {
            return;
        }
        if self.current_page < self.total_pages - 1 {
            self.current_page += 1;
            self.mark_page_visible();
        } else {
            self.phase = SessionPhase::Completed;
        }
    }

    pub fn previous_page(&mut self) {
        if self.phase == SessionPhase::Completed {
            return;
        }
        if self.current_page > 0 {
            self.current_page -= 1;
        }
    }

    /// Pause or resume the countdown. Pausing stops the clock display only;
    /// per-question time keeps using wall-clock visit markers.
    pub fn toggle_timer(&mut self) {
        if self.phase == SessionPhase::Completed {
            return;
        }
        self.timer_paused = !self.timer_paused;
    }

    /// One-second countdown step, driven by the host's tick source.
    /// Hitting zero submits the session.
    pub fn on_tick(&mut self) {
        if self.phase == SessionPhase::Completed || self.timer_paused {
            return;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 {
            self.phase = SessionPhase::Completed;
        }
    }

    /// Enter review mode: re-examine questions without submitting.
    /// The countdown keeps running.
    pub fn begin_review(&mut self) {
        if self.phase == SessionPhase::InProgress {
            self.phase = SessionPhase::Reviewing;
        }
    }

    pub fn finish_review(&mut self) {
        if self.phase == SessionPhase::Reviewing {
            self.phase = SessionPhase::InProgress;
        }
    }

    /// Count of correctly answered questions. Pure; safe in any phase.
    pub fn score(&self) -> usize {
        self.answers
            .iter()
            .filter(|a| {
                self.questions
                    .iter()
                    .find(|q| q.id == a.question_id)
                    .is_some_and(|q| a.selected_answer == q.correct_answer)
            })
            .count()
    }

    /// Lazy, restartable view of the answers in submission form.
    /// The caller (not this controller) ships it to the grading backend.
    pub fn submitted_answers(&self) -> impl Iterator<Item = SubmittedAnswer> + '_ {
        self.answers.iter().map(|a| SubmittedAnswer {
            question_id: a.question_id,
            selected_answer: a.selected_answer.clone(),
            time_spent: a.time_spent,
        })
    }

    pub fn questions(&self) -> &[ExamQuestion] {
        &self.questions
    }

    /// The slice of questions visible on the current page.
    pub fn page_questions(&self) -> &[ExamQuestion] {
        let start = self.current_page * QUESTIONS_PER_PAGE;
        let end = (start + QUESTIONS_PER_PAGE).min(self.questions.len());
        &self.questions[start..end]
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn answer(&self, question_id: u32) -> Option<&AnswerRecord> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_answered()).count()
    }

    pub fn flagged_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_flagged).count()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    pub fn is_paused(&self) -> bool {
        self.timer_paused
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    /// Seconds of running clock consumed so far.
    pub fn elapsed_secs(&self) -> u32 {
        self.time_limit_secs - self.seconds_remaining
    }
}
