pub mod app_dirs;
pub mod bank;
pub mod config;
pub mod export;
pub mod history;
pub mod runtime;
pub mod session;
pub mod ui;
pub mod util;

use crate::{
    bank::{Area, QuestionBank},
    config::{Config, ConfigStore, FileConfigStore},
    export::{append_result_log, write_submission, ResultLogRecord, Submission},
    history::{AreaAccuracy, HistoryDb, StoredResult},
    runtime::{Runner, SessionEvent, TerminalFeed},
    session::{SessionPhase, Simulado},
};
use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

const HISTORY_PAGE_SIZE: usize = 50;

/// terminal simulado runner with per-question timing and progress tracking
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Run timed multiple-choice practice exams in the terminal, with paged navigation, question flagging, answer review and a local history of past attempts."
)]
pub struct Cli {
    /// number of questions to draw
    #[clap(short = 'n', long)]
    num_questions: Option<usize>,

    /// time limit in minutes
    #[clap(short = 't', long)]
    time_limit: Option<u32>,

    /// bundled question bank to draw from
    #[clap(short = 'b', long)]
    bank: Option<String>,

    /// restrict the draw to one subject area
    #[clap(short = 'a', long, value_enum)]
    area: Option<Area>,

    /// load questions from a JSON file instead of a bundled bank
    #[clap(short = 'q', long)]
    questions_file: Option<PathBuf>,

    /// keep questions in bank order instead of shuffling
    #[clap(long)]
    no_shuffle: bool,

    /// list the bundled question banks and exit
    #[clap(long)]
    list_banks: bool,
}

/// Effective settings for one run: CLI arguments override the saved
/// config, which in turn overrides the built-in defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub num_questions: usize,
    pub time_limit_mins: u32,
    pub bank: String,
    pub area: Option<Area>,
    pub shuffle: bool,
    pub questions_file: Option<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::resolve(
            &Cli::parse_from(["edulign"]),
            &Config::default(),
        )
    }
}

impl RunSettings {
    pub fn resolve(cli: &Cli, cfg: &Config) -> Self {
        let area = cli.area.or_else(|| {
            cfg.area
                .as_deref()
                .and_then(|s| Area::from_str(s, true).ok())
        });
        Self {
            num_questions: cli.num_questions.unwrap_or(cfg.num_questions),
            time_limit_mins: cli.time_limit.unwrap_or(cfg.time_limit_mins),
            bank: cli.bank.clone().unwrap_or_else(|| cfg.bank.clone()),
            area,
            shuffle: if cli.no_shuffle { false } else { cfg.shuffle },
            questions_file: cli.questions_file.clone(),
        }
    }

    /// Persisted so the next run starts from the same settings.
    pub fn to_config(&self) -> Config {
        Config {
            time_limit_mins: self.time_limit_mins,
            num_questions: self.num_questions,
            bank: self.bank.clone(),
            area: self.area.map(|a| a.to_string()),
            shuffle: self.shuffle,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Exam,
    Results,
    History,
}

#[derive(Debug, Default)]
pub struct HistoryState {
    pub scroll_offset: usize,
    pub results: Vec<StoredResult>,
    pub areas: Vec<AreaAccuracy>,
}

#[derive(Debug)]
pub struct App {
    pub settings: RunSettings,
    pub bank: QuestionBank,
    pub simulado: Simulado,
    pub state: AppState,
    pub focus: usize,
    pub status: Option<String>,
    pub history_state: HistoryState,
    pub finalized: bool,
}

impl App {
    pub fn new(settings: RunSettings) -> Result<Self, Box<dyn Error>> {
        let bank = match &settings.questions_file {
            Some(path) => QuestionBank::from_path(path)?,
            None => QuestionBank::bundled(&settings.bank)?,
        };

        let questions = bank.draw(settings.num_questions, settings.area, settings.shuffle);
        if questions.is_empty() {
            return Err(format!(
                "bank '{}' has no questions{}",
                bank.name,
                settings
                    .area
                    .map(|a| format!(" for area {}", a))
                    .unwrap_or_default()
            )
            .into());
        }

        let simulado = Simulado::new(questions, settings.time_limit_mins)?;

        Ok(Self {
            settings,
            bank,
            simulado,
            state: AppState::Exam,
            focus: 0,
            status: None,
            history_state: HistoryState::default(),
            finalized: false,
        })
    }

    pub fn bank_label(&self) -> String {
        match self.settings.area {
            Some(area) => format!("{} ({})", self.bank.name, area),
            None => self.bank.name.clone(),
        }
    }

    pub fn focused_question(&self) -> Option<&bank::ExamQuestion> {
        self.simulado.page_questions().get(self.focus)
    }

    /// Record option `idx` (0-based) of the focused question as the answer.
    pub fn select_option(&mut self, idx: usize) {
        let target = self
            .focused_question()
            .and_then(|q| q.options.get(idx).map(|opt| (q.id, opt.clone())));
        if let Some((id, opt)) = target {
            self.simulado.select_answer(id, &opt);
        }
    }

    pub fn flag_focused(&mut self) {
        if let Some(id) = self.focused_question().map(|q| q.id) {
            self.simulado.toggle_flag(id);
        }
    }

    pub fn move_focus_up(&mut self) {
        self.focus = self.focus.saturating_sub(1);
    }

    pub fn move_focus_down(&mut self) {
        let last = self.simulado.page_questions().len().saturating_sub(1);
        if self.focus < last {
            self.focus += 1;
        }
    }

    pub fn next_page(&mut self) {
        self.simulado.next_page();
        self.focus = 0;
    }

    pub fn previous_page(&mut self) {
        self.simulado.previous_page();
        self.focus = 0;
    }

    /// Restart with the same question set, in the same order.
    pub fn retake(&mut self) {
        let questions = self.simulado.questions().to_vec();
        if let Ok(simulado) = Simulado::new(questions, self.settings.time_limit_mins) {
            self.simulado = simulado;
            self.reset_run_state();
        }
    }

    /// Restart with a fresh draw from the same bank.
    pub fn new_draw(&mut self) {
        let questions = self.bank.draw(
            self.settings.num_questions,
            self.settings.area,
            self.settings.shuffle,
        );
        if let Ok(simulado) = Simulado::new(questions, self.settings.time_limit_mins) {
            self.simulado = simulado;
            self.reset_run_state();
        }
    }

    fn reset_run_state(&mut self) {
        self.state = AppState::Exam;
        self.focus = 0;
        self.status = None;
        self.finalized = false;
    }

    /// Called once when the session completes. Persistence failures are
    /// swallowed so a broken disk never hides the results screen.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        let area = self.settings.area.map(|a| a.to_string());
        if let Ok(mut db) = HistoryDb::new() {
            let _ = db.record_session(&self.simulado, &self.bank.name, area.as_deref());
        }
        if let Some(log_path) = app_dirs::AppDirs::results_log_path() {
            let record = ResultLogRecord::new(&self.simulado, &self.bank.name);
            let _ = append_result_log(log_path, &record);
        }

        self.state = AppState::Results;
    }

    pub fn export_submission(&mut self) {
        let filename = format!("simulado_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
        let submission = Submission::from_session(&self.simulado, &self.bank.name);
        self.status = Some(match write_submission(&filename, &submission) {
            Ok(()) => format!("submissao gravada em {}", filename),
            Err(e) => format!("falha ao exportar: {}", e),
        });
    }

    pub fn open_history(&mut self) {
        match HistoryDb::new() {
            Ok(db) => {
                self.history_state = HistoryState {
                    scroll_offset: 0,
                    results: db.recent_results(HISTORY_PAGE_SIZE).unwrap_or_default(),
                    areas: db.area_accuracy().unwrap_or_default(),
                };
                self.state = AppState::History;
            }
            Err(e) => {
                self.status = Some(format!("historico indisponivel: {}", e));
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.list_banks {
        for name in QuestionBank::bundled_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let store = FileConfigStore::new();
    let settings = RunSettings::resolve(&cli, &store.load());
    let _ = store.save(&settings.to_config());

    let mut app = match App::new(settings) {
        Ok(app) => app,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    start_tui(&mut terminal, &mut app)?;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

#[derive(Debug)]
enum ExitType {
    Retake,
    New,
    Quit,
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::with_exam_clock(TerminalFeed::spawn());

    loop {
        let mut exit_type: ExitType = ExitType::Quit;
        terminal.draw(|f| ui(app, f))?;

        loop {
            let app = &mut app;

            match runner.step() {
                SessionEvent::Tick => {
                    if app.state == AppState::Exam
                        && !app.simulado.is_paused()
                        && !app.simulado.is_completed()
                    {
                        app.simulado.on_tick();
                        if app.simulado.is_completed() {
                            app.finalize();
                        }
                        terminal.draw(|f| ui(app, f))?;
                    }
                }
                SessionEvent::Resize => {
                    terminal.draw(|f| ui(app, f))?;
                }
                SessionEvent::Key(key) => {
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c')
                    {
                        break;
                    }

                    match app.state {
                        AppState::Exam => {
                            // while paused only resume and quit are live
                            if app.simulado.is_paused() && !app.simulado.is_completed() {
                                match key.code {
                                    KeyCode::Esc => break,
                                    KeyCode::Char(' ') => app.simulado.toggle_timer(),
                                    _ => {}
                                }
                            } else {
                                match key.code {
                                    KeyCode::Esc => break,
                                    KeyCode::Char(c @ 'a'..='e') => {
                                        app.select_option((c as u8 - b'a') as usize);
                                    }
                                    KeyCode::Char(c @ '1'..='5') => {
                                        app.select_option((c as u8 - b'1') as usize);
                                    }
                                    KeyCode::Char('f') => app.flag_focused(),
                                    KeyCode::Char(' ') => app.simulado.toggle_timer(),
                                    KeyCode::Char('v') => match app.simulado.phase() {
                                        SessionPhase::Reviewing => app.simulado.finish_review(),
                                        _ => app.simulado.begin_review(),
                                    },
                                    KeyCode::Up => app.move_focus_up(),
                                    KeyCode::Down => app.move_focus_down(),
                                    KeyCode::Left => app.previous_page(),
                                    KeyCode::Right | KeyCode::Enter => {
                                        app.next_page();
                                        if app.simulado.is_completed() {
                                            app.finalize();
                                        }
                                    }
                                    _ => {}
                                }
                            }
                        }
                        AppState::Results => match key.code {
                            KeyCode::Esc => break,
                            KeyCode::Char('r') => {
                                exit_type = ExitType::Retake;
                                break;
                            }
                            KeyCode::Char('n') => {
                                exit_type = ExitType::New;
                                break;
                            }
                            KeyCode::Char('e') => app.export_submission(),
                            KeyCode::Char('h') => app.open_history(),
                            _ => {}
                        },
                        AppState::History => match key.code {
                            KeyCode::Esc => break,
                            KeyCode::Char('b') | KeyCode::Backspace => {
                                app.state = AppState::Results;
                            }
                            KeyCode::Up => {
                                app.history_state.scroll_offset =
                                    app.history_state.scroll_offset.saturating_sub(1);
                            }
                            KeyCode::Down => {
                                // clamped against row count in render_history
                                app.history_state.scroll_offset += 1;
                            }
                            KeyCode::PageUp => {
                                app.history_state.scroll_offset =
                                    app.history_state.scroll_offset.saturating_sub(10);
                            }
                            KeyCode::PageDown => {
                                app.history_state.scroll_offset += 10;
                            }
                            KeyCode::Home => {
                                app.history_state.scroll_offset = 0;
                            }
                            _ => {}
                        },
                    }
                    terminal.draw(|f| ui(app, f))?;
                }
            }
        }

        match exit_type {
            ExitType::Retake => {
                app.retake();
            }
            ExitType::New => {
                app.new_draw();
            }
            ExitType::Quit => {
                break;
            }
        }
    }

    Ok(())
}

fn render_history(app: &mut App, f: &mut Frame) {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Modifier, Style},
        text::Line,
        widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    };
    use time_humanize::{Accuracy, HumanTime, Tense};

    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(0),    // attempts table
            Constraint::Length(7), // per-area accuracy
            Constraint::Length(3), // instructions
        ])
        .split(area);

    let title = Paragraph::new("Historico de simulados")
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if app.history_state.results.is_empty() {
        let no_data = Paragraph::new("Nenhum simulado registrado ainda.\nComplete um simulado para ver seu historico!")
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(no_data, chunks[1]);
    } else {
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let total_rows = app.history_state.results.len();
        let max_scroll = total_rows.saturating_sub(table_height);
        if app.history_state.scroll_offset > max_scroll {
            app.history_state.scroll_offset = max_scroll;
        }

        let header = Row::new(vec![
            Cell::from("Quando"),
            Cell::from("Banco"),
            Cell::from("Area"),
            Cell::from("Acertos"),
            Cell::from("Duracao"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let now = Local::now();
        let visible_rows: Vec<Row> = app
            .history_state
            .results
            .iter()
            .skip(app.history_state.scroll_offset)
            .take(table_height)
            .map(|r| {
                let ago_secs = (now - r.taken_at).num_seconds().max(0) as u64;
                let when = HumanTime::from(Duration::from_secs(ago_secs))
                    .to_text_en(Accuracy::Rough, Tense::Past);
                let pct = util::percentage(r.correct, r.total_questions);
                let score_color = if pct >= 70.0 {
                    Color::Green
                } else if pct >= 50.0 {
                    Color::Yellow
                } else {
                    Color::Red
                };
                Row::new(vec![
                    Cell::from(when),
                    Cell::from(r.bank.clone()),
                    Cell::from(r.area.clone().unwrap_or_else(|| "-".to_string())),
                    Cell::from(format!("{}/{} ({:.0}%)", r.correct, r.total_questions, pct))
                        .style(Style::default().fg(score_color)),
                    Cell::from(util::format_clock(r.duration_secs)),
                ])
            })
            .collect();

        let scroll_info = if total_rows > table_height {
            format!(
                " ({}/{})",
                app.history_state.scroll_offset + visible_rows.len().min(table_height),
                total_rows
            )
        } else {
            String::new()
        };

        let table = Table::new(
            visible_rows,
            &[
                Constraint::Length(20),
                Constraint::Length(14),
                Constraint::Length(12),
                Constraint::Length(16),
                Constraint::Length(10),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Tentativas{}", scroll_info)),
        );
        f.render_widget(table, chunks[1]);
    }

    let mut area_lines: Vec<Line> = Vec::new();
    if app.history_state.areas.is_empty() {
        area_lines.push(Line::from("Sem dados por area"));
    } else {
        for acc in &app.history_state.areas {
            area_lines.push(Line::from(format!(
                "{}: {}/{} ({:.0}%)",
                acc.area,
                acc.correct,
                acc.attempts,
                acc.accuracy_pct()
            )));
        }
    }
    let area_block = Paragraph::new(area_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Aproveitamento por area"),
    );
    f.render_widget(area_block, chunks[2]);

    let instructions = Paragraph::new("(cima/baixo) rolar | PgUp/PgDn | (b) voltar | (esc) sair")
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[3]);
}

fn ui(app: &mut App, f: &mut Frame) {
    match app.state {
        AppState::Exam | AppState::Results => {
            f.render_widget(&*app, f.area());
        }
        AppState::History => {
            render_history(app, f);
        }
    }
}
