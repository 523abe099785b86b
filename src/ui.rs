use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use std::collections::BTreeMap;

use crate::session::{SessionPhase, Simulado, QUESTIONS_PER_PAGE};
use crate::util::{format_clock, percentage};
use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 3;
const VERTICAL_MARGIN: u16 = 1;

fn option_letter(idx: usize) -> char {
    (b'a' + idx as u8) as char
}

/// Correct/total pairs per subject area for one session, area-sorted.
pub fn area_breakdown(simulado: &Simulado) -> Vec<(String, usize, usize)> {
    let mut per_area: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for question in simulado.questions() {
        let entry = per_area.entry(question.area.to_string()).or_insert((0, 0));
        entry.1 += 1;
        if simulado
            .answer(question.id)
            .is_some_and(|a| a.selected_answer == question.correct_answer)
        {
            entry.0 += 1;
        }
    }
    per_area
        .into_iter()
        .map(|(area, (correct, total))| (area, correct, total))
        .collect()
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Exam => render_exam(self, area, buf),
            AppState::Results => render_results(self, area, buf),
            // History has its own full-frame renderer in main.rs
            AppState::History => {}
        }
    }
}

fn render_exam(app: &App, area: Rect, buf: &mut Buffer) {
    let simulado = &app.simulado;

    if simulado.is_paused() && !simulado.is_completed() {
        let paused = Paragraph::new(Span::styled(
            "PAUSADO - relogio parado, respostas bloqueadas na tela. (espaco) retomar",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        paused.render(area, buf);
        return;
    }

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let answered_style = Style::default().patch(bold_style).fg(Color::Green);
    let flag_style = Style::default().fg(Color::Yellow);
    let focus_style = Style::default().patch(bold_style).fg(Color::Cyan);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Min(1),    // questions
            Constraint::Length(1), // legend
        ])
        .split(area);

    let review_banner = if simulado.phase() == SessionPhase::Reviewing {
        "  [REVISAO]"
    } else {
        ""
    };
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("Simulado {}{}", app.bank_label(), review_banner),
            bold_style,
        )),
        Line::from(Span::raw(format!(
            "{}  pagina {}/{}  {}/{} respondidas  {} sinalizadas",
            format_clock(simulado.seconds_remaining()),
            simulado.current_page() + 1,
            simulado.total_pages(),
            simulado.answered_count(),
            simulado.questions().len(),
            simulado.flagged_count(),
        ))),
    ]);
    header.render(chunks[0], buf);

    let mut lines: Vec<Line> = Vec::new();
    for (i, question) in simulado.page_questions().iter().enumerate() {
        let focused = i == app.focus;
        let global_number = simulado.current_page() * QUESTIONS_PER_PAGE + i + 1;
        let record = simulado.answer(question.id);

        let selected_letter = record
            .filter(|r| r.is_answered())
            .and_then(|r| {
                question
                    .options
                    .iter()
                    .position(|o| *o == r.selected_answer)
            })
            .map(option_letter);

        let mut spans: Vec<Span> = Vec::new();
        spans.push(Span::styled(
            if focused { "> " } else { "  " },
            focus_style,
        ));
        spans.push(Span::styled(format!("{:02}. ", global_number), bold_style));
        match selected_letter {
            Some(letter) => spans.push(Span::styled(format!("[{}] ", letter), answered_style)),
            None => spans.push(Span::styled("[ ] ", dim_style)),
        }
        if record.is_some_and(|r| r.is_flagged) {
            spans.push(Span::styled("! ", flag_style));
        }
        spans.push(Span::styled(
            question.prompt.clone(),
            if focused { focus_style } else { Style::default() },
        ));
        spans.push(Span::styled(
            format!("  ({}, {})", question.area, question.year),
            dim_style,
        ));
        lines.push(Line::from(spans));

        // expand the options inline for the focused question only
        if focused {
            for (opt_idx, option) in question.options.iter().enumerate() {
                let selected = record.is_some_and(|r| r.selected_answer == *option);
                let style = if selected {
                    answered_style
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(
                    format!("       ({}) {}", option_letter(opt_idx), option),
                    style,
                )));
            }
            lines.push(Line::from(""));
        }
    }

    let body = Paragraph::new(lines).wrap(Wrap { trim: false });
    body.render(chunks[1], buf);

    let legend = Paragraph::new(Span::styled(
        "(a-e) responder / (cima/baixo) focar / (esq/dir) pagina / (f) sinalizar / (v) revisar / (espaco) pausar / (enter) avancar / (esc) sair",
        Style::default().add_modifier(Modifier::ITALIC),
    ));
    legend.render(chunks[2], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let simulado = &app.simulado;
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // summary
            Constraint::Length(1), // status message
            Constraint::Length(1), // legend
        ])
        .split(area);

    let score = simulado.score();
    let total = simulado.questions().len();
    let unanswered = total - simulado.answered_count();

    let mut lines = vec![
        Line::from(Span::styled("Resumo do simulado", bold_style)),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "Pontuacao: {} de {} ({:.0}%)",
                score,
                total,
                percentage(score, total)
            ),
            bold_style.fg(Color::Green),
        )),
        Line::from(Span::raw(format!(
            "Tempo usado: {}   Sem resposta: {}   Sinalizadas: {}",
            format_clock(simulado.elapsed_secs()),
            unanswered,
            simulado.flagged_count(),
        ))),
        Line::from(""),
        Line::from(Span::styled("Por area:", bold_style)),
    ];

    for (area_name, correct, area_total) in area_breakdown(simulado) {
        lines.push(Line::from(Span::raw(format!(
            "  {}: {}/{} ({:.0}%)",
            area_name,
            correct,
            area_total,
            percentage(correct, area_total)
        ))));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .render(chunks[0], buf);

    if let Some(status) = &app.status {
        Paragraph::new(Span::styled(status.clone(), dim_style)).render(chunks[1], buf);
    }

    let legend = Paragraph::new(Span::styled(
        "(r)efazer / (n)ovo / (e)xportar submissao / (h)istorico / (esc) sair",
        Style::default().add_modifier(Modifier::ITALIC),
    ));
    legend.render(chunks[2], buf);
}
