//! Per-model results view.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::domain::PredictionReport;
use crate::tui::styles::ClinicalTheme;

pub fn render_results(f: &mut Frame, area: Rect, report: &PredictionReport) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_results_header(f, chunks[0], report);
    render_results_table(f, chunks[1], report);
    render_results_footer(f, chunks[2]);
}

fn render_results_header(f: &mut Frame, area: Rect, report: &PredictionReport) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("Prediction Results", ClinicalTheme::title()),
        Span::styled(
            format!(" │ {}", report.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
            ClinicalTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_results_table(f: &mut Frame, area: Rect, report: &PredictionReport) {
    let header = Row::new(vec!["Model", "Prediction", "P(disease)"])
        .style(ClinicalTheme::subtitle())
        .bottom_margin(1);

    let rows = report.predictions.iter().map(|p| {
        let probability = p
            .probability
            .map_or_else(|| "n/a".to_string(), |v| format!("{:.1}%", v * 100.0));
        Row::new(vec![
            Cell::from(Span::styled(p.model.clone(), ClinicalTheme::text())),
            Cell::from(Span::styled(
                p.verdict.description(),
                ClinicalTheme::verdict(p.verdict),
            )),
            Cell::from(Span::styled(probability, ClinicalTheme::text_secondary())),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(22),
            Constraint::Length(28),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(Span::styled(" Model Verdicts ", ClinicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::border_focused()),
    );

    f.render_widget(table, area);
}

fn render_results_footer(f: &mut Frame, area: Rect) {
    let content = Line::from(vec![
        Span::styled("[Enter] ", ClinicalTheme::key_hint()),
        Span::styled("Back to Form ", ClinicalTheme::key_desc()),
        Span::styled("[Ctrl+Q] ", ClinicalTheme::key_hint()),
        Span::styled("Quit", ClinicalTheme::key_desc()),
    ]);

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(footer, area);
}
