//! Patient input form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::{Attribute, AttributeKind, RawInput, RawValue};
use crate::tui::styles::ClinicalTheme;

/// Editable value of one form field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    /// Free text, parsed on submit
    Numeric { buffer: String, min: f64, max: f64 },
    /// One of a fixed set of labels
    Choice {
        options: Vec<&'static str>,
        selected: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub attribute: Attribute,
    pub input: FieldInput,
}

impl FormField {
    fn new(attribute: Attribute, value: RawValue<'_>) -> Self {
        let input = match attribute.kind() {
            AttributeKind::Numeric { min, max, step } => FieldInput::Numeric {
                buffer: match value {
                    RawValue::Numeric(v) => format_number(v, step),
                    RawValue::Label(label) => label.to_string(),
                },
                min,
                max,
            },
            AttributeKind::Categorical(_) => {
                let options = attribute.labels();
                let selected = match value {
                    RawValue::Label(label) => options.iter().position(|o| *o == label).unwrap_or(0),
                    RawValue::Numeric(_) => 0,
                };
                FieldInput::Choice { options, selected }
            }
        };
        Self { attribute, input }
    }

    /// Text shown inside the field.
    #[must_use]
    pub fn display(&self) -> &str {
        match &self.input {
            FieldInput::Numeric { buffer, .. } => buffer,
            FieldInput::Choice { options, selected } => {
                options.get(*selected).copied().unwrap_or("")
            }
        }
    }

    fn hint(&self) -> String {
        match &self.input {
            FieldInput::Numeric { min, max, .. } => format!("{min} to {max}"),
            FieldInput::Choice { .. } => "←/→ to change".to_string(),
        }
    }
}

fn format_number(value: f64, step: f64) -> String {
    if step < 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.0}")
    }
}

/// Form state: one field per attribute, in slot order.
#[derive(Debug)]
pub struct FormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl Default for FormState {
    fn default() -> Self {
        Self::from_input(&RawInput::default())
    }
}

impl Drop for FormState {
    fn drop(&mut self) {
        self.wipe_buffers();
    }
}

impl FormState {
    #[must_use]
    pub fn from_input(input: &RawInput) -> Self {
        Self {
            fields: Attribute::ALL
                .iter()
                .map(|a| FormField::new(*a, input.value(*a)))
                .collect(),
            selected_field: 0,
            error_message: None,
        }
    }

    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Type into the current field; only numeric fields accept text.
    pub fn input_char(&mut self, c: char) {
        if let FieldInput::Numeric { buffer, .. } = &mut self.fields[self.selected_field].input {
            if c.is_ascii_digit() || c == '.' || c == '-' {
                buffer.push(c);
                self.error_message = None;
            }
        }
    }

    pub fn delete_char(&mut self) {
        if let FieldInput::Numeric { buffer, .. } = &mut self.fields[self.selected_field].input {
            buffer.pop();
        }
    }

    pub fn clear_field(&mut self) {
        if let FieldInput::Numeric { buffer, .. } = &mut self.fields[self.selected_field].input {
            buffer.zeroize();
        }
    }

    /// Step a choice field forward or backward, wrapping around.
    pub fn cycle_choice(&mut self, forward: bool) {
        if let FieldInput::Choice { options, selected } =
            &mut self.fields[self.selected_field].input
        {
            let n = options.len();
            *selected = if forward {
                (*selected + 1) % n
            } else {
                (*selected + n - 1) % n
            };
            self.error_message = None;
        }
    }

    /// Restore every field to its initial value. The old buffers are wiped
    /// when the previous state drops.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn wipe_buffers(&mut self) {
        for field in &mut self.fields {
            if let FieldInput::Numeric { buffer, .. } = &mut field.input {
                buffer.zeroize();
            }
        }
    }

    /// Parse and range-check the fields into a request.
    ///
    /// # Errors
    /// Returns a message naming the first unparsable field, or every value
    /// outside its bounds.
    pub fn to_raw_input(&self) -> Result<RawInput, String> {
        let mut input = RawInput::default();

        for field in &self.fields {
            let label = field.attribute.form_label();
            match (&field.input, field.attribute) {
                (FieldInput::Numeric { buffer, .. }, attribute) => {
                    let value: f64 = buffer
                        .trim()
                        .parse()
                        .map_err(|_| format!("{label}: Invalid number"))?;
                    match attribute {
                        Attribute::Age => input.age = value,
                        Attribute::RestingBP => input.resting_bp = value,
                        Attribute::Cholesterol => input.cholesterol = value,
                        Attribute::MaxHR => input.max_hr = value,
                        Attribute::Oldpeak => input.oldpeak = value,
                        _ => return Err(format!("{label}: not a numeric field")),
                    }
                }
                (FieldInput::Choice { .. }, attribute) => {
                    let value = field.display().to_string();
                    match attribute {
                        Attribute::Sex => input.sex = value,
                        Attribute::ChestPainType => input.chest_pain_type = value,
                        Attribute::FastingBS => input.fasting_bs = value,
                        Attribute::RestingECG => input.resting_ecg = value,
                        Attribute::ExerciseAngina => input.exercise_angina = value,
                        Attribute::StSlope => input.st_slope = value,
                        _ => return Err(format!("{label}: not a choice field")),
                    }
                }
            }
        }

        input.validate().map_err(|errors| errors.join(", "))?;
        Ok(input)
    }
}

pub fn render_form(f: &mut Frame, area: Rect, state: &FormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Fields
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_form_header(f, chunks[0]);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("Heart Disease Prediction", ClinicalTheme::title()),
        Span::styled(" │ Patient Attributes", ClinicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &FormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = state.fields.len().div_ceil(2);

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(f, columns[1], &state.fields[mid..], mid, state.selected_field);
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let (border_style, title_style) = if is_selected {
            (ClinicalTheme::border_focused(), ClinicalTheme::focused())
        } else {
            (ClinicalTheme::border(), ClinicalTheme::text_secondary())
        };

        let block = Block::default()
            .title(Span::styled(
                format!(" {} ", field.attribute.form_label()),
                title_style,
            ))
            .borders(Borders::ALL)
            .border_style(border_style);

        let mut spans = vec![Span::raw(" ")];
        match &field.input {
            FieldInput::Choice { .. } if is_selected => {
                spans.push(Span::styled("◀ ", ClinicalTheme::cursor()));
                spans.push(Span::styled(field.display(), ClinicalTheme::text()));
                spans.push(Span::styled(" ▶", ClinicalTheme::cursor()));
            }
            FieldInput::Numeric { buffer, .. } if buffer.is_empty() => {
                spans.push(Span::styled(field.hint(), ClinicalTheme::text_muted()));
            }
            _ => spans.push(Span::styled(field.display(), ClinicalTheme::text())),
        }
        if is_selected && matches!(field.input, FieldInput::Numeric { .. }) {
            spans.push(Span::styled("▌", ClinicalTheme::cursor()));
        }

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &FormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", ClinicalTheme::danger()),
            Span::styled(err.clone(), ClinicalTheme::danger()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", ClinicalTheme::key_hint()),
            Span::styled("Navigate ", ClinicalTheme::key_desc()),
            Span::styled("[←→] ", ClinicalTheme::key_hint()),
            Span::styled("Change ", ClinicalTheme::key_desc()),
            Span::styled("[Enter] ", ClinicalTheme::key_hint()),
            Span::styled("Predict ", ClinicalTheme::key_desc()),
            Span::styled("[Esc] ", ClinicalTheme::key_hint()),
            Span::styled("Reset ", ClinicalTheme::key_desc()),
            Span::styled("[Ctrl+Q] ", ClinicalTheme::key_hint()),
            Span::styled("Quit", ClinicalTheme::key_desc()),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn select(state: &mut FormState, attribute: Attribute) {
        state.selected_field = attribute.index();
    }

    #[test]
    fn test_defaults_round_trip() {
        let state = FormState::default();
        assert_eq!(state.fields.len(), 11);
        assert_eq!(state.fields[Attribute::Oldpeak.index()].display(), "1.0");
        assert_eq!(state.fields[Attribute::Age.index()].display(), "50");
        assert_eq!(state.to_raw_input(), Ok(RawInput::default()));
    }

    #[test]
    fn test_cycle_choice_wraps() {
        let mut state = FormState::default();
        select(&mut state, Attribute::Sex);
        state.cycle_choice(true);
        assert_eq!(state.fields[1].display(), "Female");
        state.cycle_choice(true);
        assert_eq!(state.fields[1].display(), "Male");
        state.cycle_choice(false);
        assert_eq!(
            state.to_raw_input().expect("valid").sex,
            "Female".to_string()
        );
    }

    #[test]
    fn test_text_only_reaches_numeric_fields() {
        let mut state = FormState::default();
        select(&mut state, Attribute::ChestPainType);
        state.input_char('7');
        assert_eq!(state.fields[2].display(), "Typical Angina");

        select(&mut state, Attribute::Age);
        state.clear_field();
        for c in "6x3".chars() {
            state.input_char(c);
        }
        assert_eq!(state.to_raw_input().expect("valid").age, 63.0);
    }

    #[test]
    fn test_invalid_and_out_of_range_values() {
        let mut state = FormState::default();
        select(&mut state, Attribute::Cholesterol);
        state.clear_field();
        let err = state.to_raw_input().expect_err("empty is invalid");
        assert!(err.contains("Cholesterol"));

        state.input_char('7');
        state.input_char('0');
        state.input_char('0');
        let err = state.to_raw_input().expect_err("700 is out of range");
        assert!(err.contains("out of range"));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut state = FormState::default();
        select(&mut state, Attribute::MaxHR);
        state.delete_char();
        state.next_field();
        state.reset();
        assert_eq!(state.selected_field, 0);
        assert_eq!(state.to_raw_input(), Ok(RawInput::default()));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut state = FormState::default();
        state.prev_field();
        assert_eq!(state.selected_field, 10);
        state.next_field();
        assert_eq!(state.selected_field, 0);
    }

    #[test]
    fn test_renders_every_field() {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).expect("terminal");
        let state = FormState::default();
        terminal
            .draw(|f| render_form(f, f.area(), &state))
            .expect("draw");

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        for attribute in Attribute::ALL {
            assert!(text.contains(attribute.form_label()), "{attribute} missing");
        }
    }
}
