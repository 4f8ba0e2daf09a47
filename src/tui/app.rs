//! Main TUI application state machine.
//!
//! Two screens: the input form and the per-model results. Prediction runs
//! synchronously on submit.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::application::InferenceService;
use crate::domain::PredictionReport;

use super::ui::{
    form::{render_form, FormState},
    render_disclaimer,
    results::render_results,
};

/// Current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Form,
    Results,
}

/// Main application state
pub struct App<'a> {
    screen: Screen,
    should_quit: bool,
    service: &'a InferenceService,
    form_state: FormState,
    /// Report shown on the results screen
    report: Option<PredictionReport>,
}

impl<'a> App<'a> {
    #[must_use]
    pub fn new(service: &'a InferenceService) -> Self {
        Self {
            screen: Screen::Form,
            should_quit: false,
            service,
            form_state: FormState::default(),
            report: None,
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let result = self.main_loop(&mut terminal);

        // Restore the terminal even if the loop failed
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        while !self.should_quit {
            self.draw(terminal)?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }
        }

        Ok(())
    }

    fn draw<B: Backend>(&self, terminal: &mut Terminal<B>) -> Result<()> {
        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(3)])
                .split(f.area());

            match (self.screen, &self.report) {
                (Screen::Results, Some(report)) => render_results(f, chunks[0], report),
                _ => render_form(f, chunks[0], &self.form_state),
            }

            render_disclaimer(f, chunks[1]);
        })?;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Form => self.handle_form_key(key),
            Screen::Results => self.handle_results_key(key),
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.form_state.reset(),
            KeyCode::Up | KeyCode::BackTab => self.form_state.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.form_state.next_field(),
            KeyCode::Left => self.form_state.cycle_choice(false),
            KeyCode::Right => self.form_state.cycle_choice(true),
            KeyCode::Char(c) => self.form_state.input_char(c),
            KeyCode::Backspace => self.form_state.delete_char(),
            KeyCode::Delete => self.form_state.clear_field(),
            KeyCode::Enter => self.submit_form(),
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyCode) {
        if matches!(key, KeyCode::Enter | KeyCode::Esc) {
            // Form values are kept for the next request
            self.report = None;
            self.screen = Screen::Form;
        }
    }

    fn submit_form(&mut self) {
        let input = match self.form_state.to_raw_input() {
            Ok(input) => input,
            Err(message) => {
                self.form_state.error_message = Some(message);
                return;
            }
        };

        match self.service.predict(&input) {
            Ok(report) => {
                self.form_state.error_message = None;
                self.report = Some(report);
                self.screen = Screen::Results;
            }
            Err(e) => {
                tracing::error!("Prediction failed: {}", e);
                self.form_state.error_message = Some(e.to_string());
            }
        }
    }
}
