use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};
use tracing::info;

use crate::cli::load_store;
use crate::error::Result;
use crate::settings::{load_or_default, save_settings};
use crate::sorter::{sortable_list, Response, SortSession};
use crate::tui::{init_terminal, money_span, ERROR_STYLE, FOOTER_STYLE, HEADER_STYLE, OK_STYLE};

/// Offer the exit hint once little is left or plenty has been done.
const EXIT_HINT_PENDING: usize = 100;
const EXIT_HINT_EDITS: usize = 20;

struct Sorter {
    session: SortSession,
    top_n: usize,
    input: String,
    message: Option<(String, Style)>,
}

enum HandleResult {
    Continue,
    Done,
}

impl Sorter {
    fn new(session: SortSession, top_n: usize) -> Self {
        Self {
            session,
            top_n,
            input: String::new(),
            message: None,
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, table_area, help_area, message_area, input_area, hints_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Fill(1),
                Constraint::Length(4),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(area);

        let pending = self.session.pending_count();
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Uncategorized expenses", HEADER_STYLE),
                Span::styled(
                    format!(
                        "  {pending} remaining, {} edits, {} rules",
                        self.session.edits(),
                        self.session.rules().len()
                    ),
                    FOOTER_STYLE,
                ),
            ])),
            header_area,
        );

        let view = self.session.uncategorized_view(self.top_n);
        let rows: Vec<Row> = view
            .iter()
            .map(|p| {
                Row::new(vec![
                    Cell::from(p.count.to_string()),
                    Cell::from(p.description.clone()),
                    Cell::from(money_span(p.total)),
                ])
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Fill(1),
                Constraint::Length(14),
            ],
        )
        .header(Row::new(vec!["Count", "Description", "Total"]).style(Style::default().bold()));
        frame.render_widget(table, table_area);

        let mut help = vec![
            Line::from(Span::styled(
                format!("Categories: {}", sortable_list()),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "Type EXPENSE:CATEGORY, e.g. amzn:personal, sunoco:car, discover des:credit",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "Type undo to revert the last change (once).",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        if pending < EXIT_HINT_PENDING || self.session.edits() >= EXIT_HINT_EDITS {
            help.push(Line::from(Span::styled(
                "Type exit when you're done sorting.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        frame.render_widget(Paragraph::new(help), help_area);

        if let Some((msg, style)) = &self.message {
            frame.render_widget(
                Paragraph::new(Span::styled(msg.clone(), *style)),
                message_area,
            );
        }

        frame.render_widget(
            Paragraph::new(format!("> {}\u{2588}", self.input)),
            input_area,
        );
        frame.render_widget(
            Paragraph::new("Enter=submit, Backspace=delete, Ctrl+C=save and quit").style(FOOTER_STYLE),
            hints_area,
        );
    }

    fn handle_key(&mut self, code: KeyCode) -> HandleResult {
        match code {
            KeyCode::Char(c) => {
                self.input.push(c);
                HandleResult::Continue
            }
            KeyCode::Backspace => {
                self.input.pop();
                HandleResult::Continue
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.input);
                self.submit(&line)
            }
            _ => HandleResult::Continue,
        }
    }

    fn submit(&mut self, line: &str) -> HandleResult {
        self.message = match self.session.handle(line) {
            Response::Exit => return HandleResult::Done,
            Response::Categorized {
                trigger,
                category,
                rows,
            } => Some((
                format!("'{trigger}' \u{2192} {category} ({rows} rows)"),
                OK_STYLE,
            )),
            Response::Undone { trigger, category } => Some((
                format!("Removed '{trigger}' from {category}"),
                OK_STYLE,
            )),
            Response::Rejected(e) => Some((e.to_string(), ERROR_STYLE)),
        };
        HandleResult::Continue
    }
}

/// Drive the sorting screen until the user exits. Ctrl+C counts as exit.
fn run_screen(sorter: &mut Sorter) -> Result<()> {
    let mut terminal = init_terminal();

    let result = loop {
        if let Err(e) = terminal.draw(|frame| sorter.draw(frame)) {
            break Err(e.into());
        }
        let ev = match event::read() {
            Ok(ev) => ev,
            Err(e) => break Err(e.into()),
        };
        if let Event::Key(key) = ev {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                break Ok(());
            }
            if let HandleResult::Done = sorter.handle_key(key.code) {
                break Ok(());
            }
        }
    };

    ratatui::restore();
    result
}

pub fn run(dir: Option<&str>) -> Result<()> {
    let mut settings = load_or_default()?;
    let mut loaded = load_store(&settings, dir)?;

    if loaded.categorized.uncategorized == 0 {
        println!("Nothing to sort. Every expense already has a category.");
        return Ok(());
    }
    println!("{} uncategorized transactions", loaded.categorized.uncategorized);

    let session = SortSession::new(settings.categories.clone(), loaded.store.rows().to_vec());
    let mut sorter = Sorter::new(session, settings.top_n);
    let screen = run_screen(&mut sorter);

    // Rules entered before a terminal error are still saved.
    let edits = sorter.session.edits();
    settings.categories = sorter.session.finish();
    save_settings(&settings)?;
    screen?;

    let result = loaded.store.categorize(&settings.categories);
    info!(edits, "sort session saved");
    println!(
        "Saved {edits} edits. {} categorized, {} still uncategorized.",
        result.categorized, result.uncategorized
    );
    Ok(())
}
