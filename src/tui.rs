use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::ai::{self, OpenAiProvider};
use crate::config::Config;
use crate::db::{Database, StatusFlag};
use crate::models::StoredJob;

struct AppState {
    jobs: Vec<StoredJob>,
    selected: usize,
    scroll_offset: u16,
    status_line: Option<String>,
}

impl AppState {
    fn new(jobs: Vec<StoredJob>) -> Self {
        Self {
            jobs,
            selected: 0,
            scroll_offset: 0,
            status_line: None,
        }
    }

    fn current_job(&self) -> Option<&StoredJob> {
        self.jobs.get(self.selected)
    }

    fn next(&mut self) {
        if !self.jobs.is_empty() && self.selected < self.jobs.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Drop the selected row from the visible list after it was hidden.
    fn remove_current(&mut self) {
        if self.selected < self.jobs.len() {
            self.jobs.remove(self.selected);
        }
        if self.selected >= self.jobs.len() && self.selected > 0 {
            self.selected -= 1;
        }
        self.scroll_offset = 0;
    }
}

pub fn run_dashboard(db: &Database, config: &Config) -> Result<()> {
    let jobs = db.visible_jobs(&config.jobs_tablename)?;
    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    let mut state = AppState::new(jobs);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db, config);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
    config: &Config,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('a') => set_flag(state, db, config, StatusFlag::Applied),
                KeyCode::Char('x') => set_flag(state, db, config, StatusFlag::Rejected),
                KeyCode::Char('i') => set_flag(state, db, config, StatusFlag::Interview),
                KeyCode::Char('h') => {
                    set_flag(state, db, config, StatusFlag::Hidden);
                    state.remove_current();
                    if state.jobs.is_empty() {
                        break;
                    }
                }
                KeyCode::Char('c') => request_cover_letter(state, db, config),
                _ => {}
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn set_flag(state: &mut AppState, db: &Database, config: &Config, flag: StatusFlag) {
    let Some(job) = state.current_job() else { return };
    let id = job.id;
    match db.set_flag(&config.jobs_tablename, id, flag) {
        Ok(true) => {
            if let Some(j) = state.jobs.get_mut(state.selected) {
                match flag {
                    StatusFlag::Applied => j.applied = true,
                    StatusFlag::Rejected => j.rejected = true,
                    StatusFlag::Interview => j.interview = true,
                    StatusFlag::Hidden => j.hidden = true,
                }
            }
            state.status_line = None;
        }
        Ok(false) => state.status_line = Some(format!("Job #{id} no longer exists")),
        Err(e) => state.status_line = Some(format!("Update failed: {e}")),
    }
}

fn request_cover_letter(state: &mut AppState, db: &Database, config: &Config) {
    let Some(job) = state.current_job() else { return };
    let id = job.id;

    let provider = match OpenAiProvider::from_config(config) {
        Ok(provider) => provider,
        Err(e) => {
            state.status_line = Some(format!("Cover letter unavailable: {e}"));
            return;
        }
    };

    state.status_line = Some(format!("Generating cover letter for #{id}..."));
    match ai::generate_cover_letter(db, config, &provider, id) {
        Ok(Some(letter)) => {
            if let Some(j) = state.jobs.get_mut(state.selected) {
                j.cover_letter = Some(letter);
            }
            state.status_line = Some(format!("Cover letter ready for #{id}"));
        }
        Ok(None) => {
            state.status_line = Some("Cover letter skipped, check the log".to_string());
        }
        Err(e) => state.status_line = Some(format!("Cover letter failed: {e}")),
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(65),
        ])
        .split(frame.area());

    // Left panel: job list
    let items: Vec<ListItem> = state
        .jobs
        .iter()
        .map(|job| {
            let marker = flag_marker(job);
            let title = crate::truncate(&job.title, 35);
            ListItem::new(format!("{} #{:<4} {} | {}", marker, job.id, title, job.company))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Jobs ({}) ", state.jobs.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: job detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let footer = state.status_line.clone().unwrap_or_else(|| {
        " j/k:navigate  J/K:scroll  a:applied i:interview x:reject h:hide c:cover letter  q:quit"
            .to_string()
    });
    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area[1]);
}

fn flag_marker(job: &StoredJob) -> &'static str {
    if job.rejected {
        "x"
    } else if job.interview {
        "!"
    } else if job.applied {
        "+"
    } else {
        " "
    }
}

fn build_detail<'a>(state: &'a AppState) -> Text<'a> {
    let Some(job) = state.current_job() else {
        return Text::raw("No job selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        &job.title,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));
    if !job.location.is_empty() {
        lines.push(Line::from(job.location.clone()));
    }
    if !job.posting_date.is_empty() {
        lines.push(Line::from(format!("Posted: {}", job.posting_date)));
    }
    if !job.job_url.is_empty() {
        lines.push(Line::from(format!("URL: {}", job.job_url)));
    }

    let mut status = Vec::new();
    if job.applied {
        status.push("applied");
    }
    if job.interview {
        status.push("interview");
    }
    if job.rejected {
        status.push("rejected");
    }
    if !status.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Status: {}", status.join(", ")),
            Style::default().fg(Color::Cyan),
        )));
    }

    lines.push(Line::from(""));

    if !job.job_description.is_empty() {
        lines.push(Line::from(Span::styled(
            "Description",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&job.job_description, 90).lines() {
            lines.push(Line::from(line.to_string()));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "(No description fetched)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    if let Some(letter) = &job.cover_letter {
        if !letter.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Cover Letter",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for line in textwrap::fill(letter, 90).lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
    }

    Text::from(lines)
}
