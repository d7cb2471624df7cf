use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use rubric_brackets::{validate_no_overlaps, Rubric, RubricEditor};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Rubrics,
    Brackets,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Rubrics => Page::Brackets,
            Page::Brackets => Page::Rubrics,
        }
    }

    pub fn previous(&self) -> Self {
        // Two pages: previous == next
        self.next()
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Rubrics => "Rubrics",
            Page::Brackets => "Score Brackets",
        }
    }
}

/// One stored rubric with its content already parsed for display
pub struct RubricRow {
    pub rubric: Rubric,
    pub editor: RubricEditor,
}

impl RubricRow {
    pub fn new(rubric: Rubric) -> Self {
        let editor = RubricEditor::from_rubric(&rubric);
        RubricRow { rubric, editor }
    }

    pub fn status(&self) -> RubricStatus {
        if self.editor.unparsed().is_some() {
            RubricStatus::Legacy
        } else if !validate_no_overlaps(self.editor.brackets()) {
            RubricStatus::Overlapping
        } else if self.editor.coverage().is_valid {
            RubricStatus::Complete
        } else {
            RubricStatus::Incomplete
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RubricStatus {
    Complete,
    Incomplete,
    Overlapping,
    /// Free text with no score table
    Legacy,
}

impl RubricStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RubricStatus::Complete => "COMPLETE",
            RubricStatus::Incomplete => "GAPS",
            RubricStatus::Overlapping => "OVERLAP",
            RubricStatus::Legacy => "LEGACY",
        }
    }

    fn color(&self) -> Color {
        match self {
            RubricStatus::Complete => Color::Green,
            RubricStatus::Incomplete => Color::Yellow,
            RubricStatus::Overlapping => Color::Red,
            RubricStatus::Legacy => Color::DarkGray,
        }
    }
}

pub struct App {
    pub rows: Vec<RubricRow>,
    pub state: TableState,
    pub bracket_state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
}

impl App {
    pub fn new(rubrics: Vec<Rubric>) -> Self {
        let rows: Vec<RubricRow> = rubrics.into_iter().map(RubricRow::new).collect();

        let mut state = TableState::default();
        if !rows.is_empty() {
            state.select(Some(0));
        }

        let mut app = Self {
            rows,
            state,
            bracket_state: TableState::default(),
            current_page: Page::Rubrics,
            show_detail: false,
        };
        app.reset_bracket_selection();
        app
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_row(&self) -> Option<&RubricRow> {
        self.state.selected().and_then(|i| self.rows.get(i))
    }

    fn bracket_count(&self) -> usize {
        self.selected_row().map(|r| r.editor.brackets().len()).unwrap_or(0)
    }

    fn reset_bracket_selection(&mut self) {
        let selection = if self.bracket_count() > 0 { Some(0) } else { None };
        self.bracket_state.select(selection);
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn active_len(&self) -> usize {
        match self.current_page {
            Page::Rubrics => self.rows.len(),
            Page::Brackets => self.bracket_count(),
        }
    }

    fn active_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Rubrics => &mut self.state,
            Page::Brackets => &mut self.bracket_state,
        }
    }

    fn select(&mut self, index: usize) {
        self.active_state().select(Some(index));
        if self.current_page == Page::Rubrics {
            self.reset_bracket_selection();
        }
    }

    pub fn next(&mut self) {
        let len = self.active_len();
        if len == 0 {
            return;
        }
        let i = match self.active_state().selected() {
            Some(i) if i < len - 1 => i + 1,
            _ => 0,
        };
        self.select(i);
    }

    pub fn previous(&mut self) {
        let len = self.active_len();
        if len == 0 {
            return;
        }
        let i = match self.active_state().selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.select(i);
    }

    pub fn first(&mut self) {
        if self.active_len() > 0 {
            self.select(0);
        }
    }

    pub fn last(&mut self) {
        let len = self.active_len();
        if len > 0 {
            self.select(len - 1);
        }
    }

    pub fn stats(&self) -> RubricStats {
        let mut stats = RubricStats {
            total: self.rows.len(),
            ..Default::default()
        };

        for row in &self.rows {
            match row.status() {
                RubricStatus::Complete => stats.complete += 1,
                RubricStatus::Incomplete => stats.incomplete += 1,
                RubricStatus::Overlapping => stats.overlapping += 1,
                RubricStatus::Legacy => stats.legacy += 1,
            }
        }

        stats
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RubricStats {
    pub total: usize,
    pub complete: usize,
    pub incomplete: usize,
    pub overlapping: usize,
    pub legacy: usize,
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Rubrics if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);

            render_rubric_table(f, content_chunks[0], app);
            render_content_panel(f, content_chunks[1], app);
        }
        Page::Rubrics => render_rubric_table(f, chunks[1], app),
        Page::Brackets => render_brackets(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();

    let mut tab_spans = vec![];
    for (i, page) in [Page::Rubrics, Page::Brackets].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Rubrics: {}", stats.total),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("✓ {}", stats.complete),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("… {}", stats.incomplete),
        Style::default().fg(Color::Yellow),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("✗ {}", stats.overlapping),
        Style::default().fg(Color::Red),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_rubric_table(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.rows.iter().map(|row| {
        let status = row.status();
        let cells = vec![
            Cell::from(row.rubric.id.to_string()),
            Cell::from(truncate(&row.rubric.name, 30)),
            Cell::from(row.rubric.total_score.to_string()),
            Cell::from(row.editor.brackets().len().to_string()),
            Cell::from(format!("{}%", row.editor.coverage_percentage())),
            Cell::from(status.label()).style(Style::default().fg(status.color())),
            Cell::from(row.rubric.created_at.format("%Y-%m-%d").to_string()),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(32),
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["ID", "Name", "Total", "Brackets", "Coverage", "Status", "Created"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Rubrics "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_content_panel(f: &mut Frame, area: Rect, app: &App) {
    let text = match app.selected_row() {
        Some(row) => row.rubric.content.clone(),
        None => "No rubric selected".to_string(),
    };

    let panel = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Stored Content "),
        );

    f.render_widget(panel, area);
}

fn render_brackets(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Coverage gauge
            Constraint::Min(5),    // Bracket table
            Constraint::Length(7), // Gaps + note
        ])
        .split(area);

    let Some(row) = app.state.selected().and_then(|i| app.rows.get(i)) else {
        let empty = Paragraph::new("No rubric selected")
            .block(Block::default().borders(Borders::ALL).title(" Score Brackets "));
        f.render_widget(empty, area);
        return;
    };

    let percentage = row.editor.coverage_percentage();
    let gauge_color = match row.status() {
        RubricStatus::Complete => Color::Green,
        RubricStatus::Overlapping => Color::Red,
        _ => Color::Yellow,
    };
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Score Coverage: {} (0-{}) ", row.rubric.name, row.rubric.total_score)),
        )
        .gauge_style(Style::default().fg(gauge_color))
        .percent(row.editor.progress_width())
        .label(format!("{}%", percentage));
    f.render_widget(gauge, chunks[0]);

    let bracket_rows: Vec<Row> = row
        .editor
        .brackets()
        .iter()
        .map(|b| {
            Row::new(vec![
                Cell::from(b.range_label()),
                Cell::from(b.point_count().to_string()),
                Cell::from(b.criteria.clone()),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        bracket_rows,
        [Constraint::Length(10), Constraint::Length(8), Constraint::Min(20)],
    )
    .header(header_row(&["Range", "Points", "Criteria"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Brackets "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    let mut lines = Vec::new();
    let coverage = row.editor.coverage();
    if coverage.is_valid {
        lines.push(Line::from(Span::styled(
            "All scores covered",
            Style::default().fg(Color::Green),
        )));
    } else {
        lines.push(Line::from(vec![
            Span::styled("Missing: ", Style::default().fg(Color::Yellow)),
            Span::raw(coverage.missing_summary()),
        ]));
    }
    if !validate_no_overlaps(row.editor.brackets()) {
        lines.push(Line::from(Span::styled(
            "Brackets overlap",
            Style::default().fg(Color::Red),
        )));
    }
    if let Some(note) = &row.editor.form().note {
        lines.push(Line::from(vec![
            Span::styled("Note: ", Style::default().fg(Color::Cyan)),
            Span::raw(note.clone()),
        ]));
    }
    if let Some(raw) = row.editor.unparsed() {
        lines.push(Line::from(vec![
            Span::styled("Unparsed: ", Style::default().fg(Color::DarkGray)),
            Span::raw(truncate(raw, 200)),
        ]));
    }

    let footer = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Coverage "));

    f.render_stateful_widget(table, chunks[1], &mut app.bracket_state);
    f.render_widget(footer, chunks[2]);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (selected, total) = match app.current_page {
        Page::Rubrics => (app.state.selected(), app.rows.len()),
        Page::Brackets => (app.bracket_state.selected(), app.bracket_count()),
    };
    let selected = selected.map(|i| i + 1).unwrap_or(0);

    let status_spans = vec![
        Span::styled(format!(" Row: {}/{} ", selected, total), Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Content | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
