mod tui_app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};

use evbet_scanner::config::{Config, MIN_EDGE_STEP};
use evbet_scanner::types::{
    option_label, BetRecord, DisplayState, LoadStatus, MARKET_OPTIONS, SPORT_OPTIONS,
};
use tui_app::{format_ev, format_event_time, format_payout, format_pct, truncate, AppState};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    let mut app = AppState::new(cfg);

    // Initial fetch before rendering
    app.refresh().await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();
    table_state.select(None);

    let result = run_loop(&mut terminal, &mut app, &mut table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    table_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(app.cfg.refresh_interval_secs);
    let mut last_tick = std::time::Instant::now();

    loop {
        let visible = app.visible();
        table_state.select(app.selected_index(&visible));
        terminal.draw(|f| render(f, app, &visible, table_state))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh().await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Char('s') => app.criteria.cycle_sport(true),
                        KeyCode::Char('S') => app.criteria.cycle_sport(false),
                        KeyCode::Char('m') => app.criteria.cycle_market(true),
                        KeyCode::Char('M') => app.criteria.cycle_market(false),
                        KeyCode::Char('+') | KeyCode::Char('=') => {
                            app.criteria.adjust_min_edge(MIN_EDGE_STEP)
                        }
                        KeyCode::Char('-') | KeyCode::Char('_') => {
                            app.criteria.adjust_min_edge(-MIN_EDGE_STEP)
                        }
                        KeyCode::Down | KeyCode::Char('j') => app.select_offset(&visible, 1),
                        KeyCode::Up | KeyCode::Char('k') => app.select_offset(&visible, -1),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh().await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, visible: &[BetRecord], table_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | filters | cards | table | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(3), // filter bar
            Constraint::Length(5), // info cards
            Constraint::Min(0),    // opportunities
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, visible, chunks[0]);
    render_filters(f, app, chunks[1]);
    render_cards(f, chunks[2]);
    render_opportunities(f, app, visible, table_state, chunks[3]);
    render_footer(f, app, chunks[4]);
}

fn render_header(f: &mut Frame, app: &AppState, visible: &[BetRecord], area: Rect) {
    let (status_text, status_color) = match app.status {
        LoadStatus::Loading => ("◌ loading".to_string(), Color::Yellow),
        LoadStatus::Loaded => ("● feed ok".to_string(), Color::Green),
        LoadStatus::Failed => ("✗ load failed".to_string(), Color::Red),
    };

    let updated_str = app
        .last_updated(visible)
        .map_or(String::new(), |t| format!("  │  last updated {t}"));

    let title_spans = vec![
        Span::styled(
            " +EV Bet Finder  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} shown / {} loaded", visible.len(), app.records.len()),
            Style::default().fg(Color::White),
        ),
        Span::styled(updated_str, Style::default().fg(Color::White)),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(paragraph, area);
}

fn render_filters(f: &mut Frame, app: &AppState, area: Rect) {
    let line = Line::from(vec![
        Span::styled("Sport: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            option_label(SPORT_OPTIONS, &app.criteria.sport),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   │   "),
        Span::styled("Market: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            option_label(MARKET_OPTIONS, &app.criteria.market),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   │   "),
        Span::styled("Min edge: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:.1}%", app.criteria.min_edge),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " FILTERS ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(paragraph, area);
}

/// Three static, non-interactive informational cards.
fn render_cards(f: &mut Frame, area: Rect) {
    let cards = [
        (
            " EDGE ",
            "Every row shows the percentage edge over the bet's implied probability, precomputed by the feed.",
        ),
        (
            " TRACKING ",
            "The feed is re-read on the refresh interval; line moves and fresh opportunities appear on the next pass.",
        ),
        (
            " PAYOUT ",
            "Decimal payout multipliers help size a stake against the quoted probability.",
        ),
    ];

    let thirds = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(34),
            Constraint::Percentage(33),
        ])
        .split(area);

    for (i, (title, body)) in cards.iter().enumerate() {
        let paragraph = Paragraph::new(*body)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(ratatui::widgets::Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(Span::styled(
                        *title,
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )),
            );
        f.render_widget(paragraph, thirds[i]);
    }
}

fn render_opportunities(
    f: &mut Frame,
    app: &AppState,
    visible: &[BetRecord],
    table_state: &mut TableState,
    area: Rect,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " CURRENT +EV OPPORTUNITIES ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    match app.display_state(visible.len()) {
        DisplayState::Loading => {
            let paragraph = Paragraph::new("Loading opportunities…")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(paragraph, area);
        }
        DisplayState::Empty => {
            let paragraph =
                Paragraph::new("No betting opportunities found matching your criteria.")
                    .style(Style::default().fg(Color::DarkGray))
                    .alignment(Alignment::Center)
                    .block(block);
            f.render_widget(paragraph, area);
        }
        DisplayState::Populated => {
            let table = opportunities_table(visible).block(block);
            f.render_stateful_widget(table, area, table_state);
        }
    }
}

fn opportunities_table<'a>(visible: &'a [BetRecord]) -> Table<'a> {
    let header_cells = ["Event", "Details", "Prob", "Payout", "EV"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = visible
        .iter()
        .map(|r| {
            let start = r
                .event_start_secs
                .map(format_event_time)
                .unwrap_or_else(|| "—".to_string());

            let event = Text::from(vec![
                Line::from(Span::styled(
                    truncate(&r.market_name, 34),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    truncate(&r.competition, 34),
                    Style::default().fg(Color::DarkGray),
                )),
                Line::from(Span::styled(
                    format!("{start} · {}", r.sport),
                    Style::default().fg(Color::DarkGray),
                )),
            ]);

            let details = Text::from(vec![
                Line::from(Span::styled(
                    truncate(&r.participant, 26),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    truncate(&r.market_type, 26),
                    Style::default().fg(Color::DarkGray),
                )),
                Line::from(Span::styled(
                    truncate(&r.source, 26),
                    Style::default().fg(Color::DarkGray),
                )),
            ]);

            let ev_color = if r.ev >= 5.0 {
                Color::Green
            } else if r.ev >= 0.0 {
                Color::LightGreen
            } else {
                Color::Red
            };

            Row::new(vec![
                Cell::from(event),
                Cell::from(details),
                Cell::from(Text::from(format_pct(r.implied_probability)).alignment(Alignment::Center)),
                Cell::from(Text::from(format_payout(r.outcome_payout)).alignment(Alignment::Center)),
                Cell::from(
                    Text::from(format_ev(r.ev))
                        .style(Style::default().fg(ev_color).add_modifier(Modifier::BOLD))
                        .alignment(Alignment::Center),
                ),
            ])
            .height(3)
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Min(28),
            Constraint::Min(20),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[s/S m/M] ", Style::default().fg(Color::Yellow)),
        Span::raw("cycle sport/market  "),
        Span::styled("[+ -] ", Style::default().fg(Color::Yellow)),
        Span::raw("min edge  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("scroll  "),
        Span::styled(
            format!("auto-refresh: {}s", app.cfg.refresh_interval_secs),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
