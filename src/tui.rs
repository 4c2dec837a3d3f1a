use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::analysis;
use crate::comfy_table::{format_price, format_range, format_timestamp};
use crate::liquidity::LiquidityRangeMetrics;
use crate::pair::PairReport;
use crate::screener::OutputData;
use crate::stage::Stage;
use crate::storage_utils::AsyncStorageManager;
use crate::timeframe::{TimeframeAnalysis, Timeframe};

// --- App State ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Stages,
    Pairs,
}

impl View {
    fn title(&self) -> &'static str {
        match self {
            View::Stages => "Trend Stages",
            View::Pairs => "Pair Ranges",
        }
    }
}

const VIEWS: [View; 2] = [View::Stages, View::Pairs];

struct App {
    data: OutputData,
    is_refreshing: bool,
    selected_view_index: usize,
    /// Show pair ranges quoted the other way round.
    flip_pairs: bool,
}

impl App {
    async fn new() -> Self {
        let data = load_data().await.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "no results yet");
            OutputData::default()
        });
        Self {
            data,
            is_refreshing: false,
            selected_view_index: 0,
            flip_pairs: false,
        }
    }

    fn set_data(&mut self, new_data: OutputData) {
        self.data = new_data;
        self.is_refreshing = false;
    }

    fn view(&self) -> View {
        VIEWS[self.selected_view_index]
    }

    /// Ranges of a pair in the direction currently on screen.
    fn displayed_ranges(&self, pair: &PairReport) -> Option<LiquidityRangeMetrics> {
        pair.ranges.map(|r| if self.flip_pairs { r.invert() } else { r })
    }
}

// --- Data Loading ---

pub async fn load_data() -> Result<OutputData> {
    let storage = AsyncStorageManager::new_relative("storage").await?;
    storage.load("results").await
}

// --- TUI ---

pub async fn run_tui() -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>) -> Result<()> {
    let (data_tx, mut data_rx) = mpsc::channel::<Result<OutputData>>(1);
    let mut app = App::new().await;

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if let Ok(result) = data_rx.try_recv() {
            match result {
                Ok(new_data) => app.set_data(new_data),
                Err(e) => {
                    tracing::warn!(error = %e, "refresh failed");
                    app.is_refreshing = false;
                }
            }
        }

        if event::poll(Duration::from_millis(50))? {
            // resize events need no handling; the next draw picks up the new size
            if let Event::Key(key) = event::read()? {
                if !handle_key_event(key, &mut app, &data_tx) {
                    return Ok(());
                }
            }
        }
    }
}

fn handle_key_event(key: KeyEvent, app: &mut App, tx: &mpsc::Sender<Result<OutputData>>) -> bool {
    match key.code {
        KeyCode::Char('q') => return false,
        KeyCode::F(5) if !app.is_refreshing => {
            app.is_refreshing = true;
            let tx_clone = tx.clone();
            tokio::spawn(async move {
                let result = match analysis::run_analysis_pipeline().await {
                    Ok(_) => load_data().await,
                    Err(e) => Err(e),
                };
                let _ = tx_clone.send(result).await;
            });
        }
        KeyCode::Char('i') => app.flip_pairs = !app.flip_pairs,
        KeyCode::Up => {
            app.selected_view_index = app
                .selected_view_index
                .checked_sub(1)
                .unwrap_or(VIEWS.len() - 1);
        }
        KeyCode::Down => {
            app.selected_view_index = (app.selected_view_index + 1) % VIEWS.len();
        }
        KeyCode::Char(c) => {
            if let Some(digit) = c.to_digit(10) {
                if digit > 0 && digit <= VIEWS.len() as u32 {
                    app.selected_view_index = (digit - 1) as usize;
                }
            }
        }
        _ => {}
    }
    true
}

/// Terminal colour per stage.
fn stage_color(stage: Stage) -> Color {
    match stage {
        Stage::Accumulation => Color::Cyan,
        Stage::Bullish => Color::Green,
        Stage::Distribution => Color::Yellow,
        Stage::Bearish => Color::Red,
    }
}

fn timeframe_cell(analysis: Option<&TimeframeAnalysis>) -> Cell<'static> {
    match analysis {
        Some(a) => Cell::from(format!("{} {:.0}", a.stage.name(), a.rsi))
            .style(Style::default().fg(stage_color(a.stage))),
        None => Cell::from("n/a").style(Style::default().fg(Color::DarkGray)),
    }
}

fn stage_rows(app: &App) -> (Row<'static>, Vec<Row<'static>>, Vec<Constraint>) {
    let header = Row::new(["Asset", "Price", "MA20", "Daily", "Weekly", "Monthly", "S1", "R1"])
        .style(Style::default().bg(Color::DarkGray));

    let rows = app
        .data
        .assets
        .iter()
        .map(|asset| {
            let symbol = Cell::from(asset.symbol.clone()).style(Style::default().fg(Color::Rgb(0, 255, 255)));
            let Some(market) = &asset.market else {
                return Row::new([
                    symbol,
                    Cell::from("insufficient data").style(Style::default().fg(Color::DarkGray)),
                ]);
            };
            let daily = &market.daily;
            let mut cells = vec![
                symbol,
                Cell::from(format_price(daily.price)),
                Cell::from(format_price(daily.ma20)),
            ];
            cells.extend(Timeframe::all().iter().map(|&tf| timeframe_cell(market.get(tf))));
            cells.push(Cell::from(format_price(daily.pivots.s1)));
            cells.push(Cell::from(format_price(daily.pivots.r1)));
            Row::new(cells)
        })
        .collect();

    let widths = vec![
        Constraint::Percentage(14),
        Constraint::Percentage(11),
        Constraint::Percentage(11),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Percentage(11),
        Constraint::Percentage(11),
    ];
    (header, rows, widths)
}

fn pair_rows(app: &App) -> (Row<'static>, Vec<Row<'static>>, Vec<Constraint>) {
    let header = Row::new(["Pair", "Corr", "Ratio", "Vol %", "Conservative", "Aggressive", "Acquisition"])
        .style(Style::default().bg(Color::DarkGray));

    let rows = app
        .data
        .pairs
        .iter()
        .map(|pair| {
            let ranges = app.displayed_ranges(pair);
            let name = match &ranges {
                Some(r) if r.inverted => format!("{}/{}", pair.quote, pair.base),
                _ => format!("{}/{}", pair.base, pair.quote),
            };
            let correlation = pair
                .correlation
                .map(|r| format!("{r:+.3}"))
                .unwrap_or_else(|| "n/a".to_string());

            let mut cells = vec![
                Cell::from(name).style(Style::default().fg(Color::Rgb(0, 255, 255))),
                Cell::from(correlation),
            ];
            match ranges {
                Some(r) => cells.extend([
                    Cell::from(format_price(r.current)),
                    Cell::from(format!("{:.2}", r.volatility)),
                    Cell::from(format_range(&r.conservative)).style(Style::default().fg(Color::Green)),
                    Cell::from(format_range(&r.aggressive)).style(Style::default().fg(Color::Yellow)),
                    Cell::from(format_range(&r.acquisition)).style(Style::default().fg(Color::Magenta)),
                ]),
                None => cells.push(
                    Cell::from("no data for this period").style(Style::default().fg(Color::DarkGray)),
                ),
            }
            Row::new(cells)
        })
        .collect();

    let widths = vec![
        Constraint::Percentage(14),
        Constraint::Percentage(8),
        Constraint::Percentage(11),
        Constraint::Percentage(7),
        Constraint::Percentage(20),
        Constraint::Percentage(20),
        Constraint::Percentage(20),
    ];
    (header, rows, widths)
}

fn ui(f: &mut Frame, app: &App) {
    let main_layout = Layout::horizontal([Constraint::Percentage(18), Constraint::Percentage(82)])
        .split(f.size());

    let right_chunks =
        Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).split(main_layout[1]);

    let sidebar_block = Block::default().borders(Borders::ALL);
    let inner_sidebar_area = sidebar_block.inner(main_layout[0]);
    f.render_widget(sidebar_block, main_layout[0]);

    let sidebar_chunks = Layout::vertical([
        Constraint::Min(1),    // view list
        Constraint::Length(2), // key help
    ])
    .split(inner_sidebar_area);

    let view_lines: Vec<Line> = VIEWS
        .iter()
        .enumerate()
        .map(|(i, view)| {
            let line = Line::from(format!("{}. {}", i + 1, view.title()));
            if i == app.selected_view_index {
                line.style(Style::default().fg(Color::Yellow).bg(Color::DarkGray))
            } else {
                line
            }
        })
        .collect();

    f.render_widget(Paragraph::new(view_lines), sidebar_chunks[0]);
    f.render_widget(
        Paragraph::new("F5 refresh\ni invert pairs").alignment(Alignment::Center),
        sidebar_chunks[1],
    );

    f.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .title_alignment(Alignment::Center)
            .title(format!(
                "Last Updated: {}",
                format_timestamp(app.data.last_updated_timestamp)
            )),
        right_chunks[0],
    );

    let view = app.view();
    let (header, rows, widths) = match view {
        View::Stages => stage_rows(app),
        View::Pairs => pair_rows(app),
    };
    f.render_widget(
        Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(view.title())),
        right_chunks[1],
    );

    if app.is_refreshing {
        let area = centered_rect(60, 20, main_layout[1]);
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new("Running analysis pipeline...\nPlease wait.")
                .block(Block::default().title("Refreshing").borders(Borders::ALL))
                .alignment(Alignment::Center),
            area,
        );
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);
    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        App {
            data: OutputData::default(),
            is_refreshing: false,
            selected_view_index: 0,
            flip_pairs: false,
        }
    }

    #[test]
    fn keys_switch_views_and_flip_pairs() {
        let (tx, _rx) = mpsc::channel(1);
        let mut app = app();
        let press = |code| KeyEvent::new(code, KeyModifiers::NONE);

        assert!(handle_key_event(press(KeyCode::Down), &mut app, &tx));
        assert_eq!(app.view(), View::Pairs);
        assert!(handle_key_event(press(KeyCode::Down), &mut app, &tx));
        assert_eq!(app.view(), View::Stages);
        assert!(handle_key_event(press(KeyCode::Up), &mut app, &tx));
        assert_eq!(app.view(), View::Pairs);
        assert!(handle_key_event(press(KeyCode::Char('1')), &mut app, &tx));
        assert_eq!(app.view(), View::Stages);
        assert!(handle_key_event(press(KeyCode::Char('9')), &mut app, &tx));
        assert_eq!(app.view(), View::Stages);

        assert!(handle_key_event(press(KeyCode::Char('i')), &mut app, &tx));
        assert!(app.flip_pairs);
        assert!(!handle_key_event(press(KeyCode::Char('q')), &mut app, &tx));
    }

    #[test]
    fn draws_both_views_on_empty_data() {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        let mut app = app();
        terminal.draw(|f| ui(f, &app)).unwrap();
        app.selected_view_index = 1;
        app.is_refreshing = true;
        terminal.draw(|f| ui(f, &app)).unwrap();
    }
}
