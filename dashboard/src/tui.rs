//! Terminal rendering: a node map, a node table and the history side panel

use std::io;
use std::time::Duration;

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle},
        Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState,
    },
    Frame, Terminal,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::detail::DetailFetcher;
use crate::errors::Result;
use crate::metrics::{POLLS_TOTAL, POLL_FAILURES_TOTAL};
use crate::model::Node;
use crate::risk::{classify_opt, RiskClass};
use crate::state::{DashboardState, StateHandle};

/// Map center used until the first nodes arrive (lat, lon)
pub const DEFAULT_CENTER: (f64, f64) = (33.76616017083672, 35.90428950328893);
const DEFAULT_SPAN_DEG: f64 = 0.05;
const MIN_SPAN_DEG: f64 = 0.01;

const FIRE_MARKER: &str = "🔥";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Select { node_id: String, node_name: String },
    ClosePanel,
}

#[derive(Default)]
pub struct App {
    table_state: TableState,
}

impl App {
    pub fn selected(&self) -> usize {
        self.table_state.selected().unwrap_or(0)
    }

    pub fn on_key(&mut self, key: KeyCode, state: &DashboardState) -> Action {
        let last = state.node_count().saturating_sub(1);
        let selected = self.selected().min(last);

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') => Action::Quit,
            KeyCode::Esc if state.panel.open => Action::ClosePanel,
            KeyCode::Esc => Action::Quit,
            KeyCode::Up => {
                self.table_state.select(Some(selected.saturating_sub(1)));
                Action::None
            }
            KeyCode::Down => {
                self.table_state.select(Some((selected + 1).min(last)));
                Action::None
            }
            KeyCode::Home => {
                self.table_state.select(Some(0));
                Action::None
            }
            KeyCode::End => {
                self.table_state.select(Some(last));
                Action::None
            }
            KeyCode::Enter => match state.nodes.get(selected) {
                Some(node) => Action::Select {
                    node_id: node.id.clone(),
                    node_name: node.node_name.clone(),
                },
                None => Action::None,
            },
            _ => Action::None,
        }
    }
}

fn risk_color(class: RiskClass) -> Color {
    let (r, g, b) = class.rgb();
    Color::Rgb(r, g, b)
}

/// Canvas bounds as `(longitude, latitude)` ranges fitted around `nodes`
pub fn map_bounds(nodes: &[Node]) -> ([f64; 2], [f64; 2]) {
    if nodes.is_empty() {
        let (lat, lon) = DEFAULT_CENTER;
        return (
            [lon - DEFAULT_SPAN_DEG, lon + DEFAULT_SPAN_DEG],
            [lat - DEFAULT_SPAN_DEG, lat + DEFAULT_SPAN_DEG],
        );
    }

    (
        fit(nodes.iter().map(|n| n.longitude)),
        fit(nodes.iter().map(|n| n.latitude)),
    )
}

fn fit(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (min, max) = values.fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((max - min) * 0.2).max(MIN_SPAN_DEG);
    [min - pad, max + pad]
}

pub fn render(frame: &mut Frame, app: &mut App, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[0]);

    if app.table_state.selected().is_none() && !state.nodes.is_empty() {
        app.table_state.select(Some(0));
    }

    render_map(frame, body[0], state, app.selected());
    render_nodes(frame, body[1], app, state);
    render_footer(frame, chunks[1], state);

    if state.panel.open {
        render_panel(frame, panel_area(chunks[0]), state);
    }
}

fn panel_area(area: Rect) -> Rect {
    let width = area.width * 2 / 5;
    Rect {
        x: area.x + area.width - width,
        y: area.y,
        width,
        height: area.height,
    }
}

fn render_map(frame: &mut Frame, area: Rect, state: &DashboardState, selected: usize) {
    let (x_bounds, y_bounds) = map_bounds(&state.nodes);
    let radius = (x_bounds[1] - x_bounds[0]) * 0.03;

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(" map "))
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            for (i, node) in state.nodes.iter().enumerate() {
                let color = risk_color(classify_opt(node.risk_level()));
                ctx.draw(&Circle {
                    x: node.longitude,
                    y: node.latitude,
                    radius,
                    color,
                });
                if i == selected {
                    ctx.draw(&Circle {
                        x: node.longitude,
                        y: node.latitude,
                        radius: radius * 1.5,
                        color: Color::White,
                    });
                }

                let mut label = vec![Span::styled(
                    node.node_name.clone(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )];
                if node.on_fire() {
                    label.push(Span::raw(format!(" {FIRE_MARKER}")));
                }
                ctx.print(node.longitude + radius * 1.6, node.latitude, Line::from(label));
            }
        });

    frame.render_widget(canvas, area);
}

fn render_nodes(frame: &mut Frame, area: Rect, app: &mut App, state: &DashboardState) {
    let header = Row::new(vec!["Node", "Fire Risk", "Fire", "Lat", "Lon"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = state.nodes.iter().map(|node| {
        let class = classify_opt(node.risk_level());
        Row::new(vec![
            Cell::from(node.node_name.clone()),
            Cell::from(class.label).style(Style::default().fg(risk_color(class))),
            Cell::from(if node.on_fire() { FIRE_MARKER } else { "" }),
            Cell::from(format!("{:.4}", node.latitude)),
            Cell::from(format!("{:.4}", node.longitude)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(19),
            Constraint::Length(4),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" nodes ({}) ", state.node_count())),
    )
    .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_panel(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let title = if state.panel.node_name.is_empty() {
        " Node ".to_string()
    } else {
        format!(" {}'s Node ", state.panel.node_name)
    };

    let header = Row::new(vec![
        "#",
        "Temperature",
        "Humidity",
        "Smoke Value",
        "Date",
        "Fire Risk",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let number = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    let rows = state.panel.readings.iter().enumerate().map(|(i, reading)| {
        let class = classify_opt(reading.fire_risk_level);
        Row::new(vec![
            Cell::from((i + 1).to_string()),
            Cell::from(number(reading.temperature)),
            Cell::from(number(reading.humidity)),
            Cell::from(number(reading.smoke_value)),
            Cell::from(reading.display_timestamp()),
            Cell::from(class.label).style(Style::default().fg(risk_color(class))),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(11),
            Constraint::Length(8),
            Constraint::Length(11),
            Constraint::Length(19),
            Constraint::Min(19),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_bottom(" Esc close "),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(table, area);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let updated = match state.last_update {
        Some(at) => format!("updated {}s ago", at.elapsed().as_secs()),
        None => "waiting for data".to_string(),
    };

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("polls {} ", POLLS_TOTAL.get() as u64),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("failed {} ", POLL_FAILURES_TOTAL.get() as u64),
            Style::default().fg(Color::Red),
        ),
        Span::raw(format!("│ {updated} │ ")),
        Span::styled(
            "↑/↓ select  Enter history  Esc close  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    frame.render_widget(footer, area);
}

/// Run the interactive UI until the user quits or `cancel` fires
pub async fn run(state: StateHandle, fetcher: DetailFetcher, cancel: CancellationToken) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, state, fetcher, cancel).await;
    let restored = restore_terminal(&mut terminal);

    result.and(restored)
}

/// Every step runs even if an earlier one fails; the first error is returned
fn restore_terminal<W: io::Write>(terminal: &mut Terminal<CrosstermBackend<W>>) -> Result<()> {
    let raw = disable_raw_mode();
    let screen = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let cursor = terminal.show_cursor();

    first_error([raw, screen, cursor])
}

fn first_error<const N: usize>(steps: [io::Result<()>; N]) -> Result<()> {
    for step in steps {
        if let Err(e) = step {
            warn!("Failed to restore terminal: {}", e);
            return Err(e.into());
        }
    }
    Ok(())
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: StateHandle,
    fetcher: DetailFetcher,
    cancel: CancellationToken,
) -> Result<()> {
    let mut app = App::default();
    let mut events = EventStream::new();
    let mut redraw = tokio::time::interval(Duration::from_millis(100));

    loop {
        {
            let state = state.read().await;
            terminal.draw(|f| render(f, &mut app, &state))?;
        }

        tokio::select! {
            _ = redraw.tick() => {}

            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    // Raw mode swallows SIGINT
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        info!("Received shutdown signal");
                        break;
                    }
                    let action = {
                        let state = state.read().await;
                        app.on_key(key.code, &state)
                    };
                    match action {
                        Action::Quit => {
                            info!("Quit requested");
                            break;
                        }
                        Action::Select { node_id, node_name } => {
                            debug!("Selected node {}", node_id);
                            let fetcher = fetcher.clone();
                            tokio::spawn(async move {
                                fetcher.select(&node_id, &node_name).await;
                            });
                        }
                        Action::ClosePanel => fetcher.close().await,
                        Action::None => {}
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },

            _ = cancel.cancelled() => break,
        }
    }

    Ok(())
}
