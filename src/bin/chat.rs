//! Virtual Vince terminal chat client
//!
//! Drives the conversation runtime against a running proxy server and paints
//! the transcript and input views with ratatui.

use crossterm::{
    event::{Event as TermEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame, Terminal,
};
use std::error::Error;
use std::io::{self, Stderr};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use virtual_vince::conversation::markdown::{RichLine, SpanStyle};
use virtual_vince::conversation::{
    self, render_input, render_transcript, ChatConfig, ChatState, Event, Key,
};
use virtual_vince::env::{self, ConfigError, Lookup};
use virtual_vince::llm::Role;
use virtual_vince::runtime::{ChatHandle, ExampleProxyClient, HttpProxyClient, UiEvent};

type Tui = Terminal<CrosstermBackend<Stderr>>;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================
// Configuration
// ============================================================

/// Client-only settings; conversation settings live in `ChatConfig`
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClientConfig {
    server_url: String,
    /// Route sends through the stub endpoint
    stub: bool,
    log_file: Option<String>,
    request_timeout: Duration,
}

impl ClientConfig {
    fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            server_url: env::string(lookup, "VINCE_SERVER_URL")
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            stub: env::flag(lookup, "VINCE_STUB")?.unwrap_or(false),
            log_file: env::string(lookup, "VINCE_CHAT_LOG"),
            request_timeout: env::parsed(lookup, "VINCE_REQUEST_TIMEOUT_SECS")?
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
        })
    }
}

// ============================================================
// Main
// ============================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let client = ClientConfig::from_lookup(&env::process_env)?;
    init_logging(client.log_file.as_deref())?;
    let config = ChatConfig::from_env()?;

    let http = HttpProxyClient::new(&client.server_url, client.request_timeout)?;
    tracing::info!(server = %client.server_url, stub = client.stub, "Starting chat client");
    let handle = if client.stub {
        ChatHandle::spawn(config.clone(), ExampleProxyClient::new(http))
    } else {
        ChatHandle::spawn(config.clone(), http)
    };
    let mut ui_rx = handle.subscribe();
    handle.send(Event::Mount).await?;

    install_panic_hook();
    let mut terminal = init_terminal()?;
    let result = run(&mut terminal, &handle, &mut ui_rx, App::new(config)).await;
    restore_terminal()?;

    let final_state = handle.finished().await?;
    tracing::info!(
        messages = final_state.messages.len(),
        token_count = final_state.token_count,
        "Chat client stopped"
    );
    result
}

/// The terminal owns stderr, so logs only go to a file when asked for
fn init_logging(path: Option<&str>) -> io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "virtual_vince=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::sync::Mutex::new(file)),
        )
        .init();
    Ok(())
}

// ============================================================
// Terminal setup
// ============================================================

fn init_terminal() -> io::Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(io::stderr()))
}

fn restore_terminal() -> io::Result<()> {
    execute!(io::stderr(), LeaveAlternateScreen)?;
    disable_raw_mode()
}

/// Restore the terminal before the default panic output
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));
}

// ============================================================
// Event loop
// ============================================================

struct App {
    config: ChatConfig,
    state: ChatState,
    alert: Option<String>,
    /// Rows scrolled up from the bottom of the transcript
    scroll_back: usize,
}

impl App {
    fn new(config: ChatConfig) -> Self {
        let state = ChatState::new(&config);
        Self {
            config,
            state,
            alert: None,
            scroll_back: 0,
        }
    }
}

enum Action {
    Send(Event),
    ScrollUp,
    ScrollDown,
    Quit,
    Ignore,
}

fn map_key(key: KeyEvent) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') if ctrl => Action::Quit,
        KeyCode::Char('r') if ctrl => Action::Send(Event::Retry),
        KeyCode::Enter => Action::Send(Event::Key(Key::Enter {
            shift: key.modifiers.contains(KeyModifiers::SHIFT),
        })),
        KeyCode::Backspace => Action::Send(Event::Key(Key::Backspace)),
        KeyCode::Char(c) if !ctrl => Action::Send(Event::Key(Key::Char(c))),
        KeyCode::PageUp => Action::ScrollUp,
        KeyCode::PageDown => Action::ScrollDown,
        _ => Action::Ignore,
    }
}

async fn run(
    terminal: &mut Tui,
    handle: &ChatHandle,
    ui_rx: &mut broadcast::Receiver<UiEvent>,
    mut app: App,
) -> Result<(), Box<dyn Error>> {
    let mut input = EventStream::new();

    loop {
        terminal.draw(|frame| draw(frame, &app))?;

        tokio::select! {
            update = ui_rx.recv() => match update {
                Ok(UiEvent::StateChanged(state)) => app.state = state,
                Ok(UiEvent::Alert(message)) => app.alert = Some(message),
                Ok(UiEvent::ScrollToBottom) => app.scroll_back = 0,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "UI updates lagged");
                }
                Err(RecvError::Closed) => break,
            },

            term_event = input.next() => match term_event {
                Some(Ok(TermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                    match map_key(key) {
                        Action::Quit => {
                            handle.send(Event::Unmount).await?;
                            break;
                        }
                        Action::Send(event) => {
                            app.alert = None;
                            handle.send(event).await?;
                        }
                        Action::ScrollUp => app.scroll_back += 5,
                        Action::ScrollDown => app.scroll_back = app.scroll_back.saturating_sub(5),
                        Action::Ignore => {}
                    }
                }
                // Resize and other events just redraw
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }

    Ok(())
}

// ============================================================
// Drawing
// ============================================================

fn draw(frame: &mut Frame, app: &App) {
    let input_view = render_input(&app.state, &app.config);
    let draft_rows = u16::try_from(input_view.draft.split('\n').count()).unwrap_or(u16::MAX);
    let input_height = draft_rows.saturating_add(2).clamp(3, 8);

    let [header, body, input, alert] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(input_height),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(frame, header, app);
    draw_transcript(frame, body, app);
    draw_input(frame, input, app, &input_view);

    if let Some(message) = &app.alert {
        let line = Line::styled(
            format!(" {message}"),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        );
        frame.render_widget(Paragraph::new(line), alert);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let usage = match app.config.token_cutoff {
        Some(cutoff) => format!("{}/{cutoff} tokens", app.state.token_count),
        None => format!("{} tokens", app.state.token_count),
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", app.config.assistant_name),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(usage, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_transcript(frame: &mut Frame, area: Rect, app: &App) {
    let view = render_transcript(&app.state, &app.config);
    let block = Block::bordered();
    let inner = block.inner(area);
    let width = usize::from(inner.width);

    let mut lines: Vec<Line<'static>> = Vec::new();
    for item in &view.items {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        match item.role {
            Role::Assistant => {
                let avatar = if item.show_avatar { "● " } else { "" };
                lines.push(Line::styled(
                    format!("{avatar}{}", app.config.assistant_name),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ));
                for body_line in &item.body {
                    for mut wrapped in wrap(&styled_runs(body_line), width.saturating_sub(2)) {
                        wrapped.spans.insert(0, Span::raw("  "));
                        lines.push(wrapped);
                    }
                }
            }
            Role::User => {
                lines.push(
                    Line::styled("You", Style::default().add_modifier(Modifier::BOLD))
                        .alignment(Alignment::Right),
                );
                for body_line in &item.body {
                    for wrapped in wrap(&styled_runs(body_line), width) {
                        lines.push(wrapped.alignment(Alignment::Right));
                    }
                }
            }
        }
    }

    if let Some(name) = &view.typing_placeholder {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::styled(
            format!("● {name} is typing…"),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ));
    }

    if let Some(notice) = &view.error_notice {
        lines.push(Line::default());
        for wrapped in wrap(&[(notice.clone(), Style::default().fg(Color::Red))], width) {
            lines.push(wrapped);
        }
    }

    // Pin to the newest row unless the user scrolled back
    let height = usize::from(inner.height);
    let bottom = lines.len().saturating_sub(height);
    let offset = bottom.saturating_sub(app.scroll_back);
    let offset = u16::try_from(offset).unwrap_or(u16::MAX);

    frame.render_widget(Paragraph::new(lines).block(block).scroll((offset, 0)), area);
}

fn draw_input(frame: &mut Frame, area: Rect, app: &App, view: &conversation::InputView) {
    if !view.visible {
        let notice = Paragraph::new(Line::styled(
            "This conversation has reached its limit.",
            Style::default().fg(Color::DarkGray),
        ))
        .block(Block::bordered());
        frame.render_widget(notice, area);
        return;
    }

    let border = if view.over_limit {
        Style::default().fg(Color::Red)
    } else if view.enabled {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let hint = if view.send_enabled {
        "Enter to send"
    } else {
        ""
    };
    let mut block = Block::bordered()
        .border_style(border)
        .title(Line::from(format!(" {} ", view.counter)).right_aligned())
        .title_bottom(Line::from(format!(" {hint} ")).right_aligned());
    if let Some(label) = view.typing_label {
        block = block.title_bottom(Line::from(format!(" {label} ")).left_aligned());
    }

    let inner = block.inner(area);
    let text: Vec<Line> = if view.enabled {
        view.draft.split('\n').map(Line::raw).collect()
    } else {
        vec![Line::styled(
            format!("Waiting for {}…", app.config.assistant_name),
            Style::default().fg(Color::DarkGray),
        )]
    };
    frame.render_widget(Paragraph::new(text).block(block), area);

    if view.enabled {
        let rows = view.draft.split('\n').count().saturating_sub(1);
        let column = view
            .draft
            .rsplit('\n')
            .next()
            .map_or(0, |line| line.chars().count());
        let x = inner
            .x
            .saturating_add(u16::try_from(column).unwrap_or(u16::MAX))
            .min(inner.right().saturating_sub(1));
        let y = inner
            .y
            .saturating_add(u16::try_from(rows).unwrap_or(u16::MAX))
            .min(inner.bottom().saturating_sub(1));
        frame.set_cursor_position((x, y));
    }
}

fn span_style(style: SpanStyle) -> Style {
    let mut out = Style::default();
    if style.bold {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.italic {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.code {
        out = out.fg(Color::Yellow);
    }
    if style.link {
        out = out.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
    }
    out
}

fn styled_runs(line: &RichLine) -> Vec<(String, Style)> {
    line.spans
        .iter()
        .map(|span| (span.text.clone(), span_style(span.style)))
        .collect()
}

/// Wrap styled runs to `width` terminal columns, keeping each run's style
fn wrap(runs: &[(String, Style)], width: usize) -> Vec<Line<'static>> {
    let text: String = runs.iter().map(|(run, _)| run.as_str()).collect();
    let mut bounds = Vec::with_capacity(runs.len());
    let mut offset = 0;
    for (run, style) in runs {
        offset += run.len();
        bounds.push((offset, *style));
    }

    let options = textwrap::Options::new(width.max(1))
        .wrap_algorithm(textwrap::WrapAlgorithm::FirstFit);
    let mut cursor = 0;
    textwrap::wrap(&text, options)
        .into_iter()
        .map(|row| {
            // Rows are slices of `text` in order
            let Some(found) = text[cursor..].find(&*row) else {
                return Line::raw(row.into_owned());
            };
            let start = cursor + found;
            cursor = start + row.len();
            restyle(&text, &bounds, start, cursor)
        })
        .collect()
}

/// Rebuild the spans covering `text[start..end]`
fn restyle(text: &str, bounds: &[(usize, Style)], start: usize, end: usize) -> Line<'static> {
    let mut spans = Vec::new();
    let mut run_start = 0;
    for &(run_end, style) in bounds {
        let from = run_start.max(start);
        let to = run_end.min(end);
        if from < to {
            spans.push(Span::styled(text[from..to].to_string(), style));
        }
        run_start = run_end;
    }
    Line::from(spans)
}
