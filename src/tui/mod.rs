mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::computations::{self, EvenDistinctSort};
use crate::offload::{InvocationState, Offload, OffloadError};
use crate::text_summary::{preview, PREVIEW_LEN};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::UiState;
use std::{io, time::Duration, time::Instant};

type SortOffload = Offload<EvenDistinctSort>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

pub async fn run(args: Cli) -> Result<()> {
    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(args));

    match tokio::task::spawn_blocking(move || ui_handle.join()).await {
        Ok(Ok(res)) => res,
        Ok(Err(_)) => Err(anyhow::anyhow!("TUI thread panicked")),
        Err(e) => Err(anyhow::anyhow!("TUI join failed: {e}")),
    }
}

/// Run the TUI loop on a dedicated thread. The helper lives here, so every state change it
/// makes happens on this thread.
pub fn run_threaded(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let mut offload = SortOffload::new(computations::registry(&cfg));
    offload.open().context("open background worker")?;

    let mut state = UiState {
        input: computations::generate_input(cfg.len, cfg.max_value, cfg.seed),
        ..Default::default()
    };
    state.info = format!("Generated {} numbers. Press s to sort.", state.input.len());

    let _session = TerminalSession::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        if offload.poll() {
            handle_settled(&mut state, &offload);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state, &offload)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, &mut offload, k) == KeyOutcome::Quit {
                    break Ok(());
                }
            }
        }
    };

    // The unit goes before the terminal is handed back; an in-flight sort is abandoned.
    offload.close();
    res
}

/// Raw mode plus the alternate screen, restored on drop so early returns and panics on the UI
/// thread leave the terminal usable.
struct TerminalSession;

impl TerminalSession {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("enable raw mode")?;
        let session = TerminalSession;
        execute!(io::stdout(), EnterAlternateScreen).ok();
        Ok(session)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        disable_raw_mode().ok();
        execute!(io::stdout(), LeaveAlternateScreen).ok();
    }
}

fn handle_key(state: &mut UiState, offload: &mut SortOffload, k: KeyEvent) -> KeyOutcome {
    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            return KeyOutcome::Quit;
        }
        (_, KeyCode::Char('+')) | (_, KeyCode::Up) => state.counter += 1,
        (_, KeyCode::Char('-')) | (_, KeyCode::Down) => state.counter -= 1,
        (_, KeyCode::Char('b')) => {
            state.background = state.background.toggled();
            state.info = format!("Background: {}", state.background.label());
        }
        (_, KeyCode::Char('s')) | (_, KeyCode::Enter) => start_sort(state, offload),
        (_, KeyCode::Tab) => state.tab = (state.tab + 1) % 2,
        (_, KeyCode::Char('?')) => state.tab = 1,
        _ => {}
    }
    KeyOutcome::Continue
}

fn start_sort(state: &mut UiState, offload: &mut SortOffload) {
    match offload.trigger(state.input.clone()) {
        Ok(seq) => {
            state.sort_started = Some(Instant::now());
            state.last_elapsed = None;
            state.info = format!("Sorting {} numbers (request #{seq})", state.input.len());
        }
        // The button is disabled while sorting.
        Err(OffloadError::Busy) => state.info = "Still sorting…".into(),
        Err(e) => state.info = format!("Sort could not start: {e}"),
    }
}

fn handle_settled(state: &mut UiState, offload: &SortOffload) {
    let elapsed = state.sort_started.take().map(|t0| t0.elapsed());
    state.last_elapsed = elapsed;
    let took = elapsed
        .map(|d| format!(" in {}", humantime::format_duration(truncate_millis(d))))
        .unwrap_or_default();

    if let Some(values) = offload.result() {
        state.info = format!("Sorted{took}: {} even numbers", values.len());
    } else if let Some(err) = offload.error() {
        state.info = format!("Sort failed{took}: {err}");
    }
}

fn truncate_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, offload: &SortOffload) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Dashboard"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("offload-demo"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_dashboard(chunks[1], f, state, offload),
        _ => draw_help(chunks[1], f),
    }
}

fn button(key: &'static str, label: &'static str, enabled: bool) -> Vec<Span<'static>> {
    let style = if enabled {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::DIM | Modifier::CROSSED_OUT)
    };
    vec![
        Span::styled(format!("[{key}] "), style),
        Span::styled(label, style),
        Span::raw("   "),
    ]
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState, offload: &SortOffload) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    let running = offload.is_running();
    let sort_label = if running { "Sorting..." } else { "Sort Now" };

    let mut buttons = Vec::new();
    buttons.extend(button("+", "Increment", true));
    buttons.extend(button("-", "Decrement", true));
    buttons.extend(button("b", "Change Background", true));
    buttons.extend(button("s", sort_label, !running));

    let mut lines = vec![
        Line::from(buttons),
        Line::from(""),
        Line::from(vec![
            Span::raw("Counter: "),
            Span::styled(
                state.counter.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
    ];

    match offload.state() {
        InvocationState::Completed(values) => {
            lines.push(Line::from(format!(
                "First {PREVIEW_LEN} Numbers: {}",
                preview(values)
            )));
            match crate::stats::summarize(values) {
                Some(s) => lines.push(Line::from(format!(
                    "{} even numbers, min {} max {} median {}",
                    s.count, s.min, s.max, s.median
                ))),
                None => lines.push(Line::from("No even numbers")),
            }
        }
        InvocationState::Failed(err) => lines.push(Line::from(vec![
            Span::styled("Error: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(err.to_string()),
        ])),
        InvocationState::Running { .. } => {
            lines.push(Line::from(format!("First {PREVIEW_LEN} Numbers: (working)")))
        }
        InvocationState::Idle => lines.push(Line::from(format!("First {PREVIEW_LEN} Numbers:"))),
    }

    let page = Paragraph::new(lines)
        .style(state.background.style())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Sort Large Array"),
        );
    f.render_widget(page, main[0]);

    let status = Paragraph::new(state.info.clone())
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, main[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DemoConfig;
    use crate::offload::Registry;
    use ratatui::backend::TestBackend;
    use state::Background;

    fn offload() -> SortOffload {
        let cfg = DemoConfig {
            len: 7,
            max_value: 10,
            seed: None,
            spin_iterations: 0,
            timeout: None,
        };
        SortOffload::new(computations::registry(&cfg))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn render(state: &UiState, offload: &SortOffload) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).expect("terminal");
        terminal
            .draw(|f| draw(f.area(), f, state, offload))
            .expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn wait_for_settle(state: &mut UiState, offload: &mut SortOffload) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !offload.poll() {
            assert!(Instant::now() < deadline, "sort did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
        handle_settled(state, offload);
    }

    #[test]
    fn counter_and_background_keys() {
        let mut state = UiState::default();
        let mut offload = offload();
        for code in [KeyCode::Char('+'), KeyCode::Up, KeyCode::Char('-')] {
            assert_eq!(handle_key(&mut state, &mut offload, press(code)), KeyOutcome::Continue);
        }
        assert_eq!(state.counter, 1);

        handle_key(&mut state, &mut offload, press(KeyCode::Char('b')));
        assert_eq!(state.background, Background::Red);
        assert!(!offload.is_open());
    }

    #[test]
    fn quit_keys() {
        let mut state = UiState::default();
        let mut offload = offload();
        assert_eq!(
            handle_key(&mut state, &mut offload, press(KeyCode::Char('q'))),
            KeyOutcome::Quit
        );
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(&mut state, &mut offload, ctrl_c), KeyOutcome::Quit);
    }

    #[test]
    fn sort_key_runs_in_background_and_shows_result() {
        let mut state = UiState {
            input: vec![5, 2, 2, 4, 1, 4, 3],
            ..Default::default()
        };
        let mut offload = offload();
        assert!(render(&state, &offload).contains("Sort Now"));

        handle_key(&mut state, &mut offload, press(KeyCode::Char('s')));
        assert!(offload.is_running());
        // State only moves on poll, so this frame is always the in-flight one.
        let screen = render(&state, &offload);
        assert!(screen.contains("Sorting..."));
        assert!(screen.contains("First 10 Numbers: (working)"));

        // Counter keeps working while the sort is in flight.
        handle_key(&mut state, &mut offload, press(KeyCode::Char('+')));
        assert_eq!(state.counter, 1);

        wait_for_settle(&mut state, &mut offload);
        let screen = render(&state, &offload);
        assert!(screen.contains("First 10 Numbers: 2, 4"));
        assert!(screen.contains("Sort Now"));
        assert!(state.info.starts_with("Sorted"));
        assert!(state.last_elapsed.is_some());
    }

    #[test]
    fn second_sort_while_running_is_refused() {
        let mut state = UiState {
            input: vec![1, 2],
            ..Default::default()
        };
        let mut offload = offload();
        handle_key(&mut state, &mut offload, press(KeyCode::Enter));
        handle_key(&mut state, &mut offload, press(KeyCode::Enter));
        assert_eq!(state.info, "Still sorting…");
        wait_for_settle(&mut state, &mut offload);
    }

    #[test]
    fn failure_is_rendered() {
        let mut state = UiState::default();
        let mut offload = SortOffload::new(Registry::default());
        handle_key(&mut state, &mut offload, press(KeyCode::Char('s')));
        wait_for_settle(&mut state, &mut offload);

        assert!(state.info.starts_with("Sort failed"));
        let screen = render(&state, &offload);
        assert!(screen.contains("Error: computation `even-distinct-sort` is not registered"));
    }

    #[test]
    fn closed_helper_reports_instead_of_sorting() {
        let mut state = UiState::default();
        let mut offload = offload();
        offload.close();
        handle_key(&mut state, &mut offload, press(KeyCode::Char('s')));
        assert_eq!(state.info, "Sort could not start: helper has been closed");
    }

    #[test]
    fn tab_and_help_switch_views() {
        let mut state = UiState::default();
        let mut offload = offload();
        handle_key(&mut state, &mut offload, press(KeyCode::Tab));
        assert_eq!(state.tab, 1);
        assert!(render(&state, &offload).contains("Keybinds:"));
        handle_key(&mut state, &mut offload, press(KeyCode::Tab));
        assert_eq!(state.tab, 0);
        handle_key(&mut state, &mut offload, press(KeyCode::Char('?')));
        assert_eq!(state.tab, 1);
    }
}
