//! ---
//! ems_section: "12-gui-setup-wizard"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Terminal dashboard lifecycle and event loop."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use sunkalp_core::Monitor;
use sunkalp_session::KeyValueStore;
use tracing::info;

mod app;
mod view;

use app::App;

const TICK_RATE: Duration = Duration::from_millis(250);

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Run the dashboard until the user quits.
///
/// The crossterm event loop blocks, so it runs inside `block_in_place`;
/// poll tasks keep running on the other runtime workers.
pub fn run<S: KeyValueStore>(monitor: Monitor<S>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableBracketedPaste, Hide)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(monitor);
    let result = tokio::task::block_in_place(|| run_app(&mut terminal, &mut app));
    cleanup_terminal(&mut terminal)?;
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
    info!(state = ?app.state(), "dashboard closed");
    Ok(())
}

fn cleanup_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste,
        Show
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app<S: KeyValueStore>(terminal: &mut Term, app: &mut App<S>) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| view::draw(frame, app))?;
        if event::poll(TICK_RATE)? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => app.handle_key(key),
                Event::Paste(text) => app.paste(&text),
                Event::Resize(_, _) => {
                    // redraw with new geometry
                }
                _ => {}
            }
        }
        if app.should_quit() {
            break;
        }
    }
    Ok(())
}
