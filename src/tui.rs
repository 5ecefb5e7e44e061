//! Terminal session and the console's single event stream
//!
//! Keyboard input, the pending-indicator tick and backend completions are all
//! funnelled into one channel, so the main loop only ever awaits one thing and
//! handles one [`AppEvent`] per redraw.

use std::io::{self, Stderr};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::orchestrator::Completion;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Period of the "Awaiting..." dot animation
pub const TICK_RATE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    /// The terminal was resized; the next draw re-lays out both log panes
    Resize(u16, u16),
    Tick,
    /// A backend request finished
    Completion(Completion),
}

/// Merges terminal input, ticks and request completions into one stream
pub struct EventHandler {
    rx: UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    /// Start reading the terminal and forwarding `completions`.
    pub fn new(completions: UnboundedReceiver<Completion>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_terminal_reader(tx.clone());
        spawn_ticker(tx.clone());
        spawn_completion_forwarder(completions, tx);
        Self { rx }
    }

    /// Build a handler fed only by `completions`, with no terminal attached.
    pub fn detached(completions: UnboundedReceiver<Completion>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_completion_forwarder(completions, tx);
        Self { rx }
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

fn terminal_event(event: Event) -> Option<AppEvent> {
    match event {
        // Release and repeat events would double every keystroke on some terminals
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Event::Resize(width, height) => Some(AppEvent::Resize(width, height)),
        _ => None,
    }
}

fn spawn_terminal_reader(tx: UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut stream = EventStream::new();
        while let Some(event) = stream.next().await {
            let event = match event {
                Ok(event) => terminal_event(event),
                Err(e) => {
                    tracing::warn!(error = %e, "terminal event stream error");
                    None
                }
            };
            let Some(event) = event else { continue };
            if tx.send(event).is_err() {
                break;
            }
        }
    });
}

fn spawn_ticker(tx: UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_RATE);
        while tx.send(AppEvent::Tick).is_ok() {
            interval.tick().await;
        }
    });
}

fn spawn_completion_forwarder(
    mut completions: UnboundedReceiver<Completion>,
    tx: UnboundedSender<AppEvent>,
) {
    tokio::spawn(async move {
        while let Some(completion) = completions.recv().await {
            if tx.send(AppEvent::Completion(completion)).is_err() {
                break;
            }
        }
        tracing::debug!("completion channel closed");
    });
}

/// Enter raw mode on the alternate screen. The TUI draws to stderr.
pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(io::stderr()))?)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Leave the alternate screen before the default hook prints the panic
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore();
        default_hook(info);
    }));
}
