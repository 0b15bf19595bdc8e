pub mod events;
pub mod state;
pub mod surface;
pub mod ui;
pub mod worker;

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::domain::email::MessageSummary;
use crate::mail::mime::ResolverConfig;
use crate::mail::session::MailSession;
use crate::terminal::events::{Command, handle_key};
use crate::terminal::state::{AppState, FetchOutcome, LOADING_TEXT, View};
use crate::terminal::surface::{DisplaySurface, TerminalSurface};
use crate::terminal::worker::{FetchWorker, RedrawNotifier, RedrawSignal, redraw_channel};

/// How long the loop waits for a key before checking on fetches.
pub const TICK_RATE: Duration = Duration::from_millis(100);

const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    pub tick: Duration,
    pub fetch_timeout: Duration,
}

/// Open the terminal and browse `items` until the user quits. The session
/// moves to the fetch worker for the lifetime of the UI.
pub fn run_tui<S>(
    session: S,
    mailbox: &str,
    items: Vec<MessageSummary>,
    resolver: ResolverConfig,
    fetch_timeout: Duration,
) -> Result<()>
where
    S: MailSession + Send + 'static,
{
    let (notifier, signal) = redraw_channel();
    let worker = FetchWorker::spawn(session, resolver, notifier.clone())?;
    let mut state = AppState::new(mailbox, items);
    let cfg = LoopConfig {
        tick: TICK_RATE,
        fetch_timeout,
    };

    let result = {
        let mut surface = TerminalSurface::init();
        run_selection_loop(&mut surface, &mut state, &worker, &notifier, &signal, &cfg)
    };

    worker.shutdown(WORKER_SHUTDOWN_GRACE);
    result
}

/// The selection loop: one key at a time, fetch results polled in between,
/// and a redraw whenever something asked for one.
pub fn run_selection_loop<D: DisplaySurface + ?Sized>(
    surface: &mut D,
    state: &mut AppState,
    worker: &FetchWorker,
    notifier: &RedrawNotifier,
    signal: &RedrawSignal,
    cfg: &LoopConfig,
) -> Result<()> {
    render(surface, state)?;

    while !state.is_terminated() {
        if let Some(key) = surface.next_key(cfg.tick)? {
            match handle_key(key, state) {
                Command::Nothing => {}
                Command::Redraw => notifier.request(),
                Command::Fetch { request, seq } => {
                    if let Err(e) = worker.request(request, seq) {
                        state.complete_fetch(FetchOutcome {
                            request,
                            seq,
                            result: Err(e),
                        });
                    }
                    notifier.request();
                }
                Command::Quit => break,
            }
        }

        while let Some(outcome) = worker.try_outcome() {
            if state.complete_fetch(outcome) {
                notifier.request();
            }
        }
        if state.check_fetch_timeout(Instant::now(), cfg.fetch_timeout) {
            notifier.request();
        }

        if signal.take() {
            render(surface, state)?;
        }
    }

    log::info!("selection loop finished");
    Ok(())
}

fn render<D: DisplaySurface + ?Sized>(surface: &mut D, state: &mut AppState) -> Result<()> {
    match &state.view {
        View::Browsing | View::Terminated => {
            let labels: Vec<String> = state.items.iter().map(|m| m.subject.clone()).collect();
            surface.render_list(&state.list_title(), &labels, state.selection.selected())
        }
        View::Fetching { seq, .. } => {
            surface.render_text_pane(&state.title_for(*seq), LOADING_TEXT, 0)?;
            Ok(())
        }
        View::Reading {
            title,
            text,
            scroll,
            ..
        } => {
            let applied = surface.render_text_pane(title, text, *scroll)?;
            state.settle_scroll(applied);
            Ok(())
        }
    }
}
