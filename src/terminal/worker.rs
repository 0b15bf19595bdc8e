//! Background body fetches and the redraw notification channel.
//!
//! The worker thread owns the IMAP session for the lifetime of the UI; the
//! loop only talks to it through channels.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, info, warn};

use crate::domain::email::SeqNum;
use crate::error::FetchError;
use crate::mail::fetcher::fetch_body;
use crate::mail::mime::ResolverConfig;
use crate::mail::session::MailSession;
use crate::terminal::state::FetchOutcome;

/// Sending half of the single-slot redraw channel. Requests made while one
/// is already pending are merged into it.
#[derive(Clone)]
pub struct RedrawNotifier(SyncSender<()>);

impl RedrawNotifier {
    pub fn request(&self) {
        let _ = self.0.try_send(());
    }
}

pub struct RedrawSignal(Receiver<()>);

impl RedrawSignal {
    /// Consume a pending redraw request, if any.
    pub fn take(&self) -> bool {
        self.0.try_recv().is_ok()
    }
}

pub fn redraw_channel() -> (RedrawNotifier, RedrawSignal) {
    let (tx, rx) = mpsc::sync_channel(1);
    (RedrawNotifier(tx), RedrawSignal(rx))
}

struct FetchRequest {
    request: u64,
    seq: SeqNum,
}

pub struct FetchWorker {
    requests: Option<Sender<FetchRequest>>,
    outcomes: Receiver<FetchOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl FetchWorker {
    pub fn spawn<S>(mut session: S, resolver: ResolverConfig, redraw: RedrawNotifier) -> Result<Self>
    where
        S: MailSession + Send + 'static,
    {
        let (req_tx, req_rx) = mpsc::channel::<FetchRequest>();
        let (out_tx, out_rx) = mpsc::channel::<FetchOutcome>();

        let handle = thread::Builder::new()
            .name("imap-fetch".into())
            .spawn(move || {
                while let Ok(FetchRequest { request, seq }) = req_rx.recv() {
                    debug!("request {request}: fetching message {seq}");
                    let result = fetch_body(&mut session, seq, &resolver);
                    if out_tx.send(FetchOutcome { request, seq, result }).is_err() {
                        break;
                    }
                    redraw.request();
                }
                session.logout();
                info!("fetch worker stopped");
            })?;

        Ok(Self {
            requests: Some(req_tx),
            outcomes: out_rx,
            handle: Some(handle),
        })
    }

    pub fn request(&self, request: u64, seq: SeqNum) -> Result<(), FetchError> {
        self.requests
            .as_ref()
            .ok_or_else(|| FetchError::failed("fetch worker is shut down"))?
            .send(FetchRequest { request, seq })
            .map_err(|_| FetchError::failed("fetch worker is not running"))
    }

    pub fn try_outcome(&self) -> Option<FetchOutcome> {
        self.outcomes.try_recv().ok()
    }

    /// Stop accepting requests and wait up to `grace` for the worker to log
    /// out. A worker stuck in a slow fetch is left to finish on its own.
    pub fn shutdown(mut self, grace: Duration) {
        self.requests.take();
        let Some(handle) = self.handle.take() else {
            return;
        };

        let deadline = Instant::now() + grace;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if handle.is_finished() {
            if handle.join().is_err() {
                warn!("fetch worker panicked");
            }
        } else {
            warn!("fetch worker still busy after {grace:?}; not waiting for logout");
        }
    }
}
