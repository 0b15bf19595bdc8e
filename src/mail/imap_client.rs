use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use imap::types::Fetch;
use log::{debug, info, warn};
use native_tls::{TlsConnector, TlsStream};

use crate::config::ImapSettings;
use crate::domain::email::SeqNum;
use crate::error::FetchError;
use crate::mail::session::MailSession;

type TlsSession = imap::Session<TlsStream<TcpStream>>;

/// Whole message without setting `\Seen`.
const MESSAGE_QUERY: &str = "BODY.PEEK[]";
/// Header block only; RFC822.HEADER never sets `\Seen`.
const HEADER_QUERY: &str = "RFC822.HEADER";

/// A logged-in IMAP session with one mailbox opened read-only.
pub struct ImapSession {
    session: TlsSession,
    exists: u32,
}

impl ImapSession {
    /// Dial, negotiate TLS, log in and EXAMINE the configured mailbox.
    ///
    /// The socket carries read/write timeouts so that a stalled server
    /// surfaces as a fetch error instead of hanging the caller.
    pub fn connect(settings: &ImapSettings) -> Result<Self> {
        let host = settings.host.as_str();
        info!("connecting to {}:{}", host, settings.port);

        let tcp = connect_tcp(host, settings.port, settings.io_timeout)?;
        let tls = TlsConnector::builder().build()?;
        let stream = tls
            .connect(host, tcp)
            .map_err(|e| anyhow!("TLS handshake with {host} failed: {e}"))?;

        let mut client = imap::Client::new(stream);
        client
            .read_greeting()
            .with_context(|| format!("no IMAP greeting from {host}"))?;

        let mut session = client
            .login(&settings.user, &settings.password)
            .map_err(|(e, _client)| anyhow!("login as {} failed: {e}", settings.user))?;

        let mailbox = session
            .examine(&settings.mailbox)
            .with_context(|| format!("cannot open mailbox {}", settings.mailbox))?;
        info!("{} has {} messages", settings.mailbox, mailbox.exists);

        Ok(Self {
            session,
            exists: mailbox.exists,
        })
    }

    fn fetch_one(
        &mut self,
        seq: SeqNum,
        query: &str,
        pick: fn(&Fetch) -> Option<&[u8]>,
    ) -> Result<Vec<u8>, FetchError> {
        let fetches = self
            .session
            .fetch(seq.to_string(), query)
            .map_err(FetchError::failed)?;
        let f = fetches
            .iter()
            .find(|f| f.message == seq)
            .ok_or_else(|| FetchError::failed(format!("message {seq} not in FETCH response")))?;

        pick(f).map(<[u8]>::to_vec).ok_or_else(|| {
            FetchError::failed(format!("message {seq}: {query} missing from response"))
        })
    }
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .with_context(|| format!("cannot resolve {host}:{port}"))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(tcp) => {
                tcp.set_read_timeout(Some(timeout))?;
                tcp.set_write_timeout(Some(timeout))?;
                return Ok(tcp);
            }
            Err(e) => {
                debug!("connect to {addr} failed: {e}");
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => anyhow!("cannot connect to {host}:{port}: {e}"),
        None => anyhow!("{host}:{port} resolved to no addresses"),
    })
}

impl MailSession for ImapSession {
    fn message_count(&self) -> u32 {
        self.exists
    }

    fn list_headers(
        &mut self,
        first: SeqNum,
        last: SeqNum,
    ) -> Result<Vec<(SeqNum, Vec<u8>)>, FetchError> {
        let fetches = self
            .session
            .fetch(format!("{first}:{last}"), HEADER_QUERY)
            .map_err(FetchError::failed)?;

        Ok(fetches
            .iter()
            .map(|f| (f.message, f.header().map(<[u8]>::to_vec).unwrap_or_default()))
            .collect())
    }

    fn fetch_raw(&mut self, seq: SeqNum) -> Result<Vec<u8>, FetchError> {
        self.fetch_one(seq, MESSAGE_QUERY, Fetch::body)
    }

    fn fetch_header(&mut self, seq: SeqNum) -> Result<Vec<u8>, FetchError> {
        self.fetch_one(seq, HEADER_QUERY, Fetch::header)
    }

    fn logout(&mut self) {
        if let Err(e) = self.session.logout() {
            warn!("IMAP logout failed: {e}");
        }
    }
}
