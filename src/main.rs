use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use env_logger::{Env, Target};

use termmail::config::{self, EnvConfig, Settings};
use termmail::domain::email::SeqNum;
use termmail::mail::fetcher::{fetch_body, list_recent};
use termmail::mail::imap_client::ImapSession;
use termmail::mail::session::MailSession;
use termmail::terminal::run_tui;
use termmail::terminal::state::NO_PLAIN_TEXT;

#[derive(Parser)]
#[command(name = "termmail")]
#[command(about = "Read the plain-text body of recent IMAP messages", long_about = None)]
struct Cli {
    /// Settings file (default: <config dir>/termmail/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mailbox to open
    #[arg(long)]
    mailbox: Option<String>,

    /// How many of the most recent messages to list
    #[arg(long)]
    recent: Option<u32>,

    /// Where to write the log (the terminal is owned by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Browse recent messages in the terminal UI (default)
    Tui,

    /// Print sequence numbers and subjects of recent messages
    List,

    /// Print the plain-text body of one message
    Show { seq: SeqNum },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(&cli)?;
    init_logging(settings.log_file.as_deref())?;

    let mut session = ImapSession::connect(&settings.imap)?;

    match cli.cmd.unwrap_or(Command::Tui) {
        Command::List => {
            let items = list_recent(&mut session, settings.recent_window)?;
            for m in items {
                println!("{:>6}  {}", m.seq, m.subject);
            }
            session.logout();
            Ok(())
        }

        Command::Show { seq } => {
            let body = fetch_body(&mut session, seq, &settings.resolver);
            session.logout();
            let body = body?;
            if body.found {
                println!("{}", body.text);
            } else {
                println!("{NO_PLAIN_TEXT}");
            }
            Ok(())
        }

        Command::Tui => {
            let items = list_recent(&mut session, settings.recent_window)
                .context("could not list messages")?;
            run_tui(
                session,
                &settings.imap.mailbox,
                items,
                settings.resolver,
                settings.fetch_timeout,
            )
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let path = match &cli.config {
        Some(p) => p.clone(),
        None => config::config_path()?,
    };
    let file = config::load_file(&path).map_err(|e| anyhow!("Configuration error: {e}"))?;
    let mut settings = config::resolve(file, EnvConfig::from_env())
        .map_err(|e| anyhow!("Configuration error: {e}"))?;

    if let Some(mailbox) = &cli.mailbox {
        settings.imap.mailbox = mailbox.clone();
    }
    if let Some(n) = cli.recent {
        settings.recent_window = n;
    }
    if let Some(p) = &cli.log_file {
        settings.log_file = Some(p.clone());
    }
    Ok(settings)
}

fn init_logging(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config::default_log_path()?,
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
