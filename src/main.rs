use anyhow::anyhow;
use clap::Parser;
use std::io;
use std::sync::mpsc;
use std::time::Duration;
use tarot_insight::app::{self, App};
use tarot_insight::cli::{Account, Arguments, Commands};
use tarot_insight::display;
use tarot_insight::history::History;
use tarot_insight::sync::{self, Outcome};
use tarot_insight::{drive, token, StopWatch, SystemClock};
use tracing_log::LogTracer;

fn main() {
    let arguments = Arguments::parse();
    if let Err(e) = set_log_level(&arguments) {
        eprintln!("Failed to configure logging: {e}");
    }

    tracing::debug!(?arguments, "starting tarot insight");

    if let Err(e) = run(arguments) {
        tracing::error!(%e, "Unable to complete the command");
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn set_log_level(arguments: &Arguments) -> anyhow::Result<()> {
    LogTracer::init()?;

    let level = match arguments.verbosity {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_file(true)
        .with_line_number(true)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn run(arguments: Arguments) -> anyhow::Result<()> {
    // Account commands never touch the history, so a damaged file must not block them.
    let load = || History::load(&arguments.history);

    match arguments.command {
        Commands::Run { tick } => {
            let history = load()?;
            let (sender, receiver) = mpsc::channel();
            // Stdin blocks, so it gets its own thread; all timing stays on this one.
            std::thread::spawn(move || {
                if let Err(e) = app::read_loop(io::stdin().lock(), sender) {
                    tracing::error!(%e, "Failed to read commands");
                }
            });

            println!("{}", app::HELP);

            let observer = (
                display::Readout::new(io::stdout()),
                display::Title::new(io::stdout()),
            );
            let mut app = App::new(StopWatch::new(SystemClock), history, observer);
            app.run(receiver, Duration::from_millis(tick))?;
        }
        Commands::History { laps } => {
            let history = load()?;
            if history.is_empty() {
                println!("No sessions recorded yet.");
            }
            for record in history.records() {
                app::print_record(record, laps);
            }
        }
        Commands::Rename { id, name } => {
            let mut history = load()?;
            if !history.rename(id, name) {
                return Err(anyhow!("No session with id {id}"));
            }
            history.save()?;
        }
        Commands::RenameLap { id, lap_id, name } => {
            let mut history = load()?;
            if !history.rename_lap(id, lap_id, name) {
                return Err(anyhow!("No lap {lap_id} in session {id}"));
            }
            history.save()?;
        }
        Commands::Delete { id } => {
            let mut history = load()?;
            if !history.delete(id) {
                return Err(anyhow!("No session with id {id}"));
            }
            history.save()?;
        }
        Commands::Login => {
            oauth(&arguments.account)?.login()?;
            println!("Signed in.");
        }
        Commands::Logout => {
            oauth(&arguments.account)?.logout()?;
            println!("Signed out.");
        }
        Commands::Upload => {
            let history = load()?;
            let mut remote = drive::Client::new(oauth(&arguments.account)?);
            sync::upload(&mut remote, &history)?;
            println!("Uploaded {} sessions.", history.len());
        }
        Commands::Download { keep } => {
            let mut history = load()?;
            let mut remote = drive::Client::new(oauth(&arguments.account)?);
            match sync::download(&mut remote, &mut history, keep)? {
                Outcome::Adopted(count) => println!("Restored {count} sessions."),
                Outcome::NotFound => println!("No history found on Drive."),
                Outcome::Unresolved(first, second) => {
                    println!("Two history files were found. Rerun with --keep first or --keep second:");
                    for (label, candidate) in [("first", &first), ("second", &second)] {
                        let modified = candidate.modified.as_deref().unwrap_or("unknown");
                        match candidate.records() {
                            Ok(records) => println!("  {label}: {} sessions, modified {modified}", records.len()),
                            Err(e) => println!("  {label}: unreadable ({e}), modified {modified}"),
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn oauth(account: &Account) -> anyhow::Result<token::Client> {
    let client_id = account
        .client_id
        .clone()
        .ok_or_else(|| anyhow!("A Google client id is required (--client-id or TAROT_CLIENT_ID)"))?;

    token::Client::new(
        client_id,
        account.client_secret.clone(),
        account.token_cache.clone(),
        account.redirect_port,
    )
}
