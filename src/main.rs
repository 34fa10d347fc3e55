mod cli;
mod console;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use cli::{BalanceCommand, Cli, Commands, EventCommand, PersonCommand};
use console::Session;
use scorekeeper::auth::SharedSecret;
use scorekeeper::config::Config;
use scorekeeper::engine::EngineError;
use scorekeeper::observability::init_tracing;
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<ExitCode, AnyError> {
    init_tracing("info");

    let cli = Cli::parse();
    let config = Config::load_with(cli.config.clone())?;

    match cli.command {
        Commands::Serve(args) => {
            scorekeeper::api::run(config, args.address).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Keygen(args) => {
            let secret = SharedSecret::generate().to_hex();
            if let Some(path) = &args.output {
                std::fs::write(path, format!("{secret}\n"))?;
                info!(path = %path.display(), "Wrote shared secret");
            }
            println!("{secret}");
            Ok(ExitCode::SUCCESS)
        }
        command => {
            let session = Session::open(&config, cli.remote)?;
            let outcome = dispatch(&session, &config, command).await;
            session.close();
            match outcome {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(Failure::Ledger(err)) => {
                    console::render_error(&mut std::io::stderr().lock(), &err)?;
                    Ok(ExitCode::FAILURE)
                }
                Err(Failure::Other(err)) => Err(err),
            }
        }
    }
}

enum Failure {
    Ledger(EngineError),
    Other(AnyError),
}

impl From<EngineError> for Failure {
    fn from(err: EngineError) -> Self {
        Failure::Ledger(err)
    }
}

impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        Failure::Other(err.into())
    }
}

async fn dispatch(session: &Session, config: &Config, command: Commands) -> Result<(), Failure> {
    let ledger = &session.ledger;
    let mut out = std::io::stdout().lock();

    match command {
        Commands::Person(PersonCommand::Add { name, email }) => {
            let person = ledger.register_person(&name, &email).await?;
            write!(out, "Enrolled ")?;
            console::render_person(&mut out, &person)?;
        }
        Commands::Person(PersonCommand::Rename { email, name }) => {
            if ledger.rename_person(&email, &name).await? {
                writeln!(out, "Renamed {email} to {name}")?;
            } else {
                writeln!(out, "No single person is registered as {email}; nothing renamed")?;
            }
        }
        Commands::Person(PersonCommand::List) => {
            let people = ledger.list_people().await?;
            console::render_people(&mut out, &people)?;
        }
        Commands::Event(EventCommand::Add {
            name,
            points,
            emails,
        }) => {
            let summary = ledger.apply_adjustment(&name, &emails, points).await?;
            console::render_summary(&mut out, "Recorded", &summary)?;
        }
        Commands::Event(EventCommand::Remove { id, latest }) => {
            let summary = match id {
                Some(id) if !latest => ledger.remove_event(id).await?,
                _ => ledger.remove_most_recent_event().await?,
            };
            console::render_summary(&mut out, "Removed", &summary)?;
        }
        Commands::Inspect(args) => {
            let report = ledger.inspect_person(&args.identifier).await?;
            console::render_report(&mut out, &report)?;
        }
        Commands::Rank(args) => {
            let count = args.count.unwrap_or(config.ranking.default_limit);
            let entries = ledger.rank_top(count).await?;
            console::render_rank(&mut out, &entries)?;
        }
        Commands::Balance(BalanceCommand::Check { identifier }) => {
            let check = ledger.validate_balance(&identifier).await?;
            console::render_balance(&mut out, &check)?;
        }
        Commands::Balance(BalanceCommand::Repair { identifier }) => {
            let check = ledger.recompute_balance(&identifier).await?;
            console::render_balance(&mut out, &check)?;
        }
        Commands::Serve(_) | Commands::Keygen(_) => {}
    }
    Ok(())
}
