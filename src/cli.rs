use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "scorekeeper")]
#[command(about = "Point ledger for people and the events that score them", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $SCOREKEEPER_CONFIG or config/scorekeeper.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Talk to a running `scorekeeper serve` instead of the local store
    #[arg(long, global = true, value_name = "URL")]
    pub remote: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the ledger over signed HTTP
    Serve(ServeArgs),
    /// Generate a shared secret for remote mode
    Keygen(KeygenArgs),
    /// Manage people
    #[command(subcommand)]
    Person(PersonCommand),
    /// Record or reverse events
    #[command(subcommand)]
    Event(EventCommand),
    /// Show a person's total and event history
    Inspect(InspectArgs),
    /// Show the leaderboard
    Rank(RankArgs),
    /// Check stored totals against event history
    #[command(subcommand)]
    Balance(BalanceCommand),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to (overrides server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Also write the secret to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum PersonCommand {
    /// Enroll a new person
    Add { name: String, email: String },
    /// Change the display name registered to an email
    Rename { email: String, name: String },
    /// List everyone enrolled
    List,
}

#[derive(Subcommand, Debug)]
pub enum EventCommand {
    /// Give every listed person the same number of points
    Add {
        /// Event name
        #[arg(long, short)]
        name: String,
        /// Points per participant; may be negative
        #[arg(long, short, allow_hyphen_values = true)]
        points: i64,
        /// Participant emails, processed in order
        #[arg(required = true)]
        emails: Vec<String>,
    },
    /// Reverse an event and delete it
    Remove {
        /// Event id
        #[arg(required_unless_present = "latest", conflicts_with = "latest")]
        id: Option<Uuid>,
        /// Remove the most recently recorded event
        #[arg(long)]
        latest: bool,
    },
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Email or person id
    pub identifier: String,
}

#[derive(Args, Debug)]
pub struct RankArgs {
    /// How many people to show (defaults to ranking.default_limit)
    #[arg(allow_negative_numbers = true)]
    pub count: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum BalanceCommand {
    /// Report whether the stored total matches the event history
    Check { identifier: String },
    /// Overwrite a diverged stored total with the event sum
    Repair { identifier: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_add_with_negative_points() {
        let cli = Cli::try_parse_from([
            "scorekeeper",
            "event",
            "add",
            "--name",
            "penalty",
            "--points",
            "-3",
            "a@example.com",
            "b@example.com",
        ])
        .unwrap();

        match cli.command {
            Commands::Event(EventCommand::Add {
                name,
                points,
                emails,
            }) => {
                assert_eq!(name, "penalty");
                assert_eq!(points, -3);
                assert_eq!(emails.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_remove_latest() {
        let cli = Cli::try_parse_from(["scorekeeper", "event", "remove", "--latest"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Event(EventCommand::Remove { id: None, latest: true })
        ));

        assert!(Cli::try_parse_from(["scorekeeper", "event", "remove"]).is_err());
    }

    #[test]
    fn test_parse_rank_negative_and_remote() {
        let cli = Cli::try_parse_from([
            "scorekeeper",
            "--remote",
            "http://127.0.0.1:8080",
            "rank",
            "-5",
        ])
        .unwrap();
        assert_eq!(cli.remote.as_deref(), Some("http://127.0.0.1:8080"));
        assert!(matches!(
            cli.command,
            Commands::Rank(RankArgs { count: Some(-5) })
        ));
    }
}
