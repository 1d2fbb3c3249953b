use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

use parley_core::resolve;
use parley_memory::{seed_defaults, Database};
use parley_schema::ConversationTurn;
use parley_server::state::AppState;

#[derive(Parser)]
#[command(name = "parley", version, about = "parley keyword chatbot")]
struct Cli {
    #[arg(long, default_value = "parley.db", help = "Path to the SQLite database")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the HTTP chat server")]
    Start {
        #[arg(long, default_value = "127.0.0.1", help = "Bind address")]
        host: String,
        #[arg(long, default_value = "3000", help = "HTTP server port")]
        port: u16,
        #[arg(long, help = "Write logs to this directory instead of stderr")]
        log_dir: Option<PathBuf>,
    },
    #[command(about = "Local chat REPL against the rule store (no HTTP)")]
    Chat,
    #[command(subcommand, about = "Manage keyword rules")]
    Rule(RuleCommands),
    #[command(about = "Seed the starter rule set into an empty store")]
    Seed,
}

#[derive(Subcommand)]
enum RuleCommands {
    #[command(about = "List rules in insertion order")]
    List,
    #[command(about = "Add a rule, or update the response of an existing keyword")]
    Add { keyword: String, response: String },
    #[command(about = "Remove a rule by id")]
    Remove { id: String },
}

fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "parley.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let db_path = cli.db.to_string_lossy().into_owned();

    match cli.command {
        Commands::Start {
            host,
            port,
            log_dir,
        } => {
            let _guard = init_tracing(log_dir.as_deref());
            let db = Database::open(&db_path)?;
            let state = AppState::new(&db);

            // Fresh transcript on every boot; rules and accounts persist.
            let cleared = state.log.clear().await?;
            if cleared > 0 {
                tracing::info!("cleared {cleared} conversation turns from previous run");
            }
            let purged = state.users.purge_expired_sessions().await?;
            if purged > 0 {
                tracing::info!("purged {purged} expired sessions");
            }
            seed_defaults(&state.rules).await?;

            parley_server::serve(state, &format!("{host}:{port}")).await
        }
        Commands::Chat => {
            init_tracing(None);
            let db = Database::open(&db_path)?;
            run_repl(&db).await
        }
        Commands::Rule(rule_command) => {
            init_tracing(None);
            let db = Database::open(&db_path)?;
            run_rule_command(&db, rule_command).await
        }
        Commands::Seed => {
            init_tracing(None);
            let db = Database::open(&db_path)?;
            let seeded = seed_defaults(&db.rules()).await?;
            if seeded == 0 {
                println!("store already has rules, nothing to seed");
            } else {
                println!("seeded {seeded} starter rules");
            }
            Ok(())
        }
    }
}

/// Line-oriented REPL: each turn resolves against a fresh snapshot, the
/// same way the HTTP endpoint does.
async fn run_repl(db: &Database) -> Result<()> {
    let rules = db.rules();
    let log = db.log();

    println!("parley chat (ctrl-d, \"exit\" or \"quit\" to leave)");
    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "exit" || message == "quit" {
            break;
        }

        let snapshot = rules.list().await?;
        let resolution = resolve(message, &snapshot);
        println!("bot> {}", resolution.reply);

        log.record(ConversationTurn::new(
            message,
            resolution.reply.clone(),
            resolution.matched,
        ))
        .await?;
    }

    println!("bye");
    Ok(())
}

async fn run_rule_command(db: &Database, command: RuleCommands) -> Result<()> {
    let rules = db.rules();
    match command {
        RuleCommands::List => {
            let listed = rules.list().await?;
            if listed.is_empty() {
                println!("no rules stored");
                return Ok(());
            }
            for rule in listed {
                println!(
                    "{}  {:20}  {}",
                    rule.id,
                    rule.keyword,
                    rule.response
                );
            }
        }
        RuleCommands::Add { keyword, response } => {
            let rule = rules.upsert(&keyword, &response).await?;
            println!("stored rule {} ({})", rule.keyword, rule.id);
        }
        RuleCommands::Remove { id } => {
            let id = Uuid::parse_str(&id)?;
            if rules.remove(id).await? {
                println!("removed {id}");
            } else {
                println!("no rule with id {id}");
            }
        }
    }
    Ok(())
}
