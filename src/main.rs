//! passforge command line front end.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use passforge::app::App;
use passforge::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use passforge::types::errors::AppError;
use passforge::types::history::HistoryView;
use passforge::types::password::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate passwords and keep a synced history", long_about = None)]
struct Args {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, env = "PASSFORGE_CONFIG")]
    config: Option<String>,

    /// Print JSON instead of plain text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a password and record it in history
    Generate {
        /// Password length (8 to 32)
        #[arg(short, long)]
        length: Option<usize>,

        #[arg(long, overrides_with = "no_lowercase")]
        lowercase: bool,
        #[arg(long)]
        no_lowercase: bool,

        #[arg(long, overrides_with = "no_uppercase")]
        uppercase: bool,
        #[arg(long)]
        no_uppercase: bool,

        #[arg(long, overrides_with = "no_numbers")]
        numbers: bool,
        #[arg(long)]
        no_numbers: bool,

        #[arg(long, overrides_with = "no_symbols")]
        symbols: bool,
        #[arg(long)]
        no_symbols: bool,

        /// Symbols to draw from, e.g. "!@#"
        #[arg(long)]
        symbol_set: Option<String>,

        /// Store these options as the new defaults
        #[arg(long)]
        save: bool,
    },

    /// List history entries
    History {
        /// Only show favorites
        #[arg(long)]
        favorites: bool,
    },

    /// Toggle the favorite flag of an entry
    Favorite {
        #[arg(required = true)]
        id: String,
    },

    /// Remove an entry
    Remove {
        #[arg(required = true)]
        id: String,
    },

    /// Remove every non-favorite entry
    Clear,

    /// Sign in to the sync backend
    Login {
        #[arg(long, env = "PASSFORGE_EMAIL")]
        email: String,

        #[arg(long, env = "PASSFORGE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Create the account first
        #[arg(long)]
        sign_up: bool,
    },

    /// Sign out of the sync backend
    Logout,

    /// Merge remote favorites into local history
    Sync,

    /// Show or change settings
    Config {
        /// Dot path of the setting to change, e.g. history.capacity
        key: Option<String>,

        /// New value as JSON (bare words are taken as strings)
        value: Option<String>,
    },
}

/// Resolves a `--flag` / `--no-flag` pair to an override.
fn flag(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn print<T: serde::Serialize + std::fmt::Debug>(json: bool, value: &T) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => log::error!("failed to encode output: {}", e),
        }
    } else {
        println!("{:#?}", value);
    }
}

fn report_notices(app: &App) {
    for notice in app.drain_notices() {
        eprintln!("warning: {} not synced: {}", notice.operation, notice.message);
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let mut engine = SettingsEngine::new(args.config.clone());
    engine.load()?;
    engine.apply_env_overrides();

    if let Command::Config { key, value } = &args.command {
        match (key, value) {
            (Some(key), Some(raw)) => {
                let value = serde_json::from_str(raw)
                    .unwrap_or_else(|_| serde_json::Value::String(raw.clone()));
                engine.set_value(key, value)?;
                println!("{} updated", key);
            }
            (Some(key), None) => print(true, &engine.get_value(key)?),
            (None, _) => print(true, engine.get_settings()),
        }
        return Ok(());
    }

    let app = Arc::new(App::new(engine.into_settings())?);

    match args.command {
        Command::Generate {
            length,
            lowercase,
            no_lowercase,
            uppercase,
            no_uppercase,
            numbers,
            no_numbers,
            symbols,
            no_symbols,
            symbol_set,
            save,
        } => {
            let overrides = ConfigOverrides {
                length,
                include_lowercase: flag(lowercase, no_lowercase),
                include_uppercase: flag(uppercase, no_uppercase),
                include_numbers: flag(numbers, no_numbers),
                include_symbols: flag(symbols, no_symbols),
                custom_symbols: symbol_set.map(|s| s.chars().collect()),
            };
            if save {
                app.update_config(&overrides)?;
            }
            let generated = app.generate(Some(&overrides))?;
            if args.json {
                print(true, &generated);
            } else {
                println!("{}", generated.password);
                eprintln!("{:.1} bits of entropy, id {}", generated.entropy_bits, generated.entry.id);
            }
        }
        Command::History { favorites } => {
            let view = if favorites { HistoryView::Favorites } else { HistoryView::All };
            let entries = app.history(view);
            if args.json {
                print(true, &entries);
            } else {
                for e in &entries {
                    let star = if e.is_favorite { "*" } else { " " };
                    println!("{} {}  {}  {}", star, e.id, e.created_at.to_rfc3339(), e.password);
                }
            }
        }
        Command::Favorite { id } => {
            match app.toggle_favorite(&id).await? {
                Some(entry) => println!("{} favorite: {}", entry.id, entry.is_favorite),
                None => eprintln!("no entry {}", id),
            }
            report_notices(&app);
        }
        Command::Remove { id } => {
            match app.remove(&id).await? {
                Some(entry) => println!("removed {}", entry.id),
                None => eprintln!("no entry {}", id),
            }
            report_notices(&app);
        }
        Command::Clear => {
            let removed = app.clear_history()?;
            println!("removed {} entries", removed);
        }
        Command::Login { email, password, sign_up } => {
            let session = if sign_up {
                match app.sign_up(&email, &password).await? {
                    Some(session) => session,
                    None => {
                        println!("check your inbox to confirm {}", email);
                        return Ok(());
                    }
                }
            } else {
                app.sign_in(&email, &password).await?
            };
            println!("signed in as {}", session.user.email.as_deref().unwrap_or(&session.user.id));
            report_notices(&app);
        }
        Command::Logout => {
            app.sign_out().await?;
            println!("signed out");
        }
        Command::Sync => {
            let outcome = app.sync_now().await?;
            print(args.json, &app.sync_state());
            log::debug!("sync outcome: {:?}", outcome);
        }
        Command::Config { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
