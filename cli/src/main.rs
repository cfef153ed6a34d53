//! Formsmith CLI
//!
//! Build form schemas, keep them in a local store, and try them out in a
//! terminal preview.
//!
//! # Usage
//!
//! ```bash
//! formsmith forms create Signup
//! formsmith fields add Signup --type text --label Email --required
//! formsmith fields rules Signup <field-id> --email
//! formsmith preview Signup --set <field-id>=ada@example.com --submit
//! formsmith open /preview/Signup
//! formsmith forms list --format json
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "formsmith")]
#[command(version)]
#[command(about = "Formsmith form builder", long_about = None)]
struct Cli {
    /// Directory holding saved forms
    #[arg(long, env = "FORMSMITH_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage saved forms
    Forms {
        #[command(subcommand)]
        action: FormCommands,
    },
    /// Edit the fields of a saved form
    Fields {
        #[command(subcommand)]
        action: FieldCommands,
    },
    /// Fill in a saved form and optionally submit it
    Preview {
        name: String,
        /// Field input as `<field-id>=<value>`; checkbox groups take a comma list
        #[arg(long = "set", value_parser = commands::preview::parse_assignment)]
        set: Vec<(String, String)>,
        /// Validate and submit after applying the inputs
        #[arg(long)]
        submit: bool,
    },
    /// Open a view by path: /create, /myforms or /preview/<name>
    Open { path: String },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum FormCommands {
    /// List saved forms
    List,
    /// Show a form's fields
    Show { name: String },
    /// Create an empty form
    Create { name: String },
    /// Delete a saved form
    Delete { name: String },
    /// Save a form from a `{createdAt, fields}` JSON file
    Import {
        name: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print a form's stored record
    Export { name: String },
}

#[derive(Subcommand)]
enum FieldCommands {
    /// Append a field
    Add {
        form: String,
        #[arg(long = "type", value_parser = commands::fields::parse_field_type)]
        field_type: formsmith_core::FieldType,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        required: bool,
        #[arg(long)]
        default: Option<String>,
    },
    /// Remove a field
    Remove { form: String, id: String },
    /// Move a field one place up or down
    Move {
        form: String,
        id: String,
        #[arg(value_enum)]
        direction: commands::fields::Direction,
    },
    /// Replace the options of a choice field
    Options { form: String, id: String, options: Vec<String> },
    /// Make a field derived from others, or plain again with `--clear`
    Derive {
        form: String,
        id: String,
        #[arg(long, value_delimiter = ',')]
        parents: Vec<String>,
        #[arg(long)]
        expr: Option<String>,
        #[arg(long, conflicts_with_all = ["parents", "expr"])]
        clear: bool,
    },
    /// Set validation rules; flags not given keep their current value
    Rules {
        form: String,
        id: String,
        #[command(flatten)]
        rules: commands::fields::RuleArgs,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let profile = cli.profile.as_deref();
    let config = config::Config::load(profile).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config not readable, using defaults");
        config::Config::default()
    });
    let format = match cli.format {
        Some(format) => format,
        None => config.format()?,
    };

    let command = match cli.command {
        Commands::Config { action } => return commands::config::handle(action, profile),
        command => command,
    };

    let store_dir = match cli.store_dir {
        Some(dir) => dir,
        None => config.store_dir()?,
    };
    let catalog = commands::open_catalog(&store_dir).await?;

    match command {
        Commands::Forms { action } => commands::forms::handle(action, &catalog, format).await,
        Commands::Fields { action } => commands::fields::handle(action, &catalog, format).await,
        Commands::Preview { name, set, submit } => {
            commands::preview::handle(&catalog, &name, &set, submit, format).await
        }
        Commands::Open { path } => commands::open(&path, &catalog, format).await,
        Commands::Config { .. } => Ok(()),
    }
}
