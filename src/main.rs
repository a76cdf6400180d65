use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use expense_tracker::entities::{User, UserRole};
use expense_tracker::{
    count_cards, count_entrepreneurs, db, get_regions, open_database, run_import, Config,
};

#[derive(Parser)]
#[command(name = "expense-tracker")]
#[command(about = "Entrepreneurs, cards and expense tasks - command line tools")]
#[command(version)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "EXPENSE_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the card register sheet (CSV)
    Import {
        /// CSV file exported from the card register
        csv: PathBuf,

        /// Period key for the statuses, e.g. "Октябрь 2025"
        #[arg(long, env = "IMPORT_PERIOD")]
        period: Option<String>,
    },

    /// Show entrepreneur/card counts and regions
    Stats,

    /// Create a user (accountant, manager or admin)
    AddUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "manager")]
        role: String,

        #[arg(long, default_value = "")]
        region: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    expense_tracker::init_tracing(&config.log_filter);

    match cli.command {
        Commands::Import { csv, period } => {
            let period = config.period_or_default(period.as_deref());
            run_import_command(&config, &csv, &period)
        }
        Commands::Stats => run_stats(&config),
        Commands::AddUser {
            email,
            password,
            name,
            role,
            region,
        } => {
            let role: UserRole = role.parse().map_err(anyhow::Error::msg)?;
            run_add_user(&config, User::new(&email, &password, &name, role, &region))
        }
    }
}

fn run_import_command(config: &Config, csv: &Path, period: &str) -> Result<()> {
    println!("📥 Card register import");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n🔧 Opening database {:?}...", config.database_path);
    let conn = open_database(&config.database_path)?;
    let cards_before = count_cards(&conn)?;

    println!("📂 Importing {:?} as \"{}\"...", csv, period);
    let summary = run_import(&conn, csv, period)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Rows read:             {}", summary.rows_read);
    println!("✓ Cards created:         {}", summary.imported_count);
    println!("✓ Cards already known:   {}", summary.cards_existing);
    println!("✓ Entrepreneurs created: {}", summary.entrepreneurs_created);
    println!("✓ Rows skipped:          {}", summary.rows_skipped);
    println!(
        "✓ Cards in database:     {} (was {})",
        count_cards(&conn)?,
        cards_before
    );

    if summary.errors.is_empty() {
        println!("\n🎉 Import complete, no errors");
    } else {
        println!("\n⚠️  {} rows failed:", summary.errors.len());
        for err in &summary.errors {
            println!("   line {}: {}", err.row, err.message);
        }
    }

    Ok(())
}

fn run_stats(config: &Config) -> Result<()> {
    let conn = open_database(&config.database_path)?;

    println!("📊 {:?}", config.database_path);
    println!("   Entrepreneurs: {}", count_entrepreneurs(&conn)?);
    println!("   Cards:         {}", count_cards(&conn)?);
    println!("   Regions:");
    for region in get_regions(&conn)? {
        println!("     - {}", region);
    }

    Ok(())
}

fn run_add_user(config: &Config, user: User) -> Result<()> {
    let conn = open_database(&config.database_path)?;

    let outcome = db::insert_user(&conn, &user)?;
    if outcome.is_created() {
        println!("✓ Created {} {} ({})", user.role.as_str(), user.email, outcome.id());
    } else {
        println!("ℹ️  {} already exists ({})", user.email, outcome.id());
    }

    Ok(())
}
