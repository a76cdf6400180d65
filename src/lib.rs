// Expense Tracker - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod importer;
pub mod parser;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{current_period, period_label, Config};
pub use db::{
    Event, Upsert,
    open_database, setup_database, check_store, insert_event, get_events_for_entity,
    find_or_create_entrepreneur, get_all_entrepreneurs, get_regions,
    find_card, insert_card, merge_card_period, get_cards_for_entrepreneur,
    count_entrepreneurs, count_cards,
};
pub use entities::{
    Card, CardType, PeriodStatus, StatusAxis,
    Entrepreneur, ExpenseItem, ExpenseTask, TaskStatus, User, UserRole,
};
pub use importer::{
    ImportError, ImportState, ImportSummary, ReconcilingImporter, RowOutcome, RowPlan,
    plan_rows, run_import,
};
pub use parser::{read_rows, RowError, SheetRow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `filter`.
pub fn init_tracing(filter: &str) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // A second call (tests, embedded use) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}
