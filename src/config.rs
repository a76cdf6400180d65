// ⚙️ Configuration - environment-driven settings shared by CLI and server

use chrono::{Datelike, NaiveDate, Utc};
use std::path::{Component, Path, PathBuf};

/// Application-level constants
pub const APP_NAME: &str = "Expense Tracker";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_DB_PATH: &str = "expenses.db";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_IMPORT_DIR: &str = ".";

const MONTHS_RU: [&str; 12] = [
    "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь",
    "Июль", "Август", "Сентябрь", "Октябрь", "Ноябрь", "Декабрь",
];

/// Default `tracing` filter when `RUST_LOG` is not set
pub fn default_log_filter() -> &'static str {
    "expense_tracker=info,expense_server=info,tower_http=info"
}

/// Period label used as the key of a card's period map, e.g. "Октябрь 2025"
pub fn period_label(date: NaiveDate) -> String {
    format!("{} {}", MONTHS_RU[date.month0() as usize], date.year())
}

/// Period label for the current month
pub fn current_period() -> String {
    period_label(Utc::now().date_naive())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite file (EXPENSE_DB_PATH)
    pub database_path: PathBuf,

    /// Address the HTTP server binds to (PORT on 0.0.0.0)
    pub bind_addr: String,

    /// Period key written by imports (IMPORT_PERIOD)
    pub import_period: String,

    /// Directory the HTTP import reads sheets from (IMPORT_DIR)
    pub import_dir: PathBuf,

    /// tracing filter directive (RUST_LOG)
    pub log_filter: String,
}

impl Config {
    /// Build from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank values fall back to defaults
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = get("PORT")
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Config {
            database_path: get("EXPENSE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            bind_addr: format!("0.0.0.0:{}", port),
            import_period: get("IMPORT_PERIOD").unwrap_or_else(current_period),
            import_dir: get("IMPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_IMPORT_DIR)),
            log_filter: get("RUST_LOG").unwrap_or_else(|| default_log_filter().to_string()),
        }
    }
}

impl Config {
    /// Period to import under: `requested` unless blank, else the configured one
    pub fn period_or_default(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.import_period.clone())
    }

    /// Resolve a sheet name against `import_dir`. Only plain relative names
    /// are accepted: no root, no `.` or `..` segments.
    pub fn import_source(&self, name: &str) -> Result<PathBuf, String> {
        let name = name.trim();
        let relative = Path::new(name);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

        if name.is_empty() || !plain {
            return Err(format!(
                "import path must name a file inside the import directory: {:?}",
                name
            ));
        }
        Ok(self.import_dir.join(relative))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn period_label_uses_russian_month_names() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 3).unwrap();
        assert_eq!(period_label(date), "Октябрь 2025");

        let date = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(period_label(date), "Январь 2026");
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = Config::default();
        assert_eq!(config.database_path, PathBuf::from("expenses.db"));
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.import_period, current_period());
        assert_eq!(config.import_dir, PathBuf::from("."));
        assert_eq!(config.log_filter, default_log_filter());
    }

    #[test]
    fn reads_overrides_and_ignores_garbage_port() {
        let vars: HashMap<&str, &str> = [
            ("EXPENSE_DB_PATH", "/tmp/cards.db"),
            ("PORT", "not-a-port"),
            ("IMPORT_PERIOD", "Ноябрь 2025"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.database_path, PathBuf::from("/tmp/cards.db"));
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.import_period, "Ноябрь 2025");
    }

    #[test]
    fn blank_values_fall_back() {
        let config = Config::from_vars(|k| match k {
            "PORT" => Some("8080".to_string()),
            _ => Some("   ".to_string()),
        });
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn blank_requested_period_uses_configured_one() {
        let config = Config::from_vars(|k| (k == "IMPORT_PERIOD").then(|| "Ноябрь 2025".to_string()));

        assert_eq!(config.period_or_default(None), "Ноябрь 2025");
        assert_eq!(config.period_or_default(Some("  ")), "Ноябрь 2025");
        assert_eq!(config.period_or_default(Some(" Октябрь 2025 ")), "Октябрь 2025");
    }

    #[test]
    fn import_source_stays_inside_import_dir() {
        let config = Config::from_vars(|k| (k == "IMPORT_DIR").then(|| "/srv/sheets".to_string()));

        assert_eq!(
            config.import_source("cards.csv").unwrap(),
            PathBuf::from("/srv/sheets/cards.csv")
        );
        assert_eq!(
            config.import_source("2025/cards.csv").unwrap(),
            PathBuf::from("/srv/sheets/2025/cards.csv")
        );

        for bad in ["../etc/passwd", "/etc/passwd", "2025/../../x.csv", "./cards.csv", "", "  "] {
            assert!(config.import_source(bad).is_err(), "accepted {:?}", bad);
        }
    }
}
