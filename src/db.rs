use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::entities::{
    Card, CardType, CardWithOwner, Entrepreneur, EntrepreneurWithCards, ExpenseItem,
    ExpenseItemUpdate, ExpenseTask, PeriodStatus, TaskStatus, TaskUpdate, User, UserRole,
};

// ============================================================================
// EVENTS (audit trail)
// ============================================================================

/// Event for audit trail ("every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Outcome of an insert guarded by a UNIQUE constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// Row was inserted; holds the new id
    Created(String),

    /// A row with the same natural key already exists; holds its id
    Existing(String),
}

impl Upsert {
    pub fn id(&self) -> &str {
        match self {
            Upsert::Created(id) | Upsert::Existing(id) => id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Upsert::Created(_))
    }
}

// ============================================================================
// SETUP
// ============================================================================

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entrepreneurs (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            region TEXT NOT NULL,
            inn TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (name, region)
        );

        CREATE TABLE IF NOT EXISTS cards (
            id TEXT PRIMARY KEY,
            entrepreneur_id TEXT NOT NULL REFERENCES entrepreneurs(id),
            card_type TEXT NOT NULL CHECK (card_type IN ('corp', 'personal')),
            number_mask TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT '',
            extra TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (entrepreneur_id, number_mask, card_type)
        );

        -- One row per card and period; axes are merged, never cleared
        CREATE TABLE IF NOT EXISTS card_periods (
            card_id TEXT NOT NULL REFERENCES cards(id),
            period TEXT NOT NULL,
            corporate TEXT,
            market TEXT,
            personal TEXT,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (card_id, period)
        );

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'manager',
            region TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS expense_items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_by TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS expense_tasks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            entrepreneur_id TEXT NOT NULL,
            card_id TEXT NOT NULL,
            expense_item_id TEXT NOT NULL,
            assigned_to TEXT NOT NULL,
            region TEXT NOT NULL,
            planned_amount REAL NOT NULL,
            due_date TEXT NOT NULL,
            comment_for_manager TEXT NOT NULL DEFAULT '',
            actual_amount REAL,
            actual_completion_date TEXT,
            manager_comment TEXT NOT NULL DEFAULT '',
            receipt_photo_url TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'assigned',
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Audit trail / event sourcing
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entrepreneurs_region ON entrepreneurs(region);
        CREATE INDEX IF NOT EXISTS idx_cards_entrepreneur ON cards(entrepreneur_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_region ON expense_tasks(region);
        CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON expense_tasks(assigned_to);
        CREATE INDEX IF NOT EXISTS idx_users_region_role ON users(region, role);
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);",
    )
    .context("Failed to create schema")?;

    Ok(())
}

/// Liveness check: the store answers and the schema is in place
pub fn check_store(conn: &Connection) -> Result<()> {
    let tables: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type = 'table' AND name IN ('entrepreneurs', 'cards', 'card_periods')",
        [],
        |row| row.get(0),
    )?;

    if tables != 3 {
        anyhow::bail!("schema not initialised (found {} of 3 import tables)", tables);
    }
    Ok(())
}

// ============================================================================
// ROW HELPERS
// ============================================================================

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_ts(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

fn parse_enum<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|msg| {
        conversion_error(idx, std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
    })
}

// ============================================================================
// EVENTS
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_ts(row, 1)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| conversion_error(5, e))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// ENTREPRENEURS
// ============================================================================

const ENTREPRENEUR_COLUMNS: &str =
    "id, name, region, inn, is_active, created_at, updated_at";

fn entrepreneur_from_row(row: &Row) -> rusqlite::Result<Entrepreneur> {
    Ok(Entrepreneur {
        id: row.get(0)?,
        name: row.get(1)?,
        region: row.get(2)?,
        inn: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_ts(row, 5)?,
        updated_at: parse_ts(row, 6)?,
    })
}

pub fn find_entrepreneur(conn: &Connection, name: &str, region: &str) -> Result<Option<Entrepreneur>> {
    let sql = format!(
        "SELECT {} FROM entrepreneurs WHERE name = ?1 AND region = ?2",
        ENTREPRENEUR_COLUMNS
    );
    let found = conn
        .query_row(&sql, params![name.trim(), region.trim()], entrepreneur_from_row)
        .optional()?;
    Ok(found)
}

/// Insert an entrepreneur unless (name, region) already exists
pub fn insert_entrepreneur(conn: &Connection, ip: &Entrepreneur) -> Result<Upsert> {
    let result = conn.execute(
        "INSERT INTO entrepreneurs (id, name, region, inn, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            ip.id,
            ip.name,
            ip.region,
            ip.inn,
            ip.is_active,
            ip.created_at.to_rfc3339(),
            ip.updated_at.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => Ok(Upsert::Created(ip.id.clone())),
        Err(e) if is_constraint_violation(&e) => {
            let existing = find_entrepreneur(conn, &ip.name, &ip.region)?
                .with_context(|| format!("Entrepreneur {:?} vanished after conflict", ip.name))?;
            Ok(Upsert::Existing(existing.id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Find-or-create keyed by (name, region)
pub fn find_or_create_entrepreneur(
    conn: &Connection,
    name: &str,
    region: &str,
) -> Result<(Entrepreneur, bool)> {
    if let Some(existing) = find_entrepreneur(conn, name, region)? {
        return Ok((existing, false));
    }

    let candidate = Entrepreneur::new(name, region);
    match insert_entrepreneur(conn, &candidate)? {
        Upsert::Created(_) => Ok((candidate, true)),
        Upsert::Existing(id) => {
            let existing = get_entrepreneur(conn, &id)?
                .with_context(|| format!("Entrepreneur {} not found", id))?;
            Ok((existing, false))
        }
    }
}

pub fn get_entrepreneur(conn: &Connection, id: &str) -> Result<Option<Entrepreneur>> {
    let sql = format!("SELECT {} FROM entrepreneurs WHERE id = ?1", ENTREPRENEUR_COLUMNS);
    Ok(conn.query_row(&sql, [id], entrepreneur_from_row).optional()?)
}

/// All entrepreneurs sorted by name
pub fn get_all_entrepreneurs(conn: &Connection) -> Result<Vec<Entrepreneur>> {
    let sql = format!("SELECT {} FROM entrepreneurs ORDER BY name, region", ENTREPRENEUR_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], entrepreneur_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_entrepreneurs_by_region(conn: &Connection, region: &str) -> Result<Vec<Entrepreneur>> {
    let sql = format!(
        "SELECT {} FROM entrepreneurs WHERE region = ?1 ORDER BY name",
        ENTREPRENEUR_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([region], entrepreneur_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Distinct regions that have at least one entrepreneur
pub fn get_regions(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT region FROM entrepreneurs ORDER BY region")?;
    let regions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(regions)
}

pub fn get_entrepreneurs_with_cards(
    conn: &Connection,
    region: &str,
) -> Result<Vec<EntrepreneurWithCards>> {
    get_entrepreneurs_by_region(conn, region)?
        .into_iter()
        .map(|entrepreneur| {
            let cards = get_cards_for_entrepreneur(conn, &entrepreneur.id)?;
            Ok::<_, anyhow::Error>(EntrepreneurWithCards { entrepreneur, cards })
        })
        .collect()
}

// ============================================================================
// CARDS
// ============================================================================

const CARD_COLUMNS: &str =
    "c.id, c.entrepreneur_id, c.card_type, c.number_mask, c.status, c.extra, c.created_at, c.updated_at";

fn card_from_row(row: &Row) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        entrepreneur_id: row.get(1)?,
        card_type: parse_enum::<CardType>(row, 2)?,
        number_mask: row.get(3)?,
        status: row.get(4)?,
        extra: row.get(5)?,
        periods: BTreeMap::new(),
        created_at: parse_ts(row, 6)?,
        updated_at: parse_ts(row, 7)?,
    })
}

fn load_periods(conn: &Connection, card_id: &str) -> Result<BTreeMap<String, PeriodStatus>> {
    let mut stmt = conn.prepare(
        "SELECT period, corporate, market, personal FROM card_periods WHERE card_id = ?1",
    )?;
    let periods = stmt
        .query_map([card_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                PeriodStatus {
                    corporate: row.get(1)?,
                    market: row.get(2)?,
                    personal: row.get(3)?,
                },
            ))
        })?
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(periods)
}

fn with_periods(conn: &Connection, mut cards: Vec<Card>) -> Result<Vec<Card>> {
    for card in cards.iter_mut() {
        card.periods = load_periods(conn, &card.id)?;
    }
    Ok(cards)
}

/// Look up a card by its dedup triple
pub fn find_card(
    conn: &Connection,
    entrepreneur_id: &str,
    number_mask: &str,
    card_type: CardType,
) -> Result<Option<Card>> {
    let sql = format!(
        "SELECT {} FROM cards c
         WHERE c.entrepreneur_id = ?1 AND c.number_mask = ?2 AND c.card_type = ?3",
        CARD_COLUMNS
    );
    let card = conn
        .query_row(
            &sql,
            params![entrepreneur_id, number_mask.trim(), card_type.as_str()],
            card_from_row,
        )
        .optional()?;

    match card {
        Some(mut card) => {
            card.periods = load_periods(conn, &card.id)?;
            Ok(Some(card))
        }
        None => Ok(None),
    }
}

/// Insert a card unless (entrepreneur, mask, type) already exists.
/// Periods carried by `card` are written too when it is created.
pub fn insert_card(conn: &Connection, card: &Card) -> Result<Upsert> {
    let result = conn.execute(
        "INSERT INTO cards (
            id, entrepreneur_id, card_type, number_mask, status, extra, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            card.id,
            card.entrepreneur_id,
            card.card_type.as_str(),
            card.number_mask,
            card.status,
            card.extra,
            card.created_at.to_rfc3339(),
            card.updated_at.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => {
            for (period, status) in &card.periods {
                merge_card_period(conn, &card.id, period, status)?;
            }
            Ok(Upsert::Created(card.id.clone()))
        }
        Err(e) if is_constraint_violation(&e) => {
            match find_card(conn, &card.entrepreneur_id, &card.number_mask, card.card_type)? {
                Some(existing) => Ok(Upsert::Existing(existing.id)),
                // Conflict on something other than the dedup key (e.g. unknown owner)
                None => Err(anyhow::Error::new(e).context(format!(
                    "Card {} rejected by constraint",
                    card.number_mask
                ))),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Merge the axes set in `status` into (card, period); unset axes keep their value
pub fn merge_card_period(
    conn: &Connection,
    card_id: &str,
    period: &str,
    status: &PeriodStatus,
) -> Result<()> {
    conn.execute(
        "INSERT INTO card_periods (card_id, period, corporate, market, personal, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (card_id, period) DO UPDATE SET
            corporate = COALESCE(excluded.corporate, card_periods.corporate),
            market = COALESCE(excluded.market, card_periods.market),
            personal = COALESCE(excluded.personal, card_periods.personal),
            updated_at = excluded.updated_at",
        params![
            card_id,
            period,
            status.corporate,
            status.market,
            status.personal,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to write period {:?} for card {}", period, card_id))?;

    Ok(())
}

/// Replace the flat display status
pub fn update_card_status(conn: &Connection, card_id: &str, status: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE cards SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status, Utc::now().to_rfc3339(), card_id],
    )?;
    Ok(changed > 0)
}

pub fn get_card(conn: &Connection, id: &str) -> Result<Option<Card>> {
    let sql = format!("SELECT {} FROM cards c WHERE c.id = ?1", CARD_COLUMNS);
    match conn.query_row(&sql, [id], card_from_row).optional()? {
        Some(mut card) => {
            card.periods = load_periods(conn, &card.id)?;
            Ok(Some(card))
        }
        None => Ok(None),
    }
}

pub fn get_cards_for_entrepreneur(conn: &Connection, entrepreneur_id: &str) -> Result<Vec<Card>> {
    let sql = format!(
        "SELECT {} FROM cards c WHERE c.entrepreneur_id = ?1 ORDER BY c.card_type, c.number_mask",
        CARD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let cards = stmt
        .query_map([entrepreneur_id], card_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    with_periods(conn, cards)
}

fn query_cards_with_owner(
    conn: &Connection,
    filter: &str,
    args: &[&dyn rusqlite::ToSql],
) -> Result<Vec<CardWithOwner>> {
    let sql = format!(
        "SELECT {}, e.id, e.name, e.region, e.inn, e.is_active, e.created_at, e.updated_at
         FROM cards c
         JOIN entrepreneurs e ON e.id = c.entrepreneur_id
         {}
         ORDER BY c.created_at DESC, c.rowid DESC",
        CARD_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(args, |row| {
            let card = card_from_row(row)?;
            let entrepreneur = Entrepreneur {
                id: row.get(8)?,
                name: row.get(9)?,
                region: row.get(10)?,
                inn: row.get(11)?,
                is_active: row.get(12)?,
                created_at: parse_ts(row, 13)?,
                updated_at: parse_ts(row, 14)?,
            };
            Ok(CardWithOwner { card, entrepreneur })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|mut item| {
            item.card.periods = load_periods(conn, &item.card.id)?;
            Ok::<_, anyhow::Error>(item)
        })
        .collect()
}

/// All cards with their owners, newest first
pub fn get_all_cards(conn: &Connection) -> Result<Vec<CardWithOwner>> {
    query_cards_with_owner(conn, "", &[])
}

/// Cards whose owner belongs to `region`, newest first
pub fn get_cards_by_region(conn: &Connection, region: &str) -> Result<Vec<CardWithOwner>> {
    query_cards_with_owner(conn, "WHERE e.region = ?1", &[&region])
}

pub fn count_entrepreneurs(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM entrepreneurs", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_cards(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// USERS
// ============================================================================

const USER_COLUMNS: &str = "id, email, password_hash, name, role, region, created_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        role: parse_enum::<UserRole>(row, 4)?,
        region: row.get(5)?,
        created_at: parse_ts(row, 6)?,
    })
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<Upsert> {
    let result = conn.execute(
        "INSERT INTO users (id, email, password_hash, name, role, region, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id,
            user.email,
            user.password_hash,
            user.name,
            user.role.as_str(),
            user.region,
            user.created_at.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => Ok(Upsert::Created(user.id.clone())),
        Err(e) if is_constraint_violation(&e) => {
            let id: String = conn.query_row(
                "SELECT id FROM users WHERE email = ?1",
                [&user.email],
                |row| row.get(0),
            )?;
            Ok(Upsert::Existing(id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Email + password check; None when either does not match
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
    let user = conn
        .query_row(&sql, [email.trim().to_lowercase()], user_from_row)
        .optional()?;
    Ok(user.filter(|u| u.verify_password(password)))
}

pub fn get_managers_by_region(conn: &Connection, region: &str) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users WHERE role = 'manager' AND region = ?1 ORDER BY name",
        USER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map([region], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

// ============================================================================
// EXPENSE ITEMS
// ============================================================================

const ITEM_COLUMNS: &str = "id, name, description, created_by, is_active, created_at, updated_at";

fn item_from_row(row: &Row) -> rusqlite::Result<ExpenseItem> {
    Ok(ExpenseItem {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_ts(row, 5)?,
        updated_at: parse_ts(row, 6)?,
    })
}

pub fn insert_expense_item(conn: &Connection, item: &ExpenseItem) -> Result<()> {
    conn.execute(
        "INSERT INTO expense_items (id, name, description, created_by, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            item.id,
            item.name,
            item.description,
            item.created_by,
            item.is_active,
            item.created_at.to_rfc3339(),
            item.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_expense_item(conn: &Connection, id: &str) -> Result<Option<ExpenseItem>> {
    let sql = format!("SELECT {} FROM expense_items WHERE id = ?1", ITEM_COLUMNS);
    Ok(conn.query_row(&sql, [id], item_from_row).optional()?)
}

/// Active items sorted by name
pub fn get_active_expense_items(conn: &Connection) -> Result<Vec<ExpenseItem>> {
    let sql = format!(
        "SELECT {} FROM expense_items WHERE is_active = 1 ORDER BY name",
        ITEM_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map([], item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

pub fn get_expense_items_by_creator(conn: &Connection, user_id: &str) -> Result<Vec<ExpenseItem>> {
    let sql = format!(
        "SELECT {} FROM expense_items WHERE created_by = ?1 AND is_active = 1 ORDER BY name",
        ITEM_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map([user_id], item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

fn save_expense_item(conn: &Connection, item: &ExpenseItem) -> Result<()> {
    conn.execute(
        "UPDATE expense_items SET name = ?1, description = ?2, is_active = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            item.name,
            item.description,
            item.is_active,
            item.updated_at.to_rfc3339(),
            item.id,
        ],
    )?;
    Ok(())
}

/// Apply a partial update; Ok(None) when the item does not exist.
/// A rejected update surfaces as an error carrying the validation message.
pub fn update_expense_item(
    conn: &Connection,
    id: &str,
    update: &ExpenseItemUpdate,
) -> Result<Option<ExpenseItem>> {
    let Some(mut item) = get_expense_item(conn, id)? else {
        return Ok(None);
    };
    update.apply(&mut item).map_err(anyhow::Error::msg)?;
    save_expense_item(conn, &item)?;
    Ok(Some(item))
}

/// Soft delete
pub fn deactivate_expense_item(conn: &Connection, id: &str) -> Result<Option<ExpenseItem>> {
    let update = ExpenseItemUpdate {
        is_active: Some(false),
        ..Default::default()
    };
    update_expense_item(conn, id, &update)
}

// ============================================================================
// EXPENSE TASKS
// ============================================================================

const TASK_COLUMNS: &str = "id, title, description, entrepreneur_id, card_id, expense_item_id,
    assigned_to, region, planned_amount, due_date, comment_for_manager, actual_amount,
    actual_completion_date, manager_comment, receipt_photo_url, status, created_by,
    created_at, updated_at";

fn task_from_row(row: &Row) -> rusqlite::Result<ExpenseTask> {
    let completion: Option<String> = row.get(12)?;
    let actual_completion_date = match completion {
        Some(raw) => Some(
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_error(12, e))?,
        ),
        None => None,
    };

    Ok(ExpenseTask {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        entrepreneur: row.get(3)?,
        card_id: row.get(4)?,
        expense_item_id: row.get(5)?,
        assigned_to: row.get(6)?,
        region: row.get(7)?,
        planned_amount: row.get(8)?,
        due_date: parse_date(row, 9)?,
        comment_for_manager: row.get(10)?,
        actual_amount: row.get(11)?,
        actual_completion_date,
        manager_comment: row.get(13)?,
        receipt_photo_url: row.get(14)?,
        status: parse_enum::<TaskStatus>(row, 15)?,
        created_by: row.get(16)?,
        created_at: parse_ts(row, 17)?,
        updated_at: parse_ts(row, 18)?,
    })
}

pub fn insert_task(conn: &Connection, task: &ExpenseTask) -> Result<()> {
    conn.execute(
        "INSERT INTO expense_tasks (
            id, title, description, entrepreneur_id, card_id, expense_item_id,
            assigned_to, region, planned_amount, due_date, comment_for_manager, actual_amount,
            actual_completion_date, manager_comment, receipt_photo_url, status, created_by,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            task.id,
            task.title,
            task.description,
            task.entrepreneur,
            task.card_id,
            task.expense_item_id,
            task.assigned_to,
            task.region,
            task.planned_amount,
            task.due_date.to_string(),
            task.comment_for_manager,
            task.actual_amount,
            task.actual_completion_date.map(|d| d.to_string()),
            task.manager_comment,
            task.receipt_photo_url,
            task.status.as_str(),
            task.created_by,
            task.created_at.to_rfc3339(),
            task.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn query_tasks(conn: &Connection, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<ExpenseTask>> {
    let sql = format!(
        "SELECT {} FROM expense_tasks {} ORDER BY created_at DESC, rowid DESC",
        TASK_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(args, task_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

/// All tasks, newest first
pub fn get_all_tasks(conn: &Connection) -> Result<Vec<ExpenseTask>> {
    query_tasks(conn, "", &[])
}

pub fn get_tasks_by_assignee(conn: &Connection, user_id: &str) -> Result<Vec<ExpenseTask>> {
    query_tasks(conn, "WHERE assigned_to = ?1", &[&user_id])
}

pub fn get_tasks_by_region(conn: &Connection, region: &str) -> Result<Vec<ExpenseTask>> {
    query_tasks(conn, "WHERE region = ?1", &[&region])
}

pub fn get_task(conn: &Connection, id: &str) -> Result<Option<ExpenseTask>> {
    let sql = format!("SELECT {} FROM expense_tasks WHERE id = ?1", TASK_COLUMNS);
    Ok(conn.query_row(&sql, [id], task_from_row).optional()?)
}

/// Apply a workflow update. Ok(None) when the task does not exist;
/// lifecycle violations surface as `TaskError` inside the anyhow error.
pub fn update_task(conn: &Connection, id: &str, update: &TaskUpdate) -> Result<Option<ExpenseTask>> {
    let Some(mut task) = get_task(conn, id)? else {
        return Ok(None);
    };
    let previous = task.status;
    update.apply(&mut task)?;

    conn.execute(
        "UPDATE expense_tasks SET
            title = ?1, description = ?2, assigned_to = ?3, planned_amount = ?4,
            due_date = ?5, comment_for_manager = ?6, actual_amount = ?7,
            actual_completion_date = ?8, manager_comment = ?9, receipt_photo_url = ?10,
            status = ?11, updated_at = ?12
         WHERE id = ?13",
        params![
            task.title,
            task.description,
            task.assigned_to,
            task.planned_amount,
            task.due_date.to_string(),
            task.comment_for_manager,
            task.actual_amount,
            task.actual_completion_date.map(|d| d.to_string()),
            task.manager_comment,
            task.receipt_photo_url,
            task.status.as_str(),
            task.updated_at.to_rfc3339(),
            task.id,
        ],
    )?;

    if previous != task.status {
        let event = Event::new(
            "task_status_changed",
            "expense_task",
            &task.id,
            serde_json::json!({ "from": previous.as_str(), "to": task.status.as_str() }),
            "api",
        );
        if let Err(e) = insert_event(conn, &event) {
            tracing::warn!(task_id = %task.id, "Failed to record status change: {e}");
        }
    }

    Ok(Some(task))
}

// ============================================================================
// TESTS
// ============================================================================
