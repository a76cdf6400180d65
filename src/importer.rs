// 📥 Reconciling Importer - card register sheet → entrepreneurs + cards
//
// Two stages:
//   1. plan:  a fold over the rows carrying ImportState { current_region }.
//             Pure, no store access.
//   2. apply: each planned row is written in source order; a failed row is
//             recorded and the batch moves on.

use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::current_period;
use crate::db::{self, Event, Upsert};
use crate::entities::{normalize_mask, Card, CardType, PeriodStatus};
use crate::parser::{read_rows, RowError, SheetRow};

pub const IMPORT_ACTOR: &str = "csv_importer";

/// Failures that abort the whole run before any write
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("source unreadable: {path}: {reason}")]
    SourceUnreadable { path: String, reason: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

// ============================================================================
// PLANNING (pure fold)
// ============================================================================

/// Accumulator threaded from row to row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportState {
    pub current_region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Header, separator or region-label row
    EmptyName,

    /// Data before the first region cell
    NoRegion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCard {
    pub card_type: CardType,
    pub number_mask: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRow {
    pub line_number: usize,
    pub name: String,
    pub region: String,
    pub cards: Vec<PlannedCard>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPlan {
    Skip { line_number: usize, reason: SkipReason },
    Upsert(PlannedRow),
}

impl ImportState {
    /// Consume one row: returns the next state and what to do with the row
    pub fn advance(self, row: &SheetRow) -> (ImportState, RowPlan) {
        let current_region = if row.region.is_empty() {
            self.current_region
        } else {
            Some(row.region.clone())
        };
        let next = ImportState { current_region };

        if row.name.is_empty() {
            let plan = RowPlan::Skip {
                line_number: row.line_number,
                reason: SkipReason::EmptyName,
            };
            return (next, plan);
        }

        let Some(region) = next.current_region.clone() else {
            let plan = RowPlan::Skip {
                line_number: row.line_number,
                reason: SkipReason::NoRegion,
            };
            return (next, plan);
        };

        let slots = [
            (CardType::Corp, &row.corp_mask, &row.corp_status),
            (CardType::Personal, &row.personal_mask, &row.personal_status),
        ];
        let cards = slots
            .into_iter()
            .filter_map(|(card_type, mask, status)| {
                normalize_mask(mask).map(|number_mask| PlannedCard {
                    card_type,
                    number_mask,
                    status: status.trim().to_string(),
                })
            })
            .collect();

        let plan = RowPlan::Upsert(PlannedRow {
            line_number: row.line_number,
            name: row.name.clone(),
            region,
            cards,
        });
        (next, plan)
    }
}

/// Plan a whole sheet in source order
pub fn plan_rows(rows: &[SheetRow]) -> Vec<RowPlan> {
    rows.iter()
        .scan(ImportState::default(), |state, row| {
            let (next, plan) = std::mem::take(state).advance(row);
            *state = next;
            Some(plan)
        })
        .collect()
}

// ============================================================================
// OUTCOMES & SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    Imported {
        row: usize,
        entrepreneur_created: bool,
        cards_created: usize,
        cards_existing: usize,
    },
    Skipped {
        row: usize,
        reason: SkipReason,
    },
    /// A write failed part way; counts cover what was written before it
    Failed {
        row: usize,
        message: String,
        entrepreneur_created: bool,
        cards_created: usize,
    },
}

impl RowOutcome {
    /// Failure before anything was written
    pub fn failed(row: usize, message: impl Into<String>) -> Self {
        RowOutcome::Failed {
            row,
            message: message.into(),
            entrepreneur_created: false,
            cards_created: 0,
        }
    }
}

/// Report returned by "run import"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Period key the statuses were written under
    pub period: String,

    /// Cards created by this run
    pub imported_count: usize,

    pub entrepreneurs_created: usize,
    pub cards_existing: usize,
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub errors: Vec<RowError>,
}

impl ImportSummary {
    pub fn new(period: &str) -> Self {
        ImportSummary {
            period: period.to_string(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &RowOutcome) {
        self.rows_read += 1;
        match outcome {
            RowOutcome::Imported {
                entrepreneur_created,
                cards_created,
                cards_existing,
                ..
            } => {
                self.imported_count += cards_created;
                self.cards_existing += cards_existing;
                if *entrepreneur_created {
                    self.entrepreneurs_created += 1;
                }
            }
            RowOutcome::Skipped { .. } => self.rows_skipped += 1,
            RowOutcome::Failed {
                row,
                message,
                entrepreneur_created,
                cards_created,
            } => {
                self.imported_count += cards_created;
                if *entrepreneur_created {
                    self.entrepreneurs_created += 1;
                }
                self.errors.push(RowError::new(*row, message.clone()));
            }
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} rows | {} cards created, {} already known | {} entrepreneurs created | {} skipped, {} errors",
            self.period,
            self.rows_read,
            self.imported_count,
            self.cards_existing,
            self.entrepreneurs_created,
            self.rows_skipped,
            self.errors.len()
        )
    }
}

// ============================================================================
// IMPORTER
// ============================================================================

pub struct ReconcilingImporter<'c> {
    conn: &'c Connection,
    period: String,
}

impl<'c> ReconcilingImporter<'c> {
    /// A blank `period` falls back to the current month label
    pub fn new(conn: &'c Connection, period: &str) -> Self {
        let period = match period.trim() {
            "" => current_period(),
            label => label.to_string(),
        };
        ReconcilingImporter { conn, period }
    }

    pub fn period(&self) -> &str {
        &self.period
    }

    /// Import a sheet file. Fatal errors are returned before any write.
    pub fn run(&self, source: &Path) -> Result<ImportSummary, ImportError> {
        db::check_store(self.conn).map_err(|e| ImportError::StoreUnavailable(format!("{:#}", e)))?;

        let bytes = std::fs::read(source).map_err(|e| {
            let path = source.display().to_string();
            if e.kind() == std::io::ErrorKind::NotFound {
                ImportError::SourceNotFound(path)
            } else {
                ImportError::SourceUnreadable {
                    path,
                    reason: e.to_string(),
                }
            }
        })?;

        let fingerprint = format!("{:x}", Sha256::digest(&bytes));
        info!(source = %source.display(), period = %self.period, %fingerprint, "Import started");

        let summary = self.import_rows(read_rows(bytes.as_slice()));

        let event = Event::new(
            "import_completed",
            "import",
            &fingerprint,
            serde_json::json!({
                "source": source.display().to_string(),
                "summary": summary,
            }),
            IMPORT_ACTOR,
        );
        if let Err(e) = db::insert_event(self.conn, &event) {
            warn!("Failed to record import event: {e:#}");
        }

        info!("Import finished: {}", summary.summary());
        Ok(summary)
    }

    /// Fold over already-read rows, applying each plan before the next row
    pub fn import_rows<I>(&self, rows: I) -> ImportSummary
    where
        I: IntoIterator<Item = Result<SheetRow, RowError>>,
    {
        let mut summary = ImportSummary::new(&self.period);
        let mut state = ImportState::default();

        for row in rows {
            let outcome = match row {
                Ok(row) => {
                    let (next, plan) = state.advance(&row);
                    state = next;
                    self.apply(plan)
                }
                Err(err) => RowOutcome::failed(err.row, err.message),
            };

            if let RowOutcome::Failed { row, message, .. } = &outcome {
                warn!(row, "Row failed: {message}");
            }
            summary.record(&outcome);
        }

        summary
    }

    fn apply(&self, plan: RowPlan) -> RowOutcome {
        match plan {
            RowPlan::Skip { line_number, reason } => {
                debug!(row = line_number, ?reason, "Row skipped");
                RowOutcome::Skipped {
                    row: line_number,
                    reason,
                }
            }
            RowPlan::Upsert(planned) => self.apply_row(&planned),
        }
    }

    /// Entrepreneur first, then each card. No rollback of the entrepreneur
    /// when a card write fails.
    fn apply_row(&self, planned: &PlannedRow) -> RowOutcome {
        let row = planned.line_number;
        let (ip, entrepreneur_created) =
            match db::find_or_create_entrepreneur(self.conn, &planned.name, &planned.region) {
                Ok(found) => found,
                Err(e) => return RowOutcome::failed(row, format!("{:#}", e)),
            };

        if entrepreneur_created {
            self.log_event(
                "entrepreneur_created",
                "entrepreneur",
                &ip.id,
                serde_json::json!({ "name": ip.name, "region": ip.region }),
            );
        }

        let mut cards_created = 0;
        let mut cards_existing = 0;

        for planned_card in &planned.cards {
            match self.upsert_card(&ip.id, planned_card) {
                Ok(Upsert::Created(_)) => cards_created += 1,
                Ok(Upsert::Existing(_)) => cards_existing += 1,
                Err(e) => {
                    return RowOutcome::Failed {
                        row,
                        message: format!("{:#}", e),
                        entrepreneur_created,
                        cards_created,
                    }
                }
            }
        }

        RowOutcome::Imported {
            row,
            entrepreneur_created,
            cards_created,
            cards_existing,
        }
    }

    fn upsert_card(&self, entrepreneur_id: &str, planned: &PlannedCard) -> Result<Upsert> {
        let period_status = (!planned.status.is_empty())
            .then(|| PeriodStatus::single(planned.card_type.axis(), &planned.status));

        if let Some(existing) =
            db::find_card(self.conn, entrepreneur_id, &planned.number_mask, planned.card_type)?
        {
            self.refresh_existing(&existing.id, planned)?;
            return Ok(Upsert::Existing(existing.id));
        }

        let mut card = Card::new(
            entrepreneur_id,
            planned.card_type,
            &planned.number_mask,
            &planned.status,
        );
        if let Some(status) = period_status {
            card.periods.insert(self.period.clone(), status);
        }

        let result = db::insert_card(self.conn, &card)?;
        match &result {
            Upsert::Created(id) => self.log_event(
                "card_created",
                "card",
                id,
                serde_json::json!({
                    "entrepreneur_id": entrepreneur_id,
                    "type": planned.card_type.as_str(),
                    "number_mask": planned.number_mask,
                }),
            ),
            // Lost a race with a concurrent import; merge our status into theirs
            Upsert::Existing(id) => self.refresh_existing(id, planned)?,
        }

        Ok(result)
    }

    /// Known card: a non-empty status replaces the flat status and is merged
    /// into this run's period on the card's own axis
    fn refresh_existing(&self, card_id: &str, planned: &PlannedCard) -> Result<()> {
        if planned.status.is_empty() {
            return Ok(());
        }
        let status = PeriodStatus::single(planned.card_type.axis(), &planned.status);
        db::update_card_status(self.conn, card_id, &planned.status)?;
        db::merge_card_period(self.conn, card_id, &self.period, &status)
    }

    fn log_event(&self, event_type: &str, entity_type: &str, entity_id: &str, data: serde_json::Value) {
        let event = Event::new(event_type, entity_type, entity_id, data, IMPORT_ACTOR);
        if let Err(e) = db::insert_event(self.conn, &event) {
            warn!(entity_id, "Failed to record {event_type}: {e:#}");
        }
    }
}

/// Single entry point: import `source` into the store under `period`
pub fn run_import(conn: &Connection, source: &Path, period: &str) -> Result<ImportSummary, ImportError> {
    ReconcilingImporter::new(conn, period).run(source)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;

    const PERIOD: &str = "Октябрь 2025";

    fn row(cells: [&str; 6], line: usize) -> SheetRow {
        SheetRow::new(cells).at_line(line)
    }

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn upserts(plans: &[RowPlan]) -> Vec<&PlannedRow> {
        plans
            .iter()
            .filter_map(|p| match p {
                RowPlan::Upsert(r) => Some(r),
                RowPlan::Skip { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_region_carry_forward() {
        let rows = vec![
            row(["A", "R1", "", "", "", ""], 3),
            row(["B", "", "", "", "", ""], 4),
            row(["C", "R2", "", "", "", ""], 5),
            row(["D", "", "", "", "", ""], 6),
        ];

        let plans = plan_rows(&rows);
        let regions: Vec<(&str, &str)> = upserts(&plans)
            .iter()
            .map(|r| (r.name.as_str(), r.region.as_str()))
            .collect();

        assert_eq!(
            regions,
            vec![("A", "R1"), ("B", "R1"), ("C", "R2"), ("D", "R2")]
        );
    }

    #[test]
    fn test_skip_rules() {
        let rows = vec![
            row(["ИП до региона", "", "*1", "", "", ""], 3),
            row(["", "R1", "*9999", "*8888", "x", "y"], 4),
            row(["ИП А", "", "*1", "", "", ""], 5),
        ];

        let plans = plan_rows(&rows);
        assert_eq!(
            plans[0],
            RowPlan::Skip { line_number: 3, reason: SkipReason::NoRegion }
        );
        // Region-only row still sets the region for the block
        assert_eq!(
            plans[1],
            RowPlan::Skip { line_number: 4, reason: SkipReason::EmptyName }
        );
        assert_eq!(upserts(&plans)[0].region, "R1");
    }

    #[test]
    fn test_sentinel_masks_create_no_cards() {
        for mask in ["", "-", "--", "  --  "] {
            let (_, plan) = ImportState::default().advance(&row(["ИП", "R", mask, mask, "s", "s"], 3));
            match plan {
                RowPlan::Upsert(r) => assert!(r.cards.is_empty(), "mask {:?} made a card", mask),
                other => panic!("unexpected plan {:?}", other),
            }
        }

        let (_, plan) = ImportState::default().advance(&row(["ИП", "R", "*1234", "", "ok", ""], 3));
        let RowPlan::Upsert(r) = plan else { panic!("expected upsert") };
        assert_eq!(
            r.cards,
            vec![PlannedCard {
                card_type: CardType::Corp,
                number_mask: "*1234".to_string(),
                status: "ok".to_string(),
            }]
        );
    }

    #[test]
    fn test_independent_slots() {
        let (_, plan) = ImportState::default().advance(&row(["ИП", "R", "-", "*5555", "", "ФЛ ок"], 3));
        let RowPlan::Upsert(r) = plan else { panic!("expected upsert") };

        assert_eq!(r.cards.len(), 1);
        assert_eq!(r.cards[0].card_type, CardType::Personal);
        assert_eq!(r.cards[0].status, "ФЛ ок");
    }

    #[test]
    fn test_end_to_end_rows() {
        let conn = test_db();
        let rows = vec![
            Ok(row(["ИП Ш", "Region1", "*1111", "*2222", "status-A", "status-B"], 3)),
            Ok(row(["ИП Т", "", "*3333", "-", "status-C", ""], 4)),
        ];

        let summary = ReconcilingImporter::new(&conn, PERIOD).import_rows(rows);

        assert_eq!(summary.imported_count, 3);
        assert_eq!(summary.entrepreneurs_created, 2);
        assert!(summary.errors.is_empty());

        let sh = db::find_entrepreneur(&conn, "ИП Ш", "Region1").unwrap().unwrap();
        let t = db::find_entrepreneur(&conn, "ИП Т", "Region1").unwrap().unwrap();

        let corp = db::find_card(&conn, &sh.id, "*1111", CardType::Corp).unwrap().unwrap();
        assert_eq!(corp.status, "status-A");
        assert_eq!(corp.period(PERIOD).unwrap().corporate.as_deref(), Some("status-A"));
        assert_eq!(corp.period(PERIOD).unwrap().personal, None);

        let personal = db::find_card(&conn, &sh.id, "*2222", CardType::Personal).unwrap().unwrap();
        assert_eq!(personal.period(PERIOD).unwrap().personal.as_deref(), Some("status-B"));

        let t_cards = db::get_cards_for_entrepreneur(&conn, &t.id).unwrap();
        assert_eq!(t_cards.len(), 1);
        assert_eq!(t_cards[0].card_type, CardType::Corp);
        assert_eq!(t_cards[0].number_mask, "*3333");
        assert_eq!(
            t_cards[0].period(PERIOD).unwrap().corporate.as_deref(),
            Some("status-C")
        );

        println!("✅ {}", summary.summary());
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let conn = test_db();
        let rows = || {
            vec![
                Ok(row(["ИП Ш", "Region1", "*1111", "*2222", "a", "b"], 3)),
                Ok(row(["ИП Т", "", "*3333", "--", "c", ""], 4)),
            ]
        };

        let first = ReconcilingImporter::new(&conn, PERIOD).import_rows(rows());
        let cards_after_first = db::count_cards(&conn).unwrap();
        let ips_after_first = db::count_entrepreneurs(&conn).unwrap();

        let second = ReconcilingImporter::new(&conn, PERIOD).import_rows(rows());

        assert_eq!(first.imported_count, 3);
        assert_eq!(second.imported_count, 0);
        assert_eq!(second.cards_existing, 3);
        assert_eq!(second.entrepreneurs_created, 0);
        assert_eq!(db::count_cards(&conn).unwrap(), cards_after_first);
        assert_eq!(db::count_entrepreneurs(&conn).unwrap(), ips_after_first);
    }

    #[test]
    fn test_later_period_does_not_overwrite_earlier() {
        let conn = test_db();
        let october = vec![Ok(row(["ИП Ш", "R1", "*1111", "", "октябрь-ок", ""], 3))];
        let november = vec![Ok(row(["ИП Ш", "R1", "*1111", "", "ноябрь-блок", ""], 3))];

        ReconcilingImporter::new(&conn, "Октябрь 2025").import_rows(october);
        ReconcilingImporter::new(&conn, "Ноябрь 2025").import_rows(november);

        let ip = db::find_entrepreneur(&conn, "ИП Ш", "R1").unwrap().unwrap();
        let card = db::find_card(&conn, &ip.id, "*1111", CardType::Corp).unwrap().unwrap();

        assert_eq!(card.periods.len(), 2);
        assert_eq!(card.period("Октябрь 2025").unwrap().corporate.as_deref(), Some("октябрь-ок"));
        assert_eq!(card.period("Ноябрь 2025").unwrap().corporate.as_deref(), Some("ноябрь-блок"));
        assert_eq!(card.status, "ноябрь-блок");
    }

    #[test]
    fn test_empty_row_creates_nothing() {
        let conn = test_db();
        let rows = vec![Ok(row(["", "R1", "*1", "*2", "x", "y"], 3))];

        let summary = ReconcilingImporter::new(&conn, PERIOD).import_rows(rows);

        assert_eq!(summary.rows_skipped, 1);
        assert_eq!(db::count_entrepreneurs(&conn).unwrap(), 0);
        assert_eq!(db::count_cards(&conn).unwrap(), 0);
    }

    #[test]
    fn test_failed_row_does_not_abort_batch() {
        let conn = test_db();
        // Card table rejects writes for the first entrepreneur only
        conn.execute_batch(
            "CREATE TRIGGER reject_bad_card BEFORE INSERT ON cards
             WHEN NEW.number_mask = '*BAD'
             BEGIN SELECT RAISE(ABORT, 'card rejected'); END;",
        )
        .unwrap();

        let rows = vec![
            Ok(row(["ИП Плохой", "R1", "*BAD", "", "", ""], 3)),
            Err(RowError::new(4, "unreadable row: invalid utf-8")),
            Ok(row(["ИП Хороший", "", "*1111", "", "", ""], 5)),
        ];

        let summary = ReconcilingImporter::new(&conn, PERIOD).import_rows(rows);

        assert_eq!(summary.errors.len(), 2);
        assert_eq!(summary.errors[0].row, 3);
        assert!(summary.errors[0].message.contains("card rejected"));
        assert_eq!(summary.errors[1].row, 4);
        assert_eq!(summary.imported_count, 1);

        // Entrepreneur of the failed row is kept without cards
        let bad = db::find_entrepreneur(&conn, "ИП Плохой", "R1").unwrap().unwrap();
        assert!(db::get_cards_for_entrepreneur(&conn, &bad.id).unwrap().is_empty());
    }

    #[test]
    fn test_partially_written_row_counts_its_cards() {
        let conn = test_db();
        conn.execute_batch(
            "CREATE TRIGGER reject_bad_card BEFORE INSERT ON cards
             WHEN NEW.number_mask = '*BAD'
             BEGIN SELECT RAISE(ABORT, 'card rejected'); END;",
        )
        .unwrap();

        // Corporate card is written, personal slot then fails
        let rows = vec![Ok(row(["ИП А", "R1", "*1111", "*BAD", "a", "b"], 3))];

        let summary = ReconcilingImporter::new(&conn, PERIOD).import_rows(rows);

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].row, 3);
        assert_eq!(summary.imported_count, 1);
        assert_eq!(summary.entrepreneurs_created, 1);
        assert_eq!(db::count_cards(&conn).unwrap(), 1);
    }

    #[test]
    fn test_refresh_existing_updates_flat_status_and_period() {
        let conn = test_db();
        let (ip, _) = db::find_or_create_entrepreneur(&conn, "ИП Ш", "R1").unwrap();
        let card = Card::new(&ip.id, CardType::Personal, "*2222", "старый");
        db::insert_card(&conn, &card).unwrap();

        let importer = ReconcilingImporter::new(&conn, PERIOD);
        let planned = PlannedCard {
            card_type: CardType::Personal,
            number_mask: "*2222".to_string(),
            status: "новый".to_string(),
        };
        importer.refresh_existing(&card.id, &planned).unwrap();

        let stored = db::get_card(&conn, &card.id).unwrap().unwrap();
        assert_eq!(stored.status, "новый");
        assert_eq!(stored.period(PERIOD).unwrap().personal.as_deref(), Some("новый"));
        assert_eq!(stored.period(PERIOD).unwrap().corporate, None);

        // Blank status leaves the card alone
        let blank = PlannedCard { status: String::new(), ..planned };
        importer.refresh_existing(&card.id, &blank).unwrap();
        assert_eq!(db::get_card(&conn, &card.id).unwrap().unwrap().status, "новый");
    }

    #[test]
    fn test_blank_period_falls_back_to_current_month() {
        let conn = test_db();

        assert_eq!(ReconcilingImporter::new(&conn, "   ").period(), current_period());
        assert_eq!(ReconcilingImporter::new(&conn, " Ноябрь 2025 ").period(), "Ноябрь 2025");

        let rows = vec![Ok(row(["ИП Ш", "R1", "*1111", "", "ок", ""], 3))];
        ReconcilingImporter::new(&conn, "").import_rows(rows);

        let ip = db::find_entrepreneur(&conn, "ИП Ш", "R1").unwrap().unwrap();
        let card = db::find_card(&conn, &ip.id, "*1111", CardType::Corp).unwrap().unwrap();
        assert!(card.period("").is_none());
        assert!(card.period(&current_period()).is_some());
    }

    #[test]
    fn test_run_missing_source_is_fatal() {
        let conn = test_db();
        let err = run_import(&conn, Path::new("/no/such/cards.csv"), PERIOD).unwrap_err();
        assert!(matches!(err, ImportError::SourceNotFound(_)));
        assert_eq!(db::count_entrepreneurs(&conn).unwrap(), 0);
    }

    #[test]
    fn test_run_without_schema_is_fatal() {
        let conn = Connection::open_in_memory().unwrap();
        let err = run_import(&conn, Path::new("/no/such/cards.csv"), PERIOD).unwrap_err();
        assert!(matches!(err, ImportError::StoreUnavailable(_)));
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let mut summary = ImportSummary::new(PERIOD);
        summary.record(&RowOutcome::failed(7, "boom"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["importedCount"], 0);
        assert_eq!(json["errors"][0]["row"], 7);
        assert_eq!(json["errors"][0]["message"], "boom");
    }
}
