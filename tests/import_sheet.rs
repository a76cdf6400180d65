use expense_tracker::{
    count_cards, count_entrepreneurs, db, find_card, get_regions, open_database, run_import,
    CardType, ImportError,
};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const PERIOD: &str = "Октябрь 2025";

const SHEET: &str = "\
ИП / РЕГИОН,Регион,Корп. карта,Карта ФЛ,Октябрь 2025,
,,,,корп,ФЛ
ИП Ш,Region1,*1111,*2222,status-A,status-B
ИП Т,,*3333,-,status-C,
,,,,,
ИП У,Region2,--,*4444,,ок
ИП Ф,, , ,,
";

fn write_sheet(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_import_sheet_end_to_end() {
    let dir = TempDir::new().unwrap();
    let conn = open_database(&dir.path().join("expenses.db")).unwrap();
    let sheet = write_sheet(SHEET);

    let summary = run_import(&conn, sheet.path(), PERIOD).unwrap();

    assert_eq!(summary.imported_count, 4);
    assert_eq!(summary.entrepreneurs_created, 4);
    assert_eq!(summary.rows_skipped, 1);
    assert!(summary.errors.is_empty());

    assert_eq!(get_regions(&conn).unwrap(), vec!["Region1", "Region2"]);

    let t = db::find_entrepreneur(&conn, "ИП Т", "Region1").unwrap().unwrap();
    let t_corp = find_card(&conn, &t.id, "*3333", CardType::Corp).unwrap().unwrap();
    assert_eq!(t_corp.period(PERIOD).unwrap().corporate.as_deref(), Some("status-C"));
    assert!(db::get_cards_for_entrepreneur(&conn, &t.id)
        .unwrap()
        .iter()
        .all(|c| c.card_type == CardType::Corp));

    // Block change: ИП Ф inherits Region2 and has no cards
    let f = db::find_entrepreneur(&conn, "ИП Ф", "Region2").unwrap().unwrap();
    assert!(db::get_cards_for_entrepreneur(&conn, &f.id).unwrap().is_empty());

    let u = db::find_entrepreneur(&conn, "ИП У", "Region2").unwrap().unwrap();
    let u_cards = db::get_cards_for_entrepreneur(&conn, &u.id).unwrap();
    assert_eq!(u_cards.len(), 1);
    assert_eq!(u_cards[0].card_type, CardType::Personal);

    // Audit trail records the run
    let events = db::get_events_for_entity(&conn, "card", &t_corp.id).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "card_created");
}

#[test]
fn test_import_twice_keeps_counts() {
    let dir = TempDir::new().unwrap();
    let conn = open_database(&dir.path().join("expenses.db")).unwrap();
    let sheet = write_sheet(SHEET);

    run_import(&conn, sheet.path(), PERIOD).unwrap();
    let cards = count_cards(&conn).unwrap();
    let entrepreneurs = count_entrepreneurs(&conn).unwrap();

    let second = run_import(&conn, sheet.path(), PERIOD).unwrap();

    assert_eq!(second.imported_count, 0);
    assert_eq!(count_cards(&conn).unwrap(), cards);
    assert_eq!(count_entrepreneurs(&conn).unwrap(), entrepreneurs);
}

#[test]
fn test_missing_source_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let conn = open_database(&dir.path().join("expenses.db")).unwrap();

    let err = run_import(&conn, &dir.path().join("absent.csv"), PERIOD).unwrap_err();

    assert!(matches!(err, ImportError::SourceNotFound(_)));
    assert_eq!(count_entrepreneurs(&conn).unwrap(), 0);
    assert_eq!(count_cards(&conn).unwrap(), 0);
}

#[test]
fn test_directory_as_source_is_unreadable() {
    let dir = TempDir::new().unwrap();
    let conn = open_database(&dir.path().join("expenses.db")).unwrap();

    let err = run_import(&conn, dir.path(), PERIOD).unwrap_err();
    assert!(matches!(err, ImportError::SourceUnreadable { .. }));
}
