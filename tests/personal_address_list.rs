use std::sync::{Arc, Mutex};

use wolldb::dataset::{Row, Schema};
use wolldb::joiner::DatasourceJoiner;
use wolldb::pal::{PalChangeListener, PersonalAddressList, SENDER_KEY_SEPARATOR, split_sender};
use wolldb::query::QueryPart;
use wolldb::ram::RamDatasource;
use wolldb::source::DatasourceRegistry;
use wolldb::{Dataset, WolldbError};

fn registry(rows: &[(&str, [&str; 4])]) -> DatasourceRegistry {
    let ram = RamDatasource::from_table(
        "personal",
        Schema::new(["OID", "Vorname", "Nachname", "Rolle"]).unwrap(),
        rows.iter().map(|(k, v)| (*k, *v)),
    )
    .unwrap();
    let mut registry = DatasourceRegistry::new();
    registry.insert(Arc::new(ram));
    registry
}

fn setup() -> PersonalAddressList {
    let registry = registry(&[
        ("1", ["1", "Max", "Mustermann", ""]),
        ("2", ["2", "erika", "Musterfrau", "Chefin"]),
        ("3", ["3", "Anna", "Mustermann", ""]),
    ]);
    PersonalAddressList::new(DatasourceJoiner::new(registry, "personal").unwrap())
}

fn add_all(pal: &mut PersonalAddressList) {
    let found = pal.joiner().find(&[QueryPart::new("Nachname", "muster*")]);
    for ds in &found {
        pal.add(ds.as_ref());
    }
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<usize>>,
}
impl PalChangeListener for Recorder {
    fn pal_changed(&self, entries: &[String]) {
        self.calls.lock().unwrap().push(entries.len());
    }
}

#[test]
fn unknown_main_source_is_an_error() {
    let err = DatasourceJoiner::new(DatasourceRegistry::new(), "personal").err().expect("must fail");
    assert!(matches!(err, WolldbError::DatasourceNotFound(_)));
}

#[test]
fn entries_are_sorted_and_carry_their_key() {
    let mut pal = setup();
    add_all(&mut pal);
    let entries = pal.entries();
    assert_eq!(
        entries,
        [
            format!("(Chefin) Musterfrau, erika{SENDER_KEY_SEPARATOR}2"),
            format!("Mustermann, Anna{SENDER_KEY_SEPARATOR}3"),
            format!("Mustermann, Max{SENDER_KEY_SEPARATOR}1"),
        ]
    );
    assert_eq!(split_sender(&entries[1]), Some(("Mustermann, Anna", "3")));
}

#[test]
fn current_sender_follows_selection() {
    let mut pal = setup();
    assert_eq!(pal.current_sender(), "");
    assert!(matches!(pal.joiner().selected(), Err(WolldbError::DatasetNotFound(_))));
    add_all(&mut pal);
    assert!(matches!(pal.select("42"), Err(WolldbError::DatasetNotFound(_))));
    pal.select("1").unwrap();
    assert_eq!(pal.current_sender(), format!("Mustermann, Max{SENDER_KEY_SEPARATOR}1"));
    let sender = pal.entries()[0].clone();
    pal.select_sender(&sender).unwrap();
    assert!(pal.joiner().is_selected("2"));
    assert!(pal.remove("2"));
    assert_eq!(pal.current_sender(), "");
    assert!(!pal.remove("2"));
}

#[test]
fn readding_replaces_the_entry() {
    let mut pal = setup();
    add_all(&mut pal);
    add_all(&mut pal);
    assert_eq!(pal.joiner().pal().len(), 3);
}

#[test]
fn overrides_win_and_need_known_columns() {
    let mut pal = setup();
    add_all(&mut pal);
    pal.set_override("1", "Rolle", "Vertretung").unwrap();
    let entry = pal.joiner().pal_entry("1").unwrap();
    assert!(entry.is_overridden("Rolle"));
    assert_eq!(entry.get("Rolle").unwrap().as_deref(), Some("Vertretung"));
    assert!(matches!(
        pal.set_override("1", "Telefon", "0815"),
        Err(WolldbError::ColumnNotFound(_))
    ));
    assert!(matches!(
        pal.set_override("42", "Rolle", "x"),
        Err(WolldbError::DatasetNotFound(_))
    ));
}

#[test]
fn listeners_are_registered_once_and_notified() {
    let mut pal = setup();
    let recorder = Arc::new(Recorder::default());
    let listener: Arc<dyn PalChangeListener> = recorder.clone();
    pal.add_listener(Arc::clone(&listener));
    pal.add_listener(Arc::clone(&listener));
    assert_eq!(pal.listener_count(), 1);
    add_all(&mut pal);
    pal.select("3").unwrap();
    assert_eq!(*recorder.calls.lock().unwrap(), [1, 2, 3, 3]);
    pal.remove_listener(&listener);
    assert_eq!(pal.listener_count(), 0);
    pal.remove("3");
    assert_eq!(recorder.calls.lock().unwrap().len(), 4);
}

#[test]
fn refresh_rereads_and_keeps_vanished_entries() {
    let old = registry(&[
        ("1", ["1", "Max", "Mustermann", ""]),
        ("2", ["2", "Erika", "Musterfrau", ""]),
    ]);
    let mut joiner = DatasourceJoiner::new(old, "personal").unwrap();
    for ds in joiner.contents_of_main() {
        joiner.add_to_pal(ds.as_ref());
    }
    joiner.set_override("1", "Rolle", "Chef").unwrap();

    // the same keys backed by new data, Erika is gone
    let schema = Arc::new(Schema::new(["OID", "Vorname", "Nachname", "Rolle"]).unwrap());
    let moved = Row::new("1", Arc::clone(&schema))
        .with("OID", "1")
        .unwrap()
        .with("Vorname", "Maximilian")
        .unwrap()
        .with("Nachname", "Mustermann")
        .unwrap();
    let fresh = RamDatasource::new("personal", schema.as_ref().clone(), vec![Arc::new(moved)]);
    let mut fresh_registry = DatasourceRegistry::new();
    fresh_registry.insert(Arc::new(fresh));
    let mut refreshed = DatasourceJoiner::new(fresh_registry, "personal").unwrap();
    for entry in joiner.pal() {
        refreshed.add_to_pal(entry);
    }
    refreshed.set_override("1", "Rolle", "Chef").unwrap();
    assert_eq!(refreshed.refresh_pal(), 1);

    let max = refreshed.pal_entry("1").unwrap();
    assert_eq!(max.get("Vorname").unwrap().as_deref(), Some("Maximilian"));
    assert_eq!(max.get("Rolle").unwrap().as_deref(), Some("Chef"));
    assert_eq!(max.display(), "(Chef) Mustermann, Maximilian");
    let erika = refreshed.pal_entry("2").unwrap();
    assert_eq!(erika.get("Vorname").unwrap().as_deref(), Some("Erika"));
}
