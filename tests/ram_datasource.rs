use std::sync::Arc;

use wolldb::dataset::{DatasetRef, Row, Schema};
use wolldb::query::QueryPart;
use wolldb::ram::RamDatasource;
use wolldb::thingy::Thingy;
use wolldb::{Dataset, Datasource};

fn setup() -> RamDatasource {
    let schema = Schema::new(["OID", "Vorname", "Nachname", "Rolle"]).unwrap();
    RamDatasource::from_table(
        "personal",
        schema,
        [
            ("1", ["1", "Max", "Mustermann", "Chef"]),
            ("2", ["2", "Erika", "Musterfrau", ""]),
            ("3", ["3", "Hans", "Meier", "Sekretariat"]),
        ],
    )
    .expect("valid table")
}

fn keys(results: &[DatasetRef]) -> Vec<String> {
    results.iter().map(|ds| ds.key().to_string()).collect()
}

#[test]
fn empty_query_finds_nothing() {
    let ram = setup();
    assert!(ram.find(&[]).is_empty());
}

#[test]
fn prefix_and_exact_matches_ignore_case() {
    let ram = setup();
    let hits = ram.find(&[QueryPart::new("Nachname", "MUSTER*")]);
    assert_eq!(keys(&hits), ["1", "2"]);
    let hits = ram.find(&[QueryPart::new("Nachname", "meier")]);
    assert_eq!(keys(&hits), ["3"]);
    let hits = ram.find(&[QueryPart::new("Nachname", "muster")]);
    assert!(hits.is_empty(), "without a star the whole value has to match");
}

#[test]
fn parts_are_conjunctive() {
    let ram = setup();
    let hits = ram.find(&[
        QueryPart::new("Nachname", "Muster*"),
        QueryPart::new("Vorname", "erika"),
    ]);
    assert_eq!(keys(&hits), ["2"]);
    let hits = ram.find(&[
        QueryPart::new("Nachname", "Muster*"),
        QueryPart::new("Unbekannt", "*"),
    ]);
    assert!(hits.is_empty(), "a column outside the schema never matches");
}

#[test]
fn null_values_never_match() {
    let schema = Arc::new(Schema::new(["Vorname", "Nachname"]).unwrap());
    let with_name: DatasetRef = Arc::new(
        Row::new("a", Arc::clone(&schema))
            .with("Vorname", "Max")
            .unwrap()
            .with("Nachname", "Mustermann")
            .unwrap(),
    );
    let without_name: DatasetRef = Arc::new(Row::new("b", Arc::clone(&schema)).with("Vorname", "Max").unwrap());
    let ram = RamDatasource::new("ram", schema.as_ref().clone(), vec![with_name, without_name]);
    assert_eq!(keys(&ram.find(&[QueryPart::new("Nachname", "*")])), ["a"]);
    assert_eq!(keys(&ram.find(&[QueryPart::new("Vorname", "*")])), ["a", "b"]);
}

#[test]
fn by_key_skips_unknown_keys() {
    let ram = setup();
    let hits = ram.datasets_by_key(&["3".to_string(), "42".to_string(), "1".to_string()]);
    assert_eq!(keys(&hits), ["1", "3"]);
    assert!(ram.datasets_by_key(&[]).is_empty());
}

#[test]
fn schema_and_contents_are_copies() {
    let ram = setup();
    assert_eq!(ram.schema().columns(), ["OID", "Vorname", "Nachname", "Rolle"]);
    let mut contents = ram.contents();
    assert_eq!(contents.len(), 3);
    contents.clear();
    assert_eq!(ram.contents().len(), 3);
}

#[test]
fn unknown_column_is_an_error_on_the_dataset() {
    let ram = setup();
    let contents = ram.contents();
    let first = &contents[0];
    assert_eq!(first.get("Rolle").unwrap().as_deref(), Some("Chef"));
    assert!(first.get("Telefon").is_err());
}

#[test]
fn reads_conf_definitions() {
    let conf = Thingy::parse(
        r#"NAME "telefon" TYPE "conf"
           Schema("Vorname" "Nachname" "Telefon")
           Schluessel("Nachname" "Vorname")
           Daten(("Max" "Mustermann" "0815") ("Erika" "Musterfrau" "4711"))"#,
    )
    .unwrap();
    let ram = RamDatasource::from_config(&conf).expect("valid conf source");
    assert_eq!(ram.name(), "telefon");
    let hits = ram.find(&[QueryPart::new("Telefon", "4711")]);
    assert_eq!(keys(&hits), ["Musterfrau#Erika"]);
}

#[test]
fn rejects_broken_conf_definitions() {
    let broken = [
        r#"NAME "a" TYPE "conf" Schema("X" "X")"#,
        r#"NAME "a" TYPE "conf" Schema("X" "Y") Daten(("1"))"#,
        r#"NAME "a" TYPE "conf" Schema("X") Schluessel("Y")"#,
        r#"NAME "a" TYPE "conf""#,
        r#"TYPE "conf" Schema("X")"#,
        // without Schluessel the first column is the key
        r#"NAME "a" TYPE "conf" Schema("Nachname" "Vorname") Daten(("Meier" "Hans") ("Meier" "Anna"))"#,
    ];
    for text in broken {
        let conf = Thingy::parse(text).unwrap();
        let err = RamDatasource::from_config(&conf).err().expect("definition must fail");
        assert!(err.is_config(), "{text} should be a config error, got {err}");
    }
}

#[test]
fn every_record_comes_back_by_its_key() {
    let conf = Thingy::parse(
        r#"NAME "personal" TYPE "conf"
           Schema("Nachname" "Vorname")
           Schluessel("Nachname" "Vorname")
           Daten(("Meier" "Hans") ("Meier" "Anna") ("Huber" "Hans"))"#,
    )
    .unwrap();
    let ram = RamDatasource::from_config(&conf).expect("composite keys are unique");
    for ds in ram.contents() {
        let hits = ram.datasets_by_key(&[ds.key().to_string()]);
        assert_eq!(keys(&hits), [ds.key()], "{} must be found exactly once", ds.key());
    }
    let err = RamDatasource::from_table("dup", Schema::new(["X"]).unwrap(), [("1", ["a"]), ("1", ["b"])])
        .err()
        .expect("duplicate keys must fail");
    assert!(err.is_config());
}
