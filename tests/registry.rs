use wolldb::query::QueryPart;
use wolldb::source::DatasourceRegistry;
use wolldb::thingy::Thingy;
use wolldb::{Dataset, Datasource};

fn setup() -> DatasourceRegistry {
    let conf = Thingy::parse(
        r#"
        Datenquellen(
          Datenquelle(NAME "personal" TYPE "conf" Schema("OID" "Nachname") Daten(("1" "Mustermann")))
          # refers to a source that is only defined later
          Datenquelle(NAME "zu_frueh" TYPE "attach" SOURCE "personal" ATTACH "telefon" MATCH("OID" "OID"))
          Datenquelle(NAME "telefon" TYPE "conf" Schema("OID" "Nummer") Daten(("1" "0815")))
          Datenquelle(NAME "kaputt" TYPE "conf" Schema("A" "A"))
          # depends on the broken source above
          Datenquelle(NAME "folge" TYPE "funky" SOURCE "kaputt" Spaltenumsetzung(X("x")))
          Datenquelle(NAME "mitarbeiter" TYPE "attach" SOURCE "personal" ATTACH "telefon" MATCH("OID" "OID"))
          Datenquelle(NAME "leer" TYPE "dummy" Schema("A"))
          Datenquelle(NAME "ldap" TYPE "ldap")
        )
        Datenquellen(
          Datenquelle(NAME "telefon" TYPE "conf" Schema("OID" "Nummer" "Art") Daten(("1" "4711" "Mobil")))
        )
        "#,
    )
    .expect("valid conf");
    DatasourceRegistry::from_config(&conf)
}

#[test]
fn broken_definitions_are_skipped() {
    let registry = setup();
    assert_eq!(registry.names(), ["personal", "telefon", "mitarbeiter", "leer"]);
    assert!(!registry.contains("zu_frueh"), "sources may only refer to earlier ones");
    assert!(!registry.contains("kaputt"));
    assert!(!registry.contains("folge"));
    assert!(!registry.contains("ldap"));
}

#[test]
fn later_definition_replaces_earlier_one() {
    let registry = setup();
    let telefon = registry.require("telefon").unwrap();
    assert_eq!(telefon.schema().columns(), ["OID", "Nummer", "Art"]);
    // built before the redefinition, so it still joins the first telefon source
    let mitarbeiter = registry.require("mitarbeiter").unwrap();
    let hits = mitarbeiter.find(&[QueryPart::new("Nachname", "Mustermann")]);
    assert_eq!(hits[0].get("telefon__Nummer").unwrap().as_deref(), Some("0815"));
}

#[test]
fn dummy_sources_are_empty() {
    let registry = setup();
    let leer = registry.require("leer").unwrap();
    assert_eq!(leer.schema().columns(), ["A"]);
    assert!(leer.contents().is_empty());
}
