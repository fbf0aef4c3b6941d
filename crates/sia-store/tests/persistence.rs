use serde_json::json;
use sia_store::{FileStorage, PersistenceCoordinator, StorageBackend, StoreConfig};
use sia_tables::{rows_from_value, TableRow};
use sia_test_utils::{file_store, host, memory_store, POBLACION_SEXO, PUNTOS};
use std::sync::Arc;

#[test]
fn answers_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = file_store(dir.path());
        let mut a1 = host(&store, "3.1.4.A.1.2");
        a1.persist_field_change("grupoAISD_A1", Some(json!("CC Ayroca")));
        store.session().set_last_section("3.1.4.A.1.2");
    }

    let store = file_store(dir.path());
    assert_eq!(store.flat().get("grupoAISD_A1"), Some(json!("CC Ayroca")));
    assert_eq!(store.session().last_section().as_deref(), Some("3.1.4.A.1.2"));
    assert!(dir.path().join("formularioDatos.json").exists());
}

#[test]
fn corrupt_record_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileStorage::open(dir.path()).unwrap();
    backend.set_item("formularioDatos", "{\"a\": ").unwrap();

    let store = PersistenceCoordinator::new(StoreConfig::default(), Arc::new(backend));
    assert!(store.flat().is_empty());
    assert_eq!(store.read("3.1.1", "a"), None);
}

#[test]
fn open_uses_configured_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::default().with_storage_dir(dir.path().join("sia"));
    let store = PersistenceCoordinator::open(config).unwrap();
    store.write("3.1.1", "titulo", Some(json!("Línea base")));

    assert!(dir.path().join("sia").join("formularioDatos.json").exists());
}

#[test]
fn table_sync_writes_independent_copies() {
    let store = memory_store();
    let mut b1 = host(&store, "3.1.4.B.1.3");
    let table = json!([
        {"sexo": "Hombre", "casos": 40, "porcentaje": ""},
        {"sexo": "Mujer", "casos": 38, "porcentaje": ""}
    ]);

    let written = b1.sync_table(POBLACION_SEXO, &table);

    assert_eq!(written, vec!["poblacionSexoTabla_B1", "poblacionSexoTabla"]);
    assert_eq!(store.flat().get("poblacionSexoTabla_B1"), Some(table.clone()));
    assert_eq!(store.flat().get("poblacionSexoTabla"), Some(table.clone()));
    assert_eq!(b1.previous()["poblacionSexoTabla_B1"], table);

    b1.datos["poblacionSexoTabla_B1"][0]["casos"] = json!(1);
    assert_eq!(b1.datos["poblacionSexoTabla"], table);
}

#[test]
fn non_array_table_is_ignored() {
    let store = memory_store();
    let mut b1 = host(&store, "3.1.4.B.1.3");
    assert!(b1.sync_table(POBLACION_SEXO, &json!({"sexo": "Hombre"})).is_empty());
    assert!(store.flat().is_empty());
}

#[test]
fn clear_all_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = file_store(dir.path());
        store.write("3.1.4.A.1.2", "grupoAISD", Some(json!("CC Ayroca")));
        store.clear_all();
    }

    let store = file_store(dir.path());
    assert!(store.flat().is_empty());
    assert!(store.session().manual_clear());
    assert_eq!(store.read("3.1.4.A.1.2", "provincia"), Some(json!("Caravelí")));
}

#[test]
fn active_candidates_follow_selection() {
    let store = memory_store();
    let a1 = host(&store, "3.1.4.A.1.4");
    let candidates: Vec<TableRow> = rows_from_value(&json!([
        {"codigo": "0101", "punto": "Ayroca"},
        {"codigo": "0102", "punto": "Sondor"},
        {"codigo": "0103", "punto": "Yauca"}
    ]))
    .unwrap();

    assert_eq!(store.active_candidates(&a1, PUNTOS, &candidates).len(), 3);

    store
        .active_rows()
        .set_active(a1.section_key(), ["0103".to_string(), "0999".to_string()]);
    let active = store.active_candidates(&a1, PUNTOS, &candidates);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].text("punto"), "Yauca");
    assert_eq!(store.active_rows().active_ids(a1.section_key()), vec!["0103"]);

    let a2 = host(&store, "3.1.4.A.2.4");
    assert_eq!(store.active_candidates(&a2, PUNTOS, &candidates).len(), 3);
}

#[test]
fn export_is_a_copy_of_the_flat_record() {
    let store = memory_store();
    store.write("3.1.4.A.1.2", "grupoAISD", Some(json!("CC Ayroca")));
    let mut snapshot = store.export_snapshot();
    snapshot.insert("otro".into(), json!(1));

    assert_eq!(store.flat().len(), 1);
    assert_eq!(snapshot.len(), 2);
}
