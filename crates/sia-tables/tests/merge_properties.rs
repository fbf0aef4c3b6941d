use proptest::prelude::*;
use serde_json::{json, Value};
use sia_model::value::FieldMap;
use sia_model::{GroupKey, GroupLetter, GroupSuffix};
use sia_tables::{
    recompute_percentages, rows_from_value, rows_to_value, TableConfig, TableMergeService,
    TableRow, TableSyncEngine,
};

fn config() -> TableConfig {
    TableConfig::new("peaOcupacionesTabla")
}

fn categories(rows: &[TableRow]) -> Vec<String> {
    rows.iter().map(|row| row.text("categoria")).collect()
}

fn category() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Agricultura".to_string()),
        Just("agricultura ".to_string()),
        Just("Minería".to_string()),
        Just("Comercio".to_string()),
        Just("".to_string()),
        "[A-Za-z ]{0,10}",
    ]
}

fn count() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0i64..500).prop_map(Value::from),
        "[0-9]{1,3}".prop_map(Value::from),
        Just(json!("n/a")),
        Just(Value::Null),
    ]
}

fn rows() -> impl Strategy<Value = Vec<TableRow>> {
    prop::collection::vec(
        (category(), count()).prop_map(|(c, n)| {
            TableRow::new()
                .with("categoria", c)
                .with("casos", n)
                .with("porcentaje", "")
        }),
        0..8,
    )
}

#[test]
fn merge_scenario_from_external_dataset() {
    let skeleton = vec![TableRow::new()
        .with("categoria", "Agricultura")
        .with("casos", 0)
        .with("porcentaje", "")];
    let incoming = vec![TableRow::new()
        .with("categoria", "agricultura")
        .with("casos", "35")];

    let merged = TableMergeService::new().combine(&skeleton, Some(&incoming), &config());

    assert_eq!(
        rows_to_value(&merged),
        json!([{"categoria": "Agricultura", "casos": 35, "porcentaje": ""}])
    );
}

#[test]
fn hand_edited_table_is_not_a_merge_candidate() {
    let service = TableMergeService::new();
    let config = config();
    let mut table = service.combine(
        &[
            TableRow::new().with("categoria", "Hombre").with("casos", 0),
            TableRow::new().with("categoria", "Mujer").with("casos", 0),
        ],
        Some(&[
            TableRow::new().with("categoria", "hombre").with("casos", 6),
            TableRow::new().with("categoria", "mujer").with("casos", 4),
        ]),
        &config,
    );
    assert!(service.looks_like_external_merge_candidate(&table, &config));

    recompute_percentages(&mut table, &config);
    assert!(!service.looks_like_external_merge_candidate(&table, &config));
    assert_eq!(
        service.merge_if_allowed(&table, &[], Some(&table), &config),
        sia_tables::MergeOutcome::Kept
    );
}

#[test]
fn dual_write_keys_are_equal_copies() {
    let group = GroupSuffix::of(GroupKey::new(GroupLetter::B, 1).unwrap());
    let table = json!([{"sexo": "Hombre", "casos": 3}, {"sexo": "Mujer", "casos": 5}]);
    let mut datos = FieldMap::new();

    TableSyncEngine::new().sync_dual(
        &mut datos,
        "poblacionSexoAISI",
        group,
        Some(&table),
        |_, _| {},
        None,
    );

    assert_eq!(datos["poblacionSexoAISI_B1"], datos["poblacionSexoAISI"]);
    datos["poblacionSexoAISI_B1"][0]["casos"] = json!(99);
    assert_eq!(datos["poblacionSexoAISI"], table);
}

proptest! {
    #[test]
    fn prop_skeleton_categories_preserved(skeleton in rows(), incoming in rows()) {
        prop_assume!(!skeleton.is_empty());
        let merged = TableMergeService::new().combine(&skeleton, Some(&incoming), &config());

        prop_assert_eq!(merged.len(), skeleton.len());
        prop_assert_eq!(categories(&merged), categories(&skeleton));
    }

    #[test]
    fn prop_merge_is_deterministic(skeleton in rows(), incoming in rows()) {
        let service = TableMergeService::new();
        let config = config();
        let first = service.combine(&skeleton, Some(&incoming), &config);
        let second = service.combine(&skeleton, Some(&incoming), &config);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_merged_counts_are_numbers(skeleton in rows(), incoming in rows()) {
        prop_assume!(!skeleton.is_empty() && !incoming.is_empty());
        let merged = TableMergeService::new().combine(&skeleton, Some(&incoming), &config());
        for (before, after) in skeleton.iter().zip(&merged) {
            if before != after {
                prop_assert!(after.get("casos").is_some_and(Value::is_number));
                prop_assert_eq!(after.text("porcentaje"), "");
            }
        }
    }

    #[test]
    fn prop_rows_value_roundtrip(table in rows()) {
        let value = rows_to_value(&table);
        prop_assert_eq!(rows_from_value(&value).unwrap(), table);
    }
}
