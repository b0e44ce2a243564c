#![allow(clippy::float_cmp)]
use calotuple_algorithms::physics::fields;
use calotuple_algorithms::{NtupleConfig, NtupleMaker};
use calotuple_core::{
    CaloCell, CaloCluster, CaloRings, ClusterId, EventInfo, FieldDef, MemoryEventStore, Seed,
    Table, TableStore,
};
use calotuple_io::{read_events, read_tables, write_events, write_tables, WriteOptions};
use std::path::Path;
use tempfile::tempdir;

fn events() -> Vec<MemoryEventStore> {
    (0..4)
        .map(|n| {
            let mut info = EventInfo::new(100 + n, 20.0 + n as f32);
            for s in 0..=n {
                info.seeds.push(Seed::new(0.2 * s as f32, 0.5, 10.0 + s as f32));
            }
            let clusters = vec![
                CaloCluster::new(ClusterId(1), 0.0, 0.51, 9_000.0).with_cells(vec![
                    CaloCell {
                        et: 1.5,
                        layer: 2,
                        ..CaloCell::default()
                    };
                    3
                ]),
                CaloCluster::new(ClusterId(2), 0.41, 0.49, 11_000.0),
            ];
            let mut event = MemoryEventStore::new();
            event.record_event_info("EventInfo", info);
            event.record_clusters("Clusters", clusters);
            event.record_rings("Rings", vec![CaloRings::new(ClusterId(2), vec![0.3; 5])]);
            event
        })
        .collect()
}

fn produce() -> TableStore {
    let mut maker = NtupleMaker::new(NtupleConfig {
        dump_cells: true,
        ..NtupleConfig::default()
    });
    let mut tables = TableStore::new();
    maker.book(&mut tables).unwrap();
    for event in &events() {
        maker.fill(event, &mut tables).unwrap();
    }
    tables
}

fn assert_same_physics(written: &Table, read: &Table) {
    assert_eq!(read.entries(), written.entries());
    assert_eq!(read.fields(), written.fields());

    // Every field is recovered by name with identical values.
    for field in written.fields() {
        assert_eq!(
            read.column(&field.name),
            written.column(&field.name),
            "column {} differs",
            field.name
        );
    }
}

fn roundtrip(path: &Path) {
    let store = produce();
    write_tables(path, &store, &WriteOptions::default()).unwrap();
    let read = read_tables(path).unwrap();
    assert_eq!(read.len(), 1);
    assert_same_physics(
        store.table("physics").unwrap(),
        read.table("physics").unwrap(),
    );
}

#[test]
fn test_physics_ntuple_jsonl_roundtrip() {
    let dir = tempdir().unwrap();
    roundtrip(&dir.path().join("physics.jsonl"));
}

#[cfg(feature = "hdf5")]
#[test]
fn test_physics_ntuple_hdf5_roundtrip() {
    let dir = tempdir().unwrap();
    roundtrip(&dir.path().join("physics.h5"));
}

#[test]
fn test_rows_per_event_survive_persistence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("physics.jsonl");
    write_tables(&path, &produce(), &WriteOptions::default()).unwrap();

    let read = read_tables(&path).unwrap();
    let table = read.table("physics").unwrap();
    // Events carry 1 + 2 + 3 + 4 seeds.
    assert_eq!(table.entries(), 10);

    let mut reader = table.reader();
    let number = reader.bind_scalar::<i32>(fields::EVENT_NUMBER);
    let mut per_event = std::collections::BTreeMap::new();
    for entry in 0..reader.entries() {
        let n = reader.read_entry(entry).unwrap().get(number).unwrap();
        *per_event.entry(n).or_insert(0) += 1;
    }
    assert_eq!(
        per_event.into_iter().collect::<Vec<_>>(),
        vec![(100, 1), (101, 2), (102, 3), (103, 4)]
    );
}

#[test]
fn test_renamed_field_is_inert_on_rebind() {
    let mut store = TableStore::new();
    let table = store
        .create_table(
            "physics",
            &[
                FieldDef::int(fields::EVENT_NUMBER, -1),
                // Older files spelled the seed ET differently.
                FieldDef::float("seed_et_mev", 0.0),
                FieldDef::float_array(fields::CL_RINGS),
            ],
        )
        .unwrap();
    let number = table.bind_scalar::<i32>(fields::EVENT_NUMBER);
    let et = table.bind_scalar::<f32>("seed_et_mev");
    let rings = table.bind_array::<f32>(fields::CL_RINGS);
    let mut row = table.row_buffer();
    row.set(number, 42);
    row.set(et, 5_000.0);
    row.assign(rings, &[0.25, 0.75]);
    table.fill(&row).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.jsonl");
    write_tables(&path, &store, &WriteOptions::default()).unwrap();
    let read = read_tables(&path).unwrap();

    let table = read.table("physics").unwrap();
    let mut reader = table.reader();
    let number = reader.bind_scalar::<i32>(fields::EVENT_NUMBER);
    let et = reader.bind_scalar::<f32>(fields::SEED_ET);
    let rings = reader.bind_array::<f32>(fields::CL_RINGS);
    assert!(!et.is_connected());

    let row = reader.read_entry(0).unwrap();
    assert_eq!(row.get(number), Some(42));
    assert_eq!(row.get(et), None);
    assert_eq!(row.array(rings).unwrap(), &[0.25, 0.75]);
}

#[test]
fn test_aliased_field_reads_through_new_name() {
    let mut store = TableStore::new();
    let table = store
        .create_table("physics", &[FieldDef::float("seed_et_mev", 0.0)])
        .unwrap();
    table.add_alias(fields::SEED_ET, "seed_et_mev").unwrap();
    let et = table.bind_scalar::<f32>(fields::SEED_ET);
    let mut row = table.row_buffer();
    row.set(et, 7_500.0);
    table.fill(&row).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("aliased.jsonl");
    write_tables(&path, &store, &WriteOptions::default()).unwrap();
    let read = read_tables(&path).unwrap();

    let mut reader = read.table("physics").unwrap().reader();
    let et = reader.bind_scalar::<f32>(fields::SEED_ET);
    assert_eq!(reader.read_entry(0).unwrap().get(et), Some(7_500.0));
}

#[test]
fn test_event_file_feeds_the_maker() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    write_events(&path, &events()).unwrap();

    let mut maker = NtupleMaker::new(NtupleConfig::default());
    let mut tables = TableStore::new();
    maker.book(&mut tables).unwrap();
    for event in read_events(&path).unwrap() {
        maker.fill(&event, &mut tables).unwrap();
    }
    assert_eq!(maker.statistics().rows, 10);
    assert_eq!(tables.table("physics").unwrap().entries(), 10);
}

#[test]
fn test_event_file_cluster_without_id_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    std::fs::write(
        &path,
        concat!(
            r#"{"event_info": {"EventInfo": {"event_number": 1, "seeds": [{"eta": 2.0, "phi": 0.0, "et": 10.0}]}},"#,
            r#" "clusters": {"Clusters": [{"eta": 0.0, "et": 3.0}, {"eta": 2.0, "et": 7.0}]},"#,
            r#" "rings": {"Rings": [{"cluster": 0, "rings": [1.0]}]}}"#,
            "\n"
        ),
    )
    .unwrap();

    let err = read_events(&path).unwrap_err();
    assert!(matches!(err, calotuple_io::Error::InvalidFormat(_)));
    assert!(err.to_string().contains(":1:"));
}

#[test]
fn test_event_file_repeated_cluster_ids_leave_rings_unmatched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    std::fs::write(
        &path,
        concat!(
            r#"{"event_info": {"EventInfo": {"event_number": 1, "seeds": [{"eta": 2.0, "phi": 0.0, "et": 10.0}]}},"#,
            r#" "clusters": {"Clusters": [{"id": 0, "eta": 0.0, "et": 3.0}, {"id": 0, "eta": 2.0, "et": 7.0}]},"#,
            r#" "rings": {"Rings": [{"cluster": 0, "rings": [1.0]}]}}"#,
            "\n"
        ),
    )
    .unwrap();

    let mut maker = NtupleMaker::new(NtupleConfig::default());
    let mut tables = TableStore::new();
    maker.book(&mut tables).unwrap();
    for event in read_events(&path).unwrap() {
        maker.fill(&event, &mut tables).unwrap();
    }

    let mut reader = tables.table("physics").unwrap().reader();
    let cl_et = reader.bind_scalar::<f32>(fields::CL_ET);
    let ringer_match = reader.bind_scalar::<bool>(fields::CL_RINGER_MATCH);
    let row = reader.read_entry(0).unwrap();
    assert_eq!(row.get(cl_et), Some(7.0));
    assert_eq!(row.get(ringer_match), Some(false));
}
