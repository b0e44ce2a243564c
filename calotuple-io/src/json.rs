//! JSON Lines table files.
//!
//! Each table starts with a header line
//!
//! ```text
//! {"$table": "physics", "fields": [{"name": "EventNumber", "kind": "int", "default": -1}, ...]}
//! ```
//!
//! followed by one object per row mapping field names to values. Rows may
//! omit fields; omitted fields read back as their default. Non-finite floats
//! are written as the strings `"nan"`, `"inf"` and `"-inf"`.

use crate::{Error, Result};
use calotuple_core::{Column, FieldDef, FieldKind, Table, TableStore, Value};
use log::warn;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const TABLE_KEY: &str = "$table";
const NAN: &str = "nan";
const INF: &str = "inf";
const NEG_INF: &str = "-inf";

#[derive(Debug, Serialize, Deserialize)]
struct TableHeader {
    #[serde(rename = "$table")]
    table: String,
    fields: Vec<FieldHeader>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aliases: Vec<(String, String)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldHeader {
    name: String,
    kind: String,
    #[serde(default)]
    default: serde_json::Value,
}

/// JSON has no literal for NaN or infinity.
struct F32Ref(f32);

impl Serialize for F32Ref {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_nan() {
            serializer.serialize_str(NAN)
        } else if v.is_infinite() {
            serializer.serialize_str(if v > 0.0 { INF } else { NEG_INF })
        } else {
            serializer.serialize_f32(v)
        }
    }
}

/// Serializes a [`Value`] without building an intermediate JSON tree.
struct ValueRef<'a>(&'a Value);

impl Serialize for ValueRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Value::Int(v) => serializer.serialize_i32(*v),
            Value::Float(v) => F32Ref(*v).serialize(serializer),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::FloatArray(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for v in values {
                    seq.serialize_element(&F32Ref(*v))?;
                }
                seq.end()
            }
            Value::IntArray(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for v in values {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
        }
    }
}

/// One row in field order.
struct RowRef<'a> {
    fields: &'a [FieldDef],
    values: &'a [Value],
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in self.fields.iter().zip(self.values) {
            map.serialize_entry(&field.name, &ValueRef(value))?;
        }
        map.end()
    }
}

/// Writes every table of `store` to a JSON Lines file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_tables_jsonl<P: AsRef<Path>>(path: P, store: &TableStore) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for table in store.tables() {
        write_table(&mut writer, table)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_table<W: Write>(writer: &mut W, table: &Table) -> Result<()> {
    let mut aliases: Vec<(String, String)> = table
        .aliases()
        .map(|(a, t)| (a.to_string(), t.to_string()))
        .collect();
    aliases.sort();

    let header = TableHeader {
        table: table.name().to_string(),
        fields: table
            .fields()
            .iter()
            .map(|f| {
                Ok(FieldHeader {
                    name: f.name.clone(),
                    kind: f.kind().to_string(),
                    default: serde_json::to_value(ValueRef(&f.default))?,
                })
            })
            .collect::<Result<_>>()?,
        aliases,
    };
    serde_json::to_writer(&mut *writer, &header)?;
    writer.write_all(b"\n")?;

    let mut scratch: Vec<Value> = table.fields().iter().map(|f| f.default.clone()).collect();
    for entry in 0..table.entries() {
        for (column, slot) in table.columns().iter().zip(scratch.iter_mut()) {
            column.load(entry, slot);
        }
        let row = RowRef {
            fields: table.fields(),
            values: &scratch,
        };
        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Reads every table of a JSON Lines file, in file order.
///
/// # Errors
/// Returns an error if the file cannot be read, a line is not valid JSON,
/// a row appears before any header, or a value does not match its field.
pub fn read_tables_jsonl<P: AsRef<Path>>(path: P) -> Result<TableStore> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut store = TableStore::new();
    let mut pending: Option<PendingTable> = None;

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let at = || format!("{}:{}", path.display(), number + 1);
        let value: serde_json::Value = serde_json::from_str(&line)
            .map_err(|e| Error::InvalidFormat(format!("{}: {e}", at())))?;
        let serde_json::Value::Object(object) = value else {
            return Err(Error::InvalidFormat(format!("{}: expected an object", at())));
        };

        if object.contains_key(TABLE_KEY) {
            if let Some(table) = pending.take() {
                table.finish(&mut store)?;
            }
            let header: TableHeader = serde_json::from_value(serde_json::Value::Object(object))
                .map_err(|e| Error::InvalidFormat(format!("{}: {e}", at())))?;
            pending = Some(PendingTable::from_header(header).map_err(|reason| {
                Error::InvalidFormat(format!("{}: {reason}", at()))
            })?);
        } else {
            let table = pending.as_mut().ok_or_else(|| {
                Error::InvalidFormat(format!("{}: row before any table header", at()))
            })?;
            table
                .push_row(&object)
                .map_err(|reason| Error::InvalidFormat(format!("{}: {reason}", at())))?;
        }
    }

    if let Some(table) = pending.take() {
        table.finish(&mut store)?;
    }
    Ok(store)
}

struct PendingTable {
    name: String,
    fields: Vec<FieldDef>,
    aliases: Vec<(String, String)>,
    columns: Vec<Column>,
    warned_unknown: bool,
}

impl PendingTable {
    fn from_header(header: TableHeader) -> std::result::Result<Self, String> {
        let mut fields = Vec::with_capacity(header.fields.len());
        for field in header.fields {
            let kind: FieldKind = field.kind.parse()?;
            let default = if field.default.is_null() && kind != FieldKind::Float {
                kind.zero()
            } else {
                value_from_json(kind, &field.default)
                    .ok_or_else(|| format!("bad default for field '{}'", field.name))?
            };
            fields.push(FieldDef::new(field.name, default));
        }
        let columns = fields.iter().map(|f| Column::new(f.kind())).collect();
        Ok(Self {
            name: header.table,
            fields,
            aliases: header.aliases,
            columns,
            warned_unknown: false,
        })
    }

    fn push_row(
        &mut self,
        row: &serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<(), String> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = match row.get(&field.name) {
                Some(json) => value_from_json(field.kind(), json).ok_or_else(|| {
                    format!("value {json} does not fit {} field '{}'", field.kind(), field.name)
                })?,
                None => field.default.clone(),
            };
            values.push(value);
        }

        if !self.warned_unknown {
            if let Some(key) = row
                .keys()
                .find(|k| !self.fields.iter().any(|f| &f.name == *k))
            {
                warn!("table '{}': ignoring undeclared field '{key}'", self.name);
                self.warned_unknown = true;
            }
        }

        for (column, value) in self.columns.iter_mut().zip(&values) {
            column.push(value).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn finish(self, store: &mut TableStore) -> Result<()> {
        let mut table = Table::from_columns(self.name, self.fields, self.columns)?;
        for (alias, target) in self.aliases {
            table.add_alias(alias, target)?;
        }
        store.insert(table)?;
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn json_f32(value: &serde_json::Value) -> Option<f32> {
    match value {
        // Files written before non-finite values were spelled out.
        serde_json::Value::Null => Some(f32::NAN),
        serde_json::Value::String(s) => match s.as_str() {
            NAN => Some(f32::NAN),
            INF => Some(f32::INFINITY),
            NEG_INF => Some(f32::NEG_INFINITY),
            _ => None,
        },
        _ => value.as_f64().map(|v| v as f32),
    }
}

fn json_i32(value: &serde_json::Value) -> Option<i32> {
    value.as_i64().and_then(|v| i32::try_from(v).ok())
}

/// Decodes a JSON value as a field value of `kind`.
///
/// Returns `None` when the JSON type does not fit the kind.
#[must_use]
pub fn value_from_json(kind: FieldKind, value: &serde_json::Value) -> Option<Value> {
    match kind {
        FieldKind::Int => json_i32(value).map(Value::Int),
        FieldKind::Float => json_f32(value).map(Value::Float),
        FieldKind::Bool => value.as_bool().map(Value::Bool),
        FieldKind::FloatArray => value
            .as_array()?
            .iter()
            .map(json_f32)
            .collect::<Option<Vec<_>>>()
            .map(Value::FloatArray),
        FieldKind::IntArray => value
            .as_array()?
            .iter()
            .map(json_i32)
            .collect::<Option<Vec<_>>>()
            .map(Value::IntArray),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample_store() -> TableStore {
        let mut store = TableStore::new();
        let table = store
            .create_table(
                "physics",
                &[
                    FieldDef::int("EventNumber", -1),
                    FieldDef::float("seed_et", 0.0),
                    FieldDef::bool("cl_match", false),
                    FieldDef::float_array("cl_rings"),
                    FieldDef::int_array("cl_cell_layer"),
                ],
            )
            .unwrap();
        table.add_alias("et", "seed_et").unwrap();

        let number = table.bind_scalar::<i32>("EventNumber");
        let et = table.bind_scalar::<f32>("seed_et");
        let matched = table.bind_scalar::<bool>("cl_match");
        let rings = table.bind_array::<f32>("cl_rings");
        let layers = table.bind_array::<i32>("cl_cell_layer");

        let mut row = table.row_buffer();
        row.set(number, 10);
        row.set(et, 12_300.0);
        row.set(matched, true);
        row.assign(rings, &[0.1, 0.25]);
        row.assign(layers, &[1, 2, 2]);
        table.fill(&row).unwrap();

        row.reset();
        row.set(number, 11);
        table.fill(&row).unwrap();

        store
            .create_table("summary", &[FieldDef::int("events", 0)])
            .unwrap();
        store
    }

    #[test]
    fn test_jsonl_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let store = sample_store();
        write_tables_jsonl(file.path(), &store).unwrap();

        let read = read_tables_jsonl(file.path()).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read.tables()[0].name(), "physics");
        assert_eq!(read.tables()[1].name(), "summary");

        let original = store.table("physics").unwrap();
        let restored = read.table("physics").unwrap();
        assert_eq!(restored.fields(), original.fields());
        assert_eq!(restored.columns(), original.columns());
        assert_eq!(restored.resolve("et"), restored.resolve("seed_et"));
    }

    #[test]
    fn test_header_then_rows_layout() {
        let file = NamedTempFile::new().unwrap();
        write_tables_jsonl(file.path(), &sample_store()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(r#"{"$table":"physics""#));
        assert!(lines[0].contains(r#"{"name":"EventNumber","kind":"int","default":-1}"#));
        assert!(lines[1].starts_with(r#"{"EventNumber":10,"seed_et":12300.0"#));
        assert!(lines[2].contains(r#""cl_rings":[]"#));
        assert!(lines[3].starts_with(r#"{"$table":"summary""#));
    }

    #[test]
    fn test_missing_row_values_take_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            concat!(
                r#"{"$table":"t","fields":[{"name":"n","kind":"int","default":-1},{"name":"x","kind":"float[]","default":[]}]}"#,
                "\n",
                r#"{"x":[1.5],"extra":true}"#,
                "\n",
            ),
        )
        .unwrap();

        let store = read_tables_jsonl(file.path()).unwrap();
        let table = store.table("t").unwrap();
        assert_eq!(table.entries(), 1);
        let mut reader = table.reader();
        let n = reader.bind_scalar::<i32>("n");
        let x = reader.bind_array::<f32>("x");
        let row = reader.read_entry(0).unwrap();
        assert_eq!(row.get(n), Some(-1));
        assert_eq!(row.array(x).unwrap(), &[1.5]);
    }

    #[test]
    fn test_row_without_header_rejected() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{\"n\": 1}\n").unwrap();
        assert!(matches!(
            read_tables_jsonl(file.path()),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_wrong_value_type_rejected() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "{\"$table\":\"t\",\"fields\":[{\"name\":\"n\",\"kind\":\"int\",\"default\":0}]}\n{\"n\":\"seven\"}\n",
        )
        .unwrap();
        match read_tables_jsonl(file.path()) {
            Err(Error::InvalidFormat(msg)) => assert!(msg.contains(":2:")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_value_from_json_kinds() {
        use serde_json::json;
        assert_eq!(value_from_json(FieldKind::Int, &json!(3)), Some(Value::Int(3)));
        assert_eq!(value_from_json(FieldKind::Int, &json!(1.5)), None);
        assert_eq!(
            value_from_json(FieldKind::IntArray, &json!([1, 2])),
            Some(Value::IntArray(vec![1, 2]))
        );
        assert_eq!(value_from_json(FieldKind::Bool, &json!(1)), None);
        assert!(matches!(
            value_from_json(FieldKind::Float, &serde_json::Value::Null),
            Some(Value::Float(v)) if v.is_nan()
        ));
        assert_eq!(
            value_from_json(FieldKind::Float, &json!("-inf")),
            Some(Value::Float(f32::NEG_INFINITY))
        );
        assert_eq!(value_from_json(FieldKind::Float, &json!("big")), None);
        assert_eq!(value_from_json(FieldKind::Int, &json!("inf")), None);
    }

    #[test]
    fn test_non_finite_floats_roundtrip() {
        let mut store = TableStore::new();
        let table = store
            .create_table(
                "physics",
                &[FieldDef::float("cl_rhad", 0.0), FieldDef::float_array("cl_rings")],
            )
            .unwrap();
        let rhad = table.bind_scalar::<f32>("cl_rhad");
        let rings = table.bind_array::<f32>("cl_rings");
        let mut row = table.row_buffer();
        row.set(rhad, f32::INFINITY);
        row.assign(rings, &[f32::NEG_INFINITY, 0.5, f32::NAN]);
        table.fill(&row).unwrap();

        let file = NamedTempFile::new().unwrap();
        write_tables_jsonl(file.path(), &store).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.contains(r#""cl_rhad":"inf""#));
        assert!(text.contains(r#""cl_rings":["-inf",0.5,"nan"]"#));

        let read = read_tables_jsonl(file.path()).unwrap();
        let mut reader = read.table("physics").unwrap().reader();
        let rhad = reader.bind_scalar::<f32>("cl_rhad");
        let rings = reader.bind_array::<f32>("cl_rings");
        let row = reader.read_entry(0).unwrap();
        assert_eq!(row.get(rhad), Some(f32::INFINITY));
        let values = row.array(rings).unwrap();
        assert_eq!(values[..2], [f32::NEG_INFINITY, 0.5]);
        assert!(values[2].is_nan());
    }
}
