//! HDF5 table files.
//!
//! Layout:
//!
//! ```text
//! /                         calotuple_format_version = "0.1", tables = [...]
//! /<table>/                 fields = [...], alias_names = [...], alias_targets = [...]
//! /<table>/<scalar>         1-D, one entry per row (bools stored as u8)
//!                           attrs: kind, default
//! /<table>/<array>          flattened values of every row
//! /<table>/<array>_index    u64 row start offsets, rows + 1 entries
//! ```

use crate::{Error, Result, WriteOptions};
use calotuple_core::{Column, FieldDef, FieldKind, Jagged, Table, TableStore, Value};
use hdf5::types::{H5Type, VarLenUnicode};
use hdf5::{Dataset, File, Group, Location};
use log::{debug, warn};
use ndarray::{s, ArrayView1};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// Version written into every file.
pub const FORMAT_VERSION: &str = "0.1";

const INDEX_SUFFIX: &str = "_index";

/// Writes every table of `store` to an HDF5 file.
///
/// # Errors
/// Returns an error if HDF5 I/O fails, a table name is not a valid group
/// name, or two fields would map onto the same dataset.
pub fn write_tables_hdf5<P: AsRef<Path>>(
    path: P,
    store: &TableStore,
    options: &WriteOptions,
) -> Result<()> {
    let file = File::create(path)?;
    set_attr_str(&file, "calotuple_format_version", FORMAT_VERSION)?;
    let names: Vec<&str> = store.tables().iter().map(Table::name).collect();
    set_attr_str_list(&file, "tables", &names)?;

    for table in store.tables() {
        if table.name().is_empty() || table.name().contains('/') {
            return Err(Error::InvalidFormat(format!(
                "table name '{}' cannot be stored as an HDF5 group",
                table.name()
            )));
        }
        let group = file.create_group(table.name())?;
        write_table(&group, table, options)?;
        debug!(
            "wrote table '{}' ({} entries) to HDF5",
            table.name(),
            table.entries()
        );
    }
    Ok(())
}

fn write_table(group: &Group, table: &Table, options: &WriteOptions) -> Result<()> {
    check_dataset_names(table)?;

    let names: Vec<&str> = table.fields().iter().map(|f| f.name.as_str()).collect();
    set_attr_str_list(group, "fields", &names)?;

    let mut aliases: Vec<(&str, &str)> = table.aliases().collect();
    aliases.sort_unstable();
    let (alias_names, alias_targets): (Vec<&str>, Vec<&str>) = aliases.into_iter().unzip();
    set_attr_str_list(group, "alias_names", &alias_names)?;
    set_attr_str_list(group, "alias_targets", &alias_targets)?;

    for (field, column) in table.fields().iter().zip(table.columns()) {
        let name = field.name.as_str();
        let dataset = match column {
            Column::Int(values) => {
                let ds = write_dataset(group, name, values, options)?;
                if let Value::Int(default) = field.default {
                    ds.new_attr::<i32>().create("default")?.write_scalar(&default)?;
                }
                ds
            }
            Column::Float(values) => {
                let ds = write_dataset(group, name, values, options)?;
                if let Value::Float(default) = field.default {
                    ds.new_attr::<f32>().create("default")?.write_scalar(&default)?;
                }
                ds
            }
            Column::Bool(values) => {
                let bytes: Vec<u8> = values.iter().map(|&b| u8::from(b)).collect();
                let ds = write_dataset(group, name, &bytes, options)?;
                if let Value::Bool(default) = field.default {
                    ds.new_attr::<u8>()
                        .create("default")?
                        .write_scalar(&u8::from(default))?;
                }
                ds
            }
            Column::FloatArray(jagged) => write_jagged(group, name, jagged, options)?,
            Column::IntArray(jagged) => write_jagged(group, name, jagged, options)?,
        };
        set_attr_str(&dataset, "kind", field.kind().as_str())?;
    }
    Ok(())
}

fn check_dataset_names(table: &Table) -> Result<()> {
    let mut seen = HashSet::new();
    for field in table.fields() {
        let mut names = vec![field.name.clone()];
        if field.kind().is_array() {
            names.push(format!("{}{INDEX_SUFFIX}", field.name));
        }
        for name in names {
            if name.is_empty() || name.contains('/') || !seen.insert(name.clone()) {
                return Err(Error::InvalidFormat(format!(
                    "field '{}' of table '{}' cannot be stored as dataset '{name}'",
                    field.name,
                    table.name()
                )));
            }
        }
    }
    Ok(())
}

fn write_dataset<T: H5Type>(
    group: &Group,
    name: &str,
    values: &[T],
    options: &WriteOptions,
) -> Result<Dataset> {
    let dataset = create_extendable_dataset::<T>(
        group,
        name,
        options.chunk_rows.max(1),
        options.compression,
        options.shuffle,
    )?;
    append_slice(&dataset, 0, values)?;
    Ok(dataset)
}

fn write_jagged<T: H5Type + Copy>(
    group: &Group,
    name: &str,
    jagged: &Jagged<T>,
    options: &WriteOptions,
) -> Result<Dataset> {
    let values = write_dataset(group, name, jagged.values(), options)?;
    let offsets = jagged
        .offsets()
        .iter()
        .map(|&o| u64::try_from(o))
        .collect::<std::result::Result<Vec<u64>, _>>()
        .map_err(|_| Error::InvalidFormat(format!("offsets of '{name}' overflow u64")))?;
    write_dataset(group, &format!("{name}{INDEX_SUFFIX}"), &offsets, options)?;
    Ok(values)
}

/// Reads every table of an HDF5 file, in the order they were written.
///
/// # Errors
/// Returns an error if HDF5 I/O fails or the layout is inconsistent.
pub fn read_tables_hdf5<P: AsRef<Path>>(path: P) -> Result<TableStore> {
    let file = File::open(path)?;
    match read_attr_opt_string(&file, "calotuple_format_version")? {
        Some(version) if version == FORMAT_VERSION => {}
        Some(version) => warn!("reading format version {version}, expected {FORMAT_VERSION}"),
        None => warn!("file carries no calotuple_format_version attribute"),
    }

    let mut store = TableStore::new();
    for name in read_attr_str_list(&file, "tables")? {
        let group = file.group(&name)?;
        let table = read_table(&group, &name)?;
        store.insert(table)?;
    }
    Ok(store)
}

fn read_table(group: &Group, name: &str) -> Result<Table> {
    let names = read_attr_str_list(group, "fields")?;
    let mut fields = Vec::with_capacity(names.len());
    let mut columns = Vec::with_capacity(names.len());

    for field_name in names {
        let dataset = group.dataset(&field_name)?;
        let kind_str = read_attr_opt_string(&dataset, "kind")?.ok_or_else(|| {
            Error::InvalidFormat(format!("dataset '{name}/{field_name}' has no kind"))
        })?;
        let kind = FieldKind::from_str(&kind_str).map_err(Error::InvalidFormat)?;

        let (default, column) = match kind {
            FieldKind::Int => (
                Value::Int(read_attr_opt::<i32>(&dataset, "default")?.unwrap_or(0)),
                Column::Int(dataset.read_raw::<i32>()?),
            ),
            FieldKind::Float => (
                Value::Float(read_attr_opt::<f32>(&dataset, "default")?.unwrap_or(0.0)),
                Column::Float(dataset.read_raw::<f32>()?),
            ),
            FieldKind::Bool => (
                Value::Bool(read_attr_opt::<u8>(&dataset, "default")?.unwrap_or(0) != 0),
                Column::Bool(dataset.read_raw::<u8>()?.into_iter().map(|b| b != 0).collect()),
            ),
            FieldKind::FloatArray => (
                kind.zero(),
                Column::FloatArray(read_jagged(group, &field_name, &dataset)?),
            ),
            FieldKind::IntArray => (
                kind.zero(),
                Column::IntArray(read_jagged(group, &field_name, &dataset)?),
            ),
        };
        fields.push(FieldDef::new(field_name, default));
        columns.push(column);
    }

    let mut table = Table::from_columns(name, fields, columns)?;
    let alias_names = read_attr_str_list(group, "alias_names")?;
    let alias_targets = read_attr_str_list(group, "alias_targets")?;
    if alias_names.len() != alias_targets.len() {
        return Err(Error::InvalidFormat(format!(
            "table '{name}' has {} alias names but {} targets",
            alias_names.len(),
            alias_targets.len()
        )));
    }
    for (alias, target) in alias_names.into_iter().zip(alias_targets) {
        table.add_alias(alias, target)?;
    }
    Ok(table)
}

fn read_jagged<T: H5Type + Copy>(group: &Group, name: &str, values: &Dataset) -> Result<Jagged<T>> {
    let index = read_dataset_vec_opt::<u64>(group, &format!("{name}{INDEX_SUFFIX}"))?
        .ok_or_else(|| Error::InvalidFormat(format!("array '{name}' has no index dataset")))?;
    let offsets = index
        .into_iter()
        .map(usize::try_from)
        .collect::<std::result::Result<Vec<usize>, _>>()
        .map_err(|_| Error::InvalidFormat(format!("offsets of '{name}' overflow usize")))?;
    Jagged::from_parts(values.read_raw::<T>()?, offsets)
        .ok_or_else(|| Error::InvalidFormat(format!("array '{name}' has inconsistent offsets")))
}

fn create_extendable_dataset<T: H5Type>(
    group: &Group,
    name: &str,
    chunk_rows: usize,
    compression: Option<u8>,
    shuffle: bool,
) -> Result<Dataset> {
    let mut builder = group
        .new_dataset::<T>()
        .shape((0..,))
        .chunk((chunk_rows,));

    if let Some(level) = compression {
        builder = builder.deflate(level);
    }

    if shuffle {
        builder = builder.shuffle();
    }

    Ok(builder.create(name)?)
}

fn append_slice<T: H5Type>(dataset: &Dataset, offset: usize, data: &[T]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    let new_len = offset + data.len();
    dataset.resize((new_len,))?;
    let view = ArrayView1::from(data);
    dataset.write_slice(view, s![offset..new_len])?;
    Ok(())
}

fn set_attr_str(location: &Location, name: &str, value: &str) -> Result<()> {
    let value = to_var_len_unicode(value)?;
    location
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

// Empty lists are not written; readers treat a missing attribute as empty.
fn set_attr_str_list(location: &Location, name: &str, values: &[&str]) -> Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    let values = values
        .iter()
        .map(|v| to_var_len_unicode(v))
        .collect::<Result<Vec<_>>>()?;
    location
        .new_attr::<VarLenUnicode>()
        .shape(values.len())
        .create(name)?
        .write_raw(values.as_slice())?;
    Ok(())
}

fn read_attr_str_list(location: &Location, name: &str) -> Result<Vec<String>> {
    match location.attr(name) {
        Ok(attr) => Ok(attr
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(ToString::to_string)
            .collect()),
        Err(_) => Ok(Vec::new()),
    }
}

fn read_dataset_vec_opt<T: H5Type>(group: &Group, name: &str) -> Result<Option<Vec<T>>> {
    match group.dataset(name) {
        Ok(dataset) => Ok(Some(dataset.read_raw::<T>()?)),
        Err(_) => Ok(None),
    }
}

fn read_attr_opt<T: H5Type + Clone>(location: &Location, name: &str) -> Result<Option<T>> {
    match location.attr(name) {
        Ok(attr) => Ok(Some(attr.read_scalar::<T>()?)),
        Err(_) => Ok(None),
    }
}

fn read_attr_opt_string(location: &Location, name: &str) -> Result<Option<String>> {
    match location.attr(name) {
        Ok(attr) => {
            let value: VarLenUnicode = attr.read_scalar()?;
            Ok(Some(value.to_string()))
        }
        Err(_) => Ok(None),
    }
}

fn to_var_len_unicode(value: &str) -> Result<VarLenUnicode> {
    VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))
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
        for event in 0..5 {
            row.reset();
            row.set(number, event);
            row.set(et, 1_000.0 * event as f32);
            if event % 2 == 0 {
                row.set(matched, true);
                row.assign(rings, &[0.5; 3]);
                for layer in 0..event {
                    row.push(layers, layer);
                }
            }
            table.fill(&row).unwrap();
        }

        store
            .create_table("empty", &[FieldDef::float("x", 2.5)])
            .unwrap();
        store
    }

    #[test]
    fn test_hdf5_table_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let store = sample_store();
        let options = WriteOptions {
            chunk_rows: 2,
            compression: None,
            shuffle: false,
        };
        write_tables_hdf5(file.path(), &store, &options).unwrap();

        let read = read_tables_hdf5(file.path()).unwrap();
        assert_eq!(read, store);
        assert_eq!(read.tables()[0].name(), "physics");
        assert_eq!(read.tables()[1].name(), "empty");
    }

    #[test]
    fn test_hdf5_layout() {
        let file = NamedTempFile::new().unwrap();
        write_tables_hdf5(file.path(), &sample_store(), &WriteOptions::default()).unwrap();

        let h5 = File::open(file.path()).unwrap();
        assert_eq!(
            read_attr_opt_string(&h5, "calotuple_format_version")
                .unwrap()
                .as_deref(),
            Some(FORMAT_VERSION)
        );
        let group = h5.group("physics").unwrap();
        assert_eq!(
            read_attr_str_list(&group, "fields").unwrap()[3],
            "cl_rings"
        );
        let index = group.dataset("cl_rings_index").unwrap().read_raw::<u64>().unwrap();
        assert_eq!(index, vec![0, 3, 3, 6, 6, 9]);
        let matched = group.dataset("cl_match").unwrap().read_raw::<u8>().unwrap();
        assert_eq!(matched, vec![1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_colliding_index_name_rejected() {
        let mut store = TableStore::new();
        store
            .create_table(
                "t",
                &[FieldDef::float_array("x"), FieldDef::int("x_index", 0)],
            )
            .unwrap();
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            write_tables_hdf5(file.path(), &store, &WriteOptions::default()),
            Err(Error::InvalidFormat(_))
        ));
    }
}
