//! The `physics` ntuple layout: one row per seed.

use calotuple_core::{ArraySlot, FieldDef, ScalarSlot, Table};

/// Field names of the physics ntuple.
pub mod fields {
    pub const EVENT_NUMBER: &str = "EventNumber";
    pub const AVGMU: &str = "avgmu";
    pub const SEED_ETA: &str = "seed_eta";
    pub const SEED_PHI: &str = "seed_phi";
    pub const SEED_ET: &str = "seed_et";

    pub const CL_MATCH: &str = "cl_match";
    pub const CL_ETA: &str = "cl_eta";
    pub const CL_PHI: &str = "cl_phi";
    pub const CL_ET: &str = "cl_et";
    pub const CL_E1: &str = "cl_e1";
    pub const CL_E2: &str = "cl_e2";
    pub const CL_E3: &str = "cl_e3";
    pub const CL_EHAD1: &str = "cl_ehad1";
    pub const CL_EHAD2: &str = "cl_ehad2";
    pub const CL_EHAD3: &str = "cl_ehad3";
    pub const CL_ETOT: &str = "cl_etot";
    pub const CL_RETA: &str = "cl_reta";
    pub const CL_RPHI: &str = "cl_rphi";
    pub const CL_RHAD: &str = "cl_rhad";
    pub const CL_ERATIO: &str = "cl_eratio";
    pub const CL_F0: &str = "cl_f0";
    pub const CL_F1: &str = "cl_f1";
    pub const CL_F2: &str = "cl_f2";
    pub const CL_F3: &str = "cl_f3";
    pub const CL_WETA2: &str = "cl_weta2";
    pub const CL_E233: &str = "cl_e233";
    pub const CL_E237: &str = "cl_e237";
    pub const CL_E277: &str = "cl_e277";
    pub const CL_EMAXS1: &str = "cl_emaxs1";
    pub const CL_E2TSTS1: &str = "cl_e2tsts1";

    pub const CL_RINGER_MATCH: &str = "cl_ringer_match";
    pub const CL_RINGS: &str = "cl_rings";

    pub const CL_CELL_ET: &str = "cl_cell_et";
    pub const CL_CELL_ETA: &str = "cl_cell_eta";
    pub const CL_CELL_PHI: &str = "cl_cell_phi";
    pub const CL_CELL_DETA: &str = "cl_cell_deta";
    pub const CL_CELL_DPHI: &str = "cl_cell_dphi";
    pub const CL_CELL_ENERGY: &str = "cl_cell_energy";
    pub const CL_CELL_LAYER: &str = "cl_cell_layer";

    /// Shower-shape scalars, in the order they are booked.
    pub const SHOWER_SHAPES: [&str; 21] = [
        CL_E1, CL_E2, CL_E3, CL_EHAD1, CL_EHAD2, CL_EHAD3, CL_ETOT, CL_RETA, CL_RPHI, CL_RHAD,
        CL_ERATIO, CL_F0, CL_F1, CL_F2, CL_F3, CL_WETA2, CL_E233, CL_E237, CL_E277, CL_EMAXS1,
        CL_E2TSTS1,
    ];

    /// The seven parallel cell arrays.
    pub const CELL_ARRAYS: [&str; 7] = [
        CL_CELL_ET,
        CL_CELL_ETA,
        CL_CELL_PHI,
        CL_CELL_DETA,
        CL_CELL_DPHI,
        CL_CELL_ENERGY,
        CL_CELL_LAYER,
    ];
}

/// The full physics schema with per-field reset defaults.
///
/// `EventNumber` resets to -1 so a row never claims event 0 by accident;
/// everything else resets to zero, false or empty.
#[must_use]
pub fn physics_schema() -> Vec<FieldDef> {
    use self::fields::*;

    let mut schema = vec![
        FieldDef::int(EVENT_NUMBER, -1),
        FieldDef::float(AVGMU, 0.0),
        FieldDef::float(SEED_ETA, 0.0),
        FieldDef::float(SEED_PHI, 0.0),
        FieldDef::float(SEED_ET, 0.0),
        FieldDef::bool(CL_MATCH, false),
        FieldDef::float(CL_ETA, 0.0),
        FieldDef::float(CL_PHI, 0.0),
        FieldDef::float(CL_ET, 0.0),
    ];
    schema.extend(SHOWER_SHAPES.iter().map(|name| FieldDef::float(*name, 0.0)));
    schema.push(FieldDef::bool(CL_RINGER_MATCH, false));
    schema.push(FieldDef::float_array(CL_RINGS));
    schema.extend(
        CELL_ARRAYS[..6]
            .iter()
            .map(|name| FieldDef::float_array(*name)),
    );
    schema.push(FieldDef::int_array(CL_CELL_LAYER));
    schema
}

/// Slot handles of the shower-shape scalars.
#[derive(Debug, Clone, Copy)]
pub struct ShapeSlots {
    pub e1: ScalarSlot<f32>,
    pub e2: ScalarSlot<f32>,
    pub e3: ScalarSlot<f32>,
    pub ehad1: ScalarSlot<f32>,
    pub ehad2: ScalarSlot<f32>,
    pub ehad3: ScalarSlot<f32>,
    pub etot: ScalarSlot<f32>,
    pub reta: ScalarSlot<f32>,
    pub rphi: ScalarSlot<f32>,
    pub rhad: ScalarSlot<f32>,
    pub eratio: ScalarSlot<f32>,
    pub f0: ScalarSlot<f32>,
    pub f1: ScalarSlot<f32>,
    pub f2: ScalarSlot<f32>,
    pub f3: ScalarSlot<f32>,
    pub weta2: ScalarSlot<f32>,
    pub e233: ScalarSlot<f32>,
    pub e237: ScalarSlot<f32>,
    pub e277: ScalarSlot<f32>,
    pub emaxs1: ScalarSlot<f32>,
    pub e2tsts1: ScalarSlot<f32>,
}

/// Slot handles of the parallel cell arrays.
#[derive(Debug, Clone, Copy)]
pub struct CellSlots {
    pub et: ArraySlot<f32>,
    pub eta: ArraySlot<f32>,
    pub phi: ArraySlot<f32>,
    pub deta: ArraySlot<f32>,
    pub dphi: ArraySlot<f32>,
    pub energy: ArraySlot<f32>,
    pub layer: ArraySlot<i32>,
}

/// Every physics field resolved to a typed handle.
///
/// Built once per table; rows are then written without name lookups.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsSlots {
    pub event_number: ScalarSlot<i32>,
    pub avgmu: ScalarSlot<f32>,
    pub seed_eta: ScalarSlot<f32>,
    pub seed_phi: ScalarSlot<f32>,
    pub seed_et: ScalarSlot<f32>,
    pub cl_match: ScalarSlot<bool>,
    pub cl_eta: ScalarSlot<f32>,
    pub cl_phi: ScalarSlot<f32>,
    pub cl_et: ScalarSlot<f32>,
    pub shapes: ShapeSlots,
    pub cl_ringer_match: ScalarSlot<bool>,
    pub cl_rings: ArraySlot<f32>,
    pub cells: CellSlots,
}

impl PhysicsSlots {
    /// Resolves every physics field in `table`.
    ///
    /// Fields the table lacks come back disconnected (and are logged by the
    /// table), so a partial schema still binds.
    #[must_use]
    pub fn bind(table: &Table) -> Self {
        use self::fields::*;

        let f = |name: &str| table.bind_scalar::<f32>(name);
        Self {
            event_number: table.bind_scalar(EVENT_NUMBER),
            avgmu: f(AVGMU),
            seed_eta: f(SEED_ETA),
            seed_phi: f(SEED_PHI),
            seed_et: f(SEED_ET),
            cl_match: table.bind_scalar(CL_MATCH),
            cl_eta: f(CL_ETA),
            cl_phi: f(CL_PHI),
            cl_et: f(CL_ET),
            shapes: ShapeSlots {
                e1: f(CL_E1),
                e2: f(CL_E2),
                e3: f(CL_E3),
                ehad1: f(CL_EHAD1),
                ehad2: f(CL_EHAD2),
                ehad3: f(CL_EHAD3),
                etot: f(CL_ETOT),
                reta: f(CL_RETA),
                rphi: f(CL_RPHI),
                rhad: f(CL_RHAD),
                eratio: f(CL_ERATIO),
                f0: f(CL_F0),
                f1: f(CL_F1),
                f2: f(CL_F2),
                f3: f(CL_F3),
                weta2: f(CL_WETA2),
                e233: f(CL_E233),
                e237: f(CL_E237),
                e277: f(CL_E277),
                emaxs1: f(CL_EMAXS1),
                e2tsts1: f(CL_E2TSTS1),
            },
            cl_ringer_match: table.bind_scalar(CL_RINGER_MATCH),
            cl_rings: table.bind_array(CL_RINGS),
            cells: CellSlots {
                et: table.bind_array(CL_CELL_ET),
                eta: table.bind_array(CL_CELL_ETA),
                phi: table.bind_array(CL_CELL_PHI),
                deta: table.bind_array(CL_CELL_DETA),
                dphi: table.bind_array(CL_CELL_DPHI),
                energy: table.bind_array(CL_CELL_ENERGY),
                layer: table.bind_array(CL_CELL_LAYER),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calotuple_core::{FieldKind, Value};

    #[test]
    fn test_schema_layout() {
        let schema = physics_schema();
        assert_eq!(schema.len(), 39);
        assert_eq!(schema[0].name, fields::EVENT_NUMBER);
        assert_eq!(schema[0].default, Value::Int(-1));
        assert_eq!(schema.last().unwrap().name, fields::CL_CELL_LAYER);
        assert_eq!(schema.last().unwrap().kind(), FieldKind::IntArray);

        let arrays: Vec<&str> = schema
            .iter()
            .filter(|f| f.kind().is_array())
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(arrays.len(), 8);
        assert_eq!(arrays[0], fields::CL_RINGS);
    }

    #[test]
    fn test_bind_full_schema_connects_everything() {
        let table = Table::create("physics", &physics_schema()).unwrap();
        let slots = PhysicsSlots::bind(&table);
        assert!(slots.event_number.is_connected());
        assert!(slots.shapes.e2tsts1.is_connected());
        assert!(slots.cells.layer.is_connected());
    }

    #[test]
    fn test_bind_partial_schema() {
        let table = Table::create(
            "legacy",
            &[FieldDef::int(fields::EVENT_NUMBER, -1), FieldDef::float_array(fields::CL_RINGS)],
        )
        .unwrap();
        let slots = PhysicsSlots::bind(&table);
        assert!(slots.event_number.is_connected());
        assert!(slots.cl_rings.is_connected());
        assert!(!slots.seed_et.is_connected());
        assert!(!slots.cells.et.is_connected());
    }
}
