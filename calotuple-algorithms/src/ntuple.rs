//! Per-seed ntuple production.
//!
//! For every seed of an event the maker assembles one row:
//!
//! 1. reset all slots to their defaults
//! 2. copy event identity and the seed itself (ET converted to MeV)
//! 3. associate the seed with a cluster and copy its shower shapes
//! 4. look up the rings built from that cluster
//! 5. optionally copy the cluster cells into the parallel `cl_cell_*` arrays
//! 6. commit the row
//!
//! Seeds are never skipped, matched or not.

use crate::config::NtupleConfig;
use crate::matching::{has_unique_ids, match_cluster, match_rings};
use crate::physics::{physics_schema, PhysicsSlots};
use calotuple_core::{
    CaloCluster, CaloRings, Directional, Error, EventInfo, EventStore, Result, RowBuffer, Seed,
    TableStore,
};
use log::{debug, info, warn};

/// Seed ET arrives in GeV; the ntuple stores MeV.
pub const SEED_ET_SCALE: f32 = 1.0e3;

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NtupleStatistics {
    /// Events processed.
    pub events: usize,
    /// Rows committed (one per seed).
    pub rows: usize,
    /// Rows with a matched cluster.
    pub cluster_matches: usize,
    /// Rows with matched rings.
    pub ringer_matches: usize,
}

/// Association outcome of one seed.
#[derive(Debug, Clone, Copy, Default)]
struct SeedMatch {
    cluster: bool,
    rings: bool,
}

/// Builds the per-seed physics ntuple.
#[derive(Debug, Clone)]
pub struct NtupleMaker {
    config: NtupleConfig,
    slots: Option<PhysicsSlots>,
    stats: NtupleStatistics,
}

impl NtupleMaker {
    /// Creates a maker. Call [`book`](Self::book) before filling.
    #[must_use]
    pub fn new(config: NtupleConfig) -> Self {
        Self {
            config,
            slots: None,
            stats: NtupleStatistics::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &NtupleConfig {
        &self.config
    }

    #[must_use]
    pub fn statistics(&self) -> NtupleStatistics {
        self.stats
    }

    /// Validates the configuration and sets the global log cap to its message
    /// level. A logger installed afterwards replaces the cap with its own filter.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for invalid options.
    pub fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        log::set_max_level(self.config.log_level());
        Ok(())
    }

    /// Creates the output table and resolves every field handle.
    ///
    /// # Errors
    /// Returns an error if a table with the configured name already exists.
    pub fn book(&mut self, tables: &mut TableStore) -> Result<()> {
        let table = tables.create_table(&self.config.ntuple_name, &physics_schema())?;
        self.slots = Some(PhysicsSlots::bind(table));
        debug!("booked ntuple '{}'", self.config.ntuple_name);
        Ok(())
    }

    /// Writes one row per seed of `event` and returns the number of rows.
    ///
    /// A missing event info collection is fatal. Missing cluster or ring
    /// collections are reported and treated as empty. If two clusters share
    /// an id, rings are not associated for the whole event.
    ///
    /// # Errors
    /// Returns [`Error::MissingCollection`] without event info,
    /// [`Error::NotBooked`] before [`book`](Self::book), or a table error.
    pub fn fill<S: EventStore + ?Sized>(&mut self, event: &S, tables: &mut TableStore) -> Result<usize> {
        let info = event
            .event_info(&self.config.event_key)
            .ok_or_else(|| Error::MissingCollection(self.config.event_key.clone()))?;
        let slots = self
            .slots
            .ok_or_else(|| Error::NotBooked(self.config.ntuple_name.clone()))?;
        let table = tables
            .table_mut(&self.config.ntuple_name)
            .ok_or_else(|| Error::UnknownTable(self.config.ntuple_name.clone()))?;

        let clusters: &[CaloCluster] = match event.clusters(&self.config.cluster_key) {
            Some(clusters) => clusters,
            None => {
                warn!(
                    "cannot read the cluster collection '{}' from this event",
                    self.config.cluster_key
                );
                &[]
            }
        };
        let rings = match event.rings(&self.config.ringer_key) {
            Some(_) if !has_unique_ids(clusters) => {
                warn!(
                    "cluster collection '{}' repeats a cluster id; skipping rings for this event",
                    self.config.cluster_key
                );
                Some(&[][..])
            }
            rings => rings,
        };

        let mut row = table.row_buffer();
        for seed in &info.seeds {
            debug!("fill seed (eta={}, phi={}) into the ntuple", seed.eta, seed.phi);
            let outcome = self.assemble(&mut row, &slots, info, seed, clusters, rings);
            table.fill(&row)?;

            self.stats.rows += 1;
            self.stats.cluster_matches += usize::from(outcome.cluster);
            self.stats.ringer_matches += usize::from(outcome.rings);
        }
        self.stats.events += 1;
        Ok(info.seeds.len())
    }

    /// Logs the run summary.
    ///
    /// # Errors
    /// Currently infallible; kept fallible to mirror the other phases.
    pub fn finalize(&mut self) -> Result<()> {
        info!(
            "ntuple '{}': {} events, {} rows, {} cluster matches, {} ringer matches",
            self.config.ntuple_name,
            self.stats.events,
            self.stats.rows,
            self.stats.cluster_matches,
            self.stats.ringer_matches
        );
        Ok(())
    }

    fn assemble(
        &self,
        row: &mut RowBuffer,
        slots: &PhysicsSlots,
        info: &EventInfo,
        seed: &Seed,
        clusters: &[CaloCluster],
        rings: Option<&[CaloRings]>,
    ) -> SeedMatch {
        row.reset();

        row.set(slots.event_number, info.event_number);
        row.set(slots.avgmu, info.avgmu);
        row.set(slots.seed_eta, seed.eta);
        row.set(slots.seed_phi, seed.phi);
        row.set(slots.seed_et, seed.et * SEED_ET_SCALE);

        let mut outcome = SeedMatch::default();
        let Some(cluster) = match_cluster(seed.direction(), clusters, self.config.delta_r) else {
            return outcome;
        };

        debug!("dump reco cluster {:?}", cluster.id);
        outcome.cluster = true;
        write_cluster(row, slots, cluster);

        match rings {
            Some(rings) => {
                if let Some(ringer) = match_rings(cluster, rings) {
                    outcome.rings = true;
                    row.set(slots.cl_ringer_match, true);
                    row.assign(slots.cl_rings, &ringer.rings);
                }
            }
            None => warn!(
                "cannot read the ring collection '{}' from this event",
                self.config.ringer_key
            ),
        }

        if self.config.dump_cells {
            write_cells(row, slots, cluster);
        }
        outcome
    }
}

fn write_cluster(row: &mut RowBuffer, slots: &PhysicsSlots, cluster: &CaloCluster) {
    let s = &slots.shapes;
    let shapes = &cluster.shapes;

    row.set(slots.cl_match, true);
    row.set(slots.cl_eta, cluster.eta);
    row.set(slots.cl_phi, cluster.phi);
    row.set(slots.cl_et, cluster.et);
    row.set(s.e1, shapes.e1);
    row.set(s.e2, shapes.e2);
    row.set(s.e3, shapes.e3);
    row.set(s.ehad1, shapes.ehad1);
    row.set(s.ehad2, shapes.ehad2);
    row.set(s.ehad3, shapes.ehad3);
    row.set(s.etot, shapes.etot);
    row.set(s.reta, shapes.reta);
    row.set(s.rphi, shapes.rphi);
    row.set(s.rhad, shapes.rhad);
    row.set(s.eratio, shapes.eratio);
    row.set(s.f0, shapes.f0);
    row.set(s.f1, shapes.f1);
    row.set(s.f2, shapes.f2);
    row.set(s.f3, shapes.f3);
    row.set(s.weta2, shapes.weta2);
    row.set(s.e233, shapes.e233);
    row.set(s.e237, shapes.e237);
    row.set(s.e277, shapes.e277);
    row.set(s.emaxs1, shapes.emaxs1);
    row.set(s.e2tsts1, shapes.e2tsts1);
}

// All seven arrays grow together: index i refers to the same cell everywhere.
fn write_cells(row: &mut RowBuffer, slots: &PhysicsSlots, cluster: &CaloCluster) {
    let c = &slots.cells;
    for cell in &cluster.cells {
        row.push(c.et, cell.et);
        row.push(c.eta, cell.eta);
        row.push(c.phi, cell.phi);
        row.push(c.deta, cell.delta_eta);
        row.push(c.dphi, cell.delta_phi);
        row.push(c.energy, cell.energy);
        row.push(c.layer, cell.layer);
    }
}
