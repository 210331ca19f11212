//! Backend-independent column bookkeeping, shared by every `MasterInterface`
//! implementation. Mirrors the accumulator/cache split used by the original
//! master base class: a column under construction accumulates cost trip by
//! trip; once committed it moves into the permanent per-column cache.

use crate::error::{Result, SolverError};
use crate::instance::Instance;
use std::io::{BufRead, Write};
use std::path::Path;

/// A column under construction. `depot` and the running `cost` are fixed by
/// the first call to `add_trip` (which charges the depot's source arc);
/// every later trip charges a deadhead arc instead.
struct PendingColumn {
    depot: usize,
    trips: Vec<usize>,
    cost: i64,
}

/// Column cache plus in-progress accumulator. Does not itself talk to any LP
/// solver -- `MasterInterface` implementations own one of these and consult
/// it when (re)building their LP model.
pub struct MasterCore {
    depot: Vec<usize>,
    trips: Vec<Vec<usize>>,
    cost: Vec<i64>,
    lb: Vec<f64>,
    value: Vec<f64>,
    pending: Option<PendingColumn>,
}

impl MasterCore {
    pub fn new() -> Self {
        MasterCore {
            depot: Vec::new(),
            trips: Vec::new(),
            cost: Vec::new(),
            lb: Vec::new(),
            value: Vec::new(),
            pending: None,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.depot.len()
    }

    pub fn column_depot(&self, c: usize) -> usize {
        self.depot[c]
    }

    pub fn column_trips(&self, c: usize) -> &[usize] {
        &self.trips[c]
    }

    pub fn column_cost(&self, c: usize) -> i64 {
        self.cost[c]
    }

    pub fn get_lb(&self, c: usize) -> f64 {
        self.lb[c]
    }

    pub fn set_lb(&mut self, c: usize, bound: f64) {
        self.lb[c] = bound;
    }

    pub fn get_value(&self, c: usize) -> f64 {
        self.value[c]
    }

    /// Called by the backend after each solve, to cache the primal values it
    /// read off the LP so `get_value` stays cheap between solves.
    pub fn set_value(&mut self, c: usize, value: f64) {
        self.value[c] = value;
    }

    pub fn begin_column(&mut self, depot: usize) {
        debug_assert!(self.pending.is_none(), "begin_column called before previous commit");
        self.pending = Some(PendingColumn {
            depot,
            trips: Vec::new(),
            cost: 0,
        });
    }

    /// Charges the depot's source arc on the first trip added, a deadhead arc
    /// from the previous trip on every later one.
    pub fn add_trip(&mut self, inst: &Instance, trip: usize) -> Result<()> {
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| SolverError::Data("add_trip called with no column in progress".into()))?;

        let delta = if let Some(&last) = pending.trips.last() {
            inst.deadhead_cost(last, trip)
                .ok_or_else(|| SolverError::Data(format!("no deadhead arc {last}->{trip}")))?
        } else {
            inst.source_cost(pending.depot, trip)
                .ok_or_else(|| SolverError::Data(format!("no source arc for depot {} -> trip {trip}", pending.depot)))?
        };

        pending.cost += delta;
        pending.trips.push(trip);
        Ok(())
    }

    /// Adds the sink arc from the last trip and moves the column into the
    /// permanent cache, returning its index.
    pub fn commit_column(&mut self, inst: &Instance) -> Result<usize> {
        let mut pending = self
            .pending
            .take()
            .ok_or_else(|| SolverError::Data("commit_column called with no column in progress".into()))?;

        let &last = pending
            .trips
            .last()
            .ok_or_else(|| SolverError::Data("commit_column called with an empty column".into()))?;
        let sink = inst
            .sink_cost(pending.depot, last)
            .ok_or_else(|| SolverError::Data(format!("no sink arc for trip {last} -> depot {}", pending.depot)))?;
        pending.cost += sink;

        let idx = self.depot.len();
        self.depot.push(pending.depot);
        self.trips.push(pending.trips);
        self.cost.push(pending.cost);
        self.lb.push(0.0);
        self.value.push(0.0);
        Ok(idx)
    }

    /// Writes the column export format: a column count, then one
    /// `depot trip_count trip...` line per column.
    pub fn export_columns(&self, mut writer: impl Write) -> Result<()> {
        writeln!(writer, "{}", self.num_columns())?;
        for c in 0..self.num_columns() {
            write!(writer, "{} {}", self.depot[c], self.trips[c].len())?;
            for &t in &self.trips[c] {
                write!(writer, " {t}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Reads the same format back, appending to the existing cache (import
    /// never resets what's already there -- see DESIGN.md). Returns the
    /// number of columns added; costs are recomputed from `inst`, not trusted
    /// from the file.
    pub fn import_columns(&mut self, inst: &Instance, reader: impl BufRead) -> Result<usize> {
        let mut lines = reader.lines();
        let header = lines
            .next()
            .ok_or_else(|| SolverError::Data("empty column file".into()))??;
        let n: usize = header
            .trim()
            .parse()
            .map_err(|e| SolverError::Data(format!("invalid column count: {e}")))?;

        for idx in 0..n {
            let line = lines
                .next()
                .ok_or_else(|| SolverError::Data(format!("missing column {idx} in column file")))??;
            let mut tok = line.split_whitespace();
            let depot: usize = tok
                .next()
                .ok_or_else(|| SolverError::Data(format!("column {idx}: missing depot")))?
                .parse()
                .map_err(|e| SolverError::Data(format!("column {idx}: invalid depot: {e}")))?;
            let count: usize = tok
                .next()
                .ok_or_else(|| SolverError::Data(format!("column {idx}: missing trip count")))?
                .parse()
                .map_err(|e| SolverError::Data(format!("column {idx}: invalid trip count: {e}")))?;
            let trips: Vec<usize> = tok
                .map(|s| s.parse::<usize>().map_err(|e| SolverError::Data(format!("column {idx}: invalid trip: {e}"))))
                .collect::<Result<_>>()?;
            if trips.len() != count {
                return Err(SolverError::Data(format!(
                    "column {idx}: declared {count} trips, found {}",
                    trips.len()
                )));
            }

            self.begin_column(depot);
            for &t in &trips {
                self.add_trip(inst, t)?;
            }
            self.commit_column(inst)?;
        }
        Ok(n)
    }

    pub fn export_to_path(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.export_columns(std::io::BufWriter::new(file))
    }

    pub fn import_from_path(&mut self, inst: &Instance, path: &Path) -> Result<usize> {
        let file = std::fs::File::open(path)?;
        self.import_columns(inst, std::io::BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst() -> Instance {
        // K=1, T=2: depot->trip0=3, trip0->trip1=1, trip1->depot=2
        Instance::new(
            1,
            2,
            vec![5],
            vec![
                -1, 3, -1, //
                -1, -1, 1, //
                2, -1, -1, //
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn commit_accumulates_source_deadhead_sink() {
        let inst = inst();
        let mut core = MasterCore::new();
        core.begin_column(0);
        core.add_trip(&inst, 0).unwrap();
        core.add_trip(&inst, 1).unwrap();
        let idx = core.commit_column(&inst).unwrap();
        assert_eq!(core.column_cost(idx), 3 + 1 + 2);
        assert_eq!(core.column_trips(idx), &[0, 1]);
        assert_eq!(core.column_depot(idx), 0);
    }

    #[test]
    fn commit_without_trip_errors() {
        let inst = inst();
        let mut core = MasterCore::new();
        core.begin_column(0);
        assert!(core.commit_column(&inst).is_err());
    }

    #[test]
    fn add_trip_without_begin_errors() {
        let inst = inst();
        let mut core = MasterCore::new();
        assert!(core.add_trip(&inst, 0).is_err());
    }

    #[test]
    fn export_then_import_round_trips() {
        let inst = inst();
        let mut core = MasterCore::new();
        core.begin_column(0);
        core.add_trip(&inst, 0).unwrap();
        core.commit_column(&inst).unwrap();

        let mut buf = Vec::new();
        core.export_columns(&mut buf).unwrap();

        let mut imported = MasterCore::new();
        let added = imported.import_columns(&inst, buf.as_slice()).unwrap();
        assert_eq!(added, 1);
        assert_eq!(imported.column_trips(0), &[0]);
        assert_eq!(imported.column_cost(0), core.column_cost(0));
    }

    #[test]
    fn import_appends_to_existing_columns() {
        let inst = inst();
        let mut core = MasterCore::new();
        core.begin_column(0);
        core.add_trip(&inst, 0).unwrap();
        core.commit_column(&inst).unwrap();

        let text = "1\n0 1 1\n";
        let added = core.import_columns(&inst, text.as_bytes()).unwrap();
        assert_eq!(added, 1);
        assert_eq!(core.num_columns(), 2);
    }
}
