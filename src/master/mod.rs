//! The restricted relaxed master problem contract: column construction,
//! duals, bound/integrality switches, export/import. `scip_backend` is the
//! one concrete LP engine implementing it; `core` is the backend-independent
//! bookkeeping every implementation shares.

pub mod core;
pub mod scip_backend;

use crate::error::Result;

/// Hint passed to `MasterInterface::solve`. Dual simplex is preferred on the
/// very first solve (nothing basic yet); primal simplex afterwards, since
/// column insertion keeps the previous basis close to feasible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplexAlgo {
    Dual,
    Primal,
}

/// Sense of the `T` trip-assignment rows. `AtLeast` (`>= 1`) is the
/// set-cover relaxation used in phase R; `Equal` (`= 1`) is the
/// set-partition form used in phase E.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSense {
    AtLeast,
    Equal,
}

/// A read-only snapshot of the master's dual prices, taken once before a
/// pricing fan-out begins. Pricing workers never read duals from the master
/// directly -- they only ever see this snapshot, which keeps the fan-out
/// free of shared mutable state.
#[derive(Debug, Clone)]
pub struct DualSnapshot {
    trip: Vec<f64>,
    depot: Vec<f64>,
}

impl DualSnapshot {
    pub fn new(trip: Vec<f64>, depot: Vec<f64>) -> Self {
        DualSnapshot { trip, depot }
    }

    pub fn trip_dual(&self, i: usize) -> f64 {
        self.trip[i]
    }

    pub fn depot_cap_dual(&self, k: usize) -> f64 {
        self.depot[k]
    }
}

/// A committed candidate column, as produced by a pricing subproblem. Not
/// yet installed in the master -- the column-generation and truncated
/// column-generation loops install candidates sequentially, in depot order,
/// through the column-construction protocol below; column insertion is
/// never concurrent.
#[derive(Debug, Clone)]
pub struct ColumnCandidate {
    pub depot: usize,
    pub trips: Vec<usize>,
}

/// The restricted relaxed master problem contract. Column construction must
/// be called in order: `begin_column`, one or more `add_trip`, then
/// `commit_column`.
pub trait MasterInterface {
    fn solve(&mut self, algo: SimplexAlgo) -> Result<f64>;
    fn obj_value(&self) -> f64;
    fn trip_dual(&self, i: usize) -> f64;
    fn depot_cap_dual(&self, k: usize) -> f64;

    /// Snapshots every trip/depot dual at once, for handoff to a pricing
    /// fan-out. Must be called only right after `solve` and before any
    /// column is added.
    fn dual_snapshot(&self, num_trips: usize, num_depots: usize) -> DualSnapshot {
        DualSnapshot::new(
            (0..num_trips).map(|i| self.trip_dual(i)).collect(),
            (0..num_depots).map(|k| self.depot_cap_dual(k)).collect(),
        )
    }

    fn begin_column(&mut self, depot: usize);
    fn add_trip(&mut self, trip: usize) -> Result<()>;
    fn commit_column(&mut self) -> Result<()>;

    fn num_columns(&self) -> usize;
    fn column_depot(&self, c: usize) -> usize;
    fn column_path(&self, c: usize) -> &[usize];
    /// The column's objective coefficient -- the accumulated source +
    /// deadhead + sink cost charged at `commit_column` time.
    fn column_cost(&self, c: usize) -> f64;
    fn trips_covered(&self, c: usize) -> &[usize] {
        self.column_path(c)
    }

    fn get_value(&self, c: usize) -> f64;
    fn get_lb(&self, c: usize) -> f64;
    fn set_lb(&mut self, c: usize, bound: f64);

    fn convert_to_binary(&mut self);
    fn convert_to_relaxed(&mut self);

    fn set_assignment_type(&mut self, sense: AssignmentSense);

    fn export_columns(&self, path: &std::path::Path) -> Result<()>;
    /// Adds the columns found in `path` to the existing set (append, never
    /// reset -- see DESIGN.md Open Question (i)).
    fn import_columns(&mut self, path: &std::path::Path) -> Result<usize>;
}
