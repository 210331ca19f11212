//! Per-depot pricing subproblems: given a dual snapshot, find a
//! negative-reduced-cost depot-to-depot path through the trip DAG.
//!
//! Implementations never touch the master directly: `solve` takes a
//! `DualSnapshot` by reference and `generate_columns` returns data for the
//! driving thread to install afterwards, sequentially, in depot order.

pub mod bellman_ford;
pub mod mip;
pub mod spfa;

use crate::error::Result;
use crate::instance::Instance;
use crate::master::{ColumnCandidate, DualSnapshot};
use std::sync::Arc;

/// Negative reduced cost threshold below which a path is worth turning into
/// a column. Matches the `-0.001` cutoff used throughout pricing.
pub const NEGATIVE_REDUCED_COST_THRESHOLD: f64 = -1e-3;

pub trait PricingInterface {
    fn depot_id(&self) -> usize;
    fn solver_name(&self) -> &'static str;
    fn is_exact(&self) -> bool;

    /// Caps the number of successor arcs relaxed per popped node (source and
    /// sink arcs are always evaluated in full). A value `<= 0` means
    /// unlimited.
    fn set_max_label_expansions_per_node(&mut self, max_expansions: i64);

    /// Whether this pricer's backend is unsafe to run concurrently with its
    /// siblings. This is a backend-specific contract, not an algorithm
    /// policy: `MipPricing` overrides this to `true` -- nothing guarantees
    /// SCIP tolerates constructing independent models from multiple threads
    /// at once, so the driver must fall back to serial fan-out.
    fn requires_serial_execution(&self) -> bool {
        false
    }

    /// Runs the shortest-path computation against the given duals and
    /// returns the best depot-to-depot reduced cost found (`f64::INFINITY`
    /// if no path exists).
    fn solve(&mut self, duals: &DualSnapshot) -> Result<f64>;

    fn obj_value(&self) -> f64;

    /// Extracts one or more negative-reduced-cost paths from the last
    /// `solve` into column candidates, without installing them anywhere.
    fn generate_columns(&self, duals: &DualSnapshot) -> Vec<ColumnCandidate>;
}

/// Selects which concrete `PricingInterface` implementation backs each
/// depot, chosen by the `--pricing` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingAlgo {
    Spfa,
    Bellman,
    Mip,
}

/// Builds one pricing subproblem per depot, all using the same algorithm.
/// `single_path` mirrors `--max-paths 1` for the shortest-path pricers;
/// `max_paths` is passed through verbatim to `PricingMip`.
pub fn build_pricings(
    inst: &Arc<Instance>,
    algo: PricingAlgo,
    single_path: bool,
    max_paths: i64,
) -> Vec<Box<dyn PricingInterface + Send>> {
    (0..inst.num_depots())
        .map(|k| -> Box<dyn PricingInterface + Send> {
            match algo {
                PricingAlgo::Spfa => Box::new(spfa::SpfaPricing::new(inst.clone(), k, single_path)),
                PricingAlgo::Bellman => Box::new(bellman_ford::BellmanFordPricing::new(inst.clone(), k, single_path)),
                PricingAlgo::Mip => Box::new(mip::MipPricing::new(inst.clone(), k, max_paths)),
            }
        })
        .collect()
}
