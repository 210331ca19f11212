//! Column-generation loop: drives the master through phases `R`
//! (relaxed, assignment `>= 1`) then `E` (equality, assignment `= 1`),
//! fanning pricing out across depots between master solves.

use crate::master::{AssignmentSense, DualSnapshot, MasterInterface, SimplexAlgo};
use crate::pricing::PricingInterface;
use crate::sigint;
use rayon::prelude::*;
use tracing::info;

/// A pricing objective at or below this is worth turning into columns.
/// Looser than the `-1e-3` per-path threshold pricing implementations use
/// internally, since this one gates whether the outer loop bothers installing
/// anything at all.
pub const PRICING_NEGATIVE_THRESHOLD: f64 = -1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Relaxed,
    Equality,
}

impl Phase {
    fn assignment_sense(self) -> AssignmentSense {
        match self {
            Phase::Relaxed => AssignmentSense::AtLeast,
            Phase::Equality => AssignmentSense::Equal,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Phase::Relaxed => "R",
            Phase::Equality => "E",
        }
    }
}

/// Outcome of one `CgEngine::run`: the phase the loop ended in, how many
/// outer iterations it took, the final RRMP objective and whether the run
/// was cut short by SIGINT.
#[derive(Debug, Clone, Copy)]
pub struct CgReport {
    pub final_phase: Phase,
    pub iterations: usize,
    pub final_obj: f64,
    pub interrupted: bool,
}

/// Runs the CG loop to convergence (or interruption) against `master` and
/// the per-depot `pricings`. Pricing is fanned out with rayon: each worker
/// only ever touches its own pricing state, reading a single `DualSnapshot`
/// taken right after the master solve. Column installation happens
/// afterwards, sequentially, in depot order, so the column index space stays
/// deterministic regardless of fan-out scheduling.
pub fn run(
    master: &mut dyn MasterInterface,
    pricings: &mut [Box<dyn PricingInterface + Send>],
    num_trips: usize,
    num_depots: usize,
) -> crate::error::Result<CgReport> {
    let mut phase = Phase::Relaxed;
    master.set_assignment_type(phase.assignment_sense());

    let mut iteration = 0usize;
    let mut interrupted = false;
    let mut rmp_obj;

    loop {
        let algo = if iteration == 0 { SimplexAlgo::Dual } else { SimplexAlgo::Primal };
        rmp_obj = master.solve(algo)?;

        let duals = master.dual_snapshot(num_trips, num_depots);
        fan_out_pricing(pricings, &duals)?;

        let pricing_sum: f64 = pricings.iter().map(|p| p.obj_value()).sum();
        let lb = rmp_obj + pricing_sum;

        let mut new_cols = 0usize;
        for pricing in pricings.iter() {
            if pricing.obj_value() < PRICING_NEGATIVE_THRESHOLD {
                let candidates = pricing.generate_columns(&duals);
                new_cols += candidates.len();
                for candidate in candidates {
                    master.begin_column(candidate.depot);
                    for trip in candidate.trips {
                        master.add_trip(trip)?;
                    }
                    master.commit_column()?;
                }
            }
        }

        info!(
            phase = phase.label(),
            iteration, rmp_obj, lb, new_cols, "column generation iteration"
        );

        if new_cols == 0 {
            match phase {
                Phase::Relaxed => {
                    phase = Phase::Equality;
                    master.set_assignment_type(phase.assignment_sense());
                }
                Phase::Equality => break,
            }
        }

        if sigint::is_set() {
            match phase {
                Phase::Relaxed => {
                    phase = Phase::Equality;
                    master.set_assignment_type(phase.assignment_sense());
                    sigint::clear();
                }
                Phase::Equality => {
                    interrupted = true;
                    break;
                }
            }
        }

        iteration += 1;
    }

    rmp_obj = master.solve(SimplexAlgo::Primal)?;

    Ok(CgReport {
        final_phase: phase,
        iterations: iteration,
        final_obj: rmp_obj,
        interrupted,
    })
}

/// Runs every depot's pricing `solve` against the same dual snapshot. Uses
/// rayon's data-parallel fan-out (snapshot the duals once, fan out, merge the
/// results back sequentially) unless any pricer's backend demands serial
/// execution, in which case it falls back to a plain sequential loop.
pub(crate) fn fan_out_pricing(
    pricings: &mut [Box<dyn PricingInterface + Send>],
    duals: &DualSnapshot,
) -> crate::error::Result<()> {
    if pricings.iter().any(|p| p.requires_serial_execution()) {
        for p in pricings.iter_mut() {
            p.solve(duals)?;
        }
        Ok(())
    } else {
        pricings.par_iter_mut().try_for_each(|p| p.solve(duals).map(|_| ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Instance;
    use crate::master::scip_backend::ScipMaster;
    use crate::pricing::spfa::SpfaPricing;
    use std::sync::Arc;

    fn pricings(inst: &Arc<Instance>) -> Vec<Box<dyn PricingInterface + Send>> {
        (0..inst.num_depots())
            .map(|k| Box::new(SpfaPricing::new(inst.clone(), k, false)) as Box<dyn PricingInterface + Send>)
            .collect()
    }

    #[test]
    fn trivial_one_depot_one_trip_converges_to_twelve() {
        // K=1, T=1, cap=[1], source(0,0)=5, sink(0,0)=7 -> optimum 12.
        let inst = Arc::new(Instance::new(1, 1, vec![1], vec![-1, 5, 7, -1], false).unwrap());
        let mut master = ScipMaster::new(&inst);
        let mut ps = pricings(&inst);

        let report = run(&mut master, &mut ps, inst.num_trips(), inst.num_depots()).unwrap();

        assert_eq!(report.final_phase, Phase::Equality);
        assert!(!report.interrupted);
        assert!((report.final_obj - 12.0).abs() < 1e-6);
        assert_eq!(master.num_columns(), 1);
        assert_eq!(master.column_path(0), &[0]);
    }

    #[test]
    fn deadhead_chaining_beats_two_separate_columns() {
        // K=1, T=2, cap=[2]: chaining 0->1 into one column (cost 3) beats
        // two separate columns (cost 4).
        let inst = Arc::new(
            Instance::new(
                1,
                2,
                vec![2],
                vec![
                    -1, 1, 1, //
                    1, -1, 1, //
                    1, 1, -1, //
                ],
                false,
            )
            .unwrap(),
        );
        let mut master = ScipMaster::new(&inst);
        let mut ps = pricings(&inst);

        let report = run(&mut master, &mut ps, inst.num_trips(), inst.num_depots()).unwrap();
        assert!((report.final_obj - 3.0).abs() < 1e-6);
    }

    #[test]
    fn capacity_binding_keeps_dummies_in_the_basis() {
        // K=1, T=3, cap=[1]: only one vehicle for three trips, so the
        // relaxation cannot drive the dummy columns out.
        let inst = Arc::new(
            Instance::new(
                1,
                3,
                vec![1],
                vec![
                    -1, 1, 1, 1, //
                    1, -1, -1, -1, //
                    1, -1, -1, -1, //
                    1, -1, -1, -1, //
                ],
                false,
            )
            .unwrap(),
        );
        let mut master = ScipMaster::new(&inst);
        let mut ps = pricings(&inst);

        let report = run(&mut master, &mut ps, inst.num_trips(), inst.num_depots()).unwrap();
        assert!(report.final_obj > 2.0e7);
    }
}
