//! Truncated column generation: the primal heuristic that follows plain
//! column generation to convergence. Alternates bounded inner CG rounds with
//! fixing one fractional column's lower bound to 1 at a time, until every
//! trip is covered or no fixable candidate remains.

use crate::cg::{fan_out_pricing, PRICING_NEGATIVE_THRESHOLD};
use crate::error::{Result, SolverError};
use crate::master::{MasterInterface, SimplexAlgo};
use crate::pricing::PricingInterface;
use crate::sigint;
use rand::Rng;

/// Dummy columns cost `1e7` each; an inner CG round can stop early once
/// the RRMP objective drops below this, since it means no dummy remains in
/// the optimal basis.
const DUMMY_COST_THRESHOLD: f64 = 1.0e7;

/// A primal value above this "fractional-nonzero" floor counts as
/// assigned when collecting TCG candidates.
const FRACTIONAL_NONZERO: f64 = 1e-6;

/// A column's lower bound below this is still free (not yet fixed to 1).
const UNFIXED_LB: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarSelStrategy {
    Simple,
    Grasp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraspStrategy {
    Direct,
    Eval,
}

#[derive(Debug, Clone, Copy)]
pub struct TcgConfig {
    pub max_sub_iter: usize,
    pub var_sel: VarSelStrategy,
    pub grasp_strategy: GraspStrategy,
    pub grasp_alpha: f64,
    /// Threshold for the `Eval` short-circuit: a tunable, not a constant.
    /// Defaults to `0.2`.
    pub eval_short_circuit: f64,
}

impl Default for TcgConfig {
    fn default() -> Self {
        TcgConfig {
            max_sub_iter: 20,
            var_sel: VarSelStrategy::Simple,
            grasp_strategy: GraspStrategy::Direct,
            grasp_alpha: 0.2,
            eval_short_circuit: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    column: usize,
    value: f64,
    trips: Vec<usize>,
    direct_cost: f64,
}

#[derive(Debug, Clone)]
pub struct TcgReport {
    pub outer_iterations: usize,
    pub all_covered: bool,
    pub interrupted: bool,
}

/// Runs TCG to completion against the same `master`/`pricings` instances
/// `CgEngine` used.
pub fn run(
    master: &mut dyn MasterInterface,
    pricings: &mut [Box<dyn PricingInterface + Send>],
    num_trips: usize,
    num_depots: usize,
    cfg: TcgConfig,
    rng: &mut impl Rng,
) -> Result<TcgReport> {
    let mut trip_covered = vec![false; num_trips];
    let mut covered_count = 0usize;
    let mut outer_iterations = 0usize;
    let mut interrupted = false;

    while covered_count < num_trips {
        if sigint::is_set() {
            interrupted = true;
            break;
        }

        inner_cg_round(master, pricings, num_trips, num_depots, cfg.max_sub_iter)?;

        let candidates = collect_candidates(master, &trip_covered);
        if candidates.is_empty() {
            break;
        }

        let chosen = select(master, &candidates, cfg, rng)?;

        for &t in &chosen.trips {
            if trip_covered[t] {
                return Err(SolverError::Data(format!(
                    "trip {t} was already covered when fixing column {} -- isFixFeasible was violated",
                    chosen.column
                )));
            }
        }

        master.set_lb(chosen.column, 1.0);
        for &t in &chosen.trips {
            trip_covered[t] = true;
            covered_count += 1;
        }
        outer_iterations += 1;
    }

    Ok(TcgReport {
        outer_iterations,
        all_covered: covered_count == num_trips,
        interrupted,
    })
}

/// One bounded inner CG round: up to `max_sub_iter` plain CG iterations (no
/// `R`/`E` phase switching -- TCG always runs in whatever sense the master
/// was left in by the outer column-generation loop), stopping early once the
/// RRMP objective drops below the dummy-column cost or no
/// negative-reduced-cost column remains.
fn inner_cg_round(
    master: &mut dyn MasterInterface,
    pricings: &mut [Box<dyn PricingInterface + Send>],
    num_trips: usize,
    num_depots: usize,
    max_sub_iter: usize,
) -> Result<f64> {
    let mut rmp_obj = master.obj_value();

    for _ in 0..max_sub_iter {
        rmp_obj = master.solve(SimplexAlgo::Primal)?;
        if rmp_obj < DUMMY_COST_THRESHOLD {
            break;
        }

        let duals = master.dual_snapshot(num_trips, num_depots);
        fan_out_pricing(pricings, &duals)?;

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

        if new_cols == 0 {
            break;
        }
    }

    Ok(rmp_obj)
}

/// Candidate columns for fixing: non-dummy columns with a free lower bound,
/// a non-trivial primal value, and no trip already covered by a fixed
/// column.
fn collect_candidates(master: &dyn MasterInterface, trip_covered: &[bool]) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for c in 0..master.num_columns() {
        if master.get_lb(c) >= UNFIXED_LB {
            continue;
        }
        let value = master.get_value(c);
        if value <= FRACTIONAL_NONZERO {
            continue;
        }
        let trips = master.column_path(c).to_vec();
        if trips.iter().any(|&t| trip_covered[t]) {
            continue;
        }
        candidates.push(Candidate {
            column: c,
            value,
            trips,
            direct_cost: master.column_cost(c),
        });
    }
    candidates
}

fn select<'c>(
    master: &mut dyn MasterInterface,
    candidates: &'c [Candidate],
    cfg: TcgConfig,
    rng: &mut impl Rng,
) -> Result<&'c Candidate> {
    match cfg.var_sel {
        VarSelStrategy::Simple => Ok(candidates
            .iter()
            .max_by(|a, b| a.value.partial_cmp(&b.value).expect("primal values are never NaN"))
            .expect("candidates is non-empty")),
        VarSelStrategy::Grasp => select_grasp(master, candidates, cfg, rng),
    }
}

/// GRASP selection: order candidates by ascending cost (`Direct`: the
/// column's objective coefficient; `Eval`: the RRMP objective after
/// provisionally fixing that column's lower bound to 1), build a restricted
/// candidate list of the cheapest `max(1, floor(n*alpha))` entries, then pick
/// uniformly at random from it.
fn select_grasp<'c>(
    master: &mut dyn MasterInterface,
    candidates: &'c [Candidate],
    cfg: TcgConfig,
    rng: &mut impl Rng,
) -> Result<&'c Candidate> {
    let mut costed: Vec<(usize, f64)> = Vec::with_capacity(candidates.len());

    match cfg.grasp_strategy {
        GraspStrategy::Direct => {
            for (i, c) in candidates.iter().enumerate() {
                costed.push((i, c.direct_cost));
            }
        }
        GraspStrategy::Eval => {
            let mut probed_any = false;
            for (i, c) in candidates.iter().enumerate() {
                if !probed_any || c.value > cfg.eval_short_circuit {
                    let orig_lb = master.get_lb(c.column);
                    master.set_lb(c.column, 1.0);
                    let obj = master.solve(SimplexAlgo::Primal)?;
                    master.set_lb(c.column, orig_lb);
                    costed.push((i, obj));
                    probed_any = true;
                } else {
                    costed.push((i, c.direct_cost));
                }
            }
        }
    }

    costed.sort_by(|a, b| a.1.partial_cmp(&b.1).expect("costs are never NaN"));

    let rcl_size = ((costed.len() as f64) * cfg.grasp_alpha).floor() as usize;
    let rcl_size = rcl_size.max(1).min(costed.len());
    let pick = rng.gen_range(0..rcl_size);
    Ok(&candidates[costed[pick].0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Instance;
    use crate::master::scip_backend::ScipMaster;
    use crate::pricing::spfa::SpfaPricing;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn pricings(inst: &Arc<Instance>) -> Vec<Box<dyn PricingInterface + Send>> {
        (0..inst.num_depots())
            .map(|k| Box::new(SpfaPricing::new(inst.clone(), k, false)) as Box<dyn PricingInterface + Send>)
            .collect()
    }

    #[test]
    fn simple_selection_covers_all_trips_on_a_disconnected_instance() {
        // K=2, T=2, cap=[1,1]: depot0<->trip0 (3,4), depot1<->trip1 (2,5), no deadheads.
        let inst = Arc::new(
            Instance::new(
                2,
                2,
                vec![1, 1],
                vec![
                    -1, -1, 3, -1, //
                    -1, -1, -1, 2, //
                    4, -1, -1, -1, //
                    -1, 5, -1, -1, //
                ],
                false,
            )
            .unwrap(),
        );
        let mut master = ScipMaster::new(&inst);
        let mut ps = pricings(&inst);
        crate::cg::run(&mut master, &mut ps, inst.num_trips(), inst.num_depots()).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let cfg = TcgConfig::default();
        let report = run(&mut master, &mut ps, inst.num_trips(), inst.num_depots(), cfg, &mut rng).unwrap();

        assert!(report.all_covered);
        assert!(!report.interrupted);
    }

    #[test]
    fn grasp_alpha_zero_is_deterministic_minimum_cost() {
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
        crate::cg::run(&mut master, &mut ps, inst.num_trips(), inst.num_depots()).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let cfg = TcgConfig {
            var_sel: VarSelStrategy::Grasp,
            grasp_strategy: GraspStrategy::Direct,
            grasp_alpha: 0.0,
            ..TcgConfig::default()
        };
        let report = run(&mut master, &mut ps, inst.num_trips(), inst.num_depots(), cfg, &mut rng).unwrap();
        assert!(report.all_covered);
    }
}
