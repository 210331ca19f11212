//! `MasterInterface` implementation on top of the `russcip` SCIP binding.
//!
//! `russcip`'s `Model` is a typestate (`Unsolved` -> `ProblemCreated` ->
//! `Solved`) consumed by value at each transition, so there is no published
//! way to mutate an already-solved model in place. Rather than fight that,
//! `ScipMaster` rebuilds a fresh LP relaxation from `MasterCore`'s column
//! cache on every `solve()` call. While columns are continuous, SCIP's root
//! LP relaxation is the RRMP optimum we want, so the node limit is capped at
//! the root to keep this backend honest about never doing any
//! branch-and-bound search during column generation. Once
//! `convert_to_binary` switches the columns to binary for the finalize
//! solve, that cap is lifted: SCIP needs to branch to resolve fractional
//! columns, and a node-limited binary solve would come back infeasible or
//! suboptimal for no good reason.

use crate::error::{Result, SolverError};
use crate::instance::Instance;
use crate::master::core::MasterCore;
use crate::master::{AssignmentSense, MasterInterface, SimplexAlgo};
use russcip::prelude::*;
use russcip::{Constraint, Model, ObjSense, ProblemCreated, Solved, Status, Variable, VarType};
use std::rc::Rc;

/// Cost charged to a dummy column covering one trip. High enough that any
/// real column with a finite path is preferred once one exists.
const DUMMY_COST: f64 = 1.0e7;

pub struct ScipMaster<'a> {
    inst: &'a Instance,
    core: MasterCore,
    sense: AssignmentSense,
    binary: bool,
    obj_value: f64,
    trip_duals: Vec<f64>,
    depot_duals: Vec<f64>,
}

impl<'a> ScipMaster<'a> {
    pub fn new(inst: &'a Instance) -> Self {
        ScipMaster {
            inst,
            core: MasterCore::new(),
            sense: AssignmentSense::AtLeast,
            binary: false,
            obj_value: 0.0,
            trip_duals: vec![0.0; inst.num_trips()],
            depot_duals: vec![0.0; inst.num_depots()],
        }
    }

    fn column_var_type(&self) -> VarType {
        if self.binary {
            VarType::Binary
        } else {
            VarType::Continuous
        }
    }

    fn build_model(&self) -> (Model<ProblemCreated>, Vec<Rc<Constraint>>, Vec<Rc<Constraint>>) {
        let mut model = Model::new()
            .include_default_plugins()
            .create_prob("mdvsp-rrmp")
            .set_obj_sense(ObjSense::Minimize)
            .hide_output();
        if !self.binary {
            let _ = model.set_longint_param("limits/nodes", 1);
        }

        let num_trips = self.inst.num_trips();
        let num_depots = self.inst.num_depots();

        let mut col_vars: Vec<Rc<Variable>> = Vec::with_capacity(self.core.num_columns());
        for c in 0..self.core.num_columns() {
            let lb = self.core.get_lb(c);
            let ub = if self.binary { 1.0 } else { f64::INFINITY };
            let var = model.add_var(
                lb,
                ub,
                self.core.column_cost(c) as f64,
                &format!("col_{c}"),
                self.column_var_type(),
            );
            col_vars.push(var);
        }

        let mut dummy_vars: Vec<Rc<Variable>> = Vec::with_capacity(num_trips);
        for i in 0..num_trips {
            let var = model.add_var(0.0, f64::INFINITY, DUMMY_COST, &format!("dummy_{i}"), VarType::Continuous);
            dummy_vars.push(var);
        }

        let mut trip_cols: Vec<Vec<usize>> = vec![Vec::new(); num_trips];
        for c in 0..self.core.num_columns() {
            for &t in self.core.column_trips(c) {
                trip_cols[t].push(c);
            }
        }

        let mut trip_cons = Vec::with_capacity(num_trips);
        for i in 0..num_trips {
            let mut vars = Vec::with_capacity(trip_cols[i].len() + 1);
            let mut coefs = Vec::with_capacity(trip_cols[i].len() + 1);
            for &c in &trip_cols[i] {
                vars.push(col_vars[c].clone());
                coefs.push(1.0);
            }
            vars.push(dummy_vars[i].clone());
            coefs.push(1.0);

            let (lhs, rhs) = match self.sense {
                AssignmentSense::AtLeast => (1.0, f64::INFINITY),
                AssignmentSense::Equal => (1.0, 1.0),
            };
            trip_cons.push(model.add_cons(vars, &coefs, lhs, rhs, &format!("trip_{i}")));
        }

        let mut depot_cons = Vec::with_capacity(num_depots);
        for k in 0..num_depots {
            let mut vars = Vec::new();
            let mut coefs = Vec::new();
            for c in 0..self.core.num_columns() {
                if self.core.column_depot(c) == k {
                    vars.push(col_vars[c].clone());
                    coefs.push(1.0);
                }
            }
            let cap = self.inst.depot_capacity(k) as f64;
            depot_cons.push(model.add_cons(vars, &coefs, f64::NEG_INFINITY, cap, &format!("depot_cap_{k}")));
        }

        (model, trip_cons, depot_cons)
    }
}

impl MasterInterface for ScipMaster<'_> {
    fn solve(&mut self, algo: SimplexAlgo) -> Result<f64> {
        let (mut model, trip_cons, depot_cons) = self.build_model();
        // Dual simplex warm-starts better from an all-slack basis on the first
        // solve; primal simplex tends to behave better once columns accrue.
        let lp_algo = match algo {
            SimplexAlgo::Dual => "d",
            SimplexAlgo::Primal => "p",
        };
        let _ = model.set_str_param("lp/initalgorithm", lp_algo);

        let solved: Model<Solved> = model.solve();
        // The continuous CG/TCG solves are capped at the root node, so
        // anything but Optimal there means a genuinely broken LP. The binary
        // finalize solve is allowed to branch and may legitimately stop at a
        // feasible-but-unproven-optimal status (node/time/gap limit); accept
        // it as long as SCIP found a solution at all.
        let has_solution = solved.best_sol().is_some();
        if !matches!(solved.status(), Status::Optimal) && !(self.binary && has_solution) {
            return Err(SolverError::Backend(format!(
                "master {} did not solve to optimality (status {:?})",
                if self.binary { "MIP" } else { "LP" },
                solved.status()
            )));
        }

        self.obj_value = solved.obj_val();

        if !self.binary {
            self.trip_duals = trip_cons.iter().map(|c| c.dual_sol()).collect();
            self.depot_duals = depot_cons.iter().map(|c| c.dual_sol()).collect();
        }

        let sol = solved.best_sol().ok_or_else(|| SolverError::Backend("master LP has no solution".into()))?;
        for c in 0..self.core.num_columns() {
            // Column vars were added in index order, so the c-th one is found
            // at the same position among the model's variables.
            let var = solved
                .vars()
                .iter()
                .find(|v| v.name() == format!("col_{c}"))
                .expect("column variable must exist after solve");
            self.core.set_value(c, sol.val(var));
        }

        Ok(self.obj_value)
    }

    fn obj_value(&self) -> f64 {
        self.obj_value
    }

    fn trip_dual(&self, i: usize) -> f64 {
        self.trip_duals[i]
    }

    fn depot_cap_dual(&self, k: usize) -> f64 {
        self.depot_duals[k]
    }

    fn begin_column(&mut self, depot: usize) {
        self.core.begin_column(depot);
    }

    fn add_trip(&mut self, trip: usize) -> Result<()> {
        self.core.add_trip(self.inst, trip)
    }

    fn commit_column(&mut self) -> Result<()> {
        self.core.commit_column(self.inst).map(|_| ())
    }

    fn num_columns(&self) -> usize {
        self.core.num_columns()
    }

    fn column_depot(&self, c: usize) -> usize {
        self.core.column_depot(c)
    }

    fn column_path(&self, c: usize) -> &[usize] {
        self.core.column_trips(c)
    }

    fn column_cost(&self, c: usize) -> f64 {
        self.core.column_cost(c) as f64
    }

    fn get_value(&self, c: usize) -> f64 {
        self.core.get_value(c)
    }

    fn get_lb(&self, c: usize) -> f64 {
        self.core.get_lb(c)
    }

    fn set_lb(&mut self, c: usize, bound: f64) {
        self.core.set_lb(c, bound);
    }

    fn convert_to_binary(&mut self) {
        self.binary = true;
    }

    fn convert_to_relaxed(&mut self) {
        self.binary = false;
    }

    fn set_assignment_type(&mut self, sense: AssignmentSense) {
        self.sense = sense;
    }

    fn export_columns(&self, path: &std::path::Path) -> Result<()> {
        self.core.export_to_path(path)
    }

    fn import_columns(&mut self, path: &std::path::Path) -> Result<usize> {
        self.core.import_from_path(self.inst, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_instance() -> Instance {
        // K=1, T=1: depot->trip0 = 4, trip0->depot = 3, capacity 1
        Instance::new(1, 1, vec![1], vec![-1, 4, 3, -1], false).unwrap()
    }

    #[test]
    fn dummy_only_solve_costs_dummy_per_trip() {
        let inst = tiny_instance();
        let mut master = ScipMaster::new(&inst);
        master.set_assignment_type(AssignmentSense::AtLeast);
        let obj = master.solve(SimplexAlgo::Dual).unwrap();
        assert!((obj - DUMMY_COST).abs() < 1e-3);
    }

    #[test]
    fn single_column_beats_dummy() {
        let inst = tiny_instance();
        let mut master = ScipMaster::new(&inst);
        master.begin_column(0);
        master.add_trip(0).unwrap();
        master.commit_column().unwrap();
        let obj = master.solve(SimplexAlgo::Dual).unwrap();
        assert!((obj - 7.0).abs() < 1e-6);
        assert!((master.get_value(0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fixed_lower_bound_forces_column_in() {
        let inst = tiny_instance();
        let mut master = ScipMaster::new(&inst);
        master.begin_column(0);
        master.add_trip(0).unwrap();
        master.commit_column().unwrap();
        master.set_lb(0, 1.0);
        master.solve(SimplexAlgo::Primal).unwrap();
        assert!((master.get_value(0) - 1.0).abs() < 1e-6);
    }
}
