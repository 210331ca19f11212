//! Classic Bellman-Ford pricing: `|nodes|` relaxation rounds over every trip,
//! one more round to detect a negative cycle. Slower than SPFA on sparse
//! graphs but useful as a reference implementation and a fallback when the
//! instance's arc structure makes SPFA's queue churn (rare in practice).

use crate::error::{Result, SolverError};
use crate::instance::Instance;
use crate::master::{ColumnCandidate, DualSnapshot};
use crate::pricing::{PricingInterface, NEGATIVE_REDUCED_COST_THRESHOLD};
use std::sync::Arc;

pub struct BellmanFordPricing {
    inst: Arc<Instance>,
    depot: usize,
    single_path: bool,

    dist: Vec<f64>,
    pred: Vec<Option<usize>>,
    dist_sink: f64,
    pred_sink: Option<usize>,
}

impl BellmanFordPricing {
    pub fn new(inst: Arc<Instance>, depot: usize, single_path: bool) -> Self {
        let num_trips = inst.num_trips();
        BellmanFordPricing {
            inst,
            depot,
            single_path,
            dist: vec![f64::INFINITY; num_trips],
            pred: vec![None; num_trips],
            dist_sink: f64::INFINITY,
            pred_sink: None,
        }
    }

    /// One sweep over every trip node, relaxing its successor and sink arcs.
    /// Returns whether anything changed.
    fn relax_round(&mut self, duals: &DualSnapshot) -> bool {
        let mut changed = false;

        for v in 0..self.inst.num_trips() {
            if self.dist[v].is_infinite() {
                continue;
            }
            let i_dual = duals.trip_dual(v);

            for &(to, arc_cost) in self.inst.succ_adj(v) {
                let len = arc_cost as f64 - i_dual;
                if self.dist[v] + len < self.dist[to] {
                    self.dist[to] = self.dist[v] + len;
                    self.pred[to] = Some(v);
                    changed = true;
                }
            }

            if let Some(sink_cost) = self.inst.sink_cost(self.depot, v) {
                let len = sink_cost as f64 - i_dual;
                if self.dist[v] + len < self.dist_sink {
                    self.dist_sink = self.dist[v] + len;
                    self.pred_sink = Some(v);
                    changed = true;
                }
            }
        }

        changed
    }

    fn extract_path(&self, start: usize, sink_leg_cost: f64, duals: &DualSnapshot) -> Option<Vec<usize>> {
        let mut path = vec![start];
        let mut cost = sink_leg_cost;

        loop {
            let &cur = path.last().expect("path is never empty");
            match self.pred[cur] {
                Some(pred) => {
                    let arc = self
                        .inst
                        .deadhead_cost(pred, cur)
                        .expect("pred chain must follow real deadhead arcs");
                    cost += arc as f64 - duals.trip_dual(pred);
                    path.push(pred);
                }
                None => {
                    let source_cost = self
                        .inst
                        .source_cost(self.depot, cur)
                        .expect("pred chain must terminate at a trip with a valid source arc");
                    cost += source_cost as f64 - duals.depot_cap_dual(self.depot);
                    break;
                }
            }
        }

        if cost <= NEGATIVE_REDUCED_COST_THRESHOLD {
            path.reverse();
            Some(path)
        } else {
            None
        }
    }
}

impl PricingInterface for BellmanFordPricing {
    fn depot_id(&self) -> usize {
        self.depot
    }

    fn solver_name(&self) -> &'static str {
        "Bellman-Ford with negative cycle detection"
    }

    fn is_exact(&self) -> bool {
        true
    }

    fn set_max_label_expansions_per_node(&mut self, _max_expansions: i64) {
        // Bellman-Ford relaxes every arc every round; there is no per-node
        // expansion count to cap.
    }

    fn solve(&mut self, duals: &DualSnapshot) -> Result<f64> {
        let num_trips = self.inst.num_trips();
        self.dist.iter_mut().for_each(|d| *d = f64::INFINITY);
        self.pred.iter_mut().for_each(|p| *p = None);
        self.dist_sink = f64::INFINITY;
        self.pred_sink = None;

        let depot_dual = duals.depot_cap_dual(self.depot);
        for i in 0..num_trips {
            if let Some(cost) = self.inst.source_cost(self.depot, i) {
                self.dist[i] = cost as f64 - depot_dual;
                self.pred[i] = None;
            }
        }

        let num_nodes = num_trips + 2;
        for _ in 0..num_nodes {
            if !self.relax_round(duals) {
                return Ok(self.dist_sink);
            }
        }

        if self.relax_round(duals) {
            return Err(SolverError::Data(format!(
                "negative cycle detected while pricing depot {}",
                self.depot
            )));
        }

        Ok(self.dist_sink)
    }

    fn obj_value(&self) -> f64 {
        self.dist_sink
    }

    fn generate_columns(&self, duals: &DualSnapshot) -> Vec<ColumnCandidate> {
        let mut paths = Vec::new();

        if self.single_path {
            if let Some(last) = self.pred_sink {
                let sink_cost = self
                    .inst
                    .sink_cost(self.depot, last)
                    .expect("pred_sink must reference a trip with a valid sink arc");
                let leg_cost = sink_cost as f64 - duals.trip_dual(last);
                if let Some(path) = self.extract_path(last, leg_cost, duals) {
                    paths.push(path);
                }
            }
        } else {
            for i in 0..self.inst.num_trips() {
                if let Some(sink_cost) = self.inst.sink_cost(self.depot, i) {
                    let leg_cost = sink_cost as f64 - duals.trip_dual(i);
                    if let Some(path) = self.extract_path(i, leg_cost, duals) {
                        paths.push(path);
                    }
                }
            }
        }

        paths
            .into_iter()
            .map(|trips| ColumnCandidate { depot: self.depot, trips })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_instance() -> Arc<Instance> {
        Arc::new(
            Instance::new(
                1,
                2,
                vec![1],
                vec![
                    -1, 3, -1, //
                    -1, -1, 1, //
                    2, -1, -1, //
                ],
                false,
            )
            .unwrap(),
        )
    }

    #[test]
    fn matches_spfa_on_the_same_instance() {
        let inst = chain_instance();
        let mut pricer = BellmanFordPricing::new(inst, 0, true);
        let duals = DualSnapshot::new(vec![10.0, 10.0], vec![0.0]);
        let best = pricer.solve(&duals).unwrap();
        assert!(best < 0.0);
        let cols = pricer.generate_columns(&duals);
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].trips, vec![0, 1]);
    }

    #[test]
    fn no_path_when_instance_disconnected() {
        let inst = Arc::new(Instance::new(1, 1, vec![1], vec![-1, -1, -1, -1], false).unwrap());
        let mut pricer = BellmanFordPricing::new(inst, 0, true);
        let duals = DualSnapshot::new(vec![0.0], vec![0.0]);
        let best = pricer.solve(&duals).unwrap();
        assert!(best.is_infinite());
        assert!(pricer.generate_columns(&duals).is_empty());
    }
}
