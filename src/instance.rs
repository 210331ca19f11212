use crate::error::{Result, SolverError};
use std::io::{BufRead, Write};

/// Sentinel marking an absent arc in the raw cost matrix.
const NO_ARC: i64 = -1;

/// Immutable MDVSP instance data. Built once and shared (read-only) across
/// the master, every pricing subproblem and the CG/TCG engines.
///
/// The cost matrix is `(K+T) x (K+T)`: rows/columns `0..K` are depot nodes,
/// `K..K+T` are trip nodes. `-1` means "arc absent" and must never reach
/// arithmetic past the query layer -- callers always go through
/// `source_cost`/`sink_cost`/`deadhead_cost`, which return `Option<i64>`.
#[derive(Debug, Clone)]
pub struct Instance {
    num_depots: usize,
    num_trips: usize,
    depot_capacity: Vec<i64>,
    matrix: Vec<i64>,
    succ_adj: Vec<Vec<(usize, i64)>>,
    pred_adj: Vec<Vec<(usize, i64)>>,
}

impl Instance {
    fn dim(&self) -> usize {
        self.num_depots + self.num_trips
    }

    fn cell(&self, i: usize, j: usize) -> i64 {
        debug_assert!(i < self.dim() && j < self.dim(), "instance index out of range");
        self.matrix[i * self.dim() + j]
    }

    pub fn num_depots(&self) -> usize {
        self.num_depots
    }

    pub fn num_trips(&self) -> usize {
        self.num_trips
    }

    pub fn depot_capacity(&self, k: usize) -> i64 {
        debug_assert!(k < self.num_depots, "depot index out of range");
        self.depot_capacity[k]
    }

    /// Cost of the depot `k` -> trip `i` source arc, or `None` if absent.
    pub fn source_cost(&self, k: usize, i: usize) -> Option<i64> {
        debug_assert!(k < self.num_depots && i < self.num_trips);
        let v = self.cell(k, self.num_depots + i);
        (v != NO_ARC).then_some(v)
    }

    /// Cost of the trip `i` -> depot `k` sink arc, or `None` if absent.
    pub fn sink_cost(&self, k: usize, i: usize) -> Option<i64> {
        debug_assert!(k < self.num_depots && i < self.num_trips);
        let v = self.cell(self.num_depots + i, k);
        (v != NO_ARC).then_some(v)
    }

    /// Cost of the deadhead arc trip `p` -> trip `s`, or `None` if absent.
    pub fn deadhead_cost(&self, p: usize, s: usize) -> Option<i64> {
        debug_assert!(p < self.num_trips && s < self.num_trips);
        let v = self.cell(self.num_depots + p, self.num_depots + s);
        (v != NO_ARC).then_some(v)
    }

    /// Successors of trip `i` with a valid deadhead arc: `(j, cost)`. Never
    /// contains `i` itself.
    pub fn succ_adj(&self, i: usize) -> &[(usize, i64)] {
        &self.succ_adj[i]
    }

    /// Predecessors of trip `i` with a valid deadhead arc: `(j, cost)`.
    pub fn pred_adj(&self, i: usize) -> &[(usize, i64)] {
        &self.pred_adj[i]
    }

    /// Builds an `Instance` from its header/capacity/matrix parts, caching
    /// deadhead adjacency. `sort_adj` mirrors `SORT_DEADHEAD_ARCS`: when set,
    /// both caches are sorted by ascending cost.
    pub fn new(
        num_depots: usize,
        num_trips: usize,
        depot_capacity: Vec<i64>,
        matrix: Vec<i64>,
        sort_adj: bool,
    ) -> Result<Self> {
        let dim = num_depots + num_trips;
        if depot_capacity.len() != num_depots {
            return Err(SolverError::Data(format!(
                "expected {num_depots} depot capacities, got {}",
                depot_capacity.len()
            )));
        }
        if matrix.len() != dim * dim {
            return Err(SolverError::Data(format!(
                "expected a {dim}x{dim} cost matrix, got {} cells",
                matrix.len()
            )));
        }
        if depot_capacity.iter().any(|&c| c < 0) {
            return Err(SolverError::Data("depot capacity must be non-negative".into()));
        }

        let mut inst = Instance {
            num_depots,
            num_trips,
            depot_capacity,
            matrix,
            succ_adj: vec![Vec::new(); num_trips],
            pred_adj: vec![Vec::new(); num_trips],
        };

        for p in 0..num_trips {
            for s in 0..num_trips {
                if p == s {
                    continue;
                }
                if let Some(cost) = inst.deadhead_cost(p, s) {
                    inst.succ_adj[p].push((s, cost));
                    inst.pred_adj[s].push((p, cost));
                }
            }
        }

        if sort_adj {
            for adj in inst.succ_adj.iter_mut().chain(inst.pred_adj.iter_mut()) {
                adj.sort_by_key(|&(_, cost)| cost);
            }
        }

        Ok(inst)
    }

    /// Parses the whitespace-separated text format described in the external
    /// interfaces section: `K T` header, depot capacities, then the full
    /// `(K+T)x(K+T)` matrix.
    pub fn read_from(reader: impl BufRead, sort_adj: bool) -> Result<Self> {
        let mut tokens = reader
            .lines()
            .map(|l| l.map_err(SolverError::from))
            .collect::<Result<Vec<String>>>()?
            .join(" ")
            .split_whitespace()
            .map(str::to_owned)
            .collect::<Vec<_>>()
            .into_iter();

        let mut next_int = |what: &str| -> Result<i64> {
            tokens
                .next()
                .ok_or_else(|| SolverError::Data(format!("unexpected end of input reading {what}")))?
                .parse::<i64>()
                .map_err(|e| SolverError::Data(format!("invalid {what}: {e}")))
        };

        let num_depots = next_int("numDepots")? as usize;
        let num_trips = next_int("numTrips")? as usize;

        let depot_capacity = (0..num_depots)
            .map(|k| next_int(&format!("depotCapacity[{k}]")))
            .collect::<Result<Vec<_>>>()?;

        let dim = num_depots + num_trips;
        let matrix = (0..dim * dim)
            .map(|idx| next_int(&format!("matrix cell {idx}")))
            .collect::<Result<Vec<_>>>()?;

        Instance::new(num_depots, num_trips, depot_capacity, matrix, sort_adj)
    }

    /// Writes the instance back out in the same text format. Used by the
    /// reduced-arc export utility and round-trip tests.
    pub fn write_to(&self, mut writer: impl Write) -> Result<()> {
        write!(writer, "{} {}\n", self.num_depots, self.num_trips)?;
        for k in 0..self.num_depots {
            if k > 0 {
                write!(writer, " ")?;
            }
            write!(writer, "{}", self.depot_capacity[k])?;
        }
        writeln!(writer)?;
        let dim = self.dim();
        for i in 0..dim {
            for j in 0..dim {
                if j > 0 {
                    write!(writer, " ")?;
                }
                write!(writer, "{}", self.cell(i, j))?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_instance() -> Instance {
        // K=1, T=1, cap=[1], matrix [[-1,5],[7,-1]]
        Instance::new(1, 1, vec![1], vec![-1, 5, 7, -1], false).unwrap()
    }

    #[test]
    fn source_and_sink_costs() {
        let inst = small_instance();
        assert_eq!(inst.source_cost(0, 0), Some(5));
        assert_eq!(inst.sink_cost(0, 0), Some(7));
        assert_eq!(inst.deadhead_cost(0, 0), None);
    }

    #[test]
    fn succ_adj_never_contains_self() {
        let matrix = vec![
            -1, -1, 1, 1, // depot row
            1, -1, -1, 2, // trip0 row: source unused here, deadhead 0->1 = 2
            1, 2, -1, -1, // trip1 row
        ];
        // K=1,T=2 layout check below instead; build directly to keep it simple.
        let _ = matrix;
        let inst = Instance::new(
            1,
            2,
            vec![2],
            vec![
                -1, 1, 1, // depot -> [depot, trip0, trip1]
                1, -1, 1, // trip0 -> [depot, trip0, trip1] (trip0->trip1 deadhead = 1)
                1, -1, -1, // trip1 -> [depot, trip0, trip1]
            ],
            false,
        )
        .unwrap();
        for (j, _) in inst.succ_adj(0) {
            assert_ne!(*j, 0);
        }
    }

    #[test]
    fn read_from_text_round_trips() {
        let text = "1 1\n1\n-1 5\n7 -1\n";
        let inst = Instance::read_from(text.as_bytes(), false).unwrap();
        assert_eq!(inst.num_depots(), 1);
        assert_eq!(inst.num_trips(), 1);
        assert_eq!(inst.source_cost(0, 0), Some(5));

        let mut out = Vec::new();
        inst.write_to(&mut out).unwrap();
        let reparsed = Instance::read_from(out.as_slice(), false).unwrap();
        assert_eq!(reparsed.source_cost(0, 0), inst.source_cost(0, 0));
    }

    #[test]
    fn rejects_mismatched_capacity_count() {
        let err = Instance::new(2, 1, vec![1], vec![0; 9], false);
        assert!(err.is_err());
    }

    #[test]
    fn sort_adj_orders_by_ascending_cost() {
        let inst = Instance::new(
            1,
            3,
            vec![1],
            vec![
                -1, 1, 1, 1, //
                1, -1, 5, 2, //
                1, 2, -1, 3, //
                1, 9, 1, -1, //
            ],
            true,
        )
        .unwrap();
        let costs: Vec<i64> = inst.succ_adj(0).iter().map(|&(_, c)| c).collect();
        let mut sorted = costs.clone();
        sorted.sort();
        assert_eq!(costs, sorted);
    }
}
