//! CLI surface: `clap`-derive options, each also readable from its
//! environment variable, mirroring the pack's `#[arg(long, env, ...)]` idiom.

use crate::error::{Result, SolverError};
use crate::pricing::PricingAlgo;
use crate::tcg::{GraspStrategy, VarSelStrategy};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// `--method`: `cg` runs the column-generation core this crate implements;
/// `compact` would export the compact MIP formulation and stop -- an
/// external-collaborator path this build doesn't implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Method {
    Cg,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PricingChoice {
    Spfa,
    Bellman,
    Mip,
}

impl From<PricingChoice> for PricingAlgo {
    fn from(value: PricingChoice) -> Self {
        match value {
            PricingChoice::Spfa => PricingAlgo::Spfa,
            PricingChoice::Bellman => PricingAlgo::Bellman,
            PricingChoice::Mip => PricingAlgo::Mip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VarSelArg {
    Simple,
    Grasp,
}

impl From<VarSelArg> for VarSelStrategy {
    fn from(value: VarSelArg) -> Self {
        match value {
            VarSelArg::Simple => VarSelStrategy::Simple,
            VarSelArg::Grasp => VarSelStrategy::Grasp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraspStrategyArg {
    Direct,
    Eval,
}

impl From<GraspStrategyArg> for GraspStrategy {
    fn from(value: GraspStrategyArg) -> Self {
        match value {
            GraspStrategyArg::Direct => GraspStrategy::Direct,
            GraspStrategyArg::Eval => GraspStrategy::Eval,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "mdvsp-colgen", about = "Column-generation solver for the multi-depot vehicle scheduling problem")]
pub struct Cli {
    /// Path to the instance file.
    #[arg(long)]
    pub instance: PathBuf,

    /// `cg` runs the CG+TCG core; `compact` is out of scope in this build.
    #[arg(long, value_enum, default_value_t = Method::Cg)]
    pub method: Method,

    /// Selects the LP backend behind `MasterInterface`. Only `scip` is wired
    /// up in this build.
    #[arg(long, default_value = "scip")]
    pub master: String,

    /// Selects the pricing algorithm behind `PricingInterface`.
    #[arg(long, value_enum, default_value_t = PricingChoice::Spfa)]
    pub pricing: PricingChoice,

    /// Path budget per pricing call; `1` forces single-path extraction.
    #[arg(long = "max-paths", default_value_t = 1)]
    pub max_paths: i64,

    /// Preload columns from this file before CG starts (appended to the
    /// master's column cache, never replacing it -- see DESIGN.md).
    #[arg(long = "import-cols")]
    pub import_cols: Option<PathBuf>,

    /// Write the final real-column set to this file once the run finishes.
    #[arg(long = "export-cols")]
    pub export_cols: Option<PathBuf>,

    /// 0/1: sort `succAdj`/`predAdj` by ascending cost at instance build time.
    #[arg(long, env = "SORT_DEADHEAD_ARCS", default_value_t = 0)]
    pub sort_deadhead_arcs: i64,

    /// Cap on `succAdj` scans per node during CG pricing. `<= 0` is unbounded.
    #[arg(long, env = "MAX_LABEL_EXPANSIONS", default_value_t = 0)]
    pub max_label_expansions: i64,

    /// Same cap, but applied only during the TCG phase.
    #[arg(long, env = "MAX_LABEL_EXPANSIONS_TCG", default_value_t = 0)]
    pub max_label_expansions_tcg: i64,

    /// Inner CG-round iteration cap within TCG.
    #[arg(long, env = "TCG_MAX_SUB_ITERATIONS", default_value_t = 20)]
    pub tcg_max_sub_iterations: usize,

    /// TCG column-fixing selection strategy.
    #[arg(long, env = "TCG_VAR_SEL", value_enum, default_value_t = VarSelArg::Simple)]
    pub tcg_var_sel: VarSelArg,

    /// GRASP candidate-ordering strategy (only relevant when `--tcg-var-sel grasp`).
    #[arg(long, env = "TCG_GRASP_STRATEGY", value_enum, default_value_t = GraspStrategyArg::Direct)]
    pub tcg_grasp_strategy: GraspStrategyArg,

    /// GRASP restricted-candidate-list fraction, in `[0,1]`.
    #[arg(long, env = "TCG_GRASP_ALPHA", default_value_t = 0.2)]
    pub tcg_grasp_alpha: f64,

    /// Seed for the GRASP random selector, for reproducible runs.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

impl Cli {
    pub fn sort_deadhead_arcs(&self) -> bool {
        self.sort_deadhead_arcs != 0
    }

    /// Validates cross-field constraints that `clap` can't express directly:
    /// invalid values abort before the main loop, with a diagnostic, never a
    /// silent clamp.
    pub fn validate(&self) -> Result<()> {
        if self.max_paths < 1 {
            return Err(SolverError::Config(format!("--max-paths must be >= 1, got {}", self.max_paths)));
        }
        if !(0.0..=1.0).contains(&self.tcg_grasp_alpha) {
            return Err(SolverError::Config(format!(
                "TCG_GRASP_ALPHA must be in [0,1], got {}",
                self.tcg_grasp_alpha
            )));
        }
        if self.master != "scip" {
            return Err(SolverError::Config(format!("unknown --master backend: {}", self.master)));
        }
        if self.method == Method::Compact {
            return Err(SolverError::Config(
                "--method compact (compact MIP export) is not implemented by this build".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_max_paths() {
        let cli = Cli {
            instance: PathBuf::from("x"),
            method: Method::Cg,
            master: "scip".into(),
            pricing: PricingChoice::Spfa,
            max_paths: 0,
            import_cols: None,
            export_cols: None,
            sort_deadhead_arcs: 0,
            max_label_expansions: 0,
            max_label_expansions_tcg: 0,
            tcg_max_sub_iterations: 20,
            tcg_var_sel: VarSelArg::Simple,
            tcg_grasp_strategy: GraspStrategyArg::Direct,
            tcg_grasp_alpha: 0.2,
            seed: 0,
        };
        assert!(cli.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_grasp_alpha() {
        let mut cli = Cli {
            instance: PathBuf::from("x"),
            method: Method::Cg,
            master: "scip".into(),
            pricing: PricingChoice::Spfa,
            max_paths: 1,
            import_cols: None,
            export_cols: None,
            sort_deadhead_arcs: 0,
            max_label_expansions: 0,
            max_label_expansions_tcg: 0,
            tcg_max_sub_iterations: 20,
            tcg_var_sel: VarSelArg::Simple,
            tcg_grasp_strategy: GraspStrategyArg::Direct,
            tcg_grasp_alpha: 1.5,
            seed: 0,
        };
        assert!(cli.validate().is_err());
        cli.tcg_grasp_alpha = 0.2;
        assert!(cli.validate().is_ok());
    }
}
