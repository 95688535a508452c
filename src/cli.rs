use clap::{Parser, ValueEnum};

use crate::problem::metric::MetricKind;
use crate::psa::neighborhood::OperatorWeights;
use crate::psa::SaConfig;
use crate::solution::Objective;
use crate::utils::TimeLimit;

#[derive(Parser, Debug)]
#[command(version)]
pub struct ProgramArguments {
    #[arg(long, help = "rng seed")]
    pub seed: Option<i128>,

    #[arg(short, long, help = "problem file path (json)")]
    pub instance: String,

    #[arg(short, long, help = "solution file path")]
    pub solution: Option<String>,

    #[arg(long, help = "convergence history file path")]
    pub history: Option<String>,

    #[command(flatten)]
    pub solver: SolverArguments,

    #[arg(long, help = "print summary to stdout", default_value = "false")]
    pub print_summary_to_stdout: bool,
}

#[derive(Clone, ValueEnum, Debug)]
pub enum Solver {
    Exact,
    Psa,
}

#[derive(clap::Args, Clone, Debug)]
pub struct SolverArguments {
    #[arg(long = "solver", value_enum, default_value = "psa")]
    pub variant: Solver,
    #[arg(long, value_enum, default_value = "distance")]
    pub objective: Objective,
    #[arg(long, value_enum, default_value = "great-circle")]
    pub metric: MetricKind,

    #[arg(long, default_value = "1500.0")]
    pub initial_temp: f64,
    #[arg(long, default_value = "0.99")]
    pub cooling_rate: f64,
    #[arg(long, default_value = "0.1")]
    pub min_temp: f64,
    #[arg(long, default_value = "10000")]
    pub max_iterations: usize,
    #[arg(long, default_value = "50")]
    pub batch_size: usize,
    #[arg(long, default_value = "200")]
    pub sync_interval: usize,
    #[arg(
        long,
        value_delimiter = ' ',
        num_args = 3..=3,
        default_value = "0.4 0.3 0.3",
        help = "shift/swap/shuffle operator weights"
    )]
    pub operator_weights: Vec<f64>,
    #[arg(long, help = "wall clock ceiling for the heuristic in seconds")]
    pub time_limit_in_seconds: Option<u64>,
}

impl SolverArguments {
    pub fn sa_config(&self) -> SaConfig {
        SaConfig {
            initial_temperature: self.initial_temp,
            cooling_rate: self.cooling_rate,
            min_temperature: self.min_temp,
            max_iterations: self.max_iterations,
            batch_size: self.batch_size,
            sync_interval: self.sync_interval,
            operator_weights: OperatorWeights {
                shift: self.operator_weights[0],
                swap: self.operator_weights[1],
                shuffle: self.operator_weights[2],
            },
            time_limit: match self.time_limit_in_seconds {
                Some(seconds) => TimeLimit::Seconds(seconds),
                None => TimeLimit::None,
            },
        }
    }
}
