use anyhow::Result;
use log::info;
use took::{Timer, Took};

use crate::exact;
use crate::problem::metric::DistanceMetric;
use crate::problem::Problem;
use crate::psa::{self, ConvergencePoint, SaConfig};
use crate::solution::{AlgorithmSolution, Objective, ProblemSolution};
use crate::utils::logging::format_log_solution;

/// Multi-target runs optimize the three objectives in one call; single-target
/// runs return one solution plus its convergence history.
pub enum SolverOutcome {
    MultiObjective(AlgorithmSolution),
    SingleObjective {
        solution: ProblemSolution,
        history: Vec<ConvergencePoint>,
    },
}

pub struct SolverRun {
    pub outcome: SolverOutcome,
    pub time: Took,
}

pub fn solve_exact(problem: &Problem, metric: &dyn DistanceMetric) -> Result<SolverRun> {
    let timer = Timer::new();
    let solution = exact::solve(problem, metric)?;
    info!(
        "exact solve done, took: {} | distance {} | price {} | empty {}",
        timer.took(),
        format_log_solution(&solution.best_distance_solution),
        format_log_solution(&solution.best_price_solution),
        format_log_solution(&solution.best_empty_solution),
    );
    Ok(SolverRun {
        outcome: SolverOutcome::MultiObjective(solution),
        time: timer.took(),
    })
}

pub fn solve_heuristic(
    problem: &Problem,
    metric: &dyn DistanceMetric,
    objective: Objective,
    config: &SaConfig,
    seed: i128,
) -> Result<SolverRun> {
    let timer = Timer::new();
    let (solution, history) = psa::solve(problem, metric, objective, config, seed)?;
    info!(
        "heuristic solve done for {:?} with {} improvements",
        objective,
        history.len()
    );
    Ok(SolverRun {
        outcome: SolverOutcome::SingleObjective { solution, history },
        time: timer.took(),
    })
}
