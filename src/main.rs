use clap::Parser;
use log::info;
use rand::random;
use took::Timer;

use vrppd_solver::cli::{ProgramArguments, Solver};
use vrppd_solver::io;
use vrppd_solver::solver::{self, SolverOutcome};
use vrppd_solver::utils::logging::format_log_solution;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = ProgramArguments::parse();
    info!("{:?}", &args);

    let seed_value = args.seed.unwrap_or_else(|| random::<i128>().abs());
    info!("seed: {}", seed_value);

    let load_timer = Timer::new();
    let problem = io::load_problem(&args.instance)?;
    info!(
        "instance loaded after {} ({} vehicles, {} orders)",
        load_timer.took(),
        problem.num_vehicles(),
        problem.num_orders()
    );

    let metric = args.solver.metric.as_metric();
    let run = match args.solver.variant {
        Solver::Exact => solver::solve_exact(&problem, metric)?,
        Solver::Psa => solver::solve_heuristic(
            &problem,
            metric,
            args.solver.objective,
            &args.solver.sa_config(),
            seed_value,
        )?,
    };
    info!("finished after {}", run.time);

    match &run.outcome {
        SolverOutcome::MultiObjective(solution) => {
            info!(
                "best distance solution: {}",
                format_log_solution(&solution.best_distance_solution)
            );
            info!(
                "best price solution: {}",
                format_log_solution(&solution.best_price_solution)
            );
            info!(
                "best empty solution: {}",
                format_log_solution(&solution.best_empty_solution)
            );
            if let Some(path) = &args.solution {
                io::write_json(path, solution)?;
            }
            if args.print_summary_to_stdout {
                println!(
                    "{},{},{}",
                    solution.best_distance_solution.total_distance,
                    solution.best_price_solution.total_price,
                    solution.best_empty_solution.empty_distance,
                );
            }
        }
        SolverOutcome::SingleObjective { solution, history } => {
            info!("best solution: {}", format_log_solution(solution));
            if let Some(path) = &args.solution {
                io::write_json(path, solution)?;
            }
            if let Some(path) = &args.history {
                io::write_json(path, history)?;
            }
            if args.print_summary_to_stdout {
                println!(
                    "{},{},{},{}",
                    solution.total_distance,
                    solution.total_price,
                    solution.empty_distance,
                    run.time.as_std().as_secs()
                );
            }
        }
    }

    Ok(())
}
