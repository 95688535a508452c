use std::sync::mpsc;
use std::thread;

use anyhow::{bail, ensure, Result};
use log::{debug, info};
use rand::Rng;
use serde::Serialize;
use took::Timer;

use crate::construction::CheapestInsertion;
use crate::problem::matrices::DistanceMatrices;
use crate::problem::metric::DistanceMetric;
use crate::problem::Problem;
use crate::solution::{Objective, ProblemSolution, SolutionMetrics};
use crate::utils::logging::format_log_method_solution_timed;
use crate::utils::{create_seeded_rng, Countdown, TimeLimit};

pub mod neighborhood;
pub mod worker;

use neighborhood::OperatorWeights;
use worker::{AnnealingWorker, Influence, WorkerEvent};

#[derive(Clone, Copy, Debug)]
pub struct SaConfig {
    pub initial_temperature: f64,
    pub cooling_rate: f64,
    pub min_temperature: f64,
    pub max_iterations: usize,
    pub batch_size: usize,
    pub sync_interval: usize,
    pub operator_weights: OperatorWeights,
    pub time_limit: TimeLimit,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 1500.0,
            cooling_rate: 0.99,
            min_temperature: 0.1,
            max_iterations: 10_000,
            batch_size: 50,
            sync_interval: 200,
            operator_weights: OperatorWeights::default(),
            time_limit: TimeLimit::None,
        }
    }
}

/// One global-best improvement observed by the coordinator.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvergencePoint {
    pub time_ms: u64,
    pub iteration: u64,
    pub metrics: SolutionMetrics,
}

fn worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(2)
}

/// Parallel simulated annealing over a ring of workers.
///
/// Workers run independent chains from a shared constructive seed; elite
/// solutions travel one hop downstream per report, which keeps the chains
/// diverse instead of collapsing onto the first good solution found.
pub fn solve(
    problem: &Problem,
    metric: &dyn DistanceMetric,
    objective: Objective,
    config: &SaConfig,
    seed: i128,
) -> Result<(ProblemSolution, Vec<ConvergencePoint>)> {
    let timer = Timer::new();
    let countdown = Countdown::new(timer.clone(), config.time_limit);
    let mats = DistanceMatrices::build(problem, metric);
    let mut rng = create_seeded_rng(seed);

    let seed_plan = CheapestInsertion::new(problem, &mats, objective).construct(&mut rng);
    let seed_energy = seed_plan.energy(objective);
    info!(
        "constructed initial solution at energy {:.3} ({} of {} orders assigned)",
        seed_energy,
        seed_plan.num_assigned(),
        problem.num_orders()
    );

    let worker_count = worker_count();
    info!("spawning {worker_count} annealing workers");

    let (event_tx, event_rx) = mpsc::channel();
    let mut influence_txs = Vec::with_capacity(worker_count);
    let mut influence_rxs = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let (tx, rx) = mpsc::channel::<Influence>();
        influence_txs.push(tx);
        influence_rxs.push(rx);
    }

    let mut global_best = seed_plan.clone();
    let mut global_best_energy = seed_energy;
    let mut history: Vec<ConvergencePoint> = Vec::new();
    let mut iterations_by_worker = vec![0u64; worker_count];

    thread::scope(|scope| -> Result<()> {
        let mut handles = Vec::with_capacity(worker_count);
        for (worker_id, influence_rx) in influence_rxs.into_iter().enumerate() {
            let worker = AnnealingWorker::new(
                worker_id,
                problem,
                &mats,
                objective,
                config,
                &countdown,
                seed_plan.clone(),
                config.initial_temperature * rng.gen_range(0.9..1.2),
                rng.gen::<i128>(),
                influence_rx,
                event_tx.clone(),
            );
            handles.push(scope.spawn(move || worker.run()));
        }
        // the workers hold the only remaining senders; the event loop ends
        // when the last one hangs up
        drop(event_tx);

        let mut completed = 0usize;
        while let Ok((worker_id, event)) = event_rx.recv() {
            match event {
                WorkerEvent::Sync(report) => {
                    iterations_by_worker[worker_id] = report.iterations;
                    if report.energy < global_best_energy {
                        global_best_energy = report.energy;
                        global_best = report.plan.clone();
                        history.push(ConvergencePoint {
                            time_ms: countdown.time_elapsed().as_millis() as u64,
                            iteration: iterations_by_worker.iter().sum(),
                            metrics: global_best.metrics(),
                        });
                        debug!(
                            "worker {worker_id} improved the global best to {:.3}",
                            global_best_energy
                        );
                    }
                    // ring topology: forward downstream, last worker stops
                    if worker_id + 1 < worker_count {
                        let _ = influence_txs[worker_id + 1].send(Influence {
                            energy: report.energy,
                            plan: report.plan,
                        });
                    }
                }
                WorkerEvent::Done(report) => {
                    iterations_by_worker[worker_id] = report.iterations;
                    if report.energy < global_best_energy {
                        global_best_energy = report.energy;
                        global_best = report.plan;
                    }
                    completed += 1;
                }
            }
        }
        drop(influence_txs);

        let crashed = handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(Result::is_err)
            .count();
        if crashed > 0 {
            bail!("{crashed} annealing workers panicked");
        }
        ensure!(
            completed == worker_count,
            "only {completed} of {worker_count} workers reported completion"
        );
        Ok(())
    })?;

    let solution = global_best.to_problem_solution(problem);
    info!(
        "{}",
        format_log_method_solution_timed("psa", &solution, timer.took())
    );
    Ok((solution, history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact;
    use crate::problem::metric::Euclidean;
    use crate::problem::{Location, Order, Vehicle};
    use crate::solution::plan::Plan;
    use crate::utils::validator::{validate_solution, ValidatorResult};

    fn vehicle(id: u32, at: (f64, f64), price_km: f64) -> Vehicle {
        Vehicle {
            id,
            start_location: Location::new(at.0, at.1),
            price_km,
        }
    }

    fn order(id: u32, pickup: (f64, f64), delivery: (f64, f64)) -> Order {
        Order {
            id,
            pickup_location: Location::new(pickup.0, pickup.1),
            delivery_location: Location::new(delivery.0, delivery.1),
            load_factor: 2.0,
        }
    }

    fn small_problem() -> Problem {
        Problem::new(
            vec![vehicle(1, (0.0, 0.0), 2.0), vehicle(2, (20.0, 0.0), 1.0)],
            vec![
                order(1, (2.0, 0.0), (6.0, 0.0)),
                order(2, (18.0, 0.0), (14.0, 0.0)),
                order(3, (3.0, 3.0), (5.0, 5.0)),
                order(4, (17.0, 2.0), (15.0, 4.0)),
            ],
            None,
        )
        .unwrap()
    }

    fn quick_config() -> SaConfig {
        SaConfig {
            max_iterations: 2_000,
            batch_size: 25,
            sync_interval: 100,
            ..SaConfig::default()
        }
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = SaConfig::default();
        assert_eq!(config.initial_temperature, 1500.0);
        assert_eq!(config.cooling_rate, 0.99);
        assert_eq!(config.min_temperature, 0.1);
        assert_eq!(config.max_iterations, 10_000);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.sync_interval, 200);
    }

    #[test]
    fn returns_a_feasible_solution_with_all_orders() {
        let problem = small_problem();
        let mats = DistanceMatrices::build(&problem, &Euclidean);
        let (solution, _) =
            solve(&problem, &Euclidean, Objective::Distance, &quick_config(), 123).unwrap();
        match validate_solution(&problem, &mats, &solution, true) {
            ValidatorResult::Valid(_) => {}
            other => panic!("psa returned an invalid solution: {:?}", other),
        }
    }

    #[test]
    fn never_beats_the_exact_optimum() {
        let problem = small_problem();
        let exact_solution = exact::solve(&problem, &Euclidean).unwrap();
        for (objective, optimum) in [
            (
                Objective::Distance,
                exact_solution.best_distance_solution.total_distance,
            ),
            (
                Objective::Price,
                exact_solution.best_price_solution.total_price,
            ),
            (
                Objective::Empty,
                exact_solution.best_empty_solution.empty_distance,
            ),
        ] {
            let (solution, _) =
                solve(&problem, &Euclidean, objective, &quick_config(), 42).unwrap();
            assert!(
                solution.objective_value(objective) >= optimum - 1e-9,
                "heuristic undercut the optimum for {:?}: {} < {}",
                objective,
                solution.objective_value(objective),
                optimum
            );
        }
    }

    #[test]
    fn history_improves_monotonically() {
        let problem = small_problem();
        let (_, history) =
            solve(&problem, &Euclidean, Objective::Distance, &quick_config(), 7).unwrap();
        for pair in history.windows(2) {
            assert!(pair[1].metrics.total_distance < pair[0].metrics.total_distance);
            assert!(pair[1].time_ms >= pair[0].time_ms);
        }
    }

    #[test]
    fn worker_reports_done_with_its_best() {
        let problem = small_problem();
        let mats = DistanceMatrices::build(&problem, &Euclidean);
        let config = quick_config();
        let countdown = Countdown::unlimited();
        let seed_plan = CheapestInsertion::new(&problem, &mats, Objective::Distance)
            .construct(&mut create_seeded_rng(9));
        let seed_energy = seed_plan.energy(Objective::Distance);

        let (event_tx, event_rx) = mpsc::channel();
        let (influence_tx, influence_rx) = mpsc::channel();
        let worker = AnnealingWorker::new(
            0,
            &problem,
            &mats,
            Objective::Distance,
            &config,
            &countdown,
            seed_plan,
            config.initial_temperature,
            99,
            influence_rx,
            event_tx,
        );
        drop(influence_tx);
        worker.run();

        let mut done: Option<f64> = None;
        while let Ok((id, event)) = event_rx.recv() {
            assert_eq!(id, 0);
            if let WorkerEvent::Done(report) = event {
                assert!(report.iterations > 0);
                assert!(Plan::from_routes(&problem, &mats, report.plan.routes().to_vec())
                    .is_some());
                done = Some(report.energy);
            }
        }
        let done = done.expect("worker never reported completion");
        assert!(done <= seed_energy);
    }
}
