use std::sync::mpsc::{Receiver, Sender};

use log::debug;
use rand::Rng;

use crate::problem::matrices::DistanceMatrices;
use crate::problem::Problem;
use crate::solution::plan::Plan;
use crate::solution::Objective;
use crate::utils::{create_seeded_rng, Countdown, Random};

use super::neighborhood;
use super::SaConfig;

/// Floor the temperature is raised to after adopting an influence, so the
/// worker explores the vicinity of the imported solution.
pub const REHEAT_TEMPERATURE: f64 = 50.0;

/// Elite solution forwarded from the ring predecessor.
pub struct Influence {
    pub energy: f64,
    pub plan: Plan,
}

pub struct WorkerReport {
    pub energy: f64,
    pub plan: Plan,
    pub iterations: u64,
}

pub enum WorkerEvent {
    Sync(WorkerReport),
    Done(WorkerReport),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Uninitialized,
    Running,
    Terminated,
}

/// One simulated-annealing chain. Runs synchronous batches and drains its
/// influence channel only at batch boundaries, never mid-iteration.
pub struct AnnealingWorker<'a> {
    id: usize,
    problem: &'a Problem,
    mats: &'a DistanceMatrices,
    objective: Objective,
    config: &'a SaConfig,
    countdown: &'a Countdown,
    rng: Random,
    state: WorkerState,
    current: Plan,
    current_energy: f64,
    best: Plan,
    best_energy: f64,
    temperature: f64,
    iterations: u64,
    influence_rx: Receiver<Influence>,
    event_tx: Sender<(usize, WorkerEvent)>,
}

impl<'a> AnnealingWorker<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        problem: &'a Problem,
        mats: &'a DistanceMatrices,
        objective: Objective,
        config: &'a SaConfig,
        countdown: &'a Countdown,
        initial: Plan,
        initial_temperature: f64,
        seed: i128,
        influence_rx: Receiver<Influence>,
        event_tx: Sender<(usize, WorkerEvent)>,
    ) -> Self {
        let current_energy = initial.energy(objective);
        Self {
            id,
            problem,
            mats,
            objective,
            config,
            countdown,
            rng: create_seeded_rng(seed),
            state: WorkerState::Uninitialized,
            best: initial.clone(),
            best_energy: current_energy,
            current: initial,
            current_energy,
            temperature: initial_temperature,
            iterations: 0,
            influence_rx,
            event_tx,
        }
    }

    pub fn run(mut self) {
        if self.state == WorkerState::Running {
            return;
        }
        self.state = WorkerState::Running;

        let mut last_report = 0u64;
        while self.keeps_running() {
            self.run_batch();
            if self.iterations - last_report >= self.config.sync_interval as u64 {
                last_report = self.iterations;
                self.post(WorkerEvent::Sync(self.report()));
            }
            // batch boundary: let queued influences in before annealing on
            self.drain_influences();
        }

        self.state = WorkerState::Terminated;
        debug!(
            "worker {} terminated after {} iterations at energy {}",
            self.id, self.iterations, self.best_energy
        );
        let report = self.report();
        self.post(WorkerEvent::Done(report));
    }

    fn keeps_running(&self) -> bool {
        self.iterations < self.config.max_iterations as u64
            && self.temperature >= self.config.min_temperature
            && self.countdown.is_time_remaining()
    }

    fn run_batch(&mut self) {
        for _ in 0..self.config.batch_size {
            if !(self.iterations < self.config.max_iterations as u64
                && self.temperature >= self.config.min_temperature)
            {
                break;
            }
            self.anneal_once();
            self.temperature *= self.config.cooling_rate;
            self.iterations += 1;
        }
    }

    fn anneal_once(&mut self) {
        let candidate =
            match neighborhood::mutate(self.current.routes(), &mut self.rng, &self.config.operator_weights)
            {
                Some(routes) => Plan::from_routes(self.problem, self.mats, routes),
                None => return,
            };
        // infeasible candidates carry infinite energy and are never accepted
        let candidate = match candidate {
            Some(plan) => plan,
            None => return,
        };

        let energy = candidate.energy(self.objective);
        let delta = energy - self.current_energy;
        if delta < 0.0 || self.rng.gen::<f64>() < (-delta / self.temperature).exp() {
            self.current = candidate;
            self.current_energy = energy;
            if energy < self.best_energy {
                self.best = self.current.clone();
                self.best_energy = energy;
            }
        }
    }

    fn drain_influences(&mut self) {
        while let Ok(influence) = self.influence_rx.try_recv() {
            self.absorb(influence);
        }
    }

    fn absorb(&mut self, influence: Influence) {
        if influence.energy >= self.current_energy {
            return;
        }
        self.current = influence.plan;
        self.current_energy = influence.energy;
        if self.current_energy < self.best_energy {
            self.best = self.current.clone();
            self.best_energy = self.current_energy;
        }

        // perturb the adopted solution so the ring does not collapse onto
        // identical chains
        if let Some(routes) =
            neighborhood::mutate(self.current.routes(), &mut self.rng, &self.config.operator_weights)
        {
            if let Some(plan) = Plan::from_routes(self.problem, self.mats, routes) {
                self.current_energy = plan.energy(self.objective);
                self.current = plan;
                if self.current_energy < self.best_energy {
                    self.best = self.current.clone();
                    self.best_energy = self.current_energy;
                }
            }
        }

        self.temperature = self.temperature.max(REHEAT_TEMPERATURE);
        debug!(
            "worker {} adopted influence at energy {}, reheated to {}",
            self.id, self.current_energy, self.temperature
        );
    }

    fn report(&self) -> WorkerReport {
        WorkerReport {
            energy: self.best_energy,
            plan: self.best.clone(),
            iterations: self.iterations,
        }
    }

    fn post(&self, event: WorkerEvent) {
        // the coordinator outlives the workers; a send failure means it is
        // already tearing down and the event can be dropped
        let _ = self.event_tx.send((self.id, event));
    }
}
