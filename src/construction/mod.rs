use log::debug;
use rand::seq::SliceRandom;

use crate::problem::matrices::DistanceMatrices;
use crate::problem::Problem;
use crate::solution::plan::{simulate_route, Plan, RouteCost};
use crate::solution::{Objective, RouteStop};
use crate::utils::Random;

/// Fixed bias that steers empty-distance insertions towards vehicles already
/// near the pickup.
pub const RADIAL_BIAS: f64 = 0.4;

struct SlotInsertion {
    v_idx: usize,
    stops: Vec<RouteStop>,
    route_cost: RouteCost,
    cost: f64,
}

/// Greedy cheapest-insertion over a randomly shuffled order sequence; the
/// shuffle seed is the caller's, so parallel invocations diversify naturally.
pub struct CheapestInsertion<'a> {
    problem: &'a Problem,
    mats: &'a DistanceMatrices,
    objective: Objective,
}

impl<'a> CheapestInsertion<'a> {
    pub fn new(problem: &'a Problem, mats: &'a DistanceMatrices, objective: Objective) -> Self {
        Self {
            problem,
            mats,
            objective,
        }
    }

    pub fn construct(&self, rng: &mut Random) -> Plan {
        let mut plan = Plan::empty(self.problem);
        let mut order_indices: Vec<usize> = (0..self.problem.num_orders()).collect();
        order_indices.shuffle(rng);

        for o_idx in order_indices {
            match self.find_best_slot(&plan, o_idx) {
                Some(slot) => plan.replace_route(slot.v_idx, slot.stops, slot.route_cost),
                None => debug!(
                    "order {} has no feasible insertion slot, left unassigned",
                    self.problem.orders[o_idx].id
                ),
            }
        }
        plan
    }

    /// Scans every (vehicle, pickup index, delivery index) slot; the first
    /// strictly cheapest feasible slot wins.
    fn find_best_slot(&self, plan: &Plan, o_idx: usize) -> Option<SlotInsertion> {
        let order_id = self.problem.orders[o_idx].id;
        let mut best: Option<SlotInsertion> = None;

        for v_idx in 0..self.problem.num_vehicles() {
            let route = plan.route(v_idx);
            let current = plan.route_cost(v_idx);
            for i in 0..=route.len() {
                for j in (i + 1)..=(route.len() + 1) {
                    let mut stops = route.to_vec();
                    stops.insert(i, RouteStop::pickup(order_id));
                    stops.insert(j, RouteStop::delivery(order_id));

                    let route_cost = match simulate_route(self.problem, self.mats, v_idx, &stops)
                    {
                        Some(cost) => cost,
                        None => continue,
                    };
                    let cost = self.slot_cost(v_idx, o_idx, current, route_cost);
                    if best.as_ref().map_or(true, |b| cost < b.cost) {
                        best = Some(SlotInsertion {
                            v_idx,
                            stops,
                            route_cost,
                            cost,
                        });
                    }
                }
            }
        }
        best
    }

    fn slot_cost(&self, v_idx: usize, o_idx: usize, before: RouteCost, after: RouteCost) -> f64 {
        match self.objective {
            Objective::Distance => after.distance - before.distance,
            Objective::Price => {
                (after.distance - before.distance) * self.problem.vehicles[v_idx].price_km
            }
            Objective::Empty => {
                (after.empty - before.empty) + RADIAL_BIAS * self.mats.start_distance(v_idx, o_idx)
            }
        }
    }
}
