use fixedbitset::FixedBitSet;

use crate::problem::matrices::DistanceMatrices;
use crate::problem::Problem;

use super::{Objective, ProblemSolution, RouteStop, SolutionMetrics, StopKind, VehicleRoute};

/// Load-ceiling comparison slack.
pub const CAPACITY_TOLERANCE: f64 = 1e-6;
/// A vehicle carrying less than this is treated as unladen.
pub const UNLADEN_TOLERANCE: f64 = 0.001;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RouteCost {
    pub distance: f64,
    pub empty: f64,
    pub price: f64,
}

impl RouteCost {
    pub fn accumulate(&mut self, other: RouteCost) {
        self.distance += other.distance;
        self.empty += other.empty;
        self.price += other.price;
    }
}

/// Replays a stop sequence for one vehicle over the distance tables.
///
/// Returns `None` when the sequence breaks a route invariant: a delivery
/// before its pickup, a duplicate stop, a load above the 1.0 ceiling, or a
/// picked-up order that is never delivered.
pub fn simulate_route(
    problem: &Problem,
    mats: &DistanceMatrices,
    v_idx: usize,
    stops: &[RouteStop],
) -> Option<RouteCost> {
    let num_orders = problem.num_orders();
    let mut picked = FixedBitSet::with_capacity(num_orders);
    let mut delivered = FixedBitSet::with_capacity(num_orders);

    let mut load = 0.0;
    let mut distance = 0.0;
    let mut empty = 0.0;
    let mut last: Option<usize> = None;

    for stop in stops {
        let o_idx = problem.order_position(stop.order_id)?;
        match stop.kind {
            StopKind::Pickup => {
                if picked.contains(o_idx) {
                    return None;
                }
                let add_load = problem.orders[o_idx].normalized_load();
                if load + add_load > 1.0 + CAPACITY_TOLERANCE {
                    return None;
                }
                let leg = match last {
                    None => mats.start_distance(v_idx, o_idx),
                    Some(prev) => mats.node_distance(prev, DistanceMatrices::pickup_node(o_idx)),
                };
                if load <= UNLADEN_TOLERANCE {
                    empty += leg;
                }
                distance += leg;
                load += add_load;
                picked.insert(o_idx);
                last = Some(DistanceMatrices::pickup_node(o_idx));
            }
            StopKind::Delivery => {
                if !picked.contains(o_idx) || delivered.contains(o_idx) {
                    return None;
                }
                let prev = last?;
                let leg = mats.node_distance(prev, DistanceMatrices::delivery_node(o_idx));
                if load <= UNLADEN_TOLERANCE {
                    empty += leg;
                }
                distance += leg;
                load -= problem.orders[o_idx].normalized_load();
                delivered.insert(o_idx);
                last = Some(DistanceMatrices::delivery_node(o_idx));
            }
        }
    }

    if picked != delivered {
        return None;
    }

    Some(RouteCost {
        distance,
        empty,
        price: distance * problem.vehicles[v_idx].price_km,
    })
}

/// Working solution representation: one stop sequence per vehicle (indexed by
/// vehicle position in the problem) with cached per-route aggregates.
#[derive(Clone, Debug)]
pub struct Plan {
    routes: Vec<Vec<RouteStop>>,
    costs: Vec<RouteCost>,
}

impl Plan {
    pub fn empty(problem: &Problem) -> Self {
        Self {
            routes: vec![Vec::new(); problem.num_vehicles()],
            costs: vec![RouteCost::default(); problem.num_vehicles()],
        }
    }

    /// Evaluates a candidate stop assignment from scratch. `None` when any
    /// route is infeasible or an order appears in more than one route.
    pub fn from_routes(
        problem: &Problem,
        mats: &DistanceMatrices,
        routes: Vec<Vec<RouteStop>>,
    ) -> Option<Self> {
        let mut seen = FixedBitSet::with_capacity(problem.num_orders());
        for route in &routes {
            for stop in route {
                if stop.kind.is_pickup() {
                    let o_idx = problem.order_position(stop.order_id)?;
                    if seen.contains(o_idx) {
                        return None;
                    }
                    seen.insert(o_idx);
                }
            }
        }

        let mut costs = Vec::with_capacity(routes.len());
        for (v_idx, route) in routes.iter().enumerate() {
            costs.push(simulate_route(problem, mats, v_idx, route)?);
        }
        Some(Self { routes, costs })
    }

    pub fn routes(&self) -> &[Vec<RouteStop>] {
        &self.routes
    }

    pub fn route(&self, v_idx: usize) -> &[RouteStop] {
        &self.routes[v_idx]
    }

    pub fn route_cost(&self, v_idx: usize) -> RouteCost {
        self.costs[v_idx]
    }

    /// Swaps in a route whose cost has already been simulated.
    pub fn replace_route(&mut self, v_idx: usize, stops: Vec<RouteStop>, cost: RouteCost) {
        self.routes[v_idx] = stops;
        self.costs[v_idx] = cost;
    }

    pub fn total(&self) -> RouteCost {
        let mut total = RouteCost::default();
        for cost in &self.costs {
            total.accumulate(*cost);
        }
        total
    }

    pub fn energy(&self, objective: Objective) -> f64 {
        let total = self.total();
        match objective {
            Objective::Distance => total.distance,
            Objective::Price => total.price,
            Objective::Empty => total.empty,
        }
    }

    pub fn metrics(&self) -> SolutionMetrics {
        let total = self.total();
        SolutionMetrics {
            total_distance: total.distance,
            total_price: total.price,
            empty_distance: total.empty,
        }
    }

    pub fn is_assigned(&self, order_id: u32) -> bool {
        self.routes
            .iter()
            .flatten()
            .any(|stop| stop.order_id == order_id && stop.kind.is_pickup())
    }

    pub fn num_assigned(&self) -> usize {
        self.routes
            .iter()
            .flatten()
            .filter(|stop| stop.kind.is_pickup())
            .count()
    }

    /// Every vehicle receives an entry, empty routes included.
    pub fn to_problem_solution(&self, problem: &Problem) -> ProblemSolution {
        let mut solution = ProblemSolution::default();
        for (v_idx, vehicle) in problem.vehicles.iter().enumerate() {
            let cost = self.costs[v_idx];
            solution.total_distance += cost.distance;
            solution.empty_distance += cost.empty;
            solution.total_price += cost.price;
            solution.routes.insert(
                vehicle.id,
                VehicleRoute {
                    stops: self.routes[v_idx].clone(),
                    total_distance: cost.distance,
                    empty_distance: cost.empty,
                    total_price: cost.price,
                },
            );
        }
        solution
    }
}
