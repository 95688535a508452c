use fixedbitset::FixedBitSet;

use crate::problem::matrices::DistanceMatrices;
use crate::problem::Problem;
use crate::solution::plan::{CAPACITY_TOLERANCE, UNLADEN_TOLERANCE};
use crate::solution::{ProblemSolution, SolutionMetrics, StopKind};

const AGGREGATE_TOLERANCE: f64 = 1e-6;

#[derive(Debug)]
pub enum Violation {
    Precedence(u32),
    Capacity(f64),
    MaxDistance(f64),
    UnknownVehicle(u32),
    UnknownOrder(u32),
    DuplicateAssignment(u32),
    MissingOrder(u32),
}

#[derive(Debug)]
pub enum ValidatorResult {
    Valid(SolutionMetrics),
    ConstraintViolation(Violation),
    AggregateMismatch(f64),
}

impl ValidatorResult {
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Valid(_) => true,
            _ => false,
        }
    }

    pub fn assert_valid(&self) {
        match self {
            Self::Valid(_) => {}
            Self::ConstraintViolation(violation) => {
                panic!("{:?}", violation)
            }
            Self::AggregateMismatch(delta) => {
                panic!("AggregateMismatch({})", delta)
            }
        }
    }
}

/// Recomputes every route of a solution over the distance tables and checks
/// the route invariants, the per-route aggregates, and the solution sums.
///
/// `require_all_assigned` distinguishes exact-solver output (all orders
/// routed) from heuristic output (orders may remain unassigned).
pub fn validate_solution(
    problem: &Problem,
    mats: &DistanceMatrices,
    solution: &ProblemSolution,
    require_all_assigned: bool,
) -> ValidatorResult {
    use ValidatorResult::*;
    use Violation::*;

    let mut assigned = FixedBitSet::with_capacity(problem.num_orders());
    let mut sums = SolutionMetrics {
        total_distance: 0.0,
        total_price: 0.0,
        empty_distance: 0.0,
    };

    for (vehicle_id, route) in &solution.routes {
        let v_idx = match problem.vehicles.iter().position(|v| v.id == *vehicle_id) {
            Some(idx) => idx,
            None => return ConstraintViolation(UnknownVehicle(*vehicle_id)),
        };

        let mut picked = FixedBitSet::with_capacity(problem.num_orders());
        let mut delivered = FixedBitSet::with_capacity(problem.num_orders());
        let mut load = 0.0;
        let mut distance = 0.0;
        let mut empty = 0.0;
        let mut last: Option<usize> = None;

        for stop in &route.stops {
            let o_idx = match problem.order_position(stop.order_id) {
                Some(idx) => idx,
                None => return ConstraintViolation(UnknownOrder(stop.order_id)),
            };
            match stop.kind {
                StopKind::Pickup => {
                    if picked.contains(o_idx) || assigned.contains(o_idx) {
                        return ConstraintViolation(DuplicateAssignment(stop.order_id));
                    }
                    assigned.insert(o_idx);
                    picked.insert(o_idx);
                    load += problem.orders[o_idx].normalized_load();
                    if load > 1.0 + CAPACITY_TOLERANCE {
                        return ConstraintViolation(Capacity(load));
                    }
                    let leg = match last {
                        None => mats.start_distance(v_idx, o_idx),
                        Some(prev) => {
                            mats.node_distance(prev, DistanceMatrices::pickup_node(o_idx))
                        }
                    };
                    if load - problem.orders[o_idx].normalized_load() <= UNLADEN_TOLERANCE {
                        empty += leg;
                    }
                    distance += leg;
                    last = Some(DistanceMatrices::pickup_node(o_idx));
                }
                StopKind::Delivery => {
                    if !picked.contains(o_idx) || delivered.contains(o_idx) {
                        return ConstraintViolation(Precedence(stop.order_id));
                    }
                    delivered.insert(o_idx);
                    let prev = match last {
                        Some(prev) => prev,
                        None => return ConstraintViolation(Precedence(stop.order_id)),
                    };
                    let leg = mats.node_distance(prev, DistanceMatrices::delivery_node(o_idx));
                    if load <= UNLADEN_TOLERANCE {
                        empty += leg;
                    }
                    distance += leg;
                    load -= problem.orders[o_idx].normalized_load();
                    last = Some(DistanceMatrices::delivery_node(o_idx));
                }
            }
        }

        if picked.difference(&delivered).count() > 0 {
            return ConstraintViolation(Precedence(*vehicle_id));
        }
        if load.abs() > CAPACITY_TOLERANCE {
            return ConstraintViolation(Capacity(load));
        }
        if let Some(max) = problem.max_total_distance() {
            if distance > max + AGGREGATE_TOLERANCE {
                return ConstraintViolation(MaxDistance(distance - max));
            }
        }

        let price = distance * problem.vehicles[v_idx].price_km;
        if (route.total_distance - distance).abs() > AGGREGATE_TOLERANCE
            || (route.empty_distance - empty).abs() > AGGREGATE_TOLERANCE
            || (route.total_price - price).abs() > AGGREGATE_TOLERANCE
            || route.empty_distance > route.total_distance + AGGREGATE_TOLERANCE
        {
            return AggregateMismatch(route.total_distance - distance);
        }

        sums.total_distance += distance;
        sums.empty_distance += empty;
        sums.total_price += price;
    }

    if require_all_assigned {
        for o_idx in 0..problem.num_orders() {
            if !assigned.contains(o_idx) {
                return ConstraintViolation(MissingOrder(problem.orders[o_idx].id));
            }
        }
    }

    if (solution.total_distance - sums.total_distance).abs() > AGGREGATE_TOLERANCE
        || (solution.empty_distance - sums.empty_distance).abs() > AGGREGATE_TOLERANCE
        || (solution.total_price - sums.total_price).abs() > AGGREGATE_TOLERANCE
    {
        return AggregateMismatch(solution.total_distance - sums.total_distance);
    }

    Valid(sums)
}

pub fn assert_valid_solution(
    problem: &Problem,
    mats: &DistanceMatrices,
    solution: &ProblemSolution,
    require_all_assigned: bool,
) {
    validate_solution(problem, mats, solution, require_all_assigned).assert_valid()
}
