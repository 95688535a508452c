use std::fmt;

use log::debug;

use crate::problem::matrices::DistanceMatrices;
use crate::problem::metric::DistanceMetric;
use crate::problem::Problem;
use crate::solution::{AlgorithmSolution, Objective, ProblemSolution, RouteStop, VehicleRoute};

mod tsp;

use tsp::{solve_subset, MemoEntry, TspRoute};

/// Both problem dimensions are capped; the memo table and the mask arithmetic
/// rely on it.
pub const MAX_EXACT_DIMENSION: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProblemTooLarge {
    pub vehicles: usize,
    pub orders: usize,
}

impl fmt::Display for ProblemTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "problem exceeds the exact solver limit of {MAX_EXACT_DIMENSION}x{MAX_EXACT_DIMENSION} \
             ({} vehicles, {} orders)",
            self.vehicles, self.orders
        )
    }
}

impl std::error::Error for ProblemTooLarge {}

/// Enumerates every vehicle/order partition and returns provably optimal
/// routes for all three objectives at once.
pub fn solve(
    problem: &Problem,
    metric: &dyn DistanceMetric,
) -> Result<AlgorithmSolution, ProblemTooLarge> {
    if problem.num_vehicles() > MAX_EXACT_DIMENSION || problem.num_orders() > MAX_EXACT_DIMENSION {
        return Err(ProblemTooLarge {
            vehicles: problem.num_vehicles(),
            orders: problem.num_orders(),
        });
    }

    let mut ctx = SearchContext::new(problem, metric);
    let mut assignments = vec![0u32; problem.num_vehicles()];
    assign_orders(&mut ctx, 0, 0, Totals::default(), &mut assignments);

    debug!(
        "exact search done: best distance {}, best price {}, best empty {}",
        ctx.best_distance.value, ctx.best_price.value, ctx.best_empty.value
    );

    let best_distance = ctx.best_distance.clone();
    let best_price = ctx.best_price.clone();
    let best_empty = ctx.best_empty.clone();

    Ok(AlgorithmSolution {
        best_distance_solution: reconstruct(&mut ctx, &best_distance, Objective::Distance),
        best_price_solution: reconstruct(&mut ctx, &best_price, Objective::Price),
        best_empty_solution: reconstruct(&mut ctx, &best_empty, Objective::Empty),
    })
}

pub(crate) struct SearchContext<'a> {
    pub problem: &'a Problem,
    pub mats: DistanceMatrices,
    pub max_total_distance: Option<f64>,
    pub memo: Vec<MemoEntry>,
    pub n_orders: usize,
    pub full_mask: u32,
    best_distance: Incumbent,
    best_price: Incumbent,
    best_empty: Incumbent,
}

#[derive(Clone)]
struct Incumbent {
    value: f64,
    assignments: Vec<u32>,
}

impl Incumbent {
    fn new(num_vehicles: usize) -> Self {
        Self {
            value: f64::INFINITY,
            assignments: vec![0; num_vehicles],
        }
    }
}

impl<'a> SearchContext<'a> {
    fn new(problem: &'a Problem, metric: &dyn DistanceMetric) -> Self {
        let n_orders = problem.num_orders();
        Self {
            problem,
            mats: DistanceMatrices::build(problem, metric),
            max_total_distance: problem.max_total_distance(),
            memo: vec![MemoEntry::Unsolved; problem.num_vehicles() << n_orders],
            n_orders,
            full_mask: (1u32 << n_orders) - 1,
            best_distance: Incumbent::new(problem.num_vehicles()),
            best_price: Incumbent::new(problem.num_vehicles()),
            best_empty: Incumbent::new(problem.num_vehicles()),
        }
    }
}

#[derive(Clone, Copy, Default)]
struct Totals {
    distance: f64,
    price: f64,
    empty: f64,
}

/// Nonempty submasks of `mask` in descending order via `sub = (sub - 1) & mask`.
pub(crate) fn submasks(mask: u32) -> Submasks {
    Submasks { mask, next: mask }
}

pub(crate) struct Submasks {
    mask: u32,
    next: u32,
}

impl Iterator for Submasks {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next == 0 {
            return None;
        }
        let current = self.next;
        self.next = (current - 1) & self.mask;
        Some(current)
    }
}

fn assign_orders(
    ctx: &mut SearchContext,
    vehicle_idx: usize,
    assigned_mask: u32,
    acc: Totals,
    assignments: &mut Vec<u32>,
) {
    if acc.distance >= ctx.best_distance.value
        && acc.price >= ctx.best_price.value
        && acc.empty >= ctx.best_empty.value
    {
        return;
    }

    if assigned_mask == ctx.full_mask {
        if acc.distance < ctx.best_distance.value {
            ctx.best_distance.value = acc.distance;
            ctx.best_distance.assignments.copy_from_slice(assignments);
        }
        if acc.price < ctx.best_price.value {
            ctx.best_price.value = acc.price;
            ctx.best_price.assignments.copy_from_slice(assignments);
        }
        if acc.empty < ctx.best_empty.value {
            ctx.best_empty.value = acc.empty;
            ctx.best_empty.assignments.copy_from_slice(assignments);
        }
        return;
    }

    if vehicle_idx >= ctx.problem.num_vehicles() {
        return;
    }

    let remaining = ctx.full_mask ^ assigned_mask;
    for sub in submasks(remaining) {
        if let Some(routes) = solve_subset(ctx, vehicle_idx, sub) {
            assignments[vehicle_idx] = sub;
            assign_orders(
                ctx,
                vehicle_idx + 1,
                assigned_mask | sub,
                Totals {
                    distance: acc.distance + routes.by_distance.distance,
                    price: acc.price + routes.by_price.price,
                    empty: acc.empty + routes.by_empty.empty,
                },
                assignments,
            );
            assignments[vehicle_idx] = 0;
        }
    }

    // this vehicle takes no orders
    assign_orders(ctx, vehicle_idx + 1, assigned_mask, acc, assignments);
}

fn reconstruct(
    ctx: &mut SearchContext,
    incumbent: &Incumbent,
    objective: Objective,
) -> ProblemSolution {
    if incumbent.value.is_infinite() {
        return ProblemSolution::infeasible();
    }

    let mut solution = ProblemSolution::default();
    for (v_idx, &mask) in incumbent.assignments.iter().enumerate() {
        if mask == 0 {
            continue;
        }
        // memo hit; the assignment was proven feasible during the search
        let routes = match solve_subset(ctx, v_idx, mask) {
            Some(routes) => routes,
            None => continue,
        };
        let chosen: TspRoute = match objective {
            Objective::Distance => routes.by_distance,
            Objective::Price => routes.by_price,
            Objective::Empty => routes.by_empty,
        };

        let stops = chosen
            .path
            .iter()
            .map(|&node| {
                let order_id = ctx.problem.orders[(node / 2) as usize].id;
                if node % 2 == 0 {
                    RouteStop::pickup(order_id)
                } else {
                    RouteStop::delivery(order_id)
                }
            })
            .collect();

        let route = VehicleRoute {
            stops,
            total_distance: chosen.distance,
            empty_distance: chosen.empty,
            total_price: chosen.price,
        };
        solution.total_distance += route.total_distance;
        solution.empty_distance += route.empty_distance;
        solution.total_price += route.total_price;
        solution
            .routes
            .insert(ctx.problem.vehicles[v_idx].id, route);
    }
    solution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::metric::Euclidean;
    use crate::problem::{Constraints, Location, Order, Vehicle};
    use crate::solution::StopKind;
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
            load_factor: 1.0,
        }
    }

    #[test]
    fn submask_iteration_yields_all_nonempty_subsets() {
        let collected: Vec<u32> = submasks(0b1111 & !0b0101).collect();
        assert_eq!(collected, vec![0b1010, 0b1000, 0b0010]);
        for sub in &collected {
            assert_eq!(sub & 0b0101, 0);
        }
    }

    #[test]
    fn submask_count_is_two_to_the_k_minus_one() {
        for mask in [0b1u32, 0b11, 0b111, 0b1111111] {
            let k = mask.count_ones();
            let collected: Vec<u32> = submasks(mask).collect();
            assert_eq!(collected.len(), (1usize << k) - 1);
            let mut deduped = collected.clone();
            deduped.sort_unstable();
            deduped.dedup();
            assert_eq!(deduped.len(), collected.len());
            assert!(collected.iter().all(|sub| sub & !mask == 0));
        }
    }

    #[test]
    fn single_order_single_vehicle() {
        let problem = Problem::new(
            vec![vehicle(1, (0.0, 0.0), 2.0)],
            vec![order(1, (0.0, 0.0), (3.0, 4.0))],
            None,
        )
        .unwrap();
        let solution = solve(&problem, &Euclidean).unwrap();

        let best = &solution.best_distance_solution;
        assert!((best.total_distance - 5.0).abs() < 1e-9);
        assert!(best.empty_distance.abs() < 1e-9);
        assert!((best.total_price - 10.0).abs() < 1e-9);
        let route = &best.routes[&1];
        assert_eq!(route.stops.len(), 2);
        assert_eq!(route.stops[0].kind, StopKind::Pickup);
        assert_eq!(route.stops[1].kind, StopKind::Delivery);
    }

    #[test]
    fn disjoint_regions_split_between_vehicles() {
        let problem = Problem::new(
            vec![vehicle(1, (0.0, 0.0), 1.0), vehicle(2, (100.0, 0.0), 1.0)],
            vec![
                order(1, (5.0, 0.0), (5.0, 5.0)),
                order(2, (105.0, 0.0), (105.0, 5.0)),
            ],
            None,
        )
        .unwrap();
        let solution = solve(&problem, &Euclidean).unwrap();

        let best = &solution.best_distance_solution;
        assert!((best.total_distance - 20.0).abs() < 1e-9);
        assert_eq!(best.routes.len(), 2);
        assert_eq!(best.routes[&1].stops[0].order_id, 1);
        assert_eq!(best.routes[&2].stops[0].order_id, 2);
    }

    #[test]
    fn price_and_distance_objectives_disagree() {
        let problem = Problem::new(
            vec![vehicle(1, (0.0, 0.0), 10.0), vehicle(2, (50.0, 0.0), 1.0)],
            vec![order(1, (5.0, 0.0), (10.0, 0.0))],
            None,
        )
        .unwrap();
        let solution = solve(&problem, &Euclidean).unwrap();

        // closest vehicle wins on distance: 5 km approach + 5 km laden
        let by_distance = &solution.best_distance_solution;
        assert!((by_distance.total_distance - 10.0).abs() < 1e-9);
        assert!(by_distance.routes.contains_key(&1));
        assert!(!by_distance.routes.contains_key(&2));

        // the cheap vehicle wins on price despite the long approach
        let by_price = &solution.best_price_solution;
        assert!((by_price.total_distance - 50.0).abs() < 1e-9);
        assert!((by_price.total_price - 50.0).abs() < 1e-9);
        assert!(by_price.routes.contains_key(&2));
        assert!(!by_price.routes.contains_key(&1));
    }

    #[test]
    fn size_guard_rejects_oversized_problems() {
        let vehicles: Vec<Vehicle> = (0..8).map(|i| vehicle(i, (0.0, 0.0), 1.0)).collect();
        let problem = Problem::new(
            vehicles,
            vec![order(1, (0.0, 0.0), (1.0, 0.0))],
            None,
        )
        .unwrap();
        assert_eq!(
            solve(&problem, &Euclidean).unwrap_err(),
            ProblemTooLarge {
                vehicles: 8,
                orders: 1
            }
        );

        let orders: Vec<Order> = (0..8).map(|i| order(i, (0.0, 0.0), (1.0, 0.0))).collect();
        let problem = Problem::new(vec![vehicle(1, (0.0, 0.0), 1.0)], orders, None).unwrap();
        assert!(solve(&problem, &Euclidean).is_err());
    }

    #[test]
    fn unreachable_distance_cap_yields_infeasible_sentinels() {
        let problem = Problem::new(
            vec![vehicle(1, (0.0, 0.0), 1.0)],
            vec![order(1, (5.0, 0.0), (10.0, 0.0))],
            Some(Constraints {
                max_total_distance: 1.0,
            }),
        )
        .unwrap();
        let solution = solve(&problem, &Euclidean).unwrap();
        assert!(!solution.best_distance_solution.is_feasible());
        assert!(!solution.best_price_solution.is_feasible());
        assert!(!solution.best_empty_solution.is_feasible());
    }

    #[test]
    fn optimal_solutions_pass_validation() {
        let problem = Problem::new(
            vec![vehicle(1, (0.0, 0.0), 2.0), vehicle(2, (10.0, 10.0), 1.0)],
            vec![
                order(1, (1.0, 0.0), (4.0, 0.0)),
                order(2, (9.0, 9.0), (2.0, 2.0)),
                order(3, (0.0, 2.0), (0.0, 6.0)),
            ],
            None,
        )
        .unwrap();
        let mats = DistanceMatrices::build(&problem, &Euclidean);
        let solution = solve(&problem, &Euclidean).unwrap();
        for best in [
            &solution.best_distance_solution,
            &solution.best_price_solution,
            &solution.best_empty_solution,
        ] {
            match validate_solution(&problem, &mats, best, true) {
                ValidatorResult::Valid(_) => {}
                other => panic!("expected valid solution, got {:?}", other),
            }
        }
    }

    #[test]
    fn objectives_are_mutually_consistent() {
        // the distance-optimal total can never beat the distance of the
        // distance solution under any other objective
        let problem = Problem::new(
            vec![vehicle(1, (0.0, 0.0), 3.0), vehicle(2, (20.0, 0.0), 1.0)],
            vec![
                order(1, (2.0, 0.0), (6.0, 0.0)),
                order(2, (18.0, 0.0), (14.0, 0.0)),
            ],
            None,
        )
        .unwrap();
        let solution = solve(&problem, &Euclidean).unwrap();
        assert!(
            solution.best_distance_solution.total_distance
                <= solution.best_price_solution.total_distance + 1e-9
        );
        assert!(
            solution.best_distance_solution.total_distance
                <= solution.best_empty_solution.total_distance + 1e-9
        );
        assert!(
            solution.best_price_solution.total_price
                <= solution.best_distance_solution.total_price + 1e-9
        );
    }
}
