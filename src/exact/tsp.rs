use tinyvec::ArrayVec;

use crate::problem::matrices::DistanceMatrices;
use crate::problem::Problem;
use crate::solution::plan::CAPACITY_TOLERANCE;

use super::SearchContext;

/// Node sequence of one candidate route; 14 nodes at most under the size
/// guard, so a fixed inline buffer suffices.
pub(crate) type NodePath = ArrayVec<[u8; 16]>;

#[derive(Clone, Copy, Debug)]
pub(crate) struct TspRoute {
    pub path: NodePath,
    pub distance: f64,
    pub empty: f64,
    pub price: f64,
}

/// Optimal routes of one (vehicle, order-subset) subproblem, one per
/// objective.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SubsetRoutes {
    pub by_distance: TspRoute,
    pub by_empty: TspRoute,
    pub by_price: TspRoute,
}

impl SubsetRoutes {
    fn unexplored() -> Self {
        let inf = TspRoute {
            path: NodePath::default(),
            distance: f64::INFINITY,
            empty: f64::INFINITY,
            price: f64::INFINITY,
        };
        Self {
            by_distance: inf,
            by_empty: inf,
            by_price: inf,
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) enum MemoEntry {
    Unsolved,
    Infeasible,
    Solved(SubsetRoutes),
}

/// Held-Karp-style cache lookup: each (vehicle, subset) pair is enumerated at
/// most once across the whole branch-and-bound.
pub(crate) fn solve_subset(
    ctx: &mut SearchContext,
    vehicle_idx: usize,
    target_mask: u32,
) -> Option<SubsetRoutes> {
    let cache_idx = (vehicle_idx << ctx.n_orders) | target_mask as usize;
    match ctx.memo[cache_idx] {
        MemoEntry::Solved(routes) => return Some(routes),
        MemoEntry::Infeasible => return None,
        MemoEntry::Unsolved => {}
    }

    let best = {
        let mut search = SubsetSearch {
            problem: ctx.problem,
            mats: &ctx.mats,
            vehicle_idx,
            price_km: ctx.problem.vehicles[vehicle_idx].price_km,
            target_mask,
            max_total_distance: ctx.max_total_distance,
            path: NodePath::default(),
            best: SubsetRoutes::unexplored(),
        };
        search.dfs(None, LegState::default(), 0, 0);
        search.best
    };

    if best.by_distance.distance.is_finite() {
        ctx.memo[cache_idx] = MemoEntry::Solved(best);
        Some(best)
    } else {
        ctx.memo[cache_idx] = MemoEntry::Infeasible;
        None
    }
}

#[derive(Clone, Copy, Default)]
struct LegState {
    distance: f64,
    empty: f64,
    price: f64,
    load: f64,
}

struct SubsetSearch<'a> {
    problem: &'a Problem,
    mats: &'a DistanceMatrices,
    vehicle_idx: usize,
    price_km: f64,
    target_mask: u32,
    max_total_distance: Option<f64>,
    path: NodePath,
    best: SubsetRoutes,
}

impl SubsetSearch<'_> {
    fn dfs(&mut self, last: Option<usize>, cur: LegState, picked: u32, delivered: u32) {
        if cur.distance >= self.best.by_distance.distance
            && cur.empty >= self.best.by_empty.empty
            && cur.price >= self.best.by_price.price
        {
            return;
        }

        if delivered == self.target_mask {
            let snapshot = TspRoute {
                path: self.path,
                distance: cur.distance,
                empty: cur.empty,
                price: cur.price,
            };
            if cur.distance < self.best.by_distance.distance {
                self.best.by_distance = snapshot;
            }
            if cur.empty < self.best.by_empty.empty {
                self.best.by_empty = snapshot;
            }
            if cur.price < self.best.by_price.price {
                self.best.by_price = snapshot;
            }
            return;
        }

        for o_idx in 0..self.problem.num_orders() {
            let bit = 1u32 << o_idx;
            if self.target_mask & bit == 0 {
                continue;
            }

            if picked & bit == 0 {
                let add_load = self.problem.orders[o_idx].normalized_load();
                if cur.load + add_load > 1.0 + CAPACITY_TOLERANCE {
                    continue;
                }
                let leg = match last {
                    None => self.mats.start_distance(self.vehicle_idx, o_idx),
                    Some(prev) => self
                        .mats
                        .node_distance(prev, DistanceMatrices::pickup_node(o_idx)),
                };
                let distance = cur.distance + leg;
                if self.exceeds_max_distance(distance) {
                    continue;
                }
                // the vehicle is unladen iff everything picked up so far is delivered
                let add_empty = if picked == delivered { leg } else { 0.0 };
                let node = DistanceMatrices::pickup_node(o_idx);
                self.path.push(node as u8);
                self.dfs(
                    Some(node),
                    LegState {
                        distance,
                        empty: cur.empty + add_empty,
                        price: cur.price + leg * self.price_km,
                        load: cur.load + add_load,
                    },
                    picked | bit,
                    delivered,
                );
                self.path.pop();
            } else if delivered & bit == 0 {
                let prev = match last {
                    Some(prev) => prev,
                    None => continue,
                };
                let node = DistanceMatrices::delivery_node(o_idx);
                let leg = self.mats.node_distance(prev, node);
                let distance = cur.distance + leg;
                if self.exceeds_max_distance(distance) {
                    continue;
                }
                self.path.push(node as u8);
                self.dfs(
                    Some(node),
                    LegState {
                        distance,
                        empty: cur.empty,
                        price: cur.price + leg * self.price_km,
                        load: cur.load - self.problem.orders[o_idx].normalized_load(),
                    },
                    picked,
                    delivered | bit,
                );
                self.path.pop();
            }
        }
    }

    fn exceeds_max_distance(&self, distance: f64) -> bool {
        match self.max_total_distance {
            Some(max) => distance > max,
            None => false,
        }
    }
}
