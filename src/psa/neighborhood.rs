use rand::seq::SliceRandom;
use rand::Rng;

use crate::solution::RouteStop;
use crate::utils::Random;

#[derive(Clone, Copy, Debug)]
pub struct OperatorWeights {
    pub shift: f64,
    pub swap: f64,
    pub shuffle: f64,
}

impl Default for OperatorWeights {
    fn default() -> Self {
        Self {
            shift: 0.4,
            swap: 0.3,
            shuffle: 0.3,
        }
    }
}

const SWAP_DISTINCT_RETRIES: usize = 5;
const SHUFFLE_MIN_STOPS: usize = 4;

/// Produces a candidate stop assignment one mutation away from `routes`, or
/// `None` when the drawn operator's precondition cannot be met.
pub fn mutate(
    routes: &[Vec<RouteStop>],
    rng: &mut Random,
    weights: &OperatorWeights,
) -> Option<Vec<Vec<RouteStop>>> {
    let total = weights.shift + weights.swap + weights.shuffle;
    let draw = rng.gen_range(0.0..total);
    if draw < weights.shift {
        shift(routes, rng)
    } else if draw < weights.shift + weights.swap {
        swap(routes, rng)
    } else {
        intra_shuffle(routes, rng)
    }
}

/// Moves one order (both stops) from its route to a random position in any
/// route, the source route included.
fn shift(routes: &[Vec<RouteStop>], rng: &mut Random) -> Option<Vec<Vec<RouteStop>>> {
    let from = pick_nonempty(routes, rng)?;
    let order_id = pick_order(&routes[from], rng)?;

    let mut candidate = routes.to_vec();
    candidate[from].retain(|stop| stop.order_id != order_id);

    let to = rng.gen_range(0..candidate.len());
    let target = &mut candidate[to];
    let i = rng.gen_range(0..=target.len());
    target.insert(i, RouteStop::pickup(order_id));
    let j = rng.gen_range((i + 1)..=target.len());
    target.insert(j, RouteStop::delivery(order_id));
    Some(candidate)
}

/// Exchanges one order between two distinct non-empty routes; each order is
/// re-appended as a contiguous pickup/delivery pair at the end of the other
/// route.
// TODO: try inserting at the removed order's old positions instead of
// appending; appending discards any interleaving the order had.
fn swap(routes: &[Vec<RouteStop>], rng: &mut Random) -> Option<Vec<Vec<RouteStop>>> {
    let (a, b) = pick_distinct_nonempty(routes, rng)?;
    let order_a = pick_order(&routes[a], rng)?;
    let order_b = pick_order(&routes[b], rng)?;

    let mut candidate = routes.to_vec();
    candidate[a].retain(|stop| stop.order_id != order_a);
    candidate[b].retain(|stop| stop.order_id != order_b);
    candidate[a].push(RouteStop::pickup(order_b));
    candidate[a].push(RouteStop::delivery(order_b));
    candidate[b].push(RouteStop::pickup(order_a));
    candidate[b].push(RouteStop::delivery(order_a));
    Some(candidate)
}

/// Rewrites one route as contiguous pickup/delivery pairs in a shuffled order
/// sequence.
fn intra_shuffle(routes: &[Vec<RouteStop>], rng: &mut Random) -> Option<Vec<Vec<RouteStop>>> {
    let candidates: Vec<usize> = (0..routes.len())
        .filter(|&v| routes[v].len() >= SHUFFLE_MIN_STOPS)
        .collect();
    let v = *candidates.choose(rng)?;

    let mut order_ids = visit_order(&routes[v]);
    order_ids.shuffle(rng);

    let mut candidate = routes.to_vec();
    candidate[v] = order_ids
        .into_iter()
        .flat_map(|id| [RouteStop::pickup(id), RouteStop::delivery(id)])
        .collect();
    Some(candidate)
}

fn pick_nonempty(routes: &[Vec<RouteStop>], rng: &mut Random) -> Option<usize> {
    let nonempty: Vec<usize> = (0..routes.len()).filter(|&v| !routes[v].is_empty()).collect();
    nonempty.choose(rng).copied()
}

fn pick_distinct_nonempty(routes: &[Vec<RouteStop>], rng: &mut Random) -> Option<(usize, usize)> {
    let nonempty: Vec<usize> = (0..routes.len()).filter(|&v| !routes[v].is_empty()).collect();
    if nonempty.len() < 2 {
        return None;
    }
    for _ in 0..SWAP_DISTINCT_RETRIES {
        let a = *nonempty.choose(rng)?;
        let b = *nonempty.choose(rng)?;
        if a != b {
            return Some((a, b));
        }
    }
    None
}

fn pick_order(route: &[RouteStop], rng: &mut Random) -> Option<u32> {
    visit_order(route).choose(rng).copied()
}

/// Unique order ids in first-visit order.
fn visit_order(route: &[RouteStop]) -> Vec<u32> {
    let mut ids = Vec::new();
    for stop in route {
        if !ids.contains(&stop.order_id) {
            ids.push(stop.order_id);
        }
    }
    ids
}
