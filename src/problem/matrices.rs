use super::metric::DistanceMetric;
use super::{Location, Problem};

/// Precomputed distance tables, built once per solve and never mutated.
///
/// The node table covers the 2N pickup/delivery nodes: node `2k` is the pickup
/// of order `k`, node `2k + 1` its delivery. The start table covers vehicle
/// start to order pickup. Both are flattened for cache locality.
pub struct DistanceMatrices {
    node: Vec<f64>,
    start: Vec<f64>,
    num_nodes: usize,
    num_orders: usize,
}

impl DistanceMatrices {
    pub fn build(problem: &Problem, metric: &dyn DistanceMetric) -> Self {
        let num_orders = problem.num_orders();
        let num_nodes = num_orders * 2;

        let mut node = vec![0.0; num_nodes * num_nodes];
        for i in 0..num_nodes {
            for j in 0..num_nodes {
                if i != j {
                    node[i * num_nodes + j] =
                        metric.distance(node_location(problem, i), node_location(problem, j));
                }
            }
        }

        let mut start = vec![0.0; problem.num_vehicles() * num_orders];
        for (v_idx, vehicle) in problem.vehicles.iter().enumerate() {
            for (o_idx, order) in problem.orders.iter().enumerate() {
                start[v_idx * num_orders + o_idx] =
                    metric.distance(&vehicle.start_location, &order.pickup_location);
            }
        }

        Self {
            node,
            start,
            num_nodes,
            num_orders,
        }
    }

    #[inline]
    pub fn node_distance(&self, from: usize, to: usize) -> f64 {
        self.node[from * self.num_nodes + to]
    }

    #[inline]
    pub fn start_distance(&self, v_idx: usize, o_idx: usize) -> f64 {
        self.start[v_idx * self.num_orders + o_idx]
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    #[inline]
    pub fn pickup_node(o_idx: usize) -> usize {
        o_idx * 2
    }

    #[inline]
    pub fn delivery_node(o_idx: usize) -> usize {
        o_idx * 2 + 1
    }
}

fn node_location(problem: &Problem, node_idx: usize) -> &Location {
    let order = &problem.orders[node_idx / 2];
    if node_idx % 2 == 0 {
        &order.pickup_location
    } else {
        &order.delivery_location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::metric::Euclidean;
    use crate::problem::{Order, Vehicle};

    fn problem() -> Problem {
        Problem::new(
            vec![
                Vehicle {
                    id: 1,
                    start_location: Location::new(0.0, 0.0),
                    price_km: 1.0,
                },
                Vehicle {
                    id: 2,
                    start_location: Location::new(10.0, 0.0),
                    price_km: 2.0,
                },
            ],
            vec![
                Order {
                    id: 1,
                    pickup_location: Location::new(1.0, 0.0),
                    delivery_location: Location::new(1.0, 5.0),
                    load_factor: 1.0,
                },
                Order {
                    id: 2,
                    pickup_location: Location::new(4.0, 0.0),
                    delivery_location: Location::new(4.0, 3.0),
                    load_factor: 2.0,
                },
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn node_mapping_even_pickup_odd_delivery() {
        let problem = problem();
        let mats = DistanceMatrices::build(&problem, &Euclidean);
        // pickup(0) -> delivery(0)
        assert!((mats.node_distance(0, 1) - 5.0).abs() < 1e-9);
        // pickup(0) -> pickup(1)
        assert!((mats.node_distance(0, 2) - 3.0).abs() < 1e-9);
        assert_eq!(DistanceMatrices::pickup_node(1), 2);
        assert_eq!(DistanceMatrices::delivery_node(1), 3);
    }

    #[test]
    fn diagonal_is_zero_and_symmetric_for_symmetric_metric() {
        let problem = problem();
        let mats = DistanceMatrices::build(&problem, &Euclidean);
        for i in 0..mats.num_nodes() {
            assert_eq!(mats.node_distance(i, i), 0.0);
            for j in 0..mats.num_nodes() {
                assert!((mats.node_distance(i, j) - mats.node_distance(j, i)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn start_matrix_covers_vehicle_to_pickup() {
        let problem = problem();
        let mats = DistanceMatrices::build(&problem, &Euclidean);
        assert!((mats.start_distance(0, 0) - 1.0).abs() < 1e-9);
        assert!((mats.start_distance(1, 1) - 6.0).abs() < 1e-9);
        for v in 0..2 {
            for o in 0..2 {
                assert!(mats.start_distance(v, o) >= 0.0);
            }
        }
    }
}
