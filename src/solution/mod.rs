use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod plan;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopKind {
    Pickup,
    Delivery,
}

impl StopKind {
    pub fn is_pickup(&self) -> bool {
        match self {
            Self::Pickup => true,
            _ => false,
        }
    }
    pub fn is_delivery(&self) -> bool {
        match self {
            Self::Delivery => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStop {
    pub order_id: u32,
    #[serde(rename = "type")]
    pub kind: StopKind,
}

impl RouteStop {
    pub fn pickup(order_id: u32) -> Self {
        Self {
            order_id,
            kind: StopKind::Pickup,
        }
    }
    pub fn delivery(order_id: u32) -> Self {
        Self {
            order_id,
            kind: StopKind::Delivery,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRoute {
    pub stops: Vec<RouteStop>,
    pub total_distance: f64,
    pub empty_distance: f64,
    pub total_price: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSolution {
    pub routes: BTreeMap<u32, VehicleRoute>,
    pub total_distance: f64,
    pub empty_distance: f64,
    pub total_price: f64,
}

impl ProblemSolution {
    /// Sentinel for "no feasible assignment exists".
    pub fn infeasible() -> Self {
        Self {
            routes: BTreeMap::new(),
            total_distance: f64::INFINITY,
            empty_distance: f64::INFINITY,
            total_price: f64::INFINITY,
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.total_distance.is_finite()
    }

    pub fn objective_value(&self, objective: Objective) -> f64 {
        match objective {
            Objective::Distance => self.total_distance,
            Objective::Price => self.total_price,
            Objective::Empty => self.empty_distance,
        }
    }

    pub fn metrics(&self) -> SolutionMetrics {
        SolutionMetrics {
            total_distance: self.total_distance,
            total_price: self.total_price,
            empty_distance: self.empty_distance,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmSolution {
    pub best_distance_solution: ProblemSolution,
    pub best_price_solution: ProblemSolution,
    pub best_empty_solution: ProblemSolution,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Objective {
    Distance,
    Price,
    Empty,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionMetrics {
    pub total_distance: f64,
    pub total_price: f64,
    pub empty_distance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_kind_serializes_lowercase() {
        let stop = RouteStop::pickup(3);
        let json = serde_json::to_string(&stop).unwrap();
        assert_eq!(json, r#"{"orderId":3,"type":"pickup"}"#);
        let back: RouteStop = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stop);
    }

    #[test]
    fn infeasible_sentinel_is_not_feasible() {
        let sentinel = ProblemSolution::infeasible();
        assert!(!sentinel.is_feasible());
        assert!(sentinel.objective_value(Objective::Price).is_infinite());
        assert!(sentinel.routes.is_empty());
    }
}
