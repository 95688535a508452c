use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::problem::{Constraints, Order, Problem, Vehicle};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProblemDocument {
    vehicles: Vec<Vehicle>,
    orders: Vec<Order>,
    #[serde(default)]
    constraints: Option<Constraints>,
}

pub fn load_problem<P: AsRef<Path>>(path: P) -> Result<Problem> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("cannot open problem file {}", path.display()))?;
    let document: ProblemDocument = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("cannot parse problem file {}", path.display()))?;
    Problem::new(document.vehicles, document.orders, document.constraints)
}

pub fn parse_problem(json: &str) -> Result<Problem> {
    let document: ProblemDocument =
        serde_json::from_str(json).context("cannot parse problem document")?;
    Problem::new(document.vehicles, document.orders, document.constraints)
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("cannot create output file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "vehicles": [
            {"id": 1, "startLocation": {"latitude": 54.7, "longitude": 25.3}, "priceKm": 1.2}
        ],
        "orders": [
            {
                "id": 10,
                "pickupLocation": {"latitude": 54.9, "longitude": 23.9, "hash": "kaunas"},
                "deliveryLocation": {"latitude": 55.7, "longitude": 21.1},
                "loadFactor": 2.5
            }
        ],
        "constraints": {"maxTotalDistance": 800.0}
    }"#;

    #[test]
    fn parses_a_problem_document() {
        let problem = parse_problem(FIXTURE).unwrap();
        assert_eq!(problem.num_vehicles(), 1);
        assert_eq!(problem.num_orders(), 1);
        assert_eq!(problem.vehicles[0].price_km, 1.2);
        assert_eq!(problem.orders[0].load_factor, 2.5);
        assert_eq!(problem.orders[0].pickup_location.hash, "kaunas");
        // missing hashes are derived from the coordinates
        assert!(!problem.orders[0].delivery_location.hash.is_empty());
        assert_eq!(problem.max_total_distance(), Some(800.0));
    }

    #[test]
    fn constraints_are_optional() {
        let document = r#"{
            "vehicles": [
                {"id": 1, "startLocation": {"latitude": 0.0, "longitude": 0.0}, "priceKm": 1.0}
            ],
            "orders": [
                {
                    "id": 1,
                    "pickupLocation": {"latitude": 1.0, "longitude": 0.0},
                    "deliveryLocation": {"latitude": 2.0, "longitude": 0.0},
                    "loadFactor": 1.0
                }
            ]
        }"#;
        let problem = parse_problem(document).unwrap();
        assert_eq!(problem.max_total_distance(), None);
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse_problem(r#"{"vehicles": [], "orders": []}"#).is_err());
        assert!(parse_problem("not json").is_err());
    }
}
