use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub mod matrices;
pub mod metric;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub hash: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        let mut location = Self {
            hash: String::new(),
            latitude,
            longitude,
        };
        location.hash = location.coordinate_hash();
        location
    }

    fn coordinate_hash(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: u32,
    pub start_location: Location,
    pub price_km: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u32,
    pub pickup_location: Location,
    pub delivery_location: Location,
    pub load_factor: f64,
}

impl Order {
    /// Normalized load contributed by this order; the route-wide ceiling is 1.0.
    pub fn normalized_load(&self) -> f64 {
        1.0 / self.load_factor
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    pub max_total_distance: f64,
}

pub struct Problem {
    pub vehicles: Vec<Vehicle>,
    pub orders: Vec<Order>,
    pub constraints: Option<Constraints>,
    order_positions: HashMap<u32, usize>,
}

impl Problem {
    pub fn new(
        mut vehicles: Vec<Vehicle>,
        mut orders: Vec<Order>,
        constraints: Option<Constraints>,
    ) -> Result<Self> {
        if vehicles.is_empty() {
            bail!("problem without vehicles");
        }
        if orders.is_empty() {
            bail!("problem without orders");
        }
        if let Some(constraints) = &constraints {
            if constraints.max_total_distance <= 0.0 {
                bail!(
                    "maxTotalDistance must be positive (got {})",
                    constraints.max_total_distance
                );
            }
        }

        let mut vehicle_ids = HashMap::new();
        for (idx, vehicle) in vehicles.iter_mut().enumerate() {
            if vehicle.price_km < 0.0 {
                bail!("vehicle {} has negative priceKm", vehicle.id);
            }
            if vehicle_ids.insert(vehicle.id, idx).is_some() {
                bail!("duplicate vehicle id {}", vehicle.id);
            }
            normalize_hash(&mut vehicle.start_location);
        }

        let mut order_positions = HashMap::new();
        for (idx, order) in orders.iter_mut().enumerate() {
            if order.load_factor <= 0.0 {
                bail!("order {} has non-positive loadFactor", order.id);
            }
            if order_positions.insert(order.id, idx).is_some() {
                bail!("duplicate order id {}", order.id);
            }
            normalize_hash(&mut order.pickup_location);
            normalize_hash(&mut order.delivery_location);
        }

        Ok(Self {
            vehicles,
            orders,
            constraints,
            order_positions,
        })
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    pub fn num_orders(&self) -> usize {
        self.orders.len()
    }

    pub fn order_position(&self, order_id: u32) -> Option<usize> {
        self.order_positions.get(&order_id).copied()
    }

    pub fn max_total_distance(&self) -> Option<f64> {
        self.constraints.map(|c| c.max_total_distance)
    }
}

fn normalize_hash(location: &mut Location) {
    if location.hash.is_empty() {
        location.hash = location.coordinate_hash();
    }
}
