use clap::ValueEnum;

use super::Location;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Pure distance capability injected into the solvers; implementations must
/// return non-negative kilometers and be deterministic.
pub trait DistanceMetric: Sync {
    fn distance(&self, from: &Location, to: &Location) -> f64;
}

impl<F> DistanceMetric for F
where
    F: Fn(&Location, &Location) -> f64 + Sync,
{
    fn distance(&self, from: &Location, to: &Location) -> f64 {
        self(from, to)
    }
}

/// Spherical law of cosines over WGS84-ish coordinates.
pub struct GreatCircle;

impl DistanceMetric for GreatCircle {
    fn distance(&self, from: &Location, to: &Location) -> f64 {
        let lat1 = from.latitude.to_radians();
        let lon1 = from.longitude.to_radians();
        let lat2 = to.latitude.to_radians();
        let lon2 = to.longitude.to_radians();

        let cos_angle =
            lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon1 - lon2).cos();
        // rounding can push the cosine just outside [-1, 1]
        cos_angle.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_KM
    }
}

/// Treats latitude/longitude as plane coordinates; benchmark geometry.
pub struct Euclidean;

impl DistanceMetric for Euclidean {
    fn distance(&self, from: &Location, to: &Location) -> f64 {
        let dx = from.latitude - to.latitude;
        let dy = from.longitude - to.longitude;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MetricKind {
    GreatCircle,
    Euclidean,
}

impl MetricKind {
    pub fn as_metric(&self) -> &'static dyn DistanceMetric {
        match self {
            Self::GreatCircle => &GreatCircle,
            Self::Euclidean => &Euclidean,
        }
    }
}
