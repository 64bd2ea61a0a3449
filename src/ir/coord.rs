//! Typed 2D points using PhantomData for compile-time space safety.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// A 2D point with a type-level marker for its coordinate space.
///
/// `TSpace` is one of [`Original`](super::Original),
/// [`ModelInput`](super::ModelInput) or [`HeatmapGrid`](super::HeatmapGrid).
pub struct Point<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Point<TSpace> {
    /// Creates a new point with the given x and y values.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point in the same space.
    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// Hand-written so that no bound lands on the space marker.
impl<TSpace> Clone for Point<TSpace> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<TSpace> Copy for Point<TSpace> {}

impl<TSpace> PartialEq for Point<TSpace> {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl<TSpace> std::fmt::Debug for Point<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Point")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Default for Point<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

// Always written as {"x": .., "y": ..}.
impl<TSpace> Serialize for Point<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Point", 2)?;
        state.serialize_field("x", &self.x)?;
        state.serialize_field("y", &self.y)?;
        state.end()
    }
}

// Accepts either {"x": .., "y": ..} or a two-element [x, y] pair.
impl<'de, TSpace> Deserialize<'de> for Point<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum PointData {
            Object { x: f64, y: f64 },
            Pair(f64, f64),
        }
        let point = match PointData::deserialize(deserializer)? {
            PointData::Object { x, y } => Point::new(x, y),
            PointData::Pair(x, y) => Point::new(x, y),
        };
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{HeatmapGrid, Original};

    #[test]
    fn test_point_is_finite() {
        let finite: Point<Original> = Point::new(10.0, 20.0);
        assert!(finite.is_finite());

        let nan: Point<Original> = Point::new(f64::NAN, 20.0);
        assert!(!nan.is_finite());

        let inf: Point<Original> = Point::new(10.0, f64::INFINITY);
        assert!(!inf.is_finite());
    }

    #[test]
    fn test_point_distance() {
        let a: Point<HeatmapGrid> = Point::new(0.0, 0.0);
        let b: Point<HeatmapGrid> = Point::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn test_point_accepts_object_and_pair() {
        let obj: Point<Original> = serde_json::from_str(r#"{"x": 1.5, "y": 2}"#).unwrap();
        assert_eq!((obj.x, obj.y), (1.5, 2.0));

        let pair: Point<Original> = serde_json::from_str("[3, 4.25]").unwrap();
        assert_eq!((pair.x, pair.y), (3.0, 4.25));

        assert!(serde_json::from_str::<Point<Original>>("[1, 2, 3]").is_err());
        assert!(serde_json::from_str::<Point<Original>>(r#"{"x": 1}"#).is_err());
    }

    // Generic code copies points without any bound on the space marker.
    fn first_position<TSpace>(points: &[Point<TSpace>]) -> Point<TSpace> {
        points[0]
    }

    #[test]
    fn test_point_is_copy_for_any_space() {
        let points: Vec<Point<HeatmapGrid>> = vec![Point::new(1.0, 2.0)];
        let copied = first_position(&points);
        assert_eq!(copied, points[0]);
    }

    #[test]
    fn test_point_always_serializes_as_object() {
        let point: Point<Original> = serde_json::from_str("[3, 4]").unwrap();
        assert_eq!(serde_json::to_string(&point).unwrap(), r#"{"x":3.0,"y":4.0}"#);
    }
}
