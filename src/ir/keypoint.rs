//! Keypoints and keypoint sets.

use std::fmt;

use super::coord::Point;
use crate::error::LandmarkError;

/// Number of anatomical landmarks annotated on every image.
pub const NUM_KEYPOINTS: usize = 17;

/// Identifier of a landmark, 1-based.
///
/// Heatmap channel `i` always corresponds to keypoint id `i + 1`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeypointId(u32);

impl KeypointId {
    /// Creates a new KeypointId.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Id for the given 0-based heatmap channel.
    #[inline]
    pub fn from_channel(channel: usize) -> Self {
        Self(channel as u32 + 1)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// 0-based channel index of this id.
    #[inline]
    pub fn channel(&self) -> usize {
        self.0.saturating_sub(1) as usize
    }
}

impl fmt::Debug for KeypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeypointId({})", self.0)
    }
}

impl fmt::Display for KeypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for KeypointId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A labeled point in a given coordinate space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint<TSpace> {
    pub id: KeypointId,
    pub position: Point<TSpace>,
}

impl<TSpace> Keypoint<TSpace> {
    pub fn new(id: impl Into<KeypointId>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            position: Point::new(x, y),
        }
    }
}

/// An ordered, immutable set of keypoints whose ids form `1..=len`.
///
/// Ground truth and predictions both hold [`NUM_KEYPOINTS`] points; the set
/// itself only enforces contiguity so that single-channel decoders can reuse
/// it.
#[derive(Clone, Debug, PartialEq)]
pub struct KeypointSet<TSpace> {
    points: Vec<Keypoint<TSpace>>,
}

impl<TSpace> KeypointSet<TSpace> {
    /// Builds a set from keypoints in any order.
    ///
    /// Points are sorted by id; the ids must be exactly `1..=n`.
    pub fn new(mut points: Vec<Keypoint<TSpace>>) -> Result<Self, LandmarkError> {
        if points.is_empty() {
            return Err(LandmarkError::InvalidKeypoints {
                message: "keypoint set is empty".to_string(),
            });
        }

        points.sort_by_key(|kp| kp.id);
        for (index, kp) in points.iter().enumerate() {
            let expected = KeypointId::from_channel(index);
            if kp.id != expected {
                return Err(LandmarkError::InvalidKeypoints {
                    message: format!(
                        "ids must form a contiguous 1..{} range; found id {} at position {}",
                        points.len(),
                        kp.id,
                        expected
                    ),
                });
            }
        }

        Ok(Self { points })
    }

    /// Builds a set from positions in channel order, assigning ids `1..=n`.
    pub fn from_positions(
        positions: impl IntoIterator<Item = Point<TSpace>>,
    ) -> Result<Self, LandmarkError> {
        let points = positions
            .into_iter()
            .enumerate()
            .map(|(channel, position)| Keypoint {
                id: KeypointId::from_channel(channel),
                position,
            })
            .collect();
        Self::new(points)
    }

    /// Like [`KeypointSet::new`] but also requires exactly `expected` points.
    pub fn with_len(
        points: Vec<Keypoint<TSpace>>,
        expected: usize,
    ) -> Result<Self, LandmarkError> {
        if points.len() != expected {
            return Err(LandmarkError::InvalidKeypoints {
                message: format!("expected {} keypoints, found {}", expected, points.len()),
            });
        }
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed set; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keypoint<TSpace>> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[Keypoint<TSpace>] {
        &self.points
    }

    pub fn get(&self, id: KeypointId) -> Option<&Keypoint<TSpace>> {
        self.points.get(id.channel()).filter(|kp| kp.id == id)
    }

    /// Positions in id order.
    pub fn positions(&self) -> impl Iterator<Item = Point<TSpace>> + '_ {
        self.points.iter().map(|kp| kp.position)
    }

    /// Maps every position into another space, keeping ids and order.
    pub fn map<TOther>(&self, f: impl Fn(Point<TSpace>) -> Point<TOther>) -> KeypointSet<TOther> {
        KeypointSet {
            points: self
                .points
                .iter()
                .map(|kp| Keypoint {
                    id: kp.id,
                    position: f(kp.position),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ModelInput, Original};

    #[test]
    fn new_sorts_by_id() {
        let set: KeypointSet<Original> = KeypointSet::new(vec![
            Keypoint::new(2u32, 20.0, 21.0),
            Keypoint::new(1u32, 10.0, 11.0),
            Keypoint::new(3u32, 30.0, 31.0),
        ])
        .expect("valid set");

        let ids: Vec<u32> = set.iter().map(|kp| kp.id.as_u32()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(set.get(KeypointId::new(2)).unwrap().position.x, 20.0);
    }

    #[test]
    fn new_rejects_gaps_and_duplicates() {
        let gap: Result<KeypointSet<Original>, _> = KeypointSet::new(vec![
            Keypoint::new(1u32, 0.0, 0.0),
            Keypoint::new(3u32, 0.0, 0.0),
        ]);
        assert!(matches!(gap, Err(LandmarkError::InvalidKeypoints { .. })));

        let dup: Result<KeypointSet<Original>, _> = KeypointSet::new(vec![
            Keypoint::new(1u32, 0.0, 0.0),
            Keypoint::new(1u32, 0.0, 0.0),
        ]);
        assert!(dup.is_err());

        let empty: Result<KeypointSet<Original>, _> = KeypointSet::new(vec![]);
        assert!(empty.is_err());
    }

    #[test]
    fn with_len_enforces_count() {
        let points: Vec<Keypoint<Original>> = (1..=16u32)
            .map(|id| Keypoint::new(id, id as f64, id as f64))
            .collect();
        let err = KeypointSet::with_len(points, NUM_KEYPOINTS).unwrap_err();
        assert!(err.to_string().contains("expected 17 keypoints, found 16"));
    }

    #[test]
    fn map_preserves_ids_and_order() {
        let set: KeypointSet<Original> =
            KeypointSet::from_positions((0..NUM_KEYPOINTS).map(|i| Point::new(i as f64, 0.0)))
                .expect("valid set");

        let doubled: KeypointSet<ModelInput> = set.map(|p| Point::new(p.x * 2.0, p.y));
        assert_eq!(doubled.len(), NUM_KEYPOINTS);
        for (channel, kp) in doubled.iter().enumerate() {
            assert_eq!(kp.id, KeypointId::from_channel(channel));
            assert_eq!(kp.position.x, channel as f64 * 2.0);
        }
    }
}
