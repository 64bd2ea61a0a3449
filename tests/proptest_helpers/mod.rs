#![allow(dead_code)]

use landmarkit::ir::{HeatmapGrid, KeypointSet, Original, Point, NUM_KEYPOINTS};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Allowed error of a forward/inverse coordinate round trip, in pixels.
pub const EPS_ROUNDTRIP: f64 = 1e-3;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Image sizes from thumbnails to large clinical photographs.
pub fn arb_image_dims() -> BoxedStrategy<(u32, u32)> {
    (1u32..=6000, 1u32..=6000).boxed()
}

/// Any finite point, including points well outside the image.
pub fn arb_point(width: u32, height: u32) -> BoxedStrategy<Point<Original>> {
    let w = f64::from(width);
    let h = f64::from(height);
    (-w..2.0 * w, -h..2.0 * h)
        .prop_map(|(x, y)| Point::new(x, y))
        .boxed()
}

/// A full keypoint set of integer cells at least `margin` away from the
/// grid border.
pub fn arb_interior_cells(grid: usize, margin: usize) -> BoxedStrategy<KeypointSet<HeatmapGrid>> {
    assert!(grid > 2 * margin, "grid too small for margin");
    let cell = margin..grid - margin;
    proptest::collection::vec((cell.clone(), cell), NUM_KEYPOINTS)
        .prop_map(|cells| {
            KeypointSet::from_positions(
                cells
                    .into_iter()
                    .map(|(x, y)| Point::new(x as f64, y as f64)),
            )
            .expect("full set")
        })
        .boxed()
}

pub fn assert_close<S>(a: Point<S>, b: Point<S>, eps: f64) -> Result<(), String> {
    if (a.x - b.x).abs() <= eps && (a.y - b.y).abs() <= eps {
        Ok(())
    } else {
        Err(format!(
            "({}, {}) and ({}, {}) differ by more than {}",
            a.x, a.y, b.x, b.y, eps
        ))
    }
}
