use landmarkit::heatmap::HeatmapStack;
use landmarkit::ir::io_predictions::{read_predictions, write_predictions};
use landmarkit::ir::{HeatmapGrid, KeypointSet, Point, NUM_KEYPOINTS};
use landmarkit::pipeline::{
    ClampPolicy, FixedPointsPredictor, InferencePipeline, InputTensor, PredictorError,
};
use landmarkit::transform::{PointTransform, PreprocessPolicy};
use landmarkit::{CodecConfig, LandmarkError};

mod common;

fn grid_points() -> KeypointSet<HeatmapGrid> {
    KeypointSet::from_positions(
        (0..NUM_KEYPOINTS).map(|i| Point::new(8.0 + 3.0 * i as f64, 40.0 - i as f64)),
    )
    .expect("full set")
}

#[test]
fn bmp_bytes_run_end_to_end_with_letterbox() {
    let config = CodecConfig::default();
    let codec = config.codec().expect("codec");
    let pipeline = InferencePipeline::new(
        FixedPointsPredictor::new(&grid_points(), &codec).expecting_input_size(256),
        config.clone(),
    )
    .expect("pipeline");

    let points = pipeline
        .run(&common::bmp_bytes(640, 480))
        .expect("inference");
    assert_eq!(points.len(), NUM_KEYPOINTS);

    // Landscape: scale 0.4, vertical padding 32.
    let first = points.iter().next().expect("first point");
    assert!((first.position.x - 8.0 * 4.0 / 0.4).abs() < 1e-6);
    assert!((first.position.y - (40.0 * 4.0 - 32.0) / 0.4).abs() < 1e-6);
}

#[test]
fn resize_policy_uses_independent_axes() {
    let config = CodecConfig {
        preprocess: PreprocessPolicy::Resize,
        ..Default::default()
    };
    let codec = config.codec().expect("codec");
    let pipeline = InferencePipeline::new(
        FixedPointsPredictor::new(&grid_points(), &codec),
        config.clone(),
    )
    .expect("pipeline");

    let points = pipeline
        .run(&common::bmp_bytes(512, 128))
        .expect("inference");

    let preprocess = config
        .preprocess
        .build(config.model_input_size, 512, 128)
        .expect("preprocess");
    let downsample = config.downsample().expect("downsample");
    for (found, grid) in points.positions().zip(grid_points().positions()) {
        let expected = preprocess.inverse(downsample.inverse(grid));
        assert!((found.x - expected.x).abs() < 1e-9);
        assert!((found.y - expected.y).abs() < 1e-9);
    }
}

#[test]
fn closure_predictor_sees_normalized_tensor() {
    let config = CodecConfig::default();
    let codec = config.codec().expect("codec");
    let answer = codec.encode(&grid_points());
    let predictor = move |tensor: &InputTensor| -> Result<HeatmapStack, PredictorError> {
        if tensor.shape() != [3, 256, 256] {
            return Err(format!("unexpected shape {:?}", tensor.shape()).into());
        }
        // Letterbox padding is black, which normalizes to -mean / std.
        let corner = tensor.get(0, 0, 0).ok_or("empty tensor")?;
        if (corner - (-0.485 / 0.229)).abs() > 1e-4 {
            return Err(format!("unexpected padding value {corner}").into());
        }
        Ok(answer.clone())
    };

    let pipeline = InferencePipeline::new(predictor, config).expect("pipeline");
    let points = pipeline
        .run(&common::bmp_bytes(300, 100))
        .expect("inference");
    assert_eq!(points.len(), NUM_KEYPOINTS);
}

#[test]
fn clamp_policy_keeps_points_inside_image() {
    let far = KeypointSet::from_positions((0..NUM_KEYPOINTS).map(|_| Point::new(63.0, 0.0)))
        .expect("full set");
    let config = CodecConfig {
        clamp: ClampPolicy::ImageBounds,
        ..Default::default()
    };
    let codec = config.codec().expect("codec");
    let pipeline = InferencePipeline::new(FixedPointsPredictor::new(&far, &codec), config)
        .expect("pipeline");

    let points = pipeline
        .run(&common::bmp_bytes(200, 400))
        .expect("inference");
    for p in points.positions() {
        assert!((0.0..=199.0).contains(&p.x), "x = {}", p.x);
        assert!((0.0..=399.0).contains(&p.y), "y = {}", p.y);
    }
}

#[test]
fn run_path_reports_missing_file() {
    let config = CodecConfig::default();
    let codec = config.codec().expect("codec");
    let pipeline = InferencePipeline::new(FixedPointsPredictor::new(&grid_points(), &codec), config)
        .expect("pipeline");

    let err = pipeline
        .run_path(std::path::Path::new("does/not/exist.png"))
        .unwrap_err();
    assert!(matches!(err, LandmarkError::ImageDecode { path: Some(_), .. }));
}

#[test]
fn predictions_written_and_read_back() {
    let config = CodecConfig::default();
    let codec = config.codec().expect("codec");
    let pipeline = InferencePipeline::new(FixedPointsPredictor::new(&grid_points(), &codec), config)
        .expect("pipeline");

    let temp = tempfile::tempdir().expect("create temp dir");
    let image_path = temp.path().join("scan.bmp");
    common::write_bmp(&image_path, 320, 320);
    let points = pipeline.run_path(&image_path).expect("inference");

    let out = temp.path().join("scan.json");
    write_predictions(&out, &points).expect("write predictions");
    assert_eq!(
        read_predictions(&out, NUM_KEYPOINTS).expect("read predictions"),
        points
    );
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = CodecConfig {
        heatmap_size: 0,
        ..Default::default()
    };
    let stub = |_: &InputTensor| -> Result<HeatmapStack, PredictorError> {
        Err("never called".into())
    };
    assert!(matches!(
        InferencePipeline::new(stub, config),
        Err(LandmarkError::Configuration { .. })
    ));
}

#[test]
fn oversized_window_radius_is_rejected_up_front() {
    let config = CodecConfig {
        window_radius: usize::MAX,
        ..Default::default()
    };
    let stub = |_: &InputTensor| -> Result<HeatmapStack, PredictorError> {
        Err("never called".into())
    };
    assert!(matches!(
        InferencePipeline::new(stub, config),
        Err(LandmarkError::Configuration { .. })
    ));
}

#[test]
fn configured_landmark_count_flows_to_prediction_files() {
    let config = CodecConfig {
        num_keypoints: 5,
        ..Default::default()
    };
    let codec = config.codec().expect("codec");
    let five = KeypointSet::from_positions(
        (0..5).map(|i| Point::new(10.0 + 8.0 * i as f64, 30.0)),
    )
    .expect("five points");
    let pipeline = InferencePipeline::new(FixedPointsPredictor::new(&five, &codec), config)
        .expect("pipeline");

    let temp = tempfile::tempdir().expect("create temp dir");
    let image_path = temp.path().join("scan.bmp");
    common::write_bmp(&image_path, 256, 256);
    let points = pipeline.run_path(&image_path).expect("inference");
    assert_eq!(points.len(), 5);

    let out = temp.path().join("scan.json");
    write_predictions(&out, &points).expect("write predictions");
    assert_eq!(read_predictions(&out, 5).expect("read predictions"), points);
    assert!(read_predictions(&out, NUM_KEYPOINTS).is_err());
}
