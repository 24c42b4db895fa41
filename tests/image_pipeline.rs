mod common;

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use image::{ImageFormat, RgbImage};

use parkwatch::classify::ThresholdBackend;
use parkwatch::{
    Annotator, BackendKind, Classifier, ClassifierSettings, ParkingPipeline, ParkingSpot,
    ParkwatchConfig, PipelineError, SamplingConfig, Summary,
};

use common::{counting_classifier, frame_with, spot_mask, spots, FailingBackend};

fn png_bytes(frame: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    frame.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

#[test]
fn image_counts_and_reencodes() {
    let (classifier, calls) = counting_classifier();
    let pipeline = ParkingPipeline::new(
        spots(),
        classifier,
        Annotator::default(),
        SamplingConfig::default(),
    );

    let output = pipeline.process_image(&png_bytes(&frame_with(&[0, 2]))).unwrap();
    assert_eq!(
        output.summary,
        Summary {
            free: 1,
            occupied: 2,
            total: 3
        }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let decoded = image::load_from_memory_with_format(&output.bytes, ImageFormat::Jpeg).unwrap();
    assert_eq!(decoded.width(), common::WIDTH);
    assert_eq!(decoded.height(), common::HEIGHT);
}

#[test]
fn corrupt_input_is_a_decode_error() {
    let (classifier, calls) = counting_classifier();
    let pipeline = ParkingPipeline::new(
        spots(),
        classifier,
        Annotator::default(),
        SamplingConfig::default(),
    );
    let err = pipeline.process_image(b"definitely not a png").unwrap_err();
    assert!(matches!(err, PipelineError::DecodeError(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn spot_outside_image_is_an_invalid_mask() {
    let (classifier, _calls) = counting_classifier();
    let pipeline = ParkingPipeline::new(
        vec![ParkingSpot::new(35, 5, 10, 10)],
        classifier,
        Annotator::default(),
        SamplingConfig::default(),
    );
    let err = pipeline.process_image(&png_bytes(&frame_with(&[]))).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidMask(_)));
}

#[test]
fn backend_failure_is_a_classification_error() {
    let pipeline = ParkingPipeline::new(
        spots(),
        Classifier::new(FailingBackend),
        Annotator::default(),
        SamplingConfig::default(),
    );
    let err = pipeline.process_image(&png_bytes(&frame_with(&[]))).unwrap_err();
    assert!(matches!(err, PipelineError::ClassificationError(_)));
}

#[test]
fn threshold_backend_pipeline_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mask_path = dir.path().join("mask.png");
    spot_mask().save(&mask_path).unwrap();

    let config = ParkwatchConfig {
        mask_path,
        classifier: ClassifierSettings {
            backend: BackendKind::Threshold,
            model_path: PathBuf::from("unused"),
            threshold: 0.5,
        },
        ..ParkwatchConfig::default()
    };
    let pipeline = ParkingPipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.spots().len(), 3);
    assert_eq!(pipeline.classifier().name(), "threshold");

    let output = pipeline.process_image(&png_bytes(&frame_with(&[1]))).unwrap();
    assert_eq!(output.summary.occupied, 1);
    assert_eq!(output.summary.free + output.summary.occupied, output.summary.total);
}

#[test]
fn missing_mask_fails_before_any_frame() {
    let dir = tempfile::tempdir().unwrap();
    let config = ParkwatchConfig {
        mask_path: dir.path().join("absent.png"),
        ..ParkwatchConfig::default()
    };
    let err = ParkingPipeline::from_config(&config).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidMask(_)));
}

#[test]
fn missing_model_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let mask_path = dir.path().join("mask.png");
    spot_mask().save(&mask_path).unwrap();
    let config = ParkwatchConfig {
        mask_path,
        classifier: ClassifierSettings {
            backend: BackendKind::Linear,
            model_path: dir.path().join("missing.json"),
            threshold: 0.5,
        },
        ..ParkwatchConfig::default()
    };
    let err = ParkingPipeline::from_config(&config).unwrap_err();
    assert!(matches!(err, PipelineError::ModelUnavailable(_)));
}

#[test]
fn bad_font_falls_back_to_builtin_glyphs() {
    let dir = tempfile::tempdir().unwrap();
    let mask_path = dir.path().join("mask.png");
    spot_mask().save(&mask_path).unwrap();
    let mut config = ParkwatchConfig {
        mask_path,
        classifier: ClassifierSettings {
            backend: BackendKind::Threshold,
            model_path: PathBuf::from("unused"),
            threshold: 0.5,
        },
        ..ParkwatchConfig::default()
    };
    config.overlay.font_path = Some(dir.path().join("no-such-font.ttf"));

    let pipeline = ParkingPipeline::from_config(&config).unwrap();
    assert!(pipeline.process_image(&png_bytes(&frame_with(&[]))).is_ok());
}

#[test]
fn threshold_backend_classifies_bright_patch() {
    let classifier = Classifier::new(ThresholdBackend::new(0.5));
    let layout = spots();
    let frame = frame_with(&[0]);
    assert!(!classifier.classify(&layout[0].crop(&frame)).unwrap().is_empty());
    assert!(classifier.classify(&layout[1].crop(&frame)).unwrap().is_empty());
}

#[test]
fn pipeline_debug_names_backend_and_layout() {
    let pipeline = ParkingPipeline::new(
        spots(),
        Classifier::new(ThresholdBackend::new(0.5)),
        Annotator::default(),
        SamplingConfig::default(),
    );
    let rendered = format!("{pipeline:?}");
    assert!(rendered.contains("threshold"));
    assert!(rendered.contains("ParkingSpot"));
}
