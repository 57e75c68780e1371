mod common;

use bharat_agro::{
    InferenceError, ModelError, ModelInput, ModelKind, ModelManager, OnnxClassifier, Predictor,
    RawOutput, RequestFields, RuntimeConfig,
};
use common::{scratch_dir, write_argmax_model};

fn features(values: Vec<f32>) -> ModelInput {
    ModelInput::Features(values.into())
}

#[test]
fn test_int64_labels_are_codes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = scratch_dir("int64");
    let path = write_argmax_model(&dir, "codes.onnx", 7, false);
    let classifier = OnnxClassifier::load(&path, 7, &RuntimeConfig::default())?;
    assert_eq!(classifier.feature_width(), 7);
    assert!(classifier.model_path().ends_with("codes.onnx"));

    let output = classifier.predict(&features(vec![0.0, 1.0, 5.0, 2.0, 0.0, 0.0, 0.0]))?;
    assert_eq!(output, RawOutput::Code(2));
    Ok(())
}

#[test]
fn test_string_labels_are_passed_through() -> Result<(), Box<dyn std::error::Error>> {
    let dir = scratch_dir("string");
    let path = write_argmax_model(&dir, "labels.onnx", 7, true);
    let classifier = OnnxClassifier::load(&path, 7, &RuntimeConfig::default())?;

    let output = classifier.predict(&features(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 9.0]))?;
    assert_eq!(output, RawOutput::Label("6".into()));
    Ok(())
}

#[test]
fn test_wrong_width_is_rejected_before_running() -> Result<(), Box<dyn std::error::Error>> {
    let dir = scratch_dir("run-width");
    let path = write_argmax_model(&dir, "codes.onnx", 7, false);
    let classifier = OnnxClassifier::load(&path, 7, &RuntimeConfig::default())?;

    let result = classifier.predict(&features(vec![1.0; 6]));
    assert!(matches!(
        result,
        Err(InferenceError::ShapeMismatch { expected: 7, actual: 6 })
    ));
    assert!(matches!(
        classifier.predict(&ModelInput::Key("Kerala".into())),
        Err(InferenceError::UnsupportedInput(_))
    ));
    Ok(())
}

#[test]
fn test_declared_width_is_checked_at_load() {
    let dir = scratch_dir("load-width");
    let path = write_argmax_model(&dir, "codes.onnx", 7, false);
    let result = OnnxClassifier::load(&path, 8, &RuntimeConfig::default());
    assert!(matches!(
        result,
        Err(InferenceError::ShapeMismatch { expected: 8, actual: 7 })
    ));
}

#[test]
fn test_recommender_on_loaded_models() -> Result<(), Box<dyn std::error::Error>> {
    let dir = scratch_dir("manager");
    write_argmax_model(&dir, "crop_classifier.onnx", 7, true);
    write_argmax_model(&dir, "fertilizer_classifier.onnx", 8, false);

    let manager = ModelManager::new(&dir)?;
    let recommender = manager.load_recommender(&RuntimeConfig::default())?;

    let crop = RequestFields::new()
        .with("Nitrogen", 90)
        .with("Phosphorus", 42)
        .with("Potassium", 43)
        .with("Temperature", 20.5)
        .with("Humidity", 82)
        .with("Ph", 6.5)
        .with("Rainfall", 202.5);
    assert_eq!(
        recommender.recommend_crop(&crop)?.message,
        "6 is the best crop to be cultivated there."
    );

    // Humidity is the largest column, so the model answers code 1.
    let fertilizer = RequestFields::new()
        .with("Temperature", 26)
        .with("Humidity", 52)
        .with("SoilMoisture", 38)
        .with("soil_type", "Sandy")
        .with("crop_type", "Maize")
        .with("Nitrogen", 37)
        .with("Phosphorus", 0)
        .with("Potassium", 0);
    assert_eq!(
        recommender.recommend_fertilizer(&fertilizer)?.message,
        "14-35-14 is the best fertilizer to use in the field."
    );
    Ok(())
}

#[test]
fn test_swapped_models_fail_startup() -> Result<(), Box<dyn std::error::Error>> {
    let dir = scratch_dir("swapped");
    write_argmax_model(&dir, "crop_classifier.onnx", 8, false);
    write_argmax_model(&dir, "fertilizer_classifier.onnx", 7, false);

    let manager = ModelManager::new(&dir)?;
    let err = manager
        .load_classifier(ModelKind::Crop, &RuntimeConfig::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ModelError::LoadFailed {
            kind: ModelKind::Crop,
            source: InferenceError::ShapeMismatch { expected: 7, actual: 8 },
        }
    ));
    Ok(())
}
