use std::io::Cursor;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fw_runtime::{BackendRegistry, Config, ModelHandle, RuntimeError};
use fw_vision::{ForwardService, ServiceError, VisionError};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

// 2x2 luminance image flattened and projected onto two scores.
const DIGITS: &str = r#"{
    "opset": 8,
    "inputs": [{ "name": "Input3", "shape": [1, 1, 2, 2] }],
    "outputs": [{ "name": "Plus214_Output_0" }],
    "initializers": {
        "w": { "shape": [4, 2], "data": [1.0, 0.5, 1.0, 0.5, 1.0, 0.5, 1.0, 0.5] }
    },
    "nodes": [
        { "op": "Reshape", "shape": [1, 4], "inputs": ["Input3"], "output": "flat" },
        { "op": "MatMul", "inputs": ["flat", "w"], "output": "Plus214_Output_0" }
    ]
}"#;

fn service() -> ForwardService {
    let model = ModelHandle::from_json(DIGITS, "digits.json", Config::default()).unwrap();
    ForwardService::new(
        Arc::new(model),
        BackendRegistry::with_defaults(),
        "Input3",
        "Plus214_Output_0",
    )
    .unwrap()
    .with_resolution(2, 2)
}

fn white_png_base64(size: u32) -> String {
    let img = RgbImage::from_pixel(size, size, Rgb([255, 255, 255]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    STANDARD.encode(buf)
}

#[test]
fn test_forward_on_each_backend() {
    let service = service();
    let payload = white_png_base64(8);
    for backend in ["cpu", "cpu-f64"] {
        let scores = service.forward(&payload, backend).unwrap();
        assert_eq!(scores, vec![1020.0, 510.0], "{backend}");
    }
}

#[test]
fn test_request_errors_are_values() {
    let service = service();

    assert!(matches!(
        service.forward("not base64!", "cpu"),
        Err(ServiceError::Vision(VisionError::Base64(_)))
    ));
    assert!(matches!(
        service.forward(&STANDARD.encode(b"GIF89a garbage"), "cpu"),
        Err(ServiceError::Vision(VisionError::Decode(_)))
    ));
    assert!(matches!(
        service.forward(&white_png_base64(2), "Tensorflow"),
        Err(ServiceError::Runtime(RuntimeError::UnknownBackend { .. }))
    ));

    // The service keeps working after failed requests.
    assert!(service.forward(&white_png_base64(2), "cpu").is_ok());
}

#[test]
fn test_wrong_resolution_is_rejected_by_the_model() {
    let model = ModelHandle::from_json(DIGITS, "digits.json", Config::default()).unwrap();
    let service = ForwardService::new(
        Arc::new(model),
        BackendRegistry::with_defaults(),
        "Input3",
        "Plus214_Output_0",
    )
    .unwrap();
    assert_eq!(service.preprocessor().width(), 28);
    assert_eq!(service.model().opset(), 8);
    assert_eq!(service.model().path(), std::path::Path::new("digits.json"));
    assert!(matches!(
        service.forward(&white_png_base64(28), "cpu"),
        Err(ServiceError::Runtime(RuntimeError::Tensor(_)))
    ));
}

#[test]
fn test_startup_failures() {
    let err = ForwardService::load(
        "/no/such/model.json",
        Config::default(),
        BackendRegistry::with_defaults(),
        "Input3",
        "Plus214_Output_0",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Runtime(RuntimeError::ModelLoadFailed { .. })
    ));

    let model = Arc::new(ModelHandle::from_json(DIGITS, "digits.json", Config::default()).unwrap());
    assert!(matches!(
        ForwardService::new(model.clone(), BackendRegistry::new(), "x", "Plus214_Output_0"),
        Err(ServiceError::Runtime(RuntimeError::UnknownInput(_)))
    ));
    assert!(matches!(
        ForwardService::new(model, BackendRegistry::new(), "Input3", "y"),
        Err(ServiceError::Runtime(RuntimeError::UnknownOutput(_)))
    ));
}
