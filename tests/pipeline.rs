//! 单张图像标注流程的集成测试

#![cfg(feature = "save_image_file")]

use std::path::Path;

use image::RgbImage;
use url::Url;

use biaozhu::{
  FromUrl,
  decode::DetectionDecoder,
  input::InputWrapper,
  label_map::LabelCatalog,
  model::TensorDump,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

const LABEL_MAP: &str = include_str!("../labels/mscoco_label_map.pbtxt");

const TENSORS: &str = r#"{
  "num_detections": [3.0],
  "detection_boxes": [[
    [0.1, 0.2, 0.6, 0.8],
    [0.5, 0.5, 0.75, 0.75],
    [0.0, 0.0, 0.25, 0.25],
    [0.0, 0.0, 0.0, 0.0]
  ]],
  "detection_scores": [[0.93, 0.71, 0.4, 0.0]],
  "detection_classes": [[10.0, 77.0, 1.0, 0.0]]
}"#;

fn url(scheme: &str, path: &Path, query: &str) -> Url {
  Url::parse(&format!("{}://{}{}", scheme, path.display(), query)).unwrap()
}

#[test]
fn test_sample_label_map() {
  let catalog: LabelCatalog = LABEL_MAP.parse().unwrap();
  assert_eq!(catalog.len(), 10);
  assert_eq!(catalog.display_name(1), Some("person"));
  assert_eq!(catalog.display_name(10), Some("traffic light"));
  assert_eq!(catalog.get(3).map(|e| e.name.as_str()), Some("/m/0k4j"));
}

#[test]
fn test_one_shot_pipeline() {
  let dir = tempfile::tempdir().unwrap();
  let input_path = dir.path().join("input.png");
  let tensors_path = dir.path().join("input.json");
  let image_path = dir.path().join("out").join("output.png");
  let record_path = dir.path().join("out").join("output.json");

  RgbImage::new(200, 100).save(&input_path).unwrap();
  std::fs::write(&tensors_path, TENSORS).unwrap();

  let catalog = LabelCatalog::parse(LABEL_MAP).unwrap();
  let input = InputWrapper::from_url(&url("image", &input_path, "")).unwrap();
  let model = TensorDump::from_url(&url("tensors", &tensors_path, "")).unwrap();
  let outputs = vec![
    OutputWrapper::from_url(&url("image", &image_path, "")).unwrap(),
    OutputWrapper::from_url(&url("record", &record_path, "?format=json")).unwrap(),
  ];

  let annotations = OneShotTask::new(catalog, DetectionDecoder::default())
    .run_task(input, model, outputs)
    .unwrap();

  assert_eq!(annotations.len(), 2);
  assert_eq!(annotations[0].label, "traffic light");
  assert_eq!(annotations[0].caption(), "traffic light:93%");
  assert_eq!(
    (
      annotations[0].rect.x,
      annotations[0].rect.y,
      annotations[0].rect.width,
      annotations[0].rect.height
    ),
    (40, 10, 120, 50)
  );
  assert_eq!(annotations[1].label, "");

  let rendered = image::open(&image_path).unwrap().into_rgb8();
  assert_eq!(rendered.dimensions(), (200, 100));
  assert_eq!(rendered.get_pixel(40, 10).0, [255, 0, 0]);

  let record: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(&record_path).unwrap()).unwrap();
  assert_eq!(record["annotations"].as_array().unwrap().len(), 2);
  assert_eq!(record["annotations"][0]["label"], "traffic light");
}

#[test]
fn test_malformed_label_map_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("broken.pbtxt");
  std::fs::write(&path, "id: 1\ndisplay_name: \"person\"\n").unwrap();
  assert!(LabelCatalog::from_path(&path).is_err());
}
