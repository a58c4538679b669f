//! Payload fixtures.

use serde_json::{Value, json};

/// A small payload with one shape, tagged with `n` so records are distinguishable.
pub fn sample_payload(n: usize) -> Value {
    json!({
        "shapes": [
            {"kind": "ellipse", "cx": n, "cy": n * 2, "rx": 5, "ry": 3, "label": format!("finding-{n}")}
        ],
        "measurements": [{"kind": "length", "value": 12.5, "unit": "mm"}]
    })
}

/// A payload carrying a top-level `metadata` object.
pub fn payload_with_metadata(n: usize, study_id: Option<&str>, patient_id: Option<&str>) -> Value {
    let mut payload = sample_payload(n);
    let mut metadata = serde_json::Map::new();
    if let Some(study_id) = study_id {
        metadata.insert("studyId".to_string(), json!(study_id));
    }
    if let Some(patient_id) = patient_id {
        metadata.insert("patientId".to_string(), json!(patient_id));
    }
    payload["metadata"] = Value::Object(metadata);
    payload
}
