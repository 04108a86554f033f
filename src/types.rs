use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A request field as it arrived on the wire. Clients send numbers both as
/// JSON numbers and as strings, so nothing is coerced until validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{:?}", s),
            FieldValue::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Raw prediction request. Every field is optional here; a missing field is
/// reported by the encoder, not by the JSON extractor.
///
/// Categorical fields keep an explicit `null` as `Some(FieldValue::Other(Null))`
/// so it is judged as an unknown label rather than an absent key. A `null`
/// numeric field is indistinguishable from a missing one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default, deserialize_with = "present")]
    pub vehicle: Option<FieldValue>,
    pub engine: Option<FieldValue>,
    pub cyl: Option<FieldValue>,
    #[serde(default, deserialize_with = "present")]
    pub trans: Option<FieldValue>,
    pub co2: Option<FieldValue>,
    #[serde(default, deserialize_with = "present")]
    pub fuel: Option<FieldValue>,
}

// Only called when the key exists, so `null` lands in `FieldValue::Other`.
fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<FieldValue>, D::Error> {
    FieldValue::deserialize(d).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
