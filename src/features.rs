//! Request validation and feature encoding.
//!
//! Turns a raw [`PredictRequest`] into the fixed-order vector the scaler/model
//! pair was trained on. Every field is converted first (in request order), and
//! only then are unknown categorical labels reported, so a malformed number
//! always wins over an unknown label.

use crate::{
    error::PredictError,
    schema::{CategoryTable, SchemaVersion},
    types::{FieldValue, PredictRequest},
};

/// Largest accepted magnitude for a numeric field, so an overflow inside the
/// scaler or model points at the artifacts rather than the request.
pub const MAX_FEATURE_MAGNITUDE: f64 = 1e12;

/// A request whose fields have all been converted and looked up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedRecord {
    pub vehicle: u32,
    pub engine: f64,
    pub cyl: i64,
    pub trans: u32,
    pub co2: f64,
    pub fuel: u32,
}

/// Ordered model input. Its length always equals the width of the schema it
/// was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl EncodedRecord {
    /// `[vehicle, engine, cyl, trans, co2, fuel]` followed by the schema's placeholders.
    pub fn to_features(&self, schema: SchemaVersion) -> FeatureVector {
        let mut v = Vec::with_capacity(schema.width());
        v.extend_from_slice(&[
            self.vehicle as f64,
            self.engine,
            self.cyl as f64,
            self.trans as f64,
            self.co2,
            self.fuel as f64,
        ]);
        v.extend_from_slice(schema.placeholders());
        FeatureVector(v)
    }
}

/// Validate and encode a request against `schema`.
pub fn validate(req: &PredictRequest, schema: SchemaVersion) -> Result<EncodedRecord, PredictError> {
    let vehicle = lookup(schema.vehicle_table(), required(&req.vehicle, "vehicle")?);
    let engine = parse_real(required(&req.engine, "engine")?, "engine")?;
    let cyl = parse_integer(required(&req.cyl, "cyl")?, "cyl")?;
    let trans = lookup(schema.trans_table(), required(&req.trans, "trans")?);
    let co2 = parse_real(required(&req.co2, "co2")?, "co2")?;
    let fuel = lookup(schema.fuel_table(), required(&req.fuel, "fuel")?);

    match (vehicle, trans, fuel) {
        (Some(vehicle), Some(trans), Some(fuel)) => Ok(EncodedRecord {
            vehicle,
            engine,
            cyl,
            trans,
            co2,
            fuel,
        }),
        _ => Err(PredictError::Validation),
    }
}

/// Shorthand for [`validate`] followed by [`EncodedRecord::to_features`].
pub fn encode(req: &PredictRequest, schema: SchemaVersion) -> Result<FeatureVector, PredictError> {
    validate(req, schema).map(|r| r.to_features(schema))
}

fn required<'a>(
    value: &'a Option<FieldValue>,
    field: &'static str,
) -> Result<&'a FieldValue, PredictError> {
    value.as_ref().ok_or(PredictError::MissingField(field))
}

// Non-string values can never match a label.
fn lookup(table: &CategoryTable, value: &FieldValue) -> Option<u32> {
    match value {
        FieldValue::Text(label) => table.code(label),
        _ => None,
    }
}

fn parse_real(value: &FieldValue, field: &'static str) -> Result<f64, PredictError> {
    let parsed = match value {
        FieldValue::Number(n) => n.as_f64(),
        FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
        FieldValue::Other(_) => None,
    };
    let x = parsed
        .filter(|x| x.is_finite())
        .ok_or_else(|| invalid_number(field, "real number", value))?;
    check_range(x, field, value)?;
    Ok(x)
}

fn parse_integer(value: &FieldValue, field: &'static str) -> Result<i64, PredictError> {
    let parsed = match value {
        FieldValue::Number(n) => n.as_i64().or_else(|| {
            // Fractional JSON numbers truncate toward zero.
            n.as_f64()
                .filter(|x| x.is_finite() && x.abs() < i64::MAX as f64)
                .map(|x| x.trunc() as i64)
        }),
        FieldValue::Text(s) => s.trim().parse::<i64>().ok(),
        FieldValue::Other(_) => None,
    };
    let n = parsed.ok_or_else(|| invalid_number(field, "integer", value))?;
    check_range(n as f64, field, value)?;
    Ok(n)
}

fn check_range(x: f64, field: &'static str, value: &FieldValue) -> Result<(), PredictError> {
    if x.abs() > MAX_FEATURE_MAGNITUDE {
        return Err(PredictError::OutOfRange {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn invalid_number(field: &'static str, expected: &'static str, value: &FieldValue) -> PredictError {
    PredictError::InvalidNumber {
        field,
        expected,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(v: serde_json::Value) -> PredictRequest {
        serde_json::from_value(v).unwrap()
    }

    fn suv() -> PredictRequest {
        request(json!({
            "vehicle": "SUV", "engine": "2.0", "cyl": "4",
            "trans": "Auto", "co2": "180", "fuel": "Petrol"
        }))
    }

    #[test]
    fn encodes_six_feature_vector() {
        let fv = encode(&suv(), SchemaVersion::V6).unwrap();
        assert_eq!(fv.as_slice(), &[1.0, 2.0, 4.0, 0.0, 180.0, 0.0]);
    }

    #[test]
    fn encodes_nine_feature_vector_with_placeholders() {
        let req = request(json!({
            "vehicle": "Sedan", "engine": "1.8", "cyl": "4",
            "trans": "A", "co2": "150", "fuel": "X"
        }));
        let fv = encode(&req, SchemaVersion::V9).unwrap();
        assert_eq!(
            fv.as_slice(),
            &[2.0, 1.8, 4.0, 4.0, 150.0, 0.0, 2020.0, 0.0, 0.0]
        );
    }

    #[test]
    fn width_always_matches_schema() {
        for schema in [SchemaVersion::V6, SchemaVersion::V9] {
            let req = request(json!({
                "vehicle": schema.vehicle_table().labels().next().unwrap(),
                "engine": 1.0, "cyl": 3,
                "trans": schema.trans_table().labels().next().unwrap(),
                "co2": 99.5,
                "fuel": schema.fuel_table().labels().next().unwrap(),
            }));
            assert_eq!(encode(&req, schema).unwrap().len(), schema.width());
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encode(&suv(), SchemaVersion::V6).unwrap();
        let b = encode(&suv(), SchemaVersion::V6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn accepts_json_numbers() {
        let req = request(json!({
            "vehicle": "Hatchback", "engine": 1.4, "cyl": 4,
            "trans": "Manual", "co2": 120, "fuel": "CNG"
        }));
        let rec = validate(&req, SchemaVersion::V6).unwrap();
        assert_eq!(
            rec,
            EncodedRecord { vehicle: 2, engine: 1.4, cyl: 4, trans: 1, co2: 120.0, fuel: 2 }
        );
    }

    #[test]
    fn cylinder_float_truncates() {
        let mut req = suv();
        req.cyl = Some(FieldValue::Number(serde_json::Number::from_f64(6.9).unwrap()));
        assert_eq!(validate(&req, SchemaVersion::V6).unwrap().cyl, 6);
    }

    #[test]
    fn numeric_strings_may_be_padded() {
        let mut req = suv();
        req.engine = Some(FieldValue::Text(" 2.5 ".into()));
        req.cyl = Some(FieldValue::Text(" 8\n".into()));
        let rec = validate(&req, SchemaVersion::V6).unwrap();
        assert_eq!(rec.engine, 2.5);
        assert_eq!(rec.cyl, 8);
    }

    #[test]
    fn unknown_label_in_any_field_is_validation_error() {
        for (field, bad) in [("vehicle", "Truck"), ("trans", "CVT"), ("fuel", "Hydrogen")] {
            let mut v = json!({
                "vehicle": "SUV", "engine": "2.0", "cyl": "4",
                "trans": "Auto", "co2": "180", "fuel": "Petrol"
            });
            v[field] = json!(bad);
            let err = encode(&request(v), SchemaVersion::V6).unwrap_err();
            assert!(matches!(err, PredictError::Validation), "{field}: {err:?}");
        }
    }

    #[test]
    fn non_string_label_is_validation_error() {
        let mut req = suv();
        req.vehicle = Some(FieldValue::Number(1.into()));
        assert!(matches!(
            validate(&req, SchemaVersion::V6),
            Err(PredictError::Validation)
        ));
    }

    #[test]
    fn labels_from_other_schema_are_rejected() {
        // "Auto" is a V6 transmission, not a V9 one.
        let req = request(json!({
            "vehicle": "SUV", "engine": "2.0", "cyl": "4",
            "trans": "Auto", "co2": "180", "fuel": "X"
        }));
        assert!(matches!(
            validate(&req, SchemaVersion::V9),
            Err(PredictError::Validation)
        ));
    }

    #[test]
    fn missing_field_is_malformed() {
        let mut req = suv();
        req.engine = None;
        match validate(&req, SchemaVersion::V6) {
            Err(PredictError::MissingField(f)) => assert_eq!(f, "engine"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_numbers_are_malformed() {
        let mut req = suv();
        req.co2 = Some(FieldValue::Text("lots".into()));
        assert!(matches!(
            validate(&req, SchemaVersion::V6),
            Err(PredictError::InvalidNumber { field: "co2", .. })
        ));

        let mut req = suv();
        req.cyl = Some(FieldValue::Text("4.5".into()));
        assert!(matches!(
            validate(&req, SchemaVersion::V6),
            Err(PredictError::InvalidNumber { field: "cyl", .. })
        ));

        let mut req = suv();
        req.engine = Some(FieldValue::Other(json!([2.0])));
        assert!(matches!(
            validate(&req, SchemaVersion::V6),
            Err(PredictError::InvalidNumber { field: "engine", .. })
        ));
    }

    #[test]
    fn non_finite_reals_are_malformed() {
        for s in ["nan", "inf", "-infinity"] {
            let mut req = suv();
            req.engine = Some(FieldValue::Text(s.into()));
            assert!(
                matches!(validate(&req, SchemaVersion::V6), Err(PredictError::InvalidNumber { .. })),
                "{s} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_number_wins_over_unknown_label() {
        let mut req = suv();
        req.vehicle = Some(FieldValue::Text("Truck".into()));
        req.engine = None;
        assert!(matches!(
            validate(&req, SchemaVersion::V6),
            Err(PredictError::MissingField("engine"))
        ));
    }

    #[test]
    fn null_label_is_validation_error() {
        for field in ["vehicle", "trans", "fuel"] {
            let mut v = json!({
                "vehicle": "SUV", "engine": "2.0", "cyl": "4",
                "trans": "Auto", "co2": "180", "fuel": "Petrol"
            });
            v[field] = serde_json::Value::Null;
            let err = validate(&request(v), SchemaVersion::V6).unwrap_err();
            assert!(matches!(err, PredictError::Validation), "{field}: {err:?}");
        }
    }

    #[test]
    fn absent_label_is_still_missing_field() {
        let req = request(json!({
            "engine": "2.0", "cyl": "4", "trans": "Auto", "co2": "180", "fuel": "Petrol"
        }));
        assert!(matches!(
            validate(&req, SchemaVersion::V6),
            Err(PredictError::MissingField("vehicle"))
        ));
    }

    #[test]
    fn null_number_is_missing_field() {
        let mut v = json!({
            "vehicle": "SUV", "engine": "2.0", "cyl": "4",
            "trans": "Auto", "co2": "180", "fuel": "Petrol"
        });
        v["co2"] = serde_json::Value::Null;
        assert!(matches!(
            validate(&request(v), SchemaVersion::V6),
            Err(PredictError::MissingField("co2"))
        ));
    }

    #[test]
    fn huge_numbers_are_out_of_range() {
        let mut req = suv();
        req.engine = Some(FieldValue::Text("1e308".into()));
        assert!(matches!(
            validate(&req, SchemaVersion::V6),
            Err(PredictError::OutOfRange { field: "engine", .. })
        ));

        let mut req = suv();
        req.cyl = Some(FieldValue::Number(i64::MAX.into()));
        assert!(matches!(
            validate(&req, SchemaVersion::V6),
            Err(PredictError::OutOfRange { field: "cyl", .. })
        ));

        let mut req = suv();
        req.co2 = Some(FieldValue::Text(MAX_FEATURE_MAGNITUDE.to_string()));
        assert!(validate(&req, SchemaVersion::V6).is_ok());
    }
}
