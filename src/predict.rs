use ndarray::{Array1, Axis};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{category, error::PredictError, store::ModelStore};

pub const MONTH_COLUMN: &str = "Month";
pub const DAY_COLUMN: &str = "Date_";
pub const YEAR_COLUMN: &str = "Year";
pub const CITY_PREFIX: &str = "City_";

/// Name looked up for a missing or null city.
pub const NO_CITY: &str = "None";

/// A prediction query. Calendar values are taken as-is, no range checks are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub month: i64,
    pub day: i64,
    pub year: i64,
    pub city: String,
}

impl PredictionRequest {
    pub fn new(month: i64, day: i64, year: i64, city: impl Into<String>) -> Self {
        Self {
            month,
            day,
            year,
            city: city.into(),
        }
    }

    /// Decodes a JSON object body, coercing the calendar fields to integers.
    ///
    /// Integers pass through, floats are truncated toward zero, booleans become 0 or 1 and
    /// strings are parsed as base-10 integers. Anything else is an `InvalidField`. Any body
    /// that isn't a JSON object is an `InvalidBody`.
    ///
    /// The city is never rejected here: strings are kept as sent, a missing or null city
    /// becomes [`NO_CITY`] and any other value is looked up by its JSON text.
    pub fn from_slice(body: &[u8]) -> Result<Self, PredictError> {
        let raw: Map<String, Value> =
            serde_json::from_slice(body).map_err(PredictError::InvalidBody)?;
        let field = |name: &str| raw.get(name).cloned().unwrap_or(Value::Null);

        let month = coerce_int("month", &field("month"))?;
        let day = coerce_int("day", &field("day"))?;
        let year = coerce_int("year", &field("year"))?;

        let city = match field("city") {
            Value::String(city) => city,
            Value::Null => NO_CITY.to_string(),
            other => other.to_string(),
        };

        Ok(Self {
            month,
            day,
            year,
            city,
        })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn coerce_int(field: &'static str, value: &Value) -> Result<i64, PredictError> {
    let invalid = |reason: String| PredictError::InvalidField { field, reason };

    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(truncate))
            .ok_or_else(|| invalid(format!("{n} is not representable as an integer"))),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid(format!("'{s}' is not an integer"))),
        other => Err(invalid(format!("expected an integer, got {}", kind_of(other)))),
    }
}

/// Truncates toward zero, `None` when the result doesn't fit an `i64`.
fn truncate(f: f64) -> Option<i64> {
    // 2^63 is exactly representable, i64::MAX is not.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    let t = f.trunc();
    (t >= -LIMIT && t < LIMIT).then(|| t as i64)
}

/// The JSON answer to a successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub aqi: f64,
    pub category: &'static str,
    pub color: &'static str,
    pub city: String,
}

/// Lays out the request as the estimator's input row.
///
/// # Args
/// * `store` - Supplies the column positions.
/// * `request` - The query to encode.
///
/// # Returns
/// A zeroed vector with the date entries set and the request's city column one-hot encoded.
pub fn encode(store: &ModelStore, request: &PredictionRequest) -> Result<Array1<f32>, PredictError> {
    let index = store.index();
    let column = |name: &'static str| index.get(name).ok_or(PredictError::MissingColumn(name));

    let mut x = Array1::<f32>::zeros(store.schema().len());
    x[column(MONTH_COLUMN)?] = request.month as f32;
    x[column(DAY_COLUMN)?] = request.day as f32;
    x[column(YEAR_COLUMN)?] = request.year as f32;

    let city_column = format!("{CITY_PREFIX}{}", request.city);
    let Some(city) = index.get(&city_column) else {
        return Err(PredictError::UnsupportedCity(request.city.clone()));
    };
    x[city] = 1.0;

    Ok(x)
}

/// Runs a full prediction: encode, evaluate, classify.
///
/// # Args
/// * `store` - The loaded model.
/// * `request` - The query.
///
/// # Returns
/// The rounded AQI with its category, or the reason no prediction could be made.
pub fn predict(
    store: &ModelStore,
    request: &PredictionRequest,
) -> Result<PredictionResponse, PredictError> {
    let x = encode(store, request)?;
    let y = store.estimator().predict(x.view().insert_axis(Axis(0)))?;

    let aqi = match y.get(0) {
        Some(&aqi) if aqi.is_finite() => aqi,
        other => return Err(PredictError::InvalidPrediction(other.copied())),
    };

    let category = category::classify(aqi);
    Ok(PredictionResponse {
        aqi: round2(aqi),
        category: category.label,
        color: category.color,
        city: request.city.clone(),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use estimator::{EstimatorErr, Regressor};
    use ndarray::ArrayView1;
    use serde_json::json;

    use super::*;
    use crate::schema::FeatureSchema;

    /// Returns a fixed value, or the sum of the inputs when none is set.
    struct Fixed {
        width: usize,
        value: Option<f64>,
    }

    impl Regressor for Fixed {
        fn n_features(&self) -> usize {
            self.width
        }

        fn predict_row(&self, x: ArrayView1<f32>) -> estimator::Result<f64> {
            self.check_width(x.len())?;
            Ok(self
                .value
                .unwrap_or_else(|| x.iter().map(|&v| f64::from(v)).sum()))
        }
    }

    fn store_with(columns: &[&str], value: Option<f64>) -> ModelStore {
        let names = columns.iter().map(|s| s.to_string()).collect();
        let schema = FeatureSchema::new(names).unwrap();
        let estimator = Fixed {
            width: schema.len(),
            value,
        };
        ModelStore::new(Box::new(estimator), schema).unwrap()
    }

    const COLUMNS: [&str; 5] = ["Year", "Month", "Date_", "City_Delhi", "City_Mumbai"];

    #[test]
    fn encodes_dates_and_one_hot_city() {
        let store = store_with(&COLUMNS, None);
        let x = encode(&store, &PredictionRequest::new(3, 14, 2024, "Mumbai")).unwrap();

        assert_eq!(x.to_vec(), vec![2024.0, 3.0, 14.0, 0.0, 1.0]);
    }

    #[test]
    fn calendar_values_are_not_range_checked() {
        let store = store_with(&COLUMNS, None);
        let x = encode(&store, &PredictionRequest::new(13, 42, -1, "Delhi")).unwrap();

        assert_eq!(x.to_vec(), vec![-1.0, 13.0, 42.0, 1.0, 0.0]);
    }

    #[test]
    fn unknown_city_is_unsupported() {
        let store = store_with(&COLUMNS, None);
        let err = encode(&store, &PredictionRequest::new(1, 1, 2024, "Atlantis")).unwrap_err();

        assert!(matches!(&err, PredictError::UnsupportedCity(city) if city == "Atlantis"));
        assert_eq!(err.to_string(), "City 'Atlantis' not supported");
    }

    #[test]
    fn city_match_is_exact() {
        let store = store_with(&COLUMNS, None);
        let err = encode(&store, &PredictionRequest::new(1, 1, 2024, "delhi")).unwrap_err();

        assert!(matches!(err, PredictError::UnsupportedCity(_)));
    }

    #[test]
    fn missing_date_column_is_reported_before_the_city() {
        let store = store_with(&["Year", "Month", "City_Delhi"], None);
        let err = encode(&store, &PredictionRequest::new(1, 1, 2024, "Atlantis")).unwrap_err();

        assert!(matches!(err, PredictError::MissingColumn("Date_")));
    }

    #[test]
    fn rounds_and_classifies() {
        let store = store_with(&COLUMNS, Some(73.4567));
        let response = predict(&store, &PredictionRequest::new(1, 2, 2023, "Delhi")).unwrap();

        assert_eq!(
            response,
            PredictionResponse {
                aqi: 73.46,
                category: "Satisfactory",
                color: "#9cd84e",
                city: "Delhi".to_string(),
            }
        );
    }

    #[test]
    fn classifies_before_rounding() {
        let store = store_with(&COLUMNS, Some(50.004));
        let response = predict(&store, &PredictionRequest::new(1, 2, 2023, "Delhi")).unwrap();

        assert_eq!(response.aqi, 50.0);
        assert_eq!(response.category, "Satisfactory");
    }

    #[test]
    fn non_finite_prediction_is_an_error() {
        let store = store_with(&COLUMNS, Some(f64::NAN));
        let err = predict(&store, &PredictionRequest::new(1, 2, 2023, "Delhi")).unwrap_err();

        assert!(matches!(err, PredictError::InvalidPrediction(Some(v)) if v.is_nan()));
    }

    #[test]
    fn estimator_failures_propagate() {
        let names = COLUMNS.iter().map(|s| s.to_string()).collect();
        let schema = FeatureSchema::new(names).unwrap();
        let store = ModelStore::new(
            Box::new(Fixed {
                width: 5,
                value: None,
            }),
            schema,
        )
        .unwrap();

        let ok = predict(&store, &PredictionRequest::new(1, 2, 2023, "Delhi")).unwrap();
        assert_eq!(ok.aqi, 2027.0);

        let err = store
            .estimator()
            .predict_row(ndarray::array![1.0].view())
            .unwrap_err();
        assert!(matches!(err, EstimatorErr::SizeMismatch { got: 1, expected: 5 }));
    }

    #[test]
    fn coerces_like_integer_conversion() {
        let body = json!({"month": "4", "day": 17.9, "year": 2024, "city": "Delhi"});
        let request = PredictionRequest::from_slice(body.to_string().as_bytes()).unwrap();
        assert_eq!(request, PredictionRequest::new(4, 17, 2024, "Delhi"));

        let body = json!({"month": true, "day": " 7 ", "year": -3.5, "city": "Delhi"});
        let request = PredictionRequest::from_slice(body.to_string().as_bytes()).unwrap();
        assert_eq!(request, PredictionRequest::new(1, 7, -3, "Delhi"));
    }

    #[test]
    fn rejects_uncoercible_fields() {
        let cases = [
            (json!({"day": 1, "year": 2024, "city": "Delhi"}), "month"),
            (json!({"month": 1, "day": "1.5", "year": 2024, "city": "Delhi"}), "day"),
            (json!({"month": 1, "day": 1, "year": [2024], "city": "Delhi"}), "year"),
            (json!({"month": 1e300, "day": 1, "year": 2024, "city": "Delhi"}), "month"),
            (json!({"month": 1, "day": -1e19, "year": 2024, "city": "Delhi"}), "day"),
        ];

        for (body, expected) in cases {
            let err = PredictionRequest::from_slice(body.to_string().as_bytes()).unwrap_err();
            assert!(
                matches!(err, PredictError::InvalidField { field, .. } if field == expected),
                "{body} should fail on {expected}, got {err}"
            );
        }
    }

    #[test]
    fn rejects_non_json_bodies() {
        let err = PredictionRequest::from_slice(b"month=1").unwrap_err();
        assert!(matches!(err, PredictError::InvalidBody(_)));
    }

    #[test]
    fn rejects_bodies_that_are_not_objects() {
        for body in [r#"[1, 42, 2024, "Delhi"]"#, "42", r#""Delhi""#, "null"] {
            let err = PredictionRequest::from_slice(body.as_bytes()).unwrap_err();
            assert!(matches!(err, PredictError::InvalidBody(_)), "{body} gave {err}");
        }
    }

    #[test]
    fn truncation_stays_within_i64() {
        assert_eq!(truncate(-3.9), Some(-3));
        assert_eq!(truncate(-9_223_372_036_854_775_808.0), Some(i64::MIN));
        assert_eq!(truncate(9_223_372_036_854_775_808.0), None);
        assert_eq!(truncate(f64::NAN), None);
    }

    #[test]
    fn city_is_looked_up_by_its_text() {
        let cases = [
            (json!({"month": 1, "day": 1, "year": 2024}), "None"),
            (json!({"month": 1, "day": 1, "year": 2024, "city": null}), "None"),
            (json!({"month": 1, "day": 1, "year": 2024, "city": 5}), "5"),
            (json!({"month": 1, "day": 1, "year": 2024, "city": " Delhi"}), " Delhi"),
        ];

        for (body, expected) in cases {
            let request = PredictionRequest::from_slice(body.to_string().as_bytes()).unwrap();
            assert_eq!(request.city, expected);
        }
    }

    #[test]
    fn missing_city_is_unsupported() {
        let store = store_with(&COLUMNS, None);
        let body = json!({"month": 1, "day": 1, "year": 2024});
        let request = PredictionRequest::from_slice(body.to_string().as_bytes()).unwrap();
        let err = predict(&store, &request).unwrap_err();

        assert_eq!(err.to_string(), "City 'None' not supported");
    }

    #[test]
    fn numeric_city_matches_its_column() {
        let store = store_with(&["Month", "Date_", "Year", "City_5"], None);
        let body = json!({"month": 1, "day": 1, "year": 2024, "city": 5});
        let request = PredictionRequest::from_slice(body.to_string().as_bytes()).unwrap();

        let x = encode(&store, &request).unwrap();
        assert_eq!(x.to_vec(), vec![1.0, 1.0, 2024.0, 1.0]);
    }
}
