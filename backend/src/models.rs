use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub const FEATURE_COUNT: usize = 15;

/// Allowed values for a single input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// 0 or 1.
    Binary,
    /// Strictly positive, unbounded.
    Positive,
    /// Symptom flag encoded as 1 (no) / 2 (yes).
    Symptom,
}

impl Domain {
    pub fn contains(self, value: i64) -> bool {
        match self {
            Domain::Binary => (0..=1).contains(&value),
            Domain::Positive => value > 0,
            Domain::Symptom => (1..=2).contains(&value),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Domain::Binary => "[0, 1]",
            Domain::Positive => "> 0",
            Domain::Symptom => "[1, 2]",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub domain: Domain,
}

const fn field(name: &'static str, domain: Domain) -> FieldSpec {
    FieldSpec { name, domain }
}

/// Input fields in the order the model consumes them. The classifier is
/// positional, so this order must match the one it was trained on.
pub const FIELDS: [FieldSpec; FEATURE_COUNT] = [
    field("gender", Domain::Binary),
    field("age", Domain::Positive),
    field("smoking", Domain::Symptom),
    field("yellow_fingers", Domain::Symptom),
    field("anxiety", Domain::Symptom),
    field("peer_pressure", Domain::Symptom),
    field("chronic_disease", Domain::Symptom),
    field("fatigue", Domain::Symptom),
    field("allergy", Domain::Symptom),
    field("wheezing", Domain::Symptom),
    field("alcohol_consuming", Domain::Symptom),
    field("coughing", Domain::Symptom),
    field("shortness_of_breath", Domain::Symptom),
    field("swallowing_difficulty", Domain::Symptom),
    field("chest_pain", Domain::Symptom),
];

pub fn feature_names() -> Vec<String> {
    FIELDS.iter().map(|f| f.name.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("field `{field}` is required")]
    MissingField { field: &'static str },

    #[error("field `{field}` cannot be blank")]
    BlankValue { field: &'static str },

    #[error("field `{field}` must be {expected} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        expected: &'static str,
    },

    #[error("field `{field}` must be an integer (got {value})")]
    TypeMismatch { field: &'static str, value: String },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::BlankValue { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::TypeMismatch { field, .. } => field,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "missing_field",
            ValidationError::BlankValue { .. } => "blank_value",
            ValidationError::OutOfRange { .. } => "out_of_range",
            ValidationError::TypeMismatch { .. } => "type_mismatch",
        }
    }

    pub fn to_detail(&self) -> FieldErrorDetail {
        let (expected, value) = match self {
            ValidationError::OutOfRange {
                value, expected, ..
            } => (Some(*expected), Some(Value::from(*value))),
            _ => (None, None),
        };
        FieldErrorDetail {
            field: self.field().to_string(),
            kind: self.kind(),
            msg: self.to_string(),
            expected,
            value,
        }
    }
}

/// Every field-level failure found in one payload, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(ValidationError::field).collect()
    }

    #[cfg(test)]
    pub fn for_field(&self, name: &str) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.field() == name)
    }

    pub fn to_details(&self) -> Vec<FieldErrorDetail> {
        self.0.iter().map(ValidationError::to_detail).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FieldErrorDetail {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Body of a 422 response.
#[derive(Debug, Serialize)]
pub struct ValidationFailure {
    pub detail: Vec<FieldErrorDetail>,
}

impl From<&ValidationErrors> for ValidationFailure {
    fn from(errors: &ValidationErrors) -> Self {
        ValidationFailure {
            detail: errors.to_details(),
        }
    }
}

/// A validated patient record. Values are stored in `FIELDS` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRecord {
    values: [i64; FEATURE_COUNT],
}

impl PatientRecord {
    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, ValidationErrors> {
        let mut values = [0i64; FEATURE_COUNT];
        let mut errors = Vec::new();

        for (slot, spec) in values.iter_mut().zip(FIELDS.iter()) {
            match check_field(spec, payload.get(spec.name)) {
                Ok(v) => *slot = v,
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(PatientRecord { values })
        } else {
            Err(ValidationErrors(errors))
        }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<i64> {
        FIELDS
            .iter()
            .position(|f| f.name == name)
            .map(|i| self.values[i])
    }

    pub fn encode(&self) -> FeatureVector {
        FeatureVector(self.values)
    }
}

fn check_field(spec: &FieldSpec, raw: Option<&Value>) -> Result<i64, ValidationError> {
    let field = spec.name;
    let raw = raw.ok_or(ValidationError::MissingField { field })?;
    if is_blank(raw) {
        return Err(ValidationError::BlankValue { field });
    }
    let value = coerce_int(raw).ok_or_else(|| ValidationError::TypeMismatch {
        field,
        value: raw.to_string(),
    })?;
    if !spec.domain.contains(value) {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            expected: spec.domain.describe(),
        });
    }
    Ok(value)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_number)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
        }
        _ => None,
    }
}

/// Whole numbers beyond the i64 range saturate, leaving the range check to
/// reject them for bounded fields.
fn whole_number(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

/// The positional input handed to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureVector([i64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn values(&self) -> &[i64; FEATURE_COUNT] {
        &self.0
    }

    pub fn to_f32(&self) -> [f32; FEATURE_COUNT] {
        self.0.map(|v| v as f32)
    }
}

pub fn validate_and_encode(payload: &Map<String, Value>) -> Result<FeatureVector, ValidationErrors> {
    PatientRecord::from_payload(payload).map(|record| record.encode())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    Detected,
    NotDetected,
}

impl Diagnosis {
    pub fn from_prediction(prediction: i64) -> Self {
        if prediction == 1 {
            Diagnosis::Detected
        } else {
            Diagnosis::NotDetected
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Diagnosis::Detected => "lung cancer Detected",
            Diagnosis::NotDetected => "No lung cancer Detected",
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PredictionResult {
    pub prediction: i64,
    pub result: String,
}

impl PredictionResult {
    pub fn new(prediction: i64) -> Self {
        PredictionResult {
            prediction,
            result: Diagnosis::from_prediction(prediction).label().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
