use indexmap::IndexMap;
use rand::RngExt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An RGB color with each channel in `[0.0, 1.0]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Ordered label name -> color mapping. Insertion order is the display and apply order.
pub type LabelGroup = IndexMap<String, LabelColor>;

impl LabelColor {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from raw channel values, accepting exactly three finite values in range.
    pub fn from_components(values: &[f64]) -> Option<Self> {
        match values {
            [r, g, b] if [r, g, b].iter().all(|c| c.is_finite() && (0.0..=1.0).contains(*c)) => {
                Some(Self::new(*r, *g, *b))
            }
            _ => None,
        }
    }

    /// Decodes a persisted JSON value, returning `None` for anything but `[r, g, b]`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let items = value.as_array()?;
        let channels = items
            .iter()
            .map(serde_json::Value::as_f64)
            .collect::<Option<Vec<f64>>>()?;
        Self::from_components(&channels)
    }

    /// A uniformly random color, used only when a supplied color is unusable.
    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self::new(
            rng.random_range(0.0..=1.0),
            rng.random_range(0.0..=1.0),
            rng.random_range(0.0..=1.0),
        )
    }

    /// Euclidean distance in RGB space.
    pub fn distance(&self, other: &LabelColor) -> f64 {
        ((self.r - other.r).powi(2) + (self.g - other.g).powi(2) + (self.b - other.b).powi(2))
            .sqrt()
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[f64; 3]> for LabelColor {
    fn from([r, g, b]: [f64; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl Serialize for LabelColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LabelColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <[f64; 3]>::deserialize(deserializer).map(LabelColor::from)
    }
}

/// Reasons a save request is rejected before it reaches the store.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LabelError {
    #[error("group name is empty")]
    EmptyGroupName,
    #[error("label list is empty")]
    EmptyLabelList,
}

/// Splits multi-line input into trimmed, non-blank label names.
pub fn parse_label_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Checks a save request and returns the trimmed group name.
pub fn validate_save_request(name: &str, labels: &[String]) -> Result<String, LabelError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LabelError::EmptyGroupName);
    }
    if labels.iter().all(|label| label.trim().is_empty()) {
        return Err(LabelError::EmptyLabelList);
    }
    Ok(name.to_string())
}
