//! Header ingestion and normalisation.
//!
//! Headers reach the viewer either as a key/value object or as an ordered
//! list of `{key, value}` cards whose values are still FITS-encoded strings.
//! [`RawHeader`] is the one tagged form both shapes are read into, and
//! [`normalize`] turns it into a [`CanonicalHeader`] with uppercase keys,
//! typed values and a materialised CD matrix. Nothing downstream looks at
//! the original shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::coordinate::ImageSize;
use crate::error::{WcsError, WcsResult};

pub trait KeywordProvider {
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_float(&self, key: &str) -> Option<f64>;
    fn get_int(&self, key: &str) -> Option<i64>;

    fn require_float(&self, key: &str) -> WcsResult<f64> {
        self.get_float(key)
            .ok_or_else(|| WcsError::missing_keyword(key))
    }

    fn require_string(&self, key: &str) -> WcsResult<String> {
        self.get_string(key)
            .ok_or_else(|| WcsError::missing_keyword(key))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Number(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Text(v.to_string())
    }
}

/// Parses a FITS card value string.
///
/// Quoted values stay text (quotes stripped), `T`/`True` and `F`/`False`
/// become booleans, numbers accept the FITS `D` exponent, anything else is
/// kept as text.
pub fn parse_card_value(raw: &str) -> HeaderValue {
    let trimmed = raw.trim();

    if let Some(inner) = strip_quotes(trimmed) {
        return HeaderValue::Text(inner.trim_end().to_string());
    }

    match trimmed {
        "T" | "True" => return HeaderValue::Bool(true),
        "F" | "False" => return HeaderValue::Bool(false),
        _ => {}
    }

    let numeric = trimmed.replace(['D', 'd'], "E");
    match numeric.parse::<f64>() {
        Ok(v) if v.is_finite() => HeaderValue::Number(v),
        _ => HeaderValue::Text(trimmed.to_string()),
    }
}

fn strip_quotes(s: &str) -> Option<&str> {
    if s.len() < 2 {
        return None;
    }
    for quote in ['\'', '"'] {
        if s.starts_with(quote) && s.ends_with(quote) {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCard {
    pub key: String,
    pub value: String,
}

impl HeaderCard {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A header as delivered by the header source, before normalisation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawHeader {
    /// Key/value object with already typed values. Keys may be mixed case.
    Map(Vec<(String, HeaderValue)>),
    /// Ordered cards with FITS-encoded string values.
    Cards(Vec<HeaderCard>),
}

impl RawHeader {
    /// Reads whatever JSON shape the header endpoint returned.
    ///
    /// Objects become [`RawHeader::Map`] (string values are parsed with the
    /// card rules), arrays become [`RawHeader::Cards`]. An object carrying
    /// the header under a `header` or `cards` member is unwrapped first.
    pub fn from_json(value: &Value) -> WcsResult<Self> {
        match value {
            Value::Object(obj) => {
                for wrapper in ["header", "cards"] {
                    if let Some(inner) = obj.get(wrapper) {
                        if inner.is_object() || inner.is_array() {
                            return Self::from_json(inner);
                        }
                    }
                }
                let entries = obj
                    .iter()
                    .filter_map(|(k, v)| json_to_header_value(v).map(|hv| (k.clone(), hv)))
                    .collect();
                Ok(RawHeader::Map(entries))
            }
            Value::Array(items) => {
                let cards = items.iter().filter_map(json_to_card).collect();
                Ok(RawHeader::Cards(cards))
            }
            other => Err(WcsError::malformed_header(format!(
                "expected object or array, got {}",
                json_kind(other)
            ))),
        }
    }

    pub fn from_json_str(text: &str) -> WcsResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    pub fn len(&self) -> usize {
        match self {
            RawHeader::Map(entries) => entries.len(),
            RawHeader::Cards(cards) => cards.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn json_to_header_value(value: &Value) -> Option<HeaderValue> {
    match value {
        Value::Bool(b) => Some(HeaderValue::Bool(*b)),
        Value::Number(n) => n.as_f64().map(HeaderValue::Number),
        Value::String(s) => Some(parse_card_value(s)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_to_card(item: &Value) -> Option<HeaderCard> {
    let (key, value) = match item {
        Value::Object(obj) => (obj.get("key")?, obj.get("value")?),
        Value::Array(pair) if pair.len() == 2 => (&pair[0], &pair[1]),
        _ => return None,
    };
    let key = key.as_str()?;
    let value = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "T".to_string(),
        Value::Bool(false) => "F".to_string(),
        _ => {
            debug!(key, "skipping header card without scalar value");
            return None;
        }
    };
    Some(HeaderCard::new(key, value))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Header with uppercase keys and typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalHeader {
    entries: BTreeMap<String, HeaderValue>,
}

impl CanonicalHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under the trimmed, uppercased key. Empty keys are ignored.
    pub fn insert(&mut self, key: &str, value: impl Into<HeaderValue>) -> &mut Self {
        let key = canonical_key(key);
        if !key.is_empty() {
            self.entries.insert(key, value.into());
        }
        self
    }

    /// Case-insensitive lookup.
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.entries.get(&canonical_key(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The CD matrix, if all four elements are numeric.
    pub fn cd_matrix(&self) -> Option<[[f64; 2]; 2]> {
        Some([
            [self.get_float("CD1_1")?, self.get_float("CD1_2")?],
            [self.get_float("CD2_1")?, self.get_float("CD2_2")?],
        ])
    }

    pub fn to_raw(&self) -> RawHeader {
        RawHeader::Map(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl KeywordProvider for CanonicalHeader {
    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(HeaderValue::as_str).map(str::to_string)
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        let v = self.get_float(key)?;
        if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            Some(v as i64)
        } else {
            None
        }
    }
}

fn canonical_key(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

const CD_KEYS: [[&str; 2]; 2] = [["CD1_1", "CD1_2"], ["CD2_1", "CD2_2"]];
const PC_KEYS: [[&str; 2]; 2] = [["PC1_1", "PC1_2"], ["PC2_1", "PC2_2"]];

/// Normalises a raw header into canonical form.
///
/// Never fails: a header lacking WCS keywords simply comes back without a
/// CD matrix and the solver reports it as unusable later.
pub fn normalize(raw: &RawHeader, image_size: Option<ImageSize>) -> CanonicalHeader {
    let mut header = CanonicalHeader::new();

    match raw {
        RawHeader::Map(entries) => {
            for (key, value) in entries {
                header.insert(key, value.clone());
            }
        }
        RawHeader::Cards(cards) => {
            for card in cards {
                header.insert(&card.key, parse_card_value(&card.value));
            }
        }
    }

    materialize_cd(&mut header);

    header.insert("NAXIS", 2.0);
    if let Some(size) = image_size {
        header.insert("NAXIS1", size.width as f64);
        header.insert("NAXIS2", size.height as f64);
    }

    header
}

fn materialize_cd(header: &mut CanonicalHeader) {
    let has_cd = CD_KEYS
        .iter()
        .flatten()
        .any(|key| header.get_float(key).is_some());

    let cd = if has_cd {
        let mut cd = [[0.0; 2]; 2];
        for (i, row) in CD_KEYS.iter().enumerate() {
            for (j, key) in row.iter().enumerate() {
                cd[i][j] = header.get_float(key).unwrap_or(0.0);
            }
        }
        cd
    } else {
        let (Some(cdelt1), Some(cdelt2)) = (header.get_float("CDELT1"), header.get_float("CDELT2"))
        else {
            return;
        };
        let cdelt = [cdelt1, cdelt2];
        let has_pc = PC_KEYS
            .iter()
            .flatten()
            .any(|key| header.get_float(key).is_some());

        if has_pc {
            cd_from_pc(header, cdelt)
        } else if let Some(crota2) = header.get_float("CROTA2") {
            cd_from_crota(crota2, cdelt)
        } else {
            [[cdelt1, 0.0], [0.0, cdelt2]]
        }
    };

    for (i, row) in CD_KEYS.iter().enumerate() {
        for (j, key) in row.iter().enumerate() {
            header.insert(key, cd[i][j]);
        }
    }
}

fn cd_from_pc(header: &CanonicalHeader, cdelt: [f64; 2]) -> [[f64; 2]; 2] {
    let mut cd = [[0.0; 2]; 2];
    for (i, row) in PC_KEYS.iter().enumerate() {
        for (j, key) in row.iter().enumerate() {
            let identity = if i == j { 1.0 } else { 0.0 };
            cd[i][j] = header.get_float(key).unwrap_or(identity) * cdelt[i];
        }
    }
    cd
}

fn cd_from_crota(crota2_deg: f64, cdelt: [f64; 2]) -> [[f64; 2]; 2] {
    let (s, c) = crota2_deg.to_radians().sin_cos();
    [
        [cdelt[0] * c, -cdelt[1] * s],
        [cdelt[0] * s, cdelt[1] * c],
    ]
}
