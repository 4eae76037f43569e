//! BSON to JSON value conversion
//!
//! `JsonConverter` walks a BSON value and produces a plain `serde_json`
//! value, replacing BSON-only types with their most common JSON rendering.

use base64::Engine;
use bson::{Binary, Bson, DateTime, Decimal128, Document, Regex, Timestamp, oid::ObjectId};
use serde_json::Value as JsonValue;

/// Converter from BSON values to plain JSON values
#[derive(Debug, Clone, Copy)]
pub struct JsonConverter {
    /// Turn Decimal128 into a JSON number when it parses as one
    numeric_decimals: bool,
}

impl JsonConverter {
    /// Create a new JSON converter
    ///
    /// # Arguments
    /// * `numeric_decimals` - Render Decimal128 as a number when possible
    pub fn new(numeric_decimals: bool) -> Self {
        Self { numeric_decimals }
    }

    /// Converter used for the `simplified` record encoding
    pub fn simplified() -> Self {
        Self::new(true)
    }

    /// Convert a whole document into a JSON object
    pub fn convert_document(&self, doc: &Document) -> JsonValue {
        let mut map = serde_json::Map::new();
        for (key, value) in doc.iter() {
            map.insert(key.clone(), self.convert(value));
        }
        JsonValue::Object(map)
    }

    /// Convert a single BSON value
    pub fn convert(&self, value: &Bson) -> JsonValue {
        match value {
            Bson::String(s) => JsonValue::String(s.clone()),
            Bson::Int32(n) => JsonValue::Number((*n).into()),
            Bson::Int64(n) => JsonValue::Number((*n).into()),
            Bson::Double(f) => self.convert_double(*f),
            Bson::Boolean(b) => JsonValue::Bool(*b),
            Bson::Null | Bson::Undefined => JsonValue::Null,
            Bson::ObjectId(oid) => self.convert_object_id(oid),
            Bson::DateTime(dt) => self.convert_datetime(dt),
            Bson::Decimal128(d) => self.convert_decimal128(d),
            Bson::Array(arr) => JsonValue::Array(arr.iter().map(|v| self.convert(v)).collect()),
            Bson::Document(doc) => self.convert_document(doc),
            Bson::Binary(bin) => self.convert_binary(bin),
            Bson::RegularExpression(regex) => self.convert_regex(regex),
            Bson::Timestamp(ts) => self.convert_timestamp(ts),
            Bson::MinKey => JsonValue::String("MinKey".to_string()),
            Bson::MaxKey => JsonValue::String("MaxKey".to_string()),
            other => other.clone().into_relaxed_extjson(),
        }
    }

    fn convert_double(&self, f: f64) -> JsonValue {
        match serde_json::Number::from_f64(f) {
            Some(n) => JsonValue::Number(n),
            None if f.is_nan() => JsonValue::String("NaN".to_string()),
            None if f.is_sign_negative() => JsonValue::String("-Infinity".to_string()),
            None => JsonValue::String("Infinity".to_string()),
        }
    }

    fn convert_object_id(&self, oid: &ObjectId) -> JsonValue {
        JsonValue::String(oid.to_hex())
    }

    fn convert_datetime(&self, dt: &DateTime) -> JsonValue {
        let iso = dt
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| dt.timestamp_millis().to_string());
        JsonValue::String(iso)
    }

    fn convert_decimal128(&self, d: &Decimal128) -> JsonValue {
        let s = d.to_string();
        if !self.numeric_decimals {
            return JsonValue::String(s);
        }

        // Only values that print back unchanged survive the trip through f64
        s.parse::<f64>()
            .ok()
            .filter(|f| f.to_string() == s)
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::String(s))
    }

    fn convert_binary(&self, bin: &Binary) -> JsonValue {
        JsonValue::String(base64::engine::general_purpose::STANDARD.encode(&bin.bytes))
    }

    fn convert_regex(&self, regex: &Regex) -> JsonValue {
        JsonValue::String(format!("/{}/{}", regex.pattern, regex.options))
    }

    fn convert_timestamp(&self, ts: &Timestamp) -> JsonValue {
        serde_json::json!({ "t": ts.time, "i": ts.increment })
    }
}

impl Default for JsonConverter {
    fn default() -> Self {
        Self::simplified()
    }
}
