// SPDX-License-Identifier: MIT
//! Typed domain records and their document codecs.
//!
//! Decoding is tolerant: a document that is missing a required field or
//! carries a malformed value yields `None` instead of an error, and the
//! caller drops it from the typed snapshot. Aggregates therefore never see
//! NaN or negative garbage from a bad remote write.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::store::{Document, Fields};

/// Logical collection holding one `{ name }` document per exercise creation.
pub const EXERCISES: &str = "exercises";
/// Logical collection of workout set logs.
pub const WORKOUTS: &str = "workouts";
/// Logical collection of body-weight entries.
pub const BODYWEIGHTS: &str = "bodyweights";

/// Read-side aliases for the body-weight value, first match wins.
pub const WEIGHT_ALIASES: [&str; 3] = ["weight", "value", "kg"];

/// One logged set group for an exercise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLog {
    pub id: String,
    pub name: String,
    pub sets: u32,
    pub weight: f64,
    pub created: DateTime<Utc>,
}

impl WorkoutLog {
    /// Decode a raw `workouts` document. Requires a non-empty `name`, `sets`
    /// truncating to an integer of at least 1, a finite non-negative
    /// `weight`, and an RFC 3339 `created`.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let name = doc.str_field("name")?;
        if name.is_empty() {
            return None;
        }
        let sets = doc.num_field("sets")?;
        if sets < 1.0 {
            return None;
        }
        let weight = doc.num_field("weight")?;
        if weight < 0.0 {
            return None;
        }
        Some(Self {
            id: doc.id.clone(),
            name: name.to_string(),
            sets: sets as u32,
            weight,
            created: parse_created(doc)?,
        })
    }

    /// Training volume contributed by this log.
    pub fn volume(&self) -> f64 {
        f64::from(self.sets) * self.weight
    }
}

/// One body-weight measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyWeightEntry {
    pub id: String,
    pub weight: f64,
    pub created: DateTime<Utc>,
}

impl BodyWeightEntry {
    /// Decode a raw `bodyweights` document, accepting any [`WEIGHT_ALIASES`]
    /// field for the value.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let weight = WEIGHT_ALIASES
            .iter()
            .find_map(|field| doc.num_field(field))?;
        if weight < 0.0 {
            return None;
        }
        Some(Self {
            id: doc.id.clone(),
            weight,
            created: parse_created(doc)?,
        })
    }
}

/// Decode an `exercises` document down to its name.
pub fn exercise_name(doc: &Document) -> Option<String> {
    let name = doc.str_field("name")?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn parse_created(doc: &Document) -> Option<DateTime<Utc>> {
    let raw = doc.str_field("created")?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Wire form of a timestamp: RFC 3339 UTC with millisecond precision, so
/// string comparison in the store orders chronologically.
pub fn encode_created(created: DateTime<Utc>) -> Value {
    Value::String(created.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn workout_fields(name: &str, sets: u32, weight: f64, created: DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".into(), json!(name));
    fields.insert("sets".into(), json!(sets));
    fields.insert("weight".into(), json!(weight));
    fields.insert("created".into(), encode_created(created));
    fields
}

pub fn body_weight_fields(weight_field: &str, weight: f64, created: DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert(weight_field.into(), json!(weight));
    fields.insert("created".into(), encode_created(created));
    fields
}

pub fn exercise_fields(name: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".into(), json!(name));
    fields
}
