//! State reconciliation
//!
//! Diffs desired field values against a live resource, restricted to the
//! resource type's mutable fields, and applies the difference in a single
//! update call.

use super::params::DesiredConfig;
use super::result::ActionRecord;
use crate::error::Result;
use crate::linode::LinodeClient;
use serde_json::{Map, Value};

/// A mutable field whose desired value differs from the remote value
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// Structural equality between a desired value and the remote value.
///
/// Objects match when every desired key matches (extra remote keys are
/// ignored), arrays of scalars compare as multisets, and numbers compare
/// numerically.
pub fn values_match(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Object(d), Value::Object(c)) => d
            .iter()
            .all(|(k, dv)| values_match(dv, c.get(k).unwrap_or(&Value::Null))),
        (Value::Array(d), Value::Array(c)) => arrays_match(d, c),
        (Value::Number(d), Value::Number(c)) => d == c || d.as_f64() == c.as_f64(),
        (d, c) => d == c,
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Sort key for multiset comparison; numbers are keyed by value so `1` and `1.0` agree
fn scalar_key(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), |f| f.to_string()),
        other => other.to_string(),
    }
}

fn arrays_match(desired: &[Value], current: &[Value]) -> bool {
    if desired.len() != current.len() {
        return false;
    }

    if desired.iter().chain(current).all(is_scalar) {
        let mut d: Vec<String> = desired.iter().map(scalar_key).collect();
        let mut c: Vec<String> = current.iter().map(scalar_key).collect();
        d.sort_unstable();
        c.sort_unstable();
        return d == c;
    }

    desired.iter().zip(current).all(|(d, c)| values_match(d, c))
}

/// Compute the changes needed on `current` for the mutable fields of `desired`.
///
/// Fields outside `mutable` are never compared. Fields the remote object does
/// not expose are skipped.
pub fn compute_diff(
    current: &Value,
    desired: &DesiredConfig,
    mutable: &[&str],
) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for (field, new) in desired.iter() {
        if !mutable.contains(&field.as_str()) {
            tracing::debug!("Ignoring non-mutable field {}", field);
            continue;
        }

        let Some(old) = current.get(field) else {
            tracing::debug!("Remote resource does not expose {}", field);
            continue;
        };

        if !values_match(new, old) {
            changes.push(FieldChange {
                field: field.clone(),
                old: old.clone(),
                new: new.clone(),
            });
        }
    }

    changes
}

/// Applies mutable-field diffs to one resource path
pub struct Reconciler<'a> {
    client: &'a LinodeClient,
    path: String,
    mutable: &'a [&'a str],
    full_document: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(client: &'a LinodeClient, path: impl Into<String>, mutable: &'a [&'a str]) -> Self {
        Self {
            client,
            path: path.into(),
            mutable,
            full_document: false,
        }
    }

    /// Send every mutable field instead of only the changed ones, for
    /// endpoints that replace the whole document.
    pub fn full_document(mut self) -> Self {
        self.full_document = true;
        self
    }

    /// Diff and apply. Returns the names of the fields that changed; zero
    /// mutation calls are made when nothing differs.
    pub async fn apply(
        &self,
        current: &Value,
        desired: &DesiredConfig,
        actions: &mut ActionRecord,
    ) -> Result<Vec<String>> {
        let changes = compute_diff(current, desired, self.mutable);
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        let body = if self.full_document {
            self.full_body(current, desired)
        } else {
            Value::Object(
                changes
                    .iter()
                    .map(|c| (c.field.clone(), c.new.clone()))
                    .collect(),
            )
        };

        self.client.put(&self.path, &body).await?;

        for change in &changes {
            actions.register(format!(
                "Updated {}: {} -> {}",
                change.field, change.old, change.new
            ));
        }

        Ok(changes.into_iter().map(|c| c.field).collect())
    }

    fn full_body(&self, current: &Value, desired: &DesiredConfig) -> Value {
        let mut body = Map::new();
        for field in self.mutable {
            if let Some(value) = desired.get(field).or_else(|| current.get(*field)) {
                body.insert(field.to_string(), value.clone());
            }
        }
        Value::Object(body)
    }
}
