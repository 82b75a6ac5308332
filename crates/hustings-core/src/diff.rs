//! Field-level diffs between two snapshots.
//!
//! Both snapshots are flattened into `path → scalar` maps and compared key by
//! key. Output order is path-lexicographic, so identical inputs always give
//! identical diffs. Diffs are for display and audit only; nothing here
//! touches storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::snapshot::Snapshot;

const STANDING_IN: &str = "standing_in";
const PARTY_MEMBERSHIPS: &str = "party_memberships";

/// The kind of change recorded by a [`DiffEntry`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiffOp {
  Add,
  Remove,
  Replace,
}

/// One field-level change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
  pub op:             DiffOp,
  /// `/`-separated path, e.g. `standing_in/2015/post_id`.
  pub path:           String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value:          Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub previous_value: Option<Value>,
}

/// Compute the changes that turn `older` into `newer`.
pub fn diff(older: &Snapshot, newer: &Snapshot) -> Vec<DiffEntry> {
  let old = flatten_snapshot(older);
  let new = flatten_snapshot(newer);
  diff_flat(&old, &new)
}

fn diff_flat(
  old: &BTreeMap<String, Value>,
  new: &BTreeMap<String, Value>,
) -> Vec<DiffEntry> {
  let mut paths: Vec<&String> = old.keys().chain(new.keys()).collect();
  paths.sort();
  paths.dedup();

  paths
    .into_iter()
    .filter_map(|path| match (old.get(path), new.get(path)) {
      (None, Some(value)) => Some(DiffEntry {
        op:             DiffOp::Add,
        path:           path.clone(),
        value:          Some(value.clone()),
        previous_value: None,
      }),
      (Some(previous), None) => Some(DiffEntry {
        op:             DiffOp::Remove,
        path:           path.clone(),
        value:          None,
        previous_value: Some(previous.clone()),
      }),
      (Some(previous), Some(value)) if previous != value => Some(DiffEntry {
        op:             DiffOp::Replace,
        path:           path.clone(),
        value:          Some(value.clone()),
        previous_value: Some(previous.clone()),
      }),
      _ => None,
    })
    .collect()
}

// ─── Flattening ──────────────────────────────────────────────────────────────

/// Flatten a snapshot into its scalar leaves.
///
/// Leaves carrying no data (`null` or `""`) are dropped, except a `null`
/// directly under `standing_in/<election>`: that one means "known not to be
/// standing" and is a fact in its own right. A period entry whose fields are
/// all empty still exists, so it flattens to an empty-object leaf.
pub fn flatten_snapshot(snapshot: &Snapshot) -> BTreeMap<String, Value> {
  let mut out = BTreeMap::new();
  // Serialising a plain struct of strings, maps and vectors cannot fail.
  if let Ok(value) = serde_json::to_value(snapshot) {
    flatten_into(&mut Vec::new(), &value, &mut out);
  }
  out
}

fn flatten_into(
  segments: &mut Vec<String>,
  value: &Value,
  out: &mut BTreeMap<String, Value>,
) {
  match value {
    Value::Object(map) => {
      let before = out.len();
      for (key, child) in map {
        segments.push(escape_segment(key));
        flatten_into(segments, child, out);
        segments.pop();
      }
      if out.len() == before && is_period_entry(segments) {
        out.insert(segments.join("/"), Value::Object(Default::default()));
      }
    }
    Value::Array(items) => {
      for (index, child) in items.iter().enumerate() {
        segments.push(index.to_string());
        flatten_into(segments, child, out);
        segments.pop();
      }
    }
    Value::Null if is_standing_entry(segments) => {
      out.insert(segments.join("/"), Value::Null);
    }
    Value::Null => {}
    Value::String(s) if s.is_empty() => {}
    scalar => {
      out.insert(segments.join("/"), scalar.clone());
    }
  }
}

fn is_standing_entry(segments: &[String]) -> bool {
  segments.len() == 2 && segments[0] == STANDING_IN
}

fn is_period_entry(segments: &[String]) -> bool {
  segments.len() == 2
    && (segments[0] == STANDING_IN || segments[0] == PARTY_MEMBERSHIPS)
}

/// JSON-pointer style escaping so a `/` inside an election slug or extra
/// field name cannot be confused with a separator.
fn escape_segment(segment: &str) -> String {
  segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(segment: &str) -> String {
  segment.replace("~1", "/").replace("~0", "~")
}

// ─── Human-readable rendering ────────────────────────────────────────────────

impl DiffEntry {
  /// A one-line English description, as shown in audit feeds and digests.
  pub fn describe(&self) -> String {
    let segments: Vec<String> = self.path.split('/').map(unescape_segment).collect();
    let render = |value: &Option<Value>| {
      value
        .as_ref()
        .map(|v| describe_value(&segments, v))
        .unwrap_or_default()
    };
    match self.op {
      DiffOp::Add => format!("Added: {}", render(&self.value)),
      DiffOp::Remove => format!("Removed: {}", render(&self.previous_value)),
      DiffOp::Replace => format!(
        "Changed: {} (previously: {})",
        render(&self.value),
        render(&self.previous_value)
      ),
    }
  }
}

fn describe_value(segments: &[String], value: &Value) -> String {
  let plain = match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  };
  let attribute = segments.first().map(String::as_str);
  let election = segments.get(1).map(String::as_str).unwrap_or_default();
  let leaf = segments.get(2).map(String::as_str);

  match (attribute, leaf) {
    (Some(STANDING_IN), None) if value.is_null() => {
      format!("known not to be standing in the {election} election")
    }
    (Some(STANDING_IN), None) => {
      format!("standing in the {election} election")
    }
    (Some(PARTY_MEMBERSHIPS), None) => {
      format!("a party member in the {election} election")
    }
    (Some(STANDING_IN), Some("post_id")) => {
      format!("standing for the post with ID {plain} in the {election} election")
    }
    (Some(STANDING_IN), Some("post_label")) => {
      format!("standing in {plain} in the {election} election")
    }
    (Some(STANDING_IN), Some("elected")) => match value.as_bool() {
      Some(true) => format!("elected in the {election} election"),
      _ => format!("not elected in the {election} election"),
    },
    (Some(STANDING_IN), Some("party_list_position")) => format!(
      "at position {plain} in their party list in the {election} election"
    ),
    (Some(PARTY_MEMBERSHIPS), Some("name")) => {
      format!("standing for the party '{plain}' in the {election} election")
    }
    (Some(PARTY_MEMBERSHIPS), Some("id")) => {
      format!("standing for the party with ID {plain} in the {election} election")
    }
    _ => format!("{} = {plain}", segments.join(".")),
  }
}
