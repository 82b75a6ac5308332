//! Snapshot types — the full, immutable state of a person at one point in
//! history.
//!
//! A snapshot is a plain value. It is built once when an edit is accepted and
//! is never mutated afterwards; the version log only ever hands out shared
//! references to stored snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::person::{ElectionSlug, PeriodMap};

// ─── Nested values ───────────────────────────────────────────────────────────

/// An alternative or former name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherName {
  pub name:       String,
  /// Clarifying context, e.g. "full name including middle name".
  pub note:       String,
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
}

impl OtherName {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }
}

/// An identifier for the person in some external scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
  pub scheme:     String,
  pub identifier: String,
}

/// A known candidacy in one election.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
  pub post_id:             String,
  /// Short human-readable label of the post, e.g. "Dulwich and West Norwood".
  pub post_label:          String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub elected:             Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub party_list_position: Option<u32>,
}

/// The party a person stood for in one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
  pub id:   String,
  pub name: String,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Everything interesting about a person at one point in time.
///
/// Empty strings mean "no value" for the simple fields, matching how the
/// edit forms submit them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
  // ── Simple fields ───────────────────────────────────────────────────────
  pub name:                  String,
  pub honorific_prefix:      String,
  pub honorific_suffix:      String,
  pub email:                 String,
  pub birth_date:            String,
  pub gender:                String,

  // ── Links and contact details ───────────────────────────────────────────
  pub homepage_url:          String,
  pub wikipedia_url:         String,
  pub linkedin_url:          String,
  pub twitter_username:      String,
  pub facebook_personal_url: String,
  pub facebook_page_url:     String,
  pub party_ppc_page_url:    String,
  pub image:                 Option<String>,

  // ── Collections ─────────────────────────────────────────────────────────
  pub other_names:           Vec<OtherName>,
  pub identifiers:           Vec<Identifier>,
  /// Site-specific fields configured by the deployment.
  pub extra_fields:          BTreeMap<String, String>,

  // ── Per-election affiliations ───────────────────────────────────────────
  /// `None` records that the person is known *not* to be standing.
  pub standing_in:           PeriodMap<Option<Standing>>,
  pub party_memberships:     PeriodMap<Party>,
}

impl Snapshot {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  /// The simple and link fields as `(field name, value)` pairs, in the order
  /// they are declared. Used by the merge reconciliation.
  pub(crate) fn text_fields_mut(&mut self) -> [(&'static str, &mut String); 13] {
    [
      ("name", &mut self.name),
      ("honorific_prefix", &mut self.honorific_prefix),
      ("honorific_suffix", &mut self.honorific_suffix),
      ("email", &mut self.email),
      ("birth_date", &mut self.birth_date),
      ("gender", &mut self.gender),
      ("homepage_url", &mut self.homepage_url),
      ("wikipedia_url", &mut self.wikipedia_url),
      ("linkedin_url", &mut self.linkedin_url),
      ("twitter_username", &mut self.twitter_username),
      ("facebook_personal_url", &mut self.facebook_personal_url),
      ("facebook_page_url", &mut self.facebook_page_url),
      ("party_ppc_page_url", &mut self.party_ppc_page_url),
    ]
  }

  /// Look up a simple or link field by name.
  pub fn text_field(&self, field: &str) -> Option<&str> {
    let value = match field {
      "name" => &self.name,
      "honorific_prefix" => &self.honorific_prefix,
      "honorific_suffix" => &self.honorific_suffix,
      "email" => &self.email,
      "birth_date" => &self.birth_date,
      "gender" => &self.gender,
      "homepage_url" => &self.homepage_url,
      "wikipedia_url" => &self.wikipedia_url,
      "linkedin_url" => &self.linkedin_url,
      "twitter_username" => &self.twitter_username,
      "facebook_personal_url" => &self.facebook_personal_url,
      "facebook_page_url" => &self.facebook_page_url,
      "party_ppc_page_url" => &self.party_ppc_page_url,
      _ => return None,
    };
    Some(value)
  }

  /// Elections the person is known to be a candidate in.
  pub fn candidacies(&self) -> impl Iterator<Item = (&ElectionSlug, &Standing)> {
    self
      .standing_in
      .iter()
      .filter_map(|(election, standing)| standing.as_ref().map(|s| (election, s)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_not_standing_serialises_as_null() {
    let mut snapshot = Snapshot::named("Tessa Jowell");
    snapshot.standing_in.insert(ElectionSlug::from("2015"), None);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json["standing_in"]["2015"].is_null());
    assert!(json["standing_in"].as_object().unwrap().contains_key("2015"));
  }

  #[test]
  fn partial_json_fills_defaults() {
    let snapshot: Snapshot = serde_json::from_str(
      r#"{"name":"Tessa Jowell","standing_in":{"2010":{"post_id":"65808","post_label":"Dulwich"}}}"#,
    )
    .unwrap();
    assert_eq!(snapshot.name, "Tessa Jowell");
    assert!(snapshot.email.is_empty());
    assert_eq!(snapshot.candidacies().count(), 1);
  }

  #[test]
  fn text_field_lookup() {
    let mut snapshot = Snapshot::named("Tessa Jowell");
    snapshot.email = "jowell@example.com".into();
    assert_eq!(snapshot.text_field("email"), Some("jowell@example.com"));
    assert_eq!(snapshot.text_field("nonsense"), None);
  }
}
