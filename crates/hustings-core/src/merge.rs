//! Merging a duplicate ("loser") person into the record that survives.
//!
//! The merge is asymmetric: the survivor is assumed to be the better-curated
//! record, so its values win wherever it has one and the loser only fills
//! gaps. The loser's entire history is kept by transplanting its versions
//! beneath the survivor's, and its identity keeps resolving through the
//! [`RedirectIndex`].
//!
//! Every precondition is checked before anything is mutated. Once the checks
//! pass, no step can fail, so the merge is all-or-nothing.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  log::VersionLog,
  person::{ElectionSlug, PeriodMap, PersonId, RowId},
  redirect::RedirectIndex,
  snapshot::{OtherName, Snapshot},
  version::{ChangeMetadata, VersionId},
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A person's history together with the live candidacy rows that externally
/// owned objects (results, nominations) attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
  pub versions:    VersionLog,
  pub candidacies: PeriodMap<RowId>,
}

impl PersonRecord {
  pub fn new(versions: VersionLog) -> Self {
    Self {
      versions,
      candidacies: PeriodMap::new(),
    }
  }

  pub fn person_id(&self) -> PersonId { self.versions.person_id() }
}

/// The caller's side of a merge: the audit metadata for the synthetic merge
/// version and the externally decided capability to merge at all.
#[derive(Debug, Clone)]
pub struct MergeRequest {
  pub metadata:  ChangeMetadata,
  pub may_merge: bool,
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

/// Attachments on the loser's candidacy row `from` must be moved to the
/// survivor's row `to` for the same election; `from` can then be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repoint {
  pub election: ElectionSlug,
  pub from:     RowId,
  pub to:       RowId,
}

/// The survivor had no candidacy in `election`, so the loser's row is handed
/// over to the survivor wholesale, attachments and all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reassign {
  pub election: ElectionSlug,
  pub row:      RowId,
}

/// What a committed merge produced and what the caller must still apply to
/// the live relational store.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
  pub survivor:      PersonId,
  /// The loser, now empty and safe to delete.
  pub retired:       PersonId,
  /// The synthetic merge version, now the survivor's current version.
  pub version_id:    VersionId,
  pub snapshot:      Snapshot,
  pub repoints:      Vec<Repoint>,
  pub reassignments: Vec<Reassign>,
}

// ─── Operator ────────────────────────────────────────────────────────────────

/// Fold `loser` into `survivor`.
///
/// On success `survivor.versions` reads, newest first:
/// `[merge version, survivor's previous versions…, loser's versions…]`,
/// `loser` has no versions or candidacies left, and `redirects` maps the
/// loser to the survivor.
pub fn merge(
  survivor: &mut PersonRecord,
  loser: &mut PersonRecord,
  redirects: &mut RedirectIndex,
  request: MergeRequest,
) -> Result<MergeOutcome> {
  let survivor_id = survivor.person_id();
  let loser_id = loser.person_id();

  // ── Preconditions ───────────────────────────────────────────────────────
  if survivor_id == loser_id {
    return Err(Error::SelfMergeRejected(survivor_id));
  }
  for id in [survivor_id, loser_id] {
    if redirects.resolve(id) != id {
      return Err(Error::AlreadyMerged(id));
    }
  }
  if !request.may_merge {
    return Err(Error::MergeNotAuthorized);
  }

  let survivor_current = &survivor.versions.current()?.data;
  let loser_current = &loser.versions.current()?.data;

  let mut metadata = request.metadata;
  if survivor.versions.contains(&metadata.version_id)
    || loser.versions.contains(&metadata.version_id)
  {
    return Err(Error::DuplicateVersionId(metadata.version_id));
  }
  if let Some(clash) = loser
    .versions
    .all()
    .find(|v| survivor.versions.contains(&v.id()))
  {
    return Err(Error::DuplicateVersionId(clash.id()));
  }
  redirects.check(loser_id, survivor_id)?;

  // ── Reconcile ───────────────────────────────────────────────────────────
  let reconciled = reconcile(survivor_current, loser_current);
  let (repoints, reassignments) =
    plan_rows(&survivor.candidacies, &loser.candidacies);

  if metadata.information_source.trim().is_empty() {
    metadata.information_source = format!("After merging person {loser_id}");
  }

  // ── Commit ──────────────────────────────────────────────────────────────
  let version_id = survivor.versions.append(reconciled.clone(), metadata)?;
  survivor.versions.absorb(&mut loser.versions)?;
  redirects.record(loser_id, survivor_id)?;

  for reassign in &reassignments {
    survivor.candidacies.insert(reassign.election.clone(), reassign.row);
  }
  loser.candidacies = PeriodMap::new();

  Ok(MergeOutcome {
    survivor: survivor_id,
    retired: loser_id,
    version_id,
    snapshot: reconciled,
    repoints,
    reassignments,
  })
}

// ─── Reconciliation rules ────────────────────────────────────────────────────

/// Combine the survivor's and the loser's current state.
///
/// - Simple and link fields, the image and each extra field keep the
///   survivor's value unless it is empty.
/// - Per-election standings and party memberships keep the survivor's entry
///   where it has one; a "known not standing" entry does not count, since the
///   loser's candidacy is more informative.
/// - Identifiers and alternate names are unioned, survivor's first.
/// - The loser's name is kept as an alternate name unless it is already the
///   survivor's name or one of its alternate names.
pub fn reconcile(survivor: &Snapshot, loser: &Snapshot) -> Snapshot {
  let mut merged = survivor.clone();

  for (field, ours) in merged.text_fields_mut() {
    if ours.is_empty()
      && let Some(theirs) = loser.text_field(field)
    {
      theirs.clone_into(ours);
    }
  }

  if merged.image.as_deref().is_none_or(str::is_empty) {
    merged.image = loser.image.clone();
  }

  for (key, theirs) in &loser.extra_fields {
    if theirs.is_empty() {
      continue;
    }
    let ours = merged.extra_fields.entry(key.clone()).or_default();
    if ours.is_empty() {
      theirs.clone_into(ours);
    }
  }

  merged.standing_in.fill_from(&loser.standing_in, Option::is_some);
  merged.party_memberships.fill_from(&loser.party_memberships, |_| true);

  union_into(&mut merged.identifiers, &loser.identifiers);
  union_into(&mut merged.other_names, &loser.other_names);

  if !loser.name.is_empty()
    && loser.name != merged.name
    && !merged.other_names.iter().any(|o| o.name == loser.name)
  {
    merged.other_names.push(OtherName::named(loser.name.clone()));
  }

  merged
}

fn union_into<T: Clone + PartialEq>(ours: &mut Vec<T>, theirs: &[T]) {
  for item in theirs {
    if !ours.contains(item) {
      ours.push(item.clone());
    }
  }
}

/// Decide what happens to each of the loser's candidacy rows.
fn plan_rows(
  survivor: &PeriodMap<RowId>,
  loser: &PeriodMap<RowId>,
) -> (Vec<Repoint>, Vec<Reassign>) {
  let mut repoints = Vec::new();
  let mut reassignments = Vec::new();
  for (election, row) in loser {
    match survivor.get(election) {
      Some(to) => repoints.push(Repoint {
        election: election.clone(),
        from:     *row,
        to:       *to,
      }),
      None => reassignments.push(Reassign {
        election: election.clone(),
        row:      *row,
      }),
    }
  }
  (repoints, reassignments)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    log::tests::{log_with, meta, vid},
    snapshot::{Identifier, Party, Standing},
    version::Version,
  };

  const SURVIVOR: i64 = 2009;
  const LOSER: i64 = 4850;

  fn record(person: i64, names: &[(u64, &str)]) -> PersonRecord {
    PersonRecord::new(log_with(person, names))
  }

  fn request(n: u64) -> MergeRequest {
    MergeRequest {
      metadata:  meta(n, ""),
      may_merge: true,
    }
  }

  fn standing(post: &str) -> Standing {
    Standing {
      post_id: post.to_owned(),
      post_label: format!("Post {post}"),
      ..Standing::default()
    }
  }

  fn push(record: &mut PersonRecord, n: u64, snapshot: Snapshot) {
    record.versions.append(snapshot, meta(n, "edit")).unwrap();
  }

  #[test]
  fn loser_history_lands_beneath_the_merge_version() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa"), (2, "Tessa Jowell")]);
    let mut loser = record(LOSER, &[(11, "T. Jowell"), (12, "Tessa J")]);
    let mut redirects = RedirectIndex::new();

    let outcome =
      merge(&mut survivor, &mut loser, &mut redirects, request(20)).unwrap();

    let ids: Vec<VersionId> = survivor.versions.all().map(Version::id).collect();
    assert_eq!(ids, [vid(20), vid(2), vid(1), vid(12), vid(11)]);
    assert_eq!(outcome.version_id, vid(20));
    assert_eq!(redirects.resolve(PersonId(LOSER)), PersonId(SURVIVOR));
    assert!(loser.versions.is_empty());
    assert_eq!(outcome.retired, PersonId(LOSER));
  }

  #[test]
  fn every_version_is_conserved_unchanged() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa"), (2, "Tessa Jowell")]);
    let mut loser = record(LOSER, &[(11, "T. Jowell"), (12, "Tessa J"), (13, "TJ")]);
    let survivor_before: Vec<Version> = survivor.versions.all().cloned().collect();
    let loser_before: Vec<Version> = loser.versions.all().cloned().collect();

    merge(&mut survivor, &mut loser, &mut RedirectIndex::new(), request(20)).unwrap();

    assert_eq!(survivor.versions.len(), 2 + 3 + 1);
    let after: Vec<Version> = survivor.versions.all().cloned().collect();
    assert_eq!(&after[1..3], &survivor_before[..]);
    assert_eq!(&after[3..], &loser_before[..]);
  }

  #[test]
  fn survivor_values_take_precedence() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    let mut s = Snapshot::named("Tessa Jowell");
    s.email = "tessa@example.com".into();
    s.extra_fields.insert("favourite_biscuits".into(), "".into());
    push(&mut survivor, 2, s);

    let mut loser = record(LOSER, &[]);
    let mut l = Snapshot::named("Tessa Jowell");
    l.email = "jowell@example.org".into();
    l.birth_date = "1947-09-17".into();
    l.image = Some("tessa.jpg".into());
    l.extra_fields.insert("favourite_biscuits".into(), "Hobnobs".into());
    push(&mut loser, 11, l);

    let outcome =
      merge(&mut survivor, &mut loser, &mut RedirectIndex::new(), request(20)).unwrap();

    let merged = &outcome.snapshot;
    assert_eq!(merged.email, "tessa@example.com");
    assert_eq!(merged.birth_date, "1947-09-17");
    assert_eq!(merged.image.as_deref(), Some("tessa.jpg"));
    assert_eq!(merged.extra_fields["favourite_biscuits"], "Hobnobs");
    assert_eq!(survivor.versions.current().unwrap().data, *merged);
  }

  #[test]
  fn affiliations_are_filled_per_election() {
    let mut survivor = record(SURVIVOR, &[]);
    let mut s = Snapshot::named("Tessa Jowell");
    s.standing_in.insert("2010".into(), Some(standing("65808")));
    s.standing_in.insert("2015".into(), None);
    s.party_memberships.insert("2010".into(), Party {
      id:   "party:53".into(),
      name: "Labour Party".into(),
    });
    push(&mut survivor, 1, s);

    let mut loser = record(LOSER, &[]);
    let mut l = Snapshot::named("Tessa Jowell");
    l.standing_in.insert("2010".into(), Some(standing("11111")));
    l.standing_in.insert("2015".into(), Some(standing("65808")));
    l.party_memberships.insert("2010".into(), Party {
      id:   "party:52".into(),
      name: "Conservative Party".into(),
    });
    l.party_memberships.insert("2015".into(), Party {
      id:   "party:53".into(),
      name: "Labour Party".into(),
    });
    push(&mut loser, 11, l);

    let outcome =
      merge(&mut survivor, &mut loser, &mut RedirectIndex::new(), request(20)).unwrap();

    let merged = &outcome.snapshot;
    let in_2010 = merged.standing_in.get(&"2010".into()).unwrap().as_ref().unwrap();
    assert_eq!(in_2010.post_id, "65808");
    // A survivor known not to be standing is overridden by a real candidacy.
    let in_2015 = merged.standing_in.get(&"2015".into()).unwrap().as_ref().unwrap();
    assert_eq!(in_2015.post_id, "65808");
    assert_eq!(merged.party_memberships.get(&"2010".into()).unwrap().id, "party:53");
    assert_eq!(merged.party_memberships.get(&"2015".into()).unwrap().id, "party:53");
  }

  #[test]
  fn collections_are_unioned_and_loser_name_kept() {
    let mut survivor = record(SURVIVOR, &[]);
    let mut s = Snapshot::named("Tessa Jowell");
    s.identifiers.push(Identifier {
      scheme:     "wikidata".into(),
      identifier: "Q291169".into(),
    });
    push(&mut survivor, 1, s);

    let mut loser = record(LOSER, &[]);
    let mut l = Snapshot::named("Baroness Jowell");
    l.identifiers.push(Identifier {
      scheme:     "wikidata".into(),
      identifier: "Q291169".into(),
    });
    l.identifiers.push(Identifier {
      scheme:     "theyworkforyou".into(),
      identifier: "10329".into(),
    });
    l.other_names.push(OtherName::named("Tessa Palmer"));
    push(&mut loser, 11, l);

    let outcome =
      merge(&mut survivor, &mut loser, &mut RedirectIndex::new(), request(20)).unwrap();

    let merged = &outcome.snapshot;
    assert_eq!(merged.name, "Tessa Jowell");
    assert_eq!(merged.identifiers.len(), 2);
    let other: Vec<&str> = merged.other_names.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(other, ["Tessa Palmer", "Baroness Jowell"]);
  }

  #[test]
  fn identical_names_are_not_duplicated() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    let mut loser = record(LOSER, &[(11, "Tessa Jowell")]);

    let outcome =
      merge(&mut survivor, &mut loser, &mut RedirectIndex::new(), request(20)).unwrap();

    assert!(outcome.snapshot.other_names.is_empty());
  }

  #[test]
  fn empty_source_gets_a_default_justification() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    let mut loser = record(LOSER, &[(11, "Tessa Jowell")]);

    merge(&mut survivor, &mut loser, &mut RedirectIndex::new(), request(20)).unwrap();

    let current = survivor.versions.current().unwrap();
    assert_eq!(current.metadata.information_source, "After merging person 4850");
    assert_eq!(current.metadata.username.as_deref(), Some("mark"));
  }

  #[test]
  fn candidacy_rows_are_repointed_or_reassigned() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    survivor.candidacies.insert("2010".into(), RowId(100));
    let mut loser = record(LOSER, &[(11, "Tessa Jowell")]);
    loser.candidacies.insert("2010".into(), RowId(200));
    loser.candidacies.insert("2015".into(), RowId(201));

    let outcome =
      merge(&mut survivor, &mut loser, &mut RedirectIndex::new(), request(20)).unwrap();

    assert_eq!(outcome.repoints, [Repoint {
      election: "2010".into(),
      from:     RowId(200),
      to:       RowId(100),
    }]);
    assert_eq!(outcome.reassignments, [Reassign {
      election: "2015".into(),
      row:      RowId(201),
    }]);
    assert_eq!(survivor.candidacies.get(&"2015".into()), Some(&RowId(201)));
    assert!(loser.candidacies.is_empty());
  }

  // ── Preconditions ──────────────────────────────────────────────────────

  fn assert_untouched(
    result: Result<MergeOutcome>,
    survivor: &PersonRecord,
    loser: &PersonRecord,
    before: (&PersonRecord, &PersonRecord),
  ) -> Error {
    let err = result.unwrap_err();
    assert_eq!(survivor, before.0);
    assert_eq!(loser, before.1);
    err
  }

  #[test]
  fn self_merge_is_rejected() {
    let mut a = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    let mut b = a.clone();
    let err = merge(&mut a, &mut b, &mut RedirectIndex::new(), request(20)).unwrap_err();
    assert!(matches!(err, Error::SelfMergeRejected(PersonId(SURVIVOR))));
    assert_eq!(a.versions.len(), 1);
  }

  #[test]
  fn merging_a_retired_identity_is_rejected() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    let mut loser = record(LOSER, &[(11, "Tessa Jowell")]);
    let (s0, l0) = (survivor.clone(), loser.clone());
    let mut redirects = RedirectIndex::new();
    redirects.record(PersonId(LOSER), PersonId(12207)).unwrap();

    let result = merge(&mut survivor, &mut loser, &mut redirects, request(20));

    let err = assert_untouched(result, &survivor, &loser, (&s0, &l0));
    assert!(matches!(err, Error::AlreadyMerged(PersonId(LOSER))));
    assert_eq!(redirects.len(), 1);
  }

  #[test]
  fn merging_into_a_retired_identity_is_rejected() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    let mut loser = record(LOSER, &[(11, "Tessa Jowell")]);
    let (s0, l0) = (survivor.clone(), loser.clone());
    let mut redirects = RedirectIndex::new();
    redirects.record(PersonId(SURVIVOR), PersonId(12207)).unwrap();

    let result = merge(&mut survivor, &mut loser, &mut redirects, request(20));

    let err = assert_untouched(result, &survivor, &loser, (&s0, &l0));
    assert!(matches!(err, Error::AlreadyMerged(PersonId(SURVIVOR))));
    assert_eq!(redirects.len(), 1);
  }

  #[test]
  fn unauthorised_merge_is_rejected() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    let mut loser = record(LOSER, &[(11, "Tessa Jowell")]);
    let (s0, l0) = (survivor.clone(), loser.clone());
    let mut redirects = RedirectIndex::new();
    let request = MergeRequest {
      may_merge: false,
      ..request(20)
    };

    let result = merge(&mut survivor, &mut loser, &mut redirects, request);

    let err = assert_untouched(result, &survivor, &loser, (&s0, &l0));
    assert!(matches!(err, Error::MergeNotAuthorized));
    assert!(redirects.is_empty());
  }

  #[test]
  fn empty_loser_is_rejected() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    let mut loser = record(LOSER, &[]);
    let (s0, l0) = (survivor.clone(), loser.clone());

    let result = merge(&mut survivor, &mut loser, &mut RedirectIndex::new(), request(20));

    let err = assert_untouched(result, &survivor, &loser, (&s0, &l0));
    assert!(matches!(err, Error::EmptyLog(PersonId(LOSER))));
  }

  #[test]
  fn clashing_version_ids_are_rejected() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    let mut loser = record(LOSER, &[(1, "Tessa Jowell")]);
    let (s0, l0) = (survivor.clone(), loser.clone());
    let mut redirects = RedirectIndex::new();

    let result = merge(&mut survivor, &mut loser, &mut redirects, request(20));

    let err = assert_untouched(result, &survivor, &loser, (&s0, &l0));
    assert!(matches!(err, Error::DuplicateVersionId(id) if id == vid(1)));
    assert!(redirects.is_empty());
  }

  #[test]
  fn merge_id_must_be_fresh() {
    let mut survivor = record(SURVIVOR, &[(1, "Tessa Jowell")]);
    let mut loser = record(LOSER, &[(11, "Tessa Jowell")]);
    let (s0, l0) = (survivor.clone(), loser.clone());

    let result = merge(&mut survivor, &mut loser, &mut RedirectIndex::new(), request(11));

    let err = assert_untouched(result, &survivor, &loser, (&s0, &l0));
    assert!(matches!(err, Error::DuplicateVersionId(id) if id == vid(11)));
  }

  #[test]
  fn chained_merges_resolve_transitively() {
    let mut a = record(4850, &[(1, "Tessa Jowell")]);
    let mut b = record(2111, &[(2, "Tessa Jowell")]);
    let mut c = record(12207, &[(3, "Tessa Jowell")]);
    let mut redirects = RedirectIndex::new();

    merge(&mut b, &mut a, &mut redirects, request(10)).unwrap();
    merge(&mut c, &mut b, &mut redirects, request(11)).unwrap();

    assert_eq!(redirects.resolve(PersonId(4850)), PersonId(12207));
    let ids: Vec<VersionId> = c.versions.all().map(Version::id).collect();
    assert_eq!(ids, [vid(11), vid(3), vid(10), vid(2), vid(1)]);
  }
}
