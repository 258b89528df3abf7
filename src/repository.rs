use chrono::Utc;
use log::warn;

use crate::models::{Entry, EntryDraft, EntryQuery, EntryUpdate};
use crate::storage::{Storage, StorageError, normalize_citations};
use crate::taxonomy::{CategoryColor, category_color};

/// Owns the active and trashed entry collections. Every mutation writes
/// through to storage before returning; a failed write is logged and the
/// in-memory state stays authoritative for the rest of the session.
pub struct EntryRepository<S: Storage> {
    storage: S,
    entries: Vec<Entry>,
    trashed: Vec<Entry>,
}

impl<S: Storage> EntryRepository<S> {
    pub fn open(storage: S) -> Result<Self, StorageError> {
        let entries = storage.load_entries()?;
        let trashed = storage.load_trashed()?;
        Ok(Self {
            storage,
            entries,
            trashed,
        })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn trashed(&self) -> &[Entry] {
        &self.trashed
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Assigns id and timestamps and appends to the active collection.
    pub fn create(&mut self, draft: EntryDraft) -> Entry {
        let mut entry = Entry::new(draft);
        let own_id = entry.id.clone();
        let mut seen = std::collections::HashSet::new();
        entry
            .cited_entries
            .retain(|c| *c != own_id && seen.insert(c.clone()));
        self.entries.push(entry.clone());
        self.persist_entries();
        entry
    }

    /// Merges the provided fields and bumps `updated_at`. Unknown ids are a
    /// silent no-op.
    pub fn update(&mut self, id: &str, update: EntryUpdate) {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return;
        };
        if let Some(title) = update.title {
            entry.title = title;
        }
        if let Some(date) = update.date {
            entry.date = date;
        }
        if let Some(description) = update.description {
            entry.description = description;
        }
        if let Some(tags) = update.tags {
            entry.tags = tags;
        }
        if let Some(mut cited) = update.cited_entries {
            let own_id = entry.id.clone();
            let mut seen = std::collections::HashSet::new();
            cited.retain(|c| *c != own_id && seen.insert(c.clone()));
            entry.cited_entries = cited;
        }
        entry.updated_at = Utc::now();
        self.persist_entries();
    }

    /// Moves an entry from active to trashed, stamping `deleted_at`.
    pub fn soft_delete(&mut self, id: &str) {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return;
        };
        let mut entry = self.entries.remove(pos);
        entry.deleted_at = Some(Utc::now());
        self.trashed.push(entry);
        self.persist_entries();
        self.persist_trashed();
    }

    /// Moves an entry from trashed back to active, clearing `deleted_at`.
    pub fn restore(&mut self, id: &str) {
        let Some(pos) = self.trashed.iter().position(|e| e.id == id) else {
            return;
        };
        let mut entry = self.trashed.remove(pos);
        entry.deleted_at = None;
        self.entries.push(entry);
        self.persist_entries();
        self.persist_trashed();
    }

    /// Erases a single entry from the trashed collection.
    pub fn purge(&mut self, id: &str) {
        let before = self.trashed.len();
        self.trashed.retain(|e| e.id != id);
        if self.trashed.len() != before {
            self.persist_trashed();
        }
    }

    /// Erases every trashed entry.
    pub fn purge_all(&mut self) {
        if self.trashed.is_empty() {
            return;
        }
        self.trashed.clear();
        self.persist_trashed();
    }

    /// Adds a citation edge. Idempotent: self-citations, duplicate edges and
    /// ids that don't resolve to active entries all leave state untouched.
    pub fn add_citation(&mut self, citing_id: &str, cited_id: &str) {
        if citing_id == cited_id {
            return;
        }
        if !self.entries.iter().any(|e| e.id == cited_id) {
            return;
        }
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == citing_id) else {
            return;
        };
        if entry.cited_entries.iter().any(|c| c == cited_id) {
            return;
        }
        entry.cited_entries.push(cited_id.to_string());
        entry.updated_at = Utc::now();
        self.persist_entries();
    }

    /// Removes a citation edge; no-op when the edge is absent.
    pub fn remove_citation(&mut self, citing_id: &str, cited_id: &str) {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == citing_id) else {
            return;
        };
        let before = entry.cited_entries.len();
        entry.cited_entries.retain(|c| c != cited_id);
        if entry.cited_entries.len() != before {
            entry.updated_at = Utc::now();
            self.persist_entries();
        }
    }

    /// Resolve an entry's citation list to the active entries it points at,
    /// skipping dangling ids.
    pub fn cited(&self, entry_id: &str) -> Vec<&Entry> {
        let Some(entry) = self.get(entry_id) else {
            return Vec::new();
        };
        entry
            .cited_entries
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Active entries whose citation list contains `entry_id`. Reverse lookup
    /// by linear scan; fine at journal scale.
    pub fn cited_by(&self, entry_id: &str) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|e| e.cited_entries.iter().any(|c| c == entry_id))
            .collect()
    }

    /// Conjunctive filter over the active collection. All provided criteria
    /// must match; an empty query returns everything.
    pub fn filtered(&self, query: &EntryQuery) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|e| Self::matches(e, query))
            .collect()
    }

    fn matches(entry: &Entry, query: &EntryQuery) -> bool {
        if let Some(tag) = &query.tag {
            let hit = if tag.contains('/') {
                entry.has_tag(tag)
            } else {
                // bare category id matches any tag in that category
                entry
                    .tags
                    .iter()
                    .any(|t| t.category_id.as_str().eq_ignore_ascii_case(tag))
            };
            if !hit {
                return false;
            }
        }
        if let Some(text) = &query.text {
            let needle = text.to_lowercase();
            let hit = entry.title.to_lowercase().contains(&needle)
                || entry.description.to_lowercase().contains(&needle)
                || entry
                    .tags
                    .iter()
                    .any(|t| t.label.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        query.date_range.contains(entry.date)
    }

    /// Color for either a full tag id (`emotions/positive/joy`) or a bare
    /// category id. Unknown ids get the uncategorized violet.
    pub fn tag_color(&self, tag_or_category_id: &str) -> CategoryColor {
        let category = tag_or_category_id
            .split('/')
            .next()
            .unwrap_or(tag_or_category_id);
        category_color(category)
    }

    /// Replaces both collections from a full JSON export. Citations are
    /// re-normalized on the way in, same as a storage read.
    pub fn import_entries(&mut self, mut entries: Vec<Entry>) {
        normalize_citations(&mut entries);
        let (trashed, active): (Vec<Entry>, Vec<Entry>) =
            entries.into_iter().partition(|e| e.deleted_at.is_some());
        self.entries = active;
        self.trashed = trashed;
        self.persist_entries();
        self.persist_trashed();
    }

    fn persist_entries(&mut self) {
        if let Err(e) = self.storage.save_entries(&self.entries) {
            warn!("failed to persist entries, in-memory state kept: {e}");
        }
    }

    fn persist_trashed(&mut self) {
        if let Err(e) = self.storage.save_trashed(&self.trashed) {
            warn!("failed to persist trashed entries, in-memory state kept: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, HierarchicalTag};
    use crate::storage::MemoryStorage;
    use crate::taxonomy::CategoryId;
    use chrono::NaiveDate;

    fn repo() -> EntryRepository<MemoryStorage> {
        EntryRepository::open(MemoryStorage::new()).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn create_then_delete_restore_keeps_partition() {
        let mut repo = repo();
        let a = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));
        let b = repo.create(EntryDraft::new("Storm", date("2025-01-02")));

        repo.soft_delete(&a.id);
        assert_eq!(repo.entries().len(), 1);
        assert_eq!(repo.trashed().len(), 1);
        assert!(repo.trashed()[0].deleted_at.is_some());

        repo.restore(&a.id);
        assert_eq!(repo.entries().len(), 2);
        assert!(repo.trashed().is_empty());
        assert!(repo.get(&a.id).unwrap().deleted_at.is_none());

        repo.soft_delete(&b.id);
        repo.purge(&b.id);
        assert!(repo.trashed().is_empty());
        assert!(repo.get(&b.id).is_none());
    }

    #[test]
    fn unknown_ids_are_silent_noops() {
        let mut repo = repo();
        repo.update("missing", EntryUpdate::default());
        repo.soft_delete("missing");
        repo.restore("missing");
        repo.purge("missing");
        repo.remove_citation("missing", "also-missing");
        assert!(repo.entries().is_empty());
    }

    #[test]
    fn citations_are_directed_and_idempotent() {
        let mut repo = repo();
        let a = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));
        let b = repo.create(EntryDraft::new("Storm", date("2025-01-02")));

        repo.add_citation(&b.id, &a.id);
        repo.add_citation(&b.id, &a.id); // duplicate, ignored
        repo.add_citation(&a.id, &a.id); // self, ignored
        repo.add_citation(&b.id, "nope"); // dangling target, ignored

        let b_now = repo.get(&b.id).unwrap();
        assert_eq!(b_now.cited_entries, vec![a.id.clone()]);
        assert!(repo.get(&a.id).unwrap().cited_entries.is_empty());

        let citers = repo.cited_by(&a.id);
        assert_eq!(citers.len(), 1);
        assert_eq!(citers[0].id, b.id);
        assert!(repo.cited_by(&b.id).is_empty());

        // forward resolution skips nothing here; dangling ids just vanish
        let forward = repo.cited(&b.id);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].id, a.id);

        repo.remove_citation(&b.id, &a.id);
        repo.remove_citation(&b.id, &a.id);
        assert!(repo.get(&b.id).unwrap().cited_entries.is_empty());
    }

    #[test]
    fn create_drops_repeated_citations_even_when_separated() {
        let mut repo = repo();
        let a = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));
        let b = repo.create(EntryDraft::new("Storm", date("2025-01-02")));

        let mut draft = EntryDraft::new("Fog", date("2025-01-03"));
        draft.cited_entries = vec![a.id.clone(), b.id.clone(), a.id.clone()];
        let c = repo.create(draft);

        assert_eq!(
            repo.get(&c.id).unwrap().cited_entries,
            vec![a.id.clone(), b.id.clone()]
        );
        // the graph must see a single edge per pair
        let graph = crate::graph::project(
            repo.entries(),
            &crate::graph::GraphFilter {
                show_isolated: true,
                ..Default::default()
            },
        );
        let to_a = graph.edges.iter().filter(|e| e.target == a.id).count();
        assert_eq!(to_a, 1);
        let node_a = graph.nodes.iter().find(|n| n.id == a.id).unwrap();
        assert_eq!(node_a.citation_count, 1);
    }

    #[test]
    fn update_bumps_timestamp_and_merges_fields() {
        let mut repo = repo();
        let a = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));
        let created = repo.get(&a.id).unwrap().updated_at;

        repo.update(
            &a.id,
            EntryUpdate {
                title: Some("Ocean at night".into()),
                ..Default::default()
            },
        );
        let after = repo.get(&a.id).unwrap();
        assert_eq!(after.title, "Ocean at night");
        assert_eq!(after.date, date("2025-01-01"));
        assert!(after.updated_at >= created);
    }

    #[test]
    fn filter_is_conjunctive() {
        let mut repo = repo();
        let mut draft = EntryDraft::new("Flying over water", date("2025-03-01"));
        draft.tags = vec![HierarchicalTag::new(
            CategoryId::Actions,
            "Movement",
            "Flying",
        )];
        let flying = repo.create(draft);
        repo.create(EntryDraft::new("Falling", date("2025-03-05")));

        let by_tag = repo.filtered(&EntryQuery {
            tag: Some("actions/movement/flying".into()),
            ..Default::default()
        });
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].id, flying.id);

        // bare category id matches the whole category
        let by_category = repo.filtered(&EntryQuery {
            tag: Some("actions".into()),
            ..Default::default()
        });
        assert_eq!(by_category.len(), 1);

        // tag label text matches too
        let by_text = repo.filtered(&EntryQuery {
            text: Some("flying".into()),
            ..Default::default()
        });
        assert_eq!(by_text.len(), 1);

        let none = repo.filtered(&EntryQuery {
            tag: Some("actions".into()),
            text: Some("falling".into()),
            ..Default::default()
        });
        assert!(none.is_empty());

        let ranged = repo.filtered(&EntryQuery {
            date_range: DateRange {
                start: Some(date("2025-03-02")),
                end: None,
            },
            ..Default::default()
        });
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].title, "Falling");
    }

    #[test]
    fn tag_color_handles_full_ids_and_bare_categories() {
        let repo = repo();
        assert_eq!(
            repo.tag_color("emotions/positive/joy"),
            CategoryColor::Amber
        );
        assert_eq!(repo.tag_color("dreamTypes"), CategoryColor::Pink);
        assert_eq!(repo.tag_color("unknown/x/y"), CategoryColor::Violet);
    }

    #[test]
    fn mutations_write_through() {
        let mut repo = repo();
        let a = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));
        let saves_after_create = repo.storage().entry_saves();
        assert!(saves_after_create >= 1);

        repo.update(
            &a.id,
            EntryUpdate {
                description: Some("salt air".into()),
                ..Default::default()
            },
        );
        assert_eq!(repo.storage().entry_saves(), saves_after_create + 1);
    }

    #[test]
    fn import_partitions_by_deletion_marker() {
        let mut repo = repo();
        let mut active = Entry::new(EntryDraft::new("Keep", date("2025-01-01")));
        active.cited_entries = vec![active.id.clone(), "other".into()];
        let mut gone = Entry::new(EntryDraft::new("Trash", date("2025-01-02")));
        gone.deleted_at = Some(Utc::now());

        repo.import_entries(vec![active.clone(), gone]);
        assert_eq!(repo.entries().len(), 1);
        assert_eq!(repo.trashed().len(), 1);
        // self-citation stripped on import
        assert_eq!(
            repo.get(&active.id).unwrap().cited_entries,
            vec!["other".to_string()]
        );
    }
}
