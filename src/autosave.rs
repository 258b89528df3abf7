//! Per-entry editing session: debounces field edits, reconciles citations
//! implied by inline `@Title` mentions, and commits through the repository
//! exactly once per settled edit burst.
//!
//! The session never owns a timer. Callers feed it a clock (`now`) on every
//! mutation and poll; this keeps the state machine deterministic and
//! directly testable.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::{Entry, EntryId, EntryUpdate, HierarchicalTag};
use crate::repository::EntryRepository;
use crate::storage::Storage;

const TITLE_DEBOUNCE_MS: i64 = 500;
const DATE_DEBOUNCE_MS: i64 = 500;
const DESCRIPTION_DEBOUNCE_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Editing,
    Saving,
}

/// Result of a poll or flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// No session, or the edited entry no longer exists.
    Inactive,
    /// At least one debounce window is still open.
    Pending,
    /// All windows settled but nothing actually changed; no write issued.
    Clean,
    /// A delta was committed through the repository.
    Saved,
}

#[derive(Debug, Clone, PartialEq)]
struct FieldSnapshot {
    title: String,
    date: NaiveDate,
    description: String,
    tags: Vec<HierarchicalTag>,
    cited_entries: Vec<EntryId>,
}

impl FieldSnapshot {
    fn of(entry: &Entry) -> Self {
        Self {
            title: entry.title.clone(),
            date: entry.date,
            description: entry.description.clone(),
            tags: entry.tags.clone(),
            cited_entries: entry.cited_entries.clone(),
        }
    }
}

pub struct AutosaveSession {
    entry_id: EntryId,
    state: SessionState,
    /// Last-persisted field values; commits diff against this.
    baseline: FieldSnapshot,
    working: FieldSnapshot,
    title_changed_at: Option<DateTime<Utc>>,
    date_changed_at: Option<DateTime<Utc>>,
    description_changed_at: Option<DateTime<Utc>>,
}

impl AutosaveSession {
    /// Start editing an entry. The snapshot is taken here, before any edits,
    /// so change detection never diffs against half-populated fields.
    pub fn begin(entry: &Entry) -> Self {
        Self {
            entry_id: entry.id.clone(),
            state: SessionState::Editing,
            baseline: FieldSnapshot::of(entry),
            working: FieldSnapshot::of(entry),
            title_changed_at: None,
            date_changed_at: None,
            description_changed_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn set_title(&mut self, title: impl Into<String>, now: DateTime<Utc>) {
        self.working.title = title.into();
        self.title_changed_at = Some(now);
    }

    pub fn set_date(&mut self, date: NaiveDate, now: DateTime<Utc>) {
        self.working.date = date;
        self.date_changed_at = Some(now);
    }

    pub fn set_description(&mut self, description: impl Into<String>, now: DateTime<Utc>) {
        self.working.description = description.into();
        self.description_changed_at = Some(now);
    }

    /// Tag edits are not debounced; they land on the next poll.
    pub fn set_tags(&mut self, tags: Vec<HierarchicalTag>) {
        self.working.tags = tags;
    }

    /// Explicitly cite another entry: appends its `@Title` mention to the
    /// description so the citation stays textually backed, and records the
    /// edge for the next commit.
    pub fn cite(&mut self, entry: &Entry, now: DateTime<Utc>) {
        if entry.id == self.entry_id {
            return;
        }
        let mention = format!("@{}", entry.title);
        if !self.working.description.contains(&mention) {
            if !self.working.description.is_empty()
                && !self.working.description.ends_with(char::is_whitespace)
            {
                self.working.description.push(' ');
            }
            self.working.description.push_str(&mention);
            self.description_changed_at = Some(now);
        }
        if !self.working.cited_entries.contains(&entry.id) {
            self.working.cited_entries.push(entry.id.clone());
        }
    }

    pub fn uncite(&mut self, entry_id: &str) {
        self.working.cited_entries.retain(|c| c != entry_id);
    }

    /// Drop the session without committing. Used when the edited entry is
    /// deleted mid-edit.
    pub fn cancel(&mut self) {
        self.state = SessionState::Uninitialized;
        self.title_changed_at = None;
        self.date_changed_at = None;
        self.description_changed_at = None;
    }

    fn debounce_settled(&self, now: DateTime<Utc>) -> bool {
        let open = |changed: Option<DateTime<Utc>>, window_ms: i64| {
            changed.is_some_and(|at| now - at < Duration::milliseconds(window_ms))
        };
        !open(self.title_changed_at, TITLE_DEBOUNCE_MS)
            && !open(self.date_changed_at, DATE_DEBOUNCE_MS)
            && !open(self.description_changed_at, DESCRIPTION_DEBOUNCE_MS)
    }

    /// Commit if every debounce window has settled and something changed.
    pub fn poll<S: Storage>(
        &mut self,
        repo: &mut EntryRepository<S>,
        now: DateTime<Utc>,
    ) -> CommitOutcome {
        if self.state != SessionState::Editing {
            return CommitOutcome::Inactive;
        }
        if !self.debounce_settled(now) {
            return CommitOutcome::Pending;
        }
        self.commit(repo)
    }

    /// Commit immediately, bypassing debounce. Used on navigation away so an
    /// in-flight edit burst is never lost.
    pub fn flush<S: Storage>(&mut self, repo: &mut EntryRepository<S>) -> CommitOutcome {
        if self.state != SessionState::Editing {
            return CommitOutcome::Inactive;
        }
        self.commit(repo)
    }

    fn commit<S: Storage>(&mut self, repo: &mut EntryRepository<S>) -> CommitOutcome {
        if repo.get(&self.entry_id).is_none() {
            // entry was deleted under the session
            self.cancel();
            return CommitOutcome::Inactive;
        }

        self.working.cited_entries = self.reconcile_citations(repo);

        if self.working == self.baseline {
            self.title_changed_at = None;
            self.date_changed_at = None;
            self.description_changed_at = None;
            return CommitOutcome::Clean;
        }

        self.state = SessionState::Saving;
        repo.update(
            &self.entry_id,
            EntryUpdate {
                title: Some(self.working.title.clone()),
                date: Some(self.working.date),
                description: Some(self.working.description.clone()),
                tags: Some(self.working.tags.clone()),
                cited_entries: Some(self.working.cited_entries.clone()),
            },
        );
        self.baseline = self.working.clone();
        self.title_changed_at = None;
        self.date_changed_at = None;
        self.description_changed_at = None;
        self.state = SessionState::Editing;
        CommitOutcome::Saved
    }

    /// Recompute the citation set from the current description: explicit
    /// citations survive only while their `@Title` mention text is present,
    /// and typing a mention of another entry's exact title implies a new
    /// citation. Result is deduplicated and never self-referential.
    fn reconcile_citations<S: Storage>(&self, repo: &EntryRepository<S>) -> Vec<EntryId> {
        let mentioned = |entry: &Entry| {
            !entry.title.is_empty()
                && self
                    .working
                    .description
                    .contains(&format!("@{}", entry.title))
        };

        let mut reconciled: Vec<EntryId> = Vec::new();
        for cited_id in &self.working.cited_entries {
            if let Some(cited) = repo.get(cited_id) {
                if mentioned(cited) && !reconciled.contains(cited_id) {
                    reconciled.push(cited_id.clone());
                }
            }
        }
        for entry in repo.entries() {
            if entry.id != self.entry_id && mentioned(entry) && !reconciled.contains(&entry.id) {
                reconciled.push(entry.id.clone());
            }
        }
        reconciled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryDraft;
    use crate::storage::MemoryStorage;

    fn repo() -> EntryRepository<MemoryStorage> {
        EntryRepository::open(MemoryStorage::new()).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn t0() -> DateTime<Utc> {
        "2025-06-01T12:00:00Z".parse().unwrap()
    }

    fn ms(base: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
        base + Duration::milliseconds(millis)
    }

    #[test]
    fn typing_a_mention_creates_the_citation() {
        let mut repo = repo();
        let ocean = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));
        let storm = repo.create(EntryDraft::new("Storm", date("2025-01-02")));

        let mut session = AutosaveSession::begin(repo.get(&storm.id).unwrap());
        session.set_description("I saw @Ocean again", t0());

        // window still open
        assert_eq!(session.poll(&mut repo, ms(t0(), 500)), CommitOutcome::Pending);
        assert_eq!(session.poll(&mut repo, ms(t0(), 1000)), CommitOutcome::Saved);

        assert_eq!(
            repo.get(&storm.id).unwrap().cited_entries,
            vec![ocean.id.clone()]
        );
        let citers = repo.cited_by(&ocean.id);
        assert_eq!(citers.len(), 1);
        assert_eq!(citers[0].id, storm.id);
    }

    #[test]
    fn deleting_the_mention_drops_the_citation() {
        let mut repo = repo();
        let flying = repo.create(EntryDraft::new("Flying Dream", date("2025-01-01")));
        let falling = repo.create(EntryDraft::new("Falling", date("2025-01-02")));

        let mut session = AutosaveSession::begin(repo.get(&falling.id).unwrap());
        session.set_description("chased by @Flying Dream", t0());
        session.poll(&mut repo, ms(t0(), 1000));
        assert_eq!(
            repo.get(&falling.id).unwrap().cited_entries,
            vec![flying.id.clone()]
        );

        let later = ms(t0(), 5000);
        session.set_description("chased by nothing", later);
        assert_eq!(session.poll(&mut repo, ms(later, 1000)), CommitOutcome::Saved);
        assert!(repo.get(&falling.id).unwrap().cited_entries.is_empty());
    }

    #[test]
    fn settled_poll_with_no_delta_writes_nothing() {
        let mut repo = repo();
        let a = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));

        let mut session = AutosaveSession::begin(repo.get(&a.id).unwrap());
        let saves_before = repo.storage().entry_saves();

        assert_eq!(session.poll(&mut repo, t0()), CommitOutcome::Clean);
        assert_eq!(session.poll(&mut repo, ms(t0(), 60_000)), CommitOutcome::Clean);
        assert_eq!(repo.storage().entry_saves(), saves_before);

        // retyping the identical value settles to no write either
        session.set_title("Ocean", t0());
        assert_eq!(session.poll(&mut repo, ms(t0(), 500)), CommitOutcome::Clean);
        assert_eq!(repo.storage().entry_saves(), saves_before);
    }

    #[test]
    fn flush_bypasses_the_debounce_window() {
        let mut repo = repo();
        let a = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));

        let mut session = AutosaveSession::begin(repo.get(&a.id).unwrap());
        session.set_title("Ocean at dawn", t0());

        assert_eq!(session.poll(&mut repo, ms(t0(), 100)), CommitOutcome::Pending);
        assert_eq!(session.flush(&mut repo), CommitOutcome::Saved);
        assert_eq!(repo.get(&a.id).unwrap().title, "Ocean at dawn");
        assert_eq!(session.state(), SessionState::Editing);
    }

    #[test]
    fn explicit_citation_survives_only_while_mentioned() {
        let mut repo = repo();
        let ocean = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));
        let storm = repo.create(EntryDraft::new("Storm", date("2025-01-02")));

        let mut session = AutosaveSession::begin(repo.get(&storm.id).unwrap());
        session.cite(&ocean.clone(), t0());
        assert!(session.flush(&mut repo) == CommitOutcome::Saved);
        assert_eq!(
            repo.get(&storm.id).unwrap().cited_entries,
            vec![ocean.id.clone()]
        );
        assert!(
            repo.get(&storm.id)
                .unwrap()
                .description
                .contains("@Ocean")
        );

        // wiping the mention text invalidates the explicit citation
        session.set_description("", ms(t0(), 2000));
        assert_eq!(session.flush(&mut repo), CommitOutcome::Saved);
        assert!(repo.get(&storm.id).unwrap().cited_entries.is_empty());
    }

    #[test]
    fn deleting_the_entry_cancels_the_session() {
        let mut repo = repo();
        let a = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));

        let mut session = AutosaveSession::begin(repo.get(&a.id).unwrap());
        session.set_title("never lands", t0());
        repo.soft_delete(&a.id);

        assert_eq!(session.flush(&mut repo), CommitOutcome::Inactive);
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.poll(&mut repo, ms(t0(), 10_000)), CommitOutcome::Inactive);
    }

    #[test]
    fn each_field_keeps_its_own_window() {
        let mut repo = repo();
        let a = repo.create(EntryDraft::new("Ocean", date("2025-01-01")));

        let mut session = AutosaveSession::begin(repo.get(&a.id).unwrap());
        session.set_title("Ocean II", t0());
        // title window (500ms) has settled, but the description edit at
        // +400ms holds its own 1000ms window open
        session.set_description("waves", ms(t0(), 400));
        assert_eq!(session.poll(&mut repo, ms(t0(), 600)), CommitOutcome::Pending);
        assert_eq!(session.poll(&mut repo, ms(t0(), 1400)), CommitOutcome::Saved);

        let saved = repo.get(&a.id).unwrap();
        assert_eq!(saved.title, "Ocean II");
        assert_eq!(saved.description, "waves");
    }
}
