use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ident::{build_tag_id, generate_id};
use crate::taxonomy::CategoryId;

pub type EntryId = String;

/// A single journaled dream. Lives in exactly one of the active or trashed
/// collections; `deleted_at` is set iff the entry is trashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub title: String,
    pub date: NaiveDate, // calendar date, no time component
    pub description: String,
    pub tags: Vec<HierarchicalTag>,
    // Older stores predate citations; a missing field loads as empty.
    #[serde(default, rename = "citedDreams")]
    pub cited_entries: Vec<EntryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn new(draft: EntryDraft) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            title: draft.title,
            date: draft.date,
            description: draft.description,
            tags: draft.tags,
            cited_entries: draft.cited_entries,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tags.iter().any(|t| t.id == tag_id)
    }

    pub fn has_category(&self, category: CategoryId) -> bool {
        self.tags.iter().any(|t| t.category_id == category)
    }
}

/// Fields for a new entry; id and timestamps are assigned on create.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub title: String,
    pub date: NaiveDate,
    pub description: String,
    pub tags: Vec<HierarchicalTag>,
    pub cited_entries: Vec<EntryId>,
}

impl EntryDraft {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
            description: String::new(),
            tags: Vec::new(),
            cited_entries: Vec::new(),
        }
    }
}

/// Partial update for an entry; unset fields are left as they are.
/// Applying any update bumps `updated_at`.
#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub tags: Option<Vec<HierarchicalTag>>,
    pub cited_entries: Option<Vec<EntryId>>,
}

/// A hierarchical tag. Identity is purely structural: the id is derived from
/// (category, subcategory, label) so the same triple always aggregates
/// together across entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchicalTag {
    pub id: String,
    pub label: String,
    pub category_id: CategoryId,
    pub subcategory_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_custom: bool,
}

impl HierarchicalTag {
    pub fn new(category_id: CategoryId, subcategory_id: &str, label: &str) -> Self {
        Self {
            id: build_tag_id(category_id, subcategory_id, label),
            label: label.to_string(),
            category_id,
            subcategory_id: subcategory_id.to_string(),
            is_custom: false,
        }
    }

    pub fn custom(category_id: CategoryId, subcategory_id: &str, label: &str) -> Self {
        Self {
            is_custom: true,
            ..Self::new(category_id, subcategory_id, label)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Gemini,
    LmStudio,
}

impl AiProvider {
    pub const ALL: [AiProvider; 2] = [AiProvider::Gemini, AiProvider::LmStudio];

    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "gemini",
            AiProvider::LmStudio => "lmstudio",
        }
    }
}

/// Per-provider AI settings. Both providers' configs are stored side by side
/// so switching providers never loses the other's settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    pub enabled: bool,
    pub provider: AiProvider,
    pub api_key: String,
    pub completion_endpoint: String,
    pub model_name: String,
}

impl AiConfig {
    pub fn default_for(provider: AiProvider) -> Self {
        match provider {
            AiProvider::Gemini => Self {
                enabled: false,
                provider,
                api_key: String::new(),
                completion_endpoint: String::new(),
                model_name: "gemini-2.0-flash".to_string(),
            },
            AiProvider::LmStudio => Self {
                enabled: false,
                provider,
                api_key: String::new(),
                completion_endpoint: "http://localhost:1234/v1/chat/completions".to_string(),
                model_name: "local-model".to_string(),
            },
        }
    }
}

/// Auto-lock settings. `last_activity` is epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockConfig {
    pub is_enabled: bool,
    pub auto_lock_timeout: u32, // minutes, valid range 1..=60
    pub last_activity: i64,
    pub failed_attempts: u32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            is_enabled: false,
            auto_lock_timeout: 10,
            last_activity: Utc::now().timestamp_millis(),
            failed_attempts: 0,
        }
    }
}

/// Inclusive date range; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        true
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Conjunctive entry filter: all provided criteria must match.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    /// Either a full tag id (`emotions/positive/joy`) or a bare category id
    /// (`emotions`), which matches any tag in that category.
    pub tag: Option<String>,
    pub text: Option<String>,
    pub date_range: DateRange,
}
