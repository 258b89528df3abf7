//! Read-only tag statistics computed from an immutable snapshot of the
//! active entries. Everything here is recomputed from scratch per call;
//! corpus sizes are small enough that caching would only add staleness bugs.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Entry, HierarchicalTag};
use crate::taxonomy::CategoryId;

/// Usage profile for one distinct tag id across the active entries.
#[derive(Debug, Clone)]
pub struct TagStats {
    pub tag: HierarchicalTag,
    /// Number of entries carrying this tag (per entry, not per occurrence).
    pub count: usize,
    /// count / total entries * 100; 0.0 with an empty corpus.
    pub percentage: f64,
    /// count / total entries; 0.0 with an empty corpus.
    pub avg_per_entry: f64,
    /// Other tag id -> number of entries where both tags appear.
    pub co_occurrences: BTreeMap<String, usize>,
}

/// One unordered pair of tags that appear together on at least one entry.
#[derive(Debug, Clone)]
pub struct TagRelationship {
    /// Pair canonicalized by sorted tag id, so each appears exactly once.
    pub tag_a: String,
    pub tag_b: String,
    pub co_occurrence: usize,
    /// co_occurrence / min(count_a, count_b); always in (0, 1].
    pub strength: f64,
}

#[derive(Debug, Clone)]
pub struct SubcategoryUsage {
    pub subcategory_id: String,
    pub usage: usize,
}

/// Per-category rollup, including the synthetic uncategorized bucket.
#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: CategoryId,
    pub distinct_tags: usize,
    pub total_usage: usize,
    /// Top five tags by count, descending.
    pub top_tags: Vec<TagStats>,
    pub subcategories: Vec<SubcategoryUsage>,
}

const TOP_TAGS_PER_CATEGORY: usize = 5;

/// Corpus-wide headline numbers.
#[derive(Debug, Clone, Default)]
pub struct CorpusOverview {
    pub total_entries: usize,
    /// Tag applications across all entries (repeats within an entry count).
    pub total_tag_applications: usize,
    pub distinct_categories: usize,
    /// total_tag_applications / total_entries; 0.0 with an empty corpus.
    pub avg_tags_per_entry: f64,
}

pub fn corpus_overview(entries: &[Entry]) -> CorpusOverview {
    let total_entries = entries.len();
    let total_tag_applications: usize = entries.iter().map(|e| e.tags.len()).sum();
    let distinct_categories = entries
        .iter()
        .flat_map(|e| e.tags.iter().map(|t| t.category_id))
        .collect::<HashSet<_>>()
        .len();
    let avg_tags_per_entry = if total_entries == 0 {
        0.0
    } else {
        total_tag_applications as f64 / total_entries as f64
    };
    CorpusOverview {
        total_entries,
        total_tag_applications,
        distinct_categories,
        avg_tags_per_entry,
    }
}

/// Compute per-tag usage stats over the active entries.
///
/// Co-occurrence is counted per entry: a pair present together on one entry
/// contributes one regardless of how the tags repeat within it, and the
/// resulting map is symmetric across the returned stats.
pub fn tag_stats(entries: &[Entry]) -> Vec<TagStats> {
    let total = entries.len();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut samples: HashMap<String, HierarchicalTag> = HashMap::new();
    let mut co: HashMap<String, BTreeMap<String, usize>> = HashMap::new();

    for entry in entries {
        let mut distinct: Vec<&HierarchicalTag> = Vec::new();
        let mut seen = HashSet::new();
        for tag in &entry.tags {
            if seen.insert(tag.id.as_str()) {
                distinct.push(tag);
            }
        }
        for tag in &distinct {
            *counts.entry(tag.id.clone()).or_insert(0) += 1;
            samples
                .entry(tag.id.clone())
                .or_insert_with(|| (*tag).clone());
        }
        for a in &distinct {
            for b in &distinct {
                if a.id != b.id {
                    *co.entry(a.id.clone())
                        .or_default()
                        .entry(b.id.clone())
                        .or_insert(0) += 1;
                }
            }
        }
    }

    let mut stats: Vec<TagStats> = samples
        .into_iter()
        .map(|(id, tag)| {
            let count = counts.get(&id).copied().unwrap_or(0);
            let (percentage, avg) = if total == 0 {
                (0.0, 0.0)
            } else {
                (
                    count as f64 / total as f64 * 100.0,
                    count as f64 / total as f64,
                )
            };
            TagStats {
                tag,
                count,
                percentage,
                avg_per_entry: avg,
                co_occurrences: co.remove(&id).unwrap_or_default(),
            }
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.id.cmp(&b.tag.id)));
    stats
}

/// Derive unordered tag pairs with their relationship strength, strongest
/// first. Ties break on the canonical (sorted) pair ids for stable output.
pub fn tag_relationships(stats: &[TagStats]) -> Vec<TagRelationship> {
    let counts: HashMap<&str, usize> = stats.iter().map(|s| (s.tag.id.as_str(), s.count)).collect();
    let mut out = Vec::new();
    for stat in stats {
        for (other, &co) in &stat.co_occurrences {
            // emit each unordered pair once, from its lexically-smaller side
            if stat.tag.id.as_str() >= other.as_str() {
                continue;
            }
            let min_count = stat.count.min(*counts.get(other.as_str()).unwrap_or(&stat.count));
            if min_count == 0 || co == 0 {
                continue;
            }
            out.push(TagRelationship {
                tag_a: stat.tag.id.clone(),
                tag_b: other.clone(),
                co_occurrence: co,
                strength: co as f64 / min_count as f64,
            });
        }
    }
    out.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.tag_a.cmp(&b.tag_a))
            .then_with(|| a.tag_b.cmp(&b.tag_b))
    });
    out
}

/// Roll tag stats up per category. Only categories with at least one used
/// tag are returned, ordered by total usage descending.
pub fn category_summaries(entries: &[Entry]) -> Vec<CategorySummary> {
    let stats = tag_stats(entries);
    let mut by_category: HashMap<CategoryId, Vec<TagStats>> = HashMap::new();
    for stat in stats {
        by_category
            .entry(stat.tag.category_id)
            .or_default()
            .push(stat);
    }

    let mut out: Vec<CategorySummary> = by_category
        .into_iter()
        .map(|(category, tags)| {
            let distinct_tags = tags.len();
            let total_usage: usize = tags.iter().map(|t| t.count).sum();

            let mut subs: BTreeMap<String, usize> = BTreeMap::new();
            for tag in &tags {
                *subs.entry(tag.tag.subcategory_id.clone()).or_insert(0) += tag.count;
            }
            let mut subcategories: Vec<SubcategoryUsage> = subs
                .into_iter()
                .map(|(subcategory_id, usage)| SubcategoryUsage {
                    subcategory_id,
                    usage,
                })
                .collect();
            subcategories.sort_by(|a, b| {
                b.usage
                    .cmp(&a.usage)
                    .then_with(|| a.subcategory_id.cmp(&b.subcategory_id))
            });

            // tags arrive sorted by count already
            let top_tags = tags.into_iter().take(TOP_TAGS_PER_CATEGORY).collect();
            CategorySummary {
                category,
                distinct_tags,
                total_usage,
                top_tags,
                subcategories,
            }
        })
        .collect();
    out.sort_by(|a, b| {
        b.total_usage
            .cmp(&a.total_usage)
            .then_with(|| a.category.as_str().cmp(b.category.as_str()))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, EntryDraft};
    use chrono::NaiveDate;

    fn entry_with_tags(title: &str, tags: Vec<HierarchicalTag>) -> Entry {
        let mut draft = EntryDraft::new(title, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        draft.tags = tags;
        Entry::new(draft)
    }

    fn flying() -> HierarchicalTag {
        HierarchicalTag::new(CategoryId::Actions, "Movement", "Flying")
    }

    fn joy() -> HierarchicalTag {
        HierarchicalTag::new(CategoryId::Emotions, "Positive", "Joy")
    }

    fn fear() -> HierarchicalTag {
        HierarchicalTag::new(CategoryId::Emotions, "Negative", "Fear")
    }

    #[test]
    fn counts_percentages_and_averages() {
        // "flying" on 3 of 10 entries
        let mut entries: Vec<Entry> = (0..3)
            .map(|i| entry_with_tags(&format!("f{i}"), vec![flying()]))
            .collect();
        for i in 0..7 {
            entries.push(entry_with_tags(&format!("p{i}"), vec![]));
        }

        let stats = tag_stats(&entries);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].count, 3);
        assert!((stats[0].percentage - 30.0).abs() < f64::EPSILON);
        assert!((stats[0].avg_per_entry - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_corpus_yields_no_nans() {
        assert!(tag_stats(&[]).is_empty());
        assert!(category_summaries(&[]).is_empty());
        let overview = corpus_overview(&[]);
        assert_eq!(overview.total_entries, 0);
        assert_eq!(overview.avg_tags_per_entry, 0.0);
    }

    #[test]
    fn overview_counts_applications_not_distinct_tags() {
        let entries = vec![
            entry_with_tags("a", vec![flying(), joy()]),
            entry_with_tags("b", vec![joy()]),
            entry_with_tags("c", vec![]),
        ];
        let overview = corpus_overview(&entries);
        assert_eq!(overview.total_entries, 3);
        assert_eq!(overview.total_tag_applications, 3);
        assert_eq!(overview.distinct_categories, 2);
        assert!((overview.avg_tags_per_entry - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn co_occurrence_is_symmetric_and_per_entry() {
        // duplicated tag on one entry must still count once for the pair
        let entries = vec![
            entry_with_tags("a", vec![flying(), joy(), joy()]),
            entry_with_tags("b", vec![flying(), joy()]),
            entry_with_tags("c", vec![flying()]),
        ];
        let stats = tag_stats(&entries);
        let by_id: HashMap<&str, &TagStats> =
            stats.iter().map(|s| (s.tag.id.as_str(), s)).collect();

        let f = by_id[flying().id.as_str()];
        let j = by_id[joy().id.as_str()];
        assert_eq!(f.count, 3);
        assert_eq!(j.count, 2);
        assert_eq!(f.co_occurrences[&joy().id], 2);
        assert_eq!(j.co_occurrences[&flying().id], 2);
    }

    #[test]
    fn relationship_strength_uses_smaller_count() {
        let entries = vec![
            entry_with_tags("a", vec![flying(), joy()]),
            entry_with_tags("b", vec![flying(), joy()]),
            entry_with_tags("c", vec![flying()]),
            entry_with_tags("d", vec![flying(), fear()]),
        ];
        let rels = tag_relationships(&tag_stats(&entries));
        assert_eq!(rels.len(), 2);
        // joy: count 2, co with flying 2 -> strength 1.0, sorted first
        assert_eq!(rels[0].co_occurrence, 2);
        assert!((rels[0].strength - 1.0).abs() < f64::EPSILON);
        assert!(rels[0].tag_a < rels[0].tag_b);
        // fear: count 1, co 1 -> also 1.0; pair order is canonical
        assert!((rels[1].strength - 1.0).abs() < f64::EPSILON);
        for rel in &rels {
            assert!(rel.strength > 0.0 && rel.strength <= 1.0);
        }
    }

    #[test]
    fn category_summary_rolls_up_subcategories() {
        let entries = vec![
            entry_with_tags("a", vec![joy(), fear()]),
            entry_with_tags("b", vec![joy()]),
            entry_with_tags("c", vec![flying()]),
        ];
        let summaries = category_summaries(&entries);
        assert_eq!(summaries.len(), 2);

        let emotions = summaries
            .iter()
            .find(|s| s.category == CategoryId::Emotions)
            .unwrap();
        assert_eq!(emotions.distinct_tags, 2);
        assert_eq!(emotions.total_usage, 3);
        assert_eq!(emotions.top_tags[0].tag.label, "Joy");
        assert_eq!(emotions.subcategories[0].subcategory_id, "Positive");
        assert_eq!(emotions.subcategories[0].usage, 2);
        assert_eq!(emotions.subcategories[1].usage, 1);

        // sorted by total usage, emotions (3) before actions (1)
        assert_eq!(summaries[0].category, CategoryId::Emotions);
    }
}
