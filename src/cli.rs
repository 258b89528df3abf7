use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::ai::{AiError, SuggestionClient};
use crate::analytics::{category_summaries, corpus_overview, tag_relationships, tag_stats};
use crate::config::Config;
use crate::graph::{GraphFilter, project};
use crate::lock::{GuardError, SessionGuard};
use crate::models::{DateRange, Entry, EntryDraft, EntryQuery, HierarchicalTag};
use crate::repository::EntryRepository;
use crate::storage::{FileStorage, Storage, StorageError};
use crate::taxonomy::{CategoryId, UNCATEGORIZED_SUBCATEGORY};
use crate::utils::parse_date;

#[derive(Parser)]
#[command(name = "dreamweave")]
#[command(about = "Local-first dream journal: tagged entries, citations and graph views")]
#[command(version)]
pub struct Cli {
    /// Custom data directory (overrides the config file)
    #[arg(short, long)]
    pub data_dir: Option<String>,

    /// Use development mode (uses separate dev config/data directory)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new entry
    Add {
        /// Entry title
        title: String,
        /// Entry date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Free-text description; @Title mentions become citations
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated tags, each `category/subcategory/label` or a bare label
        #[arg(long)]
        tags: Option<String>,
    },
    /// List entries, optionally filtered
    List {
        /// A tag id (`emotions/positive/joy`) or a bare category id
        #[arg(long)]
        tag: Option<String>,
        /// Case-insensitive text search across title, description and tag labels
        #[arg(long)]
        search: Option<String>,
        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
    /// Show one entry in full, including who cites it
    Show {
        /// Entry id
        id: String,
    },
    /// Move an entry to the trash
    Delete { id: String },
    /// Restore an entry from the trash
    Restore { id: String },
    /// List trashed entries
    Trash,
    /// Permanently erase a trashed entry, or the whole trash with --all
    Purge {
        id: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Add a citation from one entry to another
    Cite { citing: String, cited: String },
    /// Remove a citation
    Uncite { citing: String, cited: String },
    /// Tag usage statistics and relationships
    Stats,
    /// Print the citation graph for the given filters
    Graph {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// Tag id filter; repeatable, OR semantics
        #[arg(long)]
        tag: Vec<String>,
        /// Keep entries with no visible citation edges
        #[arg(long)]
        show_isolated: bool,
    },
    /// Export all entries (active and trashed) as a single JSON document
    Export { path: PathBuf },
    /// Import entries from a JSON export, replacing both collections
    Import { path: PathBuf },
    /// Ask the configured AI provider for tag suggestions
    SuggestTags {
        id: String,
        /// Category to file the suggested tags under
        #[arg(long)]
        category: Option<String>,
    },
    /// Ask the configured AI provider for a title suggestion
    SuggestTitle { id: String },
    /// Inspect or change the auto-lock configuration
    Lock {
        #[command(subcommand)]
        action: LockAction,
    },
}

#[derive(Subcommand)]
pub enum LockAction {
    /// Show current lock state and settings
    Status,
    /// Set the password and enable auto-locking
    SetPassword { password: String },
    /// Enable or disable auto-locking
    Enable,
    Disable,
    /// Set the inactivity timeout in minutes (1-60)
    Timeout { minutes: u32 },
    /// Remove the password and disable auto-locking
    Reset,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Entry not found: {0}")]
    EntryNotFound(String),
    #[error("AI error: {0}")]
    AiError(#[from] AiError),
    #[error("Lock error: {0}")]
    GuardError(#[from] GuardError),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid export document: {0}")]
    MalformedExport(#[from] serde_json::Error),
}

fn parse_date_arg(date_str: &str) -> Result<chrono::NaiveDate, CliError> {
    parse_date(date_str)
        .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", date_str, e)))
}

fn date_range(from: Option<String>, to: Option<String>) -> Result<DateRange, CliError> {
    Ok(DateRange {
        start: from.as_deref().map(parse_date_arg).transpose()?,
        end: to.as_deref().map(parse_date_arg).transpose()?,
    })
}

/// Parse a comma-separated tag list. Each element is either a full
/// `category/subcategory/label` triple or a bare label, which becomes a
/// custom uncategorized tag.
fn parse_tags(tags: &str) -> Vec<HierarchicalTag> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|spec| {
            let parts: Vec<&str> = spec.splitn(3, '/').collect();
            match parts.as_slice() {
                [category, subcategory, label] => match CategoryId::parse(category) {
                    Some(category) => HierarchicalTag::new(category, subcategory, label),
                    None => custom_tag(spec),
                },
                _ => custom_tag(spec),
            }
        })
        .collect()
}

fn custom_tag(label: &str) -> HierarchicalTag {
    HierarchicalTag::custom(
        CategoryId::Uncategorized,
        UNCATEGORIZED_SUBCATEGORY,
        label,
    )
}

fn print_entry_line(entry: &Entry) {
    let tags: Vec<&str> = entry.tags.iter().map(|t| t.label.as_str()).collect();
    println!(
        "{}  {}  {}  [{}]",
        entry.id,
        entry.date,
        entry.title,
        tags.join(", ")
    );
}

/// Handle the add command
pub fn handle_add(
    title: String,
    date: Option<String>,
    description: Option<String>,
    tags: Option<String>,
    repo: &mut EntryRepository<FileStorage>,
) -> Result<(), CliError> {
    let date = match date {
        Some(date_str) => parse_date_arg(&date_str)?,
        None => Utc::now().date_naive(),
    };

    let mut draft = EntryDraft::new(title, date);
    if let Some(description) = description {
        draft.description = description;
    }
    if let Some(tags) = tags {
        draft.tags = parse_tags(&tags);
    }

    let entry = repo.create(draft);
    // pick up any @Title mentions typed straight into the description
    let mentioned: Vec<String> = repo
        .entries()
        .iter()
        .filter(|other| {
            other.id != entry.id
                && !other.title.is_empty()
                && entry.description.contains(&format!("@{}", other.title))
        })
        .map(|other| other.id.clone())
        .collect();
    for cited in &mentioned {
        repo.add_citation(&entry.id, cited);
    }

    println!("Entry created successfully (ID: {})", entry.id);
    Ok(())
}

/// Handle the list command
pub fn handle_list(
    tag: Option<String>,
    search: Option<String>,
    from: Option<String>,
    to: Option<String>,
    repo: &EntryRepository<FileStorage>,
) -> Result<(), CliError> {
    let query = EntryQuery {
        tag,
        text: search,
        date_range: date_range(from, to)?,
    };
    let entries = repo.filtered(&query);
    if entries.is_empty() {
        println!("No entries found");
        return Ok(());
    }
    for entry in entries {
        print_entry_line(entry);
    }
    Ok(())
}

/// Handle the show command
pub fn handle_show(id: String, repo: &EntryRepository<FileStorage>) -> Result<(), CliError> {
    let entry = repo.get(&id).ok_or(CliError::EntryNotFound(id))?;
    println!("{}  ({})", entry.title, entry.date);
    println!("id: {}", entry.id);
    if !entry.description.is_empty() {
        println!("\n{}\n", entry.description);
    }
    for tag in &entry.tags {
        println!(
            "tag: {} ({} / {})",
            tag.label,
            tag.category_id.label(),
            tag.subcategory_id
        );
    }
    for cited in repo.cited(&entry.id) {
        println!("cites: {} ({})", cited.title, cited.id);
    }
    for citer in repo.cited_by(&entry.id) {
        println!("cited by: {} ({})", citer.title, citer.id);
    }
    Ok(())
}

/// Handle delete/restore/trash/purge
pub fn handle_delete(id: String, repo: &mut EntryRepository<FileStorage>) -> Result<(), CliError> {
    if repo.get(&id).is_none() {
        return Err(CliError::EntryNotFound(id));
    }
    repo.soft_delete(&id);
    println!("Entry moved to trash");
    Ok(())
}

pub fn handle_restore(id: String, repo: &mut EntryRepository<FileStorage>) -> Result<(), CliError> {
    if !repo.trashed().iter().any(|e| e.id == id) {
        return Err(CliError::EntryNotFound(id));
    }
    repo.restore(&id);
    println!("Entry restored");
    Ok(())
}

pub fn handle_trash(repo: &EntryRepository<FileStorage>) -> Result<(), CliError> {
    if repo.trashed().is_empty() {
        println!("Trash is empty");
        return Ok(());
    }
    for entry in repo.trashed() {
        print_entry_line(entry);
    }
    Ok(())
}

pub fn handle_purge(
    id: Option<String>,
    all: bool,
    repo: &mut EntryRepository<FileStorage>,
) -> Result<(), CliError> {
    if all {
        repo.purge_all();
        println!("Trash emptied");
    } else if let Some(id) = id {
        repo.purge(&id);
        println!("Entry erased");
    } else {
        println!("Nothing to purge: pass an id or --all");
    }
    Ok(())
}

/// Handle cite/uncite
pub fn handle_cite(
    citing: String,
    cited: String,
    repo: &mut EntryRepository<FileStorage>,
) -> Result<(), CliError> {
    for id in [&citing, &cited] {
        if repo.get(id).is_none() {
            return Err(CliError::EntryNotFound(id.clone()));
        }
    }
    repo.add_citation(&citing, &cited);
    println!("Citation added");
    Ok(())
}

pub fn handle_uncite(
    citing: String,
    cited: String,
    repo: &mut EntryRepository<FileStorage>,
) -> Result<(), CliError> {
    repo.remove_citation(&citing, &cited);
    println!("Citation removed");
    Ok(())
}

/// Handle the stats command
pub fn handle_stats(repo: &EntryRepository<FileStorage>) -> Result<(), CliError> {
    let entries = repo.entries();
    let stats = tag_stats(entries);
    if stats.is_empty() {
        println!("No tags in use");
        return Ok(());
    }

    let overview = corpus_overview(entries);
    println!(
        "{} entries, {} tag uses across {} categories (avg {:.1} tags/entry)",
        overview.total_entries,
        overview.total_tag_applications,
        overview.distinct_categories,
        overview.avg_tags_per_entry
    );

    println!("\nTags:");
    for stat in &stats {
        println!(
            "  {:<40} {:>3}x  {:>5.1}%  avg {:.2}",
            stat.tag.id, stat.count, stat.percentage, stat.avg_per_entry
        );
    }

    let relationships = tag_relationships(&stats);
    if !relationships.is_empty() {
        println!("\nStrongest tag pairs:");
        for rel in relationships.iter().take(10) {
            println!(
                "  {} + {}  ({} shared, strength {:.2})",
                rel.tag_a, rel.tag_b, rel.co_occurrence, rel.strength
            );
        }
    }

    println!("\nCategories:");
    for summary in category_summaries(entries) {
        println!(
            "  {:<24} {} tags, {} uses",
            summary.category.label(),
            summary.distinct_tags,
            summary.total_usage
        );
        for sub in &summary.subcategories {
            println!("    {:<22} {}", sub.subcategory_id, sub.usage);
        }
    }
    Ok(())
}

/// Handle the graph command
pub fn handle_graph(
    from: Option<String>,
    to: Option<String>,
    tags: Vec<String>,
    show_isolated: bool,
    repo: &EntryRepository<FileStorage>,
) -> Result<(), CliError> {
    let filter = GraphFilter {
        date_range: date_range(from, to)?,
        selected_tag_ids: tags,
        show_isolated,
        ..Default::default()
    };
    let graph = project(repo.entries(), &filter);
    println!("{} nodes, {} edges", graph.nodes.len(), graph.edges.len());
    for node in &graph.nodes {
        println!(
            "  {}  {} ({} citing)",
            node.id, node.title, node.citation_count
        );
    }
    for edge in &graph.edges {
        println!("  {} -> {}", edge.source, edge.target);
    }
    Ok(())
}

/// Handle export/import
pub fn handle_export(
    path: PathBuf,
    repo: &EntryRepository<FileStorage>,
) -> Result<(), CliError> {
    let mut all: Vec<Entry> = repo.entries().to_vec();
    all.extend_from_slice(repo.trashed());
    let json = serde_json::to_string_pretty(&all)?;
    fs::write(&path, json)?;
    println!("Exported {} entries to {}", all.len(), path.display());
    Ok(())
}

pub fn handle_import(
    path: PathBuf,
    repo: &mut EntryRepository<FileStorage>,
) -> Result<(), CliError> {
    let data = fs::read_to_string(&path)?;
    let entries: Vec<Entry> = serde_json::from_str(&data)?;
    let count = entries.len();
    repo.import_entries(entries);
    println!("Imported {} entries from {}", count, path.display());
    Ok(())
}

/// Handle AI suggestion commands
pub fn handle_suggest_tags(
    id: String,
    category: Option<String>,
    repo: &EntryRepository<FileStorage>,
    config: &Config,
) -> Result<(), CliError> {
    let entry = repo.get(&id).ok_or(CliError::EntryNotFound(id))?;
    let ai_config = repo.storage().load_ai_config(config.ai_provider)?;
    let category_hint = category.as_deref().and_then(CategoryId::parse);

    let client = SuggestionClient::new();
    let tags = client.suggest_tags(&entry.description, &ai_config, config.locale, category_hint)?;
    println!("Suggested tags:");
    for tag in tags {
        println!("  {} ({})", tag.label, tag.id);
    }
    Ok(())
}

pub fn handle_suggest_title(
    id: String,
    repo: &EntryRepository<FileStorage>,
    config: &Config,
) -> Result<(), CliError> {
    let entry = repo.get(&id).ok_or(CliError::EntryNotFound(id))?;
    let ai_config = repo.storage().load_ai_config(config.ai_provider)?;

    let client = SuggestionClient::new();
    let title = client.suggest_title(&entry.description, &ai_config, config.locale)?;
    println!("Suggested title: {}", title);
    Ok(())
}

/// Handle the lock subcommands
pub fn handle_lock(
    action: LockAction,
    guard: &mut SessionGuard<FileStorage>,
) -> Result<(), CliError> {
    match action {
        LockAction::Status => {
            let config = guard.config();
            println!(
                "auto-lock: {}",
                if config.is_enabled { "enabled" } else { "disabled" }
            );
            println!("timeout: {} minutes", config.auto_lock_timeout);
            println!(
                "password: {}",
                if guard.has_password() { "set" } else { "not set" }
            );
            println!("failed attempts: {}", config.failed_attempts);
        }
        LockAction::SetPassword { password } => {
            guard.set_password(&password, Utc::now())?;
            println!("Password set; auto-lock enabled");
        }
        LockAction::Enable => {
            guard.set_enabled(true)?;
            println!("Auto-lock enabled");
        }
        LockAction::Disable => {
            guard.set_enabled(false)?;
            println!("Auto-lock disabled");
        }
        LockAction::Timeout { minutes } => {
            guard.set_timeout(minutes)?;
            println!("Auto-lock timeout set to {} minutes", minutes);
        }
        LockAction::Reset => {
            guard.reset()?;
            println!("Password removed; auto-lock disabled");
        }
    }
    Ok(())
}
