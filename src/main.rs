use clap::Parser;
use color_eyre::Result;
use dreamweave::cli::{Cli, Commands};
use dreamweave::lock::SessionGuard;
use dreamweave::{Config, EntryRepository, FileStorage, Profile};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;
    env_logger::init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    // Load configuration with the determined profile
    let config = Config::load_with_profile(profile)?;

    let data_dir = match &cli.data_dir {
        Some(dir) => dreamweave::utils::expand_path(dir),
        None => config.get_data_dir(),
    };
    let storage = FileStorage::new(&data_dir)?;

    // Lock subcommands manage the guard directly; everything else refuses to
    // run while the session is locked.
    let command = match cli.command {
        Commands::Lock { action } => {
            let mut guard = SessionGuard::load(storage)?;
            dreamweave::cli::handle_lock(action, &mut guard)?;
            return Ok(());
        }
        command => command,
    };

    let guard = SessionGuard::load(storage.clone())?;
    if guard.is_locked() {
        return Err(color_eyre::eyre::eyre!(
            "Journal is locked; unlock it from the application before using the CLI"
        ));
    }

    let mut repo = EntryRepository::open(storage)?;

    // Dispatch to appropriate command handler
    match command {
        Commands::Add {
            title,
            date,
            description,
            tags,
        } => {
            dreamweave::cli::handle_add(title, date, description, tags, &mut repo)?;
        }
        Commands::List {
            tag,
            search,
            from,
            to,
        } => {
            dreamweave::cli::handle_list(tag, search, from, to, &repo)?;
        }
        Commands::Show { id } => {
            dreamweave::cli::handle_show(id, &repo)?;
        }
        Commands::Delete { id } => {
            dreamweave::cli::handle_delete(id, &mut repo)?;
        }
        Commands::Restore { id } => {
            dreamweave::cli::handle_restore(id, &mut repo)?;
        }
        Commands::Trash => {
            dreamweave::cli::handle_trash(&repo)?;
        }
        Commands::Purge { id, all } => {
            dreamweave::cli::handle_purge(id, all, &mut repo)?;
        }
        Commands::Cite { citing, cited } => {
            dreamweave::cli::handle_cite(citing, cited, &mut repo)?;
        }
        Commands::Uncite { citing, cited } => {
            dreamweave::cli::handle_uncite(citing, cited, &mut repo)?;
        }
        Commands::Stats => {
            dreamweave::cli::handle_stats(&repo)?;
        }
        Commands::Graph {
            from,
            to,
            tag,
            show_isolated,
        } => {
            dreamweave::cli::handle_graph(from, to, tag, show_isolated, &repo)?;
        }
        Commands::Export { path } => {
            dreamweave::cli::handle_export(path, &repo)?;
        }
        Commands::Import { path } => {
            dreamweave::cli::handle_import(path, &mut repo)?;
        }
        Commands::SuggestTags { id, category } => {
            dreamweave::cli::handle_suggest_tags(id, category, &repo, &config)?;
        }
        Commands::SuggestTitle { id } => {
            dreamweave::cli::handle_suggest_title(id, &repo, &config)?;
        }
        Commands::Lock { .. } => unreachable!("handled above"),
    }

    Ok(())
}
