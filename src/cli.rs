/// CLI argument parsing and command handling.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use seglabels::color::to_hex;
use seglabels::{
    DuplicatePolicy, GroupStore, LabelGroup, SegmentList, StoreConfig, apply_group,
    assign_colors_batch, parse_label_list, validate_save_request,
};

#[derive(Parser)]
#[command(
    name = "seglabels",
    version,
    about = "seglabels - reusable label groups for segmentation editors"
)]
pub struct Cli {
    /// Store directory, bypassing settings-directory resolution.
    #[arg(long, global = true, env = "SEGLABELS_STORE_DIR")]
    pub store_dir: Option<PathBuf>,
    /// Host user-settings file; the store lives next to it.
    #[arg(long, global = true, env = "SEGLABELS_SETTINGS_FILE")]
    pub settings_file: Option<PathBuf>,
    /// Legacy labels.json to migrate from.
    #[arg(long, global = true, env = "SEGLABELS_LEGACY_FILE")]
    pub legacy_file: Option<PathBuf>,
    /// More log output (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            host_settings_file: self.settings_file.clone(),
            legacy_file: self.legacy_file.clone(),
            store_dir: self.store_dir.clone(),
        }
    }

    pub fn log_filter(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List saved groups.
    List,
    /// Show the labels and colors of a group.
    Show { group: String },
    /// Save a group, generating a color per label.
    Save {
        group: String,
        labels: Vec<String>,
        /// Read labels from a file, one per line.
        #[arg(short = 'f', long = "from-file")]
        from_file: Option<PathBuf>,
        /// Overwrite an existing group.
        #[arg(long)]
        force: bool,
    },
    /// Delete a group.
    Delete { group: String },
    /// Print the colors a label list would get, without saving.
    Colors {
        #[arg(required = true)]
        labels: Vec<String>,
    },
    /// Preview applying a group to a segmentation with the given segments.
    Apply {
        group: String,
        #[arg(short = 'e', long = "existing")]
        existing: Vec<String>,
        /// Create the non-duplicate labels instead of aborting.
        #[arg(long)]
        skip_duplicates: bool,
    },
}

/// Execute a CLI command against `store`.
pub fn run(command: Command, store: &GroupStore) -> Result<()> {
    match command {
        Command::List => handle_list(store),
        Command::Show { group } => handle_show(group, store),
        Command::Save {
            group,
            labels,
            from_file,
            force,
        } => handle_save(group, labels, from_file, force, store)?,
        Command::Delete { group } => handle_delete(group, store)?,
        Command::Colors { labels } => print_group(&assign_colors_batch(&labels)),
        Command::Apply {
            group,
            existing,
            skip_duplicates,
        } => handle_apply(group, existing, skip_duplicates, store),
    }
    Ok(())
}

fn handle_list(store: &GroupStore) {
    for name in store.list_groups() {
        println!("{name}");
    }
}

fn handle_show(group: String, store: &GroupStore) {
    let labels = store.load_group(&group);
    if labels.is_empty() {
        println!("Group '{group}' not found.");
        return;
    }
    print_group(&labels);
}

fn handle_save(
    group: String,
    mut labels: Vec<String>,
    from_file: Option<PathBuf>,
    force: bool,
    store: &GroupStore,
) -> Result<()> {
    if let Some(path) = from_file {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading labels from {}", path.display()))?;
        labels.extend(parse_label_list(&text));
    }
    let labels: Vec<String> = labels
        .iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    let name = match validate_save_request(&group, &labels) {
        Ok(name) => name,
        Err(e) => {
            println!("Cannot save: {e}.");
            return Ok(());
        }
    };
    if store.contains(&name) && !force {
        println!("Group '{name}' already exists. Use --force to overwrite it.");
        return Ok(());
    }
    store.save_group(&name, &assign_colors_batch(&labels))?;
    println!("Group '{name}' has been saved.");
    Ok(())
}

fn handle_delete(group: String, store: &GroupStore) -> Result<()> {
    if store.delete_group(&group)? {
        println!("Group '{group}' deleted.");
    } else {
        println!("Group '{group}' not found.");
    }
    Ok(())
}

fn handle_apply(group: String, existing: Vec<String>, skip_duplicates: bool, store: &GroupStore) {
    let labels = store.load_group(&group);
    if labels.is_empty() {
        println!("Cannot load group '{group}'.");
        return;
    }
    let policy = if skip_duplicates {
        DuplicatePolicy::SkipDuplicates
    } else {
        DuplicatePolicy::Abort
    };
    let mut segmentation = SegmentList::with_names(&existing);
    let report = apply_group(&labels, &mut segmentation, policy);
    if report.aborted {
        println!(
            "These labels already exist: {}. Use --skip-duplicates to apply the rest.",
            report.skipped_duplicates.join(", ")
        );
        return;
    }
    for label in &report.created {
        println!("+ {label}");
    }
    for label in &report.skipped_duplicates {
        println!("= {label} (exists)");
    }
}

fn print_group(group: &LabelGroup) {
    for (label, color) in group {
        println!(
            "{label}\t{} {:.4} {:.4} {:.4}",
            to_hex(color),
            color.r,
            color.g,
            color.b
        );
    }
}
