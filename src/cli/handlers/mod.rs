use std::fs;

use chrono::Utc;

use crate::app::App;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::lock::FileLock;
use crate::io::recovery;
use crate::io::store::{self, FileStore, StoreError};
use crate::manager::TaskManager;
use crate::model::config::{AppConfig, CorruptPolicy};
use crate::model::task::TaskId;
use crate::ops::task_ops::normalize_text;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Resolved configuration and slot for one invocation
struct Context {
    config: AppConfig,
    store: FileStore,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let config = config_io::read_config(cli.config.as_deref())?;
    let store = config_io::resolve_store(&config, cli.store.as_deref());
    let ctx = Context {
        config,
        store,
        json: cli.json,
    };

    match cli.command {
        // Read commands
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::Show(args) => cmd_show(&ctx, args),
        Commands::Stats => cmd_stats(&ctx),
        Commands::Export => cmd_export(&ctx),
        Commands::Recovery(args) => cmd_recovery(&ctx, args),

        // Write commands
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Toggle(args) => cmd_toggle(&ctx, args),
        Commands::Edit(args) => cmd_edit(&ctx, args),
        Commands::Delete(args) => cmd_delete(&ctx, args),
        Commands::Import(args) => cmd_import(&ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_manager(ctx: &Context) -> Result<TaskManager<FileStore>, StoreError> {
    TaskManager::open_with_policy(ctx.store.clone(), ctx.config.storage.on_corrupt)
}

/// Open the manager for a read command. Resetting a corrupt slot writes to
/// it, so that policy reads under the lock as well.
fn open_manager_for_read(
    ctx: &Context,
) -> Result<(Option<FileLock>, TaskManager<FileStore>), StoreError> {
    match ctx.config.storage.on_corrupt {
        CorruptPolicy::Reset => {
            let (lock, manager) = open_manager_locked(ctx)?;
            Ok((Some(lock), manager))
        }
        CorruptPolicy::Fail => Ok((None, open_manager(ctx)?)),
    }
}

/// Open the manager while holding the data directory lock. Keep the lock
/// alive until the command's last write.
fn open_manager_locked(ctx: &Context) -> Result<(FileLock, TaskManager<FileStore>), StoreError> {
    let lock = FileLock::acquire_default(ctx.store.data_dir())?;
    let manager = open_manager(ctx)?;
    Ok((lock, manager))
}

fn not_found(id: TaskId) -> Box<dyn std::error::Error> {
    format!("task not found: {}", id).into()
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(ctx: &Context, args: ListArgs) -> CmdResult {
    let filter = args.filter.unwrap_or(ctx.config.display.default_filter);
    let (_lock, manager) = open_manager_for_read(ctx)?;
    let app = App::new(manager).with_filter(filter);
    let visible = app.visible();

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    let width = if args.full {
        0
    } else {
        ctx.config.display.text_width
    };
    println!("{}", app.counts().header());
    print_lines(&format_task_listing(&visible, width, &app.empty_message()));
    Ok(())
}

fn cmd_show(ctx: &Context, args: IdArgs) -> CmdResult {
    let (_lock, manager) = open_manager_for_read(ctx)?;
    let task = manager.find(args.id).ok_or_else(|| not_found(args.id))?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        print_lines(&format_task_detail(task));
    }
    Ok(())
}

fn cmd_stats(ctx: &Context) -> CmdResult {
    let (_lock, manager) = open_manager_for_read(ctx)?;
    let counts = manager.counts();
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&counts_to_json(&counts))?);
    } else {
        print_lines(&format_counts(&counts));
    }
    Ok(())
}

fn cmd_export(ctx: &Context) -> CmdResult {
    let (_lock, manager) = open_manager_for_read(ctx)?;
    println!("{}", serde_json::to_string_pretty(manager.tasks())?);
    Ok(())
}

fn cmd_recovery(ctx: &Context, args: RecoveryArgs) -> CmdResult {
    let data_dir = ctx.store.data_dir();

    if args.prune {
        let before = if args.all {
            None
        } else {
            Some(Utc::now() - chrono::Duration::days(recovery::PRUNE_AGE_DAYS))
        };
        let removed = recovery::prune_recovery(data_dir, before)?;
        println!("pruned {} recovery entries", removed);
        return Ok(());
    }

    let entries = recovery::read_recovery_entries(data_dir, Some(args.limit));
    if ctx.json {
        let json: Vec<_> = entries.iter().map(recovery_entry_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if entries.is_empty() {
        println!("recovery log is empty");
    } else {
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_lines(&format_recovery_entry(entry));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let (_lock, mut manager) = open_manager_locked(ctx)?;
    let id = manager
        .add(&args.text)?
        .ok_or("task text is blank, nothing added")?;

    if ctx.json {
        let task = manager.find(id).ok_or_else(|| not_found(id))?;
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        println!("{}", id);
    }
    Ok(())
}

fn cmd_toggle(ctx: &Context, args: IdArgs) -> CmdResult {
    let (_lock, mut manager) = open_manager_locked(ctx)?;
    if !manager.toggle(args.id)? {
        return Err(not_found(args.id));
    }
    let task = manager.find(args.id).ok_or_else(|| not_found(args.id))?;
    let state = if task.completed { "completed" } else { "active" };
    println!("{} {}", args.id, state);
    Ok(())
}

fn cmd_edit(ctx: &Context, args: EditArgs) -> CmdResult {
    let (_lock, mut manager) = open_manager_locked(ctx)?;
    if manager.find(args.id).is_none() {
        return Err(not_found(args.id));
    }
    if normalize_text(&args.text).is_none() {
        return Err("task text is blank, text left unchanged".into());
    }
    if manager.edit(args.id, &args.text)? {
        println!("{} text updated", args.id);
    } else {
        println!("{} unchanged", args.id);
    }
    Ok(())
}

fn cmd_delete(ctx: &Context, args: IdArgs) -> CmdResult {
    let (_lock, mut manager) = open_manager_locked(ctx)?;
    let removed = manager.delete(args.id)?.ok_or_else(|| not_found(args.id))?;
    recovery::log_task_deletion(
        ctx.store.data_dir(),
        &removed.id.to_string(),
        &serde_json::to_string(&removed)?,
    );
    println!("{} deleted", args.id);
    Ok(())
}

fn cmd_import(ctx: &Context, args: ImportArgs) -> CmdResult {
    let raw = fs::read_to_string(&args.file)
        .map_err(|e| format!("could not read {}: {}", args.file.display(), e))?;
    let incoming = store::parse_slot(&raw, &args.file.display().to_string())?;

    let (_lock, mut manager) = open_manager_locked(ctx)?;
    let added = manager.import(&incoming)?;
    let skipped = incoming.len() - added;
    if skipped > 0 {
        println!("imported {} tasks ({} already present)", added, skipped);
    } else {
        println!("imported {} tasks", added);
    }
    Ok(())
}
