//! ticktrack - command-line client for the TickTrack time tracker
//!
//! Thin CLI over the activity store: list and edit tasks, and drive the
//! start/pause/finish timer with a live ticking display.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use ticktrack::api::{ActivityClient, StaticToken};
use ticktrack::config::Config;
use ticktrack::models::{Task, TaskDraft, TimerStatus};
use ticktrack::selection::FileSelection;
use ticktrack::store::{ActivityStore, DEFAULT_PAGE_SIZE};
use ticktrack::timer::format_elapsed;

#[derive(Parser)]
#[command(name = "ticktrack")]
#[command(about = "Track tasks and work time against a TickTrack server")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new config file
    Init {
        /// Output path for config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List tasks
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,

        /// Only tasks carrying this tag (filtered by the server)
        #[arg(long)]
        tag: Option<String>,

        /// Only tasks due on this date (filtered locally)
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// Create a task
    Add {
        title: String,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        due: Option<NaiveDate>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Toggle a task's completion
    Done { id: String },

    /// Delete a task
    Rm {
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Start the timer on a task
    Start { id: String },

    /// Pause the running timer
    Pause { id: String },

    /// Stop the timer and mark the task completed (not undoable)
    Finish {
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Remember a task as selected, or clear the selection
    Select { id: Option<String> },

    /// Watch the selected task's timer tick live
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ticktrack=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Init { output } = &cli.command {
        let path = output.clone().unwrap_or_else(|| PathBuf::from("config.toml"));
        let cfg = Config::default();
        cfg.save_to(&path)?;

        println!("Created config file: {}", path.display());
        println!();
        println!("Next steps:");
        println!("  1. Set [server] url to your activity API");
        println!("  2. Paste your API token under [auth]");
        println!("  3. List your tasks: ticktrack list");
        return Ok(());
    }

    let cfg = if let Some(path) = &cli.config {
        Config::load_from(path)?
    } else {
        Config::load()?
    };
    let mut store = build_store(&cfg)?;

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::List {
            skip,
            limit,
            tag,
            due,
        } => {
            let ok = if tag.is_some() {
                store.set_tag_filter(tag).await
            } else {
                store.load(skip, limit).await
            };
            if !ok {
                return bail_with_store_error(&store);
            }

            let tasks: Vec<&Task> = match due {
                Some(date) => store.due_on(date),
                None => store.sorted(),
            };
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in tasks {
                print_task(task);
            }
            Ok(())
        }

        Commands::Add {
            title,
            tags,
            due,
            description,
        } => {
            if !store.load(0, DEFAULT_PAGE_SIZE).await {
                return bail_with_store_error(&store);
            }
            let draft = TaskDraft {
                title,
                description,
                tags,
                due_date: due,
            };
            match store.create(&draft).await {
                Some(task) => {
                    println!("Created task {} - {}", task.id, task.title);
                    Ok(())
                }
                None => bail_with_store_error(&store),
            }
        }

        Commands::Done { id } => {
            if !store.load(0, DEFAULT_PAGE_SIZE).await {
                return bail_with_store_error(&store);
            }
            if store.toggle_complete(&id).await {
                match store.tasks().iter().find(|t| t.id == id) {
                    Some(task) if task.completed => println!("Completed: {}", task.title),
                    Some(task) => println!("Reopened: {}", task.title),
                    None => {}
                }
                Ok(())
            } else {
                bail_with_store_error(&store)
            }
        }

        Commands::Rm { id, yes } => {
            if !store.load(0, DEFAULT_PAGE_SIZE).await {
                return bail_with_store_error(&store);
            }
            if !yes && !confirm(&format!("Delete task {id}? [y/N] "))? {
                println!("Aborted.");
                return Ok(());
            }
            if store.delete(&id).await {
                println!("Deleted task {id}");
                Ok(())
            } else {
                bail_with_store_error(&store)
            }
        }

        Commands::Start { id } => {
            if !store.load(0, DEFAULT_PAGE_SIZE).await {
                return bail_with_store_error(&store);
            }
            store.select(Some(id.as_str()));
            if store.start(&id).await {
                let recorded = store.displayed_time().unwrap_or(0);
                println!("Timer running at {}", format_elapsed(recorded));
                Ok(())
            } else {
                bail_with_store_error(&store)
            }
        }

        Commands::Pause { id } => {
            if !store.load(0, DEFAULT_PAGE_SIZE).await {
                return bail_with_store_error(&store);
            }
            if store.pause(&id).await {
                let recorded = store
                    .tasks()
                    .iter()
                    .find(|t| t.id == id)
                    .map(|t| t.recorded_time)
                    .unwrap_or(0);
                println!("Timer paused at {}", format_elapsed(recorded));
                Ok(())
            } else {
                bail_with_store_error(&store)
            }
        }

        Commands::Finish { id, yes } => {
            if !store.load(0, DEFAULT_PAGE_SIZE).await {
                return bail_with_store_error(&store);
            }
            if !yes && !confirm(&format!("Finish task {id} and mark it completed? [y/N] "))? {
                println!("Aborted.");
                return Ok(());
            }
            if store.finish(&id).await {
                let recorded = store
                    .tasks()
                    .iter()
                    .find(|t| t.id == id)
                    .map(|t| t.recorded_time)
                    .unwrap_or(0);
                println!("Finished. Recorded time: {}", format_elapsed(recorded));
                Ok(())
            } else {
                bail_with_store_error(&store)
            }
        }

        Commands::Select { id } => {
            if !store.load(0, DEFAULT_PAGE_SIZE).await {
                return bail_with_store_error(&store);
            }
            if store.select(id.as_deref()) {
                match store.selected_task() {
                    Some(task) => println!("Selected: {}", task.title),
                    None => println!("Selection cleared."),
                }
                Ok(())
            } else {
                bail_with_store_error(&store)
            }
        }

        Commands::Watch => {
            if !store.load(0, DEFAULT_PAGE_SIZE).await {
                bail_with_store_error(&store)?;
            }
            let Some(task) = store.selected_task() else {
                println!("No task selected. Use 'ticktrack select <id>' first.");
                return Ok(());
            };
            println!("{} [{}]", task.title, task.timer_status);

            let mut ticks = store.ticks();
            let start = store.displayed_time().unwrap_or(0);
            print!("\r{}", format_elapsed(start));
            std::io::stdout().flush().ok();

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = ticks.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let seconds = *ticks.borrow_and_update();
                        print!("\r{}", format_elapsed(seconds));
                        std::io::stdout().flush().ok();
                    }
                }
            }
            println!();
            Ok(())
        }
    }
}

fn build_store(cfg: &Config) -> Result<ActivityStore> {
    let client = ActivityClient::new(
        cfg.server.url.clone(),
        StaticToken::new(cfg.auth.token.clone()),
    );
    let selection = FileSelection::new(FileSelection::default_path()?);
    Ok(ActivityStore::new(client, Box::new(selection)))
}

fn print_task(task: &Task) {
    let mark = if task.completed { "x" } else { " " };
    let status = match task.timer_status {
        TimerStatus::Running => " [running]",
        TimerStatus::Paused => " [paused]",
        TimerStatus::Idle => "",
    };
    let due = task
        .due_date
        .map(|d| format!("  due {d}"))
        .unwrap_or_default();
    let tags = if task.tags.is_empty() {
        String::new()
    } else {
        format!("  #{}", task.tags.join(" #"))
    };
    println!(
        "[{mark}] {}  {}  {}{due}{tags}{status}",
        task.id,
        task.title,
        format_elapsed(task.recorded_time)
    );
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn bail_with_store_error(store: &ActivityStore) -> Result<()> {
    let message = store
        .last_error()
        .unwrap_or("Operation failed")
        .to_string();
    Err(anyhow::anyhow!(message))
}
