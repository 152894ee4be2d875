use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::path::PathBuf;
use todostore::{Category, CategoryFilter, FileAdapter, StatusFilter, TaskStore, visible_tasks};

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "todostore CLI - single-user to-do list with filters and manual ordering")]
#[command(version)]
struct Cli {
    /// Directory holding the task file (default: user data dir, else current directory)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        text: String,

        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,

        /// Category: work, personal, travel or other
        #[arg(long)]
        category: Option<Category>,
    },

    /// List tasks, optionally filtered
    List {
        /// Status filter: all, active or completed
        #[arg(long, default_value = "all")]
        status: StatusFilter,

        /// Category filter: all, work, personal, travel or other
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
    },

    /// Toggle a task's completed state
    Done { id: i64 },

    /// Replace a task's text, due date and category
    Edit {
        id: i64,
        text: String,

        #[arg(long)]
        due: Option<NaiveDate>,

        #[arg(long)]
        category: Option<Category>,
    },

    /// Delete a task
    Rm { id: i64 },

    /// Move the task at one list position to another (0-based)
    Move { from: usize, to: usize },
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let base = cli
        .store_path
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let adapter = FileAdapter::open(&base)?;
    let mut store = TaskStore::open(Box::new(adapter));

    match cli.command {
        Commands::Add { text, due, category } => match store.create(&text, due, category) {
            Some(id) => println!("Added task {}", id),
            None => println!("Nothing added: task text is empty"),
        },
        Commands::List { status, category } => {
            render_list(&store, status, category);
        }
        Commands::Done { id } => {
            if store.get(id).is_none() {
                println!("No task with id {}", id);
            } else {
                store.toggle_completed(id);
                match store.get(id) {
                    Some(t) if t.completed => println!("Task {} is now completed", id),
                    _ => println!("Task {} is now active", id),
                }
            }
        }
        Commands::Edit { id, text, due, category } => {
            if store.get(id).is_none() {
                println!("No task with id {}", id);
            } else if text.trim().is_empty() {
                println!("Nothing changed: task text is empty");
            } else {
                store.update(id, &text, due, category);
                println!("Updated task {}", id);
            }
        }
        Commands::Rm { id } => {
            if store.get(id).is_none() {
                println!("No task with id {}", id);
            } else {
                store.delete(id);
                println!("Deleted task {}", id);
            }
        }
        Commands::Move { from, to } => {
            if from >= store.len() || to >= store.len() {
                println!("Positions must be within 0..{}", store.len());
            } else {
                store.reorder(from, to);
                println!("Moved task from position {} to {}", from, to);
            }
        }
    }

    Ok(())
}

fn render_list(store: &TaskStore, status: StatusFilter, category: CategoryFilter) {
    let visible = visible_tasks(store.tasks(), status, category);
    if visible.is_empty() {
        println!("No tasks");
        return;
    }

    let today = Local::now().date_naive();
    for task in visible {
        let marker = if task.completed { "[x]" } else { "[ ]" };
        let text = if task.completed {
            task.text.strikethrough().to_string()
        } else {
            task.text.clone()
        };

        let mut line = format!("{:>4} {} {}", task.id, marker, text);

        if let Some(due) = task.due_date {
            let shown = if due < today && !task.completed {
                due.to_string().red().to_string()
            } else {
                due.to_string()
            };
            line.push_str(&format!("  due {}", shown));
        }

        if let Some(cat) = task.category {
            line.push_str(&format!("  {}", format!("#{}", cat).dimmed()));
        }

        println!("{}", line);
    }
}
