use std::fmt::Write as _;
use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use time::OffsetDateTime;

use crate::app::App;
use crate::config::AppConfig;
use crate::dates::{describe_created, now_local};
use crate::storage::OpenedStorage;
use crate::tasks::{PersistenceStatus, TaskList};
use crate::text::decode_entities;
use crate::view::ViewController;

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task text; words are joined with single spaces. Read from stdin if omitted.
    #[arg()]
    pub text: Vec<String>,
}

pub fn run_tui(config: Arc<AppConfig>, opened: OpenedStorage) -> Result<()> {
    if !atty::is(atty::Stream::Stdout) {
        bail!("the task list needs an interactive terminal; use `taskcells list` instead");
    }
    let store = TaskList::hydrate(opened.repository, config.display.clone());
    let view = ViewController::new(store, opened.warning);
    let mut app = App::new(config, view);
    app.run()
}

pub fn add_task(config: &AppConfig, opened: OpenedStorage, args: AddArgs) -> Result<()> {
    let text = if args.text.is_empty() {
        read_stdin()?.unwrap_or_default()
    } else {
        args.text.join(" ")
    };

    if let Some(warning) = &opened.warning {
        eprintln!("warning: {warning}");
    }
    let mut store = TaskList::hydrate(opened.repository, config.display.clone());
    let Some(id) = store.add_task(&text) else {
        bail!("task text cannot be empty");
    };
    if let PersistenceStatus::Failed(reason) = store.persistence_status() {
        bail!("task was not saved: {reason}");
    }
    if let Some(task) = store.get(id) {
        println!("Added: {}", decode_entities(task.display_text()));
    }
    Ok(())
}

pub fn list_tasks(config: &AppConfig, opened: OpenedStorage) -> Result<()> {
    if let Some(warning) = &opened.warning {
        eprintln!("warning: {warning}");
    }
    let store = TaskList::hydrate(opened.repository, config.display.clone());
    print!("{}", format_task_list(&store, now_local()));
    Ok(())
}

/// One line per task: completion marker, shown text, creation label.
pub fn format_task_list(store: &TaskList, now: OffsetDateTime) -> String {
    if store.is_empty() {
        return "No tasks.\n".to_string();
    }
    let mut output = String::new();
    for task in store.iter() {
        let marker = if task.is_completed() { "[x]" } else { "[ ]" };
        let _ = writeln!(
            output,
            "{marker} {}  ({})",
            decode_entities(task.display_text()).trim_start(),
            describe_created(task.created(), now)
        );
    }
    output
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}
