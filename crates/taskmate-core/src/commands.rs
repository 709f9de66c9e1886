use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail};
use tracing::{debug, info};

use crate::capabilities::{Clock, IdGenerator};
use crate::cli::Command;
use crate::render::Renderer;
use crate::session::{NoticeKind, Session};
use crate::storage::Storage;

/// Runs one CLI command against an opened session, then reports queued
/// notices. Notices that mean the command did not happen become the error.
#[tracing::instrument(skip(session, renderer, confirm))]
pub fn dispatch<S, C, G>(
    session: &mut Session<S, C, G>,
    renderer: &Renderer,
    command: Command,
    confirm: &mut dyn FnMut(&str) -> anyhow::Result<bool>,
) -> anyhow::Result<()>
where
    S: Storage,
    C: Clock,
    G: IdGenerator,
{
    if command.mutates()
        && let Some(notice) = session
            .notices()
            .iter()
            .find(|notice| notice.kind == NoticeKind::StorageRead)
    {
        bail!(
            "refusing to modify tasks: {}; fix or move the stored file first",
            notice.message
        );
    }

    match command {
        Command::Add {
            name,
            deadline,
            description,
            priority,
        } => {
            let draft = session.draft_mut();
            draft.name = name;
            draft.description = description;
            draft.deadline = deadline.unwrap_or_default();
            draft.priority = priority;
            if let Some(task) = session.submit() {
                renderer.print_task_added(&task)?;
            }
        }
        Command::List { filter, sort } => {
            if let Some(filter) = filter {
                session.set_filter(filter);
            }
            if let Some(sort) = sort {
                session.set_sort(sort);
            }
            debug!(filter = %session.filter(), sort = %session.sort(), "listing");
            renderer.print_task_table(&session.visible())?;
        }
        Command::Toggle { id } => {
            let id = resolve_id(session, &id)?;
            session.toggle(&id);
        }
        Command::Delete { id, yes } => {
            let id = resolve_id(session, &id)?;
            let Some(task) = session.request_delete(&id) else {
                bail!("no task with id {id}");
            };
            let prompt = format!("Delete task \"{}\"?", task.name);
            if yes || confirm(&prompt)? {
                session.confirm_delete();
            } else {
                session.cancel_delete();
                info!("delete cancelled by user");
            }
        }
        Command::Stats => {
            renderer.print_counts(session.counts())?;
        }
    }

    let mut blocking = None;
    for notice in session.take_notices() {
        match notice.kind {
            NoticeKind::Validation | NoticeKind::Failure if blocking.is_none() => {
                blocking = Some(notice.message);
            }
            _ => renderer.print_notice(&notice)?,
        }
    }
    match blocking {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

/// Expands a unique id prefix to the full task id.
pub fn resolve_id<S, C, G>(session: &Session<S, C, G>, prefix: &str) -> anyhow::Result<String>
where
    S: Storage,
    C: Clock,
    G: IdGenerator,
{
    let prefix = prefix.trim();
    if prefix.is_empty() {
        bail!("task id cannot be empty");
    }
    if let Some(task) = session.store().get(prefix) {
        return Ok(task.id.clone());
    }

    let matches: Vec<&str> = session
        .store()
        .tasks()
        .iter()
        .filter(|task| task.id.starts_with(prefix))
        .map(|task| task.id.as_str())
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("no task with id {prefix}")),
        [one] => Ok((*one).to_string()),
        many => Err(anyhow!(
            "id prefix {prefix} is ambiguous ({} tasks match)",
            many.len()
        )),
    }
}

/// Asks on stdin; anything but y/yes is a no.
pub fn prompt_yes_no(prompt: &str) -> anyhow::Result<bool> {
    let mut out = io::stdout().lock();
    write!(out, "{prompt} [y/N] ")?;
    out.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
