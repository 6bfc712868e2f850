use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::Duration as StdDuration;

use anyhow::{Context, anyhow};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::{format_project_datetime, parse_date_expr};
use crate::engine::{Engine, Message};
use crate::render::{Renderer, short_id};
use crate::task::{Category, TaskDraft};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "list", "done", "edit", "delete", "snooze", "stats", "watch", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(engine, cfg, renderer, inv))]
pub fn dispatch(
    engine: &mut Engine,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "help" => return cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Reconciliation happens before every command touches the set; tasks
    // already past due dispatch their reminder here.
    engine.load(now).context("failed to load tasks")?;

    match command {
        "add" => cmd_add(engine, &inv.command_args, now),
        "list" => cmd_list(engine, renderer, &inv.command_args, now),
        "done" => cmd_done(engine, &inv.command_args, now),
        "edit" => cmd_edit(engine, &inv.command_args, now),
        "delete" => cmd_delete(engine, &inv.command_args),
        "snooze" => cmd_snooze(engine, cfg, &inv.command_args, now),
        "stats" => cmd_stats(engine, renderer, now),
        "watch" => cmd_watch(engine, cfg),
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(engine, args, now))]
fn cmd_add(
    engine: &mut Engine,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let mut text_parts: Vec<String> = Vec::new();
    let mut due = None;
    let mut category = Category::Personal;

    let mut literal = false;
    for arg in args {
        if !literal && arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(expr) = arg.strip_prefix("due:") {
            due = Some(parse_date_expr(expr, now)?);
            continue;
        }

        if !literal
            && let Some(token) = arg
                .strip_prefix("category:")
                .or_else(|| arg.strip_prefix("cat:"))
        {
            category = Category::parse(token)
                .ok_or_else(|| anyhow!("unknown category: {token} (work/personal/event/appointment)"))?;
            continue;
        }

        text_parts.push(arg.clone());
    }

    let due_at = due.ok_or_else(|| anyhow!("add requires due:<when>"))?;
    let draft = TaskDraft {
        text: text_parts.join(" "),
        category,
        due_at,
    };

    let task = engine.add(draft, now)?;
    println!(
        "Created task {} due {}.",
        short_id(&task),
        format_project_datetime(task.due_at)
    );
    Ok(())
}

#[instrument(skip(engine, renderer, args, now))]
fn cmd_list(
    engine: &mut Engine,
    renderer: &mut Renderer,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    let filter = match args.first() {
        Some(token) if token.eq_ignore_ascii_case("all") => None,
        Some(token) => Some(
            Category::parse(token)
                .ok_or_else(|| anyhow!("unknown category filter: {token}"))?,
        ),
        None => None,
    };

    let rows: Vec<_> = engine
        .tasks()
        .into_iter()
        .filter(|task| filter.is_none_or(|category| task.category == category))
        .collect();

    renderer.print_task_table(&rows, now)?;
    Ok(())
}

#[instrument(skip(engine, args, now))]
fn cmd_done(
    engine: &mut Engine,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command done");

    let prefix = args.first().ok_or_else(|| anyhow!("done requires a task id"))?;
    let Some(id) = resolve_id(engine, prefix)? else {
        println!("No matching task: {prefix}");
        return Ok(());
    };

    if engine.toggle_done(id, now)? {
        let done = engine.get(id).map(|task| task.done).unwrap_or(false);
        println!(
            "Task {} marked {}.",
            &prefix,
            if done { "done" } else { "pending" }
        );
    } else {
        println!("No matching task: {prefix}");
    }
    Ok(())
}

#[instrument(skip(engine, args, now))]
fn cmd_edit(
    engine: &mut Engine,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command edit");

    let (prefix, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("edit requires a task id and new text"))?;
    if rest.is_empty() {
        return Err(anyhow!("edit requires new text"));
    }

    let Some(id) = resolve_id(engine, prefix)? else {
        println!("No matching task: {prefix}");
        return Ok(());
    };

    if engine.edit(id, &rest.join(" "), now)? {
        println!("Modified task {prefix}.");
    } else {
        println!("No matching task: {prefix}");
    }
    Ok(())
}

#[instrument(skip(engine, args))]
fn cmd_delete(engine: &mut Engine, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let prefix = args
        .first()
        .ok_or_else(|| anyhow!("delete requires a task id"))?;
    let Some(id) = resolve_id(engine, prefix)? else {
        println!("No matching task: {prefix}");
        return Ok(());
    };

    if engine.remove(id)? {
        println!("Deleted task {prefix}.");
    } else {
        println!("No matching task: {prefix}");
    }
    Ok(())
}

#[instrument(skip(engine, cfg, args, now))]
fn cmd_snooze(
    engine: &mut Engine,
    cfg: &Config,
    args: &[String],
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command snooze");

    let prefix = args
        .first()
        .ok_or_else(|| anyhow!("snooze requires a task id"))?;
    let minutes = match args.get(1) {
        Some(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("invalid snooze minutes: {raw}"))?,
        None => cfg.snooze_default_minutes(),
    };

    let Some(id) = resolve_id(engine, prefix)? else {
        println!("No matching task: {prefix}");
        return Ok(());
    };

    if engine.snooze(id, minutes, now)? {
        let due = engine
            .get(id)
            .map(|task| format_project_datetime(task.due_at))
            .unwrap_or_default();
        println!("Snoozed task {prefix} by {minutes}m (now due {due}).");
    } else {
        println!("No matching task: {prefix}");
    }
    Ok(())
}

#[instrument(skip(engine, renderer, now))]
fn cmd_stats(
    engine: &mut Engine,
    renderer: &mut Renderer,
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command stats");

    let summary = engine.stats(now);
    renderer.print_stats(&summary)?;
    Ok(())
}

#[derive(Debug)]
enum WatchInput {
    Snooze {
        prefix: String,
        minutes: Option<i64>,
    },
    Quit,
}

/// Long-running foreground loop: sleeps until the next armed deadline,
/// pumps the engine, and feeds console snooze commands through the same
/// message channel a notification action handler would use.
#[instrument(skip(engine, cfg))]
fn cmd_watch(engine: &mut Engine, cfg: &Config) -> anyhow::Result<()> {
    info!("command watch");

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || read_watch_input(tx));

    println!("Watching reminders. Commands: snooze <id> [minutes], quit.");

    let mut stdin_open = true;
    loop {
        let now = Utc::now();
        let fired = engine.pump(now)?;
        for id in fired {
            match engine.get(id) {
                Some(task) => println!(
                    "Reminder: {} [{}] (snoozable as {})",
                    task.text,
                    task.category,
                    short_id(task)
                ),
                None => println!("Reminder fired and task completed."),
            }
        }

        let wait = engine
            .next_due()
            .map(|due| {
                (due - Utc::now())
                    .to_std()
                    .unwrap_or(StdDuration::ZERO)
                    .min(StdDuration::from_secs(30))
            })
            .unwrap_or(StdDuration::from_secs(30));

        if !stdin_open {
            std::thread::sleep(wait.max(StdDuration::from_millis(100)));
            continue;
        }

        match rx.recv_timeout(wait.max(StdDuration::from_millis(10))) {
            Ok(WatchInput::Quit) => break,
            Ok(WatchInput::Snooze { prefix, minutes }) => {
                // A console typo must not end the session.
                match resolve_id(engine, &prefix) {
                    Ok(Some(id)) => {
                        let minutes = minutes.unwrap_or_else(|| cfg.snooze_default_minutes());
                        engine.post(Message::Snooze { id, minutes });
                    }
                    Ok(None) => println!("No matching task: {prefix}"),
                    Err(err) => println!("{err}"),
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("watch input channel closed; timer-only mode");
                stdin_open = false;
            }
        }
    }

    Ok(())
}

fn read_watch_input(tx: Sender<WatchInput>) {
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let input = match tokens.as_slice() {
            ["quit"] | ["q"] => Some(WatchInput::Quit),
            ["snooze", prefix] => Some(WatchInput::Snooze {
                prefix: (*prefix).to_string(),
                minutes: None,
            }),
            ["snooze", prefix, minutes] => match minutes.parse::<i64>() {
                Ok(minutes) => Some(WatchInput::Snooze {
                    prefix: (*prefix).to_string(),
                    minutes: Some(minutes),
                }),
                Err(_) => {
                    warn!(minutes = %minutes, "unparsable snooze minutes ignored");
                    None
                }
            },
            [] => None,
            other => {
                warn!(?other, "unrecognized watch command ignored");
                None
            }
        };

        if let Some(input) = input {
            let quit = matches!(input, WatchInput::Quit);
            if tx.send(input).is_err() || quit {
                return;
            }
        }
    }
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Commands: add <text> due:<when> [category:<c>], list [category|all], \
         done <id>, edit <id> <text>, delete <id>, snooze <id> [minutes], \
         stats, watch"
    );
    Ok(())
}

/// Resolves a short id prefix against the current task set. Ambiguity is
/// an error; no match is `None` so callers can report it quietly.
fn resolve_id(engine: &Engine, prefix: &str) -> anyhow::Result<Option<Uuid>> {
    let needle = prefix.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Ok(None);
    }

    let mut matched = None;
    for task in engine.tasks() {
        if task.id.to_string().starts_with(&needle) {
            if matched.is_some() {
                return Err(anyhow!("ambiguous task id prefix: {prefix}"));
            }
            matched = Some(task.id);
        }
    }

    Ok(matched)
}
