//! tasknest task command implementations.

use serde::Serialize;

use crate::cli::{Context, TaskCommands, TaskFields};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::task::{SortKey, SortOrder, Task, TaskDescription};

#[derive(Serialize)]
struct TaskChangeOutput {
    id: u64,
    changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<Task>,
}

#[derive(Serialize)]
struct TaskListOutput {
    count: usize,
    search: String,
    sort_key: Option<SortKey>,
    sort_order: SortOrder,
    tasks: Vec<Task>,
}

pub(crate) fn run(ctx: Context, cmd: TaskCommands) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            title,
            id,
            user,
            fields,
        } => run_add(ctx, title, id, user, fields),
        TaskCommands::List {
            search,
            sort,
            desc,
            mine,
        } => run_list(ctx, search, sort, desc, mine),
        TaskCommands::Complete { id } => run_complete(ctx, id),
        TaskCommands::Delete { id } => run_delete(ctx, id),
        TaskCommands::Edit {
            id,
            title,
            user,
            reopen,
            fields,
        } => run_edit(ctx, id, title, user, reopen, fields),
    }
}

fn run_add(
    ctx: Context,
    title: String,
    id: Option<u64>,
    user: Option<u64>,
    fields: TaskFields,
) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidArgument("title cannot be empty".to_string()));
    }
    let user_id = match user.or_else(|| ctx.session.current_user().map(|u| u.id)) {
        Some(user_id) => user_id,
        None => {
            return Err(Error::InvalidArgument(
                "no signed-in user; pass --user or sign in first".to_string(),
            ))
        }
    };

    let id = id.unwrap_or_else(|| ctx.tasks.borrow().next_id());
    let mut task = Task::new(id, title, user_id);
    apply_fields(&mut task, fields);

    let mut human = HumanOutput::new("Task added");
    if ctx.tasks.borrow().get(id).is_some() {
        human.push_warning(format!("another task already uses id {id}"));
    }
    human.push_summary("ID", id.to_string());
    human.push_summary("Title", task.title.clone());
    human.push_summary("User", user_id.to_string());
    if !task.due_date.is_empty() {
        human.push_summary("Due", task.due_date.clone());
    }

    ctx.tasks.borrow_mut().add(task.clone());
    ctx.save_tasks()?;

    emit_success(
        ctx.output,
        "task add",
        &TaskChangeOutput {
            id,
            changed: true,
            task: Some(task),
        },
        Some(&human),
    )
}

fn run_list(
    ctx: Context,
    search: Option<String>,
    sort: Option<String>,
    desc: bool,
    mine: bool,
) -> Result<()> {
    let sort_key = sort.as_deref().map(str::parse::<SortKey>).transpose()?;
    let owner = if mine {
        Some(ctx.session.current_user().map(|user| user.id))
    } else {
        None
    };

    let (tasks, spec, query) = {
        let mut store = ctx.tasks.borrow_mut();
        if let Some(query) = search {
            store.set_search_query(query);
        }
        if let Some(key) = sort_key {
            let order = if desc {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            store.sort(key, order);
        }
        let tasks: Vec<Task> = store
            .filter_and_sort()
            .into_iter()
            .filter(|task| match owner {
                Some(Some(user_id)) => task.user_id == user_id,
                Some(None) => false,
                None => true,
            })
            .cloned()
            .collect();
        (tasks, store.sort_spec(), store.search_query().to_string())
    };
    ctx.save_tasks()?;

    let mut human = HumanOutput::new(format!("Tasks ({})", tasks.len()));
    if let Some(key) = spec.key {
        human.push_summary("Sort", format!("{key} {}", spec.order));
    }
    if !query.is_empty() {
        human.push_summary("Search", query.clone());
    }
    if matches!(owner, Some(None)) {
        human.push_warning("not signed in; --mine matches nothing");
    }
    for task in &tasks {
        human.push_detail(format_task_line(task));
    }
    if tasks.is_empty() && owner.is_none() && query.is_empty() {
        human.push_next_step("tasknest task add --title \"...\"");
    }

    emit_success(
        ctx.output,
        "task list",
        &TaskListOutput {
            count: tasks.len(),
            search: query,
            sort_key: spec.key,
            sort_order: spec.order,
            tasks,
        },
        Some(&human),
    )
}

fn run_complete(ctx: Context, id: u64) -> Result<()> {
    let changed = ctx.tasks.borrow_mut().mark_completed(id);
    if changed {
        ctx.save_tasks()?;
    }
    let task = ctx.tasks.borrow().get(id).cloned();
    emit_change(&ctx, "task complete", "Task completed", id, changed, task)
}

fn run_delete(ctx: Context, id: u64) -> Result<()> {
    let changed = ctx.tasks.borrow_mut().delete(id);
    if changed {
        ctx.save_tasks()?;
    }
    emit_change(&ctx, "task delete", "Task deleted", id, changed, None)
}

fn run_edit(
    ctx: Context,
    id: u64,
    title: Option<String>,
    user: Option<u64>,
    reopen: bool,
    fields: TaskFields,
) -> Result<()> {
    let existing = ctx.tasks.borrow().get(id).cloned();
    let Some(mut task) = existing else {
        return emit_change(&ctx, "task edit", "Task edited", id, false, None);
    };

    if let Some(title) = title {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidArgument("title cannot be empty".to_string()));
        }
        task.title = title.to_string();
    }
    if let Some(user_id) = user {
        task.user_id = user_id;
    }
    if reopen {
        task.is_completed = false;
    }
    apply_fields(&mut task, fields);

    let changed = ctx.tasks.borrow_mut().edit(task.clone());
    if changed {
        ctx.save_tasks()?;
    }
    emit_change(&ctx, "task edit", "Task edited", id, changed, Some(task))
}

fn emit_change(
    ctx: &Context,
    command: &str,
    header: &str,
    id: u64,
    changed: bool,
    task: Option<Task>,
) -> Result<()> {
    let mut human = HumanOutput::new(if changed { header } else { "No change" });
    human.push_summary("ID", id.to_string());
    if !changed {
        human.push_warning(format!("no task with id {id}"));
        human.push_next_step("tasknest task list");
    } else if let Some(task) = &task {
        human.push_detail(format_task_line(task));
    }

    emit_success(
        ctx.output,
        command,
        &TaskChangeOutput { id, changed, task },
        Some(&human),
    )
}

/// Flags left unset keep the task's current value
fn apply_fields(task: &mut Task, fields: TaskFields) {
    let TaskFields {
        description,
        duration,
        extra,
        due,
        priority,
        category,
        subtasks,
        recurring,
    } = fields;

    let TaskDescription {
        title: description_title,
        time_to_be_completed,
        extra_info_required,
    } = &mut task.description;
    if let Some(value) = description {
        *description_title = value;
    }
    if let Some(value) = duration {
        *time_to_be_completed = value;
    }
    if !extra.is_empty() {
        *extra_info_required = extra;
    }

    if let Some(value) = due {
        task.due_date = value;
    }
    if let Some(value) = priority {
        task.priority = value;
    }
    if let Some(value) = category {
        task.category = value;
    }
    if !subtasks.is_empty() {
        task.subtasks = subtasks;
    }
    if recurring {
        task.is_recurring = true;
    }
}

fn format_task_line(task: &Task) -> String {
    let mark = if task.is_completed { "x" } else { " " };
    let mut line = format!("[{mark}] #{} {}", task.id, task.title);

    let mut attrs = Vec::new();
    if !task.due_date.is_empty() {
        attrs.push(format!("due {}", task.due_date));
    }
    if !task.priority.is_empty() {
        attrs.push(task.priority.clone());
    }
    if !task.category.is_empty() {
        attrs.push(task.category.clone());
    }
    if task.is_recurring {
        attrs.push("recurring".to_string());
    }
    attrs.push(format!("user {}", task.user_id));
    line.push_str(&format!(" ({})", attrs.join(", ")));
    line
}
