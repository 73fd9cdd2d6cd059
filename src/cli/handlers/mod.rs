mod init;
pub use init::cmd_init;

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use regex::Regex;
use tracing_subscriber::EnvFilter;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, ConfigError};
use crate::io::recovery::{read_recovery_entries, recovery_log_path};
use crate::io::signal::ChangeEvent;
use crate::io::storage::DirStore;
use crate::io::watcher::StoreWatcher;
use crate::io::workspace::Workspace;
use crate::model::config::WorkspaceConfig;
use crate::model::lead::{LeadDraft, LeadStatus};
use crate::model::task::{TaskDraft, TaskGroup};
use crate::ops::lead_ops::{CommentInput, LeadPatch, previous_methods};
use crate::ops::report::{board_summary, due_charts, lead_summary};
use crate::ops::search;
use crate::ops::selection::SelectionMode;
use crate::ops::update::UpdateRequest;
use crate::ops::views::{date_bucket, gantt_bars, status_timeline};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Environment variable holding a tracing filter; overrides the config
pub const LOG_ENV: &str = "LEADBOARD_LOG";

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let start = resolve_dir(cli.dir.as_deref())?;

    match cli.command {
        // Init runs before any workspace exists
        Commands::Init(args) => {
            init_logging(None);
            cmd_init(args, &start)
        }
        Commands::Lead(cmd) => {
            let (_, _, mut ws) = open_workspace(&start)?;
            cmd_lead(cmd.action, &mut ws, json)
        }
        Commands::Task(cmd) => {
            let (_, _, mut ws) = open_workspace(&start)?;
            cmd_task(cmd.action, &mut ws, json)
        }
        Commands::Report(args) => {
            let (_, _, ws) = open_workspace(&start)?;
            cmd_report(args, &ws, json)
        }
        Commands::Watch => {
            let (root, config, ws) = open_workspace(&start)?;
            cmd_watch(&root, &config, ws)
        }
        Commands::Recovery(args) => {
            let (root, _) = load_config(&start)?;
            cmd_recovery(args, &root, json)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Install the stderr log subscriber. `LEADBOARD_LOG` wins over the
/// config's filter, which wins over `warn`.
pub fn init_logging(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_dir(dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match dir {
        Some(d) => Ok(std::fs::canonicalize(d)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", d, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

fn load_config(start: &Path) -> Result<(PathBuf, WorkspaceConfig), ConfigError> {
    let root = config_io::discover_workspace(start)?;
    let config = config_io::read_config(&config_io::store_dir(&root))?;
    Ok((root, config))
}

/// Find the workspace, set up logging from its config and load its stores
fn open_workspace(
    start: &Path,
) -> Result<(PathBuf, WorkspaceConfig, Workspace<DirStore>), Box<dyn std::error::Error>> {
    let (root, config) = load_config(start)?;
    init_logging(Some(&config.log.filter));
    let ws = Workspace::open(&root, &config);
    Ok((root, config, ws))
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Overlay every field given on the command line onto `draft`
fn apply_lead_fields(draft: &mut LeadDraft, fields: LeadFieldArgs) {
    let set = |slot: &mut String, value: Option<String>| {
        if let Some(v) = value {
            *slot = v;
        }
    };
    set(&mut draft.contact_person, fields.contact);
    set(&mut draft.contact_info, fields.contact_info);
    set(&mut draft.lead_source, fields.source);
    set(&mut draft.industry, fields.industry);
    set(&mut draft.lead_date, fields.lead_date.map(iso));
    set(&mut draft.assigned_to, fields.assigned_to);
    set(&mut draft.follow_up_date, fields.follow_up.map(iso));
    set(&mut draft.last_contact_date, fields.last_contact.map(iso));
    set(&mut draft.notes, fields.notes);
    set(&mut draft.potential_value, fields.value);
    set(&mut draft.probability, fields.probability);
    set(&mut draft.expected_close_date, fields.close_date.map(iso));
    set(&mut draft.final_outcome, fields.outcome);
    set(&mut draft.remarks, fields.remarks);
    if let Some(status) = fields.status {
        draft.status = status;
    }
    if let Some(method) = fields.method {
        draft.follow_up_method = Some(method);
    }
}

/// The inline quick edit, if only its fields were given
fn quick_patch(args: &LeadEditArgs) -> Option<LeadPatch> {
    let f = &args.fields;
    let other_fields = args.customer.is_some()
        || f.contact.is_some()
        || f.contact_info.is_some()
        || f.source.is_some()
        || f.industry.is_some()
        || f.lead_date.is_some()
        || f.last_contact.is_some()
        || f.notes.is_some()
        || f.value.is_some()
        || f.close_date.is_some()
        || f.outcome.is_some()
        || f.remarks.is_some();
    if other_fields {
        return None;
    }
    Some(LeadPatch {
        status: f.status,
        follow_up_date: f.follow_up.map(iso),
        follow_up_method: f.method,
        probability: f.probability.clone(),
        assigned_to: f.assigned_to.clone(),
    })
}

// ---------------------------------------------------------------------------
// Lead commands
// ---------------------------------------------------------------------------

fn cmd_lead(action: LeadAction, ws: &mut Workspace<DirStore>, json: bool) -> CmdResult {
    match action {
        LeadAction::Add(args) => {
            let mut draft = LeadDraft {
                customer_name: args.customer,
                ..Default::default()
            };
            apply_lead_fields(&mut draft, args.fields);
            let id = ws.create_lead(draft)?;
            if json {
                print_json(&serde_json::json!({ "id": id }))
            } else {
                println!("{}", id);
                Ok(())
            }
        }
        LeadAction::List(args) => {
            let leads: Vec<_> = ws
                .leads()
                .leads()
                .iter()
                .filter(|l| args.status.is_none_or(|s| l.status == s))
                .filter(|l| {
                    args.assigned_to
                        .as_deref()
                        .is_none_or(|a| l.assigned_to == a)
                })
                .collect();
            if json {
                return print_json(&leads);
            }
            for lead in leads {
                println!("{}", format_lead_line(lead));
            }
            Ok(())
        }
        LeadAction::Show(args) => {
            let lead = ws
                .leads()
                .get(&args.id)
                .ok_or_else(|| format!("lead not found: {}", args.id))?;
            if json {
                return print_json(lead);
            }
            let methods: Vec<String> = previous_methods(lead)
                .into_iter()
                .map(|m| m.label().to_string())
                .collect();
            for line in format_lead_detail(lead, &methods) {
                println!("{}", line);
            }
            Ok(())
        }
        LeadAction::Edit(args) => {
            let found = match quick_patch(&args) {
                Some(patch) if !patch.is_empty() => ws.patch_lead(&args.id, patch)?,
                Some(_) => return Err("nothing to change".into()),
                None => {
                    let mut draft = ws
                        .leads()
                        .get(&args.id)
                        .map(|l| l.to_draft())
                        .ok_or_else(|| format!("lead not found: {}", args.id))?;
                    if let Some(name) = args.customer {
                        draft.customer_name = name;
                    }
                    apply_lead_fields(&mut draft, args.fields);
                    ws.update_lead(&args.id, draft)?
                }
            };
            if !found {
                return Err(format!("lead not found: {}", args.id).into());
            }
            println!("updated {}", args.id);
            Ok(())
        }
        LeadAction::Comment(args) => {
            let input = CommentInput {
                text: args.text,
                method: args.method,
                new_status: args.status,
                new_probability: args.probability,
            };
            if !ws.comment_lead(&args.id, input)? {
                return Err(format!("lead not found: {}", args.id).into());
            }
            println!("comment added to {}", args.id);
            Ok(())
        }
        LeadAction::Rm(args) => {
            let lead = ws
                .delete_lead(&args.id)
                .ok_or_else(|| format!("lead not found: {}", args.id))?;
            println!("deleted {} ({})", lead.id, lead.customer_name);
            Ok(())
        }
        LeadAction::Clear(args) => {
            if !args.yes {
                return Err("refusing to delete all leads without --yes".into());
            }
            let removed = ws.delete_all_leads();
            println!("{} lead(s) deleted", removed.len());
            Ok(())
        }
        LeadAction::Search(args) => {
            let re = Regex::new(&args.pattern)?;
            let hits = search::search_leads(ws.leads().leads(), &re);
            if json {
                let out: Vec<SearchHitJson> = hits.iter().map(lead_hit_to_json).collect();
                return print_json(&out);
            }
            // One line per lead, however many fields matched
            let mut seen = HashSet::new();
            for hit in &hits {
                if seen.insert(hit.lead_id.as_str())
                    && let Some(lead) = ws.leads().get(&hit.lead_id)
                {
                    println!("{}  (in {})", format_lead_line(lead), hit.field.label());
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

fn cmd_task(action: TaskAction, ws: &mut Workspace<DirStore>, json: bool) -> CmdResult {
    match action {
        TaskAction::Add(args) => {
            let draft = TaskDraft {
                title: args.title,
                user_name: args.user.unwrap_or_default(),
                category: args.category.unwrap_or_default(),
                assign_date: args.assign,
                expiry_date: args.expiry,
                description: args.description.unwrap_or_default(),
                email: args.email,
            };
            let id = ws.create_task(draft)?;
            if json {
                print_json(&serde_json::json!({ "id": id }))
            } else {
                println!("{}", id);
                Ok(())
            }
        }
        TaskAction::List(args) => {
            let board = ws.tasks().board();
            let groups: Vec<TaskGroup> = match args.group {
                Some(g) => vec![g],
                None => TaskGroup::ALL.to_vec(),
            };
            let user_ok = |name: &str| args.user.as_deref().is_none_or(|u| name == u);
            if json {
                let out: Vec<TaskJson> = groups
                    .iter()
                    .flat_map(|g| board.group(*g).iter().map(move |t| (*g, t)))
                    .filter(|(_, t)| user_ok(&t.user_name))
                    .map(|(g, t)| task_to_json(g, t))
                    .collect();
                return print_json(&out);
            }
            for (i, group) in groups.iter().enumerate() {
                let tasks: Vec<_> = board
                    .group(*group)
                    .iter()
                    .filter(|t| user_ok(&t.user_name))
                    .collect();
                if i > 0 {
                    println!();
                }
                println!("{}", format_group_header(*group, tasks.len()));
                for task in tasks {
                    println!("{}", format_task_line(task));
                }
            }
            Ok(())
        }
        TaskAction::Show(args) => {
            let (group, task) = ws
                .tasks()
                .get(args.id)
                .ok_or_else(|| format!("task not found: {}", args.id))?;
            if json {
                return print_json(&task_to_json(group, task));
            }
            for line in format_task_detail(group, task, today()) {
                println!("{}", line);
            }
            Ok(())
        }
        TaskAction::Edit(args) => {
            let mut draft = ws
                .tasks()
                .get(args.id)
                .map(|(_, t)| t.to_draft())
                .ok_or_else(|| format!("task not found: {}", args.id))?;
            if let Some(v) = args.title {
                draft.title = v;
            }
            if let Some(v) = args.user {
                draft.user_name = v;
            }
            if let Some(v) = args.category {
                draft.category = v;
            }
            if let Some(v) = args.description {
                draft.description = v;
            }
            if args.assign.is_some() {
                draft.assign_date = args.assign;
            }
            if args.expiry.is_some() {
                draft.expiry_date = args.expiry;
            }
            if args.email.is_some() {
                draft.email = args.email;
            }
            if !ws.update_task(args.id, draft)? {
                return Err(format!("task not found: {}", args.id).into());
            }
            println!("updated {}", args.id);
            Ok(())
        }
        TaskAction::Rm(args) => {
            let mut mode = SelectionMode::default();
            mode.begin_remove();
            let wanted: BTreeSet<u64> = args.ids.into_iter().collect();
            for id in wanted {
                if ws.tasks().get(id).is_none() {
                    eprintln!("warning: no task {}", id);
                    continue;
                }
                mode.click(id);
            }
            let Some(ids) = mode.confirm() else {
                mode.cancel();
                return Err("no matching tasks selected".into());
            };
            let removed = ws.delete_tasks(&ids);
            println!("{} task(s) deleted successfully", removed);
            Ok(())
        }
        TaskAction::Mv(args) => {
            ws.relocate_task(args.id, args.group)?;
            println!("moved {} to {}", args.id, args.group.title());
            Ok(())
        }
        TaskAction::Update(args) => {
            let request = UpdateRequest {
                user: args.user,
                task_name: args.task,
                text: args.text,
                manual_completion: args.set,
            };
            let outcome = ws.submit_update(&request)?;
            if json {
                return print_json(&outcome_to_json(&outcome));
            }
            let title = ws
                .tasks()
                .get(outcome.task_id)
                .map(|(_, t)| t.title.clone())
                .unwrap_or_default();
            println!("{}", format_update_outcome(&title, &outcome));
            Ok(())
        }
        TaskAction::Search(args) => {
            let re = Regex::new(&args.pattern)?;
            let hits = search::search_tasks(ws.tasks().board(), &re);
            if json {
                let out: Vec<SearchHitJson> = hits.iter().map(task_hit_to_json).collect();
                return print_json(&out);
            }
            let mut seen = HashSet::new();
            for hit in &hits {
                if seen.insert(hit.task_id)
                    && let Some((_, task)) = ws.tasks().get(hit.task_id)
                {
                    println!(
                        "[{}] {}  (in {})",
                        hit.group,
                        format_task_line(task),
                        hit.field.label()
                    );
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Report / watch / recovery
// ---------------------------------------------------------------------------

fn cmd_report(args: ReportArgs, ws: &Workspace<DirStore>, json: bool) -> CmdResult {
    if args.leads {
        let leads = ws.leads().leads();
        let summary = lead_summary(leads);
        let follow_ups: Vec<(String, usize)> = date_bucket(leads, |l| Some(l.follow_up_date.clone()))
            .into_iter()
            .collect();
        let timeline = status_timeline(
            leads,
            &LeadStatus::ALL,
            |l| l.status,
            |l| Some(l.lead_date.clone()),
        );
        if json {
            return print_json(&lead_summary_to_json(&summary, &follow_ups, &timeline));
        }
        for line in format_lead_summary(&summary, &follow_ups, &timeline) {
            println!("{}", line);
        }
        return Ok(());
    }

    let board = ws.tasks().board();
    let summary = board_summary(board);
    let bars = gantt_bars(board);
    let charts = due_charts(board);
    if json {
        return print_json(&board_summary_to_json(&summary, &bars, &charts));
    }
    for line in format_board_summary(&summary, &bars, &charts) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_watch(root: &Path, config: &WorkspaceConfig, mut ws: Workspace<DirStore>) -> CmdResult {
    let watcher = StoreWatcher::start(&config_io::store_dir(root), &config.storage)?;
    let print_summary = |ws: &Workspace<DirStore>| {
        let summary = board_summary(ws.tasks().board());
        println!(
            "{} tasks ({}% done), {} leads",
            summary.total,
            summary.completed_percent,
            ws.leads().len()
        );
    };
    print_summary(&ws);
    loop {
        std::thread::sleep(Duration::from_millis(250));
        let events = watcher.poll();
        if events.is_empty() {
            continue;
        }
        if events.contains(&ChangeEvent::TasksChanged) {
            ws.reload_tasks();
        }
        if events.contains(&ChangeEvent::LeadsChanged) {
            ws.reload_leads();
        }
        print_summary(&ws);
    }
}

fn cmd_recovery(args: RecoveryCmd, root: &Path, json: bool) -> CmdResult {
    let dir = config_io::store_dir(root);
    if let Some(RecoveryAction::Path) = args.action {
        println!("{}", recovery_log_path(&dir).display());
        return Ok(());
    }
    let entries = read_recovery_entries(&dir, Some(args.limit.unwrap_or(10)));
    if json {
        let out: Vec<RecoveryEntryJson> = entries.iter().map(recovery_to_json).collect();
        return print_json(&out);
    }
    if entries.is_empty() {
        println!("recovery log is empty");
        return Ok(());
    }
    for entry in &entries {
        for line in format_recovery_entry(entry) {
            println!("{}", line);
        }
    }
    Ok(())
}
