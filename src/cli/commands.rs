use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::model::lead::{FollowUpMethod, LeadStatus};
use crate::model::task::TaskGroup;

#[derive(Parser)]
#[command(name = "lb", about = concat!("leadboard v", env!("CARGO_PKG_VERSION"), " - leads and tasks in one place"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new workspace in the current directory
    Init(InitArgs),
    /// Manage sales leads
    Lead(LeadCmd),
    /// Manage tasks on the board
    Task(TaskCmd),
    /// Show dashboard summaries
    Report(ReportArgs),
    /// Print the board summary whenever stored data changes
    Watch,
    /// View the recovery log
    Recovery(RecoveryCmd),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Workspace name (default: the directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Rewrite the config even if .leadboard/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Lead commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct LeadCmd {
    #[command(subcommand)]
    pub action: LeadAction,
}

#[derive(Subcommand)]
pub enum LeadAction {
    /// Add a lead to the top of the list
    Add(LeadAddArgs),
    /// List leads, newest first
    List(LeadListArgs),
    /// Show a lead with its comment history
    Show(LeadIdArg),
    /// Change fields on a lead
    Edit(LeadEditArgs),
    /// Log a follow-up comment on a lead
    Comment(LeadCommentArgs),
    /// Delete a lead
    Rm(LeadIdArg),
    /// Delete every lead
    Clear(ClearArgs),
    /// Search leads by regex
    Search(SearchArgs),
}

#[derive(Args)]
pub struct LeadIdArg {
    /// Lead ID
    pub id: String,
}

/// Editable lead fields shared by `add` and `edit`
#[derive(Args, Default)]
pub struct LeadFieldArgs {
    /// Contact person
    #[arg(long)]
    pub contact: Option<String>,
    /// Phone or email of the contact
    #[arg(long)]
    pub contact_info: Option<String>,
    /// Where the lead came from
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub industry: Option<String>,
    /// Date the lead came in (YYYY-MM-DD)
    #[arg(long)]
    pub lead_date: Option<NaiveDate>,
    /// Salesperson responsible
    #[arg(long)]
    pub assigned_to: Option<String>,
    /// Pipeline status (e.g. new, contacted, proposal, won)
    #[arg(long)]
    pub status: Option<LeadStatus>,
    /// Next follow-up date (YYYY-MM-DD)
    #[arg(long)]
    pub follow_up: Option<NaiveDate>,
    /// Follow-up method (call, email, meeting, whatsapp, other)
    #[arg(long)]
    pub method: Option<FollowUpMethod>,
    /// Date of last contact (YYYY-MM-DD)
    #[arg(long)]
    pub last_contact: Option<NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Potential deal value
    #[arg(long)]
    pub value: Option<String>,
    /// Win probability, 0-100
    #[arg(long)]
    pub probability: Option<String>,
    /// Expected close date (YYYY-MM-DD)
    #[arg(long)]
    pub close_date: Option<NaiveDate>,
    /// Final outcome
    #[arg(long)]
    pub outcome: Option<String>,
    #[arg(long)]
    pub remarks: Option<String>,
}

#[derive(Args)]
pub struct LeadAddArgs {
    /// Customer name
    pub customer: String,
    #[command(flatten)]
    pub fields: LeadFieldArgs,
}

#[derive(Args)]
pub struct LeadListArgs {
    /// Only leads with this status
    #[arg(long)]
    pub status: Option<LeadStatus>,
    /// Only leads assigned to this person
    #[arg(long)]
    pub assigned_to: Option<String>,
}

#[derive(Args)]
pub struct LeadEditArgs {
    /// Lead ID
    pub id: String,
    /// New customer name
    #[arg(long)]
    pub customer: Option<String>,
    #[command(flatten)]
    pub fields: LeadFieldArgs,
}

#[derive(Args)]
pub struct LeadCommentArgs {
    /// Lead ID
    pub id: String,
    /// Comment text
    pub text: String,
    /// How the contact happened
    #[arg(long, default_value = "call")]
    pub method: FollowUpMethod,
    /// Move the lead to this status
    #[arg(long)]
    pub status: Option<LeadStatus>,
    /// Set the lead's win probability
    #[arg(long)]
    pub probability: Option<String>,
}

#[derive(Args)]
pub struct ClearArgs {
    /// Required to confirm
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern to search for
    pub pattern: String,
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TaskCmd {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the top of To Do
    Add(TaskAddArgs),
    /// List tasks by group
    List(TaskListArgs),
    /// Show task details
    Show(TaskIdArg),
    /// Change fields on a task (it stays in its group)
    Edit(TaskEditArgs),
    /// Delete tasks from any group
    Rm(TaskRmArgs),
    /// Move a task to another group
    Mv(TaskMvArgs),
    /// Post a progress update for a user's task
    Update(TaskUpdateArgs),
    /// Search tasks by regex
    Search(SearchArgs),
}

#[derive(Args)]
pub struct TaskIdArg {
    /// Task ID
    pub id: u64,
}

#[derive(Args)]
pub struct TaskAddArgs {
    /// Task title
    pub title: String,
    /// Assignee
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub assign: Option<NaiveDate>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub expiry: Option<NaiveDate>,
    #[arg(long)]
    pub description: Option<String>,
    /// Assignee's email
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Args)]
pub struct TaskListArgs {
    /// Only this group (todo, inProgress, reviewReady, completed)
    #[arg(long)]
    pub group: Option<TaskGroup>,
    /// Only tasks assigned to this person
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Args)]
pub struct TaskEditArgs {
    /// Task ID
    pub id: u64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub assign: Option<NaiveDate>,
    #[arg(long)]
    pub expiry: Option<NaiveDate>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Args)]
pub struct TaskRmArgs {
    /// Task IDs to delete
    #[arg(required = true)]
    pub ids: Vec<u64>,
}

#[derive(Args)]
pub struct TaskMvArgs {
    /// Task ID
    pub id: u64,
    /// Destination group (todo, inProgress, reviewReady, completed)
    pub group: TaskGroup,
}

#[derive(Args)]
pub struct TaskUpdateArgs {
    /// Whose task the update is for
    pub user: String,
    /// What happened
    pub text: String,
    /// Task title (default: the user's newest task)
    #[arg(long)]
    pub task: Option<String>,
    /// Set the completion percentage instead of estimating it
    #[arg(long, allow_negative_numbers = true)]
    pub set: Option<i64>,
}

// ---------------------------------------------------------------------------
// Report / recovery
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ReportArgs {
    /// Summarize the lead pipeline instead of the task board
    #[arg(long)]
    pub leads: bool,
}

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Print the absolute path to the recovery log
    Path,
}
