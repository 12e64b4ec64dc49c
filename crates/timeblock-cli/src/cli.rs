use clap::{Parser, Subcommand, ValueEnum};
use timeblock_core::analytics::ReportMode;
use timeblock_core::models::TaskPriority;

/// Plan time blocks, track how they actually went, and review the trend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Plan a new block, optionally repeating
    Add(AddCommand),
    /// Start working on a planned block
    Start(StatusCommand),
    /// Mark a block as completed
    Done(StatusCommand),
    /// Skip a planned block
    Skip(StatusCommand),
    /// Record mood and value for a completed block
    Reflect(ReflectCommand),
    /// Edit a single block
    Edit(EditCommand),
    /// Show the blocks of one day side by side
    Day(DayCommand),
    /// List the blocks of a week, Monday to Sunday
    Week(WeekCommand),
    /// List the blocks of a calendar month
    Month(MonthCommand),
    /// Trend, category performance and focus balance
    Insights(InsightsCommand),
    /// Manage categories
    Category(CategoryCommand),
    /// Manage saved recurrence rules
    Template(TemplateCommand),
}

/// Repeat frequency for `--every`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the block
    pub title: String,
    /// Start time (e.g. '2024-03-04T09:00', 'tomorrow 9am')
    #[clap(short, long)]
    pub start: String,
    /// End time
    #[clap(short, long, conflicts_with = "duration", required_unless_present = "duration")]
    pub end: Option<String>,
    /// Length instead of an end time (e.g. '45m', '1h30m')
    #[clap(short, long)]
    pub duration: Option<String>,
    /// Category name; the default category is used when omitted
    #[clap(short, long)]
    pub category: Option<String>,
    /// low, medium or high
    #[clap(long)]
    pub priority: Option<TaskPriority>,
    /// Repeat frequency
    #[clap(long, value_enum, conflicts_with = "template")]
    pub every: Option<Frequency>,
    /// Repeat every N days or weeks
    #[clap(long, conflicts_with = "template")]
    pub interval: Option<i32>,
    /// Weekdays for weekly blocks (mon,tue,wed,thu,fri,sat,sun)
    #[clap(long, conflicts_with = "template")]
    pub on: Option<String>,
    /// Last day a repeat may start on
    #[clap(long, conflicts_with = "template")]
    pub until: Option<String>,
    /// Use a saved recurrence rule instead of the repeat flags
    #[clap(long, conflicts_with_all = ["every", "interval", "on", "until"])]
    pub template: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct StatusCommand {
    /// The ID (or unique prefix) of the block
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ReflectCommand {
    /// The ID (or unique prefix) of the block
    pub id: String,
    /// How it felt
    #[clap(long)]
    pub mood: Option<String>,
    /// What it was worth
    #[clap(long)]
    pub value: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID (or unique prefix) of the block
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DayCommand {
    /// Day to show (today, tomorrow, 2024-03-04, ...)
    #[clap(default_value = "today")]
    pub date: String,
}

#[derive(Parser, Debug, Clone)]
pub struct WeekCommand {
    /// Any day inside the week to show
    #[clap(default_value = "today")]
    pub date: String,
}

#[derive(Parser, Debug, Clone)]
pub struct MonthCommand {
    /// Month as YYYY-MM, the current month when omitted
    pub month: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct InsightsCommand {
    /// Report window: month, year or all
    #[clap(short, long, default_value_t = ReportMode::Month)]
    pub mode: ReportMode,
    /// Show completed blocks per month and which months can be exported
    #[clap(long)]
    pub monthly: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CategoryCommand {
    #[command(subcommand)]
    pub command: CategorySubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategorySubcommand {
    /// Add a new category
    Add(AddCategoryCommand),
    /// List categories
    List,
}

#[derive(Parser, Debug, Clone)]
pub struct AddCategoryCommand {
    /// The name of the category
    pub name: String,
    /// Hex display color
    #[arg(long, default_value = "#6366f1")]
    pub color: String,
}

#[derive(Parser, Debug, Clone)]
pub struct TemplateCommand {
    #[command(subcommand)]
    pub command: TemplateSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TemplateSubcommand {
    /// Save a recurrence rule under a name
    Add(AddTemplateCommand),
    /// List saved rules
    List,
}

#[derive(Parser, Debug, Clone)]
pub struct AddTemplateCommand {
    /// The name of the template
    pub name: String,
    #[arg(long, value_enum)]
    pub every: Option<Frequency>,
    #[arg(long)]
    pub interval: Option<i32>,
    #[arg(long)]
    pub on: Option<String>,
    #[arg(long)]
    pub until: Option<String>,
}
