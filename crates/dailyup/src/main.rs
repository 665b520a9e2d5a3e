//! DailyUp CLI - daily and weekly work reports.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dailyup_core::{
    parse_report_date, today, ExportFormat, ImportOutcome, Mood, Report, ReportDraft,
    ReportFilter, ReportKind, ReportService, ReportStore,
};
use dailyup_local::{LocalStore, DEFAULT_KEY};
use dailyup_remote::{RemoteConfig, RemoteStore, DEFAULT_TABLE, SCHEMA_SQL};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DAILYUP_DIR: &str = ".dailyup";

#[derive(Parser)]
#[command(name = "dailyup", about = "Daily and weekly work reports", version)]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// One JSON file in a .dailyup directory
    Local,
    /// A hosted PostgREST/Supabase table
    Remote,
}

#[derive(Args, Debug)]
struct BackendArgs {
    /// Where reports are stored
    #[arg(long, value_enum, env = "DAILYUP_BACKEND", default_value = "local", global = true)]
    backend: Backend,
    /// Local store directory (default: nearest .dailyup directory)
    #[arg(long, env = "DAILYUP_DIR", global = true)]
    dir: Option<PathBuf>,
    /// Storage key of the local collection
    #[arg(long, env = "DAILYUP_KEY", default_value = DEFAULT_KEY, global = true)]
    key: String,
    /// Project URL of the remote backend
    #[arg(long, env = "DAILYUP_REMOTE_URL", global = true)]
    remote_url: Option<String>,
    /// API key of the remote backend
    #[arg(long, env = "DAILYUP_REMOTE_KEY", hide_env_values = true, global = true)]
    remote_key: Option<String>,
    /// Table holding the reports
    #[arg(long, env = "DAILYUP_REMOTE_TABLE", default_value = DEFAULT_TABLE, global = true)]
    remote_table: String,
    /// Request timeout in seconds
    #[arg(long, env = "DAILYUP_REMOTE_TIMEOUT", default_value_t = 30, global = true)]
    remote_timeout: u64,
}

impl BackendArgs {
    fn remote_config(&self) -> Result<RemoteConfig> {
        let url = self
            .remote_url
            .clone()
            .context("The remote backend needs --remote-url or DAILYUP_REMOTE_URL")?;
        let api_key = self
            .remote_key
            .clone()
            .context("The remote backend needs --remote-key or DAILYUP_REMOTE_KEY")?;

        let config = RemoteConfig {
            table: self.remote_table.clone(),
            timeout: Duration::from_secs(self.remote_timeout),
            ..RemoteConfig::new(url, api_key)
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local report store in the current directory
    Init {
        /// Delete existing reports and reinitialize
        #[arg(long)]
        reinitialize: bool,
    },
    /// Write a new report
    Add {
        /// Report type
        #[arg(long = "type", default_value = "daily")]
        kind: ReportKind,
        /// Date the report is about (e.g. "2026-10-17", "yesterday")
        #[arg(long, default_value = "today")]
        date: String,
        /// Report title
        #[arg(long)]
        title: String,
        /// What you worked on (reads from stdin if not provided)
        #[arg(long)]
        content: Option<String>,
        /// Achievement; repeat for several
        #[arg(short = 'a', long = "achievement")]
        achievements: Vec<String>,
        /// Plan for the next day or week; repeat for several
        #[arg(short = 'p', long = "plan")]
        plans: Vec<String>,
        /// Problems you ran into
        #[arg(long)]
        issues: Option<String>,
        /// excellent, good, normal, bad or terrible
        #[arg(long)]
        mood: Option<Mood>,
    },
    /// Edit a report. Fields not given keep their current value
    Edit {
        /// Report ID
        id: String,
        /// New report type
        #[arg(long = "type")]
        kind: Option<ReportKind>,
        /// New date
        #[arg(long)]
        date: Option<String>,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New content (reads from stdin if not provided and stdin is not a tty)
        #[arg(long)]
        content: Option<String>,
        /// Replace achievements; repeat for several
        #[arg(short = 'a', long = "achievement")]
        achievements: Option<Vec<String>>,
        /// Replace plans; repeat for several
        #[arg(short = 'p', long = "plan")]
        plans: Option<Vec<String>>,
        /// New issues text ("" clears it)
        #[arg(long)]
        issues: Option<String>,
        /// New mood ("none" clears it)
        #[arg(long)]
        mood: Option<String>,
    },
    /// List reports
    Ls {
        /// Only show titles or content containing this text
        #[arg(long)]
        search: Option<String>,
        /// Only show reports of this type
        #[arg(long = "type")]
        kind: Option<ReportKind>,
        /// Number of reports to show (0 for all)
        #[arg(short = 'n', long, default_value = "50")]
        head: usize,
    },
    /// Show one or more reports
    Show {
        /// Comma-separated report IDs
        ids: String,
    },
    /// Delete one or more reports
    Rm {
        /// Comma-separated report IDs
        ids: String,
    },
    /// Export reports to a JSON or Markdown file
    Export {
        /// json or markdown
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Comma-separated report IDs (default: all reports)
        #[arg(long)]
        ids: Option<String>,
        /// Directory to write the file to
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Print to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,
    },
    /// Import reports from a JSON export, skipping ones already stored
    Import {
        /// JSON file to import ("-" for stdin)
        file: PathBuf,
    },
    /// Show statistics
    Stats,
    /// Print the SQL schema the remote backend expects
    Schema,
}

/// Find the .dailyup directory by searching up from current directory
fn find_dailyup_dir() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;
    loop {
        let candidate = current.join(DAILYUP_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Get the local store directory, or error if not initialized
fn get_dailyup_dir(args: &BackendArgs) -> Result<PathBuf> {
    if let Some(dir) = &args.dir {
        return Ok(dir.clone());
    }
    match find_dailyup_dir() {
        Some(dir) => Ok(dir),
        None => bail!("No .dailyup directory found. Run 'dailyup init' to start a report store."),
    }
}

fn parse_ids(ids: &str) -> Vec<String> {
    ids.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_date(input: &str) -> Result<String> {
    parse_report_date(input).ok_or_else(|| anyhow!("Invalid date: {}", input))
}

fn parse_mood_arg(input: &str) -> Result<Option<Mood>> {
    match input.trim().to_lowercase().as_str() {
        "" | "none" => Ok(None),
        other => Ok(Some(other.parse()?)),
    }
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read from stdin")?;
    Ok(buf)
}

fn is_stdin_tty() -> bool {
    atty::is(atty::Stream::Stdin)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn print_report(report: &Report) {
    println!("# {}\n", report.title);
    let mut meta = format!("{} | {}", report.kind, report.date);
    if let Some(mood) = report.mood {
        meta.push_str(&format!(" | {}", mood.label()));
    }
    println!("{}\n", meta);
    println!("{}", report.content);

    if !report.achievements.is_empty() {
        println!("\nAchievements:");
        for item in &report.achievements {
            println!("  - {}", item);
        }
    }
    if !report.plans.is_empty() {
        println!("\nPlans:");
        for item in &report.plans {
            println!("  - {}", item);
        }
    }
    if let Some(issues) = &report.issues {
        println!("\nIssues:\n  {}", issues);
    }

    println!("\n---\n");
    println!("ID: {}", report.id);
    if let Some(created_at) = &report.created_at {
        println!("Created: {}", created_at);
    }
}

fn describe_import(outcome: &ImportOutcome) -> String {
    if outcome.admitted > 0 {
        return format!(
            "Imported {} report(s) ({} already present, {} invalid)",
            outcome.admitted, outcome.duplicates, outcome.invalid
        );
    }
    match (outcome.duplicates, outcome.invalid) {
        (0, 0) => "Nothing to import: the file holds no reports".to_string(),
        (d, 0) => format!("Nothing imported: all {} report(s) already exist", d),
        (0, i) => format!("Nothing imported: all {} record(s) are malformed", i),
        (d, i) => format!(
            "Nothing imported: {} report(s) already exist, {} record(s) are malformed",
            d, i
        ),
    }
}

fn write_export(out: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create {}", out.display()))?;
    let path = out.join(file_name);
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { reinitialize } => return init(&cli.backend, reinitialize),
        Commands::Schema => {
            print!("{}", SCHEMA_SQL);
            return Ok(());
        }
        _ => {}
    }

    // Every other command needs a store; the backend is fixed here.
    match cli.backend.backend {
        Backend::Local => {
            let dir = get_dailyup_dir(&cli.backend)?;
            let store = LocalStore::open_with_key(&dir, &cli.backend.key)
                .context("Failed to open local report store")?;
            tracing::debug!(path = %store.path().display(), "using local backend");
            run(ReportService::new(store), cli.command).await
        }
        Backend::Remote => {
            let store = RemoteStore::new(cli.backend.remote_config()?)
                .context("Failed to set up remote report store")?;
            tracing::debug!(table = %store.config().table_url(), "using remote backend");
            run(ReportService::new(store), cli.command).await
        }
    }
}

fn init(args: &BackendArgs, reinitialize: bool) -> Result<()> {
    if args.backend == Backend::Remote {
        bail!("The remote backend needs no init; create its table with 'dailyup schema'.");
    }

    let dir = args.dir.clone().unwrap_or_else(|| PathBuf::from(DAILYUP_DIR));
    let store = LocalStore::open_with_key(&dir, &args.key).context("Failed to create store")?;

    if store.path().exists() {
        if !reinitialize {
            bail!("DailyUp is already initialized here. Use --reinitialize to delete and recreate.");
        }
        std::fs::remove_file(store.path()).context("Failed to remove existing reports")?;
        println!("Reinitialized report store in {}", dir.display());
    } else {
        println!("Initialized report store in {}", dir.display());
    }
    Ok(())
}

async fn run<S: ReportStore>(service: ReportService<S>, command: Commands) -> Result<()> {
    match command {
        Commands::Init { .. } | Commands::Schema => {
            bail!("This command does not use a report store")
        }

        Commands::Add {
            kind,
            date,
            title,
            content,
            achievements,
            plans,
            issues,
            mood,
        } => {
            let content = match content {
                Some(c) => c,
                None => read_stdin()?,
            };
            let draft = ReportDraft {
                kind,
                date: parse_date(&date)?,
                title,
                content,
                achievements,
                plans,
                issues,
                mood,
            };
            let report = service.create(draft).await?;
            println!("Added {} report {}", report.kind, report.id);
        }

        Commands::Edit {
            id,
            kind,
            date,
            title,
            content,
            achievements,
            plans,
            issues,
            mood,
        } => {
            let content = if content.is_none() && !is_stdin_tty() {
                Some(read_stdin()?)
            } else {
                content
            };

            let Some(existing) = service.get(&id).await? else {
                eprintln!("Report {} not found", id);
                std::process::exit(1);
            };

            let mut draft = existing.draft();
            if let Some(kind) = kind {
                draft.kind = kind;
            }
            if let Some(date) = date {
                draft.date = parse_date(&date)?;
            }
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(content) = content {
                draft.content = content;
            }
            if let Some(achievements) = achievements {
                draft.achievements = achievements;
            }
            if let Some(plans) = plans {
                draft.plans = plans;
            }
            if let Some(issues) = issues {
                draft.issues = Some(issues);
            }
            if let Some(mood) = mood {
                draft.mood = parse_mood_arg(&mood)?;
            }

            if draft == existing.draft() {
                eprintln!("Nothing to update");
                std::process::exit(1);
            }

            match service.update(&id, draft).await? {
                Some(report) => println!("Edited report {}", report.id),
                None => {
                    eprintln!("Report {} not found", id);
                    std::process::exit(1);
                }
            }
        }

        Commands::Ls { search, kind, head } => {
            let filter = ReportFilter { kind, search };
            let reports = service.list_filtered(&filter).await?;
            let total = reports.len();

            let shown = if head == 0 { total } else { head.min(total) };
            for report in reports.iter().take(shown) {
                let mood = report.mood.map(|m| format!(" {}", m.label())).unwrap_or_default();
                println!(
                    "{}: [{}] {} {}{} -- {}",
                    report.id,
                    report.kind,
                    report.date,
                    report.title,
                    mood,
                    report.preview(100)
                );
            }

            if shown < total {
                println!("[Showing the latest {}/{} reports]", shown, total);
            }
        }

        Commands::Show { ids } => {
            let ids = parse_ids(&ids);
            if ids.is_empty() {
                eprintln!("No report IDs provided");
                std::process::exit(1);
            }

            let reports = service.list().await?;
            let mut not_found = Vec::new();
            let mut first = true;

            for id in &ids {
                match reports.iter().find(|r| &r.id == id) {
                    Some(report) => {
                        if !first {
                            println!("\n{}\n", "=".repeat(40));
                        }
                        first = false;
                        print_report(report);
                    }
                    None => not_found.push(id),
                }
            }

            if !not_found.is_empty() {
                for id in &not_found {
                    eprintln!("Report {} not found", id);
                }
                std::process::exit(1);
            }
        }

        Commands::Rm { ids } => {
            let ids = parse_ids(&ids);
            if ids.is_empty() {
                eprintln!("No report IDs provided");
                std::process::exit(1);
            }

            let mut not_found = Vec::new();
            for id in &ids {
                if service.delete(id).await? {
                    println!("Deleted report {}", id);
                } else {
                    not_found.push(id);
                }
            }

            if !not_found.is_empty() {
                for id in &not_found {
                    eprintln!("Report {} not found", id);
                }
                std::process::exit(1);
            }
        }

        Commands::Export {
            format,
            ids,
            out,
            stdout,
        } => {
            let ids = ids.map(|s| parse_ids(&s));
            let now = chrono::Local::now().naive_local();
            let artifact = service.export(ids.as_deref(), format, now).await?;

            if stdout {
                print!("{}", artifact.contents);
            } else {
                let path = write_export(&out, &artifact.file_name, &artifact.contents)?;
                println!(
                    "Exported {} report(s) as {} to {}",
                    artifact.count,
                    artifact.format,
                    path.display()
                );
            }
        }

        Commands::Import { file } => {
            let payload = if file.as_os_str() == "-" {
                read_stdin()?
            } else {
                std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?
            };

            let outcome = service
                .import_json(&payload)
                .await
                .context("Import failed, make sure the file is a DailyUp JSON export")?;
            println!("{}", describe_import(&outcome));
        }

        Commands::Stats => {
            let summary = service.summary(today()).await?;

            println!("Reports:       {}", summary.total);
            println!("  daily:       {}", summary.daily);
            println!("  weekly:      {}", summary.weekly);
            println!("This week:     {}", summary.this_week);
            println!("This month:    {}", summary.this_month);
            println!("Achievements:  {}", summary.total_achievements);
            println!(
                "Per report:    {:.1} achievements, {:.1} plans",
                summary.avg_achievements, summary.avg_plans
            );
            println!("With issues:   {}", summary.with_issues);

            let scored: Vec<_> = summary.mood_trend.iter().filter(|p| p.score.is_some()).collect();
            if !scored.is_empty() {
                println!("\nMood, last {} days:", summary.mood_trend.len());
                for point in scored {
                    if let (Some(score), Some(mood)) = (point.score, point.mood()) {
                        let day = point.date.format("%m/%d");
                        println!("  {}  {:.1}  {}", day, score, mood.label());
                    }
                }
            }

            if !summary.recent_achievements.is_empty() {
                println!("\nRecent achievements:");
                for item in &summary.recent_achievements {
                    println!("  - {}", item);
                }
            }
        }
    }

    Ok(())
}
