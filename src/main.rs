//! # orgbot CLI
//!
//! Command-line access to the organisation assistants.
//!
//! - `crawl`: crawl an organisation website into the content cache
//! - `ask`: answer a single question
//! - `chat`: interactive conversation with an assistant
//! - `search`: rank cached pages for a query
//! - `interview`: run a timed interview and write a report
//! - `archive`: store the saved session history in the database

mod telemetry;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use orgbot::bots::interview::{self, InterviewLevel, InterviewSession};
use orgbot::bots::{BotKind, OrgAssistant, SpiritualBot};
use orgbot::config::{PolishMode, Settings};
use orgbot::crawler::storage::Storage;
use orgbot::crawler::{Crawler, CrawlerConfig};
use orgbot::db::Database;
use orgbot::history::HistoryStore;
use orgbot::llm::{FallbackChain, SharedCompletion};
use orgbot::matcher::{Bm25Matcher, ContentMatcher, KeywordMatcher, MatchStrategy};
use telemetry::LogTargets;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{instrument, warn};

/// How long the interview waits for an answer before reminding the candidate
const ANSWER_REMINDER: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(author, version, about = "Organisation chat assistants", long_about = None)]
struct Cli {
    /// Data directory (overrides ORGBOT_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl a website into the content cache
    Crawl(CrawlArgs),

    /// Ask an assistant a single question
    Ask(AskArgs),

    /// Start an interactive chat session with an assistant
    Chat(ChatArgs),

    /// Rank cached pages of a website for a query
    Search(SearchArgs),

    /// Run a timed interview
    Interview(InterviewArgs),

    /// Store the saved session history in the database
    Archive(ArchiveArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// URL to crawl
    #[arg(required = true)]
    url: String,

    /// Crawl depth
    #[arg(short, long, default_value = "2")]
    depth: u32,

    /// Rate limit in milliseconds
    #[arg(short, long, default_value = "1000")]
    rate: u64,

    /// Maximum number of pages to crawl
    #[arg(short = 'p', long, default_value = "50")]
    max_pages: u32,

    /// Reuse cached content younger than this many hours
    #[arg(long, default_value = "24")]
    max_age_hours: u64,

    /// Ignore the cache and crawl again
    #[arg(short, long)]
    force: bool,

    /// Skip pages already stored in the database
    #[arg(long)]
    skip_archived: bool,

    /// Also store pages in the database
    #[arg(short, long)]
    archive: bool,

    /// Write a JSON-lines site guide to this file
    #[arg(short, long)]
    guide: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AskArgs {
    /// Assistant to ask
    #[arg(value_enum)]
    bot: BotKind,

    /// Question text
    #[arg(required = true)]
    question: Vec<String>,

    /// User name recorded with the session
    #[arg(short, long)]
    user: Option<String>,

    /// Content matching strategy
    #[arg(short, long, value_enum)]
    strategy: Option<MatchStrategy>,

    /// Reply polishing mode (overrides ORGBOT_POLISH)
    #[arg(long, value_enum)]
    polish: Option<PolishMode>,
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// Assistant to talk to
    #[arg(value_enum)]
    bot: BotKind,

    /// User name recorded with the session
    #[arg(short, long)]
    user: Option<String>,

    /// Content matching strategy
    #[arg(short, long, value_enum)]
    strategy: Option<MatchStrategy>,

    /// Reply polishing mode (overrides ORGBOT_POLISH)
    #[arg(long, value_enum)]
    polish: Option<PolishMode>,

    /// Store the session in the database when the chat ends
    #[arg(short, long)]
    archive: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Website whose cached content is searched
    #[arg(required = true)]
    url: String,

    /// Search query
    #[arg(required = true)]
    query: String,

    /// Scoring strategy
    #[arg(short, long, value_enum, default_value_t = MatchStrategy::Bm25)]
    strategy: MatchStrategy,

    /// Limit results
    #[arg(short, long, default_value = "5")]
    limit: usize,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct InterviewArgs {
    /// Interview level
    #[arg(short, long, value_enum, default_value_t = InterviewLevel::Easy)]
    level: InterviewLevel,

    /// Job description text file
    #[arg(short, long)]
    job: Option<PathBuf>,

    /// Resume text file
    #[arg(short, long)]
    resume: Option<PathBuf>,

    /// Where to write the Markdown report
    #[arg(long, default_value = "reports/interview_report.md")]
    report: PathBuf,
}

#[derive(Args, Debug)]
struct ArchiveArgs {
    /// Assistant whose history is archived
    #[arg(value_enum)]
    bot: BotKind,

    /// User name recorded with the session
    #[arg(short, long)]
    user: Option<String>,

    /// Clear the history file afterwards
    #[arg(short, long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    let log_path = settings.log_path();
    let interactive = matches!(
        cli.command,
        Some(Commands::Chat(_)) | Some(Commands::Interview(_))
    );
    let targets = if interactive {
        LogTargets {
            console: false,
            file: Some(log_path.as_path()),
        }
    } else {
        LogTargets {
            console: true,
            file: None,
        }
    };
    let _otel = telemetry::init_tracing_subscriber(targets)?;

    match cli.command {
        Some(Commands::Crawl(args)) => crawl_command(args, &settings).await?,
        Some(Commands::Ask(args)) => ask_command(args, settings).await?,
        Some(Commands::Chat(args)) => chat_command(args, settings).await?,
        Some(Commands::Search(args)) => search_command(args, &settings).await?,
        Some(Commands::Interview(args)) => interview_command(args, &settings).await?,
        Some(Commands::Archive(args)) => archive_command(args, &settings).await?,
        None => Cli::command().print_help()?,
    }

    Ok(())
}

fn print_colored(label: &str, color: Color, text: &str) -> anyhow::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(stdout, "{}", label)?;
    stdout.reset()?;
    writeln!(stdout, " {}", text)?;
    Ok(())
}

/// Wait for the progress reporter, logging instead of failing if it died
async fn finish_progress(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Progress reporter failed: {}", e);
            false
        }
    }
}

fn stdin_lines() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

async fn database(settings: &Settings) -> anyhow::Result<Database> {
    let path = settings.database_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let path = path
        .to_str()
        .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {}", path.display()))?;
    Ok(Database::open(path).await?)
}

fn completion_backends(settings: &Settings) -> anyhow::Result<SharedCompletion> {
    let chain = FallbackChain::from_settings(settings)?;
    if chain.is_empty() {
        bail!("No LLM configured; set GEMINI_API_KEY or MISTRAL_API_KEYS");
    }
    Ok(Arc::new(chain))
}

async fn org_assistant(
    kind: BotKind,
    strategy: Option<MatchStrategy>,
    polish: Option<PolishMode>,
    mut settings: Settings,
) -> anyhow::Result<OrgAssistant> {
    let profile = kind
        .profile()
        .ok_or_else(|| anyhow!("{} is not an organisation assistant", kind))?;
    if let Some(polish) = polish {
        settings.polish = polish;
    }
    if let Some(strategy) = strategy {
        settings.matcher = strategy;
    }
    Ok(OrgAssistant::from_settings(profile, &settings).await?)
}

#[instrument(skip(settings))]
async fn crawl_command(args: CrawlArgs, settings: &Settings) -> anyhow::Result<()> {
    println!("Crawling {}...", args.url);

    let config = CrawlerConfig::builder()
        .max_depth(args.depth)
        .max_pages(args.max_pages)
        .rate_limit_ms(args.rate)
        .user_agent(format!("orgbot/{}", env!("CARGO_PKG_VERSION")))
        .build();

    let db = if args.archive || args.skip_archived {
        Some(database(settings).await?)
    } else {
        None
    };

    let (progress_sender, mut progress_receiver) = mpsc::channel(100);
    let mut crawler = Crawler::new(config)?.with_progress(progress_sender);
    if let (true, Some(db)) = (args.skip_archived, &db) {
        let stored = db.pages_for_base(&args.url).await?;
        crawler = crawler.with_known_urls(stored.into_iter().map(|p| p.url));
    }

    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner} {pos} pages {msg}")?,
    );
    progress_bar.enable_steady_tick(Duration::from_millis(120));

    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while let Some(event) = progress_receiver.recv().await {
                progress_bar.set_position(event.pages_crawled as u64);
                progress_bar.set_message(format!("({} queued) {}", event.queued, event.url));
            }
            progress_bar.finish_with_message("done");
        }
    });

    let storage = Storage::new(settings.crawl_dir());
    let max_age = Duration::from_secs(args.max_age_hours * 3600);
    let index = if args.force {
        let pages = crawler.crawl(&args.url).await?;
        let index = orgbot::crawler::storage::SiteIndex::new(args.url.clone(), pages);
        storage.save(&index).await?;
        index
    } else {
        storage.load_or_crawl(&args.url, &crawler, max_age).await?
    };

    drop(crawler);
    finish_progress(progress_handle).await;

    let priority = index.iter().filter(|p| p.is_priority).count();
    print_colored(
        "Crawled",
        Color::Green,
        &format!(
            "{} pages ({} priority) saved to {}",
            index.len(),
            priority,
            storage.path_for(&args.url)?.display()
        ),
    )?;

    if let Some(db) = &db {
        if args.archive {
            for page in index.iter() {
                db.save_page(page, &args.url).await?;
            }
            println!(
                "Archived pages; {} stored for {}",
                db.count_pages(&args.url).await?,
                args.url
            );
        }
    }

    if let Some(guide) = args.guide {
        let written = storage.export_guide(&index, &guide).await?;
        println!("Wrote {} guide entries to {}", written, guide.display());
    }

    Ok(())
}

#[instrument(skip(settings))]
async fn ask_command(args: AskArgs, settings: Settings) -> anyhow::Result<()> {
    let question = args.question.join(" ");

    match args.bot {
        BotKind::Nirankari => {
            let bot = SpiritualBot::new();
            println!("{}", bot.respond(&question, args.user.as_deref()));
        }
        BotKind::Interview => bail!("Use the `interview` command for interviews"),
        kind => {
            let assistant = org_assistant(kind, args.strategy, args.polish, settings).await?;
            let reply = assistant.respond(&question, args.user.as_deref()).await?;
            println!("{}", reply.text);
        }
    }
    Ok(())
}

#[instrument(skip(settings))]
async fn chat_command(args: ChatArgs, settings: Settings) -> anyhow::Result<()> {
    let mut lines = stdin_lines();
    let user = args.user.as_deref();

    match args.bot {
        BotKind::Interview => bail!("Use the `interview` command for interviews"),
        BotKind::Nirankari => {
            let bot = SpiritualBot::new();
            print_colored("Type `quit` to leave.", Color::Cyan, "")?;
            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if line.eq_ignore_ascii_case("quit") {
                    break;
                }
                print_colored("Bot:", Color::Green, &bot.respond(line, user))?;
            }
        }
        kind => {
            let db = if args.archive {
                Some(database(&settings).await?)
            } else {
                None
            };
            let assistant = org_assistant(kind, args.strategy, args.polish, settings).await?;
            let name = assistant.profile().assistant_name.clone();
            print_colored(
                &format!("{}:", name),
                Color::Green,
                &format!(
                    "Hi, I'm {}. Ask me anything about {}. Type `quit` to leave.",
                    name,
                    assistant.profile().org_name
                ),
            )?;

            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                    break;
                }
                let reply = assistant.respond(line, user).await?;
                print_colored(&format!("{}:", name), Color::Green, &reply.text)?;
            }

            if let Some(db) = &db {
                if let Some(session_id) = assistant.archive(db, user).await? {
                    println!("Session stored as {}", session_id);
                }
            }
        }
    }
    Ok(())
}

#[instrument(skip(settings))]
async fn search_command(args: SearchArgs, settings: &Settings) -> anyhow::Result<()> {
    let storage = Storage::new(settings.crawl_dir());
    let index = storage
        .load(&args.url)
        .await?
        .ok_or_else(|| anyhow!("No cached content for {}; run `orgbot crawl` first", args.url))?;

    let results: Vec<(String, f64, Option<String>)> = match args.strategy {
        MatchStrategy::Bm25 => Bm25Matcher::from_index(&index)
            .rank(&args.query, args.limit)
            .into_iter()
            .map(|(url, score)| (url, score, None))
            .collect(),
        MatchStrategy::Keyword => KeywordMatcher::from_index(&index)
            .best_match(&args.query)
            .map(|m| (m.url, m.score, Some(m.excerpt)))
            .into_iter()
            .collect(),
    };

    match args.format.as_str() {
        "json" => {
            let json = serde_json::json!({
                "query": args.query,
                "results": results.iter().map(|(url, score, excerpt)| {
                    serde_json::json!({ "url": url, "score": score, "excerpt": excerpt })
                }).collect::<Vec<_>>()
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            println!("Found {} results", results.len());
            for (i, (url, score, excerpt)) in results.iter().enumerate() {
                let title = index
                    .pages
                    .get(url)
                    .map(|p| p.title.as_str())
                    .unwrap_or_default();
                print_colored(&format!("{}.", i + 1), Color::Cyan, &format!("{} ({:.2})", title, score))?;
                println!("   URL: {}", url);
                if let Some(excerpt) = excerpt {
                    println!("   {}", excerpt);
                }
            }
        }
    }
    Ok(())
}

async fn read_optional(path: Option<&PathBuf>) -> anyhow::Result<Option<String>> {
    match path {
        Some(path) => Ok(Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        )),
        None => Ok(None),
    }
}

/// Wait for an answer, reminding the candidate once
async fn read_answer(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<Option<String>> {
    match tokio::time::timeout(ANSWER_REMINDER, lines.next_line()).await {
        Ok(line) => return Ok(line?),
        Err(_) => print_colored("Still waiting for your answer...", Color::Yellow, "Please respond.")?,
    }
    match tokio::time::timeout(ANSWER_REMINDER, lines.next_line()).await {
        Ok(line) => Ok(line?),
        Err(_) => Ok(None),
    }
}

#[instrument(skip(settings))]
async fn interview_command(args: InterviewArgs, settings: &Settings) -> anyhow::Result<()> {
    let llm = completion_backends(settings)?;

    let mut session = InterviewSession::new(llm.clone(), args.level);
    if let Some(job) = read_optional(args.job.as_ref()).await? {
        session = session.with_job_description(job);
    }
    if let Some(resume) = read_optional(args.resume.as_ref()).await? {
        let summary = interview::summarize_resume(&llm, &resume).await?;
        println!("Resume summary: {}", summary.chars().take(100).collect::<String>());
        session = session.with_resume_summary(summary);
    }

    println!(
        "Level: {:?}, duration: {} minutes",
        args.level,
        args.level.duration().as_secs() / 60
    );

    let mut lines = stdin_lines();
    let Some(first) = session.start().await? else {
        bail!("The interviewer did not produce a question");
    };
    print_colored("Interviewer:", Color::Cyan, &first)?;

    while !session.is_over() {
        let Some(answer) = read_answer(&mut lines).await?.filter(|a| !a.trim().is_empty()) else {
            print_colored("No answer received.", Color::Red, "Ending interview.")?;
            break;
        };

        let step = session.answer(answer.trim()).await?;
        if step.wrap_up_started {
            print_colored("Time is almost up.", Color::Yellow, "Wrapping up soon...")?;
        }
        match step.next_question {
            Some(question) => print_colored("Interviewer:", Color::Cyan, &question)?,
            None => {
                println!("No further questions. Ending interview.");
                break;
            }
        }
    }

    println!("Interview complete. Evaluating answers...");
    let evaluations = session.evaluate().await;
    interview::save_report(&evaluations, &args.report).await?;
    print_colored("Report saved:", Color::Green, &args.report.display().to_string())?;
    Ok(())
}

#[instrument(skip(settings))]
async fn archive_command(args: ArchiveArgs, settings: &Settings) -> anyhow::Result<()> {
    let history = HistoryStore::new(settings.history_path(args.bot));
    let turns = history.load().await;
    if turns.is_empty() {
        println!("No saved history for {}", args.bot);
        return Ok(());
    }

    let db = database(settings).await?;
    let session_id = db
        .store_session(&turns, args.user.as_deref(), args.bot)
        .await?;
    print_colored(
        "Archived",
        Color::Green,
        &format!("{} turns as session {}", turns.len(), session_id),
    )?;

    if args.clear {
        history.clear().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finish_progress_reports_completion() {
        assert!(finish_progress(tokio::spawn(async {})).await);
    }

    #[tokio::test]
    async fn test_finish_progress_survives_a_panicked_reporter() {
        let handle: JoinHandle<()> = tokio::spawn(async { panic!("reporter crashed") });
        assert!(!finish_progress(handle).await);
    }
}
