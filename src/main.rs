use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use testgen_client::{
    api::dto::{JenkinsSettings, TimeRange},
    config::Config,
    orchestrator::{
        assistant::{AssistantSession, CoverageAssistant},
        batch_generator::{BatchGenerator, BatchProgress, FileStatus, GeneratedTest, GenerationOptions},
        context_selection::{fetch_suggestions, ContextSelection},
        conversation_filter::{filter_conversations, Category},
        dashboard::{self, DashboardSnapshot},
        formatter::preprocess_message_content,
        history, settings_sync,
    },
    services::api_client::{ApiClient, UploadFile},
    storage::{
        settings_store::DashboardPreferences, ConversationStore, JsonFileStore, KeyValueStore,
        SettingsStore,
    },
};

#[derive(Parser)]
#[command(name = "testgen-client", version, about = "Client for the AI test generation backend")]
struct Cli {
    /// Backend base URL, overriding configuration
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the backend answers
    Health,
    /// Upload project files or a zip archive and list the Java sources
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print a file's content as the backend sees it
    Read { path: String },
    /// Ask for context files worth sending along with a file
    Suggest { path: String },
    /// Generate tests for one or many uploaded files
    Generate {
        #[arg(required = true)]
        files: Vec<String>,
        /// Context files for a target: FILE=CTX1,CTX2 (repeatable)
        #[arg(long = "context", value_parser = parse_context)]
        contexts: Vec<(String, Vec<String>)>,
        /// Use the top suggested context files for every target
        #[arg(long)]
        auto_context: bool,
        /// Directory generated tests are written to
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Repair a generated test given the error it produced
    Fix {
        test_file: PathBuf,
        #[arg(long)]
        error: String,
        /// Where to write the fixed test; defaults to overwriting the input
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List generated tests
    History {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Print a stored test
    ShowTest { id: i64 },
    /// Delete stored tests
    DeleteTests {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Send a message to the code assistant
    Chat {
        #[arg(required = true)]
        message: Vec<String>,
        /// Conversation to write to; defaults to the newest
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Ask the coverage assistant a question
    CoverageChat { message: Vec<String> },
    /// Manage saved assistant conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },
    /// Show dashboard statistics
    Dashboard {
        /// 24h, 7d, 30d or all; defaults to the saved preference
        #[arg(long)]
        range: Option<TimeRange>,
        /// Reload every refresh interval from the saved preferences
        #[arg(long)]
        watch: bool,
    },
    /// Jenkins data relayed by the backend
    Jenkins {
        #[command(subcommand)]
        action: JenkinsAction,
    },
    /// Local and backend settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum ConversationAction {
    List {
        #[arg(long, default_value = "")]
        search: String,
        /// all, code, database or analysis
        #[arg(long, default_value = "all")]
        category: Category,
    },
    Show { id: String },
    New,
    Delete { id: String },
}

#[derive(Subcommand)]
enum JenkinsAction {
    Builds,
    Coverage,
    Tests,
    Settings,
    /// Test a Jenkins connection; without --url the saved settings are used
    TestConnection {
        #[command(flatten)]
        settings: JenkinsArgs,
    },
}

#[derive(clap::Args)]
struct JenkinsArgs {
    #[arg(long)]
    url: Option<String>,
    #[arg(long, default_value = "")]
    username: String,
    #[arg(long, default_value = "")]
    token: String,
    #[arg(long, default_value = "")]
    job_name: String,
}

impl JenkinsArgs {
    fn into_settings(self) -> Option<JenkinsSettings> {
        self.url.map(|url| JenkinsSettings {
            url,
            username: self.username,
            token: self.token,
            job_name: self.job_name,
        })
    }
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    /// Save Jenkins settings to the backend along with local settings
    SetJenkins {
        #[command(flatten)]
        settings: JenkinsArgs,
    },
    /// Update dashboard preferences
    SetPreferences {
        #[arg(long)]
        default_range: Option<TimeRange>,
        #[arg(long)]
        refresh_interval: Option<u64>,
        #[arg(long)]
        show_change_indicators: Option<bool>,
    },
}

fn parse_context(raw: &str) -> Result<(String, Vec<String>), String> {
    let (file, contexts) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FILE=CTX1,CTX2, got {}", raw))?;
    let contexts = contexts
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    Ok((file.trim().to_string(), contexts))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("testgen_client={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = Arc::new(ApiClient::new(config.api_base_url.clone()));
    let storage: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(config.effective_data_dir()));
    tracing::debug!("Backend: {}", client.base_url());

    match cli.command {
        Command::Health => {
            let healthy = client.health_check().await?;
            println!("{}", if healthy { "Backend is up" } else { "Backend answered with an error" });
        }
        Command::Upload { files } => {
            let mut uploads = Vec::with_capacity(files.len());
            for file in &files {
                uploads.push(UploadFile::from_path(file).await?);
            }
            let tree = client.upload_files(uploads).await?;
            for path in tree.java_files() {
                println!("{}", path);
            }
        }
        Command::Read { path } => {
            println!("{}", client.read_file(&path).await?.code);
        }
        Command::Suggest { path } => {
            for s in fetch_suggestions(&client, &path).await {
                println!("{:>5.1}  {}  ({})", s.score, s.path, s.reason);
            }
        }
        Command::Generate {
            files,
            contexts,
            auto_context,
            out,
        } => {
            let mut selection = ContextSelection::new();
            for file in &files {
                selection.track(file);
                if auto_context {
                    let suggestions = fetch_suggestions(&client, file).await;
                    selection.select_top_n(file, &suggestions, config.suggestion_top_n);
                }
            }
            for (file, paths) in contexts {
                selection.add(&file, paths);
            }

            let generator = BatchGenerator::new(client.clone(), generation_options(&config))
                .with_concurrency(config.batch_concurrency);
            generate(&generator, &files, &selection, &out).await?;
        }
        Command::Fix {
            test_file,
            error,
            out,
        } => {
            let content = tokio::fs::read_to_string(&test_file)
                .await
                .with_context(|| format!("reading {}", test_file.display()))?;
            let test = GeneratedTest {
                file_name: file_name(&test_file),
                content,
                original_file: test_file.display().to_string(),
            };

            let generator = BatchGenerator::new(client.clone(), generation_options(&config));
            let fixed = generator.fix(&test, &error).await?;
            let target = out.unwrap_or(test_file);
            tokio::fs::write(&target, fixed.content).await?;
            println!("Fixed test written to {}", target.display());
        }
        Command::History { search, page } => {
            let runs = client.get_test_history().await?;
            let matching = history::filter_history(&runs, &search);
            for run in history::page(&matching, page) {
                println!("{:>5}  {}  {} -> {}", run.id, run.created_at, run.java_file, run.test_file);
            }
            println!(
                "Page {} of {} ({} tests)",
                page,
                history::total_pages(matching.len()).max(1),
                matching.len()
            );
        }
        Command::ShowTest { id } => {
            println!("{}", client.get_test(id).await?.code);
        }
        Command::DeleteTests { ids } => {
            history::delete_many(&client, &ids).await?;
            println!("Deleted {} tests", ids.len());
        }
        Command::Chat {
            message,
            conversation,
        } => {
            let store = ConversationStore::new(storage.clone());
            let mut session = AssistantSession::new(store, client.clone());
            session.open()?;
            if let Some(id) = conversation {
                session.select(&id)?;
            }
            let reply = session.send(&message.join(" ")).await?;
            println!("{}", preprocess_message_content(&reply.content));
        }
        Command::CoverageChat { message } => {
            let mut assistant = CoverageAssistant::new(client.clone());
            let welcome = assistant.start().await;
            let text = message.join(" ");
            if text.trim().is_empty() {
                println!("{}", welcome.content);
            } else {
                let reply = assistant.send(&text).await?;
                println!("{}", preprocess_message_content(&reply.content));
            }
            for suggestion in assistant.suggestions() {
                println!("  > {}", suggestion);
            }
        }
        Command::Conversations { action } => {
            let mut store = ConversationStore::new(storage.clone());
            store.load_all()?;
            match action {
                ConversationAction::List { search, category } => {
                    for c in filter_conversations(store.conversations(), &search, category) {
                        println!(
                            "{}  {:<24} {:>3} msgs  {}",
                            c.id,
                            c.title,
                            c.message_count,
                            c.last_message.replace('\n', " ")
                        );
                    }
                }
                ConversationAction::Show { id } => {
                    let conversation = store
                        .get(&id)
                        .with_context(|| format!("Conversation {} not found", id))?;
                    for m in &conversation.messages {
                        println!("[{:?}] {}\n", m.role, preprocess_message_content(&m.content));
                    }
                }
                ConversationAction::New => {
                    println!("{}", store.create()?.id);
                }
                ConversationAction::Delete { id } => {
                    let mut session = AssistantSession::new(store, client.clone());
                    session.open()?;
                    if !session.delete(&id)? {
                        anyhow::bail!("Conversation {} not found", id);
                    }
                    if let Some(current) = session.current() {
                        println!("Deleted {}; current conversation is {}", id, current.id);
                    }
                }
            }
        }
        Command::Dashboard { range, watch } => {
            let prefs = SettingsStore::new(storage.clone()).preferences().dashboard;
            let range = range.unwrap_or(prefs.default_time_range);
            dashboard_view(&client, range, &prefs, watch).await?;
        }
        Command::Jenkins { action } => jenkins(&client, action).await?,
        Command::Settings { action } => {
            let store = SettingsStore::new(storage.clone());
            match action {
                SettingsAction::Show => {
                    let (settings, jenkins) = settings_sync::load_settings(&client, &store).await;
                    println!("{}", serde_json::to_string_pretty(&settings)?);
                    match jenkins {
                        Ok(Some(j)) => println!("Jenkins: {} (job {}, user {})", j.url, j.job_name, j.username),
                        Ok(None) => println!("Jenkins: not configured"),
                        Err(e) => println!("Jenkins: unavailable ({})", e),
                    }
                }
                SettingsAction::SetJenkins { settings } => {
                    let jenkins = settings
                        .into_settings()
                        .context("--url is required")?;
                    let local = store.load();
                    let outcome = settings_sync::save_settings(&client, &store, &local, &jenkins).await?;
                    if outcome.is_partial() {
                        println!("Settings partially saved:");
                        for warning in &outcome.warnings {
                            println!("  {}", warning);
                        }
                    } else {
                        println!("Settings saved");
                    }
                }
                SettingsAction::SetPreferences {
                    default_range,
                    refresh_interval,
                    show_change_indicators,
                } => {
                    let mut prefs = store.preferences();
                    if let Some(range) = default_range {
                        prefs.dashboard.default_time_range = range;
                    }
                    if let Some(interval) = refresh_interval {
                        prefs.dashboard.refresh_interval = interval;
                    }
                    if let Some(show) = show_change_indicators {
                        prefs.dashboard.show_change_indicators = show;
                    }
                    store.save_preferences(&prefs)?;
                    println!("Preferences saved");
                }
            }
        }
    }

    Ok(())
}

fn generation_options(config: &Config) -> GenerationOptions {
    GenerationOptions {
        llm: config.default_llm.clone(),
        framework: config.default_framework.clone(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn generate(
    generator: &BatchGenerator,
    files: &[String],
    selection: &ContextSelection,
    out: &Path,
) -> anyhow::Result<()> {
    let (tx, mut rx) = watch::channel(BatchProgress::new(files));

    let printer = tokio::spawn(async move {
        let mut seen: Vec<FileStatus> = Vec::new();
        while rx.changed().await.is_ok() {
            let progress = rx.borrow_and_update().clone();
            seen.resize(progress.files.len(), FileStatus::Waiting);
            for (i, file) in progress.files.iter().enumerate() {
                if seen[i] != file.status {
                    seen[i] = file.status;
                    eprintln!("[{}/{}] {}: {}", progress.current, progress.total, file.name, file.message);
                }
            }
        }
    });

    let outcome = generator.run_with_progress(files, selection, &tx).await;
    drop(tx);
    printer.await?;

    tokio::fs::create_dir_all(out).await?;
    for test in outcome.tests.values() {
        let target = out.join(&test.file_name);
        tokio::fs::write(&target, &test.content).await?;
        println!("{} -> {}", test.original_file, target.display());
    }

    let failed = outcome.progress.count(FileStatus::Error);
    if failed > 0 {
        anyhow::bail!("{} of {} files failed to generate", failed, outcome.progress.total);
    }
    Ok(())
}

async fn dashboard_view(
    client: &ApiClient,
    range: TimeRange,
    prefs: &DashboardPreferences,
    watch: bool,
) -> anyhow::Result<()> {
    let refresh = if watch { prefs.refresh_period() } else { None };
    if watch && refresh.is_none() {
        tracing::warn!("Auto refresh is disabled (refresh interval is 0)");
    }

    loop {
        let snapshot = DashboardSnapshot::load(client, range).await?;
        print!("{}", snapshot.render(prefs.show_change_indicators));

        match refresh {
            Some(period) => {
                tokio::time::sleep(period).await;
                println!();
            }
            None => return Ok(()),
        }
    }
}

async fn jenkins(client: &ApiClient, action: JenkinsAction) -> anyhow::Result<()> {
    match action {
        JenkinsAction::Builds => {
            let builds = client.get_jenkins_builds().await?;
            for b in &builds {
                println!(
                    "#{:<5} {:<10} {}",
                    b.number,
                    b.result.as_deref().unwrap_or(if b.building { "BUILDING" } else { "-" }),
                    b.timestamp.as_deref().unwrap_or("")
                );
            }
            println!("Success rate: {}%", dashboard::build_success_rate(&builds));
        }
        JenkinsAction::Coverage => {
            let coverage = client.get_jenkins_coverage().await?;
            match dashboard::latest_coverage(&coverage) {
                Some(c) => println!(
                    "Line {:.1}%  Branch {:.1}%  Class {:.1}%  Method {:.1}%",
                    c.line_coverage, c.branch_coverage, c.class_coverage, c.method_coverage
                ),
                None => println!("No coverage reports"),
            }
        }
        JenkinsAction::Tests => {
            let results = client.get_jenkins_test_results().await?;
            match dashboard::latest_test_result(&results) {
                Some(r) => println!(
                    "{} passed, {} failed, {} skipped of {}",
                    r.passed_tests, r.failed_tests, r.skipped_tests, r.total_tests
                ),
                None => println!("No test reports"),
            }
        }
        JenkinsAction::Settings => match client.get_jenkins_settings().await? {
            Some(s) => println!("{} (job {}, user {})", s.url, s.job_name, s.username),
            None => println!("Jenkins is not configured"),
        },
        JenkinsAction::TestConnection { settings } => {
            let settings = match settings.into_settings() {
                Some(s) => s,
                None => client
                    .get_jenkins_settings()
                    .await?
                    .context("Jenkins is not configured; pass --url")?,
            };
            let result = client.test_jenkins_connection(&settings).await?;
            println!(
                "{}: {}",
                if result.success { "Connected" } else { "Failed" },
                result.message
            );
            if let Some(warning) = result.warning {
                println!("Warning: {}", warning);
            }
        }
    }
    Ok(())
}
