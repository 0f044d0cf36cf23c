//! Command line entry point.

use std::io::{
    self,
    BufRead,
    Write,
};
use std::path::PathBuf;
use std::process::ExitCode;

use auto_translate::config::{
    ConfigError,
    ConfigManager,
};
use auto_translate::dispatcher::{
    ProgressEvent,
    ProgressSink,
};
use auto_translate::pipeline::{
    self,
    RootOutcome,
    RootPlan,
    RunReport,
    Workflow,
};
use auto_translate::translator::build_translator;
use clap::{
    Parser,
    Subcommand,
};
use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `.auto-translate.json` (defaults to the current directory)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Source language, overrides `sourceLanguage`
    #[arg(long, global = true)]
    source: Option<String>,

    /// Target language, repeatable, overrides `targetLanguages`
    #[arg(long = "target", global = true)]
    targets: Vec<String>,

    /// Primary search path, overrides `path`
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    /// Directory whose subdirectories are searched too, overrides `parentPath`
    #[arg(long, global = true)]
    parent_path: Option<PathBuf>,

    /// Translator API key, overrides `translator.apiKey`
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Do not ask before translating
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Translate every source key missing from the target files
    Missing,
    /// Translate source keys missing from target files, choosing target content by file age
    Updated,
}

impl From<Command> for Workflow {
    fn from(command: Command) -> Self {
        match command {
            Command::Missing => Self::Missing,
            Command::Updated => Self::Updated,
        }
    }
}

/// Forwards dispatcher progress to a terminal progress bar.
struct BarProgress {
    bar: ProgressBar,
}

impl ProgressSink for BarProgress {
    fn begin(&mut self, total: usize) {
        self.bar = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            self.bar.set_style(style.progress_chars("#>-"));
        }
    }

    fn on_progress(&mut self, event: &ProgressEvent<'_>) {
        self.bar.set_message(event.key.to_string());
        self.bar.inc(1);
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let manager = match load_config(&cli) {
        Ok(manager) => manager,
        Err(err) => {
            tracing::error!(error = %err, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    let settings = manager.get_settings();

    let translator = match build_translator(&settings.translator) {
        Ok(translator) => translator,
        Err(err) => {
            tracing::error!(error = %err, "Failed to set up translator");
            return ExitCode::FAILURE;
        }
    };

    let assume_yes = cli.yes;
    let mut confirm = |plan: &RootPlan| {
        confirm_root(plan, assume_yes).unwrap_or_else(|err| {
            tracing::error!(error = %err, "Failed to read confirmation");
            false
        })
    };
    let mut progress = BarProgress { bar: ProgressBar::hidden() };

    let report = pipeline::run(settings, cli.command.into(), translator.as_ref(), &mut confirm, &mut progress);

    if let Err(err) = print_report(&report) {
        tracing::error!(error = %err, "Failed to write report");
    }

    if report.has_failures() { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

/// 設定ファイルを読み込み、CLI 引数で上書きしてから検証する
fn load_config(cli: &Cli) -> Result<ConfigManager, ConfigError> {
    let workspace_root = match &cli.workspace {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    let mut manager = ConfigManager::new();
    manager.load_settings(Some(workspace_root))?;

    let mut settings = manager.get_settings().clone();
    if let Some(source) = &cli.source {
        settings.source_language.clone_from(source);
    }
    if !cli.targets.is_empty() {
        settings.target_languages.clone_from(&cli.targets);
    }
    if let Some(path) = &cli.path {
        settings.path.clone_from(path);
    }
    if let Some(parent_path) = &cli.parent_path {
        settings.parent_path = Some(parent_path.clone());
    }
    if let Some(api_key) = &cli.api_key {
        settings.translator.api_key = Some(api_key.clone());
    }

    // 相対パスはワークスペースルート基準
    settings.path = manager.resolve(&settings.path);
    settings.parent_path = settings.parent_path.as_deref().map(|path| manager.resolve(path));

    manager.update_settings(settings)?;
    Ok(manager)
}

fn confirm_root(plan: &RootPlan, assume_yes: bool) -> io::Result<bool> {
    let mut stdout = io::stdout().lock();

    writeln!(stdout, "Searching in {}", plan.root.display())?;
    let count = plan.languages.len();
    writeln!(stdout, "Found {count} {} to translate", if count == 1 { "language" } else { "languages" })?;
    for language in &plan.languages {
        writeln!(stdout, "Found {} missing keys in {}", language.keys, language.language)?;
    }
    writeln!(stdout, "{} characters will be translated", plan.total_chars())?;

    if assume_yes {
        return Ok(true);
    }

    write!(stdout, "Continue? [Y/n] ")?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer.is_empty() || answer == "y" || answer == "yes")
}

fn print_report(report: &RunReport) -> io::Result<()> {
    let mut stdout = io::stdout().lock();

    for root in &report.roots {
        let path = root.root.display();
        match &root.outcome {
            RootOutcome::NothingMissing => writeln!(stdout, "{path}: 0 missing keys found")?,
            RootOutcome::Declined => writeln!(stdout, "{path}: skipped")?,
            RootOutcome::Translated { keys } => {
                writeln!(stdout, "{path}: translated {keys} missing language keys")?;
            }
            RootOutcome::Failed(err) => writeln!(stdout, "{path}: failed: {err}")?,
        }
    }
    writeln!(stdout, "Translated {} missing language keys.", report.translated_keys())
}
