use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use safehaven_core::{
    CancelReason, EngineConfig, FrameId, HostEvent, NavigationEngine, NavigationEvent,
    NavigationSource, ReportFormat, RequestSink, TabReport, UiSink,
};
use safehaven_lists::{FileListSource, ListSet, SharedLists};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Install the fmt subscriber; `-v` wins over `RUST_LOG`
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the config file if one was given, defaults otherwise
pub fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// `--lists` beats the config file's list path
pub fn resolve_list_path(cli: Option<&PathBuf>, config: &EngineConfig) -> PathBuf {
    match cli {
        Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
        None => config.list_path(),
    }
}

/// Load the lists, reporting failure and carrying on with empty lists
pub async fn load_lists(path: &Path) -> SharedLists {
    let lists = SharedLists::new();
    if let Err(e) = lists.refresh(&FileListSource::new(path)).await {
        eprintln!(
            "{} Could not load lists from {}: {}",
            "⚠".yellow().bold(),
            path.display().to_string().bright_white(),
            e
        );
    }
    lists
}

/// Read a JSON trace of host events
pub fn load_trace(path: &Path) -> Result<VecDeque<HostEvent>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace {}", path.display()))?;
    parse_trace(&content).with_context(|| format!("Invalid trace {}", path.display()))
}

pub fn parse_trace(content: &str) -> Result<VecDeque<HostEvent>> {
    let events: Vec<HostEvent> = serde_json::from_str(content)?;
    Ok(events.into())
}

/// Trace source that snapshots each tab's report just before it closes
pub struct ReplaySource<'a> {
    events: VecDeque<HostEvent>,
    engine: &'a NavigationEngine,
    tabs: Vec<FrameId>,
    closed: HashMap<FrameId, TabReport>,
}

impl<'a> ReplaySource<'a> {
    pub fn new(events: VecDeque<HostEvent>, engine: &'a NavigationEngine) -> Self {
        Self {
            events,
            engine,
            tabs: Vec::new(),
            closed: HashMap::new(),
        }
    }

    fn note_tab(&mut self, tab_id: FrameId) {
        if !self.tabs.contains(&tab_id) {
            self.tabs.push(tab_id);
        }
    }

    /// One report per tab seen, in first-seen order
    pub fn into_reports(mut self) -> Vec<TabReport> {
        let tabs = std::mem::take(&mut self.tabs);
        tabs.into_iter()
            .filter_map(|tab_id| {
                self.closed
                    .remove(&tab_id)
                    .or_else(|| self.engine.report(tab_id))
            })
            .collect()
    }
}

impl NavigationSource for ReplaySource<'_> {
    fn next_event(&mut self) -> Option<HostEvent> {
        let event = self.events.pop_front()?;
        match &event {
            HostEvent::TabOpened { tab_id } => self.note_tab(*tab_id),
            HostEvent::State(state) => self.note_tab(state.tab_id),
            HostEvent::TabClosed { tab_id } => {
                if let Some(report) = self.engine.report(*tab_id) {
                    self.closed.insert(*tab_id, report);
                }
            }
        }
        Some(event)
    }
}

pub fn format_cancel(event: &NavigationEvent, reason: CancelReason) -> String {
    let target = event
        .request
        .as_ref()
        .map(|r| format!("request {} {}", r.id, r.url))
        .unwrap_or_else(|| "current load".to_string());
    format!(
        "cancel tab {} frame {} (parent {}) {}: {}",
        event.tab_id, event.frame_id, event.parent_id, target, reason
    )
}

/// Prints every cancelled request
#[derive(Default)]
pub struct PrintingRequests;

impl RequestSink for PrintingRequests {
    fn cancel(&self, event: &NavigationEvent, reason: CancelReason) {
        println!("{} {}", "✗".red().bold(), format_cancel(event, reason));
    }
}

/// Prints the status indicator whenever it changes
#[derive(Default)]
pub struct PrintingUi {
    last: Mutex<HashMap<FrameId, bool>>,
}

impl UiSink for PrintingUi {
    fn set_safe(&self, tab_id: FrameId, safe: bool) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.insert(tab_id, safe) == Some(safe) {
            return;
        }
        if safe {
            println!("{} tab {} indicator: {}", "●".green(), tab_id, "safe".green());
        } else {
            println!("{} tab {} indicator: {}", "●".red(), tab_id, "blocked".red().bold());
        }
    }
}

pub fn render_lists(lists: &ListSet) -> String {
    let mut out = String::new();
    out.push_str(&format!("Whitelist ({} entries)\n", lists.whitelist.len()));
    for entry in &lists.whitelist {
        out.push_str(&format!("  W {}\n", entry));
    }
    out.push_str(&format!("Blacklist ({} entries)\n", lists.blacklist.len()));
    for entry in &lists.blacklist {
        out.push_str(&format!("  B {}\n", entry));
    }
    out
}

pub fn render_reports(reports: &[TabReport], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(reports)?),
        ReportFormat::Text => Ok(reports.iter().map(TabReport::to_text).collect()),
    }
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub async fn handle_replay(args: &ArgMatches) -> Result<()> {
    let config = load_config(args.get_one::<PathBuf>("config"))?;
    let list_path = resolve_list_path(args.get_one::<PathBuf>("lists"), &config);
    let trace_path = args
        .get_one::<PathBuf>("trace")
        .context("--trace is required")?;
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let show_report = !args.get_flag("no-report");

    let lists = load_lists(&list_path).await;
    let events = load_trace(trace_path)?;

    print_divider();
    println!("{}", "  SAFEHAVEN REPLAY".bright_white().bold());
    print_divider();
    println!(
        "{} Trace: {} ({} events)",
        "→".blue(),
        trace_path.display().to_string().bright_white(),
        events.len()
    );
    println!(
        "{} Lists: {} ({} entries)",
        "→".blue(),
        list_path.display().to_string().bright_white(),
        lists.snapshot().len()
    );
    println!();

    let engine = NavigationEngine::from_config(&config, lists);
    let mut source = ReplaySource::new(events, &engine);
    let stats = engine.run(&mut source, &PrintingRequests, &PrintingUi::default());

    println!();
    println!(
        "{} {} events, {} cancelled",
        "✓".green().bold(),
        stats.events.to_string().cyan(),
        stats.cancels.to_string().cyan()
    );

    if show_report {
        let reports = source.into_reports();
        if reports.is_empty() {
            warn!("Trace contained no tabs");
        }
        println!();
        print!("{}", render_reports(&reports, format)?);
        if format == ReportFormat::Json {
            println!();
        }
    }

    Ok(())
}

pub async fn handle_lists(args: &ArgMatches) -> Result<()> {
    let config = load_config(args.get_one::<PathBuf>("config"))?;
    let list_path = resolve_list_path(args.get_one::<PathBuf>("lists"), &config);

    let lists = SharedLists::new();
    lists
        .refresh(&FileListSource::new(&list_path))
        .await
        .with_context(|| format!("Failed to load lists from {}", list_path.display()))?;

    print!("{}", render_lists(&lists.snapshot()));
    Ok(())
}
