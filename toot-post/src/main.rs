//! toot-post - Compose and publish a status to a Mastodon or Akkoma instance

use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use libtootcast::scheduling::parse_schedule;
use libtootcast::service::cache::LastPublishedCache;
use libtootcast::service::draft::DraftUpdate;
use libtootcast::service::ui::{Navigator, Notifier, Toast, ToastStyle};
use libtootcast::service::ComposeSession;
use libtootcast::store::FileStore;
use libtootcast::{logging, Config, PublishedStatus, Result, TootcastError, Visibility};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "toot-post")]
#[command(version, about = "Compose and publish a status to a Mastodon or Akkoma instance")]
#[command(long_about = r#"Compose and publish a status to a Mastodon or Akkoma instance.

Visibility, markdown and sensitive are remembered between runs.

EXAMPLES:
    # Publish a status
    toot-post "Hello fediverse"

    # Read the status from stdin
    echo "Hello from a pipe" | toot-post

    # Content warning (implies --sensitive)
    toot-post --cw "food" "Pictures of my lunch" --attach lunch.jpg --description "A bowl of ramen"

    # Schedule for later
    toot-post --schedule "2h" "See you in two hours"
    toot-post --schedule "tomorrow 9am" "Good morning"

    # Print the URL of the last published status
    toot-post --last

CONFIGURATION:
    $TOOTCAST_CONFIG or ~/.config/tootcast/config.toml

EXIT CODES:
    0 - Published
    1 - Remote or local error
    2 - Authentication error
    3 - Invalid status (nothing to publish, bad schedule, missing attachment)
"#)]
struct Cli {
    /// Status text (reads from stdin if not provided)
    content: Option<String>,

    /// Content warning shown before the status
    #[arg(long, value_name = "TEXT")]
    cw: Option<String>,

    /// Audience of the status
    #[arg(long, value_name = "VISIBILITY")]
    #[arg(value_parser = ["public", "unlisted", "private", "followers", "direct"])]
    visibility: Option<String>,

    /// Send the status as plain text
    #[arg(long, conflicts_with = "markdown")]
    plain: bool,

    /// Send the status as markdown
    #[arg(long)]
    markdown: bool,

    /// Mark the status as sensitive
    #[arg(long, conflicts_with = "no_sensitive")]
    sensitive: bool,

    /// Clear a remembered sensitive flag
    #[arg(long)]
    no_sensitive: bool,

    /// Publish later: a duration ("90m") or a time ("tomorrow 10am")
    #[arg(long, value_name = "WHEN")]
    schedule: Option<String>,

    /// Attach a file (repeatable)
    #[arg(short, long = "attach", value_name = "PATH")]
    attach: Vec<PathBuf>,

    /// Alt text for the first attachment
    #[arg(long, value_name = "TEXT", requires = "attach")]
    description: Option<String>,

    /// Print the last published status and exit
    #[arg(long)]
    last: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Prints toasts to stderr
#[derive(Default)]
struct StderrNotifier {
    failure_shown: AtomicBool,
}

impl StderrNotifier {
    fn failure_shown(&self) -> bool {
        self.failure_shown.load(Ordering::SeqCst)
    }
}

impl Notifier for StderrNotifier {
    fn notify(&self, toast: Toast) {
        if toast.style == ToastStyle::Failure {
            self.failure_shown.store(true, Ordering::SeqCst);
        }
        match toast.message {
            Some(message) => eprintln!("{}: {}", toast.title, message),
            None => eprintln!("{}", toast.title),
        }
    }
}

/// A one-shot CLI has no view to return to
struct ExitNavigator;

impl Navigator for ExitNavigator {
    fn return_to_root(&self) {
        debug!("Composition finished");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::from_env(cli.verbose).init();

    let notifier = Arc::new(StderrNotifier::default());
    if let Err(e) = run(cli, notifier.clone()).await {
        // Submit failures have already been shown as a toast
        if !notifier.failure_shown() {
            eprintln!("Error: {}", e);
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, notifier: Arc<StderrNotifier>) -> Result<()> {
    let config = Config::load()?;
    let json = cli.format == "json";

    if cli.last {
        return print_last(&config, json);
    }

    let updates = build_updates(&cli)?;
    let mut session = ComposeSession::start(&config, notifier, Arc::new(ExitNavigator)).await?;
    for update in updates {
        for command in session.update(update) {
            debug!("View command: {:?}", command);
        }
    }

    let result = session.submit().await;
    session.shutdown();
    let status = result?;

    print_status(&status, json);
    Ok(())
}

/// Translate flags and content into draft updates, in application order
fn build_updates(cli: &Cli) -> Result<Vec<DraftUpdate>> {
    let mut updates = Vec::new();

    if let Some(visibility) = &cli.visibility {
        let visibility: Visibility = visibility.parse().map_err(TootcastError::Validation)?;
        updates.push(DraftUpdate::visibility(visibility));
    }
    if cli.plain {
        updates.push(DraftUpdate::markdown(false));
    } else if cli.markdown {
        updates.push(DraftUpdate::markdown(true));
    }

    if cli.sensitive || cli.cw.is_some() {
        updates.push(DraftUpdate::sensitive(true));
    } else if cli.no_sensitive {
        updates.push(DraftUpdate::sensitive(false));
    }
    if let Some(cw) = &cli.cw {
        updates.push(DraftUpdate::spoiler_text(cw.clone()));
    }

    if let Some(content) = read_content(cli.content.clone())? {
        updates.push(DraftUpdate::status(content));
    }

    if !cli.attach.is_empty() {
        updates.push(DraftUpdate::files(cli.attach.clone()));
    }
    if let Some(description) = &cli.description {
        updates.push(DraftUpdate {
            description: Some(Some(description.clone())),
            ..Default::default()
        });
    }

    if let Some(when) = &cli.schedule {
        updates.push(DraftUpdate {
            scheduled_at: Some(Some(parse_schedule(when)?)),
            ..Default::default()
        });
    }

    Ok(updates)
}

/// Content from the argument, or from stdin when it is not a terminal
///
/// Empty stdin leaves any recovered draft text in place.
fn read_content(content: Option<String>) -> Result<Option<String>> {
    if content.is_some() {
        return Ok(content);
    }
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| TootcastError::Validation(format!("Failed to read stdin: {}", e)))?;

    let content = buffer.trim_end().to_string();
    Ok((!content.trim().is_empty()).then_some(content))
}

fn print_last(config: &Config, json: bool) -> Result<()> {
    let store = FileStore::open(config.storage_path())?;
    let cache = LastPublishedCache::new(Arc::new(store));

    match cache.get() {
        Some(status) => print_status(&status, json),
        None if json => println!("null"),
        None => eprintln!("No status has been published yet"),
    }
    Ok(())
}

fn print_status(status: &PublishedStatus, json: bool) {
    if json {
        let output = serde_json::json!({
            "id": status.id,
            "url": status.url,
            "created_at": status.created_at,
            "scheduled": status.scheduled,
            "scheduled_at": status.raw.get("scheduled_at"),
        });
        println!("{}", output);
        return;
    }

    match &status.url {
        Some(url) => println!("{}", url),
        None => println!("{}", status.id),
    }
}
