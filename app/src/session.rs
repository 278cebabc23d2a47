//! Runs from the command line: open the page, run the adapter, persist the
//! records and print the result message. `serve` keeps the page open and
//! answers `START_SCRAPING` requests read from stdin.

use crate::cli::{ScrapeArgs, ServeArgs};
use anyhow::{anyhow, Context};
use jobharvest_browser::{BrowserActions, BrowserEngine, EngineOptions, ScriptedPage};
use jobharvest_core::{AppConfig, BrowserConfig, Job};
use jobharvest_scraper::{classify, handle_start, run_pages, ControllerConfig, Message, RunContext};
use jobharvest_store::{AppendOutcome, KvStore, ResultBuffer, SqliteStore};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// The document a run drives.
enum Session {
    Live(BrowserEngine),
    Replay(ScriptedPage),
}

impl Session {
    async fn open(
        url: &str,
        replay: Option<&Path>,
        config: &BrowserConfig,
    ) -> anyhow::Result<Self> {
        if let Some(path) = replay {
            let html = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            info!("Replaying {} as {}", path.display(), url);
            return Ok(Session::Replay(ScriptedPage::new(url, html)));
        }

        let engine = BrowserEngine::launch(engine_options(config))
            .await
            .context("launching browser")?;
        engine
            .navigate(url)
            .await
            .with_context(|| format!("opening {url}"))?;
        Ok(Session::Live(engine))
    }

    fn page(&self) -> &dyn BrowserActions {
        match self {
            Session::Live(engine) => engine,
            Session::Replay(page) => page,
        }
    }

    async fn close(self) {
        if let Session::Live(engine) = self {
            if let Err(e) = engine.close().await {
                warn!("Failed to close browser: {}", e);
            }
        }
    }
}

fn engine_options(config: &BrowserConfig) -> EngineOptions {
    EngineOptions {
        headless: config.headless,
        window_width: config.window_width,
        window_height: config.window_height,
        chrome_executable: config.chrome_executable.clone(),
        navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        min_navigation_interval: Duration::from_millis(config.min_navigation_interval_ms),
    }
}

/// Log what the scraper reports while it runs.
fn report(message: &Message) {
    match message {
        Message::ScrapingProgress {
            platform,
            current,
            total,
            jobs_found,
        } => info!("{platform}: card {current}/{total}, {jobs_found} jobs"),
        Message::VerificationRequired { message, .. } => warn!("{message}"),
        Message::VerificationCleared { platform } => info!("{platform} verification cleared"),
        _ => {}
    }
}

/// Run a scrape and persist its records.
pub async fn scrape(
    config: &AppConfig,
    buffer: &ResultBuffer<SqliteStore>,
    args: ScrapeArgs,
) -> anyhow::Result<()> {
    let adapter = classify(&args.url).ok_or_else(|| anyhow!("no adapter for {}", args.url))?;
    let controller = ControllerConfig::from(&config.scraping).with_max_cards(args.max_cards);
    let max_pages = args.pages.unwrap_or(config.scraping.max_pages);

    let mut browser = config.browser.clone();
    browser.headless |= args.headless;
    let session = Session::open(&args.url, args.replay.as_deref(), &browser).await?;

    let (tx, mut rx) = mpsc::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            report(&message);
        }
    });

    let mut ctx = RunContext::new(tx);
    let token = ctx.cancellation().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current card");
            token.cancel();
        }
    });

    let run_id = ctx.run_id().clone();
    let platform = adapter.platform();
    let message = if args.detail {
        match adapter
            .scrape_detail(session.page(), &ctx, &controller)
            .await
        {
            Ok(job) => Message::ScrapingResult {
                run_id,
                platform,
                jobs: vec![job],
                next_cursor: None,
                error: None,
                stop_reason: None,
            },
            Err(e) => Message::failed(run_id, platform, e.to_string()),
        }
    } else {
        run_pages(adapter.board(), session.page(), &mut ctx, &controller, max_pages)
            .await
            .into_message(run_id, platform)
    };

    // Dropping the context closes the progress channel
    drop(ctx);
    if let Err(e) = printer.await {
        warn!("Progress reporter failed: {}", e);
    }
    session.close().await;

    if let Message::ScrapingResult { jobs, .. } = &message {
        persist(buffer, jobs).await?;
    }

    println!("{}", serde_json::to_string_pretty(&message)?);
    Ok(())
}

async fn persist<S: KvStore>(buffer: &ResultBuffer<S>, jobs: &[Job]) -> anyhow::Result<()> {
    match buffer.append(jobs).await? {
        AppendOutcome::Appended { stored } => info!("Buffer holds {stored} jobs"),
        AppendOutcome::Reset { stored } => {
            warn!("Buffer was full and has been reset, now holds {stored} jobs");
        }
    }
    Ok(())
}

/// Open the page and answer requests from stdin until it closes.
pub async fn serve(
    config: &AppConfig,
    buffer: &ResultBuffer<SqliteStore>,
    args: ServeArgs,
) -> anyhow::Result<()> {
    let mut browser = config.browser.clone();
    browser.headless |= args.headless;
    let session = Session::open(&args.url, args.replay.as_deref(), &browser).await?;
    let controller = ControllerConfig::from(&config.scraping);

    info!("Waiting for START_SCRAPING requests on stdin");
    let input = BufReader::new(tokio::io::stdin());
    let result = serve_lines(session.page(), &controller, buffer, input, tokio::io::stdout()).await;
    session.close().await;
    result
}

/// What one input line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Request {
    Start { max_cards: Option<usize> },
    Skip,
}

fn parse_request(line: &str) -> serde_json::Result<Request> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Request::Skip);
    }
    match serde_json::from_str::<Message>(line)? {
        Message::StartScraping { max_cards } => Ok(Request::Start { max_cards }),
        other => {
            debug!(?other, "Ignoring message that is not a request");
            Ok(Request::Skip)
        }
    }
}

async fn write_message<W>(output: &mut W, message: &Message) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

/// Answer each `START_SCRAPING` line of `input` with the run's progress
/// messages and its `SCRAPING_RESULT`, one JSON object per output line.
async fn serve_lines<S, R, W>(
    page: &dyn BrowserActions,
    controller: &ControllerConfig,
    buffer: &ResultBuffer<S>,
    input: R,
    mut output: W,
) -> anyhow::Result<()>
where
    S: KvStore,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let max_cards = match parse_request(&line) {
            Ok(Request::Start { max_cards }) => max_cards,
            Ok(Request::Skip) => continue,
            Err(e) => {
                warn!("Unreadable request: {}", e);
                continue;
            }
        };

        let (tx, mut rx) = mpsc::channel(32);
        let ctx = RunContext::new(tx);
        // The context moves into the run so the channel closes when it ends
        let run = async move { handle_start(page, &ctx, controller, max_cards).await };
        let forward = async {
            while let Some(message) = rx.recv().await {
                report(&message);
                write_message(&mut output, &message).await?;
            }
            Ok::<_, anyhow::Error>(())
        };
        let (result, forwarded) = tokio::join!(run, forward);
        forwarded?;

        let message = match result {
            Ok(message) => message,
            Err(e) => {
                error!("Run could not start: {}", e);
                continue;
            }
        };
        if let Message::ScrapingResult { jobs, .. } = &message {
            if let Err(e) = persist(buffer, jobs).await {
                warn!("Could not buffer results: {}", e);
            }
        }
        write_message(&mut output, &message).await?;
    }

    info!("Input closed, shutting down");
    Ok(())
}

/// Print (or clear) the stored records.
pub async fn show_buffer(buffer: &ResultBuffer<SqliteStore>, clear: bool) -> anyhow::Result<()> {
    if clear {
        buffer.clear().await?;
        info!("Buffer cleared");
        return Ok(());
    }

    let jobs = buffer.load().await?;
    match buffer.last_run().await? {
        Some(at) => info!("{} jobs, last run {}", jobs.len(), at.to_rfc3339()),
        None => info!("{} jobs, never run", jobs.len()),
    }
    println!("{}", serde_json::to_string_pretty(&jobs)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobharvest_core::Platform;
    use jobharvest_store::{MemoryStore, DEFAULT_CAP};

    const SEEK_URL: &str = "https://www.seek.com.au/rust-jobs";

    fn seek_listing(n: u64) -> String {
        let cards: String = (0..n)
            .map(|i| {
                format!(
                    r#"<article data-card-type="JobCard" data-job-id="{i}">
                         <a data-automation="jobTitle" href="/job/{i}">Engineer {i}</a>
                         <span data-automation="jobCompany">Company {i}</span>
                       </article>"#
                )
            })
            .collect();
        format!("<html><body><div data-automation=\"searchResults\">{cards}</div></body></html>")
    }

    fn output_messages(output: &[u8]) -> Vec<Message> {
        std::str::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_parse_request() {
        assert_eq!(
            parse_request(r#"{"type":"START_SCRAPING","maxCards":5}"#).unwrap(),
            Request::Start { max_cards: Some(5) }
        );
        assert_eq!(
            parse_request(r#"  {"type":"START_SCRAPING"}  "#).unwrap(),
            Request::Start { max_cards: None }
        );
        assert_eq!(parse_request("").unwrap(), Request::Skip);
        assert_eq!(parse_request(r#"{"type":"SHOW_OVERLAY"}"#).unwrap(), Request::Skip);
        assert!(parse_request("START_SCRAPING").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_serve_answers_start_requests() {
        let page = ScriptedPage::new(SEEK_URL, seek_listing(3));
        let buffer = ResultBuffer::new(MemoryStore::new(), DEFAULT_CAP);
        let input = "not json\n{\"type\":\"START_SCRAPING\",\"maxCards\":2}\n";
        let mut output = Vec::new();

        serve_lines(
            &page,
            &ControllerConfig::default(),
            &buffer,
            input.as_bytes(),
            &mut output,
        )
        .await
        .unwrap();

        let messages = output_messages(&output);
        assert_eq!(messages.len(), 3);
        assert!(matches!(
            messages[0],
            Message::ScrapingProgress {
                platform: Platform::Seek,
                current: 1,
                total: 2,
                ..
            }
        ));
        let Message::ScrapingResult { jobs, error, .. } = &messages[2] else {
            panic!("expected a result, got {:?}", messages[2]);
        };
        assert_eq!(jobs.len(), 2);
        assert_eq!(*error, None);
        assert_eq!(buffer.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_serve_skips_unsupported_page() {
        let page = ScriptedPage::new("https://example.com/careers", "<html></html>");
        let buffer = ResultBuffer::new(MemoryStore::new(), DEFAULT_CAP);
        let mut output = Vec::new();

        serve_lines(
            &page,
            &ControllerConfig::default(),
            &buffer,
            &b"{\"type\":\"START_SCRAPING\"}\n"[..],
            &mut output,
        )
        .await
        .unwrap();

        assert!(output.is_empty());
        assert!(buffer.load().await.unwrap().is_empty());
    }

    #[test]
    fn test_engine_options_follow_config() {
        let config = BrowserConfig {
            headless: true,
            navigation_timeout_secs: 45,
            min_navigation_interval_ms: 1200,
            ..BrowserConfig::default()
        };
        let options = engine_options(&config);
        assert!(options.headless);
        assert_eq!(options.window_width, 1440);
        assert_eq!(options.navigation_timeout, Duration::from_secs(45));
        assert_eq!(options.min_navigation_interval, Duration::from_millis(1200));
    }
}
