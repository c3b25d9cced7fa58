//! Headless driver for the showcase slider.
//!
//! Mounts one slider against the configured content API, reports the
//! element as scrolled into view and logs every rendered frame.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::time::sleep;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use showcase_slider::cache::ImageCache;
use showcase_slider::config::Configuration;
use showcase_slider::content::{CachedContentApi, ContentApi, HttpContentApi};
use showcase_slider::render::{Rendered, render};
use showcase_slider::tasks::preloader::{HttpImageFetcher, Preloader};
use showcase_slider::tasks::slider::{Mount, SliderOptions};
use showcase_slider::tasks::visibility::{Rect, VisibilityObserver};

/// Layout used for the headless element: a full-bleed 16:9 section.
const VIEWPORT: Rect = Rect::new(0.0, 0.0, 1280.0, 720.0);
const ELEMENT: Rect = Rect::new(0.0, 0.0, 1280.0, 720.0);

#[derive(Debug, Parser)]
#[command(
    name = "showcase-slider",
    version,
    about = "Headless showcase slider driver"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Fetch and print the slide list without mounting the slider
    #[arg(long = "dry-run")]
    dry_run: bool,
    /// Seconds to wait before reporting the element as in view
    #[arg(long = "visible-after", value_name = "SECONDS", default_value_t = 0)]
    visible_after: u64,
    /// Unmount and exit after this many seconds instead of waiting for ctrl-c
    #[arg(long = "run-for", value_name = "SECONDS")]
    run_for: Option<u64>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(
            format!("showcase_slider={level}")
                .parse()
                .context("invalid log directive")?,
        );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        dry_run,
        visible_after,
        run_for,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    info!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);
    info!(
        autoplay = %humantime::format_duration(cfg.autoplay_interval),
        content_ttl = %humantime::format_duration(cfg.content_cache_ttl),
        "slider timing"
    );

    let http = HttpContentApi::new(&cfg).context("failed to build content api client")?;
    let api: Arc<dyn ContentApi> = Arc::new(CachedContentApi::new(http, cfg.content_cache_ttl));

    if dry_run {
        return run_dry(api.as_ref()).await;
    }

    let fetcher = HttpImageFetcher::new(&cfg).context("failed to build image client")?;
    let preloader = Preloader::new(ImageCache::new(), Arc::new(fetcher));
    let observer = Arc::new(VisibilityObserver::new(cfg.visibility));
    let _visibility_log = observer.subscribe(|in_view| info!(in_view, "slider visibility"));

    let mount = Mount::spawn(
        api,
        preloader,
        observer.watch(),
        SliderOptions::from(&cfg),
    );

    {
        let observer = Arc::clone(&observer);
        tokio::spawn(async move {
            sleep(Duration::from_secs(visible_after)).await;
            observer.observe(ELEMENT, VIEWPORT);
        });
    }

    let mut snapshots = mount.snapshots();
    let deadline = async {
        match run_for {
            Some(secs) => sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(err) = res {
                    warn!("ctrl-c handler failed: {err}");
                }
                info!("ctrl-c received; unmounting");
                break;
            }
            _ = &mut deadline => {
                info!("run time elapsed; unmounting");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                log_frame(&snapshot);
            }
        }
    }

    mount.unmount().await.context("slider task failed")?;
    Ok(())
}

async fn run_dry(api: &dyn ContentApi) -> Result<()> {
    let slides = api
        .fetch_slides()
        .await
        .context("failed to fetch showcase slides")?;
    println!("# showcase dry run\n# slides: {}\n", slides.len());
    if slides.is_empty() {
        println!("(no active slides)");
        return Ok(());
    }
    for (idx, slide) in slides.iter().enumerate() {
        println!(
            "  {:>3}: [{}] {}{} -> {}",
            idx,
            slide.order,
            slide.title,
            slide
                .subtitle
                .as_deref()
                .map(|s| format!(" / {s}"))
                .unwrap_or_default(),
            slide.image
        );
    }
    Ok(())
}

fn log_frame(snapshot: &showcase_slider::events::SliderSnapshot) {
    match render(snapshot) {
        Rendered::Loading => info!("loading showcase"),
        Rendered::Nothing => info!("no slides to show"),
        Rendered::Slides(frames) => {
            let painted = frames.iter().filter(|f| f.image.is_some()).count();
            if let Some(active) = frames.iter().find(|f| f.active) {
                info!(
                    current = active.index,
                    title = active.title,
                    painted,
                    total = frames.len(),
                    autoplay = ?snapshot.autoplay,
                    visible = snapshot.visible,
                    "showcase frame"
                );
            }
        }
    }
}
