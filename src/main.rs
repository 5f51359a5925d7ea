use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

// Import modules
mod basemap;
mod constants;
mod context;
mod control;
mod feed;
mod fetch;
mod html_template;
mod legend;
mod map;
mod overlay;
mod server;
mod settings;
mod style;
mod utils;

use constants::{DEFAULT_OUTPUT_FILE, EVENT_CHANNEL_CAPACITY};
use context::AppContext;
use fetch::FeedClient;
use html_template::PageMode;
use server::{start_server, state::AppState};
use settings::Settings;

const USAGE: &str = "\
QuakeMap - earthquakes of the past week over tectonic plate boundaries

Usage:
  quakemap [serve]        Serve the interactive map locally
  quakemap render [PATH]  Write a self-contained HTML map (default: quakemap.html)
  quakemap config         Write the current settings to the config file
  quakemap help           Show this message
";

fn build_context(settings: &Settings) -> Result<(Arc<AppContext>, FeedClient)> {
    let ctx = AppContext::from_settings(settings).context("Invalid map configuration")?;
    let client = FeedClient::new(settings.request_timeout())?;
    Ok((Arc::new(ctx), client))
}

async fn serve(settings: Settings) -> Result<()> {
    println!("🗺️  QuakeMap v{} starting...", env!("CARGO_PKG_VERSION"));
    let (ctx, client) = build_context(&settings)?;
    let (event_sender, _event_receiver) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let settings = Arc::new(settings);

    // The page is served right away; overlays arrive as each feed settles
    {
        let ctx = Arc::clone(&ctx);
        let settings = Arc::clone(&settings);
        let events = event_sender.clone();
        tokio::spawn(async move {
            ctx.load_overlays(client, &settings, Some(events)).await;
        });
    }

    let app_state = AppState {
        ctx,
        settings,
        event_sender,
    };
    start_server(app_state).await
}

async fn render(settings: Settings, output: PathBuf) -> Result<()> {
    let (ctx, client) = build_context(&settings)?;
    Arc::clone(&ctx).load_overlays(client, &settings, None).await;

    for summary in ctx.overlay_summaries().await {
        info!("{}: {:?}", summary.name, summary.status);
    }

    let page = html_template::render_page(&PageMode::Standalone(Box::new(ctx.bootstrap().await)))?;
    tokio::fs::write(&output, page)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("✅ Map written to {}", output.display());
    Ok(())
}

fn write_config(settings: &Settings) -> Result<()> {
    let path = settings.save()?;
    println!("✅ Settings saved to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let settings = Settings::load()?;

    match args.first().map(String::as_str) {
        None | Some("serve") => serve(settings).await,
        Some("render") => {
            let output = args
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE));
            render(settings, output).await
        }
        Some("config") => write_config(&settings),
        Some("help") | Some("--help") | Some("-h") => {
            print!("{USAGE}");
            Ok(())
        }
        Some(other) => {
            eprint!("{USAGE}");
            bail!("Unknown command: {other}")
        }
    }
}
