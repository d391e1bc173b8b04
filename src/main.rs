use std::sync::Arc;

use tracing::{error, info, warn};

use mushahid::common::banner::{BannerInfo, print_banner};
use mushahid::common::logger;
use mushahid::common::types::ContentId;
use mushahid::configs::Config;
use mushahid::content::HttpContentService;
use mushahid::playback::{PlayerEvent, SourceController};
use mushahid::watch::{FetchState, WatchSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Using default configuration ({})", e);
        Config::default()
    });

    logger::init(&config);
    print_banner(&BannerInfo::default());

    let Some(content_id) = std::env::args().nth(1).map(ContentId::from) else {
        eprintln!("Usage: mushahid <content-id>");
        std::process::exit(2);
    };

    let api = Arc::new(HttpContentService::new(&config.api)?);
    let controller = SourceController::new(&config)?;
    let mut session = WatchSession::new(api, controller);

    session.load(content_id).await;

    match session.fetch_state() {
        FetchState::Ready => {}
        FetchState::SoftFailed { message } => {
            warn!("Content server busy: {}", message);
            return Ok(());
        }
        FetchState::Failed { message } => {
            error!("Fetch failed: {}", message);
            std::process::exit(1);
        }
        _ => unreachable!("load always settles the fetch state"),
    }

    if let Some(details) = session.details() {
        info!("Title: {}", details.title);
        for source in session.controller().session().sources() {
            info!("  source: {} ({:?}) {}", source.name, source.kind, source.url);
        }
    }

    // Headless drive loop: pump attachment signals into the controller and
    // print the events a UI would react to.
    let signals = session.controller().signals();
    let events = session.controller().events();

    loop {
        tokio::select! {
            signal = signals.recv_async() => {
                let Ok(signal) = signal else { break };
                session.controller_mut().handle_signal(signal);
            }
            event = events.recv_async() => {
                let Ok(event) = event else { break };
                match &event {
                    PlayerEvent::SourceReady { source } => {
                        info!("READY: {}", source.name);
                        break;
                    }
                    PlayerEvent::SourceFailed { source, message, exhausted, .. } => {
                        warn!("FAILED: {}: {} (exhausted: {})", source.name, message, exhausted);
                        break;
                    }
                    PlayerEvent::SourceRejected { source, class } => {
                        warn!("REJECTED: {} ({})", source.name, class);
                        break;
                    }
                    PlayerEvent::NoSources {} => {
                        warn!("No playback sources for this content");
                        break;
                    }
                    PlayerEvent::GateConfirmed { .. } => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    Ok(())
}
