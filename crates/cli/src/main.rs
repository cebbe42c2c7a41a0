use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use content::{build, Content, EditorState, PlaylistItem};
use editor::EditorPreviewBinding;
use session::{HttpTransport, PreviewConfig, PreviewSessionCoordinator, PreviewTransport, SessionEvent};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ledsign-preview", about = "Drive the LED sign live preview from a playlist item", version)]
struct Cli {
    /// Preview config file (defaults to <config dir>/ledsign/preview.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the server base URL from the config file.
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hold a live preview of the item until Ctrl-C.
    Preview {
        item: PathBuf,
    },
    /// Print the interpolated image transform at the given offsets.
    Frame {
        item: PathBuf,
        #[arg(long = "at-ms", required = true)]
        at_ms: Vec<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Command::Preview { ref item } => {
            let config = load_config(cli.config.as_deref(), cli.base_url.clone())?;
            preview(config, item).await
        }
        Command::Frame { item, at_ms } => frame(&item, &at_ms),
    }
}

fn load_config(path: Option<&Path>, base_url: Option<String>) -> Result<PreviewConfig> {
    let mut config = match path {
        Some(path) => PreviewConfig::load(path).with_context(|| format!("reading {}", path.display()))?,
        None => match dirs::config_dir() {
            Some(dir) => PreviewConfig::load_or_default(&dir.join("ledsign").join("preview.json"))?,
            None => PreviewConfig::default(),
        },
    };
    if let Some(base_url) = base_url {
        config.base_url = base_url;
    }
    config.validate()?;
    Ok(config)
}

fn load_item(path: &Path) -> Result<PlaylistItem> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    PlaylistItem::from_json(&json).with_context(|| format!("parsing {}", path.display()))
}

async fn preview(config: PreviewConfig, item: &Path) -> Result<()> {
    let state = EditorState::from_item(&load_item(item)?);
    let transport = Arc::new(HttpTransport::new(&config)?);
    let coordinator = PreviewSessionCoordinator::new(transport, config)?;
    let mut binding = EditorPreviewBinding::new(coordinator, state);

    binding.mount().await.context("starting preview")?;
    info!(payload = %build(binding.state()).to_json()?, "previewing, Ctrl-C to stop");

    let ended = hold(&mut binding, tokio::signal::ctrl_c()).await;

    if let Some(release) = binding.leave() {
        release.await.context("releasing preview")?;
    }
    if let Ended::Expired(reason) = ended {
        bail!("preview session ended ({reason}); run the command again to reconnect");
    }
    info!("preview stopped");
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Ended {
    Interrupted,
    Expired(String),
}

/// Keeps the session open until `shutdown` resolves or the server drops it.
/// An expired session is never re-acquired here; reconnecting is the user's call.
async fn hold<T, F>(binding: &mut EditorPreviewBinding<T>, shutdown: F) -> Ended
where
    T: PreviewTransport,
    F: Future,
{
    tokio::pin!(shutdown);
    let mut poll = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            _ = &mut shutdown => return Ended::Interrupted,
            _ = poll.tick() => {
                for event in binding.poll_events() {
                    if let SessionEvent::Expired { reason, .. } = event {
                        warn!(%reason, "preview session ended");
                        return Ended::Expired(reason);
                    }
                }
            }
        }
    }
}

fn frame(item: &Path, at_ms: &[f64]) -> Result<()> {
    let payload = build(&EditorState::from_item(&load_item(item)?));
    let Content::Image(image) = &payload.content else { bail!("item is not an image") };
    for &t in at_ms {
        let transform = match &image.timeline {
            Some(timeline) => timeline.interpolate(t),
            None => image.transform,
        };
        println!("{t}\t{}", serde_json::to_string(&transform)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use content::TextContent;
    use editor::EditorChange;
    use session::{OwnershipResponse, StartResponse, TransportError, UpdateResponse};

    #[derive(Default)]
    struct FlakyServer {
        starts: AtomicUsize,
        forgot_session: AtomicBool,
    }

    impl PreviewTransport for FlakyServer {
        async fn start(&self, _payload: &content::PreviewPayload) -> Result<StartResponse, TransportError> {
            let n = self.starts.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(StartResponse { session_id: format!("s{n}") })
        }

        async fn update(
            &self,
            payload: &content::PreviewPayload,
            session_id: &str,
        ) -> Result<UpdateResponse, TransportError> {
            if self.forgot_session.load(Ordering::SeqCst) { return Err(TransportError::NotFound); }
            Ok(UpdateResponse { item: payload.clone(), session_id: session_id.to_string() })
        }

        async fn ping(&self, _session_id: &str) -> Result<(), TransportError> { Ok(()) }

        async fn check_ownership(&self, _session_id: &str) -> Result<OwnershipResponse, TransportError> {
            Ok(OwnershipResponse { is_owner: true })
        }

        async fn stop(&self, _session_id: &str) -> Result<(), TransportError> { Ok(()) }
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_ends_hold_without_restarting() {
        let server = Arc::new(FlakyServer::default());
        let coordinator = PreviewSessionCoordinator::new(server.clone(), PreviewConfig::default()).unwrap();
        let state = EditorState::new(Content::Text(TextContent::new("OPEN", "#ffffff")));
        let mut binding = EditorPreviewBinding::new(coordinator, state);
        binding.mount().await.unwrap();

        server.forgot_session.store(true, Ordering::SeqCst);
        assert!(binding.apply(EditorChange::Scroll(true)).await.is_err());

        let ended = hold(&mut binding, std::future::pending::<()>()).await;
        assert!(matches!(ended, Ended::Expired(_)));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(server.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_ends_hold() {
        let server = Arc::new(FlakyServer::default());
        let coordinator = PreviewSessionCoordinator::new(server, PreviewConfig::default()).unwrap();
        let state = EditorState::new(Content::Text(TextContent::new("OPEN", "#ffffff")));
        let mut binding = EditorPreviewBinding::new(coordinator, state);
        binding.mount().await.unwrap();

        let ended = hold(&mut binding, tokio::time::sleep(Duration::from_secs(1))).await;
        assert_eq!(ended, Ended::Interrupted);
        assert!(!binding.needs_reacquire());
    }
}
