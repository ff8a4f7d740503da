use clap::Parser;
use log::{error, info, warn};
use server::app::Application;
use server::config::{load_game, Args};
use server::network::{Server, ServerMessage};
use server::strand::{self, COMMAND_QUEUE_SIZE};
use server::ticker::Ticker;
use std::sync::Arc;
use std::time::Duration;

/// How long shutdown waits for queued commands to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Main-method of the application.
/// Loads the map catalog, starts the application region and optional ticker,
/// then serves requests until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args = Args::parse();

    let game = match load_game(&args.config_file) {
        Ok(game) => Arc::new(game),
        Err(e) => {
            error!("Failed to load map catalog: {}", e);
            return Err(e.into());
        }
    };

    let app = Application::new(game, args.app_config());
    let (handle, region) = strand::spawn(app, COMMAND_QUEUE_SIZE);

    let ticker = match args.tick_period {
        Some(millis) => Some(Ticker::start(handle.clone(), Duration::from_millis(millis))),
        None => {
            info!("No tick period set, time advances on tick requests");
            None
        }
    };
    if args.randomize_spawn_points {
        info!("Spawning dogs at random road positions");
    }

    let mut server = Server::new(&args.address(), handle).await?;

    // Handle shutdown gracefully
    let shutdown = server.shutdown_sender();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
        let _ = shutdown.send(ServerMessage::Shutdown);
    });

    if let Err(e) = server.run().await {
        error!("Server stopped with error: {}", e);
    }

    if let Some(ticker) = ticker {
        ticker.stop().await;
    }

    // The region exits once the last handle is gone
    drop(server);
    match tokio::time::timeout(SHUTDOWN_GRACE, region).await {
        Ok(Ok(app)) => info!(
            "Shut down with {} sessions after {} ticks",
            app.sessions().len(),
            app.tick_count()
        ),
        Ok(Err(e)) => error!("Application task panicked: {}", e),
        Err(_) => warn!("Application did not stop within {:?}", SHUTDOWN_GRACE),
    }

    Ok(())
}
