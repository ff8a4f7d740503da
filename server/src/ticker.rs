use crate::strand::AppHandle;
use log::{error, info};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Periodically advances game time through the serialized region.
///
/// Periods are counted from the previous scheduled tick. Each tick is
/// awaited before the timer is polled again, so ticks never overlap; a tick
/// that runs past its period delays the next one instead of bursting.
pub struct Ticker {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Ticker {
    pub fn start(handle: AppHandle, period: Duration) -> Self {
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_ticker(handle, period, stop_rx));
        info!("Ticker started with a period of {:?}", period);
        Self {
            stop: Some(stop),
            task,
        }
    }

    /// Stops the ticker, waiting for a tick in progress to finish.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = self.task.await {
            error!("Ticker task panicked: {}", e);
        }
        info!("Ticker stopped");
    }
}

async fn run_ticker(handle: AppHandle, period: Duration, mut stop: oneshot::Receiver<()>) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Skip the first tick since it fires immediately
    timer.tick().await;
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = timer.tick() => {
                // Whole milliseconds only; the remainder carries over
                let elapsed = last_tick.elapsed().as_millis() as u64;
                last_tick += Duration::from_millis(elapsed);

                if let Err(e) = handle.timer_tick(elapsed).await {
                    error!("Tick failed, stopping ticker: {}", e);
                    break;
                }
            }
        }
    }
}
