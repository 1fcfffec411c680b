use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 120;

/// Periodic frame ticks for one visible visualizer. Each tick carries the
/// time since the previous one. The task stops when the loop is dropped or
/// the receiver goes away.
pub struct FrameLoop {
    task: JoinHandle<()>,
}

/// Tick period for `fps`, clamped to the supported range.
fn tick_period(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.clamp(MIN_FPS, MAX_FPS) as f64)
}

impl FrameLoop {
    pub fn start<T, F>(fps: u32, tx: mpsc::Sender<T>, tick: F) -> Self
    where
        T: Send + 'static,
        F: Fn(Duration) -> T + Send + 'static,
    {
        let period = tick_period(fps);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last = Instant::now();
            loop {
                interval.tick().await;
                let now = Instant::now();
                let dt = now - last;
                last = now;
                if tx.send(tick(dt)).await.is_err() {
                    break;
                }
            }
        });
        Self { task }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.task.abort();
    }
}
