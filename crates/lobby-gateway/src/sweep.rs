use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::chat::Chat;

/// How often idle participants are looked for.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that expires idle participants.
///
/// Each tick removes everyone idle past the chat's inactivity threshold and
/// announces their departure. Runs until the task is dropped.
pub async fn run_expiry_loop(chat: Chat, period: Duration) {
    let mut interval = tokio::time::interval(period);
    info!(
        "Expiry sweep every {:?}, inactivity threshold {}s",
        period,
        chat.inactivity().num_seconds()
    );

    loop {
        interval.tick().await;

        // Announcing a departure rewrites the history file.
        let tick_chat = chat.clone();
        match tokio::task::spawn_blocking(move || tick_chat.expire_idle(Utc::now())).await {
            Ok(expired) if !expired.is_empty() => {
                info!("Sweep: expired {} idle participants", expired.len());
            }
            Ok(_) => debug!("Sweep: nobody idle"),
            Err(e) => warn!("Sweep error: {}", e),
        }
    }
}
