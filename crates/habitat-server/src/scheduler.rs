use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use habitat_api::auth::AppState;
use habitat_api::reminders::run_schedule;

/// Background task that runs the reminder scheduler for every user.
pub async fn run_scheduler_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let app = Arc::clone(&state);
        let result = tokio::task::spawn_blocking(move || {
            run_schedule(&app.db, app.scheduler, None, Utc::now())
        })
        .await;

        match result {
            Ok(Ok(fired)) => {
                if !fired.is_empty() {
                    info!("Scheduler: created {} reminders", fired.len());
                }
            }
            Ok(Err(e)) => warn!("Scheduler error: {:#}", e),
            Err(e) => error!("Scheduler task panicked: {}", e),
        }
    }
}
