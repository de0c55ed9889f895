//! Background scheduled tasks for the application.
//!
//! Currently a single recurring job: moving campaigns between scheduled,
//! active and ended according to their validity window.
//! Call `spawn_all` once during startup to launch it.

use crate::services::CampaignService;

/// Spawn all background tasks.
///
/// The status sweep is idempotent; running it twice in a row changes nothing.
pub fn spawn_all(campaign_service: CampaignService, interval_secs: u64) {
    // 活动状态自动流转（默认每分钟）
    {
        let svc = campaign_service.clone();
        let interval = std::time::Duration::from_secs(interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                match svc.advance_statuses(chrono::Utc::now()).await {
                    Ok((0, 0)) => {}
                    Ok((started, ended)) => {
                        log::info!("Campaign statuses advanced: {started} started, {ended} ended")
                    }
                    Err(e) => log::error!("Failed to advance campaign statuses: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
