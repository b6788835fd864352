//! PhishGuard Watch - headless observer of the campaign event feed.
//!
//! Binds its own queue to the AMQP fanout exchange and logs every event it
//! receives until interrupted. Requires `CLOUDAMQP_URL`.

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use phishguard::model::CampaignEvent;
use phishguard::{AmqpBroadcaster, Broadcaster, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("watch_starting");

    let config = Config::from_env();
    let url = config
        .cloudamqp_url
        .clone()
        .context("CLOUDAMQP_URL must be set to watch campaign events")?;

    let broadcaster = AmqpBroadcaster::new(url, config.event_exchange.clone());
    let mut events = broadcaster
        .subscribe()
        .await
        .context("Failed to subscribe to event exchange")?;

    info!(exchange = %config.event_exchange, "watch_subscribed");

    loop {
        tokio::select! {
            next = events.next() => match next {
                Some(event) => log_event(&event),
                None => {
                    warn!("watch_stream_ended");
                    break;
                }
            },
            _ = signal::ctrl_c() => {
                info!("Received SIGINT");
                break;
            }
        }
    }

    broadcaster.close().await;
    info!("watch_shutdown_complete");

    Ok(())
}

fn log_event(event: &CampaignEvent) {
    match event {
        CampaignEvent::CampaignCreated(campaign) => {
            let summary = campaign.summary();
            info!(
                campaign_id = %campaign.id,
                name = %campaign.name,
                sent = summary.sent,
                failed = summary.failed,
                "campaign_created"
            );
        }
        CampaignEvent::EmailStatus(status) => info!(
            campaign_id = %status.campaign_id,
            email = %status.email,
            status = status.status.as_str(),
            error = ?status.error,
            "email_status"
        ),
        CampaignEvent::EmailOpened(opened) => info!(
            campaign_id = %opened.campaign_id,
            email = %opened.email,
            open_count = opened.open_count,
            "email_opened"
        ),
        CampaignEvent::EmailClicked(clicked) => info!(
            campaign_id = %clicked.campaign_id,
            email = %clicked.email,
            click_count = clicked.click_count,
            "email_clicked"
        ),
    }
}
