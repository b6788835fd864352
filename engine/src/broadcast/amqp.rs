//! AMQP broadcaster: campaign events on a RabbitMQ fanout exchange.
//!
//! Each observer binds its own exclusive, auto-delete queue, so observers on
//! other hosts see the same feed and nothing is kept once they disconnect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{future, StreamExt};
use lapin::{
    options::{
        BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{info, warn};

use super::{BroadcastError, Broadcaster, EventStream};
use crate::model::CampaignEvent;

/// Default bound on connecting, declaring the exchange and one confirmed publish.
const BROKER_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes event frames to a fanout exchange, reconnecting lazily.
#[derive(Clone)]
pub struct AmqpBroadcaster {
    inner: Arc<AmqpInner>,
}

struct AmqpInner {
    url: String,
    exchange: String,
    broker_timeout: Duration,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
}

impl AmqpBroadcaster {
    pub fn new(url: String, exchange: String) -> Self {
        Self {
            inner: Arc::new(AmqpInner {
                url,
                exchange,
                broker_timeout: BROKER_TIMEOUT,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    #[cfg(test)]
    fn with_broker_timeout(url: String, exchange: String, broker_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(AmqpInner {
                url,
                exchange,
                broker_timeout,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    /// Ensure we have a valid connection and channel.
    async fn ensure_connected(&self) -> Result<Channel, BroadcastError> {
        {
            let channel = self.inner.channel.read().await;
            if let Some(ch) = channel.as_ref() {
                if ch.status().connected() {
                    return Ok(ch.clone());
                }
            }
        }

        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Double-check after acquiring write lock
        if let Some(ch) = channel.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }

        info!("amqp_broadcaster_connecting");

        let limit = self.inner.broker_timeout;
        let (conn, ch) = timeout(limit, self.open_channel())
            .await
            .map_err(|_| BroadcastError::Timeout(limit))??;

        info!(exchange = %self.inner.exchange, "amqp_exchange_declared");

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    async fn open_channel(&self) -> Result<(Connection, Channel), BroadcastError> {
        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default()).await?;
        let ch = conn.create_channel().await?;

        ch.exchange_declare(
            &self.inner.exchange,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions::default(),
            FieldTable::default(),
        )
        .await?;

        Ok((conn, ch))
    }

    async fn try_publish(&self, event: &CampaignEvent) -> Result<usize, BroadcastError> {
        let channel = self.ensure_connected().await?;
        let body = serde_json::to_vec(event)?;

        let confirm = async {
            channel
                .basic_publish(
                    &self.inner.exchange,
                    "",
                    BasicPublishOptions::default(),
                    &body,
                    BasicProperties::default()
                        .with_content_type("application/json".into())
                        .with_type(event.name().into()),
                )
                .await?
                .await
        };

        let limit = self.inner.broker_timeout;
        timeout(limit, confirm)
            .await
            .map_err(|_| BroadcastError::Timeout(limit))??;

        Ok(body.len())
    }
}

#[async_trait]
impl Broadcaster for AmqpBroadcaster {
    async fn publish(&self, event: CampaignEvent) {
        match self.try_publish(&event).await {
            Ok(body_length) => info!(
                exchange = %self.inner.exchange,
                event = event.name(),
                campaign_id = %event.campaign_id(),
                body_length,
                "amqp_event_published"
            ),
            Err(e) => warn!(
                exchange = %self.inner.exchange,
                event = event.name(),
                error = %e,
                "amqp_event_publish_failed"
            ),
        }
    }

    async fn subscribe(&self) -> Result<EventStream, BroadcastError> {
        let channel = self.ensure_connected().await?;

        let queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        channel
            .queue_bind(
                queue.name().as_str(),
                &self.inner.exchange,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let consumer = channel
            .basic_consume(
                queue.name().as_str(),
                "",
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        info!(
            exchange = %self.inner.exchange,
            queue = queue.name().as_str(),
            "amqp_observer_subscribed"
        );

        let stream = consumer.filter_map(|delivery| {
            let event = match delivery {
                Ok(delivery) => match serde_json::from_slice::<CampaignEvent>(&delivery.data) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!(error = %e, body_length = delivery.data.len(), "amqp_event_decode_failed");
                        None
                    }
                },
                Err(e) => {
                    warn!(error = %e, "amqp_delivery_error");
                    None
                }
            };
            future::ready(event)
        });

        Ok(Box::pin(stream))
    }

    /// Close the connection gracefully.
    async fn close(&self) {
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        if let Some(ch) = channel.take() {
            if let Err(e) = ch.close(200, "Normal shutdown").await {
                warn!(error = %e, "amqp_channel_close_error");
            }
        }

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "Normal shutdown").await {
                warn!(error = %e, "amqp_connection_close_error");
            }
        }

        info!("amqp_broadcaster_closed");
    }
}
