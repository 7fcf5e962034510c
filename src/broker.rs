//! AMQP broker adapter (spec §4.9). Grounded on
//! `original_source/pkg/rabbitmq/broker.go`: declares both queues durable,
//! sets prefetch to 1, and on a publish failure reconnects once before
//! retrying — the original panics if that retry still fails, which is not
//! an idiomatic Rust failure mode, so we propagate a `Result` instead and
//! let the caller decide (spec.md §6.3's error-handling design already
//! threads `anyhow::Result` everywhere else).

use crate::config::Config;
use crate::models::UpdatePipelineStage;
use anyhow::{Context, Result};
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct Broker {
    cfg: Config,
    connection: Mutex<Connection>,
    publish_channel: Mutex<Channel>,
}

impl Broker {
    pub async fn connect(cfg: Config) -> Result<Self> {
        let connection = dial(&cfg).await?;
        let publish_channel = open_channel(&connection, &cfg).await?;

        Ok(Self {
            cfg,
            connection: Mutex::new(connection),
            publish_channel: Mutex::new(publish_channel),
        })
    }

    /// Opens a dedicated channel and starts consuming the listen queue. Kept
    /// separate from the publish channel so a long-lived consumer stream
    /// never contends with the mutex-guarded publisher (spec.md §5's note
    /// that one AMQP channel is not safe for concurrent use).
    pub async fn consume(&self) -> Result<Consumer> {
        let connection = self.connection.lock().await;
        let channel = open_channel(&connection, &self.cfg).await?;
        channel
            .basic_consume(
                &self.cfg.listen_queue,
                "transcoder-worker",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .context("failed to start consuming the listen queue")
    }

    /// Publishes a status update, reconnecting and retrying exactly once if
    /// the channel has gone stale (`PublishPipelineStatus`'s retry policy).
    /// Only a closed channel/connection triggers the reconnect, matching the
    /// original's `strings.Contains(err.Error(), "channel/connection is not
    /// open")` gate — any other publish error is returned as-is.
    pub async fn publish_status(&self, update: &UpdatePipelineStage) -> Result<()> {
        let body = serde_json::to_vec_pretty(update).context("failed to serialize status update")?;

        match self.try_publish(&body).await {
            Ok(()) => Ok(()),
            Err(first_err) => {
                if !first_err.to_string().contains("channel/connection is not open") {
                    return Err(first_err);
                }
                warn!(error = %first_err, "publish failed, reconnecting and retrying once");
                self.reconnect().await?;
                self.try_publish(&body)
                    .await
                    .context("publish still failing after reconnect")
            }
        }
    }

    async fn try_publish(&self, body: &[u8]) -> Result<()> {
        let channel = self.publish_channel.lock().await;
        channel
            .basic_publish(
                "",
                &self.cfg.write_queue,
                BasicPublishOptions {
                    mandatory: true,
                    ..Default::default()
                },
                body,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await
            .context("failed to publish status update")?
            .await
            .context("broker did not confirm the publish")?;
        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        let new_connection = dial(&self.cfg).await?;
        let new_channel = open_channel(&new_connection, &self.cfg).await?;

        *self.connection.lock().await = new_connection;
        *self.publish_channel.lock().await = new_channel;
        info!("reconnected to broker");
        Ok(())
    }
}

async fn dial(cfg: &Config) -> Result<Connection> {
    Connection::connect(
        &cfg.amqp_uri(),
        ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio),
    )
    .await
    .context("failed to connect to the broker")
}

async fn open_channel(connection: &Connection, cfg: &Config) -> Result<Channel> {
    let channel = connection
        .create_channel()
        .await
        .context("failed to open a broker channel")?;

    channel
        .queue_declare(
            &cfg.listen_queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("failed to declare listen queue")?;

    channel
        .queue_declare(
            &cfg.write_queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("failed to declare write queue")?;

    channel
        .basic_qos(1, BasicQosOptions::default())
        .await
        .context("failed to set channel QoS")?;

    Ok(channel)
}
