use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use transcoder_worker::broker::Broker;
use transcoder_worker::config::Config;
use transcoder_worker::engine::Engine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,transcoder_worker=debug".into()))
        .with(fmt::layer())
        .init();

    let cfg = Config::load().context("failed to load configuration")?;
    tracing::info!(
        listen_queue = %cfg.listen_queue,
        write_queue = %cfg.write_queue,
        transcode_workers = cfg.transcode_workers,
        upload_workers = cfg.upload_workers,
        use_gpu = cfg.use_gpu,
        "starting transcoder worker"
    );

    let broker = Broker::connect(cfg.clone())
        .await
        .context("failed to connect to the broker")?;
    Engine::new(cfg, broker).run().await
}
