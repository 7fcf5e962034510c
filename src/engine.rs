//! The three-stage pipeline engine (spec §4.10): bounded queues hand work
//! between a preparation pool, a transcode pool, and an upload pool.
//! Grounded on `original_source/pkg/handler/handler.go`.

use crate::broker::Broker;
use crate::config::Config;
use crate::error::{ClassifiedError, Internal, InvalidRequest};
use crate::ladder::{find_resolution_format, renditions_up_to};
use crate::models::{Pipeline, Resolution, Stage, StageStatus, TrInfo, UpdatePipelineStage};
use crate::{encode, fetch, layout, mux, probe, storage};
use anyhow::{Context, Result};
use futures::StreamExt;
use lapin::options::BasicAckOptions;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

pub struct Engine {
    cfg: Arc<Config>,
    broker: Arc<Broker>,
}

impl Engine {
    pub fn new(cfg: Config, broker: Broker) -> Self {
        Self {
            cfg: Arc::new(cfg),
            broker: Arc::new(broker),
        }
    }

    pub async fn run(self) -> Result<()> {
        let (prep_tx, prep_rx) = mpsc::channel::<Pipeline>(self.cfg.transcode_workers);
        let (video_tx, video_rx) = mpsc::channel::<TrInfo>(self.cfg.transcode_workers);
        let (file_tx, file_rx) = mpsc::channel::<TrInfo>(self.cfg.upload_workers);

        let prep_rx = Arc::new(Mutex::new(prep_rx));
        let video_rx = Arc::new(Mutex::new(video_rx));
        let file_rx = Arc::new(Mutex::new(file_rx));

        for _ in 0..self.cfg.transcode_workers {
            tokio::spawn(preparation_worker(
                self.cfg.clone(),
                self.broker.clone(),
                prep_rx.clone(),
                video_tx.clone(),
            ));
        }
        for _ in 0..self.cfg.transcode_workers {
            tokio::spawn(transcode_worker(
                self.cfg.clone(),
                self.broker.clone(),
                video_rx.clone(),
                file_tx.clone(),
            ));
        }
        for _ in 0..self.cfg.upload_workers {
            tokio::spawn(upload_worker(self.broker.clone(), file_rx.clone()));
        }

        self.listen(prep_tx).await
    }

    /// Consumes the listen queue, acking each delivery as soon as it is
    /// handed to the preparation queue — not once the job finishes — and
    /// reconnecting with a 5s backoff on consumer errors, matching
    /// `ListenNotifications`.
    async fn listen(&self, prep_tx: mpsc::Sender<Pipeline>) -> Result<()> {
        loop {
            let mut consumer = match self.broker.consume().await {
                Ok(c) => c,
                Err(e) => {
                    error!(error = %e, "failed to start consuming, retrying in 5s");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            while let Some(delivery) = consumer.next().await {
                let delivery = match delivery {
                    Ok(d) => d,
                    Err(e) => {
                        warn!(error = %e, "consumer stream error, reconnecting");
                        break;
                    }
                };

                match serde_json::from_slice::<Pipeline>(&delivery.data) {
                    Ok(pipeline) => {
                        if prep_tx.send(pipeline).await.is_err() {
                            error!("preparation queue closed, stopping consumer");
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "dropping malformed pipeline message");
                    }
                }

                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    warn!(error = %e, "failed to ack delivery");
                }
            }

            info!("consumer connection closed, reconnecting in 5s");
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
    }
}

async fn publish(broker: &Broker, update: &UpdatePipelineStage) {
    if let Err(e) = broker.publish_status(update).await {
        error!(error = %e, job_id = %update.id, "failed to publish status update");
    }
}

async fn publish_failure(broker: &Broker, id: &str, stage: Stage, failure: &ClassifiedError) {
    let mut update = UpdatePipelineStage::pending(id, stage);
    update.status = StageStatus::Fail;
    update.fail_description = failure.description();
    update.error_code = failure.taxonomy.code();
    publish(broker, &update).await;
}

/// Publishes a failure envelope and passes the result through unchanged, so
/// call sites can `?`-propagate a freshly classified `Result` in one line.
async fn propagate<T>(
    broker: &Broker,
    id: &str,
    stage: Stage,
    result: Result<T, ClassifiedError>,
) -> Result<T, ClassifiedError> {
    if let Err(ref failure) = result {
        publish_failure(broker, id, stage, failure).await;
    }
    result
}

async fn preparation_worker(
    cfg: Arc<Config>,
    broker: Arc<Broker>,
    queue: Arc<Mutex<mpsc::Receiver<Pipeline>>>,
    next: mpsc::Sender<TrInfo>,
) {
    loop {
        let pipeline = {
            let mut rx = queue.lock().await;
            match rx.recv().await {
                Some(p) => p,
                None => return,
            }
        };

        if let Err(failure) = prepare(&cfg, &broker, pipeline, &next).await {
            error!(error = %failure.description(), "preparation stage failed");
        }
    }
}

async fn prepare(
    cfg: &Config,
    broker: &Broker,
    pipeline: Pipeline,
    next: &mpsc::Sender<TrInfo>,
) -> Result<(), ClassifiedError> {
    let start = Instant::now();
    publish(broker, &UpdatePipelineStage::pending(&pipeline.id, Stage::Preparation)).await;

    let job_root = propagate(
        broker,
        &pipeline.id,
        Stage::Preparation,
        layout::create_job_tree(&cfg.temp_folder_path, &pipeline.output_key)
            .await
            .internal(),
    )
    .await?;

    let input_path = std::path::Path::new(&cfg.temp_input_path).join(
        std::path::Path::new(&pipeline.input_uri)
            .file_name()
            .unwrap_or_default(),
    );

    propagate(
        broker,
        &pipeline.id,
        Stage::Preparation,
        fetch::download(&pipeline.input_uri, &input_path).await.internal(),
    )
    .await?;

    let video_info = propagate(
        broker,
        &pipeline.id,
        Stage::Preparation,
        probe::probe_video(&cfg.ffprobe, &input_path)
            .await
            .context("source file could not be probed, it may be corrupted")
            .invalid_request(),
    )
    .await?;

    let duration_result = video_info
        .streams
        .iter()
        .find(|s| !s.duration.is_empty())
        .and_then(|s| s.duration.parse::<f64>().ok())
        .ok_or_else(|| anyhow::anyhow!("no stream reported a parseable duration"))
        .internal();
    if duration_result.is_err() {
        let _ = tokio::fs::remove_file(&input_path).await;
    }
    let duration = propagate(broker, &pipeline.id, Stage::Preparation, duration_result).await?;

    let source_width = video_info
        .highest_resolution_stream()
        .map(|s| s.width as u32)
        .unwrap_or(0);

    let format_result = find_resolution_format(source_width)
        .ok_or_else(|| anyhow::anyhow!("source width {source_width} is below the smallest rendition"))
        .internal();
    if format_result.is_err() {
        let _ = tokio::fs::remove_file(&input_path).await;
    }
    let format = propagate(broker, &pipeline.id, Stage::Preparation, format_result).await?;

    let resolutions: Vec<Resolution> = renditions_up_to(format.priority)
        .into_iter()
        .map(|r| Resolution {
            resolution: r.name.to_string(),
            measure: r.measure.to_string(),
            bitrate: r.video_bitrate.to_string(),
        })
        .collect();

    let mut success = UpdatePipelineStage::pending(&pipeline.id, Stage::Preparation);
    success.status = StageStatus::Success;
    success.preparation_duration_ms = start.elapsed().as_millis() as u64;
    success.video_duration = duration;
    success.resolutions = resolutions;
    publish(broker, &success).await;

    let tr_info = TrInfo {
        file_name: pipeline.output_key.clone(),
        input: input_path,
        output: job_root.clone(),
        upload_path: job_root,
        use_gpu: cfg.use_gpu,
        video_info,
        duration,
        resolution: format,
        pipeline,
    };

    let _ = next.send(tr_info).await;
    Ok(())
}

async fn transcode_worker(
    cfg: Arc<Config>,
    broker: Arc<Broker>,
    queue: Arc<Mutex<mpsc::Receiver<TrInfo>>>,
    next: mpsc::Sender<TrInfo>,
) {
    loop {
        let tr_info = {
            let mut rx = queue.lock().await;
            match rx.recv().await {
                Some(t) => t,
                None => return,
            }
        };

        if let Err(failure) = transcode(&cfg, &broker, tr_info, &next).await {
            error!(error = %failure.description(), "transcode stage failed");
        }
    }
}

async fn transcode(
    cfg: &Config,
    broker: &Broker,
    mut tr_info: TrInfo,
    next: &mpsc::Sender<TrInfo>,
) -> Result<(), ClassifiedError> {
    let start = Instant::now();
    let id = tr_info.pipeline.id.clone();
    publish(broker, &UpdatePipelineStage::pending(&id, Stage::Transcode)).await;

    let result = run_transcode(cfg, &mut tr_info).await;
    let _ = tokio::fs::remove_file(&tr_info.input).await;

    if let Err(ref failure) = result {
        publish_failure(broker, &id, Stage::Transcode, failure).await;
    }
    result?;

    let mut success = UpdatePipelineStage::pending(&id, Stage::Transcode);
    success.status = StageStatus::Success;
    success.transcode_duration_ms = start.elapsed().as_millis() as u64;
    publish(broker, &success).await;

    let _ = next.send(tr_info).await;
    Ok(())
}

async fn run_transcode(cfg: &Config, tr_info: &mut TrInfo) -> Result<(), ClassifiedError> {
    let renditions = renditions_up_to(tr_info.resolution.priority);
    encode::encode_hls(&cfg.ffmpeg, tr_info, &renditions)
        .await
        .internal()?;

    let master_playlist = tr_info.output.join("master.m3u8");
    let audio_tracks = mux::audio::add_audio_tracks(
        &cfg.ffmpeg,
        &cfg.ffprobe,
        &tr_info.input,
        &tr_info.output,
        &mut tr_info.pipeline,
        &master_playlist,
    )
    .await
    .internal()?;

    mux::subtitle::add_subtitles(
        &cfg.ffmpeg,
        &cfg.ffprobe,
        &tr_info.input,
        &tr_info.output,
        &mut tr_info.pipeline,
        &master_playlist,
        audio_tracks,
    )
    .await
    .internal()?;

    Ok(())
}

async fn upload_worker(broker: Arc<Broker>, queue: Arc<Mutex<mpsc::Receiver<TrInfo>>>) {
    loop {
        let tr_info = {
            let mut rx = queue.lock().await;
            match rx.recv().await {
                Some(t) => t,
                None => return,
            }
        };

        if let Err(failure) = upload(&broker, tr_info).await {
            error!(error = %failure.description(), "upload stage failed");
        }
    }
}

async fn upload(broker: &Broker, tr_info: TrInfo) -> Result<(), ClassifiedError> {
    let start = Instant::now();
    let id = tr_info.pipeline.id.clone();
    publish(broker, &UpdatePipelineStage::pending(&id, Stage::Upload)).await;

    let result = storage::upload_tree(&tr_info.pipeline, &tr_info.upload_path)
        .await
        .invalid_request();

    if let Err(e) = layout::cleanup(&tr_info.upload_path).await {
        let cleanup_failure =
            ClassifiedError::internal(e.context("failed to clean up job directory after upload"));
        publish_failure(broker, &id, Stage::Upload, &cleanup_failure).await;
    }

    if let Err(ref failure) = result {
        publish_failure(broker, &id, Stage::Upload, failure).await;
    }
    result?;

    let mut success = UpdatePipelineStage::pending(&id, Stage::Upload);
    success.status = StageStatus::Success;
    success.upload_duration_ms = start.elapsed().as_millis() as u64;
    publish(broker, &success).await;
    Ok(())
}
