use argh::FromArgs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use evcam_bridge::batch::BatchParams;
use evcam_bridge::config::Config;
use evcam_bridge::flush::FlushPolicy;
use evcam_bridge::node::{resolve_frame_id, validate_resolution, BridgeNode};
use evcam_bridge::pipeline::Pipeline;
use evcam_bridge::protocol::events_topic;
use evcam_bridge::sensor::EventCamera;
use evcam_bridge::synthetic::SyntheticCamera;
use evcam_bridge::transport::ZenohEventSink;
use zenoh::Wait;

/// Event camera bridge: batches sensor events and publishes them over Zenoh.
#[derive(FromArgs)]
struct Args {
    /// path to bridge configuration file
    #[argh(option, short = 'c', default = "default_config_path()")]
    config: PathBuf,

    /// zenoh endpoint to connect to (peer scouting when omitted)
    #[argh(option, short = 'e')]
    endpoint: Option<String>,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("configs/evcam.yaml")
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    log::info!("Loading config from: {}", args.config.display());
    let config = Config::from_file(&args.config)?;
    config.validate()?;

    let mut zenoh_config = zenoh::Config::default();
    if let Some(endpoint) = &args.endpoint {
        zenoh_config
            .insert_json5("connect/endpoints", &format!("[\"{endpoint}\"]"))
            .map_err(|e| anyhow::anyhow!("Failed to set zenoh endpoint: {e}"))?;
        zenoh_config
            .insert_json5("scouting/multicast/enabled", "false")
            .ok();
        log::info!("Connecting to Zenoh at {endpoint}");
    }
    let session = zenoh::open(zenoh_config)
        .wait()
        .map_err(|e| anyhow::anyhow!("Zenoh open failed: {e}"))?;
    log::info!("Zenoh session established");

    let camera = SyntheticCamera::from_config(&config.sensor);
    let serial = camera.serial();
    let (width, height) = camera.resolution();
    let frame_id = resolve_frame_id(&config.frame_id, &serial);
    let encoder = config.encoding.into();
    validate_resolution(encoder, width, height)?;

    let sink = ZenohEventSink::new(&session, &events_topic(&frame_id))?;
    let params = BatchParams {
        frame_id: frame_id.clone(),
        width,
        height,
        reserve: config.reserve_size(),
        encoder,
        first_sequence: 0,
    };
    let pipeline = Pipeline::new(sink, params, FlushPolicy::new(config.message_time_threshold()));

    let mut node = BridgeNode::new(Box::new(camera), pipeline, frame_id, &config);
    if let Some(path) = &config.bias_file {
        node.apply_bias_file(path)?;
    }

    let running = node.running_flag();
    ctrlc::set_handler(move || {
        log::info!("Shutdown signal received");
        running.store(false, Ordering::Relaxed);
    })?;

    node.run()?;

    let snap = node.counters().snapshot();
    log::info!(
        "Done: {} events in {} messages ({} ON / {} OFF)",
        snap.events_sent,
        snap.msgs_sent,
        snap.events_on,
        snap.events_off
    );

    session
        .close()
        .wait()
        .map_err(|e| anyhow::anyhow!("Zenoh close failed: {e}"))?;

    Ok(())
}
