//! Road Robin detection worker
//!
//! Launched and supervised by `robind`. Initializes the camera, the
//! classifier model host, and the text-to-speech engine; any of those
//! failing is fatal and is reported to the control plane before the
//! process exits nonzero.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use robin_core::events::SystemStatus;
use robin_core::policy::NotificationPolicy;
use robin_core::prelude::*;
use robin_worker::{CommandSpeech, ControlNotifier, DirectoryCamera, ModelProcess};

/// Road Robin detection worker - announces road signs via synthesized speech
#[derive(Parser, Debug)]
#[command(name = "robin-worker")]
#[command(about = "Road sign detection worker", long_about = None)]
struct Args {
    /// Driver display name used in spoken advisories
    #[arg(value_name = "DRIVER_NAME")]
    driver_name: Option<String>,

    /// Control-plane base URL for status notifications
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    control_url: String,

    /// Directory of camera frames (prototype frame source)
    #[arg(long, value_name = "DIR", default_value = "frames")]
    frames: PathBuf,

    /// Classifier model host command (split on whitespace)
    #[arg(long, value_name = "CMD", default_value = "robin-model")]
    model: String,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    robin_core::logging::init("robin-worker")?;

    let args = Args::parse();
    let driver_name = args
        .driver_name
        .unwrap_or_else(|| "Driver".to_string());
    let settings = robin_core::Settings::load()?;

    let notifier = ControlNotifier::new(args.control_url.as_str());
    notifier.system_status(SystemStatus::Starting);

    let (camera, classifier, speech) =
        match initialize(&args.frames, &args.model).await {
            Ok(collaborators) => collaborators,
            Err(e) => {
                let message = format!("System initialization failed: {e}");
                error!("{}", message);
                notifier.error_now(&message).await;
                notifier.system_status_now(SystemStatus::Stopped).await;
                return Err(e.into());
            }
        };

    let policy = NotificationPolicy::new(driver_name.as_str(), &settings, Instant::now());

    // Cooperative shutdown: the loop checks this flag once per frame.
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down gracefully");
            stop_flag.store(true, Ordering::Relaxed);
        }
    });

    info!("Driving aid ready for {}", driver_name);
    robin_worker::run(camera, classifier, speech, notifier, policy, stop).await?;
    Ok(())
}

async fn initialize(
    frames: &PathBuf,
    model: &str,
) -> Result<(DirectoryCamera, ModelProcess, CommandSpeech)> {
    let camera = DirectoryCamera::open(frames)?;

    let mut model_words = model.split_whitespace();
    let program = model_words
        .next()
        .ok_or_else(|| Error::model_unavailable("empty model command"))?;
    let model_args: Vec<String> = model_words.map(str::to_string).collect();
    let classifier = ModelProcess::spawn(program, &model_args).await?;

    let speech = CommandSpeech::locate()?;

    Ok((camera, classifier, speech))
}
