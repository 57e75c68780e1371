use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use bharat_agro::config::DEFAULT_BIND;
use bharat_agro::{server, ModelManager, RuntimeConfig, ServiceConfig};
use clap::Parser;
use log::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Directory holding the model artifacts (defaults to $AGRO_MODELS_DIR, ./Models, or the platform data dir)
    #[arg(short, long)]
    models_dir: Option<PathBuf>,

    /// Refuse to start unless the models directory has a manifest.json
    #[arg(long)]
    verify: bool,

    /// ONNX Runtime threads per inference (0 lets the runtime decide)
    #[arg(long, default_value_t = 1)]
    intra_threads: usize,
}

impl Args {
    fn into_config(self) -> ServiceConfig {
        let mut config = ServiceConfig::default()
            .with_bind(self.bind)
            .with_require_manifest(self.verify)
            .with_runtime_config(RuntimeConfig {
                intra_threads: self.intra_threads,
                ..RuntimeConfig::default()
            });
        if let Some(models_dir) = self.models_dir {
            config = config.with_models_dir(models_dir);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bharat_agro::init_logger();
    let config = Args::parse().into_config();

    info!("=== Starting Bharat Agro API ===");
    let start_time = Instant::now();

    let manager = ModelManager::new(&config.models_dir)
        .with_context(|| format!("opening models directory {:?}", config.models_dir))?;
    if config.require_manifest {
        manager.require_manifest()?;
    }
    let recommender = manager
        .load_recommender(&config.runtime)
        .context("loading models")?;

    info!("=== Models Loaded (took {:.2?}) ===", start_time.elapsed());

    server::serve(&config, Arc::new(recommender)).await?;
    info!("=== Server stopped ===");
    Ok(())
}
