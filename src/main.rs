#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use tracing::info;

use tracing_subscriber::filter::LevelFilter;

mod app;
mod audio;
mod graphics;
mod visualisation;

use app::App;
use audio::AudioConfig;
use visualisation::VisualiserConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
  tracing_subscriber::fmt()
    .with_max_level(LevelFilter::INFO)
    .with_target(false)
    .init();

  // default config...
  let audio = AudioConfig {
    samples: 512,
    sample_rate: 44_100,
  };
  let config = VisualiserConfig {
    target_fps: 30,
    ..VisualiserConfig::default()
  };

  info!("ripple field spinning up...");

  let mut app = App::new(audio, config)?;
  app.run().await?;

  info!("ripple field spinning down...");
  Ok(())
}
