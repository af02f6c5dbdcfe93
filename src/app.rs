#[cfg(target_os = "windows")]
use std::sync::Arc;
#[cfg(target_os = "windows")]
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use tracing::{error, info};

use crate::audio::AudioConfig;
use crate::audio::backend::{AudioBackend, LinkState};
use crate::audio::handoff::{self, BlockReceiver};
#[cfg(not(target_os = "windows"))]
use crate::audio::synth::SynthBackend as Backend;
#[cfg(target_os = "windows")]
use crate::audio::wasapi::WasapiBackend as Backend;

use crate::graphics::window::WindowDisplay;

use crate::visualisation::VisualiserConfig;
use crate::visualisation::compositor::{Compositor, SystemClock};

pub struct App {
  display: WindowDisplay,
  compositor: Compositor,
  handoff: BlockReceiver,
  audio_handle: Option<JoinHandle<()>>,
  link_handle: Option<JoinHandle<()>>,
  #[cfg(target_os = "windows")]
  stop: Arc<AtomicBool>,
}

impl App {
  pub fn new(audio: AudioConfig, config: VisualiserConfig) -> Result<Self, anyhow::Error> {
    // create window
    let display = WindowDisplay::new(
      "ripple field",
      config.width,
      config.height,
      config.panel_rgb565,
    )
    .inspect_err(|e| {
      error!("display init failed - {}", e);
    })?;

    // create audio backend...
    #[cfg(target_os = "windows")]
    let stop = Arc::new(AtomicBool::new(false));
    #[cfg(target_os = "windows")]
    let audio_backend = Backend::new(audio.clone(), Arc::clone(&stop));
    #[cfg(not(target_os = "windows"))]
    let audio_backend = Backend::new(audio.clone());

    // single slot between capture and analysis
    let (audio_tx, audio_rx) = handoff::single_slot();
    let (link_tx, link_rx) = watch::channel(LinkState::Disconnected);

    // spawn audio capture task
    let audio_handle = tokio::spawn(async move {
      if let Err(e) = audio_backend.run(audio_tx, link_tx).await {
        error!("audio capture error - {}", e);
      }
    });
    let link_handle = tokio::spawn(watch_link(link_rx));

    let compositor = Compositor::new(config, &audio);

    Ok(Self {
      display,
      compositor,
      handoff: audio_rx,
      audio_handle: Some(audio_handle),
      link_handle: Some(link_handle),
      #[cfg(target_os = "windows")]
      stop,
    })
  }

  pub async fn run(&mut self) -> Result<(), anyhow::Error> {
    let clock = SystemClock::new();
    self
      .compositor
      .run(&mut self.handoff, &mut self.display, &clock)
      .await
  }
}

/// Logs audio link transitions as the source reports them.
async fn watch_link(mut link: watch::Receiver<LinkState>) {
  let mut log = LinkLog::default();
  while link.changed().await.is_ok() {
    let state = *link.borrow_and_update();
    info!("{}", log.describe(state));
  }
}

/// Remembers whether audio ever played so a pause can say so.
#[derive(Default)]
struct LinkLog {
  played_audio: bool,
}

impl LinkLog {
  fn describe(&mut self, state: LinkState) -> String {
    match state {
      LinkState::Connected => "audio link connected".to_string(),
      LinkState::Disconnected => "audio link disconnected".to_string(),
      LinkState::Playing => {
        self.played_audio = true;
        "audio started".to_string()
      }
      LinkState::Paused => format!("audio stopped (played before: {})", self.played_audio),
    }
  }
}

impl Drop for App {
  fn drop(&mut self) {
    #[cfg(target_os = "windows")]
    self.stop.store(true, Ordering::Relaxed);
    if let Some(handle) = self.audio_handle.take() {
      handle.abort();
    }
    if let Some(handle) = self.link_handle.take() {
      handle.abort();
    }
  }
}
