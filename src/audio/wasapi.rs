use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task;

use tracing::{info, warn};

use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0};
use windows::Win32::Media::Audio::{
  AUDCLNT_BUFFERFLAGS_SILENT, AUDCLNT_SHAREMODE_SHARED, AUDCLNT_STREAMFLAGS_EVENTCALLBACK,
  AUDCLNT_STREAMFLAGS_LOOPBACK, IAudioCaptureClient, IAudioClient, IMMDeviceEnumerator,
  MMDeviceEnumerator, eConsole, eRender,
};
use windows::Win32::System::Com::{
  CLSCTX_ALL, COINIT_MULTITHREADED, CoCreateInstance, CoInitializeEx, CoTaskMemFree, CoUninitialize,
};
use windows::Win32::System::Threading::{CreateEventW, WaitForSingleObject};

use crate::audio::AudioConfig;
use crate::audio::backend::{AudioBackend, LinkState, StereoBlock};
use crate::audio::handoff::BlockSender;

pub struct WasapiBackend {
  config: AudioConfig,
  stop: Arc<AtomicBool>,
}

impl WasapiBackend {
  pub fn new(config: AudioConfig, stop: Arc<AtomicBool>) -> Self {
    Self { config, stop }
  }
}

impl AudioBackend for WasapiBackend {
  type Error = anyhow::Error;

  async fn run(self, tx: BlockSender, link: watch::Sender<LinkState>) -> Result<(), Self::Error> {
    task::spawn_blocking(move || capture_loop(self.config, self.stop, tx, &link)).await??;
    Ok(())
  }
}

fn capture_loop(
  config: AudioConfig,
  stop: Arc<AtomicBool>,
  tx: BlockSender,
  link: &watch::Sender<LinkState>,
) -> Result<(), anyhow::Error> {
  unsafe {
    // init com
    CoInitializeEx(None, COINIT_MULTITHREADED).ok()?;
    // create event for audio notifications
    let event_handle = CreateEventW(None, false, false, None)?;
    if event_handle.is_invalid() {
      return Err(anyhow::anyhow!("Failed to create event"));
    }
    // get default loopback device
    let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)?;
    let device = enumerator.GetDefaultAudioEndpoint(eRender, eConsole)?;
    // activate client
    let audio_client: IAudioClient = device.Activate(CLSCTX_ALL, None)?;

    // get mix format
    let pwfx_ptr = audio_client.GetMixFormat()?;
    let pwfx = &*pwfx_ptr;
    let sample_rate = pwfx.nSamplesPerSec;
    let channels = pwfx.nChannels;
    if sample_rate != config.sample_rate {
      warn!(
        "device mixes at {}hz, band edges assume {}hz",
        sample_rate, config.sample_rate
      );
    }

    // 20ms for low latency while maintaining stability
    let hns_buffer = 200_000i64;
    // init with event callback
    audio_client.Initialize(
      AUDCLNT_SHAREMODE_SHARED,
      AUDCLNT_STREAMFLAGS_LOOPBACK | AUDCLNT_STREAMFLAGS_EVENTCALLBACK,
      hns_buffer,
      0,
      pwfx_ptr,
      None,
    )?;
    CoTaskMemFree(Some(pwfx_ptr.cast()));
    // set event handle
    audio_client.SetEventHandle(event_handle)?;
    // get capture client
    let capture_client: IAudioCaptureClient = audio_client.GetService()?;

    link.send_replace(LinkState::Connected);

    // run event loop...
    let result = capture_loop_inner(
      event_handle,
      &audio_client,
      &capture_client,
      config.samples,
      channels,
      stop,
      tx,
      link,
    );
    link.send_replace(LinkState::Disconnected);

    // clean up
    audio_client.Stop()?;
    let _ = CloseHandle(event_handle);
    CoUninitialize();

    info!("wasapi capture stopped...");
    result
  }
}

#[allow(clippy::too_many_arguments)]
fn capture_loop_inner(
  event_handle: HANDLE,
  audio_client: &IAudioClient,
  capture_client: &IAudioCaptureClient,
  block_frames: usize,
  channels: u16,
  stop: Arc<AtomicBool>,
  mut tx: BlockSender,
  link: &watch::Sender<LinkState>,
) -> Result<(), anyhow::Error> {
  unsafe {
    let channels = channels.max(1) as usize;
    // interleaved stereo accumulator, flushed one block at a time
    let mut stereo: Vec<f32> = Vec::with_capacity(block_frames * 4);
    let mut was_silent = true;

    // start streaming
    audio_client.Start()?;
    info!("event driven wasapi capture started...");

    let mut last_process = Instant::now();
    let throttle_duration = Duration::from_micros(4000); // 4ms
    let timeout_ms = 100; // 100ms timeout to check stop flag

    while !stop.load(Ordering::Relaxed) && !tx.is_closed() {
      // wait for audio event or timeout after 100ms
      let wait_result = WaitForSingleObject(event_handle, timeout_ms);

      match wait_result {
        WAIT_OBJECT_0 => {
          // event signaled - check throttle
          let elapsed = last_process.elapsed();
          if elapsed < throttle_duration {
            // too soon, wait remaining time
            std::hint::spin_loop();
            continue;
          }
          last_process = Instant::now();

          // drain all available buffers
          loop {
            let mut data_ptr: *mut u8 = ptr::null_mut();
            let mut frames_avail = 0u32;
            let mut flags = 0u32;

            match capture_client.GetBuffer(&mut data_ptr, &mut frames_avail, &mut flags, None, None)
            {
              Ok(()) => {
                if frames_avail == 0 {
                  break;
                }

                let frames = frames_avail as usize;
                let is_silent = (flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32)) != 0;
                if let Some(state) = LinkState::on_silence(was_silent, is_silent) {
                  link.send_replace(state);
                  was_silent = is_silent;
                }

                if is_silent {
                  stereo.resize(stereo.len() + frames * 2, 0.0);
                } else {
                  let slice =
                    std::slice::from_raw_parts(data_ptr as *const f32, frames * channels);
                  // keep the first two channels, duplicate mono
                  for frame in slice.chunks_exact(channels) {
                    let left = frame[0];
                    let right = frame.get(1).copied().unwrap_or(left);
                    stereo.push(left);
                    stereo.push(right);
                  }
                }

                capture_client.ReleaseBuffer(frames_avail)?;
              }
              Err(_) => break,
            }
          }

          // hand over whole blocks; the slot drops whatever it cannot take
          while stereo.len() >= block_frames * 2 {
            let block = StereoBlock::from_f32(&stereo[..block_frames * 2]);
            stereo.drain(..block_frames * 2);
            tx.offer(block);
          }
        }
        _ => continue, // timeout - check stop flag on next iteration
      }
    }

    Ok(())
  }
}
