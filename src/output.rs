//! Realtime playback through the default output device.
//!
//! The engine is shared with the device callback as `Arc<Mutex<Engine>>`;
//! control calls lock it between callbacks. A stream error is a backend
//! failure: the engine cleans up and closes its context.
//!
//! Ambient textures are rendered with the lock released, so a first toggle
//! never holds up the device callback.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::preset::PresetTable;

pub struct AudioOutput {
    engine: Arc<Mutex<Engine>>,
    /// The cpal stream (kept alive for the duration)
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    /// Open the default device and start an engine at its sample rate.
    pub fn open(mut config: EngineConfig, presets: PresetTable) -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Backend("no audio output device available".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| EngineError::Backend(format!("failed to get default output config: {e}")))?;

        let sample_rate = supported.sample_rate().0;
        config.sample_rate = sample_rate as f64;
        let engine = Arc::new(Mutex::new(Engine::new(config, presets)?));

        let stream_config: cpal::StreamConfig = supported.config();
        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, &engine)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, &engine)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, &engine)?,
            other => {
                return Err(EngineError::Backend(format!("unsupported sample format: {other:?}")));
            }
        };
        stream
            .play()
            .map_err(|e| EngineError::Backend(format!("failed to play audio stream: {e}")))?;

        debug!(sample_rate, channels = stream_config.channels, "audio stream started");

        Ok(AudioOutput {
            engine,
            _stream: stream,
            sample_rate,
            channels: stream_config.channels,
        })
    }

    /// Shared handle for control calls.
    pub fn engine(&self) -> Arc<Mutex<Engine>> {
        Arc::clone(&self.engine)
    }

    /// Render `id`'s ambient texture outside the lock and cache it. `false`
    /// for unknown ids.
    pub fn prepare_ambient(&self, id: &str) -> Result<bool, EngineError> {
        let job = {
            let engine = self.lock()?;
            if !engine.ambient().is_known(id) {
                return Ok(false);
            }
            engine.ambient_texture_job(id)
        };
        let Some(job) = job else {
            return Ok(true);
        };
        let texture = job.render();
        debug!(id, frames = texture.len(), "ambient texture prepared off the audio thread");
        Ok(self.lock()?.insert_ambient_texture(id, texture))
    }

    /// Prepare then flip one ambient layer; the lock is only held for the
    /// flip itself.
    pub fn toggle_ambient(&self, id: &str) -> Result<bool, EngineError> {
        if !self.prepare_ambient(id)? {
            return Ok(false);
        }
        Ok(self.lock()?.toggle_ambient(id))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Engine>, EngineError> {
        self.engine
            .lock()
            .map_err(|_| EngineError::Backend("engine lock poisoned".into()))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    engine: &Arc<Mutex<Engine>>,
) -> Result<cpal::Stream, EngineError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let render_engine = Arc::clone(engine);
    let error_engine = Arc::clone(engine);
    let mut left: Vec<f32> = vec![0.0; 4096];
    let mut right: Vec<f32> = vec![0.0; 4096];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                if left.len() < frames {
                    left.resize(frames, 0.0);
                    right.resize(frames, 0.0);
                }
                let (l, r) = (&mut left[..frames], &mut right[..frames]);
                match render_engine.lock() {
                    Ok(mut engine) => engine.render(l, r),
                    Err(_) => {
                        l.fill(0.0);
                        r.fill(0.0);
                    }
                }
                for (i, frame) in data.chunks_exact_mut(channels).enumerate() {
                    for (c, sample) in frame.iter_mut().enumerate() {
                        let value = match (channels, c) {
                            (1, _) => 0.5 * (l[i] + r[i]),
                            (_, 0) => l[i],
                            (_, 1) => r[i],
                            _ => 0.0,
                        };
                        *sample = T::from_sample(value);
                    }
                }
            },
            move |err| {
                error!("audio stream error: {err}");
                if let Ok(mut engine) = error_engine.lock() {
                    engine.fail_backend(err.to_string());
                }
            },
            None,
        )
        .map_err(|e| EngineError::Backend(format!("failed to build audio stream: {e}")))
}
