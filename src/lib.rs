pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
#[cfg(feature = "realtime")]
pub mod output;
pub mod preset;
pub mod render;
pub mod sequence;

use wasm_bindgen::prelude::*;

pub use crate::config::EngineConfig;
pub use crate::engine::{ContextState, Engine, EngineSnapshot, EngineState, PlaybackMode, StartOutcome};
pub use crate::error::EngineError;
pub use crate::preset::PresetTable;
pub use crate::render::SessionPlan;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the calmwave-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn js_error(err: EngineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn config_for(sample_rate: f64, config_json: Option<String>) -> Result<EngineConfig, EngineError> {
    let mut config = match config_json {
        Some(json) => serde_json::from_str(&json)?,
        None => EngineConfig::default(),
    };
    config.sample_rate = sample_rate;
    config.validate()?;
    Ok(config)
}

/// WASM-exposed engine for an AudioWorklet host.
///
/// The context starts suspended, as browsers require a user gesture before
/// audio may play; call `resume()` from that gesture.
#[wasm_bindgen]
pub struct WasmEngine {
    inner: Engine,
}

#[wasm_bindgen]
impl WasmEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64, config_json: Option<String>) -> Result<WasmEngine, JsValue> {
        let config = config_for(sample_rate, config_json).map_err(js_error)?;
        let inner = Engine::suspended(config, PresetTable::default()).map_err(js_error)?;
        Ok(WasmEngine { inner })
    }

    pub fn resume(&mut self) -> Result<(), JsValue> {
        self.inner.resume().map_err(js_error)
    }

    /// Start a track; returns "started", "deferred" or "ignored".
    pub fn start(&mut self, mode: &str, index: usize) -> Result<String, JsValue> {
        let mode: PlaybackMode = mode.parse().map_err(js_error)?;
        let outcome = self.inner.start(mode, index).map_err(js_error)?;
        Ok(match outcome {
            StartOutcome::Started => "started",
            StartOutcome::Deferred => "deferred",
            StartOutcome::Ignored => "ignored",
        }
        .to_string())
    }

    pub fn stop(&mut self, clear_ambient: bool) {
        self.inner.stop(clear_ambient);
    }

    pub fn pause(&mut self) {
        self.inner.pause();
    }

    #[wasm_bindgen(js_name = toggleAmbient)]
    pub fn toggle_ambient(&mut self, id: &str) -> bool {
        self.inner.toggle_ambient(id)
    }

    #[wasm_bindgen(js_name = setMainVolume)]
    pub fn set_main_volume(&mut self, control: f64) {
        self.inner.set_main_volume(control);
    }

    #[wasm_bindgen(js_name = setAmbientMasterVolume)]
    pub fn set_ambient_master_volume(&mut self, control: f64) {
        self.inner.set_ambient_master_volume(control);
    }

    #[wasm_bindgen(js_name = setAmbientVolume)]
    pub fn set_ambient_volume(&mut self, id: &str, control: f64) -> bool {
        self.inner.set_ambient_volume(id, control)
    }

    #[wasm_bindgen(js_name = setMuted)]
    pub fn set_muted(&mut self, muted: bool) {
        self.inner.set_muted(muted);
    }

    /// Fill one render quantum of planar output.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.inner.render(left, right);
    }

    /// Engine state as a plain JS object.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.snapshot()).map_err(|e| JsValue::from_str(&format!("{e}")))
    }
}

/// WASM-exposed: render a session plan (JSON) to WAV bytes.
#[wasm_bindgen]
pub fn render_session_wav(plan_json: &str, seconds: f64, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    let plan = SessionPlan::from_json(plan_json).map_err(js_error)?;
    let config = config_for(sample_rate as f64, None).map_err(js_error)?;
    render::render_wav(config, PresetTable::default(), &plan, seconds).map_err(js_error)
}
