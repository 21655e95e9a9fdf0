//! Ambient layers: one independently toggled synthesis graph per sound id,
//! all mixed through a shared submix gain.
//!
//! A recipe's graph is rendered once into a [`Texture`] and cached per id;
//! activating a sound plays the cached texture through its own gain.
//! Deactivating removes the entry at once. The few milliseconds of fade-out
//! are copied into an owned tail, so nothing keeps the texture alive.
//!
//! Rendering a texture takes far longer than an audio callback. A realtime
//! host takes a [`TextureJob`] from the manager, renders it without holding
//! the engine, and hands the result back with
//! [`MixerGraphManager::insert_texture`] before toggling.

pub mod recipe;
pub mod recipes;
pub mod texture;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dsp::ramp::SmoothedGain;
use crate::preset::AmbientDescriptor;

use super::volume::{VolumeRange, db_to_gain, to_gain};

pub use recipe::{GraphContext, RecipeTag, SoundGraph, SoundRecipe};
pub use texture::{LoopPlayer, Texture};

/// A live ambient layer.
#[derive(Debug)]
struct MixerEntry {
    player: LoopPlayer,
    gain: SmoothedGain,
}

/// Fade-out of a removed layer, owned outright.
#[derive(Debug)]
struct FadeTail {
    frames: Vec<(f32, f32)>,
    position: usize,
}

impl FadeTail {
    fn next_frame(&mut self) -> (f64, f64) {
        match self.frames.get(self.position) {
            Some(&(l, r)) => {
                self.position += 1;
                (l as f64, r as f64)
            }
            None => (0.0, 0.0),
        }
    }

    fn is_finished(&self) -> bool {
        self.position >= self.frames.len()
    }
}

/// A texture render detached from the manager, safe to run on any thread.
#[derive(Debug, Clone, Copy)]
pub struct TextureJob {
    pub tag: RecipeTag,
    ctx: GraphContext,
    frames: usize,
    crossfade_frames: usize,
}

impl TextureJob {
    pub fn render(self) -> Arc<Texture> {
        let mut graph = self.tag.recipe().build(self.ctx);
        Arc::new(Texture::render(graph.as_mut(), self.frames, self.crossfade_frames))
    }
}

#[derive(Debug)]
struct RegisteredSound {
    tag: RecipeTag,
    seed: u64,
}

#[derive(Debug)]
pub struct MixerGraphManager {
    sounds: HashMap<String, RegisteredSound>,
    cache: HashMap<String, Arc<Texture>>,
    active: BTreeMap<String, MixerEntry>,
    tails: Vec<FadeTail>,
    /// Last control value set per id, re-applied on activation.
    sound_levels: HashMap<String, f64>,
    master: SmoothedGain,
    master_range: VolumeRange,
    sound_range: VolumeRange,
    texture_frames: usize,
    crossfade_frames: usize,
    fade_frames: usize,
    fade_ms: f64,
    smoothing_ms: f64,
    sample_rate: f64,
}

impl MixerGraphManager {
    pub fn new(config: &EngineConfig, descriptors: &[AmbientDescriptor]) -> Self {
        let sounds = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let seed = config.seed.wrapping_add((i as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
                (
                    d.id.clone(),
                    RegisteredSound {
                        tag: d.recipe,
                        seed,
                    },
                )
            })
            .collect();
        MixerGraphManager {
            sounds,
            cache: HashMap::new(),
            active: BTreeMap::new(),
            tails: Vec::new(),
            sound_levels: HashMap::new(),
            master: SmoothedGain::new(
                db_to_gain(config.ambient_initial_db),
                config.gain_smoothing_ms,
                config.sample_rate,
            ),
            master_range: config.ambient_range,
            sound_range: config.sound_range,
            texture_frames: config.secs_to_frames(config.texture_secs),
            crossfade_frames: config.secs_to_frames(config.texture_crossfade_secs),
            fade_frames: config.secs_to_frames(config.toggle_fade_secs),
            fade_ms: config.toggle_fade_secs * 1000.0,
            smoothing_ms: config.gain_smoothing_ms,
            sample_rate: config.sample_rate,
        }
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.sounds.contains_key(id)
    }

    /// Flip one layer; returns whether it is now active. Unknown ids are
    /// ignored and report `false`.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.active.contains_key(id) {
            self.deactivate(id);
            return false;
        }
        match self.texture_for(id) {
            Some(texture) => {
                let target = self.sound_gain(id);
                let mut gain = SmoothedGain::new(0.0, self.fade_ms / 4.0, self.sample_rate);
                gain.set_target(target);
                self.active.insert(
                    id.to_owned(),
                    MixerEntry {
                        player: LoopPlayer::new(texture),
                        gain,
                    },
                );
                debug!(id, "ambient layer on");
                true
            }
            None => {
                warn!(id, "unknown ambient sound ignored");
                false
            }
        }
    }

    fn texture_for(&mut self, id: &str) -> Option<Arc<Texture>> {
        if let Some(texture) = self.cache.get(id) {
            return Some(Arc::clone(texture));
        }
        let texture = self.texture_job(id)?.render();
        self.insert_texture(id, Arc::clone(&texture));
        Some(texture)
    }

    /// The render still needed before `id` can play. `None` for unknown ids
    /// and for ids already cached.
    pub fn texture_job(&self, id: &str) -> Option<TextureJob> {
        if self.cache.contains_key(id) {
            return None;
        }
        let sound = self.sounds.get(id)?;
        Some(TextureJob {
            tag: sound.tag,
            ctx: GraphContext {
                sample_rate: self.sample_rate,
                seed: sound.seed,
            },
            frames: self.texture_frames,
            crossfade_frames: self.crossfade_frames,
        })
    }

    /// Cache a texture rendered elsewhere. An already cached texture wins;
    /// `false` for unknown ids.
    pub fn insert_texture(&mut self, id: &str, texture: Arc<Texture>) -> bool {
        if !self.is_known(id) {
            return false;
        }
        if !self.cache.contains_key(id) {
            info!(id, frames = texture.len(), "ambient texture cached");
            self.cache.insert(id.to_owned(), texture);
        }
        true
    }

    fn deactivate(&mut self, id: &str) {
        let Some(mut entry) = self.active.remove(id) else {
            return;
        };
        let start = entry.gain.current();
        let frames = (0..self.fade_frames)
            .map(|i| {
                let g = start * (1.0 - i as f64 / self.fade_frames as f64);
                let (l, r) = entry.player.next_frame();
                ((l * g) as f32, (r * g) as f32)
            })
            .collect();
        self.tails.push(FadeTail {
            frames,
            position: 0,
        });
        debug!(id, "ambient layer off");
    }

    /// Deactivate every layer.
    pub fn deactivate_all(&mut self) {
        let ids: Vec<String> = self.active.keys().cloned().collect();
        if !ids.is_empty() {
            info!(count = ids.len(), "clearing ambient layers");
        }
        for id in ids {
            self.deactivate(&id);
        }
    }

    pub fn set_master_volume(&mut self, control: f64) {
        self.master.set_target(to_gain(control, self.master_range));
    }

    pub fn master_gain(&self) -> f64 {
        self.master.target()
    }

    /// Set one sound's level. Remembered for sounds not currently playing;
    /// `false` for unknown ids.
    pub fn set_sound_volume(&mut self, id: &str, control: f64) -> bool {
        if !self.is_known(id) {
            warn!(id, "volume for unknown ambient sound ignored");
            return false;
        }
        let control = control.clamp(0.0, 100.0);
        self.sound_levels.insert(id.to_owned(), control);
        let gain = to_gain(control, self.sound_range);
        if let Some(entry) = self.active.get_mut(id) {
            entry.gain = SmoothedGain::new(entry.gain.current(), self.smoothing_ms, self.sample_rate);
            entry.gain.set_target(gain);
        }
        true
    }

    pub fn sound_volume(&self, id: &str) -> Option<f64> {
        self.sound_levels.get(id).copied()
    }

    /// Target gain for `id`; unity until a volume is set.
    pub fn sound_gain(&self, id: &str) -> f64 {
        self.sound_levels
            .get(id)
            .map_or(1.0, |&control| to_gain(control, self.sound_range))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains_key(id)
    }

    /// Active ids in sorted order.
    pub fn active_ids(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }

    pub fn cached_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.cache.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn cached_texture(&self, id: &str) -> Option<&Arc<Texture>> {
        self.cache.get(id)
    }

    pub fn tail_count(&self) -> usize {
        self.tails.len()
    }

    /// Mix active layers and fade tails into the buffers.
    pub fn render_add(&mut self, left: &mut [f64], right: &mut [f64]) {
        if self.active.is_empty() && self.tails.is_empty() {
            // keep the master smoother moving so later layers start at the right level
            for _ in 0..left.len() {
                self.master.next_gain();
            }
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mut sl = 0.0;
            let mut sr = 0.0;
            for entry in self.active.values_mut() {
                let g = entry.gain.next_gain();
                let (el, er) = entry.player.next_frame();
                sl += el * g;
                sr += er * g;
            }
            for tail in &mut self.tails {
                let (tl, tr) = tail.next_frame();
                sl += tl;
                sr += tr;
            }
            let master = self.master.next_gain();
            *l += sl * master;
            *r += sr * master;
        }
        self.tails.retain(|t| !t.is_finished());
    }
}
