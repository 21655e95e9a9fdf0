//! Pre-rendered ambient textures and the looping player that plays them.

use std::sync::Arc;

use super::recipe::SoundGraph;

/// A stereo loop rendered offline from a recipe graph.
///
/// The graph is rendered `crossfade` frames past the loop length and that
/// overhang is blended into the head, so the sample after the last frame
/// continues the signal the graph would have produced.
#[derive(Debug, Clone)]
pub struct Texture {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Texture {
    pub fn render(graph: &mut dyn SoundGraph, frames: usize, crossfade: usize) -> Self {
        let frames = frames.max(1);
        let crossfade = crossfade.min(frames);
        let total = frames + crossfade;
        let mut left = Vec::with_capacity(total);
        let mut right = Vec::with_capacity(total);
        for _ in 0..total {
            let (l, r) = graph.next_frame();
            left.push(l as f32);
            right.push(r as f32);
        }

        // Equal-power blend: uncorrelated noise keeps its level through the seam.
        for i in 0..crossfade {
            let t = i as f32 / crossfade as f32;
            let (fade_in, fade_out) = (t.sqrt(), (1.0 - t).sqrt());
            left[i] = left[i] * fade_in + left[frames + i] * fade_out;
            right[i] = right[i] * fade_in + right[frames + i] * fade_out;
        }
        left.truncate(frames);
        right.truncate(frames);

        Texture { left, right }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    #[inline]
    pub fn frame(&self, index: usize) -> (f64, f64) {
        (self.left[index] as f64, self.right[index] as f64)
    }
}

/// Plays a shared texture in an endless loop.
#[derive(Debug, Clone)]
pub struct LoopPlayer {
    texture: Arc<Texture>,
    position: usize,
}

impl LoopPlayer {
    pub fn new(texture: Arc<Texture>) -> Self {
        LoopPlayer {
            texture,
            position: 0,
        }
    }

    #[inline]
    pub fn next_frame(&mut self) -> (f64, f64) {
        if self.texture.is_empty() {
            return (0.0, 0.0);
        }
        let frame = self.texture.frame(self.position);
        self.position += 1;
        if self.position >= self.texture.len() {
            self.position = 0;
        }
        frame
    }

    pub fn position(&self) -> usize {
        self.position
    }
}
