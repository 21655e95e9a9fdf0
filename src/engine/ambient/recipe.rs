//! Recipe registry: each ambient sound id maps to one construction
//! strategy, resolved once when the manager is built.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::recipes;

/// Everything a recipe needs to build its graph.
#[derive(Debug, Clone, Copy)]
pub struct GraphContext {
    pub sample_rate: f64,
    /// Seed for every random source in the graph.
    pub seed: u64,
}

/// A live synthesis graph producing stereo frames.
pub trait SoundGraph: Send {
    fn next_frame(&mut self) -> (f64, f64);
}

/// Builds the graph for one kind of ambient sound.
pub trait SoundRecipe: Send + Sync + fmt::Debug {
    fn tag(&self) -> RecipeTag;
    fn build(&self, ctx: GraphContext) -> Box<dyn SoundGraph>;
}

/// Synthesis recipe named by an ambient descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeTag {
    WhiteNoise,
    PinkNoise,
    BrownNoise,
    Rain,
    OceanWaves,
    Wind,
    Fire,
    Stream,
    TuningForks,
    Forest,
    GentleStream,
}

impl RecipeTag {
    pub const ALL: [RecipeTag; 11] = [
        RecipeTag::WhiteNoise,
        RecipeTag::PinkNoise,
        RecipeTag::BrownNoise,
        RecipeTag::Rain,
        RecipeTag::OceanWaves,
        RecipeTag::Wind,
        RecipeTag::Fire,
        RecipeTag::Stream,
        RecipeTag::TuningForks,
        RecipeTag::Forest,
        RecipeTag::GentleStream,
    ];

    /// The construction strategy for this tag.
    pub fn recipe(self) -> Box<dyn SoundRecipe> {
        use crate::dsp::noise::NoiseColor;
        match self {
            RecipeTag::WhiteNoise => Box::new(recipes::NoiseBed::plain(self, NoiseColor::White)),
            RecipeTag::PinkNoise => Box::new(recipes::NoiseBed::plain(self, NoiseColor::Pink)),
            RecipeTag::BrownNoise => Box::new(recipes::NoiseBed::plain(self, NoiseColor::Brown)),
            RecipeTag::GentleStream => Box::new(recipes::NoiseBed::gentle_stream()),
            RecipeTag::Rain => Box::new(recipes::Rain),
            RecipeTag::OceanWaves => Box::new(recipes::OceanWaves),
            RecipeTag::Wind => Box::new(recipes::SweptNoise::wind()),
            RecipeTag::Stream => Box::new(recipes::SweptNoise::stream()),
            RecipeTag::Fire => Box::new(recipes::Fire),
            RecipeTag::Forest => Box::new(recipes::Forest),
            RecipeTag::TuningForks => Box::new(recipes::TuningForks),
        }
    }
}

impl fmt::Display for RecipeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecipeTag::WhiteNoise => "white_noise",
            RecipeTag::PinkNoise => "pink_noise",
            RecipeTag::BrownNoise => "brown_noise",
            RecipeTag::Rain => "rain",
            RecipeTag::OceanWaves => "ocean_waves",
            RecipeTag::Wind => "wind",
            RecipeTag::Fire => "fire",
            RecipeTag::Stream => "stream",
            RecipeTag::TuningForks => "tuning_forks",
            RecipeTag::Forest => "forest",
            RecipeTag::GentleStream => "gentle_stream",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_resolves_to_its_own_recipe() {
        for tag in RecipeTag::ALL {
            assert_eq!(tag.recipe().tag(), tag, "{tag} resolved to the wrong recipe");
        }
    }

    #[test]
    fn tags_use_snake_case() {
        let json = serde_json::to_string(&RecipeTag::OceanWaves).unwrap();
        assert_eq!(json, "\"ocean_waves\"");
        let tag: RecipeTag = serde_json::from_str("\"tuning_forks\"").unwrap();
        assert_eq!(tag, RecipeTag::TuningForks);
        assert_eq!(tag.to_string(), "tuning_forks");
    }

    #[test]
    fn every_graph_renders_finite_audio() {
        let ctx = GraphContext {
            sample_rate: 44100.0,
            seed: 42,
        };
        for tag in RecipeTag::ALL {
            let mut graph = tag.recipe().build(ctx);
            let mut energy = 0.0;
            for _ in 0..22050 {
                let (l, r) = graph.next_frame();
                assert!(l.is_finite() && r.is_finite(), "{tag} produced a non-finite sample");
                assert!(l.abs() < 4.0 && r.abs() < 4.0, "{tag} is far too loud");
                energy += l * l + r * r;
            }
            assert!(energy > 0.0, "{tag} rendered silence");
        }
    }
}
