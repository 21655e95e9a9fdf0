//! Concrete ambient recipes. Each builds a small graph from noise beds,
//! filters, modulators and randomized transients.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::recipe::{GraphContext, RecipeTag, SoundGraph, SoundRecipe};
use crate::dsp::envelope::EnvelopeShape;
use crate::dsp::filter::{BiquadFilter, FilterType};
use crate::dsp::modulation::{AutoFilter, Lfo, pan_gains};
use crate::dsp::noise::{Noise, NoiseColor};
use crate::dsp::oscillator::Waveform;
use crate::dsp::percussion::{MembraneHit, NoiseBurst, TriggerClock};
use crate::dsp::voice::Voice;
use crate::engine::volume::db_to_gain;

const C5: f64 = 523.251;
const C6: f64 = 1046.502;

/// Mono noise through an optional fixed low-pass and an optional sweep.
struct Bed {
    noise: Noise,
    lowpass: Option<BiquadFilter>,
    sweep: Option<AutoFilter>,
    gain: f64,
}

impl Bed {
    fn new(color: NoiseColor, level_db: f64, ctx: GraphContext) -> Self {
        Bed {
            noise: Noise::new(color, ctx.seed),
            lowpass: None,
            sweep: None,
            gain: db_to_gain(level_db),
        }
    }

    fn lowpass(mut self, hz: f64, sample_rate: f64) -> Self {
        self.lowpass = Some(BiquadFilter::lowpass(hz, sample_rate));
        self
    }

    fn swept(mut self, sweep: AutoFilter) -> Self {
        self.sweep = Some(sweep);
        self
    }

    #[inline]
    fn next(&mut self) -> f64 {
        let mut x = self.noise.next_sample();
        if let Some(lp) = &mut self.lowpass {
            x = lp.process(x);
        }
        if let Some(sweep) = &mut self.sweep {
            x = sweep.process(x);
        }
        x * self.gain
    }
}

struct BedGraph(Bed);

impl SoundGraph for BedGraph {
    fn next_frame(&mut self) -> (f64, f64) {
        let x = self.0.next();
        (x, x)
    }
}

/// Steady noise, optionally low-passed.
#[derive(Debug, Clone, Copy)]
pub struct NoiseBed {
    tag: RecipeTag,
    color: NoiseColor,
    level_db: f64,
    lowpass_hz: Option<f64>,
}

impl NoiseBed {
    pub fn plain(tag: RecipeTag, color: NoiseColor) -> Self {
        NoiseBed {
            tag,
            color,
            level_db: -18.0,
            lowpass_hz: None,
        }
    }

    pub fn gentle_stream() -> Self {
        NoiseBed {
            tag: RecipeTag::GentleStream,
            color: NoiseColor::Pink,
            level_db: -22.0,
            lowpass_hz: Some(1600.0),
        }
    }
}

impl SoundRecipe for NoiseBed {
    fn tag(&self) -> RecipeTag {
        self.tag
    }

    fn build(&self, ctx: GraphContext) -> Box<dyn SoundGraph> {
        let mut bed = Bed::new(self.color, self.level_db, ctx);
        if let Some(hz) = self.lowpass_hz {
            bed = bed.lowpass(hz, ctx.sample_rate);
        }
        Box::new(BedGraph(bed))
    }
}

/// Noise through an LFO-swept filter.
#[derive(Debug, Clone, Copy)]
pub struct SweptNoise {
    tag: RecipeTag,
    color: NoiseColor,
    level_db: f64,
    rate_hz: f64,
    base_hz: f64,
    octaves: f64,
    depth: f64,
    bandpass_q: Option<f64>,
}

impl SweptNoise {
    pub fn wind() -> Self {
        SweptNoise {
            tag: RecipeTag::Wind,
            color: NoiseColor::Brown,
            level_db: -22.0,
            rate_hz: 2.0,
            base_hz: 300.0,
            octaves: 5.0,
            depth: 1.0,
            bandpass_q: None,
        }
    }

    pub fn stream() -> Self {
        SweptNoise {
            tag: RecipeTag::Stream,
            color: NoiseColor::White,
            level_db: -20.0,
            rate_hz: 1.0,
            base_hz: 1500.0,
            octaves: 2.5,
            depth: 0.8,
            bandpass_q: Some(3.0),
        }
    }
}

impl SoundRecipe for SweptNoise {
    fn tag(&self) -> RecipeTag {
        self.tag
    }

    fn build(&self, ctx: GraphContext) -> Box<dyn SoundGraph> {
        let sweep = match self.bandpass_q {
            Some(q) => AutoFilter::new(
                FilterType::Bandpass,
                self.rate_hz,
                self.base_hz,
                self.octaves,
                ctx.sample_rate,
            )
            .with_q(q),
            None => AutoFilter::new(
                FilterType::Lowpass,
                self.rate_hz,
                self.base_hz,
                self.octaves,
                ctx.sample_rate,
            ),
        }
        .with_depth(self.depth);
        let bed = Bed::new(self.color, self.level_db, ctx).swept(sweep);
        Box::new(BedGraph(bed))
    }
}

/// Pink noise whose level swells like surf.
#[derive(Debug, Clone, Copy)]
pub struct OceanWaves;

struct OceanGraph {
    bed: Bed,
    swell: Lfo,
}

impl SoundGraph for OceanGraph {
    fn next_frame(&mut self) -> (f64, f64) {
        let x = self.bed.next() * db_to_gain(self.swell.next_between(-28.0, -15.0));
        (x, x)
    }
}

impl SoundRecipe for OceanWaves {
    fn tag(&self) -> RecipeTag {
        RecipeTag::OceanWaves
    }

    fn build(&self, ctx: GraphContext) -> Box<dyn SoundGraph> {
        Box::new(OceanGraph {
            bed: Bed::new(NoiseColor::Pink, 0.0, ctx).lowpass(800.0, ctx.sample_rate),
            swell: Lfo::new(0.2, ctx.sample_rate),
        })
    }
}

/// Filtered pink noise with pitched droplets.
#[derive(Debug, Clone, Copy)]
pub struct Rain;

struct RainGraph {
    bed: Bed,
    droplet: MembraneHit,
    clock: TriggerClock,
    droplet_gain: f64,
    rng: StdRng,
}

impl SoundGraph for RainGraph {
    fn next_frame(&mut self) -> (f64, f64) {
        if self.clock.tick(&mut self.rng) {
            // C5 and C6 drawn 2:3
            let pitch = if self.rng.gen_range(0..5) < 2 { C5 } else { C6 };
            let velocity = self.rng.gen_range(0.6..=1.0);
            self.droplet.trigger(pitch, velocity);
        }
        let x = self.bed.next() + self.droplet.next_sample() * self.droplet_gain;
        (x, x)
    }
}

impl SoundRecipe for Rain {
    fn tag(&self) -> RecipeTag {
        RecipeTag::Rain
    }

    fn build(&self, ctx: GraphContext) -> Box<dyn SoundGraph> {
        Box::new(RainGraph {
            bed: Bed::new(NoiseColor::Pink, -20.0, ctx).lowpass(1500.0, ctx.sample_rate),
            droplet: MembraneHit::new(ctx.sample_rate),
            clock: TriggerClock::new(1.0 / 3.0, 0.0, ctx.sample_rate),
            droplet_gain: db_to_gain(-18.0),
            rng: StdRng::seed_from_u64(ctx.seed.wrapping_add(1)),
        })
    }
}

/// Enveloped noise clicks on a humanized grid.
struct Bursts {
    burst: NoiseBurst,
    clock: TriggerClock,
    velocity: (f64, f64),
    gain: f64,
}

impl Bursts {
    #[inline]
    fn next(&mut self, rng: &mut StdRng) -> f64 {
        if self.clock.tick(rng) {
            let (lo, hi) = self.velocity;
            self.burst.trigger(rng.gen_range(lo..=hi));
        }
        self.burst.next_sample() * self.gain
    }
}

struct CracklingGraph {
    bed: Bed,
    bursts: Bursts,
    rng: StdRng,
}

impl SoundGraph for CracklingGraph {
    fn next_frame(&mut self) -> (f64, f64) {
        let x = self.bed.next() + self.bursts.next(&mut self.rng);
        (x, x)
    }
}

/// Low brown rumble with random crackles.
#[derive(Debug, Clone, Copy)]
pub struct Fire;

impl SoundRecipe for Fire {
    fn tag(&self) -> RecipeTag {
        RecipeTag::Fire
    }

    fn build(&self, ctx: GraphContext) -> Box<dyn SoundGraph> {
        let sr = ctx.sample_rate;
        Box::new(CracklingGraph {
            bed: Bed::new(NoiseColor::Brown, -26.0, ctx).lowpass(400.0, sr),
            bursts: Bursts {
                burst: NoiseBurst::new(
                    EnvelopeShape::new(0.005, 0.08, 0.0, 0.1),
                    ctx.seed.wrapping_add(1),
                    sr,
                ),
                clock: TriggerClock::new(0.125, 0.01, sr),
                velocity: (0.0, 1.0),
                gain: db_to_gain(-12.0),
            },
            rng: StdRng::seed_from_u64(ctx.seed.wrapping_add(2)),
        })
    }
}

/// Rustling brown noise with twig snaps.
#[derive(Debug, Clone, Copy)]
pub struct Forest;

impl SoundRecipe for Forest {
    fn tag(&self) -> RecipeTag {
        RecipeTag::Forest
    }

    fn build(&self, ctx: GraphContext) -> Box<dyn SoundGraph> {
        let sr = ctx.sample_rate;
        let rustle = AutoFilter::new(FilterType::Lowpass, 4.0, 200.0, 4.0, sr);
        Box::new(CracklingGraph {
            bed: Bed::new(NoiseColor::Brown, -30.0, ctx).swept(rustle),
            bursts: Bursts {
                burst: NoiseBurst::new(
                    EnvelopeShape::new(0.001, 0.04, 0.0, 0.05),
                    ctx.seed.wrapping_add(1),
                    sr,
                ),
                clock: TriggerClock::new(0.25, 0.0625, sr),
                velocity: (0.5, 1.0),
                gain: db_to_gain(-25.0),
            },
            rng: StdRng::seed_from_u64(ctx.seed.wrapping_add(2)),
        })
    }
}

/// Two slightly detuned forks panned apart; the 1.5 Hz difference beats
/// slowly across the stereo field.
#[derive(Debug, Clone, Copy)]
pub struct TuningForks;

const FORK_PARTIALS: [f64; 5] = [1.0, 0.0, 0.1, 0.0, 0.05];
const FORK_PAN: f64 = 0.8;

struct ForkGraph {
    forks: [Voice; 2],
    pans: [(f64, f64); 2],
    filters: [BiquadFilter; 2],
    clock: TriggerClock,
    gain: f64,
    rng: StdRng,
}

impl SoundGraph for ForkGraph {
    fn next_frame(&mut self) -> (f64, f64) {
        if self.clock.tick(&mut self.rng) {
            self.forks[0].note_on(440.0, 1.0);
            self.forks[1].note_on(441.5, 1.0);
        }
        let mut l = 0.0;
        let mut r = 0.0;
        for (fork, (gl, gr)) in self.forks.iter_mut().zip(self.pans) {
            let x = fork.next_sample();
            l += x * gl;
            r += x * gr;
        }
        (
            self.filters[0].process(l) * self.gain,
            self.filters[1].process(r) * self.gain,
        )
    }
}

impl SoundRecipe for TuningForks {
    fn tag(&self) -> RecipeTag {
        RecipeTag::TuningForks
    }

    fn build(&self, ctx: GraphContext) -> Box<dyn SoundGraph> {
        let sr = ctx.sample_rate;
        let shape = EnvelopeShape::new(0.1, 6.0, 0.1, 8.0);
        let fork = || Voice::new(Waveform::Partials(FORK_PARTIALS.to_vec()), shape, sr);
        Box::new(ForkGraph {
            forks: [fork(), fork()],
            pans: [pan_gains(-FORK_PAN), pan_gains(FORK_PAN)],
            filters: [BiquadFilter::lowpass(10_000.0, sr), BiquadFilter::lowpass(10_000.0, sr)],
            clock: TriggerClock::new(25.0, 0.01, sr),
            gain: db_to_gain(-10.0),
            rng: StdRng::seed_from_u64(ctx.seed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: GraphContext = GraphContext {
        sample_rate: 44100.0,
        seed: 7,
    };

    fn rms(graph: &mut dyn SoundGraph, frames: usize) -> (f64, f64) {
        let (mut l2, mut r2) = (0.0, 0.0);
        for _ in 0..frames {
            let (l, r) = graph.next_frame();
            l2 += l * l;
            r2 += r * r;
        }
        ((l2 / frames as f64).sqrt(), (r2 / frames as f64).sqrt())
    }

    #[test]
    fn same_seed_same_texture() {
        let mut a = Rain.build(CTX);
        let mut b = Rain.build(CTX);
        for _ in 0..10_000 {
            assert_eq!(a.next_frame(), b.next_frame());
        }
    }

    #[test]
    fn gentle_stream_is_quieter_than_white_noise() {
        let mut white = NoiseBed::plain(RecipeTag::WhiteNoise, NoiseColor::White).build(CTX);
        let mut gentle = NoiseBed::gentle_stream().build(CTX);
        let (w, _) = rms(white.as_mut(), 44100);
        let (g, _) = rms(gentle.as_mut(), 44100);
        assert!(g < w, "gentle stream {g} should sit under white noise {w}");
    }

    #[test]
    fn forks_are_spread_across_the_field() {
        let mut forks = TuningForks.build(CTX);
        let (l, r) = rms(forks.as_mut(), 44100);
        assert!(l > 0.01 && r > 0.01);
        // Each fork leans to its own side, but both sides hear both forks.
        assert!((l / r - 1.0).abs() < 0.5);
    }

    #[test]
    fn fire_crackles_over_the_rumble() {
        let mut fire = Fire.build(CTX);
        let peak = (0..44100)
            .map(|_| fire.next_frame().0.abs())
            .fold(0.0_f64, f64::max);
        let mut rumble = BedGraph(Bed::new(NoiseColor::Brown, -26.0, CTX).lowpass(400.0, 44100.0));
        let (rumble, _) = rms(&mut rumble, 44100);
        assert!(peak > rumble * 3.0, "crackles should stand out: peak {peak}, rumble {rumble}");
    }
}
