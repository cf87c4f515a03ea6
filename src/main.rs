//! Command-line front end for the text-line generator.
//!
//! # Usage
//!
//! ```bash
//! oar-synth --count 1000 --language en --output out/ \
//!     --dict dicts/en.txt --length 2 --random-length \
//!     --name-format 2 --seed 42
//! ```
//!
//! Text comes from exactly one source: an input file (`--input-file`), a
//! dictionary (`--dict`, the default is `dicts/<language>.txt`), random
//! sequences (`--random-sequences`), blank strings (`--spaces`) or the
//! fonts' own supported characters (`--font-chars`).

use clap::Parser;
use oar_synth::core::{ConfigValidator, GeneratorConfig};
use oar_synth::corpus::{self, CharClasses};
use oar_synth::domain::{BackgroundKind, DistortionKind, Orientation, SampleRequest};
use oar_synth::fonts::{
    CandidatePool, FontStore, GlyphProfileRepository, GlyphSupportResolver, load_fonts,
};
use oar_synth::pipeline::{AugmentationPipeline, NameFormat, SampleWriter, run_batch};
use oar_synth::utils::init_tracing;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "oar-synth")]
#[command(about = "Generate synthetic text-line images for OCR training")]
struct Args {
    /// Directory the images are written to.
    #[arg(long, default_value = "out")]
    output: PathBuf,

    /// Read lines from this file instead of a dictionary.
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    /// Word dictionary, one word per line.
    #[arg(long)]
    dict: Option<PathBuf>,

    /// Language code; picks the default dictionary, fonts and glyph pool.
    #[arg(short, long, default_value = "en")]
    language: String,

    /// Number of samples to generate.
    #[arg(short, long, default_value_t = 1000)]
    count: usize,

    /// Words (or random runs) per sample.
    #[arg(long, default_value_t = 1)]
    length: usize,

    /// Draw the word count from 1..=length.
    #[arg(long)]
    random_length: bool,

    /// Maximum characters kept from an input-file line.
    #[arg(long, default_value_t = 80)]
    max_line_length: usize,

    /// Use random character sequences as text.
    #[arg(long)]
    random_sequences: bool,

    /// Include letters in random sequences.
    #[arg(long)]
    include_letters: bool,

    /// Include digits in random sequences, or insert them into dictionary words.
    #[arg(long)]
    include_numbers: bool,

    /// Include symbols in random sequences, or insert them into dictionary words.
    #[arg(long)]
    include_symbols: bool,

    /// Generate blank strings of 5-75 spaces.
    #[arg(long)]
    spaces: bool,

    /// Generate 1-5 characters each font supports.
    #[arg(long)]
    font_chars: bool,

    /// Text height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Worker threads (defaults to all cores).
    #[arg(short, long)]
    threads: Option<usize>,

    /// Image file extension.
    #[arg(short, long)]
    extension: Option<String>,

    /// Prefix for name format 3.
    #[arg(long)]
    prefix: Option<String>,

    /// Skew angle in degrees.
    #[arg(short, long)]
    skew_angle: Option<f32>,

    /// Draw the skew from [-skew_angle, skew_angle].
    #[arg(long)]
    random_skew: bool,

    /// Gaussian blur sigma override.
    #[arg(long)]
    blur: Option<f32>,

    /// Draw the blur sigma from (0, blur].
    #[arg(long)]
    random_blur: bool,

    /// Disable the blur stage.
    #[arg(long)]
    no_blur: bool,

    /// Background: 0 noise, 1 plain white, 2 quasicrystal, 3 picture.
    #[arg(short, long)]
    background: Option<u8>,

    /// Directory of photographs for picture backgrounds.
    #[arg(long)]
    pictures_dir: Option<PathBuf>,

    /// Distortion: 0 none, 1 sine, 2 cosine, 3 random.
    #[arg(short, long)]
    distortion: Option<u8>,

    /// Distortion axes: 0 vertical, 1 horizontal, 2 both.
    #[arg(long)]
    distortion_orientation: Option<u8>,

    /// File naming: 0 text_id, 1 id_text, 2 id with labels.txt, 3 prefix_id.
    #[arg(short, long)]
    name_format: Option<u8>,

    /// Drop a random band from the top of every sample.
    #[arg(long)]
    random_crop: bool,

    /// Write every intermediate stage next to the output.
    #[arg(long)]
    debug: bool,

    /// Batch seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Font directory (defaults to fonts/<language>).
    #[arg(long)]
    fonts: Option<PathBuf>,

    /// Glyph profile cache file.
    #[arg(long)]
    glyph_cache: Option<PathBuf>,

    /// Directory for the src/tgt bookkeeping logs.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// JSON configuration; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn build_config(args: &Args) -> Result<GeneratorConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::from_json_file(path)?,
        None => GeneratorConfig::default(),
    };

    if let Some(height) = args.height {
        config = config.with_height(height);
    }
    if let Some(angle) = args.skew_angle {
        config = config.with_skew(angle, args.random_skew);
    } else if args.random_skew {
        config.random_skew = true;
    }
    if args.no_blur {
        config.blur = false;
    }
    if let Some(sigma) = args.blur {
        config = config.with_blur(!args.no_blur, sigma, args.random_blur);
    }
    if let Some(code) = args.background {
        let kind = BackgroundKind::from_code(code)
            .ok_or_else(|| format!("unknown background code {}", code))?;
        config = config.with_background(Some(kind));
    }
    if let Some(dir) = &args.pictures_dir {
        config.pictures_dir = Some(dir.clone());
    }
    if args.distortion.is_some() || args.distortion_orientation.is_some() {
        let kind = args
            .distortion
            .map(|code| {
                DistortionKind::from_code(code).ok_or_else(|| format!("unknown distortion code {}", code))
            })
            .transpose()?
            .or(config.distortion);
        let orientation = args
            .distortion_orientation
            .map(|code| {
                Orientation::from_code(code).ok_or_else(|| format!("unknown orientation code {}", code))
            })
            .transpose()?
            .unwrap_or(config.distortion_orientation);
        config = config.with_distortion(kind, orientation);
    }
    if let Some(code) = args.name_format {
        config.output.name_format =
            NameFormat::from_code(code).ok_or_else(|| format!("unknown name format {}", code))?;
    }
    if let Some(extension) = &args.extension {
        config.output.extension = extension.trim_start_matches('.').to_string();
    }
    if let Some(prefix) = &args.prefix {
        config.output.prefix = prefix.clone();
    }
    if args.threads.is_some() {
        config.parallel = config.parallel.with_max_threads(args.threads);
    }
    config.random_crop |= args.random_crop;
    config.debug |= args.debug;
    if args.seed.is_some() {
        config = config.with_seed(args.seed);
    }

    config.validate()?;
    Ok(config)
}

fn build_strings(
    args: &Args,
    fonts: &[PathBuf],
    store: &FontStore,
    profiles: &GlyphProfileRepository,
    rng: &mut StdRng,
) -> Result<Vec<(String, PathBuf)>, Box<dyn std::error::Error>> {
    let font_for = |rng: &mut StdRng| -> Result<PathBuf, Box<dyn std::error::Error>> {
        fonts
            .choose(rng)
            .cloned()
            .ok_or_else(|| "no fonts available".into())
    };

    if args.font_chars {
        let mut pairs = Vec::with_capacity(args.count);
        for _ in 0..args.count {
            let font = font_for(rng)?;
            let handle = store.get(&font)?;
            let profile = profiles.get_or_build(&handle)?;
            let text = corpus::strings_from_profile(&profile, 1, rng)
                .pop()
                .unwrap_or_default();
            pairs.push((text, font));
        }
        return Ok(pairs);
    }

    let strings = if args.spaces {
        corpus::random_space_strings(args.count, rng)
    } else if let Some(path) = &args.input_file {
        corpus::strings_from_file(path, args.count, args.max_line_length, rng)?
    } else if args.random_sequences {
        let classes = CharClasses {
            letters: args.include_letters,
            numbers: args.include_numbers,
            symbols: args.include_symbols,
        };
        corpus::strings_randomly(
            args.length,
            args.random_length,
            args.count,
            classes,
            &args.language,
            rng,
        )
    } else {
        let dict = args
            .dict
            .clone()
            .unwrap_or_else(|| Path::new("dicts").join(format!("{}.txt", args.language)));
        let words = corpus::load_dict(&dict)?;
        if args.include_numbers || args.include_symbols {
            corpus::strings_from_dict_with_random_chars(
                &words,
                args.length,
                args.random_length,
                args.count,
                args.include_numbers,
                args.include_symbols,
                rng,
            )
        } else {
            corpus::strings_from_dict(&words, args.length, args.random_length, args.count, rng)
        }
    };

    strings
        .into_iter()
        .map(|text| font_for(rng).map(|font| (text, font)))
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let mut config = build_config(&args)?;
    let seed = config.seed.unwrap_or_else(rand::random);
    config = config.with_seed(Some(seed));

    let fonts_dir = args
        .fonts
        .clone()
        .unwrap_or_else(|| Path::new("fonts").join(&args.language));
    let fonts = load_fonts(&fonts_dir)?;
    info!("Using {} fonts from {}", fonts.len(), fonts_dir.display());

    let resolver = GlyphSupportResolver::new(config.glyphs.clone());
    let candidates = CandidatePool::for_language(&args.language);
    let profiles = Arc::new(match &args.glyph_cache {
        Some(path) => GlyphProfileRepository::open(path, resolver, candidates),
        None => GlyphProfileRepository::in_memory(resolver, candidates),
    });
    let store = Arc::new(FontStore::new());

    // The corpus draws from its own stream so the batch seed stays untouched.
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5EED_C0A9_u64);
    let pairs = build_strings(&args, &fonts, &store, &profiles, &mut rng)?;
    let requests: Vec<SampleRequest> = pairs
        .into_iter()
        .enumerate()
        .map(|(index, (text, font))| SampleRequest::new(index, text, font))
        .collect();

    let mut writer = SampleWriter::new(&args.output, config.output.clone())?;
    if let Some(dir) = &args.log_dir {
        writer = writer.with_log_dir(dir);
    }
    let pipeline = AugmentationPipeline::new(config, store, profiles)?;

    let report = run_batch(&pipeline, &writer, &requests)?;
    println!("{}", report);
    if report.succeeded() == 0 && report.total() > 0 {
        error!("No sample could be generated");
        return Err("every sample failed".into());
    }
    Ok(())
}
