mod simulated_rat;

use anyhow::Context;
use clap::*;
use nalgebra::Vector2;
use opencv::{core::Size, prelude::*, videoio::VideoWriter};
use rand::{rngs::StdRng, thread_rng, Rng, SeedableRng};

use simulated_rat::{empty_corridor, SimRat};

fn main() -> anyhow::Result<()> {
    setup_logging();

    let matches = Command::new("gait-simulator")
        .version(crate_version!())
        .about("Renders a synthetic walking corridor video for gait2paws")
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .takes_value(true)
                .default_value("simulated_walk.mp4"),
        )
        .arg(Arg::new("width").long("width").takes_value(true).default_value("1280"))
        .arg(Arg::new("height").long("height").takes_value(true).default_value("480"))
        .arg(Arg::new("fps").long("fps").takes_value(true).default_value("25"))
        .arg(Arg::new("speed").long("speed").takes_value(true).default_value("8"))
        .arg(Arg::new("seed").long("seed").takes_value(true))
        .get_matches();

    let output = matches.value_of("output").unwrap_or("simulated_walk.mp4");
    let width: i32 = parse_arg(&matches, "width")?;
    let height: i32 = parse_arg(&matches, "height")?;
    let fps: f64 = parse_arg(&matches, "fps")?;
    let speed: f64 = parse_arg(&matches, "speed")?;
    let seed: u64 = match matches.value_of("seed") {
        Some(seed) => seed.parse().context("Invalid seed")?,
        None => thread_rng().gen(),
    };

    let size = Size::new(width, height);
    let mut rng = StdRng::seed_from_u64(seed);
    log::info!("Rendering {width}x{height} at {fps} fps with seed {seed}");

    let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
    let mut writer = VideoWriter::new(output, fourcc, fps, size, true)
        .with_context(|| format!("Failed to create video writer {output}"))?;
    if !writer.is_opened()? {
        anyhow::bail!("Video writer {output} could not be opened");
    }

    // Empty corridor first so the background model settles before the body enters.
    let empty = empty_corridor(size)?;
    for _ in 0..(fps as usize) {
        writer.write(&empty)?;
    }

    let mut rat = SimRat::new(Vector2::new(-130.0, height as f64 / 2.0), speed);
    let mut frames = 0usize;
    while rat.visible(size) {
        rat.advance(&mut rng);
        writer.write(&rat.render(size)?)?;
        frames += 1;
    }

    writer.release()?;
    log::info!("Wrote {frames} walking frames to {output}");

    Ok(())
}

fn parse_arg<T>(matches: &ArgMatches, name: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = matches.value_of(name).with_context(|| format!("Missing --{name}"))?;
    raw.parse().with_context(|| format!("Invalid --{name} value {raw:?}"))
}

fn setup_logging() {
    simple_log::quick!();
}
