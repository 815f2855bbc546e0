mod export;
mod video;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::*;
use gait_vision::{FrameOutcome, GaitConfig, GaitPipeline, MotionIsolator, PipelineState};
use opencv::prelude::*;

use video::{preview_image, DebugViews, PreviewWindow, StackedWriter, VideoSource};

const WINDOW_NAME: &str = "Gait2Paws. Obtaining animal tracks";
const DEBUG_VIDEO: &str = "rat_walks_output.mp4";
const DISPLAY_WIDTH: i32 = 1280;

fn main() -> anyhow::Result<()> {
    setup_logging();

    let matches = Command::new("gait2paws")
        .version(crate_version!())
        .about("Tracks paw prints in a walking corridor video and plots their contact metric")
        .arg(Arg::new("input").takes_value(true).required(true))
        .arg(
            Arg::new("roi")
                .long("roi")
                .short('r')
                .takes_value(true)
                .help("Region of interest as x,y,w,h"),
        )
        .arg(Arg::new("config").long("config").short('c').takes_value(true))
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .takes_value(true)
                .default_value("."),
        )
        .arg(Arg::new("display").long("display").short('d'))
        .arg(
            Arg::new("save-crops")
                .long("save-crops")
                .takes_value(true)
                .help("Directory for per-step print crops"),
        )
        .get_matches();

    let input = matches.value_of("input").context("Missing input video")?;
    let output = PathBuf::from(matches.value_of("output").unwrap_or("."));
    let display = matches.is_present("display");
    let crops_dir = matches.value_of("save-crops").map(PathBuf::from);

    let mut config = match matches.value_of("config") {
        Some(path) => GaitConfig::load(path)?,
        None => GaitConfig::default(),
    };
    if let Some(roi) = matches.value_of("roi") {
        config.roi = Some(parse_roi(roi)?);
    }

    export::ensure_dir(&output)?;
    if let Some(dir) = &crops_dir {
        export::ensure_dir(dir)?;
    }

    let observations = run(input, config.clone(), &output, display, crops_dir.as_deref())?;
    log::info!("Collected {} paw observations", observations.len());

    export::export_metrics(&observations, &config.metrics, &output)?;

    Ok(())
}

fn run(
    input: &str,
    config: GaitConfig,
    output: &Path,
    display: bool,
    crops_dir: Option<&Path>,
) -> anyhow::Result<Vec<gait_vision::PawObservation>> {
    let mut source = VideoSource::open(input, config.roi)?;
    let mut isolator = MotionIsolator::new(&config.motion)?;
    let mut writer = if config.annotate {
        Some(StackedWriter::create(&output.join(DEBUG_VIDEO), source.fps(), source.roi_size())?)
    } else {
        None
    };

    let annotate = config.annotate;
    let window = if display {
        if !annotate {
            log::info!("Annotations are off, previewing the motion-isolated frame");
        }
        Some(PreviewWindow::open(WINDOW_NAME, DISPLAY_WIDTH)?)
    } else {
        None
    };

    let pipeline = GaitPipeline::new(config);
    let mut state = PipelineState::new();
    let mut skipped = 0usize;

    log::info!("Starting frame loop");
    while let Some(frame) = source.next_frame()? {
        let isolated = isolator.isolate(&frame.image)?;
        let report = pipeline.process_frame(&mut state, &isolated.frame, frame.time_ms)?;

        match report.outcome {
            FrameOutcome::Observed { step } => {
                if let (Some(dir), Some(observation)) = (crops_dir, state.observations().last()) {
                    export::save_crop(dir, observation)?;
                }
                log::debug!("Frame {} produced step {step}", frame.index);
            }
            FrameOutcome::Skipped(reason) => {
                skipped += 1;
                log::debug!("Frame {} skipped: {reason:?}", frame.index);
            }
        }

        let moving = isolated.frame;
        let stacked = match (report.details, report.paws) {
            (Some(details), Some(paws)) => {
                let stacked = DebugViews {
                    original: frame.image,
                    moving: moving.try_clone()?,
                    paws,
                    details,
                }
                .stack(frame.index, frame.time_ms)?;
                if let Some(writer) = writer.as_mut() {
                    writer.write(&stacked)?;
                }
                Some(stacked)
            }
            _ => None,
        };

        if let Some(window) = &window {
            if window.show(preview_image(annotate, stacked.as_ref(), &moving))? {
                log::info!("Interrupted at frame {}", frame.index);
                break;
            }
        }
    }

    log::info!("Frame loop finished, {skipped} frames skipped");

    source.release()?;
    if let Some(writer) = writer {
        writer.release()?;
    }

    Ok(state.into_observations())
}

fn parse_roi(s: &str) -> anyhow::Result<[i32; 4]> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid ROI {s:?}"))?;

    match parts.as_slice() {
        &[x, y, w, h] if w > 0 && h > 0 => Ok([x, y, w, h]),
        _ => anyhow::bail!("ROI must be x,y,w,h with a positive size, got {s:?}"),
    }
}

fn setup_logging() {
    simple_log::quick!();
}
