//! wavesight-render - paint a waveform snapshot to PNG without a window
//!
//! ## Usage
//!
//! ```text
//! wavesight-render <audio-file> <out.png> [options.yaml] [--at SECONDS] [--size WxH]
//! ```
//!
//! Without an options file the user config (`~/.config/wavesight/options.yaml`)
//! is used if present.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use wavesight_core::config::{default_config_path, load_options};
use wavesight_core::{AudioSource, Waveform, WaveformEvent};

struct Args {
    input: String,
    output: PathBuf,
    options: Option<PathBuf>,
    at: f64,
    size: (f32, f32),
}

fn parse_size(value: &str) -> Result<(f32, f32)> {
    let (width, height) = value
        .split_once('x')
        .with_context(|| format!("Invalid size `{}` (expected WxH)", value))?;
    Ok((
        width.parse().with_context(|| format!("Invalid width `{}`", width))?,
        height.parse().with_context(|| format!("Invalid height `{}`", height))?,
    ))
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut at = 0.0;
    let mut size = (1200.0, 160.0);

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--at" => {
                let value = args.next().context("--at needs a value in seconds")?;
                at = value.parse().with_context(|| format!("Invalid position `{}`", value))?;
            }
            "--size" => {
                let value = args.next().context("--size needs a value like 1200x160")?;
                size = parse_size(&value)?;
            }
            _ => positional.push(arg),
        }
    }

    if positional.len() < 2 || positional.len() > 3 {
        bail!("usage: wavesight-render <audio-file> <out.png> [options.yaml] [--at SECONDS] [--size WxH]");
    }

    let mut positional = positional.into_iter();
    Ok(Args {
        input: positional.next().unwrap_or_default(),
        output: positional.next().map(PathBuf::from).unwrap_or_default(),
        options: positional.next().map(PathBuf::from),
        at,
        size,
    })
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    let options_path = args.options.clone().unwrap_or_else(default_config_path);
    let mut options = load_options(&options_path);
    // One-shot render: decode inline so the frame below sees the result
    options.use_worker = false;
    let refresh_delay = Duration::from_millis(options.refresh_delay as u64);

    let mut waveform = Waveform::with_defaults(options)?;
    let failure = Rc::new(RefCell::new(None));
    let sink = failure.clone();
    waveform.on(move |event| match event {
        WaveformEvent::LoadFailed { error } | WaveformEvent::DecodeFailed { error } => {
            *sink.borrow_mut() = Some(error.clone());
        }
        _ => {}
    });

    let now = Instant::now();
    waveform.resize(args.size.0, args.size.1, now);
    waveform.load(AudioSource::Url(args.input.clone()), now)?;
    if let Some(error) = failure.borrow_mut().take() {
        bail!("{}: {}", args.input, error);
    }

    let position = waveform.seek(args.at, now);
    if !waveform.tick(now + refresh_delay) {
        bail!("No frame was due after loading {}", args.input);
    }

    let png = waveform.export_image()?;
    std::fs::write(&args.output, &png)
        .with_context(|| format!("Failed to write {:?}", args.output))?;

    log::info!(
        "Rendered {} ({:.2}s, playhead {:.2}s) to {:?}",
        args.input,
        waveform.duration(),
        position,
        args.output
    );
    waveform.destroy();
    Ok(())
}
