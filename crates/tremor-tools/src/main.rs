//! Batch corpus statistics over a directory of tremor recordings
//!
//! Walks every CSV in the input directory, decomposes each recording,
//! and writes per-feature normalization bounds as JSON. The default
//! output is plain global min/max; `--robust` switches to IQR-fenced
//! bounds, and `--extreme` widens the fence from 1.5x to 3x.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tremor_core::RecordingStore;
use tremor_dsp::{CorpusAggregator, DecomposeParams, IqrMultiplier};

struct Args {
    input_dir: PathBuf,
    output: PathBuf,
    robust: bool,
    multiplier: IqrMultiplier,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Args> {
    let mut positional = Vec::new();
    let mut robust = false;
    let mut multiplier = IqrMultiplier::Standard;

    for arg in args {
        match arg.as_str() {
            "--robust" => robust = true,
            "--extreme" => {
                robust = true;
                multiplier = IqrMultiplier::Extreme;
            }
            flag if flag.starts_with("--") => bail!("unknown flag: {}", flag),
            _ => positional.push(arg),
        }
    }

    if positional.len() != 2 {
        bail!("usage: tremor-tools <input-dir> <output.json> [--robust] [--extreme]");
    }

    Ok(Args {
        input_dir: PathBuf::from(&positional[0]),
        output: PathBuf::from(&positional[1]),
        robust,
        multiplier,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = parse_args(std::env::args().skip(1))?;

    let store = RecordingStore::new(&args.input_dir);
    let files = store
        .list()
        .with_context(|| format!("reading input directory {}", args.input_dir.display()))?;

    if files.is_empty() {
        bail!("no CSV recordings found in {}", args.input_dir.display());
    }

    let mut aggregator = CorpusAggregator::new(DecomposeParams::default());
    let mut skipped = 0usize;

    for file in &files {
        let recording = match store.load(file) {
            Ok(recording) => recording,
            Err(e) => {
                warn!(file = %file, error = %e, "skipping unreadable recording");
                skipped += 1;
                continue;
            }
        };

        match aggregator.add_recording(&recording) {
            Ok(()) => info!(file = %file, samples = recording.len(), "accumulated"),
            Err(e) => {
                warn!(file = %file, error = %e, "skipping incompatible recording");
                skipped += 1;
            }
        }
    }

    if aggregator.recordings() == 0 {
        bail!("no usable recordings in {}", args.input_dir.display());
    }

    let json = if args.robust {
        serde_json::to_string_pretty(&aggregator.robust(args.multiplier))?
    } else {
        serde_json::to_string_pretty(&aggregator.min_max())?
    };

    fs::write(&args.output, json)
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        recordings = aggregator.recordings(),
        skipped,
        output = %args.output.display(),
        robust = args.robust,
        "stats written"
    );

    Ok(())
}
