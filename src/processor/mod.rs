//! Per-file tagging: inspect the `smpl` chunks of a WAV file and, when a
//! pitch is given, write a chunk carrying that pitch.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use walkdir::WalkDir;

use crate::analyzer::PitchEstimator;
use crate::audio;
use crate::pitch::Pitch;
use crate::riff::{RiffChunk, RiffFile};
use crate::smpl::{SmplRecord, SMPL_CHUNK_ID};

/// What to do with each file.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Pitch to write; `None` only reports existing chunks
    pub pitch: Option<Pitch>,
    /// Report what would be written without touching the file
    pub dry_run: bool,
    /// Replace an existing `smpl` chunk
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Inspection only
    NoPitch,
    /// File already has a `smpl` chunk and overwriting is off
    SmplExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Written,
    Skipped(SkipReason),
    WouldWrite,
}

/// Outcome counts for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub written: usize,
    pub skipped: usize,
    pub would_write: usize,
    pub failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Written => self.written += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::WouldWrite => self.would_write += 1,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} would write, {} skipped, {} failed",
            self.written, self.would_write, self.skipped, self.failed
        )
    }
}

/// Process a file, or every `.wav` file below a directory.
///
/// A failing file is logged and counted; the remaining files are still
/// processed.
pub fn process_path(
    path: &Path,
    options: &Options,
    estimator: &dyn PitchEstimator,
) -> Result<Summary> {
    if !path.exists() {
        bail!("No such file or directory: {}", path.display());
    }

    let files = if path.is_dir() {
        collect_wav_files(path)
    } else if is_wav(path) {
        vec![path.to_path_buf()]
    } else {
        Vec::new()
    };

    let mut summary = Summary::default();
    for file in &files {
        info!("{}", file.display());
        match process_file(file, options, estimator) {
            Ok(outcome) => summary.record(outcome),
            Err(e) => {
                error!("  {:#}", e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

fn collect_wav_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_wav(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    // Sort for deterministic output
    files.sort();
    files
}

fn is_wav(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with(".wav"))
        .unwrap_or(false)
}

/// Inspect one file and write the requested pitch if the options allow it.
///
/// A malformed first `smpl` chunk is an error rather than being replaced
/// with defaults.
pub fn process_file(
    path: &Path,
    options: &Options,
    estimator: &dyn PitchEstimator,
) -> Result<Outcome> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let riff = RiffFile::parse(&bytes).context("Failed to parse RIFF structure")?;

    let existing: Vec<&RiffChunk> = riff.chunks_with_id(&SMPL_CHUNK_ID).collect();
    info!("  {} smpl chunk(s)", existing.len());

    let record = match existing.first() {
        Some(chunk) => SmplRecord::decode(&chunk.data).context("Failed to decode smpl chunk")?,
        None => SmplRecord::default(),
    };
    for (i, chunk) in existing.iter().enumerate() {
        match SmplRecord::decode(&chunk.data) {
            Ok(decoded) => info!("    [{}] {}", i, Pitch::Device(decoded.device_pitch())),
            Err(e) => warn!("    [{}] {} (dropped on rewrite)", i, e),
        }
    }

    let Some(pitch) = options.pitch else {
        return Ok(Outcome::Skipped(SkipReason::NoPitch));
    };

    let pitch = if pitch.needs_detection() {
        info!("  detect pitch...");
        let (sample_rate, samples) =
            audio::read_samples(&bytes).context("Failed to decode audio")?;
        pitch
            .detect(estimator, &samples, sample_rate)
            .context("Pitch detection failed")?
    } else {
        info!("  specified pitch");
        pitch
    };
    info!("    {}", pitch);

    let record = record.with_device_pitch(pitch.device_pitch()?);

    if !existing.is_empty() && !options.overwrite {
        info!("  don't write (smpl chunk exists)");
        return Ok(Outcome::Skipped(SkipReason::SmplExists));
    }

    let retagged = replace_smpl_chunk(&riff, &record);

    if options.dry_run {
        info!("  would write {}", path.display());
        return Ok(Outcome::WouldWrite);
    }

    info!("  write {}", path.display());
    let out = retagged.to_bytes().context("Failed to serialize RIFF structure")?;
    fs::write(path, out)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(Outcome::Written)
}

/// Chunk list with the first `smpl` chunk replaced by `record` and any later
/// ones dropped. Without an existing chunk the new one goes at the end.
pub fn replace_smpl_chunk(riff: &RiffFile, record: &SmplRecord) -> RiffFile {
    let smpl = RiffChunk::new(SMPL_CHUNK_ID, record.encode());
    let mut added = false;
    let mut chunks = Vec::with_capacity(riff.chunks.len() + 1);

    for chunk in &riff.chunks {
        if chunk.id != SMPL_CHUNK_ID {
            chunks.push(chunk.clone());
        } else if !added {
            chunks.push(smpl.clone());
            added = true;
        }
    }
    if !added {
        chunks.push(smpl);
    }

    RiffFile {
        form_type: riff.form_type,
        chunks,
    }
}
