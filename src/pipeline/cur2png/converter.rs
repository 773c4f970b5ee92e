// High-level conversion API for Windows cursor to PNG conversion

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{decode_resource, load_resource, png_writer};
use crate::pipeline::cursor_types::{
    BatchReport, ConversionFailure, ConversionResult, ConvertedFile,
};
use crate::pipeline::error::{ConvResult, ConversionError};
use crate::pipeline::fs_ops::{find_cursor_files, mirrored_output_path};

pub const DEFAULT_EXTENSIONS: &[&str] = &["cur", "ani"];
pub const OUTPUT_EXTENSION: &str = "png";

#[derive(Debug, Clone)]
pub struct ConversionOptions {
    pub extensions: Vec<String>,
    /// 0 lets the pool pick from available parallelism.
    pub thread_count: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            thread_count: 0,
        }
    }
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_thread_count(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }
}

/// Reads, decodes and writes one cursor file.
pub fn convert_cursor_file(input_path: &Path, output_path: &Path) -> ConvResult<ConvertedFile> {
    let data = std::fs::read(input_path).map_err(|e| ConversionError::io(input_path, e))?;

    let resource = load_resource(data)?;
    let bitmap = decode_resource(&resource)?;

    png_writer::write_png(&bitmap.image, output_path)?;

    Ok(ConvertedFile {
        source_path: input_path.to_path_buf(),
        output_path: output_path.to_path_buf(),
        width: bitmap.width(),
        height: bitmap.height(),
        hotspot: bitmap.hotspot,
    })
}

/// Turns any error into a failure record.
fn to_result(input_path: &Path, result: ConvResult<ConvertedFile>) -> ConversionResult {
    result.map_err(|e| {
        log::warn!("Failed to convert {}: {}", input_path.display(), e.message());
        ConversionFailure {
            source_path: input_path.to_path_buf(),
            kind: e.kind(),
            message: e.message(),
        }
    })
}

/// A discovered file and the output it maps to. `claimed_by` is set when an
/// earlier file in discovery order already maps to the same output.
struct Job<'a> {
    input: &'a Path,
    output: PathBuf,
    claimed_by: Option<&'a Path>,
}

/// Assigns each output path to the first file that maps to it, so files that
/// differ only by extension never race on one PNG.
fn plan_jobs<'a>(files: &'a [PathBuf], input_root: &Path, output_root: &Path) -> Vec<Job<'a>> {
    let mut owners: HashMap<PathBuf, &'a Path> = HashMap::with_capacity(files.len());
    files
        .iter()
        .map(|input| {
            let output = mirrored_output_path(input, input_root, output_root, OUTPUT_EXTENSION);
            let claimed_by = match owners.get(&output) {
                Some(owner) => Some(*owner),
                None => {
                    owners.insert(output.clone(), input.as_path());
                    None
                }
            };
            Job {
                input,
                output,
                claimed_by,
            }
        })
        .collect()
}

fn run_job(job: &Job<'_>) -> ConversionResult {
    let result = match job.claimed_by {
        Some(owner) => Err(ConversionError::OutputConflict {
            path: job.output.clone(),
            claimed_by: owner.to_path_buf(),
        }),
        None => convert_cursor_file(job.input, &job.output),
    };
    to_result(job.input, result)
}

/// Converts every cursor under `input_root` into a mirrored tree under `output_root`.
///
/// Per-file failures end up in the report. Only a missing input root or a thread
/// pool that cannot be built fail the whole batch. Once `cancel` is set no new
/// files are started; those are counted as skipped. `on_result` receives each
/// result with the number of files finished so far and the total.
pub fn batch_convert<F>(
    input_root: &Path,
    output_root: &Path,
    options: &ConversionOptions,
    cancel: &AtomicBool,
    on_result: F,
) -> Result<BatchReport>
where
    F: Fn(&ConversionResult, usize, usize) + Sync,
{
    if !input_root.is_dir() {
        bail!("Input directory not found: {}", input_root.display());
    }

    let files = find_cursor_files(input_root, &options.extensions);
    log::info!(
        "Found {} cursor file(s) under {}",
        files.len(),
        input_root.display()
    );

    let jobs = plan_jobs(&files, input_root, output_root);
    let total = jobs.len();
    let done = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.thread_count)
        .build()
        .context("Failed to build worker pool")?;

    let results: Vec<Option<ConversionResult>> = pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                let result = run_job(job);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                on_result(&result, finished, total);
                Some(result)
            })
            .collect()
    });

    let mut report = BatchReport::default();
    for result in results {
        match result {
            Some(result) => report.push(result),
            None => report.skipped += 1,
        }
    }

    log::info!(
        "Converted {} file(s), {} failed, {} skipped",
        report.succeeded(),
        report.failed(),
        report.skipped
    );
    Ok(report)
}
