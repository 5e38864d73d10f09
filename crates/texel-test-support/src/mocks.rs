//! Fake converters that follow the working-directory contract.
//!
//! All of them resolve paths against the process working directory, exactly
//! like the real converter, so they only behave when called inside the
//! working-directory critical section.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow, bail};
use texel_convert::Converter;

/// Leading bytes of every artifact written by [`MirrorConverter`].
pub const MIRROR_MAGIC: &[u8] = b"GIF89a;texel-mirror\n";

/// Reversible fake: encode wraps the input, decode unwraps it.
///
/// `photo.png` encodes to `photo.gif`, which decodes to `photo<marker>.png`.
#[derive(Debug, Clone)]
pub struct MirrorConverter {
    marker: String,
}

impl MirrorConverter {
    /// Mirror converter embedding `marker` in decode output names.
    #[must_use]
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Default for MirrorConverter {
    fn default() -> Self {
        Self::with_marker("-recovered")
    }
}

fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

fn file_name(input: &Path) -> anyhow::Result<&str> {
    input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("input has no usable file name"))
}

impl Converter for MirrorConverter {
    fn convert_forward(&self, input: &Path) -> anyhow::Result<PathBuf> {
        let name = file_name(input)?;
        let bytes = fs::read(input).with_context(|| format!("cannot read {name}"))?;
        let (stem, _) = split_name(name);
        let output = format!("{stem}.gif");

        let mut artifact = Vec::with_capacity(MIRROR_MAGIC.len() + name.len() + 1 + bytes.len());
        artifact.extend_from_slice(MIRROR_MAGIC);
        artifact.extend_from_slice(name.as_bytes());
        artifact.push(b'\n');
        artifact.extend_from_slice(&bytes);
        fs::write(&output, artifact).with_context(|| format!("cannot write {output}"))?;
        Ok(PathBuf::from(output))
    }

    fn convert_backward(&self, input: &Path) -> anyhow::Result<()> {
        let name = file_name(input)?;
        let bytes = fs::read(input).with_context(|| format!("cannot read {name}"))?;
        let Some(body) = bytes.strip_prefix(MIRROR_MAGIC) else {
            bail!("not a texel artifact");
        };
        let split = body
            .iter()
            .position(|byte| *byte == b'\n')
            .ok_or_else(|| anyhow!("artifact header is truncated"))?;
        let original = std::str::from_utf8(&body[..split]).context("artifact name is not utf-8")?;
        let output = match split_name(original) {
            (stem, Some(ext)) => format!("{stem}{}.{ext}", self.marker),
            (stem, None) => format!("{stem}{}", self.marker),
        };
        fs::write(&output, &body[split + 1..]).with_context(|| format!("cannot write {output}"))?;
        Ok(())
    }
}

/// Fails every call with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingConverter {
    message: String,
}

impl FailingConverter {
    /// Converter that always fails with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Converter for FailingConverter {
    fn convert_forward(&self, _input: &Path) -> anyhow::Result<PathBuf> {
        Err(anyhow!(self.message.clone()))
    }

    fn convert_backward(&self, _input: &Path) -> anyhow::Result<()> {
        Err(anyhow!(self.message.clone()))
    }
}

/// Succeeds without writing anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentConverter;

impl Converter for SilentConverter {
    fn convert_forward(&self, _input: &Path) -> anyhow::Result<PathBuf> {
        Ok(PathBuf::from("never-written.gif"))
    }

    fn convert_backward(&self, _input: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Wraps a converter and records when each call starts and ends.
///
/// Each call is stretched by `hold` so overlapping calls would be observable.
pub struct OverlapTracker {
    inner: Box<dyn Converter>,
    hold: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    intervals: Mutex<Vec<(Instant, Instant)>>,
}

impl OverlapTracker {
    /// Track calls around `inner`.
    #[must_use]
    pub fn new(inner: impl Converter, hold: Duration) -> Self {
        Self {
            inner: Box::new(inner),
            hold,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            intervals: Mutex::new(Vec::new()),
        }
    }

    /// Completed calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.intervals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Highest number of calls observed in flight at once.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of call pairs whose `[start, end)` intervals intersect.
    #[must_use]
    pub fn overlapping_pairs(&self) -> usize {
        let mut intervals = self
            .intervals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        intervals.sort_by_key(|(start, _)| *start);
        let mut overlaps = 0;
        for (index, (_, end)) in intervals.iter().enumerate() {
            overlaps += intervals[index + 1..]
                .iter()
                .take_while(|(start, _)| start < end)
                .count();
        }
        overlaps
    }

    fn observe<T>(&self, call: impl FnOnce(&dyn Converter) -> T) -> T {
        let started = Instant::now();
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        thread::sleep(self.hold);
        let result = call(self.inner.as_ref());
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.intervals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((started, Instant::now()));
        result
    }
}

impl Converter for OverlapTracker {
    fn convert_forward(&self, input: &Path) -> anyhow::Result<PathBuf> {
        self.observe(|inner| inner.convert_forward(input))
    }

    fn convert_backward(&self, input: &Path) -> anyhow::Result<()> {
        self.observe(|inner| inner.convert_backward(input))
    }
}
