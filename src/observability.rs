use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
pub struct Metrics {
    #[serde(skip)]
    start_time: Instant,
    pub rows_cleaned: usize,
    pub rows_shown: usize,
    pub step_durations_ms: BTreeMap<String, u64>,
    pub total_duration_ms: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            rows_cleaned: 0,
            rows_shown: 0,
            step_durations_ms: BTreeMap::new(),
            total_duration_ms: 0,
        }
    }

    pub fn record_step(&mut self, step_name: &str, duration: Duration) {
        self.step_durations_ms
            .insert(step_name.to_string(), duration.as_millis() as u64);
    }

    /// Time a step and record it under `step_name`.
    pub fn time<T>(&mut self, step_name: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.record_step(step_name, started.elapsed());
        out
    }

    pub fn total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn finish(&mut self) {
        self.total_duration_ms = self.total_duration().as_millis() as u64;
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct Lineage {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub input: InputFileStats,
    pub outputs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InputFileStats {
    pub path: String,
    pub hash: String, // SHA256 hex
    pub size_bytes: u64,
}

impl InputFileStats {
    pub fn collect<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            path: path.display().to_string(),
            hash: compute_file_hash(path)?,
            size_bytes: std::fs::metadata(path)?.len(),
        })
    }
}

pub fn compute_file_hash<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let count = file.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
