//! Lightweight metrics recorder (JSONL) for the Newton-CG pipeline.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::krylov::Convergence;
use crate::projection::Formulation;

/// `[metrics]` table of a job file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// JSON-lines destination; parent directories are created on demand.
    pub output: Option<PathBuf>,
}

/// Appends one JSON object per line to a shared sink.
pub struct MetricsRecorder {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl MetricsRecorder {
    pub fn create(path: &Path) -> io::Result<Self> {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)?,
            _ => {}
        }
        Ok(Self::from_writer(Box::new(File::create(path)?)))
    }

    pub fn from_writer(sink: Box<dyn Write + Send>) -> Self {
        Self { sink: Mutex::new(sink) }
    }

    /// Write failures are logged, not returned.
    pub fn emit(&self, event: MetricsEvent<'_>) {
        let line = EventEnvelope {
            timestamp_ms: now_millis(),
            event,
        };
        let mut sink = self.sink.lock();
        let written = serde_json::to_writer(&mut *sink, &line)
            .map_err(io::Error::from)
            .and_then(|()| sink.write_all(b"\n"))
            .and_then(|()| sink.flush());
        if let Err(err) = written {
            log::warn!("dropping metrics event: {err}");
        }
    }
}

#[derive(Serialize)]
struct EventEnvelope<'a> {
    timestamp_ms: f64,
    #[serde(flatten)]
    event: MetricsEvent<'a>,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetricsEvent<'a> {
    PipelineStart {
        solver: &'a str,
        formulation: Formulation,
        grid: &'a [usize],
        load_steps: usize,
        newton_tol: f64,
        equil_tol: f64,
        cg_tol: f64,
        maxiter: usize,
    },
    NewtonIteration {
        step: usize,
        iteration: usize,
        residual_norm: f64,
        increment_ratio: f64,
        cg_iterations: usize,
        cg_convergence: Convergence,
        duration_ms: f64,
    },
    LoadStepDone {
        step: usize,
        newton_iterations: usize,
        cg_iterations: usize,
        success: bool,
        duration_ms: f64,
    },
    PipelineDone {
        load_steps: usize,
        total_newton_iterations: usize,
        total_cg_iterations: usize,
        duration_ms: f64,
    },
}

fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

impl MetricsConfig {
    /// `None` when metrics are disabled.
    pub fn build_recorder(&self) -> io::Result<Option<MetricsRecorder>> {
        if !self.enabled {
            return Ok(None);
        }
        let Some(path) = &self.output else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "metrics are enabled but metrics.output is not set",
            ));
        };
        MetricsRecorder::create(path).map(Some)
    }
}
