use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Everything a pipeline stage can fail with.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("row {row}: {reason}")]
    RowParse { row: usize, reason: String },

    #[error("missing exchange rate for {currency}")]
    MissingRate { currency: String },

    #[error("malformed exchange rate file: {0}")]
    MalformedRateFile(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("cannot append to log {}: {source}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EtlError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EtlError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Discrete steps of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    DownloadRates,
    FetchPage,
    Extract,
    Transform,
    LoadCsv,
    LoadDatabase,
    Query,
    Verify,
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::Setup => "setup",
            Stage::DownloadRates => "download exchange rates",
            Stage::FetchPage => "fetch bank page",
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::LoadCsv => "load CSV",
            Stage::LoadDatabase => "load database",
            Stage::Query => "query",
            Stage::Verify => "verify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage failure as seen by the orchestrator.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: EtlError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: EtlError) -> Self {
        PipelineError { stage, source }
    }
}

/// Tags a stage result with the stage it came from.
pub(crate) trait StageContext<T> {
    fn in_stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T> StageContext<T> for Result<T, EtlError> {
    fn in_stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|source| PipelineError::new(stage, source))
    }
}
