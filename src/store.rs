use std::{
    error::Error,
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use log::{info, warn};
use machine_learning::{
    MlErr, Pipeline,
    training::{Trainer, TrainerConfig},
};
use ndarray::Array1;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    config::ServiceConfig,
    error::{Result, ServiceErr},
    schema::{self, FeatureSchema},
    synth::{self, SynthConfig},
};

/// Bumped whenever the layout of `ModelArtifact` or of the pipeline changes.
pub const FORMAT_VERSION: u32 = 2;

/// The settings a model was trained with, a cached model is only reused under the same ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub seed: u64,
    pub samples: usize,
    pub n_trees: usize,
    pub test_fraction: f64,
}

impl TrainingParams {
    pub fn new(synth: &SynthConfig, trainer: &TrainerConfig) -> Self {
        Self {
            seed: synth.seed,
            samples: synth.samples,
            n_trees: trainer.n_trees,
            test_fraction: trainer.test_fraction,
        }
    }
}

impl fmt::Display for TrainingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seed={} samples={} n_trees={} test_fraction={}",
            self.seed, self.samples, self.n_trees, self.test_fraction
        )
    }
}

/// The document cached on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub params: TrainingParams,
    pub algorithm: String,
    pub r2: f64,
    pub schema: FeatureSchema,
    pub pipeline: Pipeline,
}

#[derive(Deserialize)]
struct VersionHeader {
    format_version: u32,
}

/// Why a cached model couldn't be used.
#[derive(Debug)]
pub enum LoadErr {
    Absent(PathBuf),
    Io(io::Error),
    Corrupt(serde_json::Error),
    /// The document parses but the model in it can't be served.
    Invalid(MlErr),
    IncompatibleFormat { found: u32, expected: u32 },
    StaleParameters {
        cached: TrainingParams,
        configured: TrainingParams,
    },
}

impl fmt::Display for LoadErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent(path) => write!(f, "no model at {}", path.display()),
            Self::Io(e) => write!(f, "failed to read the model: {e}"),
            Self::Corrupt(e) => write!(f, "malformed model: {e}"),
            Self::Invalid(e) => write!(f, "inconsistent model: {e}"),
            Self::IncompatibleFormat { found, expected } => {
                write!(f, "model format {found} is not supported, expected {expected}")
            }
            Self::StaleParameters { cached, configured } => {
                write!(f, "model was trained with {cached}, configured {configured}")
            }
        }
    }
}

impl Error for LoadErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Corrupt(e) => Some(e),
            Self::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LoadErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Corrupt(value)
    }
}

/// How the served model came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelOrigin {
    Loaded,
    Trained,
}

/// A model ready to serve predictions.
#[derive(Debug)]
pub struct ReadyModel {
    pub pipeline: Pipeline,
    pub schema: FeatureSchema,
    pub algorithm: String,
    pub r2: f64,
    pub origin: ModelOrigin,
}

impl ReadyModel {
    fn from_artifact(artifact: ModelArtifact, origin: ModelOrigin) -> Self {
        Self {
            pipeline: artifact.pipeline,
            schema: artifact.schema,
            algorithm: artifact.algorithm,
            r2: artifact.r2,
            origin,
        }
    }
}

/// Holds the single model of the service.
///
/// The model is set at most once, by `ensure_ready`, and is read-only afterwards, so any
/// amount of concurrent requests may read it.
pub struct ModelStore {
    path: PathBuf,
    synth: SynthConfig,
    trainer: TrainerConfig,
    ready: OnceLock<ReadyModel>,
    init: Mutex<()>,
}

impl ModelStore {
    /// Creates a new, not yet ready, `ModelStore`.
    ///
    /// # Arguments
    /// * `path` - Where the model is cached.
    /// * `synth` - The dataset to train on when there's no usable cache.
    /// * `trainer` - The model selection parameters.
    pub fn new(path: impl Into<PathBuf>, synth: SynthConfig, trainer: TrainerConfig) -> Self {
        Self {
            path: path.into(),
            synth,
            trainer,
            ready: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.model_path.clone(), config.synth, config.trainer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Makes the model available, loading it from the cache or training it from scratch.
    ///
    /// A missing, unreadable, malformed or outdated cache leads to retraining. A freshly trained
    /// model is written back to the cache, failing to do so only loses the cache. Calling this
    /// once the model is ready does nothing.
    ///
    /// # Returns
    /// Whether the model was loaded or trained, or an error if training failed.
    pub fn ensure_ready(&self) -> Result<ModelOrigin> {
        let _guard = self.init.lock();

        if let Some(model) = self.ready.get() {
            return Ok(model.origin);
        }

        let model = match self.load_matching() {
            Ok(artifact) => {
                let algorithm = artifact.algorithm.as_str();
                info!(algorithm = algorithm; "loaded model from {}", self.path.display());
                info!("cached model was trained with {}", artifact.params);
                ReadyModel::from_artifact(artifact, ModelOrigin::Loaded)
            }
            Err(LoadErr::Absent(_)) => {
                info!("no model at {}, training a new one", self.path.display());
                self.train_and_persist()?
            }
            Err(e) => {
                warn!("discarding cached model at {}: {e}", self.path.display());
                self.train_and_persist()?
            }
        };

        let origin = model.origin;
        if self.ready.set(model).is_err() {
            warn!("a model was set concurrently, keeping it");
        }

        Ok(origin)
    }

    pub fn params(&self) -> TrainingParams {
        TrainingParams::new(&self.synth, &self.trainer)
    }

    /// Loads the cached model, as long as it was trained with the configured parameters.
    fn load_matching(&self) -> std::result::Result<ModelArtifact, LoadErr> {
        let artifact = load(&self.path)?;
        let configured = self.params();

        if artifact.params != configured {
            return Err(LoadErr::StaleParameters {
                cached: artifact.params,
                configured,
            });
        }

        Ok(artifact)
    }

    fn train_and_persist(&self) -> Result<ReadyModel> {
        let artifact = self.train()?;

        match save(&self.path, &artifact) {
            Ok(()) => info!("saved model to {}", self.path.display()),
            Err(e) => warn!("failed to save model to {}: {e}", self.path.display()),
        }

        Ok(ReadyModel::from_artifact(artifact, ModelOrigin::Trained))
    }

    fn train(&self) -> Result<ModelArtifact> {
        let records = synth::synthesize(&self.synth);
        info!(samples = records.len(), seed = self.synth.seed; "synthesized dataset");

        let schema = FeatureSchema::from_records(&records)
            .ok_or(ServiceErr::Training(MlErr::EmptyDataset))?;

        let rows: Vec<_> = records.iter().map(|r| r.features.to_row()).collect();
        let y: Array1<f64> = records.iter().map(|r| r.crop_yield).collect();

        let report = Trainer::new(self.trainer)
            .train(&schema::column_layout(), &rows, y.view())
            .map_err(ServiceErr::Training)?;

        Ok(ModelArtifact {
            format_version: FORMAT_VERSION,
            params: self.params(),
            algorithm: report.algorithm().to_string(),
            r2: report.r2(),
            schema,
            pipeline: report.pipeline,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    /// The served model, or `NotReady` before `ensure_ready` succeeded.
    pub fn model(&self) -> Result<&ReadyModel> {
        self.ready.get().ok_or(ServiceErr::NotReady)
    }

    pub fn schema(&self) -> Result<&FeatureSchema> {
        self.model().map(|m| &m.schema)
    }
}

/// Reads a cached model.
///
/// # Arguments
/// * `path` - The file the model was saved to.
///
/// Besides parsing, the pipeline has to be consistent and predict a finite yield for a
/// representative observation of its schema.
///
/// # Returns
/// The model, or why it can't be used.
pub fn load(path: &Path) -> std::result::Result<ModelArtifact, LoadErr> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(LoadErr::Absent(path.to_path_buf()));
        }
        Err(e) => return Err(LoadErr::Io(e)),
    };

    let header: VersionHeader = serde_json::from_slice(&bytes)?;
    if header.format_version != FORMAT_VERSION {
        return Err(LoadErr::IncompatibleFormat {
            found: header.format_version,
            expected: FORMAT_VERSION,
        });
    }

    let artifact: ModelArtifact = serde_json::from_slice(&bytes)?;
    check(&artifact).map_err(LoadErr::Invalid)?;
    Ok(artifact)
}

fn check(artifact: &ModelArtifact) -> machine_learning::Result<()> {
    artifact.pipeline.validate()?;

    let sample = artifact
        .schema
        .representative()
        .ok_or_else(|| MlErr::Malformed {
            what: "feature schema",
            reason: "a categorical field has no categories".into(),
        })?;

    let y = artifact.pipeline.predict(&[sample.to_row()])?;
    if !y.iter().all(|v| v.is_finite()) {
        return Err(MlErr::NonFinite {
            column: "prediction".into(),
        });
    }

    Ok(())
}

/// Writes a model to `path`, replacing any previous one in a single step.
pub fn save(path: &Path, artifact: &ModelArtifact) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let bytes = serde_json::to_vec(artifact).map_err(io::Error::other)?;
    fs::write(&tmp, bytes)?;

    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}
