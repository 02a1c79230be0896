use log::{debug, info};
use ndarray::{ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use super::CandidateSpec;
use crate::{
    MlErr, Result,
    dataset::train_test_split,
    metrics::{mse, r2_score},
    pipeline::Pipeline,
    preprocessing::{ColumnLayout, FeatureRow},
};

/// Parameters of a model selection run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub seed: u64,
    pub test_fraction: f64,
    pub n_trees: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            n_trees: 100,
        }
    }
}

/// The held-out performance of a single candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub name: String,
    pub r2: f64,
    pub mse: f64,
}

/// The outcome of a model selection run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub pipeline: Pipeline,
    /// Index into `scores` of the selected candidate.
    pub selected: usize,
    pub scores: Vec<CandidateScore>,
}

impl TrainingReport {
    pub fn algorithm(&self) -> &str {
        &self.scores[self.selected].name
    }

    pub fn r2(&self) -> f64 {
        self.scores[self.selected].r2
    }
}

/// Fits every candidate pipeline on a training split and keeps the one that best explains a
/// held-out split.
pub struct Trainer {
    config: TrainerConfig,
    candidates: Vec<CandidateSpec>,
}

impl Trainer {
    /// Creates a new `Trainer` competing the default candidates.
    ///
    /// # Arguments
    /// * `config` - The split and ensemble parameters.
    pub fn new(config: TrainerConfig) -> Self {
        let candidates = Self::default_candidates(&config);
        Self::with_candidates(config, candidates)
    }

    /// Creates a new `Trainer` competing the given candidates, earlier ones win ties.
    pub fn with_candidates(config: TrainerConfig, candidates: Vec<CandidateSpec>) -> Self {
        Self { config, candidates }
    }

    /// An ordinary least squares regression followed by a random forest.
    pub fn default_candidates(config: &TrainerConfig) -> Vec<CandidateSpec> {
        vec![
            CandidateSpec::LinearRegression,
            CandidateSpec::RandomForest {
                n_trees: config.n_trees,
                seed: config.seed,
                max_depth: None,
            },
        ]
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Runs the model selection.
    ///
    /// # Arguments
    /// * `layout` - The columns of the raw records.
    /// * `rows` - Every record of the dataset.
    /// * `y` - The target of every record.
    ///
    /// # Returns
    /// The pipeline of the candidate with the strictly highest held-out R², along with the
    /// scores of all candidates, or an error if the data can't be split or fitted.
    pub fn train(
        &self,
        layout: &ColumnLayout,
        rows: &[FeatureRow],
        y: ArrayView1<f64>,
    ) -> Result<TrainingReport> {
        if rows.len() != y.len() {
            return Err(MlErr::SizeMismatch {
                what: "targets",
                got: y.len(),
                expected: rows.len(),
            });
        }

        let split = train_test_split(rows.len(), self.config.test_fraction, self.config.seed)?;
        let pick = |indices: &[usize]| -> Vec<FeatureRow> {
            indices.iter().map(|&i| rows[i].clone()).collect()
        };

        let (train_rows, test_rows) = (pick(&split.train), pick(&split.test));
        let y_train = y.select(Axis(0), &split.train);
        let y_test = y.select(Axis(0), &split.test);
        debug!(train = train_rows.len(), test = test_rows.len(); "split dataset");

        let mut best: Option<(usize, Pipeline)> = None;
        let mut best_r2 = f64::NEG_INFINITY;
        let mut scores = Vec::with_capacity(self.candidates.len());

        for (i, spec) in self.candidates.iter().enumerate() {
            let name = spec.name();
            let regressor = spec.resolve();
            let pipeline = Pipeline::fit(layout.clone(), regressor, &train_rows, y_train.view())?;
            let y_pred = pipeline.predict(&test_rows)?;

            let r2 = r2_score(y_test.view(), y_pred.view());
            let err = mse(y_test.view(), y_pred.view());
            info!(algorithm = name, r2 = r2, mse = err; "evaluated candidate");

            scores.push(CandidateScore {
                name: name.to_string(),
                r2,
                mse: err,
            });

            if r2 > best_r2 {
                best_r2 = r2;
                best = Some((i, pipeline));
            }
        }

        let (selected, pipeline) = best.ok_or(MlErr::NoCandidates)?;
        info!(algorithm = scores[selected].name.as_str(), r2 = best_r2; "selected model");

        Ok(TrainingReport {
            pipeline,
            selected,
            scores,
        })
    }
}
