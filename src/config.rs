use std::{env, error::Error, fmt, path::PathBuf, str::FromStr};

use machine_learning::training::TrainerConfig;

use crate::synth::SynthConfig;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MODEL_PATH: &str = "crop_yield_model.json";

/// An environment variable holding a value that can't be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigErr {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}={:?}: {}", self.var, self.value, self.reason)
    }
}

impl Error for ConfigErr {}

/// Everything the service needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Where the trained model is cached between runs.
    pub model_path: PathBuf,
    pub synth: SynthConfig,
    pub trainer: TrainerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            synth: SynthConfig::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigErr> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds the configuration out of a variable lookup, unset variables keep their default.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, if set.
    ///
    /// # Returns
    /// The configuration, or the first variable that couldn't be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigErr>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }

        if let Some(path) = lookup("MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }

        config.port = parse(&lookup, "PORT", config.port)?;
        config.synth.seed = parse(&lookup, "SEED", config.synth.seed)?;
        config.synth.samples = parse(&lookup, "SAMPLES", config.synth.samples)?;
        config.trainer.seed = config.synth.seed;
        config.trainer.n_trees = parse(&lookup, "N_TREES", config.trainer.n_trees)?;
        config.trainer.test_fraction =
            parse(&lookup, "TEST_FRACTION", config.trainer.test_fraction)?;

        if config.trainer.n_trees == 0 {
            return Err(ConfigErr {
                var: "N_TREES",
                value: "0".into(),
                reason: "the forest needs at least one tree".into(),
            });
        }

        Ok(config)
    }

    /// The socket address to listen at.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigErr>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(value) = lookup(var) else {
        return Ok(default);
    };

    match value.trim().parse::<T>() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigErr {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
