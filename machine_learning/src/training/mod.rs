mod candidate;
mod trainer;

pub use candidate::CandidateSpec;
pub use trainer::{CandidateScore, Trainer, TrainerConfig, TrainingReport};
