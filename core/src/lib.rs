pub mod cli;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod score;
pub mod session;
pub mod storage;
pub mod strava;
pub mod telemetry;
pub mod types;

#[cfg(feature = "python")]
mod py;

pub use error::{ComputationError, CorsaError, Half, InputError, ScoreError};
pub use loader::{load_workout_file, parse_workout_csv, parse_workout_json};
pub use models::{AthleteProfile, CorsaConfig, ScorePolicy, StravaConfig};
pub use score::{score_workout, ScoreCalculator};
pub use session::{analyze_files, analyze_workouts, import_from_source, SessionReport};
pub use storage::{load_config, save_config};
pub use types::{ScoreResult, Workout, WorkoutMeta, WorkoutSample, WorkoutSource};
