/// Fields of a model (named categorical or numerical random variables),
/// the values they take and the domains restricting them.
pub mod field;

/// Dense arrays addressed by named categorical axes, used to store categorical
/// probabilities and per-outcome parameters.
pub mod table;

/// Conditional-Gaussian models: the parameter store, the conditioning, marginalization,
/// density and mode engines operating on it, and the model trait they are exposed through.
pub mod prob;

/// Maximum-likelihood estimation of conditional-Gaussian parameters from a sample.
pub mod fit;

/// Tabular samples with typed columns, and their loading from CSV.
pub mod sample;

/// Options of a model: marginalization strategy, mode heuristic and estimation smoothing.
pub mod config;

mod error;

pub use error::{ModelError, Result};

pub use field::{Field, FieldKind, Value, Condition, Operator, Domain};

pub use prob::{Model, CondGaussian, Aggregation};

pub use config::{ModelConfig, Strategy, ModeHeuristic};

pub use sample::Sample;
