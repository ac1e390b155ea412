pub mod config;
pub mod model;
pub mod normalize;
pub mod reconcile;

pub use config::{ConfigError, Settings};
pub use model::{Action, Corpus, NOT_AVAILABLE, Process, Urgency};
pub use normalize::normalize;
pub use reconcile::{ActionUpdate, apply_action_update, reconcile};
