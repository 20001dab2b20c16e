pub mod config;
pub mod entity;
pub mod key;
pub mod ratio;

pub use config::{CorrectionMethod, PlexType, SiteCompareConfig};
pub use entity::{NamedEntitySet, ScoredEntity};
pub use key::EntityKey;
pub use ratio::Ratio;
