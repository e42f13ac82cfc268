// fallacyGuard Core Services

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod detection;

pub use config_store::{AppConfig, ConfigFile, ConfigStore, Dialect};
pub use providers::{ChatResult, ModelGateway, ProviderError};
pub use detection::{
    assemble_outcome,
    normalize_reply,
    DetectionError,
    FallacyDetector,
    NormalizeError,
};
