pub mod analysis;
pub mod json;
pub mod models;
pub mod service;

pub use models::{create_model, ModelConfig};
pub use service::AnalysisService;

pub mod prelude {
    pub use super::analysis::*;
    pub use super::models::create_model;
    pub use super::service::AnalysisService;
    pub use super::ModelConfig;
    pub use ap_core::{Error, GenerativeModel, Part, Result};
}
