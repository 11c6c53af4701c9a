// Authenex Core Services

pub mod chat;
pub mod config_store;
pub mod detection;
pub mod document;
pub mod news;
pub mod providers;
pub mod text_processor;

pub use config_store::*;
pub use providers::*;
pub use text_processor::*;

pub use chat::{ChatService, ModelSelector};
pub use detection::{build_response, score_raw_response, Analyzer, ModelAnalysis, Upload};
pub use document::DocumentError;
pub use news::{NewsCache, NewsCategory, NewsError, NewsService};
