pub mod cli;
pub mod config;
pub mod face;
mod metrics;
pub mod registrar;
pub mod server;
pub mod service;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use face::{EmbeddingExtractor, ExtractError, FaceEmbedder, FaceEmbedding};
pub use registrar::{BatchResult, PersonRegistrar, RegistrarOptions, RegistrationTotals};
pub use service::{EmbeddingResponse, ExtractionService};
pub use store::{CollectionSchema, MemoryCollection, StoreError, VectorCollection};
