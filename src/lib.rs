pub mod config;
pub mod dataset_csv;
pub mod http_client;
pub mod nflverse;
pub mod normalize;
pub mod play;
pub mod rationale;
pub mod recommend;
pub mod sample_data;
pub mod sheet;
pub mod store;
pub mod strategy;
pub mod workbook_export;

pub use normalize::{IngestOutcome, Normalizer};
pub use play::{PlayRecord, Situation, TaggedPlay};
pub use recommend::{Recommender, Suggestion, recommend};
pub use store::PlayStore;
