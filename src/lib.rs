pub mod analysis;
pub mod api_football;
pub mod audit;
pub mod client;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod form;
pub mod http_cache;
pub mod http_client;
pub mod markets;
pub mod odds_extract;
pub mod payload;
pub mod render;
pub mod score_matrix;
pub mod server;
pub mod team_names;
pub mod value_mode;
