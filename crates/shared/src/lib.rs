pub mod export;
pub mod import;
pub mod measure;
pub mod models;
pub mod overlap;
pub mod tiles;
pub mod wfs;
pub mod workspace;
