pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod lookup;
pub mod rentals;
pub mod students;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::lookup::BookLookup;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub book_lookup: Arc<dyn BookLookup>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, book_lookup: Arc<dyn BookLookup>) -> Self {
        Self {
            config,
            db,
            book_lookup,
        }
    }
}
