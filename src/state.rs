use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::AppResult;
use crate::repositories::Repositories;
use crate::shopping::ShoppingListService;

/// Everything a command needs, built once at start-up
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub repos: Repositories,
    pub shopping: ShoppingListService,
    pub config: AppConfig,
}

impl AppState {
    pub fn init(config: AppConfig) -> AppResult<Self> {
        let db = Database::open(&config.database_path)?;
        Self::from_database(db, config)
    }

    pub fn from_database(db: Database, config: AppConfig) -> AppResult<Self> {
        db.initialize()?;
        let db = Arc::new(db);
        let repos = Repositories::sqlite(db.clone());
        let shopping = ShoppingListService::from_repositories(&repos);

        Ok(Self {
            db,
            repos,
            shopping,
            config,
        })
    }

    pub fn in_memory() -> AppResult<Self> {
        Self::from_database(Database::open_in_memory()?, AppConfig::default())
    }
}
