pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

use std::sync::Arc;

use tracing::info;

use shared_config::AppConfig;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{DirectoryStore, QueueStore, ScheduleStore};

/// Handles to every entity store, cloned into each cell's state.
#[derive(Clone)]
pub struct Database {
    pub schedules: Arc<dyn ScheduleStore>,
    pub queue: Arc<dyn QueueStore>,
    pub directory: Arc<dyn DirectoryStore>,
}

impl Database {
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            schedules: store.clone(),
            queue: store.clone(),
            directory: store,
        }
    }

    pub async fn connect(config: &AppConfig) -> StoreResult<Self> {
        match &config.redis_url {
            Some(url) => {
                let store = Arc::new(RedisStore::connect(url).await?);
                info!("Using Redis storage backend");
                Ok(Self {
                    schedules: store.clone(),
                    queue: store.clone(),
                    directory: store,
                })
            }
            None => {
                info!("Using in-memory storage backend");
                Ok(Self::in_memory())
            }
        }
    }
}
