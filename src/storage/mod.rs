use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use strum::{Display, EnumString};
use time::Duration;

use crate::config::StorageOptions;

mod codec;
mod cookie;

pub use codec::{decode_tasks, encode_tasks, TaskRecord};
pub use cookie::{Cookie, CookieJar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum PersistenceMode {
    CookieJar,
    Memory,
}

/// Where the task list is read from at start-up and written to after every
/// mutation.
pub trait TaskRepository {
    fn load(&self) -> Result<Vec<TaskRecord>>;
    fn save(&mut self, records: &[TaskRecord]) -> Result<()>;
    fn mode(&self) -> PersistenceMode;
}

/// Non-persistent repository. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    inner: Rc<RefCell<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<TaskRecord>,
    saves: usize,
}

impl MemoryRepository {
    pub fn with_records(records: Vec<TaskRecord>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MemoryState { records, saves: 0 })),
        }
    }

    pub fn snapshot(&self) -> Vec<TaskRecord> {
        self.inner.borrow().records.clone()
    }

    pub fn save_count(&self) -> usize {
        self.inner.borrow().saves
    }
}

impl TaskRepository for MemoryRepository {
    fn load(&self) -> Result<Vec<TaskRecord>> {
        Ok(self.snapshot())
    }

    fn save(&mut self, records: &[TaskRecord]) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        state.records = records.to_vec();
        state.saves += 1;
        Ok(())
    }

    fn mode(&self) -> PersistenceMode {
        PersistenceMode::Memory
    }
}

pub struct OpenedStorage {
    pub repository: Box<dyn TaskRepository>,
    /// One-time notice for the user when tasks will not survive a restart.
    pub warning: Option<String>,
}

/// Picks the repository for this run. A jar that cannot be opened degrades to
/// memory mode instead of failing start-up.
pub fn open(options: &StorageOptions) -> OpenedStorage {
    if !options.enabled {
        tracing::info!("task persistence disabled by configuration");
        return OpenedStorage {
            repository: Box::new(MemoryRepository::default()),
            warning: Some("Task storage is disabled; tasks will be lost on exit.".to_string()),
        };
    }

    let max_age = Duration::seconds(options.max_age_secs);
    match CookieJar::open(
        options.jar_path.clone(),
        options.cookie_name.clone(),
        max_age,
    ) {
        Ok(jar) => {
            tracing::debug!(path = %jar.path().display(), "using cookie jar");
            OpenedStorage {
                repository: Box::new(jar),
                warning: None,
            }
        }
        Err(err) => {
            tracing::warn!(?err, "cookie jar unavailable, continuing without persistence");
            OpenedStorage {
                repository: Box::new(MemoryRepository::default()),
                warning: Some(
                    "Persistent storage is unavailable; tasks will be lost on exit.".to_string(),
                ),
            }
        }
    }
}
