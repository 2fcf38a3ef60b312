use crate::core::config::data::Config;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Default)]
pub(crate) struct ConfigCacheState {
    config: Option<Config>,
    modified: Option<SystemTime>,
}

/// Caches the parsed config and re-reads it only when the file's mtime moves.
pub(crate) struct ConfigOrchestrator {
    path: PathBuf,
    state: Mutex<ConfigCacheState>,
}

pub(crate) static CONFIG_ORCHESTRATOR: LazyLock<ConfigOrchestrator> =
    LazyLock::new(|| ConfigOrchestrator::new(Config::get_config_path()));

#[cfg(test)]
pub(crate) static TEST_ORCHESTRATOR: LazyLock<Mutex<Option<ConfigOrchestrator>>> =
    LazyLock::new(|| Mutex::new(None));

impl ConfigOrchestrator {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(ConfigCacheState::default()),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> MutexGuard<'_, ConfigCacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn refresh(&self, state: &mut ConfigCacheState) -> Result<Config, Box<dyn std::error::Error>> {
        let disk_modified = Self::modified_time(&self.path);
        if state.config.is_none() || state.modified != disk_modified {
            let config = Config::load_from_path(&self.path)?;
            state.modified = disk_modified;
            state.config = Some(config);
        }
        Ok(state.config.clone().unwrap_or_default())
    }

    pub(crate) fn load_with_cache(&self) -> Result<Config, Box<dyn std::error::Error>> {
        let mut state = self.state();
        self.refresh(&mut state)
    }

    pub(crate) fn persist(&self, config: Config) -> Result<(), Box<dyn std::error::Error>> {
        config.save_to_path(&self.path)?;
        let mut state = self.state();
        state.modified = Self::modified_time(&self.path);
        state.config = Some(config);
        Ok(())
    }

    pub(crate) fn mutate<F, T>(&self, mutator: F) -> Result<T, Box<dyn std::error::Error>>
    where
        F: FnOnce(&mut Config) -> Result<T, Box<dyn std::error::Error>>,
    {
        let mut working = {
            let mut state = self.state();
            self.refresh(&mut state)?
        };
        let result = mutator(&mut working)?;
        self.persist(working)?;
        Ok(result)
    }

    fn modified_time(path: &Path) -> Option<SystemTime> {
        fs::metadata(path).ok()?.modified().ok()
    }
}

#[cfg(test)]
fn test_orchestrator() -> MutexGuard<'static, Option<ConfigOrchestrator>> {
    TEST_ORCHESTRATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Config {
    #[cfg(not(test))]
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        CONFIG_ORCHESTRATOR.load_with_cache()
    }

    #[cfg(test)]
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        match test_orchestrator().as_ref() {
            Some(orchestrator) => orchestrator.load_with_cache(),
            None => Ok(Config::default()),
        }
    }

    #[cfg(not(test))]
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        CONFIG_ORCHESTRATOR.persist(self.clone())
    }

    #[cfg(test)]
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        match test_orchestrator().as_ref() {
            Some(orchestrator) => orchestrator.persist(self.clone()),
            None => Ok(()),
        }
    }

    #[cfg(not(test))]
    pub fn mutate<F, T>(mutator: F) -> Result<T, Box<dyn std::error::Error>>
    where
        F: FnOnce(&mut Config) -> Result<T, Box<dyn std::error::Error>>,
    {
        CONFIG_ORCHESTRATOR.mutate(mutator)
    }

    #[cfg(test)]
    pub fn mutate<F, T>(mutator: F) -> Result<T, Box<dyn std::error::Error>>
    where
        F: FnOnce(&mut Config) -> Result<T, Box<dyn std::error::Error>>,
    {
        if let Some(orchestrator) = test_orchestrator().as_ref() {
            orchestrator.mutate(mutator)
        } else {
            let mut config = Config::default();
            mutator(&mut config)
        }
    }

    /// Where `load`/`save` read and write.
    #[cfg(not(test))]
    pub fn active_path() -> PathBuf {
        CONFIG_ORCHESTRATOR.path().to_path_buf()
    }

    #[cfg(test)]
    pub fn active_path() -> PathBuf {
        match test_orchestrator().as_ref() {
            Some(orchestrator) => orchestrator.path().to_path_buf(),
            None => CONFIG_ORCHESTRATOR.path().to_path_buf(),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_test_config_path(path: PathBuf) {
        *test_orchestrator() = Some(ConfigOrchestrator::new(path));
    }

    #[cfg(test)]
    pub(crate) fn clear_test_config_override() {
        test_orchestrator().take();
    }
}
