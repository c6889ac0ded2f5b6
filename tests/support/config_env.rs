use std::{
    path::PathBuf,
    sync::{Mutex, OnceLock},
};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const VARS: [&str; 3] = [
    "VETCARDIO_CONFIG_HOME",
    "VETCARDIO_MODEL_PATH",
    "VETCARDIO_STAGING_DIR",
];

/// Points the app root at a scratch directory and clears path overrides for
/// the guard's lifetime.
pub struct ConfigEnvGuard {
    previous: Vec<(&'static str, Option<String>)>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl ConfigEnvGuard {
    pub fn set_config_home(path: PathBuf) -> Self {
        let lock = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let previous = VARS
            .iter()
            .map(|&key| (key, std::env::var(key).ok()))
            .collect();
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        unsafe {
            std::env::set_var("VETCARDIO_CONFIG_HOME", path);
            std::env::remove_var("VETCARDIO_MODEL_PATH");
            std::env::remove_var("VETCARDIO_STAGING_DIR");
        }
        Self {
            previous,
            _lock: lock,
        }
    }

    /// Set one of the guarded variables; restored on drop.
    pub fn set_var(&self, key: &'static str, value: &str) {
        assert!(VARS.contains(&key), "{key} is not restored by the guard");
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        unsafe {
            std::env::set_var(key, value);
        }
    }
}

impl Drop for ConfigEnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            // SAFETY: tests run under a global lock to prevent concurrent env mutations.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
