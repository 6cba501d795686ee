//! Runtime configuration: explicit flag, then environment, then default
use crate::constants::{DEVICE_ID_ENV, LEDGER_STORAGE_ID, STORE_PATH_ENV};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerConfig {
    pub store_path: PathBuf,
    pub device_id: Option<String>,
}

impl SignerConfig {
    pub fn resolve(store_path: Option<PathBuf>, device_id: Option<String>) -> Self {
        Self {
            store_path: resolve_store_path(store_path),
            device_id: resolve_device_id(device_id),
        }
    }
}

pub fn resolve_store_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(path) = env::var(STORE_PATH_ENV)
        && !path.is_empty()
    {
        return PathBuf::from(path);
    }
    PathBuf::from(format!("./{LEDGER_STORAGE_ID}.json"))
}

pub fn resolve_device_id(explicit: Option<String>) -> Option<String> {
    explicit.or_else(|| env::var(DEVICE_ID_ENV).ok().filter(|id| !id.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn reset_env() {
        unsafe {
            env::remove_var(STORE_PATH_ENV);
            env::remove_var(DEVICE_ID_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_store_path_default() {
        reset_env();
        assert_eq!(
            resolve_store_path(None),
            PathBuf::from("./ledgerStorage.json")
        );
    }

    #[test]
    #[serial]
    fn test_store_path_env() {
        reset_env();
        unsafe { env::set_var(STORE_PATH_ENV, "/tmp/flags.json") };
        assert_eq!(resolve_store_path(None), PathBuf::from("/tmp/flags.json"));
        reset_env();
    }

    #[test]
    #[serial]
    fn test_explicit_wins() {
        reset_env();
        unsafe {
            env::set_var(STORE_PATH_ENV, "/tmp/flags.json");
            env::set_var(DEVICE_ID_ENV, "env-device");
        }
        let config = SignerConfig::resolve(
            Some(PathBuf::from("explicit.json")),
            Some("flag-device".to_string()),
        );
        assert_eq!(config.store_path, PathBuf::from("explicit.json"));
        assert_eq!(config.device_id.as_deref(), Some("flag-device"));
        reset_env();
    }

    #[test]
    #[serial]
    fn test_device_id_env() {
        reset_env();
        assert_eq!(resolve_device_id(None), None);
        unsafe { env::set_var(DEVICE_ID_ENV, "env-device") };
        assert_eq!(resolve_device_id(None).as_deref(), Some("env-device"));
        unsafe { env::set_var(DEVICE_ID_ENV, "") };
        assert_eq!(resolve_device_id(None), None);
        reset_env();
    }
}
