use std::{fs, path::Path};

use serde::{Serialize, Deserialize};
use tokio::time::Duration;

use crate::control::ControllerSettings;

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// REST backend root, e.g. `https://camp.example/api`
    pub api_base_url: String,
    /// local session and campsite cache
    pub database_path: String,
    /// delay between an accepted command and the state re-fetch [ms]
    pub t_reconcile_ms: u64,
    /// delay between a settled command and re-enabling its utility [ms]
    pub t_busy_clear_ms: u64,
    /// device silence after which commands are refused [s]
    pub t_stale: Option<u64>,
    /// HTTP request timeout [s]
    pub t_request: u64
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            api_base_url: "http://127.0.0.1:8080/api".to_string(),
            database_path: "campctl.redb".to_string(),
            t_reconcile_ms: 2500,
            t_busy_clear_ms: 3000,
            t_stale: None,
            t_request: 10
        }
    }
}

impl Configuration {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(serde_json::from_reader(fs::File::open(path)?)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.t_request)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            reconcile_delay: Duration::from_millis(self.t_reconcile_ms),
            busy_clear_delay: Duration::from_millis(self.t_busy_clear_ms),
            stale_after: self.t_stale.map(Duration::from_secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_controller_defaults() {
        let conf = Configuration::default();
        let settings = conf.controller_settings();
        let defaults = ControllerSettings::default();
        assert_eq!(settings.reconcile_delay, defaults.reconcile_delay);
        assert_eq!(settings.busy_clear_delay, defaults.busy_clear_delay);
        assert_eq!(settings.stale_after, None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let conf: Configuration = serde_json::from_str(r#"{ "api_base_url": "https://camp.example/api", "t_stale": 900 }"#).unwrap();
        assert_eq!(conf.api_base_url, "https://camp.example/api");
        assert_eq!(conf.t_reconcile_ms, 2500);
        assert_eq!(conf.controller_settings().stale_after, Some(Duration::from_secs(900)));
    }

    #[test]
    fn load_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campctl.json");
        fs::write(&path, r#"{ "database_path": "/tmp/x.redb", "t_request": 3 }"#).unwrap();

        let conf = Configuration::load(&path).unwrap();
        assert_eq!(conf.database_path, "/tmp/x.redb");
        assert_eq!(conf.request_timeout(), Duration::from_secs(3));
    }
}
