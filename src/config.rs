use crate::error::{CommandResult, FlowCanvasError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: String,
    /// Lowercase hex SHA-256 of the password.
    pub password_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub page_size: usize,
    pub max_visible_pages: usize,
    pub step_offset_x: f64,
    pub history_utc_offset_minutes: i32,
    pub history_zone_label: String,
    pub http_timeout_ms: u64,
    pub session_ttl_minutes: i64,
    pub database_path: PathBuf,
    pub session_path: PathBuf,
    pub accounts: Vec<Account>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_size: 8,
            max_visible_pages: 5,
            step_offset_x: 86.0,
            history_utc_offset_minutes: 330,
            history_zone_label: "IST".to_string(),
            http_timeout_ms: 30_000,
            session_ttl_minutes: 720,
            database_path: PathBuf::from("flowcanvas.sqlite"),
            session_path: PathBuf::from(".flowcanvas-session.json"),
            accounts: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> CommandResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str::<AppConfig>(&raw)
            .map_err(|error| FlowCanvasError::Validation(format!("invalid config file: {}", error)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CommandResult<()> {
        if self.page_size == 0 {
            return Err(FlowCanvasError::Validation(
                "pageSize must be greater than zero".to_string(),
            ));
        }
        if self.max_visible_pages < 5 {
            return Err(FlowCanvasError::Validation(
                "maxVisiblePages must be at least 5".to_string(),
            ));
        }
        if self.session_ttl_minutes <= 0 {
            return Err(FlowCanvasError::Validation(
                "sessionTtlMinutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.page_size, 8);
        assert_eq!(config.history_zone_label, "IST");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "pageSize": 4, "historyZoneLabel": "UTC" }}"#).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.page_size, 4);
        assert_eq!(config.history_zone_label, "UTC");
        assert_eq!(config.http_timeout_ms, 30_000);
    }

    #[test]
    fn test_load_rejects_zero_page_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "pageSize": 0 }}"#).unwrap();

        let error = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(error, FlowCanvasError::Validation(_)));
    }
}
