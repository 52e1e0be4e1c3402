use std::collections::HashMap;

use crate::app::errors::{AppError, AppResult};

const REQUIRED_FIELDS: [&str; 3] = ["api_key", "auth_domain", "project_id"];

/// Project configuration, usually resolved from an environment-style mapping.
/// Only `api_key`, `auth_domain` and `project_id` are required; the rest is
/// carried through for consumers that want it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirebaseOptions {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub app_id: Option<String>,
    pub database_url: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub measurement_id: Option<String>,
}

fn env_value(env: &HashMap<String, String>, key: &str) -> Option<String> {
    env.get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl FirebaseOptions {
    /// Reads the `FIREBASE_*` keys out of an environment mapping. Empty and
    /// whitespace-only values count as absent.
    pub fn from_env(env: &HashMap<String, String>) -> Self {
        Self {
            api_key: env_value(env, "FIREBASE_API_KEY"),
            auth_domain: env_value(env, "FIREBASE_AUTH_DOMAIN"),
            project_id: env_value(env, "FIREBASE_PROJECT_ID"),
            app_id: env_value(env, "FIREBASE_APP_ID"),
            database_url: env_value(env, "FIREBASE_DATABASE_URL"),
            storage_bucket: env_value(env, "FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: env_value(env, "FIREBASE_MESSAGING_SENDER_ID"),
            measurement_id: env_value(env, "FIREBASE_MEASUREMENT_ID"),
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let present = [
            self.api_key.is_some(),
            self.auth_domain.is_some(),
            self.project_id.is_some(),
        ];
        REQUIRED_FIELDS
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn validate(&self) -> AppResult<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::MissingConfig { missing })
        }
    }
}

/// Knobs the consuming application sets outside the Firebase options proper:
/// the identifier its data is filed under and the root collection segment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirebaseAppSettings {
    pub app_identifier: Option<String>,
    pub collection_root: Option<String>,
}

impl FirebaseAppSettings {
    pub fn from_env(env: &HashMap<String, String>) -> Self {
        Self {
            app_identifier: env_value(env, "APP_ID")
                .or_else(|| env_value(env, "FIREBASE_APP_IDENTIFIER")),
            collection_root: env_value(env, "FIREBASE_COLLECTION_ROOT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn from_env_picks_up_firebase_keys() {
        let env = env(&[
            ("FIREBASE_API_KEY", "key"),
            ("FIREBASE_AUTH_DOMAIN", "example.firebaseapp.com"),
            ("FIREBASE_PROJECT_ID", "example"),
            ("FIREBASE_STORAGE_BUCKET", "  "),
            ("UNRELATED", "ignored"),
        ]);
        let options = FirebaseOptions::from_env(&env);
        assert_eq!(options.api_key.as_deref(), Some("key"));
        assert_eq!(options.project_id.as_deref(), Some("example"));
        assert_eq!(options.storage_bucket, None);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn validate_lists_every_missing_field() {
        let options = FirebaseOptions {
            auth_domain: Some("example.firebaseapp.com".to_string()),
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert_eq!(
            err,
            AppError::MissingConfig {
                missing: vec!["api_key", "project_id"],
            }
        );
        assert!(err.to_string().contains("api_key, project_id"));
    }

    #[test]
    fn settings_prefer_app_id_over_firebase_app_identifier() {
        let env = env(&[
            ("APP_ID", "primary"),
            ("FIREBASE_APP_IDENTIFIER", "fallback"),
        ]);
        let settings = FirebaseAppSettings::from_env(&env);
        assert_eq!(settings.app_identifier.as_deref(), Some("primary"));
    }
}
