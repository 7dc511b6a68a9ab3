//! Named policy table.

use super::{ConfigError, RateLimitPolicy};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming a policy file to load on top of the built-ins.
pub const POLICIES_ENV: &str = "LUSOTOWN_RATELIMIT_POLICIES";

/// Built-in policies as `(name, requests, window, message)`.
const BUILTIN_POLICIES: &[(&str, u32, &str, &str)] = &[
    (
        "api",
        100,
        "1m",
        "API rate limit exceeded. Please slow down your requests.",
    ),
    (
        "authentication",
        5,
        "15m",
        "Too many login attempts. Please wait before trying again.",
    ),
    (
        "business-directory",
        3,
        "1h",
        "Too many business listing submissions. Please try again later.",
    ),
    (
        "contact-form",
        5,
        "1h",
        "Too many messages sent through the contact form.",
    ),
    (
        "event-booking",
        20,
        "1h",
        "Too many event booking attempts. Please try again later.",
    ),
    (
        "event-creation",
        10,
        "1h",
        "Too many events created. Please try again later.",
    ),
    (
        "file-upload",
        10,
        "1h",
        "Too many file uploads. Please try again later.",
    ),
    (
        "matching",
        50,
        "1h",
        "Too many matching requests. Please try again later.",
    ),
    (
        "messaging",
        30,
        "1m",
        "You are sending messages too quickly.",
    ),
    (
        "newsletter",
        3,
        "1d",
        "Too many newsletter sign-up attempts.",
    ),
    (
        "password-reset",
        3,
        "1h",
        "Too many password reset requests.",
    ),
    (
        "review-submission",
        5,
        "1d",
        "Too many reviews submitted today.",
    ),
    ("search", 60, "1m", "Too many searches. Please slow down."),
];

/// Shape of a policy file: one `[policies.<name>]` table per entry.
#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    policies: BTreeMap<String, RateLimitPolicy>,
}

/// Policies addressable by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: BTreeMap<String, RateLimitPolicy>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PolicyTable {
    /// Returns the built-in policy table.
    #[must_use]
    pub fn builtin() -> Self {
        let policies = BUILTIN_POLICIES
            .iter()
            .map(|&(name, requests, window, message)| {
                (
                    name.to_string(),
                    RateLimitPolicy::new(requests, window).with_message(message),
                )
            })
            .collect();
        Self { policies }
    }

    /// Loads a policy file and merges it over the built-in table.
    ///
    /// Entries in the file replace built-in policies with the same name and
    /// add any new names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file can't be read, isn't valid TOML,
    /// or contains an invalid policy.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!(path = %path.display(), "Loading rate limit policies");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let file: PolicyFile = toml::from_str(&contents).map_err(|source| ConfigError::TomlError {
            path: path.display().to_string(),
            source,
        })?;

        let mut table = Self::builtin();
        for (name, policy) in file.policies {
            validate_policy(&name, &policy, path)?;
            debug!(%name, requests = policy.requests, window = %policy.window, "Loaded policy");
            table.insert(name, policy);
        }

        info!(count = table.len(), "Rate limit policies ready");
        Ok(table)
    }

    /// Returns the policy with this name, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RateLimitPolicy> {
        self.policies.get(name)
    }

    /// Returns the policy with this name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPolicy`] if there is no such policy.
    pub fn require(&self, name: &str) -> Result<&RateLimitPolicy, ConfigError> {
        self.get(name).ok_or_else(|| ConfigError::UnknownPolicy {
            name: name.to_string(),
        })
    }

    /// Adds or replaces a policy, returning the previous one.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        policy: RateLimitPolicy,
    ) -> Option<RateLimitPolicy> {
        self.policies.insert(name.into(), policy)
    }

    /// Iterates over policies in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RateLimitPolicy)> {
        self.policies
            .iter()
            .map(|(name, policy)| (name.as_str(), policy))
    }

    /// Number of policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Resolves the policy table for this process.
///
/// Uses `path` when given, otherwise the file named by [`POLICIES_ENV`],
/// otherwise the built-in table.
///
/// # Errors
///
/// Returns [`ConfigError`] if the selected file fails to load.
pub fn resolve_policy_table(path: Option<&Path>) -> Result<PolicyTable, ConfigError> {
    if let Some(path) = path {
        return PolicyTable::load(path);
    }
    match std::env::var(POLICIES_ENV) {
        Ok(value) if !value.trim().is_empty() => PolicyTable::load(Path::new(value.trim())),
        _ => Ok(PolicyTable::builtin()),
    }
}

/// Checks that a policy can be enforced.
fn validate_policy(name: &str, policy: &RateLimitPolicy, path: &Path) -> Result<(), ConfigError> {
    if policy.requests == 0 {
        return Err(ConfigError::ValidationError {
            path: path.display().to_string(),
            message: format!("policy '{name}': requests must be greater than zero"),
        });
    }
    policy
        .parsed_window()
        .map_err(|e| ConfigError::ValidationError {
            path: path.display().to_string(),
            message: format!("policy '{name}': {e}"),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_policies(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("policies.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn builtin_contains_core_policies() {
        let table = PolicyTable::builtin();

        let directory = table.get("business-directory").unwrap();
        assert_eq!(directory.requests, 3);
        assert_eq!(directory.window, "1h");

        let auth = table.get("authentication").unwrap();
        assert_eq!(auth.requests, 5);
        assert_eq!(auth.window, "15m");
        assert!(auth.message.is_some());
    }

    #[test]
    fn builtin_policies_are_valid() {
        for (name, policy) in PolicyTable::builtin().iter() {
            validate_policy(name, policy, Path::new("<builtin>")).unwrap();
        }
    }

    #[test]
    fn iter_is_sorted_by_name() {
        let table = PolicyTable::builtin();
        let names: Vec<&str> = table.iter().map(|(name, _)| name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn require_unknown_policy() {
        let table = PolicyTable::builtin();
        let result = table.require("does-not-exist");
        assert!(matches!(result, Err(ConfigError::UnknownPolicy { name }) if name == "does-not-exist"));
    }

    #[test]
    fn load_overrides_and_extends_builtin() {
        let temp = TempDir::new().unwrap();
        let path = write_policies(
            &temp,
            r#"
[policies.authentication]
requests = 10
window = "5m"

[policies.webinar-signup]
requests = 2
window = "1d"
message = "Only two webinar sign-ups per day."
"#,
        );

        let table = PolicyTable::load(&path).unwrap();

        assert_eq!(table.len(), PolicyTable::builtin().len() + 1);
        assert_eq!(
            table.get("authentication"),
            Some(&RateLimitPolicy::new(10, "5m"))
        );
        assert_eq!(table.get("webinar-signup").unwrap().requests, 2);
        assert_eq!(table.get("search"), PolicyTable::builtin().get("search"));
    }

    #[test]
    fn load_rejects_zero_requests() {
        let temp = TempDir::new().unwrap();
        let path = write_policies(
            &temp,
            r#"
[policies.search]
requests = 0
window = "1m"
"#,
        );

        let result = PolicyTable::load(&path);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn load_rejects_malformed_window() {
        let temp = TempDir::new().unwrap();
        let path = write_policies(
            &temp,
            r#"
[policies.search]
requests = 5
window = "five minutes"
"#,
        );

        match PolicyTable::load(&path) {
            Err(ConfigError::ValidationError { message, .. }) => {
                assert!(message.contains("search"));
                assert!(message.contains("five minutes"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn load_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = write_policies(&temp, "[policies.search\nrequests = ");

        let result = PolicyTable::load(&path);
        assert!(matches!(result, Err(ConfigError::TomlError { .. })));
    }

    #[test]
    fn load_missing_file() {
        let temp = TempDir::new().unwrap();

        let result = PolicyTable::load(&temp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }

    #[test]
    fn resolve_defaults_to_builtin() {
        temp_env::with_var_unset(POLICIES_ENV, || {
            assert_eq!(resolve_policy_table(None).unwrap(), PolicyTable::builtin());
        });
    }

    #[test]
    fn resolve_uses_env_path() {
        let temp = TempDir::new().unwrap();
        let path = write_policies(
            &temp,
            r#"
[policies.messaging]
requests = 1
window = "1s"
"#,
        );

        temp_env::with_var(POLICIES_ENV, Some(path.as_os_str()), || {
            let table = resolve_policy_table(None).unwrap();
            assert_eq!(table.get("messaging"), Some(&RateLimitPolicy::new(1, "1s")));
        });
    }

    #[test]
    fn resolve_prefers_explicit_path_over_env() {
        let temp = TempDir::new().unwrap();
        let path = write_policies(
            &temp,
            r#"
[policies.messaging]
requests = 2
window = "1s"
"#,
        );

        temp_env::with_var(POLICIES_ENV, Some("/nonexistent/policies.toml"), || {
            let table = resolve_policy_table(Some(&path)).unwrap();
            assert_eq!(table.get("messaging").unwrap().requests, 2);
        });
    }
}
