//! Run configuration, resolved once at startup.
//!
//! Every setting is read from its environment variable first and then from
//! the action-input variable (`INPUT_<NAME>`). Explicit overrides (command
//! line flags) win over both. The lookup is injected so tests never touch
//! the process environment.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::{RetryPolicy, DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS};

pub const DEFAULT_VERCEL_API_URL: &str = "https://api.vercel.com";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::Invalid {
            key: "GITHUB_REPOSITORY",
            value: raw.to_string(),
            reason: "expected owner/repo".to_string(),
        };
        let (owner, name) = raw.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(RepoSlug {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Root of the published report site.
    pub fn pages_url(&self) -> String {
        format!("https://{}.github.io/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Values supplied explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub vercel_token: Option<String>,
    pub team_id: Option<String>,
    pub project_id: Option<String>,
    pub github_token: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_interval_seconds: Option<u64>,
}

/// Deployment provider settings.
#[derive(Clone)]
pub struct VercelSettings {
    pub token: String,
    pub team_id: Option<String>,
    pub project_id: String,
    pub api_url: String,
}

impl std::fmt::Debug for VercelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VercelSettings")
            .field("token", &"<redacted>")
            .field("team_id", &self.team_id)
            .field("project_id", &self.project_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Issue tracker settings. Notifications are skipped without a token.
#[derive(Clone)]
pub struct GithubSettings {
    pub token: Option<String>,
    pub repository: Option<RepoSlug>,
    pub api_url: String,
}

impl std::fmt::Debug for GithubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubSettings")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("repository", &self.repository)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl GithubSettings {
    pub fn load<F>(lookup: F, overrides: &ConfigOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let repository = lookup("GITHUB_REPOSITORY")
            .filter(|v| !v.is_empty())
            .map(|raw| RepoSlug::parse(&raw))
            .transpose()?;

        Ok(GithubSettings {
            token: overrides
                .github_token
                .clone()
                .or_else(|| setting(&lookup, "GITHUB_TOKEN", "github-token")),
            repository,
            api_url: lookup("GITHUB_API_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
        })
    }
}

/// Complete configuration for the `wait` command.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub vercel: VercelSettings,
    pub github: GithubSettings,
    pub retry: RetryPolicy,
}

impl RelayConfig {
    pub fn load<F>(lookup: F, overrides: &ConfigOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = overrides
            .vercel_token
            .clone()
            .or_else(|| setting(&lookup, "VERCEL_TOKEN", "vercel-token"))
            .ok_or(ConfigError::Missing {
                env: "VERCEL_TOKEN",
                input: "vercel-token",
            })?;
        let project_id = overrides
            .project_id
            .clone()
            .or_else(|| setting(&lookup, "VERCEL_PROJECT_ID", "vercel-project-id"))
            .ok_or(ConfigError::Missing {
                env: "VERCEL_PROJECT_ID",
                input: "vercel-project-id",
            })?;
        let team_id = overrides
            .team_id
            .clone()
            .or_else(|| setting(&lookup, "VERCEL_TEAM_ID", "vercel-team-id"));

        let max_attempts = match overrides.max_retries {
            Some(n) => n,
            None => parse_number::<u32, _>(&lookup, "MAX_RETRIES", "max-retries")?
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
        };
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_RETRIES",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        let interval = match overrides.retry_interval_seconds {
            Some(secs) => Duration::from_secs(secs),
            None => {
                parse_number::<u64, _>(&lookup, "RETRY_INTERVAL_SECONDS", "retry-interval-seconds")?
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_INTERVAL)
            }
        };

        Ok(RelayConfig {
            vercel: VercelSettings {
                token,
                team_id,
                project_id,
                api_url: lookup("VERCEL_API_URL")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| DEFAULT_VERCEL_API_URL.to_string()),
            },
            github: GithubSettings::load(&lookup, overrides)?,
            retry: RetryPolicy::new(max_attempts, interval),
        })
    }
}

/// Name of the variable carrying an action input.
pub fn input_key(input: &str) -> String {
    format!("INPUT_{}", input.replace(' ', "_").to_uppercase())
}

/// Environment variable first, action input second; empty values count as unset.
pub fn setting<F>(lookup: &F, env: &str, input: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(env)
        .filter(|v| !v.trim().is_empty())
        .or_else(|| lookup(&input_key(input)).filter(|v| !v.trim().is_empty()))
        .map(|v| v.trim().to_string())
}

fn parse_number<T, F>(
    lookup: &F,
    env: &'static str,
    input: &str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    setting(lookup, env, input)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key: env,
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(vars: &HashMap<String, String>) -> Result<RelayConfig, ConfigError> {
        RelayConfig::load(|k| vars.get(k).cloned(), &ConfigOverrides::default())
    }

    #[test]
    fn test_defaults_apply() {
        let vars = env(&[("VERCEL_TOKEN", "tok"), ("VERCEL_PROJECT_ID", "prj_1")]);
        let config = load(&vars).unwrap();

        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.vercel.api_url, DEFAULT_VERCEL_API_URL);
        assert_eq!(config.vercel.team_id, None);
        assert_eq!(config.github.token, None);
        assert_eq!(config.github.api_url, DEFAULT_GITHUB_API_URL);
    }

    #[test]
    fn test_action_inputs_are_fallback() {
        let vars = env(&[
            ("INPUT_VERCEL-TOKEN", "from-input"),
            ("INPUT_VERCEL-PROJECT-ID", "prj_input"),
            ("VERCEL_PROJECT_ID", "prj_env"),
            ("INPUT_MAX-RETRIES", "5"),
            ("INPUT_RETRY-INTERVAL-SECONDS", "2"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.vercel.token, "from-input");
        assert_eq!(config.vercel.project_id, "prj_env");
        assert_eq!(config.retry, RetryPolicy::new(5, Duration::from_secs(2)));
    }

    #[test]
    fn test_overrides_win() {
        let vars = env(&[
            ("VERCEL_TOKEN", "tok"),
            ("VERCEL_PROJECT_ID", "prj_1"),
            ("MAX_RETRIES", "9"),
        ]);
        let overrides = ConfigOverrides {
            project_id: Some("prj_cli".to_string()),
            max_retries: Some(3),
            retry_interval_seconds: Some(0),
            ..Default::default()
        };
        let config = RelayConfig::load(|k| vars.get(k).cloned(), &overrides).unwrap();

        assert_eq!(config.vercel.project_id, "prj_cli");
        assert_eq!(config.retry, RetryPolicy::new(3, Duration::ZERO));
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let vars = env(&[("VERCEL_PROJECT_ID", "prj_1"), ("VERCEL_TOKEN", "  ")]);
        let err = load(&vars).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                env: "VERCEL_TOKEN",
                input: "vercel-token"
            }
        );
    }

    #[test]
    fn test_invalid_retry_values_are_rejected() {
        let vars = env(&[
            ("VERCEL_TOKEN", "tok"),
            ("VERCEL_PROJECT_ID", "prj_1"),
            ("MAX_RETRIES", "lots"),
        ]);
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid {
                key: "MAX_RETRIES",
                ..
            })
        ));

        let vars = env(&[
            ("VERCEL_TOKEN", "tok"),
            ("VERCEL_PROJECT_ID", "prj_1"),
            ("MAX_RETRIES", "0"),
        ]);
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_repository_slug() {
        let slug = RepoSlug::parse("stevedores-org/site").unwrap();
        assert_eq!(slug.to_string(), "stevedores-org/site");
        assert_eq!(slug.pages_url(), "https://stevedores-org.github.io/site");

        assert!(RepoSlug::parse("no-slash").is_err());
        assert!(RepoSlug::parse("a/b/c").is_err());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let vars = env(&[
            ("VERCEL_TOKEN", "super-secret"),
            ("VERCEL_PROJECT_ID", "prj_1"),
            ("GITHUB_TOKEN", "ghs_secret"),
        ]);
        let rendered = format!("{:?}", load(&vars).unwrap());
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("ghs_secret"));
    }
}
