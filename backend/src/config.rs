use std::path::PathBuf;

use draw_core::SolverConfig;

use crate::error::ApiError;

/// Candidate placements per solver attempt unless `DRAW_MAX_STEPS` says
/// otherwise. Keeps a single request bounded on rosters that have no draw.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: String,
    pub persist_path: Option<PathBuf>,
    pub public_url: String,
    pub solver: SolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            persist_path: None,
            public_url: "http://localhost:3000".to_string(),
            solver: SolverConfig {
                max_steps_per_attempt: Some(DEFAULT_MAX_STEPS),
                ..SolverConfig::default()
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let defaults = Self::default();
        let bind_addr = lookup("DRAW_BIND").unwrap_or(defaults.bind_addr);
        let persist_path = lookup("PERSIST_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let public_url = lookup("PUBLIC_APP_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.public_url);
        let max_attempts = parse_usize(&lookup, "DRAW_MAX_ATTEMPTS")?
            .unwrap_or(defaults.solver.max_attempts);
        // DRAW_MAX_STEPS=0 lifts the cap entirely.
        let max_steps_per_attempt = match parse_usize(&lookup, "DRAW_MAX_STEPS")? {
            Some(0) => None,
            Some(steps) => Some(steps),
            None => defaults.solver.max_steps_per_attempt,
        };

        Ok(Self {
            bind_addr,
            persist_path,
            public_url,
            solver: SolverConfig {
                max_attempts,
                max_steps_per_attempt,
            },
        })
    }
}

fn parse_usize(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<usize>, ApiError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ApiError::Config(format!("invalid integer for {key}"))),
        None => Ok(None),
    }
}
