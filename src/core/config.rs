use super::{Result, TreeError};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_BOUNDS: &str = "SEXPR_TREE_BOUNDS";
pub const ENV_LOCK_WAIT_MS: &str = "SEXPR_TREE_LOCK_WAIT_MS";

/// How `insert` and `remove` treat an index past the end of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsPolicy {
    /// Out-of-range positions are silently ignored.
    #[default]
    Lenient,
    /// Out-of-range positions fail with `TreeError::OutOfRange`.
    Strict,
}

impl FromStr for BoundsPolicy {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(BoundsPolicy::Lenient),
            "strict" => Ok(BoundsPolicy::Strict),
            other => Err(TreeError::Config(format!(
                "unknown bounds policy '{}', expected 'lenient' or 'strict'",
                other
            ))),
        }
    }
}

impl fmt::Display for BoundsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsPolicy::Lenient => write!(f, "lenient"),
            BoundsPolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Tree configuration
///
/// A tree is governed by the configuration of its root node; attached
/// children pick it up through their root link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeConfig {
    /// Behaviour of `insert`/`remove` past the end of a list
    pub bounds: BoundsPolicy,

    /// Maximum wait for a node owned by another thread's transaction.
    /// `None` waits until the owner commits or rolls back.
    pub lock_wait_timeout: Option<Duration>,
}

impl TreeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bounds policy
    pub fn bounds(mut self, bounds: BoundsPolicy) -> Self {
        self.bounds = bounds;
        self
    }

    /// Shorthand for `bounds(BoundsPolicy::Strict)`
    pub fn strict(self) -> Self {
        self.bounds(BoundsPolicy::Strict)
    }

    /// Bound waits on nodes owned by other transactions
    pub fn lock_wait_timeout(mut self, timeout: Duration) -> Self {
        self.lock_wait_timeout = Some(timeout);
        self
    }

    /// Read configuration from `SEXPR_TREE_BOUNDS` and `SEXPR_TREE_LOCK_WAIT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Missing keys keep their defaults; present but malformed values fail.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_BOUNDS) {
            config.bounds = raw.parse()?;
        }

        if let Some(raw) = lookup(ENV_LOCK_WAIT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                TreeError::Config(format!("{} must be an integer, got '{}'", ENV_LOCK_WAIT_MS, raw))
            })?;
            config.lock_wait_timeout = Some(Duration::from_millis(millis));
        }

        Ok(config)
    }
}
