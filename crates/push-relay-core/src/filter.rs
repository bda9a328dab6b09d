//! Push-event relevance filtering.
//!
//! A push is relevant when at least one added or modified path matches the
//! tracked-file pattern and the source repository is registered as active in
//! the collaborator store. Everything else is an ignore outcome, reported to
//! the producer with a 200 so its delivery retry stays quiet.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;
use tracing::warn;

use crate::events::PushEvent;
use crate::registry::RegistryStore;

// ============================================================================
// Errors
// ============================================================================

/// Error raised when a tracked-file pattern cannot be compiled.
#[derive(Debug, Error)]
pub enum PatternError {
    /// Pattern was empty or produced an unusable matcher.
    #[error("invalid tracked-file pattern \"{pattern}\": {message}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// What was wrong with it
        message: String,
    },
}

// ============================================================================
// Tracked Pattern
// ============================================================================

/// Glob over repository-relative file paths, compiled once at startup.
///
/// Supported syntax: `**` matches across directory separators (`**/` matches
/// zero or more whole directories), `*` matches within one path segment, `?`
/// matches a single non-separator character. Everything else is literal.
#[derive(Debug, Clone)]
pub struct TrackedPattern {
    pattern: String,
    matcher: Regex,
}

impl TrackedPattern {
    /// Compiles a glob into an anchored path matcher.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "pattern is empty".to_string(),
            });
        }

        let regex = Self::glob_to_regex(pattern);
        let matcher = Regex::new(&regex).map_err(|e| PatternError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    /// The glob this matcher was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether a repository-relative path matches the pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    fn glob_to_regex(pattern: &str) -> String {
        let mut regex = String::from("^");
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        if chars.peek() == Some(&'/') {
                            chars.next();
                            // "**/" also matches the repository root
                            regex.push_str("(?:.*/)?");
                        } else {
                            regex.push_str(".*");
                        }
                    } else {
                        regex.push_str("[^/]*");
                    }
                }
                '?' => regex.push_str("[^/]"),
                c => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }

        regex.push('$');
        regex
    }
}

impl fmt::Display for TrackedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

// ============================================================================
// Relevance Decision
// ============================================================================

/// Why a push was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No added or modified path matched the tracked pattern.
    NoTrackedFileChanged,
    /// The source repository has no entry in the collaborator store.
    RepositoryNotRegistered,
    /// The source repository is registered but switched off.
    RepositoryDisabled,
    /// The collaborator store could not be consulted; treated as not relevant.
    RegistryUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoTrackedFileChanged => "no tracked file changed",
            Self::RepositoryNotRegistered => "repository not registered",
            Self::RepositoryDisabled => "repository disabled",
            Self::RegistryUnavailable => "repository registry unavailable",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of evaluating a push event against the relay's filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relevance {
    /// A tracked file changed in a registered, active repository.
    Relevant {
        /// First changed path that matched the tracked pattern
        matched_path: String,
    },
    /// The push does not concern the relay.
    Ignored {
        /// Reason reported back to the producer
        reason: SkipReason,
    },
}

impl Relevance {
    /// Whether the push should be dispatched downstream.
    pub fn is_relevant(&self) -> bool {
        matches!(self, Self::Relevant { .. })
    }
}

// ============================================================================
// Event Filter
// ============================================================================

/// Decides whether a push event warrants a downstream dispatch.
pub struct EventFilter {
    pattern: TrackedPattern,
    registry: Arc<dyn RegistryStore>,
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFilter")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

impl EventFilter {
    /// Creates a filter over the given pattern and collaborator store.
    pub fn new(pattern: TrackedPattern, registry: Arc<dyn RegistryStore>) -> Self {
        Self { pattern, registry }
    }

    /// The tracked-file pattern this filter applies.
    pub fn pattern(&self) -> &TrackedPattern {
        &self.pattern
    }

    /// Evaluates a push event.
    ///
    /// The path scan runs first so pushes touching nothing of interest are
    /// ignored without a registry read. Registry failures are logged and
    /// collapse to [`SkipReason::RegistryUnavailable`]; they never propagate.
    pub async fn evaluate(&self, event: &PushEvent) -> Relevance {
        let matched = match event.touched_paths().find(|p| self.pattern.matches(p)) {
            Some(path) => path.to_string(),
            None => {
                return Relevance::Ignored {
                    reason: SkipReason::NoTrackedFileChanged,
                }
            }
        };

        match self.registry.lookup(&event.repository.full_name).await {
            Ok(Some(entry)) if entry.is_active() => Relevance::Relevant {
                matched_path: matched,
            },
            Ok(Some(_)) => Relevance::Ignored {
                reason: SkipReason::RepositoryDisabled,
            },
            Ok(None) => Relevance::Ignored {
                reason: SkipReason::RepositoryNotRegistered,
            },
            Err(e) => {
                warn!(
                    repository = %event.repository.full_name,
                    error = %e,
                    "registry lookup failed, treating push as not relevant"
                );
                Relevance::Ignored {
                    reason: SkipReason::RegistryUnavailable,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
