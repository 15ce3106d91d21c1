/// Run phase definitions for tracking crawl progress
///
/// A run moves strictly forward through these phases, one after the other.
use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RunPhase {
    /// Reading robots.txt for the seed site (skipped when disabled)
    SeedingRobots,

    /// Fetching pages and scheduling discovered children
    Crawling,

    /// Waiting for in-flight tasks to finish
    Draining,

    /// Diffing against the previous run and persisting state
    Reconciling,

    /// Transport released, summary available
    Done,
}

impl RunPhase {
    /// Returns the phase that follows this one, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::SeedingRobots => Some(Self::Crawling),
            Self::Crawling => Some(Self::Draining),
            Self::Draining => Some(Self::Reconciling),
            Self::Reconciling => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Returns true if the run may move from this phase to `to`
    pub fn can_transition_to(&self, to: Self) -> bool {
        self.next() == Some(to)
    }

    /// Returns true if this is the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Short name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SeedingRobots => "seeding_robots",
            Self::Crawling => "crawling",
            Self::Draining => "draining",
            Self::Reconciling => "reconciling",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
