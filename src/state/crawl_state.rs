/// Crawl lifecycle states
///
/// `Idle → Running → {Paused, Stopped(reason), Failed}`. Paused, Stopped and
/// Failed are terminal for the process; a paused crawl resumes on the next
/// run from its checkpoint.
use std::fmt;

/// Why a crawl stopped on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The cumulative fiction count reached the configured cap
    NovelCapReached,

    /// The page cursor went past the configured last page
    PageCapReached,

    /// A listing page yielded no links: the end of the catalog
    Exhausted,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NovelCapReached => "novel_cap_reached",
            Self::PageCapReached => "page_cap_reached",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents the current state of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Constructed, checkpoint not yet loaded
    Idle,

    /// Iterating listing pages
    Running,

    /// Cancelled by the operator; progress saved for resumption
    Paused,

    /// Finished on its own
    Stopped(StopReason),

    /// Aborted by a fatal error (repository write failure)
    Failed,
}

impl CrawlState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paused | Self::Stopped(_) | Self::Failed)
    }

    /// Returns true if a later run can continue from the checkpoint
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            Self::Paused | Self::Failed | Self::Stopped(StopReason::PageCapReached)
        )
    }

    /// Checks whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        match (self, next) {
            (Self::Idle, Self::Running) => true,
            (Self::Idle, Self::Failed) => true,
            (Self::Running, Self::Paused | Self::Stopped(_) | Self::Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped(_) => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped(reason) => write!(f, "stopped ({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
