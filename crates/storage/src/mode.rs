//! Durability mode for collection log writes.
//!
//! Controls whether appends are fsynced before a mutation is considered
//! committed.
//!
//! # Mode Comparison
//!
//! | Mode | Behavior | Use Case |
//! |------|----------|----------|
//! | Always | fsync after every append | Default; zero committed-write loss |
//! | Standard | write, let the OS flush | Bulk loads, relaxed durability |
//!
//! Every mutation in DynamicKV persists synchronously inside the request
//! that performs it, so there is no batched or background variant - the
//! only knob is whether the append is also fsynced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync after every append (safest, slowest).
    #[default]
    Always,

    /// Write without fsync; the OS flushes at its leisure.
    ///
    /// A crash may lose the last writes the OS had not flushed yet.
    Standard,
}

impl DurabilityMode {
    /// Check if this mode requires an fsync on every append.
    pub fn requires_sync(&self) -> bool {
        matches!(self, DurabilityMode::Always)
    }

    /// Parse a configuration string.
    ///
    /// Accepts `"always"` or `"standard"`; anything else is `None` so the
    /// caller can raise its own validation error with context.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "always" => Some(DurabilityMode::Always),
            "standard" => Some(DurabilityMode::Standard),
            _ => None,
        }
    }

    /// Human-readable description of the mode.
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::Always => "fsync every append (safest)",
            DurabilityMode::Standard => "OS-buffered appends (may lose recent writes on crash)",
        }
    }
}
