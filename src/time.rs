//! Timestamps shared by every actor runtime.
//!
//! The virtual-time harness advances a `Timestamp` by hand; the threaded
//! runtime derives it from elapsed wall-clock milliseconds. Protocol code
//! only ever compares and offsets timestamps, so it cannot tell the two
//! apart.

/// A point in time, in milliseconds since the runtime started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(u64);

impl Timestamp {
    /// The instant a runtime starts at.
    pub const ZERO: Timestamp = Timestamp(0);

    /// A deadline that is never reached.
    pub const NEVER: Timestamp = Timestamp(u64::MAX);

    #[inline]
    pub fn new(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Return the raw millisecond value.
    #[inline]
    pub fn millis(self) -> u64 {
        self.0
    }

    /// The timestamp `delta` milliseconds later.
    ///
    /// Saturates at [`Timestamp::NEVER`], so offsetting an infinite deadline
    /// keeps it infinite.
    #[inline]
    pub fn plus(self, delta: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(delta))
    }

    /// Milliseconds left until `deadline`, or 0 if it has already passed.
    ///
    /// Waiting for [`Timestamp::NEVER`] yields `u64::MAX`, which runtimes
    /// treat as "block until a message arrives".
    #[inline]
    pub fn millis_until(self, deadline: Timestamp) -> u64 {
        if deadline.is_never() {
            return u64::MAX;
        }
        deadline.0.saturating_sub(self.0)
    }

    #[inline]
    pub fn is_never(self) -> bool {
        self == Timestamp::NEVER
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_never() {
            write!(f, "never")
        } else {
            write!(f, "{}ms", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let t1 = Timestamp::new(10);
        let t2 = Timestamp::new(20);
        assert!(t1 < t2);
        assert!(Timestamp::ZERO < t1);
        assert!(t2 < Timestamp::NEVER);
    }

    #[test]
    fn test_plus() {
        assert_eq!(Timestamp::new(100).plus(50), Timestamp::new(150));
    }

    #[test]
    fn test_plus_saturates_at_never() {
        assert_eq!(Timestamp::NEVER.plus(1), Timestamp::NEVER);
        assert_eq!(Timestamp::new(u64::MAX - 1).plus(10), Timestamp::NEVER);
    }

    #[test]
    fn test_millis_until() {
        let now = Timestamp::new(30);
        assert_eq!(now.millis_until(Timestamp::new(45)), 15);
        assert_eq!(now.millis_until(Timestamp::new(30)), 0);
        // Elapsed deadlines never produce a negative wait.
        assert_eq!(now.millis_until(Timestamp::new(10)), 0);
        assert_eq!(now.millis_until(Timestamp::NEVER), u64::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::new(42).to_string(), "42ms");
        assert_eq!(Timestamp::NEVER.to_string(), "never");
    }
}
