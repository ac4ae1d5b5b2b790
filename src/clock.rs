use time::{Date, OffsetDateTime, UtcOffset};

/// Source of "now" and of the offset that decides which calendar day it is.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> OffsetDateTime;
    fn offset(&self) -> UtcOffset;

    fn today(&self) -> Date {
        self.now_utc().to_offset(self.offset()).date()
    }

    /// Local calendar day of `at`.
    fn local_date(&self, at: OffsetDateTime) -> Date {
        at.to_offset(self.offset()).date()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn offset(&self) -> UtcOffset {
        self.offset
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: OffsetDateTime,
    offset: UtcOffset,
}

impl FixedClock {
    pub fn new(now: OffsetDateTime, offset: UtcOffset) -> Self {
        Self { now, offset }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> OffsetDateTime {
        self.now.to_offset(UtcOffset::UTC)
    }

    fn offset(&self) -> UtcOffset {
        self.offset
    }
}
