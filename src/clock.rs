use chrono::NaiveDateTime;

/// Source of the wall-clock time stamped onto transformed records.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local time of the host, without timezone offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
