use chrono::{Datelike, Utc};

/// Source of the current year used to turn a birth year into an age.
pub trait Clock: Send + Sync {
    fn current_year(&self) -> i32;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_year(&self) -> i32 {
        Utc::now().year()
    }
}

/// Pins the current year, for reproducible quotes and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedYear(pub i32);

impl Clock for FixedYear {
    fn current_year(&self) -> i32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedYear, SystemClock};

    #[test]
    fn fixed_year_is_stable() {
        assert_eq!(FixedYear(2025).current_year(), 2025);
    }

    #[test]
    fn system_clock_is_after_epoch_of_the_tables() {
        assert!(SystemClock.current_year() >= 2025);
    }
}
