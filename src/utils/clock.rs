use chrono::{Local, NaiveDate};
use std::sync::Arc;

/// Source of "today", injectable so date-dependent logic can be tested.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| Local::now().date_naive())
}

pub fn fixed_clock(date: NaiveDate) -> Clock {
    Arc::new(move || date)
}
