//! Record identifiers and calendar helpers.
//!
//! Ids are opaque strings generated on the device: a type prefix, the
//! current time in base 36 and a short random suffix. They are never reused.

use crate::RecordId;
use chrono::{Days, Local, NaiveDate, Utc};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix appended to every id.
const SUFFIX_LEN: usize = 6;

/// Generate a fresh id with the given prefix, e.g. `prod_m1x2y3abc123`.
pub fn generate(prefix: &str) -> RecordId {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let random = uuid::Uuid::new_v4().simple().to_string();

    let mut id = String::with_capacity(prefix.len() + 16);
    id.push_str(prefix);
    id.push_str(&to_base36(millis));
    id.push_str(&random[..SUFFIX_LEN]);
    id
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Today's date in the local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Move a day-view date forwards or backwards by whole days.
///
/// Saturates at the calendar bounds instead of panicking.
pub fn shift_day(date: NaiveDate, days: i64) -> NaiveDate {
    let step = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(step)
    } else {
        date.checked_sub_days(step)
    };
    shifted.unwrap_or(date)
}
