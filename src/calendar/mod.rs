//! Club league calendar.
//!
//! Club league runs every other week: it opens on the Wednesday of an odd ISO
//! week and closes at the end of the following Monday. Tickets are granted in
//! three chunks (Wednesday, Friday, Sunday) and a chunk expires when the next
//! one is granted. Every function takes the reference time explicitly.

mod errors;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};

pub use errors::CalendarError;

/// Tickets a player can spend over one complete league.
pub const TICKETS_PER_LEAGUE: u32 = 14;

/// Tickets granted on Wednesday and Friday.
const SHORT_GRANT: u32 = 4;
/// Tickets granted on Sunday, valid through Monday.
const LONG_GRANT: u32 = 6;

/// Snapshot of the league at one instant, computed once per sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeagueState {
    pub now: DateTime<Utc>,
    pub active: bool,
    pub tickets_granted_today: u32,
    pub window_start: Option<DateTime<Utc>>,
}

impl LeagueState {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            active: is_league_active(now),
            tickets_granted_today: tickets_granted_today(now),
            window_start: last_league_window_start(now),
        }
    }
}

fn is_odd_week(date: NaiveDate) -> bool {
    date.iso_week().week() % 2 == 1
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Whether a league is running at `now`.
///
/// Wednesday to Sunday of an odd week, plus the Monday of the following
/// (even) week.
pub fn is_league_active(now: DateTime<Utc>) -> bool {
    let date = now.date_naive();
    let day = date.weekday().num_days_from_monday();

    if is_odd_week(date) {
        day >= 2
    } else {
        day == 0
    }
}

/// Tickets granted for the current grant window (0 outside a league).
pub fn tickets_granted_today(now: DateTime<Utc>) -> u32 {
    if !is_league_active(now) {
        return 0;
    }

    match now.weekday() {
        Weekday::Wed | Weekday::Thu | Weekday::Fri | Weekday::Sat => SHORT_GRANT,
        Weekday::Sun | Weekday::Mon => LONG_GRANT,
        Weekday::Tue => 0,
    }
}

/// Cumulative tickets granted so far in the running league (0 outside a league).
pub fn tickets_available_so_far(now: DateTime<Utc>) -> u32 {
    if !is_league_active(now) {
        return 0;
    }

    match now.weekday() {
        Weekday::Wed | Weekday::Thu => SHORT_GRANT,
        Weekday::Fri | Weekday::Sat => 2 * SHORT_GRANT,
        Weekday::Sun | Weekday::Mon => TICKETS_PER_LEAGUE,
        Weekday::Tue => 0,
    }
}

/// Midnight of the most recent grant day (Wednesday, Friday or Sunday)
/// while a league is running.
pub fn last_league_window_start(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if !is_league_active(now) {
        return None;
    }

    let days_back = match now.weekday() {
        Weekday::Wed | Weekday::Fri | Weekday::Sun => 0,
        Weekday::Thu | Weekday::Sat | Weekday::Mon => 1,
        Weekday::Tue => return None,
    };

    start_of_day(now.date_naive() - Duration::days(days_back))
}

/// Number of complete leagues between `since` and `now`.
///
/// A league is complete once its closing Tuesday is reached. A league counts
/// for an origin that falls no later than its Thursday, i.e. before the
/// second ticket grant.
pub fn weeks_since_league_start(
    since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u32, CalendarError> {
    if since > now {
        return Err(CalendarError::OriginInFuture { origin: since, now });
    }

    let today = now.date_naive();
    let mut wednesday = since.date_naive() - Duration::days(1);
    while wednesday.weekday() != Weekday::Wed {
        wednesday += Duration::days(1);
    }

    let mut complete = 0;
    while wednesday + Duration::days(6) <= today {
        if is_odd_week(wednesday) {
            complete += 1;
        }
        wednesday += Duration::days(7);
    }

    Ok(complete)
}
