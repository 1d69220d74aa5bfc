//! Daily wall-clock triggers.

use chrono::{DateTime, Days, NaiveTime, Utc};
use std::{fmt, future::Future, str::FromStr};
use thiserror::Error as ThisError;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{info, warn};

/// A time of day in UTC, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyAt {
    time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ScheduleParseError {
    #[error("expected HH:MM, got {0:?}")]
    Format(String),

    #[error("{0:?} is not a valid time of day")]
    OutOfRange(String),
}

impl DailyAt {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { time })
    }

    /// First occurrence strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.time).and_utc();
        if today > now {
            today
        } else {
            today
                .checked_add_days(Days::new(1))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        }
    }
}

impl FromStr for DailyAt {
    type Err = ScheduleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (hour, minute) = raw
            .split_once(':')
            .filter(|(h, m)| !h.is_empty() && h.len() <= 2 && m.len() == 2)
            .ok_or_else(|| ScheduleParseError::Format(s.to_string()))?;
        let hour: u32 = hour
            .parse()
            .map_err(|_| ScheduleParseError::Format(s.to_string()))?;
        let minute: u32 = minute
            .parse()
            .map_err(|_| ScheduleParseError::Format(s.to_string()))?;
        Self::new(hour, minute).ok_or_else(|| ScheduleParseError::OutOfRange(s.to_string()))
    }
}

impl fmt::Display for DailyAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.format("%H:%M"))
    }
}

/// Runs `job` every day at `at` until `shutdown` flips to `true` or its
/// sender is dropped. A run in progress is always finished before the task
/// checks for shutdown again.
pub fn spawn_daily<F, Fut>(
    name: &'static str,
    at: DailyAt,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        info!(job = name, at = %at, "Daily job scheduled (UTC)");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = Utc::now();
            let next = at.next_after(now);
            let wait = (next - now).to_std().unwrap_or_default();

            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!(job = name, "Shutdown channel closed");
                        break;
                    }
                    continue;
                }
            }

            info!(job = name, "Running daily job");
            job().await;
        }
        info!(job = name, "Daily job stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_and_displays_zero_padded() {
        let at: DailyAt = "9:05".parse().expect("valid");
        assert_eq!(at.to_string(), "09:05");
        assert_eq!("23:59".parse::<DailyAt>().expect("valid").to_string(), "23:59");
    }

    #[test]
    fn rejects_malformed_times() {
        assert!(matches!(
            "0900".parse::<DailyAt>(),
            Err(ScheduleParseError::Format(_))
        ));
        assert!(matches!(
            "9:5".parse::<DailyAt>(),
            Err(ScheduleParseError::Format(_))
        ));
        assert!(matches!(
            "24:00".parse::<DailyAt>(),
            Err(ScheduleParseError::OutOfRange(_))
        ));
        assert!(matches!(
            "12:60".parse::<DailyAt>(),
            Err(ScheduleParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn next_after_rolls_to_tomorrow_once_passed() {
        let at = DailyAt::new(9, 0).expect("valid");
        let before = Utc.with_ymd_and_hms(2024, 3, 1, 8, 59, 0).unwrap();
        let exactly = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        assert_eq!(
            at.next_after(before),
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(
            at.next_after(exactly),
            Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn stops_promptly_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let at = DailyAt::new(0, 0).expect("valid");

        let handle = spawn_daily("test", at, rx, || async {});
        tx.send(true).expect("receiver alive");

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop")
            .expect("task joins");
    }

    #[tokio::test]
    async fn stops_when_sender_dropped() {
        let (tx, rx) = watch::channel(false);
        let at = DailyAt::new(0, 0).expect("valid");

        let handle = spawn_daily("test", at, rx, || async {});
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop")
            .expect("task joins");
    }
}
