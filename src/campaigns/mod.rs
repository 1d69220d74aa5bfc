//! Periodic campaigns over the listing collection.
//!
//! Layout:
//! - `aging.rs`: reminders for listings whose availability has not been re-confirmed
//! - `digest.rs`: daily count of new listings per micromarket
//! - `schedule.rs`: `HH:MM` daily triggers

pub mod aging;
pub mod digest;
pub mod schedule;

pub use aging::{AgingSweep, SweepReport};
pub use digest::{DigestReport, MicromarketDigest};
pub use schedule::{DailyAt, ScheduleParseError, spawn_daily};

use crate::notify::DeliveryOutcome;
use tokio::task::JoinError;
use tracing::error;

fn tally_delivery(
    joined: Result<DeliveryOutcome, JoinError>,
    delivered: &mut usize,
    failed: &mut usize,
) {
    match joined {
        Ok(outcome) if outcome.success => *delivered += 1,
        Ok(_) => *failed += 1,
        Err(e) => {
            *failed += 1;
            error!(error = %e, "Campaign dispatch task failed");
        }
    }
}
