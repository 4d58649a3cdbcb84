//! Prayer-time engine behind the `miqat` terminal app.
//!
//! Daily timings come from a [`time_source::TimeSource`], sunnah windows are
//! derived by [`sunnah::derive`], yearly Islamic events are resolved by
//! [`events::EventCalendar`], and [`scheduler::NotificationScheduler`] arms
//! the reminders and adhan alerts. A [`session::Session`] ties them together
//! for one run of the program.

pub mod alert;
pub mod aladhan;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod error;
pub mod events;
pub mod hijri;
pub mod location;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod sunnah;
pub mod time_source;
