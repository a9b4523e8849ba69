use std::io::Write;
use std::path::Path;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use crate::models::RecognitionResult;

const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// One arrival entry: the bib read from the photo (possibly empty, meaning
/// the number could not be read), the wall-clock arrival time and the
/// elapsed race time.
#[derive(Debug, Clone)]
pub struct Registration {
    pub bib: String,
    pub arrival: OffsetDateTime,
    pub elapsed: Duration,
}

impl Registration {
    pub fn arrival_hms(&self) -> String {
        self.arrival
            .format(TIME_FORMAT)
            .unwrap_or_else(|_| String::new())
    }

    /// Elapsed race time as HH:MM:SS, milliseconds dropped.
    pub fn elapsed_hms(&self) -> String {
        let total = self.elapsed.whole_seconds().max(0);
        format!(
            "{:02}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

/// Timing state for one race: the start instant plus the append-only list
/// of arrivals. Owned by the host, not by the recognition core.
pub struct RaceSession {
    start: OffsetDateTime,
    registrations: Vec<Registration>,
}

impl RaceSession {
    pub fn starting_at(start: OffsetDateTime) -> Self {
        Self {
            start,
            registrations: Vec::new(),
        }
    }

    pub fn start_now() -> Self {
        Self::starting_at(now())
    }

    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Record one arrival at the given instant. Every photo gets an entry,
    /// recognized or not; frames are never dropped.
    pub fn record_at(
        &mut self,
        result: &RecognitionResult,
        arrival: OffsetDateTime,
    ) -> &Registration {
        let elapsed = arrival - self.start;
        self.registrations.push(Registration {
            bib: result.digits.clone(),
            arrival,
            elapsed,
        });
        self.registrations.last().expect("just pushed")
    }

    /// Record one arrival at the current wall-clock time.
    pub fn record(&mut self, result: &RecognitionResult) -> &Registration {
        self.record_at(result, now())
    }

    /// Write results as CSV, one row per arrival in registration order.
    pub fn write_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["bib_number", "arrival_time", "race_time"])?;
        for reg in &self.registrations {
            let arrival = reg.arrival_hms();
            let elapsed = reg.elapsed_hms();
            csv_writer.write_record([reg.bib.as_str(), arrival.as_str(), elapsed.as_str()])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn export_csv(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
