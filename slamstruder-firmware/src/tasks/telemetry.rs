//! Telemetry task
//!
//! Logs one line per executed heater control step:
//! `timestamp_us temperature error integral duty`

use core::fmt::Write;

use defmt::info;
use heapless::String;

use crate::channels::TELEMETRY;

/// Longest line expected from a control record
const LINE_CAPACITY: usize = 64;

/// Telemetry task
#[embassy_executor::task]
pub async fn telemetry_task() {
    info!("Telemetry task started");

    let mut line: String<LINE_CAPACITY> = String::new();

    loop {
        let record = TELEMETRY.receive().await;

        line.clear();
        if write!(line, "{}", record).is_ok() {
            info!("{=str}", line.as_str());
        } else {
            // Absurd values overflow the line; log the record as-is
            info!("{}", record);
        }
    }
}
