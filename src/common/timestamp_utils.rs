use crate::errors::AppError;
use chrono::{Local, NaiveDate, TimeZone};

pub const RECORDING_FILE_FORMAT: &str = "%Y-%m-%d %H_%M_%S";

// Output file name for a recording starting at `start_time` (Unix seconds), in local time.
pub fn recording_file_name(start_time: i64) -> Result<String, AppError> {
    recording_file_name_in(start_time, &Local)
}

pub fn recording_file_name_in<Tz: TimeZone>(start_time: i64, tz: &Tz) -> Result<String, AppError>
where
    Tz::Offset: std::fmt::Display,
{
    let start = tz
        .timestamp_opt(start_time, 0)
        .earliest()
        .ok_or_else(|| AppError::Response(format!("Recording start time {} is out of range", start_time)))?;
    Ok(format!("{}.mp4", start.format(RECORDING_FILE_FORMAT)))
}

/// Turns a device date such as `20240315` into `2024-03-15`; unparseable input is returned as is.
pub fn format_date_label(device_date: &str) -> String {
    NaiveDate::parse_from_str(device_date, "%Y%m%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| device_date.to_string())
}
