use crate::constants::{COMMIT_TIME_PREFIX, TIMESTAMP_FORMAT};
use crate::error::{FlowError, FlowResult};
use chrono::{DateTime, Duration, Utc};

/// Render a timestamp the way task dates and checkpoint keys are stored
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// `commit_time:<now + window>`, the bound that keeps a CDC task from running indefinitely
pub fn cdc_stop_position(now: DateTime<Utc>, window: Duration) -> FlowResult<String> {
    let cutoff = now.checked_add_signed(window).ok_or_else(|| {
        FlowError::Configuration(format!(
            "CDC stop window of {} minutes is out of range",
            window.num_minutes()
        ))
    })?;
    Ok(format!("{COMMIT_TIME_PREFIX}{}", format_timestamp(cutoff)))
}
