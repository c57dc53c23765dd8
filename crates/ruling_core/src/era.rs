use chrono::{Datelike, NaiveDate};

/// Offset between the portal's local-era year and the standard calendar year.
pub const DEFAULT_ERA_OFFSET: i32 = 1911;

/// A date expressed in the portal's local era (year counted from the era epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EraDateError {
    #[error("malformed local-era date {0:?}")]
    Malformed(String),
    #[error("no such calendar date for local-era date {0:?}")]
    OutOfRange(String),
    #[error("{0} predates the local era")]
    BeforeEra(NaiveDate),
}

/// Converts a calendar date to the local era, rejecting dates before era year 1.
pub fn to_era(date: NaiveDate, offset: i32) -> Result<EraDate, EraDateError> {
    let year = date.year() - offset;
    if year < 1 {
        return Err(EraDateError::BeforeEra(date));
    }
    Ok(EraDate {
        year,
        month: date.month(),
        day: date.day(),
    })
}

/// Parses the listing's `Y.M.D` local-era text into a calendar date.
pub fn parse_era_date(text: &str, offset: i32) -> Result<NaiveDate, EraDateError> {
    let trimmed = text.trim();
    let parts: Vec<&str> = trimmed.split('.').map(str::trim).collect();
    let [y, m, d] = parts.as_slice() else {
        return Err(EraDateError::Malformed(trimmed.to_string()));
    };
    let malformed = |_| EraDateError::Malformed(trimmed.to_string());
    let year: i32 = y.parse().map_err(malformed)?;
    let month: u32 = m.parse().map_err(malformed)?;
    let day: u32 = d.parse().map_err(malformed)?;
    NaiveDate::from_ymd_opt(year + offset, month, day)
        .ok_or_else(|| EraDateError::OutOfRange(trimmed.to_string()))
}

/// Formats a calendar date back into the listing's `Y.M.D` text form.
pub fn format_era_date(date: NaiveDate, offset: i32) -> Result<String, EraDateError> {
    let era = to_era(date, offset)?;
    Ok(format!("{}.{:02}.{:02}", era.year, era.month, era.day))
}
