use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Restituisce l'istante corrente in UTC come RFC3339 con microsecondi fissi
/// (es. "2025-11-02T12:34:56.000000Z"): a precisione costante l'ordine lessicografico è quello temporale.
pub fn now_timestamp() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}

pub fn format_timestamp(at: OffsetDateTime) -> String {
    let fmt = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
    );
    let utc = at.to_offset(UtcOffset::UTC);
    utc.format(&fmt).unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

/// Formatta un timestamp RFC3339 nell'offset locale indicato ("02/11/2025 12:34:56").
/// Se il timestamp non è parsabile viene restituito così com'è.
pub fn format_local(raw: &str, offset: UtcOffset) -> String {
    let fmt = format_description!("[day]/[month]/[year] [hour]:[minute]:[second]");
    match OffsetDateTime::parse(raw, &Rfc3339) {
        Ok(at) => at
            .to_offset(offset)
            .format(&fmt)
            .unwrap_or_else(|_| raw.to_string()),
        Err(_) => raw.to_string(),
    }
}

/// Solo l'ora ("12:34:56"), per le righe del log attività.
pub fn format_clock(at: OffsetDateTime, offset: UtcOffset) -> String {
    let fmt = format_description!("[hour]:[minute]:[second]");
    at.to_offset(offset).format(&fmt).unwrap_or_default()
}
