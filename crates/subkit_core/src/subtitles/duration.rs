//! Timestamp codec shared by the text formats.
//!
//! Grammar is `[[HH:]MM:]SS<sep>F` where the fraction has at most three
//! digits. The separator and the fraction width vary per format
//! (`,`/3 for SRT, `.`/2 for SSA, `.`/3 for TTML and WebVTT).

use std::time::Duration;

use super::error::{ParseError, ParseResult};

/// Parse a timestamp such as `00:01:39,000` or `1:23:45.67`.
///
/// A fraction shorter than `fraction_digits` is scaled up, so with three
/// digits `,1` is 100ms and `,12` is 120ms.
pub fn parse_duration(input: &str, separator: &str, fraction_digits: u32) -> ParseResult<Duration> {
    let mut millis: u64 = 0;
    let clock = match input.rfind(separator) {
        Some(pos) if !separator.is_empty() => {
            let fraction = input[pos + separator.len()..].trim();
            if fraction.len() > 3 {
                return Err(ParseError::invalid_duration(
                    input,
                    "invalid number of millisecond digits",
                ));
            }
            millis = parse_component(input, fraction)?;
            let scale = fraction_digits.saturating_sub(fraction.len() as u32);
            millis *= 10u64.pow(scale);
            &input[..pos]
        }
        _ => input,
    };

    let parts: Vec<&str> = clock.trim().split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (None, *m, *s),
        [h, m, s] => (Some(*h), *m, *s),
        _ => {
            return Err(ParseError::invalid_duration(
                input,
                "no hours, minutes or seconds detected",
            ))
        }
    };

    let seconds = parse_component(input, seconds)?;
    let minutes = parse_component(input, minutes)?;
    let hours = match hours {
        Some(h) if !h.trim().is_empty() => parse_component(input, h)?,
        _ => 0,
    };

    let total_seconds = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds))
        .ok_or_else(|| ParseError::invalid_duration(input, "out of range"))?;

    Ok(Duration::from_millis(millis) + Duration::from_secs(total_seconds))
}

fn parse_component(input: &str, part: &str) -> ParseResult<u64> {
    part.trim()
        .parse::<u64>()
        .map_err(|e| ParseError::invalid_duration(input, format!("'{}': {}", part.trim(), e)))
}

/// Parse trying each separator in turn, keeping the first success.
///
/// Used by formats whose files mix `,` and `.` in the wild.
pub fn parse_duration_any(input: &str, separators: &[&str], fraction_digits: u32) -> ParseResult<Duration> {
    let mut last_err = None;
    for separator in separators {
        match parse_duration(input, separator, fraction_digits) {
            Ok(d) => return Ok(d),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| ParseError::invalid_duration(input, "no separator")))
}

/// Format as `HH:MM:SS<sep>F`.
///
/// Hours are not capped at 99. The fraction is truncated, never rounded,
/// to `fraction_digits` digits.
pub fn format_duration(d: Duration, separator: &str, fraction_digits: u32) -> String {
    let total_millis = d.as_millis();
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis / 60_000) % 60;
    let seconds = (total_millis / 1000) % 60;
    let millis = total_millis % 1000;

    let digits = fraction_digits.min(3);
    let fraction = format!("{:03}", millis);

    format!(
        "{:02}:{:02}:{:02}{}{}",
        hours,
        minutes,
        seconds,
        separator,
        &fraction[..digits as usize]
    )
}
