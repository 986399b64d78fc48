//! Turns a feature's `properties` object into publishable values.

use serde_json::{Map, Value};

use crate::model::MappedValues;

const TEMPERATURE_PLACES: usize = 1;
const HUMIDITY_PLACES: usize = 0;
const PRESSURE_PLACES: usize = 0;
const PASCALS_PER_MILLIBAR: f64 = 100.0;

/// Map `properties` (as returned by [`crate::parser::parse`]) to output values.
///
/// Index 0 of `timeSeries` is the most recent reading. An empty or missing
/// series leaves every derived numeric value unset but still carries the
/// location and model-run metadata.
pub fn map(properties: &Map<String, Value>) -> MappedValues {
    let location_name = properties
        .get("location")
        .and_then(Value::as_object)
        .and_then(|location| location.get("name"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    let model_run_date = properties
        .get("modelRunDate")
        .filter(|v| !v.is_null())
        .cloned();

    let latest = properties
        .get("timeSeries")
        .and_then(Value::as_array)
        .and_then(|series| series.first())
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let number = |key: &str| latest.get(key).and_then(Value::as_f64);

    MappedValues {
        temperature: number("screenTemperature")
            .and_then(|c| format_half_up(c, TEMPERATURE_PLACES)),
        humidity: number("screenRelativeHumidity")
            .and_then(|pct| format_half_up(pct, HUMIDITY_PLACES)),
        pressure: number("mslp")
            .and_then(|pa| format_half_up(pa / PASCALS_PER_MILLIBAR, PRESSURE_PLACES)),
        location_name,
        model_run_date,
        reading_time: latest.get("time").and_then(Value::as_str).map(str::to_owned),
        latest,
    }
}

/// Format `value` with exactly `places` decimals, rounding half away from zero.
///
/// Rounding works on the shortest decimal form of the float, so `9.95` becomes
/// `"10.0"` even though its binary value sits just below 9.95.
pub fn format_half_up(value: f64, places: usize) -> Option<String> {
    if !value.is_finite() {
        return None;
    }

    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(places))
        .collect();

    if frac_part.as_bytes().get(places).is_some_and(|d| *d >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - places;
    let mut out = String::with_capacity(digits.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.extend(digits[..split].iter().map(|&d| char::from(d)));
    if places > 0 {
        out.push('.');
        out.extend(digits[split..].iter().map(|&d| char::from(d)));
    }

    Some(out)
}
