//! Canonical JSON rendering
//!
//! Compact JSON whose numbers are written the way JavaScript's
//! `Number.prototype.toString` writes them, so a backend that re-serializes
//! the received object reproduces the exact signed bytes. `1.0` renders as
//! `1`, `1e2` as `100` and `1e21` as `1e+21`.

use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Compact formatter with JavaScript number rendering
#[derive(Debug, Clone, Copy, Default)]
pub struct JsNumberFormatter;

impl Formatter for JsNumberFormatter {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(js_number(value).as_bytes())
    }

    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(js_number(f64::from(value)).as_bytes())
    }
}

/// Serialize `value` to canonical bytes
pub fn to_canonical_vec<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, JsNumberFormatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

/// Render a float as JavaScript does
///
/// Non-finite values cannot be represented in JSON and render as `null`.
pub fn js_number(value: f64) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. `1.2345e-7`
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent.parse::<i32>().unwrap_or(0) + 1;

    let mut out = String::with_capacity(digits.len() + 8);
    if value.is_sign_negative() {
        out.push('-');
    }

    if (k..=21).contains(&n) {
        out.push_str(&digits);
        out.push_str(&"0".repeat((n - k) as usize));
    } else if (1..=21).contains(&n) {
        let (whole, fraction) = digits.split_at(n as usize);
        out.push_str(whole);
        out.push('.');
        out.push_str(fraction);
    } else if (-5..=0).contains(&n) {
        out.push_str("0.");
        out.push_str(&"0".repeat(n.unsigned_abs() as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push(if n > 0 { '+' } else { '-' });
        out.push_str(&(n - 1).unsigned_abs().to_string());
    }

    out
}
