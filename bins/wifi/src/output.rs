//! Output helpers.

use nlwifi::Result;
use serde::Serialize;

use crate::Format;

/// Print `value` as JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T, format: Format) -> Result<()> {
    let text = if format.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

/// Format a byte count with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = None;
    for u in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = Some(u);
    }
    match unit {
        Some(u) => format!("{:.2} {}", value, u),
        None => format!("{} B", bytes),
    }
}

/// Format mBm as dBm.
pub fn format_mbm(mbm: i64) -> String {
    format!("{:.2} dBm", mbm as f64 / 100.0)
}
