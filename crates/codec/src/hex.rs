//! Hex/ASCII rendering for bytes the codec could not classify.

/// Longest hex string shown before truncating with `...`.
const MAX_HEX_CHARS: usize = 50;

/// Format: "0A 1B FF ..."
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Printable ASCII kept as-is, everything else replaced with '.'.
pub fn ascii_preview(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
        .collect()
}

/// One diagnostic line for an unrecognized unit, e.g. `Unrecognized: 4C 45 (LE)`.
pub fn describe_unrecognized(bytes: &[u8]) -> String {
    let hex = hex_dump(bytes);
    let hex = if hex.len() > MAX_HEX_CHARS {
        // Hex dump is pure ASCII so char and byte counts agree.
        let head: String = hex.chars().take(MAX_HEX_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        hex
    };
    format!("Unrecognized: {} ({})", hex, ascii_preview(bytes))
}
