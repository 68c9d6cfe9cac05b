//! Human-readable numbers for command output.

const SUFFIXES: [&str; 8] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

/// Format a byte count with binary units.
pub fn format_bytes(bytes: u64) -> String {
    match bytes {
        1 => return "1 Byte".to_string(),
        0..=1023 => return format!("{} Bytes", bytes),
        _ => {}
    }
    let mut value = bytes as f64 / 1024.0;
    for suffix in &SUFFIXES[..SUFFIXES.len() - 1] {
        if value < 1024.0 {
            return format!("{:.1} {}", value, suffix);
        }
        value /= 1024.0;
    }
    format!("{:.1} {}", value, SUFFIXES[SUFFIXES.len() - 1])
}

/// Format number with comma separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// `H:MM:SS`, prefixed with a day count past 24 hours.
pub fn format_runtime(minutes: u64) -> String {
    let days = minutes / (24 * 60);
    let hours = (minutes / 60) % 24;
    let clock = format!("{}:{:02}:00", hours, minutes % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(1), "1 Byte");
        assert_eq!(format_bytes(500), "500 Bytes");
        assert_eq!(format_bytes(1024), "1.0 KiB");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(1048576), "1.0 MiB");
        assert_eq!(format_bytes(1073741824), "1.0 GiB");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_runtime() {
        assert_eq!(format_runtime(0), "0:00:00");
        assert_eq!(format_runtime(125), "2:05:00");
        assert_eq!(format_runtime(24 * 60 + 61), "1 day, 1:01:00");
        assert_eq!(format_runtime(3 * 24 * 60), "3 days, 0:00:00");
    }
}
