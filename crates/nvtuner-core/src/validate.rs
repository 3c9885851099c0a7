// ── Input validators ──
//
// Pure checks used by the connection form, the config layer and the CLI
// before any network traffic happens.

/// Returns `true` for a dotted-quad IPv4 address.
///
/// Each octet is trimmed and must parse as an integer in `0..=255`, so
/// `" 192.168.1.1"` and `"010.0.0.1"` are accepted, `"256.1.1.1"` and
/// `"1.2.3"` are not.
pub fn is_valid_ipv4(text: &str) -> bool {
    let octets: Vec<&str> = text.split('.').collect();
    octets.len() == 4 && octets.iter().all(|o| o.trim().parse::<u8>().is_ok())
}

/// Returns `true` for a TCP port in `1..=65535`.
pub fn is_valid_port(port: i64) -> bool {
    (1..=65_535).contains(&port)
}

/// String form of [`is_valid_port`]; non-numeric text is invalid.
pub fn is_valid_port_str(text: &str) -> bool {
    text.trim().parse::<i64>().is_ok_and(is_valid_port)
}
