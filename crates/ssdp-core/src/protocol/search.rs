//! Recognising `M-SEARCH` discovery queries.
//!
//! The multicast group carries everyone's traffic: other devices' `NOTIFY`s,
//! our own looped-back announcements, search responses, and occasionally
//! garbage.  Only `M-SEARCH` requests matter here, and of their headers only
//! `ST:` (the search target) is consulted.
//!
//! A typical request:
//!
//! ```text
//! M-SEARCH * HTTP/1.1
//! HOST: 239.255.255.250:1900
//! MAN: "ssdp:discover"
//! MX: 2
//! ST: upnp:rootdevice
//!
//! ```
//!
//! Recognition rules:
//!
//! - the request line must start with `M-SEARCH ` (case-sensitive, including
//!   the space);
//! - header lines are those between the request line and the last line; the
//!   last line is the blank line closing the block and is never inspected;
//! - the first line starting with `ST:` wins and later ones are ignored.

use thiserror::Error;

use crate::domain::search_target::SearchRequest;
use crate::protocol::constants::M_SEARCH_PREFIX;

const ST_PREFIX: &str = "ST:";

/// Why a datagram was not treated as a discovery query.
///
/// None of these are failures: they are the normal fate of most traffic on a
/// shared multicast group and are only ever logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ignored {
    #[error("payload is not valid UTF-8")]
    NotUtf8,
    #[error("payload is empty")]
    Empty,
    #[error("request line is not M-SEARCH")]
    NotSearch,
    #[error("M-SEARCH without an ST header")]
    NoSearchTarget,
}

/// Parses `payload` as an `M-SEARCH` request.
///
/// # Errors
///
/// Returns the [`Ignored`] reason when the datagram is not a usable query.
///
/// # Examples
///
/// ```rust
/// use ssdp_core::{parse_search, DeviceFilter};
///
/// let payload = b"M-SEARCH * HTTP/1.1\r\nST: upnp:rootdevice\r\nMX: 2\r\n\r\n";
/// let request = parse_search(payload).unwrap();
/// assert_eq!(request.search_target, "upnp:rootdevice");
/// assert_eq!(request.filter, DeviceFilter::RootDevices);
/// ```
pub fn parse_search(payload: &[u8]) -> Result<SearchRequest, Ignored> {
    let text = std::str::from_utf8(payload).map_err(|_| Ignored::NotUtf8)?;
    let lines: Vec<&str> = text.lines().collect();

    let request_line = lines.first().ok_or(Ignored::Empty)?;
    if !request_line.starts_with(M_SEARCH_PREFIX) {
        return Err(Ignored::NotSearch);
    }

    let headers = lines.get(1..lines.len().saturating_sub(1)).unwrap_or(&[]);
    headers
        .iter()
        .find_map(|line| line.strip_prefix(ST_PREFIX))
        .map(|value| SearchRequest::new(value.trim()))
        .ok_or(Ignored::NoSearchTarget)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search_target::DeviceFilter;

    fn search_with(headers: &str) -> Vec<u8> {
        format!("M-SEARCH * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\n{headers}\r\n").into_bytes()
    }

    #[test]
    fn test_rootdevice_search_resolves_to_root_filter() {
        // Arrange
        let payload = search_with("MAN: \"ssdp:discover\"\r\nST: upnp:rootdevice\r\n");

        // Act
        let request = parse_search(&payload).expect("must parse");

        // Assert
        assert_eq!(request.search_target, "upnp:rootdevice");
        assert_eq!(request.filter, DeviceFilter::RootDevices);
    }

    #[test]
    fn test_ssdp_all_search_resolves_to_match_all() {
        let payload = search_with("ST: ssdp:all\r\n");
        let request = parse_search(&payload).unwrap();
        assert_eq!(request.filter, DeviceFilter::All);
    }

    #[test]
    fn test_search_target_is_trimmed() {
        let payload = search_with("ST:    upnp:rootdevice   \r\n");
        let request = parse_search(&payload).unwrap();
        assert_eq!(request.search_target, "upnp:rootdevice");
    }

    #[test]
    fn test_only_first_st_header_is_honoured() {
        let payload = search_with("ST: ssdp:all\r\nST: upnp:rootdevice\r\n");
        let request = parse_search(&payload).unwrap();
        assert_eq!(request.search_target, "ssdp:all");
    }

    #[test]
    fn test_notify_is_ignored() {
        // Arrange: an ssdp:alive echo from another device
        let payload =
            b"NOTIFY * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\nNT: upnp:rootdevice\r\n\r\n";

        // Act / Assert
        assert_eq!(parse_search(payload), Err(Ignored::NotSearch));
    }

    #[test]
    fn test_request_line_match_is_case_sensitive() {
        let payload = b"m-search * HTTP/1.1\r\nST: ssdp:all\r\n\r\n";
        assert_eq!(parse_search(payload), Err(Ignored::NotSearch));
    }

    #[test]
    fn test_request_line_requires_trailing_space() {
        let payload = b"M-SEARCHING * HTTP/1.1\r\nST: ssdp:all\r\n\r\n";
        assert_eq!(parse_search(payload), Err(Ignored::NotSearch));
    }

    #[test]
    fn test_search_without_st_is_ignored() {
        let payload = search_with("MX: 3\r\n");
        assert_eq!(parse_search(&payload), Err(Ignored::NoSearchTarget));
    }

    #[test]
    fn test_st_on_last_line_is_not_inspected() {
        // The last line is normally the blank terminator; without one, an ST
        // there is outside the header range.
        let payload = b"M-SEARCH * HTTP/1.1\r\nMX: 1\r\nST: ssdp:all";
        assert_eq!(parse_search(payload), Err(Ignored::NoSearchTarget));
    }

    #[test]
    fn test_request_line_alone_is_ignored() {
        assert_eq!(
            parse_search(b"M-SEARCH * HTTP/1.1\r\n"),
            Err(Ignored::NoSearchTarget)
        );
    }

    #[test]
    fn test_lowercase_st_header_is_not_recognised() {
        let payload = search_with("st: ssdp:all\r\n");
        assert_eq!(parse_search(&payload), Err(Ignored::NoSearchTarget));
    }

    #[test]
    fn test_empty_payload_is_ignored() {
        assert_eq!(parse_search(b""), Err(Ignored::Empty));
    }

    #[test]
    fn test_invalid_utf8_is_ignored() {
        assert_eq!(parse_search(&[0xFF, 0xFE, 0x00]), Err(Ignored::NotUtf8));
    }

    #[test]
    fn test_bare_lf_line_endings_are_accepted() {
        let payload = b"M-SEARCH * HTTP/1.1\nST: ssdp:all\n\n";
        assert_eq!(parse_search(payload).unwrap().search_target, "ssdp:all");
    }
}
