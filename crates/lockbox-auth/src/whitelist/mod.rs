//! API-key whitelists.
//!
//! Both whitelists are stored as comma-separated text. Validation runs when a
//! key is created; the check functions run on every authorization attempt and
//! skip entries that fail to parse.

pub mod cidr;
pub mod time;

pub use cidr::{IpNet, check_ip_whitelist, validate_cidr_list};
pub use time::{TimeWindow, check_time_whitelist, validate_time_whitelist};

/// Split a comma-separated whitelist into trimmed, non-empty entries.
pub(crate) fn entries(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|e| !e.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_skip_blanks() {
        let parts: Vec<&str> = entries(" a, ,b ,").collect();
        assert_eq!(parts, vec!["a", "b"]);
        assert_eq!(entries("").count(), 0);
    }
}
