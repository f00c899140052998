//! Admin back-office services.
//!
//! Each page fetches its whole collection and filters it in memory; there is
//! no server-side pagination.
//!
//! # Services
//!
//! - `dashboard` - Headline totals
//! - `users` - Profiles with roles, admin grant/revoke
//! - `products` - Catalog CRUD
//! - `orders` - Order list, stats, status updates
//! - `internships` - Internship CRUD and application review

pub mod dashboard;
pub mod internships;
pub mod orders;
pub mod products;
pub mod users;

/// Case-insensitive substring match over optional fields.
///
/// A blank needle matches everything.
pub(crate) fn matches_search(needle: &str, haystacks: &[Option<&str>]) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    haystacks
        .iter()
        .flatten()
        .any(|hay| hay.to_lowercase().contains(&needle))
}

/// `"all"` (or blank) disables a select filter.
pub(crate) fn is_all(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "all"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_search() {
        assert!(matches_search("", &[None]));
        assert!(matches_search("ADA", &[Some("ada@example.com"), None]));
        assert!(matches_search("love", &[None, Some("Ada Lovelace")]));
        assert!(!matches_search("bob", &[Some("ada@example.com"), None]));
    }

    #[test]
    fn test_is_all() {
        assert!(is_all("all"));
        assert!(is_all(""));
        assert!(!is_all("active"));
    }
}
