//! Seed internship postings from a YAML file.
//!
//! The file is a list of postings in the `internships` row shape:
//!
//! ```yaml
//! - title: Embedded Firmware Intern
//!   description: Write firmware for our flame sensors.
//!   duration: 3 months
//!   location: Denver, CO
//!   type: hybrid
//!   department: Engineering
//!   requirements: [C, Soldering]
//! ```

use std::collections::HashSet;

use pyrowarden_storefront::supabase::{InternshipBackend, InternshipInput};
use tracing::{info, warn};

use super::{CliError, Context};

/// Default seed file, relative to the workspace root.
pub const DEFAULT_INTERNSHIPS_FILE: &str = "data/internships.yaml";

/// Parse a seed file body.
///
/// # Errors
///
/// Returns the YAML error for malformed input or missing required fields.
pub fn parse_internships(content: &str) -> Result<Vec<InternshipInput>, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Insert every posting in `file_path`.
///
/// With `replace`, existing postings whose title matches one in the file are
/// deleted first.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a backend call
/// fails.
pub async fn internships(ctx: &Context, file_path: &str, replace: bool) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let postings = parse_internships(&content).map_err(|source| CliError::Yaml {
        path: file_path.to_owned(),
        source,
    })?;
    info!(path = %file_path, count = postings.len(), "Parsed internships");

    if replace {
        let titles: HashSet<&str> = postings.iter().map(|p| p.title.as_str()).collect();
        let existing = ctx
            .client
            .list_internships(Some(&ctx.service), false)
            .await?;
        for old in existing.iter().filter(|i| titles.contains(i.title.as_str())) {
            ctx.client.delete_internship(&ctx.service, old.id).await?;
            warn!(id = %old.id, title = %old.title, "Deleted existing internship");
        }
    }

    for posting in &postings {
        let created = ctx.client.create_internship(&ctx.service, posting).await?;
        info!(id = %created.id, title = %posting.title, "Inserted internship");
    }

    info!("Seeding complete: {} internships inserted", postings.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pyrowarden_core::InternshipStatus;

    use super::*;

    #[test]
    fn test_parse_defaults() {
        let yaml = "
- title: Embedded Firmware Intern
  description: Write firmware
  duration: 3 months
  location: Denver, CO
  type: hybrid
  department: Engineering
  requirements: [C, Soldering]
";
        let postings = parse_internships(yaml).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].kind, "hybrid");
        assert_eq!(postings[0].requirements, ["C", "Soldering"]);
        assert_eq!(postings[0].status, InternshipStatus::Open);
        assert!(postings[0].benefits.is_empty());
        assert_eq!(postings[0].max_applications, None);
    }

    #[test]
    fn test_parse_rejects_missing_title() {
        assert!(parse_internships("- description: no title\n").is_err());
    }

    #[test]
    fn test_bundled_seed_file_parses() {
        let content = include_str!("../../../../data/internships.yaml");
        let postings = parse_internships(content).unwrap();
        assert!(!postings.is_empty());
        assert!(postings.iter().all(|p| !p.title.is_empty()));
    }
}
