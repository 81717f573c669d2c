//! Startup fragment resolution
//!
//! The driver accepts a bare fragment (`#at=...`) or a full deep link
//! (`https://host/ui#at=...`).

use url::Url;

use mapsync_core::prelude::*;

/// Extract the fragment from `input`, keeping its leading `#`.
///
/// A link without a fragment yields `None`.
pub fn resolve_fragment(input: &str) -> Result<Option<String>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if input.starts_with('#') {
        return Ok(Some(input.to_string()));
    }

    let url = Url::parse(input).map_err(|e| Error::invalid_link(format!("{}: {}", input, e)))?;
    Ok(url
        .fragment()
        .filter(|f| !f.is_empty())
        .map(|f| format!("#{}", f)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_fragment_passes_through() {
        assert_eq!(
            resolve_fragment("#at=1,2,3").unwrap().as_deref(),
            Some("#at=1,2,3")
        );
    }

    #[test]
    fn test_fragment_extracted_from_link() {
        let fragment =
            resolve_fragment("https://example.org/peripleo/map#query=rome&places=place%2F42")
                .unwrap();
        assert_eq!(fragment.as_deref(), Some("#query=rome&places=place%2F42"));
    }

    #[test]
    fn test_link_without_fragment() {
        assert_eq!(resolve_fragment("https://example.org/map").unwrap(), None);
        assert_eq!(resolve_fragment("https://example.org/map#").unwrap(), None);
        assert_eq!(resolve_fragment("  ").unwrap(), None);
    }

    #[test]
    fn test_invalid_link_is_fatal() {
        let err = resolve_fragment("not a link").unwrap_err();
        assert!(matches!(err, Error::InvalidLink { .. }));
        assert!(err.is_fatal());
    }
}
