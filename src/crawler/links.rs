//! Directory-listing anchor parsing and archive URL decomposition
//!
//! The archive serves plain HTML directory listings. A link whose text
//! equals its target and ends in a slash is a subdirectory; anything else is
//! a file reference. The archive's fixed URL layout puts the ship name at
//! path segment 6 and the survey name at segment 7, with the (ship, survey)
//! boundary at exactly 9 segments.

use scraper::{Html, Selector};

/// One hyperlink from a directory listing
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

impl Anchor {
    /// Subdirectory links render their target as their text
    pub fn is_subdirectory(&self) -> bool {
        self.href.ends_with('/') && self.href == self.text
    }
}

/// Extracts all anchors from a listing page
pub fn parse_listing(html: &str) -> Vec<Anchor> {
    let document = Html::parse_document(html);
    let mut anchors = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return anchors;
    };
    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            anchors.push(Anchor {
                href: href.to_string(),
                text: element.text().collect::<String>(),
            });
        }
    }
    anchors
}

/// Detects the (ship, survey) boundary from a listing URL
///
/// A URL decomposing into exactly 9 `/`-separated segments identifies a
/// survey root, e.g.
/// `https://host/platforms/ocean/ships/henry_b._bigelow/HB1901L4/`.
pub fn survey_boundary(url: &str) -> Option<(String, String)> {
    let segments: Vec<&str> = url.split('/').collect();
    if segments.len() == 9 {
        Some((segments[6].to_string(), segments[7].to_string()))
    } else {
        None
    }
}

/// Pulls ship, survey, and file name out of a file URL
pub fn parse_file_link(url: &str) -> Option<(String, String, String)> {
    let segments: Vec<&str> = url.split('/').collect();
    if segments.len() < 9 {
        return None;
    }
    let filename = (*segments.last()?).to_string();
    if filename.is_empty() {
        return None;
    }
    Some((segments[6].to_string(), segments[7].to_string(), filename))
}

/// How a file link should be routed
#[derive(Debug, Clone, PartialEq)]
pub enum FileKind {
    /// Raw data worth downloading; carries the matched trailing extension
    Wanted(String),
    /// Compressed but not a wanted format; counted, never downloaded
    Ignorable,
    /// Anything else
    Other,
}

/// Routes a file URL by its trailing extension
pub fn classify_file(url: &str, wanted: &[String], ignorable: &str) -> FileKind {
    for extension in wanted {
        if url.ends_with(extension.as_str()) {
            return FileKind::Wanted(extension.clone());
        }
    }
    if !ignorable.is_empty() && url.ends_with(ignorable) {
        return FileKind::Ignorable;
    }
    FileKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURVEY_URL: &str = "https://data.example.gov/platforms/ocean/ships/henry_b._bigelow/HB1901L4/";
    const FILE_URL: &str = "https://data.example.gov/platforms/ocean/ships/henry_b._bigelow/HB1901L4/multibeam/data/version1/MB/me70/0000_20190501_150651_HenryBigelow.all.mb58.gz";

    fn wanted() -> Vec<String> {
        vec![".mb58.gz".to_string(), ".mb59.gz".to_string()]
    }

    #[test]
    fn test_parse_listing_extracts_anchors() {
        let html = r#"
            <html><body>
                <a href="../">Parent Directory</a>
                <a href="ahi/">ahi/</a>
                <a href="file.all.mb58.gz">file.all.mb58.gz</a>
            </body></html>
        "#;
        let anchors = parse_listing(html);
        assert_eq!(anchors.len(), 3);
        assert!(!anchors[0].is_subdirectory());
        assert!(anchors[1].is_subdirectory());
        assert!(!anchors[2].is_subdirectory());
    }

    #[test]
    fn test_parse_listing_handles_empty_page() {
        assert!(parse_listing("<html><body>nothing here</body></html>").is_empty());
    }

    #[test]
    fn test_survey_boundary_at_nine_segments() {
        let (ship, survey) = survey_boundary(SURVEY_URL).unwrap();
        assert_eq!(ship, "henry_b._bigelow");
        assert_eq!(survey, "HB1901L4");

        // one level up (ship listing) is not a boundary
        assert!(survey_boundary("https://data.example.gov/platforms/ocean/ships/henry_b._bigelow/").is_none());
        // deeper levels are not boundaries either
        assert!(survey_boundary(&format!("{}multibeam/", SURVEY_URL)).is_none());
    }

    #[test]
    fn test_parse_file_link() {
        let (ship, survey, filename) = parse_file_link(FILE_URL).unwrap();
        assert_eq!(ship, "henry_b._bigelow");
        assert_eq!(survey, "HB1901L4");
        assert_eq!(filename, "0000_20190501_150651_HenryBigelow.all.mb58.gz");

        assert!(parse_file_link("https://data.example.gov/short").is_none());
    }

    #[test]
    fn test_classify_wanted_extension() {
        assert_eq!(
            classify_file(FILE_URL, &wanted(), ".gz"),
            FileKind::Wanted(".mb58.gz".to_string())
        );
    }

    #[test]
    fn test_classify_ignorable_gz() {
        let url = "https://data.example.gov/platforms/ocean/ships/a/b/metadata.xml.gz";
        assert_eq!(classify_file(url, &wanted(), ".gz"), FileKind::Ignorable);
    }

    #[test]
    fn test_classify_other() {
        let url = "https://data.example.gov/platforms/ocean/ships/a/b/readme.txt";
        assert_eq!(classify_file(url, &wanted(), ".gz"), FileKind::Other);
    }
}
