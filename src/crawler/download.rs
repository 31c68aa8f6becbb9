//! Raw-file download and decompression
//!
//! Downloads are retried through the connection layer and written out
//! gunzipped; archive files are single-member gzip streams served as
//! content. A destination that already exists is treated as a prior
//! successful download.

use crate::net;
use flate2::read::GzDecoder;
use reqwest::Client;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Builds the local destination path for one archive file
///
/// The file lands in `<output>/<ship>/<survey>/` with the trailing
/// compressed extension stripped, e.g. `0000_x.all.mb58.gz` becomes
/// `0000_x.all`.
pub fn build_output_path(
    output_directory: &Path,
    file_extension: &str,
    ship_name: &str,
    survey_name: &str,
    filename: &str,
) -> PathBuf {
    let base = filename
        .strip_suffix(file_extension)
        .unwrap_or(filename);
    output_directory.join(ship_name).join(survey_name).join(base)
}

/// Downloads one file, decompressing into `output_path`
///
/// Returns true when the file exists locally afterwards. Connection-layer
/// retry exhaustion, a bad gzip stream, and write failures all log and
/// return false; the caller turns that into an error count.
pub async fn download_survey_file(
    client: &Client,
    url: &str,
    output_path: &Path,
    retries: u32,
) -> bool {
    if output_path.exists() {
        tracing::warn!("{} already exists, skipping this file", output_path.display());
        return true;
    }

    let Some(body) = net::fetch_bytes(client, url, retries).await else {
        return false;
    };

    let mut decoder = GzDecoder::new(body.as_slice());
    let mut decompressed = Vec::new();
    if let Err(e) = decoder.read_to_end(&mut decompressed) {
        tracing::warn!("Unable to decompress {}: {}", url, e);
        return false;
    }
    if let Err(e) = std::fs::write(output_path, &decompressed) {
        tracing::warn!("Unable to write {}: {}", output_path.display(), e);
        return false;
    }

    if output_path.exists() {
        tracing::info!("Downloaded file {}", output_path.display());
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_build_output_path_strips_extension() {
        let path = build_output_path(
            Path::new("/out"),
            ".mb58.gz",
            "henry_b._bigelow",
            "HB1901L4",
            "0000_20190501_150651_HenryBigelow.all.mb58.gz",
        );
        assert_eq!(
            path,
            Path::new("/out/henry_b._bigelow/HB1901L4/0000_20190501_150651_HenryBigelow.all")
        );
    }

    #[tokio::test]
    async fn test_download_decompresses_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file.all.mb58.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(b"ping data")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.all");
        let client = net::build_http_client().unwrap();
        let ok = download_survey_file(
            &client,
            &format!("{}/file.all.mb58.gz", server.uri()),
            &dest,
            3,
        )
        .await;

        assert!(ok);
        assert_eq!(std::fs::read(&dest).unwrap(), b"ping data");
    }

    #[tokio::test]
    async fn test_download_skips_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.all");
        std::fs::write(&dest, b"already here").unwrap();

        // no server: an existing destination must short-circuit the fetch
        let client = net::build_http_client().unwrap();
        let ok = download_survey_file(&client, "http://127.0.0.1:9/none", &dest, 1).await;
        assert!(ok);
        assert_eq!(std::fs::read(&dest).unwrap(), b"already here");
    }

    #[tokio::test]
    async fn test_download_fails_on_bad_gzip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file.all.mb58.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not gzip".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.all");
        let client = net::build_http_client().unwrap();
        let ok = download_survey_file(
            &client,
            &format!("{}/file.all.mb58.gz", server.uri()),
            &dest,
            2,
        )
        .await;

        assert!(!ok);
        assert!(!dest.exists());
    }
}
