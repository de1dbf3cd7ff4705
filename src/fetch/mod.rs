//! Source retrieval: local files or HTTP(S) URLs, optionally gzip-compressed.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use bytes::Bytes;
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

use crate::error::LoadError;

/// Returns `true` for locations that must be fetched over the network.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Performs a GET on `url` and returns the body. Non-2xx statuses are errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes, LoadError> {
    let http_err = |source: reqwest::Error| LoadError::Http {
        url: url.to_string(),
        source,
    };
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse()
            .map_err(|_| LoadError::InvalidUrl(url.to_string()))?,
    );

    let resp = client
        .execute(req)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(http_err)?;
    resp.bytes().await.map_err(http_err)
}

/// Loads `location` from disk or over HTTP, decompressing `.gz` payloads.
#[tracing::instrument(skip(client), fields(source = %location))]
pub async fn fetch_source<C: HttpClient>(client: &C, location: &str) -> Result<Bytes, LoadError> {
    let raw = if is_remote(location) {
        fetch_bytes(client, location).await?
    } else {
        Bytes::from(std::fs::read(location).map_err(|source| LoadError::Io {
            path: location.to_string(),
            source,
        })?)
    };
    debug!(bytes = raw.len(), "Source bytes received");

    if location.ends_with(".gz") {
        gunzip(location, &raw)
    } else {
        Ok(raw)
    }
}

fn gunzip(location: &str, raw: &[u8]) -> Result<Bytes, LoadError> {
    let mut out = Vec::new();
    GzDecoder::new(raw)
        .read_to_end(&mut out)
        .map_err(|source| LoadError::Io {
            path: location.to_string(),
            source,
        })?;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::env;
    use std::fs;
    use std::io::Write;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/a.csv"));
        assert!(is_remote("http://example.com/a.csv"));
        assert!(!is_remote("data/a.csv"));
        assert!(!is_remote("httpdata/a.csv"));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let path = env::temp_dir().join("mobility_choropleth_fetch_plain.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();

        let bytes = fetch_source(&BasicClient::new(), path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"a,b\n1,2\n");

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_fetch_gzipped_file() {
        let path = env::temp_dir().join("mobility_choropleth_fetch.csv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"a,b\n1,2\n").unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let bytes = fetch_source(&BasicClient::new(), path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"a,b\n1,2\n");

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let result = fetch_source(&BasicClient::new(), "/nonexistent/mobility.csv").await;
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_url() {
        let result = fetch_source(&BasicClient::new(), "http://127.0.0.1:1/mobility.csv").await;
        assert!(matches!(result, Err(LoadError::Http { .. })));
    }
}
