//! Static asset retrieval.
//!
//! The portal serves a small, fixed set of stylesheets, scripts, and fonts
//! that every page references. They are public, so a plain HTTP GET suffices;
//! no browser session is involved. Failures are logged and non-fatal; a
//! mirror without its stylesheet is ugly but usable.

use std::fs;
use std::path::Path;

use tracing::{info, warn};
use url::Url;

use crate::error::MirrorError;
use crate::naming;

/// (subdirectory, local name, remote path) of every asset the pages use.
const STATIC_ASSETS: [(&str, &str, &str); 5] = [
    ("css", "style.min.css", "css/style.min.css?v=1202"),
    ("css", "icones.min.css", "css/icones.min.css?v=1200"),
    ("js", "jquery.min.js", "js/jquery.min.js"),
    ("js", "commun.min.js", "js/commun.min.js?v=1200"),
    ("fonts", "icomoon.woff", "fonts/icomoon.woff?1210"),
];

/// Fetches the asset set into `assets_dir`, returning how many succeeded.
pub async fn download_assets(http: &reqwest::Client, base_url: &str, assets_dir: &Path) -> usize {
    let mut fetched = 0;
    for (kind, name, remote) in STATIC_ASSETS {
        let url = match Url::parse(base_url).and_then(|base| base.join(remote)) {
            Ok(url) => url,
            Err(error) => {
                warn!(asset = name, %error, "asset URL could not be built");
                continue;
            }
        };
        match fetch_one(http, url.as_str(), &assets_dir.join(kind).join(name)).await {
            Ok(size) => {
                info!(kind, asset = name, size = %naming::format_size(size), "asset saved");
                fetched += 1;
            }
            Err(error) => warn!(asset = name, %error, "asset fetch failed"),
        }
    }
    fetched
}

async fn fetch_one(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<u64, MirrorError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|source| MirrorError::http(url, source))?;
    let status = response.status();
    if !status.is_success() {
        return Err(MirrorError::http_status(url, status.as_u16()));
    }
    let body = response
        .bytes()
        .await
        .map_err(|source| MirrorError::http(url, source))?;
    fs::write(dest, &body).map_err(|source| MirrorError::io(dest.to_path_buf(), source))?;
    Ok(body.len() as u64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_download_assets_fetches_the_fixed_set() {
        let server = MockServer::start().await;
        for (_, _, remote) in STATIC_ASSETS {
            let bare = remote.split('?').next().unwrap();
            Mock::given(method("GET"))
                .and(path(format!("/site/{bare}")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"asset-body".to_vec()))
                .mount(&server)
                .await;
        }
        let dir = TempDir::new().unwrap();
        for sub in ["css", "js", "fonts"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }

        let http = reqwest::Client::new();
        let base = format!("{}/site/", server.uri());
        let fetched = download_assets(&http, &base, dir.path()).await;

        assert_eq!(fetched, 5);
        assert!(dir.path().join("css/style.min.css").exists());
        assert!(dir.path().join("js/jquery.min.js").exists());
        assert!(dir.path().join("fonts/icomoon.woff").exists());
    }

    #[tokio::test]
    async fn test_missing_asset_is_skipped_not_fatal() {
        let server = MockServer::start().await;
        // only the first stylesheet exists
        Mock::given(method("GET"))
            .and(path("/site/css/style.min.css"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"css".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        for sub in ["css", "js", "fonts"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }

        let http = reqwest::Client::new();
        let base = format!("{}/site/", server.uri());
        let fetched = download_assets(&http, &base, dir.path()).await;

        assert_eq!(fetched, 1);
        assert!(!dir.path().join("js/jquery.min.js").exists());
    }
}
