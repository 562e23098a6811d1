use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::error::{LoaderError, Result};

/// Source of decompressed IDX bytes for a URL.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub fn gunzip(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(LoaderError::Decompress)?;
    Ok(decompressed)
}

/// Blocking HTTP GET of a gzip stream.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(HttpFetcher {
            client: builder.build()?,
        })
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?.error_for_status()?;
        let body = response.bytes()?;
        info!(url, bytes = body.len(), "downloaded");
        gunzip(&body)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.download(url).inspect_err(|e| warn!(url, error = %e, "fetch failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    // ignores any proxy configured in the environment
    fn local_fetcher() -> HttpFetcher {
        HttpFetcher {
            client: Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
        }
    }

    // answers a single request with `status` and `body`, returns the url to hit.
    fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            )
            .unwrap();
            stream.write_all(&body).unwrap();
        });

        format!("http://{}/t10k-labels-idx1-ubyte.gz", addr)
    }

    #[test]
    fn gunzip_restores_bytes() {
        let compressed = gzip(&[0, 0, 8, 1, 0, 0, 0, 2, 4, 5]);

        assert_eq!(gunzip(&compressed).unwrap(), vec![0, 0, 8, 1, 0, 0, 0, 2, 4, 5]);
    }

    #[test]
    fn gunzip_rejects_plain_bytes() {
        assert!(matches!(
            gunzip(b"not a gzip stream"),
            Err(LoaderError::Decompress(_))
        ));
    }

    #[test]
    fn http_fetch_decompresses_body() {
        let url = serve_once("200 OK", gzip(&[0, 0, 8, 1, 0, 0, 0, 1, 7]));

        assert_eq!(
            local_fetcher().fetch(&url).unwrap(),
            vec![0, 0, 8, 1, 0, 0, 0, 1, 7]
        );
    }

    #[test]
    fn http_error_status() {
        let url = serve_once("404 Not Found", b"missing".to_vec());

        match local_fetcher().fetch(&url) {
            Err(LoaderError::Http(e)) => {
                assert_eq!(e.status(), Some(reqwest::StatusCode::NOT_FOUND));
            }
            other => panic!("expected http error, got {:?}", other),
        }
    }

    #[test]
    fn http_body_that_is_not_gzip() {
        let url = serve_once("200 OK", b"plain".to_vec());

        assert!(matches!(
            local_fetcher().fetch(&url),
            Err(LoaderError::Decompress(_))
        ));
    }

    #[test]
    fn http_empty_body() {
        let url = serve_once("200 OK", Vec::new());

        assert!(matches!(
            local_fetcher().fetch(&url),
            Err(LoaderError::Decompress(_))
        ));
    }

    #[test]
    fn http_connection_refused() {
        // bind then drop to get a port nothing listens on
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        assert!(matches!(
            local_fetcher().fetch(&format!("http://{}/train-images-idx3-ubyte.gz", addr)),
            Err(LoaderError::Http(_))
        ));
    }

    #[test]
    fn http_fetcher_builds_with_timeout() {
        assert!(HttpFetcher::new(Some(Duration::from_secs(2))).is_ok());
        assert!(HttpFetcher::new(None).is_ok());
    }
}
