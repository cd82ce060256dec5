use futures_util::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{MontageError, Result};
use crate::scratch::cleanup_file;

/// Streams remote media to local scratch storage with a size cap.
pub struct RemoteFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl RemoteFetcher {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            max_bytes,
        }
    }

    /// Download `url` into `dest`. The partial file is removed on any
    /// failure, including blowing past the size cap.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        info!("Fetching {} -> {}", url, dest.display());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MontageError::Fetch(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(MontageError::Fetch(format!(
                "Fetch of {} returned status {}",
                url,
                response.status()
            )));
        }

        // Reject early when the server declares an oversized body.
        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(MontageError::Fetch(format!(
                    "Remote file is {} bytes, over the {} byte limit",
                    length, self.max_bytes
                )));
            }
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    cleanup_file(dest);
                    return Err(MontageError::Fetch(format!(
                        "Stream from {} failed: {}",
                        url, e
                    )));
                }
            };

            written += chunk.len() as u64;
            if written > self.max_bytes {
                drop(file);
                cleanup_file(dest);
                warn!("Aborted oversized download from {}", url);
                return Err(MontageError::Fetch(format!(
                    "Remote file exceeds the {} byte limit",
                    self.max_bytes
                )));
            }

            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        info!("Fetched {} bytes from {}", written, url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response, then close the connection.
    async fn one_shot_server(head: String, body: Vec<u8>) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            let _ = socket.shutdown().await;
        });
        addr
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        let fetcher = RemoteFetcher::new(1024);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");

        let result = fetcher
            .fetch("http://127.0.0.1:1/clip.mp4", &dest)
            .await;

        assert!(matches!(result, Err(MontageError::Fetch(_))));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_declared_oversized_body_is_rejected_before_download() {
        let body = vec![b'x'; 4096];
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let addr = one_shot_server(head, body).await;

        let fetcher = RemoteFetcher::new(1024);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");

        let result = fetcher
            .fetch(&format!("http://{}/clip.mp4", addr), &dest)
            .await;

        assert!(matches!(result, Err(MontageError::Fetch(_))));
        // Rejected before anything was written.
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_undeclared_oversized_body_aborts_and_removes_partial() {
        // No Content-Length, so the early check cannot fire; the running
        // byte cap has to catch it mid-stream.
        let head = "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_string();
        let addr = one_shot_server(head, vec![b'x'; 4096]).await;

        let fetcher = RemoteFetcher::new(1024);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");

        let result = fetcher
            .fetch(&format!("http://{}/clip.mp4", addr), &dest)
            .await;

        assert!(matches!(result, Err(MontageError::Fetch(_))));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_small_body_is_written_whole() {
        let body = b"tiny clip".to_vec();
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let addr = one_shot_server(head, body.clone()).await;

        let fetcher = RemoteFetcher::new(1024);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");

        fetcher
            .fetch(&format!("http://{}/clip.mp4", addr), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }
}
