use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::db::{FetchRow, QueuedGame};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
const TIMEOUT_SECS: u64 = 30;

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .build()
        .context("Failed to create HTTP client")
}

/// Fetch games concurrently, saving each outcome to the DB as it arrives.
/// A failed game is stored as an error row and never reaches extraction.
pub async fn fetch_games_streaming(
    conn: &Connection,
    games: Vec<QueuedGame>,
    concurrency: usize,
) -> Result<FetchStats> {
    let client = client()?;
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let total = games.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchRow>(concurrency * 2);

    for game in games {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let label = game.game_id.as_deref().unwrap_or(&game.url).to_string();
            let row = fetch_one(&client, game.id, &game.url).await;
            if let Some(e) = &row.error {
                warn!("Fetch failed for game {}: {}", label, e);
            } else {
                debug!("Fetched game {} in {}ms", label, row.latency_ms.unwrap_or_default());
            }
            let _ = tx.send(row).await;
        });
    }

    // rx closes once every task has dropped its sender
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;

    while let Some(row) = rx.recv().await {
        if row.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }
        crate::db::save_fetch(conn, &row)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} games ({} ok, {} errors)", total, ok, errors);

    Ok(FetchStats { total, ok, errors })
}

async fn fetch_one(client: &reqwest::Client, game_ref: i64, url: &str) -> FetchRow {
    let start = Instant::now();
    let result = fetch_html(client, url).await;
    let latency_ms = Some(start.elapsed().as_millis() as i64);

    match result {
        Ok((status, html)) => FetchRow {
            game_ref,
            url: url.to_string(),
            html: Some(html),
            status: Some(status),
            error: None,
            latency_ms,
        },
        Err((status, e)) => FetchRow {
            game_ref,
            url: url.to_string(),
            html: None,
            status,
            error: Some(format!("{:#}", e)),
            latency_ms,
        },
    }
}

/// GET one page. Transport failures, non-success statuses and unreadable
/// bodies are all errors, carrying the status when one was received.
async fn fetch_html(
    client: &reqwest::Client,
    url: &str,
) -> std::result::Result<(u16, String), (Option<u16>, anyhow::Error)> {
    let response = client
        .get(url)
        .send()
        .await
        .context("HTTP request failed")
        .map_err(|e| (None, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err((Some(status.as_u16()), anyhow::anyhow!("HTTP {} for {}", status, url)));
    }

    let html = response
        .text()
        .await
        .context("Failed to read response body")
        .map_err(|e| (Some(status.as_u16()), e))?;
    Ok((status.as_u16(), html))
}

/// Fetch a single page for offline use.
pub async fn fetch_single_page(url: &str) -> Result<String> {
    let client = client()?;
    fetch_html(&client, url)
        .await
        .map(|(_, html)| html)
        .map_err(|(_, e)| e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return its URL.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/showgame.php?game_id=1", addr)
    }

    #[tokio::test]
    async fn non_success_status_is_an_error_row() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let row = fetch_one(&client().unwrap(), 9, &url).await;
        assert_eq!(row.game_ref, 9);
        assert_eq!(row.url, url);
        assert_eq!(row.status, Some(503));
        assert!(row.html.is_none());
        assert!(row.error.as_deref().unwrap().contains("503"));
        assert!(row.latency_ms.is_some());
    }

    #[tokio::test]
    async fn success_keeps_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<p>board</p>\n",
        )
        .await;
        let row = fetch_one(&client().unwrap(), 1, &url).await;
        assert_eq!(row.status, Some(200));
        assert_eq!(row.html.as_deref(), Some("<p>board</p>\n"));
        assert_eq!(row.error, None);
    }

    #[tokio::test]
    async fn refused_connection_has_no_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let row = fetch_one(&client().unwrap(), 1, &format!("http://{}/", addr)).await;
        assert_eq!(row.status, None);
        assert!(row.html.is_none());
        assert!(row.error.is_some());
    }

    #[tokio::test]
    async fn single_page_surfaces_status_error() {
        let url = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let err = fetch_single_page(&url).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
