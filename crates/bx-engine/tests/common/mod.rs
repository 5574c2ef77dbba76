use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Minimal single-request-per-connection HTTP stub standing in for the
/// remote index service. Always 404s `manifest` and 200s everything else,
/// which is enough to exercise a full base-branch scan end to end.
pub struct StubServer {
    pub addr: String,
    pub upsert_calls: Arc<AtomicUsize>,
    pub delete_calls: Arc<AtomicUsize>,
}

impl StubServer {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let upsert_calls = Arc::new(AtomicUsize::new(0));
        let delete_calls = Arc::new(AtomicUsize::new(0));

        let upsert_calls_bg = upsert_calls.clone();
        let delete_calls_bg = delete_calls.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let upsert_calls = upsert_calls_bg.clone();
                let delete_calls = delete_calls_bg.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let Ok(n) = socket.read(&mut buf).await else {
                        return;
                    };
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let first_line = request.lines().next().unwrap_or("");
                    let mut parts = first_line.split_whitespace();
                    let method = parts.next().unwrap_or("");
                    let path = parts.next().unwrap_or("");

                    if method == "PUT" && path.starts_with("/api/codebase-indexing/upsert") {
                        upsert_calls.fetch_add(1, Ordering::SeqCst);
                    }
                    if method == "DELETE" {
                        delete_calls.fetch_add(1, Ordering::SeqCst);
                    }

                    let response = if method == "GET" && path.starts_with("/api/codebase-indexing/manifest") {
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    } else if method == "POST" && path.starts_with("/api/codebase-indexing/search") {
                        let body = "[]";
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else {
                        let body = "{}";
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    };
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            addr: format!("http://{addr}"),
            upsert_calls,
            delete_calls,
        }
    }

    pub fn resolver(&self) -> bx_remote::FixedUrlResolver {
        bx_remote::FixedUrlResolver(url::Url::parse(&self.addr).unwrap())
    }
}

pub fn init_repo(root: &std::path::Path) {
    run_git(root, &["init", "-q", "-b", "main"]);
    run_git(root, &["config", "user.email", "t@example.com"]);
    run_git(root, &["config", "user.name", "Test"]);
}

pub fn run_git(root: &std::path::Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

pub fn commit_all(root: &std::path::Path, msg: &str) {
    run_git(root, &["add", "."]);
    run_git(root, &["commit", "-q", "-m", msg]);
}
