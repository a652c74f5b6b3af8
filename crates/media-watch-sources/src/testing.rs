//! A local HTTP/1.1 responder for exercising the HTTP adapters.

use crate::http::ApiClient;
use crate::retry::RetryPolicy;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Routes = Arc<Mutex<HashMap<String, VecDeque<(u16, String)>>>>;

/// Serves canned JSON keyed by `"METHOD /path"` (query ignored). A route
/// registered several times answers in order and then repeats its last reply.
/// Unknown routes answer 404.
pub struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(routes: &[(&str, u16, &str)]) -> Self {
        let mut table: HashMap<String, VecDeque<(u16, String)>> = HashMap::new();
        for (route, status, body) in routes {
            table
                .entry(route.to_string())
                .or_default()
                .push_back((*status, body.to_string()));
        }
        let routes: Routes = Arc::new(Mutex::new(table));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(answer(socket, routes.clone(), recorded.clone()));
            }
        });

        Self { base_url, requests }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request lines seen so far, e.g. `GET /api/v3/movie?tmdbId=603`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Client with a fast retry policy pointed at this server.
    pub fn client(&self) -> ApiClient {
        ApiClient::new(
            &self.base_url,
            "test-key".to_string(),
            Duration::from_secs(5),
            RetryPolicy::new(3, Duration::from_millis(1)),
        )
        .unwrap()
    }
}

async fn answer(mut socket: TcpStream, routes: Routes, requests: Arc<Mutex<Vec<String>>>) {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&head).to_string();
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let path = target.split('?').next().unwrap_or_default();
    requests.lock().unwrap().push(format!("{} {}", method, target));

    let (status, body) = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(&format!("{} {}", method, path)) {
            Some(replies) if replies.len() > 1 => replies.pop_front().unwrap(),
            Some(replies) => replies.front().cloned().unwrap(),
            None => (404, "{}".to_string()),
        }
    };

    let response = format!(
        "HTTP/1.1 {} STUB\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}
