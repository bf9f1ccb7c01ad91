//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
pub(crate) type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;

/// Upper bound for a single CDP round trip.
pub(crate) const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Pending request waiting for response.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// Shared write half of the browser WebSocket.
///
/// The client and every page session send through the same connection and
/// share one id counter, so responses can be routed by id alone.
#[derive(Clone)]
pub(crate) struct Transport {
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    request_id: Arc<AtomicU64>,
    pending: PendingMap,
}

impl Transport {
    /// Send a CDP command and wait for its response.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }
}

/// CDP client connected to one browser.
pub struct CdpClient {
    /// HTTP endpoint for page discovery.
    http_endpoint: String,
    browser_ws_url: String,
    transport: Transport,
    _recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at the given endpoint, e.g. `http://localhost:9222`.
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;

        debug!(
            "Connected to browser: {} (protocol {})",
            version.browser, version.protocol_version
        );

        let browser_ws_url = version.web_socket_debugger_url;
        url::Url::parse(&browser_ws_url)?;

        let (ws_stream, _) = tokio_tungstenite::connect_async(&browser_ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let recv_task = {
            let pending = pending.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending).await;
            })
        };

        debug!("CDP client connected to {}", browser_ws_url);

        Ok(Self {
            http_endpoint,
            browser_ws_url,
            transport: Transport {
                ws_tx: Arc::new(tokio::sync::Mutex::new(ws_sink)),
                request_id: Arc::new(AtomicU64::new(1)),
                pending,
            },
            _recv_task: recv_task,
        })
    }

    /// WebSocket receive loop. Events are not consumed; only responses are routed.
    async fn receive_loop(mut ws_source: WsSource, pending: PendingMap) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => route_response(resp, &pending),
                        Err(e) => warn!("Failed to parse CDP message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        // Dropping the senders wakes every waiter with SessionClosed.
        pending.lock().clear();
    }

    /// Send a browser-level CDP command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.transport.call(method, params, None).await
    }

    pub fn browser_ws_url(&self) -> &str {
        &self.browser_ws_url
    }

    /// List open pages.
    pub async fn list_pages(&self) -> Result<Vec<PageInfo>, CdpError> {
        let url = format!("{}/json/list", self.http_endpoint);
        let pages: Vec<PageInfo> = reqwest::get(&url).await?.json().await?;
        Ok(pages)
    }

    /// Create a new page/tab and attach to it.
    pub async fn new_page(&self, url: Option<&str>) -> Result<PageSession, CdpError> {
        // Chrome requires PUT for /json/new
        let create_url = match url {
            Some(u) => format!("{}/json/new?{}", self.http_endpoint, u),
            None => format!("{}/json/new", self.http_endpoint),
        };

        let page_info: PageInfo = reqwest::Client::new()
            .put(&create_url)
            .send()
            .await?
            .json()
            .await?;
        debug!("Created new page: {} - {}", page_info.id, page_info.url);

        self.attach_page(&page_info.id).await
    }

    /// Attach to an existing page target.
    pub async fn attach_page(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let session = PageSession::new(target_id.to_string(), session_id, self.transport.clone());
        session.enable_domains().await?;
        Ok(session)
    }

    /// Close a page target.
    pub async fn close_page(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({"targetId": target_id})))
            .await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}

/// Deliver a response to the request that is waiting for it.
fn route_response(resp: CdpResponse, pending: &PendingMap) {
    let Some(id) = resp.id else {
        if let Some(method) = resp.method {
            trace!("CDP event {} (session {:?})", method, resp.session_id);
        }
        return;
    };

    let Some(req) = pending.lock().remove(&id) else {
        return;
    };

    let result = match resp.error {
        Some(error) => Err(CdpError::Protocol {
            code: error.code,
            message: error.message,
        }),
        None => Ok(resp.result.unwrap_or(Value::Null)),
    };
    let _ = req.tx.send(result);
}
