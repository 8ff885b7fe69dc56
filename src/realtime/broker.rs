//! STOMP-over-WebSocket subscriber with fixed-delay reconnects.
//!
//! Delivery is at-most-once: nothing is replayed after a reconnect.

use super::stomp::{self, Command, Frame};
use super::{BrokerSignal, SignalHandler, Subscriber, Subscription};
use crate::config::Config;
use crate::error::{QaHubError, Result};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub url: Url,
    pub heartbeat: Duration,
    pub reconnect_delay: Duration,
}

impl BrokerSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let url = Url::parse(&config.broker_url).map_err(|e| {
            QaHubError::Config(format!("invalid broker_url '{}': {}", config.broker_url, e))
        })?;
        Ok(Self {
            url,
            heartbeat: config.heartbeat(),
            reconnect_delay: config.reconnect_delay(),
        })
    }

    fn host(&self) -> &str {
        self.url.host_str().unwrap_or("localhost")
    }
}

pub struct StompBroker {
    settings: BrokerSettings,
    runtime: Handle,
    next_id: AtomicU64,
}

impl StompBroker {
    /// `runtime` is where connection tasks are spawned, so subscribing
    /// works from threads outside the runtime.
    pub fn new(settings: BrokerSettings, runtime: Handle) -> Self {
        Self {
            settings,
            runtime,
            next_id: AtomicU64::new(0),
        }
    }
}

impl Subscriber for StompBroker {
    fn subscribe(&self, topic: &str, handler: SignalHandler) -> Result<Subscription> {
        let id = format!("sub-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let (stop_tx, stop_rx) = oneshot::channel();
        self.runtime.spawn(run_subscription(
            self.settings.clone(),
            id,
            topic.to_string(),
            handler,
            stop_rx,
        ));
        Ok(Subscription::new(topic, move || {
            let _ = stop_tx.send(());
        }))
    }
}

enum SessionEnd {
    Stopped,
    Closed,
}

async fn run_subscription(
    settings: BrokerSettings,
    id: String,
    topic: String,
    handler: SignalHandler,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        match session(&settings, &id, &topic, &handler, &mut stop).await {
            Ok(SessionEnd::Stopped) => {
                debug!(topic = %topic, "subscription stopped");
                return;
            }
            Ok(SessionEnd::Closed) => info!(topic = %topic, "broker closed the connection"),
            Err(e) => warn!(topic = %topic, error = %e, "broker connection failed"),
        }
        handler(BrokerSignal::Disconnected);

        tokio::select! {
            _ = &mut stop => return,
            _ = tokio::time::sleep(settings.reconnect_delay) => {}
        }
        debug!(topic = %topic, "reconnecting to broker");
    }
}

async fn session(
    settings: &BrokerSettings,
    id: &str,
    topic: &str,
    handler: &SignalHandler,
    stop: &mut oneshot::Receiver<()>,
) -> Result<SessionEnd> {
    let connect = tokio_tungstenite::connect_async(settings.url.as_str());
    let (ws, _) = tokio::select! {
        _ = &mut *stop => return Ok(SessionEnd::Stopped),
        result = connect => result.map_err(broker_error)?,
    };
    let (mut sink, mut stream) = ws.split();

    send(&mut sink, Frame::connect(settings.host(), settings.heartbeat)).await?;
    let connected = tokio::select! {
        _ = &mut *stop => return Ok(SessionEnd::Stopped),
        frame = await_connected(&mut stream) => frame?,
    };
    let heartbeat = stomp::negotiate_heartbeat(settings.heartbeat, connected.get("heart-beat"));
    debug!(version = ?connected.get("version"), ?heartbeat, "STOMP session established");

    send(&mut sink, Frame::subscribe(id, topic)).await?;
    handler(BrokerSignal::Subscribed);
    info!(topic = %topic, "subscribed");

    let mut ticker = tokio::time::interval(heartbeat.unwrap_or(Duration::from_secs(3600)));
    loop {
        tokio::select! {
            _ = &mut *stop => {
                let _ = send(&mut sink, Frame::unsubscribe(id)).await;
                let _ = send(&mut sink, Frame::disconnect()).await;
                let _ = sink.close().await;
                return Ok(SessionEnd::Stopped);
            }
            _ = ticker.tick(), if heartbeat.is_some() => {
                sink.send(Message::Text(stomp::HEARTBEAT.into()))
                    .await
                    .map_err(broker_error)?;
            }
            msg = stream.next() => {
                let text = match msg {
                    None | Some(Ok(Message::Close(_))) => return Ok(SessionEnd::Closed),
                    Some(Err(e)) => return Err(broker_error(e)),
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(_)) => continue,
                };
                for frame in stomp::decode_all(text.as_str())? {
                    match frame.command {
                        Command::Message => handler(BrokerSignal::Message(frame.body)),
                        Command::Error => return Err(error_frame(&frame)),
                        other => debug!(command = %other, "ignoring frame"),
                    }
                }
            }
        }
    }
}

async fn await_connected<S>(stream: &mut S) -> Result<Frame>
where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        let text = match msg.map_err(broker_error)? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        for frame in stomp::decode_all(text.as_str())? {
            match frame.command {
                Command::Connected => return Ok(frame),
                Command::Error => return Err(error_frame(&frame)),
                _ => {}
            }
        }
    }
    Err(QaHubError::Broker(
        "connection closed before CONNECTED".to_string(),
    ))
}

async fn send<S>(sink: &mut S, frame: Frame) -> Result<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    sink.send(Message::Text(frame.encode().into()))
        .await
        .map_err(broker_error)
}

fn error_frame(frame: &Frame) -> QaHubError {
    let message = frame.get("message").unwrap_or("broker error");
    error!(reason = message, body = %frame.body, "broker sent ERROR frame");
    QaHubError::Broker(format!("{}: {}", message, frame.body.trim()))
}

fn broker_error(err: tungstenite::Error) -> QaHubError {
    QaHubError::Broker(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio::time::{timeout, Instant};
    use tokio_tungstenite::WebSocketStream;

    const TOPIC: &str = "/topic/project/3/runs";

    fn local_settings(listener: &TcpListener, reconnect_delay: Duration) -> BrokerSettings {
        let addr = listener.local_addr().unwrap();
        BrokerSettings {
            url: Url::parse(&format!("ws://{}/ws/websocket", addr)).unwrap(),
            heartbeat: Duration::ZERO,
            reconnect_delay,
        }
    }

    fn recording_handler() -> (SignalHandler, mpsc::UnboundedReceiver<BrokerSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: SignalHandler = Arc::new(move |signal| {
            let _ = tx.send(signal);
        });
        (handler, rx)
    }

    async fn next_signal(rx: &mut mpsc::UnboundedReceiver<BrokerSignal>) -> BrokerSignal {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no signal within 5s")
            .expect("handler dropped")
    }

    async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (tcp, _) = timeout(Duration::from_secs(5), listener.accept())
            .await
            .expect("client did not connect")
            .unwrap();
        tokio_tungstenite::accept_async(tcp).await.unwrap()
    }

    /// Next STOMP frame from the client, skipping heart-beats.
    async fn read_frame(ws: &mut WebSocketStream<TcpStream>) -> Frame {
        loop {
            let msg = timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("no frame within 5s");
            match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(frame) = stomp::decode_all(text.as_str()).unwrap().into_iter().next() {
                        return frame;
                    }
                }
                Some(Ok(_)) => {}
                other => panic!("client socket ended: {:?}", other),
            }
        }
    }

    async fn write_frame(ws: &mut WebSocketStream<TcpStream>, frame: Frame) {
        ws.send(Message::Text(frame.encode().into())).await.unwrap();
    }

    #[tokio::test]
    async fn test_session_reconnects_delivers_and_unsubscribes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let delay = Duration::from_millis(50);
        let broker = StompBroker::new(local_settings(&listener, delay), Handle::current());
        let (handler, mut signals) = recording_handler();
        let subscription = broker.subscribe(TOPIC, handler).unwrap();

        let mut ws = accept(&listener).await;
        let connect = read_frame(&mut ws).await;
        assert_eq!(connect.command, Command::Connect);
        assert_eq!(connect.get("accept-version"), Some("1.2"));
        write_frame(&mut ws, Frame::new(Command::Connected).header("version", "1.2")).await;
        let subscribe = read_frame(&mut ws).await;
        assert_eq!(subscribe.command, Command::Subscribe);
        assert_eq!(subscribe.get("destination"), Some(TOPIC));
        assert_eq!(subscribe.get("id"), Some("sub-0"));
        assert_eq!(next_signal(&mut signals).await, BrokerSignal::Subscribed);

        // An ERROR frame ends the session.
        let ended = Instant::now();
        write_frame(
            &mut ws,
            Frame::new(Command::Error).header("message", "session expired"),
        )
        .await;
        assert_eq!(next_signal(&mut signals).await, BrokerSignal::Disconnected);
        drop(ws);

        let mut ws = accept(&listener).await;
        assert!(ended.elapsed() >= delay);
        assert_eq!(read_frame(&mut ws).await.command, Command::Connect);
        write_frame(&mut ws, Frame::new(Command::Connected)).await;
        assert_eq!(read_frame(&mut ws).await.command, Command::Subscribe);
        assert_eq!(next_signal(&mut signals).await, BrokerSignal::Subscribed);

        let body = r#"{"runId":9,"status":"Unhealthy"}"#;
        write_frame(
            &mut ws,
            Frame::new(Command::Message)
                .header("destination", TOPIC)
                .header("subscription", "sub-0")
                .body(body),
        )
        .await;
        assert_eq!(
            next_signal(&mut signals).await,
            BrokerSignal::Message(body.to_string())
        );

        subscription.unsubscribe();
        let unsubscribe = read_frame(&mut ws).await;
        assert_eq!(unsubscribe.command, Command::Unsubscribe);
        assert_eq!(unsubscribe.get("id"), Some("sub-0"));
        assert_eq!(read_frame(&mut ws).await.command, Command::Disconnect);
    }

    #[tokio::test]
    async fn test_connection_dropped_before_connected_is_retried() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let delay = Duration::from_millis(50);
        let broker = StompBroker::new(local_settings(&listener, delay), Handle::current());
        let (handler, mut signals) = recording_handler();
        let _subscription = broker.subscribe(TOPIC, handler).unwrap();

        let mut ws = accept(&listener).await;
        assert_eq!(read_frame(&mut ws).await.command, Command::Connect);
        let dropped = Instant::now();
        drop(ws);
        assert_eq!(next_signal(&mut signals).await, BrokerSignal::Disconnected);

        let mut ws = accept(&listener).await;
        assert!(dropped.elapsed() >= delay);
        assert_eq!(read_frame(&mut ws).await.command, Command::Connect);
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            broker_url: "ws://broker.internal:61614/ws/websocket".into(),
            ..Config::default()
        };
        let settings = BrokerSettings::from_config(&config).unwrap();
        assert_eq!(settings.host(), "broker.internal");
        assert_eq!(settings.heartbeat, Duration::from_millis(4000));
        assert_eq!(settings.reconnect_delay, Duration::from_millis(5000));
    }

    #[test]
    fn test_bad_broker_url() {
        let config = Config {
            broker_url: "::nope".into(),
            ..Config::default()
        };
        assert!(BrokerSettings::from_config(&config).is_err());
    }

    #[test]
    fn test_error_frame_message() {
        let frame = Frame::new(Command::Error)
            .header("message", "access denied")
            .body("no such topic\n");
        let err = error_frame(&frame);
        assert_eq!(err.to_string(), "Broker error: access denied: no such topic");
    }
}
