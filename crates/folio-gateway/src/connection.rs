use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use folio_db::Database;
use folio_types::api::Claims;
use folio_types::events::{GatewayCommand, GatewayEvent, Topic};

use crate::dispatcher::{Dispatcher, Subscription};
use crate::snapshot;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// How long a fresh socket has to send `Identify`.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a single WebSocket connection: identify, then serve live
/// subscriptions until the client leaves.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let claims = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(claims) => claims,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("{} ({}) connected to gateway", claims.username, claims.sub);

    let ready = GatewayEvent::Ready {
        user_id: claims.sub,
        username: claims.username.clone(),
        admin: claims.admin,
    };
    let Some(ready) = encode(&ready) else { return };
    if sender.send(ready).await.is_err() {
        return;
    }

    run_connection_loop(sender, receiver, dispatcher, db, claims).await;
}

/// Per-connection subscription tasks. Dropping the set aborts every task,
/// which drops its [`Subscription`] and deregisters it.
#[derive(Default)]
struct SubscriptionTasks {
    tasks: HashMap<Topic, JoinHandle<()>>,
}

impl SubscriptionTasks {
    fn contains(&self, topic: &Topic) -> bool {
        self.tasks.contains_key(topic)
    }

    fn insert(&mut self, topic: Topic, task: JoinHandle<()>) {
        if let Some(previous) = self.tasks.insert(topic, task) {
            previous.abort();
        }
    }

    fn cancel(&mut self, topic: &Topic) -> bool {
        match self.tasks.remove(topic) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for SubscriptionTasks {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    claims: Claims,
) {
    // Snapshots from every subscription task funnel through here
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<GatewayEvent>();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward snapshots -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    let Some(event) = event else { break };
                    let Some(msg) = encode(&event) else { continue };
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let username = claims.username.clone();
    let user_id = claims.sub;
    let mut recv_task = tokio::spawn(async move {
        let mut subscriptions = SubscriptionTasks::default();

        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&dispatcher, &db, &claims, cmd, &mut subscriptions, &events_tx);
                    }
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            claims.username,
                            claims.sub,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("{} ({}) disconnected from gateway", username, user_id);
}

fn handle_command(
    dispatcher: &Dispatcher,
    db: &Arc<Database>,
    claims: &Claims,
    cmd: GatewayCommand,
    subscriptions: &mut SubscriptionTasks,
    events_tx: &mpsc::UnboundedSender<GatewayEvent>,
) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::Subscribe { topics } => {
            for topic in topics {
                if topic.requires_admin() && !claims.admin {
                    warn!("{} ({}) refused subscription to {}", claims.username, claims.sub, topic.path());
                    let _ = events_tx.send(GatewayEvent::SubscriptionError {
                        topic,
                        message: "admin access required".into(),
                    });
                    continue;
                }
                if subscriptions.contains(&topic) {
                    continue;
                }

                info!("{} ({}) subscribed to {}", claims.username, claims.sub, topic.path());
                // Watch before the first load so no change can slip between them
                let subscription = dispatcher.watch(topic);
                let task = tokio::spawn(watch_topic(subscription, db.clone(), events_tx.clone()));
                subscriptions.insert(topic, task);
            }
        }

        GatewayCommand::Unsubscribe { topics } => {
            for topic in topics {
                if subscriptions.cancel(&topic) {
                    info!("{} ({}) unsubscribed from {}", claims.username, claims.sub, topic.path());
                }
            }
        }
    }
}

/// Deliver the topic's full result set now and after every change.
async fn watch_topic(
    mut subscription: Subscription,
    db: Arc<Database>,
    events_tx: mpsc::UnboundedSender<GatewayEvent>,
) {
    let topic = subscription.topic();
    loop {
        let db = db.clone();
        let event = match tokio::task::spawn_blocking(move || snapshot::load(&db, topic)).await {
            Ok(Ok(event)) => event,
            Ok(Err(e)) => {
                error!("Failed to load snapshot for {}: {}", topic.path(), e);
                GatewayEvent::SubscriptionError {
                    topic,
                    message: "failed to load snapshot".into(),
                }
            }
            Err(e) => {
                error!("spawn_blocking join error: {}", e);
                break;
            }
        };

        if events_tx.send(event).is_err() {
            break;
        }
        if !subscription.changed().await {
            break;
        }
    }
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Claims> {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some(token_data.claims);
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify).await.ok().flatten()
}

fn encode(event: &GatewayEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            error!("Failed to encode gateway event: {}", e);
            None
        }
    }
}
