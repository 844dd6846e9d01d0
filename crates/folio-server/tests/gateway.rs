use std::collections::HashSet;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

use folio_api::auth::create_token;
use folio_api::state::AppState;
use folio_db::Database;
use folio_db::convert::timestamp;
use folio_db::models::NewMagazine;
use folio_server::config::Config;
use folio_types::events::{GatewayCommand, GatewayEvent, Topic};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SECRET: &str = "gateway-test-secret";

async fn serve() -> (AppState, String) {
    let config = Config {
        jwt_secret: SECRET.into(),
        db_path: ":memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        admins: HashSet::from(["chief".to_string()]),
        admin_password: None,
        max_image_bytes: 1024,
        editor_idle: Duration::from_secs(60),
    };
    let state = folio_server::state(&config, Database::open_in_memory().unwrap());
    let app = folio_server::app(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (state, format!("ws://{}/gateway", addr))
}

async fn send(ws: &mut Socket, cmd: GatewayCommand) {
    let text = serde_json::to_string(&cmd).unwrap();
    ws.send(Message::text(text)).await.unwrap();
}

async fn next_event(ws: &mut Socket) -> GatewayEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {:?}", other),
            }
        }
    })
    .await
    .unwrap()
}

async fn identify(url: &str, username: &str, admin: bool) -> Socket {
    let (mut ws, _) = connect_async(url).await.unwrap();
    let token = create_token(SECRET, Uuid::new_v4(), username, admin).unwrap();
    send(&mut ws, GatewayCommand::Identify { token }).await;

    match next_event(&mut ws).await {
        GatewayEvent::Ready { username: name, admin: granted, .. } => {
            assert_eq!(name, username);
            assert_eq!(granted, admin);
        }
        other => panic!("expected Ready, got {:?}", other),
    }
    ws
}

fn publish(db: &Database, title: &str) -> Uuid {
    let id = Uuid::new_v4();
    db.insert_magazine(&NewMagazine {
        id: &id.to_string(),
        title,
        description: "",
        cover_image_url: "",
        content: "Hello",
        created_at: &timestamp(chrono::Utc::now()),
    })
    .unwrap();
    id
}

#[tokio::test]
async fn subscribers_get_a_snapshot_then_every_change() {
    let (state, url) = serve().await;
    let mut ws = identify(&url, "reader-1", false).await;

    send(&mut ws, GatewayCommand::Subscribe { topics: vec![Topic::Magazines] }).await;
    match next_event(&mut ws).await {
        GatewayEvent::MagazinesSnapshot { magazines } => assert!(magazines.is_empty()),
        other => panic!("expected MagazinesSnapshot, got {:?}", other),
    }

    let id = publish(&state.db, "Issue 1");
    state.dispatcher.notify(Topic::Magazines);

    match next_event(&mut ws).await {
        GatewayEvent::MagazinesSnapshot { magazines } => {
            assert_eq!(magazines.len(), 1);
            assert_eq!(magazines[0].id, id);
            assert_eq!(magazines[0].title, "Issue 1");
        }
        other => panic!("expected MagazinesSnapshot, got {:?}", other),
    }
}

#[tokio::test]
async fn unsubscribe_releases_the_watch() {
    let (state, url) = serve().await;
    let mut ws = identify(&url, "reader-1", false).await;
    let id = publish(&state.db, "Issue 1");
    let topic = Topic::Magazine(id);

    send(&mut ws, GatewayCommand::Subscribe { topics: vec![topic] }).await;
    match next_event(&mut ws).await {
        GatewayEvent::MagazineSnapshot { magazine_id, magazine } => {
            assert_eq!(magazine_id, id);
            assert_eq!(magazine.map(|m| m.views), Some(0));
        }
        other => panic!("expected MagazineSnapshot, got {:?}", other),
    }
    assert_eq!(state.dispatcher.watcher_count(&topic), 1);

    send(&mut ws, GatewayCommand::Unsubscribe { topics: vec![topic] }).await;
    let mut released = false;
    for _ in 0..100 {
        if state.dispatcher.watcher_count(&topic) == 0 {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(released);
}

#[tokio::test]
async fn feedback_topic_needs_admin() {
    let (_state, url) = serve().await;

    let mut reader = identify(&url, "reader-1", false).await;
    send(&mut reader, GatewayCommand::Subscribe { topics: vec![Topic::Feedback] }).await;
    match next_event(&mut reader).await {
        GatewayEvent::SubscriptionError { topic, .. } => assert_eq!(topic, Topic::Feedback),
        other => panic!("expected SubscriptionError, got {:?}", other),
    }

    let mut chief = identify(&url, "chief", true).await;
    send(&mut chief, GatewayCommand::Subscribe { topics: vec![Topic::Feedback] }).await;
    match next_event(&mut chief).await {
        GatewayEvent::FeedbackSnapshot { feedback } => assert!(feedback.is_empty()),
        other => panic!("expected FeedbackSnapshot, got {:?}", other),
    }
}

#[tokio::test]
async fn bad_token_is_disconnected() {
    let (_state, url) = serve().await;
    let (mut ws, _) = connect_async(&url).await.unwrap();
    send(&mut ws, GatewayCommand::Identify { token: "not-a-jwt".into() }).await;

    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => panic!("unexpected event {}", text.as_str()),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}
