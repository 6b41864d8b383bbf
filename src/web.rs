//! HTTP control API. Every route decodes its query string into exactly one
//! Event Manager call and answers with a plain-text status.

use std::sync::Arc;

use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use log::warn;
use serde::Deserialize;

use crate::error::EncodingError;
use crate::error::EventError;
use crate::event_manager::EventManager;
use crate::hw_types::Board;
use crate::hw_types::Relay;
use crate::hw_types::RelayState;
use crate::led_cmd::LedCommand;
use crate::led_cmd::LedEffect;
use crate::led_cmd::Rgb;

#[derive(Debug, Deserialize)]
struct RelayQuery {
    board: u8,
    relay: u8,
    state: String,
}

#[derive(Debug, Deserialize)]
struct RelaysQuery {
    boards: String,
    relays: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct LedQuery {
    preset: Option<String>,
    effect: Option<String>,
    speed: Option<u8>,
    color1: Option<String>,
    color2: Option<String>,
}

enum WebError {
    BadRequest(EncodingError),
    Event(EventError),
    Internal(String),
}

impl From<EncodingError> for WebError {
    fn from(e: EncodingError) -> Self {
        WebError::BadRequest(e)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            WebError::Event(e @ EventError::ChannelUnavailable { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            WebError::Event(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            WebError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        warn!("Request failed with {}: {}", status, message);
        (status, message).into_response()
    }
}

pub fn router(manager: Arc<EventManager>) -> Router {
    Router::new()
        .route("/relays/off", get(all_off).post(all_off))
        .route("/relay", get(relay).post(relay))
        .route("/relays", get(relays).post(relays))
        .route("/led", get(led).post(led))
        .with_state(manager)
}

/// Runs a blocking hardware operation off the async workers.
async fn dispatch<F>(manager: Arc<EventManager>, op: F) -> Result<&'static str, WebError>
where
    F: FnOnce(&EventManager) -> Result<(), EventError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&manager))
        .await
        .map_err(|e| WebError::Internal(e.to_string()))?
        .map_err(WebError::Event)?;
    Ok("OK")
}

async fn all_off(State(manager): State<Arc<EventManager>>) -> Result<&'static str, WebError> {
    dispatch(manager, |m| m.set_all_off()).await
}

async fn relay(
    State(manager): State<Arc<EventManager>>,
    Query(query): Query<RelayQuery>,
) -> Result<&'static str, WebError> {
    let board = Board::from_number(query.board)?;
    let relay = Relay::from_number(query.relay)?;
    let state = RelayState::from_name(&query.state)?;
    dispatch(manager, move |m| m.set_relay(board, relay, state)).await
}

async fn relays(
    State(manager): State<Arc<EventManager>>,
    Query(query): Query<RelaysQuery>,
) -> Result<&'static str, WebError> {
    let boards = parse_list("board", &query.boards, Board::from_number)?;
    let relays = parse_list("relay", &query.relays, Relay::from_number)?;
    let state = RelayState::from_name(&query.state)?;
    dispatch(manager, move |m| m.set_relays(&boards, &relays, state)).await
}

async fn led(
    State(manager): State<Arc<EventManager>>,
    Query(query): Query<LedQuery>,
) -> Result<&'static str, WebError> {
    let command = led_command(query)?;
    dispatch(manager, move |m| m.send_serial_command(&command)).await
}

fn led_command(query: LedQuery) -> Result<LedCommand, EncodingError> {
    if let Some(preset) = query.preset {
        return LedCommand::preset(&preset);
    }
    let effect = match query.effect {
        Some(effect) => LedEffect::from_name(&effect)?,
        None => return Err(EncodingError::LedEffect(String::new())),
    };
    let color = |hex: Option<String>| match hex {
        Some(hex) => Rgb::from_hex(&hex),
        None => Ok(Rgb::BLACK),
    };
    Ok(LedCommand::new(
        effect,
        query.speed.unwrap_or(0),
        color(query.color1)?,
        color(query.color2)?,
    ))
}

/// Parses a non-empty comma separated list of 1-based numbers such as `1,2`.
fn parse_list<T, F>(kind: &'static str, list: &str, lookup: F) -> Result<Vec<T>, EncodingError>
where
    F: Fn(u8) -> Result<T, EncodingError>,
{
    let items = list
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.parse::<u8>() {
            Ok(number) => lookup(number),
            Err(_) => Err(EncodingError::NotANumber {
                kind,
                value: item.to_string(),
            }),
        })
        .collect::<Result<Vec<T>, EncodingError>>()?;
    if items.is_empty() {
        return Err(EncodingError::EmptyList(kind));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;
    use crate::relay_bus::RelayBus;
    use crate::relay_cmd::RelayCommand;
    use crate::serial::SerialLink;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    type Log = Arc<Mutex<Vec<String>>>;

    struct LoggingBus(Log);

    impl RelayBus for LoggingBus {
        fn apply(&mut self, command: &RelayCommand) -> Result<(), DriverError> {
            self.0.lock().unwrap().push(command.to_string());
            Ok(())
        }
    }

    struct LoggingSerial(Log);

    impl SerialLink for LoggingSerial {
        fn send(&mut self, payload: &[u8]) -> Result<(), DriverError> {
            self.0
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(payload).to_string());
            Ok(())
        }
    }

    fn app(with_serial: bool) -> (Router, Log, Log) {
        let bus = Log::default();
        let serial = Log::default();
        let link: Option<Box<dyn SerialLink>> = match with_serial {
            true => Some(Box::new(LoggingSerial(serial.clone()))),
            false => None,
        };
        let manager = EventManager::new(
            Box::new(LoggingBus(bus.clone())),
            link,
            Duration::from_secs(1),
        );
        (router(Arc::new(manager)), bus, serial)
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::post(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn relay_route_sets_one_relay() {
        let (app, bus, _) = app(true);
        let (status, body) = call(app, "/relay?board=1&relay=3&state=on").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
        assert_eq!(*bus.lock().unwrap(), vec!["0x10 0x03 0xFF"]);
    }

    #[tokio::test]
    async fn relays_route_sweeps_cross_product() {
        let (app, bus, _) = app(true);
        let (status, _) = call(app, "/relays?boards=2,1&relays=4&state=off").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            *bus.lock().unwrap(),
            vec!["0x11 0x04 0x00", "0x10 0x04 0x00"]
        );
    }

    #[tokio::test]
    async fn all_off_route_resets_every_relay() {
        let (app, bus, _) = app(true);
        let response = app
            .oneshot(Request::get("/relays/off").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(bus.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn invalid_identifiers_are_rejected() {
        let (app, bus, _) = app(true);
        let (status, body) = call(app.clone(), "/relay?board=3&relay=1&state=on").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid board number '3'");

        let (status, body) = call(app.clone(), "/relays?boards=1,x&relays=1&state=on").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid board number 'x'");

        let (status, body) = call(app.clone(), "/relays?boards=1,300&relays=1&state=on").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid board number '300'");

        let (status, body) = call(app.clone(), "/relays?boards=&relays=1&state=on").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "At least one board is required");

        let (status, body) = call(app.clone(), "/relays?boards=1&relays=,&state=on").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "At least one relay is required");

        let (status, _) = call(app, "/relay?board=1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(bus.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn led_route_accepts_presets_and_explicit_effects() {
        let (app, _, serial) = app(true);
        let (status, _) = call(app.clone(), "/led?preset=initial").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(app, "/led?effect=blink&speed=40&color1=00FF00").await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(
            *serial.lock().unwrap(),
            vec!["5:20:255:0:0:0:0:255\n", "3:40:0:255:0:0:0:0\n"]
        );
    }

    #[tokio::test]
    async fn led_route_reports_missing_serial_link() {
        let (app, bus, _) = app(false);
        let (status, body) = call(app.clone(), "/led?preset=red").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("Serial link is not connected"));

        let (status, _) = call(app, "/relay?board=2&relay=2&state=on").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bus.lock().unwrap().len(), 1);
    }
}
