//! Request/response contract with the scene manager.
//!
//! The crate does not ship an HTTP client. A transport implements
//! [`SceneManagerApi`] by sending a [`Request`] and decoding the response
//! body; [`SceneManagerClient`] feeds every response into the synchronizer.

use crate::error::{Result, StatusError, TransportError};
use crate::sync::StatusSynchronizer;
use crate::types::UpdateSummary;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// HTTP method a request is sent with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// The four requests the front end makes.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Fetch the full current status.
    FetchStatus,

    /// Restart the scene.
    Restart,

    /// Free-form action event, e.g. a transition or a microphone toggle.
    Event {
        action: String,
        payload: Map<String, Value>,
    },

    /// Chat message from a user.
    Chat { user: String, message: String },
}

impl Request {
    pub fn event(action: impl Into<String>, payload: Map<String, Value>) -> Self {
        Request::Event {
            action: action.into(),
            payload,
        }
    }

    pub fn chat(user: impl Into<String>, message: impl Into<String>) -> Self {
        Request::Chat {
            user: user.into(),
            message: message.into(),
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Request::FetchStatus | Request::Restart => Method::Get,
            Request::Event { .. } | Request::Chat { .. } => Method::Post,
        }
    }

    /// Endpoint relative to the scene manager's base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Request::FetchStatus => "/status",
            Request::Restart => "/restart",
            Request::Event { .. } | Request::Chat { .. } => "/message",
        }
    }

    /// JSON body, for POST requests.
    ///
    /// Event payload keys sit beside `action` in `data`; a payload key named
    /// `action` wins over the action name.
    pub fn body(&self) -> Option<Value> {
        match self {
            Request::FetchStatus | Request::Restart => None,
            Request::Event { action, payload } => {
                let mut data = Map::new();
                data.insert("action".to_string(), Value::String(action.clone()));
                data.extend(payload.iter().map(|(k, v)| (k.clone(), v.clone())));
                Some(json!({ "command": "event", "data": data }))
            }
            Request::Chat { user, message } => Some(json!({
                "command": "chat",
                "data": { "message": message, "user": user },
            })),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::FetchStatus => "fetch-status",
            Request::Restart => "restart",
            Request::Event { .. } => "event",
            Request::Chat { .. } => "chat",
        }
    }
}

/// Something that can deliver a [`Request`] to the scene manager.
pub trait SceneManagerApi {
    /// Send `request` and return the decoded response body.
    fn send(&self, request: &Request) -> std::result::Result<Value, TransportError>;
}

impl<A: SceneManagerApi + ?Sized> SceneManagerApi for Arc<A> {
    fn send(&self, request: &Request) -> std::result::Result<Value, TransportError> {
        (**self).send(request)
    }
}

/// Runs requests and applies their responses to the status store.
pub struct SceneManagerClient<A> {
    api: A,
    sync: Arc<StatusSynchronizer>,
}

impl<A: SceneManagerApi> SceneManagerClient<A> {
    pub fn new(api: A, sync: Arc<StatusSynchronizer>) -> Self {
        Self { api, sync }
    }

    pub fn synchronizer(&self) -> &Arc<StatusSynchronizer> {
        &self.sync
    }

    pub fn fetch_status(&self) -> Result<Option<UpdateSummary>> {
        self.request(&Request::FetchStatus)
    }

    pub fn restart(&self) -> Result<Option<UpdateSummary>> {
        self.request(&Request::Restart)
    }

    pub fn send_event(
        &self,
        action: &str,
        payload: Map<String, Value>,
    ) -> Result<Option<UpdateSummary>> {
        self.request(&Request::event(action, payload))
    }

    pub fn send_chat(&self, user: &str, message: &str) -> Result<Option<UpdateSummary>> {
        self.request(&Request::chat(user, message))
    }

    /// Send `request` and apply the response.
    ///
    /// A transport failure is logged and yields `Ok(None)`: the store keeps
    /// its last known state. A response that is not a mapping is an
    /// integration error and is returned as such.
    pub fn request(&self, request: &Request) -> Result<Option<UpdateSummary>> {
        match self.try_request(request) {
            Ok(summary) => Ok(Some(summary)),
            Err(StatusError::Transport(e)) => {
                tracing::warn!(
                    request = request.kind(),
                    endpoint = request.endpoint(),
                    error = %e,
                    "scene manager request failed"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`request`](Self::request), but transport failures are returned
    /// as [`StatusError::Transport`].
    pub fn try_request(&self, request: &Request) -> Result<UpdateSummary> {
        let response = self.api.send(request)?;
        self.sync.update(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StatusStore;
    use parking_lot::Mutex;

    struct Scripted {
        responses: Mutex<Vec<std::result::Result<Value, TransportError>>>,
        sent: Mutex<Vec<Request>>,
    }

    impl Scripted {
        fn new(responses: Vec<std::result::Result<Value, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl SceneManagerApi for Scripted {
        fn send(&self, request: &Request) -> std::result::Result<Value, TransportError> {
            self.sent.lock().push(request.clone());
            self.responses.lock().remove(0)
        }
    }

    fn client(
        responses: Vec<std::result::Result<Value, TransportError>>,
    ) -> (Arc<StatusStore>, SceneManagerClient<Scripted>) {
        let store = Arc::new(StatusStore::default());
        let sync = Arc::new(StatusSynchronizer::new(Arc::clone(&store)));
        (store, SceneManagerClient::new(Scripted::new(responses), sync))
    }

    #[test]
    fn test_request_shapes() {
        assert_eq!(Request::FetchStatus.method(), Method::Get);
        assert_eq!(Request::FetchStatus.endpoint(), "/status");
        assert_eq!(Request::Restart.endpoint(), "/restart");
        assert!(Request::Restart.body().is_none());

        let chat = Request::chat("Patient", "hello");
        assert_eq!(chat.method(), Method::Post);
        assert_eq!(chat.endpoint(), "/message");
        assert_eq!(
            chat.body(),
            Some(json!({"command": "chat", "data": {"message": "hello", "user": "Patient"}}))
        );
    }

    #[test]
    fn test_event_body_spreads_payload() {
        let mut payload = Map::new();
        payload.insert("listening".to_string(), json!("toggle"));
        let request = Request::event("microphone", payload);

        assert_eq!(
            request.body(),
            Some(json!({"command": "event", "data": {"action": "microphone", "listening": "toggle"}}))
        );
    }

    #[test]
    fn test_event_payload_action_overrides() {
        let mut payload = Map::new();
        payload.insert("action".to_string(), json!("other"));
        let body = Request::event("transition", payload).body().unwrap();
        assert_eq!(body["data"]["action"], "other");
    }

    #[test]
    fn test_response_applied() {
        let (store, client) = client(vec![Ok(json!({"scene-manager": {"state": "running"}}))]);

        let summary = client.fetch_status().unwrap().unwrap();
        assert!(summary.notified > 0);
        assert_eq!(store.get("scene-manager/state"), Some(json!("running")));
    }

    #[test]
    fn test_transport_failure_keeps_store() {
        let (store, client) = client(vec![
            Ok(json!({"scene-manager": {"state": "idle"}})),
            Err(TransportError::Request("connection refused".to_string())),
        ]);

        client.fetch_status().unwrap();
        let before = store.snapshot();

        let outcome = client.restart().unwrap();
        assert!(outcome.is_none());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_try_request_surfaces_transport_error() {
        let (_, client) = client(vec![Err(TransportError::InvalidBody("<html>".to_string()))]);
        let result = client.try_request(&Request::FetchStatus);
        assert!(matches!(
            result,
            Err(StatusError::Transport(TransportError::InvalidBody(_)))
        ));
    }

    #[test]
    fn test_malformed_response_is_error() {
        let (store, client) = client(vec![Ok(json!(["not", "a", "mapping"]))]);
        let before = store.snapshot();

        let result = client.send_chat("Patient", "...");
        assert!(matches!(result, Err(StatusError::MalformedUpdate(_))));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_requests_recorded() {
        let (_, client) = client(vec![Ok(json!({})), Ok(json!({}))]);
        client.send_event("transition", Map::new()).unwrap();
        client.send_chat("Patient", "hi").unwrap();

        let sent = client.api.sent.lock();
        assert_eq!(sent[0].kind(), "event");
        assert_eq!(sent[1], Request::chat("Patient", "hi"));
    }
}
