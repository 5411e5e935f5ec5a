use request_http_parser::parser::Request as HttpRequest;
use serde::Serialize;
use tracing::{error, info, warn};

use super::{
    model::PushSubscription,
    payload::NotificationPayload,
    sender::PushSender,
    store::{AddOutcome, SubscriptionStore},
};
use crate::{
    error::Result,
    server::{BAD_REQUEST, CREATED, INTERNAL_ERROR, OK_RESPONSE, OK_RESPONSE_JSON},
};

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub sent: usize,
    pub removed: usize,
}

pub struct Notification<S> {
    store: SubscriptionStore,
    sender: S,
}

impl<S: PushSender> Notification<S> {
    pub fn new(store: SubscriptionStore, sender: S) -> Self {
        Self { store, sender }
    }

    /// `POST /register-subscription`. Returns `(status head, content)`.
    pub async fn register_subs(&self, request: &HttpRequest) -> (String, String) {
        let body = match &request.body {
            Some(body) => body,
            None => return (BAD_REQUEST.to_string(), "Invalid request".to_string()),
        };
        let push_subscription = match parse_subscription(body) {
            Some(push_subscription) => push_subscription,
            None => return (BAD_REQUEST.to_string(), "Invalid request".to_string()),
        };

        match self.store.add(push_subscription.clone()).await {
            Ok(AddOutcome::Created) => {
                info!(id = push_subscription.short_id(), "Created new subscription");
                (CREATED.to_string(), "Subscription created".to_string())
            }
            Ok(AddOutcome::AlreadyExists) => {
                info!(id = push_subscription.short_id(), "Subscription already exists");
                (OK_RESPONSE.to_string(), "Subscription already exists".to_string())
            }
            Err(e) => {
                error!("Failed to store subscription: {e}");
                (INTERNAL_ERROR.to_string(), "".to_string())
            }
        }
    }

    /// `POST /push-notification`: fans the payload out to every subscriber.
    pub async fn push_notification(&self, request: &HttpRequest) -> (String, String) {
        let payload = match request
            .body
            .as_deref()
            .map(NotificationPayload::from_json)
        {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => return (BAD_REQUEST.to_string(), e.to_string()),
            None => return (BAD_REQUEST.to_string(), "Invalid request".to_string()),
        };

        match self.broadcast(&payload).await {
            Ok(report) => (
                OK_RESPONSE_JSON.to_string(),
                serde_json::to_string(&report).unwrap_or_default(),
            ),
            Err(e) => {
                error!("Broadcast failed: {e}");
                (INTERNAL_ERROR.to_string(), "".to_string())
            }
        }
    }

    /// Sends `payload` to all stored subscriptions. A subscription whose
    /// delivery fails is removed from the store.
    pub async fn broadcast(&self, payload: &NotificationPayload) -> Result<BroadcastReport> {
        let subscriptions = self.store.all().await?;
        if subscriptions.is_empty() {
            info!("No subscriptions");
            return Ok(BroadcastReport::default());
        }

        let data = serde_json::to_vec(payload)?;
        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();
        for subscription in &subscriptions {
            match self.sender.send(subscription, &data).await {
                Ok(()) => {
                    info!(id = subscription.short_id(), "Web Push delivered");
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(id = subscription.short_id(), "Push failed; removing subscription: {e}");
                    failed.push(subscription.endpoint.clone());
                }
            }
        }
        report.removed = self.store.remove(&failed).await?;
        Ok(report)
    }
}

/// A subscription body must carry `endpoint` (an absolute URL) and `keys`.
fn parse_subscription(body: &str) -> Option<PushSubscription> {
    let subscription: PushSubscription = serde_json::from_str(body).ok()?;
    url::Url::parse(&subscription.endpoint).ok()?;
    Some(subscription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, notification::model::PushSubscriptionKeys};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records deliveries; endpoints containing `gone` fail.
    #[derive(Default)]
    struct RecordingSender {
        delivered: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl PushSender for RecordingSender {
        async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<()> {
            if subscription.endpoint.contains("gone") {
                return Err(Error::Push("410 Gone".to_string()));
            }
            self.delivered
                .lock()
                .unwrap()
                .push((subscription.endpoint.clone(), payload.to_vec()));
            Ok(())
        }
    }

    fn subscription(endpoint: &str) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.to_string(),
            expiration_time: None,
            keys: PushSubscriptionKeys {
                p256dh: "BFFGrinjE3VIjgQD3XMX-h4dh8WWCK2ifCWin9ENcwCPff_fEEYFOUTP3aIiUjaaGHYVULoH2UM7qPI0uCU_nR0".to_string(),
                auth: "gN0P_D1siTLc1nJnRtBV8Q".to_string(),
            },
        }
    }

    fn payload() -> NotificationPayload {
        NotificationPayload::from_json(
            r#"{"ok":false,"title":"autoflex: uncaught exception","time":"2024-01-01T07:30:00+00:00","error":"Traceback"}"#,
        )
        .unwrap()
    }

    fn service(dir: &tempfile::TempDir) -> Notification<RecordingSender> {
        Notification::new(
            SubscriptionStore::new(dir.path().join("subscriptions.json")),
            RecordingSender::default(),
        )
    }

    #[test]
    fn subscription_needs_endpoint_url_and_keys() {
        let valid = serde_json::to_string(&subscription("https://push.example/aaaaa")).unwrap();
        assert!(parse_subscription(&valid).is_some());
        assert!(parse_subscription(r#"{"endpoint":"https://push.example/x"}"#).is_none());
        assert!(parse_subscription(r#"{"keys":{"p256dh":"a","auth":"b"}}"#).is_none());
        assert!(
            parse_subscription(r#"{"endpoint":"not a url","keys":{"p256dh":"a","auth":"b"}}"#)
                .is_none()
        );
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        assert_eq!(svc.broadcast(&payload()).await.unwrap(), BroadcastReport::default());
        assert!(svc.sender.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_delivers_payload_json_and_prunes_failures() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        for endpoint in [
            "https://push.example/aaaaa",
            "https://push.example/gone1",
            "https://push.example/bbbbb",
        ] {
            svc.store.add(subscription(endpoint)).await.unwrap();
        }

        let report = svc.broadcast(&payload()).await.unwrap();
        assert_eq!(report, BroadcastReport { sent: 2, removed: 1 });

        let delivered = svc.sender.delivered.lock().unwrap().clone();
        assert_eq!(delivered.len(), 2);
        let sent: NotificationPayload = serde_json::from_slice(&delivered[0].1).unwrap();
        assert_eq!(sent, payload());

        let remaining = svc.store.all().await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|s| !s.endpoint.contains("gone")));
    }
}
