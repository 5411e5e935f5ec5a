use async_trait::async_trait;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushMessageBuilder,
};

use super::model::PushSubscription;
use crate::error::{Error, Result};

pub const PUSH_TTL_SECS: u32 = 60;

/// Delivers an encrypted payload to one subscription.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<()>;
}

/// Web Push over HTTP with a VAPID signature and `aes128gcm` encryption.
pub struct WebPushSender {
    client: IsahcWebPushClient,
    vapid_private_key: String,
    vapid_subject: String,
}

impl WebPushSender {
    /// `vapid_private_key` is the Base64url (no padding) P-256 private key.
    pub fn new(vapid_private_key: &str, vapid_subject: &str) -> Result<Self> {
        Ok(Self {
            client: IsahcWebPushClient::new().map_err(|e| Error::Push(e.to_string()))?,
            vapid_private_key: vapid_private_key.to_string(),
            vapid_subject: vapid_subject.to_string(),
        })
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<()> {
        let info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut signature = VapidSignatureBuilder::from_base64(&self.vapid_private_key, &info)
            .map_err(|e| Error::Push(format!("VAPID key: {e}")))?;
        signature.add_claim("sub", self.vapid_subject.as_str());
        let signature = signature
            .build()
            .map_err(|e| Error::Push(format!("VAPID signature: {e}")))?;

        let mut message = WebPushMessageBuilder::new(&info);
        message.set_payload(ContentEncoding::Aes128Gcm, payload);
        message.set_vapid_signature(signature);
        message.set_ttl(PUSH_TTL_SECS);
        let message = message.build().map_err(|e| Error::Push(e.to_string()))?;

        self.client
            .send(message)
            .await
            .map_err(|e| Error::Push(e.to_string()))
    }
}
