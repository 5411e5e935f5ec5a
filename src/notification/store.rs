use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use super::model::PushSubscription;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    AlreadyExists,
}

/// Subscriptions kept as a JSON array in a single file.
///
/// Every operation is a read-modify-write of the whole file, serialized by
/// one async lock.
pub struct SubscriptionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SubscriptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn all(&self) -> Result<Vec<PushSubscription>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    pub async fn add(&self, subscription: PushSubscription) -> Result<AddOutcome> {
        let _guard = self.lock.lock().await;
        let mut subscriptions = self.load().await?;
        if subscriptions.contains(&subscription) {
            return Ok(AddOutcome::AlreadyExists);
        }
        subscriptions.push(subscription);
        self.save(&subscriptions).await?;
        Ok(AddOutcome::Created)
    }

    /// Drops every subscription whose endpoint is listed. Returns how many
    /// were removed.
    pub async fn remove(&self, endpoints: &[String]) -> Result<usize> {
        if endpoints.is_empty() {
            return Ok(0);
        }
        let _guard = self.lock.lock().await;
        let mut subscriptions = self.load().await?;
        let before = subscriptions.len();
        subscriptions.retain(|sub| !endpoints.contains(&sub.endpoint));
        let removed = before - subscriptions.len();
        if removed > 0 {
            self.save(&subscriptions).await?;
        }
        Ok(removed)
    }

    async fn load(&self) -> Result<Vec<PushSubscription>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Store(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, subscriptions: &[PushSubscription]) -> Result<()> {
        let json = serde_json::to_vec(subscriptions).map_err(|e| Error::Store(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::model::PushSubscriptionKeys;

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

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SubscriptionStore::new(dir.path().join("subscriptions.json"));
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_creates_then_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = SubscriptionStore::new(dir.path().join("subscriptions.json"));

        let sub = subscription("https://push.example/aaaaa");
        assert_eq!(store.add(sub.clone()).await.unwrap(), AddOutcome::Created);
        assert_eq!(store.add(sub.clone()).await.unwrap(), AddOutcome::AlreadyExists);
        assert_eq!(
            store.add(subscription("https://push.example/bbbbb")).await.unwrap(),
            AddOutcome::Created
        );

        let stored = store.all().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0], sub);
    }

    #[tokio::test]
    async fn persists_browser_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        let store = SubscriptionStore::new(&path);
        store.add(subscription("https://push.example/aaaaa")).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["endpoint"], "https://push.example/aaaaa");
        assert!(raw[0]["expirationTime"].is_null());
        assert_eq!(raw[0]["keys"]["auth"], "gN0P_D1siTLc1nJnRtBV8Q");
    }

    #[tokio::test]
    async fn remove_drops_matching_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let store = SubscriptionStore::new(dir.path().join("subscriptions.json"));
        for id in ["aaaaa", "bbbbb", "ccccc"] {
            store
                .add(subscription(&format!("https://push.example/{id}")))
                .await
                .unwrap();
        }

        let removed = store
            .remove(&[
                "https://push.example/bbbbb".to_string(),
                "https://push.example/zzzzz".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let endpoints: Vec<String> = store
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.endpoint)
            .collect();
        assert_eq!(
            endpoints,
            ["https://push.example/aaaaa", "https://push.example/ccccc"]
        );
    }

    #[tokio::test]
    async fn corrupt_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = SubscriptionStore::new(&path);
        assert!(matches!(store.all().await, Err(Error::Store(_))));
    }
}
