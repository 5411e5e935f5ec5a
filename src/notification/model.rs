use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A browser `PushSubscription` as produced by its `toJSON()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<serde_json::Number>, // nullable in JSON
    pub keys: PushSubscriptionKeys,
}

impl PushSubscription {
    pub fn short_id(&self) -> &str {
        endpoint_tail(&self.endpoint)
    }
}

/// Last five characters of a push endpoint, enough to tell subscriptions
/// apart in logs without printing the capability URL.
pub fn endpoint_tail(endpoint: &str) -> &str {
    let start = endpoint
        .char_indices()
        .rev()
        .nth(4)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &endpoint[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn browser_subscription() -> serde_json::Value {
        json!({
            "endpoint": "https://fcm.googleapis.com/fcm/send/czgxp_p8tFg:APA91bHsEh0GH49x3L6",
            "expirationTime": null,
            "keys": {
                "p256dh": "BFFGrinjE3VIjgQD3XMX-h4dh8WWCK2ifCWin9ENcwCPff_fEEYFOUTP3aIiUjaaGHYVULoH2UM7qPI0uCU_nR0",
                "auth": "gN0P_D1siTLc1nJnRtBV8Q"
            }
        })
    }

    #[test]
    fn subscription_body_round_trips_exactly() {
        let original = browser_subscription();
        let body = serde_json::to_string(&original).unwrap();

        let parsed: PushSubscription = serde_json::from_str(&body).unwrap();
        let reserialized: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&parsed).unwrap()).unwrap();

        assert_eq!(reserialized, original);
    }

    #[test]
    fn keeps_numeric_expiration_time() {
        let mut original = browser_subscription();
        original["expirationTime"] = json!(1735689600000u64);
        let parsed: PushSubscription = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&parsed).unwrap(), original);
    }

    #[test]
    fn rejects_subscription_without_keys() {
        let body = json!({ "endpoint": "https://push.example/abc" });
        assert!(serde_json::from_value::<PushSubscription>(body).is_err());
    }

    #[test]
    fn short_id_is_endpoint_tail() {
        let parsed: PushSubscription = serde_json::from_value(browser_subscription()).unwrap();
        assert_eq!(parsed.short_id(), "9x3L6");

        let mut short = parsed.clone();
        short.endpoint = "abc".into();
        assert_eq!(short.short_id(), "abc");
    }

    #[test]
    fn endpoint_tail_counts_characters_not_bytes() {
        assert_eq!(endpoint_tail("https://push.example/wpush/£££££"), "£££££");
        assert_eq!(endpoint_tail(""), "");
    }
}
