use std::cell::RefCell;

use js_sys::JSON;
use wasm_bindgen::{JsCast, JsValue, prelude::wasm_bindgen};
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{
    ExtendableEvent, ExtendableMessageEvent, NotificationOptions, PushEvent,
    ServiceWorkerGlobalScope,
};

use crate::{
    control::{ControlMessage, WorkerState},
    notification::payload::{NOTIFICATION_BADGE, NOTIFICATION_ICON, NotificationPayload},
};

thread_local! {
    static STATE: RefCell<WorkerState> = RefCell::new(WorkerState::new());
}

fn scope() -> Result<ServiceWorkerGlobalScope, JsValue> {
    js_sys::global().dyn_into()
}

/// Called once when the worker script is evaluated.
#[wasm_bindgen(js_name = workerInit)]
pub fn worker_init() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log!("is sw securecontext?: {}", scope()?.is_secure_context());
    Ok(())
}

/// `install`: activate immediately instead of waiting for old pages to close.
#[wasm_bindgen(js_name = onInstall)]
pub fn on_install(event: ExtendableEvent) -> Result<(), JsValue> {
    event.wait_until(&scope()?.skip_waiting()?)
}

/// `activate`: take control of every open page without a reload.
#[wasm_bindgen(js_name = onActivate)]
pub fn on_activate(event: ExtendableEvent) -> Result<(), JsValue> {
    event.wait_until(&scope()?.clients().claim())
}

/// `push`: render the payload as a notification. The display promise is
/// passed to `waitUntil`, so the worker is kept alive until it settles.
#[wasm_bindgen(js_name = onPush)]
pub fn on_push(event: PushEvent) -> Result<(), JsValue> {
    let text = event.data().map(|data| data.text()).unwrap_or_default();
    console_log!("Push recieved: {}", text);

    let display = future_to_promise(async move {
        show_payload(&text).await?;
        Ok(JsValue::UNDEFINED)
    });
    event.wait_until(&display)
}

/// `message`: control messages from the page.
#[wasm_bindgen(js_name = onMessage)]
pub fn on_message(event: ExtendableMessageEvent) -> Result<(), JsValue> {
    let text = message_text(&event.data()).unwrap_or_default();
    let message = match ControlMessage::parse(&text) {
        Ok(message) => message,
        Err(err) => {
            console_log!("{}", err);
            return Ok(());
        }
    };

    match STATE.with(|state| state.borrow_mut().apply(message)) {
        Some(handle) => {
            scope()?.clear_interval_with_handle(handle);
            console_log!("Interval cleared.");
        }
        None => console_log!("No interval to clear."),
    }
    Ok(())
}

/// Strings pass through; anything else is stringified. `undefined` and other
/// values JSON cannot represent give `None`.
fn message_text(data: &JsValue) -> Option<String> {
    data.as_string()
        .or_else(|| JSON::stringify(data).ok().and_then(|text| text.as_string()))
}

async fn show_payload(text: &str) -> Result<(), JsValue> {
    let payload = NotificationPayload::from_json(text).inspect_err(|err| {
        console_error!("Dropping push: {}", err);
    })?;

    let options = NotificationOptions::new();
    options.set_body(&payload.body());
    options.set_icon(NOTIFICATION_ICON);
    options.set_badge(NOTIFICATION_BADGE);

    let shown = scope()?
        .registration()
        .show_notification_with_options(&payload.title, &options)?;
    JsFuture::from(shown).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn undefined_message_has_no_text() {
        assert_eq!(message_text(&JsValue::UNDEFINED), None);
        assert!(ControlMessage::parse(&message_text(&JsValue::UNDEFINED).unwrap_or_default()).is_err());
    }

    #[wasm_bindgen_test]
    fn stop_arrives_as_string_or_object() {
        let legacy = message_text(&JsValue::from_str("stop")).unwrap();
        assert_eq!(ControlMessage::parse(&legacy).unwrap(), ControlMessage::Stop);

        let tagged = message_text(&JSON::parse(r#"{"type":"stop"}"#).unwrap()).unwrap();
        assert_eq!(ControlMessage::parse(&tagged).unwrap(), ControlMessage::Stop);
    }
}
