use js_sys::{JSON, Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue, closure::Closure, prelude::wasm_bindgen};
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    Headers, Notification, PushSubscription, PushSubscriptionOptionsInit, RegistrationOptions,
    RequestInit, RequestMode, Response, ServiceWorkerRegistration, Window,
};

use super::{SERVICE_WORKER_PATH, SERVICE_WORKER_SCOPE, format_js_error};
use crate::{cfg::PageConfig, control::ControlMessage, notification::model::endpoint_tail};

/// Entry point for the page, called by the loader once the window has
/// loaded. `config` is `{ applicationServerKey, subscriptionURL }`.
///
/// The permission request runs on its own. Registration, subscription and the
/// collector POST run as one chain; a failure anywhere, a bad `config`
/// included, is logged and abandons this attempt. Nothing is retried.
#[wasm_bindgen(js_name = startPage)]
pub async fn start_page(config: JsValue) {
    console_error_panic_hook::set_once();

    spawn_local(log_notification_permission());

    let Some(window) = web_sys::window() else {
        console_error!("No window");
        return;
    };
    let supported = Reflect::has(&window.navigator(), &JsValue::from_str("serviceWorker"))
        .unwrap_or(false);
    console_log!("serviceWorker in main?: {}", supported);
    console_log!("is main securecontext?: {}", window.is_secure_context());

    let config: PageConfig = match serde_wasm_bindgen::from_value(config) {
        Ok(config) => config,
        Err(err) => {
            console_error!("Invalid page config: {}", err);
            return;
        }
    };
    if !supported {
        return;
    }
    match register_and_subscribe(&window, &config).await {
        Ok(text) => console_log!("{}", text),
        Err(err) => console_error!("{}", format_js_error("ServiceWorker registration", &err)),
    }
}

/// Posts `{ type: "stop" }` to the worker controlling this page, if any.
#[wasm_bindgen(js_name = sendStop)]
pub fn send_stop() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let Some(worker) = window.navigator().service_worker().controller() else {
        console_log!("No controlling service worker; stop not sent");
        return Ok(());
    };
    worker.post_message(&serde_wasm_bindgen::to_value(&ControlMessage::Stop)?)
}

/// Wires the element with `id` to [`send_stop`] on click. A missing element
/// is logged, not thrown.
#[wasm_bindgen(js_name = attachStopButton)]
pub fn attach_stop_button(id: &str) {
    if let Err(err) = bind_stop_button(id) {
        console_error!("{}", format_js_error("attachStopButton", &err));
    }
}

fn bind_stop_button(id: &str) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let button = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("No element #{id}")))?;

    let on_click = Closure::<dyn FnMut()>::new(|| {
        if let Err(err) = send_stop() {
            console_error!("{}", format_js_error("postMessage", &err));
        }
    });
    button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
    on_click.forget();
    Ok(())
}

async fn log_notification_permission() {
    let status = match Notification::request_permission() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(err) => Err(err),
    };
    match status {
        Ok(status) => console_log!(
            "Notification permission status: {}",
            status.as_string().unwrap_or_default()
        ),
        Err(err) => console_error!("{}", format_js_error("Notification.requestPermission", &err)),
    }
}

/// Register → update → subscribe → POST. Resolves to the collector's reply.
async fn register_and_subscribe(window: &Window, config: &PageConfig) -> Result<String, JsValue> {
    let container = window.navigator().service_worker();
    let options = RegistrationOptions::new();
    options.set_scope(SERVICE_WORKER_SCOPE);

    let registration: ServiceWorkerRegistration =
        JsFuture::from(container.register_with_options(SERVICE_WORKER_PATH, &options))
            .await?
            .dyn_into()?;
    console_log!(
        "ServiceWorker registration successful with scope: {}",
        registration.scope()
    );

    JsFuture::from(registration.update()?).await?;
    console_log!("ServiceWorker updated");

    let subscription = subscribe_user_to_push(&registration, config).await?;
    post_subscription(window, &config.subscription_url, &subscription).await
}

async fn subscribe_user_to_push(
    registration: &ServiceWorkerRegistration,
    config: &PageConfig,
) -> Result<PushSubscription, JsValue> {
    let key_bytes = config.application_server_key_bytes()?;
    let key: JsValue = Uint8Array::from(key_bytes.as_slice()).into();

    let options = PushSubscriptionOptionsInit::new();
    options.set_user_visible_only(true);
    options.set_application_server_key(Some(&key));

    let subscription: PushSubscription =
        JsFuture::from(registration.push_manager()?.subscribe_with_options(&options)?)
            .await?
            .dyn_into()?;

    console_log!(
        "Received PushSubscription {}",
        endpoint_tail(&subscription.endpoint())
    );
    Ok(subscription)
}

/// Sends the subscription's own JSON form, so the collector stores exactly
/// what the platform issued.
async fn post_subscription(
    window: &Window,
    url: &str,
    subscription: &PushSubscription,
) -> Result<String, JsValue> {
    let body = JSON::stringify(subscription)?;

    let headers = Headers::new()?;
    headers.set("Content-Type", "application/json")?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_mode(RequestMode::Cors);
    init.set_headers(&headers);
    init.set_body(&body);

    let response: Response = JsFuture::from(window.fetch_with_str_and_init(url, &init))
        .await?
        .dyn_into()?;
    let text = JsFuture::from(response.text()?).await?;
    Ok(text.as_string().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    async fn bad_config_is_logged_not_thrown() {
        start_page(JsValue::UNDEFINED).await;
        start_page(JSON::parse(r#"{"applicationServerKey":"BEl6"}"#).unwrap()).await;
    }

    #[wasm_bindgen_test]
    fn missing_stop_button_is_logged_not_thrown() {
        attach_stop_button("no-such-button");
        assert!(bind_stop_button("no-such-button").is_err());
    }
}
