//! Browser bindings: the page controller and the service worker.
//!
//! Both halves are driven by small JS loaders (`web/main.js` and
//! `web/service-worker.js`) that instantiate the wasm module and forward
//! events to the functions exported here.

use wasm_bindgen::JsValue;

macro_rules! console_log {
    ($($t:tt)*) => (web_sys::console::log_1(&wasm_bindgen::JsValue::from(format_args!($($t)*).to_string())))
}

macro_rules! console_error {
    ($($t:tt)*) => (web_sys::console::error_1(&wasm_bindgen::JsValue::from(format_args!($($t)*).to_string())))
}

pub mod controller;
pub mod worker;

#[cfg(test)]
wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

pub const SERVICE_WORKER_PATH: &str = "/service-worker.js";
pub const SERVICE_WORKER_SCOPE: &str = "/";

fn format_js_error(operation: &str, err: &JsValue) -> String {
    let detail = err.as_string().unwrap_or_else(|| format!("{:?}", err));
    format!("{operation} failed: {detail}")
}

impl From<crate::Error> for JsValue {
    fn from(err: crate::Error) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
