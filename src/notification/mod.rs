pub mod model;
pub mod payload;

#[cfg(not(target_arch = "wasm32"))]
pub mod sender;
#[cfg(not(target_arch = "wasm32"))]
pub mod store;
#[cfg(not(target_arch = "wasm32"))]
pub mod svc;
