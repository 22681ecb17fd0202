//! Runtime adapters: the fixed-rate driver thread.

#[cfg(not(target_arch = "wasm32"))]
pub mod driver;

#[cfg(not(target_arch = "wasm32"))]
pub use driver::TickDriver;
