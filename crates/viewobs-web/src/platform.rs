#![forbid(unsafe_code)]

use viewobs_core::Platform;

/// The platform this code is running on.
///
/// `Browser` when a `window` global exists, `Worker` for other `wasm32`
/// globals, `Server` off `wasm32`.
#[must_use]
pub fn detect_platform() -> Platform {
    #[cfg(target_arch = "wasm32")]
    {
        if web_sys::window().is_some() {
            Platform::Browser
        } else {
            Platform::Worker
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Platform::Server
    }
}
