//! Browser transport: the `AudioWorkletNode` factory and its `MessagePort`.

mod auto_resume;
mod fetch;
mod port;
mod worklet;

use std::time::Duration;

use tracing::warn;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

pub use auto_resume::{setup_autoresume, teardown_autoresume};
pub use fetch::HttpFetcher;
pub use port::WorkletPort;
pub use worklet::PROCESSOR_NAME;

/// Complete after `duration`, using the window's timer.
///
/// Without a window, or if the timer cannot be scheduled, it completes at
/// once. Meant as the timer of [`Pending::timeout`](crate::Pending::timeout).
pub async fn sleep(duration: Duration) {
    let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let scheduled = match web_sys::window() {
            Some(window) => window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
                .map_err(|e| warn!("failed to schedule timer: {e:?}"))
                .is_ok(),
            None => {
                warn!("no window to schedule a timer on");
                false
            }
        };
        if !scheduled {
            let _ = resolve.call0(&JsValue::UNDEFINED);
        }
    });
    let _ = JsFuture::from(promise).await;
}
