//! WASM tests - run with: wasm-pack test --node --features web
#![cfg(all(target_arch = "wasm32", feature = "web"))]

use std::time::Duration;

use wasm_bindgen_test::*;
use webchuck::web::sleep;
use webchuck::{Chuck, ChuckError};

#[wasm_bindgen_test]
async fn test_sleep_completes_without_window() {
    // Node has no window, so there is no timer to wait on.
    sleep(Duration::from_secs(3600)).await;
}

#[wasm_bindgen_test]
async fn test_timeout_fires_without_window() {
    let (chuck, _outbound) = Chuck::with_channel();
    let result = chuck
        .get_float("ratio")
        .timeout(sleep(Duration::from_secs(3600)))
        .await;
    assert!(matches!(result, Err(ChuckError::TimedOut)));
    assert_eq!(chuck.pending_requests(), 0);
}
