//! Engine plugins ("chugins") preloaded into every node created afterwards.

use std::cell::RefCell;

use crate::fs::{Filename, file_name_from_url};

/// Virtual directory the engine scans for plugins at startup.
pub const CHUGIN_DIR: &str = "/chugins/";

thread_local! {
    static CHUGINS: RefCell<Vec<Filename>> = const { RefCell::new(Vec::new()) };
}

/// Register a plugin by URL. Nodes created from now on load it at startup;
/// nodes that already exist are unaffected.
pub fn load_chugin(url: &str) {
    let chugin = Filename::new(url, format!("{CHUGIN_DIR}{}", file_name_from_url(url)));
    CHUGINS.with(|chugins| {
        let mut chugins = chugins.borrow_mut();
        if !chugins.contains(&chugin) {
            chugins.push(chugin);
        }
    });
}

/// File names of every registered plugin.
pub fn loaded_chugins() -> Vec<String> {
    CHUGINS.with(|chugins| {
        chugins
            .borrow()
            .iter()
            .map(|chugin| file_name_from_url(&chugin.server_filename).to_string())
            .collect()
    })
}

pub fn clear_chugins() {
    CHUGINS.with(|chugins| chugins.borrow_mut().clear());
}

/// The preload entries for every registered plugin.
#[cfg_attr(not(feature = "web"), allow(dead_code))]
pub(crate) fn registered() -> Vec<Filename> {
    CHUGINS.with(|chugins| chugins.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        clear_chugins();
        load_chugin("https://example.org/chugins/Bitcrusher.chug.wasm");
        load_chugin("https://example.org/chugins/Bitcrusher.chug.wasm");
        load_chugin("local/ABSaturator.chug.wasm");

        assert_eq!(
            loaded_chugins(),
            vec!["Bitcrusher.chug.wasm", "ABSaturator.chug.wasm"]
        );
        let registered = registered();
        assert_eq!(registered.len(), 2);
        assert_eq!(
            registered[0].virtual_filename,
            "/chugins/Bitcrusher.chug.wasm"
        );

        clear_chugins();
        assert!(loaded_chugins().is_empty());
    }
}
