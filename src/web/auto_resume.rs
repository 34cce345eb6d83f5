use std::cell::RefCell;

use tracing::{error, info};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioContext, AudioContextState, Document, Event};

use crate::error::{ChuckError, JsContext};

const USER_GESTURES: [&str; 10] = [
    "click",
    "contextmenu",
    "auxclick",
    "dblclick",
    "mousedown",
    "mouseup",
    "pointerup",
    "touchend",
    "keydown",
    "keyup",
];

struct Resumer {
    contexts: Vec<AudioContext>,
    document: Document,
    listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
}

impl Resumer {
    /// Resume every suspended context; once all of them run, stop listening.
    fn on_gesture(resumer: &RefCell<Option<Self>>) {
        let mut resumer_borrow = resumer.borrow_mut();
        let Some(resumer) = resumer_borrow.as_mut() else {
            return;
        };

        resumer
            .contexts
            .retain(|context| context.state() != AudioContextState::Closed);

        let suspended: Vec<_> = resumer
            .contexts
            .iter()
            .filter(|context| context.state() != AudioContextState::Running)
            .cloned()
            .collect();

        if suspended.is_empty() {
            resumer.remove_listeners();
            *resumer_borrow = None;
            return;
        }

        for context in suspended {
            match context.resume() {
                Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                    match JsFuture::from(promise).await {
                        Ok(_) => info!("audio context resumed after user gesture"),
                        Err(e) => error!("promise to resume audio context failed: {e:?}"),
                    }
                }),
                Err(e) => error!("error calling resume on audio context: {e:?}"),
            }
        }
    }

    fn remove_listeners(&mut self) {
        for (event_name, closure) in self.listeners.drain(..) {
            if let Err(e) = self
                .document
                .remove_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())
            {
                error!("failed to remove '{event_name}' listener: {e:?}");
            }
        }
    }
}

thread_local! {
    static RESUMER: RefCell<Option<Resumer>> = const { RefCell::new(None) };
}

/// Resume `context` on the next user interaction with the page.
///
/// Browsers keep a context suspended until the user interacts with the
/// page. Listeners are installed once and shared by every context passed in;
/// they are removed when an interaction finds all contexts running.
pub fn setup_autoresume(context: &AudioContext) -> Result<(), ChuckError> {
    if context.state() == AudioContextState::Running {
        return Ok(());
    }

    let already_listening = RESUMER.with(|resumer| match resumer.borrow_mut().as_mut() {
        Some(resumer) => {
            resumer.contexts.push(context.clone());
            true
        }
        None => false,
    });
    if already_listening {
        return Ok(());
    }

    let document = web_sys::window()
        .context("getting window")?
        .document()
        .context("getting document")?;

    let mut listeners = Vec::with_capacity(USER_GESTURES.len());
    for event_name in USER_GESTURES {
        let closure = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            RESUMER.with(Resumer::on_gesture);
        });
        document
            .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())
            .context(format_args!("adding '{event_name}' listener"))?;
        listeners.push((event_name, closure));
    }

    RESUMER.with(|resumer| {
        *resumer.borrow_mut() = Some(Resumer {
            contexts: vec![context.clone()],
            document,
            listeners,
        });
    });

    Ok(())
}

/// Remove the listeners installed by [`setup_autoresume`], if any.
pub fn teardown_autoresume() {
    RESUMER.with(|resumer| {
        if let Some(mut resumer) = resumer.borrow_mut().take() {
            resumer.remove_listeners();
        }
    });
}
