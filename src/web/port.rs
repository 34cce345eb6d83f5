use std::cell::Cell;

use js_sys::{Object, Reflect, Uint8Array};
use tracing::{error, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{AudioContext, AudioWorkletNode, ErrorEvent, MessageEvent, MessagePort};
use webchuck_shared::{FileData, InMessage, OutMessage, RequestId};

use crate::error::{ChuckError, JsContext};
use crate::node::WeakChuck;
use crate::port::Port;

/// The `MessagePort` of an engine worklet node.
///
/// Inbound messages are parsed and handed to the node as they arrive. A
/// reply that fails to parse still settles its request, with an error. When
/// closed or dropped, the worklet node is disconnected and, if the factory
/// created the `AudioContext`, the context is closed too.
pub struct WorkletPort {
    node: AudioWorkletNode,
    port: MessagePort,
    context: AudioContext,
    owns_context: bool,
    closed: Cell<bool>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_processor_error: Closure<dyn FnMut(ErrorEvent)>,
}

impl WorkletPort {
    pub(crate) fn new(
        node: AudioWorkletNode,
        port: MessagePort,
        context: AudioContext,
        owns_context: bool,
        chuck: WeakChuck,
    ) -> Self {
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new({
            let chuck = chuck.clone();
            move |event: MessageEvent| {
                let Some(chuck) = chuck.upgrade() else {
                    return;
                };
                let data = event.data();
                match serde_wasm_bindgen::from_value::<InMessage>(data.clone()) {
                    Ok(message) => chuck.receive(message),
                    Err(e) => {
                        warn!("malformed engine message: {e}");
                        if let Some((tag, callback)) = reply_header(&data) {
                            chuck.reject_malformed(&tag, callback);
                        }
                    }
                }
            }
        });
        port.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let on_processor_error =
            Closure::<dyn FnMut(ErrorEvent)>::new(move |event: ErrorEvent| {
                error!("engine worklet failed: {}", event.message());
                if let Some(chuck) = chuck.upgrade() {
                    chuck.close();
                }
            });
        node.set_onprocessorerror(Some(on_processor_error.as_ref().unchecked_ref()));

        Self {
            node,
            port,
            context,
            owns_context,
            closed: Cell::new(false),
            _on_message: on_message,
            _on_processor_error: on_processor_error,
        }
    }
}

impl Port for WorkletPort {
    fn post(&self, message: OutMessage) {
        let tag = message.tag();
        let value = match encode(&message) {
            Ok(value) => value,
            Err(e) => {
                error!("failed to encode {tag} message: {e}");
                return;
            }
        };
        if let Err(e) = self.port.post_message(&value) {
            error!("failed to post {tag} message: {e:?}");
        }
    }

    fn close(&self) {
        if self.closed.replace(true) {
            return;
        }

        self.port.set_onmessage(None);
        self.node.set_onprocessorerror(None);
        self.port.close();

        if let Err(e) = self.node.disconnect() {
            error!("failed to disconnect `AudioWorkletNode`: {e:?}");
        }

        if self.owns_context {
            if let Err(e) = self.context.close() {
                error!("failed to close `AudioContext`: {e:?}");
            }
        }
    }

    fn audio_node(&self) -> Option<AudioWorkletNode> {
        Some(self.node.clone())
    }
}

impl Drop for WorkletPort {
    fn drop(&mut self) {
        self.close();
    }
}

impl core::fmt::Debug for WorkletPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkletPort")
            .field("owns_context", &self.owns_context)
            .field("closed", &self.closed.get())
            .finish_non_exhaustive()
    }
}

/// Turn `message` into the object the worklet processor reads.
///
/// Binary file contents have to arrive as a `Uint8Array`, which the
/// serializer would turn into a plain array, so that one shape is assembled
/// by hand.
fn encode(message: &OutMessage) -> Result<JsValue, ChuckError> {
    match message {
        OutMessage::CreateFile {
            directory,
            filename,
            data: FileData::Binary(bytes),
        } => {
            let object = Object::new();
            set(&object, "type", &message.tag().as_str().into())?;
            set(&object, "directory", &directory.as_str().into())?;
            set(&object, "filename", &filename.as_str().into())?;
            set(&object, "data", &Uint8Array::from(bytes.as_slice()))?;
            Ok(object.into())
        }
        _ => serde_wasm_bindgen::to_value(message).map_err(|e| ChuckError::Js(e.to_string())),
    }
}

/// The `type` and `callback` of a reply whose payload did not parse.
fn reply_header(data: &JsValue) -> Option<(String, RequestId)> {
    let tag = Reflect::get(data, &JsValue::from_str("type")).ok()?.as_string()?;
    let callback = Reflect::get(data, &JsValue::from_str("callback"))
        .ok()?
        .as_f64()?;
    if callback < 0.0 || callback.fract() != 0.0 || callback > u64::MAX as f64 {
        return None;
    }
    Some((tag, RequestId(callback as u64)))
}

pub(crate) fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), ChuckError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .context(format_args!("setting '{key}'"))?;
    Ok(())
}
