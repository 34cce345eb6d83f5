//! The node handle and its operation surface.
//!
//! Every operation follows one of three shapes:
//!
//! - request: allocate a [`RequestId`], park a resolver under it, post a
//!   message carrying the id as `callback`, and return a [`Pending`] at once;
//! - command: post a message with no `callback` and return nothing;
//! - listener: allocate a [`ListenerId`], store the callback, and post the
//!   registration.
//!
//! Replies come back through [`Chuck::receive`].

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::{Pin, pin};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use futures::future::{Either, select};
use futures::{FutureExt, Stream, StreamExt};
use futures_channel::mpsc;
use tracing::{debug, info, warn};
use webchuck_shared::{
    ChuckId, FileData, InMessage, InTag, ListenerId, OutMessage, ReplacedShred, RequestId,
    ShredId,
};

use crate::chugins;
use crate::deferred::DeferredResult;
use crate::demux::{Followup, route};
use crate::error::ChuckError;
use crate::fs::{Fetch, file_name_from_url, is_plaintext_file};
use crate::lifecycle::{Lifecycle, ReadyGate};
use crate::port::{ChannelPort, Port};
use crate::tables::{CorrelationTables, ListenerKind, Reply};

static NEXT_CHUCK_ID: AtomicU32 = AtomicU32::new(1);

/// Hand out the next process-wide instance id.
pub(crate) fn next_chuck_id() -> ChuckId {
    ChuckId(NEXT_CHUCK_ID.fetch_add(1, Ordering::Relaxed))
}

/// Mutable per-node state, borrowed only for the duration of a table update.
pub(crate) struct NodeState {
    pub(crate) tables: CorrelationTables,
    pub(crate) ready: ReadyGate,
    pub(crate) lifecycle: Lifecycle,
}

impl NodeState {
    pub(crate) fn new() -> Self {
        Self {
            tables: CorrelationTables::new(),
            ready: ReadyGate::new(),
            lifecycle: Lifecycle::AwaitingReady,
        }
    }
}

type PrintHook = Rc<dyn Fn(&str)>;

struct Inner {
    id: ChuckId,
    port: Box<dyn Port>,
    state: RefCell<NodeState>,
    print: RefCell<PrintHook>,
}

impl Inner {
    fn new(id: ChuckId, port: Box<dyn Port>) -> Self {
        Self {
            id,
            port,
            state: RefCell::new(NodeState::new()),
            print: RefCell::new(Rc::new(default_print)),
        }
    }

    fn reject(&self, id: RequestId, error: ChuckError) -> bool {
        self.state.borrow_mut().tables.settle_request(id, Err(error))
    }
}

fn default_print(message: &str) {
    info!(target: "webchuck::engine", "{message}");
}

/// A handle to one engine instance.
///
/// Handles are cheap to clone and all clones drive the same node. The node
/// is torn down by [`Chuck::close`] or when the last handle is dropped;
/// either way every outstanding request completes with
/// [`ChuckError::Disposed`].
#[derive(Clone)]
pub struct Chuck {
    inner: Rc<Inner>,
}

/// A non-owning handle, for transports that call back into their node.
#[derive(Clone)]
#[cfg_attr(not(feature = "web"), allow(dead_code))]
pub(crate) struct WeakChuck(Weak<Inner>);

impl WeakChuck {
    #[cfg_attr(not(feature = "web"), allow(dead_code))]
    pub(crate) fn upgrade(&self) -> Option<Chuck> {
        self.0.upgrade().map(|inner| Chuck { inner })
    }
}

impl fmt::Debug for Chuck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chuck")
            .field("id", &self.inner.id)
            .field("lifecycle", &self.lifecycle())
            .finish_non_exhaustive()
    }
}

impl Chuck {
    /// Attach a new node to `port`. The node waits for the engine's
    /// `initCallback` before it reports ready.
    pub fn new(port: impl Port + 'static) -> Self {
        Self::with_id(next_chuck_id(), port)
    }

    pub(crate) fn with_id(id: ChuckId, port: impl Port + 'static) -> Self {
        Self {
            inner: Rc::new(Inner::new(id, Box::new(port))),
        }
    }

    /// Build a node whose port needs a way back to it, like a worklet port
    /// whose message handler feeds [`Chuck::receive`].
    #[cfg_attr(not(feature = "web"), allow(dead_code))]
    pub(crate) fn new_cyclic<P: Port + 'static>(
        id: ChuckId,
        make_port: impl FnOnce(WeakChuck) -> P,
    ) -> Self {
        let inner = Rc::new_cyclic(|weak| {
            let port = make_port(WeakChuck(weak.clone()));
            Inner::new(id, Box::new(port))
        });
        Self { inner }
    }

    /// A node talking over an in-process channel. The receiver yields every
    /// posted message, in order.
    pub fn with_channel() -> (Self, mpsc::UnboundedReceiver<OutMessage>) {
        let (port, outbound) = ChannelPort::new();
        (Self::new(port), outbound)
    }

    /// Feed every message of `inbound` to [`Chuck::receive`] until the
    /// stream ends.
    pub async fn run_inbound(&self, mut inbound: impl Stream<Item = InMessage> + Unpin) {
        while let Some(message) = inbound.next().await {
            self.receive(message);
        }
        debug!("inbound stream of node {} ended", self.inner.id);
    }

    /// Route one message from the engine.
    pub fn receive(&self, message: InMessage) {
        let followup = {
            let mut state = self.inner.state.borrow_mut();
            if state.lifecycle == Lifecycle::Closed {
                debug!("node {} is closed; dropping {:?}", self.inner.id, message.tag());
                return;
            }
            route(&mut state, message)
        };

        // The borrow is released, so callbacks may call back into the node.
        match followup {
            Followup::Nothing => {}
            Followup::Print(message) => {
                let print = self.inner.print.borrow().clone();
                print(&message);
            }
            Followup::Notify(callback) => callback(),
        }
    }

    pub fn id(&self) -> ChuckId {
        self.inner.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.state.borrow().lifecycle
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle() == Lifecycle::Ready
    }

    /// Completes once the engine has initialized, or with
    /// [`ChuckError::Disposed`] if the node is closed first.
    pub fn ready(&self) -> DeferredResult<()> {
        self.inner.state.borrow().ready.wait()
    }

    pub fn pending_requests(&self) -> usize {
        self.inner.state.borrow().tables.pending_requests()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.state.borrow().tables.listener_count()
    }

    /// How listener `id` was registered, if it is still registered.
    pub fn listener_kind(&self, id: ListenerId) -> Option<ListenerKind> {
        self.inner
            .state
            .borrow()
            .tables
            .listener(id)
            .map(|listener| listener.kind)
    }

    /// Replace what happens with the engine's console output. By default it
    /// is logged at info level under the `webchuck::engine` target.
    pub fn set_print_hook(&self, hook: impl Fn(&str) + 'static) {
        *self.inner.print.borrow_mut() = Rc::new(hook);
    }

    /// The transport's audio node, if it has one.
    #[cfg(feature = "web")]
    pub fn audio_node(&self) -> Option<web_sys::AudioWorkletNode> {
        self.inner.port.audio_node()
    }

    /// Register an engine plugin for every node created from now on.
    pub fn load_chugin(url: &str) {
        chugins::load_chugin(url);
    }

    pub fn loaded_chugins() -> Vec<String> {
        chugins::loaded_chugins()
    }

    /// Settle request `id` with [`ChuckError::Cancelled`]. A reply that
    /// arrives later is dropped. The engine is not told.
    pub fn cancel(&self, id: RequestId) -> bool {
        self.inner.reject(id, ChuckError::Cancelled)
    }

    /// Settle request `callback` after the engine sent a `tag` reply whose
    /// payload could not be decoded, so the caller sees
    /// [`ChuckError::UnexpectedReply`] instead of waiting forever.
    ///
    /// Tags that never answer a request are ignored.
    pub fn reject_malformed(&self, tag: &str, callback: RequestId) -> bool {
        let tag = match tag.parse::<InTag>() {
            Ok(tag) if tag.is_correlated() && tag != InTag::Event => tag,
            _ => {
                debug!("ignoring undecodable {tag:?} message");
                return false;
            }
        };
        let error = ChuckError::UnexpectedReply {
            expected: tag.as_str(),
            found: "undecodable payload",
        };
        let settled = self.inner.reject(callback, error);
        if !settled {
            debug!("undecodable {tag} reply for unknown request {callback}");
        }
        settled
    }

    /// Shut the node down: reject everything outstanding (readiness
    /// included) with [`ChuckError::Disposed`], forget all listeners and
    /// release the transport. Later requests fail immediately.
    pub fn close(&self) {
        let resolvers = {
            let mut state = self.inner.state.borrow_mut();
            if state.lifecycle == Lifecycle::Closed {
                return;
            }
            state.lifecycle = Lifecycle::Closed;
            state.ready.fail(ChuckError::Disposed);
            state.tables.drain()
        };
        let outstanding = resolvers.len();
        for resolver in resolvers {
            resolver.reject(ChuckError::Disposed);
        }
        self.inner.port.close();
        info!("closed node {} ({outstanding} requests disposed)", self.inner.id);
    }

    fn request<T>(
        &self,
        build: impl FnOnce(RequestId) -> OutMessage,
        project: fn(Reply) -> Result<T, ChuckError>,
    ) -> Pending<T> {
        let (id, result) = {
            let mut state = self.inner.state.borrow_mut();
            let (id, result) = state.tables.open_request();
            if state.lifecycle == Lifecycle::Closed {
                state.tables.settle_request(id, Err(ChuckError::Disposed));
            } else {
                drop(state);
                self.inner.port.post(build(id));
            }
            (id, result)
        };
        Pending {
            id,
            result,
            project,
            node: Rc::downgrade(&self.inner),
        }
    }

    fn command(&self, message: OutMessage) {
        if self.lifecycle() == Lifecycle::Closed {
            warn!("node {} is closed; dropping {}", self.inner.id, message.tag());
            return;
        }
        self.inner.port.post(message);
    }

    fn listen(
        &self,
        variable: &str,
        kind: ListenerKind,
        callback: Rc<dyn Fn()>,
        build: impl FnOnce(ListenerId, String) -> OutMessage,
    ) -> ListenerId {
        let id = {
            let mut state = self.inner.state.borrow_mut();
            let id = state.tables.add_listener(variable, kind, callback);
            if state.lifecycle == Lifecycle::Closed {
                state.tables.remove_listener(id);
                warn!("node {} is closed; not listening for {variable}", self.inner.id);
                return id;
            }
            id
        };
        self.inner.port.post(build(id, variable.to_string()));
        id
    }

    // Filesystem

    /// Write `data` to `directory/filename` in the engine's filesystem.
    pub fn create_file(&self, directory: &str, filename: &str, data: FileData) {
        self.command(OutMessage::CreateFile {
            directory: directory.to_string(),
            filename: filename.to_string(),
            data,
        });
    }

    pub fn create_directory(&self, directory: &str, name: &str) {
        self.command(OutMessage::CreateDirectory {
            directory: directory.to_string(),
            name: name.to_string(),
        });
    }

    /// Fetch `url` and write it to the engine's root directory under the
    /// URL's last path segment. Known text formats are sent as text,
    /// everything else as bytes.
    pub async fn load_file<F: Fetch>(&self, fetcher: &F, url: &str) -> Result<(), ChuckError> {
        let filename = file_name_from_url(url);
        let data = if is_plaintext_file(filename) {
            let text = fetcher
                .fetch_text(url)
                .await
                .map_err(|e| ChuckError::fetch(url, e))?;
            FileData::Text(text)
        } else {
            let bytes = fetcher
                .fetch_bytes(url)
                .await
                .map_err(|e| ChuckError::fetch(url, e))?;
            FileData::Binary(bytes)
        };
        debug!("loaded {url} ({} bytes) as {filename}", data.len());
        self.create_file("", filename, data);
        Ok(())
    }

    // Running code

    /// Compile and run `code` in a new shred.
    pub fn run_code(&self, code: &str) -> Pending<ShredId> {
        let code = code.to_string();
        self.request(
            |callback| OutMessage::RunCode { callback, code },
            Reply::into_shred,
        )
    }

    /// Like [`Chuck::run_code`], with `dac` bound to the global UGen `dac_name`.
    pub fn run_code_with_replacement_dac(&self, code: &str, dac_name: &str) -> Pending<ShredId> {
        let (code, dac_name) = (code.to_string(), dac_name.to_string());
        self.request(
            |callback| OutMessage::RunCodeWithReplacementDac {
                callback,
                code,
                dac_name,
            },
            Reply::into_shred,
        )
    }

    /// Replace the most recently added shred with `code`.
    pub fn replace_code(&self, code: &str) -> Pending<ReplacedShred> {
        let code = code.to_string();
        self.request(
            |callback| OutMessage::ReplaceCode { callback, code },
            Reply::into_replaced,
        )
    }

    pub fn replace_code_with_replacement_dac(
        &self,
        code: &str,
        dac_name: &str,
    ) -> Pending<ReplacedShred> {
        let (code, dac_name) = (code.to_string(), dac_name.to_string());
        self.request(
            |callback| OutMessage::ReplaceCodeWithReplacementDac {
                callback,
                code,
                dac_name,
            },
            Reply::into_replaced,
        )
    }

    /// Remove the most recently added shred.
    pub fn remove_last_code(&self) -> Pending<ShredId> {
        self.request(
            |callback| OutMessage::RemoveLastCode { callback },
            Reply::into_shred,
        )
    }

    pub fn run_file(&self, filename: &str) -> Pending<ShredId> {
        let filename = filename.to_string();
        self.request(
            |callback| OutMessage::RunFile { callback, filename },
            Reply::into_shred,
        )
    }

    pub fn run_file_with_replacement_dac(&self, filename: &str, dac_name: &str) -> Pending<ShredId> {
        let (filename, dac_name) = (filename.to_string(), dac_name.to_string());
        self.request(
            |callback| OutMessage::RunFileWithReplacementDac {
                callback,
                filename,
                dac_name,
            },
            Reply::into_shred,
        )
    }

    /// Run `filename` with `args`, written the way the engine's command line
    /// takes them: `"a:b:c"`.
    pub fn run_file_with_args(&self, filename: &str, args: &str) -> Pending<ShredId> {
        self.run_file_with_args_inner(filename, args, None)
    }

    pub fn run_file_with_args_with_replacement_dac(
        &self,
        filename: &str,
        args: &str,
        dac_name: &str,
    ) -> Pending<ShredId> {
        self.run_file_with_args_inner(filename, args, Some(dac_name.to_string()))
    }

    fn run_file_with_args_inner(
        &self,
        filename: &str,
        args: &str,
        dac_name: Option<String>,
    ) -> Pending<ShredId> {
        let (filename, colon_separated_args) = (filename.to_string(), args.to_string());
        self.request(
            |callback| OutMessage::RunFileWithArgs {
                callback,
                filename,
                colon_separated_args,
                dac_name,
            },
            Reply::into_shred,
        )
    }

    pub fn replace_file(&self, filename: &str) -> Pending<ReplacedShred> {
        let filename = filename.to_string();
        self.request(
            |callback| OutMessage::ReplaceFile { callback, filename },
            Reply::into_replaced,
        )
    }

    pub fn replace_file_with_replacement_dac(
        &self,
        filename: &str,
        dac_name: &str,
    ) -> Pending<ReplacedShred> {
        let (filename, dac_name) = (filename.to_string(), dac_name.to_string());
        self.request(
            |callback| OutMessage::ReplaceFileWithReplacementDac {
                callback,
                filename,
                dac_name,
            },
            Reply::into_replaced,
        )
    }

    pub fn replace_file_with_args(&self, filename: &str, args: &str) -> Pending<ReplacedShred> {
        self.replace_file_with_args_inner(filename, args, None)
    }

    pub fn replace_file_with_args_with_replacement_dac(
        &self,
        filename: &str,
        args: &str,
        dac_name: &str,
    ) -> Pending<ReplacedShred> {
        self.replace_file_with_args_inner(filename, args, Some(dac_name.to_string()))
    }

    fn replace_file_with_args_inner(
        &self,
        filename: &str,
        args: &str,
        dac_name: Option<String>,
    ) -> Pending<ReplacedShred> {
        let (filename, colon_separated_args) = (filename.to_string(), args.to_string());
        self.request(
            |callback| OutMessage::ReplaceFileWithArgs {
                callback,
                filename,
                colon_separated_args,
                dac_name,
            },
            Reply::into_replaced,
        )
    }

    pub fn remove_shred(&self, shred: ShredId) -> Pending<ShredId> {
        self.request(
            |callback| OutMessage::RemoveShred { callback, shred },
            Reply::into_shred,
        )
    }

    pub fn is_shred_active(&self, shred: ShredId) -> Pending<bool> {
        self.request(
            |callback| OutMessage::IsShredActive { callback, shred },
            Reply::into_bool,
        )
    }

    // Events

    pub fn signal_event(&self, variable: &str) {
        self.command(OutMessage::SignalEvent {
            variable: variable.to_string(),
        });
    }

    pub fn broadcast_event(&self, variable: &str) {
        self.command(OutMessage::BroadcastEvent {
            variable: variable.to_string(),
        });
    }

    /// Call `callback` the next time the global event `variable` fires.
    ///
    /// The engine notifies once; the local registration stays until
    /// [`Chuck::stop_listening_for_event`] or [`Chuck::close`].
    pub fn listen_for_event_once(
        &self,
        variable: &str,
        callback: impl Fn() + 'static,
    ) -> ListenerId {
        self.listen(
            variable,
            ListenerKind::Once,
            Rc::new(callback),
            |callback, variable| OutMessage::ListenForEventOnce { callback, variable },
        )
    }

    /// Call `callback` every time the global event `variable` fires.
    pub fn start_listening_for_event(
        &self,
        variable: &str,
        callback: impl Fn() + 'static,
    ) -> ListenerId {
        self.listen(
            variable,
            ListenerKind::Persistent,
            Rc::new(callback),
            |callback, variable| OutMessage::StartListeningForEvent { callback, variable },
        )
    }

    /// Stop the listener `id` and forget its callback.
    pub fn stop_listening_for_event(&self, variable: &str, id: ListenerId) {
        let removed = self.inner.state.borrow_mut().tables.remove_listener(id);
        match removed {
            Some(listener) if listener.variable != variable => warn!(
                "listener {id} was registered for {}, not {variable}",
                listener.variable
            ),
            Some(listener) => debug!("stopped {:?} listener {id} on {variable}", listener.kind),
            None => debug!("no listener {id} to stop"),
        }
        self.command(OutMessage::StopListeningForEvent {
            callback: id,
            variable: variable.to_string(),
        });
    }

    // Globals

    pub fn set_int(&self, variable: &str, value: i64) {
        self.command(OutMessage::SetInt {
            variable: variable.to_string(),
            value,
        });
    }

    pub fn get_int(&self, variable: &str) -> Pending<i64> {
        let variable = variable.to_string();
        self.request(
            |callback| OutMessage::GetInt { callback, variable },
            Reply::into_int,
        )
    }

    pub fn set_float(&self, variable: &str, value: f64) {
        self.command(OutMessage::SetFloat {
            variable: variable.to_string(),
            value,
        });
    }

    pub fn get_float(&self, variable: &str) -> Pending<f64> {
        let variable = variable.to_string();
        self.request(
            |callback| OutMessage::GetFloat { callback, variable },
            Reply::into_float,
        )
    }

    pub fn set_string(&self, variable: &str, value: &str) {
        self.command(OutMessage::SetString {
            variable: variable.to_string(),
            value: value.to_string(),
        });
    }

    pub fn get_string(&self, variable: &str) -> Pending<String> {
        let variable = variable.to_string();
        self.request(
            |callback| OutMessage::GetString { callback, variable },
            Reply::into_string,
        )
    }

    pub fn set_int_array(&self, variable: &str, values: &[i64]) {
        self.command(OutMessage::SetIntArray {
            variable: variable.to_string(),
            values: values.to_vec(),
        });
    }

    pub fn get_int_array(&self, variable: &str) -> Pending<Vec<i64>> {
        let variable = variable.to_string();
        self.request(
            |callback| OutMessage::GetIntArray { callback, variable },
            Reply::into_int_array,
        )
    }

    pub fn set_int_array_value(&self, variable: &str, index: i64, value: i64) {
        self.command(OutMessage::SetIntArrayValue {
            variable: variable.to_string(),
            index,
            value,
        });
    }

    pub fn get_int_array_value(&self, variable: &str, index: i64) -> Pending<i64> {
        let variable = variable.to_string();
        self.request(
            |callback| OutMessage::GetIntArrayValue {
                callback,
                variable,
                index,
            },
            Reply::into_int,
        )
    }

    pub fn set_associative_int_array_value(&self, variable: &str, key: &str, value: i64) {
        self.command(OutMessage::SetAssociativeIntArrayValue {
            variable: variable.to_string(),
            key: key.to_string(),
            value,
        });
    }

    pub fn get_associative_int_array_value(&self, variable: &str, key: &str) -> Pending<i64> {
        let (variable, key) = (variable.to_string(), key.to_string());
        self.request(
            |callback| OutMessage::GetAssociativeIntArrayValue {
                callback,
                variable,
                key,
            },
            Reply::into_int,
        )
    }

    pub fn set_float_array(&self, variable: &str, values: &[f64]) {
        self.command(OutMessage::SetFloatArray {
            variable: variable.to_string(),
            values: values.to_vec(),
        });
    }

    pub fn get_float_array(&self, variable: &str) -> Pending<Vec<f64>> {
        let variable = variable.to_string();
        self.request(
            |callback| OutMessage::GetFloatArray { callback, variable },
            Reply::into_float_array,
        )
    }

    pub fn set_float_array_value(&self, variable: &str, index: i64, value: f64) {
        self.command(OutMessage::SetFloatArrayValue {
            variable: variable.to_string(),
            index,
            value,
        });
    }

    pub fn get_float_array_value(&self, variable: &str, index: i64) -> Pending<f64> {
        let variable = variable.to_string();
        self.request(
            |callback| OutMessage::GetFloatArrayValue {
                callback,
                variable,
                index,
            },
            Reply::into_float,
        )
    }

    pub fn set_associative_float_array_value(&self, variable: &str, key: &str, value: f64) {
        self.command(OutMessage::SetAssociativeFloatArrayValue {
            variable: variable.to_string(),
            key: key.to_string(),
            value,
        });
    }

    pub fn get_associative_float_array_value(&self, variable: &str, key: &str) -> Pending<f64> {
        let (variable, key) = (variable.to_string(), key.to_string());
        self.request(
            |callback| OutMessage::GetAssociativeFloatArrayValue {
                callback,
                variable,
                key,
            },
            Reply::into_float,
        )
    }

    // VM parameters

    pub fn set_param_int(&self, name: &str, value: i64) {
        self.command(OutMessage::SetParamInt {
            name: name.to_string(),
            value,
        });
    }

    pub fn get_param_int(&self, name: &str) -> Pending<i64> {
        let name = name.to_string();
        self.request(
            |callback| OutMessage::GetParamInt { callback, name },
            Reply::into_int,
        )
    }

    pub fn set_param_float(&self, name: &str, value: f64) {
        self.command(OutMessage::SetParamFloat {
            name: name.to_string(),
            value,
        });
    }

    pub fn get_param_float(&self, name: &str) -> Pending<f64> {
        let name = name.to_string();
        self.request(
            |callback| OutMessage::GetParamFloat { callback, name },
            Reply::into_float,
        )
    }

    pub fn set_param_string(&self, name: &str, value: &str) {
        self.command(OutMessage::SetParamString {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    pub fn get_param_string(&self, name: &str) -> Pending<String> {
        let name = name.to_string();
        self.request(
            |callback| OutMessage::GetParamString { callback, name },
            Reply::into_string,
        )
    }

    // VM

    /// The engine's logical time, in samples.
    pub fn now(&self) -> Pending<f64> {
        self.request(|callback| OutMessage::GetNow { callback }, Reply::into_float)
    }

    /// Remove every shred and reset the engine's globals.
    pub fn clear_chuck_instance(&self) {
        self.command(OutMessage::ClearInstance);
    }

    pub fn clear_globals(&self) {
        self.command(OutMessage::ClearGlobals);
    }
}

/// The reply to one request, narrowed to what the operation returns.
///
/// Dropping a `Pending` does not withdraw the request; the reply is still
/// consumed and discarded when it arrives.
#[must_use = "the reply is lost unless the request is awaited"]
pub struct Pending<T> {
    id: RequestId,
    result: DeferredResult<Reply>,
    project: fn(Reply) -> Result<T, ChuckError>,
    node: Weak<Inner>,
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<T> Pending<T> {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Reject this request with [`ChuckError::Cancelled`]. See [`Chuck::cancel`].
    pub fn cancel(&self) -> bool {
        self.abandon(ChuckError::Cancelled)
    }

    fn abandon(&self, error: ChuckError) -> bool {
        self.node
            .upgrade()
            .is_some_and(|inner| inner.reject(self.id, error))
    }

    /// Wait for the reply until `timer` completes, then give up with
    /// [`ChuckError::TimedOut`]. The timer is any future, so the caller picks
    /// the clock: a `tokio` sleep natively, a `setTimeout` promise in a browser.
    pub async fn timeout(self, timer: impl Future<Output = ()>) -> Result<T, ChuckError> {
        let timer = pin!(timer);
        match select(self, timer).await {
            Either::Left((outcome, _)) => outcome,
            Either::Right(((), pending)) => {
                if pending.abandon(ChuckError::TimedOut) {
                    debug!("request {} timed out", pending.id);
                }
                pending.await
            }
        }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, ChuckError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let project = self.project;
        self.result
            .poll_unpin(cx)
            .map(|outcome| outcome.and_then(project))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;

    fn next_message(outbound: &mut mpsc::UnboundedReceiver<OutMessage>) -> OutMessage {
        outbound.try_next().unwrap().unwrap()
    }

    #[test]
    fn test_instance_ids_are_distinct() {
        let (a, _) = Chuck::with_channel();
        let (b, _) = Chuck::with_channel();
        assert_ne!(a.id(), b.id());
        assert!(a.id().0 >= 1);
    }

    #[test]
    fn test_request_after_close_fails_at_once() {
        let (chuck, mut outbound) = Chuck::with_channel();
        chuck.close();
        let result = chuck.get_int("FOO");
        assert!(matches!(
            result.now_or_never(),
            Some(Err(ChuckError::Disposed))
        ));
        assert_eq!(chuck.pending_requests(), 0);
        // the channel was closed without anything on it
        assert_eq!(outbound.try_next().unwrap(), None);
    }

    #[test]
    fn test_print_hook() {
        let (chuck, _outbound) = Chuck::with_channel();
        let printed = Rc::new(RefCell::new(Vec::new()));
        let sink = printed.clone();
        chuck.set_print_hook(move |line| sink.borrow_mut().push(line.to_string()));
        chuck.receive(InMessage::Print {
            message: "hello".into(),
        });
        assert_eq!(*printed.borrow(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_default_print_level_is_compiled_in() {
        use tracing::level_filters::{LevelFilter, STATIC_MAX_LEVEL};
        assert!(STATIC_MAX_LEVEL >= LevelFilter::INFO);
    }

    #[test]
    fn test_callback_may_reenter_node() {
        let (chuck, mut outbound) = Chuck::with_channel();
        let handle = chuck.clone();
        let id = chuck.start_listening_for_event("beat", move || handle.set_int("hits", 1));
        next_message(&mut outbound);

        chuck.receive(InMessage::Event { callback: id });
        assert_eq!(
            next_message(&mut outbound),
            OutMessage::SetInt {
                variable: "hits".into(),
                value: 1
            }
        );
    }

    #[test]
    fn test_is_shred_active_maps_int() {
        let (chuck, mut outbound) = Chuck::with_channel();
        let active = chuck.is_shred_active(ShredId(3));
        let OutMessage::IsShredActive { callback, shred } = next_message(&mut outbound) else {
            panic!("expected isShredActive");
        };
        assert_eq!(shred, ShredId(3));
        chuck.receive(InMessage::Int {
            callback,
            result: 1,
        });
        assert!(block_on(active).unwrap());
    }

    #[test]
    fn test_pending_cancel() {
        let (chuck, _outbound) = Chuck::with_channel();
        let result = chuck.now();
        assert!(result.cancel());
        assert!(!result.cancel());
        assert!(matches!(block_on(result), Err(ChuckError::Cancelled)));
    }

    #[test]
    fn test_dropping_last_handle_disposes() {
        let (chuck, _outbound) = Chuck::with_channel();
        let result = chuck.get_string("name");
        let ready = chuck.ready();
        drop(chuck);
        assert!(matches!(block_on(result), Err(ChuckError::Disposed)));
        assert!(matches!(block_on(ready), Err(ChuckError::Disposed)));
    }

    #[test]
    fn test_stop_listening_after_close_sends_nothing() {
        let hits = Rc::new(Cell::new(0));
        let (chuck, mut outbound) = Chuck::with_channel();
        let counter = hits.clone();
        let id = chuck.listen_for_event_once("go", move || counter.set(counter.get() + 1));
        next_message(&mut outbound);
        chuck.close();
        chuck.stop_listening_for_event("go", id);
        chuck.receive(InMessage::Event { callback: id });
        assert_eq!(hits.get(), 0);
        assert_eq!(outbound.try_next().unwrap(), None);
    }
}
