use js_sys::{Array, Object, Uint8Array};
use tracing::{debug, info, warn};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioContext, AudioContextOptions, AudioContextState, AudioWorkletNode, AudioWorkletNodeOptions,
};
use webchuck_shared::ChuckId;

use super::auto_resume::setup_autoresume;
use super::fetch::HttpFetcher;
use super::port::{WorkletPort, set};
use crate::chugins;
use crate::config::ChuckConfig;
use crate::error::{ChuckError, JsContext};
use crate::fs::{Fetch, File, preload_files};
use crate::node::{Chuck, next_chuck_id};

/// Name the engine's `AudioWorkletProcessor` registers under.
pub const PROCESSOR_NAME: &str = "chuck-node";

impl Chuck {
    /// Load the engine and start a node, fetching over HTTP.
    ///
    /// Pass an `audio_context` to share one between nodes; the node is then
    /// left unconnected. Otherwise a context is created and the node is
    /// connected to its destination. Resolves once the engine is ready.
    pub async fn init(
        config: &ChuckConfig,
        audio_context: Option<AudioContext>,
    ) -> Result<Self, ChuckError> {
        Self::init_with(config, audio_context, &HttpFetcher).await
    }

    /// [`Chuck::init`] with a custom [`Fetch`] for the engine and preloads.
    pub async fn init_with<F: Fetch>(
        config: &ChuckConfig,
        audio_context: Option<AudioContext>,
        fetcher: &F,
    ) -> Result<Self, ChuckError> {
        let wasm_url = config.wasm_url();
        let wasm = fetcher
            .fetch_bytes(&wasm_url)
            .await
            .map_err(|e| ChuckError::fetch(wasm_url, e))?;

        let (context, owns_context) = match audio_context {
            Some(context) => (context, false),
            None => (create_context(config)?, true),
        };

        let chuck = match start(config, fetcher, &context, owns_context, &wasm).await {
            Ok(chuck) => chuck,
            Err(e) => {
                if owns_context {
                    if let Err(e) = context.close() {
                        warn!("failed to close `AudioContext`: {e:?}");
                    }
                }
                return Err(e);
            }
        };

        chuck.ready().await?;
        info!("node {} ready", chuck.id());
        Ok(chuck)
    }
}

fn create_context(config: &ChuckConfig) -> Result<AudioContext, ChuckError> {
    match config.sample_rate {
        Some(sample_rate) => {
            let options = AudioContextOptions::new();
            options.set_sample_rate(sample_rate.get() as f32);
            AudioContext::new_with_context_options(&options).context("creating `AudioContext`")
        }
        None => AudioContext::new().context("creating `AudioContext`"),
    }
}

/// Kick a suspended context. Browsers may hold the resume until the user
/// interacts with the page, so it is not awaited here.
fn resume(context: &AudioContext) {
    if context.state() != AudioContextState::Suspended {
        return;
    }
    match context.resume() {
        Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                debug!("audio context refused to resume: {e:?}");
            }
        }),
        Err(e) => debug!("error calling resume on audio context: {e:?}"),
    }
    if let Err(e) = setup_autoresume(context) {
        warn!("failed to set up audio resume on user gesture: {e}");
    }
}

async fn start<F: Fetch>(
    config: &ChuckConfig,
    fetcher: &F,
    context: &AudioContext,
    owns_context: bool,
    wasm: &[u8],
) -> Result<Chuck, ChuckError> {
    resume(context);

    JsFuture::from(
        context
            .audio_worklet()
            .context("fetching audio worklet")?
            .add_module(&config.worklet_url())
            .context("adding engine worklet module")?,
    )
    .await
    .context("adding engine worklet module")?;

    let mut preload = config.preload.clone();
    preload.extend(chugins::registered());
    let files = preload_files(fetcher, &preload).await?;
    debug!("preloaded {} files", files.len());

    let id = next_chuck_id();
    let options = node_options(config, id, context.sample_rate(), &files, wasm)?;
    let node = AudioWorkletNode::new_with_options(context, PROCESSOR_NAME, &options)
        .context("creating engine worklet node")?;
    let port = node.port().context("getting worklet message port")?;

    if owns_context {
        node.connect_with_audio_node(&context.destination())
            .context("connecting engine worklet to destination")?;
    }

    let context = context.clone();
    Ok(Chuck::new_cyclic(id, move |chuck| {
        WorkletPort::new(node, port, context, owns_context, chuck)
    }))
}

fn node_options(
    config: &ChuckConfig,
    id: ChuckId,
    sample_rate: f32,
    files: &[File],
    wasm: &[u8],
) -> Result<AudioWorkletNodeOptions, ChuckError> {
    let preloaded = Array::new();
    for file in files {
        let entry = Object::new();
        set(&entry, "filename", &file.filename.as_str().into())?;
        set(&entry, "data", &Uint8Array::from(file.data.as_slice()))?;
        preloaded.push(&entry);
    }

    let processor_options = Object::new();
    set(&processor_options, "chuckID", &JsValue::from(id.0))?;
    set(&processor_options, "srate", &JsValue::from_f64(sample_rate.into()))?;
    set(&processor_options, "preloadedFiles", &preloaded)?;
    set(&processor_options, "wasm", &Uint8Array::from(wasm))?;

    let options = AudioWorkletNodeOptions::new();
    options.set_number_of_inputs(1);
    options.set_number_of_outputs(1);
    options.set_output_channel_count(&Array::of1(&config.num_out_channels.into()));
    options.set_processor_options(Some(&processor_options));
    Ok(options)
}
