//! Pipeline State Compiler
//!
//! Turns a [`PipelineStateSignature`] into a compiled pipeline state object:
//! every used stage is built through the [`ShaderCacheManager`], then the
//! [`PipelineStateFactory`] (the RHI) creates the native object, which is
//! published through the entry's [`CompilationResultSink`].
//!
//! # Threading
//!
//! [`ThreadedPipelineStateCompiler`] serves asynchronous requests from a
//! `flume` queue on `number_of_compiler_threads` workers, each owning its
//! own [`ShaderBuilder`]. Synchronous requests run on the caller's thread.
//!
//! ```text
//! render thread                      worker threads
//! ─────────────                      ──────────────
//! add_asynchronous_compiler_request ─► queue ─► build shaders
//!                                               create pipeline state
//!   entry.graphics_pipeline_state() ◄── sink ◄── deliver
//! ```
//!
//! Failures are logged and never reach the cache manager: the entry keeps
//! whatever handle it had.

use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use super::cache::{CompilationResultSink, GraphicsPipelineStateHandle, PipelineStateCache};
use super::shader_cache::{ShaderCache, ShaderCacheManager};
use super::signature::PipelineStateSignature;
use crate::errors::Result;
use crate::renderer::preprocessor::{PassThroughPreprocessor, ShaderPreprocessor};
use crate::renderer::shader_builder::ShaderBuilder;
use crate::resources::{
    MaterialBlueprint, NUMBER_OF_SHADER_TYPES, ShaderResourceProvider, ShaderType,
};
use crate::settings::PipelineStateCompilerSettings;

/// Built shaders of one pipeline state, indexed by [`ShaderType::index`].
pub type PipelineShaders = [Option<Arc<ShaderCache>>; NUMBER_OF_SHADER_TYPES];

/// What the cache manager needs from a compiler.
pub trait PipelineStateCompiler {
    fn is_asynchronous_compilation_enabled(&self) -> bool;

    /// Fire and forget. The entry's handle is filled in later through its
    /// result sink.
    fn add_asynchronous_compiler_request(&self, cache: &PipelineStateCache);

    /// Blocks until the entry holds its compiled handle (or the compile failed).
    fn instant_synchronous_compiler_request(
        &self,
        material_blueprint: &dyn MaterialBlueprint,
        cache: &PipelineStateCache,
    );
}

/// RHI hook that creates native pipeline state objects.
pub trait PipelineStateFactory: Send + Sync {
    fn create_graphics_pipeline_state(
        &self,
        signature: &PipelineStateSignature,
        shaders: &PipelineShaders,
    ) -> Result<GraphicsPipelineStateHandle>;
}

struct CompilerRequest {
    signature: PipelineStateSignature,
    sink: CompilationResultSink,
}

/// State shared between the compiler and its workers.
struct CompilerShared {
    settings: PipelineStateCompilerSettings,
    resources: Arc<dyn ShaderResourceProvider + Send + Sync>,
    factory: Arc<dyn PipelineStateFactory>,
    preprocessor: Arc<dyn ShaderPreprocessor>,
    shader_cache_manager: ShaderCacheManager,
    pending: Mutex<usize>,
    idle: Condvar,
}

impl CompilerShared {
    fn new_builder(&self) -> ShaderBuilder {
        ShaderBuilder::with_preprocessor(
            self.settings.shader_builder,
            Arc::clone(&self.preprocessor),
        )
    }

    fn compile(
        &self,
        builder: &mut ShaderBuilder,
        signature: &PipelineStateSignature,
    ) -> Result<GraphicsPipelineStateHandle> {
        let mut shaders: PipelineShaders = Default::default();
        for shader_type in ShaderType::ALL {
            shaders[shader_type.index()] = self.shader_cache_manager.get_or_build_shader(
                builder,
                self.resources.as_ref(),
                signature,
                shader_type,
            )?;
        }
        self.factory
            .create_graphics_pipeline_state(signature, &shaders)
    }

    fn compile_and_deliver(
        &self,
        builder: &mut ShaderBuilder,
        signature: &PipelineStateSignature,
        sink: &CompilationResultSink,
    ) {
        if sink.is_orphaned() {
            log::debug!(
                "Pipeline state compiler: skipping {}, cache entry was dropped",
                sink.pipeline_state_signature_id()
            );
            return;
        }
        match self.compile(builder, signature) {
            Ok(handle) => sink.deliver(handle),
            Err(err) => log::error!(
                "Pipeline state compiler: {} failed: {err}",
                sink.pipeline_state_signature_id()
            ),
        }
    }

    fn finish_request(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }
}

/// [`PipelineStateCompiler`] backed by a pool of worker threads.
pub struct ThreadedPipelineStateCompiler {
    shared: Arc<CompilerShared>,
    sender: Option<flume::Sender<CompilerRequest>>,
    workers: Vec<JoinHandle<()>>,
    /// Builder for synchronous requests.
    builder: Mutex<ShaderBuilder>,
}

impl ThreadedPipelineStateCompiler {
    #[must_use]
    pub fn new(
        settings: PipelineStateCompilerSettings,
        resources: Arc<dyn ShaderResourceProvider + Send + Sync>,
        factory: Arc<dyn PipelineStateFactory>,
    ) -> Self {
        Self::with_preprocessor(settings, resources, factory, Arc::new(PassThroughPreprocessor))
    }

    #[must_use]
    pub fn with_preprocessor(
        settings: PipelineStateCompilerSettings,
        resources: Arc<dyn ShaderResourceProvider + Send + Sync>,
        factory: Arc<dyn PipelineStateFactory>,
        preprocessor: Arc<dyn ShaderPreprocessor>,
    ) -> Self {
        let shared = Arc::new(CompilerShared {
            settings,
            resources,
            factory,
            preprocessor,
            shader_cache_manager: ShaderCacheManager::new(),
            pending: Mutex::new(0),
            idle: Condvar::new(),
        });
        let builder = Mutex::new(shared.new_builder());

        let mut compiler = Self {
            shared,
            sender: None,
            workers: Vec::new(),
            builder,
        };
        if settings.asynchronous_compilation_enabled {
            compiler.spawn_workers();
        }
        compiler
    }

    fn spawn_workers(&mut self) {
        let (sender, receiver) = flume::unbounded::<CompilerRequest>();
        let count = self.shared.settings.number_of_compiler_threads.max(1);

        for index in 0..count {
            let shared = Arc::clone(&self.shared);
            let receiver = receiver.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("pso-compiler-{index}"))
                .spawn(move || {
                    let mut builder = shared.new_builder();
                    while let Ok(request) = receiver.recv() {
                        shared.compile_and_deliver(&mut builder, &request.signature, &request.sink);
                        shared.finish_request();
                    }
                });
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(err) => log::error!("Pipeline state compiler: failed to spawn worker: {err}"),
            }
        }

        if self.workers.is_empty() {
            log::warn!("Pipeline state compiler: no worker threads, compiling synchronously");
        } else {
            log::debug!(
                "Pipeline state compiler: {} worker thread(s) started",
                self.workers.len()
            );
            self.sender = Some(sender);
        }
    }

    #[must_use]
    pub fn shader_cache_manager(&self) -> &ShaderCacheManager {
        &self.shared.shader_cache_manager
    }

    /// The resources the compiler builds from. Pass the same provider to the
    /// cache manager so signatures and builds agree.
    #[must_use]
    pub fn resources(&self) -> &Arc<dyn ShaderResourceProvider + Send + Sync> {
        &self.shared.resources
    }

    /// Requests queued or being compiled.
    #[must_use]
    pub fn pending_request_count(&self) -> usize {
        *self.shared.pending.lock()
    }

    /// Blocks until every asynchronous request has been served.
    pub fn wait_until_idle(&self) {
        let mut pending = self.shared.pending.lock();
        while *pending > 0 {
            self.shared.idle.wait(&mut pending);
        }
    }

    fn compile_synchronously(&self, cache: &PipelineStateCache) {
        let mut builder = self.builder.lock();
        self.shared.compile_and_deliver(
            &mut builder,
            cache.pipeline_state_signature(),
            &cache.result_sink(),
        );
    }
}

impl PipelineStateCompiler for ThreadedPipelineStateCompiler {
    fn is_asynchronous_compilation_enabled(&self) -> bool {
        self.sender.is_some()
    }

    fn add_asynchronous_compiler_request(&self, cache: &PipelineStateCache) {
        let Some(sender) = &self.sender else {
            self.compile_synchronously(cache);
            return;
        };

        *self.shared.pending.lock() += 1;
        let request = CompilerRequest {
            signature: cache.pipeline_state_signature().clone(),
            sink: cache.result_sink(),
        };
        if let Err(err) = sender.send(request) {
            log::error!("Pipeline state compiler: request queue closed, compiling synchronously");
            self.shared.finish_request();
            let request = err.into_inner();
            let mut builder = self.builder.lock();
            self.shared
                .compile_and_deliver(&mut builder, &request.signature, &request.sink);
        }
    }

    fn instant_synchronous_compiler_request(
        &self,
        _material_blueprint: &dyn MaterialBlueprint,
        cache: &PipelineStateCache,
    ) {
        self.compile_synchronously(cache);
    }
}

impl Drop for ThreadedPipelineStateCompiler {
    fn drop(&mut self) {
        // Closing the channel lets workers drain the queue and exit.
        self.sender = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Pipeline state compiler: worker thread panicked");
            }
        }
    }
}
