use std::{
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, channel},
        Arc, RwLock,
    },
    time::Duration,
};

use anyhow::Context;
use id_arena::{Arena, Id};
use naga::{
    back::wgsl::WriterFlags,
    valid::{Capabilities, ValidationFlags},
};
use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
};
use notify_debouncer_mini::{
    new_debouncer_opt,
    notify::{RecommendedWatcher, RecursiveMode, Watcher},
    DebounceEventResult, DebouncedEventKind, Debouncer,
};
use pollster::block_on;
use thiserror::Error;
use wgpu::{naga, PollType, RenderPipeline};

const SHADER_FOLDER: &str = "assets/shaders";
const SHARED_SHADER_MODULES_FOLDER: &str = "assets/shaders/shared";

type PipelineFactory = Box<
    dyn Sync
        + Send
        + Fn(&wgpu::Device, &ShaderDefinition, &str) -> anyhow::Result<wgpu::RenderPipeline>,
>;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to compose shader {name}: {message}")]
    Compose { name: String, message: String },
    #[error("shader {name} failed validation: {message}")]
    Validate { name: String, message: String },
    #[error("failed to create pipeline for shader {name}: {message}")]
    Compile { name: String, message: String },
}

#[derive(Debug, Clone)]
pub(crate) struct ShaderDefinition {
    pub name: &'static str,
    pub path: &'static str,
}

pub struct ShaderEntry {
    pipeline_id: PipelineId,
    def: ShaderDefinition,
    factory: PipelineFactory,
}

impl ShaderEntry {
    pub fn new(pipeline_id: PipelineId, def: ShaderDefinition, factory: PipelineFactory) -> Self {
        Self {
            pipeline_id,
            def,
            factory,
        }
    }
}

pub type PipelineId = Id<PipelineCacheEntry>;

#[derive(Default)]
pub struct PipelineCacheEntry(Option<wgpu::RenderPipeline>);

impl PipelineCacheEntry {
    pub fn set_pipeline(&mut self, pipeline: wgpu::RenderPipeline) {
        self.0 = Some(pipeline);
    }
}

pub struct PipelineCacheBuilder {
    shaders: Arena<ShaderEntry>,
    pipelines: Arena<PipelineCacheEntry>,
}

impl PipelineCacheBuilder {
    pub fn new() -> Self {
        Self {
            shaders: Arena::new(),
            pipelines: Arena::new(),
        }
    }

    pub fn add_shader(
        &mut self,
        shader_def: ShaderDefinition,
        factory: PipelineFactory,
    ) -> PipelineId {
        let pipeline_id = self.pipelines.alloc(PipelineCacheEntry::default());
        let shader_entry = ShaderEntry::new(pipeline_id, shader_def, factory);
        self.shaders.alloc(shader_entry);
        pipeline_id
    }

    pub fn build(self) -> PipelineCache {
        PipelineCache {
            shaders: Arc::new(self.shaders),
            pipelines: self.pipelines,
        }
    }
}

pub struct PipelineCache {
    shaders: Arc<Arena<ShaderEntry>>,
    pipelines: Arena<PipelineCacheEntry>,
}

impl PipelineCache {
    /// `None` until the pipeline has compiled successfully once.
    pub fn get(&self, id: PipelineId) -> Option<&RenderPipeline> {
        self.pipelines.get(id).and_then(|entry| entry.0.as_ref())
    }

    pub fn get_entry_mut(&mut self, id: PipelineId) -> Option<&mut PipelineCacheEntry> {
        self.pipelines.get_mut(id)
    }

    pub fn iter_shaders_and_pipelines_mut(
        &mut self,
    ) -> impl Iterator<Item = (&ShaderEntry, &mut PipelineCacheEntry)> {
        // Shaders and pipelines are allocated in lockstep by `add_shader`.
        self.shaders
            .iter()
            .map(|(_, shader_entry)| shader_entry)
            .zip(
                self.pipelines
                    .iter_mut()
                    .map(|(_, pipeline_entry)| pipeline_entry),
            )
    }
}

// Compiles shaders to pipelines, and recompiles them in the watcher thread
// whenever a file under the shader folder changes.
pub(crate) struct ShaderLoader {
    pub cache: PipelineCache,
    device: wgpu::Device,
    receiver: mpsc::Receiver<(&'static str, PipelineId, wgpu::RenderPipeline)>,
    composer: Arc<RwLock<Composer>>,
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl ShaderLoader {
    pub fn new(device: wgpu::Device, cache_builder: PipelineCacheBuilder) -> anyhow::Result<Self> {
        let cache = cache_builder.build();

        let (send_new_pipelines, recv_new_pipelines) = channel();

        let device_loader = device.clone();

        let composer = create_composer().context("Failed to create shader composer")?;
        let composer = Arc::new(RwLock::new(composer));

        let shaders = cache.shaders.clone();
        let composer_clone = composer.clone();
        let mut debouncer = new_debouncer_opt(
            notify_debouncer_mini::Config::default().with_timeout(Duration::from_millis(100)),
            move |res: DebounceEventResult| match res {
                Ok(events) => {
                    for event in events {
                        if event.kind != DebouncedEventKind::Any {
                            continue;
                        }

                        let affected: Vec<&ShaderEntry> =
                            if is_shared_module(&event.path) {
                                if let Err(e) = reload_shared_module(&composer_clone, &event.path) {
                                    log::error!("{:#}", e);
                                    continue;
                                }
                                shaders.iter().map(|(_, entry)| entry).collect()
                            } else {
                                shaders
                                    .iter()
                                    .map(|(_, entry)| entry)
                                    .filter(|entry| event.path.ends_with(entry.def.path))
                                    .collect()
                            };

                        for entry in affected {
                            match compile_file(
                                &device_loader,
                                &entry.def,
                                &entry.factory,
                                &composer_clone,
                            ) {
                                Ok(pipeline) => {
                                    if send_new_pipelines
                                        .send((entry.def.name, entry.pipeline_id, pipeline))
                                        .is_err()
                                    {
                                        return;
                                    }
                                }
                                Err(e) => log::error!("Failed to reload shader: {}", e),
                            }
                        }
                    }
                }
                Err(e) => log::error!("Error debouncing shader changes: {}", e),
            },
        )
        .context("Failed to create shader file watcher")?;

        let absolute_shader_folder = Path::new(SHADER_FOLDER)
            .canonicalize()
            .with_context(|| format!("Shader folder {} not found", SHADER_FOLDER))?;

        debouncer
            .watcher()
            .watch(&absolute_shader_folder, RecursiveMode::Recursive)
            .context("Failed to watch shader folder")?;

        let mut shader_loader = Self {
            device,
            cache,
            receiver: recv_new_pipelines,
            composer,
            _debouncer: debouncer,
        };

        shader_loader.create_all_pipelines()?;

        Ok(shader_loader)
    }

    pub(crate) fn create_all_pipelines(&mut self) -> Result<(), ShaderError> {
        for (shader, pipeline_entry) in self.cache.iter_shaders_and_pipelines_mut() {
            let pipeline = compile_file(&self.device, &shader.def, &shader.factory, &self.composer)?;
            log::info!("Compiled shader {}", shader.def.name);
            pipeline_entry.set_pipeline(pipeline);
        }
        Ok(())
    }

    pub(crate) fn load_pending_shaders(&mut self) {
        while let Ok((name, pipeline_id, pipeline)) = self.receiver.try_recv() {
            if let Some(entry) = self.cache.get_entry_mut(pipeline_id) {
                log::info!("Shader reloaded: {}", name);
                entry.set_pipeline(pipeline);
            }
        }
    }
}

fn compile_file(
    device: &wgpu::Device,
    shader_def: &ShaderDefinition,
    factory: &PipelineFactory,
    composer: &RwLock<Composer>,
) -> Result<wgpu::RenderPipeline, ShaderError> {
    let path = Path::new(SHADER_FOLDER).join(shader_def.path);
    let shader_code = std::fs::read_to_string(&path).map_err(|source| ShaderError::Read {
        path: path.clone(),
        source,
    })?;

    let file_path = path.to_string_lossy().to_string();

    let module = {
        let mut composer = composer.write().unwrap_or_else(|poisoned| poisoned.into_inner());

        composer
            .make_naga_module(NagaModuleDescriptor {
                file_path: &file_path,
                source: &shader_code,
                ..Default::default()
            })
            .map_err(|e| ShaderError::Compose {
                name: shader_def.name.to_string(),
                message: e.emit_to_string(&composer),
            })?
    };

    // Only the analysis is needed here, wgpu runs the full validator itself.
    let info = naga::valid::Validator::new(ValidationFlags::empty(), Capabilities::all())
        .validate(&module)
        .map_err(|e| ShaderError::Validate {
            name: shader_def.name.to_string(),
            message: e.to_string(),
        })?;

    let shader_code = naga::back::wgsl::write_string(&module, &info, WriterFlags::empty())
        .map_err(|e| ShaderError::Compose {
            name: shader_def.name.to_string(),
            message: e.to_string(),
        })?;

    let compile_error = |message: String| ShaderError::Compile {
        name: shader_def.name.to_string(),
        message,
    };

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline = factory(device, shader_def, &shader_code);

    device
        .poll(PollType::Wait)
        .map_err(|e| compile_error(e.to_string()))?;

    if let Some(error) = block_on(device.pop_error_scope()) {
        return Err(compile_error(error.to_string()));
    }

    pipeline.map_err(|e| compile_error(format!("{:#}", e)))
}

fn is_shared_module(path: &Path) -> bool {
    path.parent()
        .map(|parent| parent.ends_with("shared"))
        .unwrap_or(false)
        && path.extension().is_some_and(|ext| ext == "wgsl")
}

fn add_shared_module(composer: &mut Composer, path: &Path) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read shared shader module {}", path.display()))?;

    let file_path = path.to_string_lossy().to_string();

    composer
        .add_composable_module(ComposableModuleDescriptor {
            source: &source,
            file_path: &file_path,
            language: ShaderLanguage::Wgsl,
            ..Default::default()
        })
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("{}", e.emit_to_string(composer)))
        .with_context(|| format!("Failed to add shared shader module: {}", file_path))?;

    Ok(())
}

fn reload_shared_module(composer: &RwLock<Composer>, path: &Path) -> anyhow::Result<()> {
    let mut composer = composer.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    add_shared_module(&mut composer, path)?;
    log::info!("Shared shader module reloaded: {}", path.display());
    Ok(())
}

fn create_composer() -> anyhow::Result<Composer> {
    let shared_files = std::fs::read_dir(SHARED_SHADER_MODULES_FOLDER).with_context(|| {
        format!(
            "Failed to read shared shader modules directory {}",
            SHARED_SHADER_MODULES_FOLDER
        )
    })?;
    let mut composer = Composer::default();

    for entry in shared_files {
        let path = entry
            .context("Failed to read entry in shared shader modules directory")?
            .path();

        if !path.is_file() || path.extension().map_or(true, |ext| ext != "wgsl") {
            continue;
        }

        add_shared_module(&mut composer, &path)?;
    }

    Ok(composer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_shared_modules() {
        assert!(is_shared_module(Path::new("/repo/assets/shaders/shared/common.wgsl")));
        assert!(!is_shared_module(Path::new("/repo/assets/shaders/splat_flat.wgsl")));
        assert!(!is_shared_module(Path::new("/repo/assets/shaders/shared/notes.txt")));
    }

    #[test]
    fn bundled_shaders_compose_and_validate() {
        let composer = RwLock::new(create_composer().unwrap());

        for path in ["splat_flat.wgsl", "splat_phong.wgsl", "splat_shaded.wgsl"] {
            let full_path = Path::new(SHADER_FOLDER).join(path);
            let source = std::fs::read_to_string(&full_path).unwrap();
            let file_path = full_path.to_string_lossy().to_string();

            let mut composer = composer.write().unwrap();
            let module = composer
                .make_naga_module(NagaModuleDescriptor {
                    file_path: &file_path,
                    source: &source,
                    ..Default::default()
                })
                .unwrap_or_else(|e| panic!("{}", e.emit_to_string(&composer)));

            naga::valid::Validator::new(ValidationFlags::all(), Capabilities::default())
                .validate(&module)
                .unwrap_or_else(|e| panic!("{path}: {e}"));
        }
    }
}
