//! Scene: camera registrations, batch registry, and the per-frame draw
//! protocol
//!
//! The draw pass visits cameras, then shader groups, then technique groups,
//! then renderables, then passes. That nesting is the batching invariant:
//! every state change is made at the coarsest level correctness allows
//! (parameter handles per shader, technique binds per technique), and it is
//! replayed once per camera.

use crate::config::SceneSettings;
use crate::foundation::math::Mat4;
use crate::render::{
    GraphicsDevice, GroupVisitor, ParameterHandle, RegistrationLease, RenderBatchRegistry,
    RenderTarget, ShaderHandle, TechniqueHandle, Viewport,
};
use crate::scene::error::SceneError;
use crate::scene::graph::{ObjectId, SceneGraph};

/// Name of the combined world-view-projection parameter every effect is
/// expected to declare
pub const WORLD_VIEW_PROJECTION: &str = "gWVP";

/// A renderable hierarchy with cameras and a render batch registry
///
/// Owns the object graph (rooted at [`Scene::root`]), the camera and
/// renderable registrations, and the settings the frame is cleared with.
pub struct Scene {
    graph: SceneGraph,
    root: ObjectId,
    registry: RenderBatchRegistry,
    settings: SceneSettings,
}

impl Scene {
    /// Create an empty scene with default settings
    pub fn new() -> Self {
        Self::with_settings(SceneSettings::default())
    }

    /// Create an empty scene with explicit settings
    pub fn with_settings(settings: SceneSettings) -> Self {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        Self {
            graph,
            root,
            registry: RenderBatchRegistry::new(),
            settings,
        }
    }

    /// Root object of the scene hierarchy
    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// The object graph
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable access to the object graph
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// The render batch registry
    pub fn registry(&self) -> &RenderBatchRegistry {
        &self.registry
    }

    /// Settings the frame is cleared with
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    /// Create a new object attached directly under the scene root
    pub fn add_object(&mut self) -> ObjectId {
        let object = self.graph.create_object();
        // Root always exists, child is freshly created: cannot fail.
        let _ = self.graph.attach(self.root, object);
        object
    }

    /// Register the camera component at `slot` of `object`
    ///
    /// Cameras are visited in registration order during the draw pass.
    ///
    /// # Errors
    /// - [`SceneError::AlreadyDisposed`] when the object no longer exists.
    /// - [`SceneError::ComponentNotFound`] when the slot is empty.
    /// - [`SceneError::MissingCapability`] when the component is no camera.
    pub fn register_camera(
        &mut self,
        object: ObjectId,
        slot: usize,
    ) -> Result<RegistrationLease, SceneError> {
        if !self.graph.contains(object) {
            return Err(SceneError::AlreadyDisposed);
        }
        let component = self
            .graph
            .component(object, slot)
            .ok_or(SceneError::ComponentNotFound { slot })?;
        if component.as_camera().is_none() {
            return Err(SceneError::MissingCapability("camera"));
        }
        Ok(self.registry.register_camera(RenderTarget { object, slot }))
    }

    /// Register the renderable component at `slot` of `object`
    ///
    /// Resolves the shader program named by the renderable's material
    /// (cached per effect name for the life of the scene) and the material's
    /// technique, and files the renderable under that `[shader][technique]`
    /// group. The grouping is a snapshot of the material binding at
    /// registration time.
    ///
    /// # Errors
    /// - [`SceneError::AlreadyDisposed`] / [`SceneError::ComponentNotFound`]
    ///   / [`SceneError::MissingCapability`] for an unusable target.
    /// - [`SceneError::Render`] when shader or technique resolution fails;
    ///   the registration aborts with no partial entry.
    pub fn register_renderable(
        &mut self,
        device: &mut dyn GraphicsDevice,
        object: ObjectId,
        slot: usize,
    ) -> Result<RegistrationLease, SceneError> {
        if !self.graph.contains(object) {
            return Err(SceneError::AlreadyDisposed);
        }
        let component = self
            .graph
            .component(object, slot)
            .ok_or(SceneError::ComponentNotFound { slot })?;
        let renderable = component
            .as_renderable()
            .ok_or(SceneError::MissingCapability("renderable"))?;
        let effect = renderable.material().effect().to_string();
        let technique = renderable.material().technique().to_string();

        let lease = self.registry.register_renderable(
            device,
            RenderTarget { object, slot },
            &effect,
            &technique,
        )?;
        Ok(lease)
    }

    /// Initialize the scene
    ///
    /// First walks every registered (shader, technique, renderable) triple
    /// and lets each renderable's material resolve its shader-specific
    /// parameter handles, then runs the generic tree initialization
    /// (components before children, depth-first). Call once, after all
    /// registrations and before the first draw.
    ///
    /// # Errors
    /// Propagates material initialization failures.
    pub fn initialize(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), SceneError> {
        let mut jobs = TripleCollector::default();
        self.registry.for_each_group(&mut jobs);

        for (shader, target) in jobs.triples {
            let Some(component) = self.graph.component_mut(target.object, target.slot) else {
                log::warn!("skipping material init for vanished target {target:?}");
                continue;
            };
            let Some(renderable) = component.as_renderable_mut() else {
                log::warn!("skipping material init for non-renderable target {target:?}");
                continue;
            };
            renderable.material_mut().initialize(device, shader)?;
        }

        self.graph.initialize(self.root);
        Ok(())
    }

    /// Advance every enabled component by one frame
    pub fn update(&mut self, delta_seconds: f32) {
        self.graph.update(self.root, delta_seconds);
    }

    /// Draw one frame
    ///
    /// Per-frame protocol, strictly ordered: clear to the configured
    /// constants, begin the frame, then for each camera bind its viewport
    /// and replay the shader/technique/renderable grouping, then end the
    /// frame and present. Renderables whose owner is hidden are skipped;
    /// targets that no longer resolve (owner disposed without releasing the
    /// lease) are skipped with a warning.
    pub fn draw(&mut self, device: &mut dyn GraphicsDevice) {
        device.clear(self.settings.clear_color, self.settings.clear_depth);
        device.begin_frame();

        let mut cameras = Vec::new();
        self.registry.for_each_camera(|target| cameras.push(target));

        for camera_target in cameras {
            let Some((view, projection, viewport)) = self.camera_state(camera_target) else {
                log::warn!("skipping camera {camera_target:?}: no camera at target");
                continue;
            };
            device.set_viewport(viewport);
            let view_projection = projection * view;

            let mut pass = DrawPass {
                graph: &self.graph,
                device: &mut *device,
                view_projection,
                wvp: None,
            };
            self.registry.for_each_group(&mut pass);
        }

        device.end_frame();
        device.present();
    }

    fn camera_state(&self, target: RenderTarget) -> Option<(Mat4, Mat4, Viewport)> {
        let component = self.graph.component(target.object, target.slot)?;
        let camera = component.as_camera()?;
        Some((camera.view(), camera.projection(), camera.viewport()))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects (shader, renderable) pairs for the material init walk
#[derive(Default)]
struct TripleCollector {
    triples: Vec<(ShaderHandle, RenderTarget)>,
}

impl GroupVisitor for TripleCollector {
    fn visit_renderable(
        &mut self,
        shader: ShaderHandle,
        _technique: TechniqueHandle,
        target: RenderTarget,
    ) {
        self.triples.push((shader, target));
    }
}

/// One camera's traversal of the batch grouping
struct DrawPass<'a> {
    graph: &'a SceneGraph,
    device: &'a mut dyn GraphicsDevice,
    view_projection: Mat4,
    wvp: Option<ParameterHandle>,
}

impl GroupVisitor for DrawPass<'_> {
    fn enter_shader(&mut self, shader: ShaderHandle) {
        // Resolved once per shader group, not once per renderable.
        self.wvp = self.device.parameter(shader, WORLD_VIEW_PROJECTION);
        if self.wvp.is_none() {
            log::warn!("shader {shader:?} declares no '{WORLD_VIEW_PROJECTION}' parameter");
        }
    }

    fn enter_technique(&mut self, shader: ShaderHandle, technique: TechniqueHandle) {
        // Bound once; every renderable below shares it.
        self.device.bind_technique(shader, technique);
    }

    fn visit_renderable(
        &mut self,
        shader: ShaderHandle,
        _technique: TechniqueHandle,
        target: RenderTarget,
    ) {
        let graph = self.graph;
        let Some(component) = graph.component(target.object, target.slot) else {
            log::warn!("skipping stale registration {target:?}");
            return;
        };
        let Some(renderable) = component.as_renderable() else {
            log::warn!("skipping non-renderable registration {target:?}");
            return;
        };
        if !graph.is_visible(target.object) {
            return;
        }
        let Some(model) = graph.global_transform(target.object) else {
            return;
        };

        let mvp = self.view_projection * model;
        if let Some(parameter) = self.wvp {
            self.device.set_matrix(shader, parameter, &mvp);
        }
        renderable.material().apply(&mut *self.device, shader);

        let geometry = *renderable.geometry();
        self.device.bind_geometry(&geometry);

        let passes = self.device.begin_technique(shader);
        for pass in 0..passes {
            self.device.begin_pass(shader, pass);
            self.device
                .draw_indexed(geometry.topology, geometry.vertex_count, geometry.primitive_count);
            self.device.end_pass(shader);
        }
        self.device.end_technique(shader);
    }
}
