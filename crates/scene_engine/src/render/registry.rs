//! Render batch registry
//!
//! Groups registered renderables by shader program, then by technique, so
//! the draw pass can amortize expensive state changes at the coarsest level
//! possible. Registrations hand out leases; releasing the lease is the only
//! way membership ever ends. Shader programs are resolved through a
//! name-keyed cache that lives as long as the registry and never reloads a
//! program once it is in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use slotmap::SlotMap;

use crate::render::device::{GraphicsDevice, ShaderHandle, TechniqueHandle};
use crate::render::RenderError;
use crate::scene::graph::ObjectId;

slotmap::new_key_type! {
    /// Stable identity of one registration in the registry
    pub struct RegistrationId;
}

/// Location of a registered component: an object and a component slot
///
/// The registry never dereferences targets itself; the draw pass resolves
/// them against the scene graph and skips targets that no longer exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    /// Object owning the registered component
    pub object: ObjectId,
    /// Component slot on the object
    pub slot: usize,
}

struct RenderEntry {
    id: RegistrationId,
    target: RenderTarget,
}

struct TechniqueGroup {
    /// Technique name, the grouping key (snapshot at registration time)
    name: String,
    handle: TechniqueHandle,
    entries: Vec<RenderEntry>,
}

struct ShaderGroup {
    shader: ShaderHandle,
    techniques: Vec<TechniqueGroup>,
}

struct CameraEntry {
    id: RegistrationId,
    target: RenderTarget,
}

/// Shared registry state; leases hold a weak reference into it
struct RegistryState {
    cameras: Vec<CameraEntry>,
    shaders: Vec<ShaderGroup>,
    shader_cache: HashMap<String, ShaderHandle>,
    /// Live membership set. Releasing a lease removes its id here (O(1));
    /// dead entries are swept out of the group vectors lazily.
    live: SlotMap<RegistrationId, ()>,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            cameras: Vec::new(),
            shaders: Vec::new(),
            shader_cache: HashMap::new(),
            live: SlotMap::with_key(),
        }
    }

    /// Drop entries whose lease was released and prune emptied groups
    fn sweep(&mut self) {
        let live = &self.live;
        self.cameras.retain(|c| live.contains_key(c.id));
        for group in &mut self.shaders {
            for technique in &mut group.techniques {
                technique.entries.retain(|e| live.contains_key(e.id));
            }
            group.techniques.retain(|t| !t.entries.is_empty());
        }
        self.shaders.retain(|g| !g.techniques.is_empty());
    }
}

/// Visitor over the shader → technique → renderable grouping
///
/// `enter_shader` and `enter_technique` fire once per group so a draw pass
/// can hoist per-shader and per-technique state changes out of the
/// per-renderable loop.
pub trait GroupVisitor {
    /// A shader group begins
    fn enter_shader(&mut self, shader: ShaderHandle) {
        let _ = shader;
    }

    /// A technique group within the current shader begins
    fn enter_technique(&mut self, shader: ShaderHandle, technique: TechniqueHandle) {
        let _ = (shader, technique);
    }

    /// One registered renderable within the current technique group
    fn visit_renderable(
        &mut self,
        shader: ShaderHandle,
        technique: TechniqueHandle,
        target: RenderTarget,
    );
}

/// Two-level grouping of renderables by shader program and technique
///
/// Clonable handle to shared state; the [`Scene`](crate::scene::Scene)
/// owns one and its leases reference the same state.
pub struct RenderBatchRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl RenderBatchRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::new())),
        }
    }

    /// Register a camera target, in insertion order
    ///
    /// Returns the lease whose release removes the camera again.
    pub fn register_camera(&self, target: RenderTarget) -> RegistrationLease {
        let mut state = self.state.lock().unwrap();
        let id = state.live.insert(());
        state.cameras.push(CameraEntry { id, target });
        log::debug!("registered camera {target:?}");
        RegistrationLease::new(Arc::downgrade(&self.state), id)
    }

    /// Register a renderable target under its effect's shader and technique
    ///
    /// Resolves the shader program through the registry cache (loading it at
    /// most once per effect name), resolves the named technique, and appends
    /// the target to the `[shader][technique]` group. The grouping key is a
    /// snapshot: later changes to the material do not regroup the entry.
    ///
    /// # Errors
    /// [`RenderError::ShaderLoad`] or [`RenderError::TechniqueNotFound`]
    /// abort the registration atomically; no partial entry remains.
    pub fn register_renderable(
        &self,
        device: &mut dyn GraphicsDevice,
        target: RenderTarget,
        effect: &str,
        technique: &str,
    ) -> Result<RegistrationLease, RenderError> {
        let mut state = self.state.lock().unwrap();

        let shader = match state.shader_cache.get(effect) {
            Some(&cached) => cached,
            None => {
                let loaded = device.load_shader(effect)?;
                log::debug!("loaded shader program '{effect}'");
                state.shader_cache.insert(effect.to_string(), loaded);
                loaded
            }
        };
        let technique_handle = device.technique(shader, technique)?;

        let id = state.live.insert(());
        let shader_index = match state.shaders.iter().position(|g| g.shader == shader) {
            Some(index) => index,
            None => {
                state.shaders.push(ShaderGroup {
                    shader,
                    techniques: Vec::new(),
                });
                state.shaders.len() - 1
            }
        };
        let shader_group = &mut state.shaders[shader_index];
        let technique_index = match shader_group
            .techniques
            .iter()
            .position(|t| t.name == technique)
        {
            Some(index) => index,
            None => {
                shader_group.techniques.push(TechniqueGroup {
                    name: technique.to_string(),
                    handle: technique_handle,
                    entries: Vec::new(),
                });
                shader_group.techniques.len() - 1
            }
        };
        shader_group.techniques[technique_index]
            .entries
            .push(RenderEntry { id, target });
        log::debug!("registered renderable {target:?} under '{effect}'/'{technique}'");

        Ok(RegistrationLease::new(Arc::downgrade(&self.state), id))
    }

    /// Visit registered cameras in insertion order
    ///
    /// The callback runs without the registry lock held, so it may release
    /// leases; a camera released mid-traversal is not visited afterwards.
    pub fn for_each_camera(&self, mut f: impl FnMut(RenderTarget)) {
        let cameras: Vec<_> = {
            let mut state = self.state.lock().unwrap();
            state.sweep();
            state.cameras.iter().map(|c| (c.id, c.target)).collect()
        };
        for (id, target) in cameras {
            if self.state.lock().unwrap().live.contains_key(id) {
                f(target);
            }
        }
    }

    /// Visit shader groups, technique groups, and renderables, each level
    /// in insertion order
    ///
    /// The traversal iterates a snapshot and rechecks each entry against the
    /// live set just before visiting it, holding the registry lock only for
    /// those checks. Visitor callbacks therefore run unlocked and may
    /// release any lease, including ones for groups still ahead in the
    /// traversal; entries released mid-traversal are skipped from that point
    /// on.
    pub fn for_each_group(&self, visitor: &mut dyn GroupVisitor) {
        let groups: Vec<_> = {
            let mut state = self.state.lock().unwrap();
            state.sweep();
            state
                .shaders
                .iter()
                .map(|group| {
                    let techniques: Vec<_> = group
                        .techniques
                        .iter()
                        .map(|t| {
                            let entries: Vec<_> =
                                t.entries.iter().map(|e| (e.id, e.target)).collect();
                            (t.handle, entries)
                        })
                        .collect();
                    (group.shader, techniques)
                })
                .collect()
        };
        for (shader, techniques) in groups {
            visitor.enter_shader(shader);
            for (technique, entries) in techniques {
                visitor.enter_technique(shader, technique);
                for (id, target) in entries {
                    if self.state.lock().unwrap().live.contains_key(id) {
                        visitor.visit_renderable(shader, technique, target);
                    }
                }
            }
        }
    }

    /// Number of live camera registrations
    pub fn camera_count(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        state.sweep();
        state.cameras.len()
    }

    /// Number of live renderable registrations
    pub fn renderable_count(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        state.sweep();
        state
            .shaders
            .iter()
            .flat_map(|g| &g.techniques)
            .map(|t| t.entries.len())
            .sum()
    }
}

impl Default for RenderBatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposable membership handle for one registration
///
/// Releasing the lease is the sole removal mechanism for the entry it
/// represents. Release is idempotent and O(1); the lease also releases
/// itself when dropped.
pub struct RegistrationLease {
    state: Weak<Mutex<RegistryState>>,
    id: Option<RegistrationId>,
}

impl RegistrationLease {
    fn new(state: Weak<Mutex<RegistryState>>, id: RegistrationId) -> Self {
        Self {
            state,
            id: Some(id),
        }
    }

    /// Remove the registered entry from its group
    ///
    /// Safe to call repeatedly; only the first call has an effect. Sibling
    /// registrations and in-progress group iteration are unaffected.
    pub fn release(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(state) = self.state.upgrade() {
                state.lock().unwrap().live.remove(id);
            }
        }
    }

    /// Whether this lease has already been released
    pub fn is_released(&self) -> bool {
        self.id.is_none()
    }
}

impl Drop for RegistrationLease {
    fn drop(&mut self) {
        self.release();
    }
}
