//! Scene graph storage and hierarchy operations
//!
//! All node storage lives in one slot-map arena; objects are addressed by
//! stable [`ObjectId`] handles. Parent links are plain back-references with
//! no ownership, children and components are owned by their node. Global
//! transforms are cached per node and invalidated top-down whenever a local
//! transform or the ancestor chain changes, then recomputed lazily on read.

use std::cell::Cell;
use std::collections::{HashSet, VecDeque};

use slotmap::SlotMap;

use crate::foundation::math::{Mat4, Vec3};
use crate::scene::component::{Component, Message};
use crate::scene::error::SceneError;

slotmap::new_key_type! {
    /// Stable handle to a scene object in the graph
    pub struct ObjectId;
}

/// One node of the scene graph
struct Node {
    local: Mat4,
    cached_global: Cell<Option<Mat4>>,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    components: Vec<Box<dyn Component>>,
    visible: bool,
    enabled: bool,
}

impl Node {
    fn new() -> Self {
        Self {
            local: Mat4::identity(),
            cached_global: Cell::new(None),
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
            visible: true,
            enabled: true,
        }
    }

    fn find_component<T: Component>(&self) -> Option<&T> {
        self.components
            .iter()
            .find_map(|c| c.as_any().downcast_ref::<T>())
    }
}

/// Item yielded by [`SceneGraph::enumerate`]
pub enum Entry<'a> {
    /// A component owned by the enumerated object
    Component(&'a dyn Component),
    /// A direct child of the enumerated object
    Child(ObjectId),
}

/// Arena of scene objects with hierarchy and component operations
///
/// Disposal removes nodes from the arena; a vacated handle behaves like a
/// disposed object (mutations fail with [`SceneError::AlreadyDisposed`],
/// reads report absence).
pub struct SceneGraph {
    nodes: SlotMap<ObjectId, Node>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Create a detached object with an identity local transform
    pub fn create_object(&mut self) -> ObjectId {
        self.nodes.insert(Node::new())
    }

    /// Whether the object still exists (has not been disposed)
    pub fn contains(&self, object: ObjectId) -> bool {
        self.nodes.contains_key(object)
    }

    /// Number of live objects in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no objects
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent of the object, if attached
    pub fn parent(&self, object: ObjectId) -> Option<ObjectId> {
        self.nodes.get(object).and_then(|n| n.parent)
    }

    /// Direct children of the object, in attachment order
    pub fn children(&self, object: ObjectId) -> &[ObjectId] {
        self.nodes.get(object).map_or(&[], |n| &n.children)
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    /// Local transform of the object
    pub fn local_transform(&self, object: ObjectId) -> Option<Mat4> {
        self.nodes.get(object).map(|n| n.local)
    }

    /// Replace the local transform
    ///
    /// Clears the cached global transform of the object and of every
    /// descendant; globals are recomputed lazily on the next read.
    ///
    /// # Errors
    /// [`SceneError::AlreadyDisposed`] when the object no longer exists.
    pub fn set_local_transform(&mut self, object: ObjectId, local: Mat4) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(object)
            .ok_or(SceneError::AlreadyDisposed)?;
        node.local = local;
        self.invalidate_subtree(object);
        Ok(())
    }

    /// Compose a translation onto the local transform
    ///
    /// # Errors
    /// [`SceneError::AlreadyDisposed`] when the object no longer exists.
    pub fn translate(&mut self, object: ObjectId, amount: Vec3) -> Result<(), SceneError> {
        let local = self
            .nodes
            .get(object)
            .ok_or(SceneError::AlreadyDisposed)?
            .local;
        self.set_local_transform(object, Mat4::new_translation(&amount) * local)
    }

    /// Scalar convenience form of [`SceneGraph::translate`]
    ///
    /// # Errors
    /// [`SceneError::AlreadyDisposed`] when the object no longer exists.
    pub fn translate_xyz(&mut self, object: ObjectId, x: f32, y: f32, z: f32) -> Result<(), SceneError> {
        self.translate(object, Vec3::new(x, y, z))
    }

    /// Global (world-space) transform of the object
    ///
    /// Returns the cached value when present; otherwise computes
    /// `parent_global * local` recursively, stores it, and returns it.
    /// Detached objects return their local transform. `None` when the
    /// object no longer exists.
    pub fn global_transform(&self, object: ObjectId) -> Option<Mat4> {
        let node = self.nodes.get(object)?;
        if let Some(cached) = node.cached_global.get() {
            return Some(cached);
        }
        let global = match node.parent {
            None => node.local,
            Some(parent) => self.global_transform(parent)? * node.local,
        };
        node.cached_global.set(Some(global));
        Some(global)
    }

    /// Clear the cached global of `object` and of its whole subtree
    fn invalidate_subtree(&self, object: ObjectId) {
        let mut stack = vec![object];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                node.cached_global.set(None);
                stack.extend_from_slice(&node.children);
            }
        }
    }

    #[cfg(test)]
    fn cached_global(&self, object: ObjectId) -> Option<Mat4> {
        self.nodes.get(object).and_then(|n| n.cached_global.get())
    }

    // ------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------

    /// Attach a detached object under a parent
    ///
    /// # Errors
    /// - [`SceneError::AlreadyDisposed`] when either object no longer exists.
    /// - [`SceneError::HierarchyViolation`] for self-attachment, an already
    ///   parented child, or an attachment that would close a cycle. The tree
    ///   is left unchanged in every failure case.
    pub fn attach(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), SceneError> {
        if parent == child {
            return Err(SceneError::HierarchyViolation(
                "an object cannot be attached to itself",
            ));
        }
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return Err(SceneError::AlreadyDisposed);
        }
        if self.nodes[child].parent.is_some() {
            return Err(SceneError::HierarchyViolation(
                "child already has a parent",
            ));
        }
        // Walking child -> parent would close a cycle if `parent` sits in
        // the child's subtree, which is only reachable when `child` is the
        // root of that chain.
        let mut current = self.nodes[parent].parent;
        while let Some(ancestor) = current {
            if ancestor == child {
                return Err(SceneError::HierarchyViolation(
                    "attachment would create a cycle",
                ));
            }
            current = self.nodes[ancestor].parent;
        }

        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        // The child's ancestor chain changed, so its cached globals are stale.
        self.invalidate_subtree(child);
        Ok(())
    }

    /// Sever the parent link of an object, keeping the object alive
    ///
    /// No-op for objects that are already roots.
    ///
    /// # Errors
    /// [`SceneError::AlreadyDisposed`] when the object no longer exists.
    pub fn detach(&mut self, child: ObjectId) -> Result<(), SceneError> {
        let parent = match self.nodes.get(child) {
            None => return Err(SceneError::AlreadyDisposed),
            Some(node) => match node.parent {
                None => return Ok(()),
                Some(parent) => parent,
            },
        };
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        self.nodes[child].parent = None;
        self.invalidate_subtree(child);
        Ok(())
    }

    /// Dispose an object: detach it, notify and drop its components, and
    /// recursively dispose its children
    ///
    /// Idempotent; disposing a vacated handle is a no-op. Every node and
    /// component in the subtree is torn down exactly once.
    pub fn dispose(&mut self, object: ObjectId) {
        if !self.nodes.contains_key(object) {
            return;
        }
        if let Some(parent) = self.nodes[object].parent {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.children.retain(|&c| c != object);
            }
        }

        let mut stack = vec![object];
        let mut subtree = Vec::new();
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                subtree.push(current);
                stack.extend_from_slice(&node.children);
            }
        }
        log::debug!("disposing {} object(s)", subtree.len());
        for id in subtree {
            if let Some(mut node) = self.nodes.remove(id) {
                for component in &mut node.components {
                    component.on_detach();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Attach a component, returning its slot on the object
    ///
    /// # Errors
    /// [`SceneError::AlreadyDisposed`] when the object no longer exists.
    pub fn add_component(
        &mut self,
        object: ObjectId,
        component: Box<dyn Component>,
    ) -> Result<usize, SceneError> {
        let node = self
            .nodes
            .get_mut(object)
            .ok_or(SceneError::AlreadyDisposed)?;
        node.components.push(component);
        Ok(node.components.len() - 1)
    }

    /// Remove and return a component without disposing it
    ///
    /// `None` when the object or the slot does not exist; the caller
    /// decides what happens to the returned component.
    pub fn detach_component(
        &mut self,
        object: ObjectId,
        slot: usize,
    ) -> Option<Box<dyn Component>> {
        let node = self.nodes.get_mut(object)?;
        if slot >= node.components.len() {
            return None;
        }
        let mut component = node.components.remove(slot);
        component.on_detach();
        Some(component)
    }

    /// Component at a slot of the object
    pub fn component(&self, object: ObjectId, slot: usize) -> Option<&dyn Component> {
        self.nodes
            .get(object)
            .and_then(|n| n.components.get(slot))
            .map(AsRef::as_ref)
    }

    /// Mutable component at a slot of the object
    pub fn component_mut(&mut self, object: ObjectId, slot: usize) -> Option<&mut dyn Component> {
        self.nodes
            .get_mut(object)
            .and_then(|n| n.components.get_mut(slot))
            .map(AsMut::as_mut)
    }

    /// Number of components attached to the object
    pub fn component_count(&self, object: ObjectId) -> usize {
        self.nodes.get(object).map_or(0, |n| n.components.len())
    }

    /// First component of type `T` attached directly to the object
    pub fn find_component<T: Component>(&self, object: ObjectId) -> Option<&T> {
        self.nodes.get(object).and_then(Node::find_component)
    }

    /// Nearest ancestor owning a component of type `T`
    ///
    /// Walks the parent chain outward from (and excluding) `object`.
    ///
    /// # Errors
    /// - [`SceneError::AlreadyDisposed`] when the object no longer exists.
    /// - [`SceneError::NoMatchingAncestor`] when the chain is exhausted.
    pub fn ancestor_with_component<T: Component>(
        &self,
        object: ObjectId,
    ) -> Result<(ObjectId, &T), SceneError> {
        let mut current = self
            .nodes
            .get(object)
            .ok_or(SceneError::AlreadyDisposed)?
            .parent;
        while let Some(id) = current {
            let node = &self.nodes[id];
            if let Some(found) = node.find_component::<T>() {
                return Ok((id, found));
            }
            current = node.parent;
        }
        Err(SceneError::NoMatchingAncestor)
    }

    /// Search for a component of type `T`, descendants first
    ///
    /// Breadth-first over the subtree rooted at `start`, then up the
    /// ancestor chain checking each ancestor's own components. A miss is
    /// `None`, never an error.
    pub fn search_component<T: Component>(&self, start: ObjectId) -> Option<(ObjectId, &T)> {
        let mut visited = HashSet::new();
        self.search_component_with(start, &mut visited)
    }

    /// [`SceneGraph::search_component`] with a caller-owned visited set
    ///
    /// Objects already in `visited` are skipped and every object the search
    /// inspects is added, so repeated calls can resume past earlier results.
    pub fn search_component_with<T: Component>(
        &self,
        start: ObjectId,
        visited: &mut HashSet<ObjectId>,
    ) -> Option<(ObjectId, &T)> {
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            if let Some(found) = node.find_component::<T>() {
                return Some((current, found));
            }
            queue.extend(node.children.iter().copied());
        }

        // No descendant match: check each ancestor's own components.
        let mut current = self.nodes.get(start)?.parent;
        while let Some(id) = current {
            let node = self.nodes.get(id)?;
            if let Some(found) = node.find_component::<T>() {
                return Some((id, found));
            }
            current = node.parent;
        }
        None
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    /// Whether the object draws its renderables
    pub fn is_visible(&self, object: ObjectId) -> bool {
        self.nodes.get(object).is_some_and(|n| n.visible)
    }

    /// Set the visibility flag
    ///
    /// # Errors
    /// [`SceneError::AlreadyDisposed`] when the object no longer exists.
    pub fn set_visible(&mut self, object: ObjectId, visible: bool) -> Result<(), SceneError> {
        self.nodes
            .get_mut(object)
            .ok_or(SceneError::AlreadyDisposed)?
            .visible = visible;
        Ok(())
    }

    /// Whether the object takes part in the update traversal
    pub fn is_enabled(&self, object: ObjectId) -> bool {
        self.nodes.get(object).is_some_and(|n| n.enabled)
    }

    /// Set the enabled flag; a disabled object stops its whole subtree
    /// from updating
    ///
    /// # Errors
    /// [`SceneError::AlreadyDisposed`] when the object no longer exists.
    pub fn set_enabled(&mut self, object: ObjectId, enabled: bool) -> Result<(), SceneError> {
        self.nodes
            .get_mut(object)
            .ok_or(SceneError::AlreadyDisposed)?
            .enabled = enabled;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Traversals
    // ------------------------------------------------------------------

    /// Lazy enumeration of the object's components, then its direct children
    ///
    /// One level only; each call starts a fresh traversal.
    pub fn enumerate(&self, object: ObjectId) -> impl Iterator<Item = Entry<'_>> {
        let node = self.nodes.get(object);
        let components = node
            .map(|n| n.components.iter())
            .into_iter()
            .flatten()
            .map(|c| Entry::Component(c.as_ref()));
        let children = node
            .map(|n| n.children.iter())
            .into_iter()
            .flatten()
            .map(|&c| Entry::Child(c));
        components.chain(children)
    }

    /// Run every component's initialize hook, depth-first, components
    /// before children at each level
    pub fn initialize(&mut self, root: ObjectId) {
        for id in self.collect_preorder(root, false) {
            if let Some(node) = self.nodes.get_mut(id) {
                for component in &mut node.components {
                    component.initialize(id);
                }
            }
        }
    }

    /// Run every component's per-frame update hook
    ///
    /// Disabled objects are skipped together with their subtree.
    pub fn update(&mut self, root: ObjectId, delta_seconds: f32) {
        for id in self.collect_preorder(root, true) {
            if let Some(node) = self.nodes.get_mut(id) {
                for component in &mut node.components {
                    component.update(id, delta_seconds);
                }
            }
        }
    }

    /// Deliver a message to every component of `start` (and of its subtree
    /// when `recursive`), returning how many components handled it
    ///
    /// A return of zero means the message found no handler anywhere, which
    /// callers can treat as a diagnosable no-op.
    pub fn broadcast(&mut self, start: ObjectId, message: &Message, recursive: bool) -> usize {
        let order = if recursive {
            self.collect_preorder(start, false)
        } else if self.nodes.contains_key(start) {
            vec![start]
        } else {
            Vec::new()
        };

        let mut handled = 0;
        for id in order {
            if let Some(node) = self.nodes.get_mut(id) {
                for component in &mut node.components {
                    if component.handle_message(message) {
                        handled += 1;
                    }
                }
            }
        }
        if handled == 0 {
            log::debug!("message {message:?} found no handler");
        }
        handled
    }

    /// Pre-order subtree listing; `enabled_only` prunes disabled subtrees
    fn collect_preorder(&self, root: ObjectId, enabled_only: bool) -> Vec<ObjectId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if enabled_only && !node.enabled {
                continue;
            }
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use approx::assert_relative_eq;
    use std::cell::Cell as StdCell;
    use std::rc::Rc;

    struct Tag(u32);

    impl Component for Tag {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    struct Marker;

    impl Component for Marker {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    /// Counts lifecycle hook invocations through shared cells
    struct Probe {
        initialized: Rc<StdCell<u32>>,
        updated: Rc<StdCell<u32>>,
        detached: Rc<StdCell<u32>>,
    }

    impl Probe {
        fn new() -> (Self, Rc<StdCell<u32>>, Rc<StdCell<u32>>, Rc<StdCell<u32>>) {
            let initialized = Rc::new(StdCell::new(0));
            let updated = Rc::new(StdCell::new(0));
            let detached = Rc::new(StdCell::new(0));
            (
                Self {
                    initialized: initialized.clone(),
                    updated: updated.clone(),
                    detached: detached.clone(),
                },
                initialized,
                updated,
                detached,
            )
        }
    }

    impl Component for Probe {
        fn initialize(&mut self, _owner: ObjectId) {
            self.initialized.set(self.initialized.get() + 1);
        }
        fn update(&mut self, _owner: ObjectId, _delta_seconds: f32) {
            self.updated.set(self.updated.get() + 1);
        }
        fn on_detach(&mut self) {
            self.detached.set(self.detached.get() + 1);
        }
        fn handle_message(&mut self, message: &Message) -> bool {
            matches!(message, Message::Custom { .. })
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        Transform::from_position(Vec3::new(x, y, z)).to_matrix()
    }

    #[test]
    fn test_global_transform_matches_product_formula() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let middle = graph.create_object();
        let leaf = graph.create_object();
        graph.attach(root, middle).unwrap();
        graph.attach(middle, leaf).unwrap();

        graph.set_local_transform(root, translation(1.0, 0.0, 0.0)).unwrap();
        graph.set_local_transform(middle, translation(0.0, 2.0, 0.0)).unwrap();
        graph.set_local_transform(leaf, translation(0.0, 0.0, 3.0)).unwrap();

        let expected = translation(1.0, 0.0, 0.0) * translation(0.0, 2.0, 0.0) * translation(0.0, 0.0, 3.0);
        assert_relative_eq!(graph.global_transform(leaf).unwrap(), expected);

        // Mutating an ancestor must flow into descendants never touched
        // directly since their caches were populated.
        graph.set_local_transform(root, translation(-5.0, 0.0, 0.0)).unwrap();
        let expected = translation(-5.0, 0.0, 0.0) * translation(0.0, 2.0, 0.0) * translation(0.0, 0.0, 3.0);
        assert_relative_eq!(graph.global_transform(leaf).unwrap(), expected);
        assert_relative_eq!(
            graph.global_transform(middle).unwrap(),
            translation(-5.0, 0.0, 0.0) * translation(0.0, 2.0, 0.0)
        );
    }

    #[test]
    fn test_detached_object_global_equals_local() {
        let mut graph = SceneGraph::new();
        let object = graph.create_object();
        graph.set_local_transform(object, translation(4.0, 5.0, 6.0)).unwrap();
        assert_relative_eq!(
            graph.global_transform(object).unwrap(),
            translation(4.0, 5.0, 6.0)
        );
    }

    #[test]
    fn test_invalidation_spares_siblings() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let left = graph.create_object();
        let right = graph.create_object();
        let left_child = graph.create_object();
        graph.attach(root, left).unwrap();
        graph.attach(root, right).unwrap();
        graph.attach(left, left_child).unwrap();

        // Populate every cache.
        for &id in &[root, left, right, left_child] {
            graph.global_transform(id).unwrap();
        }
        let right_cached = graph.cached_global(right).unwrap();

        graph.set_local_transform(left, translation(9.0, 0.0, 0.0)).unwrap();

        assert!(graph.cached_global(left).is_none());
        assert!(graph.cached_global(left_child).is_none());
        assert_relative_eq!(graph.cached_global(right).unwrap(), right_cached);
        assert!(graph.cached_global(root).is_some());
    }

    #[test]
    fn test_translate_composes_onto_local() {
        let mut graph = SceneGraph::new();
        let object = graph.create_object();
        graph.translate(object, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        graph.translate_xyz(object, 0.0, 2.0, 0.0).unwrap();
        assert_relative_eq!(
            graph.global_transform(object).unwrap(),
            translation(1.0, 2.0, 0.0)
        );
    }

    #[test]
    fn test_attach_rejects_parented_child() {
        let mut graph = SceneGraph::new();
        let a = graph.create_object();
        let b = graph.create_object();
        let child = graph.create_object();
        graph.attach(a, child).unwrap();

        let result = graph.attach(b, child);
        assert!(matches!(result, Err(SceneError::HierarchyViolation(_))));
        // Both trees unchanged.
        assert_eq!(graph.parent(child), Some(a));
        assert_eq!(graph.children(a), &[child]);
        assert!(graph.children(b).is_empty());
    }

    #[test]
    fn test_attach_rejects_self_and_cycles() {
        let mut graph = SceneGraph::new();
        let a = graph.create_object();
        let b = graph.create_object();
        graph.attach(a, b).unwrap();

        assert!(matches!(
            graph.attach(a, a),
            Err(SceneError::HierarchyViolation(_))
        ));
        // `a` is a root, so attaching it under its own descendant must be
        // rejected as a cycle.
        assert!(matches!(
            graph.attach(b, a),
            Err(SceneError::HierarchyViolation(_))
        ));
    }

    #[test]
    fn test_attach_to_disposed_parent_fails() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_object();
        let child = graph.create_object();
        graph.dispose(parent);

        assert!(matches!(
            graph.attach(parent, child),
            Err(SceneError::AlreadyDisposed)
        ));
    }

    #[test]
    fn test_dispose_is_idempotent_and_exactly_once() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let child = graph.create_object();
        graph.attach(root, child).unwrap();

        let (probe_root, _, _, detached_root) = Probe::new();
        let (probe_child, _, _, detached_child) = Probe::new();
        graph.add_component(root, Box::new(probe_root)).unwrap();
        graph.add_component(child, Box::new(probe_child)).unwrap();

        graph.dispose(root);
        graph.dispose(root);
        graph.dispose(child);

        assert_eq!(detached_root.get(), 1);
        assert_eq!(detached_child.get(), 1);
        assert!(!graph.contains(root));
        assert!(!graph.contains(child));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_dispose_detaches_from_parent() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let child = graph.create_object();
        let sibling = graph.create_object();
        graph.attach(root, child).unwrap();
        graph.attach(root, sibling).unwrap();

        graph.dispose(child);
        assert_eq!(graph.children(root), &[sibling]);
        assert!(graph.contains(sibling));
    }

    #[test]
    fn test_detach_keeps_subtree_alive() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let child = graph.create_object();
        graph.attach(root, child).unwrap();
        graph.set_local_transform(root, translation(1.0, 0.0, 0.0)).unwrap();
        graph.set_local_transform(child, translation(0.0, 1.0, 0.0)).unwrap();
        graph.global_transform(child).unwrap();

        graph.detach(child).unwrap();
        assert!(graph.contains(child));
        assert_eq!(graph.parent(child), None);
        assert!(graph.children(root).is_empty());
        // The severed subtree re-evaluates against its new (absent) chain.
        assert_relative_eq!(
            graph.global_transform(child).unwrap(),
            translation(0.0, 1.0, 0.0)
        );
    }

    #[test]
    fn test_detach_component_does_not_dispose() {
        let mut graph = SceneGraph::new();
        let object = graph.create_object();
        let (probe, _, _, detached) = Probe::new();
        let slot = graph.add_component(object, Box::new(probe)).unwrap();

        let removed = graph.detach_component(object, slot);
        assert!(removed.is_some());
        assert_eq!(detached.get(), 1);
        assert_eq!(graph.component_count(object), 0);
        // Absent slot is a no-op.
        assert!(graph.detach_component(object, slot).is_none());
    }

    #[test]
    fn test_search_prefers_descendants_over_ancestors() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let start = graph.create_object();
        let deep = graph.create_object();
        graph.attach(root, start).unwrap();
        graph.attach(start, deep).unwrap();

        graph.add_component(root, Box::new(Tag(1))).unwrap();
        graph.add_component(deep, Box::new(Tag(2))).unwrap();

        let (found_on, tag) = graph.search_component::<Tag>(start).unwrap();
        assert_eq!(found_on, deep);
        assert_eq!(tag.0, 2);
    }

    #[test]
    fn test_search_falls_back_to_ancestors() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let middle = graph.create_object();
        let start = graph.create_object();
        graph.attach(root, middle).unwrap();
        graph.attach(middle, start).unwrap();
        graph.add_component(root, Box::new(Tag(7))).unwrap();

        let (found_on, tag) = graph.search_component::<Tag>(start).unwrap();
        assert_eq!(found_on, root);
        assert_eq!(tag.0, 7);
    }

    #[test]
    fn test_search_miss_is_none_not_error() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let child = graph.create_object();
        graph.attach(root, child).unwrap();
        graph.add_component(root, Box::new(Marker)).unwrap();

        assert!(graph.search_component::<Tag>(child).is_none());
    }

    #[test]
    fn test_search_resumes_past_visited_objects() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let first = graph.create_object();
        let second = graph.create_object();
        graph.attach(root, first).unwrap();
        graph.attach(root, second).unwrap();
        graph.add_component(first, Box::new(Tag(1))).unwrap();
        graph.add_component(second, Box::new(Tag(2))).unwrap();

        let mut visited = HashSet::new();
        let (found, _) = graph.search_component_with::<Tag>(root, &mut visited).unwrap();
        assert_eq!(found, first);

        // The same set skips everything up to and including the first hit.
        let (found, tag) = graph.search_component_with::<Tag>(root, &mut visited).unwrap();
        assert_eq!(found, second);
        assert_eq!(tag.0, 2);
    }

    #[test]
    fn test_ancestor_with_component_nearest_first() {
        let mut graph = SceneGraph::new();
        let far = graph.create_object();
        let near = graph.create_object();
        let start = graph.create_object();
        graph.attach(far, near).unwrap();
        graph.attach(near, start).unwrap();
        graph.add_component(far, Box::new(Tag(1))).unwrap();
        graph.add_component(near, Box::new(Tag(2))).unwrap();
        // A component on the start object itself must not satisfy an
        // ancestor search.
        graph.add_component(start, Box::new(Tag(3))).unwrap();

        let (found, tag) = graph.ancestor_with_component::<Tag>(start).unwrap();
        assert_eq!(found, near);
        assert_eq!(tag.0, 2);
    }

    #[test]
    fn test_ancestor_search_exhaustion_is_an_error() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let child = graph.create_object();
        graph.attach(root, child).unwrap();

        assert!(matches!(
            graph.ancestor_with_component::<Tag>(child),
            Err(SceneError::NoMatchingAncestor)
        ));
    }

    #[test]
    fn test_enumerate_components_then_children() {
        let mut graph = SceneGraph::new();
        let object = graph.create_object();
        let child = graph.create_object();
        graph.attach(object, child).unwrap();
        graph.add_component(object, Box::new(Tag(1))).unwrap();
        graph.add_component(object, Box::new(Marker)).unwrap();

        let entries: Vec<_> = graph.enumerate(object).collect();
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[0], Entry::Component(_)));
        assert!(matches!(entries[1], Entry::Component(_)));
        assert!(matches!(entries[2], Entry::Child(c) if c == child));

        // Restartable: a fresh traversal yields the same number of items.
        assert_eq!(graph.enumerate(object).count(), 3);
    }

    #[test]
    fn test_initialize_runs_once_per_component() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let child = graph.create_object();
        graph.attach(root, child).unwrap();
        let (probe_a, init_a, _, _) = Probe::new();
        let (probe_b, init_b, _, _) = Probe::new();
        graph.add_component(root, Box::new(probe_a)).unwrap();
        graph.add_component(child, Box::new(probe_b)).unwrap();

        graph.initialize(root);
        assert_eq!(init_a.get(), 1);
        assert_eq!(init_b.get(), 1);
    }

    #[test]
    fn test_update_skips_disabled_subtree() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let disabled = graph.create_object();
        let below = graph.create_object();
        graph.attach(root, disabled).unwrap();
        graph.attach(disabled, below).unwrap();
        graph.set_enabled(disabled, false).unwrap();

        let (probe_root, _, updated_root, _) = Probe::new();
        let (probe_below, _, updated_below, _) = Probe::new();
        graph.add_component(root, Box::new(probe_root)).unwrap();
        graph.add_component(below, Box::new(probe_below)).unwrap();

        graph.update(root, 1.0 / 60.0);
        assert_eq!(updated_root.get(), 1);
        assert_eq!(updated_below.get(), 0);
    }

    #[test]
    fn test_broadcast_reports_handled_count() {
        let mut graph = SceneGraph::new();
        let root = graph.create_object();
        let child = graph.create_object();
        graph.attach(root, child).unwrap();
        let (probe_a, _, _, _) = Probe::new();
        let (probe_b, _, _, _) = Probe::new();
        graph.add_component(root, Box::new(probe_a)).unwrap();
        graph.add_component(child, Box::new(probe_b)).unwrap();
        graph.add_component(child, Box::new(Marker)).unwrap();

        let message = Message::Custom { id: 1, payload: 0.5 };
        assert_eq!(graph.broadcast(root, &message, true), 2);
        assert_eq!(graph.broadcast(root, &message, false), 1);
        // Probes ignore non-custom messages: diagnosable no-op.
        assert_eq!(graph.broadcast(root, &Message::SceneReady, true), 0);
    }
}
