//! The node forest.
//!
//! Nodes live in a slot-map arena and are addressed by `NodeId`. A parent owns
//! the ordered list of its children's ids; a child only records its parent's
//! id. Top-level nodes are owned by the scene itself. Removing a node removes
//! its whole subtree.
//!
//! Every traversal walks a child list by position while re-reading it, so a
//! node appended to a list that is still being walked is visited in the same
//! pass. Nodes are never removed mid-walk: `destroy` only marks a subtree, and
//! `destroy_sweep` removes marked nodes once per frame after rendering.

use crate::behavior::{Behavior, StartHook, TickHook};
use crate::collision::intersects;
use crate::context::{Env, NodeContext};
use crate::error::{EngineError, EngineResult};
use crate::input::MouseButton;
use crate::transform::{world_rect, Anchor, ParentFrame, Rect};
use bitflags::bitflags;
use slotmap::{new_key_type, SlotMap};
use std::ops::{Index, IndexMut};

pub const DEFAULT_NODE_WIDTH: f32 = 100.0;
pub const DEFAULT_NODE_HEIGHT: f32 = 100.0;

new_key_type! {
    /// Stable handle to a node. Never reused for a different node.
    pub struct NodeId;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct NodeFlags: u8 {
        const ENABLED         = 1 << 0;
        const STARTED         = 1 << 1;
        const PENDING_DESTROY = 1 << 2;
        const HOVERED         = 1 << 3;
        const INPUT_ACTIVE    = 1 << 4;
    }
}

/// Transform, ordering and lifecycle state shared by every node kind.
#[derive(Debug, Clone)]
pub struct NodeData {
    rect: Rect,
    scale: f32,
    anchor: Anchor,
    z: i32,
    name: Option<String>,
    flags: NodeFlags,
    index: u64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(index: u64) -> Self {
        Self {
            rect: Rect::new(0.0, 0.0, DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT),
            scale: 1.0,
            anchor: Anchor::default(),
            z: 0,
            name: None,
            flags: NodeFlags::ENABLED,
            index,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Local rect, relative to the parent's world origin.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.rect.x = x;
        self.rect.y = y;
    }

    pub fn set_size(&mut self, w: f32, h: f32) {
        self.rect.w = w;
        self.rect.h = h;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: Anchor) {
        self.anchor = anchor;
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn set_z(&mut self, z: i32) {
        self.z = z;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(NodeFlags::ENABLED)
    }

    pub fn enable(&mut self) {
        self.flags.insert(NodeFlags::ENABLED);
    }

    pub fn disable(&mut self) {
        self.flags.remove(NodeFlags::ENABLED);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.flags.set(NodeFlags::ENABLED, enabled);
    }

    pub fn has_started(&self) -> bool {
        self.flags.contains(NodeFlags::STARTED)
    }

    pub fn is_pending_destroy(&self) -> bool {
        self.flags.contains(NodeFlags::PENDING_DESTROY)
    }

    pub fn is_hovered(&self) -> bool {
        self.flags.contains(NodeFlags::HOVERED)
    }

    pub fn is_input_active(&self) -> bool {
        self.flags.contains(NodeFlags::INPUT_ACTIVE)
    }

    /// Creation order, unique across the scene's lifetime.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

struct NodeSlot {
    data: NodeData,
    /// Taken out while one of its hooks runs.
    behavior: Option<Box<dyn Behavior>>,
    on_start: Option<StartHook>,
    on_update: Option<TickHook>,
    on_fixed_update: Option<TickHook>,
}

#[derive(Clone, Copy)]
enum TickKind {
    Update,
    FixedUpdate,
}

impl NodeSlot {
    fn tick_hook(&mut self, kind: TickKind) -> &mut Option<TickHook> {
        match kind {
            TickKind::Update => &mut self.on_update,
            TickKind::FixedUpdate => &mut self.on_fixed_update,
        }
    }
}

#[derive(Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, NodeSlot>,
    roots: Vec<NodeId>,
    next_index: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes, at any depth.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id).map(|slot| &slot.data)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id).map(|slot| &mut slot.data)
    }

    // --- construction and ownership ---

    pub fn add_root<B: Behavior>(&mut self, behavior: B) -> NodeId {
        self.insert(None, Box::new(behavior))
    }

    /// Append a child. A child added under a node that is pending destroy is
    /// pending destroy as well.
    pub fn add_child<B: Behavior>(&mut self, parent: NodeId, behavior: B) -> NodeId {
        self.insert(Some(parent), Box::new(behavior))
    }

    pub fn add_boxed(&mut self, parent: Option<NodeId>, behavior: Box<dyn Behavior>) -> NodeId {
        self.insert(parent, behavior)
    }

    fn insert(&mut self, parent: Option<NodeId>, behavior: Box<dyn Behavior>) -> NodeId {
        let index = self.next_index;
        self.next_index += 1;
        let id = self.nodes.insert(NodeSlot {
            data: NodeData::new(index),
            behavior: Some(behavior),
            on_start: None,
            on_update: None,
            on_fixed_update: None,
        });

        match parent {
            Some(p) if self.nodes.contains_key(p) => self.attach(id, Some(p)),
            Some(p) => {
                log::warn!("Parent {p:?} no longer exists, {id:?} will be swept with it");
                self.attach(id, None);
                self.destroy(id);
            }
            None => self.attach(id, None),
        }
        id
    }

    /// Move `child` under `new_parent` (or to the top level), detaching it
    /// from its previous owner first. Rejects moves that would make a node
    /// its own ancestor.
    pub fn reparent(&mut self, child: NodeId, new_parent: Option<NodeId>) -> EngineResult<()> {
        if !self.nodes.contains_key(child) {
            return Err(EngineError::misuse(format!("reparent of unknown node {child:?}")));
        }
        if let Some(parent) = new_parent {
            if !self.nodes.contains_key(parent) {
                return Err(EngineError::misuse(format!(
                    "reparent under unknown node {parent:?}"
                )));
            }
            let mut cursor = Some(parent);
            while let Some(ancestor) = cursor {
                if ancestor == child {
                    return Err(EngineError::misuse(format!(
                        "{child:?} cannot become a descendant of itself"
                    )));
                }
                cursor = self.nodes.get(ancestor).and_then(|s| s.data.parent);
            }
        }

        self.detach(child);
        self.attach(child, new_parent);
        Ok(())
    }

    fn attach(&mut self, id: NodeId, parent: Option<NodeId>) {
        let Some(parent) = parent else {
            self.roots.push(id);
            return;
        };
        let parent_pending = match self.nodes.get_mut(parent) {
            Some(slot) => {
                slot.data.children.push(id);
                slot.data.is_pending_destroy()
            }
            None => false,
        };
        if let Some(slot) = self.nodes.get_mut(id) {
            slot.data.parent = Some(parent);
        }
        if parent_pending {
            self.destroy(id);
        }
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes.get(id).and_then(|s| s.data.parent);
        let siblings = match parent {
            Some(p) => self.nodes.get_mut(p).map(|s| &mut s.data.children),
            None => Some(&mut self.roots),
        };
        if let Some(siblings) = siblings {
            if let Some(pos) = siblings.iter().position(|c| *c == id) {
                siblings.remove(pos);
            }
        }
        if let Some(slot) = self.nodes.get_mut(id) {
            slot.data.parent = None;
        }
    }

    fn child_at(&self, parent: Option<NodeId>, i: usize) -> Option<NodeId> {
        match parent {
            None => self.roots.get(i).copied(),
            Some(p) => self.nodes.get(p)?.data.children.get(i).copied(),
        }
    }

    fn has_flag(&self, id: NodeId, flag: NodeFlags) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|s| s.data.flags.contains(flag))
    }

    fn set_flag(&mut self, id: NodeId, flag: NodeFlags, value: bool) {
        if let Some(slot) = self.nodes.get_mut(id) {
            slot.data.flags.set(flag, value);
        }
    }

    pub fn is_enabled(&self, id: NodeId) -> bool {
        self.has_flag(id, NodeFlags::ENABLED)
    }

    // --- closure hooks ---

    pub fn set_start(&mut self, id: NodeId, hook: impl FnMut(&mut NodeContext<'_, '_>) + 'static) {
        if let Some(slot) = self.nodes.get_mut(id) {
            if slot.on_start.is_some() {
                log::warn!("Start hook already set on {id:?}, overriding");
            }
            slot.on_start = Some(Box::new(hook));
        }
    }

    pub fn set_update(
        &mut self,
        id: NodeId,
        hook: impl FnMut(&mut NodeContext<'_, '_>, f64) + 'static,
    ) {
        self.set_tick_hook(id, TickKind::Update, Box::new(hook));
    }

    pub fn set_fixed_update(
        &mut self,
        id: NodeId,
        hook: impl FnMut(&mut NodeContext<'_, '_>, f64) + 'static,
    ) {
        self.set_tick_hook(id, TickKind::FixedUpdate, Box::new(hook));
    }

    fn set_tick_hook(&mut self, id: NodeId, kind: TickKind, hook: TickHook) {
        if let Some(slot) = self.nodes.get_mut(id) {
            let current = slot.tick_hook(kind);
            if current.is_some() {
                let label = match kind {
                    TickKind::Update => "Update",
                    TickKind::FixedUpdate => "Fixed update",
                };
                log::warn!("{label} hook already set on {id:?}, overriding");
            }
            *current = Some(hook);
        }
    }

    // --- geometry ---

    /// World-space rect, recomputed from the parent chain on every call.
    pub fn world_rect(&self, id: NodeId) -> Option<Rect> {
        let data = &self.nodes.get(id)?.data;
        let parent = match data.parent {
            Some(p) => Some(ParentFrame {
                world: self.world_rect(p)?,
                scale: self.nodes.get(p)?.data.scale,
            }),
            None => None,
        };
        Some(world_rect(data.rect, data.scale, data.anchor, parent))
    }

    /// AABB overlap of the two nodes' world rects.
    pub fn check_collision(&self, a: NodeId, b: NodeId) -> bool {
        match (self.world_rect(a), self.world_rect(b)) {
            (Some(a), Some(b)) => intersects(&a, &b),
            _ => false,
        }
    }

    /// The node's world rect grown to cover every enabled child subtree whose
    /// own bounding box reaches into `viewport`.
    pub fn bounding_box(&self, id: NodeId, viewport: Rect) -> Option<Rect> {
        let slot = self.nodes.get(id)?;
        let mut bounds = self.world_rect(id)?;
        for &child in &slot.data.children {
            if !self.is_enabled(child) {
                continue;
            }
            if let Some(child_bounds) = self.bounding_box(child, viewport) {
                if intersects(&child_bounds, &viewport) {
                    bounds = bounds.union(&child_bounds);
                }
            }
        }
        Some(bounds)
    }

    pub fn can_render(&self, id: NodeId, viewport: Rect) -> bool {
        self.bounding_box(id, viewport)
            .is_some_and(|bounds| intersects(&bounds, &viewport))
    }

    // --- lookups ---

    pub fn behavior<T: Behavior>(&self, id: NodeId) -> Option<&T> {
        self.nodes
            .get(id)?
            .behavior
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn behavior_mut<T: Behavior>(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes
            .get_mut(id)?
            .behavior
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Children of `parent` (top level when `None`) whose behaviour is a `T`,
    /// in list order. With `nested`, each child's matches follow it.
    pub fn children_of_type<T: Behavior>(&self, parent: Option<NodeId>, nested: bool) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_of_type::<T>(parent, nested, &mut found);
        found
    }

    pub fn child_of_type<T: Behavior>(&self, parent: Option<NodeId>, nested: bool) -> Option<NodeId> {
        self.children_of_type::<T>(parent, nested).into_iter().next()
    }

    fn collect_of_type<T: Behavior>(&self, parent: Option<NodeId>, nested: bool, found: &mut Vec<NodeId>) {
        let children = match parent {
            None => &self.roots,
            Some(p) => match self.nodes.get(p) {
                Some(slot) => &slot.data.children,
                None => return,
            },
        };
        for &child in children {
            if self.behavior::<T>(child).is_some() {
                found.push(child);
            }
            if nested {
                self.collect_of_type::<T>(Some(child), nested, found);
            }
        }
    }

    /// First node with this name, depth-first from the top level.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let slot = self.nodes.get(id)?;
            if slot.data.name.as_deref() == Some(name) {
                return Some(id);
            }
            stack.extend(slot.data.children.iter().rev().copied());
        }
        None
    }

    // --- hook dispatch ---

    fn call(
        &mut self,
        env: &mut Env<'_>,
        id: NodeId,
        hook: impl FnOnce(&mut dyn Behavior, &mut NodeContext<'_, '_>),
    ) {
        let Some(mut behavior) = self.nodes.get_mut(id).and_then(|s| s.behavior.take()) else {
            return;
        };
        hook(&mut *behavior, &mut NodeContext::new(id, self, env));
        if let Some(slot) = self.nodes.get_mut(id) {
            slot.behavior = Some(behavior);
        }
    }

    fn run_start_hook(&mut self, env: &mut Env<'_>, id: NodeId) {
        let Some(mut hook) = self.nodes.get_mut(id).and_then(|s| s.on_start.take()) else {
            return;
        };
        hook(&mut NodeContext::new(id, self, env));
        if let Some(slot) = self.nodes.get_mut(id) {
            if slot.on_start.is_none() {
                slot.on_start = Some(hook);
            }
        }
    }

    fn run_tick_hook(&mut self, env: &mut Env<'_>, id: NodeId, kind: TickKind, dt: f64) {
        let Some(mut hook) = self.nodes.get_mut(id).and_then(|s| s.tick_hook(kind).take()) else {
            return;
        };
        hook(&mut NodeContext::new(id, self, env), dt);
        if let Some(slot) = self.nodes.get_mut(id) {
            let current = slot.tick_hook(kind);
            if current.is_none() {
                *current = Some(hook);
            }
        }
    }

    // --- per-frame phases ---

    /// Variable update over every enabled top-level node.
    pub fn update(&mut self, env: &mut Env<'_>, dt: f64) {
        let mut i = 0;
        while let Some(id) = self.child_at(None, i) {
            i += 1;
            if self.is_enabled(id) {
                self.update_node(env, id, dt);
            }
        }
    }

    fn update_node(&mut self, env: &mut Env<'_>, id: NodeId, dt: f64) {
        if !self.has_flag(id, NodeFlags::STARTED) {
            log::trace!("Starting node {id:?}");
            self.call(env, id, |b, ctx| b.start(ctx));
            self.run_start_hook(env, id);
            self.set_flag(id, NodeFlags::STARTED, true);
        }

        self.hit_test(env, id);

        self.call(env, id, |b, ctx| b.update(ctx, dt));
        self.run_tick_hook(env, id, TickKind::Update, dt);

        let mut i = 0;
        while let Some(child) = self.child_at(Some(id), i) {
            i += 1;
            if self.is_enabled(child) {
                self.update_node(env, child, dt);
            }
        }
    }

    fn hit_test(&mut self, env: &mut Env<'_>, id: NodeId) {
        let Some(rect) = self.world_rect(id) else {
            return;
        };
        let pointer = env.input.mouse_position;
        let pressed = env.input.is_mouse_pressed(MouseButton::Left);
        let released = env.input.is_mouse_released(MouseButton::Left);

        if rect.contains_point(pointer) {
            if pressed {
                self.call(env, id, |b, ctx| b.on_mouse_down(ctx));
                self.set_flag(id, NodeFlags::INPUT_ACTIVE, true);
            }
            if !self.has_flag(id, NodeFlags::HOVERED) {
                self.call(env, id, |b, ctx| b.on_mouse_over(ctx));
                self.set_flag(id, NodeFlags::HOVERED, true);
            }
        } else if self.has_flag(id, NodeFlags::HOVERED) {
            self.call(env, id, |b, ctx| b.on_mouse_out(ctx));
            self.set_flag(id, NodeFlags::HOVERED, false);
        }

        if released && self.has_flag(id, NodeFlags::INPUT_ACTIVE) {
            self.call(env, id, |b, ctx| b.on_mouse_up(ctx));
            self.set_flag(id, NodeFlags::INPUT_ACTIVE, false);
        }
    }

    /// One fixed step over every enabled top-level node. Nodes that have not
    /// started yet are skipped, their children are still visited.
    pub fn fixed_update(&mut self, env: &mut Env<'_>, dt: f64) {
        let mut i = 0;
        while let Some(id) = self.child_at(None, i) {
            i += 1;
            if self.is_enabled(id) {
                self.fixed_update_node(env, id, dt);
            }
        }
    }

    fn fixed_update_node(&mut self, env: &mut Env<'_>, id: NodeId, dt: f64) {
        if self.has_flag(id, NodeFlags::STARTED) {
            self.call(env, id, |b, ctx| b.fixed_update(ctx, dt));
            self.run_tick_hook(env, id, TickKind::FixedUpdate, dt);
        }

        let mut i = 0;
        while let Some(child) = self.child_at(Some(id), i) {
            i += 1;
            if self.is_enabled(child) {
                self.fixed_update_node(env, child, dt);
            }
        }
    }

    /// Draw every enabled top-level node whose bounding box reaches the
    /// screen viewport, in z order.
    pub fn render(&mut self, env: &mut Env<'_>) {
        let viewport = env.screen.viewport();
        self.sort_by_z(None);
        let mut i = 0;
        while let Some(id) = self.child_at(None, i) {
            i += 1;
            if self.is_enabled(id) {
                self.render_node(env, id, viewport);
            }
        }
    }

    fn render_node(&mut self, env: &mut Env<'_>, id: NodeId, viewport: Rect) {
        if !self.can_render(id, viewport) {
            return;
        }
        self.sort_by_z(Some(id));

        self.call(env, id, |b, ctx| b.render(ctx));

        let mut i = 0;
        while let Some(child) = self.child_at(Some(id), i) {
            i += 1;
            if self.is_enabled(child) {
                self.render_node(env, child, viewport);
            }
        }

        self.call(env, id, |b, ctx| b.late_render(ctx));
    }

    /// Stable sort, so equal z keeps insertion order.
    fn sort_by_z(&mut self, parent: Option<NodeId>) {
        let mut ids = match parent {
            None => std::mem::take(&mut self.roots),
            Some(p) => match self.nodes.get_mut(p) {
                Some(slot) => std::mem::take(&mut slot.data.children),
                None => return,
            },
        };
        ids.sort_by_key(|id| self.nodes.get(*id).map_or(0, |s| s.data.z));
        match parent {
            None => self.roots = ids,
            Some(p) => {
                if let Some(slot) = self.nodes.get_mut(p) {
                    slot.data.children = ids;
                }
            }
        }
    }

    // --- destruction ---

    /// Mark the node and its entire subtree pending destroy. Nothing is
    /// removed until the next `destroy_sweep`.
    pub fn destroy(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(slot) = self.nodes.get_mut(next) {
                slot.data.flags.insert(NodeFlags::PENDING_DESTROY);
                stack.extend(slot.data.children.iter().copied());
            }
        }
    }

    pub fn destroy_all(&mut self) {
        let roots = self.roots.clone();
        for id in roots {
            self.destroy(id);
        }
    }

    /// Remove every pending node, post-order: a node's children are swept
    /// before the node itself. `on_destroy` fires once per removed node,
    /// children first. Returns how many nodes were removed.
    pub fn destroy_sweep(&mut self, env: &mut Env<'_>) -> usize {
        let removed = self.sweep(env, None);
        if removed > 0 {
            log::debug!("Destroy sweep removed {removed} node(s), {} remain", self.len());
        }
        removed
    }

    fn sweep(&mut self, env: &mut Env<'_>, parent: Option<NodeId>) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while let Some(child) = self.child_at(parent, i) {
            removed += self.sweep(env, Some(child));
            if self.has_flag(child, NodeFlags::PENDING_DESTROY) {
                removed += self.remove_subtree(env, child);
            } else {
                i += 1;
            }
        }
        removed
    }

    fn remove_subtree(&mut self, env: &mut Env<'_>, id: NodeId) -> usize {
        let mut removed = 0;
        while let Some(child) = self.child_at(Some(id), 0) {
            removed += self.remove_subtree(env, child);
        }
        self.call(env, id, |b, ctx| b.on_destroy(ctx));
        // Children spawned by `on_destroy` go with their parent.
        while let Some(child) = self.child_at(Some(id), 0) {
            removed += self.remove_subtree(env, child);
        }
        self.detach(id);
        if self.nodes.remove(id).is_some() {
            removed += 1;
        }
        removed
    }
}

impl Index<NodeId> for Scene {
    type Output = NodeData;

    fn index(&self, id: NodeId) -> &NodeData {
        &self.nodes[id].data
    }
}

impl IndexMut<NodeId> for Scene {
    fn index_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id].data
    }
}
