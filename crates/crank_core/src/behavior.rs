//! Per-node behaviour: every hook has a no-op default, so a node kind only
//! implements what it needs.

use crate::context::NodeContext;
use std::any::Any;

/// Downcasting support for boxed behaviours.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub trait Behavior: AsAny {
    /// Runs once, on the first update tick the node receives while enabled.
    fn start(&mut self, _ctx: &mut NodeContext<'_, '_>) {}

    fn update(&mut self, _ctx: &mut NodeContext<'_, '_>, _dt: f64) {}

    fn fixed_update(&mut self, _ctx: &mut NodeContext<'_, '_>, _dt: f64) {}

    /// Draw the node itself. Children are drawn afterwards.
    fn render(&mut self, _ctx: &mut NodeContext<'_, '_>) {}

    /// Draw on top of the node's children.
    fn late_render(&mut self, _ctx: &mut NodeContext<'_, '_>) {}

    fn on_mouse_over(&mut self, _ctx: &mut NodeContext<'_, '_>) {}

    fn on_mouse_out(&mut self, _ctx: &mut NodeContext<'_, '_>) {}

    fn on_mouse_down(&mut self, _ctx: &mut NodeContext<'_, '_>) {}

    fn on_mouse_up(&mut self, _ctx: &mut NodeContext<'_, '_>) {}

    /// Fires once, during the sweep that removes the node.
    fn on_destroy(&mut self, _ctx: &mut NodeContext<'_, '_>) {}
}

/// Closure hook run after `Behavior::start`.
pub type StartHook = Box<dyn FnMut(&mut NodeContext<'_, '_>)>;

/// Closure hook run after `Behavior::update` or `Behavior::fixed_update`.
pub type TickHook = Box<dyn FnMut(&mut NodeContext<'_, '_>, f64)>;

/// Behaviour-less nodes (pure containers) use this.
#[derive(Debug, Default)]
pub struct Empty;

impl Behavior for Empty {}
