use crate::behavior::Behavior;
use crate::context::NodeContext;
use crate::util::Color;

/// A solid and/or outlined rectangle covering the node's world rect.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectNode {
    fill: Option<Color>,
    border: Option<Color>,
}

impl RectNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filled(color: Color) -> Self {
        Self {
            fill: Some(color),
            border: None,
        }
    }

    pub fn with_border(mut self, color: Color) -> Self {
        self.border = Some(color);
        self
    }

    pub fn fill_color(&self) -> Option<Color> {
        self.fill
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.fill = Some(color);
    }

    pub fn border_color(&self) -> Option<Color> {
        self.border
    }

    pub fn set_border_color(&mut self, color: Color) {
        self.border = Some(color);
    }

    pub fn clear_colors(&mut self) {
        self.fill = None;
        self.border = None;
    }
}

impl Behavior for RectNode {
    fn render(&mut self, ctx: &mut NodeContext<'_, '_>) {
        let dest = ctx.world_rect();
        if let Some(fill) = self.fill {
            ctx.device().draw_rect(dest, fill, true);
        }
        if let Some(border) = self.border {
            ctx.device().draw_rect(dest, border, false);
        }
    }
}
