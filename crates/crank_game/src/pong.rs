//! Two-player Pong built from scene nodes.
//!
//! `GameManager` owns the match: it spawns the ball, both paddles, the
//! scoring borders and the scoreboard as its children, checks the ball's next
//! position against paddles and borders every frame, and draws the dashed
//! centre line after its children.

use crank_core::collision::intersects;
use crank_core::device::{FontHandle, RenderDevice};
use crank_core::error::EngineResult;
use crank_core::input::Key;
use crank_core::nodes::{RectNode, TextNode};
use crank_core::scene::{NodeId, Scene};
use crank_core::transform::Rect;
use crank_core::util::Color;
use crank_core::{Behavior, NodeContext};

/// Edge length of the ball, paddle width and paddle inset.
pub const SIZE: f32 = 35.0;
pub const PADDLE_HEIGHT: f32 = 300.0;
pub const PADDLE_SPEED: f32 = 1000.0;
pub const BALL_START_SPEED: f32 = 400.0;
pub const BALL_SPEED_STEP: f32 = 25.0;
pub const BORDER_WIDTH: f32 = 10.0;
pub const SCORE_FONT_SIZE: f32 = 150.0;

const DASH_WIDTH: f32 = 5.0;
const DASH_HEIGHT: f32 = 50.0;
const DASH_ROWS: f32 = 23.0;

pub struct Ball {
    shape: RectNode,
    speed: f32,
    x_direction: f32,
    y_direction: f32,
    max_x: f32,
    max_y: f32,
    previous_dt: f32,
}

impl Default for Ball {
    fn default() -> Self {
        Self {
            shape: RectNode::filled(Color::WHITE),
            speed: BALL_START_SPEED,
            x_direction: 1.0,
            y_direction: -1.0,
            max_x: 0.0,
            max_y: 0.0,
            previous_dt: 0.0,
        }
    }
}

impl Ball {
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn x_direction(&self) -> f32 {
        self.x_direction
    }

    /// Where the ball will be after another step of the last frame's length.
    pub fn next_rect(&self, current: Rect) -> Rect {
        let dt = self.previous_dt;
        Rect::new(
            (current.x + self.speed * self.x_direction * dt).clamp(0.0, self.max_x),
            (current.y + self.speed * self.y_direction * dt).clamp(0.0, self.max_y),
            current.w,
            current.h,
        )
    }

    /// Bounce off a paddle and speed up.
    pub fn change_direction(&mut self) {
        self.x_direction = -self.x_direction;
        self.speed += BALL_SPEED_STEP;
    }

    /// Serve from the centre towards the player who just scored.
    pub fn reset(scene: &mut Scene, id: NodeId) {
        let Some((x, y)) = scene.behavior_mut::<Ball>(id).map(Ball::serve) else {
            return;
        };
        if let Some(node) = scene.node_mut(id) {
            node.set_position(x, y);
        }
    }

    fn serve(&mut self) -> (f32, f32) {
        self.x_direction = -self.x_direction;
        self.speed = BALL_START_SPEED;
        (self.max_x / 2.0, self.max_y / 2.0)
    }
}

impl Behavior for Ball {
    fn start(&mut self, ctx: &mut NodeContext<'_, '_>) {
        ctx.node_mut().set_rect(Rect::new(0.0, 0.0, SIZE, SIZE));
        let rect = ctx.world_rect();
        let screen = *ctx.screen();
        // A screen smaller than the ball pins it to the top-left corner.
        self.max_x = (screen.width as f32 - rect.w).max(0.0);
        self.max_y = (screen.height as f32 - rect.h).max(0.0);
        let (x, y) = self.serve();
        ctx.node_mut().set_position(x, y);
    }

    fn update(&mut self, ctx: &mut NodeContext<'_, '_>, dt: f64) {
        if !ctx.screen().focused {
            return;
        }
        let dt = dt as f32;
        let rect = ctx.node().rect();
        let x = rect.x + self.speed * self.x_direction * dt;
        let y = rect.y + self.speed * self.y_direction * dt;
        if x > self.max_x || x < 0.0 {
            self.x_direction = -self.x_direction;
        }
        if y > self.max_y || y < 0.0 {
            self.y_direction = -self.y_direction;
        }
        ctx.node_mut()
            .set_position(x.clamp(0.0, self.max_x), y.clamp(0.0, self.max_y));
        self.previous_dt = dt;
    }

    fn render(&mut self, ctx: &mut NodeContext<'_, '_>) {
        self.shape.render(ctx);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

pub struct Paddle {
    shape: RectNode,
    side: Side,
    up: Key,
    down: Key,
}

impl Paddle {
    pub fn new(side: Side) -> Self {
        let (up, down) = match side {
            Side::Left => (Key::Char('W'), Key::Char('S')),
            Side::Right => (Key::Up, Key::Down),
        };
        Self {
            shape: RectNode::filled(Color::WHITE),
            side,
            up,
            down,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

impl Behavior for Paddle {
    fn start(&mut self, ctx: &mut NodeContext<'_, '_>) {
        let screen = *ctx.screen();
        let x = match self.side {
            Side::Left => SIZE,
            Side::Right => screen.width as f32 - SIZE - SIZE,
        };
        let y = screen.height as f32 / 2.0 - PADDLE_HEIGHT / 2.0;
        ctx.node_mut().set_rect(Rect::new(x, y, SIZE, PADDLE_HEIGHT));
    }

    fn update(&mut self, ctx: &mut NodeContext<'_, '_>, dt: f64) {
        if !ctx.screen().focused {
            return;
        }
        let step = PADDLE_SPEED * dt as f32;
        let rect = ctx.node().rect();
        let mut y = rect.y;
        if ctx.input().is_key_down(self.up) {
            y -= step;
        } else if ctx.input().is_key_down(self.down) {
            y += step;
        }
        let max_y = (ctx.screen().height as f32 - rect.h).max(0.0);
        ctx.node_mut().set_position(rect.x, y.clamp(0.0, max_y));
    }

    fn render(&mut self, ctx: &mut NodeContext<'_, '_>) {
        self.shape.render(ctx);
    }
}

pub struct ScoreBoard {
    font: Option<FontHandle>,
    left_score: u32,
    right_score: u32,
    left_text: Option<NodeId>,
    right_text: Option<NodeId>,
}

impl ScoreBoard {
    pub fn new(font: Option<FontHandle>) -> Self {
        Self {
            font,
            left_score: 0,
            right_score: 0,
            left_text: None,
            right_text: None,
        }
    }

    pub fn scores(&self) -> (u32, u32) {
        (self.left_score, self.right_score)
    }

    pub fn texts(&self) -> (Option<NodeId>, Option<NodeId>) {
        (self.left_text, self.right_text)
    }

    fn score_text(&self, score: u32) -> TextNode {
        let text = match self.font {
            Some(font) => TextNode::with_font(font),
            None => TextNode::new(),
        };
        text.with_color(Color::WHITE).with_text(score.to_string())
    }

    pub fn increment(
        scene: &mut Scene,
        device: &mut dyn RenderDevice,
        id: NodeId,
        side: Side,
    ) -> EngineResult<()> {
        let Some(board) = scene.behavior_mut::<ScoreBoard>(id) else {
            return Ok(());
        };
        let (score, text) = match side {
            Side::Left => {
                board.left_score += 1;
                (board.left_score, board.left_text)
            }
            Side::Right => {
                board.right_score += 1;
                (board.right_score, board.right_text)
            }
        };
        log::info!("{side:?} scores, now {score}");
        match text {
            Some(text) => TextNode::set_text(scene, device, text, &score.to_string()),
            None => Ok(()),
        }
    }
}

impl Behavior for ScoreBoard {
    fn start(&mut self, ctx: &mut NodeContext<'_, '_>) {
        let half_width = ctx.screen().width as f32 / 2.0;
        let left_x = half_width - SCORE_FONT_SIZE * 1.5;
        let right_x = half_width + SCORE_FONT_SIZE;

        let left = ctx.add_child(self.score_text(self.left_score));
        ctx.scene[left].set_position(left_x, SCORE_FONT_SIZE);
        let right = ctx.add_child(self.score_text(self.right_score));
        ctx.scene[right].set_position(right_x, SCORE_FONT_SIZE);

        self.left_text = Some(left);
        self.right_text = Some(right);
        if self.font.is_none() {
            log::warn!("Scoreboard has no font, scores will not be drawn");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Players {
    pub ball: NodeId,
    pub left_paddle: NodeId,
    pub right_paddle: NodeId,
    pub left_border: NodeId,
    pub right_border: NodeId,
    pub score_board: NodeId,
}

pub struct GameManager {
    font: Option<FontHandle>,
    players: Option<Players>,
}

impl GameManager {
    pub fn new(font: Option<FontHandle>) -> Self {
        Self {
            font,
            players: None,
        }
    }

    pub fn players(&self) -> Option<Players> {
        self.players
    }

    fn check_ball(ctx: &mut NodeContext<'_, '_>, players: Players) {
        let scene = &mut *ctx.scene;
        if !scene.node(players.ball).is_some_and(|n| n.has_started()) {
            return;
        }
        let (Some(ball_rect), Some(left), Some(right), Some(left_border), Some(right_border)) = (
            scene.world_rect(players.ball),
            scene.world_rect(players.left_paddle),
            scene.world_rect(players.right_paddle),
            scene.world_rect(players.left_border),
            scene.world_rect(players.right_border),
        ) else {
            return;
        };
        let Some(next) = scene
            .behavior::<Ball>(players.ball)
            .map(|ball| ball.next_rect(ball_rect))
        else {
            return;
        };

        if intersects(&left, &next) || intersects(&right, &next) {
            if let Some(ball) = scene.behavior_mut::<Ball>(players.ball) {
                ball.change_direction();
            }
        }

        let scorer = if intersects(&left_border, &next) {
            Some(Side::Right)
        } else if intersects(&right_border, &next) {
            Some(Side::Left)
        } else {
            None
        };
        if let Some(side) = scorer {
            let device = &mut *ctx.env.device;
            if let Err(e) = ScoreBoard::increment(scene, device, players.score_board, side) {
                log::error!("Failed to update score: {e}");
            }
            Ball::reset(scene, players.ball);
        }
    }
}

impl Behavior for GameManager {
    fn start(&mut self, ctx: &mut NodeContext<'_, '_>) {
        let screen = *ctx.screen();
        let (width, height) = (screen.width as f32, screen.height as f32);

        let ball = ctx.add_child(Ball::default());
        let left_paddle = ctx.add_child(Paddle::new(Side::Left));
        let right_paddle = ctx.add_child(Paddle::new(Side::Right));

        let border = RectNode::filled(Color::rgba(0, 255, 0, 0));
        let left_border = ctx.add_child(border);
        ctx.scene[left_border].set_rect(Rect::new(0.0, 0.0, BORDER_WIDTH, height));
        let right_border = ctx.add_child(border);
        ctx.scene[right_border].set_rect(Rect::new(width - BORDER_WIDTH, 0.0, BORDER_WIDTH, height));

        let score_board = ctx.add_child(ScoreBoard::new(self.font));

        self.players = Some(Players {
            ball,
            left_paddle,
            right_paddle,
            left_border,
            right_border,
            score_board,
        });
    }

    fn update(&mut self, ctx: &mut NodeContext<'_, '_>, _dt: f64) {
        if !ctx.screen().focused {
            return;
        }
        if ctx.input().is_key_down(Key::Escape) {
            ctx.quit();
        }
        if let Some(players) = self.players {
            Self::check_ball(ctx, players);
        }
    }

    fn late_render(&mut self, ctx: &mut NodeContext<'_, '_>) {
        let x = ctx.screen().width as f32 / 2.0 - DASH_WIDTH / 2.0;
        let mut row = 0.0;
        while row < DASH_ROWS {
            let dash = Rect::new(x, row * DASH_HEIGHT, DASH_WIDTH, DASH_HEIGHT);
            ctx.device().draw_rect(dash, Color::WHITE, true);
            row += 1.5;
        }
    }
}
