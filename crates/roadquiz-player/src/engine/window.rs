//! Interactive viewer: minifb window with a top-down map of the scene.
//!
//! Lanes, props, vehicles and blink lamps are drawn from above; the quiz
//! page is a strip along the bottom (question bar, three option cards that
//! shrink as they flip away, explanation bar, score pips). The current
//! question text goes to the window title.
//!
//! Keys: Space starts, 1/2/3 answer, N advances, Esc quits.

use anyhow::Result;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use roadquiz_common::Vec3;

use crate::engine::clock::SystemClock;
use crate::engine::{FrameView, RenderLoop, Renderer};
use crate::game::script::OptionId;
use crate::game::ui::{Element, Symbol};
use crate::game::SceneOrchestrator;

const FPS: usize = 60;
/// Height of the quiz strip at the bottom of the window
const PAGE_HEIGHT: usize = 120;
const MAP_MARGIN: f32 = 20.0;
const LANE_COLOR: u32 = 0x5a5a5a;
const PROP_COLOR: u32 = 0x2e6b30;
const CAMERA_COLOR: u32 = 0xffffff;
const PAGE_COLOR: u32 = 0x202020;
const CORRECT_COLOR: u32 = 0x2dc653;
const INCORRECT_COLOR: u32 = 0xe63946;

/// User intent read from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Start,
    Answer(OptionId),
    Advance,
    Quit,
}

pub struct WindowRenderer {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    frames: u64,
}

impl WindowRenderer {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let options = WindowOptions {
            resize: true,
            ..Default::default()
        };
        let mut window = Window::new("RoadQuiz", width, height, options)
            .map_err(|e| anyhow::anyhow!("Window creation failed: {}", e))?;
        window.set_target_fps(FPS);
        Ok(Self {
            window,
            buffer: vec![0; width * height],
            width,
            height,
            frames: 0,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Current client size of the window
    pub fn window_size(&self) -> (usize, usize) {
        self.window.get_size()
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn poll_input(&self) -> Vec<InputEvent> {
        self.window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .filter_map(|key| match key {
                Key::Space => Some(InputEvent::Start),
                Key::Key1 | Key::NumPad1 => OptionId::new(1).map(InputEvent::Answer),
                Key::Key2 | Key::NumPad2 => OptionId::new(2).map(InputEvent::Answer),
                Key::Key3 | Key::NumPad3 => OptionId::new(3).map(InputEvent::Answer),
                Key::N | Key::Enter => Some(InputEvent::Advance),
                Key::Escape => Some(InputEvent::Quit),
                _ => None,
            })
            .collect()
    }

    fn draw_map(&mut self, frame: &FrameView<'_>) {
        let map_h = self.height.saturating_sub(PAGE_HEIGHT);
        let Some(map) = MapTransform::fit(frame, self.width, map_h) else {
            return;
        };

        for (_, _, path) in frame.catalog.iter() {
            for pair in path.points().windows(2) {
                let (x0, y0) = map.project(pair[0]);
                let (x1, y1) = map.project(pair[1]);
                self.line(x0, y0, x1, y1, LANE_COLOR);
            }
        }

        for prop in &frame.props {
            let (x, y) = map.project(prop.position);
            let half = if prop.scale >= 1.0 { 3 } else { 2 };
            self.rect(x - half, y - half, 2 * half, 2 * half, PROP_COLOR);
            let (hx, hy) = map.project(prop.position + prop.heading * 3.0);
            self.line(x, y, hx, hy, PROP_COLOR);
        }

        for v in &frame.vehicles {
            let (x, y) = map.project(v.position);
            let color = v.group.marker_color();
            let half = if v.scale < 0.5 { 2 } else { 3 };
            self.rect(x - half, y - half, 2 * half + 1, 2 * half + 1, color);
            // Heading tick, longer while moving
            let nose = v.position + Vec3::new(0.0, 0.0, 4.0 + v.speed).rotated_y(v.yaw);
            let (nx, ny) = map.project(nose);
            self.line(x, y, nx, ny, if v.driving { CAMERA_COLOR } else { color });
            if let Some(lamps) = v.lamps {
                for lamp in lamps {
                    let (lx, ly) = map.project(lamp);
                    self.rect(lx - 1, ly - 1, 3, 3, frame.blink_color);
                }
            }
        }

        let (cx, cy) = map.project(frame.camera.position);
        let (tx, ty) = map.project(frame.camera.ground_target());
        self.line(cx - 4, cy, cx + 4, cy, CAMERA_COLOR);
        self.line(cx, cy - 4, cx, cy + 4, CAMERA_COLOR);
        self.line(cx, cy, tx, ty, CAMERA_COLOR);
    }

    fn draw_page(&mut self, frame: &FrameView<'_>) {
        let ui = frame.ui;
        let top = self.height.saturating_sub(PAGE_HEIGHT) as i32;
        let w = self.width as i32;
        self.rect(0, top, w, PAGE_HEIGHT as i32, PAGE_COLOR);

        if ui.loading_visible {
            let filled = (w as f32 * ui.loading_progress / 100.0) as i32;
            self.rect(0, top, filled, 4, CORRECT_COLOR);
        }

        let question_w = (w as f32 * 0.8 * ui.opacity(Element::Question)) as i32;
        self.rect(w / 10, top + 10, question_w, 12, 0xdddddd);

        let card_w = w / 4;
        for (i, opt) in OptionId::ALL.into_iter().enumerate() {
            let view = ui.option(opt);
            let x = w / 16 + i as i32 * (card_w + w / 16);
            // Cards shrink vertically as they flip away (rotateX 90 = edge-on)
            let full = 40.0;
            let h = (full * view.rotate_x.to_radians().cos().abs()) as i32;
            let y = top + 34 + (full as i32 - h) / 2;
            self.rect(x, y, card_w, h.max(1), view.colors.background);
            self.rect(x + 4, y + h / 2, card_w / 3, 2.min(h), view.colors.foreground);
            let symbol = if view.symbol_image == Symbol::Correct.image_url() {
                Some(CORRECT_COLOR)
            } else if view.symbol_image == Symbol::Incorrect.image_url() {
                Some(INCORRECT_COLOR)
            } else {
                None
            };
            if let Some(c) = symbol {
                self.rect(x + card_w - 12, top + 48, 8, 8, c);
            }
        }

        let expl = ui.opacity(Element::Explanation);
        if expl > 0.0 {
            let y = top + 84 + ui.offset_y(Element::Explanation) as i32;
            let c = if ui.advance_enabled { 0x8ecae6 } else { 0x555555 };
            self.rect(w / 10, y, (w as f32 * 0.8 * expl) as i32, 10, c);
        }

        for n in 0..ui.score as i32 {
            self.rect(w - 16 - n * 12, top + 104, 8, 8, CORRECT_COLOR);
        }

        let start = ui.opacity(Element::StartButton);
        if start > 0.0 {
            let y = top - 40 + ui.offset_y(Element::StartButton) as i32;
            self.rect(w / 2 - 40, y, (80.0 * start) as i32, 20, 0xffb703);
        }
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        let (bw, bh) = (self.width as i32, self.height as i32);
        for py in y.max(0)..(y + h).min(bh) {
            for px in x.max(0)..(x + w).min(bw) {
                self.buffer[(py * bw + px) as usize] = color;
            }
        }
    }

    /// Bresenham line, clipped per pixel
    fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.rect(x, y, 1, 1, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

impl Renderer for WindowRenderer {
    fn render(&mut self, frame: &FrameView<'_>) {
        self.buffer.fill(frame.clear_color);
        self.draw_map(frame);
        self.draw_page(frame);

        self.frames += 1;
        if self.frames % 10 == 0 {
            let title = format!("RoadQuiz | {} | score {}", frame.ui.question, frame.ui.score);
            self.window.set_title(&title);
        }
        if let Err(e) = self.window.update_with_buffer(&self.buffer, self.width, self.height) {
            tracing::warn!("Display error: {}", e);
        }
    }

    fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.buffer.resize(width * height, 0);
    }
}

/// World xz -> map pixels, fitted to the lane bounds
struct MapTransform {
    min_x: f32,
    min_z: f32,
    scale: f32,
    offset_x: f32,
    offset_y: f32,
}

impl MapTransform {
    fn fit(frame: &FrameView<'_>, width: usize, height: usize) -> Option<Self> {
        let (min_x, min_z, max_x, max_z) = frame.catalog.bounds_xz()?;
        let span_x = (max_x - min_x).max(1.0);
        let span_z = (max_z - min_z).max(1.0);
        let avail_w = (width as f32 - 2.0 * MAP_MARGIN).max(1.0);
        let avail_h = (height as f32 - 2.0 * MAP_MARGIN).max(1.0);
        let scale = (avail_w / span_x).min(avail_h / span_z);
        Some(Self {
            min_x,
            min_z,
            scale,
            offset_x: MAP_MARGIN + (avail_w - span_x * scale) / 2.0,
            offset_y: MAP_MARGIN + (avail_h - span_z * scale) / 2.0,
        })
    }

    /// -z points up the screen
    fn project(&self, p: Vec3) -> (i32, i32) {
        let x = self.offset_x + (p.x - self.min_x) * self.scale;
        let y = self.offset_y + (p.z - self.min_z) * self.scale;
        (x as i32, y as i32)
    }
}

/// Run the interactive viewer until the window closes
pub fn run(mut orchestrator: SceneOrchestrator, width: usize, height: usize) -> Result<()> {
    let mut renderer = WindowRenderer::new(width, height)?;
    let mut frame_loop = RenderLoop::new(SystemClock::new());

    tracing::info!("Controls: Space=start | 1/2/3=answer | N=next | Esc=quit");

    while renderer.is_open() {
        let (w, h) = renderer.window_size();
        if w > 0 && h > 0 && (w, h) != renderer.size() {
            frame_loop.resize(&mut orchestrator, &mut renderer, w, h);
        }

        for event in renderer.poll_input() {
            match event {
                InputEvent::Start => {
                    orchestrator.start();
                }
                InputEvent::Answer(opt) => {
                    orchestrator.submit_answer(opt);
                }
                InputEvent::Advance => {
                    orchestrator.advance_question();
                }
                InputEvent::Quit => {
                    tracing::info!("Viewer closed (Esc), score {}", orchestrator.state().score);
                    return Ok(());
                }
            }
        }

        frame_loop.tick(&mut orchestrator, &mut renderer);
    }

    tracing::info!("Viewer closed, score {}", orchestrator.state().score);
    Ok(())
}
