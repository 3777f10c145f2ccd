use macroquad::prelude::*;

use crate::snapshot::{EntityView, Snapshot};
use crate::world::Bounds;

pub trait Surface {
    /// Drawable area in pixels.
    fn size(&self) -> Vec2;
    fn clear(&mut self, color: Color);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn stroke_circle(&mut self, center: Vec2, radius: f32, thickness: f32, color: Color);
    fn line(&mut self, from: Vec2, to: Vec2, thickness: f32, color: Color);
    fn triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Color);
}

/// Direct drawing to the macroquad screen.
pub struct MacroquadSurface;

impl Surface for MacroquadSurface {
    fn size(&self) -> Vec2 {
        vec2(screen_width(), screen_height())
    }

    fn clear(&mut self, color: Color) {
        clear_background(color);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        draw_circle(center.x, center.y, radius, color);
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, thickness: f32, color: Color) {
        draw_circle_lines(center.x, center.y, radius, thickness, color);
    }

    fn line(&mut self, from: Vec2, to: Vec2, thickness: f32, color: Color) {
        draw_line(from.x, from.y, to.x, to.y, thickness, color);
    }

    fn triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Color) {
        draw_triangle(a, b, c, color);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Glyph {
    Circle,
    /// Arrowhead pointing along the velocity.
    Dart,
    Diamond,
    Ring,
}

/// Visual theme for one preset.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub border: Color,
    pub link: Color,
    pub mutant: Color,
    /// Indexed by `CategoryId`; wraps around when shorter than the category set.
    pub categories: Vec<Color>,
    pub glyph: Glyph,
    pub base_radius: f32,
    /// Extra radius at full energy.
    pub energy_radius: f32,
    pub glow: bool,
    pub energy_bars: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::new(0.02, 0.03, 0.08, 1.0),
            border: Color::new(0.15, 0.18, 0.25, 1.0),
            link: Color::new(0.6, 0.8, 1.0, 0.5),
            mutant: Color::new(1.0, 0.95, 0.3, 0.9),
            categories: vec![
                Color::new(0.35, 0.75, 1.0, 1.0),
                Color::new(1.0, 0.45, 0.35, 1.0),
                Color::new(0.45, 0.95, 0.5, 1.0),
                Color::new(0.85, 0.55, 1.0, 1.0),
            ],
            glyph: Glyph::Circle,
            base_radius: 3.0,
            energy_radius: 4.0,
            glow: false,
            energy_bars: false,
        }
    }
}

impl Palette {
    pub fn category_color(&self, index: usize) -> Color {
        if self.categories.is_empty() {
            return WHITE;
        }
        self.categories[index % self.categories.len()]
    }
}

/// Uniform world-to-screen mapping that letterboxes the bounds into the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub offset: Vec2,
}

impl Viewport {
    pub fn fit(bounds: &Bounds, surface: Vec2) -> Self {
        let sx = surface.x / bounds.width;
        let sy = surface.y / bounds.height;
        let scale = sx.min(sy);
        if !scale.is_finite() || scale <= 0.0 {
            return Self {
                scale: 1.0,
                offset: Vec2::ZERO,
            };
        }
        let used = vec2(bounds.width, bounds.height) * scale;
        Self {
            scale,
            offset: (surface - used) * 0.5,
        }
    }

    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        world * self.scale + self.offset
    }

    pub fn to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.offset) / self.scale
    }
}

pub fn render(surface: &mut impl Surface, snapshot: &Snapshot, palette: &Palette) {
    surface.clear(palette.background);
    let view = Viewport::fit(&snapshot.bounds, surface.size());

    draw_border(surface, &view, &snapshot.bounds, palette.border);

    for link in &snapshot.connections {
        let (Some(a), Some(b)) = (snapshot.entity(link.a), snapshot.entity(link.b)) else {
            continue;
        };
        let color = with_alpha(palette.link, palette.link.a * link.affinity.clamp(0.0, 1.0));
        surface.line(
            view.to_screen(a.position.into()),
            view.to_screen(b.position.into()),
            1.0,
            color,
        );
    }

    for entity in &snapshot.entities {
        draw_entity(surface, &view, entity, snapshot.max_energy, palette);
    }
}

fn draw_border(surface: &mut impl Surface, view: &Viewport, bounds: &Bounds, color: Color) {
    let corners = [
        vec2(0.0, 0.0),
        vec2(bounds.width, 0.0),
        vec2(bounds.width, bounds.height),
        vec2(0.0, bounds.height),
    ];
    for (from, to) in corners.iter().zip(corners.iter().cycle().skip(1)) {
        surface.line(view.to_screen(*from), view.to_screen(*to), 2.0, color);
    }
}

fn draw_entity(
    surface: &mut impl Surface,
    view: &Viewport,
    entity: &EntityView,
    max_energy: f32,
    palette: &Palette,
) {
    let pos = view.to_screen(entity.position.into());
    let energy_frac = if max_energy > 0.0 {
        (entity.energy / max_energy).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let radius = (palette.base_radius + palette.energy_radius * energy_frac) * view.scale;

    // Later generations drift toward white.
    let base = palette.category_color(entity.category.index());
    let lift = (entity.generation.saturating_sub(1).min(10)) as f32 * 0.04;
    let color = Color::new(
        base.r + (1.0 - base.r) * lift,
        base.g + (1.0 - base.g) * lift,
        base.b + (1.0 - base.b) * lift,
        base.a * (0.35 + 0.65 * energy_frac),
    );

    if palette.glow {
        surface.fill_circle(pos, radius * 2.2, with_alpha(color, 0.12));
    }

    match palette.glyph {
        Glyph::Circle => surface.fill_circle(pos, radius, color),
        Glyph::Ring => surface.stroke_circle(pos, radius, (radius * 0.35).max(1.0), color),
        Glyph::Dart => {
            let velocity: Vec2 = entity.velocity.into();
            let dir = velocity.try_normalize().unwrap_or(Vec2::X);
            let perp = vec2(-dir.y, dir.x);
            let front = pos + dir * radius * 1.6;
            let back_left = pos - dir * radius * 0.8 + perp * radius * 0.9;
            let back_right = pos - dir * radius * 0.8 - perp * radius * 0.9;
            surface.triangle(front, back_left, back_right, color);
        }
        Glyph::Diamond => {
            let top = pos - vec2(0.0, radius * 1.3);
            let bottom = pos + vec2(0.0, radius * 1.3);
            let left = pos - vec2(radius, 0.0);
            let right = pos + vec2(radius, 0.0);
            surface.triangle(top, left, right, color);
            surface.triangle(bottom, left, right, color);
        }
    }

    if entity.mutant {
        surface.stroke_circle(pos, radius + 2.0, 1.0, palette.mutant);
    }

    if palette.energy_bars {
        let bar_width = radius * 2.0;
        let bar_y = pos.y - radius * 2.0;
        let bar_color = if energy_frac > 0.5 {
            Color::new(0.2, 0.9, 0.2, 0.7)
        } else if energy_frac > 0.25 {
            Color::new(0.9, 0.9, 0.2, 0.7)
        } else {
            Color::new(0.9, 0.2, 0.2, 0.7)
        };
        let left = vec2(pos.x - bar_width * 0.5, bar_y);
        surface.line(
            left,
            left + vec2(bar_width, 0.0),
            2.0,
            Color::new(0.15, 0.15, 0.15, 0.5),
        );
        surface.line(left, left + vec2(bar_width * energy_frac, 0.0), 2.0, bar_color);
    }
}

fn with_alpha(color: Color, alpha: f32) -> Color {
    Color::new(color.r, color.g, color.b, alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{test_entity, Population};
    use crate::forces::Connection;
    use crate::snapshot::Diagnostics;

    #[derive(Debug, PartialEq)]
    enum Op {
        Clear,
        Fill(Vec2, f32),
        Stroke(Vec2),
        Line(Vec2, Vec2),
        Triangle,
    }

    struct Recorder {
        size: Vec2,
        ops: Vec<Op>,
    }

    impl Recorder {
        fn new(w: f32, h: f32) -> Self {
            Self {
                size: vec2(w, h),
                ops: Vec::new(),
            }
        }

        fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
            self.ops.iter().filter(|op| pred(op)).count()
        }
    }

    impl Surface for Recorder {
        fn size(&self) -> Vec2 {
            self.size
        }
        fn clear(&mut self, _: Color) {
            self.ops.push(Op::Clear);
        }
        fn fill_circle(&mut self, center: Vec2, radius: f32, _: Color) {
            self.ops.push(Op::Fill(center, radius));
        }
        fn stroke_circle(&mut self, center: Vec2, _: f32, _: f32, _: Color) {
            self.ops.push(Op::Stroke(center));
        }
        fn line(&mut self, from: Vec2, to: Vec2, _: f32, _: Color) {
            self.ops.push(Op::Line(from, to));
        }
        fn triangle(&mut self, _: Vec2, _: Vec2, _: Vec2, _: Color) {
            self.ops.push(Op::Triangle);
        }
    }

    fn snapshot_of(pop: &Population, links: &[Connection]) -> Snapshot {
        Snapshot::capture(
            pop,
            links,
            Bounds::new(100.0, 50.0),
            100.0,
            1,
            0.016,
            0,
            Diagnostics::default(),
            Diagnostics::default(),
        )
    }

    #[test]
    fn empty_population_draws_background_and_border_only() {
        let snap = snapshot_of(&Population::new(4), &[]);
        let mut surface = Recorder::new(200.0, 100.0);
        render(&mut surface, &snap, &Palette::default());

        assert_eq!(surface.ops[0], Op::Clear);
        assert_eq!(surface.ops.len(), 5);
        assert_eq!(surface.count(|op| matches!(op, Op::Line(..))), 4);
    }

    #[test]
    fn entities_and_links_are_drawn_in_screen_space() {
        let mut pop = Population::new(4);
        let a = pop.spawn(test_entity(vec2(10.0, 10.0), 0)).unwrap();
        let b = pop.spawn(test_entity(vec2(20.0, 10.0), 1)).unwrap();
        let mut mutant = test_entity(vec2(30.0, 30.0), 5);
        mutant.mutant = true;
        pop.spawn(mutant).unwrap();
        let links = [Connection {
            a,
            b,
            affinity: 0.8,
        }];
        let snap = snapshot_of(&pop, &links);

        let mut surface = Recorder::new(200.0, 100.0);
        render(&mut surface, &snap, &Palette::default());

        assert_eq!(surface.count(|op| matches!(op, Op::Fill(..))), 3);
        assert_eq!(surface.count(|op| matches!(op, Op::Stroke(..))), 1);
        // Four border edges plus one link, scaled by 2.
        assert!(surface
            .ops
            .contains(&Op::Line(vec2(20.0, 20.0), vec2(40.0, 20.0))));
    }

    #[test]
    fn glyph_variants_use_triangles() {
        let mut pop = Population::new(2);
        pop.spawn(test_entity(vec2(10.0, 10.0), 0)).unwrap();
        let snap = snapshot_of(&pop, &[]);

        for (glyph, triangles) in [(Glyph::Dart, 1), (Glyph::Diamond, 2)] {
            let palette = Palette {
                glyph,
                ..Palette::default()
            };
            let mut surface = Recorder::new(100.0, 50.0);
            render(&mut surface, &snap, &palette);
            assert_eq!(surface.count(|op| *op == Op::Triangle), triangles);
        }
    }

    #[test]
    fn viewport_letterboxes_and_inverts() {
        let view = Viewport::fit(&Bounds::new(100.0, 50.0), vec2(400.0, 400.0));
        assert_eq!(view.scale, 4.0);
        assert_eq!(view.offset, vec2(0.0, 100.0));
        let p = vec2(25.0, 10.0);
        assert!((view.to_world(view.to_screen(p)) - p).length() < 1e-4);
    }

    #[test]
    fn palette_wraps_and_falls_back() {
        let palette = Palette::default();
        assert_eq!(palette.category_color(0), palette.category_color(4));
        let empty = Palette {
            categories: Vec::new(),
            ..Palette::default()
        };
        assert_eq!(empty.category_color(3), WHITE);
    }
}
