use glam::Vec2;

/// Axis-aligned screen rectangle in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x as f32
            && p.x < self.right() as f32
            && p.y >= self.y as f32
            && p.y < self.bottom() as f32
    }

    /// Squared distance from `p` to the closest point of the rect.
    pub fn distance_sq_to(&self, p: Vec2) -> f32 {
        let cx = p.x.clamp(self.x as f32, self.right() as f32);
        let cy = p.y.clamp(self.y as f32, self.bottom() as f32);
        Vec2::new(cx, cy).distance_squared(p)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

/// The usable area of every monitor. Pets live on the monitor under their
/// centre and treat its edges as walls and floor.
#[derive(Debug, Clone)]
pub struct ScreenGeometry {
    pub monitors: Vec<Rect>,
    pub primary: usize,
}

impl ScreenGeometry {
    /// Geometry for a single screen.
    pub fn single(rect: Rect) -> Self {
        Self {
            monitors: vec![rect],
            primary: 0,
        }
    }

    pub fn new(monitors: Vec<Rect>, primary: usize) -> Self {
        if monitors.is_empty() {
            log::warn!("No monitors reported, assuming 1920x1080");
            return Self::single(Rect::new(0, 0, 1920, 1080));
        }
        let primary = primary.min(monitors.len() - 1);
        Self { monitors, primary }
    }

    pub fn primary(&self) -> Rect {
        self.monitors[self.primary]
    }

    /// Monitor containing `p`, or the nearest one.
    pub fn monitor_at(&self, p: Vec2) -> Rect {
        if let Some(r) = self.monitors.iter().find(|r| r.contains(p)) {
            return *r;
        }
        self.monitors
            .iter()
            .min_by(|a, b| a.distance_sq_to(p).total_cmp(&b.distance_sq_to(p)))
            .copied()
            .unwrap_or_else(|| self.primary())
    }

    /// Bounding box of all monitors.
    pub fn virtual_bounds(&self) -> Rect {
        self.monitors
            .iter()
            .skip(1)
            .fold(self.monitors[0], |acc, r| acc.union(r))
    }
}
