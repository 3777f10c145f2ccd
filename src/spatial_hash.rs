use macroquad::prelude::*;

use crate::entity::Entity;
use crate::world::Bounds;

/// Uniform grid over the bounds. Stores indices into the population slice.
pub struct SpatialHash {
    inv_cell_size: f32,
    pub cols: usize,
    pub rows: usize,
    cells: Vec<Vec<u32>>,
}

impl SpatialHash {
    pub fn new(bounds: &Bounds, cell_size: f32) -> Self {
        let cols = ((bounds.width / cell_size).ceil() as usize).max(1);
        let rows = ((bounds.height / cell_size).ceil() as usize).max(1);
        let cells = (0..cols * rows).map(|_| Vec::with_capacity(8)).collect();
        Self {
            inv_cell_size: 1.0 / cell_size,
            cols,
            rows,
            cells,
        }
    }

    fn cell_of(&self, pos: Vec2) -> (usize, usize) {
        let cx = ((pos.x.max(0.0) * self.inv_cell_size) as usize).min(self.cols - 1);
        let cy = ((pos.y.max(0.0) * self.inv_cell_size) as usize).min(self.rows - 1);
        (cx, cy)
    }

    /// Clear all cells and re-insert all alive entities.
    pub fn rebuild(&mut self, entities: &[Entity]) {
        for cell in &mut self.cells {
            cell.clear();
        }
        for (idx, e) in entities.iter().enumerate() {
            if !e.alive {
                continue;
            }
            let (cx, cy) = self.cell_of(e.pos);
            self.cells[cy * self.cols + cx].push(idx as u32);
        }
    }

    /// Query all entity indices within `radius` of `pos`, in ascending index order.
    pub fn query_radius(&self, pos: Vec2, radius: f32, entities: &[Entity]) -> Vec<u32> {
        let mut result = Vec::new();
        let radius_sq = radius * radius;
        let reach = (radius * self.inv_cell_size).ceil() as i32;
        let (cx, cy) = self.cell_of(pos);

        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let gx = cx as i32 + dx;
                let gy = cy as i32 + dy;
                if gx < 0 || gx >= self.cols as i32 || gy < 0 || gy >= self.rows as i32 {
                    continue;
                }
                for &idx in &self.cells[gy as usize * self.cols + gx as usize] {
                    if let Some(e) = entities.get(idx as usize) {
                        if e.alive && (e.pos - pos).length_squared() <= radius_sq {
                            result.push(idx);
                        }
                    }
                }
            }
        }

        // Cell walk order is spatial; callers rely on index order for determinism.
        result.sort_unstable();
        result
    }

    pub fn query_radius_excluding(
        &self,
        pos: Vec2,
        radius: f32,
        exclude_idx: u32,
        entities: &[Entity],
    ) -> Vec<u32> {
        let mut result = self.query_radius(pos, radius, entities);
        result.retain(|&idx| idx != exclude_idx);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_entity;

    #[test]
    fn dead_entities_are_not_returned_from_queries() {
        let bounds = Bounds::new(200.0, 200.0);
        let alive = test_entity(vec2(50.0, 50.0), 0);
        let mut dead = test_entity(vec2(55.0, 50.0), 0);
        dead.alive = false;
        let entities = vec![alive, dead];

        let mut spatial = SpatialHash::new(&bounds, 32.0);
        spatial.rebuild(&entities);

        let neighbors = spatial.query_radius(vec2(50.0, 50.0), 20.0, &entities);
        assert_eq!(neighbors, vec![0]);
    }

    #[test]
    fn query_matches_brute_force_and_is_sorted() {
        let bounds = Bounds::new(300.0, 300.0);
        let entities: Vec<_> = (0..40)
            .map(|i| {
                let x = (i * 37 % 300) as f32;
                let y = (i * 91 % 300) as f32;
                test_entity(vec2(x, y), 0)
            })
            .collect();
        let mut spatial = SpatialHash::new(&bounds, 50.0);
        spatial.rebuild(&entities);

        let center = vec2(150.0, 150.0);
        let found = spatial.query_radius(center, 90.0, &entities);
        let expected: Vec<u32> = entities
            .iter()
            .enumerate()
            .filter(|(_, e)| (e.pos - center).length_squared() <= 90.0 * 90.0)
            .map(|(i, _)| i as u32)
            .collect();
        assert_eq!(found, expected);
        assert_eq!(
            spatial.query_radius_excluding(center, 90.0, expected[0], &entities).len(),
            expected.len() - 1
        );
    }

    #[test]
    fn positions_on_far_edge_land_in_last_cell() {
        let bounds = Bounds::new(100.0, 100.0);
        let entities = vec![test_entity(vec2(100.0, 100.0), 0)];
        let mut spatial = SpatialHash::new(&bounds, 32.0);
        spatial.rebuild(&entities);
        assert_eq!(spatial.query_radius(vec2(99.0, 99.0), 5.0, &entities), vec![0]);
    }
}
