//! Maze-colour reconciliation.
//!
//! After every pose change the display is brought back in line with the
//! explorer's classification grid for all cells outside the robot footprint:
//!
//! | Classification | Inside a landmark zone | Paint |
//! |---|---|---|
//! | `Empty` | yes | [`Paint::Landmark`] |
//! | `Empty` | no | [`Paint::Explored`] |
//! | `Obstacle` | – | [`Paint::Obstacle`] |
//! | `Unknown` | – | unchanged |
//!
//! Footprint cells keep the pose machine's highlighting.  Running the pass
//! twice with the same inputs changes nothing the second time.

use mazesim_perception::display::{DisplayGrid, Paint};
use mazesim_perception::maze_ref::ClassGrid;
use mazesim_types::{Cell, Classification, Landmarks};

/// Repaint every non-footprint cell of `grid` from `maze`.
///
/// `robot` is the footprint centre.  Returns the number of cells whose paint
/// changed.
pub fn reconcile(
    grid: &mut DisplayGrid,
    maze: &ClassGrid,
    robot: Cell,
    landmarks: &Landmarks,
) -> usize {
    let dims = grid.dims();
    let mut changed = 0;
    for row in 0..dims.length as i32 {
        for col in 0..dims.width as i32 {
            let cell = Cell::new(col, row);
            if robot.neighbourhood_contains(cell) {
                continue;
            }
            let target = match maze.get(cell) {
                Some(Classification::Empty) if landmarks.zone_contains(cell) => Paint::Landmark,
                Some(Classification::Empty) => Paint::Explored,
                Some(Classification::Obstacle) => Paint::Obstacle,
                Some(Classification::Unknown) | None => continue,
            };
            if grid.get(cell) != Some(target) && grid.paint(cell, target).is_ok() {
                changed += 1;
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazesim_perception::MazeRef;
    use mazesim_types::ArenaDims;

    fn setup() -> (DisplayGrid, MazeRef, Landmarks) {
        let dims = ArenaDims::default();
        (
            DisplayGrid::new(dims),
            MazeRef::new(dims),
            Landmarks::for_arena(dims),
        )
    }

    #[test]
    fn empty_cells_become_explored_or_landmark() {
        let (mut grid, maze, lm) = setup();
        maze.classify(Cell::new(5, 5), Classification::Empty).unwrap();
        maze.classify(Cell::new(1, 2), Classification::Empty).unwrap();
        let n = reconcile(&mut grid, &maze.snapshot(), Cell::new(10, 10), &lm);
        assert_eq!(n, 2);
        assert_eq!(grid.get(Cell::new(5, 5)), Some(Paint::Explored));
        assert_eq!(grid.get(Cell::new(1, 2)), Some(Paint::Landmark));
    }

    #[test]
    fn obstacles_are_painted_and_unknown_left_alone() {
        let (mut grid, maze, lm) = setup();
        grid.paint(Cell::new(4, 4), Paint::Footprint).unwrap();
        maze.classify(Cell::new(6, 6), Classification::Obstacle).unwrap();
        reconcile(&mut grid, &maze.snapshot(), Cell::new(10, 10), &lm);
        assert_eq!(grid.get(Cell::new(6, 6)), Some(Paint::Obstacle));
        // Left-behind footprint with no classification keeps its paint.
        assert_eq!(grid.get(Cell::new(4, 4)), Some(Paint::Footprint));
        assert_eq!(grid.get(Cell::new(0, 10)), Some(Paint::Unvisited));
    }

    #[test]
    fn footprint_cells_are_not_repainted() {
        let (mut grid, maze, lm) = setup();
        let robot = Cell::new(7, 9);
        grid.paint(Cell::new(7, 10), Paint::Lead).unwrap();
        maze.classify(Cell::new(7, 10), Classification::Empty).unwrap();
        maze.classify(Cell::new(7, 11), Classification::Empty).unwrap();
        reconcile(&mut grid, &maze.snapshot(), robot, &lm);
        assert_eq!(grid.get(Cell::new(7, 10)), Some(Paint::Lead));
        assert_eq!(grid.get(Cell::new(7, 11)), Some(Paint::Explored));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let (mut grid, maze, lm) = setup();
        for col in 0..15 {
            maze.classify(Cell::new(col, 0), Classification::Empty).unwrap();
            maze.classify(Cell::new(col, 5), Classification::Obstacle).unwrap();
        }
        let snapshot = maze.snapshot();
        assert!(reconcile(&mut grid, &snapshot, Cell::new(7, 12), &lm) > 0);
        let once = grid.clone();
        assert_eq!(reconcile(&mut grid, &snapshot, Cell::new(7, 12), &lm), 0);
        assert_eq!(grid, once);
    }
}
