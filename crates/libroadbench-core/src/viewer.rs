//! World viewers

use std::io::Write;

use crate::params::ParameterServer;
use crate::world::{Bounds, World};
use crate::Result;

/// Something that can display a world
pub trait Viewer {
    fn draw_world(&mut self, world: &World) -> Result<()>;
}

/// Viewer that discards every frame
#[derive(Debug, Default, Clone, Copy)]
pub struct NullViewer;

impl Viewer for NullViewer {
    fn draw_world(&mut self, _world: &World) -> Result<()> {
        Ok(())
    }
}

/// Rasterizes the world onto a character grid
///
/// Legend: `E` ego, `#` other agents, `.` goal region, `|` map edge in x.
pub struct AsciiViewer<W: Write> {
    out: W,
    view: Bounds,
    use_world_bounds: bool,
    columns: usize,
    rows: usize,
}

impl<W: Write> AsciiViewer<W> {
    pub fn new(
        out: W,
        params: &mut ParameterServer,
        x_range: (f64, f64),
        y_range: (f64, f64),
        use_world_bounds: bool,
    ) -> Result<Self> {
        let mut scope = params.scope("viewer");
        let columns: usize = scope.get_or("columns", "Width of the character grid", 80)?;
        let rows: usize = scope.get_or("rows", "Height of the character grid", 16)?;

        Ok(Self {
            out,
            view: Bounds::from_ranges(x_range, y_range),
            use_world_bounds,
            columns: columns.max(2),
            rows: rows.max(2),
        })
    }

    /// Region drawn for `world`
    pub fn view_for(&self, world: &World) -> Bounds {
        if self.use_world_bounds {
            *world.bounds()
        } else {
            self.view
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render the grid lines for `world` without writing them
    pub fn render(&self, world: &World) -> Vec<String> {
        let view = self.view_for(world);
        let mut grid = vec![vec![' '; self.columns]; self.rows];

        if let Some(goal) = world.goal() {
            for (row, line) in grid.iter_mut().enumerate() {
                for (col, cell) in line.iter_mut().enumerate() {
                    let (x, y) = self.cell_center(&view, col, row);
                    if goal.contains_point(x, y) {
                        *cell = '.';
                    }
                }
            }
        }

        for agent in world.agents() {
            let symbol = if Some(agent.id) == world.ego_id() { 'E' } else { '#' };
            if let Some((col, row)) = self.cell_of(&view, agent.state.x, agent.state.y) {
                grid[row][col] = symbol;
            }
        }

        grid.into_iter()
            .map(|line| format!("|{}|", line.into_iter().collect::<String>()))
            .collect()
    }

    fn cell_center(&self, view: &Bounds, col: usize, row: usize) -> (f64, f64) {
        let x = view.x_min + (col as f64 + 0.5) * view.width() / self.columns as f64;
        // Row 0 is the top of the view
        let y = view.y_max - (row as f64 + 0.5) * view.height() / self.rows as f64;
        (x, y)
    }

    fn cell_of(&self, view: &Bounds, x: f64, y: f64) -> Option<(usize, usize)> {
        if !view.contains_point(x, y) || view.width() <= 0.0 || view.height() <= 0.0 {
            return None;
        }
        let col = ((x - view.x_min) / view.width() * self.columns as f64) as usize;
        let row = ((view.y_max - y) / view.height() * self.rows as f64) as usize;
        Some((col.min(self.columns - 1), row.min(self.rows - 1)))
    }
}

impl<W: Write> Viewer for AsciiViewer<W> {
    fn draw_world(&mut self, world: &World) -> Result<()> {
        let lines = self.render(world);
        writeln!(self.out, "t = {:.2}s, agents = {}", world.time(), world.agent_count())?;
        for line in lines {
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Agent, AgentState, BehaviorModel};

    fn world() -> World {
        let mut world = World::new(Bounds::new(0.0, 100.0, 0.0, 10.0))
            .with_ego(1)
            .with_goal(Bounds::new(90.0, 100.0, 0.0, 10.0));
        world.add_agent(Agent::new(1, AgentState::new(5.0, 5.0, 0.0, 1.0), BehaviorModel::ConstantVelocity));
        world.add_agent(Agent::new(2, AgentState::new(50.0, 5.0, 0.0, 1.0), BehaviorModel::ConstantVelocity));
        world
    }

    #[test]
    fn test_render_marks_agents_and_goal() {
        let mut params = ParameterServer::new();
        let viewer = AsciiViewer::new(Vec::new(), &mut params, (0.0, 1.0), (0.0, 1.0), true).unwrap();
        let lines = viewer.render(&world());

        assert_eq!(lines.len(), 16);
        let joined = lines.join("\n");
        assert_eq!(joined.matches('E').count(), 1);
        assert_eq!(joined.matches('#').count(), 1);
        assert!(joined.contains('.'));
    }

    #[test]
    fn test_fixed_view_clips_agents() {
        let mut params = ParameterServer::new();
        let viewer = AsciiViewer::new(Vec::new(), &mut params, (40.0, 60.0), (0.0, 10.0), false).unwrap();
        let joined = viewer.render(&world()).join("\n");
        assert!(!joined.contains('E'));
        assert!(joined.contains('#'));
    }

    #[test]
    fn test_draw_world_writes_header() {
        let mut params = ParameterServer::new();
        let mut viewer = AsciiViewer::new(Vec::new(), &mut params, (0.0, 1.0), (0.0, 1.0), true).unwrap();
        viewer.draw_world(&world()).unwrap();
        let output = String::from_utf8(viewer.into_inner()).unwrap();
        assert!(output.starts_with("t = 0.00s, agents = 2"));
    }
}
