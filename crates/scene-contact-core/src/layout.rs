use rand::Rng;

/// Placement of plans on the `grid x grid` scene cells and of environments
/// onto those cells.
///
/// Environments sit on a row-major grid of `envs_per_row` columns with origins
/// `2 * spacing` apart; scene cells repeat every `grid` columns and rows. An
/// environment's offset moves scene-local coordinates into its own frame.
#[derive(Clone, Debug)]
pub struct SceneLayout {
    pub grid: usize,
    /// Plan id per cell, indexed `cell_x * grid + cell_y`.
    pub cell_plans: Vec<usize>,
    pub env_plan: Vec<usize>,
    pub env_offset: Vec<[f64; 2]>,
}

impl SceneLayout {
    pub fn new<R: Rng + ?Sized>(
        num_envs: usize,
        envs_per_row: usize,
        grid: usize,
        spacing: f64,
        num_plans: usize,
        rng: &mut R,
    ) -> Self {
        let cell_plans: Vec<usize> = (0..grid * grid)
            .map(|_| rng.random_range(0..num_plans))
            .collect();
        let mut env_plan = Vec::with_capacity(num_envs);
        let mut env_offset = Vec::with_capacity(num_envs);
        for env in 0..num_envs {
            let col = env % envs_per_row;
            let row = env / envs_per_row;
            let cell_x = col % grid;
            let cell_y = row % grid;
            env_plan.push(cell_plans[cell_x * grid + cell_y]);
            env_offset.push([
                (cell_x as f64 - col as f64) * spacing * 2.0,
                (cell_y as f64 - row as f64) * spacing * 2.0,
            ]);
        }
        Self {
            grid,
            cell_plans,
            env_plan,
            env_offset,
        }
    }
}
