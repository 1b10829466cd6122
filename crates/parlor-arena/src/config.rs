//! Arena rule constants, gathered in one tweakable struct.

use std::time::Duration;

/// Rules for one arena room. Rooms clone this at creation; changing
/// the defaults never affects rooms already running.
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Side length of the square field, in cells.
    pub grid_size: i32,
    /// Starting snake length.
    pub initial_length: usize,
    /// Countdown seconds before the round begins.
    pub countdown_from: u32,

    /// Starting simulation tick.
    pub base_tick: Duration,
    /// The tick never drops below this.
    pub min_tick: Duration,
    /// How much the tick shrinks per speedup period.
    pub tick_step: Duration,
    /// Elapsed play time per speedup step.
    pub speedup_period: Duration,

    /// Points and growth for plain food.
    pub food_points: f64,
    pub food_growth: usize,
    /// Points and growth for super food.
    pub super_points: f64,
    pub super_growth: usize,
    /// Period between chances for the food to turn super.
    pub super_food_period: Duration,

    /// Period between power-up spawns.
    pub power_up_period: Duration,
    /// Field holds at most this many power-ups.
    pub max_power_ups: usize,
    /// How long speed and shield effects last.
    pub effect_duration: Duration,
    /// Instant score for a mega power-up.
    pub mega_points: f64,
    /// Extra growth for a mega power-up.
    pub mega_growth: usize,

    /// Eating again within this window extends the combo.
    pub combo_window: Duration,
    /// Extra points per combo step beyond the first.
    pub combo_bonus: f64,

    /// Awarded to an agent another agent crashes into.
    pub kill_bonus: f64,
    /// Trickle awarded to every living agent each tick.
    pub survival_per_tick: f64,
    /// Awarded to the round winner.
    pub victory_bonus: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            grid_size: 25,
            initial_length: 3,
            countdown_from: 3,

            base_tick: Duration::from_millis(80),
            min_tick: Duration::from_millis(50),
            tick_step: Duration::from_millis(5),
            speedup_period: Duration::from_secs(30),

            food_points: 10.0,
            food_growth: 1,
            super_points: 50.0,
            super_growth: 3,
            super_food_period: Duration::from_secs(30),

            power_up_period: Duration::from_secs(15),
            max_power_ups: 3,
            effect_duration: Duration::from_secs(5),
            mega_points: 50.0,
            mega_growth: 2,

            combo_window: Duration::from_secs(3),
            combo_bonus: 5.0,

            kill_bonus: 100.0,
            survival_per_tick: 0.1,
            victory_bonus: 200.0,
        }
    }
}
