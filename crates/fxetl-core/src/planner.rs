use time::Date;

use crate::LoadWindow;

/// Chooses the date window for each entry point. `today` always comes from
/// the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadPlanner;

impl LoadPlanner {
    /// January 1 of `today`'s year through `today`.
    pub fn plan_initial(&self, today: Date) -> LoadWindow {
        LoadWindow::year_to_date(today)
    }

    /// `today` only.
    pub fn plan_incremental(&self, today: Date) -> LoadWindow {
        LoadWindow::single(today)
    }
}
