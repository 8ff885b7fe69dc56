//! Tabs of the dashboard TUI.
//!
//! Run details is not a tab of its own: it is opened from the runs list
//! (or a notification) and highlights the Runs tab while shown.

use crate::api::types::RunId;
use crate::route::Route;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Dashboard,
    Runs,
    FlakyTests,
    Trends,
    Settings,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Runs => "Test Runs",
            View::FlakyTests => "Flaky Tests",
            View::Trends => "Trends",
            View::Settings => "Settings",
        }
    }

    /// All tabs in display order.
    pub fn all() -> &'static [View] {
        &[
            View::Dashboard,
            View::Runs,
            View::FlakyTests,
            View::Trends,
            View::Settings,
        ]
    }

    pub fn index(&self) -> usize {
        View::all().iter().position(|v| v == self).unwrap_or(0)
    }

    pub fn next(&self) -> View {
        let views = View::all();
        views[(self.index() + 1) % views.len()]
    }

    pub fn prev(&self) -> View {
        let views = View::all();
        views[(self.index() + views.len() - 1) % views.len()]
    }

    /// Tab for a 1-based number key.
    pub fn from_number(n: u32) -> Option<View> {
        let idx = (n as usize).checked_sub(1)?;
        View::all().get(idx).copied()
    }

    /// Whether the tab's data changes with the date range.
    pub fn uses_date_range(&self) -> bool {
        !matches!(self, View::Settings)
    }

    pub fn route(&self) -> Route {
        match self {
            View::Dashboard => Route::Dashboard,
            View::Runs => Route::Runs,
            View::FlakyTests => Route::FlakyTests,
            View::Trends => Route::Trends,
            View::Settings => Route::Settings,
        }
    }

    /// The tab a route belongs to, plus the run if it is a details route.
    pub fn from_route(route: Route) -> (View, Option<RunId>) {
        match route {
            Route::Dashboard => (View::Dashboard, None),
            Route::Runs => (View::Runs, None),
            Route::RunDetails(id) => (View::Runs, Some(id)),
            Route::FlakyTests => (View::FlakyTests, None),
            Route::Trends => (View::Trends, None),
            Route::Settings => (View::Settings, None),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_all_and_names() {
        let all = View::all();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], View::Dashboard);
        assert_eq!(all[4], View::Settings);
        assert_eq!(View::FlakyTests.name(), "Flaky Tests");
        assert_eq!(format!("{}", View::Runs), "Test Runs");
    }

    #[test]
    fn test_view_next_and_prev_wrap() {
        assert_eq!(View::Dashboard.next(), View::Runs);
        assert_eq!(View::Settings.next(), View::Dashboard);
        assert_eq!(View::Dashboard.prev(), View::Settings);
        assert_eq!(View::Trends.prev(), View::FlakyTests);
    }

    #[test]
    fn test_view_from_number() {
        assert_eq!(View::from_number(1), Some(View::Dashboard));
        assert_eq!(View::from_number(5), Some(View::Settings));
        assert_eq!(View::from_number(0), None);
        assert_eq!(View::from_number(6), None);
    }

    #[test]
    fn test_view_route_mapping() {
        for view in View::all() {
            assert_eq!(View::from_route(view.route()), (*view, None));
        }
        assert_eq!(
            View::from_route(Route::RunDetails(7)),
            (View::Runs, Some(7))
        );
    }

    #[test]
    fn test_only_settings_ignores_date_range() {
        assert!(View::Dashboard.uses_date_range());
        assert!(View::Trends.uses_date_range());
        assert!(!View::Settings.uses_date_range());
    }
}
