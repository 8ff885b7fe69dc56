use crate::api::types::RunId;
use std::fmt;

/// Addressable screens, with the same paths the web dashboard used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Runs,
    RunDetails(RunId),
    FlakyTests,
    Trends,
    Settings,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/".to_string(),
            Route::Runs => "/runs".to_string(),
            Route::RunDetails(id) => format!("/runs/{}", id),
            Route::FlakyTests => "/flaky-tests".to_string(),
            Route::Trends => "/trends".to_string(),
            Route::Settings => "/settings".to_string(),
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let path = path.trim().trim_end_matches('/');
        match path {
            "" => Some(Route::Dashboard),
            "/runs" => Some(Route::Runs),
            "/flaky-tests" => Some(Route::FlakyTests),
            "/trends" => Some(Route::Trends),
            "/settings" => Some(Route::Settings),
            _ => path
                .strip_prefix("/runs/")
                .and_then(|id| id.parse().ok())
                .map(Route::RunDetails),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
