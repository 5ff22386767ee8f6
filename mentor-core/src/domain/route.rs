//! Navigable destinations

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A destination in the application
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Landing,
    Login,
    SignUp,
    Dashboard,
    Assessment,
    Results,
    LearningPath,
    Account,
    /// Catch-all for unknown paths, keeps the requested path
    NotFound(String),
}

impl Route {
    /// Parse a path such as `/dashboard`. Trailing slashes and query
    /// strings are ignored; anything unknown maps to `NotFound`.
    pub fn parse(path: &str) -> Self {
        let without_query = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = without_query.trim().trim_end_matches('/');
        let normalized = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };

        match normalized.as_str() {
            "/" | "" => Route::Landing,
            "/login" => Route::Login,
            "/signup" => Route::SignUp,
            "/dashboard" => Route::Dashboard,
            "/assessment" => Route::Assessment,
            "/results" => Route::Results,
            "/learning-path" => Route::LearningPath,
            "/account" => Route::Account,
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Landing => "/",
            Route::Login => "/login",
            Route::SignUp => "/signup",
            Route::Dashboard => "/dashboard",
            Route::Assessment => "/assessment",
            Route::Results => "/results",
            Route::LearningPath => "/learning-path",
            Route::Account => "/account",
            Route::NotFound(path) => path,
        }
    }

    /// Whether the destination requires an authenticated session
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::Dashboard
                | Route::Assessment
                | Route::Results
                | Route::LearningPath
                | Route::Account
        )
    }
}

impl FromStr for Route {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Route::parse(s))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
