//! Navigation routes
//!
//! Three views: the builder, the saved-forms list, and the preview of one
//! form addressed by its URL-escaped name.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Create or edit a form
    Create,
    /// Saved forms list
    MyForms,
    /// Preview a saved form by name
    Preview(String),
}

impl Route {
    /// Parse a path; unknown paths give `None`
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" | "/create" => Some(Route::Create),
            "/myforms" => Some(Route::MyForms),
            _ => {
                let name = trimmed.strip_prefix("/preview/")?;
                if name.is_empty() || name.contains('/') {
                    return None;
                }
                let name = urlencoding::decode(name).ok()?;
                Some(Route::Preview(name.into_owned()))
            }
        }
    }

    pub fn to_path(&self) -> String {
        match self {
            Route::Create => "/create".to_string(),
            Route::MyForms => "/myforms".to_string(),
            Route::Preview(name) => format!("/preview/{}", urlencoding::encode(name)),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}
