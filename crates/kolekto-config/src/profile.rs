//! Collection profiles.
//!
//! A profile decides how records are summarised on one line and how
//! listings are ordered.

/// Behaviour specific to one kind of collection.
pub trait Profile: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pattern used for one-line summaries (`list`, import previews).
    fn default_pattern(&self) -> &'static str;

    /// Attributes listings are sorted by, most significant first.
    fn default_sort_order(&self) -> &'static [&'static str];
}

pub struct MoviesProfile;

impl Profile for MoviesProfile {
    fn name(&self) -> &'static str {
        "movies"
    }

    fn default_pattern(&self) -> &'static str {
        r#"{title} ({year|"unknown"}) by {directors}"#
    }

    fn default_sort_order(&self) -> &'static [&'static str] {
        &["title", "year"]
    }
}

pub struct SeriesProfile;

impl Profile for SeriesProfile {
    fn name(&self) -> &'static str {
        "series"
    }

    fn default_pattern(&self) -> &'static str {
        r#"{title} ({year|"unknown"}) season {season} episode {episode}"#
    }

    fn default_sort_order(&self) -> &'static [&'static str] {
        &["title", "year", "season", "episode"]
    }
}

/// Names accepted for the `profile` setting.
pub const PROFILE_NAMES: &[&str] = &["movies", "series"];

pub fn profile_for(name: &str) -> Option<&'static dyn Profile> {
    match name {
        "movies" => Some(&MoviesProfile),
        "series" | "tvseries" => Some(&SeriesProfile),
        _ => None,
    }
}
