//! App sections and the transitions between them.
//!
//! Section switching is driven by explicit events; nothing here depends on
//! the profile engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    #[default]
    Home,
    Upload,
    Profile,
    Analysis,
    Roadmap,
    Courses,
    Community,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Home => "home",
            Section::Upload => "upload",
            Section::Profile => "profile",
            Section::Analysis => "analysis",
            Section::Roadmap => "roadmap",
            Section::Courses => "courses",
            Section::Community => "community",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    /// Accepts a bare name or a location fragment such as `#roadmap`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('#') {
            "" | "home" => Ok(Section::Home),
            "upload" => Ok(Section::Upload),
            "profile" => Ok(Section::Profile),
            "analysis" => Ok(Section::Analysis),
            "roadmap" => Ok(Section::Roadmap),
            "courses" => Ok(Section::Courses),
            "community" => Ok(Section::Community),
            other => Err(format!("Unknown section '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    ProfileSaved,
    ProfileSkipped,
    Goto(Section),
}

pub fn next_section(event: NavigationEvent) -> Section {
    match event {
        NavigationEvent::ProfileSaved | NavigationEvent::ProfileSkipped => Section::Roadmap,
        NavigationEvent::Goto(section) => section,
    }
}
