//! Asset group definitions.

use std::fmt;

/// One of the five source families the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetGroup {
    /// Template sources (`src/*.pug`) rendered by an external tool.
    Template,
    /// Plain HTML sources (`src/*.html`).
    Html,
    /// Stylesheet dialect sources.
    Styles,
    /// Script sources.
    Scripts,
    /// Raster and vector images.
    Images,
}

/// What connected browsers should do after a group is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPolicy {
    /// Reload the whole page.
    Full,
    /// Push new CSS without reloading.
    Inject,
    /// Do not notify clients.
    None,
}

impl AssetGroup {
    pub const ALL: [Self; 5] = [
        Self::Template,
        Self::Html,
        Self::Styles,
        Self::Scripts,
        Self::Images,
    ];

    /// Groups bound to a rebuild pipeline in watch mode.
    pub const WATCHED: [Self; 4] = [Self::Html, Self::Styles, Self::Scripts, Self::Images];

    /// Display name, also used as the log prefix.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Html => "html",
            Self::Styles => "styles",
            Self::Scripts => "scripts",
            Self::Images => "images",
        }
    }

    pub const fn reload_policy(self) -> ReloadPolicy {
        match self {
            Self::Template | Self::Html | Self::Scripts => ReloadPolicy::Full,
            Self::Styles => ReloadPolicy::Inject,
            Self::Images => ReloadPolicy::None,
        }
    }
}

impl fmt::Display for AssetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
