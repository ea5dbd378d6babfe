//! Absolute image URLs for TMDB poster and backdrop paths.
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::config::DEFAULT_IMAGE_BASE;

/// Served locally when a movie has no artwork.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-movie.jpg";

/// Rendition widths the frontend asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    W200,
    W300,
    #[default]
    W500,
    Original,
}

impl ImageSize {
    pub const ALL: [ImageSize; 4] = [
        ImageSize::W200,
        ImageSize::W300,
        ImageSize::W500,
        ImageSize::Original,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::W200 => "w200",
            ImageSize::W300 => "w300",
            ImageSize::W500 => "w500",
            ImageSize::Original => "original",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageSize::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown image size '{}'", s))
    }
}

#[derive(Debug, Clone)]
pub struct ImageResolver {
    base: String,
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_BASE)
    }
}

impl ImageResolver {
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// `base/size/path`, or the placeholder when there is no path.
    pub fn resolve(&self, path: Option<&str>, size: ImageSize) -> String {
        match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) if p.starts_with('/') => format!("{}/{}{}", self.base, size, p),
            Some(p) => format!("{}/{}/{}", self.base, size, p),
            None => PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

/// Resolves against the public TMDB image host.
pub fn image_url(path: Option<&str>, size: ImageSize) -> String {
    ImageResolver::default().resolve(path, size)
}
