//! Canonical resolutions for the supported aspect-ratio tokens.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Resolution returned for tokens outside the table.
pub const FALLBACK_RESOLUTION: Resolution = Resolution::new(1024, 1024);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: usize,
    pub height: usize,
}

impl Resolution {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The thirteen supported ratio tokens: one square, six portrait, six landscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Square,
    Portrait2x3,
    Portrait3x4,
    Portrait5x8,
    Portrait9x16,
    Portrait9x19,
    Portrait9x21,
    Landscape3x2,
    Landscape4x3,
    Landscape8x5,
    Landscape16x9,
    Landscape19x9,
    Landscape21x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 13] = [
        Self::Square,
        Self::Portrait2x3,
        Self::Portrait3x4,
        Self::Portrait5x8,
        Self::Portrait9x16,
        Self::Portrait9x19,
        Self::Portrait9x21,
        Self::Landscape3x2,
        Self::Landscape4x3,
        Self::Landscape8x5,
        Self::Landscape16x9,
        Self::Landscape19x9,
        Self::Landscape21x9,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait2x3 => "2:3",
            Self::Portrait3x4 => "3:4",
            Self::Portrait5x8 => "5:8",
            Self::Portrait9x16 => "9:16",
            Self::Portrait9x19 => "9:19",
            Self::Portrait9x21 => "9:21",
            Self::Landscape3x2 => "3:2",
            Self::Landscape4x3 => "4:3",
            Self::Landscape8x5 => "8:5",
            Self::Landscape16x9 => "16:9",
            Self::Landscape19x9 => "19:9",
            Self::Landscape21x9 => "21:9",
        }
    }

    /// Parse a ratio token such as `"16:9"`. Surrounding whitespace is ignored.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL.into_iter().find(|ratio| ratio.token() == token)
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            Self::Square => Resolution::new(1024, 1024),
            Self::Portrait2x3 => Resolution::new(832, 1216),
            Self::Portrait3x4 => Resolution::new(896, 1152),
            Self::Portrait5x8 => Resolution::new(768, 1216),
            Self::Portrait9x16 => Resolution::new(768, 1344),
            Self::Portrait9x19 => Resolution::new(704, 1472),
            Self::Portrait9x21 => Resolution::new(640, 1536),
            Self::Landscape3x2 => Resolution::new(1216, 832),
            Self::Landscape4x3 => Resolution::new(1152, 896),
            Self::Landscape8x5 => Resolution::new(1216, 768),
            Self::Landscape16x9 => Resolution::new(1344, 768),
            Self::Landscape19x9 => Resolution::new(1472, 704),
            Self::Landscape21x9 => Resolution::new(1536, 640),
        }
    }

    pub fn tokens() -> Vec<String> {
        Self::ALL.iter().map(|r| r.token().to_string()).collect()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Canonical resolution for `token`, or [`FALLBACK_RESOLUTION`] when the
/// token is not in the table.
pub fn lookup(token: &str) -> Resolution {
    match AspectRatio::from_token(token) {
        Some(ratio) => ratio.resolution(),
        None => {
            warn!(
                token,
                fallback = %FALLBACK_RESOLUTION,
                "Unknown aspect ratio token; using square fallback resolution"
            );
            FALLBACK_RESOLUTION
        }
    }
}
