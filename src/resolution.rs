//! Pixel dimensions of an icon or screen.
//!
//! A [`Resolution`] is always stored landscape-or-square: the larger of the
//! two inputs becomes the width. That makes `(768, 1024)` and `(1024, 768)`
//! the same value, which is what the size catalog relies on to deduplicate.

use crate::error::IconError;
use std::fmt;
use std::str::FromStr;

/// Filename stems used by [`Resolution::file_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePrefixes {
    /// Stem for square images (icons).
    pub icon: String,
    /// Stem for non-square images (launch screens).
    pub launch_screen: String,
}

impl Default for FilePrefixes {
    fn default() -> Self {
        Self {
            icon: "apple-touch-icon".to_string(),
            launch_screen: "apple-launch-screen".to_string(),
        }
    }
}

/// An immutable width/height pair with `width >= height`.
///
/// Field order matters: the derived `Ord` sorts by width, then height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Creates a resolution, swapping the inputs if needed so that the width is
    /// the larger side.
    ///
    /// # Errors
    /// Returns [`IconError::InvalidDimension`] if either side is not positive
    /// or does not fit in a `u32`.
    pub fn new(a: i64, b: i64) -> Result<Self, IconError> {
        let a = positive(a)?;
        let b = positive(b)?;
        Ok(Self {
            width: a.max(b),
            height: a.min(b),
        })
    }

    /// Shorthand for a square resolution.
    pub fn square(size: i64) -> Result<Self, IconError> {
        Self::new(size, size)
    }

    /// Parses a `"WxH"` or `"W:H"` string. Spaces are ignored.
    ///
    /// Same as the [`FromStr`] impl, kept as a named constructor because the
    /// catalog loader reads a lot better with it.
    pub fn from_pair(value: &str) -> Result<Self, IconError> {
        value.parse()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Decimal aspect ratio rounded to two places; exactly `1.0` when square.
    pub fn aspect_ratio(&self) -> f64 {
        if self.is_square() {
            return 1.0;
        }
        let ratio = f64::from(self.width) / f64::from(self.height);
        (ratio * 100.0).round() / 100.0
    }

    /// Aspect ratio reduced by the greatest common divisor, e.g. `"4:3"`.
    pub fn aspect_ratio_str(&self) -> String {
        let divisor = gcd(self.width, self.height);
        format!("{}:{}", self.width / divisor, self.height / divisor)
    }

    /// The conventional file name for an image of this size: the icon stem for
    /// square sizes, the launch screen stem otherwise.
    pub fn file_name(&self, prefixes: &FilePrefixes) -> String {
        let stem = if self.is_square() {
            &prefixes.icon
        } else {
            &prefixes.launch_screen
        };
        format!("{stem}-{}x{}.png", self.width, self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = IconError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        let separator = match (compact.matches('x').count(), compact.matches(':').count()) {
            (1, 0) => 'x',
            (0, 1) => ':',
            _ => return Err(IconError::InvalidFormat(value.to_string())),
        };

        let (left, right) = compact
            .split_once(separator)
            .ok_or_else(|| IconError::InvalidFormat(value.to_string()))?;
        let parse = |part: &str| {
            part.parse::<i64>()
                .map_err(|_| IconError::InvalidFormat(value.to_string()))
        };

        Self::new(parse(left)?, parse(right)?)
    }
}

impl TryFrom<(i64, i64)> for Resolution {
    type Error = IconError;

    fn try_from((a, b): (i64, i64)) -> Result<Self, Self::Error> {
        Self::new(a, b)
    }
}

fn positive(value: i64) -> Result<u32, IconError> {
    if value <= 0 {
        return Err(IconError::InvalidDimension(format!(
            "{value} (width and height must be positive)"
        )));
    }
    u32::try_from(value).map_err(|_| IconError::InvalidDimension(format!("{value} is too large")))
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
