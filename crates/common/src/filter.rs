//! Test selection filters
//!
//! Tests opt into a variant of a dimension by carrying a tag in their title,
//! e.g. `@only-mobile` or `@brand-audi`. A test with no tag for a dimension
//! runs for every value of that dimension. Each dimension becomes one
//! positive lookahead anchored at the start of the title, so the combined
//! pattern matches iff every dimension's predicate matches, in any order.
//!
//! ```text
//! ^(?=.*(@only-desktop|^(?!.*@only-)))(?=.*(@brand-audi|^(?!.*@brand-))).*$
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One axis along which tests can be restricted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    DeviceClass,
    Brand,
    CommodityType,
}

impl Dimension {
    /// Tag prefix a test uses to opt into a value of this dimension
    pub fn tag_prefix(&self) -> &'static str {
        match self {
            Dimension::DeviceClass => "@only-",
            Dimension::Brand => "@brand-",
            Dimension::CommodityType => "@runs-on-commodity-",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::DeviceClass => "device class",
            Dimension::Brand => "brand",
            Dimension::CommodityType => "commodity type",
        }
    }
}

/// Screen class a browser project emulates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 3] = [DeviceClass::Desktop, DeviceClass::Mobile, DeviceClass::Tablet];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(DeviceClass::Desktop),
            "mobile" => Ok(DeviceClass::Mobile),
            "tablet" => Ok(DeviceClass::Tablet),
            _ => Err(Error::InvalidTagValue {
                dimension: Dimension::DeviceClass.as_str().to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Tag values are ASCII slugs: a letter or digit, then letters, digits or `-`.
/// Stored lowercase.
fn validate_slug(dimension: Dimension, value: &str) -> Result<String> {
    let mut chars = value.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-');

    if !valid {
        return Err(Error::InvalidTagValue {
            dimension: dimension.as_str().to_string(),
            value: value.to_string(),
        });
    }
    Ok(value.to_ascii_lowercase())
}

macro_rules! slug_value {
    ($(#[$meta:meta])* $name:ident, $dimension:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: &str) -> Result<Self> {
                validate_slug($dimension, value).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::new(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }
    };
}

slug_value!(
    /// Product brand a test suite is run for, e.g. `audi`
    Brand,
    Dimension::Brand
);

slug_value!(
    /// Commodity type a test suite is run for, e.g. `merchandise`
    CommodityType,
    Dimension::CommodityType
);

/// "Has this dimension's tag for `value`, or has no tag for this dimension at all"
#[derive(Debug, Clone, PartialEq, Eq)]
struct Predicate {
    dimension: Dimension,
    value: String,
}

impl Predicate {
    fn new(dimension: Dimension, value: &str) -> Self {
        Self {
            dimension,
            value: value.to_ascii_lowercase(),
        }
    }

    fn specific_tag(&self) -> String {
        format!("{}{}", self.dimension.tag_prefix(), self.value)
    }

    fn lookahead(&self) -> String {
        format!(
            "(?=.*({}|^(?!.*{})))",
            self.specific_tag(),
            self.dimension.tag_prefix()
        )
    }

    /// `title` must already be ASCII-lowercased
    fn matches(&self, title: &str) -> bool {
        title.contains(&self.specific_tag()) || !title.contains(self.dimension.tag_prefix())
    }
}

/// Immutable builder for a combined selection pattern.
///
/// Every `with_*` call returns a new builder; the receiver is left untouched so
/// a partially configured builder can be shared as a prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFilterBuilder {
    predicates: Vec<Predicate>,
}

impl TestFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_class(&self, device_class: DeviceClass) -> Self {
        self.with(Predicate::new(Dimension::DeviceClass, device_class.as_str()))
    }

    pub fn with_brand(&self, brand: &Brand) -> Self {
        self.with(Predicate::new(Dimension::Brand, brand.as_str()))
    }

    pub fn with_commodity_type(&self, commodity_type: &CommodityType) -> Self {
        self.with(Predicate::new(Dimension::CommodityType, commodity_type.as_str()))
    }

    fn with(&self, predicate: Predicate) -> Self {
        let mut predicates = Vec::with_capacity(self.predicates.len() + 1);
        predicates.extend(self.predicates.iter().cloned());
        predicates.push(predicate);
        Self { predicates }
    }

    /// Number of predicates added so far
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Combine every predicate into one case-insensitive whole-title pattern
    pub fn build(&self) -> GrepPattern {
        let lookaheads: String = self.predicates.iter().map(Predicate::lookahead).collect();
        GrepPattern {
            source: format!("^{}.*$", lookaheads),
            predicates: self.predicates.clone(),
        }
    }
}

/// A built selection pattern.
///
/// `source()` is handed verbatim to the test runner, which compiles it with
/// the `i` flag. `is_match` evaluates the same predicates in process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepPattern {
    source: String,
    predicates: Vec<Predicate>,
}

impl GrepPattern {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> &'static str {
        "i"
    }

    /// Does a test title pass every predicate?
    pub fn is_match(&self, title: &str) -> bool {
        // `.` never crosses a line terminator, so `.*$` fails on multi-line titles
        if title.contains(|c: char| matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')) {
            return false;
        }
        let title = title.to_ascii_lowercase();
        self.predicates.iter().all(|p| p.matches(&title))
    }

    /// Does a label set pass every predicate?
    pub fn matches_tags<I, S>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = tags
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.is_match(&joined)
    }
}

impl fmt::Display for GrepPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags())
    }
}
