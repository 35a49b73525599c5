//! Vendor-scoped manifest keys.
//!
//! A key such as `__chrome|opera__description` is kept (as `description`)
//! only when building for one of the listed vendors and dropped otherwise.
//! Keys whose prefix names no known vendor are ordinary keys.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Browser vendors a manifest can be resolved for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    #[default]
    Chrome,
    Firefox,
    Opera,
    Edge,
    Safari,
}

impl Vendor {
    /// Every supported vendor, in declaration order.
    pub const ALL: [Vendor; 5] = [
        Vendor::Chrome,
        Vendor::Firefox,
        Vendor::Opera,
        Vendor::Edge,
        Vendor::Safari,
    ];

    /// Returns the identifier used in vendor keys (e.g. "chrome").
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Chrome => "chrome",
            Vendor::Firefox => "firefox",
            Vendor::Opera => "opera",
            Vendor::Edge => "edge",
            Vendor::Safari => "safari",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown vendor identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vendor '{0}' (expected one of chrome, firefox, opera, edge, safari)")]
pub struct UnknownVendor(pub String);

impl FromStr for Vendor {
    type Err = UnknownVendor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vendor::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVendor(s.to_string()))
    }
}

static VENDOR_KEY_REGEX: OnceLock<Regex> = OnceLock::new();

fn vendor_key_regex() -> &'static Regex {
    VENDOR_KEY_REGEX.get_or_init(|| {
        let alternation = Vendor::ALL
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"^__((?:{alt})(?:\|(?:{alt}))*)__(.+)$", alt = alternation);
        Regex::new(&pattern).expect("invalid vendor key pattern")
    })
}

/// A key parsed as `__V1|V2__suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorKey<'a> {
    /// Vendors the key applies to.
    pub vendors: Vec<Vendor>,
    /// The key name once the vendor prefix is removed.
    pub suffix: &'a str,
}

impl VendorKey<'_> {
    /// Returns true if the key applies to `vendor`.
    pub fn applies_to(&self, vendor: Vendor) -> bool {
        self.vendors.contains(&vendor)
    }
}

/// Parses `key` as a vendor key. Returns `None` for ordinary keys.
pub fn parse_vendor_key(key: &str) -> Option<VendorKey<'_>> {
    let caps = vendor_key_regex().captures(key)?;
    let list = caps.get(1)?.as_str();
    let suffix = caps.get(2)?.as_str();
    let vendors = list
        .split('|')
        .filter_map(|token| token.parse::<Vendor>().ok())
        .collect();
    Some(VendorKey { vendors, suffix })
}

/// Resolves every vendor key in `node` for `vendor`.
///
/// Returns a new tree; the input is not modified. Re-running on the output is
/// a no-op because no vendor keys remain.
pub fn resolve_vendor_keys(node: &Value, vendor: Vendor) -> Value {
    match node {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_vendor_keys(item, vendor))
                .collect(),
        ),
        Value::Object(map) => {
            let mut resolved = Map::with_capacity(map.len());
            for (key, value) in map {
                match parse_vendor_key(key) {
                    Some(vendor_key) if vendor_key.applies_to(vendor) => {
                        resolved.insert(
                            vendor_key.suffix.to_string(),
                            resolve_vendor_keys(value, vendor),
                        );
                    }
                    Some(_) => {}
                    None => {
                        resolved.insert(key.clone(), resolve_vendor_keys(value, vendor));
                    }
                }
            }
            Value::Object(resolved)
        }
        scalar => scalar.clone(),
    }
}
