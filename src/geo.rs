//! Zip code validation and the static zip → coordinate table used to look up
//! legislators by location.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CivicError;

static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{5}$").expect("zip regex"));

/// San Francisco City Hall; used for zips missing from the table.
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    lat: 37.7793,
    lng: -122.4193,
};

static ZIP_COORDINATES: Lazy<HashMap<&'static str, Coordinates>> = Lazy::new(|| {
    let c = |lat, lng| Coordinates { lat, lng };
    HashMap::from([
        ("94102", c(37.7786, -122.4193)), // Civic Center
        ("94103", c(37.7726, -122.4110)), // SoMa
        ("94104", c(37.7915, -122.4018)),
        ("94105", c(37.7893, -122.3951)),
        ("94107", c(37.7621, -122.3971)),
        ("94108", c(37.7929, -122.4080)),
        ("94109", c(37.7941, -122.4211)),
        ("94110", c(37.7486, -122.4154)), // Mission
        ("94111", c(37.7989, -122.4001)),
        ("94112", c(37.7209, -122.4423)),
        ("94114", c(37.7585, -122.4352)),
        ("94115", c(37.7857, -122.4370)),
        ("94116", c(37.7436, -122.4862)),
        ("94117", c(37.7702, -122.4447)),
        ("94118", c(37.7816, -122.4618)),
        ("94121", c(37.7768, -122.4941)),
        ("94122", c(37.7585, -122.4843)), // Sunset
        ("94123", c(37.8003, -122.4368)),
        ("94124", c(37.7318, -122.3877)),
        ("94127", c(37.7359, -122.4570)),
        ("94129", c(37.7996, -122.4662)),
        ("94130", c(37.8235, -122.3707)),
        ("94131", c(37.7416, -122.4378)),
        ("94132", c(37.7241, -122.4834)),
        ("94133", c(37.8008, -122.4117)),
        ("94134", c(37.7192, -122.4130)),
        ("94158", c(37.7695, -122.3870)),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Five-digit US zip code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZipCode(String);

impl ZipCode {
    pub fn parse(raw: &str) -> Result<Self, CivicError> {
        let trimmed = raw.trim();
        if ZIP_RE.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(CivicError::validation("Please enter a valid 5-digit zip code"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Coordinates from the static table, `DEFAULT_COORDINATES` when unknown.
    pub fn coordinates(&self) -> Coordinates {
        ZIP_COORDINATES
            .get(self.0.as_str())
            .copied()
            .unwrap_or(DEFAULT_COORDINATES)
    }

    pub fn is_mapped(&self) -> bool {
        ZIP_COORDINATES.contains_key(self.0.as_str())
    }

    /// Short stable hash for logs. Zip codes are never logged raw.
    pub fn anon_id(&self) -> String {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(self.0.as_bytes());
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

impl TryFrom<String> for ZipCode {
    type Error = CivicError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        ZipCode::parse(&s)
    }
}

impl From<ZipCode> for String {
    fn from(z: ZipCode) -> String {
        z.0
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
