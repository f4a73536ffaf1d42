use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

static ACCESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid accession regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(KiraError::InvalidArgument("empty accession".to_string()));
        }
        if !ACCESSION_RE.is_match(trimmed) {
            return Err(KiraError::InvalidArgument(format!(
                "malformed accession: {value}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum App {
    Sra,
    Refseq,
    Wgs,
}

impl App {
    pub fn as_str(self) -> &'static str {
        match self {
            App::Sra => "sra",
            App::Refseq => "refseq",
            App::Wgs => "wgs",
        }
    }

    pub fn flat_volume_key(self) -> String {
        format!("{}Flat", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Sra,
    SraLite,
    Vdbcache,
    Refseq,
    Wgs,
    Other(String),
}

impl ObjectType {
    pub const DEFAULT_PROBES: [ObjectType; 2] = [ObjectType::Sra, ObjectType::Vdbcache];

    pub fn app(&self) -> Option<App> {
        match self {
            ObjectType::Sra | ObjectType::SraLite | ObjectType::Vdbcache => Some(App::Sra),
            ObjectType::Refseq => Some(App::Refseq),
            ObjectType::Wgs => Some(App::Wgs),
            ObjectType::Other(_) => None,
        }
    }

    pub fn file_name(&self, accession: &Accession) -> Option<String> {
        let suffix = match self {
            ObjectType::Sra => ".sra",
            ObjectType::SraLite => ".sralite",
            ObjectType::Vdbcache => ".sra.vdbcache",
            ObjectType::Refseq | ObjectType::Wgs => "",
            ObjectType::Other(_) => return None,
        };
        Some(format!("{}{suffix}", accession.as_str()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Sra => "sra",
            ObjectType::SraLite => "sralite",
            ObjectType::Vdbcache => "vdbcache",
            ObjectType::Refseq => "refseq",
            ObjectType::Wgs => "wgs",
            ObjectType::Other(value) => value,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "" => Err(KiraError::InvalidArgument("empty object type".to_string())),
            "sra" => Ok(ObjectType::Sra),
            "sralite" | "sra.lite" => Ok(ObjectType::SraLite),
            "vdbcache" | "sra.vdbcache" => Ok(ObjectType::Vdbcache),
            "refseq" => Ok(ObjectType::Refseq),
            "wgs" => Ok(ObjectType::Wgs),
            _ => Ok(ObjectType::Other(normalized)),
        }
    }
}

impl Serialize for ObjectType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub fn probe_types(format: &str) -> Vec<ObjectType> {
    let trimmed = format.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return ObjectType::DEFAULT_PROBES.to_vec();
    }
    let mut types = Vec::new();
    for part in trimmed.split(',') {
        if let Ok(object_type) = part.parse::<ObjectType>() {
            if !types.contains(&object_type) {
                types.push(object_type);
            }
        }
    }
    types
}
