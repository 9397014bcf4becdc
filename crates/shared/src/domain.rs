use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Number of themes the backend accepts before rejecting new ones.
pub const DEFAULT_THEME_CAP: usize = 3;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(ThemeId);
id_newtype!(RunId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl Schedule {
    pub fn as_str(self) -> &'static str {
        match self {
            Schedule::Daily => "daily",
            Schedule::Weekly => "weekly",
            Schedule::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Schedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Schedule::Daily),
            "weekly" => Ok(Schedule::Weekly),
            "monthly" => Ok(Schedule::Monthly),
            other => Err(format!("unknown schedule '{other}' (expected daily, weekly or monthly)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeStatus {
    #[default]
    Draft,
    Active,
}

impl fmt::Display for ThemeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeStatus::Draft => f.pad("draft"),
            ThemeStatus::Active => f.pad("active"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: ThemeId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub status: ThemeStatus,
}

impl Theme {
    pub fn is_active(&self) -> bool {
        self.status == ThemeStatus::Active
    }
}

/// Closed set of result sources a run is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketId {
    Mbb,
    Market,
    Reddit,
    Arxiv,
    Youtube,
}

impl BucketId {
    /// Declared display order.
    pub const ALL: [BucketId; 5] = [
        BucketId::Mbb,
        BucketId::Market,
        BucketId::Reddit,
        BucketId::Arxiv,
        BucketId::Youtube,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BucketId::Mbb => "mbb",
            BucketId::Market => "market",
            BucketId::Reddit => "reddit",
            BucketId::Arxiv => "arxiv",
            BucketId::Youtube => "youtube",
        }
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub results: Vec<ResultItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub theme_id: ThemeId,
    pub theme_name: String,
    pub timestamp: String,
    /// Keyed by wire name so keys outside [`BucketId::ALL`] do not fail decoding.
    #[serde(default)]
    pub buckets: HashMap<String, BucketResult>,
}

impl Run {
    pub fn bucket(&self, id: BucketId) -> Option<&BucketResult> {
        self.buckets.get(id.as_str())
    }

    /// Accepts both offset-qualified RFC 3339 stamps and the naive ISO form the
    /// research backend writes.
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.naive_utc());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepDiveResult {
    pub href: String,
    pub summary: String,
}
