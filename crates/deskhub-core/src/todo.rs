//! Todo domain types and the pure filtering rules applied to them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A persisted task. `completed` is the only field that changes after creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoItem {
    pub id: i64,
    pub task: String,
    pub completed: bool,
    pub priority: Priority,
    pub category: Category,
    pub created_at: String,
}

/// Returned when a wire value does not name a known variant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    ($name:ident, $kind:expr, default = $default:ident, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum!(Priority, "priority", default = Medium, {
    Low => "low",
    Medium => "medium",
    High => "high",
});

wire_enum!(Category, "category", default = General, {
    General => "general",
    Work => "work",
    Personal => "personal",
    Health => "health",
    Finance => "finance",
});

/// Completion-state selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl FromStr for StatusFilter {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            _ => Err(UnknownVariant {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// `None` means "all".
fn parse_selector<T: FromStr<Err = UnknownVariant>>(raw: Option<&str>) -> Result<Option<T>, UnknownVariant> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some(s) if s.is_empty() || s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

/// Conjunctive filter over todos. The default filter matches everything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub status: StatusFilter,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
}

impl TodoFilter {
    /// Parse raw selector strings as sent by the UI ("All", "Pending", "high", ...).
    pub fn parse(
        status: Option<&str>,
        priority: Option<&str>,
        category: Option<&str>,
    ) -> Result<Self, UnknownVariant> {
        let status = match status {
            Some(s) if !s.trim().is_empty() => s.parse()?,
            _ => StatusFilter::All,
        };
        Ok(Self {
            status,
            priority: parse_selector(priority)?,
            category: parse_selector(category)?,
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, item: &TodoItem) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Pending => !item.completed,
            StatusFilter::Completed => item.completed,
        };
        status_ok
            && self.priority.map_or(true, |p| p == item.priority)
            && self.category.map_or(true, |c| c == item.category)
    }

    /// Apply the filter, preserving input order.
    pub fn apply(&self, items: Vec<TodoItem>) -> Vec<TodoItem> {
        if self.is_identity() {
            return items;
        }
        items.into_iter().filter(|t| self.matches(t)).collect()
    }
}
