//! Catalog record data structure.
//!
//! Records arrive in the aggregator's `doc` shape: identity, thumbnail and
//! provider at the top level, descriptive metadata under `sourceResource`.
//! Descriptive fields are loosely typed upstream (a bare string, a list of
//! strings, or objects carrying `name`/`displayDate`), so they are normalized
//! to plain string lists on the way in.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Base URL of the public item page.
pub const ITEM_BASE_URL: &str = "https://dp.la/item/";

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("year pattern is valid"));

/// A single catalog item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Opaque aggregator identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Descriptive metadata
    #[serde(default, rename = "sourceResource")]
    pub source_resource: SourceResource,

    /// Contributing institution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,

    /// Thumbnail image URL
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "first_text"
    )]
    pub object: Option<String>,
}

/// Descriptive metadata of a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceResource {
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<String>,

    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<String>,

    /// Classification strings such as "image" or "physical object"
    #[serde(
        default,
        rename = "type",
        deserialize_with = "text_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub types: Vec<String>,

    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub subject: Vec<String>,

    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub spatial: Vec<String>,

    /// Free-text dates ("circa 1923", "1850-1860", ...)
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub date: Vec<String>,
}

/// Contributing institution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Provider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Record {
    /// First title variant.
    pub fn title(&self) -> Option<&str> {
        self.source_resource.title.first().map(String::as_str)
    }

    /// Title for display, `Untitled` when absent.
    pub fn display_title(&self) -> &str {
        self.title().unwrap_or("Untitled")
    }

    /// First description variant.
    pub fn description(&self) -> Option<&str> {
        self.source_resource.description.first().map(String::as_str)
    }

    /// Description for display, with a placeholder when absent.
    pub fn display_description(&self) -> &str {
        self.description().unwrap_or("No description available.")
    }

    pub fn types(&self) -> &[String] {
        &self.source_resource.types
    }

    /// Institution name, `Unknown` when the record has no provider.
    pub fn provider_name(&self) -> &str {
        self.provider
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.object.as_deref()
    }

    /// Public item page, or `#` when the record carries no identifier.
    pub fn item_url(&self) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => format!("{ITEM_BASE_URL}{id}"),
            _ => "#".to_string(),
        }
    }

    /// Year taken from the first 4-digit run of the first date string.
    pub fn year(&self) -> Option<i32> {
        let date = self.source_resource.date.first()?;
        YEAR_PATTERN
            .find(date)
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Whether any searchable text field contains `needle`.
    ///
    /// `needle` must already be lowercase.
    pub fn contains_text(&self, needle: &str) -> bool {
        let hit = |s: &str| s.to_lowercase().contains(needle);

        self.title().is_some_and(hit)
            || self.description().is_some_and(hit)
            || self.source_resource.subject.iter().any(|s| hit(s))
            || self.source_resource.spatial.iter().any(|s| hit(s))
    }

    /// Icon name shown in place of a missing thumbnail, keyed on the first type.
    pub fn placeholder_icon(&self) -> &'static str {
        let kind = self
            .types()
            .first()
            .map(|t| t.to_lowercase())
            .unwrap_or_default();

        if kind.contains("image") {
            "image"
        } else if kind.contains("text") {
            "file-text"
        } else if kind.contains("physical") {
            "gallery-vertical-end"
        } else if kind.contains("moving") {
            "film"
        } else if kind.contains("sound") {
            "music"
        } else if kind.contains("dataset") {
            "database"
        } else {
            "file"
        }
    }
}

/// Accept a string, a list, or objects with `name`/`displayDate` and flatten to strings.
fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(value) = value {
        collect_text(&value, &mut out);
    }
    Ok(out)
}

fn first_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_list(deserializer)?.into_iter().next())
}

fn collect_text(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(text) = ["name", "displayDate"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
            {
                out.push(text.to_string());
            }
        }
        Value::Null | Value::Bool(_) => {}
    }
}
