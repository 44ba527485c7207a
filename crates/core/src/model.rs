//! The persisted launcher document and its schema-driven merge.
//!
//! Loading never deserializes straight into [`Document`]. The raw JSON is read into the
//! `*Patch` types, where every known field is optional and every unknown key is captured,
//! and the patch is then merged onto [`Document::default`]. Nested records (`settings`,
//! `window_geometry`, `group_shortcuts`) merge field by field; lists and scalars replace
//! the default wholesale.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const HOME_GROUP: &str = "Home";
pub const DEFAULT_ENTRY_KIND: &str = "auto";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub settings: Settings,
    pub entries: Vec<Entry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            entries: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl Document {
    /// Merge a loaded patch onto `self`, loaded values taking precedence.
    pub fn merged(mut self, patch: DocumentPatch) -> Self {
        if let Some(settings) = patch.settings {
            self.settings.merge(settings);
        }
        if let Some(entries) = patch.entries {
            self.entries = entries;
        }
        self.extra.extend(patch.extra);
        self
    }

    /// Parse raw JSON text and merge it onto the default document.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let patch: DocumentPatch = serde_json::from_str(text)?;
        Ok(Self::default().merged(patch))
    }

    pub fn find_entry(&self, entry: &Entry) -> Option<usize> {
        self.entries.iter().position(|candidate| candidate == entry)
    }

    pub fn group_shortcut(&self, group: &str) -> Option<&str> {
        self.settings
            .group_shortcuts
            .get(group)
            .map(String::as_str)
            .filter(|shortcut| !shortcut.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub always_on_top: bool,
    pub group_order: Vec<String>,
    pub window_geometry: WindowGeometry,
    pub group_shortcuts: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            always_on_top: true,
            group_order: vec![HOME_GROUP.to_string()],
            window_geometry: WindowGeometry::default(),
            group_shortcuts: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Recursive merge: nested records keep default keys the patch does not mention.
    pub fn merge(&mut self, patch: SettingsPatch) {
        if let Some(always_on_top) = patch.always_on_top {
            self.always_on_top = always_on_top;
        }
        if let Some(group_order) = patch.group_order {
            self.group_order = group_order;
        }
        if let Some(geometry) = patch.window_geometry {
            self.window_geometry.merge(geometry);
        }
        if let Some(shortcuts) = patch.group_shortcuts {
            self.group_shortcuts.extend(shortcuts);
        }
        self.extra.extend(patch.extra);
    }

    /// Assign one key. Known keys must hold their own type; anything else is stored
    /// alongside them.
    pub fn set_value(&mut self, key: &str, value: Value) -> serde_json::Result<()> {
        match key {
            "always_on_top" => self.always_on_top = serde_json::from_value(value)?,
            "group_order" => self.group_order = serde_json::from_value(value)?,
            "window_geometry" => self.window_geometry = serde_json::from_value(value)?,
            "group_shortcuts" => self.group_shortcuts = serde_json::from_value(value)?,
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }
}

/// Last window placement. Any subset of the coordinates may be known; an empty record
/// means the window has never been placed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowGeometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WindowGeometry {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            w: Some(w),
            h: Some(h),
            extra: Map::new(),
        }
    }

    /// The full rectangle, when all four coordinates are known.
    pub fn rect(&self) -> Option<(i32, i32, i32, i32)> {
        Some((self.x?, self.y?, self.w?, self.h?))
    }

    fn merge(&mut self, patch: WindowGeometry) {
        self.x = patch.x.or(self.x);
        self.y = patch.y.or(self.y);
        self.w = patch.w.or(self.w);
        self.h = patch.h.or(self.h);
        self.extra.extend(patch.extra);
    }
}

/// A launchable item. Entries carry no identifier; they are located by value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default, alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub shortcut: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    pub fn new(name: impl Into<String>, group: impl Into<String>, action: impl Into<String>) -> Self {
        let mut entry = Self {
            name: name.into(),
            group: group.into(),
            kind: DEFAULT_ENTRY_KIND.to_string(),
            action: action.into(),
            ..Self::default()
        };
        entry.normalize_group();
        entry
    }

    /// Group the entry is displayed under; blank groups fold into [`HOME_GROUP`].
    pub fn group_name(&self) -> &str {
        group_or_home(&self.group)
    }

    pub fn normalize_group(&mut self) {
        let trimmed = self.group.trim();
        self.group = if trimmed.is_empty() {
            HOME_GROUP.to_string()
        } else {
            trimmed.to_string()
        };
    }

    /// Build an entry field by field. A known field of the wrong type is reset to its
    /// default; the entry itself is always kept.
    fn from_object(mut object: Map<String, Value>) -> Self {
        let name = take_string(&mut object, "name");
        let group = take_string(&mut object, "group");
        let kind = if object.contains_key("kind") {
            take_string(&mut object, "kind")
        } else {
            take_string(&mut object, "type")
        };
        let action = take_string(&mut object, "action");
        let icon = take_string(&mut object, "icon");
        let shortcut = take_string(&mut object, "shortcut");
        Self {
            name,
            group,
            kind,
            action,
            icon,
            shortcut,
            extra: object,
        }
    }
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> String {
    match object.remove(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => {
            tracing::warn!(field = key, value = %other, "resetting malformed entry field");
            String::new()
        }
    }
}

pub fn group_or_home(group: &str) -> &str {
    if group.trim().is_empty() {
        HOME_GROUP
    } else {
        group
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub settings: Option<SettingsPatch>,
    #[serde(default, alias = "apps", deserialize_with = "lenient_entries")]
    pub entries: Option<Vec<Entry>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub always_on_top: Option<bool>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub group_order: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_geometry")]
    pub window_geometry: Option<WindowGeometry>,
    #[serde(default, deserialize_with = "lenient_shortcuts")]
    pub group_shortcuts: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A known field holding the wrong JSON type falls back to its default instead of
/// failing the whole document.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            tracing::warn!(error = %err, "ignoring malformed document field");
            Ok(None)
        }
    }
}

fn lenient_entries<'de, D>(deserializer: D) -> Result<Option<Vec<Entry>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        tracing::warn!("ignoring entry list that is not an array");
        return Ok(None);
    };
    let entries = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(object) => Some(Entry::from_object(object)),
            other => {
                tracing::warn!(value = %other, "dropping entry that is not an object");
                None
            }
        })
        .collect();
    Ok(Some(entries))
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        tracing::warn!("ignoring group order that is not an array");
        return Ok(None);
    };
    let names = items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name),
            other => {
                tracing::warn!(value = %other, "skipping malformed group name");
                None
            }
        })
        .collect();
    Ok(Some(names))
}

fn lenient_shortcuts<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(bindings) = Value::deserialize(deserializer)? else {
        tracing::warn!("ignoring group shortcuts that are not an object");
        return Ok(None);
    };
    let shortcuts = bindings
        .into_iter()
        .filter_map(|(group, shortcut)| match shortcut {
            Value::String(shortcut) => Some((group, shortcut)),
            other => {
                tracing::warn!(group = group.as_str(), value = %other, "skipping malformed group shortcut");
                None
            }
        })
        .collect();
    Ok(Some(shortcuts))
}

fn lenient_geometry<'de, D>(deserializer: D) -> Result<Option<WindowGeometry>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(mut object) = Value::deserialize(deserializer)? else {
        tracing::warn!("ignoring window geometry that is not an object");
        return Ok(None);
    };
    let mut coordinate = |key: &str| -> Option<i32> {
        let value = object.remove(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(field = key, value = %value, "ignoring malformed window coordinate");
                None
            }
        }
    };
    let (x, y, w, h) = (coordinate("x"), coordinate("y"), coordinate("w"), coordinate("h"));
    Ok(Some(WindowGeometry {
        x,
        y,
        w,
        h,
        extra: object,
    }))
}
