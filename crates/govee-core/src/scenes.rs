//! Scene tables and the per-model scene catalog.
//!
//! Two sources of scene information exist:
//!
//! - Static tables of the ids every light in the family understands
//!   ([`SCENE_ID`], [`MUSIC_ID`], [`STYLE_ID`], [`MODE_ID`]).
//! - A per-model catalog file (`<scene_dir>/<model>.json`) with the raw effect
//!   parameters a scene needs before it can be activated. The file is produced
//!   from vendor data by the `govee consolidate` command.
//!
//! Catalog file layout:
//!
//! ```json
//! {
//!   "Natural": {
//!     "Sunrise": {
//!       "effects": [{ "code": 10191, "param": "EgAAAAAh..." }],
//!       "hint": "Slowly brightens"
//!     }
//!   }
//! }
//! ```
//!
//! Names are matched after canonicalization (lower case, non-word characters
//! removed), so `"Sun Rise!"` and `"sunrise"` are the same scene.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

/// Scene ids understood by every light, by name.
pub static SCENE_ID: LazyLock<HashMap<&'static str, u16>> = LazyLock::new(|| {
    HashMap::from([
        ("sunrise", 0x00),
        ("sunset", 0x01),
        ("movie", 0x04),
        ("dating", 0x05),
        ("romantic", 0x07),
        ("illumination", 0x3F),
        ("cheerful", 0x40),
    ])
});

/// Reverse of [`SCENE_ID`].
pub static SCENE_NAME: LazyLock<HashMap<u16, &'static str>> =
    LazyLock::new(|| SCENE_ID.iter().map(|(name, id)| (*id, *name)).collect());

/// Music mode ids. Cataloged only; music modes are not decoded.
pub static MUSIC_ID: LazyLock<HashMap<&'static str, u8>> = LazyLock::new(|| {
    HashMap::from([
        ("energetic", 0),
        ("spectrum", 1),
        ("rolling", 2),
        ("rhythm", 3),
    ])
});

/// Style-cycle ids. Cataloged only.
pub static STYLE_ID: LazyLock<HashMap<&'static str, u8>> = LazyLock::new(|| {
    HashMap::from([
        ("fade", 0),
        ("jumping", 1),
        ("flicker", 2),
        ("marquee", 3),
        ("music", 4),
    ])
});

/// Style-cycle sub-mode ids. Cataloged only.
pub static MODE_ID: LazyLock<HashMap<&'static str, u8>> = LazyLock::new(|| {
    HashMap::from([
        ("whole", 0),
        ("subsection", 1),
        ("circulation", 2),
        ("straight", 3),
        ("gathered", 4),
        ("dispersive", 5),
        ("spectrum", 6),
        ("rolling", 7),
        ("rhythm", 8),
    ])
});

/// Name of a built-in scene code, if it has one.
#[must_use]
pub fn scene_name(code: u16) -> Option<&'static str> {
    SCENE_NAME.get(&code).copied()
}

/// Code of a built-in scene matching `query`.
#[must_use]
pub fn builtin_scene(query: &SceneQuery) -> Option<u16> {
    match query {
        SceneQuery::Code(code) => SCENE_NAME.contains_key(code).then_some(*code),
        SceneQuery::Name(name) => SCENE_ID.get(canonical(name).as_str()).copied(),
    }
}

/// Canonical form of a category or scene title.
///
/// ```
/// use govee_core::scenes::canonical;
///
/// assert_eq!(canonical("Sun Rise!"), "sunrise");
/// assert_eq!(canonical("Night_Light 2"), "night_light2");
/// ```
#[must_use]
pub fn canonical(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// A string-keyed map that keeps file order and duplicate keys.
///
/// Serializes as a JSON object. Deserializing never merges duplicates, so the
/// catalog can decide which one wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordered<T>(pub Vec<(String, T)>);

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Ordered<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Serialize> Serialize for Ordered<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = Ordered<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, T)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry()? {
                    entries.push((key, value));
                }
                Ok(Ordered(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// Serde adapter for byte strings stored as standard base64.
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| serde::de::Error::custom(format!("Invalid base64: {e}")))
    }
}

fn is_zero(value: &u16) -> bool {
    *value == 0
}

/// Firmware versions an effect applies to. Empty strings mean "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectRule {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hard_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub soft_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub wifi_soft_version: String,
}

/// A speed-parameterized variant of an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialEffect {
    pub code: u16,
    #[serde(with = "base64_bytes")]
    pub param: Vec<u8>,
    /// Vendor speed configuration, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<serde_json::Value>,
}

/// One way of rendering a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneEffect {
    /// Scene code written to the mode register.
    #[serde(default)]
    pub code: u16,
    /// Raw parameter bytes sent as a multi-part write before the mode write.
    #[serde(with = "base64_bytes")]
    pub param: Vec<u8>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub diy_code: u16,
    #[serde(
        default,
        with = "base64_bytes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub diy_param: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<EffectRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub special: Vec<SpecialEffect>,
}

/// A scene as stored in a catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntry {
    pub effects: Vec<SceneEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Top level of a catalog file: category title → scene title → scene.
pub type CatalogFile = Ordered<Ordered<SceneEntry>>;

/// A cataloged scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Scene title as written in the catalog.
    pub title: String,
    /// Title of the category the scene belongs to.
    pub category: String,
    pub effects: Vec<SceneEffect>,
    pub hint: String,
}

impl Scene {
    /// The effect used when activating the scene.
    #[must_use]
    pub fn primary(&self) -> Option<&SceneEffect> {
        self.effects.first()
    }

    /// Compact description of the scene's codes.
    #[must_use]
    pub fn summary(&self) -> SceneSummary {
        let mut effects: Vec<_> = self.effects.iter().map(EffectSummary::from).collect();
        if effects.len() == 1 {
            SceneSummary::One(effects.remove(0))
        } else {
            SceneSummary::Many(effects)
        }
    }
}

/// Codes of one effect in a catalog summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EffectSummary {
    Code(u16),
    Diy { code: u16, diy: u16 },
}

impl From<&SceneEffect> for EffectSummary {
    fn from(effect: &SceneEffect) -> Self {
        if effect.diy_code != 0 {
            EffectSummary::Diy {
                code: effect.code,
                diy: effect.diy_code,
            }
        } else {
            EffectSummary::Code(effect.code)
        }
    }
}

/// Codes of a scene in a catalog summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SceneSummary {
    One(EffectSummary),
    Many(Vec<EffectSummary>),
}

/// Catalog summary: category title → scene title → codes.
pub type CatalogSummary = Ordered<Ordered<SceneSummary>>;

#[derive(Debug, Clone)]
struct Category {
    title: String,
    scenes: Vec<Arc<Scene>>,
    by_name: HashMap<String, Arc<Scene>>,
}

/// What to look a scene up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneQuery {
    /// Scene code as written to the mode register.
    Code(u16),
    /// Scene name, or `category-scene`.
    Name(String),
}

impl From<u16> for SceneQuery {
    fn from(code: u16) -> Self {
        SceneQuery::Code(code)
    }
}

impl From<&str> for SceneQuery {
    fn from(name: &str) -> Self {
        SceneQuery::Name(name.to_string())
    }
}

impl From<String> for SceneQuery {
    fn from(name: String) -> Self {
        SceneQuery::Name(name)
    }
}

impl fmt::Display for SceneQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneQuery::Code(code) => write!(f, "0x{:04x}", code),
            SceneQuery::Name(name) => f.write_str(name),
        }
    }
}

/// Read-only scene lookup for one light model.
#[derive(Debug, Clone, Default)]
pub struct SceneCatalog {
    categories: Vec<Category>,
    by_category: HashMap<String, usize>,
    by_name: HashMap<String, Arc<Scene>>,
    by_code: HashMap<u16, Arc<Scene>>,
}

impl SceneCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a catalog file, falling back to an empty catalog with a warning.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Scene info not found: {} ({})", path.display(), e);
                return Self::empty();
            }
        };
        match Self::from_json(&text) {
            Ok(catalog) => {
                debug!(
                    "Loaded {} scenes in {} categories from {}",
                    catalog.by_name.len(),
                    catalog.categories.len(),
                    path.display()
                );
                catalog
            }
            Err(e) => {
                warn!("Scene info not valid JSON: {} ({})", path.display(), e);
                Self::empty()
            }
        }
    }

    /// Parse catalog JSON.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let file: CatalogFile = serde_json::from_str(text)?;
        Ok(Self::from_file(file))
    }

    /// Build the lookup indexes from a parsed catalog file.
    ///
    /// Duplicate titles (after canonicalization) keep the first entry.
    #[must_use]
    pub fn from_file(file: CatalogFile) -> Self {
        let mut catalog = Self::empty();

        for (cat_title, scenes) in file.0 {
            let cat_name = canonical(&cat_title);
            if catalog.by_category.contains_key(&cat_name) {
                warn!("Duplicate scene category {:?} ignored", cat_title);
                continue;
            }

            let mut category = Category {
                title: cat_title.clone(),
                scenes: Vec::new(),
                by_name: HashMap::new(),
            };
            for (scene_title, entry) in scenes.0 {
                let scene_name = canonical(&scene_title);
                if category.by_name.contains_key(&scene_name) {
                    warn!(
                        "Duplicate scene {:?} in category {:?} ignored",
                        scene_title, cat_title
                    );
                    continue;
                }

                let scene = Arc::new(Scene {
                    title: scene_title,
                    category: cat_title.clone(),
                    effects: entry.effects,
                    hint: entry.hint.unwrap_or_default(),
                });

                if catalog.by_name.contains_key(&scene_name) {
                    warn!(
                        "Scene {:?} also in an earlier category; use {}-{} to select it",
                        scene.title, cat_name, scene_name
                    );
                } else {
                    catalog.by_name.insert(scene_name.clone(), Arc::clone(&scene));
                }

                for effect in &scene.effects {
                    if effect.code != 0 {
                        catalog
                            .by_code
                            .entry(effect.code)
                            .or_insert_with(|| Arc::clone(&scene));
                    }
                }

                category.by_name.insert(scene_name, Arc::clone(&scene));
                category.scenes.push(scene);
            }

            catalog.by_category.insert(cat_name, catalog.categories.len());
            catalog.categories.push(category);
        }

        catalog
    }

    /// Look up a scene by code, name, or `category-scene`.
    ///
    /// A name containing `-` is tried as `category-scene` first and then as a
    /// plain scene name.
    #[must_use]
    pub fn get(&self, query: &SceneQuery) -> Option<&Arc<Scene>> {
        match query {
            SceneQuery::Code(code) => self.by_code.get(code),
            SceneQuery::Name(name) => {
                if let Some((cat, scene)) = name.split_once('-') {
                    let found = self
                        .by_category
                        .get(&canonical(cat))
                        .and_then(|&i| self.categories[i].by_name.get(&canonical(scene)));
                    if found.is_some() {
                        return found;
                    }
                }
                self.by_name.get(&canonical(name))
            }
        }
    }

    /// Number of distinct scenes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.scenes.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Category titles in file order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.title.as_str())
    }

    /// Every scene in file order.
    pub fn scenes(&self) -> impl Iterator<Item = &Arc<Scene>> {
        self.categories.iter().flat_map(|c| c.scenes.iter())
    }

    /// Category → scene → codes, in file order.
    #[must_use]
    pub fn summary(&self) -> CatalogSummary {
        Ordered(
            self.categories
                .iter()
                .map(|category| {
                    let scenes: Vec<_> = category
                        .scenes
                        .iter()
                        .map(|scene| (scene.title.clone(), scene.summary()))
                        .collect();
                    (category.title.clone(), Ordered(scenes))
                })
                .collect(),
        )
    }
}
