//! Conversion of vendor scene dumps into catalog files.
//!
//! The vendor API returns one JSON document per model with categories,
//! scenes, and light effects, each carrying many fields of unknown meaning.
//! Only the fields needed to activate a scene are kept:
//!
//! | Vendor field | Catalog field |
//! |--------------|---------------|
//! | `sceneCode` | `code` |
//! | `scenceParam` | `param` |
//! | `diyEffectCode[0]` | `diyCode` |
//! | `diyEffectStr` | `diyParam` |
//! | `rules[]` | `rules[]` (rules naming at least one version) |
//! | `specialEffect[]` | `special[]` (`scenceParamId`, `scenceParam`, speed config) |
//! | `scenesHint` | `hint` |
//!
//! The misspellings are the vendor's.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use govee_core::scenes::{
    CatalogFile, EffectRule, Ordered, SceneEffect, SceneEntry, SpecialEffect,
};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct VendorRoot {
    pub data: VendorData,
}

#[derive(Debug, Deserialize)]
pub struct VendorData {
    #[serde(default)]
    pub categories: Vec<VendorCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorCategory {
    pub category_name: String,
    #[serde(default)]
    pub scenes: Vec<VendorScene>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorScene {
    pub scene_name: String,
    #[serde(default)]
    pub scenes_hint: String,
    #[serde(default)]
    pub light_effects: Vec<VendorEffect>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorEffect {
    #[serde(default)]
    pub scene_code: u16,
    #[serde(default)]
    pub scence_param: String,
    #[serde(default)]
    pub diy_effect_code: Vec<u16>,
    #[serde(default)]
    pub diy_effect_str: String,
    #[serde(default)]
    pub rules: Vec<VendorRule>,
    #[serde(default)]
    pub special_effect: Vec<VendorSpecial>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRule {
    #[serde(default)]
    pub hard_version: String,
    #[serde(default)]
    pub soft_version: String,
    #[serde(default)]
    pub wifi_soft_version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSpecial {
    pub scence_param_id: u16,
    #[serde(default)]
    pub scence_param: String,
    #[serde(default)]
    pub speed_info: VendorSpeed,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSpeed {
    #[serde(default)]
    pub config: String,
    #[serde(default)]
    pub sup_speed: bool,
}

fn decode(param: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(param.trim())
        .with_context(|| format!("Invalid base64 parameter {:?}", param))
}

fn special(special: &VendorSpecial) -> Result<SpecialEffect> {
    let speed = if special.speed_info.sup_speed {
        Some(
            serde_json::from_str(&special.speed_info.config)
                .context("Invalid speed configuration")?,
        )
    } else {
        None
    };
    Ok(SpecialEffect {
        code: special.scence_param_id,
        param: decode(&special.scence_param)?,
        speed,
    })
}

fn effect(effect: &VendorEffect) -> Result<SceneEffect> {
    Ok(SceneEffect {
        code: effect.scene_code,
        param: decode(&effect.scence_param)?,
        diy_code: effect.diy_effect_code.first().copied().unwrap_or(0),
        diy_param: decode(&effect.diy_effect_str)?,
        rules: effect
            .rules
            .iter()
            .filter(|rule| {
                !(rule.hard_version.is_empty()
                    && rule.soft_version.is_empty()
                    && rule.wifi_soft_version.is_empty())
            })
            .map(|rule| EffectRule {
                hard_version: rule.hard_version.clone(),
                soft_version: rule.soft_version.clone(),
                wifi_soft_version: rule.wifi_soft_version.clone(),
            })
            .collect(),
        special: effect
            .special_effect
            .iter()
            .map(special)
            .collect::<Result<_>>()?,
    })
}

fn scene(scene: &VendorScene) -> Result<SceneEntry> {
    let effects = scene
        .light_effects
        .iter()
        .map(effect)
        .collect::<Result<_>>()
        .with_context(|| format!("Scene {:?}", scene.scene_name))?;
    Ok(SceneEntry {
        effects,
        hint: (!scene.scenes_hint.is_empty()).then(|| scene.scenes_hint.clone()),
    })
}

/// Convert one model's vendor dump into a catalog file.
///
/// Duplicate category or scene names keep the first occurrence; later ones
/// are logged and dropped.
pub fn consolidate(model: &str, root: &VendorRoot) -> Result<CatalogFile> {
    let mut categories: Vec<(String, Ordered<SceneEntry>)> = Vec::new();

    for category in &root.data.categories {
        let title = &category.category_name;
        if categories.iter().any(|(name, _)| name == title) {
            warn!("{} duplicates category {:?}, keeping the first", model, title);
            continue;
        }

        let mut scenes: Vec<(String, SceneEntry)> = Vec::new();
        for vendor_scene in &category.scenes {
            let name = &vendor_scene.scene_name;
            if scenes.iter().any(|(existing, _)| existing == name) {
                warn!(
                    "{} duplicates scene {:?} in category {:?}, keeping the first",
                    model, name, title
                );
                continue;
            }
            scenes.push((name.clone(), scene(vendor_scene)?));
        }

        categories.push((title.clone(), Ordered(scenes)));
    }

    Ok(Ordered(categories))
}

/// Parse a vendor dump and convert it.
pub fn consolidate_json(model: &str, text: &str) -> Result<CatalogFile> {
    let root: VendorRoot = serde_json::from_str(text).context("Invalid vendor dump")?;
    consolidate(model, &root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use govee_core::{SceneCatalog, SceneQuery};

    const DUMP: &str = r#"{
        "message": "success",
        "status": 200,
        "data": {
            "supportSpeed": 0,
            "categories": [
                {
                    "categoryId": 1,
                    "categoryName": "Natural",
                    "scenes": [
                        {
                            "sceneId": 10,
                            "sceneName": "Sunrise",
                            "analyticName": "Sunrise",
                            "iconUrls": ["https://example.invalid/icon.png"],
                            "scenesHint": "Slowly brightens",
                            "voiceUrl": "",
                            "lightEffects": [
                                {
                                    "scenceParamId": 1,
                                    "scenceName": "",
                                    "scenceParam": "AQID",
                                    "sceneCode": 10191,
                                    "cmdVersion": 0,
                                    "sceneType": 1,
                                    "diyEffectCode": [],
                                    "diyEffectStr": "",
                                    "rules": [
                                        { "key": 0, "hardVersion": "1.00.01", "softVersion": "", "wifiSoftVersion": "" }
                                    ],
                                    "specialEffect": [
                                        {
                                            "scenceParamId": 77,
                                            "scenceParam": "Bg==",
                                            "cmdVersion": 0,
                                            "supportSku": ["H6199"],
                                            "speedInfo": { "config": "[{\"page\":1}]", "speedIndex": 0, "supSpeed": true }
                                        }
                                    ]
                                }
                            ]
                        },
                        {
                            "sceneName": "Sunrise",
                            "lightEffects": [{ "sceneCode": 999, "scenceParam": "" }]
                        }
                    ]
                },
                {
                    "categoryName": "Life",
                    "scenes": [
                        {
                            "sceneName": "Movie",
                            "scenesHint": "",
                            "lightEffects": [
                                { "sceneCode": 20, "scenceParam": "", "diyEffectCode": [7], "diyEffectStr": "BQ==" }
                            ]
                        }
                    ]
                },
                {
                    "categoryName": "Natural",
                    "scenes": [{ "sceneName": "Rain", "lightEffects": [] }]
                }
            ]
        }
    }"#;

    #[test]
    fn test_consolidate_keeps_needed_fields() {
        let file = consolidate_json("H6199", DUMP).unwrap();
        assert_eq!(file.len(), 2);

        let (title, natural) = &file.0[0];
        assert_eq!(title, "Natural");
        assert_eq!(natural.len(), 1);

        let (name, sunrise) = &natural.0[0];
        assert_eq!(name, "Sunrise");
        assert_eq!(sunrise.hint.as_deref(), Some("Slowly brightens"));
        let effect = &sunrise.effects[0];
        assert_eq!(effect.code, 10191);
        assert_eq!(effect.param, vec![1, 2, 3]);
        assert_eq!(effect.rules[0].hard_version, "1.00.01");
        assert!(effect.rules[0].soft_version.is_empty());
        assert_eq!(effect.special[0].code, 77);
        assert_eq!(effect.special[0].param, vec![6]);
        assert!(effect.special[0].speed.is_some());

        let (_, life) = &file.0[1];
        let (_, movie) = &life.0[0];
        assert_eq!(movie.hint, None);
        assert_eq!(movie.effects[0].diy_code, 7);
        assert_eq!(movie.effects[0].diy_param, vec![5]);
    }

    #[test]
    fn test_output_loads_as_catalog() {
        let file = consolidate_json("H6199", DUMP).unwrap();
        let text = serde_json::to_string(&file).unwrap();
        assert!(!text.contains("analyticName"));

        let catalog = SceneCatalog::from_json(&text).unwrap();
        assert_eq!(catalog.len(), 2);
        let scene = catalog.get(&SceneQuery::from("sunrise")).unwrap();
        assert_eq!(scene.primary().unwrap().code, 10191);
        assert!(catalog.get(&SceneQuery::Code(999)).is_none());
    }

    #[test]
    fn test_rules_without_versions_are_dropped() {
        let dump = r#"{ "data": { "categories": [ { "categoryName": "A", "scenes": [
            { "sceneName": "Glow", "lightEffects": [{ "sceneCode": 5, "scenceParam": "", "rules": [
                { "key": 0, "hardVersion": "", "softVersion": "", "wifiSoftVersion": "" },
                { "key": 1, "softVersion": "1.02.03" }
            ] }] }
        ] } ] } }"#;
        let file = consolidate_json("H6199", dump).unwrap();
        let (_, category) = &file.0[0];
        let (_, glow) = &category.0[0];
        let effect = &glow.effects[0];
        assert_eq!(effect.rules.len(), 1);
        assert_eq!(effect.rules[0].soft_version, "1.02.03");

        let text = serde_json::to_string(&file).unwrap();
        assert!(!text.contains("{}"), "{}", text);
    }

    #[test]
    fn test_invalid_param_is_reported() {
        let dump = r#"{ "data": { "categories": [ { "categoryName": "A", "scenes": [
            { "sceneName": "Bad", "lightEffects": [{ "sceneCode": 1, "scenceParam": "!!" }] }
        ] } ] } }"#;
        let err = consolidate_json("H6199", dump).unwrap_err();
        assert!(format!("{:#}", err).contains("Bad"));
    }
}
