//! Entity templates: nested attribute sets composed by recursive override
//!
//! A template is stored as raw JSON so that several can be layered
//! ("human" + "zombie"): nested objects merge key-wise, leaf values are
//! overridden by the later template. The merged value then deserializes
//! into [`TemplateData`].

use crate::combat::attack::{MeleeAttack, RangedAttack};
use crate::core::error::{CoreError, Result};
use crate::core::types::Glyph;
use crate::entity::body::Bodyplan;
use ahash::AHashMap;
use serde::Deserialize;
use serde_json::Value;

/// Base stats block
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Attributes {
    pub size: i32,
    #[serde(rename = "ST")]
    pub st: i32,
    #[serde(rename = "HT")]
    pub ht: i32,
    #[serde(rename = "DX")]
    pub dx: i32,
    #[serde(rename = "IQ")]
    pub iq: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            size: 0,
            st: 10,
            ht: 10,
            dx: 10,
            iq: 10,
        }
    }
}

/// Closed set of optional modifiers. Absent fields keep their default,
/// which is always "no effect".
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Traits {
    /// Added to derived speed
    pub speed_boost: f32,
    /// The entity never moves on its own
    pub immobile: bool,
    /// Degrees of resistance to piercing wounds
    pub injury_tolerance: i32,
    /// Flat addition to maximum hit points
    pub extra_hp: i32,
}

/// Display block of a template
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayDef {
    pub character: char,
    pub fg: [u8; 3],
    pub bg: [u8; 3],
}

impl Default for DisplayDef {
    fn default() -> Self {
        Self {
            character: '*',
            fg: [255, 255, 255],
            bg: [0, 0, 0],
        }
    }
}

impl DisplayDef {
    pub fn glyph(&self) -> Glyph {
        Glyph::new(self.character, self.fg, self.bg)
    }
}

/// Fully merged template, ready to initialize an entity
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateData {
    pub attribute: Attributes,
    #[serde(rename = "trait")]
    pub traits: Traits,
    pub bodyplan: Bodyplan,
    pub factions: Vec<String>,
    /// Material name, resolved against the material library
    pub material: Option<String>,
    pub melee_attacks: Vec<MeleeAttack>,
    pub ranged_attacks: Vec<RangedAttack>,
    pub display: DisplayDef,
    /// Whether spawned instances get a decision engine
    pub mind: bool,
}

impl Default for TemplateData {
    fn default() -> Self {
        Self {
            attribute: Attributes::default(),
            traits: Traits::default(),
            bodyplan: Bodyplan::SimpleMass,
            factions: Vec::new(),
            material: None,
            melee_attacks: Vec::new(),
            ranged_attacks: Vec::new(),
            display: DisplayDef::default(),
            mind: false,
        }
    }
}

/// Merge `overlay` into `base`: objects merge key-wise, everything else
/// is replaced by the overlay's value.
pub fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                merge(base_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Named raw templates loaded from data files
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: AHashMap<String, Value>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every template in a JSON object of `name -> template`.
    pub fn load(&mut self, text: &str) -> Result<()> {
        let parsed: AHashMap<String, Value> = serde_json::from_str(text)?;
        self.templates.extend(parsed);
        Ok(())
    }

    pub fn insert(&mut self, name: &str, template: Value) {
        self.templates.insert(name.to_string(), template);
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        self.templates
            .get(name)
            .ok_or_else(|| CoreError::UnknownTemplate(name.to_string()))
    }

    /// Layer the named templates left to right and deserialize.
    pub fn compose(&self, names: &[&str]) -> Result<TemplateData> {
        let mut merged = Value::Object(Default::default());
        for name in names {
            merge(&mut merged, self.get(name)?);
        }
        serde_json::from_value(merged).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_overrides_leaves() {
        let mut base = json!({"attribute": {"ST": 10, "HT": 10}});
        merge(&mut base, &json!({"attribute": {"ST": 14}}));
        assert_eq!(base["attribute"]["ST"], 14);
        assert_eq!(base["attribute"]["HT"], 10);
    }

    #[test]
    fn test_merge_replaces_arrays_whole() {
        let mut base = json!({"factions": ["wildlife"]});
        merge(&mut base, &json!({"factions": ["monster"]}));
        assert_eq!(base["factions"], json!(["monster"]));
    }

    #[test]
    fn test_compose_human_zombie() {
        let mut library = TemplateLibrary::new();
        library.insert(
            "human",
            json!({
                "attribute": {"ST": 10, "DX": 11},
                "bodyplan": "humanoid",
                "mind": true,
                "display": {"character": "@"}
            }),
        );
        library.insert(
            "zombie",
            json!({
                "attribute": {"IQ": 4},
                "trait": {"speed_boost": -1.0, "injury_tolerance": 1},
                "factions": ["monster"],
                "display": {"character": "z", "fg": [100, 200, 100]}
            }),
        );

        let data = library.compose(&["human", "zombie"]).unwrap();
        assert_eq!(data.attribute.st, 10);
        assert_eq!(data.attribute.dx, 11);
        assert_eq!(data.attribute.iq, 4);
        assert_eq!(data.bodyplan, Bodyplan::Humanoid);
        assert_eq!(data.traits.injury_tolerance, 1);
        assert_eq!(data.factions, vec!["monster"]);
        assert_eq!(data.display.character, 'z');
        assert!(data.mind);
    }

    #[test]
    fn test_unknown_template_is_typed_error() {
        let library = TemplateLibrary::new();
        assert!(matches!(
            library.compose(&["ghost"]),
            Err(CoreError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_defaults_cover_sparse_templates() {
        let mut library = TemplateLibrary::new();
        library.insert("rock", json!({"display": {"character": "."}}));
        let data = library.compose(&["rock"]).unwrap();
        assert_eq!(data.attribute.st, 10);
        assert_eq!(data.bodyplan, Bodyplan::SimpleMass);
        assert!(!data.mind);
        assert!(data.melee_attacks.is_empty());
    }
}
