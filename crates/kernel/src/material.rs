use std::collections::BTreeMap;

use labscene_common::MaterialTag;
use serde::{Deserialize, Serialize};

/// Friction and restitution used when two materials touch.
///
/// Both coefficients live in `[0, 1]`; constructors clamp anything else.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl ContactMaterial {
    pub const FRICTIONLESS: Self = Self {
        friction: 0.0,
        restitution: 0.0,
    };

    /// Material with both coefficients clamped to `[0, 1]`.
    pub fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction: clamp_unit(friction),
            restitution: clamp_unit(restitution),
        }
    }

    /// Same coefficients forced into range.
    pub fn clamped(self) -> Self {
        Self::new(self.friction, self.restitution)
    }
}

/// Non-finite input becomes 0.
fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Symmetric lookup table of contact materials keyed by pairs of tags.
///
/// Pairs that were never registered resolve to the table's default, so
/// bodies may be added before their material is known.
#[derive(Debug, Clone, Default)]
pub struct ContactMaterialTable {
    default: ContactMaterial,
    pairs: BTreeMap<MaterialTag, BTreeMap<MaterialTag, ContactMaterial>>,
}

impl ContactMaterialTable {
    /// Empty table falling back to `default`.
    pub fn new(default: ContactMaterial) -> Self {
        Self {
            default: default.clamped(),
            pairs: BTreeMap::new(),
        }
    }

    /// Material for unregistered pairs.
    pub fn default_material(&self) -> ContactMaterial {
        self.default
    }

    pub fn set_default(&mut self, material: ContactMaterial) {
        self.default = material.clamped();
    }

    /// Register (or replace) the material for `{a, b}`. Returns the stored,
    /// clamped value.
    pub fn register(
        &mut self,
        a: &MaterialTag,
        b: &MaterialTag,
        friction: f32,
        restitution: f32,
    ) -> ContactMaterial {
        let material = ContactMaterial::new(friction, restitution);
        if material.friction != friction || material.restitution != restitution {
            tracing::debug!(
                %a, %b, friction, restitution,
                clamped_friction = material.friction,
                clamped_restitution = material.restitution,
                "contact material clamped to [0, 1]"
            );
        }
        self.pairs
            .entry(a.clone())
            .or_default()
            .insert(b.clone(), material);
        self.pairs
            .entry(b.clone())
            .or_default()
            .insert(a.clone(), material);
        material
    }

    /// Material for the pair, falling back to the default.
    pub fn lookup(&self, a: &str, b: &str) -> ContactMaterial {
        self.get(a, b).unwrap_or(self.default)
    }

    /// Explicitly registered material for the pair, if any.
    pub fn get(&self, a: &str, b: &str) -> Option<ContactMaterial> {
        self.pairs.get(a).and_then(|row| row.get(b)).copied()
    }

    /// Number of distinct registered pairs.
    pub fn len(&self) -> usize {
        self.pairs
            .iter()
            .flat_map(|(a, row)| row.keys().map(move |b| (a, b)))
            .filter(|(a, b)| a <= b)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> MaterialTag {
        MaterialTag::new(s)
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let m = ContactMaterial::new(1.7, -0.2);
        assert_eq!(m.friction, 1.0);
        assert_eq!(m.restitution, 0.0);
        let nan = ContactMaterial::new(f32::NAN, f32::INFINITY);
        assert_eq!(nan, ContactMaterial::FRICTIONLESS);
    }

    #[test]
    fn register_clamps_silently() {
        let mut table = ContactMaterialTable::default();
        let stored = table.register(&tag("ice"), &tag("steel"), 3.0, 2.0);
        assert_eq!(stored, ContactMaterial::new(1.0, 1.0));
        assert_eq!(table.lookup("ice", "steel"), stored);
    }

    #[test]
    fn lookup_is_symmetric() {
        let mut table = ContactMaterialTable::default();
        table.register(&tag("rubber"), &tag("floor"), 0.8, 0.4);
        assert_eq!(table.lookup("floor", "rubber"), table.lookup("rubber", "floor"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unknown_pair_falls_back_to_default() {
        let table = ContactMaterialTable::new(ContactMaterial::new(0.1, 0.6));
        assert_eq!(table.get("a", "b"), None);
        assert_eq!(table.lookup("a", "b"), ContactMaterial::new(0.1, 0.6));
    }

    #[test]
    fn default_table_is_frictionless() {
        let table = ContactMaterialTable::default();
        assert_eq!(table.default_material(), ContactMaterial::FRICTIONLESS);
        assert!(table.is_empty());
    }

    #[test]
    fn reregistering_replaces_pair() {
        let mut table = ContactMaterialTable::default();
        table.register(&tag("a"), &tag("a"), 0.1, 0.1);
        table.register(&tag("a"), &tag("a"), 0.5, 0.5);
        assert_eq!(table.lookup("a", "a"), ContactMaterial::new(0.5, 0.5));
        assert_eq!(table.len(), 1);
    }
}
