//! Preset catalog and the roles recipes use to address their layers.

use crate::ImageEffectError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Preset {
    Amaro = 0,
    Apollo = 1,
    Brannan = 2,
    Earlybird = 3,
    Gotham = 4,
    Inkwell = 5,
    LordKelvin = 6,
    Poprocket = 7,
    Rise = 8,
    Toaster = 9,
    Valencia = 10,
    Walden = 11,
}

/// (preset, identifier, label) in catalog order.
static CATALOG: [(Preset, &str, &str); 12] = [
    (Preset::Amaro, "AMARO", "Amaro"),
    (Preset::Apollo, "APOLLO", "Apollo"),
    (Preset::Brannan, "BRANNAN", "Brannan"),
    (Preset::Earlybird, "EARLYBIRD", "Earlybird"),
    (Preset::Gotham, "GOTHAM", "Gotham"),
    (Preset::Inkwell, "INKWELL", "Inkwell"),
    (Preset::LordKelvin, "LORDKELVIN", "Lord Kelvin"),
    (Preset::Poprocket, "POPROCKET", "Poprocket"),
    (Preset::Rise, "RISE", "Rise"),
    (Preset::Toaster, "TOASTER", "Toaster"),
    (Preset::Valencia, "VALENCIA", "Valencia"),
    (Preset::Walden, "WALDEN", "Walden"),
];

impl Preset {
    pub fn all() -> impl Iterator<Item = Preset> {
        CATALOG.iter().map(|(preset, _, _)| *preset)
    }

    fn entry(self) -> &'static (Preset, &'static str, &'static str) {
        &CATALOG[u8::from(self) as usize]
    }

    pub fn identifier(self) -> &'static str {
        self.entry().1
    }

    pub fn label(self) -> &'static str {
        self.entry().2
    }

    pub fn description(self) -> String {
        format!("Apply the {} effect", self.label())
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Preset {
    type Err = ImageEffectError;

    /// Accepts the identifier or the label, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        CATALOG
            .iter()
            .find(|(_, identifier, label)| {
                identifier.eq_ignore_ascii_case(name) || label.eq_ignore_ascii_case(name)
            })
            .map(|(preset, _, _)| *preset)
            .ok_or_else(|| ImageEffectError::InvalidPreset(s.to_string()))
    }
}

/// Label a recipe gives the layers it creates. The most recent layer
/// created under a role is the one later steps address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerRole {
    /// The snapshot of the visible image every recipe starts from.
    Layer1,
    Layer2,
    Layer3,
    Vignette,
    Color,
    Noise,
    BlackAndWhite,
    Gradient,
    Merged,
}

impl LayerRole {
    pub fn label(self) -> &'static str {
        match self {
            LayerRole::Layer1 => "Layer 1",
            LayerRole::Layer2 => "Layer 2",
            LayerRole::Layer3 => "Layer 3",
            LayerRole::Vignette => "Vignette",
            LayerRole::Color => "Color",
            LayerRole::Noise => "Noise",
            LayerRole::BlackAndWhite => "Black and White",
            LayerRole::Gradient => "Gradient",
            LayerRole::Merged => "Merged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_matches_discriminants() {
        for (index, preset) in Preset::all().enumerate() {
            assert_eq!(u8::from(preset) as usize, index);
        }
        assert_eq!(Preset::all().count(), 12);
    }

    #[test]
    fn test_parse_identifier_and_label() {
        assert_eq!("INKWELL".parse::<Preset>().unwrap(), Preset::Inkwell);
        assert_eq!("inkwell".parse::<Preset>().unwrap(), Preset::Inkwell);
        assert_eq!("Lord Kelvin".parse::<Preset>().unwrap(), Preset::LordKelvin);
        assert_eq!("lordkelvin".parse::<Preset>().unwrap(), Preset::LordKelvin);
        assert!(matches!(
            "SEPIA".parse::<Preset>(),
            Err(ImageEffectError::InvalidPreset(name)) if name == "SEPIA"
        ));
    }

    #[test]
    fn test_metadata() {
        assert_eq!(Preset::LordKelvin.identifier(), "LORDKELVIN");
        assert_eq!(Preset::LordKelvin.description(), "Apply the Lord Kelvin effect");
        assert_eq!(Preset::try_from(9u8).unwrap(), Preset::Toaster);
        assert!(Preset::try_from(12u8).is_err());
        assert_eq!(LayerRole::BlackAndWhite.label(), "Black and White");
    }
}
