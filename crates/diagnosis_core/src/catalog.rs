//! Disease names the model may choose from, per animal kind.

use crate::types::{AnimalKind, HEALTHY_DISEASE};

pub const DOG_SKIN_DISEASES: &[&str] = &[
    "Flea Allergy Dermatitis",
    "Atopic Dermatitis",
    "Mange",
    "Hot Spots",
    "Yeast Infection",
    "Ringworm",
    "Bacterial Infection",
    "Dry Skin",
    "Seborrhea",
    "Food Allergy Dermatitis",
    "Tick-borne Dermatitis",
    "Contact Dermatitis",
    "Hormonal Skin Disease",
];

pub const CAT_SKIN_DISEASES: &[&str] = &[
    "Flea Allergy Dermatitis",
    "Atopic Dermatitis",
    "Mange",
    "Ringworm",
    "Bacterial Infection",
    "Yeast Infection",
    "Eosinophilic Granuloma Complex",
    "Feline Acne",
    "Stud Tail",
    "Food Allergy Dermatitis",
    "Ear Mites",
    "Contact Dermatitis",
    "Hormonal Skin Disease",
    "Dry Skin",
];

// Already contains "Healthy".
pub const COW_DISEASES: &[&str] = &[
    "Bovine Respiratory Disease (BRD)",
    "Bovine",
    "Contagious Bovine Pleuropneumonia (CBPP)",
    "Dermatitis",
    "Ecthyma (Contagious Pustular Dermatitis)",
    "Respiratory",
    "Healthy",
    "Lumpy Skin Disease",
    "Skin Disease",
];

pub const GENERIC_CATEGORIES: &[&str] = &["Healthy", "Bacterial", "Fungal", "Other"];

/// Allowed disease names for an animal kind. Unknown or unsupported kinds
/// fall back to the coarse categories.
pub fn allowed_diseases(kind: Option<AnimalKind>) -> Vec<&'static str> {
    let with_healthy = |names: &'static [&'static str]| -> Vec<&'static str> {
        std::iter::once(HEALTHY_DISEASE)
            .chain(names.iter().copied())
            .collect()
    };

    match kind {
        Some(AnimalKind::Dog) => with_healthy(DOG_SKIN_DISEASES),
        Some(AnimalKind::Cat) => with_healthy(CAT_SKIN_DISEASES),
        Some(AnimalKind::Cow) => COW_DISEASES.to_vec(),
        Some(AnimalKind::Other) | None => GENERIC_CATEGORIES.to_vec(),
    }
}
