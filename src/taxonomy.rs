use serde::{Deserialize, Serialize};

/// Fixed set of tag categories, plus the synthetic `Uncategorized` bucket.
///
/// The serialized form keeps the original camelCase ids (`dreamTypes`, not
/// `dream-types`) because the category id is embedded verbatim in tag ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryId {
    Emotions,
    Characters,
    Places,
    Actions,
    Objects,
    DreamTypes,
    Uncategorized,
}

/// Display palette for categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryColor {
    Amber,
    Indigo,
    Blue,
    Orange,
    Teal,
    Pink,
    Violet,
}

/// Supported UI locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "pt-BR")]
    PtBr,
}

/// Subcategory value used when a tag carries no real subcategory.
pub const UNCATEGORIZED_SUBCATEGORY: &str = "Uncategorized";

impl CategoryId {
    pub const ALL: [CategoryId; 7] = [
        CategoryId::Emotions,
        CategoryId::Characters,
        CategoryId::Places,
        CategoryId::Actions,
        CategoryId::Objects,
        CategoryId::DreamTypes,
        CategoryId::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryId::Emotions => "emotions",
            CategoryId::Characters => "characters",
            CategoryId::Places => "places",
            CategoryId::Actions => "actions",
            CategoryId::Objects => "objects",
            CategoryId::DreamTypes => "dreamTypes",
            CategoryId::Uncategorized => "uncategorized",
        }
    }

    /// Case-insensitive lookup, so `dreamtypes` from a hand-edited file still
    /// resolves to `DreamTypes`.
    pub fn parse(input: &str) -> Option<CategoryId> {
        CategoryId::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(input))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CategoryId::Emotions => "Emotions & Moods",
            CategoryId::Characters => "Characters & Beings",
            CategoryId::Places => "Places & Environments",
            CategoryId::Actions => "Actions & Events",
            CategoryId::Objects => "Objects & Items",
            CategoryId::DreamTypes => "Dream Types & Styles",
            CategoryId::Uncategorized => "Uncategorized",
        }
    }

    pub fn color(&self) -> CategoryColor {
        match self {
            CategoryId::Emotions => CategoryColor::Amber,
            CategoryId::Characters => CategoryColor::Indigo,
            CategoryId::Places => CategoryColor::Blue,
            CategoryId::Actions => CategoryColor::Orange,
            CategoryId::Objects => CategoryColor::Teal,
            CategoryId::DreamTypes => CategoryColor::Pink,
            CategoryId::Uncategorized => CategoryColor::Violet,
        }
    }

    /// Fixed subcategory options per category. `Uncategorized` only carries
    /// the synthetic subcategory.
    pub fn subcategories(&self) -> &'static [&'static str] {
        match self {
            CategoryId::Emotions => &["Positive", "Negative", "Complex States"],
            CategoryId::Characters => &[
                "People",
                "Animals",
                "Mythical/Spiritual",
                "Deceased/Memory Figures",
            ],
            CategoryId::Places => &[
                "Natural Settings",
                "Urban/Manmade",
                "Cosmic/Unreal",
                "Weather/Atmosphere",
            ],
            CategoryId::Actions => &[
                "Movement",
                "Interactions",
                "Transformations",
                "Unusual Events",
            ],
            CategoryId::Objects => &[
                "Everyday Objects",
                "Mystical/Unreal Items",
                "Technology/Machines",
                "Symbols/Signs",
            ],
            CategoryId::DreamTypes => &["Lucidity", "Tone", "Purpose/Meaning", "Physical State"],
            CategoryId::Uncategorized => &[UNCATEGORIZED_SUBCATEGORY],
        }
    }
}

impl CategoryColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryColor::Amber => "amber",
            CategoryColor::Indigo => "indigo",
            CategoryColor::Blue => "blue",
            CategoryColor::Orange => "orange",
            CategoryColor::Teal => "teal",
            CategoryColor::Pink => "pink",
            CategoryColor::Violet => "violet",
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            CategoryColor::Amber => "#f59e0b",
            CategoryColor::Indigo => "#6366f1",
            CategoryColor::Blue => "#3b82f6",
            CategoryColor::Orange => "#f97316",
            CategoryColor::Teal => "#14b8a6",
            CategoryColor::Pink => "#ec4899",
            CategoryColor::Violet => "#8b5cf6",
        }
    }
}

/// Resolve a category id string to its display color.
/// Unknown or absent categories fall back to the uncategorized violet.
pub fn category_color(category_id: &str) -> CategoryColor {
    CategoryId::parse(category_id)
        .map(|c| c.color())
        .unwrap_or(CategoryColor::Violet)
}

// (english key, portuguese translation); english keys double as en labels
const SUBCATEGORY_TRANSLATIONS: &[(&str, &str)] = &[
    ("Positive", "Positivo"),
    ("Negative", "Negativo"),
    ("Complex States", "Estados Complexos"),
    ("People", "Pessoas"),
    ("Animals", "Animais"),
    ("Mythical/Spiritual", "Mítico/Espiritual"),
    ("Deceased/Memory Figures", "Falecidos/Figuras da Memória"),
    ("Natural Settings", "Ambientes Naturais"),
    ("Urban/Manmade", "Urbano/Construído"),
    ("Cosmic/Unreal", "Cósmico/Irreal"),
    ("Weather/Atmosphere", "Clima/Atmosfera"),
    ("Movement", "Movimento"),
    ("Interactions", "Interações"),
    ("Transformations", "Transformações"),
    ("Unusual Events", "Eventos Incomuns"),
    ("Everyday Objects", "Objetos Cotidianos"),
    ("Mystical/Unreal Items", "Itens Místicos/Irreais"),
    ("Technology/Machines", "Tecnologia/Máquinas"),
    ("Symbols/Signs", "Símbolos/Sinais"),
    ("Lucidity", "Lucidez"),
    ("Tone", "Tom"),
    ("Purpose/Meaning", "Propósito/Significado"),
    ("Physical State", "Estado Físico"),
    ("Uncategorized", "Sem categoria"),
];

/// Translate a subcategory key for display. Unknown keys are echoed back
/// verbatim; this never fails.
pub fn translated_subcategory_label(subcategory: &str, locale: Locale) -> String {
    match SUBCATEGORY_TRANSLATIONS
        .iter()
        .find(|(key, _)| *key == subcategory)
    {
        Some((en, pt)) => match locale {
            Locale::En => (*en).to_string(),
            Locale::PtBr => (*pt).to_string(),
        },
        None => subcategory.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_ids_serialize_to_original_strings() {
        assert_eq!(CategoryId::DreamTypes.as_str(), "dreamTypes");
        let json = serde_json::to_string(&CategoryId::DreamTypes).unwrap();
        assert_eq!(json, "\"dreamTypes\"");
    }

    #[test]
    fn unknown_category_falls_back_to_violet() {
        assert_eq!(category_color("nightmares"), CategoryColor::Violet);
        assert_eq!(category_color(""), CategoryColor::Violet);
        assert_eq!(category_color("emotions"), CategoryColor::Amber);
        // case drift tolerated
        assert_eq!(category_color("dreamtypes"), CategoryColor::Pink);
    }

    #[test]
    fn subcategory_translation_falls_back_to_raw_key() {
        assert_eq!(
            translated_subcategory_label("Movement", Locale::PtBr),
            "Movimento"
        );
        assert_eq!(
            translated_subcategory_label("Movement", Locale::En),
            "Movement"
        );
        assert_eq!(
            translated_subcategory_label("Not A Key", Locale::PtBr),
            "Not A Key"
        );
    }
}
