pub const DEFAULT_CATEGORY: &str = "other";

// Legacy rubro tokens as they appear in the product file.
const TABLE: &[(&str, &str)] = &[
    ("SHAMPOO", "hair_care"),
    ("ACOND", "hair_care"),
    ("TRATAM", "hair_care"),
    ("TINTURA", "coloring"),
    ("OXIDANTE", "coloring"),
    ("DECOLOR", "coloring"),
    ("GEL", "styling"),
    ("CERA", "styling"),
    ("FIJADOR", "styling"),
    ("CREMA", "skin_care"),
    ("BARBA", "beard_care"),
    ("AFEITADO", "beard_care"),
    ("HERRAM", "tools"),
    ("ACCES", "accessories"),
];

/// Case-insensitive; unknown or blank tokens map to `"other"`.
pub fn map_category(token: &str) -> &'static str {
    let t = token.trim();
    TABLE
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(t))
        .map(|(_, v)| *v)
        .unwrap_or(DEFAULT_CATEGORY)
}
