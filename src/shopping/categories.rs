use std::borrow::Cow;

/// Localized category names. Lower-case rows cover codes written by older
/// versions of the app.
pub const CATEGORY_DISPLAY_NAMES: &[(&str, &str)] = &[
    ("FOOD", "Alimentos"),
    ("food", "Alimentos"),
    ("BEVERAGE", "Bebidas"),
    ("beverage", "Bebidas"),
    ("SNACK", "Snacks"),
    ("snack", "Snacks"),
    ("MEAT", "Carnes"),
    ("meat", "Carnes"),
    ("DAIRY", "Lácteos"),
    ("dairy", "Lácteos"),
    ("FRUIT", "Frutas"),
    ("fruit", "Frutas"),
    ("VEGETABLE", "Verduras"),
    ("vegetable", "Verduras"),
    ("BAKERY", "Panadería"),
    ("bakery", "Panadería"),
    ("CONDIMENT", "Condimentos"),
    ("condiment", "Condimentos"),
    ("FROZEN", "Congelados"),
    ("frozen", "Congelados"),
    ("CLEANING", "Limpieza"),
    ("cleaning", "Limpieza"),
    ("HYGIENE", "Higiene personal"),
    ("hygiene", "Higiene personal"),
    ("OTHER", "Otros"),
    ("other", "Otros"),
];

/// Maps a category code to its display name; unknown codes pass through.
pub fn category_display_name(code: &str) -> Cow<'_, str> {
    CATEGORY_DISPLAY_NAMES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| Cow::Borrowed(*name))
        .unwrap_or(Cow::Borrowed(code))
}
