use serde::Serialize;

use crate::models::ProductCategory;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CategoryInfo {
    pub code: &'static str,
    pub name: String,
}

/// Category codes with their display names, in declaration order
pub fn get_categories() -> Vec<CategoryInfo> {
    ProductCategory::ALL
        .iter()
        .map(|category| CategoryInfo {
            code: category.code(),
            name: category.display_name(),
        })
        .collect()
}
