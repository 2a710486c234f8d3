use crate::error::AppResult;
use crate::models::{CreateProduct, Product, UpdateProduct};
use crate::state::AppState;

pub async fn get_products(state: &AppState) -> AppResult<Vec<Product>> {
    state.repos.products.find_all().await
}

pub async fn create_product(state: &AppState, product: CreateProduct) -> AppResult<Product> {
    state.repos.products.create(product).await
}

pub async fn update_product(state: &AppState, product: UpdateProduct) -> AppResult<Product> {
    state.repos.products.update(product).await
}

pub async fn delete_product(state: &AppState, id: i64) -> AppResult<()> {
    state.repos.products.delete(id).await
}
