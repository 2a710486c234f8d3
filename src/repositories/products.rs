use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row};
use tracing::debug;

use super::{ensure_affected, row_exists, ProductRepository};
use crate::db::Database;
use crate::error::{AppError, AppResult, EntityKind};
use crate::models::{CreateProduct, Product, UpdateProduct};

const SELECT_PRODUCT: &str =
    "SELECT id, name, category, unit, default_quantity_per_person, notes FROM products";

fn map_product(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        unit: row.get(3)?,
        default_quantity_per_person: row.get(4)?,
        notes: row.get(5)?,
    })
}

pub struct SqliteProductRepository {
    db: Arc<Database>,
}

impl SqliteProductRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn find_all(&self) -> AppResult<Vec<Product>> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY name", SELECT_PRODUCT))
            .map_err(AppError::db("find_all", "products", None))?;

        let products = stmt
            .query_map([], map_product)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(AppError::db("find_all", "products", None))?;

        Ok(products)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Product>> {
        let conn = self.db.lock()?;
        conn.query_row(&format!("{} WHERE id = ?1", SELECT_PRODUCT), [id], map_product)
            .optional()
            .map_err(AppError::db("find_by_id", "products", Some(id)))
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        let conn = self.db.lock()?;
        row_exists(&conn, "products", id)
    }

    async fn create(&self, product: CreateProduct) -> AppResult<Product> {
        product.validate()?;
        let conn = self.db.lock()?;

        conn.execute(
            "INSERT INTO products (name, category, unit, default_quantity_per_person, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                product.name.trim(),
                product.category,
                product.unit,
                product.default_quantity_per_person,
                product.notes
            ],
        )
        .map_err(AppError::db("create", "products", None))?;

        let id = conn.last_insert_rowid();
        debug!(product_id = id, category = %product.category, "product created");

        conn.query_row(&format!("{} WHERE id = ?1", SELECT_PRODUCT), [id], map_product)
            .map_err(AppError::db("create", "products", Some(id)))
    }

    async fn update(&self, product: UpdateProduct) -> AppResult<Product> {
        product.validate()?;
        let conn = self.db.lock()?;

        let affected = conn
            .execute(
                "UPDATE products
                 SET name = ?1, category = ?2, unit = ?3, default_quantity_per_person = ?4,
                     notes = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    product.name.trim(),
                    product.category,
                    product.unit,
                    product.default_quantity_per_person,
                    product.notes,
                    product.id
                ],
            )
            .map_err(AppError::db("update", "products", Some(product.id)))?;
        ensure_affected(affected, EntityKind::Product, product.id)?;

        conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_PRODUCT),
            [product.id],
            map_product,
        )
        .map_err(AppError::db("update", "products", Some(product.id)))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let conn = self.db.lock()?;
        let affected = conn
            .execute("DELETE FROM products WHERE id = ?1", [id])
            .map_err(AppError::db("delete", "products", Some(id)))?;
        ensure_affected(affected, EntityKind::Product, id)
    }
}
