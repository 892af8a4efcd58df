use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::Product;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams { pub collection: Option<String> }

#[derive(Debug, Deserialize)]
pub struct SearchParams { #[serde(default)] pub q: String }

#[derive(Debug, Serialize)]
pub struct CollectionView { pub name: String, pub products: Vec<Product> }

#[derive(Debug, Serialize)]
pub struct SearchResults { pub query: String, pub products: Vec<Product> }

pub async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<Vec<Product>>> {
    let products = match p.collection.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(collection) => s.catalog.list_by_collection(collection).await?,
        None => s.catalog.list_products().await?,
    };
    Ok(Json(products))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<Product>> {
    s.catalog.get_product(id).await?.map(Json).ok_or_else(|| AppError::NotFound(format!("product {id} not found")))
}

pub async fn collection(State(s): State<AppState>, Path(name): Path<String>) -> Result<Json<CollectionView>> {
    let products = s.catalog.list_by_collection(&name).await?;
    Ok(Json(CollectionView { name, products }))
}

pub async fn search(State(s): State<AppState>, Query(p): Query<SearchParams>) -> Result<Json<SearchResults>> {
    let query = p.q.trim().to_string();
    let products = s.catalog.search(&query).await?;
    Ok(Json(SearchResults { query, products }))
}
