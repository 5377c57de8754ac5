use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    CreateProductRequest, ListProductsParams, StockAdjustmentRequest, StockAdjustmentResponse,
    UpdateProductRequest,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{normalize_price, validate_initial_stock, validate_product_name};
use crate::store::{NewProduct, ProductFilter, ProductPatch};
use crate::types::MovementDirection;

fn product_not_found(id: i64) -> ApiError {
    ApiError::not_found(
        "Product not found",
        format!("Product with ID {id} does not exist"),
    )
}

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListProductsParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let filter = ProductFilter {
        tag: params.tag,
        // Non-numeric min_stock behaves as if the filter were absent.
        min_stock: params.min_stock.as_deref().and_then(|s| s.parse().ok()),
        name: params.name,
    };

    let products = store
        .list_products(&filter)
        .api_err("Failed to fetch products")?;

    Ok::<_, ApiError>(Json(ApiResponse::list(products)))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let product = store
        .get_product(id)
        .api_err("Failed to fetch product")?
        .or_not_found(
            "Product not found",
            format!("Product with ID {id} does not exist"),
        )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(product)))
}

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProductRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (Some(name), Some(price)) = (req.name, req.price) else {
        return Err(ApiError::validation("Name and price are required fields"));
    };
    validate_product_name(&name)?;
    let price = normalize_price(price)?;
    let initial_stock = req.initial_stock.unwrap_or(0);
    validate_initial_stock(initial_stock)?;

    let new = NewProduct {
        name,
        description: req.description,
        price,
        initial_stock,
        tags: req.tags.unwrap_or_default(),
    };

    let id = match store.create_product(&new) {
        Ok(id) => id,
        // A concurrent identical tag creation lost the race inside the
        // creation transaction; the whole product creation rolled back.
        Err(Error::Conflict(message)) => {
            return Err(ApiError::conflict("Tag already exists", message));
        }
        Err(e) => {
            tracing::error!("Failed to create product: {e}");
            return Err(ApiError::internal("Failed to create product"));
        }
    };

    let product = store
        .get_product(id)
        .api_err("Failed to fetch product")?
        .ok_or_else(|| ApiError::internal("Failed to fetch product"))?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Product created successfully",
            product,
        )),
    ))
}

pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProductRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    if let Some(name) = &req.name {
        validate_product_name(name)?;
    }
    let mut patch = ProductPatch {
        name: req.name,
        description: req.description,
        price: None,
    };
    if let Some(price) = req.price {
        patch.price = Some(normalize_price(price)?);
    }

    match store.update_product(id, &patch) {
        Ok(()) => {}
        Err(Error::NotFound) => return Err(product_not_found(id)),
        Err(e) => {
            tracing::error!("Failed to update product: {e}");
            return Err(ApiError::internal("Failed to update product"));
        }
    }

    let product = store
        .get_product(id)
        .api_err("Failed to fetch product")?
        .ok_or_else(|| ApiError::internal("Failed to fetch product"))?;

    Ok::<_, ApiError>(Json(ApiResponse::with_message(
        "Product updated successfully",
        product,
    )))
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let deleted = store
        .delete_product(id)
        .api_err("Failed to delete product")?;
    if !deleted {
        return Err(product_not_found(id));
    }

    Ok::<_, ApiError>(Json(ApiResponse::<()>::message(
        "Product and all associated records deleted successfully",
    )))
}

pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<StockAdjustmentRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (Some(direction), Some(quantity)) = (req.direction, req.quantity) else {
        return Err(ApiError::validation("Type and quantity are required fields"));
    };
    let Ok(direction) = direction.parse::<MovementDirection>() else {
        return Err(ApiError::validation(
            "Type must be either \"in\" or \"out\"",
        ));
    };
    let reason = req.reason.as_deref().filter(|r| !r.is_empty());

    let adjustment = match store.adjust_stock(id, direction, quantity, reason) {
        Ok(adjustment) => adjustment,
        Err(Error::Validation(message)) => return Err(ApiError::validation(message)),
        Err(Error::NotFound) => return Err(product_not_found(id)),
        Err(Error::InsufficientStock {
            available,
            requested,
        }) => {
            return Err(ApiError::insufficient_stock(format!(
                "Cannot remove {requested} items. Current stock: {available}"
            )));
        }
        Err(e) => {
            tracing::error!("Failed to update inventory: {e}");
            return Err(ApiError::internal("Failed to update inventory"));
        }
    };

    let product = store
        .get_product(id)
        .api_err("Failed to fetch product")?
        .ok_or_else(|| ApiError::internal("Failed to fetch product"))?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Inventory updated successfully",
            StockAdjustmentResponse {
                product,
                inventory_record: adjustment.movement,
                previous_stock: adjustment.previous_stock,
                new_stock: adjustment.new_stock,
            },
        )),
    ))
}
