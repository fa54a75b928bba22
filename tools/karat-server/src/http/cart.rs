//! Per-session cart endpoints.

use axum::extract::State;
use axum::{Extension, Json};
use karat_cache::SessionId;
use karat_commerce::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{ApiError, JsonBody};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct AddToCart {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItem {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCart {
    #[serde(default)]
    pub item_id: Option<String>,
}

fn item_id(raw: Option<&str>) -> Result<ItemId, ApiError> {
    raw.and_then(ItemId::parse)
        .ok_or_else(|| ApiError::bad_request("Missing required field: item_id"))
}

fn publish(state: &AppState, session: &SessionId, lines: Vec<CartLineView>) {
    state.events().publish(ChangeEvent::CartUpdated {
        session: session.to_string(),
        lines,
    });
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    JsonBody(body): JsonBody<AddToCart>,
) -> Result<Json<Value>, ApiError> {
    let id = item_id(body.item_id.as_deref())?;
    let item = state.catalog.get_item(&id).await?;

    let lines = state.carts.update(&session, |cart: &mut Cart| -> Result<_, ApiError> {
        cart.add(&item, body.quantity)?;
        Ok(cart.views())
    })?;
    tracing::info!(session = %session, item_id = %id, quantity = body.quantity, "added to cart");

    publish(&state, &session, lines);
    Ok(Json(json!({ "message": "Item added to cart" })))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    JsonBody(body): JsonBody<UpdateCartItem>,
) -> Result<Json<Value>, ApiError> {
    let id = item_id(body.item_id.as_deref())?;
    let quantity = body
        .quantity
        .ok_or_else(|| ApiError::bad_request("Missing required field: quantity"))?;

    // Removal must keep working for items deleted from the catalog since.
    let item = if quantity > 0 {
        Some(state.catalog.get_item(&id).await?)
    } else {
        None
    };

    let lines = state.carts.update(&session, |cart: &mut Cart| -> Result<_, ApiError> {
        match &item {
            Some(item) => cart.update_quantity(item, quantity)?,
            None => {
                cart.remove(&id)?;
            }
        }
        Ok(cart.views())
    })?;
    tracing::info!(session = %session, item_id = %id, quantity, "cart quantity updated");

    publish(&state, &session, lines);
    Ok(Json(json!({ "message": "Quantity updated" })))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    JsonBody(body): JsonBody<RemoveFromCart>,
) -> Result<Json<Value>, ApiError> {
    let id = item_id(body.item_id.as_deref())?;

    let lines = state.carts.update(&session, |cart: &mut Cart| -> Result<_, ApiError> {
        cart.remove(&id)?;
        Ok(cart.views())
    })?;
    tracing::info!(session = %session, item_id = %id, "removed from cart");

    publish(&state, &session, lines);
    Ok(Json(json!({ "message": "Item removed from cart" })))
}

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<Vec<CartLineView>>, ApiError> {
    let lines = state
        .carts
        .get(&session)?
        .map(|cart| cart.views())
        .unwrap_or_default();
    Ok(Json(lines))
}

/// Put lines taken for a failed checkout back into the session's cart.
///
/// Lines the customer re-added in the meantime win over the taken copy.
pub(crate) fn restore_cart(
    state: &AppState,
    session: &SessionId,
    taken: &Cart,
) -> Result<(), ApiError> {
    if taken.is_empty() {
        return Ok(());
    }
    state.carts.update(session, |cart: &mut Cart| -> Result<(), ApiError> {
        if cart.is_empty() {
            *cart = taken.clone();
        } else {
            for line in &taken.lines {
                if cart.get(&line.item_id).is_none() {
                    cart.lines.push(line.clone());
                }
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::state::test_support::memory_state;
    use axum::http::StatusCode;

    async fn stocked_item(state: &AppState, stock: i64) -> Item {
        let category = state.catalog.add_category(NewCategory::new("Rings")).await.unwrap();
        let material = state.catalog.add_material(NewMaterial::new("Silver")).await.unwrap();
        let input: NewItem = serde_json::from_value(json!({
            "unique_id": "R-1",
            "name": "Band",
            "category_id": category.id.as_str(),
            "material_id": material.id.as_str(),
            "price": 100,
            "stock": stock,
        }))
        .unwrap();
        state.catalog.add_item(input).await.unwrap()
    }

    fn add(item: &Item, quantity: i64) -> JsonBody<AddToCart> {
        JsonBody(AddToCart {
            item_id: Some(item.id.to_string()),
            quantity,
        })
    }

    #[tokio::test]
    async fn test_add_and_get_cart() {
        let state = memory_state();
        let item = stocked_item(&state, 5).await;
        let session = SessionId::new("sess_a");

        add_to_cart(State(state.clone()), Extension(session.clone()), add(&item, 2))
            .await
            .unwrap();
        add_to_cart(State(state.clone()), Extension(session.clone()), add(&item, 1))
            .await
            .unwrap();

        let Json(lines) = get_cart(State(state.clone()), Extension(session)).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[0].price, 100.0);
    }

    #[tokio::test]
    async fn test_carts_are_per_session() {
        let state = memory_state();
        let item = stocked_item(&state, 5).await;

        add_to_cart(State(state.clone()), Extension(SessionId::new("sess_a")), add(&item, 1))
            .await
            .unwrap();

        let Json(other) = get_cart(State(state), Extension(SessionId::new("sess_b")))
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_over_stock_rejected_without_change() {
        let state = memory_state();
        let item = stocked_item(&state, 2).await;
        let session = SessionId::new("sess_a");

        add_to_cart(State(state.clone()), Extension(session.clone()), add(&item, 2))
            .await
            .unwrap();
        let err = add_to_cart(State(state.clone()), Extension(session.clone()), add(&item, 1))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let Json(lines) = get_cart(State(state), Extension(session)).await.unwrap();
        assert_eq!(lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let state = memory_state();
        let body = JsonBody(AddToCart {
            item_id: Some("ghost".to_string()),
            quantity: 1,
        });
        let err = add_to_cart(State(state), Extension(SessionId::new("s")), body)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let state = memory_state();
        let item = stocked_item(&state, 5).await;
        let session = SessionId::new("sess_a");
        add_to_cart(State(state.clone()), Extension(session.clone()), add(&item, 1))
            .await
            .unwrap();

        let body = JsonBody(UpdateCartItem {
            item_id: Some(item.id.to_string()),
            quantity: Some(4),
        });
        update_cart_item(State(state.clone()), Extension(session.clone()), body)
            .await
            .unwrap();
        let cart = state.carts.get(&session).unwrap().unwrap();
        assert_eq!(cart.item_count(), 4);

        let body = JsonBody(UpdateCartItem {
            item_id: Some(item.id.to_string()),
            quantity: Some(0),
        });
        update_cart_item(State(state.clone()), Extension(session.clone()), body)
            .await
            .unwrap();
        assert!(state.carts.get(&session).unwrap().unwrap().is_empty());

        let body = JsonBody(RemoveFromCart {
            item_id: Some(item.id.to_string()),
        });
        let err = remove_from_cart(State(state), Extension(session), body)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cart_change_is_published_to_session() {
        let state = memory_state();
        let item = stocked_item(&state, 5).await;
        let mut rx = state.events().subscribe();

        add_to_cart(State(state.clone()), Extension(SessionId::new("sess_a")), add(&item, 1))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert!(event.visible_to(Some("sess_a")));
        assert!(!event.visible_to(Some("sess_b")));
    }

    #[tokio::test]
    async fn test_restore_keeps_lines_added_since() {
        let state = memory_state();
        let item = stocked_item(&state, 5).await;
        let session = SessionId::new("sess_a");

        let mut taken = Cart::new("sess_a");
        taken.add(&item, 2).unwrap();
        restore_cart(&state, &session, &taken).unwrap();
        assert_eq!(state.carts.get(&session).unwrap().unwrap().item_count(), 2);

        state
            .carts
            .update(&session, |cart: &mut Cart| -> Result<(), ApiError> {
                cart.update_quantity(&item, 1)?;
                Ok(())
            })
            .unwrap();
        restore_cart(&state, &session, &taken).unwrap();
        assert_eq!(state.carts.get(&session).unwrap().unwrap().item_count(), 1);
    }
}
