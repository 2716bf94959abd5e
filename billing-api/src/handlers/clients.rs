//! Client CRUD endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::billing::{CreateClientRequest, ListQuery, UpdateClientRequest};
use crate::handlers::log_activity;
use crate::middleware::AuthUser;
use crate::models::{Client, CreateClient, UpdateClient};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

const DEFAULT_PAGE_SIZE: i32 = 50;

pub async fn create_client(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let client = state
        .db
        .create_client(&CreateClient {
            name: req.name,
            contact_person: req.contact_person,
            email: req.email,
            phone: req.phone,
            billing_address: req.billing_address,
            billing_city: req.billing_city,
            billing_state: req.billing_state,
            billing_pincode: req.billing_pincode,
            shipping_address: req.shipping_address,
            shipping_city: req.shipping_city,
            shipping_state: req.shipping_state,
            shipping_pincode: req.shipping_pincode,
            gstin: req.gstin,
            website: req.website,
        })
        .await?;

    log_activity(
        &state,
        &user,
        "client.created",
        serde_json::json!({ "client_id": client.client_id, "name": client.name }),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn list_clients(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Client>>, AppError> {
    let clients = state
        .db
        .list_clients(query.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(Json(clients))
}

pub async fn get_client(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .db
        .get_client(client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;
    Ok(Json(client))
}

/// Update a client. Address edits never touch existing invoice snapshots.
pub async fn update_client(
    State(state): State<AppState>,
    user: AuthUser,
    Path(client_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateClientRequest>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .db
        .update_client(
            client_id,
            &UpdateClient {
                name: req.name,
                contact_person: req.contact_person,
                email: req.email,
                phone: req.phone,
                billing_address: req.billing_address,
                billing_city: req.billing_city,
                billing_state: req.billing_state,
                billing_pincode: req.billing_pincode,
                shipping_address: req.shipping_address,
                shipping_city: req.shipping_city,
                shipping_state: req.shipping_state,
                shipping_pincode: req.shipping_pincode,
                gstin: req.gstin,
                website: req.website,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    log_activity(
        &state,
        &user,
        "client.updated",
        serde_json::json!({ "client_id": client.client_id }),
    )
    .await?;

    Ok(Json(client))
}

/// Delete a client. Its invoices (and their items/payments) cascade away.
pub async fn delete_client(
    State(state): State<AppState>,
    user: AuthUser,
    Path(client_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_client(client_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
    }

    log_activity(
        &state,
        &user,
        "client.deleted",
        serde_json::json!({ "client_id": client_id }),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
