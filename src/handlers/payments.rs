// src/handlers/payments.rs

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{ClientsOnly, RequireRole, Supervisors},
    },
    models::payment::{ConfirmPaymentPayload, ConfirmationResponse, DeclarePaymentPayload, PaymentDeclaration},
};

fn pdf_response(invoice_number: &str, pdf_bytes: Vec<u8>) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"facture_{invoice_number}.pdf\""),
        ),
    ];

    (headers, pdf_bytes).into_response()
}

// =============================================================================
//  DECLARAÇÃO E CONSULTA
// =============================================================================

// POST /api/payments
#[utoipa::path(
    post,
    path = "/api/payments",
    tag = "Payments",
    request_body = DeclarePaymentPayload,
    responses(
        (status = 201, description = "Pagamento declarado (pendente)", body = PaymentDeclaration),
        (status = 400, description = "Valor inválido"),
        (status = 403, description = "Somente CLIENT declara pagamentos")
    ),
    security(("api_jwt" = []))
)]
pub async fn declare_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<ClientsOnly>,
    Json(payload): Json<DeclarePaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let payment = app_state
        .payment_service
        .declare(&user, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(payment)))
}

// GET /api/payments
#[utoipa::path(
    get,
    path = "/api/payments",
    tag = "Payments",
    responses(
        (status = 200, description = "Pagamentos visíveis para o ator", body = Vec<PaymentDeclaration>),
        (status = 403, description = "CONSULTANT não acessa pagamentos")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_payments(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Vec<PaymentDeclaration>>, ApiError> {
    let payments = app_state
        .payment_service
        .list(&user.actor())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(payments))
}

// GET /api/payments/{id}
#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    tag = "Payments",
    params(("id" = Uuid, Path, description = "ID do pagamento")),
    responses(
        (status = 200, description = "Pagamento", body = PaymentDeclaration),
        (status = 403, description = "Sem acesso"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentDeclaration>, ApiError> {
    let payment = app_state
        .payment_service
        .get(&user.actor(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(payment))
}

// =============================================================================
//  CONFIRMAÇÃO EM DUAS ETAPAS
// =============================================================================

// POST /api/payments/{id}/confirm
#[utoipa::path(
    post,
    path = "/api/payments/{id}/confirm",
    tag = "Payments",
    params(("id" = Uuid, Path, description = "ID do pagamento")),
    request_body = ConfirmPaymentPayload,
    responses(
        (status = 200, description = "Código emitido, pagamento confirmado ou rejeitado", body = ConfirmationResponse),
        (status = 400, description = "Motivo da rejeição ausente"),
        (status = 409, description = "Código incorreto ou pagamento já processado")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<Supervisors>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPaymentPayload>,
) -> Result<Json<ConfirmationResponse>, ApiError> {
    let response = app_state
        .payment_service
        .confirm(&user.actor(), id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(response))
}

// =============================================================================
//  FATURAS
// =============================================================================

// GET /api/payments/{id}/invoice
#[utoipa::path(
    get,
    path = "/api/payments/{id}/invoice",
    tag = "Payments",
    params(("id" = Uuid, Path, description = "ID do pagamento")),
    responses(
        (status = 200, description = "Fatura em PDF", content_type = "application/pdf"),
        (status = 403, description = "Sem acesso"),
        (status = 404, description = "Pagamento não confirmado")
    ),
    security(("api_jwt" = []))
)]
pub async fn payment_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (invoice_number, pdf_bytes) = app_state
        .payment_service
        .invoice_by_payment(&user.actor(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(pdf_response(&invoice_number, pdf_bytes))
}

// GET /api/invoices/{invoice_number}
#[utoipa::path(
    get,
    path = "/api/invoices/{invoice_number}",
    tag = "Payments",
    params(("invoice_number" = String, Path, description = "Número da fatura")),
    responses(
        (status = 200, description = "Fatura em PDF", content_type = "application/pdf"),
        (status = 403, description = "Sem acesso"),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn invoice_by_number(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(invoice_number): Path<String>,
) -> Result<Response, ApiError> {
    let (invoice_number, pdf_bytes) = app_state
        .payment_service
        .invoice_by_number(&user.actor(), &invoice_number)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(pdf_response(&invoice_number, pdf_bytes))
}
