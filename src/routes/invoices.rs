use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{Html, IntoResponse},
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{
        billing::{self, InvoiceDraft, PaymentStatus},
        print,
    },
    middleware,
    models::{
        CreateInvoiceEntity, CreateInvoiceItemEntity, InvoiceEntity, InvoiceItemEntity,
        PatientEntity, PatientSummary, ProfileEntity,
    },
    schema::{invoice_items, invoices, patients, profiles},
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/invoices",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_invoices, create_invoice))
            .routes(utoipa_axum::routes!(get_invoice, delete_invoice))
            .routes(utoipa_axum::routes!(update_payment_status))
            .routes(utoipa_axum::routes!(get_receipt))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

#[derive(Serialize, ToSchema)]
pub struct InvoiceRecord {
    pub invoice: InvoiceEntity,
    pub patient: PatientSummary,
}

/// Fetch the doctor's invoices with patient names, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Invoices"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List invoices", body = StdResponse<Vec<InvoiceRecord>, String>)
    )
)]
async fn get_invoices(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(InvoiceEntity, PatientSummary)> = invoices::table
        .inner_join(patients::table)
        .filter(invoices::doctor_id.eq(doctor_id))
        .order(invoices::created_at.desc())
        .select((InvoiceEntity::as_select(), PatientSummary::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get invoices")?;

    let records: Vec<InvoiceRecord> = rows
        .into_iter()
        .map(|(invoice, patient)| InvoiceRecord { invoice, patient })
        .collect();

    Ok(StdResponse {
        data: Some(records),
        message: Some("Get invoices successfully"),
    })
}

#[derive(Serialize, ToSchema)]
pub struct InvoiceWithItems {
    pub invoice: InvoiceEntity,
    pub patient: PatientSummary,
    pub items: Vec<InvoiceItemEntity>,
}

/// Fetch one invoice with its line items.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Invoices"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Invoice ID to fetch")
    ),
    responses(
        (status = 200, description = "Get invoice successfully", body = StdResponse<InvoiceWithItems, String>),
        (status = 404, description = "Invoice not found")
    )
)]
async fn get_invoice(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (invoice, patient): (InvoiceEntity, PatientSummary) = invoices::table
        .inner_join(patients::table)
        .filter(invoices::id.eq(id))
        .filter(invoices::doctor_id.eq(doctor_id))
        .select((InvoiceEntity::as_select(), PatientSummary::as_select()))
        .get_result(conn)
        .await?;

    let items: Vec<InvoiceItemEntity> = invoice_items::table
        .filter(invoice_items::invoice_id.eq(invoice.id))
        .order(invoice_items::created_at.asc())
        .select(InvoiceItemEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get invoice items")?;

    Ok(StdResponse {
        data: Some(InvoiceWithItems {
            invoice,
            patient,
            items,
        }),
        message: Some("Get invoice successfully"),
    })
}

#[derive(Serialize, ToSchema)]
pub struct CreateInvoiceRes {
    pub invoice: InvoiceEntity,
    pub items: Vec<InvoiceItemEntity>,
}

/// Bill a patient. The invoice and its lines are written together.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Invoices"],
    security(("bearerAuth" = [])),
    request_body = InvoiceDraft,
    responses(
        (status = 200, description = "Invoice created", body = StdResponse<CreateInvoiceRes, String>),
        (status = 403, description = "Patient belongs to another doctor")
    )
)]
async fn create_invoice(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<InvoiceDraft>,
) -> Result<impl IntoResponse, AppError> {
    let patient_id = body.validate()?;
    let now = Utc::now();

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (invoice, items) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let owner: Uuid = patients::table
                    .find(patient_id)
                    .select(patients::doctor_id)
                    .get_result(conn)
                    .await?;
                if owner != doctor_id {
                    return Err(AppError::ForbiddenResource(
                        "Patient belongs to another doctor".into(),
                    ));
                }

                let invoice: InvoiceEntity = diesel::insert_into(invoices::table)
                    .values(CreateInvoiceEntity {
                        doctor_id,
                        patient_id,
                        invoice_number: billing::generate_invoice_number(now),
                        amount: body.total(),
                        payment_status: body.payment_status.to_string(),
                        payment_method: body
                            .payment_method
                            .map(|m| m.trim().to_string())
                            .filter(|m| !m.is_empty()),
                        payment_date: body.payment_status.payment_date(now),
                        notes: body
                            .notes
                            .map(|n| n.trim().to_string())
                            .filter(|n| !n.is_empty()),
                    })
                    .returning(InvoiceEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create invoice")?;

                let items: Vec<CreateInvoiceItemEntity> = body
                    .items
                    .iter()
                    .map(|item| CreateInvoiceItemEntity {
                        invoice_id: invoice.id,
                        description: item.description.trim().to_string(),
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                        total: item.total(),
                    })
                    .collect();

                let items = diesel::insert_into(invoice_items::table)
                    .values(items)
                    .returning(InvoiceItemEntity::as_returning())
                    .get_results(conn)
                    .await
                    .context("Failed to create invoice items")?;

                Ok::<(InvoiceEntity, Vec<InvoiceItemEntity>), AppError>((invoice, items))
            })
        })
        .await?;

    tracing::info!(
        "Doctor {} issued invoice {} for {:.2}",
        doctor_id,
        invoice.invoice_number,
        invoice.amount
    );

    Ok(StdResponse {
        data: Some(CreateInvoiceRes { invoice, items }),
        message: Some("Invoice created successfully"),
    })
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdatePaymentReq {
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
}

/// Change an invoice's payment status. Paying stamps the payment date.
#[utoipa::path(
    patch,
    path = "/{id}/payment",
    tags = ["Invoices"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Invoice ID to update")
    ),
    request_body = UpdatePaymentReq,
    responses(
        (status = 200, description = "Payment status updated", body = StdResponse<InvoiceEntity, String>),
        (status = 404, description = "Invoice not found")
    )
)]
async fn update_payment_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<UpdatePaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let target = invoices::table
        .find(id)
        .filter(invoices::doctor_id.eq(doctor_id));
    let payment_date = body.payment_status.payment_date(Utc::now());

    let invoice: InvoiceEntity = match body
        .payment_method
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
    {
        Some(method) => {
            diesel::update(target)
                .set((
                    invoices::payment_status.eq(body.payment_status.as_str()),
                    invoices::payment_date.eq(payment_date),
                    invoices::payment_method.eq(method),
                    invoices::updated_at.eq(diesel::dsl::now),
                ))
                .returning(InvoiceEntity::as_returning())
                .get_result(conn)
                .await?
        }
        None => {
            diesel::update(target)
                .set((
                    invoices::payment_status.eq(body.payment_status.as_str()),
                    invoices::payment_date.eq(payment_date),
                    invoices::updated_at.eq(diesel::dsl::now),
                ))
                .returning(InvoiceEntity::as_returning())
                .get_result(conn)
                .await?
        }
    };

    tracing::info!("Invoice {} marked {}", id, body.payment_status);

    Ok(StdResponse {
        data: Some(invoice),
        message: Some("Payment status updated successfully"),
    })
}

/// Remove an invoice and its line items.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Invoices"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Invoice ID to delete")
    ),
    responses(
        (status = 200, description = "Invoice deleted", body = StdResponse<InvoiceEntity, String>),
        (status = 404, description = "Invoice not found")
    )
)]
async fn delete_invoice(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let invoice: InvoiceEntity = diesel::delete(
        invoices::table
            .find(id)
            .filter(invoices::doctor_id.eq(doctor_id)),
    )
    .returning(InvoiceEntity::as_returning())
    .get_result(conn)
    .await?;

    tracing::info!("Doctor {} deleted invoice {}", doctor_id, invoice.invoice_number);

    Ok(StdResponse {
        data: Some(invoice),
        message: Some("Invoice deleted successfully"),
    })
}

/// Printable HTML receipt for an invoice.
#[utoipa::path(
    get,
    path = "/{id}/receipt",
    tags = ["Invoices"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Invoice ID to print")
    ),
    responses(
        (status = 200, description = "Receipt document", content_type = "text/html", body = String),
        (status = 404, description = "Invoice not found")
    )
)]
async fn get_receipt(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (invoice, patient): (InvoiceEntity, PatientEntity) = invoices::table
        .inner_join(patients::table)
        .filter(invoices::id.eq(id))
        .filter(invoices::doctor_id.eq(doctor_id))
        .select((InvoiceEntity::as_select(), PatientEntity::as_select()))
        .get_result(conn)
        .await?;

    let items: Vec<InvoiceItemEntity> = invoice_items::table
        .filter(invoice_items::invoice_id.eq(invoice.id))
        .order(invoice_items::created_at.asc())
        .select(InvoiceItemEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get invoice items")?;

    let profile: ProfileEntity = profiles::table
        .find(doctor_id)
        .select(ProfileEntity::as_select())
        .get_result(conn)
        .await?;

    Ok(Html(print::render_receipt(
        &profile, &patient, &invoice, &items,
    )?))
}
