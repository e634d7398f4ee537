//! HTTP surface for the dues subsystem.
//!
//! Mount [`router`] into the host application after its authentication
//! middleware; handlers read the caller as an [`Actor`] from request
//! extensions and reject with 401 when it is missing. Role checks
//! happen in the managers, not here.

use crate::approval::{ApprovalManager, ApproveOfflineRequest};
use crate::checkout::{CheckoutClient, CheckoutConfig};
use crate::cycles::{CreateCycleRequest, CycleManager, DuesCycle, UpdateCycleRequest};
use crate::error::ApiError;
use crate::members::{MemberDirectory, MembershipType};
use crate::payment::{MyDuesView, PaymentManager, PaymentOutcome};
use crate::records::{MemberDuesRecord, PaymentMethod};
use crate::roles::Actor;
use crate::settings::{PaymentSettings, SettingsManager};
use crate::storage::DuesStore;
use crate::summary::SummaryManager;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Shared state for the dues routes.
///
/// Everything is cheaply cloneable; managers are built per request.
#[derive(Clone)]
pub struct DuesContext<S, C, M> {
    store: S,
    client: Option<C>,
    checkout: CheckoutConfig,
    directory: M,
}

impl<S, C, M> DuesContext<S, C, M>
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    /// Create a context without a payment processor; online payments
    /// are recorded directly.
    #[must_use]
    pub fn new(store: S, directory: M) -> Self {
        Self {
            store,
            client: None,
            checkout: CheckoutConfig::default(),
            directory,
        }
    }

    /// Attach a hosted checkout client.
    #[must_use]
    pub fn with_checkout(mut self, client: C, config: CheckoutConfig) -> Self {
        self.client = Some(client);
        self.checkout = config;
        self
    }

    fn cycles(&self) -> CycleManager<S> {
        CycleManager::new(self.store.clone())
    }

    fn payments(&self) -> PaymentManager<S, C> {
        PaymentManager::new(self.store.clone(), self.client.clone(), self.checkout.clone())
    }

    fn approvals(&self) -> ApprovalManager<S> {
        ApprovalManager::new(self.store.clone())
    }

    fn summaries(&self) -> SummaryManager<S, M> {
        SummaryManager::new(self.store.clone(), self.directory.clone())
    }

    fn settings(&self) -> SettingsManager<S> {
        SettingsManager::new(self.store.clone())
    }

    /// Resolve a membership type: explicit request value first, then
    /// the member's directory profile, then the default.
    async fn membership_type(
        &self,
        actor: &Actor,
        requested: Option<MembershipType>,
    ) -> Result<MembershipType, ApiError> {
        if let Some(membership_type) = requested {
            return Ok(membership_type);
        }
        Ok(self
            .directory
            .get_member(&actor.member_id)
            .await?
            .map(|profile| profile.membership_type)
            .unwrap_or_default())
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        Box::pin(async move {
            parts
                .extensions
                .get::<Actor>()
                .cloned()
                .ok_or_else(|| ApiError::unauthorized("No authenticated member on request"))
        })
    }
}

/// Build the dues router.
pub fn router<S, C, M>(ctx: DuesContext<S, C, M>) -> Router
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/dues", get(get_dues).post(pay_dues).patch(patch_dues))
        .route("/dues/confirm", post(confirm_payment))
        .route("/dues/cycles", get(list_cycles).post(create_cycle))
        .route("/dues/cycles/{cycle_id}", patch(update_cycle))
        .route("/settings/payment", get(get_settings).put(put_settings))
        .with_state(ctx)
}

#[derive(Debug, Default, Deserialize)]
struct DuesQuery {
    #[serde(default)]
    manage: bool,
}

#[derive(Debug, Deserialize)]
struct PayDuesRequest {
    #[serde(default)]
    member_type: Option<MembershipType>,
}

/// Body for `PATCH /dues`, dispatched on the `action` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum DuesAction {
    /// Mark a member paid offline.
    ApproveOffline {
        /// The member who paid.
        member_id: String,
        /// The cycle being paid.
        cycle_id: String,
        /// Membership type, used when the record is created here.
        member_type: MembershipType,
        /// Amount received, in minor currency units.
        amount: i64,
        /// How the payment was made.
        payment_method: PaymentMethod,
        /// Date the payment was made.
        payment_date: NaiveDate,
        /// Free-form approver notes.
        #[serde(default)]
        notes: Option<String>,
    },
    /// Waive a member's dues.
    Waive {
        /// The member being waived.
        member_id: String,
        /// The cycle being waived.
        cycle_id: String,
        /// Membership type, used when the record is created here.
        member_type: MembershipType,
    },
    /// Reset a record to unpaid.
    MarkUnpaid {
        /// The record to reset.
        dues_id: String,
    },
}

/// Body for `POST /dues/confirm`, the processor's settlement callback.
#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    /// Processor event ID, used for idempotency.
    pub event_id: String,
    /// The member who paid.
    pub member_id: String,
    /// The cycle that was paid.
    pub cycle_id: String,
    /// Membership type, used when the record is created here.
    #[serde(default)]
    pub member_type: MembershipType,
}

#[derive(Debug, Serialize)]
struct ConfirmPaymentResponse {
    processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    dues: Option<MemberDuesRecord>,
}

async fn get_dues<S, C, M>(
    State(ctx): State<DuesContext<S, C, M>>,
    actor: Actor,
    Query(query): Query<DuesQuery>,
) -> Result<Response, ApiError>
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    if query.manage {
        let view = ctx.summaries().manage_view(&actor).await?;
        return Ok(Json(view).into_response());
    }

    let membership_type = ctx.membership_type(&actor, None).await?;
    let view: MyDuesView = ctx.payments().my_dues_status(&actor, membership_type).await?;
    Ok(Json(view).into_response())
}

async fn pay_dues<S, C, M>(
    State(ctx): State<DuesContext<S, C, M>>,
    actor: Actor,
    Json(request): Json<PayDuesRequest>,
) -> Result<Json<PaymentOutcome>, ApiError>
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    let membership_type = ctx.membership_type(&actor, request.member_type).await?;
    let outcome = ctx.payments().initiate_payment(&actor, membership_type).await?;
    Ok(Json(outcome))
}

async fn patch_dues<S, C, M>(
    State(ctx): State<DuesContext<S, C, M>>,
    actor: Actor,
    Json(action): Json<DuesAction>,
) -> Result<Json<MemberDuesRecord>, ApiError>
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    let approvals = ctx.approvals();
    let record = match action {
        DuesAction::ApproveOffline {
            member_id,
            cycle_id,
            member_type,
            amount,
            payment_method,
            payment_date,
            notes,
        } => {
            approvals
                .approve_offline(
                    &actor,
                    ApproveOfflineRequest {
                        member_id,
                        cycle_id,
                        membership_type: member_type,
                        amount,
                        payment_method,
                        payment_date,
                        notes,
                    },
                )
                .await?
        }
        DuesAction::Waive {
            member_id,
            cycle_id,
            member_type,
        } => {
            approvals
                .waive(&actor, &member_id, &cycle_id, member_type)
                .await?
        }
        DuesAction::MarkUnpaid { dues_id } => approvals.mark_unpaid(&actor, &dues_id).await?,
    };
    Ok(Json(record))
}

async fn confirm_payment<S, C, M>(
    State(ctx): State<DuesContext<S, C, M>>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, ApiError>
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    let record = ctx
        .payments()
        .confirm_payment(
            &request.event_id,
            &request.member_id,
            &request.cycle_id,
            request.member_type,
        )
        .await?;

    Ok(Json(ConfirmPaymentResponse {
        processed: record.is_some(),
        dues: record,
    }))
}

async fn list_cycles<S, C, M>(
    State(ctx): State<DuesContext<S, C, M>>,
    actor: Actor,
) -> Result<Json<Vec<DuesCycle>>, ApiError>
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    Ok(Json(ctx.cycles().list_cycles(&actor).await?))
}

async fn create_cycle<S, C, M>(
    State(ctx): State<DuesContext<S, C, M>>,
    actor: Actor,
    Json(request): Json<CreateCycleRequest>,
) -> Result<(StatusCode, Json<DuesCycle>), ApiError>
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    let cycle = ctx.cycles().create_cycle(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(cycle)))
}

async fn update_cycle<S, C, M>(
    State(ctx): State<DuesContext<S, C, M>>,
    actor: Actor,
    Path(cycle_id): Path<String>,
    Json(request): Json<UpdateCycleRequest>,
) -> Result<Json<DuesCycle>, ApiError>
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    Ok(Json(ctx.cycles().update_cycle(&actor, &cycle_id, request).await?))
}

async fn get_settings<S, C, M>(
    State(ctx): State<DuesContext<S, C, M>>,
    _actor: Actor,
) -> Result<Json<PaymentSettings>, ApiError>
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    Ok(Json(ctx.settings().get().await?))
}

async fn put_settings<S, C, M>(
    State(ctx): State<DuesContext<S, C, M>>,
    actor: Actor,
    Json(settings): Json<PaymentSettings>,
) -> Result<Json<PaymentSettings>, ApiError>
where
    S: DuesStore + Clone + Send + Sync + 'static,
    C: CheckoutClient + Clone + Send + Sync + 'static,
    M: MemberDirectory + Clone + Send + Sync + 'static,
{
    Ok(Json(ctx.settings().update(&actor, settings).await?))
}
