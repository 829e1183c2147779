use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use adslot::competition::CompetitionError;
use adslot::config::ConfigError;
use adslot::directory::DirectoryError;
use adslot::ledger::LedgerError;
use adslot::orders::OrderError;
use adslot::payouts::PayoutError;
use adslot::pricing::PricingError;
use adslot::progression::ProgressionError;
use adslot::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportPolicy {
    Ignore,
    Report,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    public_code: String,
    public_message: Option<String>,
    report_policy: ReportPolicy,
    report_summary: Option<String>,
}

impl ApiError {
    fn new(
        status: StatusCode,
        public_code: impl Into<String>,
        public_message: Option<String>,
        report_policy: ReportPolicy,
    ) -> Self {
        Self {
            status,
            public_code: public_code.into(),
            public_message,
            report_policy,
            report_summary: None,
        }
    }

    fn with_report(mut self, summary: impl Into<String>) -> Self {
        self.report_summary = Some(summary.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.public_code
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("Internal error: {}", msg);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            None,
            ReportPolicy::Report,
        )
        .with_report(msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::debug!("Not found: {}", msg);
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            Some(msg),
            ReportPolicy::Ignore,
        )
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Bad request: {}", msg);
        Self::new(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            Some(msg),
            ReportPolicy::Ignore,
        )
    }

    /// Contention outcomes (slot taken, hold lapsed) are expected traffic
    pub fn conflict(code: &str, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::debug!("Conflict: {}", msg);
        Self::new(StatusCode::CONFLICT, code, Some(msg), ReportPolicy::Ignore)
    }

    pub fn unprocessable(code: &str, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Unprocessable entity: {}", msg);
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            code,
            Some(msg),
            ReportPolicy::Ignore,
        )
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("Service unavailable: {}", msg);
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            Some("Service unavailable".to_string()),
            ReportPolicy::Report,
        )
        .with_report(msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorEnvelope<'a> {
            error: ErrorBody<'a>,
        }

        #[derive(Serialize)]
        struct ErrorBody<'a> {
            code: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            id: Option<&'a str>,
            message: &'a str,
        }

        let public_message = self
            .public_message
            .as_deref()
            .unwrap_or_else(|| self.status.canonical_reason().unwrap_or("Error"));

        let error_id = (self.report_policy == ReportPolicy::Report).then(adslot::create_id);
        if let Some(id) = error_id.as_deref() {
            tracing::error!(
                error_id = id,
                status = self.status.as_u16(),
                summary = self.report_summary.as_deref().unwrap_or(public_message),
                "Reported API error"
            );
        }

        let mut response = (
            self.status,
            Json(ErrorEnvelope {
                error: ErrorBody {
                    code: &self.public_code,
                    id: error_id.as_deref(),
                    message: public_message,
                },
            }),
        )
            .into_response();

        if let Some(id) = error_id.as_deref()
            && let Ok(v) = HeaderValue::from_str(id)
        {
            response.headers_mut().insert("x-error-id", v);
        }

        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::not_found(err.to_string()),
            StoreError::Conflict { .. } => Self::conflict("VERSION_CONFLICT", err.to_string()),
            StoreError::AlreadyExists { .. } => Self::conflict("ALREADY_EXISTS", err.to_string()),
            StoreError::Database(_)
            | StoreError::Serialization(_)
            | StoreError::Configuration(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                None,
                ReportPolicy::Report,
            )
            .with_report(err.to_string()),
        }
    }
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(_) | LedgerError::ChannelNotFound(_) => {
                Self::not_found(err.to_string())
            }
            LedgerError::AlreadyReserved(_) => Self::conflict("ALREADY_RESERVED", err.to_string()),
            LedgerError::Unavailable(_) => Self::conflict("SLOT_UNAVAILABLE", err.to_string()),
            LedgerError::NotHolder { .. } => Self::conflict("NOT_HOLDER", err.to_string()),
            LedgerError::Expired(_) => Self::conflict("RESERVATION_EXPIRED", err.to_string()),
            LedgerError::Storage(e) => e.into(),
        }
    }
}

impl From<ProgressionError> for ApiError {
    fn from(err: ProgressionError) -> Self {
        match err {
            ProgressionError::ManagerNotFound(_) => Self::not_found(err.to_string()),
            ProgressionError::InvalidAmount(_) => Self::bad_request(err.to_string()),
            ProgressionError::CounterOverflow { .. } => {
                Self::unprocessable("COUNTER_OVERFLOW", err.to_string())
            }
            ProgressionError::Contended(_) => Self::conflict("CONTENDED", err.to_string()),
            ProgressionError::InvalidConfig(_) => Self::internal(err.to_string()),
            ProgressionError::Storage(e) => e.into(),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::OrderNotFound(_)
            | OrderError::SlotNotFound(_)
            | OrderError::ChannelNotFound(_)
            | OrderError::ClientNotFound(_)
            | OrderError::ManagerNotFound(_) => Self::not_found(err.to_string()),
            OrderError::SlotNotHeldByClient { .. } => {
                Self::conflict("SLOT_NOT_HELD", err.to_string())
            }
            OrderError::SlotAlreadyOrdered(_) => {
                Self::conflict("SLOT_ALREADY_ORDERED", err.to_string())
            }
            OrderError::CounterOverflow(_) => {
                Self::unprocessable("COUNTER_OVERFLOW", err.to_string())
            }
            OrderError::Contended(_) => Self::conflict("CONTENDED", err.to_string()),
            OrderError::PriceNotConfigured { .. } => {
                Self::unprocessable("PRICE_NOT_CONFIGURED", err.to_string())
            }
            OrderError::InvalidDiscount(_) => Self::bad_request(err.to_string()),
            OrderError::InvalidTransition { .. } => {
                Self::unprocessable("INVALID_TRANSITION", err.to_string())
            }
            OrderError::Progression(e) => e.into(),
            OrderError::Storage(e) => e.into(),
        }
    }
}

impl From<CompetitionError> for ApiError {
    fn from(err: CompetitionError) -> Self {
        match err {
            CompetitionError::NotFound(_) => Self::not_found(err.to_string()),
            CompetitionError::InvalidWindow(_) => {
                Self::unprocessable("INVALID_WINDOW", err.to_string())
            }
            CompetitionError::Storage(e) => e.into(),
        }
    }
}

impl From<PayoutError> for ApiError {
    fn from(err: PayoutError) -> Self {
        match err {
            PayoutError::ManagerNotFound(_) | PayoutError::PayoutNotFound(_) => {
                Self::not_found(err.to_string())
            }
            PayoutError::InvalidAmount(_) => Self::bad_request(err.to_string()),
            PayoutError::InsufficientBalance { .. } => {
                Self::unprocessable("INSUFFICIENT_BALANCE", err.to_string())
            }
            PayoutError::InvalidStatus { .. } => {
                Self::unprocessable("INVALID_PAYOUT_STATUS", err.to_string())
            }
            PayoutError::Contended(_) => Self::conflict("CONTENDED", err.to_string()),
            PayoutError::Storage(e) => e.into(),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::ChannelNotFound(_)
            | DirectoryError::ClientNotFound(_)
            | DirectoryError::ManagerNotFound(_) => Self::not_found(err.to_string()),
            DirectoryError::InvalidPrice(_) => Self::bad_request(err.to_string()),
            DirectoryError::Contended(_) => Self::conflict("CONTENDED", err.to_string()),
            DirectoryError::Storage(e) => e.into(),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        tracing::error!("Database error: {:?}", err);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "DATABASE_ERROR",
            None,
            ReportPolicy::Report,
        )
        .with_report(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("JSON error: {}", err))
    }
}

impl std::error::Error for ApiError {}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.public_code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contention_maps_to_conflict() {
        let err: ApiError = LedgerError::AlreadyReserved("slot".into()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "ALREADY_RESERVED");

        let err: ApiError = OrderError::SlotNotHeldByClient {
            slot_id: "slot".into(),
            client_id: "client".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_and_lookup_mapping() {
        let err: ApiError = OrderError::InvalidDiscount(120).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = PayoutError::PayoutNotFound("p".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = StoreError::Database("connection reset".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_reported_errors_carry_id_header() {
        let response = ApiError::internal("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key("x-error-id"));

        let response = ApiError::not_found("nothing").into_response();
        assert!(!response.headers().contains_key("x-error-id"));
    }
}
