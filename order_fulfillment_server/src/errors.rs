use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use order_fulfillment_engine::{
    CheckoutError,
    InventoryApiError,
    InventoryError,
    OrderFlowError,
    PaymentError,
    RedemptionError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PaymentRequired(String),
    #[error("Forbidden. {0}")]
    Forbidden(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::InvalidTransition { .. } |
            OrderFlowError::OrderStatusConflict { .. } |
            OrderFlowError::OrderNotPending(_) |
            OrderFlowError::InsufficientStock { .. } => Self::Conflict(e.to_string()),
            OrderFlowError::EmptyOrder | OrderFlowError::QueryError(_) => Self::ValidationError(e.to_string()),
            OrderFlowError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::OrderFlowError(e) => e.into(),
            CheckoutError::CatalogError(_) => Self::BackendError(e.to_string()),
            e => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<PaymentError> for ServerError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::InsufficientPayment { .. } => Self::PaymentRequired(e.to_string()),
            PaymentError::NotPayable { .. } => Self::Conflict(e.to_string()),
            PaymentError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            PaymentError::InvalidDetails(_) => Self::ValidationError(e.to_string()),
            PaymentError::OrderFlowError(e) => e.into(),
        }
    }
}

impl From<RedemptionError> for ServerError {
    fn from(e: RedemptionError) -> Self {
        match e {
            RedemptionError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            RedemptionError::OrderNotRedeemable { .. } => Self::Conflict(e.to_string()),
            RedemptionError::InvalidIdempotencyKey(_) => Self::ValidationError(e.to_string()),
            RedemptionError::InvalidPickupCode(_) => Self::Forbidden(e.to_string()),
            RedemptionError::DatabaseError(_) | RedemptionError::SerializationError(_) => {
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<InventoryApiError> for ServerError {
    fn from(e: InventoryApiError) -> Self {
        match e {
            InventoryApiError::UnknownProduct(_) => Self::NoRecordFound(e.to_string()),
            InventoryApiError::InventoryError(InventoryError::ZeroDelta(_)) |
            InventoryApiError::InventoryError(InventoryError::ReservedReason(_)) |
            InventoryApiError::InventoryError(InventoryError::QueryError(_)) => Self::ValidationError(e.to_string()),
            InventoryApiError::InventoryError(InventoryError::DatabaseError(_)) | InventoryApiError::CatalogError(_) => {
                Self::BackendError(e.to_string())
            },
        }
    }
}
