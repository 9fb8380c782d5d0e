pub mod card_source;
pub mod gateway;
pub mod orchestrator;
pub mod stripe;

pub use card_source::{CardSourcePlan, CardSourceResolver};
pub use gateway::{
    AttachedPaymentMethod, CustomerProfile, GatewayContext, IntentReceipt, IntentRequest,
    IntentStatus, PaymentGateway, ProviderError,
};
pub use orchestrator::{PaymentOrchestrator, Settlement};
pub use stripe::StripeGateway;
