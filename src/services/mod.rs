// Checkout flow
pub mod checkout;

// Gateway client, card source resolution and payment orchestration
pub mod payments;
