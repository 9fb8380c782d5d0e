pub mod card_brand;
pub mod checkout;
pub mod credit_card;
pub mod order;
pub mod payment;

pub use card_brand::CardBrand;
pub use checkout::{Address, CardAttributes, CheckoutRequest};
pub use credit_card::{CardDetails, CreditCard};
pub use order::{Distributor, Order, OrderState};
pub use payment::{Payment, PaymentState};
