//! Stripe payment gateway adapter.
//!
//! Creates Checkout Sessions through the Stripe REST API. Webhook
//! verification lives in the billing domain and needs no client.

mod api_types;
mod stripe_gateway;

pub use api_types::{stripe_error, StripeCheckoutSession};
pub use stripe_gateway::{StripeConfig, StripeGateway};
