//! Razorpay payment gateway adapter.

mod razorpay_gateway;

pub use razorpay_gateway::{RazorpayConfig, RazorpayGateway};
