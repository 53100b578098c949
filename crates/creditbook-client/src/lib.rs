//! Creditbook Client SDK.
//!
//! Used by feature route handlers to gate and charge usage, and by the payment
//! webhook to credit verified purchases.
//!
//! # Example
//!
//! ```no_run
//! use creditbook_client::{ClientOptions, CreditbookClient};
//! use creditbook_core::UserId;
//!
//! # async fn example(user_id: UserId) -> Result<(), creditbook_client::ClientError> {
//! let client = CreditbookClient::with_options(
//!     "http://creditbook:8080",
//!     "your-service-api-key",
//!     ClientOptions::with_service_name("image-route"),
//! )?;
//!
//! if client.check_credits(user_id, "imageGeneration", 1).await?.allowed {
//!     let charge = client.consume_credits(user_id, "imageGeneration", 1).await?;
//!     println!("Charged: {}, balance: {}", charge.charged, charge.balance);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, CreditbookClient};
pub use error::ClientError;
pub use types::*;
