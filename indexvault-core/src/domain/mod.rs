//! Domain types for IndexVault

pub mod membership;
pub mod price;
pub mod vendor;

pub use membership::{MembershipInterval, MembershipRecord};
pub use price::{PricePoint, TickerSeries};
pub use vendor::{VendorBatch, VendorFetchResult, VendorFieldError};

/// Ticker symbol type alias
pub type Ticker = String;
