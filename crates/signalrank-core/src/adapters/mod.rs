//! Provider adapters.
//!
//! | Adapter | Serves | Transport |
//! |---------|--------|-----------|
//! | [`KrxAdapter`] | [`MarketDataProvider`](crate::data_source::MarketDataProvider) | KRX data portal JSON |
//! | [`NaverAdapter`] | [`High52Source`](crate::data_source::High52Source) | Naver mobile stock API |
//! | [`StaticMarketData`] | both | in-memory fixtures |

mod fixture;
mod krx;
mod naver;

pub use fixture::{FailureMode, StaticMarketData};
pub use krx::{KrxAdapter, KRX_DATA_URL};
pub use naver::{NaverAdapter, NAVER_HIGH52_URL};
