//! Rules and builders shared by the pipeline stages: coinbase payout, past
//! median time and block templates.

pub mod block_template;
pub mod coinbase;
pub mod past_median_time;

pub use block_template::{BlockTemplateBuilder, TemplateRequest};
pub use coinbase::CoinbaseManager;
pub use past_median_time::PastMedianTimeManager;
