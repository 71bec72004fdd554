pub mod mock_feed;
pub mod static_rates;
