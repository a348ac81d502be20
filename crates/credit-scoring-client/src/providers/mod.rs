pub mod http;

pub use http::HttpScoringProvider;
