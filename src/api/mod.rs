pub mod razorpay;

pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";

/// Base URLs of the outbound services.
#[derive(Debug, Clone)]
pub struct ApiUrls {
    pub razorpay_api_url: String,
}

impl Default for ApiUrls {
    fn default() -> Self {
        Self {
            razorpay_api_url: DEFAULT_RAZORPAY_API_URL.to_string(),
        }
    }
}
