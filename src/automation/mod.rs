pub mod api_call;
pub mod email;
