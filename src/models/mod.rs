pub mod request;
pub mod response;
pub mod token;

pub use request::ApiRequest;
pub use response::ApiResponse;
pub use token::AccessTokenPayload;
