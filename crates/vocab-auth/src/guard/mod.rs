//! Page/route guard.

pub mod route;
pub mod token;

pub use route::{GuardDecision, NavigationRequest, RedirectReason, RouteGuard};
pub use token::{TokenStatus, inspect_token};
