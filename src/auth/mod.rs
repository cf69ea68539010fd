//! User authentication and authorization.
//!
//! Split into the pieces of the request pipeline: [cookie] handles the
//! session cookie contract, [resolver] maps an inbound cookie header to a
//! verified session, [gate] turns a resolved session into an allow/deny
//! decision plus a data-visibility scope, and [oauth] talks to the external
//! identity provider.

pub(crate) mod cookie;
pub(crate) mod gate;
pub(crate) mod oauth;
pub(crate) mod resolver;

pub(crate) use cookie::{SESSION_COOKIE, SESSION_DURATION};
pub(crate) use gate::{Scope, require_admin, require_authenticated, scope_for_request};
pub(crate) use resolver::{AuthSession, OptionalSession, SessionResolver};
