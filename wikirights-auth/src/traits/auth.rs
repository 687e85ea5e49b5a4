// SPDX-License-Identifier: MIT OR Apache-2.0

use wikirights_core::DocumentReference;

/// Hook into the hosting platform's authentication machinery.
pub trait Authenticator {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Try to establish a user identity for the current request, for
    /// example from a session cookie or HTTP credentials. `None` means the
    /// request stays anonymous.
    fn authenticate(&self) -> Result<Option<DocumentReference>, Self::Error>;

    /// Trigger the host login flow, such as a redirect to the login form.
    /// Fired as a side effect when an unauthenticated request is denied.
    fn show_login(&self);
}
