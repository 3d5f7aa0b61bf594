/// Router Module Index
///
/// Splits the HTTP surface by the credentials it demands. The access decision itself
/// belongs to the policy engine; the router split only decides whether a missing
/// credential is rejected up front.

/// Routes open to anonymous callers. A bearer token, when present, is still resolved
/// so admins and authors see their drafts.
pub mod public;

/// Routes behind the `AuthUser` middleware layer.
pub mod authenticated;
