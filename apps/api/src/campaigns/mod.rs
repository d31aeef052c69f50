// Campaign CRUD. Campaigns are never removed: DELETE flips the status to
// DELETED and every read path treats such rows as missing.

pub mod handlers;
