// Save Workflow Controller: one upload per completed result, with a blocking
// progress dialog that auto-dismisses once the upload finishes.

pub mod controller;
pub mod handlers;
