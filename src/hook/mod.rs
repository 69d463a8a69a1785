//! Crash interception: handler slot, interceptor, and defect fingerprints

/// Process-wide handler slot and runtime panic-hook bridge
pub mod slot;

/// The crash interceptor itself
pub mod interceptor;

/// Known-defect stack trace fingerprints
pub mod signature;

pub use interceptor::{CrashInterceptor, DIAGNOSTIC_TARGET};
pub use signature::{detect_known_defect, BugSignature, BLOCK_INDEX_DEFECT, KNOWN_SIGNATURES};
pub use slot::{CrashHandler, HandlerSlot, PanicHookSlot};
