//! The crash interceptor
//!
//! Occupies the process-wide handler slot, decorates every uncaught crash
//! with editor diagnostics according to a log policy, forwards one known
//! layout defect to the editor's external sink, and re-delivers the crash to
//! the handler that occupied the slot before it. Diagnostic steps are each
//! fail-open: no failure in this module ever masks the crash being reported
//! or prevents delegation.

use crate::crash::CrashEvent;
use crate::editor::EditorContent;
use crate::hook::signature;
use crate::hook::slot::{CrashHandler, HandlerSlot};
use crate::policy::LogPolicy;
use crate::report::TaggedCrash;
use log::{debug, error, warn};
use std::sync::{Arc, Mutex, OnceLock, Weak};

/// Logging target for all editor crash diagnostics
pub const DIAGNOSTIC_TARGET: &str = "vigil::editor";

/// Line recorded in place of the snapshot when the provider is gone
const PROVIDER_GONE: &str = "editor content unavailable, provider was dropped";

/// Collaborator references, cleared by `restore_default_handler`
struct Collaborators {
    policy: Option<Weak<dyn LogPolicy>>,
    editor: Option<Weak<dyn EditorContent>>,
}

/// Interceptor for uncaught crashes on any thread of the process
///
/// Collaborators are held as weak references: the policy and the editor
/// widget live and die with the host application, and the interceptor must
/// keep working (fail-open) after either is dropped. The handler that
/// occupied the slot before installation is captured exactly once and is the
/// delegate for the interceptor's whole lifetime.
pub struct CrashInterceptor {
    collaborators: Mutex<Collaborators>,
    /// Previous slot occupant, captured at installation and never re-queried
    root_handler: OnceLock<Option<Arc<dyn CrashHandler>>>,
    slot: Arc<dyn HandlerSlot>,
    toolkit_build: u32,
    max_snapshot_len: usize,
}

impl CrashInterceptor {
    /// Install an interceptor, downgrading strong collaborator handles
    ///
    /// Captures the slot's current occupant as the fallback delegate, then
    /// replaces it. Installing a second interceptor over a first produces a
    /// linear chain: each delegates one step backward.
    ///
    /// # Arguments
    ///
    /// * `policy` - Decides whether a crash warrants diagnostic capture
    /// * `editor` - Supplies the content snapshot and span report
    /// * `slot` - The process-wide handler slot to occupy
    /// * `toolkit_build` - Running toolkit build for defect matching, 0 if unknown
    /// * `max_snapshot_len` - Byte cap applied to the logged content snapshot
    pub fn install<P, E>(
        policy: &Arc<P>,
        editor: &Arc<E>,
        slot: Arc<dyn HandlerSlot>,
        toolkit_build: u32,
        max_snapshot_len: usize,
    ) -> Arc<Self>
    where
        P: LogPolicy + 'static,
        E: EditorContent + 'static,
    {
        let policy_weak: Weak<P> = Arc::downgrade(policy);
        let policy: Weak<dyn LogPolicy> = policy_weak;
        let editor_weak: Weak<E> = Arc::downgrade(editor);
        let editor: Weak<dyn EditorContent> = editor_weak;
        Self::install_weak(policy, editor, slot, toolkit_build, max_snapshot_len)
    }

    /// Install an interceptor from already-downgraded collaborator references
    pub fn install_weak(
        policy: Weak<dyn LogPolicy>,
        editor: Weak<dyn EditorContent>,
        slot: Arc<dyn HandlerSlot>,
        toolkit_build: u32,
        max_snapshot_len: usize,
    ) -> Arc<Self> {
        let interceptor = Arc::new(Self {
            collaborators: Mutex::new(Collaborators {
                policy: Some(policy),
                editor: Some(editor),
            }),
            root_handler: OnceLock::new(),
            slot: slot.clone(),
            toolkit_build,
            max_snapshot_len,
        });

        let handler: Arc<dyn CrashHandler> = interceptor.clone();
        let previous = slot.replace(Some(handler));
        let _ = interceptor.root_handler.set(previous);
        interceptor
    }

    /// Clear the collaborator references and reinstate the captured fallback
    /// as the process-wide handler
    ///
    /// Idempotent: repeated calls reinstall the same fallback. When no
    /// fallback was ever captured the slot is left empty.
    pub fn restore_default_handler(&self) {
        {
            let mut guard = match self.collaborators.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.policy = None;
            guard.editor = None;
        }

        let root = self.root_handler.get().cloned().flatten();
        self.slot.replace(root);
    }

    /// Clone the collaborator handles under a short-lived lock
    ///
    /// The lock is never held across a collaborator call.
    fn collaborator_handles(
        &self,
    ) -> (Option<Weak<dyn LogPolicy>>, Option<Weak<dyn EditorContent>>) {
        let guard = match self.collaborators.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        (guard.policy.clone(), guard.editor.clone())
    }

    /// Decide whether diagnostics are captured for this crash
    ///
    /// A dead policy reference and a policy error both default to capturing.
    fn should_log(&self, policy: Option<Weak<dyn LogPolicy>>, crash: &CrashEvent) -> bool {
        match policy.as_ref().and_then(Weak::upgrade) {
            Some(policy) => match policy.should_log(crash) {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(
                        target: DIAGNOSTIC_TARGET,
                        "log policy '{}' failed ({}), capturing diagnostics anyway",
                        policy.name(),
                        e
                    );
                    true
                }
            },
            None => true,
        }
    }

    /// Record the content snapshot at error severity
    ///
    /// This step must never propagate an error: fetch or formatting failures
    /// degrade to a generic failure line.
    fn log_content_snapshot(&self, editor: Option<&dyn EditorContent>) {
        error!(target: DIAGNOSTIC_TARGET, "editor content before the crash:");
        match editor {
            Some(editor) => match editor.render_content() {
                Ok(content) => {
                    error!(
                        target: DIAGNOSTIC_TARGET,
                        "{}",
                        Self::truncate_text(&content, self.max_snapshot_len)
                    );
                }
                Err(e) => {
                    error!(
                        target: DIAGNOSTIC_TARGET,
                        "failed to capture the editor content snapshot: {}", e
                    );
                }
            },
            None => error!(target: DIAGNOSTIC_TARGET, "{}", PROVIDER_GONE),
        }
    }

    /// Record the structured span report, swallowing any failure silently
    fn log_span_report(editor: Option<&dyn EditorContent>) {
        let Some(editor) = editor else { return };
        let Ok(report) = editor.span_report() else {
            return;
        };
        if let Ok(block) = serde_json::to_string(&report) {
            error!(target: DIAGNOSTIC_TARGET, "span state: {}", block);
        }
    }

    /// Forward a recognized known-defect crash to the editor's external sink
    ///
    /// Runs regardless of the logging decision. Absence of a provider or a
    /// sink skips forwarding; sink failures are swallowed.
    fn forward_known_defect(&self, crash: &CrashEvent, editor: Option<&dyn EditorContent>) {
        let Some(matched) = signature::detect_known_defect(crash, self.toolkit_build) else {
            return;
        };
        let Some(sink) = editor.and_then(|editor| editor.external_sink()) else {
            return;
        };

        let tagged = TaggedCrash::new(matched.label, crash.clone());
        if let Err(e) = sink.log_crash(&tagged) {
            debug!(
                target: DIAGNOSTIC_TARGET,
                "external sink rejected the known-defect report: {}", e
            );
        }
    }

    /// Truncate text to a byte cap on a UTF-8 boundary
    fn truncate_text(text: &str, max_len: usize) -> String {
        if text.len() <= max_len {
            return text.to_string();
        }

        let mut cut = max_len.saturating_sub(3);
        while cut > 0 && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &text[..cut])
    }
}

impl CrashHandler for CrashInterceptor {
    fn on_crash(&self, crash: &CrashEvent) {
        let (policy, editor) = self.collaborator_handles();
        let editor = editor.as_ref().and_then(Weak::upgrade);

        if self.should_log(policy, crash) {
            self.log_content_snapshot(editor.as_deref());
            Self::log_span_report(editor.as_deref());
        }

        self.forward_known_defect(crash, editor.as_deref());

        if let Some(root) = self.root_handler.get().and_then(|root| root.as_ref()) {
            root.on_crash(crash);
        }
    }
}
