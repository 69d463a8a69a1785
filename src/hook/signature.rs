//! Known-defect fingerprints for the toolkit layout engine
//!
//! One defect is currently tracked: the dynamic layout block map indexes out
//! of bounds while text is reflowed during an edit. The defect ships in two
//! adjacent toolkit builds, at slightly different lines of the layout engine
//! source, so each build carries its own frame marker.

use crate::crash::{CrashEvent, CrashKind};

/// Fixed identifying label attached to forwarded block-index defect reports
pub const BLOCK_INDEX_DEFECT: &str = "DynamicLayoutBlockIndexOutOfBounds";

/// Stack trace fingerprint of one known toolkit defect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BugSignature {
    /// Toolkit build the defect ships in
    pub toolkit_build: u32,
    /// Substring expected in the formatted backtrace
    pub frame_marker: &'static str,
    /// Label attached to forwarded reports
    pub label: &'static str,
}

/// All currently tracked defect fingerprints
pub const KNOWN_SIGNATURES: &[BugSignature] = &[
    BugSignature {
        toolkit_build: 26,
        frame_marker: "text/dynamic_layout.rs:646",
        label: BLOCK_INDEX_DEFECT,
    },
    BugSignature {
        toolkit_build: 27,
        frame_marker: "text/dynamic_layout.rs:648",
        label: BLOCK_INDEX_DEFECT,
    },
];

/// Match a crash against the known-defect table
///
/// Only index-out-of-bounds crashes are candidates. The running toolkit
/// build must equal a signature's build and the formatted backtrace must
/// contain that signature's frame marker. Build 0 means the embedder did not
/// declare a build and never matches.
pub fn detect_known_defect(
    crash: &CrashEvent,
    toolkit_build: u32,
) -> Option<&'static BugSignature> {
    if crash.kind != CrashKind::IndexOutOfBounds {
        return None;
    }

    KNOWN_SIGNATURES.iter().find(|signature| {
        signature.toolkit_build == toolkit_build && crash.backtrace.contains(signature.frame_marker)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crash::CrashEvent;

    const OOB_MESSAGE: &str = "index out of bounds: the len is 12 but the index is 13";

    fn create_test_crash(message: &str, backtrace: &str) -> CrashEvent {
        CrashEvent::new("render", message, None, backtrace)
    }

    fn layout_backtrace(line: u32) -> String {
        format!(
            "   4: toolkit::text::dynamic_layout::BlockMap::block_index_at\n             \
             at ./src/text/dynamic_layout.rs:{}:21\n   \
             5: toolkit::text::layout::Layout::reflow\n             \
             at ./src/text/layout.rs:210:9",
            line
        )
    }

    #[test]
    fn test_detects_build_26_marker_on_build_26() {
        let crash = create_test_crash(OOB_MESSAGE, &layout_backtrace(646));
        let signature = detect_known_defect(&crash, 26).expect("signature should match");
        assert_eq!(signature.toolkit_build, 26);
        assert_eq!(signature.label, BLOCK_INDEX_DEFECT);
    }

    #[test]
    fn test_detects_build_27_marker_on_build_27() {
        let crash = create_test_crash(OOB_MESSAGE, &layout_backtrace(648));
        let signature = detect_known_defect(&crash, 27).expect("signature should match");
        assert_eq!(signature.toolkit_build, 27);
    }

    #[test]
    fn test_marker_from_other_build_does_not_match() {
        let crash = create_test_crash(OOB_MESSAGE, &layout_backtrace(646));
        assert!(detect_known_defect(&crash, 27).is_none());

        let crash = create_test_crash(OOB_MESSAGE, &layout_backtrace(648));
        assert!(detect_known_defect(&crash, 26).is_none());
    }

    #[test]
    fn test_undeclared_build_never_matches() {
        let crash = create_test_crash(OOB_MESSAGE, &layout_backtrace(646));
        assert!(detect_known_defect(&crash, 0).is_none());
    }

    #[test]
    fn test_non_oob_crash_never_matches() {
        let crash = create_test_crash("editor state corrupted", &layout_backtrace(646));
        assert!(detect_known_defect(&crash, 26).is_none());
    }

    #[test]
    fn test_unrelated_backtrace_does_not_match() {
        let crash = create_test_crash(
            OOB_MESSAGE,
            "   4: toolkit::spans::SpanMap::span_at\n             at ./src/spans.rs:88:5",
        );
        assert!(detect_known_defect(&crash, 26).is_none());
    }
}
