use crate::error::{ExdriftError, Result};
use crate::model::ExceptionRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};

const THROW_FRAME_MARKER: &str = "IL_Throw";
const EXECUTOR_FRAME_MARKER: &str = "System.Threading.Tasks.Task.Execute()";
const FRAMES_BELOW_THROW: usize = 4;

/// Normalized exception key
///
/// Two occurrences of "the same" exception in different runs collapse onto one
/// identity: volatile substrings (GUIDs, timestamps, file names) are replaced
/// and the stack is cut down to the frames around the throw site. The
/// occurrence timestamp is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExceptionIdentity {
    pub process_name: String,
    pub stack_signature: String,
    pub message: String,
    pub exception_type: String,
}

impl ExceptionIdentity {
    /// Build an identity from already-normalized parts
    pub fn new(
        process_name: impl Into<String>,
        stack_signature: impl Into<String>,
        message: impl Into<String>,
        exception_type: impl Into<String>,
    ) -> Self {
        Self {
            process_name: process_name.into(),
            stack_signature: stack_signature.into(),
            message: message.into(),
            exception_type: exception_type.into(),
        }
    }

    /// Build an identity from a raw exception record
    pub fn from_record(record: &ExceptionRecord, normalizer: &IdentityNormalizer) -> Self {
        Self::new(
            record.process_name.trim(),
            normalizer.stack_signature(&record.stack),
            normalizer.message(&record.message),
            record.exception_type.trim(),
        )
    }

    /// True when any allowlist entry contains this identity's process name.
    /// An empty allowlist accepts every process.
    pub fn is_from_any_process(&self, process_names: &[String]) -> bool {
        process_names.is_empty()
            || process_names
                .iter()
                .any(|allowed| allowed.contains(self.process_name.as_str()))
    }
}

/// Replaces run-specific noise in exception messages and stacks
#[derive(Debug, Clone)]
pub struct IdentityNormalizer {
    guid: Regex,
    timestamp: Regex,
    clock: Regex,
    file_name: Regex,
}

impl IdentityNormalizer {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ExdriftError::InvalidInput(e.to_string()))
        };

        Ok(Self {
            guid: compile(r"[0-9a-fA-F]{8}-(?:[0-9a-fA-F]{4}-){3}[0-9a-fA-F]{8,14}")?,
            timestamp: compile(
                r"\b\d{1,4}[./-]\d{1,2}[./-]\d{1,4}(?:[ T_]\d{1,2}:\d{2}(?::\d{2}(?:[.,]\d+)?)?)?(?:\s?(?:AM|PM|GMT|Z))?",
            )?,
            clock: compile(r"\b\d{1,2}:\d{2}:\d{2}(?:[.,]\d+)?(?:\s?(?:AM|PM))?")?,
            file_name: compile(r"'\s?(?:[a-zA-Z]:)?[\\/][^']*'")?,
        })
    }

    /// Message with GUIDs, timestamps and quoted file paths replaced
    pub fn message(&self, message: &str) -> String {
        let cleaned = self.guid.replace_all(message.trim(), "IsGuid");
        let cleaned = self.timestamp.replace_all(&cleaned, "IsTimeStamp");
        let cleaned = self.clock.replace_all(&cleaned, "IsTimeStamp");
        self.file_name.replace_all(&cleaned, "'IsFileName'").into_owned()
    }

    /// Frames between the innermost throw site and the task executor frame
    pub fn stack_signature(&self, stack: &str) -> String {
        let frames: Vec<&str> = stack
            .lines()
            .map(str::trim)
            .filter(|frame| !frame.is_empty())
            .collect();

        let below_throw = match frames.iter().rposition(|f| f.contains(THROW_FRAME_MARKER)) {
            Some(start) => &frames[start..frames.len().min(start + FRAMES_BELOW_THROW)],
            None => &frames[..],
        };

        let relevant = match below_throw
            .iter()
            .position(|f| f.contains(EXECUTOR_FRAME_MARKER))
        {
            Some(end) => &below_throw[..=end],
            None => below_throw,
        };

        let signature = relevant.join("\n");
        self.guid.replace_all(&signature, "IsGuid").into_owned()
    }
}
