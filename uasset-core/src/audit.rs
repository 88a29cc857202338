//! Byte-exact audit trail for hex-inspector consumers.

use serde::Serialize;

/// One recorded primitive read: which bytes produced which decoded value.
/// Offsets are inclusive on both ends, so a single-byte read has
/// `start == stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub key: String,
    pub ty: &'static str,
    pub value: String,
    pub start: usize,
    pub stop: usize,
}

/// Append-only recorder the cursor reports every read to when audit mode is
/// on. Recording never affects decoded values or the cursor position.
#[derive(Debug, Default)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn record(
        &mut self,
        key: &str,
        ty: &'static str,
        value: impl ToString,
        start: usize,
        stop: usize,
    ) {
        self.entries.push(AuditEntry {
            key: key.to_string(),
            ty,
            value: value.to_string(),
            start,
            stop,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Final ordering pass: ascending by start offset, stable on ties.
    /// Sections are decoded in table order, not file order, so out-of-line
    /// reads (thumbnail payloads, export probes) land out of sequence until
    /// this runs.
    pub fn into_sorted(mut self) -> Vec<AuditEntry> {
        self.entries.sort_by_key(|entry| entry.start);
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_ascending_and_stable_on_ties() {
        let mut trail = AuditTrail::default();
        trail.record("c", "int32", 3, 8, 11);
        trail.record("a", "int32", 1, 0, 3);
        trail.record("b1", "uint16", 2, 4, 5);
        trail.record("b2", "uint16", 2, 4, 5);

        let entries = trail.into_sorted();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["a", "b1", "b2", "c"]);
        for entry in &entries {
            assert!(entry.start <= entry.stop);
        }
    }
}
