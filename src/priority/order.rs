use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

use crate::audio::{AudioDevice, DeviceKind};
use crate::error::{RouteError, RouteResult};

/// Order used when the caller expresses no preference.
pub const DEFAULT_ORDER: [DeviceKind; 4] = DeviceKind::ALL;

/// Total order over device kinds, built from a caller preference merged into
/// [`DEFAULT_ORDER`]. Always holds each kind exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityOrder {
    kinds: Vec<DeviceKind>,
}

impl PriorityOrder {
    /// Moves `preferred` to the front of the default order, keeping the remaining
    /// default kinds in their original relative order.
    ///
    /// Fails with [`RouteError::InvalidConfiguration`] if `preferred` repeats a kind.
    pub fn new(preferred: &[DeviceKind]) -> RouteResult<Self> {
        if let Some(duplicate) = first_duplicate(preferred) {
            return Err(RouteError::InvalidConfiguration {
                reason: format!("preferred device order lists {} more than once", duplicate),
            });
        }

        if preferred.is_empty() || preferred == DEFAULT_ORDER {
            return Ok(Self::default());
        }

        let mut kinds: Vec<DeviceKind> = DEFAULT_ORDER
            .iter()
            .copied()
            .filter(|kind| !preferred.contains(kind))
            .collect();
        for (index, kind) in preferred.iter().enumerate() {
            kinds.insert(index, *kind);
        }

        debug!("Resolved preferred device order: {:?}", kinds);
        Ok(Self { kinds })
    }

    pub fn kinds(&self) -> &[DeviceKind] {
        &self.kinds
    }

    /// Position of `kind`, lower is preferred.
    pub fn rank(&self, kind: DeviceKind) -> usize {
        self.kinds
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(self.kinds.len())
    }

    /// Sort key comparison. Devices of the same kind compare equal; callers rely on a
    /// stable sort to keep same-kind ties in first-seen order.
    pub fn compare(&self, a: &AudioDevice, b: &AudioDevice) -> Ordering {
        self.rank(a.kind).cmp(&self.rank(b.kind))
    }
}

impl Default for PriorityOrder {
    fn default() -> Self {
        Self {
            kinds: DEFAULT_ORDER.to_vec(),
        }
    }
}

impl fmt::Display for PriorityOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.kinds.iter().map(|k| k.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

fn first_duplicate(kinds: &[DeviceKind]) -> Option<DeviceKind> {
    kinds
        .iter()
        .enumerate()
        .find(|(i, kind)| kinds[..*i].contains(kind))
        .map(|(_, kind)| *kind)
}
