use serde::{Deserialize, Serialize};

/// Monotonic engine time in seconds.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Time(pub f64);

/// Wall-clock instant, milliseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

pub const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

impl Timestamp {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn now() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            // Browser clocks report fractional milliseconds.
            Self(js_sys::Date::now().max(0.0) as u64)
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| Self(d.as_millis() as u64))
                .unwrap_or(Self(0))
        }
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn plus_days(self, days: u64) -> Self {
        Self(self.0.saturating_add(days.saturating_mul(MS_PER_DAY)))
    }

    /// Returns `true` if `self` is strictly before `other`.
    pub fn is_before(self, other: Self) -> bool {
        self.0 < other.0
    }
}
