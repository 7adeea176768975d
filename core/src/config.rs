use wgpu::PowerPreference;

/// Options used when opening a [`GpuContext`](crate::GpuContext).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    pub power_preference:       PowerPreference,
    pub force_fallback_adapter: bool,
    pub label:                  Option<String>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            power_preference:       PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            label:                  Some("vkop-device".to_string()),
        }
    }
}

impl ContextOptions {
    /// Defaults, overridden by `WGPU_POWER_PREF` when it is set.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Some(pref) = PowerPreference::from_env() {
            opts.power_preference = pref;
        }
        opts
    }

    pub fn with_power_preference(mut self, pref: PowerPreference) -> Self {
        self.power_preference = pref;
        self
    }

    /// Restrict adapter selection to a software fallback adapter.
    pub fn with_fallback_adapter(mut self, force: bool) -> Self {
        self.force_fallback_adapter = force;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let opts = ContextOptions::default()
            .with_power_preference(PowerPreference::LowPower)
            .with_fallback_adapter(true)
            .with_label("test-device");

        assert_eq!(opts.power_preference, PowerPreference::LowPower);
        assert!(opts.force_fallback_adapter);
        assert_eq!(opts.label.as_deref(), Some("test-device"));
    }

    #[test]
    fn default_prefers_high_performance() {
        let opts = ContextOptions::default();
        assert_eq!(opts.power_preference, PowerPreference::HighPerformance);
        assert!(!opts.force_fallback_adapter);
    }
}
