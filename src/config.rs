//! Driver configuration.
//!
//! A small struct of knobs plus a `key=value` line parser, rather than a
//! full config-file format this driver has no business owning.

use alloc::string::String;

/// The lead-in offset: physical sector = logical + 150.
pub const DEFAULT_LEAD_IN_OFFSET: u32 = 150;

/// Tunable knobs for a mounted driver instance.
///
/// The defaults match a real CD-ROM/GD-ROM's physical layout. Tests override
/// `lead_in_offset` to 0 so synthetic images can start at sector 0 instead of
/// behind a real lead-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Sectors between the TOC's reported data-track start and sector 0
    /// of the logical volume. 150 on a real disc.
    pub lead_in_offset: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            lead_in_offset: DEFAULT_LEAD_IN_OFFSET,
        }
    }
}

impl DriverConfig {
    /// Parse `key=value` mount options, one per line, ignoring blank lines
    /// and `#`-prefixed comments. Unknown keys are ignored rather than
    /// rejected, since a future host may pass options this version of the
    /// driver doesn't recognize yet.
    pub fn parse_options(text: &str) -> Self {
        let mut config = Self::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            if key == "lead_in_offset" {
                if let Ok(v) = value.parse::<u32>() {
                    config.lead_in_offset = v;
                }
            }
        }

        config
    }

    /// Serialize back to `key=value` lines, mainly useful for diagnostics.
    pub fn to_options_string(&self) -> String {
        alloc::format!("lead_in_offset={}\n", self.lead_in_offset)
    }
}
