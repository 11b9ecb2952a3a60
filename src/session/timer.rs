use serde::Serialize;

/// Timer text shown next to the seek bar
///
/// While recording only the elapsed time is shown (`mm:ss`). Once a total
/// duration is known the timer reads `mm:ss/mm:ss`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayTimer {
    current_secs: u64,
    total_secs: Option<u64>,
}

impl DisplayTimer {
    /// Elapsed-only timer used while a recording is open
    pub fn elapsed(elapsed_ms: u64) -> Self {
        Self {
            current_secs: elapsed_ms / 1000,
            total_secs: None,
        }
    }

    /// Position timer with a known total
    pub fn position(position_ms: u64, total_ms: u64) -> Self {
        Self {
            current_secs: position_ms / 1000,
            total_secs: Some(total_ms / 1000),
        }
    }

    pub fn current_secs(&self) -> u64 {
        self.current_secs
    }

    pub fn total_secs(&self) -> Option<u64> {
        self.total_secs
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for DisplayTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_mm_ss(self.current_secs))?;
        if let Some(total) = self.total_secs {
            write!(f, "/{}", format_mm_ss(total))?;
        }
        Ok(())
    }
}

/// Format whole seconds as zero-padded `mm:ss`
///
/// Minutes are not wrapped into hours; 3725 seconds reads `62:05`.
pub fn format_mm_ss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mm_ss() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(5), "00:05");
        assert_eq!(format_mm_ss(65), "01:05");
        assert_eq!(format_mm_ss(3725), "62:05");
    }

    #[test]
    fn test_elapsed_timer_has_no_total() {
        let timer = DisplayTimer::elapsed(4999);
        assert_eq!(timer.text(), "00:04");
        assert_eq!(timer.total_secs(), None);
    }

    #[test]
    fn test_position_timer_shows_total() {
        let timer = DisplayTimer::position(2500, 5000);
        assert_eq!(timer.text(), "00:02/00:05");
        assert_eq!(timer.current_secs(), 2);
        assert_eq!(timer.total_secs(), Some(5));
    }

    #[test]
    fn test_default_timer_is_zero() {
        let timer = DisplayTimer::default();
        assert!(timer.is_zero());
        assert_eq!(timer.text(), "00:00");
        assert!(!DisplayTimer::position(0, 5000).is_zero());
    }
}
