//! Breakout of procedurally generated system names
//!
//! Names like "Synuefe XX-A h12-3" encode a region, a boxel, a mass code
//! letter, and two series numbers. The mass code is a coarse filter for
//! system size when surveying a region.

use once_cell::sync::Lazy;
use regex::Regex;

static BREAKOUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<region>.+)\s(?P<boxel>\w\w-\w)\s(?P<mass>\w)(?P<major>\d+)-(?P<minor>\d+)$")
        .expect("valid regex")
});

/// Parsed components of a procedural system name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemNameBreakout {
    pub region: String,
    pub boxel: String,
    pub mass_code: String,
    pub major_series: u32,
    pub minor_series: u32,
}

impl SystemNameBreakout {
    /// Parse a system name; None for hand-named systems like "Sol"
    pub fn parse(system_name: &str) -> Option<SystemNameBreakout> {
        let captures = BREAKOUT.captures(system_name)?;

        let major_series = captures["major"].parse().ok()?;
        let minor_series = captures["minor"].parse().ok()?;

        Some(SystemNameBreakout {
            region: captures["region"].to_string(),
            boxel: captures["boxel"].to_string(),
            mass_code: captures["mass"].to_string(),
            major_series,
            minor_series,
        })
    }

    /// Grouping prefix: region, boxel, mass code and major series
    pub fn prefix(&self) -> String {
        format!(
            "{} {} {}{}",
            self.region, self.boxel, self.mass_code, self.major_series
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_procedural_name() {
        let breakout = SystemNameBreakout::parse("Synuefe XX-A h12-3").unwrap();
        assert_eq!(breakout.region, "Synuefe");
        assert_eq!(breakout.boxel, "XX-A");
        assert_eq!(breakout.mass_code, "h");
        assert_eq!(breakout.major_series, 12);
        assert_eq!(breakout.minor_series, 3);
        assert_eq!(breakout.prefix(), "Synuefe XX-A h12");
    }

    #[test]
    fn test_parse_multi_word_region() {
        let breakout = SystemNameBreakout::parse("Col 285 Sector QH-B c2-14").unwrap();
        assert_eq!(breakout.region, "Col 285 Sector");
        assert_eq!(breakout.boxel, "QH-B");
        assert_eq!(breakout.mass_code, "c");
        assert_eq!(breakout.major_series, 2);
        assert_eq!(breakout.minor_series, 14);
    }

    #[test]
    fn test_hand_named_systems_do_not_parse() {
        assert!(SystemNameBreakout::parse("Sol").is_none());
        assert!(SystemNameBreakout::parse("HIP 22460").is_none());
    }
}
