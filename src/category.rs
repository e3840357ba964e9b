/// A severity band of the AQI scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AqiCategory {
    /// Inclusive upper bound of the band.
    pub upper: f64,
    pub label: &'static str,
    /// Display color as a hex string.
    pub color: &'static str,
}

/// The bands in ascending order. The last one is open ended.
pub const CATEGORIES: [AqiCategory; 6] = [
    AqiCategory {
        upper: 50.0,
        label: "Good",
        color: "#10b981",
    },
    AqiCategory {
        upper: 100.0,
        label: "Satisfactory",
        color: "#9cd84e",
    },
    AqiCategory {
        upper: 200.0,
        label: "Moderate",
        color: "#f59e0b",
    },
    AqiCategory {
        upper: 300.0,
        label: "Poor",
        color: "#ff8c42",
    },
    AqiCategory {
        upper: 400.0,
        label: "Very Poor",
        color: "#ef4444",
    },
    AqiCategory {
        upper: f64::INFINITY,
        label: "Severe",
        color: "#7f1d1d",
    },
];

/// Returns the first band whose upper bound is at least `aqi`.
///
/// Values that compare to no bound at all (NaN) land in the last band.
pub fn classify(aqi: f64) -> &'static AqiCategory {
    CATEGORIES
        .iter()
        .find(|category| aqi <= category.upper)
        .unwrap_or(&CATEGORIES[CATEGORIES.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(aqi: f64) -> &'static str {
        classify(aqi).label
    }

    #[test]
    fn bounds_belong_to_the_lower_band() {
        assert_eq!(label(50.0), "Good");
        assert_eq!(label(50.01), "Satisfactory");
        assert_eq!(label(100.0), "Satisfactory");
        assert_eq!(label(100.01), "Moderate");
        assert_eq!(label(200.0), "Moderate");
        assert_eq!(label(300.0), "Poor");
        assert_eq!(label(400.0), "Very Poor");
        assert_eq!(label(400.01), "Severe");
    }

    #[test]
    fn extremes() {
        assert_eq!(label(-12.0), "Good");
        assert_eq!(label(0.0), "Good");
        assert_eq!(label(1e9), "Severe");
        assert_eq!(label(f64::NAN), "Severe");
    }

    #[test]
    fn colors_follow_labels() {
        let pairs: Vec<_> = CATEGORIES.iter().map(|c| (c.label, c.color)).collect();
        assert_eq!(
            pairs,
            [
                ("Good", "#10b981"),
                ("Satisfactory", "#9cd84e"),
                ("Moderate", "#f59e0b"),
                ("Poor", "#ff8c42"),
                ("Very Poor", "#ef4444"),
                ("Severe", "#7f1d1d"),
            ]
        );
    }
}
