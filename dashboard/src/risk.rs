/// Display color and label for one fire-risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskClass {
    pub color: &'static str,
    pub label: &'static str,
}

impl RiskClass {
    /// The color as an `(r, g, b)` triple
    pub fn rgb(&self) -> (u8, u8, u8) {
        let hex = self.color.trim_start_matches('#');
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        (channel(0), channel(2), channel(4))
    }
}

const NO_RISK: RiskClass = RiskClass {
    color: "#81ecec",
    label: "No Fire Risk",
};

pub const UNKNOWN_RISK: RiskClass = RiskClass {
    color: "#81ecec",
    label: "Unknown Fire Risk",
};

pub fn classify(level: i64) -> RiskClass {
    match level {
        0 => NO_RISK,
        1 => RiskClass {
            color: "#3498db",
            label: "Low Fire Risk",
        },
        2 => RiskClass {
            color: "#2ecc71",
            label: "Moderate Fire Risk",
        },
        3 => RiskClass {
            color: "#f1c40f",
            label: "High Fire Risk",
        },
        4 => RiskClass {
            color: "#e67e22",
            label: "Very High Fire Risk",
        },
        5 => RiskClass {
            color: "#e74c3c",
            label: "Extreme Fire Risk",
        },
        _ => UNKNOWN_RISK,
    }
}

/// Missing levels classify like out-of-range ones
pub fn classify_opt(level: Option<i64>) -> RiskClass {
    level.map(classify).unwrap_or(UNKNOWN_RISK)
}
