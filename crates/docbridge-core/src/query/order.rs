use derive_more::Display;

///
/// ConstraintOp
///
/// Every operator token a REST constraint may carry.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ConstraintOp {
    #[display("$within")]
    Within,
    #[display("$text")]
    Text,
    #[display("$select")]
    Select,
    #[display("$regex")]
    Regex,
    #[display("$options")]
    Options,
    #[display("$nin")]
    NotIn,
    #[display("$nearSphere")]
    NearSphere,
    #[display("$ne")]
    NotEqual,
    #[display("$maxDistanceInRadians")]
    MaxDistanceInRadians,
    #[display("$maxDistanceInMiles")]
    MaxDistanceInMiles,
    #[display("$maxDistanceInKilometers")]
    MaxDistanceInKilometers,
    #[display("$maxDistance")]
    MaxDistance,
    #[display("$lte")]
    LessThanOrEqual,
    #[display("$lt")]
    LessThan,
    #[display("$in")]
    In,
    #[display("$gte")]
    GreaterThanOrEqual,
    #[display("$gt")]
    GreaterThan,
    #[display("$geoWithin")]
    GeoWithin,
    #[display("$geoIntersects")]
    GeoIntersects,
    #[display("$exists")]
    Exists,
    #[display("$eq")]
    Equal,
    #[display("$dontSelect")]
    DontSelect,
    #[display("$containedBy")]
    ContainedBy,
    #[display("$all")]
    All,
}

/// Fixed order in which a constraint's operators are compiled.
///
/// Later entries may read state left by earlier ones in the same pass:
/// `$regex` precedes `$options` and `$nearSphere` precedes the
/// `$maxDistance*` family. The order is descending by token.
pub const PROCESSING_ORDER: [ConstraintOp; 24] = [
    ConstraintOp::Within,
    ConstraintOp::Text,
    ConstraintOp::Select,
    ConstraintOp::Regex,
    ConstraintOp::Options,
    ConstraintOp::NotIn,
    ConstraintOp::NearSphere,
    ConstraintOp::NotEqual,
    ConstraintOp::MaxDistanceInRadians,
    ConstraintOp::MaxDistanceInMiles,
    ConstraintOp::MaxDistanceInKilometers,
    ConstraintOp::MaxDistance,
    ConstraintOp::LessThanOrEqual,
    ConstraintOp::LessThan,
    ConstraintOp::In,
    ConstraintOp::GreaterThanOrEqual,
    ConstraintOp::GreaterThan,
    ConstraintOp::GeoWithin,
    ConstraintOp::GeoIntersects,
    ConstraintOp::Exists,
    ConstraintOp::Equal,
    ConstraintOp::DontSelect,
    ConstraintOp::ContainedBy,
    ConstraintOp::All,
];

impl ConstraintOp {
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        PROCESSING_ORDER
            .iter()
            .copied()
            .find(|op| op.to_string() == token)
    }

    /// Comparison operators whose operand is a single atom.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::LessThan
                | Self::LessThanOrEqual
                | Self::GreaterThan
                | Self::GreaterThanOrEqual
                | Self::Exists
                | Self::NotEqual
                | Self::Equal
        )
    }

    /// Operators that accept a `{$relativeTime: text}` operand.
    #[must_use]
    pub const fn accepts_relative_time(self) -> bool {
        matches!(
            self,
            Self::LessThan | Self::LessThanOrEqual | Self::GreaterThan | Self::GreaterThanOrEqual
        )
    }

    /// Distance operators and their radians divisor.
    #[must_use]
    pub const fn distance_divisor(self) -> Option<f64> {
        match self {
            Self::MaxDistance | Self::MaxDistanceInRadians => Some(1.0),
            Self::MaxDistanceInMiles => Some(3959.0),
            Self::MaxDistanceInKilometers => Some(6371.0),
            _ => None,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_order_is_strictly_descending() {
        let tokens: Vec<String> = PROCESSING_ORDER.iter().map(ToString::to_string).collect();

        for pair in tokens.windows(2) {
            assert!(pair[0] > pair[1], "{} should sort after {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn dependent_operators_are_processed_first() {
        let position = |op| PROCESSING_ORDER.iter().position(|o| *o == op).expect("listed");

        assert!(position(ConstraintOp::Regex) < position(ConstraintOp::Options));
        assert!(position(ConstraintOp::NearSphere) < position(ConstraintOp::MaxDistance));
    }

    #[test]
    fn parse_round_trips_every_token() {
        for op in PROCESSING_ORDER {
            assert_eq!(ConstraintOp::parse(&op.to_string()), Some(op));
        }
        assert_eq!(ConstraintOp::parse("$near"), None);
    }
}
